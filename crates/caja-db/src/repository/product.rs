//! # Product Repository
//!
//! Database operations for the product catalogue.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, subtract in memory, write back                        │
//! │     stock = 40  →  UPDATE products SET stock_millis = 37000            │
//! │                                                                         │
//! │  ✅ CORRECT: relative compare-and-set                                  │
//! │     UPDATE products SET stock_millis = stock_millis - 3000             │
//! │     WHERE id = ? AND stock_millis >= 3000                              │
//! │                                                                         │
//! │  Terminal A sells 3, terminal B sells 2 at the same time:              │
//! │  both decrements apply, or the second one affects 0 rows and its       │
//! │  settlement rolls back. Stock never goes negative.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use caja_core::{Money, Product, Quantity};

const PRODUCT_COLUMNS: &str = "id, code, name, line, subline, unit, stock_millis, cost_cents, \
     price1_cents, price2_cents, price3_cents, price4_cents, price5_cents, \
     is_active, created_at, updated_at";

/// Row shape of the `products` table.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    code: String,
    name: String,
    line: Option<String>,
    subline: Option<String>,
    unit: String,
    stock_millis: i64,
    cost_cents: i64,
    price1_cents: i64,
    price2_cents: i64,
    price3_cents: i64,
    price4_cents: i64,
    price5_cents: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            code: row.code,
            name: row.name,
            line: row.line,
            subline: row.subline,
            unit: row.unit,
            stock: Quantity::from_millis(row.stock_millis),
            cost: Money::from_cents(row.cost_cents),
            prices: [
                Money::from_cents(row.price1_cents),
                Money::from_cents(row.price2_cents),
                Money::from_cents(row.price3_cents),
                Money::from_cents(row.price4_cents),
                Money::from_cents(row.price5_cents),
            ],
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().get_by_code("NUEZ-01").await?;
/// db.products().update_stock(&product.id, Quantity::from_units(25)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Gets a product by its business code (e.g. "NUEZ-01").
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE code = ?1", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 ORDER BY name",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, line, subline, unit,
                stock_millis, cost_cents,
                price1_cents, price2_cents, price3_cents, price4_cents, price5_cents,
                is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.line)
        .bind(&product.subline)
        .bind(&product.unit)
        .bind(product.stock.millis())
        .bind(product.cost.cents())
        .bind(product.prices[0].cents())
        .bind(product.prices[1].cents())
        .bind(product.prices[2].cents())
        .bind(product.prices[3].cents())
        .bind(product.prices[4].cents())
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Applies a relative stock change (restock or adjustment).
    ///
    /// A negative `delta` larger than the current stock is rejected with
    /// [`DbError::InsufficientStock`]; the stored stock never goes negative.
    ///
    /// ## Returns
    /// The product with its new stock.
    pub async fn update_stock(&self, id: &str, delta: Quantity) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Updating stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                stock_millis = stock_millis + ?2,
                updated_at = ?3
            WHERE id = ?1 AND stock_millis + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta.millis())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get_by_id(id).await? {
                Some(_) => DbError::InsufficientStock {
                    product_id: id.to_string(),
                    requested: (Quantity::zero() - delta).to_string(),
                },
                None => DbError::not_found("Product", id),
            });
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts active products (for diagnostics and the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Compare-and-set stock decrement, run inside a settlement transaction.
///
/// Zero affected rows means another terminal consumed the stock first (or
/// the product vanished); the caller rolls the transaction back.
pub(crate) async fn decrement_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: Quantity,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET
            stock_millis = stock_millis - ?2,
            updated_at = ?3
        WHERE id = ?1 AND stock_millis >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity.millis())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InsufficientStock {
            product_id: product_id.to_string(),
            requested: quantity.to_string(),
        });
    }

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::test_support::sample_product;

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("AZUC-01", 40);
        db.products().insert(&product).await.unwrap();

        let by_id = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "AZUC-01");
        assert_eq!(by_id.stock, Quantity::from_units(40));
        assert_eq!(by_id.prices[4].cents(), 1600);

        let by_code = db.products().get_by_code("AZUC-01").await.unwrap();
        assert_eq!(by_code.map(|p| p.id), Some(product.id));
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&sample_product("DUP", 1)).await.unwrap();

        let err = db.products().insert(&sample_product("DUP", 1)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_stock_never_negative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("ARROZ-01", 5);
        db.products().insert(&product).await.unwrap();

        let updated = db
            .products()
            .update_stock(&product.id, Quantity::from_millis(2_500))
            .await
            .unwrap();
        assert_eq!(updated.stock, Quantity::from_millis(7_500));

        let err = db
            .products()
            .update_stock(&product.id, Quantity::from_units(-8))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InsufficientStock { .. }));

        let err = db
            .products()
            .update_stock("missing", Quantity::from_units(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_decrement_stock_compare_and_set() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("FRIJOL-01", 3);
        db.products().insert(&product).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        decrement_stock(&mut conn, &product.id, Quantity::from_units(2), Utc::now())
            .await
            .unwrap();
        let err = decrement_stock(&mut conn, &product.id, Quantity::from_units(2), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InsufficientStock { .. }));
        drop(conn);

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, Quantity::from_units(1));
    }
}
