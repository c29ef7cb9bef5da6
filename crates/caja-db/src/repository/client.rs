//! # Client Repository
//!
//! Clients carry a credit limit and an outstanding balance. Settlement
//! commits change the balance relatively (`balance + delta`) inside their
//! transaction; [`ClientRepository::set_balance`] is the absolute write used
//! for manual corrections.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use caja_core::{Client, Money, PriceLevel};

const CLIENT_COLUMNS: &str = "id, name, credit_limit_cents, balance_cents, \
     default_price_level, is_active, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ClientRow {
    id: String,
    name: String,
    credit_limit_cents: i64,
    balance_cents: i64,
    default_price_level: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ClientRow> for Client {
    type Error = DbError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        let default_price_level = PriceLevel::new(row.default_price_level)
            .map_err(|e| DbError::corrupt("Client", &row.id, e))?;

        Ok(Client {
            id: row.id,
            name: row.name,
            credit_limit: Money::from_cents(row.credit_limit_cents),
            balance: Money::from_cents(row.balance_cents),
            default_price_level,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Gets a client by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {} FROM clients WHERE id = ?1", CLIENT_COLUMNS);
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Client::try_from).transpose()
    }

    /// Lists active clients sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Client>> {
        let sql = format!(
            "SELECT {} FROM clients WHERE is_active = 1 ORDER BY name",
            CLIENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClientRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Client::try_from).collect()
    }

    /// Inserts a new client.
    pub async fn insert(&self, client: &Client) -> DbResult<Client> {
        debug!(name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, name, credit_limit_cents, balance_cents,
                default_price_level, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(client.credit_limit.cents())
        .bind(client.balance.cents())
        .bind(i64::from(client.default_price_level.get()))
        .bind(client.is_active)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(client.clone())
    }

    /// Overwrites a client's outstanding balance.
    pub async fn set_balance(&self, id: &str, balance: Money) -> DbResult<()> {
        debug!(id = %id, balance = %balance, "Setting client balance");

        let result = sqlx::query(
            "UPDATE clients SET balance_cents = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(balance.cents())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }

    /// Counts active clients.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Relative balance change inside a settlement transaction, floored at zero.
///
/// With `enforce_limit`, a charge only applies while the new balance stays
/// within `credit_limit_cents`, re-checked against the row as it is now.
///
/// ## Returns
/// * `Err(DbError::CreditLimitExceeded)` - the charge no longer fits
/// * `Err(DbError::NotFound)` - no such client
pub(crate) async fn adjust_balance(
    conn: &mut SqliteConnection,
    client_id: &str,
    delta: Money,
    enforce_limit: bool,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE clients
        SET
            balance_cents = MAX(balance_cents + ?2, 0),
            updated_at = ?3
        WHERE id = ?1
          AND (?4 = 0 OR ?2 <= 0 OR balance_cents + ?2 <= credit_limit_cents)
        "#,
    )
    .bind(client_id)
    .bind(delta.cents())
    .bind(now)
    .bind(enforce_limit)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM clients WHERE id = ?1")
            .bind(client_id)
            .fetch_optional(&mut *conn)
            .await?;

        return Err(match exists {
            Some(_) => DbError::CreditLimitExceeded {
                client_id: client_id.to_string(),
                requested: delta.to_string(),
            },
            None => DbError::not_found("Client", client_id),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::test_support::sample_client;

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let client = sample_client("Abarrotes Lupita", 500_000, 480_000);
        db.clients().insert(&client).await.unwrap();

        let stored = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(stored.credit_limit.cents(), 500_000);
        assert_eq!(stored.balance.cents(), 480_000);
        assert_eq!(stored.default_price_level.get(), 2);

        assert_eq!(db.clients().list_active().await.unwrap().len(), 1);
        assert!(db.clients().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_balance_updates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let client = sample_client("Cremeria Sol", 100_000, 10_000);
        db.clients().insert(&client).await.unwrap();

        db.clients()
            .set_balance(&client.id, Money::from_cents(2_000))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        adjust_balance(&mut conn, &client.id, Money::from_cents(-5_000), true, Utc::now())
            .await
            .unwrap();

        // up to the $1000.00 limit exactly
        adjust_balance(&mut conn, &client.id, Money::from_cents(100_000), true, Utc::now())
            .await
            .unwrap();
        let err = adjust_balance(&mut conn, &client.id, Money::from_cents(1), true, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CreditLimitExceeded { .. }));

        // an authorized charge skips the limit
        adjust_balance(&mut conn, &client.id, Money::from_cents(1), false, Utc::now())
            .await
            .unwrap();
        adjust_balance(&mut conn, &client.id, Money::from_cents(-100_001), true, Utc::now())
            .await
            .unwrap();
        drop(conn);

        let stored = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Money::zero());

        let err = db
            .clients()
            .set_balance("missing", Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
