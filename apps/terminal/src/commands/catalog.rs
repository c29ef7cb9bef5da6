//! # Catalog Commands
//!
//! Products, clients and tare options as the cashier sees them, plus stock
//! receipts.

use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ChangeEvent, DbState, Notifier};
use caja_core::{Client, Product, Quantity, TareOption};

pub async fn list_products(db: &DbState) -> Result<Vec<Product>, ApiError> {
    debug!("products command");
    Ok(db.inner().list_products().await?)
}

pub async fn find_product(db: &DbState, code: &str) -> Result<Product, ApiError> {
    debug!(code = %code, "product command");
    Ok(db.inner().find_product_by_code(code).await?)
}

pub async fn list_clients(db: &DbState) -> Result<Vec<Client>, ApiError> {
    debug!("clients command");
    Ok(db.inner().list_clients().await?)
}

/// Container types offered on the weight screen, lightest first.
pub async fn list_tares(db: &DbState) -> Result<Vec<TareOption>, ApiError> {
    debug!("tares command");
    Ok(db.inner().list_tare_options().await?)
}

/// Adds received goods to stock.
pub async fn receive_stock(
    db: &DbState,
    notifier: &Notifier,
    code: &str,
    quantity: Quantity,
) -> Result<Product, ApiError> {
    debug!(code = %code, quantity = %quantity, "receive_stock command");

    if !quantity.is_positive() {
        return Err(ApiError::validation(format!(
            "Received quantity must be greater than zero, got {}",
            quantity
        )));
    }

    let product = db.inner().find_product_by_code(code).await?;
    let product = db.inner().update_product_stock(&product.id, quantity).await?;

    info!(code = %code, stock = %product.stock, "Stock received");
    notifier.publish(ChangeEvent::product(product.id.as_str()));

    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_receive_stock_adds_fractional_quantity() {
        let fx = Fixture::new().await;
        fx.product("NUEZ-01", 40, 32_000).await;

        let product = receive_stock(&fx.db, &fx.notifier, "NUEZ-01", "12.5".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(product.stock, Quantity::from_millis(52_500));

        let err = receive_stock(&fx.db, &fx.notifier, "NUEZ-01", Quantity::zero())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = receive_stock(&fx.db, &fx.notifier, "NOPE", Quantity::from_units(1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_listings() {
        let fx = Fixture::new().await;
        fx.product("AZUC-01", 10, 2_850).await;
        fx.client("Mayoreo El Sol", 2_000_000, 0).await;
        fx.tare("Costal", 250).await;
        fx.tare("Caja", 1_800).await;

        assert_eq!(list_products(&fx.db).await.unwrap().len(), 1);
        assert_eq!(find_product(&fx.db, "AZUC-01").await.unwrap().code, "AZUC-01");
        assert_eq!(list_clients(&fx.db).await.unwrap().len(), 1);

        let tares = list_tares(&fx.db).await.unwrap();
        assert_eq!(tares[0].name, "Costal");
        assert_eq!(tares[1].name, "Caja");
    }
}
