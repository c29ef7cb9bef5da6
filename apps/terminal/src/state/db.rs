//! # Database State
//!
//! Holds the data-access handle used by every command.
//!
//! ## Thread Safety
//! `DataAccess` is `Send + Sync`; the SQLite implementation wraps a
//! `SqlitePool`, so commands can run queries concurrently without locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn show_order(db: &DbState, order_id: &str) -> Result<OrderResponse, ApiError> {
//!     let order = db.inner().get_order(order_id).await?;
//!     Ok(OrderResponse::from(order))
//! }
//! ```

use std::sync::Arc;

use caja_db::{DataAccess, Database};

/// Shared handle to the data store.
#[derive(Clone)]
pub struct DbState {
    data: Arc<dyn DataAccess>,
}

impl DbState {
    /// Wraps any `DataAccess` implementation.
    pub fn new(data: Arc<dyn DataAccess>) -> Self {
        DbState { data }
    }

    /// Wraps the SQLite database.
    pub fn from_database(db: Database) -> Self {
        DbState::new(Arc::new(db))
    }

    /// Returns the data-access handle.
    pub fn inner(&self) -> &dyn DataAccess {
        self.data.as_ref()
    }
}
