//! # Tare Option Repository
//!
//! Container types (crates, sacks, boxes) offered on the weight screen.

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use caja_core::{Quantity, TareOption};

#[derive(Debug, FromRow)]
struct TareRow {
    id: String,
    name: String,
    weight_millis: i64,
}

impl From<TareRow> for TareOption {
    fn from(row: TareRow) -> Self {
        TareOption {
            id: row.id,
            name: row.name,
            weight: Quantity::from_millis(row.weight_millis),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TareRepository {
    pool: SqlitePool,
}

impl TareRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TareRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<TareOption>> {
        let rows = sqlx::query_as::<_, TareRow>(
            "SELECT id, name, weight_millis FROM tare_options ORDER BY weight_millis, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TareOption::from).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TareOption>> {
        let row = sqlx::query_as::<_, TareRow>(
            "SELECT id, name, weight_millis FROM tare_options WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TareOption::from))
    }

    pub async fn insert(&self, tare: &TareOption) -> DbResult<()> {
        debug!(name = %tare.name, weight = %tare.weight, "Inserting tare option");

        sqlx::query("INSERT INTO tare_options (id, name, weight_millis) VALUES (?1, ?2, ?3)")
            .bind(&tare.id)
            .bind(&tare.name)
            .bind(tare.weight.millis())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
