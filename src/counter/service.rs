//! Operations on the singleton counter row.
//!
//! The row lives under [`COUNTER_ID`] and may be absent, which reads as zero.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;

pub const COUNTER_ID: i64 = 1;

/// Materializes the row on first use, otherwise adds one. Returns the new count.
pub async fn increment(pool: &SqlitePool) -> Result<i64, AppError> {
    let counter = db::increment_counter(pool, COUNTER_ID, Utc::now()).await?;
    tracing::info!("Counter incremented to {}", counter.count);
    Ok(counter.count)
}

pub async fn read(pool: &SqlitePool) -> Result<i64, AppError> {
    let counter = db::query_counter(pool, COUNTER_ID).await?;
    Ok(counter.map_or(0, |c| c.count))
}

pub async fn clear(pool: &SqlitePool) -> Result<(), AppError> {
    if db::delete_counter(pool, COUNTER_ID).await? {
        tracing::info!("Counter cleared");
    }
    Ok(())
}
