use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};

#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub id: i64,
    pub count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<SqliteRow> for Counter {
    type Error = sqlx::Error;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        Ok(Counter {
            id: row.try_get("id")?,
            count: row.try_get("count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let schema = include_str!("schema.sql");
    sqlx::raw_sql(schema).execute(pool).await?;
    Ok(())
}

pub async fn query_counter<'e, E>(executor: E, id: i64) -> Result<Option<Counter>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        SELECT id, count, created_at, updated_at
        FROM counters
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.map(Counter::try_from).transpose()
}

/// Creates the row with a count of 1, or adds one to an existing row.
///
/// A single statement takes the write lock up front, so concurrent callers
/// queue on the busy timeout instead of failing a lock upgrade.
pub async fn increment_counter<'e, E>(
    executor: E,
    id: i64,
    now: DateTime<Utc>,
) -> Result<Counter, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let stamp = now.to_rfc3339();
    let row = sqlx::query(
        r#"
        INSERT INTO counters (id, count, created_at, updated_at)
        VALUES (?, 1, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            count = count + 1,
            updated_at = excluded.updated_at
        RETURNING id, count, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&stamp)
    .bind(&stamp)
    .fetch_one(executor)
    .await?;

    Counter::try_from(row)
}

/// Returns whether a row was removed. A missing row is not an error.
pub async fn delete_counter<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM counters WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
