//! Database operations for the change log table.

use scoresync_engine::{ChangeLogEntry, ChangeType, Timestamp, Version};
use sqlx::{PgExecutor, Row};

/// A stored change log row from the database.
#[derive(Debug)]
pub struct StoredChange {
    pub seq: i64,
    pub ts: i64,
    pub record_id: String,
    pub change_type: String,
    pub url: Option<String>,
    #[allow(dead_code)]
    pub client_id: Option<String>,
    #[allow(dead_code)]
    pub version: Option<i64>,
    #[allow(dead_code)]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredChange {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredChange {
            seq: row.try_get("seq")?,
            ts: row.try_get("ts")?,
            record_id: row.try_get("record_id")?,
            change_type: row.try_get("change_type")?,
            url: row.try_get("url")?,
            client_id: row.try_get("client_id")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl StoredChange {
    /// Convert database row to a log entry.
    pub fn to_entry(&self) -> Result<ChangeLogEntry, String> {
        let change_type: ChangeType = self
            .change_type
            .parse()
            .map_err(|e| format!("change {}: {}", self.seq, e))?;

        Ok(ChangeLogEntry::new(
            self.ts,
            self.record_id.clone(),
            change_type,
            self.url.clone(),
        ))
    }
}

/// Insert a log entry. Returns its arrival sequence number.
pub async fn insert_change<'e, E>(
    executor: E,
    entry: &ChangeLogEntry,
    client_id: Option<&str>,
    version: Option<Version>,
) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO sync_changes (ts, record_id, change_type, url, client_id, version)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING seq
        "#,
    )
    .bind(entry.ts)
    .bind(&entry.id)
    .bind(entry.change_type.as_str())
    .bind(entry.url.as_deref())
    .bind(client_id)
    .bind(version.map(|v| v as i64))
    .fetch_one(executor)
    .await?;

    Ok(result.0)
}

/// Latest change per record with `ts > since`, newest first.
///
/// Equal timestamps are ordered by arrival, latest first.
pub async fn get_changes_since<'e, E>(
    executor: E,
    since: Timestamp,
    limit: i64,
) -> Result<Vec<StoredChange>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, StoredChange>(
        r#"
        SELECT seq, ts, record_id, change_type, url, client_id, version, created_at
        FROM (
            SELECT DISTINCT ON (record_id)
                   seq, ts, record_id, change_type, url, client_id, version, created_at
            FROM sync_changes
            WHERE ts > $1
            ORDER BY record_id, ts DESC, seq DESC
        ) latest
        ORDER BY ts DESC, seq DESC
        LIMIT $2
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Get the highest timestamp in the log.
pub async fn get_checkpoint<'e, E>(executor: E) -> Result<Option<Timestamp>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result: (Option<i64>,) = sqlx::query_as(r#"SELECT MAX(ts) FROM sync_changes"#)
        .fetch_one(executor)
        .await?;

    Ok(result.0)
}
