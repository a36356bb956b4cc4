//! Database operations for the records table.

use scoresync_engine::{Record, SnapshotItem};
use sqlx::{PgExecutor, Row};

/// A stored record row from the database.
#[derive(Debug)]
pub struct StoredRecord {
    pub record_id: String,
    pub doc: serde_json::Value,
    pub version: i64,
    pub client_id: String,
    pub timestamp: i64,
    pub url: Option<String>,
    pub deleted: bool,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            record_id: row.try_get("record_id")?,
            doc: row.try_get("doc")?,
            version: row.try_get("version")?,
            client_id: row.try_get("client_id")?,
            timestamp: row.try_get("timestamp")?,
            url: row.try_get("url")?,
            deleted: row.try_get("deleted")?,
        })
    }
}

impl StoredRecord {
    /// Convert database row to an engine Record.
    pub fn to_record(&self) -> Record {
        Record {
            id: self.record_id.clone(),
            doc: self.doc.clone(),
            version: self.version as u64,
            client_id: self.client_id.clone(),
            timestamp: self.timestamp,
            url: self.url.clone(),
            deleted: self.deleted,
        }
    }
}

/// Upsert a record (insert or update).
pub async fn upsert_record<'e, E>(executor: E, record: &Record) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO sync_records (
            record_id, doc, version, client_id, timestamp, url, deleted
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (record_id) DO UPDATE SET
            doc = EXCLUDED.doc,
            version = EXCLUDED.version,
            client_id = EXCLUDED.client_id,
            timestamp = EXCLUDED.timestamp,
            url = EXCLUDED.url,
            deleted = EXCLUDED.deleted,
            updated_at = NOW()
        "#,
    )
    .bind(&record.id)
    .bind(&record.doc)
    .bind(record.version as i64)
    .bind(&record.client_id)
    .bind(record.timestamp)
    .bind(record.url.as_deref())
    .bind(record.deleted)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get a record by ID.
pub async fn get_record<'e, E>(
    executor: E,
    record_id: &str,
) -> Result<Option<StoredRecord>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT record_id, doc, version, client_id, timestamp, url, deleted
        FROM sync_records
        WHERE record_id = $1
        "#,
    )
    .bind(record_id)
    .fetch_optional(executor)
    .await
}

/// Serialize writers to one record id until the surrounding transaction ends.
pub async fn lock_record<'e, E>(executor: E, record_id: &str) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(r#"SELECT pg_advisory_xact_lock(hashtextextended($1, 0))"#)
        .bind(record_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Get id and url of all active (non-deleted) records.
pub async fn get_active_snapshot<'e, E>(executor: E) -> Result<Vec<SnapshotItem>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT record_id, url
        FROM sync_records
        WHERE deleted = false
        ORDER BY record_id
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, url)| SnapshotItem::new(id, url))
        .collect())
}
