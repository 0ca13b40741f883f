use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::sentiment::Sentiment;

/// One processed review as written to the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub user_name: String,
    pub review_text: String,
    pub sentiment: Sentiment,
    pub polarity_score: f64,
    /// ISO-8601 local time, no offset
    pub timestamp: String,
}

impl ReviewRecord {
    /// Raw polarity as stored: shortest round-trip text, always with a fractional part.
    /// Magnitudes below `1e-4` switch to exponent form (`1e-5`).
    pub fn polarity_text(&self) -> String {
        format!("{:?}", self.polarity_score)
    }
}

/// Persistence seam for review records. Write-only: the intake never reads back.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_review(&self, record: &ReviewRecord) -> Result<()>;
}

/// Record store writing one row per review into an SQLite table.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteRecordStore {
    /// The table name is interpolated into SQL, so only plain identifiers are accepted.
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_plain_identifier(&table) {
            bail!("invalid review table name: {:?}", table);
        }
        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the review table if missing (CREATE TABLE IF NOT EXISTS).
    pub async fn ensure_schema(&self) -> Result<()> {
        info!(table = %self.table, "storage: ensuring review table exists");
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_name TEXT NOT NULL,
                review TEXT NOT NULL,
                sentiment TEXT NOT NULL,
                polarity_score TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
            self.table
        ))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create table {}", self.table))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    async fn put_review(&self, record: &ReviewRecord) -> Result<()> {
        let id = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            INSERT INTO {} (user_name, review, sentiment, polarity_score, timestamp)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
            self.table
        ))
        .bind(&record.user_name)
        .bind(&record.review_text)
        .bind(record.sentiment.as_str())
        .bind(record.polarity_text())
        .bind(&record.timestamp)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert review into {}", self.table))?;

        debug!(table = %self.table, id, "stored review record");
        Ok(())
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
