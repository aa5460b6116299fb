//! SQLite report store.

use anyhow::Context;
use astrobadge_core::{RepositoryIdentity, SignedReport};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::{decode_record, ReportStore, StoreError};

const MAX_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Report store backed by a single SQLite table.
///
/// Each put is one `INSERT .. ON CONFLICT DO UPDATE` statement, so readers see either the
/// previous or the new report, never a mix.
#[derive(Debug, Clone)]
pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    /// Connect (creating the database file if needed) and run migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to report database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Bring the schema up to date.
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    /// Number of stored reports.
    pub async fn count(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn put(&self, report: &SignedReport) -> Result<(), StoreError> {
        let identity = report.identity();
        let bytes = report
            .to_vec()
            .map_err(|e| StoreError::write(identity, e))?;
        let json = String::from_utf8(bytes).map_err(|e| StoreError::write(identity, e))?;
        let updated_at = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO reports (owner, name, report_json, updated_at_u64)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(owner, name) DO UPDATE SET
                report_json = excluded.report_json,
                updated_at_u64 = excluded.updated_at_u64
            "#,
        )
        .bind(identity.owner())
        .bind(identity.name())
        .bind(json)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::write(identity, e))?;

        Ok(())
    }

    async fn get(&self, identity: &RepositoryIdentity) -> Result<Option<SignedReport>, StoreError> {
        let row: Option<String> = sqlx::query_scalar(
            r#"
            SELECT report_json
            FROM reports
            WHERE owner = ? AND name = ?
            LIMIT 1
            "#,
        )
        .bind(identity.owner())
        .bind(identity.name())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::read(identity, e))?;

        row.map(|json| decode_record(identity, json.as_bytes()))
            .transpose()
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn close(&self) {
        info!("Closing report database");
        self.pool.close().await;
    }
}
