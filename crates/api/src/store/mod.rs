//! Report storage.
//!
//! One durable record per repository identity, overwritten on every successful ingest.
//! Backends:
//! - [`SqliteReportStore`] - single-row upsert keyed by `(owner, name)`
//! - [`FsReportStore`] - one `<owner>-<name>.json` file per identity, atomically replaced

use astrobadge_core::{RepositoryIdentity, SignedReport};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::StoreBackend;

pub mod fs;
pub mod sqlite;

pub use fs::FsReportStore;
pub use sqlite::SqliteReportStore;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storage failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The medium rejected the write (permissions, disk full, encoding failure).
    #[error("Failed to store report for {identity}: {source}")]
    Write {
        /// Repository the write was for.
        identity: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// A stored record exists but could not be read back.
    #[error("Failed to read report for {identity}: {source}")]
    Read {
        /// Repository the read was for.
        identity: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub(crate) fn write(identity: &RepositoryIdentity, source: impl Into<BoxError>) -> Self {
        StoreError::Write {
            identity: identity.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn read(identity: &RepositoryIdentity, source: impl Into<BoxError>) -> Self {
        StoreError::Read {
            identity: identity.to_string(),
            source: source.into(),
        }
    }
}

/// Durable, keyed, last-write-wins store of verified reports.
///
/// Writes must be atomic from a reader's point of view: `get` never observes a partially
/// written report. Writes for different identities must not block each other.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist `report` under its identity, replacing any previous report.
    async fn put(&self, report: &SignedReport) -> Result<(), StoreError>;

    /// Latest report for `identity`; `Ok(None)` when none was ever stored.
    async fn get(&self, identity: &RepositoryIdentity) -> Result<Option<SignedReport>, StoreError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Release resources held by the store.
    async fn close(&self) {}
}

/// Open the configured backend.
pub async fn open_store(backend: &StoreBackend) -> anyhow::Result<Arc<dyn ReportStore>> {
    let store: Arc<dyn ReportStore> = match backend {
        StoreBackend::Sqlite { database_url } => {
            Arc::new(SqliteReportStore::connect(database_url).await?)
        }
        StoreBackend::Filesystem { dir } => Arc::new(FsReportStore::open(dir).await?),
    };
    Ok(store)
}

/// Decode a persisted record and make sure it belongs to `identity`.
pub(crate) fn decode_record(
    identity: &RepositoryIdentity,
    bytes: &[u8],
) -> Result<SignedReport, StoreError> {
    let report = SignedReport::from_slice(bytes).map_err(|e| StoreError::read(identity, e))?;
    if report.identity() != identity {
        return Err(StoreError::read(
            identity,
            format!("record belongs to {}", report.identity()),
        ));
    }
    Ok(report)
}
