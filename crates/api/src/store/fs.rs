//! Filesystem report store.

use anyhow::Context;
use astrobadge_core::{RepositoryIdentity, SignedReport};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::{decode_record, ReportStore, StoreError};

/// Report store keeping one JSON file per repository in a directory.
///
/// Files are named `<owner>-<name>.json`, with `-` and `%` escaped inside each part. Writes go to a uniquely named temp file in the
/// same directory, are synced, then renamed over the target, so concurrent writers for the
/// same identity never interleave and readers never see a partial file.
#[derive(Debug, Clone)]
pub struct FsReportStore {
    dir: PathBuf,
}

impl FsReportStore {
    /// Open (creating if needed) the report directory.
    pub async fn open<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;
        info!("Using report directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Directory holding the reports.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn report_path(&self, identity: &RepositoryIdentity) -> PathBuf {
        self.dir.join(format!("{}.json", identity.storage_key()))
    }

    fn temp_path(&self, identity: &RepositoryIdentity) -> PathBuf {
        self.dir.join(format!(
            ".{}.{}.tmp",
            identity.storage_key(),
            uuid::Uuid::new_v4().simple()
        ))
    }

    async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn put(&self, report: &SignedReport) -> Result<(), StoreError> {
        let identity = report.identity();
        let bytes = report
            .to_vec()
            .map_err(|e| StoreError::write(identity, e))?;

        let temp_path = self.temp_path(identity);
        if let Err(e) = Self::write_synced(&temp_path, &bytes).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove temp file {}: {}", temp_path.display(), cleanup);
                }
            }
            return Err(StoreError::write(identity, e));
        }

        if let Err(e) = fs::rename(&temp_path, self.report_path(identity)).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                warn!("Failed to remove temp file {}: {}", temp_path.display(), cleanup);
            }
            return Err(StoreError::write(identity, e));
        }

        Ok(())
    }

    async fn get(&self, identity: &RepositoryIdentity) -> Result<Option<SignedReport>, StoreError> {
        match fs::read(self.report_path(identity)).await {
            Ok(bytes) => decode_record(identity, &bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::read(identity, e)),
        }
    }

    fn backend(&self) -> &'static str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrobadge_core::TrustPercent;
    use serde_json::json;
    use tempfile::TempDir;

    fn report(owner: &str, name: &str, overall: f64) -> SignedReport {
        SignedReport::from_document(json!({
            "repositoryOwner": owner,
            "repositoryName": name,
            "factors": { "overall": { "trustPercent": overall } },
            "extra": "kept"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FsReportStore::open(temp.path().join("reports")).await.unwrap();
        let stored = report("ullaakut", "astronomer", 0.45);

        store.put(&stored).await.unwrap();
        assert!(store.dir().join("ullaakut-astronomer.json").exists());

        let loaded = store.get(stored.identity()).await.unwrap().unwrap();
        assert_eq!(loaded.overall(), Some(TrustPercent::new(0.45)));
        assert_eq!(loaded.document()["extra"], "kept");
    }

    #[tokio::test]
    async fn test_missing_report_is_none() {
        let temp = TempDir::new().unwrap();
        let store = FsReportStore::open(temp.path()).await.unwrap();
        let id = RepositoryIdentity::new("nobody", "nothing").unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = FsReportStore::open(temp.path()).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.put(&report("o", "n", i as f64 / 10.0)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let id = RepositoryIdentity::new("o", "n").unwrap();
        let loaded = store.get(&id).await.unwrap().unwrap();
        let p = loaded.overall().unwrap().value();
        assert!((0.0..=0.9).contains(&p));

        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["o-n.json".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_read_failure() {
        let temp = TempDir::new().unwrap();
        let store = FsReportStore::open(temp.path()).await.unwrap();
        std::fs::write(temp.path().join("o-n.json"), b"{\"repositoryOwner\":").unwrap();

        let id = RepositoryIdentity::new("o", "n").unwrap();
        assert!(matches!(store.get(&id).await, Err(StoreError::Read { .. })));
    }

    #[tokio::test]
    async fn test_hyphenated_identities_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let store = FsReportStore::open(temp.path()).await.unwrap();
        store.put(&report("a-b", "c", 0.1)).await.unwrap();
        store.put(&report("a", "b-c", 0.9)).await.unwrap();

        let first = RepositoryIdentity::new("a-b", "c").unwrap();
        let second = RepositoryIdentity::new("a", "b-c").unwrap();
        assert_eq!(
            store.get(&first).await.unwrap().unwrap().overall(),
            Some(TrustPercent::new(0.1))
        );
        assert_eq!(
            store.get(&second).await.unwrap().unwrap().overall(),
            Some(TrustPercent::new(0.9))
        );
        assert!(temp.path().join("a%2Db-c.json").exists());
        assert!(temp.path().join("a-b%2Dc.json").exists());
    }

    #[tokio::test]
    async fn test_misplaced_record_is_read_failure() {
        let temp = TempDir::new().unwrap();
        let store = FsReportStore::open(temp.path()).await.unwrap();
        store.put(&report("a", "b", 0.9)).await.unwrap();
        std::fs::rename(temp.path().join("a-b.json"), temp.path().join("x-y.json")).unwrap();

        let other = RepositoryIdentity::new("x", "y").unwrap();
        assert!(matches!(store.get(&other).await, Err(StoreError::Read { .. })));
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let store = FsReportStore::open(temp.path().join("reports")).await.unwrap();
        std::fs::remove_dir_all(store.dir()).unwrap();

        let err = store.put(&report("o", "n", 0.5)).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }
}
