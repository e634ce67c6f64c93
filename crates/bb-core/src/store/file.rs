use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{Credentials, UserId},
    errors::Error,
    store::CredentialStore,
    Result,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFileData {
    /// Keyed by the decimal user id (JSON object keys are strings).
    users: BTreeMap<String, Credentials>,
}

/// JSON-file backed store.
///
/// The file is re-read on every call and rewritten atomically (temp file +
/// rename) on every save. It holds secrets, so it is created owner-only (0600). The mutex serializes read-modify-write cycles within
/// this process.
pub struct FileStore {
    path: PathBuf,
    tmp_path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let Some(name) = path.file_name() else {
            return Err(Error::InvalidPath {
                path,
                reason: "credentials file must name a file".to_string(),
            });
        };
        let tmp_path = path.with_file_name(format!("{}.tmp", name.to_string_lossy()));
        Ok(Self {
            path,
            tmp_path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreFileData> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreFileData::default())
            }
            Err(e) => return Err(store_err("read", e)),
        };
        if raw.trim().is_empty() {
            return Ok(StoreFileData::default());
        }
        serde_json::from_str(&raw).map_err(|e| store_err("decode", e))
    }

    async fn write(&self, data: &StoreFileData) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| store_err("write", e))?;
        }
        let json = serde_json::to_string_pretty(data).map_err(|e| store_err("encode", e))?;
        write_private(&self.tmp_path, json.as_bytes())
            .await
            .map_err(|e| store_err("write", e))?;
        tokio::fs::rename(&self.tmp_path, &self.path)
            .await
            .map_err(|e| store_err("write", e))
    }
}

/// Write `bytes` to `path`, readable by the owner only.
///
/// The mode is set explicitly as well, since `mode()` only applies when the file is created.
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut opts = tokio::fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(0o600);

    let mut file = opts.open(path).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn store_err(op: &str, e: impl std::fmt::Display) -> Error {
    Error::Store(format!("credential store {op} failed: {e}"))
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn retrieve(&self, user: UserId) -> Result<Option<Credentials>> {
        let _guard = self.lock.lock().await;
        let data = self.load().await?;
        Ok(data.users.get(&user.0.to_string()).cloned())
    }

    async fn save(&self, user: UserId, creds: &Credentials) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        data.users.insert(user.0.to_string(), creds.clone());
        self.write(&data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("creds.json")).unwrap();
        assert!(store.retrieve(UserId(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_pairs_survive_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/creds.json");

        let store = FileStore::new(&path).unwrap();
        store
            .save(UserId(42), &Credentials::new("12345678900", "mypassword"))
            .await
            .unwrap();
        store
            .save(UserId(-7), &Credentials::new("999", "x"))
            .await
            .unwrap();

        let reopened = FileStore::new(&path).unwrap();
        assert_eq!(
            reopened.retrieve(UserId(42)).await.unwrap(),
            Some(Credentials::new("12345678900", "mypassword"))
        );
        assert_eq!(
            reopened.retrieve(UserId(-7)).await.unwrap(),
            Some(Credentials::new("999", "x"))
        );
        assert!(!dir.path().join("nested/creds.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path).unwrap();
        let err = store.retrieve(UserId(1)).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.user_facing().as_str().contains("decode"));
    }

    #[test]
    fn rejects_paths_without_a_file_name() {
        assert!(matches!(
            FileStore::new("/"),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        // A leftover world-readable temp file must not keep its mode.
        std::fs::write(dir.path().join("creds.json.tmp"), "").unwrap();
        std::fs::set_permissions(
            dir.path().join("creds.json.tmp"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let store = FileStore::new(&path).unwrap();
        store
            .save(UserId(1), &Credentials::new("123", "pw"))
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "mode is {:o}", mode & 0o777);
    }
}
