//! Filesystem-backed config store.
//!
//! One file per (tenancy, tenant, service, name) tuple at a deterministic
//! relative path, under a scoped sub-directory per configured prefix.

use crate::cipher::{decode_blob, encode_blob, ConfigCipher};
use crate::error::BudResult;
use crate::manager::{StoreConfig, StoreFactory};
use crate::store::{ConfigKey, ConfigMap, ConfigStore};
use async_trait::async_trait;
use sprout_core::SproutError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Config store persisting entries as files.
pub struct FilesystemConfigStore {
    name: String,
    base: PathBuf,
    cipher: Option<Arc<dyn ConfigCipher>>,
}

impl FilesystemConfigStore {
    /// Create a store rooted at `disk`, scoped to the `prefix` sub-directory.
    pub fn new(name: impl Into<String>, disk: impl AsRef<Path>, prefix: &str) -> Self {
        Self {
            name: name.into(),
            base: disk.as_ref().join(prefix),
            cipher: None,
        }
    }

    /// Protect blobs with a cipher before they reach disk.
    pub fn with_cipher(mut self, cipher: Arc<dyn ConfigCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Store factory for the `filesystem` driver.
    ///
    /// The `disk` config key is required; the prefix defaults to the store
    /// name. Marking the store `encrypted` without supplying a cipher is a
    /// misconfiguration.
    pub fn factory(cipher: Option<Arc<dyn ConfigCipher>>) -> StoreFactory {
        Arc::new(move |name: &str, config: &StoreConfig| {
            let disk = config
                .disk
                .clone()
                .ok_or_else(|| SproutError::missing_config("config store", name, "disk"))?;

            let prefix = config.prefix.clone().unwrap_or_else(|| name.to_string());
            let mut store = FilesystemConfigStore::new(name, disk, &prefix);

            if config.encrypted {
                let cipher = cipher.clone().ok_or_else(|| {
                    SproutError::misconfigured(
                        "config store",
                        name,
                        "encrypted store requires a cipher",
                    )
                })?;
                store = store.with_cipher(cipher);
            }

            Ok(Arc::new(store) as Arc<dyn ConfigStore>)
        })
    }

    fn path_for(&self, key: &ConfigKey) -> PathBuf {
        self.base.join(key.relative_path())
    }

    async fn write(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let blob = encode_blob(self.cipher.as_ref(), config)?;
        fs::write(&path, blob).await?;

        debug!(store = %self.name, path = %path.display(), "stored config entry");
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FilesystemConfigStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &ConfigKey) -> BudResult<Option<ConfigMap>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(blob) => Ok(Some(decode_blob(self.cipher.as_ref(), &blob)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn has(&self, key: &ConfigKey) -> BudResult<bool> {
        Ok(fs::try_exists(self.path_for(key)).await?)
    }

    async fn set(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<bool> {
        self.write(key, config).await?;
        Ok(true)
    }

    async fn add(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<bool> {
        if self.has(key).await? {
            return Ok(false);
        }

        self.write(key, config).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::SignedBlobCodec;

    fn mailer_config() -> ConfigMap {
        serde_json::json!({"transport": "smtp"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_set_add() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemConfigStore::new("tenants", dir.path(), "tenants");
        let key = ConfigKey::new("primary", 7, "mailer", "primary");

        assert!(store.get(&key).await.unwrap().is_none());

        assert!(store.set(&key, &mailer_config()).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), Some(mailer_config()));
        assert!(store.has(&key).await.unwrap());

        // add is a no-op once an entry exists.
        let mut other = mailer_config();
        other.insert("port".to_string(), serde_json::json!(2525));
        assert!(!store.add(&key, &other).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), Some(mailer_config()));
    }

    #[tokio::test]
    async fn test_files_live_under_the_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemConfigStore::new("tenants", dir.path(), "bud");
        let key = ConfigKey::new("primary", 7, "mailer", "primary");

        store.set(&key, &mailer_config()).await.unwrap();

        let expected = dir.path().join("bud/primary/7/mailer/primary.json");
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_encrypted_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cipher: Arc<dyn ConfigCipher> =
            Arc::new(SignedBlobCodec::new(SignedBlobCodec::generate_key()));
        let store = FilesystemConfigStore::new("tenants", dir.path(), "tenants")
            .with_cipher(Arc::clone(&cipher));
        let key = ConfigKey::new("primary", 7, "mailer", "primary");

        store.set(&key, &mailer_config()).await.unwrap();

        let raw = std::fs::read_to_string(
            dir.path().join("tenants/primary/7/mailer/primary.json"),
        )
        .unwrap();
        assert!(!raw.contains("smtp"));

        assert_eq!(store.get(&key).await.unwrap(), Some(mailer_config()));
    }
}
