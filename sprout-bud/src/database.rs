//! Database-backed config store.
//!
//! One row per unique (tenancy, tenant, service, name) tuple. The actual
//! table access goes through the narrow [`ConfigRecordSource`] trait, which
//! applications implement with their database layer; the row schema
//! (serialized blob plus timestamps) is owned by the application's
//! migrations.

use crate::cipher::{decode_blob, encode_blob, ConfigCipher};
use crate::error::BudResult;
use crate::manager::{StoreConfig, StoreFactory};
use crate::store::{ConfigKey, ConfigMap, ConfigStore};
use async_trait::async_trait;
use sprout_core::SproutError;
use std::sync::Arc;
use tracing::debug;

/// Row access for [`DatabaseConfigStore`].
#[async_trait]
pub trait ConfigRecordSource: Send + Sync {
    /// Fetch the blob stored for a key, if any.
    async fn select(&self, table: &str, key: &ConfigKey) -> BudResult<Option<String>>;

    /// Insert a row for a key; returns `false` without writing when a row
    /// already exists for the key.
    async fn insert(&self, table: &str, key: &ConfigKey, blob: &str) -> BudResult<bool>;

    /// Insert or update the row for a key.
    async fn upsert(&self, table: &str, key: &ConfigKey, blob: &str) -> BudResult<()>;
}

/// Config store persisting entries as table rows.
pub struct DatabaseConfigStore {
    name: String,
    table: String,
    source: Arc<dyn ConfigRecordSource>,
    cipher: Option<Arc<dyn ConfigCipher>>,
}

impl DatabaseConfigStore {
    /// Create a store writing to the given table.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        source: Arc<dyn ConfigRecordSource>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            source,
            cipher: None,
        }
    }

    /// Protect blobs with a cipher before they reach the table.
    pub fn with_cipher(mut self, cipher: Arc<dyn ConfigCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Store factory for the `database` driver.
    ///
    /// The `table` config key is required; marking the store `encrypted`
    /// without supplying a cipher is a misconfiguration.
    pub fn factory(
        source: Arc<dyn ConfigRecordSource>,
        cipher: Option<Arc<dyn ConfigCipher>>,
    ) -> StoreFactory {
        Arc::new(move |name: &str, config: &StoreConfig| {
            let table = config
                .table
                .clone()
                .ok_or_else(|| SproutError::missing_config("config store", name, "table"))?;

            let mut store = DatabaseConfigStore::new(name, table, Arc::clone(&source));

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
}

#[async_trait]
impl ConfigStore for DatabaseConfigStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &ConfigKey) -> BudResult<Option<ConfigMap>> {
        let blob = self.source.select(&self.table, key).await?;
        blob.map(|blob| decode_blob(self.cipher.as_ref(), &blob))
            .transpose()
    }

    async fn set(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<bool> {
        let blob = encode_blob(self.cipher.as_ref(), config)?;
        self.source.upsert(&self.table, key, &blob).await?;
        debug!(store = %self.name, service = %key.service, name = %key.name, "stored config entry");
        Ok(true)
    }

    async fn add(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<bool> {
        let blob = encode_blob(self.cipher.as_ref(), config)?;
        self.source.insert(&self.table, key, &blob).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemorySource {
        rows: Mutex<HashMap<(String, ConfigKey), String>>,
    }

    #[async_trait]
    impl ConfigRecordSource for MemorySource {
        async fn select(&self, table: &str, key: &ConfigKey) -> BudResult<Option<String>> {
            Ok(self
                .rows
                .lock()
                .get(&(table.to_string(), key.clone()))
                .cloned())
        }

        async fn insert(&self, table: &str, key: &ConfigKey, blob: &str) -> BudResult<bool> {
            let mut rows = self.rows.lock();
            let row_key = (table.to_string(), key.clone());
            if rows.contains_key(&row_key) {
                return Ok(false);
            }
            rows.insert(row_key, blob.to_string());
            Ok(true)
        }

        async fn upsert(&self, table: &str, key: &ConfigKey, blob: &str) -> BudResult<()> {
            self.rows
                .lock()
                .insert((table.to_string(), key.clone()), blob.to_string());
            Ok(())
        }
    }

    fn mailer_config() -> ConfigMap {
        serde_json::json!({"transport": "smtp"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_set_add() {
        let store = DatabaseConfigStore::new("tenants", "tenant_config", Arc::new(MemorySource::default()));
        let key = ConfigKey::new("primary", 7, "mailer", "default");

        assert!(store.get(&key).await.unwrap().is_none());
        assert!(!store.has(&key).await.unwrap());

        assert!(store.add(&key, &mailer_config()).await.unwrap());
        assert!(!store.add(&key, &mailer_config()).await.unwrap());

        let mut updated = mailer_config();
        updated.insert("port".to_string(), serde_json::json!(2525));
        assert!(store.set(&key, &updated).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_factory_requires_table() {
        let factory = DatabaseConfigStore::factory(Arc::new(MemorySource::default()), None);
        let config = StoreConfig {
            driver: "database".to_string(),
            ..StoreConfig::default()
        };

        let err = factory("tenants", &config).unwrap_err();
        assert!(err.to_string().contains("table"));
    }
}
