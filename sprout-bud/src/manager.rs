//! The Bud store manager.

use crate::cyclic::DriverGuard;
use crate::error::BudResult;
use crate::store::{ConfigKey, ConfigMap, ConfigStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sprout_core::{SproutError, Tenancy};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Bud configuration: named stores and the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudConfig {
    /// Store used when a service names none
    pub default_store: Option<String>,

    /// Configured stores, keyed by name
    #[serde(default)]
    pub stores: BTreeMap<String, StoreConfig>,
}

/// Per-store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store driver: `database` or `filesystem`
    pub driver: String,

    /// Table name, for the database driver
    pub table: Option<String>,

    /// Base directory, for the filesystem driver
    pub disk: Option<String>,

    /// Scoped sub-directory, for the filesystem driver; defaults to the
    /// store name
    pub prefix: Option<String>,

    /// Whether blobs are protected with the configured cipher
    #[serde(default)]
    pub encrypted: bool,
}

/// Factory building a store from its name and config entry.
pub type StoreFactory =
    Arc<dyn Fn(&str, &StoreConfig) -> BudResult<Arc<dyn ConfigStore>> + Send + Sync>;

/// Resolves named config stores and shares the cyclic-driver guard.
pub struct BudManager {
    config: BudConfig,
    factories: RwLock<HashMap<String, StoreFactory>>,
    stores: RwLock<HashMap<String, Arc<dyn ConfigStore>>>,
    guard: Arc<DriverGuard>,
}

impl BudManager {
    /// Create a manager for the given config.
    pub fn new(config: BudConfig) -> Self {
        Self {
            config,
            factories: RwLock::new(HashMap::new()),
            stores: RwLock::new(HashMap::new()),
            guard: Arc::new(DriverGuard::new()),
        }
    }

    /// Register a store driver.
    pub fn register_driver(&self, driver: impl Into<String>, factory: StoreFactory) {
        self.factories.write().insert(driver.into(), factory);
    }

    /// The cyclic-driver guard shared by every creator using this manager.
    pub fn guard(&self) -> Arc<DriverGuard> {
        Arc::clone(&self.guard)
    }

    /// Resolve a store by name, or the default store.
    ///
    /// Stores are built lazily from config on first use. An unknown store
    /// name or driver is a misconfiguration error.
    pub fn store(&self, name: Option<&str>) -> BudResult<Arc<dyn ConfigStore>> {
        let name = match name {
            Some(name) => name,
            None => self
                .config
                .default_store
                .as_deref()
                .ok_or_else(|| SproutError::no_default("config store"))?,
        };

        if let Some(store) = self.stores.read().get(name) {
            return Ok(Arc::clone(store));
        }

        let store_config = self.config.stores.get(name).ok_or_else(|| {
            SproutError::misconfigured("config store", name, "is not configured")
        })?;

        let factory = self
            .factories
            .read()
            .get(&store_config.driver)
            .cloned()
            .ok_or_else(|| {
                SproutError::unknown_driver("config store", name, &store_config.driver)
            })?;

        let store = factory(name, store_config)?;
        self.stores
            .write()
            .insert(name.to_string(), Arc::clone(&store));

        Ok(store)
    }

    /// Fetch the stored config for a tenancy's active tenant.
    ///
    /// Errors with a distinct tenant-missing error when the tenancy has no
    /// active tenant; a tenancy-missing error is the caller's concern (it
    /// knows whether there was a tenancy at all).
    pub async fn tenant_config(
        &self,
        tenancy: &Tenancy,
        store: Option<&str>,
        service: &str,
        name: &str,
    ) -> BudResult<Option<ConfigMap>> {
        let key = ConfigKey::new(tenancy.name(), tenancy.key()?, service, name);
        self.store(store)?.get(&key).await
    }
}

/// In-memory store, for tests and ephemeral setups.
#[derive(Default)]
pub struct MemoryConfigStore {
    name: String,
    entries: RwLock<HashMap<ConfigKey, ConfigMap>>,
}

impl MemoryConfigStore {
    /// Create an empty in-memory store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &ConfigKey) -> BudResult<Option<ConfigMap>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<bool> {
        self.entries.write().insert(key.clone(), config.clone());
        Ok(true)
    }

    async fn add(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<bool> {
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.clone(), config.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BudError;

    fn manager_with_memory_store() -> BudManager {
        let mut config = BudConfig::default();
        config.default_store = Some("tenants".to_string());
        config.stores.insert(
            "tenants".to_string(),
            StoreConfig {
                driver: "memory".to_string(),
                ..StoreConfig::default()
            },
        );

        let manager = BudManager::new(config);
        manager.register_driver(
            "memory",
            Arc::new(|name: &str, _config: &StoreConfig| {
                Ok(Arc::new(MemoryConfigStore::new(name)) as Arc<dyn ConfigStore>)
            }),
        );
        manager
    }

    #[tokio::test]
    async fn test_store_resolution_is_cached() {
        let manager = manager_with_memory_store();

        let first = manager.store(None).unwrap();
        let second = manager.store(Some("tenants")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_store_and_driver_errors() {
        let manager = manager_with_memory_store();

        let err = manager.store(Some("missing")).unwrap_err();
        assert!(err.to_string().contains("missing"));

        let mut config = BudConfig::default();
        config.stores.insert(
            "odd".to_string(),
            StoreConfig {
                driver: "carrier-pigeon".to_string(),
                ..StoreConfig::default()
            },
        );
        let manager = BudManager::new(config);
        let err = manager.store(Some("odd")).unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_no_default_store_is_misconfiguration() {
        let manager = BudManager::new(BudConfig::default());
        let err = manager.store(None).unwrap_err();
        assert!(matches!(
            err,
            BudError::Sprout(SproutError::Misconfiguration { .. })
        ));
    }
}
