//! Tenant providers.
//!
//! Providers resolve tenant records by identifier, key, or resource key from
//! a backing store. The store itself is application-owned: raw-table-backed
//! providers fetch rows through [`TenantSource`], model-backed providers
//! delegate to a [`TenantEntityStore`]. Lookups that find nothing return
//! `None`; only structural problems (a tenant type without the resources
//! capability, an unusable row) are errors.

use crate::error::{SproutError, SproutResult};
use crate::tenant::{GenericTenant, Tenant, TenantKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A raw tenant row, as produced by an application's table layer.
pub type TenantRecord = serde_json::Map<String, serde_json::Value>;

/// Contract for resolving tenants from a backing store.
#[async_trait]
pub trait TenantProvider: Send + Sync {
    /// The provider's registered name.
    fn name(&self) -> &str;

    /// Find a tenant by its public identifier.
    async fn retrieve_by_identifier(
        &self,
        identifier: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>>;

    /// Find a tenant by its primary key.
    async fn retrieve_by_key(&self, key: &TenantKey) -> SproutResult<Option<Arc<dyn Tenant>>>;

    /// Find a tenant by its resource key.
    ///
    /// Errors with a misconfiguration when the provider's tenant type does
    /// not carry the resources capability; plain absence is `None`.
    async fn retrieve_by_resource_key(
        &self,
        resource_key: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>>;
}

/// Row source for [`TableTenantProvider`].
///
/// Applications implement this with their database layer of choice.
#[async_trait]
pub trait TenantSource: Send + Sync {
    /// Fetch a single row where `column` equals `value`.
    async fn find_by(
        &self,
        column: &str,
        value: &serde_json::Value,
    ) -> SproutResult<Option<TenantRecord>>;
}

/// Column mapping for raw-table-backed tenants.
#[derive(Debug, Clone)]
pub struct TenantColumns {
    /// Column holding the public identifier
    pub identifier: String,
    /// Column holding the primary key
    pub key: String,
    /// Column holding the resource key, when the table has one
    pub resource_key: Option<String>,
}

impl Default for TenantColumns {
    fn default() -> Self {
        Self {
            identifier: "identifier".to_string(),
            key: "id".to_string(),
            resource_key: None,
        }
    }
}

/// Raw-table-backed tenant provider.
///
/// Materialises a [`GenericTenant`] from each row the [`TenantSource`]
/// returns, using the configured column mapping.
pub struct TableTenantProvider {
    name: String,
    source: Arc<dyn TenantSource>,
    columns: TenantColumns,
}

impl TableTenantProvider {
    /// Create a provider over the given row source.
    pub fn new(name: impl Into<String>, source: Arc<dyn TenantSource>) -> Self {
        Self {
            name: name.into(),
            source,
            columns: TenantColumns::default(),
        }
    }

    /// Use a custom column mapping.
    pub fn with_columns(mut self, columns: TenantColumns) -> Self {
        self.columns = columns;
        self
    }

    fn hydrate(&self, record: TenantRecord) -> SproutResult<Arc<dyn Tenant>> {
        let identifier = record
            .get(&self.columns.identifier)
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                SproutError::misconfigured(
                    "tenant provider",
                    &self.name,
                    format!("row is missing identifier column [{}]", self.columns.identifier),
                )
            })?
            .to_string();

        let key = record
            .get(&self.columns.key)
            .and_then(TenantKey::from_json)
            .ok_or_else(|| {
                SproutError::misconfigured(
                    "tenant provider",
                    &self.name,
                    format!("row is missing key column [{}]", self.columns.key),
                )
            })?;

        let mut tenant = GenericTenant::new(identifier, key);

        if let Some(column) = &self.columns.resource_key {
            if let Some(resource_key) = record.get(column).and_then(|value| value.as_str()) {
                tenant = tenant.with_resource_key(resource_key);
            }
        }

        Ok(Arc::new(tenant))
    }
}

#[async_trait]
impl TenantProvider for TableTenantProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve_by_identifier(
        &self,
        identifier: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>> {
        let record = self
            .source
            .find_by(&self.columns.identifier, &serde_json::Value::from(identifier))
            .await?;

        record.map(|record| self.hydrate(record)).transpose()
    }

    async fn retrieve_by_key(&self, key: &TenantKey) -> SproutResult<Option<Arc<dyn Tenant>>> {
        let record = self.source.find_by(&self.columns.key, &key.to_json()).await?;

        record.map(|record| self.hydrate(record)).transpose()
    }

    async fn retrieve_by_resource_key(
        &self,
        resource_key: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>> {
        let column = self.columns.resource_key.as_ref().ok_or_else(|| {
            SproutError::misconfigured(
                "tenant provider",
                &self.name,
                "tenant type does not have the resources capability",
            )
        })?;

        let record = self
            .source
            .find_by(column, &serde_json::Value::from(resource_key))
            .await?;

        record.map(|record| self.hydrate(record)).transpose()
    }
}

/// Entity store for [`EntityTenantProvider`].
///
/// Applications implement this with their model/ORM layer and return their
/// native tenant type.
#[async_trait]
pub trait TenantEntityStore: Send + Sync {
    /// Find a tenant entity by its public identifier.
    async fn find_by_identifier(&self, identifier: &str)
        -> SproutResult<Option<Arc<dyn Tenant>>>;

    /// Find a tenant entity by its primary key.
    async fn find_by_key(&self, key: &TenantKey) -> SproutResult<Option<Arc<dyn Tenant>>>;

    /// Find a tenant entity by its resource key.
    async fn find_by_resource_key(
        &self,
        resource_key: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>>;
}

/// Model-backed tenant provider, delegating to the application's entity store.
pub struct EntityTenantProvider {
    name: String,
    store: Arc<dyn TenantEntityStore>,
}

impl EntityTenantProvider {
    /// Create a provider over the given entity store.
    pub fn new(name: impl Into<String>, store: Arc<dyn TenantEntityStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }
}

#[async_trait]
impl TenantProvider for EntityTenantProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve_by_identifier(
        &self,
        identifier: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>> {
        self.store.find_by_identifier(identifier).await
    }

    async fn retrieve_by_key(&self, key: &TenantKey) -> SproutResult<Option<Arc<dyn Tenant>>> {
        self.store.find_by_key(key).await
    }

    async fn retrieve_by_resource_key(
        &self,
        resource_key: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>> {
        let tenant = self.store.find_by_resource_key(resource_key).await?;

        if let Some(tenant) = &tenant {
            if tenant.resources().is_none() {
                return Err(SproutError::misconfigured(
                    "tenant provider",
                    &self.name,
                    "tenant type does not have the resources capability",
                ));
            }
        }

        Ok(tenant)
    }
}

/// Opt-in caching wrapper around a provider.
///
/// The only Sprout state intended to survive across units of work. Cached
/// records are read-mostly; writes to the backing store are the
/// application's concern.
pub struct CachedTenantProvider {
    inner: Arc<dyn TenantProvider>,
    by_identifier: RwLock<HashMap<String, Arc<dyn Tenant>>>,
    by_key: RwLock<HashMap<TenantKey, Arc<dyn Tenant>>>,
}

impl CachedTenantProvider {
    /// Wrap a provider with caching.
    pub fn new(inner: Arc<dyn TenantProvider>) -> Self {
        Self {
            inner,
            by_identifier: RwLock::new(HashMap::new()),
            by_key: RwLock::new(HashMap::new()),
        }
    }

    async fn remember(&self, tenant: &Arc<dyn Tenant>) {
        self.by_identifier
            .write()
            .await
            .insert(tenant.identifier().to_string(), Arc::clone(tenant));
        self.by_key
            .write()
            .await
            .insert(tenant.key(), Arc::clone(tenant));
    }

    /// Drop every cached tenant record.
    pub async fn clear(&self) {
        self.by_identifier.write().await.clear();
        self.by_key.write().await.clear();
        debug!(provider = self.inner.name(), "cleared tenant cache");
    }
}

#[async_trait]
impl TenantProvider for CachedTenantProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn retrieve_by_identifier(
        &self,
        identifier: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>> {
        if let Some(tenant) = self.by_identifier.read().await.get(identifier) {
            return Ok(Some(Arc::clone(tenant)));
        }

        let tenant = self.inner.retrieve_by_identifier(identifier).await?;
        if let Some(tenant) = &tenant {
            self.remember(tenant).await;
        }

        Ok(tenant)
    }

    async fn retrieve_by_key(&self, key: &TenantKey) -> SproutResult<Option<Arc<dyn Tenant>>> {
        if let Some(tenant) = self.by_key.read().await.get(key) {
            return Ok(Some(Arc::clone(tenant)));
        }

        let tenant = self.inner.retrieve_by_key(key).await?;
        if let Some(tenant) = &tenant {
            self.remember(tenant).await;
        }

        Ok(tenant)
    }

    async fn retrieve_by_resource_key(
        &self,
        resource_key: &str,
    ) -> SproutResult<Option<Arc<dyn Tenant>>> {
        // Resource-key lookups are rare enough to always hit the backing store.
        self.inner.retrieve_by_resource_key(resource_key).await
    }
}

/// Registry of tenant providers, keyed by name.
///
/// Cached providers are tracked separately so the admin cache-clear
/// operation can reach them.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: parking_lot::RwLock<HashMap<String, Arc<dyn TenantProvider>>>,
    cached: parking_lot::RwLock<HashMap<String, Arc<CachedTenantProvider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name.
    pub fn register(&self, provider: Arc<dyn TenantProvider>) {
        self.providers
            .write()
            .insert(provider.name().to_string(), provider);
    }

    /// Register a provider wrapped with the caching layer.
    pub fn register_cached(&self, provider: Arc<dyn TenantProvider>) {
        let cached = Arc::new(CachedTenantProvider::new(provider));
        self.cached
            .write()
            .insert(cached.name().to_string(), Arc::clone(&cached));
        self.providers
            .write()
            .insert(cached.name().to_string(), cached);
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn TenantProvider>> {
        self.providers.read().get(name).cloned()
    }

    /// Names of every provider registered with caching.
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cached.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Clear one provider's tenant cache, or every cached provider's.
    ///
    /// Naming a provider that is not registered with caching is a
    /// misconfiguration error.
    pub async fn clear_cache(&self, provider: Option<&str>) -> SproutResult<Vec<String>> {
        match provider {
            Some(name) => {
                let cached = self.cached.read().get(name).cloned().ok_or_else(|| {
                    SproutError::misconfigured(
                        "tenant provider",
                        name,
                        "is not registered with caching",
                    )
                })?;
                cached.clear().await;
                Ok(vec![name.to_string()])
            }
            None => {
                let cached: Vec<(String, Arc<CachedTenantProvider>)> = self
                    .cached
                    .read()
                    .iter()
                    .map(|(name, provider)| (name.clone(), Arc::clone(provider)))
                    .collect();
                let mut cleared = Vec::with_capacity(cached.len());
                for (name, provider) in cached {
                    provider.clear().await;
                    cleared.push(name);
                }
                cleared.sort();
                Ok(cleared)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapSource {
        rows: Vec<TenantRecord>,
        lookups: AtomicUsize,
    }

    impl MapSource {
        fn new(rows: Vec<TenantRecord>) -> Self {
            Self {
                rows,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TenantSource for MapSource {
        async fn find_by(
            &self,
            column: &str,
            value: &serde_json::Value,
        ) -> SproutResult<Option<TenantRecord>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .rows
                .iter()
                .find(|row| row.get(column) == Some(value))
                .cloned())
        }
    }

    fn acme_row() -> TenantRecord {
        serde_json::json!({"id": 7, "identifier": "acme", "resource_key": "acme-files"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_table_provider_hydrates_rows() {
        let source = Arc::new(MapSource::new(vec![acme_row()]));
        let provider = TableTenantProvider::new("tenants", source).with_columns(TenantColumns {
            resource_key: Some("resource_key".to_string()),
            ..TenantColumns::default()
        });

        let tenant = provider
            .retrieve_by_identifier("acme")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tenant.identifier(), "acme");
        assert_eq!(tenant.key(), TenantKey::Int(7));
        assert!(tenant.resources().is_some());

        let missing = provider.retrieve_by_identifier("globex").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_table_provider_resource_key_requires_column() {
        let source = Arc::new(MapSource::new(vec![acme_row()]));
        let provider = TableTenantProvider::new("tenants", source);

        let err = provider
            .retrieve_by_resource_key("acme-files")
            .await
            .unwrap_err();
        assert!(matches!(err, SproutError::Misconfiguration { .. }));
    }

    #[tokio::test]
    async fn test_cached_provider_hits_source_once() {
        let source = Arc::new(MapSource::new(vec![acme_row()]));
        let lookups = Arc::clone(&source);
        let provider = CachedTenantProvider::new(Arc::new(TableTenantProvider::new(
            "tenants",
            source,
        )));

        provider.retrieve_by_identifier("acme").await.unwrap();
        provider.retrieve_by_identifier("acme").await.unwrap();
        assert_eq!(lookups.lookups.load(Ordering::SeqCst), 1);

        // Identifier lookup primes the key index too.
        provider
            .retrieve_by_key(&TenantKey::Int(7))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lookups.lookups.load(Ordering::SeqCst), 1);

        provider.clear().await;
        provider.retrieve_by_identifier("acme").await.unwrap();
        assert_eq!(lookups.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_registry_clear_cache_by_name() {
        let registry = ProviderRegistry::new();
        let source = Arc::new(MapSource::new(vec![acme_row()]));
        registry.register_cached(Arc::new(TableTenantProvider::new("tenants", source)));

        let cleared = registry.clear_cache(Some("tenants")).await.unwrap();
        assert_eq!(cleared, vec!["tenants".to_string()]);

        let err = registry.clear_cache(Some("unknown")).await.unwrap_err();
        assert!(matches!(err, SproutError::Misconfiguration { .. }));
    }
}
