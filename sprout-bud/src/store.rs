//! The config store contract.

use crate::error::BudResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sprout_core::TenantKey;

/// A stored config value: a JSON object of driver settings.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Unique key of a stored config entry.
///
/// The (tenancy, tenant, service, name) tuple is the entire identity of an
/// entry; stores must treat it as a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    /// Tenancy name
    pub tenancy: String,
    /// Tenant primary key
    pub tenant: TenantKey,
    /// Service the config belongs to (e.g. "database", "mail")
    pub service: String,
    /// Driver name within the service (e.g. "primary")
    pub name: String,
}

impl ConfigKey {
    /// Build a key.
    pub fn new(
        tenancy: impl Into<String>,
        tenant: impl Into<TenantKey>,
        service: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            tenancy: tenancy.into(),
            tenant: tenant.into(),
            service: service.into(),
            name: name.into(),
        }
    }

    /// Deterministic relative path for filesystem-backed stores.
    ///
    /// Each component is sanitised so key parts can never escape the store's
    /// base directory.
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}/{}.json",
            sanitize(&self.tenancy),
            sanitize(&self.tenant.to_string()),
            sanitize(&self.service),
            sanitize(&self.name),
        )
    }
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Per-tenant keyed config storage.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The store's configured name.
    fn name(&self) -> &str;

    /// Fetch the entry for a key, if one exists.
    async fn get(&self, key: &ConfigKey) -> BudResult<Option<ConfigMap>>;

    /// Whether an entry exists for a key.
    async fn has(&self, key: &ConfigKey) -> BudResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Insert or overwrite the entry for a key. Always succeeds.
    async fn set(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<bool>;

    /// Insert the entry for a key only if absent.
    ///
    /// Returns `false` (and changes nothing) when an entry already exists.
    async fn add(&self, key: &ConfigKey, config: &ConfigMap) -> BudResult<bool>;
}

impl std::fmt::Debug for dyn ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_is_deterministic() {
        let key = ConfigKey::new("primary", 7, "mailer", "default");
        assert_eq!(key.relative_path(), "primary/7/mailer/default.json");
    }

    #[test]
    fn test_relative_path_sanitises_components() {
        let key = ConfigKey::new("pri/mary", "a:b", "mailer", "../escape");
        assert_eq!(key.relative_path(), "pri-mary/a-b/mailer/---escape.json");
    }
}
