//! Tenant model.
//!
//! A tenant is an opaque record owned by the application's persistence layer.
//! Sprout only needs its public identifier and its primary key, plus the
//! optional resources capability used to namespace tenant-specific paths.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A tenant's primary key. Integer or string, depending on the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TenantKey {
    /// Integer primary key
    Int(i64),
    /// String primary key (uuid, ulid, slug)
    Str(String),
}

impl TenantKey {
    /// Convert into a JSON value, for record lookups.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(key) => serde_json::Value::from(*key),
            Self::Str(key) => serde_json::Value::from(key.clone()),
        }
    }

    /// Build a key from a JSON value, if the value is a usable key type.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        if let Some(key) = value.as_i64() {
            Some(Self::Int(key))
        } else {
            value.as_str().map(|key| Self::Str(key.to_string()))
        }
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(key) => write!(f, "{key}"),
            Self::Str(key) => write!(f, "{key}"),
        }
    }
}

impl From<i64> for TenantKey {
    fn from(key: i64) -> Self {
        Self::Int(key)
    }
}

impl From<&str> for TenantKey {
    fn from(key: &str) -> Self {
        Self::Str(key.to_string())
    }
}

impl From<String> for TenantKey {
    fn from(key: String) -> Self {
        Self::Str(key)
    }
}

/// Contract for tenant records.
///
/// Applications either implement this on their own entity type or use
/// [`GenericTenant`] for raw-table-backed tenants.
pub trait Tenant: Send + Sync + fmt::Debug {
    /// The tenant's public identifier (subdomain label, slug, header value).
    fn identifier(&self) -> &str;

    /// The name of the identifier attribute/column.
    fn identifier_name(&self) -> &str {
        "identifier"
    }

    /// The tenant's primary key.
    fn key(&self) -> TenantKey;

    /// The name of the key attribute/column.
    fn key_name(&self) -> &str {
        "id"
    }

    /// The resources capability, when this tenant owns namespaced resources.
    fn resources(&self) -> Option<&dyn TenantResources> {
        None
    }
}

/// Capability for tenants that own namespaced resources (files, cache paths).
pub trait TenantResources: Send + Sync {
    /// The key used to namespace this tenant's resource paths.
    fn resource_key(&self) -> &str;

    /// The name of the resource-key attribute/column.
    fn resource_key_name(&self) -> &str {
        "resource_key"
    }
}

/// Row-backed tenant value object.
///
/// # Examples
///
/// ```
/// use sprout_core::{GenericTenant, Tenant};
///
/// let tenant = GenericTenant::new("acme", 7).with_resource_key("acme-files");
/// assert_eq!(tenant.identifier(), "acme");
/// assert!(tenant.resources().is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericTenant {
    identifier: String,
    key: TenantKey,
    resource_key: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

impl GenericTenant {
    /// Create a new tenant value object.
    pub fn new(identifier: impl Into<String>, key: impl Into<TenantKey>) -> Self {
        Self {
            identifier: identifier.into(),
            key: key.into(),
            resource_key: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the resource key, enabling the resources capability.
    pub fn with_resource_key(mut self, resource_key: impl Into<String>) -> Self {
        self.resource_key = Some(resource_key.into());
        self
    }

    /// Attach a metadata value.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata attached to this tenant.
    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }
}

impl Tenant for GenericTenant {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn key(&self) -> TenantKey {
        self.key.clone()
    }

    fn resources(&self) -> Option<&dyn TenantResources> {
        self.resource_key
            .as_ref()
            .map(|_| self as &dyn TenantResources)
    }
}

impl TenantResources for GenericTenant {
    fn resource_key(&self) -> &str {
        self.resource_key.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(TenantKey::from(7).to_string(), "7");
        assert_eq!(TenantKey::from("acme").to_string(), "acme");
    }

    #[test]
    fn test_key_from_json() {
        assert_eq!(
            TenantKey::from_json(&serde_json::json!(7)),
            Some(TenantKey::Int(7))
        );
        assert_eq!(
            TenantKey::from_json(&serde_json::json!("acme")),
            Some(TenantKey::Str("acme".to_string()))
        );
        assert_eq!(TenantKey::from_json(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_resources_requires_resource_key() {
        let plain = GenericTenant::new("acme", 7);
        assert!(plain.resources().is_none());

        let resourced = GenericTenant::new("acme", 7).with_resource_key("acme-files");
        let resources = resourced.resources().unwrap();
        assert_eq!(resources.resource_key(), "acme-files");
    }

    #[test]
    fn test_metadata_builder() {
        let tenant = GenericTenant::new("acme", 7).with_metadata("plan", "enterprise");
        assert_eq!(
            tenant.metadata().get("plan"),
            Some(&serde_json::json!("enterprise"))
        );
    }
}
