//! Tenancies.
//!
//! A tenancy is a named space of tenants backed by one provider. It holds
//! the currently-active tenant for the unit of work, plus the options that
//! switch optional behaviours on or off. The only state transition is
//! [`Tenancy::set_tenant`]; setting the tenant that is already active is a
//! no-op and must not re-fire the override lifecycle.

use crate::error::{SproutError, SproutResult};
use crate::hooks::ResolutionHook;
use crate::provider::TenantProvider;
use crate::tenant::{Tenant, TenantKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Option: eagerly hydrate the tenant relation on tenant-owned models.
pub const OPTION_HYDRATE_TENANT_RELATION: &str = "hydrate-tenant-relation";
/// Option: error when a model unrelated to the active tenant is accessed.
pub const OPTION_THROW_IF_NOT_RELATED: &str = "throw-if-not-related";
/// Option: queued jobs dispatched within this tenancy carry the tenant.
pub const OPTION_TENANT_AWARE_JOBS: &str = "tenant-aware-jobs";

/// Outcome of a [`Tenancy::set_tenant`] call.
#[derive(Debug, Clone)]
pub enum TenantChange {
    /// The active tenant did not change; no lifecycle work is required
    Unchanged,
    /// The active tenant changed; `previous` is the outgoing tenant
    Changed {
        /// The tenant that was active before the change, if any
        previous: Option<Arc<dyn Tenant>>,
    },
}

#[derive(Debug, Clone)]
struct Resolution {
    resolver: String,
    hook: ResolutionHook,
}

/// A named tenant space with its active tenant and options.
pub struct Tenancy {
    name: String,
    provider: Arc<dyn TenantProvider>,
    tenant: RwLock<Option<Arc<dyn Tenant>>>,
    options: RwLock<HashMap<String, serde_json::Value>>,
    resolution: RwLock<Option<Resolution>>,
}

impl Tenancy {
    /// Create a tenancy backed by the given provider.
    pub fn new(name: impl Into<String>, provider: Arc<dyn TenantProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
            tenant: RwLock::new(None),
            options: RwLock::new(HashMap::new()),
            resolution: RwLock::new(None),
        }
    }

    /// Seed the option map.
    pub fn with_options(self, options: HashMap<String, serde_json::Value>) -> Self {
        *self.options.write() = options;
        self
    }

    /// The tenancy's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The provider backing this tenancy.
    pub fn provider(&self) -> Arc<dyn TenantProvider> {
        Arc::clone(&self.provider)
    }

    /// The currently-active tenant, if any.
    pub fn tenant(&self) -> Option<Arc<dyn Tenant>> {
        self.tenant.read().clone()
    }

    /// Whether a tenant is currently active.
    pub fn check(&self) -> bool {
        self.tenant.read().is_some()
    }

    /// The active tenant's key; errors when no tenant is active.
    pub fn key(&self) -> SproutResult<TenantKey> {
        self.tenant()
            .map(|tenant| tenant.key())
            .ok_or_else(|| SproutError::TenantMissing {
                tenancy: self.name.clone(),
            })
    }

    /// The active tenant's identifier; errors when no tenant is active.
    pub fn identifier(&self) -> SproutResult<String> {
        self.tenant()
            .map(|tenant| tenant.identifier().to_string())
            .ok_or_else(|| SproutError::TenantMissing {
                tenancy: self.name.clone(),
            })
    }

    /// Swap the active tenant.
    ///
    /// This is a pure state transition: lifecycle work (override cleanup and
    /// setup) is driven by [`Sprout::set_tenant`](crate::Sprout::set_tenant),
    /// which interprets the returned [`TenantChange`]. Setting the tenant
    /// that is already active (same allocation or same key) reports
    /// [`TenantChange::Unchanged`].
    pub fn set_tenant(&self, tenant: Option<Arc<dyn Tenant>>) -> TenantChange {
        let mut current = self.tenant.write();

        let unchanged = match (current.as_ref(), tenant.as_ref()) {
            (None, None) => true,
            (Some(active), Some(incoming)) => {
                Arc::ptr_eq(active, incoming) || active.key() == incoming.key()
            }
            _ => false,
        };

        if unchanged {
            return TenantChange::Unchanged;
        }

        let previous = current.take();
        *current = tenant;

        if current.is_none() {
            *self.resolution.write() = None;
        }

        TenantChange::Changed { previous }
    }

    /// Whether a boolean option is enabled.
    pub fn has_option(&self, name: &str) -> bool {
        self.options.read().contains_key(name)
    }

    /// Enable a boolean option.
    pub fn add_option(&self, name: impl Into<String>) {
        self.options
            .write()
            .insert(name.into(), serde_json::Value::Bool(true));
    }

    /// Set a string/value-carrying option.
    pub fn add_option_value(&self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.options.write().insert(name.into(), value.into());
    }

    /// Disable an option.
    pub fn remove_option(&self, name: &str) {
        self.options.write().remove(name);
    }

    /// The value carried by an option, when set.
    pub fn option_config(&self, name: &str) -> Option<serde_json::Value> {
        self.options.read().get(name).cloned()
    }

    /// Record which resolver and hook produced the active tenant.
    pub fn mark_resolved(&self, resolver: &str, hook: ResolutionHook) {
        *self.resolution.write() = Some(Resolution {
            resolver: resolver.to_string(),
            hook,
        });
    }

    /// Whether this tenancy's tenant was produced by identity resolution.
    pub fn was_resolved(&self) -> bool {
        self.resolution.read().is_some()
    }

    /// Name of the resolver that produced the active tenant.
    pub fn resolved_via(&self) -> Option<String> {
        self.resolution.read().as_ref().map(|r| r.resolver.clone())
    }

    /// Hook during which the active tenant was resolved.
    pub fn resolution_hook(&self) -> Option<ResolutionHook> {
        self.resolution.read().as_ref().map(|r| r.hook)
    }
}

impl std::fmt::Debug for Tenancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenancy")
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("tenant", &self.tenant.read())
            .finish()
    }
}
