//! Identity resolution.
//!
//! Strategies for extracting a raw tenant identity from an inbound request.
//! Absence is not an error at this layer: a resolver that finds nothing
//! returns `None`, and the hook-dispatch layer decides whether that is fatal.

mod cookie;
mod header;
mod path;
mod session;
mod subdomain;

pub use cookie::CookieResolver;
pub use header::{apply_identity_echo, HeaderResolver};
pub use path::PathResolver;
pub use session::SessionResolver;
pub use subdomain::SubdomainResolver;

use crate::config::{ResolverConfig, SproutConfig};
use crate::context::RequestContext;
use crate::error::{SproutError, SproutResult};
use crate::tenancy::Tenancy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// URL facts a resolver can contribute once an identity is resolved.
///
/// Consumed by ambient overrides (cookie, session) to scope cookie paths and
/// domains to the active tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlBinding {
    /// Tenant-scoped URL path prefix (path resolver)
    pub path: Option<String>,
    /// Tenant-scoped domain (subdomain resolver)
    pub domain: Option<String>,
}

/// Strategy for extracting a tenant identity from a request.
pub trait IdentityResolver: Send + Sync {
    /// The resolver's registered name.
    fn name(&self) -> &str;

    /// Extract a raw identity from the request, if present.
    fn resolve_identity(&self, request: &RequestContext, tenancy: &Tenancy) -> Option<String>;

    /// Whether this resolver relies on route parameters.
    ///
    /// Parameterised resolvers are structurally incompatible with optional
    /// resolution.
    fn uses_route_parameters(&self) -> bool {
        false
    }

    /// Build a tenant-aware URL from a route template, for resolvers that
    /// encode the tenant in the URL.
    fn route(
        &self,
        template: &str,
        tenancy: &Tenancy,
        identity: &str,
        absolute: bool,
    ) -> Option<String> {
        let _ = (template, tenancy, identity, absolute);
        None
    }

    /// Header to echo the identity back on, for round-trip identification.
    fn response_header(&self, tenancy: &Tenancy) -> Option<String> {
        let _ = tenancy;
        None
    }

    /// URL facts contributed by a successful resolution.
    fn url_binding(&self, tenancy: &Tenancy, identity: &str) -> Option<UrlBinding> {
        let _ = (tenancy, identity);
        None
    }
}

impl std::fmt::Debug for dyn IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("name", &self.name())
            .finish()
    }
}

/// Factory building a resolver from its config entry.
pub type ResolverFactory =
    Arc<dyn Fn(&str, &ResolverConfig) -> SproutResult<Arc<dyn IdentityResolver>> + Send + Sync>;

/// Registry of resolver drivers and built resolver instances.
pub struct ResolverRegistry {
    factories: RwLock<HashMap<String, ResolverFactory>>,
    resolvers: RwLock<HashMap<String, Arc<dyn IdentityResolver>>>,
}

impl ResolverRegistry {
    /// Create a registry with the built-in drivers registered.
    pub fn with_builtin_drivers() -> Self {
        let registry = Self {
            factories: RwLock::new(HashMap::new()),
            resolvers: RwLock::new(HashMap::new()),
        };

        registry.register_driver("subdomain", |name: &str, config: &ResolverConfig| {
            Ok(Arc::new(SubdomainResolver::from_config(name, config)?) as Arc<dyn IdentityResolver>)
        });
        registry.register_driver("path", |name: &str, config: &ResolverConfig| {
            Ok(Arc::new(PathResolver::from_config(name, config)?) as Arc<dyn IdentityResolver>)
        });
        registry.register_driver("header", |name: &str, config: &ResolverConfig| {
            Ok(Arc::new(HeaderResolver::from_config(name, config)) as Arc<dyn IdentityResolver>)
        });
        registry.register_driver("cookie", |name: &str, config: &ResolverConfig| {
            Ok(Arc::new(CookieResolver::from_config(name, config)) as Arc<dyn IdentityResolver>)
        });
        registry.register_driver("session", |name: &str, config: &ResolverConfig| {
            Ok(Arc::new(SessionResolver::from_config(name, config)) as Arc<dyn IdentityResolver>)
        });

        registry
    }

    /// Register a resolver driver.
    pub fn register_driver<F>(&self, driver: impl Into<String>, factory: F)
    where
        F: Fn(&str, &ResolverConfig) -> SproutResult<Arc<dyn IdentityResolver>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.write().insert(driver.into(), Arc::new(factory));
    }

    /// Register an already-built resolver instance.
    pub fn register(&self, resolver: Arc<dyn IdentityResolver>) {
        self.resolvers
            .write()
            .insert(resolver.name().to_string(), resolver);
    }

    /// Look up a resolver by name, building it from config on first use.
    pub fn resolver(
        &self,
        name: &str,
        config: &SproutConfig,
    ) -> SproutResult<Arc<dyn IdentityResolver>> {
        if let Some(resolver) = self.resolvers.read().get(name) {
            return Ok(Arc::clone(resolver));
        }

        let resolver_config = config.resolvers.get(name).ok_or_else(|| {
            SproutError::misconfigured("resolver", name, "is not configured")
        })?;

        let factory = self
            .factories
            .read()
            .get(&resolver_config.driver)
            .cloned()
            .ok_or_else(|| {
                SproutError::unknown_driver("resolver", name, &resolver_config.driver)
            })?;

        let resolver = factory(name, resolver_config)?;
        self.resolvers
            .write()
            .insert(name.to_string(), Arc::clone(&resolver));

        Ok(resolver)
    }
}

pub(crate) fn apply_template(template: &str, tenancy: &Tenancy) -> String {
    template.replace("{tenancy}", tenancy.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TenantProvider;
    use crate::tenant::{Tenant, TenantKey};
    use async_trait::async_trait;

    pub(crate) struct NullProvider;

    #[async_trait]
    impl TenantProvider for NullProvider {
        fn name(&self) -> &str {
            "null"
        }

        async fn retrieve_by_identifier(
            &self,
            _identifier: &str,
        ) -> SproutResult<Option<Arc<dyn Tenant>>> {
            Ok(None)
        }

        async fn retrieve_by_key(
            &self,
            _key: &TenantKey,
        ) -> SproutResult<Option<Arc<dyn Tenant>>> {
            Ok(None)
        }

        async fn retrieve_by_resource_key(
            &self,
            _resource_key: &str,
        ) -> SproutResult<Option<Arc<dyn Tenant>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_registry_builds_from_config() {
        let registry = ResolverRegistry::with_builtin_drivers();
        let mut config = SproutConfig::default();
        let mut resolver_config = ResolverConfig::for_driver("subdomain");
        resolver_config.domain = Some("example.com".to_string());
        config
            .resolvers
            .insert("subdomain".to_string(), resolver_config);

        let resolver = registry.resolver("subdomain", &config).unwrap();
        assert_eq!(resolver.name(), "subdomain");
        assert!(resolver.uses_route_parameters());
    }

    #[test]
    fn test_registry_errors() {
        let registry = ResolverRegistry::with_builtin_drivers();
        let mut config = SproutConfig::default();

        let err = registry.resolver("missing", &config).unwrap_err();
        assert!(matches!(err, SproutError::Misconfiguration { .. }));

        config
            .resolvers
            .insert("odd".to_string(), ResolverConfig::for_driver("carrier-pigeon"));
        let err = registry.resolver("odd", &config).unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
