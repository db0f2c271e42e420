//! The Sprout orchestrator.

use crate::config::SproutConfig;
use crate::error::{SproutError, SproutResult};
use crate::events::{ListenerSet, SproutEvent, SproutListener};
use crate::hooks::ResolutionHook;
use crate::overrides::ServiceOverrideManager;
use crate::provider::ProviderRegistry;
use crate::resolver::{IdentityResolver, ResolverRegistry};
use crate::settings::SettingsRegistry;
use crate::tenancy::{TenantChange, Tenancy};
use crate::tenant::Tenant;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Central registry for one unit of work.
///
/// One `Sprout` instance is scoped to one request or one job execution and
/// threaded explicitly through the code that needs it; it is never shared
/// between concurrent units of work and carries no global state. It owns the
/// current-tenancy stack, the transient resolution hook, the settings
/// repository, the provider/resolver registries, and the service-override
/// manager, and it drives the tenant-change lifecycle.
pub struct Sprout {
    config: SproutConfig,
    registered: RwLock<HashMap<String, Arc<Tenancy>>>,
    current: RwLock<Vec<Arc<Tenancy>>>,
    hook: RwLock<Option<ResolutionHook>>,
    in_context: AtomicBool,
    settings: Arc<SettingsRegistry>,
    providers: ProviderRegistry,
    resolvers: ResolverRegistry,
    overrides: ServiceOverrideManager,
    listeners: Arc<ListenerSet>,
}

impl Sprout {
    /// Create an orchestrator for one unit of work.
    pub fn new(config: SproutConfig) -> Self {
        let listeners = Arc::new(ListenerSet::new());

        Self {
            config,
            registered: RwLock::new(HashMap::new()),
            current: RwLock::new(Vec::new()),
            hook: RwLock::new(None),
            in_context: AtomicBool::new(false),
            settings: Arc::new(SettingsRegistry::new()),
            providers: ProviderRegistry::new(),
            resolvers: ResolverRegistry::with_builtin_drivers(),
            overrides: ServiceOverrideManager::new(Arc::clone(&listeners)),
            listeners,
        }
    }

    /// The configuration this orchestrator was built with.
    pub fn config(&self) -> &SproutConfig {
        &self.config
    }

    /// The unit-of-work settings repository.
    pub fn settings(&self) -> Arc<SettingsRegistry> {
        Arc::clone(&self.settings)
    }

    /// The tenant-provider registry.
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// The identity-resolver registry.
    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    /// The service-override manager.
    pub fn overrides(&self) -> &ServiceOverrideManager {
        &self.overrides
    }

    /// Subscribe a listener to Sprout events.
    pub fn subscribe(&self, listener: Arc<dyn SproutListener>) {
        self.listeners.subscribe(listener);
    }

    /// Instantiate every service override named in config.
    pub fn register_overrides(&self) -> SproutResult<()> {
        self.overrides.register_overrides(&self.config, self)
    }

    /// Boot every bootable service override exactly once.
    pub async fn boot_overrides(&self) -> SproutResult<()> {
        self.overrides.boot_overrides(self).await
    }

    /// Look up a configured tenancy by name, or the default tenancy.
    ///
    /// Tenancy instances are created on first use and reused for the rest of
    /// the unit of work.
    pub fn tenancy(&self, name: Option<&str>) -> SproutResult<Arc<Tenancy>> {
        let name = match name {
            Some(name) => name,
            None => self
                .config
                .defaults
                .tenancy
                .as_deref()
                .ok_or_else(|| SproutError::no_default("tenancy"))?,
        };

        if let Some(tenancy) = self.registered.read().get(name) {
            return Ok(Arc::clone(tenancy));
        }

        let tenancy_config = self.config.tenancies.get(name).ok_or_else(|| {
            SproutError::misconfigured("tenancy", name, "is not configured")
        })?;

        let provider_name = tenancy_config
            .provider
            .as_deref()
            .or(self.config.defaults.provider.as_deref())
            .ok_or_else(|| SproutError::no_default("provider"))?;

        let provider = self.providers.get(provider_name).ok_or_else(|| {
            SproutError::misconfigured("tenancy", name, format!("unknown provider [{provider_name}]"))
        })?;

        let tenancy = Arc::new(
            Tenancy::new(name, provider).with_options(tenancy_config.options.clone()),
        );

        self.registered
            .write()
            .insert(name.to_string(), Arc::clone(&tenancy));

        Ok(tenancy)
    }

    /// Look up a configured resolver by name, or the default resolver.
    pub fn resolver(&self, name: Option<&str>) -> SproutResult<Arc<dyn IdentityResolver>> {
        let name = match name {
            Some(name) => name,
            None => self
                .config
                .defaults
                .resolver
                .as_deref()
                .ok_or_else(|| SproutError::no_default("resolver"))?,
        };

        self.resolvers.resolver(name, &self.config)
    }

    /// Push a tenancy onto the current-tenancy stack.
    ///
    /// Re-setting the same instance is a no-op for ordering; a different
    /// instance under the same name replaces the existing entry in place.
    /// Marks the unit of work as within a multitenanted context.
    pub fn set_current_tenancy(&self, tenancy: &Arc<Tenancy>) {
        let mut current = self.current.write();

        if let Some(position) = current.iter().position(|entry| entry.name() == tenancy.name()) {
            if !Arc::ptr_eq(&current[position], tenancy) {
                current[position] = Arc::clone(tenancy);
            }
        } else {
            current.push(Arc::clone(tenancy));
        }
        drop(current);

        self.in_context.store(true, Ordering::SeqCst);
    }

    /// The most-recently-set current tenancy.
    pub fn get_current_tenancy(&self) -> Option<Arc<Tenancy>> {
        self.current.read().last().cloned()
    }

    /// Every tenancy currently active in this unit of work, in stack order.
    ///
    /// Contains one entry per distinct tenancy name.
    pub fn get_all_current_tenancies(&self) -> Vec<Arc<Tenancy>> {
        self.current.read().clone()
    }

    /// Whether any tenancy is currently set.
    pub fn has_current_tenancy(&self) -> bool {
        !self.current.read().is_empty()
    }

    /// Clear the current-tenancy stack.
    ///
    /// Used between test cases and job executions.
    pub fn reset_tenancies(&self) {
        self.current.write().clear();
    }

    /// Whether this unit of work is within a multitenanted context.
    ///
    /// True when explicitly marked, or when at least one current tenancy is
    /// set; never inferred from configuration alone.
    pub fn within_context(&self) -> bool {
        self.in_context.load(Ordering::SeqCst) || self.has_current_tenancy()
    }

    /// Explicitly mark the unit of work as within context.
    ///
    /// Used by job and console contexts that have no request.
    pub fn mark_as_in_context(&self) {
        self.in_context.store(true, Ordering::SeqCst);
    }

    /// Explicitly clear the context marker.
    pub fn mark_as_outside_context(&self) {
        self.in_context.store(false, Ordering::SeqCst);
    }

    /// Set or clear the current resolution hook.
    pub fn set_current_hook(&self, hook: Option<ResolutionHook>) {
        *self.hook.write() = hook;
    }

    /// The current resolution hook, if a resolution attempt is in progress.
    pub fn current_hook(&self) -> Option<ResolutionHook> {
        *self.hook.read()
    }

    /// Whether the given hook is the current one.
    pub fn is_current_hook(&self, hook: Option<ResolutionHook>) -> bool {
        *self.hook.read() == hook
    }

    /// Whether a hook is enabled in configuration.
    pub fn supports_hook(&self, hook: ResolutionHook) -> bool {
        self.config.supports_hook(hook)
    }

    /// Change the active tenant of a tenancy, driving the override lifecycle.
    ///
    /// A no-op when the tenant is unchanged. Otherwise the tenant is
    /// swapped, cleanup runs for the outgoing tenant (when there was one)
    /// strictly before setup runs for the incoming tenant (when there is
    /// one), and listeners are notified afterwards. Two tenants' overrides
    /// are therefore never simultaneously active.
    pub async fn set_tenant(
        &self,
        tenancy: &Arc<Tenancy>,
        tenant: Option<Arc<dyn Tenant>>,
    ) -> SproutResult<()> {
        let change = tenancy.set_tenant(tenant.clone());

        let previous = match change {
            TenantChange::Unchanged => return Ok(()),
            TenantChange::Changed { previous } => previous,
        };

        debug!(
            tenancy = tenancy.name(),
            previous = ?previous.as_ref().map(|t| t.identifier()),
            current = ?tenant.as_ref().map(|t| t.identifier()),
            "tenant changed"
        );

        if let Some(outgoing) = &previous {
            self.overrides
                .cleanup_overrides(tenancy, outgoing.as_ref())
                .await?;
        }

        if let Some(incoming) = &tenant {
            self.overrides
                .setup_overrides(tenancy, incoming.as_ref())
                .await?;
        }

        self.listeners.notify(&SproutEvent::current_tenant_changed(
            tenancy.name(),
            previous,
            tenant,
        ));

        Ok(())
    }

    /// Build a tenant-aware URL from a route template.
    ///
    /// Delegates to the resolver's parameter-injection logic; errors when no
    /// tenant is active or the resolver does not encode tenants in URLs.
    pub fn route(
        &self,
        template: &str,
        tenancy_name: Option<&str>,
        resolver_name: Option<&str>,
        absolute: bool,
    ) -> SproutResult<String> {
        let tenancy = match tenancy_name {
            Some(name) => self.tenancy(Some(name))?,
            None => self
                .get_current_tenancy()
                .map(Ok)
                .unwrap_or_else(|| self.tenancy(None))?,
        };

        let identity = tenancy.identifier()?;
        let resolver = self.resolver(resolver_name)?;

        resolver
            .route(template, &tenancy, &identity, absolute)
            .ok_or_else(|| {
                SproutError::misconfigured(
                    "resolver",
                    resolver.name(),
                    "does not support tenanted route generation",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TenancyConfig;
    use crate::provider::{TableTenantProvider, TenantRecord, TenantSource};
    use crate::tenant::TenantKey;
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl TenantSource for EmptySource {
        async fn find_by(
            &self,
            _column: &str,
            _value: &serde_json::Value,
        ) -> SproutResult<Option<TenantRecord>> {
            Ok(None)
        }
    }

    fn sprout() -> Sprout {
        let mut config = SproutConfig::default();
        config.defaults.tenancy = Some("primary".to_string());
        config.defaults.provider = Some("tenants".to_string());
        config
            .tenancies
            .insert("primary".to_string(), TenancyConfig::default());
        config
            .tenancies
            .insert("secondary".to_string(), TenancyConfig::default());

        let sprout = Sprout::new(config);
        sprout
            .providers()
            .register(Arc::new(TableTenantProvider::new("tenants", Arc::new(EmptySource))));
        sprout
    }

    #[test]
    fn test_tenancy_instances_are_cached() {
        let sprout = sprout();
        let first = sprout.tenancy(None).unwrap();
        let second = sprout.tenancy(Some("primary")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_tenancy_is_misconfiguration() {
        let sprout = sprout();
        let err = sprout.tenancy(Some("missing")).unwrap_err();
        assert!(matches!(err, SproutError::Misconfiguration { .. }));
    }

    #[test]
    fn test_stack_ordering_and_replacement() {
        let sprout = sprout();
        let primary = sprout.tenancy(Some("primary")).unwrap();
        let secondary = sprout.tenancy(Some("secondary")).unwrap();

        sprout.set_current_tenancy(&primary);
        sprout.set_current_tenancy(&secondary);
        assert_eq!(sprout.get_current_tenancy().unwrap().name(), "secondary");
        assert_eq!(sprout.get_all_current_tenancies().len(), 2);

        // Idempotent re-insertion keeps the stack stable.
        sprout.set_current_tenancy(&secondary);
        assert_eq!(sprout.get_all_current_tenancies().len(), 2);

        // A replacement instance under the same name swaps in place.
        let replacement = Arc::new(Tenancy::new(
            "primary",
            sprout.providers().get("tenants").unwrap(),
        ));
        sprout.set_current_tenancy(&replacement);
        let all = sprout.get_all_current_tenancies();
        assert_eq!(all.len(), 2);
        assert!(Arc::ptr_eq(&all[0], &replacement));
        assert_eq!(sprout.get_current_tenancy().unwrap().name(), "secondary");
    }

    #[test]
    fn test_context_flag() {
        let sprout = sprout();
        assert!(!sprout.within_context());

        let primary = sprout.tenancy(Some("primary")).unwrap();
        sprout.set_current_tenancy(&primary);
        assert!(sprout.within_context());

        sprout.mark_as_outside_context();
        // The stack still implies context.
        assert!(sprout.within_context());

        sprout.reset_tenancies();
        assert!(!sprout.within_context());

        sprout.mark_as_in_context();
        assert!(sprout.within_context());
    }

    #[test]
    fn test_hook_tracking() {
        let sprout = sprout();
        assert!(sprout.is_current_hook(None));
        assert!(sprout.supports_hook(ResolutionHook::Middleware));
        assert!(!sprout.supports_hook(ResolutionHook::Booting));

        sprout.set_current_hook(Some(ResolutionHook::Routing));
        assert_eq!(sprout.current_hook(), Some(ResolutionHook::Routing));
        assert!(sprout.is_current_hook(Some(ResolutionHook::Routing)));

        sprout.set_current_hook(None);
        assert_eq!(sprout.current_hook(), None);
    }

    #[tokio::test]
    async fn test_route_requires_tenant() {
        let sprout = sprout();
        let err = sprout
            .route("/dashboard", Some("primary"), Some("path"), false)
            .unwrap_err();
        assert!(matches!(err, SproutError::TenantMissing { .. }));
    }

    #[tokio::test]
    async fn test_route_via_path_resolver() {
        let mut config = SproutConfig::default();
        config.defaults.tenancy = Some("primary".to_string());
        config.defaults.provider = Some("tenants".to_string());
        config
            .tenancies
            .insert("primary".to_string(), TenancyConfig::default());
        config.resolvers.insert(
            "path".to_string(),
            crate::config::ResolverConfig::for_driver("path"),
        );

        let sprout = Sprout::new(config);
        sprout
            .providers()
            .register(Arc::new(TableTenantProvider::new("tenants", Arc::new(EmptySource))));

        let tenancy = sprout.tenancy(None).unwrap();
        sprout
            .set_tenant(
                &tenancy,
                Some(Arc::new(crate::tenant::GenericTenant::new("acme", TenantKey::Int(7))) as Arc<dyn Tenant>),
            )
            .await
            .unwrap();

        let url = sprout
            .route("/dashboard", None, Some("path"), false)
            .unwrap();
        assert_eq!(url, "/acme/dashboard");
    }
}
