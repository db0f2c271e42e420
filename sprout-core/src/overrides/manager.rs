//! Service override registration and lifecycle management.

use super::{ServiceOverride, StackedOverride};
use crate::config::{ServiceConfig, SproutConfig};
use crate::error::{SproutError, SproutResult};
use crate::events::{ListenerSet, SproutEvent};
use crate::sprout::Sprout;
use crate::tenancy::Tenancy;
use crate::tenant::Tenant;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Factory building an override from its service name and config entry.
pub type OverrideFactory = Arc<
    dyn Fn(&str, &ServiceConfig, &Sprout) -> SproutResult<Arc<dyn ServiceOverride>> + Send + Sync,
>;

/// Registers service overrides and drives their lifecycle.
///
/// Tracks which overrides have booted (set once) and which tenancies each
/// override has been set up for (cleared on cleanup). Setup never runs twice
/// for the same tenancy without an intervening cleanup, and cleanup never
/// runs for a tenancy that was not set up.
pub struct ServiceOverrideManager {
    factories: RwLock<HashMap<String, OverrideFactory>>,
    overrides: RwLock<Vec<(String, Arc<dyn ServiceOverride>)>>,
    booted: RwLock<HashSet<String>>,
    setup: RwLock<HashMap<String, HashSet<String>>>,
    listeners: Arc<ListenerSet>,
}

impl ServiceOverrideManager {
    /// Create a manager sharing the orchestrator's listener set.
    pub fn new(listeners: Arc<ListenerSet>) -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            overrides: RwLock::new(Vec::new()),
            booted: RwLock::new(HashSet::new()),
            setup: RwLock::new(HashMap::new()),
            listeners,
        }
    }

    /// Register an override driver.
    pub fn register_driver<F>(&self, driver: impl Into<String>, factory: F)
    where
        F: Fn(&str, &ServiceConfig, &Sprout) -> SproutResult<Arc<dyn ServiceOverride>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.write().insert(driver.into(), Arc::new(factory));
    }

    /// Instantiate every override named in config.
    ///
    /// Multi-driver declarations for one service are wrapped in a
    /// [`StackedOverride`]. Iteration order follows the config's ordered
    /// service map, so fan-out order is deterministic.
    pub fn register_overrides(&self, config: &SproutConfig, sprout: &Sprout) -> SproutResult<()> {
        for (service, service_config) in &config.services {
            self.register(service, service_config, sprout)?;
        }

        Ok(())
    }

    /// Register the override for a single service.
    ///
    /// Re-registering a service whose override has already been set up for a
    /// tenancy is an error: replacing it would silently lose live state.
    pub fn register(
        &self,
        service: &str,
        config: &ServiceConfig,
        sprout: &Sprout,
    ) -> SproutResult<()> {
        if self
            .setup
            .read()
            .get(service)
            .is_some_and(|tenancies| !tenancies.is_empty())
        {
            return Err(SproutError::ServiceOverrideInvalid {
                service: service.to_string(),
                reason: "service already has a processed override".to_string(),
            });
        }

        let mut drivers: Vec<&str> = config.drivers.iter().map(String::as_str).collect();
        if drivers.is_empty() {
            if let Some(driver) = config.driver.as_deref() {
                drivers.push(driver);
            }
        }

        if drivers.is_empty() {
            return Err(SproutError::missing_config("service override", service, "driver"));
        }

        let mut built = Vec::with_capacity(drivers.len());
        for driver in drivers {
            let factory = self.factories.read().get(driver).cloned().ok_or_else(|| {
                SproutError::unknown_driver("service override", service, driver)
            })?;
            built.push(factory(service, config, sprout)?);
        }

        let override_instance = if built.len() == 1 {
            built.remove(0)
        } else {
            Arc::new(StackedOverride::new(built)) as Arc<dyn ServiceOverride>
        };

        let mut overrides = self.overrides.write();
        if let Some(entry) = overrides.iter_mut().find(|(name, _)| name == service) {
            entry.1 = override_instance;
        } else {
            overrides.push((service.to_string(), override_instance));
        }
        drop(overrides);

        debug!(service, "registered service override");
        self.listeners
            .notify(&SproutEvent::service_override_registered(service));

        Ok(())
    }

    fn snapshot(&self) -> Vec<(String, Arc<dyn ServiceOverride>)> {
        self.overrides.read().clone()
    }

    /// Boot every bootable override exactly once.
    pub async fn boot_overrides(&self, sprout: &Sprout) -> SproutResult<()> {
        for (service, override_instance) in self.snapshot() {
            if !override_instance.is_bootable() || self.booted.read().contains(&service) {
                continue;
            }

            override_instance.boot(sprout).await?;
            self.booted.write().insert(service.clone());

            debug!(service = %service, "booted service override");
            self.listeners
                .notify(&SproutEvent::service_override_booted(service.as_str()));
        }

        Ok(())
    }

    /// Run setup for the incoming tenant across all registered overrides.
    pub async fn setup_overrides(
        &self,
        tenancy: &Tenancy,
        tenant: &dyn Tenant,
    ) -> SproutResult<()> {
        for (service, override_instance) in self.snapshot() {
            if self
                .setup
                .read()
                .get(&service)
                .is_some_and(|tenancies| tenancies.contains(tenancy.name()))
            {
                continue;
            }

            override_instance.setup(tenancy, tenant).await?;
            self.setup
                .write()
                .entry(service.clone())
                .or_default()
                .insert(tenancy.name().to_string());

            debug!(service = %service, tenancy = tenancy.name(), "set up service override");
        }

        Ok(())
    }

    /// Run cleanup for the outgoing tenant across overrides set up for it.
    pub async fn cleanup_overrides(
        &self,
        tenancy: &Tenancy,
        tenant: &dyn Tenant,
    ) -> SproutResult<()> {
        for (service, override_instance) in self.snapshot() {
            let was_set_up = self
                .setup
                .read()
                .get(&service)
                .is_some_and(|tenancies| tenancies.contains(tenancy.name()));

            if !was_set_up {
                continue;
            }

            override_instance.cleanup(tenancy, tenant).await?;
            if let Some(tenancies) = self.setup.write().get_mut(&service) {
                tenancies.remove(tenancy.name());
            }

            debug!(service = %service, tenancy = tenancy.name(), "cleaned up service override");
        }

        Ok(())
    }

    /// The override registered for a service.
    pub fn get(&self, service: &str) -> Option<Arc<dyn ServiceOverride>> {
        self.overrides
            .read()
            .iter()
            .find(|(name, _)| name == service)
            .map(|(_, override_instance)| Arc::clone(override_instance))
    }

    /// Whether a service has a registered override.
    pub fn has_override(&self, service: &str) -> bool {
        self.overrides.read().iter().any(|(name, _)| name == service)
    }

    /// Whether a service's override has booted.
    pub fn has_override_booted(&self, service: &str) -> bool {
        self.booted.read().contains(service)
    }

    /// Whether a service's override has been set up; when a tenancy is
    /// given, for that tenancy specifically.
    pub fn has_override_been_set_up(&self, service: &str, tenancy: Option<&Tenancy>) -> bool {
        let setup = self.setup.read();
        match tenancy {
            Some(tenancy) => setup
                .get(service)
                .is_some_and(|tenancies| tenancies.contains(tenancy.name())),
            None => setup.get(service).is_some_and(|tenancies| !tenancies.is_empty()),
        }
    }

    /// Services currently set up for the given tenancy, in registration order.
    pub fn get_setup_overrides(&self, tenancy: &Tenancy) -> Vec<String> {
        let setup = self.setup.read();
        self.overrides
            .read()
            .iter()
            .filter(|(service, _)| {
                setup
                    .get(service)
                    .is_some_and(|tenancies| tenancies.contains(tenancy.name()))
            })
            .map(|(service, _)| service.clone())
            .collect()
    }
}
