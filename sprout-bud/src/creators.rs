//! Driver creators.
//!
//! Driver-creator overrides intercept the framework's "build me a driver
//! named X with config C" extension point. The creator requires an active
//! tenant context, merges the tenant's Bud config over the base config, runs
//! the cyclic-driver check, and delegates to the real underlying manager
//! through the narrow [`FreshBuilder`] trait, always forcing a fresh
//! (non-cached) build.

use crate::error::{BudError, BudResult};
use crate::manager::BudManager;
use crate::store::ConfigMap;
use async_trait::async_trait;
use sprout_core::{ServiceOverride, Sprout, SproutError, SproutResult, Tenancy, Tenant};
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Narrow interface to the real driver-building manager.
///
/// Implementations must build from the supplied config without consulting
/// any internal driver cache.
#[async_trait]
pub trait FreshBuilder: Send + Sync {
    /// The driver type this builder produces.
    type Output: Send;

    /// Build a driver from the merged config.
    async fn build(&self, name: &str, config: &ConfigMap) -> BudResult<Self::Output>;

    /// Tear down a previously-built driver.
    async fn forget(&self, name: &str) -> BudResult<()> {
        let _ = name;
        Ok(())
    }
}

type ConfigDecorator = Box<dyn Fn(&Tenancy, &dyn Tenant, &mut ConfigMap) + Send + Sync>;

/// The shared driver-creator shape.
pub struct DriverCreator<B: FreshBuilder> {
    term: &'static str,
    service: &'static str,
    driver_field: &'static str,
    bud: Arc<BudManager>,
    store_hint: Option<String>,
    builder: B,
    decorator: Option<ConfigDecorator>,
    built: parking_lot::RwLock<HashSet<String>>,
}

impl<B: FreshBuilder> DriverCreator<B> {
    fn new(
        term: &'static str,
        service: &'static str,
        driver_field: &'static str,
        bud: Arc<BudManager>,
        builder: B,
    ) -> Self {
        Self {
            term,
            service,
            driver_field,
            bud,
            store_hint: None,
            builder,
            decorator: None,
            built: parking_lot::RwLock::new(HashSet::new()),
        }
    }

    /// Consult a specific Bud store instead of the default.
    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store_hint = Some(store.into());
        self
    }

    fn with_decorator(mut self, decorator: ConfigDecorator) -> Self {
        self.decorator = Some(decorator);
        self
    }

    /// What kind of driver this creator builds, for error messages.
    pub fn term(&self) -> &'static str {
        self.term
    }

    /// The service whose Bud entries this creator consults.
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Build a tenant-scoped driver.
    ///
    /// Requires an active multitenanted context with a current tenancy and
    /// an active tenant (each absence errors distinctly). Tenant config from
    /// Bud is merged over `base`; the resolved driver field is checked for
    /// self-reference before the build is delegated.
    pub async fn create(
        &self,
        sprout: &Sprout,
        name: &str,
        base: &ConfigMap,
    ) -> BudResult<B::Output> {
        if !sprout.within_context() {
            return Err(SproutError::OutsideContext.into());
        }

        let tenancy = sprout
            .get_current_tenancy()
            .ok_or(SproutError::TenancyMissing)?;

        let tenant = tenancy.tenant().ok_or_else(|| SproutError::TenantMissing {
            tenancy: tenancy.name().to_string(),
        })?;

        let guard = self.bud.guard();
        let _scope = guard.enter(self.term, name)?;

        let overrides = self
            .bud
            .tenant_config(&tenancy, self.store_hint.as_deref(), self.service, name)
            .await?;

        let mut merged = base.clone();
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                merged.insert(key, value);
            }
        }

        if let Some(decorator) = &self.decorator {
            decorator(&tenancy, tenant.as_ref(), &mut merged);
        }

        if let Some(driver) = merged.get(self.driver_field).and_then(|value| value.as_str()) {
            if driver == name {
                return Err(BudError::cyclic(self.term, name));
            }
        }

        let output = self.builder.build(name, &merged).await?;
        self.built.write().insert(name.to_string());

        debug!(
            term = self.term,
            name,
            tenancy = tenancy.name(),
            tenant = tenant.identifier(),
            "built tenant-scoped driver"
        );

        Ok(output)
    }

    /// Names built since the last cleanup.
    pub fn built(&self) -> Vec<String> {
        let mut names: Vec<String> = self.built.read().iter().cloned().collect();
        names.sort();
        names
    }

    /// Tear down every driver built for the active tenant.
    pub async fn forget_built(&self) -> BudResult<Vec<String>> {
        let names: Vec<String> = self.built.write().drain().collect();
        for name in &names {
            self.builder.forget(name).await?;
        }
        Ok(names)
    }
}

/// Creator for tenant-scoped database connections.
pub fn database_connection_creator<B: FreshBuilder>(
    bud: Arc<BudManager>,
    builder: B,
) -> DriverCreator<B> {
    DriverCreator::new("database connection", "database", "driver", bud, builder)
}

/// Creator for tenant-scoped filesystem disks.
///
/// When the tenant carries the resources capability, the disk's path prefix
/// is forced to `{tenancy}/{resource-key}` so every disk built for the
/// tenant stays inside its namespace.
pub fn filesystem_disk_creator<B: FreshBuilder>(
    bud: Arc<BudManager>,
    builder: B,
) -> DriverCreator<B> {
    DriverCreator::new("filesystem disk", "filesystem", "driver", bud, builder).with_decorator(
        Box::new(|tenancy, tenant, config| {
            if let Some(resources) = tenant.resources() {
                config.insert(
                    "prefix".to_string(),
                    serde_json::Value::from(format!(
                        "{}/{}",
                        tenancy.name(),
                        resources.resource_key()
                    )),
                );
            }
        }),
    )
}

/// Creator for tenant-scoped cache stores.
pub fn cache_store_creator<B: FreshBuilder>(
    bud: Arc<BudManager>,
    builder: B,
) -> DriverCreator<B> {
    DriverCreator::new("cache store", "cache", "driver", bud, builder)
}

/// Creator for tenant-scoped mailer transports.
pub fn mail_transport_creator<B: FreshBuilder>(
    bud: Arc<BudManager>,
    builder: B,
) -> DriverCreator<B> {
    DriverCreator::new("mail transport", "mail", "transport", bud, builder)
}

/// Creator for tenant-scoped broadcast connections.
pub fn broadcast_connection_creator<B: FreshBuilder>(
    bud: Arc<BudManager>,
    builder: B,
) -> DriverCreator<B> {
    DriverCreator::new("broadcast connection", "broadcast", "driver", bud, builder)
}

/// Creator for tenant-scoped auth user-providers.
pub fn auth_provider_creator<B: FreshBuilder>(
    bud: Arc<BudManager>,
    builder: B,
) -> DriverCreator<B> {
    DriverCreator::new("auth provider", "auth", "driver", bud, builder)
}

/// Service override wrapping a driver creator.
///
/// Setup is lazy (drivers are built on demand through the creator); cleanup
/// tears down every driver built while the outgoing tenant was active, so
/// nothing tenant-scoped survives the change.
pub struct CreatorOverride<B: FreshBuilder> {
    creator: Arc<DriverCreator<B>>,
}

impl<B: FreshBuilder> CreatorOverride<B> {
    /// Wrap a creator as a service override.
    pub fn new(creator: Arc<DriverCreator<B>>) -> Self {
        Self { creator }
    }

    /// The wrapped creator.
    pub fn creator(&self) -> Arc<DriverCreator<B>> {
        Arc::clone(&self.creator)
    }
}

#[async_trait]
impl<B: FreshBuilder + 'static> ServiceOverride for CreatorOverride<B> {
    async fn setup(&self, tenancy: &Tenancy, tenant: &dyn Tenant) -> SproutResult<()> {
        debug!(
            term = self.creator.term(),
            tenancy = tenancy.name(),
            tenant = tenant.identifier(),
            "creator override active"
        );
        Ok(())
    }

    async fn cleanup(&self, tenancy: &Tenancy, _tenant: &dyn Tenant) -> SproutResult<()> {
        let forgotten = self
            .creator
            .forget_built()
            .await
            .map_err(|err| SproutError::Source(err.to_string()))?;

        if !forgotten.is_empty() {
            debug!(
                term = self.creator.term(),
                tenancy = tenancy.name(),
                drivers = ?forgotten,
                "tore down tenant-scoped drivers"
            );
        }

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
