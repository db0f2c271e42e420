//! Ambient session override.
//!
//! Gives each tenant its own session cookie (and path/domain scoping) so
//! sessions never leak between tenants sharing a deployment.

use super::ServiceOverride;
use crate::error::SproutResult;
use crate::settings::{SettingsRegistry, SETTING_URL_DOMAIN, SETTING_URL_PATH};
use crate::tenancy::Tenancy;
use crate::tenant::Tenant;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;

/// Tenant-scoped session settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Session cookie name while a tenant is active
    pub cookie_name: Option<String>,
    /// Session cookie path while a tenant is active
    pub path: Option<String>,
    /// Session cookie domain while a tenant is active
    pub domain: Option<String>,
}

/// Shared handle to the current session settings.
#[derive(Clone, Default)]
pub struct SharedSessionSettings(Arc<RwLock<SessionSettings>>);

impl SharedSessionSettings {
    /// Create a handle with no tenant scoping applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current settings.
    pub fn current(&self) -> SessionSettings {
        self.0.read().clone()
    }

    fn set(&self, settings: SessionSettings) {
        *self.0.write() = settings;
    }

    fn reset(&self) {
        *self.0.write() = SessionSettings::default();
    }
}

/// Override applying tenant-scoped session settings.
pub struct SessionOverride {
    settings: Arc<SettingsRegistry>,
    shared: SharedSessionSettings,
}

impl SessionOverride {
    /// Create the override.
    pub fn new(settings: Arc<SettingsRegistry>, shared: SharedSessionSettings) -> Self {
        Self { settings, shared }
    }

    /// The handle applications read session settings from.
    pub fn settings_handle(&self) -> SharedSessionSettings {
        self.shared.clone()
    }
}

#[async_trait]
impl ServiceOverride for SessionOverride {
    async fn setup(&self, tenancy: &Tenancy, tenant: &dyn Tenant) -> SproutResult<()> {
        self.shared.set(SessionSettings {
            cookie_name: Some(format!(
                "{}_{}_session",
                tenancy.name(),
                tenant.identifier()
            )),
            path: self.settings.get_str(SETTING_URL_PATH),
            domain: self.settings.get_str(SETTING_URL_DOMAIN),
        });
        Ok(())
    }

    async fn cleanup(&self, _tenancy: &Tenancy, _tenant: &dyn Tenant) -> SproutResult<()> {
        self.shared.reset();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TenantProvider;
    use crate::tenant::{GenericTenant, TenantKey};
    use crate::error::SproutResult;

    struct NullProvider;

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

    #[tokio::test]
    async fn test_session_cookie_scoped_to_tenant() {
        let settings = Arc::new(SettingsRegistry::new());
        settings.set(SETTING_URL_PATH, "/acme");

        let shared = SharedSessionSettings::new();
        let override_instance = SessionOverride::new(settings, shared.clone());

        let tenancy = Tenancy::new("primary", Arc::new(NullProvider));
        let tenant = GenericTenant::new("acme", 7);

        override_instance.setup(&tenancy, &tenant).await.unwrap();
        let current = shared.current();
        assert_eq!(current.cookie_name.as_deref(), Some("primary_acme_session"));
        assert_eq!(current.path.as_deref(), Some("/acme"));

        override_instance.cleanup(&tenancy, &tenant).await.unwrap();
        assert_eq!(shared.current(), SessionSettings::default());
    }
}
