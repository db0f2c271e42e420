//! Ambient cookie override.
//!
//! Scopes the application's default cookie path and domain to the active
//! tenant, using the URL facts the resolving resolver deposited in the
//! settings repository. The application reads the shared handle when
//! building its cookie jar.

use super::ServiceOverride;
use crate::error::SproutResult;
use crate::settings::{SettingsRegistry, SETTING_URL_DOMAIN, SETTING_URL_PATH};
use crate::tenancy::Tenancy;
use crate::tenant::Tenant;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;

/// Tenant-scoped cookie defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSettings {
    /// Default cookie path while a tenant is active
    pub path: Option<String>,
    /// Default cookie domain while a tenant is active
    pub domain: Option<String>,
}

/// Shared handle to the current cookie defaults.
#[derive(Clone, Default)]
pub struct SharedCookieSettings(Arc<RwLock<CookieSettings>>);

impl SharedCookieSettings {
    /// Create a handle with no tenant scoping applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current defaults.
    pub fn current(&self) -> CookieSettings {
        self.0.read().clone()
    }

    fn set(&self, settings: CookieSettings) {
        *self.0.write() = settings;
    }

    fn reset(&self) {
        *self.0.write() = CookieSettings::default();
    }
}

/// Override applying tenant-scoped cookie defaults.
pub struct CookieOverride {
    settings: Arc<SettingsRegistry>,
    shared: SharedCookieSettings,
}

impl CookieOverride {
    /// Create the override.
    pub fn new(settings: Arc<SettingsRegistry>, shared: SharedCookieSettings) -> Self {
        Self { settings, shared }
    }

    /// The handle applications read cookie defaults from.
    pub fn settings_handle(&self) -> SharedCookieSettings {
        self.shared.clone()
    }
}

#[async_trait]
impl ServiceOverride for CookieOverride {
    async fn setup(&self, _tenancy: &Tenancy, _tenant: &dyn Tenant) -> SproutResult<()> {
        self.shared.set(CookieSettings {
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
