//! Sprout configuration model.
//!
//! These types deserialize from the application's config source (TOML, JSON,
//! environment layering) and drive tenancy, resolver, and service-override
//! construction. Providers and override collaborators are injected
//! programmatically; config assigns them by name.

use crate::hooks::ResolutionHook;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Top-level Sprout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SproutConfig {
    /// Default names used when an operation does not specify one
    #[serde(default)]
    pub defaults: Defaults,

    /// Hooks at which identity resolution is permitted to run
    #[serde(default = "default_hooks")]
    pub hooks: Vec<ResolutionHook>,

    /// Configured tenancies, keyed by name
    #[serde(default)]
    pub tenancies: HashMap<String, TenancyConfig>,

    /// Configured identity resolvers, keyed by name
    #[serde(default)]
    pub resolvers: HashMap<String, ResolverConfig>,

    /// Configured service overrides, keyed by service name.
    ///
    /// Ordered so override registration (and therefore setup/cleanup fan-out)
    /// is deterministic.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

impl Default for SproutConfig {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            hooks: default_hooks(),
            tenancies: HashMap::new(),
            resolvers: HashMap::new(),
            services: BTreeMap::new(),
        }
    }
}

fn default_hooks() -> Vec<ResolutionHook> {
    vec![ResolutionHook::Routing, ResolutionHook::Middleware]
}

impl SproutConfig {
    /// Whether a hook is enabled.
    pub fn supports_hook(&self, hook: ResolutionHook) -> bool {
        self.hooks.contains(&hook)
    }
}

/// Default tenancy/provider/resolver names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defaults {
    /// Tenancy used when none is named
    pub tenancy: Option<String>,
    /// Provider used by tenancies that do not name one
    pub provider: Option<String>,
    /// Resolver used when none is named
    pub resolver: Option<String>,
}

/// Per-tenancy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Provider backing this tenancy; falls back to the default provider
    pub provider: Option<String>,

    /// Options controlling optional behaviours. Boolean options map to
    /// `true`; string-valued options carry their value.
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

/// Per-resolver configuration. Fields are driver-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Resolver driver: `subdomain`, `path`, `header`, `cookie`, `session`
    pub driver: String,

    /// Parent domain for the subdomain driver
    pub domain: Option<String>,

    /// 1-based URL segment position for the path driver
    pub segment: Option<usize>,

    /// Route-parameter name template for the path driver
    pub parameter: Option<String>,

    /// Identity pattern constraint (regex) for the path driver
    pub pattern: Option<String>,

    /// Header name template for the header driver; `{tenancy}` is replaced
    /// with the tenancy name
    pub header: Option<String>,

    /// Cookie name template for the cookie driver, same templating
    pub cookie: Option<String>,

    /// Session key template for the session driver, same templating
    pub session: Option<String>,
}

impl ResolverConfig {
    /// Minimal config for a driver; driver-specific fields default to none.
    pub fn for_driver(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            domain: None,
            segment: None,
            parameter: None,
            pattern: None,
            header: None,
            cookie: None,
            session: None,
        }
    }
}

/// Per-service override configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Single override driver for this service
    pub driver: Option<String>,

    /// Multiple override drivers, wrapped into one stacked override
    #[serde(default)]
    pub drivers: Vec<String>,

    /// Bud store to consult for this service's tenant config
    pub store: Option<String>,

    /// Arbitrary driver configuration
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl ServiceConfig {
    /// Config naming a single driver.
    pub fn for_driver(driver: impl Into<String>) -> Self {
        Self {
            driver: Some(driver.into()),
            ..Self::default()
        }
    }

    /// Config naming a stack of drivers.
    pub fn for_drivers(drivers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            drivers: drivers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}
