//! Multi-Tenancy Core for Sprout
//!
//! Tenant resolution and service-override orchestration: identify which
//! tenant a request or job belongs to, track the active tenancy stack for
//! the unit of work, and drive a setup/cleanup lifecycle across pluggable
//! service overrides whenever the active tenant changes.
//!
//! # Features
//!
//! - **Pluggable identity resolution** - subdomain, path, header, cookie,
//!   and session strategies, plus custom drivers
//! - **Nested tenancies** - an ordered current-tenancy stack with correct
//!   restore semantics
//! - **Service overrides** - setup/cleanup/boot lifecycle with per-tenancy
//!   bookkeeping and stacked composites
//! - **Explicit context** - one orchestrator per unit of work, threaded by
//!   reference; no global state
//! - **Job awareness** - dehydrate/rehydrate the tenant context through
//!   queue payloads
//!
//! # Quick Start
//!
//! ## 1. Provide tenants (with your database)
//!
//! ```rust,ignore
//! use sprout_core::*;
//! use std::sync::Arc;
//!
//! struct MyTenantTable { /* your database pool */ }
//!
//! #[async_trait::async_trait]
//! impl TenantSource for MyTenantTable {
//!     async fn find_by(
//!         &self,
//!         column: &str,
//!         value: &serde_json::Value,
//!     ) -> SproutResult<Option<TenantRecord>> {
//!         // SELECT * FROM tenants WHERE {column} = {value} LIMIT 1
//!         todo!()
//!     }
//! }
//!
//! let sprout = Sprout::new(config);
//! sprout.providers().register_cached(Arc::new(
//!     TableTenantProvider::new("tenants", Arc::new(MyTenantTable { /* .. */ })),
//! ));
//! ```
//!
//! ## 2. Resolve the tenant per request
//!
//! ```rust,ignore
//! use sprout_core::resolution::handle_resolution;
//!
//! let tenant = handle_resolution(
//!     &request, ResolutionHook::Middleware, &sprout,
//!     None, None, true, false,
//! ).await?;
//! ```
//!
//! ## 3. React to tenant changes
//!
//! Register service overrides; the orchestrator runs cleanup for the
//! outgoing tenant strictly before setup for the incoming one.

pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod hooks;
pub mod job;
pub mod overrides;
pub mod provider;
pub mod resolution;
pub mod resolver;
pub mod settings;
pub mod sprout;
pub mod tenancy;
pub mod tenant;

pub use commands::TenantsClearCommand;
pub use config::{Defaults, ResolverConfig, ServiceConfig, SproutConfig, TenancyConfig};
pub use context::{RequestContext, ResponseContext};
pub use error::{SproutError, SproutResult};
pub use events::{EventMeta, ListenerSet, SproutEvent, SproutListener};
pub use hooks::ResolutionHook;
pub use job::{dehydrate, rehydrate, JobTenancyEntry, JobTenantState};
pub use overrides::{
    AuthControls, AuthOverride, CookieOverride, CookieSettings, JobOverride, OverrideFactory,
    ServiceOverride, ServiceOverrideManager, SessionOverride, SessionSettings,
    SharedCookieSettings, SharedSessionSettings, StackedOverride,
};
pub use provider::{
    CachedTenantProvider, EntityTenantProvider, ProviderRegistry, TableTenantProvider,
    TenantColumns, TenantEntityStore, TenantProvider, TenantRecord, TenantSource,
};
pub use resolution::{handle_resolution, parse_options, ResolutionOptions};
pub use resolver::{
    apply_identity_echo, CookieResolver, HeaderResolver, IdentityResolver, PathResolver,
    ResolverFactory, ResolverRegistry, SessionResolver, SubdomainResolver, UrlBinding,
};
pub use settings::{SettingsRegistry, SETTING_URL_DOMAIN, SETTING_URL_PATH};
pub use sprout::Sprout;
pub use tenancy::{
    TenantChange, Tenancy, OPTION_HYDRATE_TENANT_RELATION, OPTION_TENANT_AWARE_JOBS,
    OPTION_THROW_IF_NOT_RELATED,
};
pub use tenant::{GenericTenant, Tenant, TenantKey, TenantResources};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::SproutConfig;
    pub use crate::context::{RequestContext, ResponseContext};
    pub use crate::error::{SproutError, SproutResult};
    pub use crate::hooks::ResolutionHook;
    pub use crate::overrides::{ServiceOverride, ServiceOverrideManager};
    pub use crate::provider::{TableTenantProvider, TenantProvider, TenantSource};
    pub use crate::resolution::handle_resolution;
    pub use crate::resolver::IdentityResolver;
    pub use crate::sprout::Sprout;
    pub use crate::tenancy::Tenancy;
    pub use crate::tenant::{GenericTenant, Tenant, TenantKey};
}
