//! Service overrides.
//!
//! A service override makes one framework service tenant-aware. Every
//! override implements setup/cleanup, invoked when the active tenant of a
//! tenancy changes; bootable overrides additionally run a one-time boot
//! step. Ambient overrides adjust shared defaults for the duration of a
//! tenancy being active, while driver-creator overrides (see `sprout-bud`)
//! intercept driver construction.

mod auth;
mod cookie;
mod job;
mod manager;
mod session;
mod stacked;

pub use auth::{AuthControls, AuthOverride};
pub use cookie::{CookieOverride, CookieSettings, SharedCookieSettings};
pub use job::JobOverride;
pub use manager::{OverrideFactory, ServiceOverrideManager};
pub use session::{SessionOverride, SessionSettings, SharedSessionSettings};
pub use stacked::StackedOverride;

use crate::error::SproutResult;
use crate::sprout::Sprout;
use crate::tenancy::Tenancy;
use crate::tenant::Tenant;
use async_trait::async_trait;
use std::any::Any;

/// Contract for tenant-aware service overrides.
#[async_trait]
pub trait ServiceOverride: Send + Sync {
    /// Apply tenant-specific behaviour for the incoming tenant.
    async fn setup(&self, tenancy: &Tenancy, tenant: &dyn Tenant) -> SproutResult<()>;

    /// Undo tenant-specific behaviour for the outgoing tenant.
    async fn cleanup(&self, tenancy: &Tenancy, tenant: &dyn Tenant) -> SproutResult<()>;

    /// Whether this override participates in the boot phase.
    fn is_bootable(&self) -> bool {
        false
    }

    /// One-time boot step for bootable overrides.
    async fn boot(&self, sprout: &Sprout) -> SproutResult<()> {
        let _ = sprout;
        Ok(())
    }

    /// Downcasting support, for integrations that need the concrete override.
    fn as_any(&self) -> &dyn Any;
}
