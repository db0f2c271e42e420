//! Ambient auth override.
//!
//! Authenticated state must never survive a tenant change: a user resolved
//! under one tenant is meaningless (or dangerous) under another. The
//! override flushes the application's guard and password-broker state on
//! both sides of a change.

use super::ServiceOverride;
use crate::error::SproutResult;
use crate::tenancy::Tenancy;
use crate::tenant::Tenant;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// Narrow interface to the application's auth layer.
pub trait AuthControls: Send + Sync {
    /// Forget resolved guard users and cached password brokers.
    fn flush(&self);
}

/// Override flushing auth state around tenant changes.
pub struct AuthOverride {
    controls: Arc<dyn AuthControls>,
}

impl AuthOverride {
    /// Create the override over the application's auth controls.
    pub fn new(controls: Arc<dyn AuthControls>) -> Self {
        Self { controls }
    }
}

#[async_trait]
impl ServiceOverride for AuthOverride {
    async fn setup(&self, tenancy: &Tenancy, _tenant: &dyn Tenant) -> SproutResult<()> {
        debug!(tenancy = tenancy.name(), "flushing auth state for incoming tenant");
        self.controls.flush();
        Ok(())
    }

    async fn cleanup(&self, tenancy: &Tenancy, _tenant: &dyn Tenant) -> SproutResult<()> {
        debug!(tenancy = tenancy.name(), "flushing auth state for outgoing tenant");
        self.controls.flush();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
