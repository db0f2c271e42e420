//! Stacked composite override.

use super::ServiceOverride;
use crate::error::SproutResult;
use crate::sprout::Sprout;
use crate::tenancy::Tenancy;
use crate::tenant::Tenant;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Composite of several overrides registered under one service name.
///
/// Setup, cleanup, and boot fan out to each inner override in list order.
pub struct StackedOverride {
    inner: Vec<Arc<dyn ServiceOverride>>,
}

impl StackedOverride {
    /// Create a stack from an ordered list of overrides.
    pub fn new(inner: Vec<Arc<dyn ServiceOverride>>) -> Self {
        Self { inner }
    }

    /// The inner overrides, in fan-out order.
    pub fn overrides(&self) -> &[Arc<dyn ServiceOverride>] {
        &self.inner
    }
}

#[async_trait]
impl ServiceOverride for StackedOverride {
    async fn setup(&self, tenancy: &Tenancy, tenant: &dyn Tenant) -> SproutResult<()> {
        for override_instance in &self.inner {
            override_instance.setup(tenancy, tenant).await?;
        }
        Ok(())
    }

    async fn cleanup(&self, tenancy: &Tenancy, tenant: &dyn Tenant) -> SproutResult<()> {
        for override_instance in &self.inner {
            override_instance.cleanup(tenancy, tenant).await?;
        }
        Ok(())
    }

    fn is_bootable(&self) -> bool {
        self.inner.iter().any(|inner| inner.is_bootable())
    }

    async fn boot(&self, sprout: &Sprout) -> SproutResult<()> {
        for override_instance in &self.inner {
            if override_instance.is_bootable() {
                override_instance.boot(sprout).await?;
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
