//! Ambient job override.
//!
//! Maintains the capture list queue integrations read when dehydrating the
//! tenant context into a job payload, without needing a reference to the
//! orchestrator at dispatch time.

use super::ServiceOverride;
use crate::error::SproutResult;
use crate::job::{JobTenancyEntry, JobTenantState};
use crate::tenancy::{Tenancy, OPTION_TENANT_AWARE_JOBS};
use crate::tenant::Tenant;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;

/// Override tracking tenant-aware tenancies for job dispatch.
#[derive(Default)]
pub struct JobOverride {
    capture: RwLock<Vec<JobTenancyEntry>>,
}

impl JobOverride {
    /// Create the override.
    pub fn new() -> Self {
        Self::default()
    }

    /// The tenant context a job dispatched right now should carry.
    pub fn state(&self) -> JobTenantState {
        JobTenantState {
            entries: self.capture.read().clone(),
        }
    }
}

#[async_trait]
impl ServiceOverride for JobOverride {
    async fn setup(&self, tenancy: &Tenancy, tenant: &dyn Tenant) -> SproutResult<()> {
        if !tenancy.has_option(OPTION_TENANT_AWARE_JOBS) {
            return Ok(());
        }

        let mut capture = self.capture.write();
        capture.retain(|entry| entry.tenancy != tenancy.name());
        capture.push(JobTenancyEntry {
            tenancy: tenancy.name().to_string(),
            key: tenant.key(),
        });

        Ok(())
    }

    async fn cleanup(&self, tenancy: &Tenancy, _tenant: &dyn Tenant) -> SproutResult<()> {
        self.capture
            .write()
            .retain(|entry| entry.tenancy != tenancy.name());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
