//! Tenant context for queued jobs.
//!
//! Jobs run outside the request lifecycle, so the tenant must travel with
//! the job payload. [`dehydrate`] captures the current tenancies into a
//! serializable envelope at dispatch time; [`rehydrate`] restores them (and
//! re-runs the override lifecycle) before the job body executes. Only
//! tenancies opted in via the `tenant-aware-jobs` option are captured.

use crate::error::{SproutError, SproutResult};
use crate::sprout::Sprout;
use crate::tenancy::OPTION_TENANT_AWARE_JOBS;
use crate::tenant::TenantKey;
use serde::{Deserialize, Serialize};

/// One captured tenancy in a job payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTenancyEntry {
    /// Tenancy name
    pub tenancy: String,
    /// Key of the tenant that was active at dispatch time
    pub key: TenantKey,
}

/// Serializable tenant context carried by a queued job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTenantState {
    /// Captured tenancies, in stack order
    pub entries: Vec<JobTenancyEntry>,
}

impl JobTenantState {
    /// Whether anything was captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Capture the current tenant context for a job payload.
pub fn dehydrate(sprout: &Sprout) -> JobTenantState {
    let entries = sprout
        .get_all_current_tenancies()
        .into_iter()
        .filter(|tenancy| tenancy.has_option(OPTION_TENANT_AWARE_JOBS))
        .filter_map(|tenancy| {
            tenancy.key().ok().map(|key| JobTenancyEntry {
                tenancy: tenancy.name().to_string(),
                key,
            })
        })
        .collect();

    JobTenantState { entries }
}

/// Restore a job's tenant context on the executing side.
///
/// Re-resolves each captured tenant by key, re-runs the override lifecycle,
/// and marks the context as active. A captured tenant that no longer exists
/// is an error: running the job without its tenant would be worse.
pub async fn rehydrate(sprout: &Sprout, state: &JobTenantState) -> SproutResult<()> {
    for entry in &state.entries {
        let tenancy = sprout.tenancy(Some(&entry.tenancy))?;

        let tenant = tenancy
            .provider()
            .retrieve_by_key(&entry.key)
            .await?
            .ok_or_else(|| SproutError::TenantMissing {
                tenancy: entry.tenancy.clone(),
            })?;

        sprout.set_tenant(&tenancy, Some(tenant)).await?;
        sprout.set_current_tenancy(&tenancy);
    }

    sprout.mark_as_in_context();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serde_round_trip() {
        let state = JobTenantState {
            entries: vec![JobTenancyEntry {
                tenancy: "primary".to_string(),
                key: TenantKey::Int(7),
            }],
        };

        let json = serde_json::to_string(&state).unwrap();
        let back: JobTenantState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
