//! Error types for the Sprout core.

use thiserror::Error;

/// Result type for Sprout operations.
pub type SproutResult<T> = Result<T, SproutError>;

/// Sprout-specific errors.
#[derive(Debug, Error)]
pub enum SproutError {
    /// A current tenancy was required but none is set
    #[error("there is no current tenancy")]
    TenancyMissing,

    /// Tenant-dependent functionality was used outside of a multitenanted context
    #[error("the current context is not multitenanted")]
    OutsideContext,

    /// A tenancy exists but has no active tenant
    #[error("there is no current tenant for tenancy [{tenancy}]")]
    TenantMissing {
        /// Name of the tenancy that has no active tenant
        tenancy: String,
    },

    /// Identity resolution ran but produced no matching tenant
    #[error("no tenant was found by resolver [{resolver}] for tenancy [{tenancy}]")]
    NoTenantFound {
        /// Name of the resolver that attempted resolution
        resolver: String,
        /// Name of the tenancy being resolved
        tenancy: String,
    },

    /// Missing or invalid configuration
    #[error("{subject} [{name}] is misconfigured: {problem}")]
    Misconfiguration {
        /// Kind of thing being configured (e.g. "resolver", "config store")
        subject: String,
        /// Name of the misconfigured instance
        name: String,
        /// What is missing or invalid
        problem: String,
    },

    /// A resolver that requires route parameters was used on an optional-resolution path
    #[error("resolver [{resolver}] uses route parameters and cannot be used for optional resolution")]
    Compatibility {
        /// Name of the incompatible resolver
        resolver: String,
    },

    /// A service override registration was rejected
    #[error("service override [{service}] is invalid: {reason}")]
    ServiceOverrideInvalid {
        /// Service name the registration targeted
        service: String,
        /// Why the registration was rejected
        reason: String,
    },

    /// An application-provided collaborator (tenant source, driver builder) failed
    #[error("collaborator error: {0}")]
    Source(String),
}

impl SproutError {
    /// Misconfiguration with an arbitrary problem description.
    pub fn misconfigured(
        subject: impl Into<String>,
        name: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::Misconfiguration {
            subject: subject.into(),
            name: name.into(),
            problem: problem.into(),
        }
    }

    /// A required config key is absent.
    pub fn missing_config(
        subject: impl Into<String>,
        name: impl Into<String>,
        key: &str,
    ) -> Self {
        Self::misconfigured(subject, name, format!("missing required config key [{key}]"))
    }

    /// A driver name has no registered factory.
    pub fn unknown_driver(
        subject: impl Into<String>,
        name: impl Into<String>,
        driver: &str,
    ) -> Self {
        Self::misconfigured(subject, name, format!("unsupported driver [{driver}]"))
    }

    /// No default is configured for the given subject.
    pub fn no_default(subject: impl Into<String>) -> Self {
        Self::Misconfiguration {
            subject: subject.into(),
            name: "default".to_string(),
            problem: "no default is configured".to_string(),
        }
    }
}
