//! Error types for Bud.

use sprout_core::SproutError;
use thiserror::Error;

/// Result type for Bud operations.
pub type BudResult<T> = Result<T, BudError>;

/// Bud-specific errors.
#[derive(Debug, Error)]
pub enum BudError {
    /// A driver's resolved config points back at the driver being built
    #[error("cyclic override detected for {term} [{name}]")]
    CyclicOverride {
        /// What kind of driver was being built (e.g. "database connection")
        term: String,
        /// The name being built
        name: String,
    },

    /// Core tenancy error (missing tenancy/tenant, misconfiguration)
    #[error(transparent)]
    Sprout(#[from] SproutError),

    /// A backing store failed
    #[error("config store [{store}] failed: {message}")]
    Store {
        /// Store name
        store: String,
        /// What went wrong
        message: String,
    },

    /// A config entry could not be serialized or deserialized
    #[error("config entry serialization failed: {0}")]
    Serialization(String),

    /// Encryption or decryption of a config blob failed
    #[error("config encryption failed: {0}")]
    Encryption(String),

    /// Filesystem I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BudError {
    /// A store-level failure.
    pub fn store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
        }
    }

    /// A cyclic driver reference.
    pub fn cyclic(term: impl Into<String>, name: impl Into<String>) -> Self {
        Self::CyclicOverride {
            term: term.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_message_names_term_and_name() {
        let err = BudError::cyclic("database connection", "tenant-db-1");
        assert_eq!(
            err.to_string(),
            "cyclic override detected for database connection [tenant-db-1]"
        );
    }
}
