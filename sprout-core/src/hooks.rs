//! Resolution hooks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle point at which tenant identification is permitted to run.
///
/// Only hooks enabled in [`SproutConfig`](crate::SproutConfig) are consulted;
/// the orchestrator tracks at most one current hook per resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionHook {
    /// During application boot, before routing
    Booting,
    /// During route matching
    Routing,
    /// Inside the middleware pipeline
    Middleware,
}

impl ResolutionHook {
    /// Stable string form used in config and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booting => "booting",
            Self::Routing => "routing",
            Self::Middleware => "middleware",
        }
    }
}

impl fmt::Display for ResolutionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&ResolutionHook::Middleware).unwrap();
        assert_eq!(json, "\"middleware\"");
        let hook: ResolutionHook = serde_json::from_str(&json).unwrap();
        assert_eq!(hook, ResolutionHook::Middleware);
    }
}
