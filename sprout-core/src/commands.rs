//! Administrative commands.

use crate::sprout::Sprout;
use clap::Parser;
use tracing::{error, info};

/// Clear cached tenant records.
///
/// With no provider named, clears every provider registered with caching;
/// with a provider named, clears only that provider's cache.
///
/// # Examples
///
/// ```rust,ignore
/// let command = TenantsClearCommand::parse_from(["tenants:clear", "--provider", "tenants"]);
/// let code = command.run(&sprout).await;
/// assert_eq!(code, 0);
/// ```
#[derive(Debug, Parser)]
#[command(name = "tenants:clear", about = "Clear cached tenant records")]
pub struct TenantsClearCommand {
    /// Provider whose cache should be cleared; all cached providers when omitted
    #[arg(long)]
    pub provider: Option<String>,
}

impl TenantsClearCommand {
    /// Execute the command, returning a process exit code.
    pub async fn run(&self, sprout: &Sprout) -> i32 {
        match sprout
            .providers()
            .clear_cache(self.provider.as_deref())
            .await
        {
            Ok(cleared) => {
                info!(providers = ?cleared, "cleared tenant caches");
                0
            }
            Err(err) => {
                error!(%err, "failed to clear tenant caches");
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SproutConfig;
    use crate::error::SproutResult;
    use crate::provider::{TableTenantProvider, TenantRecord, TenantSource};
    use clap::Parser;
    use std::sync::Arc;

    struct EmptySource;

    #[async_trait::async_trait]
    impl TenantSource for EmptySource {
        async fn find_by(
            &self,
            _column: &str,
            _value: &serde_json::Value,
        ) -> SproutResult<Option<TenantRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_clear_all_succeeds() {
        let sprout = Sprout::new(SproutConfig::default());
        sprout.providers().register_cached(Arc::new(TableTenantProvider::new(
            "tenants",
            Arc::new(EmptySource),
        )));

        let command = TenantsClearCommand::parse_from(["tenants:clear"]);
        assert_eq!(command.run(&sprout).await, 0);
    }

    #[tokio::test]
    async fn test_clear_unknown_provider_fails() {
        let sprout = Sprout::new(SproutConfig::default());

        let command =
            TenantsClearCommand::parse_from(["tenants:clear", "--provider", "missing"]);
        assert_eq!(command.run(&sprout).await, 1);
    }
}
