//! Hook dispatch.
//!
//! [`handle_resolution`] is the single entry point middleware and routing
//! integrations call to identify a tenant. It gates on the enabled hooks,
//! asks the resolver for an identity, looks the tenant up through the
//! tenancy's provider, and hands the result to the orchestrator, which runs
//! the override lifecycle. Whether absence is fatal is the caller's choice.

use crate::context::RequestContext;
use crate::error::{SproutError, SproutResult};
use crate::hooks::ResolutionHook;
use crate::settings::{SETTING_URL_DOMAIN, SETTING_URL_PATH};
use crate::sprout::Sprout;
use crate::tenant::Tenant;
use std::sync::Arc;
use tracing::debug;

/// Resolver and tenancy names parsed from middleware-style options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionOptions {
    /// Resolver name, when one was given
    pub resolver: Option<String>,
    /// Tenancy name, when one was given
    pub tenancy: Option<String>,
}

/// Parse middleware option strings.
///
/// Accepts `resolver:NAME` / `tenancy:NAME` pairs in any order, or bare
/// positional values (resolver first, tenancy second). Empty strings and
/// `*` mean "use the default".
///
/// # Examples
///
/// ```
/// use sprout_core::resolution::parse_options;
///
/// let options = parse_options(&["resolver:header".to_string(), "tenancy:primary".to_string()]);
/// assert_eq!(options.resolver.as_deref(), Some("header"));
/// assert_eq!(options.tenancy.as_deref(), Some("primary"));
///
/// let positional = parse_options(&["subdomain".to_string()]);
/// assert_eq!(positional.resolver.as_deref(), Some("subdomain"));
/// assert_eq!(positional.tenancy, None);
/// ```
pub fn parse_options(options: &[String]) -> ResolutionOptions {
    let mut parsed = ResolutionOptions::default();
    let mut positional = 0usize;

    for option in options {
        let option = option.trim();
        if option.is_empty() || option == "*" {
            positional += 1;
            continue;
        }

        if let Some(name) = option.strip_prefix("resolver:") {
            parsed.resolver = Some(name.to_string());
        } else if let Some(name) = option.strip_prefix("tenancy:") {
            parsed.tenancy = Some(name.to_string());
        } else {
            match positional {
                0 => parsed.resolver = Some(option.to_string()),
                1 => parsed.tenancy = Some(option.to_string()),
                _ => {}
            }
            positional += 1;
        }
    }

    parsed
}

// Clears the orchestrator's current hook once the attempt finishes,
// including on error paths.
struct HookGuard<'a> {
    sprout: &'a Sprout,
}

impl Drop for HookGuard<'_> {
    fn drop(&mut self) {
        self.sprout.set_current_hook(None);
    }
}

/// Run tenant identification for one hook.
///
/// Returns `Ok(None)` when the hook is not enabled, when the tenancy was
/// already resolved (unless `force` is set), or when nothing was found and
/// resolution is optional. Raises [`SproutError::NoTenantFound`] for a
/// mandatory resolution that produced nothing, and
/// [`SproutError::Compatibility`] when optional resolution is combined with
/// a resolver that requires route parameters.
#[allow(clippy::too_many_arguments)]
pub async fn handle_resolution(
    request: &RequestContext,
    hook: ResolutionHook,
    sprout: &Sprout,
    resolver_name: Option<&str>,
    tenancy_name: Option<&str>,
    throw_if_not_resolved: bool,
    force: bool,
) -> SproutResult<Option<Arc<dyn Tenant>>> {
    if !sprout.supports_hook(hook) {
        debug!(hook = hook.as_str(), "hook is not enabled, skipping resolution");
        return Ok(None);
    }

    sprout.set_current_hook(Some(hook));
    let _guard = HookGuard { sprout };

    let tenancy = sprout.tenancy(tenancy_name)?;
    let resolver = sprout.resolver(resolver_name)?;

    if !throw_if_not_resolved && resolver.uses_route_parameters() {
        return Err(SproutError::Compatibility {
            resolver: resolver.name().to_string(),
        });
    }

    if tenancy.was_resolved() && !force {
        return Ok(tenancy.tenant());
    }

    let Some(identity) = resolver.resolve_identity(request, &tenancy) else {
        if throw_if_not_resolved {
            return Err(SproutError::NoTenantFound {
                resolver: resolver.name().to_string(),
                tenancy: tenancy.name().to_string(),
            });
        }
        return Ok(None);
    };

    let Some(tenant) = tenancy.provider().retrieve_by_identifier(&identity).await? else {
        if throw_if_not_resolved {
            return Err(SproutError::NoTenantFound {
                resolver: resolver.name().to_string(),
                tenancy: tenancy.name().to_string(),
            });
        }
        return Ok(None);
    };

    if let Some(binding) = resolver.url_binding(&tenancy, &identity) {
        let settings = sprout.settings();
        if let Some(path) = binding.path {
            settings.set(SETTING_URL_PATH, path);
        }
        if let Some(domain) = binding.domain {
            settings.set(SETTING_URL_DOMAIN, domain);
        }
    }

    sprout.set_tenant(&tenancy, Some(Arc::clone(&tenant))).await?;
    tenancy.mark_resolved(resolver.name(), hook);
    sprout.set_current_tenancy(&tenancy);

    debug!(
        resolver = resolver.name(),
        tenancy = tenancy.name(),
        tenant = tenant.identifier(),
        hook = hook.as_str(),
        "resolved tenant"
    );

    Ok(Some(tenant))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_keyed() {
        let options = parse_options(&[
            "tenancy:secondary".to_string(),
            "resolver:cookie".to_string(),
        ]);
        assert_eq!(options.resolver.as_deref(), Some("cookie"));
        assert_eq!(options.tenancy.as_deref(), Some("secondary"));
    }

    #[test]
    fn test_parse_options_positional() {
        let options = parse_options(&["header".to_string(), "primary".to_string()]);
        assert_eq!(options.resolver.as_deref(), Some("header"));
        assert_eq!(options.tenancy.as_deref(), Some("primary"));
    }

    #[test]
    fn test_parse_options_wildcard_skips_position() {
        let options = parse_options(&["*".to_string(), "primary".to_string()]);
        assert_eq!(options.resolver, None);
        assert_eq!(options.tenancy.as_deref(), Some("primary"));
    }

    #[test]
    fn test_parse_options_empty() {
        assert_eq!(parse_options(&[]), ResolutionOptions::default());
    }
}
