//! Subdomain-based identity resolution.

use super::{IdentityResolver, UrlBinding};
use crate::config::ResolverConfig;
use crate::context::RequestContext;
use crate::error::{SproutError, SproutResult};
use crate::tenancy::Tenancy;

/// Resolves the tenant identity from the leftmost subdomain label.
///
/// With a parent domain of `example.com`, a request for
/// `acme.example.com` resolves the identity `acme`.
#[derive(Debug)]
pub struct SubdomainResolver {
    name: String,
    domain: String,
}

impl SubdomainResolver {
    /// Create a resolver for the given parent domain.
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Build from a config entry; the `domain` key is required.
    pub fn from_config(name: &str, config: &ResolverConfig) -> SproutResult<Self> {
        let domain = config
            .domain
            .clone()
            .ok_or_else(|| SproutError::missing_config("resolver", name, "domain"))?;

        Ok(Self::new(name, domain))
    }

    fn extract_subdomain(&self, host: &str) -> Option<String> {
        // Strip a port before matching the parent domain.
        let host = host.split(':').next().unwrap_or(host);

        let subdomain = host.strip_suffix(&format!(".{}", self.domain))?;
        if subdomain.is_empty() || subdomain.contains('.') {
            return None;
        }

        Some(subdomain.to_string())
    }
}

impl IdentityResolver for SubdomainResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_identity(&self, request: &RequestContext, tenancy: &Tenancy) -> Option<String> {
        // Domain-bound routes surface the label as a route parameter; fall
        // back to the host header otherwise.
        if let Some(identity) = request.route_param(tenancy.name()) {
            return Some(identity.to_string());
        }

        self.extract_subdomain(request.host()?)
    }

    fn uses_route_parameters(&self) -> bool {
        true
    }

    fn route(
        &self,
        template: &str,
        _tenancy: &Tenancy,
        identity: &str,
        absolute: bool,
    ) -> Option<String> {
        // A relative URL cannot carry the subdomain.
        if !absolute {
            return None;
        }

        let path = if template.starts_with('/') {
            template.to_string()
        } else {
            format!("/{template}")
        };

        Some(format!("https://{identity}.{}{path}", self.domain))
    }

    fn url_binding(&self, _tenancy: &Tenancy, identity: &str) -> Option<UrlBinding> {
        Some(UrlBinding {
            path: None,
            domain: Some(format!("{identity}.{}", self.domain)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::NullProvider;
    use super::*;
    use std::sync::Arc;

    fn tenancy() -> Tenancy {
        Tenancy::new("primary", Arc::new(NullProvider))
    }

    fn resolver() -> SubdomainResolver {
        SubdomainResolver::new("subdomain", "example.com")
    }

    #[test]
    fn test_resolves_leftmost_label() {
        let request = RequestContext::new("GET", "/").with_header("host", "acme.example.com");
        assert_eq!(
            resolver().resolve_identity(&request, &tenancy()),
            Some("acme".to_string())
        );
    }

    #[test]
    fn test_ignores_port_and_rejects_nested_labels() {
        let tenancy = tenancy();
        let with_port =
            RequestContext::new("GET", "/").with_header("host", "acme.example.com:8080");
        assert_eq!(
            resolver().resolve_identity(&with_port, &tenancy),
            Some("acme".to_string())
        );

        let nested = RequestContext::new("GET", "/").with_header("host", "a.b.example.com");
        assert_eq!(resolver().resolve_identity(&nested, &tenancy), None);

        let bare = RequestContext::new("GET", "/").with_header("host", "example.com");
        assert_eq!(resolver().resolve_identity(&bare, &tenancy), None);
    }

    #[test]
    fn test_prefers_route_parameter() {
        let request = RequestContext::new("GET", "/")
            .with_header("host", "other.example.com")
            .with_route_param("primary", "acme");
        assert_eq!(
            resolver().resolve_identity(&request, &tenancy()),
            Some("acme".to_string())
        );
    }

    #[test]
    fn test_route_is_absolute_only() {
        let tenancy = tenancy();
        assert_eq!(
            resolver().route("dashboard", &tenancy, "acme", true),
            Some("https://acme.example.com/dashboard".to_string())
        );
        assert_eq!(resolver().route("dashboard", &tenancy, "acme", false), None);
    }

    #[test]
    fn test_from_config_requires_domain() {
        let config = ResolverConfig::for_driver("subdomain");
        let err = SubdomainResolver::from_config("subdomain", &config).unwrap_err();
        assert!(err.to_string().contains("domain"));
    }
}
