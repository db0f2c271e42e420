//! Header-based identity resolution and the response identity echo.

use super::{apply_template, IdentityResolver};
use crate::config::ResolverConfig;
use crate::context::{RequestContext, ResponseContext};
use crate::error::SproutResult;
use crate::sprout::Sprout;
use crate::tenancy::Tenancy;

const DEFAULT_TEMPLATE: &str = "{tenancy}-identifier";

/// Resolves the tenant identity from a request header.
///
/// The header name is a template; `{tenancy}` is replaced with the tenancy
/// name, so one resolver serves several tenancies without colliding.
pub struct HeaderResolver {
    name: String,
    template: String,
}

impl HeaderResolver {
    /// Create a resolver with the default `{tenancy}-identifier` template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Use a custom header name template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Build from a config entry; the `header` key overrides the template.
    pub fn from_config(name: &str, config: &ResolverConfig) -> Self {
        let mut resolver = Self::new(name);
        if let Some(template) = &config.header {
            resolver = resolver.with_template(template.clone());
        }
        resolver
    }

    /// The concrete header name for a tenancy.
    pub fn header_name(&self, tenancy: &Tenancy) -> String {
        apply_template(&self.template, tenancy)
    }
}

impl IdentityResolver for HeaderResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_identity(&self, request: &RequestContext, tenancy: &Tenancy) -> Option<String> {
        request
            .header(&self.header_name(tenancy))
            .map(str::to_string)
    }

    fn response_header(&self, tenancy: &Tenancy) -> Option<String> {
        Some(self.header_name(tenancy))
    }
}

/// Echo the resolved identity onto the outgoing response.
///
/// Applies only when the current tenancy was resolved by a resolver that
/// opts into round-trip identification (the header resolver); any other
/// resolver leaves the response untouched.
pub fn apply_identity_echo(sprout: &Sprout, response: &mut ResponseContext) -> SproutResult<()> {
    let Some(tenancy) = sprout.get_current_tenancy() else {
        return Ok(());
    };

    let (Some(resolver_name), Some(tenant)) = (tenancy.resolved_via(), tenancy.tenant()) else {
        return Ok(());
    };

    let resolver = sprout.resolver(Some(&resolver_name))?;

    if let Some(header) = resolver.response_header(&tenancy) {
        response.insert_header(header, tenant.identifier());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::tests::NullProvider;
    use super::*;
    use std::sync::Arc;

    fn tenancy() -> Tenancy {
        Tenancy::new("primary", Arc::new(NullProvider))
    }

    #[test]
    fn test_templated_header_name() {
        let resolver = HeaderResolver::new("header");
        assert_eq!(resolver.header_name(&tenancy()), "primary-identifier");

        let custom = HeaderResolver::new("header").with_template("X-{tenancy}-Tenant");
        assert_eq!(custom.header_name(&tenancy()), "X-primary-Tenant");
    }

    #[test]
    fn test_resolves_from_header() {
        let resolver = HeaderResolver::new("header");
        let tenancy = tenancy();

        let request =
            RequestContext::new("GET", "/").with_header("Primary-Identifier", "acme");
        assert_eq!(
            resolver.resolve_identity(&request, &tenancy),
            Some("acme".to_string())
        );

        let empty = RequestContext::new("GET", "/");
        assert_eq!(resolver.resolve_identity(&empty, &tenancy), None);
    }

    #[test]
    fn test_opts_into_response_echo() {
        let resolver = HeaderResolver::new("header");
        assert_eq!(
            resolver.response_header(&tenancy()),
            Some("primary-identifier".to_string())
        );
    }
}
