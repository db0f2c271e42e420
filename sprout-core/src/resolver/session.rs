//! Session-based identity resolution.

use super::{apply_template, IdentityResolver};
use crate::config::ResolverConfig;
use crate::context::RequestContext;
use crate::tenancy::Tenancy;

const DEFAULT_TEMPLATE: &str = "multitenancy.{tenancy}";

/// Resolves the tenant identity from a session value.
///
/// Useful once a tenant has been identified by other means and stored in the
/// session; subsequent requests resolve without re-reading the URL.
pub struct SessionResolver {
    name: String,
    template: String,
}

impl SessionResolver {
    /// Create a resolver with the default session key template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Use a custom session key template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Build from a config entry; the `session` key overrides the template.
    pub fn from_config(name: &str, config: &ResolverConfig) -> Self {
        let mut resolver = Self::new(name);
        if let Some(template) = &config.session {
            resolver = resolver.with_template(template.clone());
        }
        resolver
    }

    /// The concrete session key for a tenancy.
    pub fn session_key(&self, tenancy: &Tenancy) -> String {
        apply_template(&self.template, tenancy)
    }
}

impl IdentityResolver for SessionResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_identity(&self, request: &RequestContext, tenancy: &Tenancy) -> Option<String> {
        request
            .session_value(&self.session_key(tenancy))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::NullProvider;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_resolves_from_session() {
        let resolver = SessionResolver::new("session");
        let tenancy = Tenancy::new("primary", Arc::new(NullProvider));

        let request =
            RequestContext::new("GET", "/").with_session_value("multitenancy.primary", "acme");
        assert_eq!(
            resolver.resolve_identity(&request, &tenancy),
            Some("acme".to_string())
        );
    }
}
