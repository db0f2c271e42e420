//! Cookie-based identity resolution.

use super::{apply_template, IdentityResolver};
use crate::config::ResolverConfig;
use crate::context::RequestContext;
use crate::tenancy::Tenancy;

const DEFAULT_TEMPLATE: &str = "{tenancy}-identifier";

/// Resolves the tenant identity from a request cookie.
///
/// Shares the header resolver's `{tenancy}` name templating.
pub struct CookieResolver {
    name: String,
    template: String,
}

impl CookieResolver {
    /// Create a resolver with the default cookie name template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Use a custom cookie name template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Build from a config entry; the `cookie` key overrides the template.
    pub fn from_config(name: &str, config: &ResolverConfig) -> Self {
        let mut resolver = Self::new(name);
        if let Some(template) = &config.cookie {
            resolver = resolver.with_template(template.clone());
        }
        resolver
    }

    /// The concrete cookie name for a tenancy.
    pub fn cookie_name(&self, tenancy: &Tenancy) -> String {
        apply_template(&self.template, tenancy)
    }
}

impl IdentityResolver for CookieResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_identity(&self, request: &RequestContext, tenancy: &Tenancy) -> Option<String> {
        request
            .cookie(&self.cookie_name(tenancy))
            .map(str::to_string)
    }
}
