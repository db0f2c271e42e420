//! Path-based identity resolution.

use super::{apply_template, IdentityResolver, UrlBinding};
use crate::config::ResolverConfig;
use crate::context::RequestContext;
use crate::error::{SproutError, SproutResult};
use crate::tenancy::Tenancy;
use regex::Regex;

/// Resolves the tenant identity from a URL path segment.
///
/// Prefers a named route parameter when the router provides one, falling
/// back to a positional segment of the raw path. An optional regex constrains
/// which identities are accepted.
#[derive(Debug)]
pub struct PathResolver {
    name: String,
    segment: usize,
    parameter: String,
    pattern: Option<Regex>,
}

impl PathResolver {
    /// Create a resolver reading the given 1-based path segment.
    pub fn new(name: impl Into<String>, segment: usize) -> Self {
        Self {
            name: name.into(),
            segment: segment.max(1),
            parameter: "{tenancy}".to_string(),
            pattern: None,
        }
    }

    /// Use a custom route-parameter name template.
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = parameter.into();
        self
    }

    /// Constrain accepted identities to a regex.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Build from a config entry. An invalid `pattern` is a
    /// misconfiguration error.
    pub fn from_config(name: &str, config: &ResolverConfig) -> SproutResult<Self> {
        let mut resolver = Self::new(name, config.segment.unwrap_or(1));

        if let Some(parameter) = &config.parameter {
            resolver = resolver.with_parameter(parameter.clone());
        }

        if let Some(pattern) = &config.pattern {
            let compiled = Regex::new(pattern).map_err(|err| {
                SproutError::misconfigured(
                    "resolver",
                    name,
                    format!("invalid pattern [{pattern}]: {err}"),
                )
            })?;
            resolver = resolver.with_pattern(compiled);
        }

        Ok(resolver)
    }

    /// The route-parameter name for a tenancy, with templating applied.
    pub fn parameter_name(&self, tenancy: &Tenancy) -> String {
        apply_template(&self.parameter, tenancy)
    }

    fn accept(&self, identity: &str) -> Option<String> {
        match &self.pattern {
            Some(pattern) if !pattern.is_match(identity) => None,
            _ => Some(identity.to_string()),
        }
    }
}

impl IdentityResolver for PathResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_identity(&self, request: &RequestContext, tenancy: &Tenancy) -> Option<String> {
        let parameter = self.parameter_name(tenancy);

        if let Some(identity) = request.route_param(&parameter) {
            return self.accept(identity);
        }

        self.accept(request.path_segment(self.segment)?)
    }

    fn uses_route_parameters(&self) -> bool {
        true
    }

    fn route(
        &self,
        template: &str,
        tenancy: &Tenancy,
        identity: &str,
        _absolute: bool,
    ) -> Option<String> {
        let placeholder = format!("{{{}}}", self.parameter_name(tenancy));

        if template.contains(&placeholder) {
            return Some(template.replace(&placeholder, identity));
        }

        let path = template.trim_start_matches('/');
        if path.is_empty() {
            Some(format!("/{identity}"))
        } else {
            Some(format!("/{identity}/{path}"))
        }
    }

    fn url_binding(&self, _tenancy: &Tenancy, identity: &str) -> Option<UrlBinding> {
        Some(UrlBinding {
            path: Some(format!("/{identity}")),
            domain: None,
        })
    }
}
