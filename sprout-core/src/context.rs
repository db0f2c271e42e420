//! Request and response boundary types.
//!
//! Sprout does not own the HTTP layer. Identity resolvers read from a
//! [`RequestContext`], a narrow request-like view the surrounding framework
//! fills in, and the identity echo writes to a [`ResponseContext`]. Header
//! keys are stored lowercased, matching how frameworks normalise them.

use std::collections::HashMap;

/// Request-like view consumed by identity resolvers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    session: HashMap<String, String>,
    route_params: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprout_core::RequestContext;
    ///
    /// let request = RequestContext::new("GET", "/acme/dashboard");
    /// assert_eq!(request.path(), "/acme/dashboard");
    /// ```
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Add a header. Keys are lowercased on insertion.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add a session value.
    pub fn with_session_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.session.insert(key.into(), value.into());
        self
    }

    /// Add a route parameter.
    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(name.into(), value.into());
        self
    }

    /// Request method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up a header by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Look up a cookie by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Look up a session value by key.
    pub fn session_value(&self, key: &str) -> Option<&str> {
        self.session.get(key).map(String::as_str)
    }

    /// Look up a route parameter by name.
    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    /// The `Host` header, if present.
    pub fn host(&self) -> Option<&str> {
        self.header("host")
    }

    /// Positional path segment, 1-based, ignoring empty segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprout_core::RequestContext;
    ///
    /// let request = RequestContext::new("GET", "/acme/users/1");
    /// assert_eq!(request.path_segment(1), Some("acme"));
    /// assert_eq!(request.path_segment(4), None);
    /// ```
    pub fn path_segment(&self, position: usize) -> Option<&str> {
        if position == 0 {
            return None;
        }
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .nth(position - 1)
    }
}

/// Response-like view written to by the identity echo.
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    headers: HashMap<String, String>,
}

impl ResponseContext {
    /// Create an empty response context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header on the outgoing response.
    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Look up a header by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All response headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = RequestContext::new("GET", "/").with_header("X-Tenant", "acme");
        assert_eq!(request.header("x-tenant"), Some("acme"));
        assert_eq!(request.header("X-TENANT"), Some("acme"));
    }

    #[test]
    fn test_path_segments() {
        let request = RequestContext::new("GET", "/acme//users/");
        assert_eq!(request.path_segment(1), Some("acme"));
        assert_eq!(request.path_segment(2), Some("users"));
        assert_eq!(request.path_segment(0), None);
        assert_eq!(request.path_segment(3), None);
    }

    #[test]
    fn test_response_headers() {
        let mut response = ResponseContext::new();
        response.insert_header("Primary-Identifier", "acme");
        assert_eq!(response.header("Primary-Identifier"), Some("acme"));
        assert_eq!(response.header("other"), None);
    }
}
