//! Unit-of-work settings repository.

use parking_lot::RwLock;
use std::collections::HashMap;

/// URL path prefix contributed by the resolving resolver.
pub const SETTING_URL_PATH: &str = "url.path";
/// Tenant-scoped domain contributed by the resolving resolver.
pub const SETTING_URL_DOMAIN: &str = "url.domain";

/// Keyed settings shared across one unit of work.
///
/// Resolvers deposit URL facts here during resolution; ambient overrides
/// (cookie, session) read them when scoping their service to the tenant.
#[derive(Default)]
pub struct SettingsRegistry {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl SettingsRegistry {
    /// Create an empty settings repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a setting.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.values.read().get(key).cloned()
    }

    /// Read a string setting.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Store a setting.
    pub fn set(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Remove a setting.
    pub fn forget(&self, key: &str) {
        self.values.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_forget() {
        let settings = SettingsRegistry::new();
        assert_eq!(settings.get(SETTING_URL_PATH), None);

        settings.set(SETTING_URL_PATH, "/acme");
        assert_eq!(settings.get_str(SETTING_URL_PATH), Some("/acme".to_string()));

        settings.forget(SETTING_URL_PATH);
        assert_eq!(settings.get(SETTING_URL_PATH), None);
    }
}
