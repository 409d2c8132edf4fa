//! Credential masking: [`SecretString`] and [`SecureConfig`] (spec §4.10).

use std::{collections::BTreeMap, fmt};

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string that zeroes its backing memory on drop and never prints its
/// real value through `Debug`/`Display` — only a `prefix***suffix` mask.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps `value` as a secret.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the real value. Callers must not log or `Debug`-print the
    /// result.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns a `prefix***suffix` mask safe to log. Values of 8
    /// characters or fewer mask to a bare `***` to avoid leaking most of
    /// a short secret.
    #[must_use]
    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString({})", self.masked())
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 3..].iter().collect();
    format!("{prefix}***{suffix}")
}

/// A single configured value: plain config (provider type, endpoint URL)
/// or a credential that must stay masked.
#[derive(Clone)]
pub enum ConfigValue {
    /// Non-sensitive configuration, printed as-is.
    Plain(String),
    /// A credential, printed only as a mask.
    Secret(SecretString),
}

impl ConfigValue {
    /// Returns the real underlying value regardless of kind.
    #[must_use]
    pub fn expose(&self) -> &str {
        match self {
            Self::Plain(value) => value,
            Self::Secret(secret) => secret.expose(),
        }
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => write!(f, "Plain({value:?})"),
            Self::Secret(secret) => write!(f, "Secret({secret:?})"),
        }
    }
}

/// Key name fragments that cause a config entry to be treated as a
/// credential (spec §4.10). Matched case-insensitively against a
/// normalized (dashes/underscores stripped) key.
const SENSITIVE_FRAGMENTS: &[&str] = &["apikey", "token", "secret", "password", "credential"];

fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    SENSITIVE_FRAGMENTS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

/// Holds provider configuration — endpoints, provider types, and
/// credentials — auto-classifying sensitive keys so they can never be
/// logged in the clear.
#[derive(Debug, Default, Clone)]
pub struct SecureConfig {
    entries: BTreeMap<String, ConfigValue>,
}

impl SecureConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`, automatically masking it if the key
    /// matches the sensitive pattern set.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        let config_value = if is_sensitive_key(&key) {
            ConfigValue::Secret(SecretString::new(value))
        } else {
            ConfigValue::Plain(value)
        };
        self.entries.insert(key, config_value);
        self
    }

    /// Returns the raw configured value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(ConfigValue::expose)
    }

    /// Returns whether `key` was classified as sensitive.
    #[must_use]
    pub fn is_secret(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(ConfigValue::Secret(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_hides_middle_of_long_secrets() {
        let secret = SecretString::new("sk-abcdefghijklmnop");
        let masked = secret.masked();
        assert!(masked.starts_with("sk-"));
        assert!(masked.ends_with("nop"));
        assert!(!masked.contains("abcdefghijklmnop"));
    }

    #[test]
    fn mask_collapses_short_secrets_entirely() {
        assert_eq!(SecretString::new("short").masked(), "***");
    }

    #[test]
    fn debug_and_display_never_leak_the_secret() {
        let secret = SecretString::new("sk-abcdefghijklmnop");
        let debug = format!("{secret:?}");
        let display = format!("{secret}");
        assert!(!debug.contains("abcdefghijklmnop"));
        assert!(!display.contains("abcdefghijklmnop"));
    }

    #[test]
    fn sensitive_keys_are_auto_classified() {
        let mut config = SecureConfig::new();
        config.insert("api_key", "sk-secretvalue123");
        config.insert("endpoint", "https://example.test");
        config.insert("AUTH_TOKEN", "tok-xyz");

        assert!(config.is_secret("api_key"));
        assert!(config.is_secret("AUTH_TOKEN"));
        assert!(!config.is_secret("endpoint"));
        assert_eq!(config.get("endpoint"), Some("https://example.test"));
    }
}
