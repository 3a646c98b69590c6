//! Application configuration stored in the database.
//!
//! Unlike the process configuration loaded at startup, these values are
//! editable at runtime and reach services through the read-through cache.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key of the address system emails are sent from.
pub const SYSTEM_FROM_EMAIL_ADDRESS: &str = "SYSTEM_FROM_EMAIL_ADDRESS";

/// Key of the address contact-form messages are delivered to.
pub const CONTACT_EMAIL_ADDRESS: &str = "CONTACT_EMAIL_ADDRESS";

/// Key of the login session lifetime in minutes.
pub const SESSION_TIMEOUT_MINUTES: &str = "SESSION_TIMEOUT_MINUTES";

const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 60;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TIMEOUT_MINUTES: i64 = 366 * 24 * 60;

/// A single configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationItem {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

impl ConfigurationItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
        }
    }
}

/// Immutable view over the configuration rows.
#[derive(Debug, Clone, Default)]
pub struct ApplicationConfiguration {
    values: HashMap<String, String>,
}

impl ApplicationConfiguration {
    /// Builds the view; a later row wins when a key appears twice.
    pub fn from_items(items: &[ConfigurationItem]) -> Self {
        let values = items
            .iter()
            .map(|item| (item.key.clone(), item.value.clone()))
            .collect();
        Self { values }
    }

    /// Returns the trimmed value for `key`, ignoring blank values.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn system_from_email_address(&self) -> Option<&str> {
        self.get(SYSTEM_FROM_EMAIL_ADDRESS)
    }

    pub fn contact_email_address(&self) -> Option<&str> {
        self.get(CONTACT_EMAIL_ADDRESS)
    }

    /// Session lifetime; falls back to 60 minutes when unset, not a positive
    /// number, or longer than [`MAX_SESSION_TIMEOUT_MINUTES`].
    pub fn session_timeout_minutes(&self) -> i64 {
        self.get(SESSION_TIMEOUT_MINUTES)
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|minutes| (1..=MAX_SESSION_TIMEOUT_MINUTES).contains(minutes))
            .unwrap_or(DEFAULT_SESSION_TIMEOUT_MINUTES)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<ConfigurationItem> {
        vec![
            ConfigurationItem::new(SYSTEM_FROM_EMAIL_ADDRESS, "noreply@example.com"),
            ConfigurationItem::new(CONTACT_EMAIL_ADDRESS, " support@example.com "),
            ConfigurationItem::new(SESSION_TIMEOUT_MINUTES, "15"),
        ]
    }

    #[test]
    fn test_named_accessors() {
        let config = ApplicationConfiguration::from_items(&items());
        assert_eq!(
            config.system_from_email_address(),
            Some("noreply@example.com")
        );
        assert_eq!(config.contact_email_address(), Some("support@example.com"));
        assert_eq!(config.session_timeout_minutes(), 15);
        assert_eq!(config.len(), 3);
    }

    #[test]
    fn test_missing_and_blank_values() {
        let config =
            ApplicationConfiguration::from_items(&[ConfigurationItem::new(CONTACT_EMAIL_ADDRESS, "  ")]);
        assert_eq!(config.contact_email_address(), None);
        assert_eq!(config.system_from_email_address(), None);
    }

    #[test]
    fn test_session_timeout_fallback() {
        let config = ApplicationConfiguration::from_items(&[ConfigurationItem::new(
            SESSION_TIMEOUT_MINUTES,
            "-5",
        )]);
        assert_eq!(config.session_timeout_minutes(), 60);
        assert_eq!(ApplicationConfiguration::default().session_timeout_minutes(), 60);
    }

    #[test]
    fn test_session_timeout_out_of_range() {
        for value in ["9223372036854775807", "527041"] {
            let config = ApplicationConfiguration::from_items(&[ConfigurationItem::new(
                SESSION_TIMEOUT_MINUTES,
                value,
            )]);
            assert_eq!(config.session_timeout_minutes(), 60, "{}", value);
        }

        let config = ApplicationConfiguration::from_items(&[ConfigurationItem::new(
            SESSION_TIMEOUT_MINUTES,
            &MAX_SESSION_TIMEOUT_MINUTES.to_string(),
        )]);
        assert_eq!(config.session_timeout_minutes(), MAX_SESSION_TIMEOUT_MINUTES);
    }

    #[test]
    fn test_later_row_wins() {
        let config = ApplicationConfiguration::from_items(&[
            ConfigurationItem::new("K", "first"),
            ConfigurationItem::new("K", "second"),
        ]);
        assert_eq!(config.get("K"), Some("second"));
    }
}
