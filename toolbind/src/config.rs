//! Registry configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting has an unusable value.
    #[error("invalid registry configuration: {0}")]
    Invalid(&'static str),
}

/// Settings applied while registering tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    group_separator: String,
    allow_overwrite: bool,
}

impl RegistryConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the text placed between a group prefix and a tool name.
    #[must_use]
    pub fn with_group_separator(mut self, separator: impl Into<String>) -> Self {
        self.group_separator = separator.into();
        self
    }

    /// Allows a later registration to replace an earlier tool of the same name.
    #[must_use]
    pub fn with_allow_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = allow;
        self
    }

    /// Returns the group separator.
    #[must_use]
    pub fn group_separator(&self) -> &str {
        &self.group_separator
    }

    /// Returns whether duplicate names replace earlier tools.
    #[must_use]
    pub const fn allow_overwrite(&self) -> bool {
        self.allow_overwrite
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the separator is empty or
    /// contains whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_separator.is_empty() {
            return Err(ConfigError::Invalid("group separator cannot be empty"));
        }
        if self.group_separator.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "group separator cannot contain whitespace",
            ));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            group_separator: ".".into(),
            allow_overwrite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RegistryConfig::default();
        assert_eq!(config.group_separator(), ".");
        assert!(!config.allow_overwrite());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unusable_separators() {
        let err = RegistryConfig::new()
            .with_group_separator("")
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid registry configuration: group separator cannot be empty"
        );
        assert!(RegistryConfig::new().with_group_separator("a b").validate().is_err());
        assert!(RegistryConfig::new().with_group_separator("__").validate().is_ok());
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{ "allow_overwrite": true }"#).unwrap();
        assert!(config.allow_overwrite());
        assert_eq!(config.group_separator(), ".");
    }
}
