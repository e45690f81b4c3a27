//! Registry configuration

#[cfg(feature = "config")]
use crate::error::{DiError, DiResult};
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// What a finalizer does when the interface is already bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum RebindPolicy {
    /// Keep the original binding and return `DiError::DuplicateBinding`
    #[default]
    Reject,
    /// Keep the original binding, log a warning and report success
    KeepFirst,
    /// Overwrite the binding, dropping any cached instance
    Replace,
}

/// Settings fixed at registry creation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct RegistryConfig {
    /// Label used in log output
    pub name: String,
    /// Conflict handling for repeated binds of one interface
    pub rebind_policy: RebindPolicy,
}

impl RegistryConfig {
    /// Default settings under a custom name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Replace the rebind policy
    pub fn with_rebind_policy(mut self, policy: RebindPolicy) -> Self {
        self.rebind_policy = policy;
        self
    }

    /// Load configuration from TOML string
    #[cfg(feature = "config")]
    pub fn from_toml(toml_str: &str) -> DiResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from JSON string
    #[cfg(feature = "config")]
    pub fn from_json(json_str: &str) -> DiResult<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse JSON: {}", e)))
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            rebind_policy: RebindPolicy::default(),
        }
    }
}

// Example configuration file format:
// ```toml
// name = "app"
// rebind_policy = "keep_first"
// ```

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rejects_rebinds() {
        let config = RegistryConfig::default();
        assert_eq!(config.name, "default");
        assert_eq!(config.rebind_policy, RebindPolicy::Reject);
    }

    #[test]
    fn test_builder_methods() {
        let config = RegistryConfig::named("plugins").with_rebind_policy(RebindPolicy::Replace);
        assert_eq!(config.name, "plugins");
        assert_eq!(config.rebind_policy, RebindPolicy::Replace);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_toml() {
        let config = RegistryConfig::from_toml(
            r#"
            name = "app"
            rebind_policy = "keep_first"
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "app");
        assert_eq!(config.rebind_policy, RebindPolicy::KeepFirst);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_missing_fields_use_defaults() {
        let config = RegistryConfig::from_json(r#"{ "rebind_policy": "replace" }"#).unwrap();
        assert_eq!(config.name, "default");
        assert_eq!(config.rebind_policy, RebindPolicy::Replace);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_unknown_policy_is_config_error() {
        let result = RegistryConfig::from_toml(r#"rebind_policy = "sometimes""#);
        assert!(matches!(result, Err(DiError::ConfigError(_))));
    }
}
