//! Gatekeeper configuration

use crate::GatekeeperError;
use serde::{Deserialize, Serialize};

/// Configuration for validation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum length, in characters, of names, types and the predicate
    pub max_str_len: usize,

    /// Enforce predicate domain/range rules
    pub enforce_domain_range: bool,

    /// Reject triples that carry no confidence at all
    pub require_confidence: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_str_len: 500,
            enforce_domain_range: true,
            require_confidence: false,
        }
    }
}

impl ValidationConfig {
    /// Create a permissive configuration (membership checks only)
    pub fn permissive() -> Self {
        Self {
            max_str_len: 2000,
            enforce_domain_range: false,
            require_confidence: false,
        }
    }

    /// Create a strict configuration (all validations enabled)
    pub fn strict() -> Self {
        Self {
            max_str_len: 200,
            enforce_domain_range: true,
            require_confidence: true,
        }
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        if self.max_str_len == 0 {
            return Err(GatekeeperError::Config(
                "max_str_len must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Override the maximum string length
    pub fn with_max_str_len(mut self, max_str_len: usize) -> Self {
        self.max_str_len = max_str_len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert_eq!(config.max_str_len, 500);
        assert!(config.enforce_domain_range);
        assert!(!config.require_confidence);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_permissive_config() {
        let config = ValidationConfig::permissive();
        assert!(!config.enforce_domain_range);
    }

    #[test]
    fn test_strict_config() {
        let config = ValidationConfig::strict();
        assert!(config.require_confidence);
        assert_eq!(config.max_str_len, 200);
    }

    #[test]
    fn test_zero_length_is_rejected() {
        assert!(ValidationConfig::default().with_max_str_len(0).validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: ValidationConfig = toml::from_str("max_str_len = 64").unwrap();
        assert_eq!(config.max_str_len, 64);
        assert!(config.enforce_domain_range);
    }
}
