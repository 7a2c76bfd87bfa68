//! Configuration for typed array allocation limits.

use serde::Deserialize;
use thiserror::Error;

use crate::value::MAX_SAFE_INTEGER;

const DEFAULT_MAX_BYTE_LENGTH: usize = 1 << 30;

/// Errors produced while loading a [`TypedArrayConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document was not valid JSON for this config
    #[error("invalid typed array config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A limit was set to an unusable value
    #[error("invalid typed array config: {0}")]
    Invalid(String),
}

/// Limits applied by a [`Realm`](crate::Realm) when creating typed arrays.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypedArrayConfig {
    /// Largest backing store, in bytes, a typed array constructor may allocate.
    /// Default: 1 GiB
    pub max_byte_length: usize,

    /// Saturation bound used when coercing array-like `length` properties.
    /// Default: 2^53 - 1
    pub max_length: f64,
}

impl Default for TypedArrayConfig {
    fn default() -> Self {
        Self {
            max_byte_length: DEFAULT_MAX_BYTE_LENGTH,
            max_length: MAX_SAFE_INTEGER,
        }
    }
}

impl TypedArrayConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document, falling back to defaults for missing keys.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the allocation limit.
    pub fn with_max_byte_length(mut self, max_byte_length: usize) -> Self {
        self.max_byte_length = max_byte_length;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=MAX_SAFE_INTEGER).contains(&self.max_length) || self.max_length.fract() != 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_length must be an integer in [0, 2^53 - 1], got {}",
                self.max_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TypedArrayConfig::default();
        assert_eq!(config.max_byte_length, DEFAULT_MAX_BYTE_LENGTH);
        assert_eq!(config.max_length, MAX_SAFE_INTEGER);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TypedArrayConfig::from_json_str(r#"{ "max_byte_length": 1024 }"#).unwrap();
        assert_eq!(config.max_byte_length, 1024);
        assert_eq!(config.max_length, MAX_SAFE_INTEGER);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = TypedArrayConfig::from_json_str(r#"{ "max_bytes": 1 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_fractional_max_length() {
        let err = TypedArrayConfig::from_json_str(r#"{ "max_length": 2.5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
