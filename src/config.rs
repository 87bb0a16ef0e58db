//! Engine limits.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::{fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::parser::{MAX_EXPRESSION_LENGTH, MAX_RELATION_DEPTH, ParseOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Relation hops a field path may take
    pub max_relation_depth: usize,
    /// Longest accepted filter, in characters
    pub max_expression_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_relation_depth: MAX_RELATION_DEPTH,
            max_expression_length: MAX_EXPRESSION_LENGTH,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_relation_depth: self.max_relation_depth,
            max_expression_length: self.max_expression_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = EngineConfig::from_json(r#"{"max_relation_depth": 2}"#).unwrap();
        assert_eq!(config.max_relation_depth, 2);
        assert_eq!(config.max_expression_length, MAX_EXPRESSION_LENGTH);
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"max_depth": 2}"#),
            Err(ConfigError::Invalid(_))
        ));
    }
}
