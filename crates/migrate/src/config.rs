//! Migration options and their TOML configuration file.
//!
//! ```toml
//! [migration]
//! expression_type = "SimExpression"
//! discrete_to_literal = "value"   # or "label", "reject"
//! copy_associations = true
//! ```
//!
//! Every key is optional; a missing file section means defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Type whose descendants are migrated before everything else.
pub const DEFAULT_EXPRESSION_TYPE: &str = "SimExpression";

/// What to do when a discrete source value meets a non-discrete
/// destination item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscreteToLiteral {
    /// Copy the discrete entry's underlying value.
    #[default]
    Value,
    /// Copy the discrete entry's label (STRING destinations only).
    Label,
    /// Fail the attribute.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationOptions {
    pub expression_type: String,
    pub discrete_to_literal: DiscreteToLiteral,
    /// Carry model associations over when the destination definition
    /// declares association kinds.
    pub copy_associations: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            expression_type: DEFAULT_EXPRESSION_TYPE.to_string(),
            discrete_to_literal: DiscreteToLiteral::default(),
            copy_associations: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    migration: MigrationOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config '{}': {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: expression_type must not be empty")]
    EmptyExpressionType,
}

impl MigrationOptions {
    /// Parse options from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(file.migration)
    }

    /// Load and validate options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let options = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expression_type.trim().is_empty() {
            return Err(ConfigError::EmptyExpressionType);
        }
        Ok(())
    }
}
