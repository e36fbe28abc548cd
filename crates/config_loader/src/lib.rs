//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON gesture catalogues and engine configuration
//! - Validate configuration legality
//! - Produce `GestureCatalogue` / `EngineConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use contracts::GestureKind;
//! use std::path::Path;
//!
//! let catalogue = ConfigLoader::load_catalogue_from_path(Path::new("gestures.toml")).unwrap();
//! println!("discrete gestures: {}", catalogue.of_kind(GestureKind::Discrete).len());
//! ```

mod parser;
mod validator;

pub use contracts::{EngineConfig, GestureCatalogue};
pub use parser::ConfigFormat;

use contracts::ContractError;
use serde::Serialize;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a gesture catalogue from file path
    ///
    /// Format is detected from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_catalogue_from_path(path: &Path) -> Result<GestureCatalogue, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_catalogue_from_str(&content, format)
    }

    /// Load a gesture catalogue from string
    pub fn load_catalogue_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<GestureCatalogue, ContractError> {
        let catalogue: GestureCatalogue = parser::parse(content, format)?;
        validator::validate_catalogue(&catalogue)?;
        Ok(catalogue)
    }

    /// Load engine configuration from file path
    pub fn load_engine_config_from_path(path: &Path) -> Result<EngineConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_engine_config_from_str(&content, format)
    }

    /// Load engine configuration from string
    pub fn load_engine_config_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<EngineConfig, ContractError> {
        let config: EngineConfig = parser::parse(content, format)?;
        validator::validate_engine_config(&config)?;
        Ok(config)
    }

    /// Load the catalogue referenced by `config.catalogue_path`.
    ///
    /// Relative paths are resolved against `base_dir`.
    pub fn load_catalogue_for(
        config: &EngineConfig,
        base_dir: &Path,
    ) -> Result<GestureCatalogue, ContractError> {
        let path = config.catalogue_path.as_ref().ok_or_else(|| {
            ContractError::config_validation("catalogue_path", "no gesture catalogue configured")
        })?;
        let resolved = if path.is_absolute() {
            path.clone()
        } else {
            base_dir.join(path)
        };
        Self::load_catalogue_from_path(&resolved)
    }

    /// Serialize to TOML string
    pub fn to_toml<T: Serialize>(value: &T) -> Result<String, ContractError> {
        toml::to_string_pretty(value)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize to JSON string
    pub fn to_json<T: Serialize>(value: &T) -> Result<String, ContractError> {
        serde_json::to_string_pretty(value)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
