// src/utils/config.rs
//! Engine configuration
//!
//! Layered, lowest precedence first: built-in defaults, an optional
//! `dynaproxy.{toml,yaml,json}` in the working directory (or an explicit
//! file), then `DYNAPROXY__*` environment variables with `__` between
//! sections, e.g. `DYNAPROXY__GENERATION__NAMING_PREFIX=Gen`.

use crate::generation::request::MetadataPolicy;
use crate::utils::errors::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

/// Defaults applied to every `GenerationOptions::from_config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub metadata_policy: MetadataPolicy,
    /// Namespace prefix for synthesized type names
    pub naming_prefix: String,
    /// Where `ProxyGenerator::emit_source` output goes, if anywhere
    pub source_dir: Option<PathBuf>,
    /// Metadata names never copied onto synthesized members
    pub metadata_to_avoid: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            metadata_policy: MetadataPolicy::default(),
            naming_prefix: "Proxies".to_string(),
            source_dir: None,
            metadata_to_avoid: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load from the working directory and environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with an explicit config file; the file must exist when given
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("dynaproxy").required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("DYNAPROXY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
