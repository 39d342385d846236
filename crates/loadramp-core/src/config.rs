//! Configuration management for loadramp
//!
//! Supports:
//! - YAML/TOML/JSON configuration files
//! - Environment variable overrides
//! - Reasonable defaults
//! - Configuration validation

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct RampConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub decompiler: DecompilerConfig,
}

impl RampConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by LOADRAMP_CONFIG env var
    /// 3. ./config/loadramp.yaml
    /// 4. /etc/loadramp/loadramp.yaml
    /// 5. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("LOADRAMP_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/loadramp").required(false))
            .add_source(File::with_name("/etc/loadramp/loadramp").required(false));

        // Example: LOADRAMP_DECOMPILER__SLOPE_TOLERANCE=0.05
        builder = builder.add_source(
            Environment::with_prefix("LOADRAMP")
                .separator("__")
                .try_parsing(true),
        );

        let config: RampConfig = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("compiler.record_metrics", true)?
            .set_default("decompiler.slope_tolerance", DEFAULT_SLOPE_TOLERANCE)?
            .set_default("decompiler.record_metrics", true)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.decompiler.slope_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Message(format!(
                "decompiler.slope_tolerance must be a finite value >= 0, got {tolerance}"
            )));
        }

        Ok(())
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: RampConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

/// Slope difference (threads per second) under which consecutive timeline
/// segments are considered collinear.
pub const DEFAULT_SLOPE_TOLERANCE: f64 = 0.01;

/// Profile compilation configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Record compilation counters and timings
    #[serde(default = "default_true")]
    pub record_metrics: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            record_metrics: true,
        }
    }
}

/// Schedule decompilation configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DecompilerConfig {
    /// Collinearity tolerance used by timeline compaction
    #[serde(default = "default_slope_tolerance")]
    pub slope_tolerance: f64,

    /// Record decompilation counters
    #[serde(default = "default_true")]
    pub record_metrics: bool,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            slope_tolerance: DEFAULT_SLOPE_TOLERANCE,
            record_metrics: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_slope_tolerance() -> f64 {
    DEFAULT_SLOPE_TOLERANCE
}
