//! Engine configuration (mimic.toml)
//!
//! ```toml
//! [synthesis]
//! text_default = "empty"   # or "null"
//!
//! [invoke]
//! allow_widening = true
//!
//! [discovery]
//! parallel_threads = 4
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every key is optional.

use std::path::Path;

use mimic_sdk::{TypeRef, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activator::Activator;
use crate::invoker::{InvokeOptions, Invoker};
use crate::registry::PluginRegistry;
use crate::synth::TypeSynthesizer;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Canonical default for the `string` type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDefault {
    /// The empty string
    #[default]
    Empty,
    /// Null (absent text)
    Null,
}

impl TextDefault {
    /// Canonical zero value of `ty` under this policy.
    ///
    /// Returns `None` for types without a default mapping.
    pub fn default_for(self, ty: &TypeRef) -> Option<Value> {
        match (self, ty) {
            (TextDefault::Null, TypeRef::Str) => Some(Value::Null),
            _ => Value::default_for(ty),
        }
    }

    /// Check if `value` can be stored in a slot of type `ty` without
    /// conversion. Under `Null`, null is a legal `string`.
    pub fn accepts(self, value: &Value, ty: &TypeRef) -> bool {
        value.is_assignable_to(ty)
            || (self == TextDefault::Null && value.is_null() && *ty == TypeRef::Str)
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Type synthesis settings
    pub synthesis: SynthesisConfig,
    /// Dynamic invocation settings
    pub invoke: InvokeConfig,
    /// Plugin discovery settings
    pub discovery: DiscoveryConfig,
    /// Logging settings (consumed by the CLI)
    pub logging: LoggingConfig,
}

/// Type synthesis settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Default produced for `string` by `DefaultForType` bodies and storage
    pub text_default: TextDefault,
}

/// Dynamic invocation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InvokeConfig {
    /// Accept lossless numeric widening during overload resolution
    pub allow_widening: bool,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            allow_widening: true,
        }
    }
}

/// Plugin discovery settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Worker threads used by `run_all_parallel`
    pub parallel_threads: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            parallel_threads: num_cpus::get(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.parallel_threads == 0 {
            return Err(ConfigError::ValidationError(
                "discovery.parallel_threads must be at least 1".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.level cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Activator configured by this config
    pub fn activator(&self) -> Activator {
        Activator::new(self.synthesis.text_default)
    }

    /// Invoker configured by this config
    pub fn invoker(&self) -> Invoker {
        Invoker::new(InvokeOptions {
            allow_widening: self.invoke.allow_widening,
        })
    }

    /// Type synthesizer configured by this config
    pub fn synthesizer(&self) -> TypeSynthesizer {
        TypeSynthesizer::new(self.synthesis.text_default)
    }

    /// Plugin registry configured by this config
    pub fn registry(&self) -> PluginRegistry {
        PluginRegistry::new(self.activator(), self.invoker())
            .with_parallel_threads(self.discovery.parallel_threads)
    }
}
