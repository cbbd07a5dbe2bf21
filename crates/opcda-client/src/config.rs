// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client configuration.
//!
//! [`ClientConfig`] holds the knobs of a client session. It can be built in
//! code or loaded from a YAML, TOML or JSON file with [`ConfigLoader`].
//!
//! # File Example
//!
//! ```yaml
//! batch_size: 250
//! browse_mode: stateless
//! max_tree_depth: 8
//! trace_arguments: false
//! ```
//!
//! # Environment Override
//!
//! After parsing, the loader applies overrides from the environment:
//!
//! ```text
//! OPCDA_BATCH_SIZE=100
//! OPCDA_BROWSE_MODE=stateful
//! OPCDA_TRACE_ARGUMENTS=false
//! ```

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use opcda_core::{ConfigurationError, OpcDaResult, ValidationError};

/// Default number of elements requested per browse page.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// Locale id meaning "system default".
pub const LOCALE_SYSTEM_DEFAULT: u32 = 0x0800;

// =============================================================================
// BrowseMode
// =============================================================================

/// Which browse paradigm a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowseMode {
    /// Paginated when the server supports it, cursor-based otherwise.
    #[default]
    Auto,
    /// Paginated browsing only.
    Stateless,
    /// Cursor-based browsing only.
    Stateful,
}

impl BrowseMode {
    /// Returns the configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Stateless => "stateless",
            Self::Stateful => "stateful",
        }
    }
}

impl fmt::Display for BrowseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowseMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "stateless" => Ok(Self::Stateless),
            "stateful" => Ok(Self::Stateful),
            other => Err(ConfigurationError::invalid_value(
                "browse_mode",
                format!("expected auto, stateless or stateful, got '{other}'"),
            )),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Settings of a client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Elements requested per browse page.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Browse paradigm.
    #[serde(default)]
    pub browse_mode: BrowseMode,

    /// Depth limit for tree walks; unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tree_depth: Option<usize>,

    /// Whether call traces include argument summaries.
    #[serde(default = "default_true")]
    pub trace_arguments: bool,

    /// Locale passed where the server wants one.
    #[serde(default = "default_locale_id")]
    pub locale_id: u32,
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

fn default_locale_id() -> u32 {
    LOCALE_SYSTEM_DEFAULT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            browse_mode: BrowseMode::default(),
            max_tree_depth: None,
            trace_arguments: true,
            locale_id: default_locale_id(),
        }
    }
}

impl ClientConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the browse mode.
    pub fn with_browse_mode(mut self, browse_mode: BrowseMode) -> Self {
        self.browse_mode = browse_mode;
        self
    }

    /// Sets the tree depth limit.
    pub fn with_max_tree_depth(mut self, depth: usize) -> Self {
        self.max_tree_depth = Some(depth);
        self
    }

    /// Sets whether call traces include arguments.
    pub fn with_trace_arguments(mut self, enabled: bool) -> Self {
        self.trace_arguments = enabled;
        self
    }

    /// Sets the locale id.
    pub fn with_locale_id(mut self, locale_id: u32) -> Self {
        self.locale_id = locale_id;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// [`ValidationError::ZeroBatchSize`] for a zero batch size.
    pub fn validate(&self) -> OpcDaResult<()> {
        if self.batch_size == 0 {
            return Err(ValidationError::ZeroBatchSize.into());
        }
        Ok(())
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(ConfigurationError::UnsupportedFormat {
                extension: other.to_string(),
            }),
            None => Err(ConfigurationError::UnsupportedFormat {
                extension: "(no extension)".to_string(),
            }),
        }
    }

    /// Returns the format name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T, ConfigurationError> {
        match self {
            Self::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ConfigurationError::parse(self.name(), e.to_string())),
            Self::Toml => {
                toml::from_str(content).map_err(|e| ConfigurationError::parse(self.name(), e.to_string()))
            }
            Self::Json => serde_json::from_str(content)
                .map_err(|e| ConfigurationError::parse(self.name(), e.to_string())),
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`ClientConfig`] from files or strings.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    apply_env: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `OPCDA` environment prefix.
    pub fn new() -> Self {
        Self {
            env_prefix: "OPCDA".to_string(),
            apply_env: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment overrides.
    pub fn with_env_overrides(mut self, enabled: bool) -> Self {
        self.apply_env = enabled;
        self
    }

    /// Loads and validates a configuration file.
    pub fn load(&self, path: impl AsRef<Path>) -> OpcDaResult<ClientConfig> {
        let path = path.as_ref();
        info!("Loading client configuration from: {}", path.display());

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_from_str(&content, format)
    }

    /// Parses and validates configuration content.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> OpcDaResult<ClientConfig> {
        let mut config: ClientConfig = format.parse(content)?;
        if self.apply_env {
            self.apply_env_overrides(&mut config)?;
        }
        config.validate()?;
        debug!(
            batch_size = config.batch_size,
            browse_mode = %config.browse_mode,
            "Client configuration loaded"
        );
        Ok(config)
    }

    fn apply_env_overrides(&self, config: &mut ClientConfig) -> Result<(), ConfigurationError> {
        let key = |name: &str| format!("{}_{}", self.env_prefix, name);

        if let Ok(value) = env::var(key("BATCH_SIZE")) {
            config.batch_size = value
                .trim()
                .parse()
                .map_err(|_| ConfigurationError::invalid_value(key("BATCH_SIZE"), "expected a positive integer"))?;
        }
        if let Ok(value) = env::var(key("BROWSE_MODE")) {
            config.browse_mode = value.parse()?;
        }
        if let Ok(value) = env::var(key("TRACE_ARGUMENTS")) {
            config.trace_arguments = parse_bool(&value);
        }
        if let Ok(value) = env::var(key("MAX_TREE_DEPTH")) {
            config.max_tree_depth = Some(
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigurationError::invalid_value(key("MAX_TREE_DEPTH"), "expected an integer"))?,
            );
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

// =============================================================================
// Tests
// =============================================================================
