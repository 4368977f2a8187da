//! Engine configuration
//!
//! All sections are optional in TOML; missing keys fall back to defaults.
//!
//! ```toml
//! [layout]
//! default_node_width = 300.0
//! highlight_hold_ms = 2000
//!
//! [thinking]
//! step_distance = 400.0
//!
//! [grid]
//! columns = 3
//! ```

use canvas_tasks::ArtifactGridConfig;
use canvas_workspace::{LayoutConfig, ThinkingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Top-level engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub thinking: ThinkingConfig,
    pub grid: ArtifactGridConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With store layout defaults
    #[inline]
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// With thinking-graph placement
    #[inline]
    #[must_use]
    pub fn with_thinking(mut self, thinking: ThinkingConfig) -> Self {
        self.thinking = thinking;
        self
    }

    /// With artifact grid layout
    #[inline]
    #[must_use]
    pub fn with_grid(mut self, grid: ArtifactGridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// With navigation highlight hold
    #[inline]
    #[must_use]
    pub fn with_highlight_hold(mut self, hold: Duration) -> Self {
        self.layout.highlight_hold_ms = u64::try_from(hold.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed TOML or mistyped values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, `ConfigError::Parse`
    /// if it is not valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// `ConfigError::Encode` if a value cannot be represented in TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
