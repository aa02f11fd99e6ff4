//! Configuration System
//!
//! Defaults applied by roots built from a configuration: retry budget for new
//! actions, report budget and markdown style, and logging. Loaded in layers
//! (serde defaults, optional file, `TIMEFRAME_` environment variables).

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TimeFrameError;
use crate::logging::LoggingConfig;
use crate::render::RenderStyle;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeFrameConfig {
    #[serde(default)]
    pub retry: RetryDefaults,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults for [`Event::create_action`](crate::Event::create_action).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryDefaults {
    /// Attempt budget per action
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Match ignored categories including their subcategories
    #[serde(default)]
    pub match_subcategories: bool,
}

fn default_retries() -> u32 {
    3
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            match_subcategories: false,
        }
    }
}

/// Report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Byte budget of the depth-capped report
    #[serde(default = "default_byte_budget")]
    pub byte_budget: usize,

    /// Per-depth prefixes of the custom report
    #[serde(default)]
    pub style: StyleConfig,
}

fn default_byte_budget() -> usize {
    1024
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            byte_budget: default_byte_budget(),
            style: StyleConfig::default(),
        }
    }
}

/// Prefix per depth. When the section is present, a missing key hides that
/// depth; when the whole section is absent the markdown style applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub attempt: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            root: None,
            event: Some("\n".to_string()),
            action: Some("-  ".to_string()),
            attempt: Some("> - ".to_string()),
        }
    }
}

impl StyleConfig {
    pub fn to_style(&self) -> RenderStyle {
        RenderStyle::new([
            self.root.clone(),
            self.event.clone(),
            self.action.clone(),
            self.attempt.clone(),
        ])
        .unwrap_or_default()
    }
}

impl TimeFrameConfig {
    pub fn validate(&self) -> Result<(), TimeFrameError> {
        if self.render.byte_budget == 0 {
            return Err(TimeFrameError::ConfigError(
                "render.byte_budget must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Layered configuration loading
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration: defaults, then `path` if given and present, then
    /// `TIMEFRAME_*` environment variables (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> Result<TimeFrameConfig, TimeFrameError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(config_path = %path.display(), "adding config file source");
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix("TIMEFRAME")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        let config: TimeFrameConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single file without environment overrides.
    pub fn load_from_file(path: &Path) -> Result<TimeFrameConfig, TimeFrameError> {
        let config: TimeFrameConfig = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
