#![deny(unsafe_code)]

//! Configuration loading and validation for the issuetoc outline engine.
//!
//! Loads TOML configuration files and validates them against expected schemas.
//! Provides the [`AppConfig`] type as the central configuration structure:
//! host-page selectors, layout constants, and timing constants. The defaults
//! describe the GitHub issue page layout the engine was built for, but every
//! selector and constant can be overridden per deployment.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host-page selector configuration.
    #[serde(default)]
    pub selectors: SelectorsConfig,

    /// Panel layout constants.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Polling and throttle intervals.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Selectors describing the host page structure the engine reads and writes.
///
/// These are environment-specific: the engine itself only assumes a content
/// container with headings, a sidebar region to mount under, and a container
/// whose child-list mutations signal a content replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorsConfig {
    /// The region whose height bounds the whole discussion layout.
    #[serde(default = "default_layout_region")]
    pub layout_region: String,

    /// The sidebar region the insertion point is created under.
    #[serde(default = "default_sidebar_region")]
    pub sidebar_region: String,

    /// The container holding the content whose headings are indexed.
    #[serde(default = "default_content_container")]
    pub content_container: String,

    /// The container observed for child-list mutations.
    #[serde(default = "default_observed_container")]
    pub observed_container: String,

    /// Element id assigned to the lazily created insertion point.
    #[serde(default = "default_insertion_point_id")]
    pub insertion_point_id: String,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            layout_region: default_layout_region(),
            sidebar_region: default_sidebar_region(),
            content_container: default_content_container(),
            observed_container: default_observed_container(),
            insertion_point_id: default_insertion_point_id(),
        }
    }
}

fn default_layout_region() -> String {
    "#discussion_bucket".to_string()
}

fn default_sidebar_region() -> String {
    "#partial-discussion-sidebar".to_string()
}

fn default_content_container() -> String {
    ".edit-comment-hide .markdown-body".to_string()
}

fn default_observed_container() -> String {
    ".js-discussion".to_string()
}

fn default_insertion_point_id() -> String {
    "issuetoc-panel".to_string()
}

/// Layout constants for panel rendering and scroll alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Horizontal indentation per heading level, in pixels.
    #[serde(default = "default_indent_unit")]
    pub indent_unit: u32,

    /// Base left offset applied to every row, in pixels.
    #[serde(default = "default_base_offset")]
    pub base_offset: u32,

    /// Vertical clearance for fixed host chrome, in pixels. Headings are
    /// considered "in view" only below this line, and click navigation
    /// aligns the target heading just below it.
    #[serde(default = "default_header_clearance")]
    pub header_clearance: f64,

    /// Margin plus border allowance subtracted when fitting the panel height.
    #[serde(default = "default_panel_margin")]
    pub panel_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            indent_unit: default_indent_unit(),
            base_offset: default_base_offset(),
            header_clearance: default_header_clearance(),
            panel_margin: default_panel_margin(),
        }
    }
}

fn default_indent_unit() -> u32 {
    16
}

fn default_base_offset() -> u32 {
    8
}

fn default_header_clearance() -> f64 {
    84.0
}

fn default_panel_margin() -> f64 {
    // margin-top + border
    17.0
}

/// Polling and throttle intervals, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Interval between insertion-point resolution attempts.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Throttle window for scroll-driven active-entry recomputation.
    #[serde(default = "default_scroll_throttle_ms")]
    pub scroll_throttle_ms: u64,

    /// Rate-limit window for the inbound navigation trigger.
    #[serde(default = "default_trigger_throttle_ms")]
    pub trigger_throttle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            scroll_throttle_ms: default_scroll_throttle_ms(),
            trigger_throttle_ms: default_trigger_throttle_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_scroll_throttle_ms() -> u64 {
    100
}

fn default_trigger_throttle_ms() -> u64 {
    500
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let selectors = [
            ("selectors.layout_region", &self.selectors.layout_region),
            ("selectors.sidebar_region", &self.selectors.sidebar_region),
            (
                "selectors.content_container",
                &self.selectors.content_container,
            ),
            (
                "selectors.observed_container",
                &self.selectors.observed_container,
            ),
            (
                "selectors.insertion_point_id",
                &self.selectors.insertion_point_id,
            ),
        ];
        for (name, value) in selectors {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{name} must not be empty"
                )));
            }
        }

        if self.layout.indent_unit == 0 {
            return Err(ConfigError::Validation(
                "layout.indent_unit must be non-zero".to_string(),
            ));
        }
        if !self.layout.header_clearance.is_finite() || self.layout.header_clearance < 0.0 {
            return Err(ConfigError::Validation(format!(
                "layout.header_clearance must be a non-negative number, got {}",
                self.layout.header_clearance
            )));
        }
        if !self.layout.panel_margin.is_finite() || self.layout.panel_margin < 0.0 {
            return Err(ConfigError::Validation(format!(
                "layout.panel_margin must be a non-negative number, got {}",
                self.layout.panel_margin
            )));
        }

        let intervals = [
            ("timing.poll_interval_ms", self.timing.poll_interval_ms),
            ("timing.scroll_throttle_ms", self.timing.scroll_throttle_ms),
            (
                "timing.trigger_throttle_ms",
                self.timing.trigger_throttle_ms,
            ),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be non-zero"
                )));
            }
        }

        Ok(())
    }
}
