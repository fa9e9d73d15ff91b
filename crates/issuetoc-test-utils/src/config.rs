//! Configuration builders for tests.

use issuetoc_config::AppConfig;

/// A default configuration, validated.
pub fn test_config() -> AppConfig {
    AppConfig::default()
}

/// Builder over [`AppConfig`] for tests that need a handful of overrides
/// without spelling out whole config sections.
#[derive(Debug, Default)]
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.timing.poll_interval_ms = ms;
        self
    }

    pub fn scroll_throttle_ms(mut self, ms: u64) -> Self {
        self.config.timing.scroll_throttle_ms = ms;
        self
    }

    pub fn trigger_throttle_ms(mut self, ms: u64) -> Self {
        self.config.timing.trigger_throttle_ms = ms;
        self
    }

    pub fn insertion_point_id(mut self, id: &str) -> Self {
        self.config.selectors.insertion_point_id = id.to_string();
        self
    }

    pub fn header_clearance(mut self, px: f64) -> Self {
        self.config.layout.header_clearance = px;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
