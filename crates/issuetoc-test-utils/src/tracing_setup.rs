//! Tracing initialization for tests.

use tracing_subscriber::EnvFilter;

/// Initialize a test subscriber writing through the test harness's capture.
/// Safe to call from every test; repeat initialization is ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
