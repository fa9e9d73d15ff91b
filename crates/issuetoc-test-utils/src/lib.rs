#![deny(unsafe_code)]

//! Shared test utilities for the issuetoc workspace.
//!
//! Provides a deterministic clock for throttle tests, a builder for host
//! pages shaped like the issue page the default configuration targets, config
//! builders, and tracing setup for tests.

pub mod clock;
pub mod config;
pub mod page;
pub mod tracing_setup;

pub use clock::FakeClock;
pub use config::TestConfigBuilder;
pub use page::IssuePageBuilder;
