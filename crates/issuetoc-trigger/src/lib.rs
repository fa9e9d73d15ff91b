#![deny(unsafe_code)]

//! Inbound navigation-trigger channel for the issuetoc outline engine.
//!
//! Host navigation events arrive as JSON messages on an external channel.
//! This crate decodes them, applies the URL scope rule (only issue pages get
//! an outline), rate-limits bursts from a single navigation, and forwards a
//! mount request to the engine's [`issuetoc_core::OrchestratorHandle`].

/// Wire format for trigger messages and the URL scope rule.
pub mod message;
/// The rate-limited trigger delivery loop.
pub mod service;

pub use message::{NavigationDetails, NavigationMessage, is_issue_url};
pub use service::{TriggerCommand, TriggerError, TriggerHandle, TriggerService};
