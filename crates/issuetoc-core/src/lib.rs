#![deny(unsafe_code)]

//! issuetoc outline synchronization engine.
//!
//! Scans a host page's content container for headings, builds a hierarchical
//! outline, injects an outline panel into the host's sidebar region, and keeps
//! the active entry synchronized with scroll position and with the host's own
//! asynchronous content replacement.
//!
//! The host page is a trait seam ([`host::HostPage`] + [`host::MutationSource`])
//! with an in-memory reference backend, so the whole engine runs and tests
//! without a browser. All work is single-threaded and cooperative: the
//! [`orchestrator::MountOrchestrator`] owns the host handle and drives every
//! component from one event loop.

/// Heading discovery and outline construction.
pub mod extract;
/// Host-page abstraction and the in-memory reference backend.
pub mod host;
/// Mount orchestration: the engine command loop and panel lifecycle.
pub mod orchestrator;
/// Outline panel rendering, sizing, and click navigation.
pub mod panel;
/// Insertion-point resolution by bounded-interval polling.
pub mod resolve;
/// Leading-edge throttle with a trailing coalesced call.
pub mod throttle;
/// Scroll-driven active-entry selection.
pub mod track;
/// Content-change watching and the remount decision rule.
pub mod watch;

pub use extract::{Outline, OutlineEntry, extract};
pub use host::{HostPage, MemoryPage, MutationBatch, MutationSource, NodeId, ScrollState};
pub use orchestrator::{EngineCommand, EngineError, MountOrchestrator, OrchestratorHandle};
pub use throttle::{Clock, SystemClock, Throttle};
