//! Address tracking module
//!
//! This module contains the session that tracks one Bitcoin address at a time: resolving it,
//! loading and enriching its transaction history, and reacting to navigation, network changes and
//! block notifications until the session ends.
//!
//! Navigation supersedes everything in flight. Results for an address id that is no longer
//! current are never applied, and every subscription made for a session is released exactly once
//! when it ends.

/// Balance derivation from address statistics
pub mod balance;
/// Per-transaction direction and value relative to the tracked address
pub mod enrich;
/// Events driving the session loop
pub mod events;
/// Session lifecycle: input wiring, event loop, teardown
pub mod lifecycle;
/// Session controller owning the observable state
pub mod session;
/// Counters accumulated over a session
pub mod stats;
#[cfg(test)]
pub(crate) mod testing;
/// Type definitions for session state and errors
pub mod types;

pub use enrich::TransactionKind;
pub use lifecycle::{SessionInputs, SessionLifecycle};
pub use types::{SessionState, TrackerError};
