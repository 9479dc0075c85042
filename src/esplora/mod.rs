//! Esplora integration module
//!
//! This module provides the client and types for talking to an Esplora REST API (address
//! snapshots, transaction pages) and to the mempool WebSocket (block notifications), together
//! with the collaborator traits the tracker consumes.

/// HTTP/WebSocket client for Esplora and mempool backends
mod client;
/// Collaborator traits implemented by the client and by test doubles
mod source;
/// Release handles for long-lived subscriptions
mod subscription;
/// Type definitions for Esplora data structures
mod types;

pub use client::EsploraClient;
pub use source::{AddressSource, NotificationSource};
pub use subscription::{NotificationFeed, Subscription};
pub use types::*;
