use crate::esplora::{Address, EsploraError};
use crate::tracker::balance;
use crate::tracker::enrich::EnrichedTransaction;

use serde::Serialize;

/// Recoverable error kinds surfaced through the session state
#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum TrackerError {
	#[error("Address resolution error for {address}: {reason}")]
	AddressResolutionError { address: String, reason: String },

	#[error("Transaction fetch error for {address}: {reason}")]
	TransactionFetchError { address: String, reason: String },

	#[error("Notification error: {0}")]
	NotificationError(String),

	#[error("Config error: {0}")]
	ConfigError(String),
}

impl TrackerError {
	pub fn address_resolution(address: &str, source: &EsploraError) -> Self {
		TrackerError::AddressResolutionError {
			address: address.to_string(),
			reason: source.to_string(),
		}
	}

	pub fn transaction_fetch(address: &str, source: &EsploraError) -> Self {
		TrackerError::TransactionFetchError {
			address: address.to_string(),
			reason: source.to_string(),
		}
	}
}

/// Where the session is in resolving the tracked address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
	/// No address selected.
	#[default]
	Idle,
	/// Waiting for the address snapshot.
	Resolving,
	/// Address snapshot stored; transaction pages may still be loading.
	Loaded,
	/// Address resolution failed.
	Failed,
}

/// Snapshot of everything the session exposes to readers.
///
/// Published through a `watch` channel after every mutation, so readers always observe a
/// committed, self-consistent state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
	/// The tracked address id; `None` when nothing is selected.
	pub address_id: Option<String>,
	/// Snapshot of the tracked address, once resolved.
	pub address: Option<Address>,
	/// Enriched transactions in the order they were received.
	pub transactions: Vec<EnrichedTransaction>,
	pub is_loading: bool,
	/// Last recoverable error, cleared on navigation.
	pub error: Option<TrackerError>,
	pub phase: SessionPhase,
	/// Informational network identifier (empty for mainnet).
	pub network: String,
}

impl SessionState {
	/// Confirmed balance of the tracked address, `None` when no address is loaded.
	pub fn confirmed_balance(&self) -> Option<i64> {
		balance::confirmed_balance(self.address.as_ref())
	}

	/// Pending (mempool) balance of the tracked address, `None` when no address is loaded.
	pub fn pending_balance(&self) -> Option<i64> {
		balance::pending_balance(self.address.as_ref())
	}
}
