//! Collaborator seams consumed by the tracker.
//!
//! `EsploraClient` implements both traits against a live Esplora / mempool deployment; tests
//! substitute scripted in-memory sources.

use super::subscription::NotificationFeed;
use super::types::{Address, EsploraError, Transaction};

/// Source of address snapshots and transaction pages.
#[async_trait::async_trait]
pub trait AddressSource: Send + Sync + 'static {
	/// Resolve the address snapshot for `address_id`.
	async fn resolve_address(&self, address_id: &str) -> Result<Address, EsploraError>;

	/// Fetch one page of transactions, newest first, optionally continuing after `after_txid`.
	///
	/// `address_id` must not be empty.
	async fn fetch_transaction_page(
		&self,
		address_id: &str,
		after_txid: Option<&str>,
	) -> Result<Vec<Transaction>, EsploraError>;
}

/// Source of push notifications (new blocks).
#[async_trait::async_trait]
pub trait NotificationSource: Send + Sync + 'static {
	/// Register interest in `topics` (e.g. `["blocks"]`) and return the resulting feed.
	async fn register_interest(&self, topics: &[String]) -> Result<NotificationFeed, EsploraError>;
}
