//! Session statistics.
//!
//! `SessionStats` counts what the session has done since it started: address resolutions,
//! transaction pages and the transactions they carried, completions discarded because a newer
//! navigation superseded them, failures, and block notifications seen. The lifecycle logs a
//! summary when the session ends.

use tracing::info;

/// Counters accumulated over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
	/// Addresses successfully resolved
	pub addresses_resolved: usize,
	/// Transaction pages applied to the state
	pub pages_loaded: usize,
	/// Transactions enriched across all applied pages
	pub transactions_enriched: usize,
	/// Completions dropped because their address id was superseded
	pub stale_discarded: usize,
	/// Failed resolutions and page fetches
	pub failures: usize,
	/// Block notifications received
	pub blocks_seen: usize,
	/// Height of the most recent block notification
	pub last_block_height: Option<u64>,
}

impl SessionStats {
	pub fn record_resolution(&mut self) {
		self.addresses_resolved += 1;
	}

	pub fn record_page(&mut self, transactions: usize) {
		self.pages_loaded += 1;
		self.transactions_enriched += transactions;
	}

	pub fn record_stale(&mut self) {
		self.stale_discarded += 1;
	}

	pub fn record_failure(&mut self) {
		self.failures += 1;
	}

	pub fn record_block(&mut self, height: u64) {
		self.blocks_seen += 1;
		self.last_block_height = Some(self.last_block_height.map_or(height, |h| h.max(height)));
	}

	/// Get a human-readable summary of the session statistics
	pub fn summary(&self) -> String {
		format!(
			"{} addresses resolved, {} pages ({} transactions), {} stale results discarded, {} failures, {} blocks seen{}",
			self.addresses_resolved,
			self.pages_loaded,
			self.transactions_enriched,
			self.stale_discarded,
			self.failures,
			self.blocks_seen,
			match self.last_block_height {
				Some(height) => format!(" (tip {})", height),
				None => String::new(),
			}
		)
	}

	pub fn log_summary(&self) {
		info!("Session stats: {}", self.summary());
	}
}
