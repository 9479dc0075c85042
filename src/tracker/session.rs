//! Address session controller.
//!
//! `SessionController` owns the `SessionState` for the tracked address and is its only writer.
//! Navigation (`set_address_id`) clears the state synchronously and starts a new generation;
//! fetches run as spawned tasks that report back through a channel, and the controller applies a
//! completion only if it belongs to the current generation. Every committed state is published
//! through a `watch` channel.
//!
//! Per address id the sequence is: resolve the address, then load the first page of
//! transactions. A failed resolution ends the sequence. Later pages are requested explicitly
//! with `load_transactions(Some(txid))` or `load_more()` and are appended, at most one request
//! per `after_txid` at a time, and only while they still follow the last loaded transaction.

use crate::esplora::{AddressSource, EsploraError};
use crate::tracker::enrich::enrich_page;
use crate::tracker::events::FetchCompletion;
use crate::tracker::stats::SessionStats;
use crate::tracker::types::{SessionPhase, SessionState, TrackerError};

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub struct SessionController<S: AddressSource> {
	source: Arc<S>,
	state: SessionState,
	/// Bumped on every navigation; completions from older generations are discarded.
	generation: u64,
	/// Transaction pages requested in the current generation and not yet applied.
	pages_in_flight: usize,
	/// `after_txid` of every continuation page still outstanding.
	continuations: HashSet<String>,
	publisher: watch::Sender<SessionState>,
	completion_tx: mpsc::UnboundedSender<FetchCompletion>,
	completion_rx: mpsc::UnboundedReceiver<FetchCompletion>,
	in_flight: JoinSet<()>,
	stats: SessionStats,
}

impl<S: AddressSource> SessionController<S> {
	pub fn new(source: Arc<S>) -> Self {
		let (publisher, _) = watch::channel(SessionState::default());
		let (completion_tx, completion_rx) = mpsc::unbounded_channel();

		Self {
			source,
			state: SessionState::default(),
			generation: 0,
			pages_in_flight: 0,
			continuations: HashSet::new(),
			publisher,
			completion_tx,
			completion_rx,
			in_flight: JoinSet::new(),
			stats: SessionStats::default(),
		}
	}

	/// The latest committed state.
	pub fn state(&self) -> &SessionState {
		&self.state
	}

	/// Receiver observing every committed state.
	pub fn subscribe(&self) -> watch::Receiver<SessionState> {
		self.publisher.subscribe()
	}

	pub fn stats(&self) -> &SessionStats {
		&self.stats
	}

	pub fn stats_mut(&mut self) -> &mut SessionStats {
		&mut self.stats
	}

	/// Number of fetch tasks that have not been reaped yet.
	pub fn in_flight(&self) -> usize {
		self.in_flight.len()
	}

	/// Track a new address id, superseding everything in flight.
	///
	/// An absent or empty id leaves the session idle with nothing fetched. Any other id clears
	/// the address snapshot, the transaction list and the error before resolution is requested.
	pub fn set_address_id(&mut self, address_id: Option<String>) {
		self.generation += 1;
		self.pages_in_flight = 0;
		self.continuations.clear();
		if !self.in_flight.is_empty() {
			debug!(
				"Aborting {} in-flight fetches superseded by generation {}",
				self.in_flight.len(),
				self.generation
			);
			// Dropping a JoinSet aborts every task still in it.
			self.in_flight = JoinSet::new();
		}

		let network = std::mem::take(&mut self.state.network);
		self.state = SessionState {
			network,
			..Default::default()
		};

		let Some(address_id) = address_id.filter(|id| !id.is_empty()) else {
			info!("No address selected");
			self.publish();
			return;
		};

		info!("Tracking address {}", address_id);
		self.state.address_id = Some(address_id.clone());
		self.state.is_loading = true;
		self.state.phase = SessionPhase::Resolving;
		self.publish();

		self.spawn_resolution(address_id);
	}

	/// Request a page of transactions for the tracked address.
	///
	/// `None` requests the first page, which replaces the list; `Some(txid)` continues after that
	/// transaction and appends. Returns whether a request was issued: nothing is requested before
	/// the address has resolved, a malformed `after_txid` is recorded as a fetch error, and a
	/// continuation already outstanding for the same `after_txid` is not requested again.
	pub fn load_transactions(&mut self, after_txid: Option<String>) -> bool {
		let Some(address_id) = self.state.address_id.clone() else {
			debug!("No address selected, skipping transaction load");
			return false;
		};
		if self.state.address.is_none() {
			warn!(
				"Address {} is not resolved, skipping transaction load",
				address_id
			);
			return false;
		}
		if let Some(txid) = after_txid.as_deref() {
			if !is_valid_txid(txid) {
				let e = EsploraError::InvalidInput(format!("malformed txid {}", txid));
				warn!("Refusing to load transactions: {}", e);
				self.state.error = Some(TrackerError::transaction_fetch(&address_id, &e));
				self.publish();
				return false;
			}
			if !self.continuations.insert(txid.to_string()) {
				debug!("Page after {} is already loading", txid);
				return false;
			}
		}

		self.state.is_loading = true;
		self.pages_in_flight += 1;
		self.publish();

		self.spawn_page(address_id, after_txid);
		true
	}

	/// Request the page following the last loaded transaction.
	pub fn load_more(&mut self) -> bool {
		match self.state.transactions.last().map(|tx| tx.txid().to_string()) {
			Some(txid) => self.load_transactions(Some(txid)),
			None => {
				debug!("No transactions loaded yet, nothing to continue from");
				false
			}
		}
	}

	/// Update the informational network identifier.
	pub fn set_network(&mut self, network: String) {
		if self.state.network != network {
			info!("Network changed to {:?}", network);
			self.state.network = network;
			self.publish();
		}
	}

	/// Wait for the next finished fetch.
	pub async fn next_completion(&mut self) -> Option<FetchCompletion> {
		self.completion_rx.recv().await
	}

	/// Apply a finished fetch if it belongs to the current generation.
	pub fn apply(&mut self, completion: FetchCompletion) {
		while self.in_flight.try_join_next().is_some() {}

		if completion.generation() != self.generation {
			debug!(
				"Discarding completion from generation {} (current {})",
				completion.generation(),
				self.generation
			);
			self.stats.record_stale();
			return;
		}

		match completion {
			FetchCompletion::AddressResolved {
				address_id, result, ..
			} => match result {
				Ok(address) => {
					info!(
						"Resolved address {} ({} confirmed transactions)",
						address_id, address.chain_stats.tx_count
					);
					self.stats.record_resolution();
					self.state.address = Some(address);
					self.state.phase = SessionPhase::Loaded;
					self.publish();
					self.load_transactions(None);
				}
				Err(e) => {
					warn!("Failed to resolve address {}: {}", address_id, e);
					self.stats.record_failure();
					self.state.error = Some(TrackerError::address_resolution(&address_id, &e));
					self.state.is_loading = false;
					self.state.phase = SessionPhase::Failed;
					self.publish();
				}
			},
			FetchCompletion::PageLoaded {
				after_txid, result, ..
			} => {
				self.pages_in_flight = self.pages_in_flight.saturating_sub(1);
				if let Some(after) = after_txid.as_deref() {
					self.continuations.remove(after);
				}
				let Some(address_id) = self.state.address_id.clone() else {
					return;
				};

				// A continuation only extends the list it was requested from; a reload may have
				// replaced that tail since.
				let overtaken = after_txid
					.as_deref()
					.is_some_and(|after| !self.extends_list(after));

				match result {
					Ok(_) if overtaken => {
						debug!(
							"Discarding page after {}, no longer the last loaded transaction",
							after_txid.as_deref().unwrap_or_default()
						);
						self.stats.record_stale();
					}
					Ok(page) => {
						let enriched = enrich_page(&page, &address_id);
						self.stats.record_page(enriched.len());
						match after_txid {
							Some(after) => {
								debug!(
									"Appending {} transactions after {}",
									enriched.len(),
									after
								);
								self.state.transactions.extend(enriched);
							}
							None => self.state.transactions = enriched,
						}
					}
					Err(e) => {
						warn!("Failed to load transactions for {}: {}", address_id, e);
						self.stats.record_failure();
						self.state.error = Some(TrackerError::transaction_fetch(&address_id, &e));
					}
				}

				self.state.is_loading = self.pages_in_flight > 0;
				self.publish();
			}
		}
	}

	/// Abort every in-flight fetch. Safe to call more than once.
	pub fn shutdown(&mut self) {
		self.generation += 1;
		self.pages_in_flight = 0;
		self.continuations.clear();
		self.in_flight = JoinSet::new();
	}

	fn spawn_resolution(&mut self, address_id: String) {
		let source = self.source.clone();
		let completion_tx = self.completion_tx.clone();
		let generation = self.generation;

		self.in_flight.spawn(async move {
			let result = source.resolve_address(&address_id).await;
			let _ = completion_tx.send(FetchCompletion::AddressResolved {
				generation,
				address_id,
				result,
			});
		});
	}

	fn spawn_page(&mut self, address_id: String, after_txid: Option<String>) {
		let source = self.source.clone();
		let completion_tx = self.completion_tx.clone();
		let generation = self.generation;

		self.in_flight.spawn(async move {
			let result = source
				.fetch_transaction_page(&address_id, after_txid.as_deref())
				.await;
			let _ = completion_tx.send(FetchCompletion::PageLoaded {
				generation,
				after_txid,
				result,
			});
		});
	}

	fn extends_list(&self, after_txid: &str) -> bool {
		self.state.transactions.last().map(|tx| tx.txid()) == Some(after_txid)
	}

	fn publish(&self) {
		self.publisher.send_replace(self.state.clone());
	}
}

fn is_valid_txid(txid: &str) -> bool {
	txid.len() == 64 && hex::decode(txid).is_ok()
}
