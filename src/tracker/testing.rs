//! Scripted collaborators for tracker tests.

use crate::esplora::{
	Address, AddressSource, AddressStats, BlockNotice, EsploraError, NotificationFeed,
	NotificationSource, Subscription, Transaction, TxInput, TxOutput, TxStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, mpsc};

pub const ADDRESS_A: &str = "bc1qaddressa";
pub const ADDRESS_B: &str = "bc1qaddressb";

/// Yield to the runtime until `condition` holds, giving up after a bounded number of turns.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
	for _ in 0..100 {
		if condition() {
			return true;
		}
		tokio::task::yield_now().await;
	}
	condition()
}

pub fn txid(n: u8) -> String {
	format!("{:02x}", n).repeat(32)
}

pub fn address(id: &str, chain: (u64, u64), mempool: (u64, u64)) -> Address {
	Address {
		address: id.to_string(),
		chain_stats: AddressStats {
			funded_txo_sum: chain.0,
			spent_txo_sum: chain.1,
			..Default::default()
		},
		mempool_stats: AddressStats {
			funded_txo_sum: mempool.0,
			spent_txo_sum: mempool.1,
			..Default::default()
		},
	}
}

/// Transaction `n` paying `value` to `to`, confirmed when `block_time` is set.
pub fn payment(n: u8, to: &str, value: u64, block_time: Option<u64>) -> Transaction {
	Transaction {
		txid: txid(n),
		vin: vec![TxInput {
			txid: txid(n.wrapping_add(100)),
			vout: 0,
			prevout: Some(TxOutput {
				scriptpubkey_address: Some("bc1qfunder".to_string()),
				value: value + 1000,
			}),
			is_coinbase: false,
		}],
		vout: vec![TxOutput {
			scriptpubkey_address: Some(to.to_string()),
			value,
		}],
		status: Some(TxStatus {
			confirmed: block_time.is_some(),
			block_height: block_time.map(|_| 840000),
			block_hash: None,
			block_time,
		}),
	}
}

/// Address source answering from a script, with optional per-address gates.
///
/// A gated address blocks its resolution until `open` adds a permit, which lets tests decide
/// the order in which completions arrive.
#[derive(Default)]
pub struct ScriptedSource {
	addresses: HashMap<String, Result<Address, String>>,
	pages: HashMap<(String, Option<String>), Result<Vec<Transaction>, String>>,
	gates: HashMap<String, Arc<Semaphore>>,
	calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_address(mut self, address: Address) -> Self {
		self.addresses.insert(address.address.clone(), Ok(address));
		self
	}

	pub fn with_missing_address(mut self, id: &str) -> Self {
		self.addresses.insert(id.to_string(), Err(id.to_string()));
		self
	}

	pub fn with_page(mut self, id: &str, after_txid: Option<&str>, page: Vec<Transaction>) -> Self {
		self.pages
			.insert((id.to_string(), after_txid.map(str::to_string)), Ok(page));
		self
	}

	pub fn with_failing_page(mut self, id: &str, after_txid: Option<&str>) -> Self {
		self.pages.insert(
			(id.to_string(), after_txid.map(str::to_string)),
			Err("503 backend unavailable".to_string()),
		);
		self
	}

	pub fn with_gate(mut self, id: &str) -> Self {
		self.gates.insert(id.to_string(), Arc::new(Semaphore::new(0)));
		self
	}

	pub fn open(&self, id: &str) {
		if let Some(gate) = self.gates.get(id) {
			gate.add_permits(1);
		}
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}

	fn record(&self, call: String) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait::async_trait]
impl AddressSource for ScriptedSource {
	async fn resolve_address(&self, address_id: &str) -> Result<Address, EsploraError> {
		self.record(format!("address:{}", address_id));
		if let Some(gate) = self.gates.get(address_id) {
			let _permit = gate
				.acquire()
				.await
				.map_err(|e| EsploraError::SubscriptionError(e.to_string()))?;
		}
		match self.addresses.get(address_id) {
			Some(Ok(address)) => Ok(address.clone()),
			_ => Err(EsploraError::NotFound(format!("/address/{}", address_id))),
		}
	}

	async fn fetch_transaction_page(
		&self,
		address_id: &str,
		after_txid: Option<&str>,
	) -> Result<Vec<Transaction>, EsploraError> {
		assert!(!address_id.is_empty(), "page requested for an empty id");
		self.record(format!(
			"page:{}:{}",
			address_id,
			after_txid.unwrap_or("-")
		));
		match self
			.pages
			.get(&(address_id.to_string(), after_txid.map(str::to_string)))
		{
			Some(Ok(page)) => Ok(page.clone()),
			Some(Err(reason)) => Err(EsploraError::StatusError {
				status: 503,
				body: reason.clone(),
			}),
			None => Ok(Vec::new()),
		}
	}
}

/// Notification source whose feeds are driven by the test.
#[derive(Default)]
pub struct ScriptedNotifier {
	pub registrations: AtomicUsize,
	pub released: Arc<AtomicUsize>,
	pub topics: Mutex<Vec<String>>,
	pub senders: Mutex<Vec<mpsc::UnboundedSender<BlockNotice>>>,
	pub fail: bool,
	/// Registration never completes.
	pub hang: bool,
}

impl ScriptedNotifier {
	pub fn failing() -> Self {
		Self {
			fail: true,
			..Default::default()
		}
	}

	pub fn hanging() -> Self {
		Self {
			hang: true,
			..Default::default()
		}
	}

	pub fn announce(&self, height: u64) {
		for sender in self.senders.lock().unwrap().iter() {
			let _ = sender.send(BlockNotice {
				height,
				id: format!("block-{}", height),
				timestamp: None,
			});
		}
	}
}

#[async_trait::async_trait]
impl NotificationSource for ScriptedNotifier {
	async fn register_interest(&self, topics: &[String]) -> Result<NotificationFeed, EsploraError> {
		if self.hang {
			std::future::pending::<()>().await;
		}
		if self.fail {
			return Err(EsploraError::SubscriptionError(
				"socket unavailable".to_string(),
			));
		}
		self.registrations.fetch_add(1, Ordering::SeqCst);
		self.topics.lock().unwrap().extend(topics.iter().cloned());

		let (sender, notices) = mpsc::unbounded_channel();
		self.senders.lock().unwrap().push(sender);
		let released = self.released.clone();

		Ok(NotificationFeed {
			subscription: Subscription::new("scripted-blocks", move || {
				released.fetch_add(1, Ordering::SeqCst);
			}),
			notices,
		})
	}
}
