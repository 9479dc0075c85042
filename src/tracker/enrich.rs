use crate::esplora::Transaction;
use serde::Serialize;
use tracing::debug;

/// Direction of a transaction relative to the tracked address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
	Sent,
	Received,
}

/// A transaction annotated with its effect on the tracked address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedTransaction {
	#[serde(flatten)]
	pub transaction: Transaction,
	/// Net amount attributable to the tracked address; `None` when the address is not touched.
	pub value: Option<u64>,
	#[serde(rename = "type")]
	pub kind: Option<TransactionKind>,
	pub is_confirmed: bool,
	pub block_time: Option<u64>,
}

impl EnrichedTransaction {
	pub fn txid(&self) -> &str {
		&self.transaction.txid
	}
}

/// Annotate `tx` with direction, net value and confirmation state relative to `tracked_address`.
///
/// Any spend from the tracked address classifies the transaction as sent, with the value netted
/// against outputs returning to the same address (change). A transaction that only pays the
/// address is received. One that touches neither side keeps `kind` and `value` unset.
pub fn enrich(tx: &Transaction, tracked_address: &str) -> EnrichedTransaction {
	let is_tracked = |address: Option<&String>| address.is_some_and(|a| a == tracked_address);

	let total_received: u64 = tx
		.vout
		.iter()
		.filter(|out| is_tracked(out.scriptpubkey_address.as_ref()))
		.map(|out| out.value)
		.sum();

	let spent_prevouts = tx
		.vin
		.iter()
		.filter_map(|vin| vin.prevout.as_ref())
		.filter(|prevout| is_tracked(prevout.scriptpubkey_address.as_ref()));
	let total_sent: u64 = spent_prevouts.clone().map(|prevout| prevout.value).sum();

	let sent = spent_prevouts.count() > 0;
	let received = tx
		.vout
		.iter()
		.any(|out| is_tracked(out.scriptpubkey_address.as_ref()));

	let (kind, value) = if sent {
		(
			Some(TransactionKind::Sent),
			Some(total_sent.saturating_sub(total_received)),
		)
	} else if received {
		(Some(TransactionKind::Received), Some(total_received))
	} else {
		(None, None)
	};

	let status = tx.status.as_ref();

	EnrichedTransaction {
		transaction: tx.clone(),
		value,
		kind,
		is_confirmed: status.is_some_and(|s| s.confirmed),
		block_time: status.and_then(|s| s.block_time),
	}
}

/// Enrich a page of transactions, preserving order.
pub fn enrich_page(page: &[Transaction], tracked_address: &str) -> Vec<EnrichedTransaction> {
	debug!(
		"Enriching {} transactions for {}",
		page.len(),
		tracked_address
	);
	page.iter().map(|tx| enrich(tx, tracked_address)).collect()
}
