//! Balance derivation from address stats.
//!
//! Balances are funded minus spent, per view. Inconsistent upstream stats can make the result
//! negative; it is reported as-is.

use crate::esplora::{Address, AddressStats};

fn net(stats: &AddressStats) -> i64 {
	stats.funded_txo_sum as i64 - stats.spent_txo_sum as i64
}

/// Confirmed balance: chain funded minus chain spent.
pub fn confirmed_balance(address: Option<&Address>) -> Option<i64> {
	address.map(|address| net(&address.chain_stats))
}

/// Pending balance: mempool funded minus mempool spent.
pub fn pending_balance(address: Option<&Address>) -> Option<i64> {
	address.map(|address| net(&address.mempool_stats))
}
