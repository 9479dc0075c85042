//! Types for the Esplora REST API and the mempool notification WebSocket

use serde::{Deserialize, Serialize};

/// Funded/spent totals for one view of an address (confirmed chain or mempool).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStats {
    /// Number of outputs that credited the address.
    #[serde(default)]
    pub funded_txo_count: u64,
    /// Cumulative value credited to the address, in satoshis.
    #[serde(default)]
    pub funded_txo_sum: u64,
    /// Number of outputs of the address that were spent.
    #[serde(default)]
    pub spent_txo_count: u64,
    /// Cumulative value debited from the address, in satoshis.
    #[serde(default)]
    pub spent_txo_sum: u64,
    /// Number of transactions touching the address.
    #[serde(default)]
    pub tx_count: u64,
}

/// Address snapshot as returned by `GET /address/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// The address identifier.
    pub address: String,
    /// Totals over confirmed transactions.
    #[serde(default)]
    pub chain_stats: AddressStats,
    /// Totals over unconfirmed (mempool) transactions.
    #[serde(default)]
    pub mempool_stats: AddressStats,
}

/// Confirmation status of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
}

/// A transaction output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scriptpubkey_address: Option<String>,
    #[serde(default)]
    pub value: u64,
}

/// A transaction input, optionally carrying the output it spends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    #[serde(default)]
    pub txid: String,
    #[serde(default)]
    pub vout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevout: Option<TxOutput>,
    #[serde(default)]
    pub is_coinbase: bool,
}

/// Transaction as returned by `GET /address/{id}/txs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<TxInput>,
    #[serde(default)]
    pub vout: Vec<TxOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TxStatus>,
}

/// A new block announced on the notification socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockNotice {
    pub height: u64,
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Error types for Esplora requests and notification subscriptions
#[derive(Debug, thiserror::Error)]
pub enum EsploraError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    StatusError { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Subscription error: {0}")]
    SubscriptionError(String),
}
