//!
//! Utility module for the address tracker.
//!
//! Re-exports formatting helpers used when reporting session state.
/// Amount and timestamp formatting for display
pub mod format;

pub use format::{BITCOIN_DECIMALS, format_block_time, format_token_amount};
