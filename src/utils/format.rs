use chrono::DateTime;

/// Number of decimal places in one bitcoin (1 BTC = 100_000_000 sats).
pub const BITCOIN_DECIMALS: u32 = 8;

/// Render a signed amount of base units with `decimals` decimal places.
pub fn format_token_amount(amount: i64, decimals: u32) -> String {
	let scale = 10u64.pow(decimals);
	let sign = if amount < 0 { "-" } else { "" };
	let magnitude = amount.unsigned_abs();
	format!(
		"{}{}.{:0width$}",
		sign,
		magnitude / scale,
		magnitude % scale,
		width = decimals as usize
	)
}

/// Render a block timestamp (seconds since the epoch) as UTC.
pub fn format_block_time(timestamp: u64) -> String {
	i64::try_from(timestamp)
		.ok()
		.and_then(|secs| DateTime::from_timestamp(secs, 0))
		.map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
		.unwrap_or_else(|| timestamp.to_string())
}
