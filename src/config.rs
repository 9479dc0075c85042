//!
//! Tracker configuration from environment variables.
//!
//! Selects the Bitcoin network and derives the Esplora REST and mempool WebSocket endpoints for
//! it; both can be overridden. Variables may also come from a `.env` file loaded at startup.
//!
//! - `TRACKER_NETWORK`: `mainnet` (default), `testnet`, `signet` or `regtest`
//! - `ESPLORA_URL`: REST endpoint override
//! - `ESPLORA_WS_URL`: WebSocket endpoint override
//! - `TRACKER_ADDRESS`: address to track on startup
//! - `REQUEST_TIMEOUT_SECS`: per-request timeout in seconds (default 30)
//! - `NOTIFICATION_TOPICS`: comma-separated notification topics (default `blocks`)

use crate::tracker::TrackerError;

use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOPICS: &str = "blocks";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Network {
	#[default]
	Mainnet,
	Testnet,
	Signet,
	Regtest,
}

impl Network {
	/// Informational identifier published in the session state; empty for mainnet.
	pub fn identifier(&self) -> &'static str {
		match self {
			Network::Mainnet => "",
			Network::Testnet => "testnet",
			Network::Signet => "signet",
			Network::Regtest => "regtest",
		}
	}

	pub fn default_esplora_url(&self) -> String {
		match self {
			Network::Regtest => "http://localhost:3000".to_string(),
			_ => format!("https://mempool.space{}/api", self.path_prefix()),
		}
	}

	pub fn default_ws_url(&self) -> String {
		match self {
			Network::Regtest => "ws://localhost:3000/api/v1/ws".to_string(),
			_ => format!("wss://mempool.space{}/api/v1/ws", self.path_prefix()),
		}
	}

	fn path_prefix(&self) -> &'static str {
		match self {
			Network::Mainnet | Network::Regtest => "",
			Network::Testnet => "/testnet",
			Network::Signet => "/signet",
		}
	}
}

impl FromStr for Network {
	type Err = TrackerError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"" | "mainnet" | "bitcoin" => Ok(Network::Mainnet),
			"testnet" => Ok(Network::Testnet),
			"signet" => Ok(Network::Signet),
			"regtest" => Ok(Network::Regtest),
			other => Err(TrackerError::ConfigError(format!(
				"unknown network '{}', expected mainnet, testnet, signet or regtest",
				other
			))),
		}
	}
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
	pub network: Network,
	pub esplora_url: String,
	pub ws_url: String,
	/// Address tracked as soon as the session starts
	pub address: Option<String>,
	pub request_timeout: Duration,
	pub topics: Vec<String>,
}

impl Default for TrackerConfig {
	fn default() -> Self {
		let network = Network::default();
		Self {
			network,
			esplora_url: network.default_esplora_url(),
			ws_url: network.default_ws_url(),
			address: None,
			request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
			topics: vec![DEFAULT_TOPICS.to_string()],
		}
	}
}

impl TrackerConfig {
	/// Load configuration from the process environment.
	pub fn from_env() -> Result<Self, TrackerError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Build the configuration from `lookup`, treating blank values as unset.
	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrackerError> {
		let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

		let network = match var("TRACKER_NETWORK") {
			Some(value) => value.parse()?,
			None => Network::default(),
		};

		let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
			Some(value) => {
				let secs: u64 = value.trim().parse().map_err(|e| {
					TrackerError::ConfigError(format!("invalid REQUEST_TIMEOUT_SECS '{}': {}", value, e))
				})?;
				if secs == 0 {
					return Err(TrackerError::ConfigError(
						"REQUEST_TIMEOUT_SECS must be positive".to_string(),
					));
				}
				Duration::from_secs(secs)
			}
			None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
		};

		let topics: Vec<String> = var("NOTIFICATION_TOPICS")
			.unwrap_or_else(|| DEFAULT_TOPICS.to_string())
			.split(',')
			.map(|topic| topic.trim().to_string())
			.filter(|topic| !topic.is_empty())
			.collect();
		if topics.is_empty() {
			return Err(TrackerError::ConfigError(
				"NOTIFICATION_TOPICS lists no topics".to_string(),
			));
		}

		let config = Self {
			network,
			esplora_url: var("ESPLORA_URL").unwrap_or_else(|| network.default_esplora_url()),
			ws_url: var("ESPLORA_WS_URL").unwrap_or_else(|| network.default_ws_url()),
			address: var("TRACKER_ADDRESS").map(|address| address.trim().to_string()),
			request_timeout,
			topics,
		};

		info!(
			"Using {:?} network via {} (notifications: {})",
			config.network, config.esplora_url, config.ws_url
		);
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn load(vars: &[(&str, &str)]) -> Result<TrackerConfig, TrackerError> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		TrackerConfig::from_lookup(|key| vars.get(key).cloned())
	}

	#[test]
	fn defaults_to_mainnet_mempool_endpoints() {
		let config = load(&[]).unwrap();

		assert_eq!(config.network, Network::Mainnet);
		assert_eq!(config.esplora_url, "https://mempool.space/api");
		assert_eq!(config.ws_url, "wss://mempool.space/api/v1/ws");
		assert_eq!(config.address, None);
		assert_eq!(config.request_timeout, Duration::from_secs(30));
		assert_eq!(config.topics, vec!["blocks".to_string()]);
	}

	#[test]
	fn network_selects_default_endpoints() {
		let config = load(&[("TRACKER_NETWORK", "Signet")]).unwrap();
		assert_eq!(config.esplora_url, "https://mempool.space/signet/api");
		assert_eq!(config.ws_url, "wss://mempool.space/signet/api/v1/ws");
		assert_eq!(config.network.identifier(), "signet");

		let config = load(&[("TRACKER_NETWORK", "testnet")]).unwrap();
		assert_eq!(config.esplora_url, "https://mempool.space/testnet/api");

		let config = load(&[("TRACKER_NETWORK", "regtest")]).unwrap();
		assert_eq!(config.esplora_url, "http://localhost:3000");
	}

	#[test]
	fn explicit_values_override_defaults() {
		let config = load(&[
			("TRACKER_NETWORK", "testnet"),
			("ESPLORA_URL", "http://esplora.local/api"),
			("ESPLORA_WS_URL", "ws://esplora.local/ws"),
			("TRACKER_ADDRESS", " tb1qexample "),
			("REQUEST_TIMEOUT_SECS", "5"),
			("NOTIFICATION_TOPICS", "blocks, mempool-blocks,"),
		])
		.unwrap();

		assert_eq!(config.esplora_url, "http://esplora.local/api");
		assert_eq!(config.ws_url, "ws://esplora.local/ws");
		assert_eq!(config.address.as_deref(), Some("tb1qexample"));
		assert_eq!(config.request_timeout, Duration::from_secs(5));
		assert_eq!(config.topics, vec!["blocks", "mempool-blocks"]);
	}

	#[test]
	fn blank_values_are_treated_as_unset() {
		let config = load(&[("TRACKER_ADDRESS", "  "), ("TRACKER_NETWORK", "")]).unwrap();

		assert_eq!(config.address, None);
		assert_eq!(config.network, Network::Mainnet);
	}

	#[test]
	fn invalid_values_are_config_errors() {
		for vars in [
			vec![("TRACKER_NETWORK", "litecoin")],
			vec![("REQUEST_TIMEOUT_SECS", "soon")],
			vec![("REQUEST_TIMEOUT_SECS", "0")],
			vec![("NOTIFICATION_TOPICS", " , ")],
		] {
			assert!(matches!(load(&vars), Err(TrackerError::ConfigError(_))));
		}
	}

	#[test]
	fn default_matches_empty_environment() {
		let default = TrackerConfig::default();
		let loaded = load(&[]).unwrap();

		assert_eq!(default.esplora_url, loaded.esplora_url);
		assert_eq!(default.topics, loaded.topics);
	}
}
