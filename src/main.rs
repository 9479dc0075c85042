mod config;
mod esplora;
mod tracker;
mod utils;

use futures::channel::mpsc;
use futures::stream;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::TrackerConfig;
use crate::esplora::EsploraClient;
use crate::tracker::{SessionInputs, SessionLifecycle, SessionState, TransactionKind};
use crate::utils::{BITCOIN_DECIMALS, format_block_time, format_token_amount};

/// Line on stdin requesting the next page of transactions.
const MORE_COMMAND: &str = "more";

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	if let Err(e) = dotenv::dotenv() {
		debug!("No .env file loaded: {}", e);
	}

	info!("Starting address tracker");

	let config = match TrackerConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Failed to load configuration: {}", e);
			return;
		}
	};

	let client = match EsploraClient::new(
		config.esplora_url.clone(),
		config.ws_url.clone(),
		config.request_timeout,
	) {
		Ok(client) => Arc::new(client),
		Err(e) => {
			error!("Failed to create Esplora client: {}", e);
			return;
		}
	};

	info!("Created Esplora client");

	let lifecycle = SessionLifecycle::new(client.clone(), client, config.topics.clone());
	let reporter = tokio::spawn(report_states(lifecycle.subscribe()));

	let (route_tx, routes) = mpsc::unbounded();
	let (page_tx, pages) = mpsc::unbounded();
	if let Some(address) = config.address.clone() {
		let _ = route_tx.unbounded_send(Some(address));
	}
	let reader = tokio::spawn(read_commands(route_tx, page_tx));

	info!(
		"Enter an address to track, '{}' for older transactions, or an empty line to clear",
		MORE_COMMAND
	);

	let inputs = SessionInputs {
		routes,
		networks: stream::iter([config.network.identifier().to_string()]),
		pages,
	};
	let stats = lifecycle.run(inputs, async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			error!("Failed to listen for Ctrl-C: {}", e);
		}
	})
	.await;

	reader.abort();
	reporter.abort();
	info!("Address tracker stopped: {}", stats.summary());
}

/// Dispatch stdin lines: `more` requests the next page, anything else selects an address.
async fn read_commands(
	route_tx: mpsc::UnboundedSender<Option<String>>,
	page_tx: mpsc::UnboundedSender<()>,
) {
	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		match lines.next_line().await {
			Ok(Some(line)) => {
				let line = line.trim();
				let sent = if line.eq_ignore_ascii_case(MORE_COMMAND) {
					page_tx.unbounded_send(()).is_ok()
				} else {
					route_tx
						.unbounded_send((!line.is_empty()).then(|| line.to_string()))
						.is_ok()
				};
				if !sent {
					return;
				}
			}
			Ok(None) => {
				debug!("stdin closed");
				return;
			}
			Err(e) => {
				warn!("Failed to read from stdin: {}", e);
				return;
			}
		}
	}
}

/// Log every committed session state until the session ends.
async fn report_states(mut states: watch::Receiver<SessionState>) {
	while states.changed().await.is_ok() {
		let state = states.borrow_and_update().clone();
		report(&state);
	}
}

fn report(state: &SessionState) {
	let Some(address_id) = state.address_id.as_deref() else {
		return;
	};
	if let Some(e) = &state.error {
		warn!("{}", e);
	}
	if state.is_loading {
		debug!("Loading {}", address_id);
		return;
	}
	let (Some(confirmed), Some(pending)) = (state.confirmed_balance(), state.pending_balance()) else {
		return;
	};

	info!(
		"{}: {} BTC confirmed, {} BTC pending, {} transactions",
		address_id,
		format_token_amount(confirmed, BITCOIN_DECIMALS),
		format_token_amount(pending, BITCOIN_DECIMALS),
		state.transactions.len()
	);
	for tx in &state.transactions {
		let direction = match tx.kind {
			Some(TransactionKind::Sent) => "sent",
			Some(TransactionKind::Received) => "received",
			None => "unrelated",
		};
		let when = match tx.block_time {
			Some(time) => format_block_time(time),
			None => "unconfirmed".to_string(),
		};
		info!(
			"  {} {} {} BTC ({})",
			tx.txid(),
			direction,
			format_token_amount(
				i64::try_from(tx.value.unwrap_or_default()).unwrap_or(i64::MAX),
				BITCOIN_DECIMALS
			),
			when
		);
	}
}
