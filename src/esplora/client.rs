//!
//! HTTP and WebSocket client for an Esplora / mempool backend.
//!
//! Address snapshots and transaction pages come from the Esplora REST API. Block notifications
//! come from the mempool WebSocket, where a client announces the topics it "wants" and then
//! receives a JSON message per event. All methods are async and designed for use with Tokio.

use super::source::{AddressSource, NotificationSource};
use super::subscription::{NotificationFeed, Subscription};
use super::types::*;
use backoff::ExponentialBackoffBuilder;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Esplora REST + mempool WebSocket client
#[derive(Clone)]
pub struct EsploraClient {
	/// The underlying HTTP client for REST queries.
	http_client: Client,
	/// Base URL of the REST API, without a trailing slash.
	base_url: String,
	/// The WebSocket URL for block notifications.
	ws_url: String,
	/// Upper bound on retrying the initial WebSocket connection.
	connect_timeout: Duration,
}

impl EsploraClient {
	/// Create a new Esplora client.
	///
	/// # Arguments
	/// * `base_url` - The REST endpoint, e.g. `https://mempool.space/api`.
	/// * `ws_url` - The WebSocket endpoint for notifications.
	/// * `request_timeout` - Timeout applied to every HTTP request.
	pub fn new(
		base_url: String,
		ws_url: String,
		request_timeout: Duration,
	) -> Result<Self, EsploraError> {
		let http_client = Client::builder().timeout(request_timeout).build()?;

		Ok(Self {
			http_client,
			base_url: base_url.trim_end_matches('/').to_string(),
			ws_url,
			connect_timeout: request_timeout,
		})
	}

	/// Fetch the address snapshot (`GET /address/{id}`).
	pub async fn get_address(&self, address_id: &str) -> Result<Address, EsploraError> {
		if address_id.is_empty() {
			return Err(EsploraError::InvalidInput("empty address id".to_string()));
		}
		self.get_json(&format!("/address/{}", address_id), &[]).await
	}

	/// Fetch a page of address transactions (`GET /address/{id}/txs`).
	///
	/// The first page holds mempool transactions followed by the newest confirmed ones; later
	/// pages continue after `after_txid`.
	pub async fn get_address_transactions(
		&self,
		address_id: &str,
		after_txid: Option<&str>,
	) -> Result<Vec<Transaction>, EsploraError> {
		if address_id.is_empty() {
			return Err(EsploraError::InvalidInput("empty address id".to_string()));
		}
		let query: Vec<(&str, &str)> = after_txid
			.map(|txid| vec![("after_txid", txid)])
			.unwrap_or_default();

		self.get_json(&format!("/address/{}/txs", address_id), &query)
			.await
	}

	/// Open the notification socket and announce the wanted topics.
	///
	/// The initial connection is retried with exponential backoff for up to the configured
	/// request timeout. Once connected, a reader task forwards every block announcement to the
	/// returned feed; releasing the feed's subscription aborts the reader and closes the socket.
	pub async fn subscribe_notifications(
		&self,
		topics: &[String],
	) -> Result<NotificationFeed, EsploraError> {
		if topics.is_empty() {
			return Err(EsploraError::SubscriptionError(
				"no notification topics requested".to_string(),
			));
		}
		debug!("Attempting WebSocket connection to: {}", self.ws_url);

		let policy = ExponentialBackoffBuilder::new()
			.with_max_elapsed_time(Some(self.connect_timeout))
			.build();
		let ws_url = self.ws_url.clone();
		let ws_stream = backoff::future::retry(policy, || {
			let ws_url = ws_url.clone();
			async move {
				connect_async(ws_url).await.map(|(stream, _)| stream).map_err(|e| {
					warn!("WebSocket connection failed, retrying: {}", e);
					backoff::Error::transient(EsploraError::WebSocketError(e))
				})
			}
		})
		.await?;

		let (mut ws_sender, mut ws_receiver) = ws_stream.split();

		let want_message = json!({
			"action": "want",
			"data": topics,
		});
		ws_sender
			.send(Message::Text(want_message.to_string()))
			.await?;
		info!("Registered interest in {:?} on {}", topics, self.ws_url);

		let (notice_tx, notices) = mpsc::unbounded_channel();
		let reader = tokio::spawn(async move {
			// Keep the write half alive for as long as we read.
			let _ws_sender = ws_sender;
			while let Some(msg) = ws_receiver.next().await {
				match msg {
					Ok(Message::Text(text)) => match parse_notification(&text) {
						Ok(blocks) => {
							for block in blocks {
								if notice_tx.send(block).is_err() {
									debug!("Notification receiver dropped, closing socket");
									return;
								}
							}
						}
						Err(e) => error!("Failed to parse notification: {}", e),
					},
					Ok(Message::Close(_)) => {
						info!("Notification socket closed by server");
						return;
					}
					Ok(_) => {}
					Err(e) => {
						error!("Error in notification socket: {}", e);
						return;
					}
				}
			}
		});

		Ok(NotificationFeed {
			subscription: Subscription::from_task(format!("ws:{}", topics.join(",")), reader),
			notices,
		})
	}

	/// Execute a GET request against the REST API and decode the JSON body.
	async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		query: &[(&str, &str)],
	) -> Result<T, EsploraError> {
		let url = format!("{}{}", self.base_url, path);
		debug!("GET {} {:?}", url, query);

		let response = self.http_client.get(&url).query(query).send().await?;
		let status = response.status();

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(match status {
				StatusCode::NOT_FOUND => EsploraError::NotFound(path.to_string()),
				StatusCode::BAD_REQUEST => EsploraError::InvalidInput(body),
				_ => EsploraError::StatusError {
					status: status.as_u16(),
					body,
				},
			});
		}

		Ok(response.json::<T>().await?)
	}
}

#[async_trait::async_trait]
impl AddressSource for EsploraClient {
	async fn resolve_address(&self, address_id: &str) -> Result<Address, EsploraError> {
		self.get_address(address_id).await
	}

	async fn fetch_transaction_page(
		&self,
		address_id: &str,
		after_txid: Option<&str>,
	) -> Result<Vec<Transaction>, EsploraError> {
		self.get_address_transactions(address_id, after_txid).await
	}
}

#[async_trait::async_trait]
impl NotificationSource for EsploraClient {
	async fn register_interest(&self, topics: &[String]) -> Result<NotificationFeed, EsploraError> {
		self.subscribe_notifications(topics).await
	}
}

/// Extract block announcements from a mempool WebSocket message.
///
/// A `block` key carries a single new block; a `blocks` key carries the recent blocks sent
/// right after a `want` message. Messages about other topics yield nothing.
pub fn parse_notification(text: &str) -> Result<Vec<BlockNotice>, EsploraError> {
	let parsed: serde_json::Value = serde_json::from_str(text)?;

	let mut notices = Vec::new();
	if let Some(block) = parsed.get("block") {
		notices.push(serde_json::from_value::<BlockNotice>(block.clone())?);
	}
	if let Some(blocks) = parsed.get("blocks") {
		notices.extend(serde_json::from_value::<Vec<BlockNotice>>(blocks.clone())?);
	}

	Ok(notices)
}
