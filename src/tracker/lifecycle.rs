//! Session lifecycle.
//!
//! `SessionLifecycle` wires the external event sources into a `SessionController` and owns every
//! subscription made on the session's behalf: the notification registration task, the
//! block-notification feed and the input forwarders. `run` processes one event at a time until
//! the shutdown future resolves, then tears everything down. If the `run` future is dropped instead, the same
//! subscriptions are released by their drop handlers, so each is released exactly once either way.

use crate::esplora::{
	AddressSource, BlockNotice, EsploraError, NotificationFeed, NotificationSource, Subscription,
};
use crate::tracker::events::{InputSource, SessionEvent};
use crate::tracker::session::SessionController;
use crate::tracker::stats::SessionStats;
use crate::tracker::types::{SessionState, TrackerError};

use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Subscriptions held for the lifetime of a session.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
	active: Vec<Subscription>,
}

impl SubscriptionSet {
	pub fn add(&mut self, subscription: Subscription) {
		debug!("Holding subscription {}", subscription.name());
		self.active.push(subscription);
	}

	pub fn len(&self) -> usize {
		self.active.len()
	}

	pub fn is_empty(&self) -> bool {
		self.active.is_empty()
	}

	/// Release every held subscription. Released handles leave the set.
	pub fn release_all(&mut self) {
		for subscription in self.active.drain(..) {
			subscription.release();
		}
	}
}

/// Forward `stream` into a channel from a spawned task owned by the returned subscription.
fn forward<T, St>(name: &str, stream: St) -> (Subscription, mpsc::UnboundedReceiver<T>)
where
	T: Send + 'static,
	St: Stream<Item = T> + Send + 'static,
{
	let (tx, rx) = mpsc::unbounded_channel();
	let handle = tokio::spawn(async move {
		let mut stream = Box::pin(stream);
		while let Some(item) = stream.next().await {
			if tx.send(item).is_err() {
				break;
			}
		}
	});
	(Subscription::from_task(name, handle), rx)
}

async fn next_notice(notices: &mut Option<mpsc::UnboundedReceiver<BlockNotice>>) -> Option<BlockNotice> {
	match notices {
		Some(rx) => rx.recv().await,
		None => std::future::pending().await,
	}
}

/// External inputs a session is driven by.
pub struct SessionInputs<R, W, P> {
	/// Address ids selected by navigation; `None` clears the selection.
	pub routes: R,
	/// Informational network identifiers.
	pub networks: W,
	/// Requests for the page after the last loaded transaction.
	pub pages: P,
}

pub struct SessionLifecycle<S: AddressSource, N: NotificationSource> {
	controller: SessionController<S>,
	notifier: Arc<N>,
	topics: Vec<String>,
	subscriptions: SubscriptionSet,
}

impl<S: AddressSource, N: NotificationSource> SessionLifecycle<S, N> {
	pub fn new(source: Arc<S>, notifier: Arc<N>, topics: Vec<String>) -> Self {
		Self {
			controller: SessionController::new(source),
			notifier,
			topics,
			subscriptions: SubscriptionSet::default(),
		}
	}

	/// Receiver observing every state the session commits.
	pub fn subscribe(&self) -> watch::Receiver<SessionState> {
		self.controller.subscribe()
	}

	/// Run the session until `shutdown` resolves, then release everything it holds.
	///
	/// The end of an input stream does not end the session; the last selection stays tracked.
	/// Block-notification registration runs alongside the inputs; if it fails, the failure is
	/// logged and the session runs without block notices.
	pub async fn run<R, W, P, F>(mut self, inputs: SessionInputs<R, W, P>, shutdown: F) -> SessionStats
	where
		R: Stream<Item = Option<String>> + Send + 'static,
		W: Stream<Item = String> + Send + 'static,
		P: Stream<Item = ()> + Send + 'static,
		F: Future<Output = ()>,
	{
		info!("Starting address tracking session");

		let mut registration = self.register_notifications();
		let mut notices: Option<mpsc::UnboundedReceiver<BlockNotice>> = None;

		let (route_subscription, mut route_rx) = forward("routes", inputs.routes);
		self.subscriptions.add(route_subscription);
		let (network_subscription, mut network_rx) = forward("networks", inputs.networks);
		self.subscriptions.add(network_subscription);
		let (page_subscription, mut page_rx) = forward("pages", inputs.pages);
		self.subscriptions.add(page_subscription);

		let mut routes_open = true;
		let mut networks_open = true;
		let mut pages_open = true;
		let mut registering = true;
		tokio::pin!(shutdown);

		loop {
			let notices_open = notices.is_some();
			let event = tokio::select! {
				biased;

				Some(completion) = self.controller.next_completion() => SessionEvent::Fetch(completion),
				outcome = &mut registration, if registering => SessionEvent::NotificationsRegistered(
					outcome.unwrap_or_else(|_| {
						Err(EsploraError::SubscriptionError("registration task ended".to_string()))
					}),
				),
				route = route_rx.recv(), if routes_open => match route {
					Some(address_id) => SessionEvent::RouteChanged(address_id),
					None => SessionEvent::InputClosed(InputSource::Routes),
				},
				network = network_rx.recv(), if networks_open => match network {
					Some(network) => SessionEvent::NetworkChanged(network),
					None => SessionEvent::InputClosed(InputSource::Networks),
				},
				page = page_rx.recv(), if pages_open => match page {
					Some(()) => SessionEvent::NextPageRequested,
					None => SessionEvent::InputClosed(InputSource::Pages),
				},
				notice = next_notice(&mut notices), if notices_open => match notice {
					Some(notice) => SessionEvent::BlockNotified(notice),
					None => SessionEvent::InputClosed(InputSource::Notifications),
				},
				_ = &mut shutdown => SessionEvent::Shutdown,
			};

			match event {
				SessionEvent::Fetch(completion) => self.controller.apply(completion),
				SessionEvent::RouteChanged(address_id) => {
					self.controller.set_address_id(address_id)
				}
				SessionEvent::NetworkChanged(network) => self.controller.set_network(network),
				SessionEvent::NextPageRequested => {
					self.controller.load_more();
				}
				SessionEvent::NotificationsRegistered(outcome) => {
					registering = false;
					match outcome {
						Ok(feed) => {
							info!("Receiving block notifications for {:?}", self.topics);
							self.subscriptions.add(feed.subscription);
							notices = Some(feed.notices);
						}
						Err(e) => {
							let e = TrackerError::NotificationError(e.to_string());
							warn!("Continuing without block notifications: {}", e);
						}
					}
				}
				SessionEvent::BlockNotified(notice) => {
					debug!("New block {} at height {}", notice.id, notice.height);
					self.controller.stats_mut().record_block(notice.height);
				}
				SessionEvent::InputClosed(source) => {
					debug!("{:?} input closed", source);
					match source {
						InputSource::Routes => routes_open = false,
						InputSource::Networks => networks_open = false,
						InputSource::Pages => pages_open = false,
						InputSource::Notifications => {
							warn!("Block notification feed ended");
							notices = None;
						}
					}
				}
				SessionEvent::Shutdown => break,
			}
		}

		self.teardown();
		self.controller.stats().clone()
	}

	/// Register block interest on a spawned task so the session is served while it connects.
	///
	/// The task is held as a subscription: teardown aborts a registration still in progress, and
	/// a feed that arrives after the loop stopped listening is dropped, which releases it.
	fn register_notifications(
		&mut self,
	) -> oneshot::Receiver<Result<NotificationFeed, EsploraError>> {
		let (outcome_tx, outcome_rx) = oneshot::channel();
		let notifier = self.notifier.clone();
		let topics = self.topics.clone();

		let task = tokio::spawn(async move {
			let outcome = notifier.register_interest(&topics).await;
			if let Err(Ok(feed)) = outcome_tx.send(outcome) {
				debug!(
					"Session ended before registration finished, releasing {}",
					feed.subscription.name()
				);
			}
		});
		self.subscriptions.add(Subscription::from_task("notification-registration", task));

		outcome_rx
	}

	fn teardown(&mut self) {
		match self.controller.state().address_id.as_deref() {
			Some(address_id) => info!("Ending address tracking session (last address {})", address_id),
			None => info!("Ending address tracking session"),
		}
		if self.controller.in_flight() > 0 {
			debug!("Aborting {} in-flight fetches", self.controller.in_flight());
		}
		self.controller.shutdown();
		if !self.subscriptions.is_empty() {
			info!("Releasing {} subscriptions", self.subscriptions.len());
			self.subscriptions.release_all();
		}
		self.controller.stats().log_summary();
	}
}
