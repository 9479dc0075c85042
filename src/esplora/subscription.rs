//! Release handles for long-lived subscriptions.
//!
//! A `Subscription` owns whatever keeps an upstream feed alive (a forwarding task, a socket
//! reader) and releases it exactly once: either through an explicit `release()` or when the
//! handle is dropped. `release` consumes the handle, so a second release cannot be expressed.

use super::types::BlockNotice;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Handle to a live subscription, released exactly once.
pub struct Subscription {
	name: String,
	release: Option<ReleaseFn>,
}

impl Subscription {
	/// Create a subscription that runs `release` when it ends.
	pub fn new(name: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
		Self {
			name: name.into(),
			release: Some(Box::new(release)),
		}
	}

	/// Create a subscription backed by a spawned task; releasing it aborts the task.
	pub fn from_task(name: impl Into<String>, handle: JoinHandle<()>) -> Self {
		Self::new(name, move || handle.abort())
	}

	/// Name used in logs.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Release the subscription now.
	pub fn release(mut self) {
		self.release_once();
	}

	fn release_once(&mut self) {
		if let Some(release) = self.release.take() {
			debug!("Releasing subscription {}", self.name);
			release();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.release_once();
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("name", &self.name)
			.field("active", &self.release.is_some())
			.finish()
	}
}

/// Block notices delivered for a registered interest, plus the handle that keeps them flowing.
#[derive(Debug)]
pub struct NotificationFeed {
	pub subscription: Subscription,
	pub notices: mpsc::UnboundedReceiver<BlockNotice>,
}
