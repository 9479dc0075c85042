//! Events driving an address tracking session.
//!
//! The lifecycle loop turns every external signal (route change, network change, page request,
//! block notice), the outcome of notification registration and every finished fetch into a
//! `SessionEvent` and handles them one at a time, so the session state has a single writer.

use crate::esplora::{Address, BlockNotice, EsploraError, NotificationFeed, Transaction};

/// A finished fetch, tagged with the generation that issued it.
///
/// The controller applies a completion only if its generation is still current; anything issued
/// before the latest navigation is discarded.
#[derive(Debug)]
pub enum FetchCompletion {
	/// Address resolution finished
	AddressResolved {
		generation: u64,
		address_id: String,
		result: Result<Address, EsploraError>,
	},
	/// A transaction page finished
	PageLoaded {
		generation: u64,
		after_txid: Option<String>,
		result: Result<Vec<Transaction>, EsploraError>,
	},
}

impl FetchCompletion {
	pub fn generation(&self) -> u64 {
		match self {
			FetchCompletion::AddressResolved { generation, .. } => *generation,
			FetchCompletion::PageLoaded { generation, .. } => *generation,
		}
	}
}

/// External inputs a session listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
	Routes,
	Networks,
	Pages,
	Notifications,
}

/// Everything the lifecycle loop reacts to
#[derive(Debug)]
pub enum SessionEvent {
	/// The route's address id changed (`None` clears the selection)
	RouteChanged(Option<String>),
	/// The selected network changed
	NetworkChanged(String),
	/// The next page of transactions was requested
	NextPageRequested,
	/// Block-notification registration finished
	NotificationsRegistered(Result<NotificationFeed, EsploraError>),
	/// A new block was announced
	BlockNotified(BlockNotice),
	/// A fetch issued by the controller finished
	Fetch(FetchCompletion),
	/// An input ended; the session keeps running without it
	InputClosed(InputSource),
	/// The session is ending
	Shutdown,
}
