//! Rust’s resilient API courier—bearer/CSRF injection, single-flight token refresh, bounded
//! retries, and envelope-aware responses in one client core built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod request;
pub mod retry;
pub mod session;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::Courier,
		descriptor::ServiceDescriptor,
		http::{ReqwestTransport, ReqwestTransportErrorMapper},
		session::Navigator,
		store::{MemoryStore, TokenStore},
	};

	/// Courier type alias used by reqwest-backed integration tests.
	pub type ReqwestTestCourier = Courier<ReqwestTransport, ReqwestTransportErrorMapper>;

	/// Navigator that records every redirect for later assertions.
	#[derive(Debug, Default)]
	pub struct RecordingNavigator {
		location: Mutex<String>,
		visited: Mutex<Vec<String>>,
	}
	impl RecordingNavigator {
		/// Creates a navigator that reports the provided current location.
		pub fn at(location: &str) -> Self {
			Self { location: Mutex::new(location.into()), visited: Mutex::default() }
		}

		/// Returns every location navigated to, in order.
		pub fn visited(&self) -> Vec<String> {
			self.visited.lock().clone()
		}
	}
	impl Navigator for RecordingNavigator {
		fn current_location(&self) -> String {
			self.location.lock().clone()
		}

		fn navigate(&self, location: &str) {
			*self.location.lock() = location.into();
			self.visited.lock().push(location.into());
		}
	}

	/// Constructs a [`Courier`] backed by an in-memory store, a recording navigator parked at
	/// `/dashboard`, and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_courier(
		descriptor: ServiceDescriptor,
	) -> (ReqwestTestCourier, Arc<MemoryStore>, Arc<RecordingNavigator>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let navigator = Arc::new(RecordingNavigator::at("/dashboard"));
		let courier = Courier::new(store, descriptor).with_navigator(navigator.clone());

		(courier, store_backend, navigator)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
pub use url;
// The `test` feature reaches unit-test builds through the self dev-dependency.
#[cfg(test)] use api_courier as _;
#[cfg(all(test, feature = "reqwest"))] use httpmock as _;
