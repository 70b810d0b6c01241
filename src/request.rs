//! Request descriptors carried through the dispatch pipeline.

pub use tokio_util::sync::CancellationToken;

// crates.io
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use rand::{Rng, distr::Alphanumeric};
use serde_json::Value;
use tokio_util::sync::WaitForCancellationFuture;
// self
use crate::_prelude::*;

const CORRELATION_ID_LEN: usize = 8;

/// Mutable request descriptor owned by one dispatch.
///
/// A descriptor carries everything the loop tracks across transmissions: the retry
/// counter, the single-shot auth-replay flag, the cancellation token, and a
/// correlation id that stays stable across retries and replays. The two flags are
/// independent; replaying after a refresh consumes none of the retry budget.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Rooted path resolved against the service base URL.
	pub path: String,
	/// Caller-supplied headers; the pipeline layers its own on top.
	pub headers: HeaderMap,
	/// JSON body serialized at the transport boundary.
	pub body: Option<Value>,
	cancel: CancellationToken,
	correlation_id: String,
	retry_count: u32,
	auth_replayed: bool,
}
impl ApiRequest {
	/// Creates a descriptor for the provided method and rooted path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: None,
			cancel: CancellationToken::new(),
			correlation_id: correlation_id(),
			retry_count: 0,
			auth_replayed: false,
		}
	}

	/// GET descriptor shorthand.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// POST descriptor shorthand.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// PUT descriptor shorthand.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// PATCH descriptor shorthand.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// DELETE descriptor shorthand.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Sets a header, replacing any prior value under the same name.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Attaches an external cancellation token.
	///
	/// Cancelling the token aborts the in-flight transmission and suppresses any
	/// further retry or refresh participation for this descriptor.
	pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;

		self
	}

	/// Returns a handle to the descriptor's cancellation token.
	pub fn cancellation(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Correlation id attached to every transmission of this descriptor.
	pub fn correlation_id(&self) -> &str {
		&self.correlation_id
	}

	/// Whether the method mutates server state and therefore carries the CSRF token.
	pub fn is_state_changing(&self) -> bool {
		matches!(self.method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
	}

	/// Completed retries so far.
	pub fn retry_count(&self) -> u32 {
		self.retry_count
	}

	pub(crate) fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
		self.cancel.cancelled()
	}

	pub(crate) fn record_retry(&mut self) {
		self.retry_count += 1;
	}

	pub(crate) fn auth_replayed(&self) -> bool {
		self.auth_replayed
	}

	pub(crate) fn mark_auth_replayed(&mut self) {
		self.auth_replayed = true;
	}
}

fn correlation_id() -> String {
	rand::rng().sample_iter(Alphanumeric).take(CORRELATION_ID_LEN).map(char::from).collect()
}
