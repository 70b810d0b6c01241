//! Transport primitives for courier dispatches.
//!
//! The module exposes [`Transport`] alongside [`RawRequest`] and [`RawResponse`] so
//! downstream crates can integrate custom HTTP stacks without losing the courier's
//! retry, refresh, and cancellation behavior. A transport performs exactly one
//! exchange per call; deadlines, retries, and auth replays stay in the dispatch loop.

pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};

// std
use std::ops::Deref;
// crates.io
use http::header::RETRY_AFTER;
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Future type returned by [`Transport::execute`].
pub type TransportFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of carrying courier dispatches.
///
/// The trait is the courier's only dependency on an HTTP implementation. Callers
/// provide one (typically behind `Arc<T>` where `T: Transport`) and the dispatch loop
/// submits fully-assembled [`RawRequest`] values, one transmission per call.
/// Implementations must be `Send + Sync + 'static` so they can be shared across
/// courier clones, and the futures they return must be `Send` so boxed dispatch
/// futures can hop executors.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying stack.
	type TransportError: 'static + Send + Sync + StdError;

	/// Performs a single HTTP exchange.
	///
	/// Implementations must not retry, follow auth flows, or reorder headers; they
	/// transmit what they are handed and report what came back.
	fn execute(&self, request: RawRequest)
	-> TransportFuture<'_, RawResponse, Self::TransportError>;
}

/// Fully-assembled request handed to a [`Transport`].
#[derive(Clone, Debug)]
pub struct RawRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Headers assembled by the pipeline.
	pub headers: HeaderMap,
	/// Serialized body bytes, when present.
	pub body: Option<Vec<u8>>,
}

/// Response captured from a single [`Transport`] exchange.
#[derive(Clone, Debug)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Retry-After hint parsed from the response headers, when present.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(&self.headers)
	}

	/// Body interpreted as UTF-8, lossily.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Maps transport failures into courier [`Error`] values.
///
/// Custom transports pair with a mapper so the dispatch loop can classify their
/// failures (timeout versus network) without knowing the concrete error type.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an error emitted by the transport into a courier error.
	fn map_transport_error(&self, error: E) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, error: ReqwestError) -> Error {
		if error.is_timeout() {
			return Error::Timeout;
		}
		if error.is_builder() {
			return crate::error::ConfigError::transport_build(error).into();
		}

		Error::network(error)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Configure timeouts on the courier descriptor rather than the client; the dispatch
/// loop enforces the per-request deadline uniformly for every transport.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	type TransportError = ReqwestError;

	fn execute(
		&self,
		request: RawRequest,
	) -> TransportFuture<'_, RawResponse, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder =
				client.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(RawResponse { status, headers, body })
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
