//! Courier-level error types shared across the dispatch loop, refresh path, and stores.

// self
use crate::_prelude::*;

/// Courier-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Statuses eligible for bounded retry. 501/505/511 and every 4xx stay out.
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];
const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";
const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Canonical courier error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Connectivity failed before any response arrived.
	#[error("Network error occurred before a response arrived.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The per-request deadline elapsed without a response.
	#[error("Request timed out before a response arrived.")]
	Timeout,
	/// Server answered with a non-success status.
	#[error("Server responded with status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Message extracted from an enveloped error body, when present.
		message: Option<String>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Authentication expired and the replayed request was rejected again.
	#[error("Authentication expired and could not be renewed.")]
	AuthExpired {
		/// Message extracted from the second rejection, when present.
		message: Option<String>,
	},
	/// Credential refresh failed and the session has been terminated.
	#[error("Credential refresh failed: {reason}.")]
	RefreshFailed {
		/// Reason recorded by the refresh exchange.
		reason: String,
		/// HTTP status returned by the refresh endpoint, when one arrived.
		status: Option<u16>,
	},
	/// The caller cancelled the request.
	#[error("Request was cancelled by the caller.")]
	Cancelled,
	/// Response payload could not be decoded into the requested type.
	#[error("Response payload could not be decoded.")]
	Decode {
		/// Structured decoding failure carrying the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Wraps a transport-specific network failure.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Derives the failure classification for this error.
	///
	/// Classification is computed from the value on every call; it is never stored on
	/// the error itself.
	pub fn kind(&self) -> FailureKind {
		match self {
			Self::Network { .. } => FailureKind::Network,
			Self::Timeout => FailureKind::Timeout,
			Self::Status { status, .. } => FailureKind::from_status(*status),
			Self::AuthExpired { .. } => FailureKind::AuthExpired,
			Self::RefreshFailed { .. } => FailureKind::RefreshFailed,
			Self::Cancelled => FailureKind::Cancelled,
			Self::Storage(_) | Self::Config(_) | Self::Decode { .. } => FailureKind::Local,
		}
	}

	/// Whether the dispatch loop may schedule another transmission after this failure.
	pub fn is_retryable(&self) -> bool {
		self.kind().is_retryable()
	}

	/// Whether the failure is caller-initiated cancellation.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}

	/// HTTP status carried by the failure, when one arrived.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::AuthExpired { .. } => Some(401),
			Self::RefreshFailed { status, .. } => *status,
			_ => None,
		}
	}

	/// Retry-After hint attached to the failure, if the server supplied one.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Status { retry_after, .. } => *retry_after,
			_ => None,
		}
	}

	/// Human-readable message, preferring backend-provided text over fallbacks.
	pub fn user_message(&self) -> String {
		match self {
			Self::Status { message: Some(message), .. }
			| Self::AuthExpired { message: Some(message) } => message.clone(),
			Self::Status { status, .. } =>
				status_fallback(*status).unwrap_or(GENERIC_MESSAGE).into(),
			Self::AuthExpired { .. } | Self::RefreshFailed { .. } => SESSION_EXPIRED_MESSAGE.into(),
			Self::Network { .. } =>
				"Unable to reach the server. Please check your connection.".into(),
			Self::Timeout => "The request timed out. Please try again.".into(),
			Self::Cancelled => "The request was cancelled.".into(),
			Self::Storage(_) | Self::Config(_) | Self::Decode { .. } => GENERIC_MESSAGE.into(),
		}
	}
}

/// Failure classification derived from [`Error`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// Connectivity failed with no response.
	Network,
	/// Per-request deadline elapsed.
	Timeout,
	/// Server status eligible for bounded retry (500, 502, 503, 504).
	RetryableServer,
	/// Server status that must never be retried.
	NonRetryableServer,
	/// HTTP 401; handled by the refresh path, never by generic retry.
	AuthExpired,
	/// Credential refresh was denied.
	RefreshFailed,
	/// Caller-initiated cancellation.
	Cancelled,
	/// Failure raised on this side of the wire (configuration, storage, decoding).
	Local,
}
impl FailureKind {
	/// Classifies a raw HTTP status code.
	pub const fn from_status(status: u16) -> Self {
		if status == 401 {
			return Self::AuthExpired;
		}

		let mut i = 0;

		while i < RETRYABLE_STATUSES.len() {
			if RETRYABLE_STATUSES[i] == status {
				return Self::RetryableServer;
			}

			i += 1;
		}

		Self::NonRetryableServer
	}

	/// Whether the classification permits another transmission.
	pub const fn is_retryable(self) -> bool {
		matches!(self, Self::Network | Self::Timeout | Self::RetryableServer)
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FailureKind::Network => "network",
			FailureKind::Timeout => "timeout",
			FailureKind::RetryableServer => "retryable_server",
			FailureKind::NonRetryableServer => "non_retryable_server",
			FailureKind::AuthExpired => "auth_expired",
			FailureKind::RefreshFailed => "refresh_failed",
			FailureKind::Cancelled => "cancelled",
			FailureKind::Local => "local",
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

fn status_fallback(status: u16) -> Option<&'static str> {
	let message = match status {
		400 => "The request was invalid. Please check your input.",
		401 => SESSION_EXPIRED_MESSAGE,
		403 => "You do not have permission to perform this action.",
		404 => "The requested resource was not found.",
		409 => "The request conflicts with the current state.",
		422 => "The submitted data could not be processed.",
		429 => "Too many requests. Please slow down and try again.",
		500 => "The server encountered an internal error.",
		502 => "The server received an invalid upstream response.",
		503 => "The service is temporarily unavailable.",
		504 => "The server took too long to respond.",
		_ => return None,
	};

	Some(message)
}

/// Configuration and validation failures raised by the courier.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP transport could not be constructed.
	#[error("HTTP transport could not be constructed.")]
	TransportBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A request path could not be joined onto the service base URL.
	#[error("Request path `{path}` cannot be joined onto the service base URL.")]
	InvalidEndpoint {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request paths must be rooted so they join onto the base URL predictably.
	#[error("Request path `{path}` must start with `/`.")]
	UnrootedPath {
		/// Path supplied by the caller.
		path: String,
	},
	/// A header assembled from configuration or stored tokens is not a valid value.
	#[error("Header `{name}` could not be assembled from the configured value.")]
	InvalidHeaderValue {
		/// Header name the courier attempted to set.
		name: &'static str,
		/// Underlying validation failure.
		#[source]
		source: http::header::InvalidHeaderValue,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn transport_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::TransportBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::transport_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn classification_follows_the_status_allow_list() {
		for status in [500, 502, 503, 504] {
			assert_eq!(FailureKind::from_status(status), FailureKind::RetryableServer);
			assert!(FailureKind::from_status(status).is_retryable());
		}
		for status in [400, 404, 409, 422, 429, 501, 505, 511] {
			assert_eq!(FailureKind::from_status(status), FailureKind::NonRetryableServer);
			assert!(!FailureKind::from_status(status).is_retryable());
		}

		assert_eq!(FailureKind::from_status(401), FailureKind::AuthExpired);
		assert!(!FailureKind::from_status(401).is_retryable());
	}

	#[test]
	fn classification_is_derived_per_failure() {
		let network = Error::network(std::io::Error::other("connection reset"));
		let timeout = Error::Timeout;
		let cancelled = Error::Cancelled;

		assert_eq!(network.kind(), FailureKind::Network);
		assert!(network.is_retryable());
		assert_eq!(timeout.kind(), FailureKind::Timeout);
		assert!(timeout.is_retryable());
		assert_eq!(cancelled.kind(), FailureKind::Cancelled);
		assert!(!cancelled.is_retryable());
	}

	#[test]
	fn user_message_prefers_backend_text() {
		let with_backend_text = Error::Status {
			status: 503,
			message: Some("Scheduled maintenance until noon.".into()),
			retry_after: None,
		};
		let with_fallback = Error::Status { status: 503, message: None, retry_after: None };
		let unknown_status = Error::Status { status: 418, message: None, retry_after: None };

		assert_eq!(with_backend_text.user_message(), "Scheduled maintenance until noon.");
		assert_eq!(with_fallback.user_message(), "The service is temporarily unavailable.");
		assert_eq!(unknown_status.user_message(), GENERIC_MESSAGE);
	}

	#[test]
	fn session_failures_share_the_sign_in_message() {
		let refresh_failed =
			Error::RefreshFailed { reason: "refresh endpoint rejected the token".into(), status: Some(401) };
		let auth_expired = Error::AuthExpired { message: None };

		assert_eq!(refresh_failed.user_message(), SESSION_EXPIRED_MESSAGE);
		assert_eq!(auth_expired.user_message(), SESSION_EXPIRED_MESSAGE);
		assert_eq!(refresh_failed.status(), Some(401));
		assert_eq!(auth_expired.status(), Some(401));
	}
}
