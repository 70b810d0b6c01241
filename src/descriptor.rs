//! Service descriptor data structures and validation shared by the courier.

// self
use crate::{_prelude::*, error::ConfigError, retry::RetryPolicy};

/// Errors raised while constructing or validating service descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ServiceDescriptorError {
	/// Only plain HTTP(S) base URLs are accepted.
	#[error("The service base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// The base URL must be able to carry joined request paths.
	#[error("The service base URL cannot serve as a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Configured paths must be rooted so they join predictably.
	#[error("The {field} must start with `/`: {value}.")]
	UnrootedPath {
		/// Which configured path failed validation.
		field: &'static str,
		/// Value that failed validation.
		value: String,
	},
	/// The refresh path must resolve against the base URL.
	#[error("The refresh path does not resolve against the base URL: {value}.")]
	InvalidRefreshPath {
		/// Refresh path that failed to resolve.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A zero deadline would time every request out immediately.
	#[error("The request timeout must be greater than zero.")]
	ZeroTimeout,
}

/// Immutable description of the upstream API service consumed by the courier.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceDescriptor {
	/// Base URL every request path is appended onto.
	pub base_url: Url,
	/// Rooted path of the refresh endpoint.
	pub refresh_path: String,
	/// Resolved refresh endpoint URL.
	pub refresh_endpoint: Url,
	/// Location session expiry navigates to.
	pub login_location: String,
	/// Per-request deadline enforced by the dispatch loop.
	pub timeout: StdDuration,
	/// Retry budget and backoff schedule.
	pub retry: RetryPolicy,
}
impl ServiceDescriptor {
	/// Default per-request deadline.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
	/// Default login location used by session expiry.
	pub const DEFAULT_LOGIN_LOCATION: &str = "/login";
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &str = "/users/refresh";

	/// Creates a new builder seeded with the provided base URL.
	pub fn builder(base_url: Url) -> ServiceDescriptorBuilder {
		ServiceDescriptorBuilder::new(base_url)
	}

	/// Resolves a rooted request path against the base URL.
	///
	/// Paths append onto the base the way browser clients combine them, so a base of
	/// `https://host/api` plus `/users` yields `https://host/api/users`. Query
	/// strings carried by the path survive the join.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		if !path.starts_with('/') {
			return Err(ConfigError::UnrootedPath { path: path.into() });
		}

		join_rooted(&self.base_url, path)
			.map_err(|e| ConfigError::InvalidEndpoint { path: path.into(), source: e })
	}
}

/// Builder for [`ServiceDescriptor`] values.
#[derive(Debug)]
pub struct ServiceDescriptorBuilder {
	/// Base URL every request path is appended onto.
	pub base_url: Url,
	/// Rooted path of the refresh endpoint.
	pub refresh_path: String,
	/// Location session expiry navigates to.
	pub login_location: String,
	/// Per-request deadline enforced by the dispatch loop.
	pub timeout: StdDuration,
	/// Retry budget and backoff schedule.
	pub retry: RetryPolicy,
}
impl ServiceDescriptorBuilder {
	/// Creates a new builder seeded with the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: ServiceDescriptor::DEFAULT_REFRESH_PATH.into(),
			login_location: ServiceDescriptor::DEFAULT_LOGIN_LOCATION.into(),
			timeout: ServiceDescriptor::DEFAULT_TIMEOUT,
			retry: RetryPolicy::default(),
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login location.
	pub fn login_location(mut self, location: impl Into<String>) -> Self {
		self.login_location = location.into();

		self
	}

	/// Overrides the per-request deadline.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the retry budget and backoff schedule.
	pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ServiceDescriptor, ServiceDescriptorError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ServiceDescriptorError::UnsupportedScheme {
				url: self.base_url.to_string(),
			});
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ServiceDescriptorError::CannotBeABase { url: self.base_url.to_string() });
		}
		if !self.refresh_path.starts_with('/') {
			return Err(ServiceDescriptorError::UnrootedPath {
				field: "refresh path",
				value: self.refresh_path,
			});
		}
		if !self.login_location.starts_with('/') {
			return Err(ServiceDescriptorError::UnrootedPath {
				field: "login location",
				value: self.login_location,
			});
		}
		if self.timeout.is_zero() {
			return Err(ServiceDescriptorError::ZeroTimeout);
		}

		let refresh_endpoint =
			join_rooted(&self.base_url, &self.refresh_path).map_err(|e| {
				ServiceDescriptorError::InvalidRefreshPath {
					value: self.refresh_path.clone(),
					source: e,
				}
			})?;

		Ok(ServiceDescriptor {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			refresh_endpoint,
			login_location: self.login_location,
			timeout: self.timeout,
			retry: self.retry,
		})
	}
}

fn join_rooted(base: &Url, path: &str) -> Result<Url, url::ParseError> {
	let mut raw = base.as_str().trim_end_matches('/').to_string();

	raw.push_str(path);

	Url::parse(&raw)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse descriptor fixture URL.")
	}

	#[test]
	fn builder_applies_documented_defaults() {
		let descriptor = ServiceDescriptor::builder(url("https://api.example.com"))
			.build()
			.expect("Descriptor builder should accept an https base URL.");

		assert_eq!(descriptor.refresh_path, "/users/refresh");
		assert_eq!(descriptor.refresh_endpoint.as_str(), "https://api.example.com/users/refresh");
		assert_eq!(descriptor.login_location, "/login");
		assert_eq!(descriptor.timeout, StdDuration::from_secs(30));
		assert_eq!(descriptor.retry, RetryPolicy::default());
	}

	#[test]
	fn builder_rejects_non_http_schemes_and_zero_timeouts() {
		let err = ServiceDescriptor::builder(url("ftp://api.example.com"))
			.build()
			.expect_err("Descriptor builder should reject non-HTTP schemes.");

		assert!(matches!(err, ServiceDescriptorError::UnsupportedScheme { .. }));

		let err = ServiceDescriptor::builder(url("http://api.example.com"))
			.timeout(StdDuration::ZERO)
			.build()
			.expect_err("Descriptor builder should reject zero timeouts.");

		assert!(matches!(err, ServiceDescriptorError::ZeroTimeout));
	}

	#[test]
	fn builder_rejects_unrooted_paths() {
		let err = ServiceDescriptor::builder(url("https://api.example.com"))
			.refresh_path("users/refresh")
			.build()
			.expect_err("Descriptor builder should reject unrooted refresh paths.");

		assert!(matches!(
			err,
			ServiceDescriptorError::UnrootedPath { field: "refresh path", .. }
		));

		let err = ServiceDescriptor::builder(url("https://api.example.com"))
			.login_location("login")
			.build()
			.expect_err("Descriptor builder should reject unrooted login locations.");

		assert!(matches!(
			err,
			ServiceDescriptorError::UnrootedPath { field: "login location", .. }
		));
	}

	#[test]
	fn endpoints_preserve_base_path_prefixes() {
		let descriptor = ServiceDescriptor::builder(url("https://api.example.com/v2/"))
			.build()
			.expect("Descriptor builder should accept a prefixed base URL.");

		assert_eq!(
			descriptor
				.endpoint("/users/42")
				.expect("Rooted paths should resolve.")
				.as_str(),
			"https://api.example.com/v2/users/42",
		);
		assert_eq!(
			descriptor
				.endpoint("/search?q=alpha&page=2")
				.expect("Query strings should survive the join.")
				.as_str(),
			"https://api.example.com/v2/search?q=alpha&page=2",
		);
		assert_eq!(descriptor.refresh_endpoint.as_str(), "https://api.example.com/v2/users/refresh");

		let err = descriptor
			.endpoint("users")
			.expect_err("Unrooted request paths should be rejected.");

		assert!(matches!(err, ConfigError::UnrootedPath { .. }));
	}
}
