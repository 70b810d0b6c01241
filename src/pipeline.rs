//! Interceptor seams that shape requests and responses around the transport.

// crates.io
use http::{
	HeaderName, HeaderValue,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenKind,
	envelope::ApiResponse,
	error::ConfigError,
	request::ApiRequest,
	store::TokenStore,
};

/// Header carrying the per-call correlation id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
/// Header carrying the anti-forgery token on state-changing calls.
pub const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");

/// Boxed future returned by interceptor hooks.
pub type PipelineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Hook that mutates an outgoing descriptor before each transmission.
///
/// Request interceptors run on every attempt, so a replay after a token refresh
/// observes the freshly stored credentials.
pub trait RequestInterceptor
where
	Self: Send + Sync,
{
	/// Applies this interceptor to the descriptor.
	fn apply<'a>(&'a self, request: &'a mut ApiRequest) -> PipelineFuture<'a, ()>;
}

/// Hook that observes or rewrites the normalized response before the caller sees it.
pub trait ResponseInterceptor
where
	Self: Send + Sync,
{
	/// Applies this interceptor to the response.
	fn apply<'a>(&'a self, response: &'a mut ApiResponse) -> PipelineFuture<'a, ()>;
}

/// Ordered interceptor chains run around every transmission.
#[derive(Clone, Default)]
pub(crate) struct Pipeline {
	request: Vec<Arc<dyn RequestInterceptor>>,
	response: Vec<Arc<dyn ResponseInterceptor>>,
}
impl Pipeline {
	pub(crate) fn push_request(&mut self, interceptor: Arc<dyn RequestInterceptor>) {
		self.request.push(interceptor);
	}

	pub(crate) fn push_response(&mut self, interceptor: Arc<dyn ResponseInterceptor>) {
		self.response.push(interceptor);
	}

	pub(crate) async fn run_request(&self, request: &mut ApiRequest) -> Result<()> {
		for interceptor in &self.request {
			interceptor.apply(request).await?;
		}

		Ok(())
	}

	pub(crate) async fn run_response(&self, response: &mut ApiResponse) -> Result<()> {
		for interceptor in &self.response {
			interceptor.apply(response).await?;
		}

		Ok(())
	}
}
impl Debug for Pipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline")
			.field("request", &self.request.len())
			.field("response", &self.response.len())
			.finish()
	}
}

/// Applies the protocol defaults shared by every call.
///
/// Bodies default to `Content-Type: application/json` and every transmission
/// carries the descriptor's correlation id as `X-Request-Id`. Caller-supplied
/// values win over both defaults.
#[derive(Clone, Debug, Default)]
pub struct BaselineHeaders;
impl RequestInterceptor for BaselineHeaders {
	fn apply<'a>(&'a self, request: &'a mut ApiRequest) -> PipelineFuture<'a, ()> {
		Box::pin(async move {
			if request.body.is_some() && !request.headers.contains_key(CONTENT_TYPE) {
				request.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
			}
			if !request.headers.contains_key(&X_REQUEST_ID) {
				let value = header_value("x-request-id", request.correlation_id())?;

				request.headers.insert(X_REQUEST_ID, value);
			}

			Ok(())
		})
	}
}

/// Attaches `Authorization: Bearer <token>` whenever an access token is stored.
///
/// The header is set unconditionally on each attempt, so a stale value left by
/// the caller or by a previous attempt is overwritten after a refresh.
pub struct BearerInjector {
	store: Arc<dyn TokenStore>,
}
impl BearerInjector {
	/// Creates an injector reading from the provided store.
	pub fn new(store: Arc<dyn TokenStore>) -> Self {
		Self { store }
	}
}
impl RequestInterceptor for BearerInjector {
	fn apply<'a>(&'a self, request: &'a mut ApiRequest) -> PipelineFuture<'a, ()> {
		Box::pin(async move {
			let Some(secret) = self.store.load(TokenKind::Access).await? else {
				return Ok(());
			};
			let mut value = header_value("authorization", &format!("Bearer {}", secret.expose()))?;

			value.set_sensitive(true);
			request.headers.insert(AUTHORIZATION, value);

			Ok(())
		})
	}
}
impl Debug for BearerInjector {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("BearerInjector(..)")
	}
}

/// Attaches `X-CSRF-Token` to state-changing calls when a CSRF token is stored.
///
/// GET and HEAD never carry the header.
pub struct CsrfInjector {
	store: Arc<dyn TokenStore>,
}
impl CsrfInjector {
	/// Creates an injector reading from the provided store.
	pub fn new(store: Arc<dyn TokenStore>) -> Self {
		Self { store }
	}
}
impl RequestInterceptor for CsrfInjector {
	fn apply<'a>(&'a self, request: &'a mut ApiRequest) -> PipelineFuture<'a, ()> {
		Box::pin(async move {
			if !request.is_state_changing() {
				return Ok(());
			}

			let Some(secret) = self.store.load(TokenKind::Csrf).await? else {
				return Ok(());
			};
			let mut value = header_value("x-csrf-token", secret.expose())?;

			value.set_sensitive(true);
			request.headers.insert(X_CSRF_TOKEN, value);

			Ok(())
		})
	}
}
impl Debug for CsrfInjector {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CsrfInjector(..)")
	}
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue> {
	Ok(HeaderValue::from_str(value)
		.map_err(|e| ConfigError::InvalidHeaderValue { name, source: e })?)
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::Method;
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::{auth::TokenSecret, store::MemoryStore};

	fn injectors() -> (Arc<MemoryStore>, BearerInjector, CsrfInjector) {
		let store = Arc::new(MemoryStore::default());

		(store.clone(), BearerInjector::new(store.clone()), CsrfInjector::new(store))
	}

	#[test]
	fn bearer_header_reflects_the_store() {
		let rt = Runtime::new().expect("Failed to build Tokio runtime for test.");
		let (store, bearer, _) = injectors();
		let mut request = ApiRequest::get("/users");

		rt.block_on(bearer.apply(&mut request)).expect("Interceptor should succeed.");

		assert!(!request.headers.contains_key(AUTHORIZATION));

		store.save_now(TokenKind::Access, TokenSecret::new("fresh"));
		request.headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
		rt.block_on(bearer.apply(&mut request)).expect("Interceptor should succeed.");

		assert_eq!(request.headers[AUTHORIZATION], "Bearer fresh");
	}

	#[test]
	fn csrf_header_follows_the_method_class() {
		let rt = Runtime::new().expect("Failed to build Tokio runtime for test.");
		let (store, _, csrf) = injectors();

		store.save_now(TokenKind::Csrf, TokenSecret::new("c-1"));

		for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
			let mut request = ApiRequest::new(method, "/users");

			rt.block_on(csrf.apply(&mut request)).expect("Interceptor should succeed.");

			assert_eq!(request.headers[&X_CSRF_TOKEN], "c-1");
		}
		for method in [Method::GET, Method::HEAD] {
			let mut request = ApiRequest::new(method, "/users");

			rt.block_on(csrf.apply(&mut request)).expect("Interceptor should succeed.");

			assert!(!request.headers.contains_key(&X_CSRF_TOKEN));
		}
	}

	#[test]
	fn csrf_header_requires_a_stored_token() {
		let rt = Runtime::new().expect("Failed to build Tokio runtime for test.");
		let (_, _, csrf) = injectors();
		let mut request = ApiRequest::post("/users");

		rt.block_on(csrf.apply(&mut request)).expect("Interceptor should succeed.");

		assert!(!request.headers.contains_key(&X_CSRF_TOKEN));
	}

	#[test]
	fn baseline_defaults_never_override_the_caller() {
		let rt = Runtime::new().expect("Failed to build Tokio runtime for test.");
		let mut bare = ApiRequest::get("/users");

		rt.block_on(BaselineHeaders.apply(&mut bare)).expect("Interceptor should succeed.");

		assert!(!bare.headers.contains_key(CONTENT_TYPE));
		assert_eq!(bare.headers[&X_REQUEST_ID], bare.correlation_id());

		let mut posted = ApiRequest::post("/users")
			.with_body(serde_json::json!({ "name": "a" }))
			.with_header(CONTENT_TYPE, HeaderValue::from_static("application/vnd.custom+json"))
			.with_header(X_REQUEST_ID, HeaderValue::from_static("caller-chosen"));

		rt.block_on(BaselineHeaders.apply(&mut posted)).expect("Interceptor should succeed.");

		assert_eq!(posted.headers[CONTENT_TYPE], "application/vnd.custom+json");
		assert_eq!(posted.headers[&X_REQUEST_ID], "caller-chosen");

		let mut body_only = ApiRequest::post("/users").with_body(serde_json::json!({}));

		rt.block_on(BaselineHeaders.apply(&mut body_only)).expect("Interceptor should succeed.");

		assert_eq!(body_only.headers[CONTENT_TYPE], "application/json");
	}
}
