// crates.io
use http::StatusCode;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	client::Courier,
	envelope::{self, ApiResponse},
	http::{RawRequest, Transport, TransportErrorMapper},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::ApiRequest,
};

impl<T, M> Courier<T, M>
where
	T: ?Sized + Transport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Dispatches a descriptor through the interceptor, retry, and refresh machinery.
	///
	/// Each attempt runs the request interceptors, transmits under the descriptor's
	/// deadline, and classifies the outcome. Retryable failures back off
	/// exponentially until the retry budget is spent; the first 401 triggers one
	/// shared refresh followed by a replay; cancellation wins every race and is
	/// checked before any work starts.
	pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: CallKind = CallKind::Dispatch;

		let span = CallSpan::new(KIND, "dispatch");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.run_dispatch(request)).await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Dispatches a GET to the provided rooted path.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.dispatch(ApiRequest::get(path)).await
	}

	/// Dispatches a POST with a JSON body to the provided rooted path.
	pub async fn post(&self, path: impl Into<String>, body: Value) -> Result<ApiResponse> {
		self.dispatch(ApiRequest::post(path).with_body(body)).await
	}

	/// Dispatches a PUT with a JSON body to the provided rooted path.
	pub async fn put(&self, path: impl Into<String>, body: Value) -> Result<ApiResponse> {
		self.dispatch(ApiRequest::put(path).with_body(body)).await
	}

	/// Dispatches a PATCH with a JSON body to the provided rooted path.
	pub async fn patch(&self, path: impl Into<String>, body: Value) -> Result<ApiResponse> {
		self.dispatch(ApiRequest::patch(path).with_body(body)).await
	}

	/// Dispatches a DELETE to the provided rooted path.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.dispatch(ApiRequest::delete(path)).await
	}

	/// Clears every stored token and sends the user to the login location.
	pub async fn expire_session(&self) {
		self.session.expire().await;
	}

	async fn run_dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		loop {
			if request.is_cancelled() {
				return Err(Error::Cancelled);
			}

			self.pipeline.run_request(&mut request).await?;

			let raw = RawRequest {
				method: request.method.clone(),
				url: self.descriptor.endpoint(&request.path)?,
				headers: request.headers.clone(),
				body: request.body.as_ref().map(|body| body.to_string().into_bytes()),
			};
			let transmitted = tokio::select! {
				biased;
				_ = request.cancelled() => return Err(Error::Cancelled),
				outcome =
					tokio::time::timeout(self.descriptor.timeout, self.transport.execute(raw)) =>
					outcome,
			};
			let failure = match transmitted {
				Ok(Ok(response)) => {
					if response.status.is_success() {
						let mut normalized = envelope::normalize(&response);

						self.pipeline.run_response(&mut normalized).await?;

						return Ok(normalized);
					}
					if response.status == StatusCode::UNAUTHORIZED {
						if request.auth_replayed() {
							return Err(Error::AuthExpired {
								message: envelope::extract_message(&response),
							});
						}

						request.mark_auth_replayed();
						self.refreshed_session(&request).await?;

						continue;
					}

					Error::Status {
						status: response.status.as_u16(),
						message: envelope::extract_message(&response),
						retry_after: response.retry_after(),
					}
				},
				Ok(Err(e)) => self.transport_mapper.map_transport_error(e),
				Err(_) => Error::Timeout,
			};

			if failure.is_cancelled() || !failure.is_retryable() {
				return Err(failure);
			}
			if !self.descriptor.retry.allows(request.retry_count()) {
				return Err(failure);
			}

			request.record_retry();

			let delay =
				self.descriptor.retry.delay_with_hint(request.retry_count(), failure.retry_after());

			tokio::select! {
				biased;
				_ = request.cancelled() => return Err(Error::Cancelled),
				_ = tokio::time::sleep(delay) => {},
			}
		}
	}
}
