#![cfg(feature = "reqwest")]

// std
use std::time::Instant;
// crates.io
use httpmock::prelude::*;
// self
use api_courier::{
	_preludet::*,
	auth::{TokenKind, TokenSecret},
	descriptor::ServiceDescriptor,
	request::{ApiRequest, CancellationToken},
};

fn build_descriptor(server: &MockServer) -> ServiceDescriptor {
	let base_url =
		Url::parse(&server.url("/")).expect("Mock server base URL should parse successfully.");

	ServiceDescriptor::builder(base_url)
		.build()
		.expect("Service descriptor should build successfully.")
}

#[tokio::test]
async fn cancellation_before_dispatch_sends_nothing() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, _, _) = build_reqwest_test_courier(descriptor);

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/jobs");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let token = CancellationToken::new();

	token.cancel();

	let request = ApiRequest::get("/jobs").with_cancellation(token);
	let err = courier
		.dispatch(request)
		.await
		.expect_err("A cancelled descriptor should never reach the wire.");

	mock.assert_calls_async(0).await;

	assert!(err.is_cancelled());
	assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn cancellation_mid_flight_aborts_the_exchange() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, _, _) = build_reqwest_test_courier(descriptor);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_secs(2))
				.body("{}");
		})
		.await;

	let token = CancellationToken::new();
	let request = ApiRequest::get("/slow").with_cancellation(token.clone());
	let started = Instant::now();
	let (result, ()) = tokio::join!(courier.dispatch(request), async {
		tokio::time::sleep(StdDuration::from_millis(50)).await;
		token.cancel();
	});
	let err = result.expect_err("Cancellation should abort the in-flight exchange.");

	assert!(err.is_cancelled());
	assert!(started.elapsed() < StdDuration::from_secs(1));
}

#[tokio::test]
async fn cancellation_during_backoff_stops_retrying() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, _, _) = build_reqwest_test_courier(descriptor);

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/flaky");
			then.status(503).header("content-type", "application/json").body("{}");
		})
		.await;
	let token = CancellationToken::new();
	let request = ApiRequest::get("/flaky").with_cancellation(token.clone());
	let started = Instant::now();
	let (result, ()) = tokio::join!(courier.dispatch(request), async {
		tokio::time::sleep(StdDuration::from_millis(100)).await;
		token.cancel();
	});
	let err = result.expect_err("Cancellation should interrupt the backoff sleep.");

	// One transmission only; the cancel lands inside the one-second backoff window.
	mock.assert_calls_async(1).await;

	assert!(err.is_cancelled());
	assert!(started.elapsed() < StdDuration::from_secs(1));
}

#[tokio::test]
async fn cancelled_calls_abandon_the_refresh_wait() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, store, navigator) = build_reqwest_test_courier(descriptor);

	store.save_now(TokenKind::Access, TokenSecret::new("access-stale"));
	store.save_now(TokenKind::Refresh, TokenSecret::new("refresh-live"));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/profile").header("authorization", "Bearer access-stale");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"success\":false,\"message\":\"Token expired\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/users/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_secs(2))
				.body("{\"access_token\":\"access-fresh\"}");
		})
		.await;

	let token = CancellationToken::new();
	let request = ApiRequest::get("/profile").with_cancellation(token.clone());
	let started = Instant::now();
	let (result, ()) = tokio::join!(courier.dispatch(request), async {
		tokio::time::sleep(StdDuration::from_millis(100)).await;
		token.cancel();
	});
	let err = result.expect_err("Cancellation should abandon the refresh wait.");

	assert!(err.is_cancelled());
	assert!(started.elapsed() < StdDuration::from_secs(1));
	assert!(navigator.visited().is_empty());
}
