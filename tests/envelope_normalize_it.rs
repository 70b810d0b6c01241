#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use api_courier::{_preludet::*, descriptor::ServiceDescriptor, error::FailureKind, serde_json::json};

fn build_descriptor(server: &MockServer) -> ServiceDescriptor {
	let base_url =
		Url::parse(&server.url("/")).expect("Mock server base URL should parse successfully.");

	ServiceDescriptor::builder(base_url)
		.build()
		.expect("Service descriptor should build successfully.")
}

#[tokio::test]
async fn enveloped_bodies_unwrap_into_their_parts() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, _, _) = build_reqwest_test_courier(descriptor);

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/users");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"success\":true,\"data\":[1,2,3],\"message\":\"Three users\",\"pagination\":{\"page\":1,\"total\":3}}",
				);
		})
		.await;
	let response = courier.get("/users").await.expect("Enveloped read should succeed.");

	mock.assert_async().await;

	assert!(response.is_enveloped());
	assert_eq!(response.success, Some(true));
	assert_eq!(response.data, json!([1, 2, 3]));
	assert_eq!(response.message.as_deref(), Some("Three users"));
	assert_eq!(response.pagination, Some(json!({ "page": 1, "total": 3 })));
	assert_eq!(
		response.json::<Vec<u32>>().expect("Unwrapped data should decode."),
		vec![1, 2, 3],
	);
}

#[tokio::test]
async fn failure_envelopes_surface_their_message() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, _, _) = build_reqwest_test_courier(descriptor);

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/9");
			then.status(403)
				.header("content-type", "application/json")
				.body("{\"success\":false,\"message\":\"Forbidden by policy\"}");
		})
		.await;
	let err = courier.get("/users/9").await.expect_err("A 403 should fail the call.");

	mock.assert_calls_async(1).await;

	assert_eq!(err.status(), Some(403));
	assert_eq!(err.kind(), FailureKind::NonRetryableServer);
	assert_eq!(err.user_message(), "Forbidden by policy");
}

#[tokio::test]
async fn status_fallbacks_cover_missing_messages() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, _, _) = build_reqwest_test_courier(descriptor);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/users/404");
			then.status(404).header("content-type", "application/json").body("{}");
		})
		.await;
	let err = courier.get("/users/404").await.expect_err("A 404 should fail the call.");

	assert_eq!(err.user_message(), "The requested resource was not found.");
}

#[tokio::test]
async fn empty_bodies_normalize_to_null() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, _, _) = build_reqwest_test_courier(descriptor);

	server
		.mock_async(|when, then| {
			when.method(DELETE).path("/users/3");
			then.status(204);
		})
		.await;
	let response = courier.delete("/users/3").await.expect("Delete should succeed.");

	assert!(!response.is_enveloped());
	assert!(response.data.is_null());
	assert_eq!(response.status.as_u16(), 204);
}

#[tokio::test]
async fn non_json_bodies_pass_through_as_text() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (courier, _, _) = build_reqwest_test_courier(descriptor);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/status");
			then.status(200).header("content-type", "text/html").body("<p>All good</p>");
		})
		.await;
	let response = courier.get("/status").await.expect("Text read should succeed.");

	assert!(!response.is_enveloped());
	assert_eq!(response.data, "<p>All good</p>");
}
