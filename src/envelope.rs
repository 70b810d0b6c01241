//! Response normalization for the standard backend envelope.
//!
//! Success bodies shaped `{ "success": bool, "data": ..., "message"?, "pagination"? }`
//! unwrap into [`ApiResponse`] fields; any other body passes through untouched as
//! `data`. Error-status bodies are only mined for their `message` text.

// crates.io
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{_prelude::*, http::RawResponse};

/// Wire shape of the standard backend envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
	success: bool,
	#[serde(default)]
	data: Value,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	pagination: Option<Value>,
}

/// Normalized response returned by the dispatch loop.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status of the final transmission.
	pub status: StatusCode,
	/// Envelope `success` flag; `None` when the body was not enveloped.
	pub success: Option<bool>,
	/// Envelope `data` payload, or the whole body for non-enveloped responses.
	pub data: Value,
	/// Envelope `message`, when present.
	pub message: Option<String>,
	/// Envelope `pagination` metadata, when present.
	pub pagination: Option<Value>,
}
impl ApiResponse {
	/// Whether the body carried the standard envelope.
	pub fn is_enveloped(&self) -> bool {
		self.success.is_some()
	}

	/// Deserializes `data` into a concrete type, annotating failures with their path.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(self.data.clone())
			.map_err(|e| Error::Decode { source: e })
	}
}

/// Normalizes a raw success response into an [`ApiResponse`].
pub(crate) fn normalize(raw: &RawResponse) -> ApiResponse {
	let status = raw.status;

	if raw.body.is_empty() {
		return passthrough(status, Value::Null);
	}

	let value = match serde_json::from_slice::<Value>(&raw.body) {
		Ok(value) => value,
		// Non-JSON success bodies surface as text instead of failing the dispatch.
		Err(_) => return passthrough(status, Value::String(raw.text())),
	};

	match parse_envelope(&value) {
		Some(envelope) => ApiResponse {
			status,
			success: Some(envelope.success),
			data: envelope.data,
			message: envelope.message,
			pagination: envelope.pagination,
		},
		None => passthrough(status, value),
	}
}

/// Extracts the backend-supplied `message` from an error body, when one exists.
pub(crate) fn extract_message(raw: &RawResponse) -> Option<String> {
	let value = serde_json::from_slice::<Value>(&raw.body).ok()?;

	value.get("message")?.as_str().map(str::to_owned)
}

fn passthrough(status: StatusCode, data: Value) -> ApiResponse {
	ApiResponse { status, success: None, data, message: None, pagination: None }
}

fn parse_envelope(value: &Value) -> Option<Envelope> {
	if !value.get("success")?.is_boolean() {
		return None;
	}

	serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::HeaderMap;
	use serde_json::json;
	// self
	use super::*;

	fn raw(status: u16, body: Value) -> RawResponse {
		RawResponse {
			status: StatusCode::from_u16(status).expect("Failed to build status fixture."),
			headers: HeaderMap::new(),
			body: serde_json::to_vec(&body).expect("Failed to serialize body fixture."),
		}
	}

	#[test]
	fn enveloped_bodies_unwrap_into_fields() {
		let response = normalize(&raw(
			200,
			json!({
				"success": true,
				"data": { "id": 7, "name": "alpha" },
				"message": "Fetched.",
				"pagination": { "page": 2, "total": 9 },
			}),
		));

		assert!(response.is_enveloped());
		assert_eq!(response.success, Some(true));
		assert_eq!(response.data, json!({ "id": 7, "name": "alpha" }));
		assert_eq!(response.message.as_deref(), Some("Fetched."));
		assert_eq!(response.pagination, Some(json!({ "page": 2, "total": 9 })));
	}

	#[test]
	fn envelopes_without_data_normalize_to_null() {
		let response = normalize(&raw(200, json!({ "success": true })));

		assert_eq!(response.success, Some(true));
		assert_eq!(response.data, Value::Null);
		assert_eq!(response.message, None);
		assert_eq!(response.pagination, None);
	}

	#[test]
	fn non_envelope_bodies_pass_through() {
		let object = normalize(&raw(200, json!({ "id": 3, "success_rate": 0.4 })));
		let array = normalize(&raw(200, json!([1, 2, 3])));
		let string_flag = normalize(&raw(200, json!({ "success": "yes", "data": 1 })));

		assert!(!object.is_enveloped());
		assert_eq!(object.data, json!({ "id": 3, "success_rate": 0.4 }));
		assert_eq!(array.data, json!([1, 2, 3]));
		// A non-boolean `success` key disqualifies the envelope shape.
		assert!(!string_flag.is_enveloped());
		assert_eq!(string_flag.data, json!({ "success": "yes", "data": 1 }));
	}

	#[test]
	fn empty_and_non_json_bodies_stay_usable() {
		let empty = normalize(&RawResponse {
			status: StatusCode::NO_CONTENT,
			headers: HeaderMap::new(),
			body: Vec::new(),
		});
		let text = normalize(&RawResponse {
			status: StatusCode::OK,
			headers: HeaderMap::new(),
			body: b"pong".to_vec(),
		});

		assert_eq!(empty.data, Value::Null);
		assert_eq!(empty.success, None);
		assert_eq!(text.data, Value::String("pong".into()));
	}

	#[test]
	fn typed_extraction_reports_the_failing_path() {
		#[derive(Debug, Deserialize)]
		struct User {
			#[allow(dead_code)]
			id: u64,
		}

		let response = normalize(&raw(200, json!({ "success": true, "data": { "id": "seven" } })));
		let err = response.json::<User>().expect_err("Mistyped payload should fail decoding.");

		let Error::Decode { source } = err else {
			panic!("Expected a decode failure, got {err:?}.");
		};

		assert_eq!(source.path().to_string(), "id");
	}

	#[test]
	fn error_bodies_yield_their_message_only() {
		let enveloped = raw(422, json!({ "success": false, "message": "Name is taken." }));
		let bare = raw(500, json!({ "error": "boom" }));

		assert_eq!(extract_message(&enveloped).as_deref(), Some("Name is taken."));
		assert_eq!(extract_message(&bare), None);
	}
}
