//! Token vocabulary shared by the pipeline, refresh exchange, and stores.

// self
use crate::_prelude::*;

/// Token kinds persisted by the courier, keyed by their stable storage names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
	/// Short-lived bearer credential injected as `Authorization: Bearer`.
	#[serde(rename = "access_token")]
	Access,
	/// Long-lived credential exchanged at the refresh endpoint.
	#[serde(rename = "refresh_token")]
	Refresh,
	/// Anti-forgery credential injected as `X-CSRF-Token` on state-changing calls.
	#[serde(rename = "csrf_token")]
	Csrf,
}
impl TokenKind {
	/// Every kind, in the order session expiry clears them.
	pub const ALL: [Self; 3] = [Self::Access, Self::Refresh, Self::Csrf];

	/// Returns the stable storage key for this kind.
	pub const fn storage_key(self) -> &'static str {
		match self {
			TokenKind::Access => "access_token",
			TokenKind::Refresh => "refresh_token",
			TokenKind::Csrf => "csrf_token",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.storage_key())
	}
}

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Secrets returned by a successful refresh exchange.
#[derive(Clone, Debug)]
pub struct TokenPair {
	/// Fresh access token.
	pub access: TokenSecret,
	/// Rotated refresh token, when the backend issued one.
	pub refresh: Option<TokenSecret>,
}
