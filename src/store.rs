//! Storage contracts and built-in token store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
};

/// Future type returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for courier-managed credentials.
///
/// The courier keys secrets by [`TokenKind`]; backends decide where the three slots
/// live (process memory, a snapshot file, an OS keychain). Implementations must be
/// safe to share behind `Arc<dyn TokenStore>` because the pipeline, the refresh
/// exchange, and session expiry all touch the same store concurrently.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the secret stored for the kind, if present.
	fn load(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Persists or replaces the secret stored for the kind.
	fn save(&self, kind: TokenKind, secret: TokenSecret) -> StoreFuture<'_, ()>;

	/// Removes every stored kind in one operation.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
