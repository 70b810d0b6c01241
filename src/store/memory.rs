//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
	store::{StoreFuture, TokenStore},
};

type Slots = Arc<RwLock<HashMap<TokenKind, TokenSecret>>>;

/// Thread-safe storage backend that keeps secrets in-process.
///
/// Clones share the same slots, so a clone handed to the courier observes every
/// mutation made through the original.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slots);
impl MemoryStore {
	/// Reads a secret without going through the boxed-future contract.
	pub fn load_now(&self, kind: TokenKind) -> Option<TokenSecret> {
		self.0.read().get(&kind).cloned()
	}

	/// Stores a secret without going through the boxed-future contract.
	pub fn save_now(&self, kind: TokenKind, secret: TokenSecret) {
		self.0.write().insert(kind, secret);
	}

	/// Removes every stored secret without going through the boxed-future contract.
	pub fn clear_now(&self) {
		self.0.write().clear();
	}

	/// Number of populated slots.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Whether no secret is stored at all.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenStore for MemoryStore {
	fn load(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.load_now(kind)) })
	}

	fn save(&self, kind: TokenKind, secret: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.save_now(kind, secret);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.clear_now();

			Ok(())
		})
	}
}
