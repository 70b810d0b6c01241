//! Session teardown and the navigation seam.

// self
use crate::{
	_prelude::*,
	obs::{self, CallKind},
	store::TokenStore,
};

/// Observer for the location of whatever hosts the courier.
///
/// Implementations stand in for the owner of navigation in the embedding
/// application, whether that is a webview shell, a TUI route stack, or nothing at
/// all. The courier only ever sends users to the configured login location.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Returns the current location as a rooted path.
	fn current_location(&self) -> String;

	/// Sends the user to the provided rooted path.
	fn navigate(&self, location: &str);
}

/// Navigator that ignores every instruction.
///
/// The default for embeddings that surface session expiry out of band.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn current_location(&self) -> String {
		String::new()
	}

	fn navigate(&self, _: &str) {}
}

/// Terminal teardown shared by refresh denial and explicit sign-out.
#[derive(Clone)]
pub(crate) struct SessionGate {
	store: Arc<dyn TokenStore>,
	navigator: Arc<dyn Navigator>,
	login_location: String,
}
impl SessionGate {
	pub(crate) fn new(
		store: Arc<dyn TokenStore>,
		navigator: Arc<dyn Navigator>,
		login_location: String,
	) -> Self {
		Self { store, navigator, login_location }
	}

	/// Clears every stored token, then redirects unless already at the login location.
	///
	/// The clear happens even when the user is already signing in, and a store
	/// failure never blocks the redirect. Locations match exactly; a login page
	/// carrying query parameters still redirects.
	pub(crate) async fn expire(&self) {
		if let Err(e) = self.store.clear().await {
			obs::record_suppressed_error(CallKind::Session, "clear", &e);
		}
		if self.navigator.current_location() != self.login_location {
			self.navigator.navigate(&self.login_location);
		}
	}
}
impl Debug for SessionGate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionGate").field("login_location", &self.login_location).finish()
	}
}
