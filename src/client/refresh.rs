//! Single-flight refresh coordination and the refresh token exchange.
//!
//! Any number of concurrent 401 recoveries collapse into one exchange against the
//! descriptor's refresh endpoint. The first caller to observe the stale session
//! becomes the leader: it flips the shared flag, runs the exchange as a detached
//! task, and settles every queued waiter in arrival order. The flag drops back to
//! idle before outcomes are delivered, so a replay that fails again starts a fresh
//! cycle instead of observing the finished one. The exchange itself bypasses the
//! interceptor pipeline and never retries; it is bounded only by the descriptor's
//! deadline.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use http::{HeaderMap, HeaderValue, Method, header::CONTENT_TYPE};
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenPair, TokenSecret},
	client::Courier,
	envelope,
	http::{RawRequest, Transport, TransportErrorMapper},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::ApiRequest,
	store::StoreError,
};

/// Outcome broadcast to every caller of a refresh cycle.
pub(crate) type RefreshOutcome = Result<TokenPair, RefreshDenied>;

/// Terminal denial delivered to every waiter of a refresh cycle.
///
/// A denial always follows session teardown: the store is cleared and the user is
/// sent to the login location before any waiter observes it.
#[derive(Clone, Debug)]
pub(crate) struct RefreshDenied {
	reason: String,
	status: Option<u16>,
}
impl RefreshDenied {
	fn new(reason: impl Into<String>, status: Option<u16>) -> Self {
		Self { reason: reason.into(), status }
	}

	fn missing_refresh_token() -> Self {
		Self::new("No refresh token is available.", None)
	}

	fn storage(source: &StoreError) -> Self {
		Self::new(format!("Token storage failed: {source}"), None)
	}

	fn transport(source: &Error) -> Self {
		Self::new(format!("The refresh call failed: {source}"), None)
	}

	fn timed_out() -> Self {
		Self::new("The refresh call timed out.", None)
	}

	fn rejected(status: u16, message: Option<String>) -> Self {
		let reason =
			message.unwrap_or_else(|| "The refresh endpoint rejected the session.".into());

		Self::new(reason, Some(status))
	}

	fn malformed() -> Self {
		Self::new("The refresh response was malformed.", None)
	}

	fn interrupted() -> Self {
		Self::new("The refresh was interrupted before completing.", None)
	}
}
impl From<RefreshDenied> for Error {
	fn from(denied: RefreshDenied) -> Self {
		Self::RefreshFailed { reason: denied.reason, status: denied.status }
	}
}

/// Role assigned to a caller joining the current refresh cycle.
pub(crate) enum RefreshTicket {
	/// This caller starts the exchange and must settle the queue afterwards.
	Lead(oneshot::Receiver<RefreshOutcome>),
	/// Another caller is already refreshing; wait for its outcome.
	Wait(oneshot::Receiver<RefreshOutcome>),
}

/// Process-wide single-flight state shared by every courier clone.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
	state: Mutex<RefreshState>,
}
impl RefreshCoordinator {
	/// Joins the current refresh cycle.
	///
	/// The check-and-set and the enqueue happen under one lock acquisition with no
	/// awaits, so exactly one concurrent caller leads. The leader enqueues itself
	/// ahead of every follower.
	pub(crate) fn join(&self) -> RefreshTicket {
		let (tx, rx) = oneshot::channel();
		let mut state = self.state.lock();

		state.waiters.push(tx);

		if state.refreshing {
			RefreshTicket::Wait(rx)
		} else {
			state.refreshing = true;

			RefreshTicket::Lead(rx)
		}
	}

	/// Ends the cycle and delivers the outcome to every waiter in arrival order.
	///
	/// The flag drops back to idle before any outcome is sent, so a waiter whose
	/// replay hits another 401 joins a fresh cycle instead of the finished one.
	pub(crate) fn settle(&self, outcome: RefreshOutcome) {
		let waiters = {
			let mut state = self.state.lock();

			state.refreshing = false;

			mem::take(&mut state.waiters)
		};

		for waiter in waiters {
			// A caller cancelled mid-queue has dropped its receiver.
			let _ = waiter.send(outcome.clone());
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RefreshCoordinator(..)")
	}
}

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Grant payload accepted from the refresh endpoint.
///
/// The endpoint may answer with the standard envelope or with the grant at the top
/// level; both decode to the same shape, and the envelope's `success` flag is not
/// consulted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RefreshReply {
	Wrapped { data: TokenGrant },
	Flat(TokenGrant),
}
impl RefreshReply {
	fn into_grant(self) -> TokenGrant {
		match self {
			Self::Wrapped { data } => data,
			Self::Flat(grant) => grant,
		}
	}
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
}

impl<T, M> Courier<T, M>
where
	T: ?Sized + Transport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Forces a refresh exchange, sharing any cycle already in flight.
	///
	/// Returns the fresh token pair on success. Denials behave exactly like a
	/// failed 401 recovery: the session is torn down before
	/// [`Error::RefreshFailed`] reaches the caller.
	pub async fn refresh_session(&self) -> Result<TokenPair> {
		match self.join_cycle().await {
			Ok(Ok(pair)) => Ok(pair),
			Ok(Err(denied)) => Err(denied.into()),
			Err(_) => Err(RefreshDenied::interrupted().into()),
		}
	}

	/// Joins a refresh cycle on behalf of a 401 recovery, racing the descriptor's
	/// cancellation token.
	///
	/// Cancelling the waiting descriptor abandons only its wait; the shared
	/// exchange keeps running for everyone else.
	pub(crate) async fn refreshed_session(&self, request: &ApiRequest) -> Result<TokenPair> {
		let rx = self.join_cycle();

		tokio::select! {
			biased;
			_ = request.cancelled() => Err(Error::Cancelled),
			outcome = rx => match outcome {
				Ok(Ok(pair)) => Ok(pair),
				Ok(Err(denied)) => Err(denied.into()),
				Err(_) => Err(RefreshDenied::interrupted().into()),
			},
		}
	}

	fn join_cycle(&self) -> oneshot::Receiver<RefreshOutcome> {
		match self.refresh.join() {
			RefreshTicket::Lead(rx) => {
				let courier = self.clone();

				tokio::spawn(async move {
					let outcome = courier.run_refresh_exchange().await;

					courier.refresh.settle(outcome);
				});

				rx
			},
			RefreshTicket::Wait(rx) => {
				self.refresh_metrics.record_coalesced();

				rx
			},
		}
	}

	async fn run_refresh_exchange(&self) -> RefreshOutcome {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "run_refresh_exchange");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let outcome = span.instrument(self.exchange_refresh_token()).await;

		match &outcome {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		outcome
	}

	async fn exchange_refresh_token(&self) -> RefreshOutcome {
		self.refresh_metrics.record_attempt();

		let refresh_token = match self.store.load(TokenKind::Refresh).await {
			Ok(Some(secret)) => secret,
			Ok(None) => return self.deny(RefreshDenied::missing_refresh_token()).await,
			Err(e) => return self.deny(RefreshDenied::storage(&e)).await,
		};
		let body = serde_json::json!({ "refresh_token": refresh_token.expose() });
		let raw = self.refresh_request(body.to_string().into_bytes());
		let transmitted =
			tokio::time::timeout(self.descriptor.timeout, self.transport.execute(raw)).await;
		let response = match transmitted {
			Ok(Ok(response)) => response,
			Ok(Err(e)) => {
				let mapped = self.transport_mapper.map_transport_error(e);

				return self.deny(RefreshDenied::transport(&mapped)).await;
			},
			Err(_) => return self.deny(RefreshDenied::timed_out()).await,
		};

		if !response.status.is_success() {
			let status = response.status.as_u16();
			let message = envelope::extract_message(&response);

			return self.deny(RefreshDenied::rejected(status, message)).await;
		}

		let grant = match serde_json::from_slice::<RefreshReply>(&response.body) {
			Ok(reply) => reply.into_grant(),
			Err(_) => return self.deny(RefreshDenied::malformed()).await,
		};
		let pair = TokenPair {
			access: TokenSecret::new(grant.access_token),
			refresh: grant.refresh_token.map(TokenSecret::new),
		};

		// A grant without a rotated refresh token keeps the stored one.
		if let Err(e) = self.store.save(TokenKind::Access, pair.access.clone()).await {
			obs::record_suppressed_error(CallKind::Refresh, "persist_access", &e);
		}
		if let Some(rotated) = &pair.refresh {
			if let Err(e) = self.store.save(TokenKind::Refresh, rotated.clone()).await {
				obs::record_suppressed_error(CallKind::Refresh, "persist_refresh", &e);
			}
		}

		self.refresh_metrics.record_success();

		Ok(pair)
	}

	async fn deny(&self, denial: RefreshDenied) -> RefreshOutcome {
		self.refresh_metrics.record_failure();
		self.session.expire().await;

		Err(denial)
	}

	fn refresh_request(&self, body: Vec<u8>) -> RawRequest {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		RawRequest {
			method: Method::POST,
			url: self.descriptor.refresh_endpoint.clone(),
			headers,
			body: Some(body),
		}
	}
}
