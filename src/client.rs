//! High-level courier orchestrator and its call surfaces.

pub mod refresh;

mod dispatch;

pub use refresh::*;

// self
use crate::{
	_prelude::*,
	descriptor::ServiceDescriptor,
	http::{Transport, TransportErrorMapper},
	pipeline::{
		BaselineHeaders, BearerInjector, CsrfInjector, Pipeline, RequestInterceptor,
		ResponseInterceptor,
	},
	session::{Navigator, NoopNavigator, SessionGate},
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestTransport, ReqwestTransportErrorMapper};

/// Courier specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestCourier = Courier<ReqwestTransport, ReqwestTransportErrorMapper>;

/// Coordinates resilient API calls against a single service descriptor.
///
/// The courier owns the transport, token store, descriptor, session gate, and
/// interceptor chains so the dispatch loop can focus on retry, refresh, and
/// cancellation decisions. Clones share every seam, including the single-flight
/// refresh coordinator; concurrent calls through clones collapse their 401
/// recoveries into one exchange.
pub struct Courier<T, M>
where
	T: ?Sized + Transport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Transport used for every outbound exchange.
	pub transport: Arc<T>,
	/// Mapper applied to transport-layer errors before classification.
	pub transport_mapper: Arc<M>,
	/// Token store read by the header injectors and written by refresh exchanges.
	pub store: Arc<dyn TokenStore>,
	/// Service descriptor that defines endpoints, deadlines, and retry budgets.
	pub descriptor: ServiceDescriptor,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	pipeline: Pipeline,
	session: SessionGate,
	refresh: Arc<RefreshCoordinator>,
}
impl<T, M> Courier<T, M>
where
	T: ?Sized + Transport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	/// Creates a courier that reuses the caller-provided transport + mapper pair.
	pub fn with_transport(
		store: Arc<dyn TokenStore>,
		descriptor: ServiceDescriptor,
		transport: impl Into<Arc<T>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let mut pipeline = Pipeline::default();

		pipeline.push_request(Arc::new(BaselineHeaders));
		pipeline.push_request(Arc::new(BearerInjector::new(store.clone())));
		pipeline.push_request(Arc::new(CsrfInjector::new(store.clone())));

		let session = SessionGate::new(
			store.clone(),
			Arc::new(NoopNavigator),
			descriptor.login_location.clone(),
		);

		Self {
			transport: transport.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			refresh_metrics: Default::default(),
			pipeline,
			session,
			refresh: Default::default(),
		}
	}

	/// Replaces the navigator consulted during session teardown.
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.session = SessionGate::new(
			self.store.clone(),
			navigator,
			self.descriptor.login_location.clone(),
		);

		self
	}

	/// Appends a request interceptor behind the courier's own header injectors.
	///
	/// Interceptors run in registration order on every attempt, including replays
	/// after a refresh.
	pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
		self.pipeline.push_request(interceptor);

		self
	}

	/// Appends a response interceptor behind envelope normalization.
	pub fn with_response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
		self.pipeline.push_response(interceptor);

		self
	}
}
#[cfg(feature = "reqwest")]
impl Courier<ReqwestTransport, ReqwestTransportErrorMapper> {
	/// Creates a new courier for the provided descriptor.
	///
	/// The courier provisions its own reqwest-backed transport so callers do not
	/// need to pass HTTP handles explicitly. Use [`Courier::with_navigator`] to wire
	/// session expiry into the embedding application's routing.
	pub fn new(store: Arc<dyn TokenStore>, descriptor: ServiceDescriptor) -> Self {
		Self::with_transport(
			store,
			descriptor,
			ReqwestTransport::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<T, M> Clone for Courier<T, M>
where
	T: ?Sized + Transport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	// A derive would demand `T: Clone`; every field is reference-counted.
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			transport_mapper: self.transport_mapper.clone(),
			store: self.store.clone(),
			descriptor: self.descriptor.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			pipeline: self.pipeline.clone(),
			session: self.session.clone(),
			refresh: self.refresh.clone(),
		}
	}
}
impl<T, M> Debug for Courier<T, M>
where
	T: ?Sized + Transport,
	M: ?Sized + TransportErrorMapper<T::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Courier")
			.field("descriptor", &self.descriptor)
			.field("pipeline", &self.pipeline)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
