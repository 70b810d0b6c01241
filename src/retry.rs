//! Retry budget and backoff schedule for the dispatch loop.

// self
use crate::_prelude::*;

/// Retry budget and backoff schedule applied to retryable failures.
///
/// The delay before retry `n` (1-based) is `base_delay * multiplier^(n-1)`. A server
/// `Retry-After` hint overrides the computed delay only upward, clamped to
/// [`RetryPolicy::MAX_HINT`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Maximum number of retries after the initial transmission.
	pub max_retries: u32,
	/// Delay before the first retry.
	pub base_delay: StdDuration,
	/// Growth factor applied per retry.
	pub multiplier: u32,
}
impl RetryPolicy {
	/// Upper bound applied to server-provided `Retry-After` hints.
	pub const MAX_HINT: StdDuration = StdDuration::from_secs(300);

	/// Policy that never schedules a second transmission.
	pub const fn none() -> Self {
		Self { max_retries: 0, base_delay: StdDuration::ZERO, multiplier: 1 }
	}

	/// Whether the budget allows another retry after `retry_count` completed retries.
	pub const fn allows(&self, retry_count: u32) -> bool {
		retry_count < self.max_retries
	}

	/// Computed backoff before retry `attempt` (1-based).
	pub fn delay_for_attempt(&self, attempt: u32) -> StdDuration {
		let exponent = attempt.saturating_sub(1);
		let factor = self.multiplier.saturating_pow(exponent);

		self.base_delay.saturating_mul(factor)
	}

	/// Backoff before retry `attempt`, honoring an upstream `Retry-After` hint.
	///
	/// Hints never shorten the computed delay; a server asking for more patience than
	/// the schedule grants wins, up to [`RetryPolicy::MAX_HINT`].
	pub fn delay_with_hint(&self, attempt: u32, hint: Option<Duration>) -> StdDuration {
		let computed = self.delay_for_attempt(attempt);
		let Some(hint) = hint else {
			return computed;
		};
		let Ok(hint) = StdDuration::try_from(hint) else {
			return computed;
		};

		hint.min(Self::MAX_HINT).max(computed)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_retries: 3, base_delay: StdDuration::from_secs(1), multiplier: 2 }
	}
}
