//! Bounded retry for chain lookups.

use crate::ChainError;
use backoff::backoff::{Backoff, Constant};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed number of attempts with a fixed pause in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	max_attempts: u32,
	delay: Duration,
}

impl RetryPolicy {
	/// A zero `max_attempts` is raised to one.
	pub fn new(max_attempts: u32, delay: Duration) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			delay,
		}
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Runs `op` until it yields a value or attempts run out.
	///
	/// Empty answers and transport errors are treated alike: the lookup is
	/// tried again after the delay. Errors are logged, never returned.
	pub async fn retry_until_some<T, F, Fut>(
		&self,
		what: &str,
		subject: impl Display,
		mut op: F,
	) -> Option<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<Option<T>, ChainError>>,
	{
		let mut backoff = Constant::new(self.delay);

		for attempt in 1..=self.max_attempts {
			match op().await {
				Ok(Some(value)) => return Some(value),
				Ok(None) => {
					debug!(
						%subject,
						"{} not available, attempt {}/{}",
						what, attempt, self.max_attempts
					);
				}
				Err(e) => {
					warn!(
						%subject,
						"{} lookup failed, attempt {}/{}: {}",
						what, attempt, self.max_attempts, e
					);
				}
			}

			if attempt < self.max_attempts {
				if let Some(delay) = backoff.next_backoff() {
					tokio::time::sleep(delay).await;
				}
			}
		}

		warn!(
			%subject,
			"{} still unavailable after {} attempts",
			what, self.max_attempts
		);
		None
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(5, Duration::from_secs(2))
	}
}
