//! Daily stale-key reset: once at startup, then every day at a fixed local time.

// crates.io
use time::{Time, UtcOffset};
#[cfg(feature = "server")] use tokio::task::JoinHandle;
// self
use crate::_prelude::*;
#[cfg(feature = "server")] use crate::pool::KeyPool;

/// Next instant strictly after `now` whose wall-clock time (in `now`'s offset) equals `at`.
pub fn next_run_after(now: OffsetDateTime, at: Time) -> OffsetDateTime {
	let today = now.replace_time(at);

	if today > now { today } else { today + Duration::days(1) }
}

/// Local "now" in a fixed offset.
pub fn now_in(offset: UtcOffset) -> OffsetDateTime {
	OffsetDateTime::now_utc().to_offset(offset)
}

/// Background task driving [`KeyPool::reset_stale`].
///
/// The offset is fixed when the scheduler starts, so a daylight-saving change shifts the run by
/// an hour until the process restarts.
#[cfg(feature = "server")]
#[derive(Debug)]
pub struct ResetScheduler {
	handle: JoinHandle<()>,
}
#[cfg(feature = "server")]
impl ResetScheduler {
	/// Spawns the task on the current runtime; the first sweep starts immediately.
	pub fn spawn(pool: KeyPool, at: Time, offset: UtcOffset) -> Self {
		let handle = tokio::spawn(async move {
			Self::run(&pool, offset).await;

			loop {
				let now = now_in(offset);
				let next = next_run_after(now, at);

				tracing::info!(next_run = %next, "Scheduled next stale key reset.");
				tokio::time::sleep((next - now).unsigned_abs()).await;

				Self::run(&pool, offset).await;
			}
		});

		Self { handle }
	}

	/// Returns `true` once the task has stopped.
	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Cancels the task and waits for it to stop.
	pub async fn shutdown(self) {
		self.handle.abort();

		match self.handle.await {
			Ok(()) => {},
			Err(e) if e.is_cancelled() => tracing::info!("Reset scheduler stopped."),
			Err(e) => tracing::error!(error = %e, "Reset scheduler panicked."),
		}
	}

	async fn run(pool: &KeyPool, offset: UtcOffset) {
		if let Err(e) = pool.reset_stale(now_in(offset)).await {
			tracing::error!(error = %e, "Scheduled stale key reset failed.");
		}
	}
}
