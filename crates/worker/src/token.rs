use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio_util::sync::CancellationToken;

/// Cooperative cancellation handle with progress accounting.
///
/// Long-running passes poll [`Self::is_cancelled`] at their checkpoints and
/// report finished work through [`Self::worked`]. Clones share both the
/// cancellation state and the progress counter.
#[derive(Debug, Clone, Default)]
pub struct WorkToken {
	cancel: CancellationToken,
	worked: Arc<AtomicU32>,
}

impl WorkToken {
	/// Creates a fresh, uncancelled token.
	pub fn new() -> Self {
		Self::default()
	}

	/// Wraps an existing cancellation token.
	pub fn from_cancel(cancel: CancellationToken) -> Self {
		Self {
			cancel,
			worked: Arc::default(),
		}
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Creates a child token: cancelled with its parent, progress counted separately.
	pub fn child(&self) -> Self {
		Self::from_cancel(self.cancel.child_token())
	}

	/// Records `units` of finished work and returns whether cancellation was requested.
	pub fn worked(&self, units: u32) -> bool {
		self.worked.fetch_add(units, Ordering::AcqRel);
		self.is_cancelled()
	}

	/// Total work units reported so far.
	pub fn work_done(&self) -> u32 {
		self.worked.load(Ordering::Acquire)
	}

	/// Underlying cancellation token.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}
}
