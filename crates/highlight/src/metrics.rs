//! Reconciliation pass counters.
//!
//! Counters are bumped once per finished pass from whichever worker ran it.
//! Pass duration is smoothed with an exponential moving average over completed
//! passes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::ReconcileOutcome;

/// alpha = 2 / (N + 1). For N=10, alpha ~= 0.18.
const EMA_ALPHA: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default)]
struct Ema {
	value: f64,
	initialized: bool,
}

impl Ema {
	fn update(&mut self, next: f64) {
		if self.initialized {
			self.value = EMA_ALPHA * next + (1.0 - EMA_ALPHA) * self.value;
		} else {
			self.value = next;
			self.initialized = true;
		}
	}
}

#[derive(Debug, Default)]
pub struct ReconcileMetrics {
	published: AtomicU64,
	unchanged: AtomicU64,
	dropped: AtomicU64,
	cancelled: AtomicU64,
	failed: AtomicU64,
	not_installed: AtomicU64,
	target_gone: AtomicU64,
	annotations_added: AtomicU64,
	annotations_removed: AtomicU64,
	pass_ms: Mutex<Ema>,
}

/// Point-in-time copy of [`ReconcileMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
	pub published: u64,
	pub unchanged: u64,
	pub dropped: u64,
	pub cancelled: u64,
	pub failed: u64,
	pub not_installed: u64,
	pub target_gone: u64,
	pub annotations_added: u64,
	pub annotations_removed: u64,
	/// Smoothed duration of completed passes, if any completed.
	pub avg_pass: Option<Duration>,
}

impl MetricsSnapshot {
	/// Passes that ran to completion, whether or not they changed anything.
	pub fn completed(&self) -> u64 {
		self.published + self.unchanged
	}
}

impl ReconcileMetrics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record(&self, outcome: &ReconcileOutcome, elapsed: Duration) {
		let counter = match outcome {
			ReconcileOutcome::Published { added, removed } => {
				self.annotations_added.fetch_add(*added as u64, Ordering::Relaxed);
				self.annotations_removed.fetch_add(*removed as u64, Ordering::Relaxed);
				&self.published
			}
			ReconcileOutcome::Unchanged => &self.unchanged,
			ReconcileOutcome::Dropped => &self.dropped,
			ReconcileOutcome::Cancelled(_) => &self.cancelled,
			ReconcileOutcome::Failed(_) => &self.failed,
			ReconcileOutcome::NotInstalled => &self.not_installed,
			ReconcileOutcome::TargetGone => &self.target_gone,
		};
		counter.fetch_add(1, Ordering::Relaxed);

		if outcome.is_success() {
			self.pass_ms.lock().update(elapsed.as_secs_f64() * 1000.0);
		}
	}

	pub fn snapshot(&self) -> MetricsSnapshot {
		let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
		let ema = *self.pass_ms.lock();
		MetricsSnapshot {
			published: load(&self.published),
			unchanged: load(&self.unchanged),
			dropped: load(&self.dropped),
			cancelled: load(&self.cancelled),
			failed: load(&self.failed),
			not_installed: load(&self.not_installed),
			target_gone: load(&self.target_gone),
			annotations_added: load(&self.annotations_added),
			annotations_removed: load(&self.annotations_removed),
			avg_pass: ema.initialized.then(|| Duration::from_secs_f64(ema.value / 1000.0)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Checkpoint, ReconcileError};

	#[test]
	fn counts_each_outcome() {
		let metrics = ReconcileMetrics::new();
		let ms = Duration::from_millis(4);
		metrics.record(&ReconcileOutcome::Published { added: 3, removed: 1 }, ms);
		metrics.record(&ReconcileOutcome::Published { added: 2, removed: 0 }, ms);
		metrics.record(&ReconcileOutcome::Unchanged, ms);
		metrics.record(&ReconcileOutcome::Dropped, ms);
		metrics.record(&ReconcileOutcome::Cancelled(Checkpoint::Diffed), ms);
		metrics.record(&ReconcileOutcome::Failed(ReconcileError::DiffPanicked("boom".into())), ms);
		metrics.record(&ReconcileOutcome::NotInstalled, ms);
		metrics.record(&ReconcileOutcome::TargetGone, ms);

		let snap = metrics.snapshot();
		assert_eq!(snap.published, 2);
		assert_eq!(snap.completed(), 3);
		assert_eq!(snap.annotations_added, 5);
		assert_eq!(snap.annotations_removed, 1);
		assert_eq!((snap.dropped, snap.cancelled, snap.failed), (1, 1, 1));
		assert_eq!((snap.not_installed, snap.target_gone), (1, 1));
		let avg = snap.avg_pass.unwrap();
		assert!(avg.abs_diff(ms) < Duration::from_micros(1));
	}

	#[test]
	fn aborted_passes_do_not_move_the_average() {
		let metrics = ReconcileMetrics::new();
		metrics.record(&ReconcileOutcome::Dropped, Duration::from_secs(1));
		assert_eq!(metrics.snapshot().avg_pass, None);

		metrics.record(&ReconcileOutcome::Unchanged, Duration::from_millis(10));
		metrics.record(&ReconcileOutcome::Unchanged, Duration::from_millis(20));
		let avg = metrics.snapshot().avg_pass.unwrap();
		assert!(avg > Duration::from_millis(10) && avg < Duration::from_millis(20));
	}
}
