use thiserror::Error;

/// Unexpected failures inside a reconciliation pass.
///
/// These never escape [`crate::Coordinator::reconcile`]: the coordinator logs
/// them with document context and aborts the pass, leaving published state at
/// its last-known-good value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
	/// Classification or style resolution panicked.
	#[error("classification panicked: {0}")]
	ClassifierPanicked(String),
	/// Computing the delta panicked.
	#[error("diff panicked: {0}")]
	DiffPanicked(String),
}
