use std::sync::Arc;

use arc_swap::ArcSwap;
use shade_primitives::{DocumentId, StyledAnnotation};
use shade_worker::{SingleFlight, WorkToken};
use tokio_util::sync::CancellationToken;

use super::{Checkpoint, PassState};
use crate::{RenderTarget, RenderingSurface, StyleResolver};

/// Per-document reconciliation state, created by `install`.
pub(super) struct DocSlot {
	/// Published annotations; only a pass holding the gate may replace them.
	pub(super) published: SingleFlight<Arc<Vec<StyledAnnotation>>>,
	/// Same list as `published`, readable without entering the gate.
	pub(super) snapshot: ArcSwap<Vec<StyledAnnotation>>,
	pub(super) target: RenderTarget,
	pub(super) styles: Arc<dyn StyleResolver>,
	lifetime: CancellationToken,
}

impl DocSlot {
	pub(super) fn new(doc: DocumentId, surface: Arc<dyn RenderingSurface>, styles: Arc<dyn StyleResolver>) -> Self {
		let lifetime = CancellationToken::new();
		let empty = Arc::new(Vec::new());
		Self {
			published: SingleFlight::new(Arc::clone(&empty)),
			snapshot: ArcSwap::new(empty),
			target: RenderTarget::new(doc, surface, lifetime.clone()),
			styles,
			lifetime,
		}
	}

	pub(super) fn state(&self) -> PassState {
		if self.published.is_busy() { PassState::Running } else { PassState::Idle }
	}

	/// Cancels any in-flight pass and invalidates queued deltas.
	pub(super) fn tear_down(&self) {
		self.lifetime.cancel();
	}

	/// Returns the checkpoint back if the pass must stop here.
	pub(super) fn interrupted(&self, token: &WorkToken, at: Checkpoint) -> Option<Checkpoint> {
		(token.is_cancelled() || self.lifetime.is_cancelled()).then_some(at)
	}
}
