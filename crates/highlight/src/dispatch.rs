//! Render-thread hand-off for computed deltas.
//!
//! Reconciliation runs on background workers, but the rendering surface's live
//! highlight state may only be touched from one thread. The coordinator posts
//! each delta through a [`PresentationDispatcher`]; the thread that owns the
//! surface drains the matching [`RenderQueue`], either from its own frame loop
//! ([`RenderQueue::drain`]) or as a dedicated thread
//! ([`PresentationDispatcher::spawn_render_thread`]).
//!
//! ```text
//! worker ─► dispatch(target, delta) ─► [FIFO] ─► render thread: is_live()? ─► apply_delta
//! ```
//!
//! The queue is a single FIFO, so deltas for one document apply in the order
//! their passes published them. Liveness is re-checked right before applying
//! because the hop may outlast the document.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use shade_primitives::{DocumentId, StyledAnnotation};
use shade_worker::TaskClass;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::Delta;

/// Capability supplied by the embedder to paint highlight changes.
///
/// All calls arrive on the render thread that drains the [`RenderQueue`].
pub trait RenderingSurface: Send + Sync {
	/// Removes `to_remove` and adds `to_add` to the document's displayed highlights.
	fn apply_delta(&self, doc: DocumentId, to_add: &[StyledAnnotation], to_remove: &[StyledAnnotation]);

	/// Returns false once the view for `doc` is disposed.
	fn is_live(&self, _doc: DocumentId) -> bool {
		true
	}
}

/// Where a delta goes, plus what decides whether it still may.
#[derive(Clone)]
pub struct RenderTarget {
	doc: DocumentId,
	surface: Arc<dyn RenderingSurface>,
	lifetime: CancellationToken,
}

impl std::fmt::Debug for RenderTarget {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RenderTarget")
			.field("doc", &self.doc)
			.field("torn_down", &self.lifetime.is_cancelled())
			.finish_non_exhaustive()
	}
}

impl RenderTarget {
	/// `lifetime` is cancelled when the document is uninstalled.
	pub fn new(doc: DocumentId, surface: Arc<dyn RenderingSurface>, lifetime: CancellationToken) -> Self {
		Self { doc, surface, lifetime }
	}

	pub fn doc(&self) -> DocumentId {
		self.doc
	}

	/// Returns true if the document was uninstalled.
	pub fn is_torn_down(&self) -> bool {
		self.lifetime.is_cancelled()
	}

	/// Document still installed and its view not disposed.
	pub fn is_live(&self) -> bool {
		!self.is_torn_down() && self.surface.is_live(self.doc)
	}
}

struct Job {
	target: RenderTarget,
	delta: Delta,
	span: tracing::Span,
}

impl std::fmt::Debug for Job {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Job")
			.field("target", &self.target)
			.field("added", &self.delta.to_add.len())
			.field("removed", &self.delta.to_remove.len())
			.finish()
	}
}

/// Counts from one drain of the render queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
	/// Deltas handed to their surface.
	pub applied: usize,
	/// Deltas dropped because their target was gone.
	pub discarded: usize,
}

impl DrainReport {
	fn merge(&mut self, other: DrainReport) {
		self.applied += other.applied;
		self.discarded += other.discarded;
	}
}

/// Creates a connected dispatcher/queue pair.
pub fn channel() -> (PresentationDispatcher, RenderQueue) {
	let (tx, rx) = mpsc::unbounded_channel();
	(PresentationDispatcher { tx }, RenderQueue { rx })
}

/// Sending half: fire-and-forget delta submission from any thread.
#[derive(Debug, Clone)]
pub struct PresentationDispatcher {
	tx: mpsc::UnboundedSender<Job>,
}

impl PresentationDispatcher {
	/// Spawns a dedicated render thread draining a fresh queue.
	///
	/// The thread exits once every dispatcher clone is dropped and returns the
	/// accumulated report.
	pub fn spawn_render_thread(name: impl Into<String>) -> std::io::Result<(Self, std::thread::JoinHandle<DrainReport>)> {
		let (dispatcher, queue) = channel();
		let handle = shade_worker::spawn_named_thread(TaskClass::Dedicated, name, move || queue.run())?;
		Ok((dispatcher, handle))
	}

	/// Queues `delta` for `target`. Never blocks; a closed queue drops the delta.
	pub fn dispatch(&self, target: RenderTarget, delta: Delta) {
		let doc = target.doc;
		let job = Job {
			target,
			delta,
			span: tracing::Span::current(),
		};
		if self.tx.send(job).is_err() {
			debug!(doc = %doc, "highlight.dispatch.closed");
		}
	}

	/// Returns true when the receiving queue is gone.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

/// Receiving half, owned by the render thread.
#[derive(Debug)]
pub struct RenderQueue {
	rx: mpsc::UnboundedReceiver<Job>,
}

impl RenderQueue {
	/// Applies every queued delta without blocking.
	pub fn drain(&mut self) -> DrainReport {
		let mut report = DrainReport::default();
		while let Ok(job) = self.rx.try_recv() {
			report.merge(apply(job));
		}
		report
	}

	/// Blocks applying deltas until all dispatchers are dropped.
	///
	/// Must not be called from inside an async runtime.
	pub fn run(mut self) -> DrainReport {
		let mut report = DrainReport::default();
		while let Some(job) = self.rx.blocking_recv() {
			report.merge(apply(job));
		}
		debug!(applied = report.applied, discarded = report.discarded, "highlight.render_queue.closed");
		report
	}
}

fn apply(job: Job) -> DrainReport {
	let Job { target, delta, span } = job;
	let _guard = span.enter();

	if !target.is_live() {
		debug!(doc = %target.doc, added = delta.to_add.len(), removed = delta.to_remove.len(), "highlight.dispatch.discarded");
		return DrainReport { applied: 0, discarded: 1 };
	}

	let result = std::panic::catch_unwind(AssertUnwindSafe(|| target.surface.apply_delta(target.doc, &delta.to_add, &delta.to_remove)));
	if let Err(payload) = result {
		warn!(doc = %target.doc, panic = %shade_worker::panic_message(payload.as_ref()), "highlight.dispatch.surface_panicked");
	}
	DrainReport { applied: 1, discarded: 0 }
}
