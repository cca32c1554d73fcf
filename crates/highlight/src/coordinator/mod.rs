//! Gated, cancellable reconciliation passes over installed documents.
//!
//! A pass walks `Idle → Running → (published | aborted) → Idle`:
//!
//! * Entry is a non-blocking try on the document's [`SingleFlight`] gate. A
//!   request that finds the gate held is dropped, not queued; the next edit
//!   will produce a fresher one.
//! * While running, cancellation is polled at four [`Checkpoint`]s. Any abort
//!   leaves the published list exactly as it was.
//! * The gate owns the published list, so replacing it and dispatching the
//!   delta happen in one critical section. Readers use the lock-free
//!   [`Coordinator::published`] snapshot instead.
//!
//! [`SingleFlight`]: shade_worker::SingleFlight

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use shade_ast::Ast;
use shade_primitives::{DocumentId, StyledAnnotation};
use shade_worker::{TaskClass, WorkToken};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::{Classifier, PresentationDispatcher, ReconcileError, ReconcileMetrics, RenderingSurface, StyleResolver, diff};

mod slot;
#[cfg(test)]
mod tests;

use slot::DocSlot;

/// Work units reported through [`WorkToken::worked`] over a full pass.
const UNITS_BEGIN: u32 = 1;
const UNITS_CLASSIFY: u32 = 5;
const UNITS_SNAPSHOT: u32 = 1;
const UNITS_DIFF: u32 = 2;
const UNITS_PUBLISH: u32 = 1;

/// One request to bring a document's highlights up to date with `ast`.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
	pub doc: DocumentId,
	pub ast: Arc<Ast>,
	pub token: WorkToken,
}

impl ReconcileRequest {
	pub fn new(doc: DocumentId, ast: impl Into<Arc<Ast>>) -> Self {
		Self {
			doc,
			ast: ast.into(),
			token: WorkToken::new(),
		}
	}

	pub fn with_token(mut self, token: WorkToken) -> Self {
		self.token = token;
		self
	}
}

/// Points where a running pass polls for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
	Classified,
	Snapshotted,
	Diffed,
	BeforeDispatch,
}

impl Checkpoint {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Classified => "classified",
			Self::Snapshotted => "snapshotted",
			Self::Diffed => "diffed",
			Self::BeforeDispatch => "before_dispatch",
		}
	}
}

/// What a call to [`Coordinator::reconcile`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
	/// State replaced and a non-empty delta handed to the dispatcher.
	Published { added: usize, removed: usize },
	/// Pass completed with nothing to change.
	Unchanged,
	/// Another pass held the gate.
	Dropped,
	/// Cancellation observed at the given checkpoint.
	Cancelled(Checkpoint),
	Failed(ReconcileError),
	/// No document with that id is installed.
	NotInstalled,
	/// The surface reported the view disposed before publish.
	TargetGone,
}

impl ReconcileOutcome {
	/// Returns true if the pass ran to completion.
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Published { .. } | Self::Unchanged)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
	Idle,
	Running,
}

/// Owns per-document reconciliation state and runs passes against it.
pub struct Coordinator {
	docs: RwLock<FxHashMap<DocumentId, Arc<DocSlot>>>,
	classifier: Classifier,
	dispatcher: PresentationDispatcher,
	metrics: ReconcileMetrics,
}

impl std::fmt::Debug for Coordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Coordinator")
			.field("installed", &self.docs.read().len())
			.field("classifier", &self.classifier)
			.finish_non_exhaustive()
	}
}

impl Coordinator {
	pub fn new(classifier: Classifier, dispatcher: PresentationDispatcher) -> Self {
		Self {
			docs: RwLock::new(FxHashMap::default()),
			classifier,
			dispatcher,
			metrics: ReconcileMetrics::new(),
		}
	}

	/// Registers `doc` with empty published state.
	///
	/// Re-installing an id tears down the previous slot first; passes still
	/// running against it abort at their next checkpoint.
	pub fn install(&self, doc: DocumentId, surface: Arc<dyn RenderingSurface>, styles: Arc<dyn StyleResolver>) {
		let slot = Arc::new(DocSlot::new(doc, surface, styles));
		if let Some(previous) = self.docs.write().insert(doc, slot) {
			previous.tear_down();
			debug!(doc = %doc, "highlight.install.replaced");
		} else {
			debug!(doc = %doc, "highlight.install");
		}
	}

	/// Drops `doc`'s state and cancels any in-flight pass. Returns false if it
	/// was not installed.
	pub fn uninstall(&self, doc: DocumentId) -> bool {
		let Some(slot) = self.docs.write().remove(&doc) else {
			return false;
		};
		slot.tear_down();
		debug!(doc = %doc, "highlight.uninstall");
		true
	}

	pub fn is_installed(&self, doc: DocumentId) -> bool {
		self.docs.read().contains_key(&doc)
	}

	/// Current published annotations for `doc`, sorted by position.
	pub fn published(&self, doc: DocumentId) -> Option<Arc<Vec<StyledAnnotation>>> {
		self.slot(doc).map(|slot| slot.snapshot.load_full())
	}

	pub fn state(&self, doc: DocumentId) -> Option<PassState> {
		self.slot(doc).map(|slot| slot.state())
	}

	pub fn metrics(&self) -> &ReconcileMetrics {
		&self.metrics
	}

	/// Runs [`Self::reconcile`] on the blocking worker pool.
	pub fn submit(self: &Arc<Self>, request: ReconcileRequest) -> JoinHandle<ReconcileOutcome> {
		let this = Arc::clone(self);
		let span = tracing::Span::current();
		shade_worker::spawn_blocking(TaskClass::CpuBlocking, move || span.in_scope(|| this.reconcile(request)))
	}

	/// Runs one pass to completion on the calling thread.
	pub fn reconcile(&self, request: ReconcileRequest) -> ReconcileOutcome {
		let started = Instant::now();
		let outcome = self.run_pass(request);
		self.metrics.record(&outcome, started.elapsed());
		outcome
	}

	fn run_pass(&self, request: ReconcileRequest) -> ReconcileOutcome {
		let ReconcileRequest { doc, ast, token } = request;

		let Some(slot) = self.slot(doc) else {
			debug!(doc = %doc, "highlight.reconcile.not_installed");
			return ReconcileOutcome::NotInstalled;
		};
		let Some(mut published) = slot.published.try_enter() else {
			trace!(doc = %doc, "highlight.reconcile.dropped");
			return ReconcileOutcome::Dropped;
		};

		let span = tracing::debug_span!("highlight.reconcile", doc = %doc);
		let _enter = span.enter();
		token.worked(UNITS_BEGIN);

		let candidates = match std::panic::catch_unwind(AssertUnwindSafe(|| self.classify(&ast, slot.styles.as_ref()))) {
			Ok(candidates) => candidates,
			Err(payload) => return failed(doc, ReconcileError::ClassifierPanicked(shade_worker::panic_message(payload.as_ref()))),
		};
		token.worked(UNITS_CLASSIFY);
		if let Some(at) = slot.interrupted(&token, Checkpoint::Classified) {
			return cancelled(doc, at);
		}

		let previous = Arc::clone(&*published);
		token.worked(UNITS_SNAPSHOT);
		if let Some(at) = slot.interrupted(&token, Checkpoint::Snapshotted) {
			return cancelled(doc, at);
		}

		let (delta, next) = match std::panic::catch_unwind(AssertUnwindSafe(|| {
			let delta = diff(&previous, &candidates);
			let next = delta.apply(&previous);
			(delta, next)
		})) {
			Ok(result) => result,
			Err(payload) => return failed(doc, ReconcileError::DiffPanicked(shade_worker::panic_message(payload.as_ref()))),
		};
		token.worked(UNITS_DIFF);
		if let Some(at) = slot.interrupted(&token, Checkpoint::Diffed) {
			return cancelled(doc, at);
		}

		if !slot.target.is_live() {
			debug!(doc = %doc, "highlight.reconcile.target_gone");
			return ReconcileOutcome::TargetGone;
		}
		if let Some(at) = slot.interrupted(&token, Checkpoint::BeforeDispatch) {
			return cancelled(doc, at);
		}

		let next = Arc::new(next);
		*published = Arc::clone(&next);
		slot.snapshot.store(next);

		let (added, removed) = (delta.to_add.len(), delta.to_remove.len());
		let outcome = if delta.is_empty() {
			ReconcileOutcome::Unchanged
		} else {
			// Still under the gate: queue order matches publish order.
			self.dispatcher.dispatch(slot.target.clone(), delta);
			ReconcileOutcome::Published { added, removed }
		};
		token.worked(UNITS_PUBLISH);
		debug!(doc = %doc, added, removed, total = published.len(), "highlight.reconcile.published");
		outcome
	}

	fn classify(&self, ast: &Ast, styles: &dyn StyleResolver) -> Vec<StyledAnnotation> {
		let classification = self.classifier.classify(ast);
		if classification.skipped > 0 {
			debug!(skipped = classification.skipped, visited = classification.visited, "highlight.classify.partial");
		}
		classification
			.annotations
			.into_iter()
			.map(|annotation| annotation.styled(styles.resolve(annotation.kind())))
			.collect()
	}

	fn slot(&self, doc: DocumentId) -> Option<Arc<DocSlot>> {
		self.docs.read().get(&doc).cloned()
	}
}

fn cancelled(doc: DocumentId, at: Checkpoint) -> ReconcileOutcome {
	debug!(doc = %doc, checkpoint = at.as_str(), "highlight.reconcile.cancelled");
	ReconcileOutcome::Cancelled(at)
}

fn failed(doc: DocumentId, error: ReconcileError) -> ReconcileOutcome {
	warn!(doc = %doc, error = %error, "highlight.reconcile.failed");
	ReconcileOutcome::Failed(error)
}
