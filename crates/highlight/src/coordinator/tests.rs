use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use shade_ast::{CallTarget, LiteralKind, Node, NodeKind, Resolution, Span};
use shade_primitives::{Annotation, SemanticKind, Style};

use super::*;
use crate::dispatch::{self, RenderQueue};
use crate::{DrainReport, StyleTable};

const DOC: DocumentId = DocumentId(7);

#[derive(Default)]
struct Recorder {
	calls: Mutex<Vec<(Vec<StyledAnnotation>, Vec<StyledAnnotation>)>>,
	disposed: AtomicBool,
}

impl RenderingSurface for Recorder {
	fn apply_delta(&self, _doc: DocumentId, to_add: &[StyledAnnotation], to_remove: &[StyledAnnotation]) {
		self.calls.lock().push((to_add.to_vec(), to_remove.to_vec()));
	}

	fn is_live(&self, _doc: DocumentId) -> bool {
		!self.disposed.load(Ordering::SeqCst)
	}
}

/// Resolver that parks the first resolution after [`Stalling::arm`] until the
/// test releases it.
struct Stalling {
	table: StyleTable,
	armed: AtomicBool,
	entered: Barrier,
	release: Barrier,
}

impl Stalling {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			table: StyleTable::default(),
			armed: AtomicBool::new(false),
			entered: Barrier::new(2),
			release: Barrier::new(2),
		})
	}

	fn arm(&self) {
		self.armed.store(true, Ordering::SeqCst);
	}
}

impl StyleResolver for Stalling {
	fn resolve(&self, kind: SemanticKind) -> Style {
		if self.armed.swap(false, Ordering::SeqCst) {
			self.entered.wait();
			self.release.wait();
		}
		self.table.resolve(kind)
	}
}

fn setup() -> (Arc<Coordinator>, RenderQueue, Arc<Recorder>) {
	let (dispatcher, queue) = dispatch::channel();
	let coordinator = Arc::new(Coordinator::new(Classifier::default(), dispatcher));
	let recorder = Arc::new(Recorder::default());
	coordinator.install(DOC, recorder.clone(), Arc::new(StyleTable::default()));
	(coordinator, queue, recorder)
}

fn unit(children: impl IntoIterator<Item = Node>) -> Arc<Ast> {
	Arc::new(Ast::new(Node::new(NodeKind::Unit).with_children(children)))
}

fn first_ast() -> Arc<Ast> {
	unit([
		Node::leaf(NodeKind::VarDecl(Resolution::Local), Span::at(0, 5)),
		Node::leaf(NodeKind::Literal(LiteralKind::Number), Span::at(10, 3)),
	])
}

fn second_ast() -> Arc<Ast> {
	unit([
		Node::leaf(NodeKind::VarRef(Resolution::Local), Span::at(0, 5)),
		Node::leaf(NodeKind::Call(CallTarget::Instance), Span::at(20, 4)),
	])
}

fn styled(offset: u32, length: u32, kind: SemanticKind) -> StyledAnnotation {
	Annotation::new(offset, length, kind).unwrap().styled(StyleTable::default().resolve(kind))
}

fn request(ast: Arc<Ast>) -> ReconcileRequest {
	ReconcileRequest::new(DOC, ast)
}

#[test]
fn first_pass_publishes_everything() {
	let (coordinator, mut queue, recorder) = setup();

	let outcome = coordinator.reconcile(request(first_ast()));

	assert_eq!(outcome, ReconcileOutcome::Published { added: 2, removed: 0 });
	let expected = vec![styled(0, 5, SemanticKind::LocalVar), styled(10, 3, SemanticKind::Number)];
	assert_eq!(*coordinator.published(DOC).unwrap(), expected);
	assert!(recorder.calls.lock().is_empty(), "delta is applied on the render thread");

	assert_eq!(queue.drain(), DrainReport { applied: 1, discarded: 0 });
	assert_eq!(*recorder.calls.lock(), vec![(expected, Vec::new())]);
}

#[test]
fn second_pass_sends_only_the_difference() {
	let (coordinator, mut queue, recorder) = setup();
	coordinator.reconcile(request(first_ast()));

	let outcome = coordinator.reconcile(request(second_ast()));

	assert_eq!(outcome, ReconcileOutcome::Published { added: 1, removed: 1 });
	queue.drain();
	let calls = recorder.calls.lock();
	assert_eq!(calls.len(), 2);
	assert_eq!(calls[1], (vec![styled(20, 4, SemanticKind::MethodCall)], vec![styled(10, 3, SemanticKind::Number)]));
	assert_eq!(
		*coordinator.published(DOC).unwrap(),
		vec![styled(0, 5, SemanticKind::LocalVar), styled(20, 4, SemanticKind::MethodCall)]
	);
}

#[test]
fn reconciling_twice_is_idempotent() {
	let (coordinator, mut queue, recorder) = setup();
	coordinator.reconcile(request(first_ast()));
	let before = coordinator.published(DOC).unwrap();

	assert_eq!(coordinator.reconcile(request(first_ast())), ReconcileOutcome::Unchanged);

	assert_eq!(queue.drain().applied, 1);
	assert_eq!(recorder.calls.lock().len(), 1);
	assert_eq!(coordinator.published(DOC).unwrap(), before);
}

#[test]
fn kind_change_with_same_style_causes_no_churn() {
	let (coordinator, mut queue, _recorder) = setup();
	let method = unit([Node::leaf(NodeKind::MethodDecl { ctor: false, is_static: false }, Span::at(4, 6))]);
	let ctor = unit([Node::leaf(NodeKind::MethodDecl { ctor: true, is_static: false }, Span::at(4, 6))]);
	coordinator.reconcile(request(method));
	queue.drain();

	assert_eq!(coordinator.reconcile(request(ctor)), ReconcileOutcome::Unchanged);
	assert_eq!(queue.drain().applied, 0);
	assert_eq!(coordinator.published(DOC).unwrap()[0].kind(), SemanticKind::MethodDecl);
}

#[test]
fn overlapping_request_is_dropped() {
	let (dispatcher, mut queue) = dispatch::channel();
	let coordinator = Arc::new(Coordinator::new(Classifier::default(), dispatcher));
	let stall = Stalling::new();
	coordinator.install(DOC, Arc::new(Recorder::default()), stall.clone());
	stall.arm();

	let runner = {
		let coordinator = Arc::clone(&coordinator);
		std::thread::spawn(move || coordinator.reconcile(request(first_ast())))
	};
	stall.entered.wait();

	assert_eq!(coordinator.state(DOC), Some(PassState::Running));
	assert_eq!(coordinator.reconcile(request(second_ast())), ReconcileOutcome::Dropped);

	stall.release.wait();
	assert_eq!(runner.join().unwrap(), ReconcileOutcome::Published { added: 2, removed: 0 });
	assert_eq!(coordinator.state(DOC), Some(PassState::Idle));
	assert_eq!(queue.drain().applied, 1);

	let metrics = coordinator.metrics().snapshot();
	assert_eq!((metrics.published, metrics.dropped), (1, 1));
}

#[test]
fn cancellation_mid_pass_leaves_state_untouched() {
	let (dispatcher, mut queue) = dispatch::channel();
	let coordinator = Arc::new(Coordinator::new(Classifier::default(), dispatcher));
	let stall = Stalling::new();
	let recorder = Arc::new(Recorder::default());
	coordinator.install(DOC, recorder.clone(), stall.clone());
	coordinator.reconcile(request(first_ast()));
	queue.drain();
	let before = coordinator.published(DOC).unwrap();

	stall.arm();
	let token = WorkToken::new();
	let runner = {
		let coordinator = Arc::clone(&coordinator);
		let token = token.clone();
		std::thread::spawn(move || coordinator.reconcile(request(second_ast()).with_token(token)))
	};
	stall.entered.wait();
	token.cancel();
	stall.release.wait();

	assert_eq!(runner.join().unwrap(), ReconcileOutcome::Cancelled(Checkpoint::Classified));
	assert_eq!(coordinator.published(DOC).unwrap(), before);
	assert_eq!(queue.drain(), DrainReport::default());
	assert_eq!(recorder.calls.lock().len(), 1);
	assert_eq!(coordinator.state(DOC), Some(PassState::Idle));
}

#[test]
fn pre_cancelled_request_stops_at_first_checkpoint() {
	let (coordinator, mut queue, _recorder) = setup();
	let token = WorkToken::new();
	token.cancel();

	let outcome = coordinator.reconcile(request(first_ast()).with_token(token.clone()));

	assert_eq!(outcome, ReconcileOutcome::Cancelled(Checkpoint::Classified));
	assert_eq!(token.work_done(), UNITS_BEGIN + UNITS_CLASSIFY);
	assert!(coordinator.published(DOC).unwrap().is_empty());
	assert_eq!(queue.drain().applied, 0);
}

#[test]
fn full_pass_reports_all_work_units() {
	let (coordinator, _queue, _recorder) = setup();
	let token = WorkToken::new();

	coordinator.reconcile(request(first_ast()).with_token(token.clone()));

	assert_eq!(token.work_done(), 10);
}

#[test]
fn uninstall_mid_pass_prevents_apply() {
	let (dispatcher, mut queue) = dispatch::channel();
	let coordinator = Arc::new(Coordinator::new(Classifier::default(), dispatcher));
	let stall = Stalling::new();
	let recorder = Arc::new(Recorder::default());
	coordinator.install(DOC, recorder.clone(), stall.clone());
	coordinator.reconcile(request(first_ast()));
	queue.drain();

	stall.arm();
	let runner = {
		let coordinator = Arc::clone(&coordinator);
		std::thread::spawn(move || coordinator.reconcile(request(second_ast())))
	};
	stall.entered.wait();
	assert!(coordinator.uninstall(DOC));
	stall.release.wait();

	assert_eq!(runner.join().unwrap(), ReconcileOutcome::Cancelled(Checkpoint::Classified));
	assert_eq!(queue.drain(), DrainReport::default());
	assert_eq!(recorder.calls.lock().len(), 1);
	assert_eq!(coordinator.reconcile(request(second_ast())), ReconcileOutcome::NotInstalled);
	assert!(!coordinator.uninstall(DOC));
}

#[test]
fn uninstall_before_render_discards_queued_delta() {
	let (coordinator, mut queue, recorder) = setup();
	coordinator.reconcile(request(first_ast()));

	coordinator.uninstall(DOC);

	assert_eq!(queue.drain(), DrainReport { applied: 0, discarded: 1 });
	assert!(recorder.calls.lock().is_empty());
	assert_eq!(coordinator.published(DOC), None);
}

#[test]
fn disposed_view_skips_publish() {
	let (coordinator, mut queue, recorder) = setup();
	recorder.disposed.store(true, Ordering::SeqCst);

	assert_eq!(coordinator.reconcile(request(first_ast())), ReconcileOutcome::TargetGone);
	assert!(coordinator.published(DOC).unwrap().is_empty());
	assert_eq!(queue.drain(), DrainReport::default());
}

#[test]
fn reinstall_starts_from_empty_state() {
	let (coordinator, mut queue, recorder) = setup();
	coordinator.reconcile(request(first_ast()));

	coordinator.install(DOC, recorder.clone(), Arc::new(StyleTable::default()));

	assert!(coordinator.published(DOC).unwrap().is_empty());
	assert_eq!(queue.drain().discarded, 1, "delta for the replaced slot is stale");
	assert_eq!(coordinator.reconcile(request(first_ast())), ReconcileOutcome::Published { added: 2, removed: 0 });
	assert_eq!(queue.drain().applied, 1);
}

#[test]
fn resolver_panic_fails_the_pass_and_releases_the_gate() {
	let (dispatcher, mut queue) = dispatch::channel();
	let coordinator = Coordinator::new(Classifier::default(), dispatcher);
	let resolver = |_: SemanticKind| -> Style { panic!("no styles") };
	coordinator.install(DOC, Arc::new(Recorder::default()), Arc::new(resolver));

	let outcome = coordinator.reconcile(request(first_ast()));

	assert_eq!(outcome, ReconcileOutcome::Failed(ReconcileError::ClassifierPanicked("no styles".into())));
	assert_eq!(coordinator.state(DOC), Some(PassState::Idle));
	assert!(coordinator.published(DOC).unwrap().is_empty());
	assert_eq!(queue.drain(), DrainReport::default());
	assert_eq!(coordinator.metrics().snapshot().failed, 1);
}

#[test]
fn unknown_document_is_not_installed() {
	let (coordinator, _queue, _recorder) = setup();
	let other = DocumentId(DOC.0 + 1);

	assert_eq!(coordinator.reconcile(ReconcileRequest::new(other, first_ast())), ReconcileOutcome::NotInstalled);
	assert_eq!(coordinator.state(other), None);
	assert!(!coordinator.is_installed(other));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submit_runs_on_the_worker_pool() {
	let (coordinator, mut queue, recorder) = setup();

	let outcome = coordinator.submit(request(first_ast())).await.unwrap();

	assert_eq!(outcome, ReconcileOutcome::Published { added: 2, removed: 0 });
	assert_eq!(queue.drain().applied, 1);
	assert_eq!(recorder.calls.lock().len(), 1);
}

/// Surface whose liveness query cancels the pass that asked it.
struct CancelOnQuery {
	token: WorkToken,
}

impl RenderingSurface for CancelOnQuery {
	fn apply_delta(&self, _doc: DocumentId, _to_add: &[StyledAnnotation], _to_remove: &[StyledAnnotation]) {
		panic!("cancelled pass must not reach the surface");
	}

	fn is_live(&self, _doc: DocumentId) -> bool {
		self.token.cancel();
		true
	}
}

#[test]
fn cancellation_after_liveness_check_stops_before_dispatch() {
	let (dispatcher, mut queue) = dispatch::channel();
	let coordinator = Coordinator::new(Classifier::default(), dispatcher);
	let token = WorkToken::new();
	coordinator.install(DOC, Arc::new(CancelOnQuery { token: token.clone() }), Arc::new(StyleTable::default()));

	let outcome = coordinator.reconcile(request(first_ast()).with_token(token.clone()));

	assert_eq!(outcome, ReconcileOutcome::Cancelled(Checkpoint::BeforeDispatch));
	assert_eq!(token.work_done(), UNITS_BEGIN + UNITS_CLASSIFY + UNITS_SNAPSHOT + UNITS_DIFF);
	assert!(coordinator.published(DOC).unwrap().is_empty());
	assert_eq!(coordinator.state(DOC), Some(PassState::Idle));
	assert_eq!(queue.drain(), DrainReport::default());
}

#[test]
fn deep_tree_reconciles_and_drops() {
	let (coordinator, mut queue, recorder) = setup();
	let mut node = Node::leaf(NodeKind::VarRef(Resolution::Local), Span::at(0, 1));
	for depth in 1..50_000u32 {
		node = Node::new(NodeKind::Block).with_children([node, Node::leaf(NodeKind::Literal(LiteralKind::Number), Span::at(depth * 2, 1))]);
	}

	let outcome = coordinator.reconcile(request(unit([node])));

	assert_eq!(outcome, ReconcileOutcome::Published { added: 50_000, removed: 0 });
	assert_eq!(coordinator.published(DOC).unwrap().len(), 50_000);
	assert_eq!(queue.drain().applied, 1);
	assert_eq!(recorder.calls.lock()[0].0.len(), 50_000);
}
