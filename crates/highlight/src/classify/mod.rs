//! AST → candidate annotations.
//!
//! Every node is visited once per pass. For each node the rules of the active
//! [`ClassifierPolicy`] are tried in order and the first one that fires decides
//! the node's kind. When several nodes land on the same `(offset, length)` the
//! annotation from the higher-ranked rule wins, so the result does not depend
//! on traversal order.
//!
//! Nodes whose span cannot be trusted are skipped individually; a partial
//! tree still yields annotations for everything else.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use shade_ast::{Ast, CallTarget, LiteralKind, Node, NodeFlags, NodeKind, Resolution};
use shade_primitives::{Annotation, SemanticKind};


/// One classification predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifyRule {
	/// Any reference, call or declaration flagged deprecated.
	Deprecated,
	/// References and calls the analyzer could not bind.
	Unresolved,
	/// Numeric and regular-expression literals.
	Literal,
	MapKey,
	/// Annotation members.
	TagKey,
	/// Locals and parameters.
	Variable,
	/// Instance, static, and static-final fields.
	Field,
	MethodDecl,
	/// Calls by dispatch kind.
	Call,
}

impl ClassifyRule {
	/// Default precedence: most specific semantic fact first.
	pub const DEFAULT_ORDER: [ClassifyRule; 9] = [
		Self::Deprecated,
		Self::Unresolved,
		Self::Literal,
		Self::MapKey,
		Self::TagKey,
		Self::Variable,
		Self::Field,
		Self::MethodDecl,
		Self::Call,
	];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Deprecated => "deprecated",
			Self::Unresolved => "unresolved",
			Self::Literal => "literal",
			Self::MapKey => "map_key",
			Self::TagKey => "tag_key",
			Self::Variable => "variable",
			Self::Field => "field",
			Self::MethodDecl => "method_decl",
			Self::Call => "call",
		}
	}

	/// Returns the kind this rule assigns to `node`, if it applies.
	pub fn apply(self, node: &Node) -> Option<SemanticKind> {
		match (self, node.kind) {
			(Self::Deprecated, kind) if node.is_deprecated() && is_named(kind) => Some(SemanticKind::DeprecatedRef),
			(Self::Unresolved, NodeKind::VarRef(Resolution::Unresolved) | NodeKind::VarDecl(Resolution::Unresolved))
			| (Self::Unresolved, NodeKind::Call(CallTarget::Unresolved)) => Some(SemanticKind::UndefinedRef),
			(Self::Literal, NodeKind::Literal(LiteralKind::Number)) => Some(SemanticKind::Number),
			(Self::Literal, NodeKind::Literal(LiteralKind::Regex)) => Some(SemanticKind::Regexp),
			(Self::MapKey, NodeKind::MapKey) => Some(SemanticKind::MapKey),
			(Self::TagKey, NodeKind::AnnotationMember) => Some(SemanticKind::TagKey),
			(Self::Variable, NodeKind::VarDecl(res) | NodeKind::VarRef(res)) => match res {
				Resolution::Local => Some(SemanticKind::LocalVar),
				Resolution::Parameter => Some(SemanticKind::Parameter),
				_ => None,
			},
			(Self::Field, NodeKind::VarDecl(Resolution::Field { is_static, is_final }) | NodeKind::VarRef(Resolution::Field { is_static, is_final })) => {
				Some(match (is_static, is_final) {
					(true, true) => SemanticKind::StaticValue,
					(true, false) => SemanticKind::StaticField,
					(false, _) => SemanticKind::Field,
				})
			}
			(Self::MethodDecl, NodeKind::MethodDecl { ctor, is_static }) => Some(if ctor {
				SemanticKind::CtorDecl
			} else if is_static {
				SemanticKind::StaticMethodDecl
			} else {
				SemanticKind::MethodDecl
			}),
			(Self::Call, NodeKind::Call(target)) => match target {
				CallTarget::Instance => Some(SemanticKind::MethodCall),
				CallTarget::Static => Some(SemanticKind::StaticCall),
				CallTarget::Dynamic => Some(SemanticKind::DynamicCall),
				CallTarget::Ctor => Some(SemanticKind::CtorCall),
				CallTarget::Unresolved => None,
			},
			_ => None,
		}
	}
}

/// Nodes whose span is a name token rather than a whole construct.
fn is_named(kind: NodeKind) -> bool {
	matches!(
		kind,
		NodeKind::VarDecl(_) | NodeKind::VarRef(_) | NodeKind::MethodDecl { .. } | NodeKind::Call(_) | NodeKind::AnnotationMember
	)
}

impl fmt::Display for ClassifyRule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ClassifyRule {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
		Self::DEFAULT_ORDER
			.into_iter()
			.find(|rule| rule.as_str() == normalized)
			.ok_or_else(|| s.to_string())
	}
}

/// Ordered rule list deciding which kind wins when several could apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierPolicy {
	order: Vec<ClassifyRule>,
}

impl Default for ClassifierPolicy {
	fn default() -> Self {
		Self {
			order: ClassifyRule::DEFAULT_ORDER.to_vec(),
		}
	}
}

impl ClassifierPolicy {
	/// Builds a policy from a preferred order.
	///
	/// Repeated rules keep their first position. Rules not mentioned are
	/// appended in default order, so every rule is always evaluated.
	pub fn from_order(order: impl IntoIterator<Item = ClassifyRule>) -> Self {
		let mut rules: Vec<ClassifyRule> = Vec::with_capacity(ClassifyRule::DEFAULT_ORDER.len());
		for rule in order.into_iter().chain(ClassifyRule::DEFAULT_ORDER) {
			if !rules.contains(&rule) {
				rules.push(rule);
			}
		}
		Self { order: rules }
	}

	pub fn order(&self) -> &[ClassifyRule] {
		&self.order
	}

	/// First rule that fires for `node`, with its rank (0 = highest precedence).
	pub fn classify(&self, node: &Node) -> Option<(usize, SemanticKind)> {
		self.order
			.iter()
			.enumerate()
			.find_map(|(rank, rule)| rule.apply(node).map(|kind| (rank, kind)))
	}
}

/// Output of one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
	/// Candidate annotations sorted by `(offset, length)`, one per span.
	pub annotations: Vec<Annotation>,
	/// Classifiable nodes dropped because their span was missing or stale.
	pub skipped: usize,
	/// Nodes visited.
	pub visited: usize,
}

/// Stateless classifier driven by a [`ClassifierPolicy`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
	policy: ClassifierPolicy,
}

impl Classifier {
	pub fn new(policy: ClassifierPolicy) -> Self {
		Self { policy }
	}

	pub fn policy(&self) -> &ClassifierPolicy {
		&self.policy
	}

	pub fn classify(&self, ast: &Ast) -> Classification {
		let mut best: FxHashMap<(u32, u32), (usize, SemanticKind)> = FxHashMap::default();
		let mut skipped = 0usize;
		let mut visited = 0usize;

		for node in ast.root.walk() {
			visited += 1;
			let Some((rank, kind)) = self.policy.classify(node) else {
				continue;
			};
			let Some(span) = node.span.filter(|span| !span.is_empty() && ast.contains(*span)) else {
				tracing::trace!(kind = %kind, span = ?node.span, "highlight.classify.skip");
				skipped += 1;
				continue;
			};
			if node.flags.contains(NodeFlags::SYNTHETIC) {
				skipped += 1;
				continue;
			}

			best.entry((span.start, span.len()))
				.and_modify(|current| {
					if (rank, kind) < *current {
						*current = (rank, kind);
					}
				})
				.or_insert((rank, kind));
		}

		let mut annotations: Vec<Annotation> = best
			.into_iter()
			.filter_map(|((offset, length), (_, kind))| Annotation::new(offset, length, kind).ok())
			.collect();
		annotations.sort_unstable_by_key(|a| a.span());

		Classification {
			annotations,
			skipped,
			visited,
		}
	}
}
