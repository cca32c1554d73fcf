use bitflags::bitflags;

/// Half-open byte range `[start, end)` into the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
	pub start: u32,
	pub end: u32,
}

impl Span {
	pub const fn new(start: u32, end: u32) -> Self {
		Self { start, end }
	}

	/// Span of `len` bytes starting at `start`.
	pub const fn at(start: u32, len: u32) -> Self {
		Self {
			start,
			end: start.saturating_add(len),
		}
	}

	pub const fn len(&self) -> u32 {
		self.end.saturating_sub(self.start)
	}

	/// True for empty and inverted spans.
	pub const fn is_empty(&self) -> bool {
		self.end <= self.start
	}
}

bitflags! {
	/// Facts attached to a node by the analyzer.
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct NodeFlags: u8 {
		/// The referenced declaration is marked deprecated.
		const DEPRECATED = 0b001;
		/// Compiler-generated node with no source text of its own.
		const SYNTHETIC  = 0b010;
		/// Produced by parser error recovery; span may be unreliable.
		const RECOVERED  = 0b100;
	}
}

/// Literal flavors the analyzer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
	Number,
	Regex,
	String,
	Boolean,
	Null,
}

/// What a variable declaration or reference binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
	Local,
	Parameter,
	Field { is_static: bool, is_final: bool },
	/// The analyzer could not find a binding.
	Unresolved,
}

/// How a call site dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTarget {
	Instance,
	Static,
	/// Runtime-provided or category method resolved only dynamically.
	Dynamic,
	Ctor,
	Unresolved,
}

/// Node categories relevant to semantic highlighting.
///
/// For named nodes (declarations, references, calls, keys) the node span is
/// the span of the name token, which is what gets highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	/// Compilation unit root.
	Unit,
	Class,
	Block,
	/// Anything without highlighting semantics of its own.
	Other,
	Literal(LiteralKind),
	/// Constant key of a map literal entry.
	MapKey,
	/// Named member of an annotation usage, e.g. `value` in `@Tag(value = 1)`.
	AnnotationMember,
	VarDecl(Resolution),
	VarRef(Resolution),
	MethodDecl { ctor: bool, is_static: bool },
	Call(CallTarget),
}

/// One analyzed syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
	pub kind: NodeKind,
	/// `None` when error recovery could not attribute source text.
	pub span: Option<Span>,
	pub flags: NodeFlags,
	pub children: Vec<Node>,
}

impl Node {
	pub fn new(kind: NodeKind) -> Self {
		Self {
			kind,
			span: None,
			flags: NodeFlags::empty(),
			children: Vec::new(),
		}
	}

	/// Leaf node covering `span`.
	pub fn leaf(kind: NodeKind, span: Span) -> Self {
		Self::new(kind).with_span(span)
	}

	pub fn with_span(mut self, span: Span) -> Self {
		self.span = Some(span);
		self
	}

	pub fn with_flags(mut self, flags: NodeFlags) -> Self {
		self.flags |= flags;
		self
	}

	pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
		self.children.extend(children);
		self
	}

	pub fn push(&mut self, child: Node) {
		self.children.push(child);
	}

	pub fn is_deprecated(&self) -> bool {
		self.flags.contains(NodeFlags::DEPRECATED)
	}

	/// Pre-order traversal over this node and all descendants.
	pub fn walk(&self) -> Walk<'_> {
		Walk { stack: vec![self] }
	}

	/// Total number of nodes in this subtree.
	pub fn node_count(&self) -> usize {
		self.walk().count()
	}
}

/// Iterative pre-order walk; deep trees do not grow the call stack.
pub struct Walk<'a> {
	stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
	type Item = &'a Node;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.stack.pop()?;
		self.stack.extend(node.children.iter().rev());
		Some(node)
	}
}

// Unlinks descendants onto a heap stack; the derived glue recurses per level.
impl Drop for Node {
	fn drop(&mut self) {
		let mut stack = std::mem::take(&mut self.children);
		while let Some(mut node) = stack.pop() {
			stack.append(&mut node.children);
		}
	}
}

/// A re-analyzed document: root node plus the text length it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ast {
	pub root: Node,
	/// Byte length of the analyzed text, when known. Spans beyond it are stale.
	pub source_len: Option<u32>,
}

impl Ast {
	pub fn new(root: Node) -> Self {
		Self { root, source_len: None }
	}

	pub fn with_source_len(mut self, len: u32) -> Self {
		self.source_len = Some(len);
		self
	}

	/// Returns true when `span` lies inside the analyzed text.
	pub fn contains(&self, span: Span) -> bool {
		self.source_len.is_none_or(|len| span.end <= len)
	}
}
