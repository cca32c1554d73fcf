use thiserror::Error;

use crate::{Ast, Node, NodeFlags, NodeKind, Span};

/// Errors raised while assembling a tree with [`AstBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
	#[error("close() called with no open node")]
	CloseWithoutOpen,
	#[error("{open} node(s) left open at finish")]
	Unbalanced { open: usize },
	#[error("span {start}..{end} ends before it starts")]
	InvertedSpan { start: u32, end: u32 },
}

/// Event-style tree builder, for adapters that walk a foreign AST with
/// enter/leave callbacks.
///
/// The root is always a [`NodeKind::Unit`].
#[derive(Debug)]
pub struct AstBuilder {
	stack: Vec<Node>,
	source_len: Option<u32>,
}

impl Default for AstBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl AstBuilder {
	pub fn new() -> Self {
		Self {
			stack: vec![Node::new(NodeKind::Unit)],
			source_len: None,
		}
	}

	pub fn source_len(mut self, len: u32) -> Self {
		self.source_len = Some(len);
		self.stack[0].span = Some(Span::new(0, len));
		self
	}

	/// Opens a node; subsequent nodes become its children until [`Self::close`].
	pub fn open(&mut self, kind: NodeKind, span: Option<Span>, flags: NodeFlags) -> Result<&mut Self, BuildError> {
		let node = Self::node(kind, span, flags)?;
		self.stack.push(node);
		Ok(self)
	}

	/// Adds a childless node to the currently open node.
	pub fn leaf(&mut self, kind: NodeKind, span: Option<Span>, flags: NodeFlags) -> Result<&mut Self, BuildError> {
		let node = Self::node(kind, span, flags)?;
		self.current().push(node);
		Ok(self)
	}

	pub fn close(&mut self) -> Result<&mut Self, BuildError> {
		if self.stack.len() <= 1 {
			return Err(BuildError::CloseWithoutOpen);
		}
		let Some(node) = self.stack.pop() else {
			return Err(BuildError::CloseWithoutOpen);
		};
		self.current().push(node);
		Ok(self)
	}

	pub fn finish(mut self) -> Result<Ast, BuildError> {
		if self.stack.len() != 1 {
			return Err(BuildError::Unbalanced {
				open: self.stack.len() - 1,
			});
		}
		let root = self.stack.pop().ok_or(BuildError::Unbalanced { open: 0 })?;
		Ok(Ast {
			root,
			source_len: self.source_len,
		})
	}

	fn node(kind: NodeKind, span: Option<Span>, flags: NodeFlags) -> Result<Node, BuildError> {
		if let Some(span) = span
			&& span.end < span.start
		{
			return Err(BuildError::InvertedSpan {
				start: span.start,
				end: span.end,
			});
		}
		Ok(Node {
			kind,
			span,
			flags,
			children: Vec::new(),
		})
	}

	fn current(&mut self) -> &mut Node {
		let last = self.stack.len() - 1;
		&mut self.stack[last]
	}
}
