//! Analyzed syntax tree model.
//!
//! This is the contract between the external parser/type checker and the
//! semantic classifier. Nodes carry the facts resolution already established
//! (what a reference binds to, how a call dispatches, whether the target is
//! deprecated); the classifier only maps those facts to highlight kinds.
//!
//! Trees from error-recovering parses are expected: spans may be missing or
//! nonsensical and nodes may be flagged [`NodeFlags::RECOVERED`].

mod builder;
mod node;

pub use builder::{AstBuilder, BuildError};
pub use node::{Ast, CallTarget, LiteralKind, Node, NodeFlags, NodeKind, Resolution, Span, Walk};
