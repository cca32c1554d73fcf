use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::Style;

/// Semantic category assigned to a span of source text.
///
/// The set is closed: every classification produces exactly one of these, and
/// every kind resolves to some [`Style`] through the embedder's style table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemanticKind {
	/// Constant key of a map literal entry.
	MapKey,
	/// Named member inside an annotation/tag usage.
	TagKey,
	/// Numeric literal.
	Number,
	/// Regular expression literal.
	Regexp,
	/// Reference that could not be resolved.
	UndefinedRef,
	/// Reference to a deprecated declaration.
	DeprecatedRef,
	/// Local variable declaration or reference.
	LocalVar,
	/// Method or closure parameter.
	Parameter,
	/// Instance field.
	Field,
	/// Mutable static field.
	StaticField,
	/// Static final field (constant value).
	StaticValue,
	/// Method declaration name.
	MethodDecl,
	/// Static method declaration name.
	StaticMethodDecl,
	/// Constructor declaration name.
	CtorDecl,
	/// Instance method call.
	MethodCall,
	/// Constructor call.
	CtorCall,
	/// Call dispatched dynamically (runtime-provided or category methods).
	DynamicCall,
	/// Static method call.
	StaticCall,
}

impl SemanticKind {
	/// Every kind, in declaration order.
	pub const ALL: [SemanticKind; 18] = [
		Self::MapKey,
		Self::TagKey,
		Self::Number,
		Self::Regexp,
		Self::UndefinedRef,
		Self::DeprecatedRef,
		Self::LocalVar,
		Self::Parameter,
		Self::Field,
		Self::StaticField,
		Self::StaticValue,
		Self::MethodDecl,
		Self::StaticMethodDecl,
		Self::CtorDecl,
		Self::MethodCall,
		Self::CtorCall,
		Self::DynamicCall,
		Self::StaticCall,
	];

	/// Stable snake_case name used in configuration files and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::MapKey => "map_key",
			Self::TagKey => "tag_key",
			Self::Number => "number",
			Self::Regexp => "regexp",
			Self::UndefinedRef => "undefined_ref",
			Self::DeprecatedRef => "deprecated_ref",
			Self::LocalVar => "local_var",
			Self::Parameter => "parameter",
			Self::Field => "field",
			Self::StaticField => "static_field",
			Self::StaticValue => "static_value",
			Self::MethodDecl => "method_decl",
			Self::StaticMethodDecl => "static_method_decl",
			Self::CtorDecl => "ctor_decl",
			Self::MethodCall => "method_call",
			Self::CtorCall => "ctor_call",
			Self::DynamicCall => "dynamic_call",
			Self::StaticCall => "static_call",
		}
	}
}

impl fmt::Display for SemanticKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SemanticKind {
	type Err = AnnotationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == normalized)
			.ok_or_else(|| AnnotationError::UnknownKind(s.to_string()))
	}
}

/// Errors raised when constructing annotation values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
	/// Annotations must cover at least one byte.
	#[error("annotation at offset {offset} has zero length")]
	EmptySpan { offset: u32 },
	/// The kind name is not part of the closed set.
	#[error("unknown semantic kind: {0}")]
	UnknownKind(String),
}

/// A classified span of source text.
///
/// Offsets and lengths are byte-based. Values are immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Annotation {
	offset: u32,
	length: u32,
	kind: SemanticKind,
}

impl Annotation {
	/// Creates an annotation, rejecting zero-length spans.
	pub fn new(offset: u32, length: u32, kind: SemanticKind) -> Result<Self, AnnotationError> {
		if length == 0 {
			return Err(AnnotationError::EmptySpan { offset });
		}
		Ok(Self { offset, length, kind })
	}

	pub const fn offset(&self) -> u32 {
		self.offset
	}

	pub const fn length(&self) -> u32 {
		self.length
	}

	/// Exclusive end offset.
	pub const fn end(&self) -> u32 {
		self.offset.saturating_add(self.length)
	}

	pub const fn kind(&self) -> SemanticKind {
		self.kind
	}

	/// Position key `(offset, length)` shared by annotations covering the same text.
	pub const fn span(&self) -> (u32, u32) {
		(self.offset, self.length)
	}

	/// Pairs this annotation with the style it resolved to.
	pub const fn styled(self, style: Style) -> StyledAnnotation {
		StyledAnnotation { annotation: self, style }
	}
}

/// An annotation together with the style it was rendered with.
///
/// Published state and deltas carry the resolved style so that two passes can
/// be compared by what is displayed rather than by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyledAnnotation {
	annotation: Annotation,
	style: Style,
}

impl StyledAnnotation {
	pub const fn annotation(&self) -> &Annotation {
		&self.annotation
	}

	pub const fn style(&self) -> Style {
		self.style
	}

	pub const fn offset(&self) -> u32 {
		self.annotation.offset
	}

	pub const fn length(&self) -> u32 {
		self.annotation.length
	}

	pub const fn kind(&self) -> SemanticKind {
		self.annotation.kind
	}

	/// Key under which two annotations count as the same displayed highlight.
	pub const fn display_key(&self) -> (u32, u32, Style) {
		(self.annotation.offset, self.annotation.length, self.style)
	}
}
