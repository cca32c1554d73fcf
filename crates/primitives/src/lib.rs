//! Core types for semantic highlighting: documents, annotations, kinds, and styles.

/// Annotation spans and the closed set of semantic kinds.
pub mod annotation;
/// Identifier types for reconciled documents.
pub mod ids;
/// Renderable style tokens.
pub mod style;

pub use annotation::{Annotation, AnnotationError, SemanticKind, StyledAnnotation};
pub use ids::DocumentId;
pub use style::{Color, Modifier, Style};
