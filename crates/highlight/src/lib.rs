//! Incremental semantic-highlight reconciliation.
//!
//! One reconciliation pass turns a freshly analyzed tree into a minimal
//! add/remove delta against what the rendering surface currently shows:
//!
//! ```text
//! Ast ──► Classifier ──► styled candidates ──► diff(published, candidates) ──► Delta
//!                                                                               │
//!                          RenderQueue (render thread) ◄── PresentationDispatcher
//! ```
//!
//! * [`Coordinator`] owns per-document published state behind a single-flight
//!   gate, polls cooperative cancellation at fixed checkpoints, and publishes
//!   all-or-nothing.
//! * [`dispatch`] marshals deltas onto the one rendering thread and
//!   re-validates liveness right before they are applied.
//! * [`StyleTable`] and [`config`] supply the kind-to-style mapping that makes
//!   style, not kind, the match key between passes.

pub mod classify;
pub mod config;
pub mod coordinator;
pub mod diff;
pub mod dispatch;
mod error;
pub mod metrics;
pub mod style;

pub use classify::{Classification, Classifier, ClassifierPolicy, ClassifyRule};
pub use coordinator::{Checkpoint, Coordinator, PassState, ReconcileOutcome, ReconcileRequest};
pub use diff::{Delta, diff};
pub use dispatch::{DrainReport, PresentationDispatcher, RenderQueue, RenderTarget, RenderingSurface};
pub use error::ReconcileError;
pub use metrics::{MetricsSnapshot, ReconcileMetrics};
pub use style::{StyleResolver, StyleTable};

#[cfg(test)]
use tracing_subscriber as _;
