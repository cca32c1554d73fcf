//! Shared worker primitives for background reconciliation.
//!
//! * [`TaskClass`] tags spawned work for tracing.
//! * [`spawn_blocking`] routes CPU-bound passes onto the ambient tokio
//!   runtime's blocking pool, falling back to a small global runtime;
//!   [`spawn_named_thread`] starts long-lived threads.
//! * [`SingleFlight`] is a non-blocking single-slot gate that owns the state it
//!   protects.
//! * [`WorkToken`] carries cooperative cancellation plus progress units.

mod class;
mod gate;
mod panic;
mod spawn;
mod token;

pub use class::TaskClass;
pub use gate::{FlightGuard, SingleFlight};
pub use panic::{join_error_panic_message, panic_message};
pub use spawn::{spawn_blocking, spawn_named_thread};
pub use token::WorkToken;
