use std::ops::{Deref, DerefMut};

use parking_lot::{Mutex, MutexGuard};

/// Single-slot gate that owns the state it protects.
///
/// Entry is non-blocking: if a flight is already in progress the caller gets
/// `None` and is expected to drop its work rather than queue it. The state is
/// only reachable through a [`FlightGuard`], so it needs no lock of its own.
#[derive(Debug, Default)]
pub struct SingleFlight<T> {
	slot: Mutex<T>,
}

impl<T> SingleFlight<T> {
	pub fn new(value: T) -> Self {
		Self { slot: Mutex::new(value) }
	}

	/// Enters the gate without waiting.
	pub fn try_enter(&self) -> Option<FlightGuard<'_, T>> {
		let guard = self.slot.try_lock()?;
		Some(FlightGuard { guard })
	}

	/// Returns true while a flight holds the gate.
	pub fn is_busy(&self) -> bool {
		self.slot.is_locked()
	}

	pub fn into_inner(self) -> T {
		self.slot.into_inner()
	}
}

/// Exclusive access to the gated state; leaving the flight releases the gate.
pub struct FlightGuard<'a, T> {
	guard: MutexGuard<'a, T>,
}

impl<T> Deref for FlightGuard<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.guard
	}
}

impl<T> DerefMut for FlightGuard<'_, T> {
	fn deref_mut(&mut self) -> &mut T {
		&mut self.guard
	}
}
