//! Positional delta between the published annotations and a new candidate set.
//!
//! Two annotations are the same displayed highlight iff they cover the same
//! `(offset, length)` and resolved to the same [`Style`]. Kind is deliberately
//! not part of the key: kinds that share a style are indistinguishable on
//! screen and must not cause churn.
//!
//! Matching is greedy and one-to-one. Each candidate takes the earliest
//! still-unmatched previous entry with the same key.

use rustc_hash::FxHashMap;
use shade_primitives::{Style, StyledAnnotation};
use smallvec::SmallVec;

/// Add/remove sets turning the previous highlights into the candidate ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
	/// Candidates with no displayed counterpart, in candidate order.
	pub to_add: Vec<StyledAnnotation>,
	/// Previous entries nothing matched, in published order.
	pub to_remove: Vec<StyledAnnotation>,
}

impl Delta {
	pub fn is_empty(&self) -> bool {
		self.to_add.is_empty() && self.to_remove.is_empty()
	}

	/// Removes `to_remove` from `previous`, adds `to_add`, and sorts by position.
	///
	/// Entries that were matched keep their previous value, mirroring what the
	/// rendering surface leaves untouched.
	pub fn apply(&self, previous: &[StyledAnnotation]) -> Vec<StyledAnnotation> {
		let mut pending: FxHashMap<StyledAnnotation, usize> = FxHashMap::default();
		for removed in &self.to_remove {
			*pending.entry(*removed).or_default() += 1;
		}

		let mut next = Vec::with_capacity(previous.len() + self.to_add.len());
		for entry in previous {
			match pending.get_mut(entry) {
				Some(count) if *count > 0 => *count -= 1,
				_ => next.push(*entry),
			}
		}
		next.extend_from_slice(&self.to_add);
		next.sort_by_key(|a| (a.offset(), a.length()));
		next
	}
}

/// Computes the delta from `previous` to `candidate`.
pub fn diff(previous: &[StyledAnnotation], candidate: &[StyledAnnotation]) -> Delta {
	// Indices are pushed in reverse so `pop()` yields the earliest entry.
	let mut unmatched: FxHashMap<(u32, u32, Style), SmallVec<[usize; 1]>> = FxHashMap::default();
	for (idx, entry) in previous.iter().enumerate().rev() {
		unmatched.entry(entry.display_key()).or_default().push(idx);
	}

	let mut matched = vec![false; previous.len()];
	let mut to_add = Vec::new();
	for entry in candidate {
		match unmatched.get_mut(&entry.display_key()).and_then(|indices| indices.pop()) {
			Some(idx) => matched[idx] = true,
			None => to_add.push(*entry),
		}
	}

	let to_remove = previous
		.iter()
		.zip(&matched)
		.filter(|(_, matched)| !**matched)
		.map(|(entry, _)| *entry)
		.collect();

	Delta { to_add, to_remove }
}
