use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use super::freq_table::Successor;

/// A single observed transition.
///
/// `count` is how many times the successor was seen; `frequency` is the
/// share of the owning state's total it represents, in `[0, 1]`.
/// Frequencies go stale while observations accumulate and are refreshed by
/// `TokenState::recalc_frequencies`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Transition {
	/// Number of observations of this successor. Never decremented.
	pub count: u64,
	/// `count / total` of the owning state after the last recompute.
	pub frequency: f64,
}

/// Represents one token's outgoing transitions in the frequency table.
///
/// A `TokenState` corresponds to a single token (`key`) and stores all
/// observed successors, including the absorption marker when the token
/// ended a sequence.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate successor observations during ingestion
/// - Recompute successor frequencies from counts on demand
/// - Merge with another state having the same key (ex. parallel ingestion support)
///
/// ## Invariants
/// - All transitions belong to the same `key`
/// - `total` equals the sum of all successor counts
/// - After a recompute, frequencies of a non-empty state sum to 1.0 within
///   rounding error
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TokenState {
	/// Identifier of the state (the token itself).
	key: String,
	/// Outgoing transitions indexed by the observed successor.
	/// Example: { "world" => {count: 42, frequency: 0.93}, End => {count: 3, frequency: 0.07} }
	successors: HashMap<Successor, Transition>,
	/// Total number of observations across all successors.
	total: u64,
}

impl TokenState {
	/// Creates a new empty state for the given token.
	pub fn new(key: &str) -> Self {
		Self {
			key: key.to_owned(),
			successors: HashMap::new(),
			total: 0,
		}
	}

	/// Rebuilds a state from persisted successor records.
	///
	/// The total is derived by summing the persisted counts; frequencies are
	/// left exactly as given (callers decide whether to re-derive them).
	pub(crate) fn from_successors(key: String, successors: HashMap<Successor, Transition>) -> Self {
		let total = successors.values().map(|transition| transition.count).sum();
		Self { key, successors, total }
	}

	/// Total number of observations recorded for this token.
	pub fn total(&self) -> u64 {
		self.total
	}

	/// Read access to the raw successor records.
	pub(crate) fn successors(&self) -> &HashMap<Successor, Transition> {
		&self.successors
	}

	/// Records one observation of a transition toward `next`.
	///
	/// - If the transition already exists, its count is increased.
	/// - Otherwise, a new transition is created with an initial count of 1.
	///
	/// Frequencies are NOT refreshed here; `recalc_frequencies` must run
	/// once the whole sequence has been ingested.
	pub fn observe(&mut self, next: Successor) {
		let transition = self
			.successors
			.entry(next)
			.or_insert(Transition { count: 0, frequency: 0.0 });
		transition.count += 1;
		self.total += 1;
	}

	/// Recomputes `frequency = count / total` for every successor.
	///
	/// Does nothing on a state without observations.
	pub fn recalc_frequencies(&mut self) {
		if self.total == 0 {
			return;
		}
		let total = self.total as f64;
		for transition in self.successors.values_mut() {
			transition.frequency = transition.count as f64 / total;
		}
	}

	/// Returns the `(successor, frequency)` pairs of this state.
	pub fn retrieve(&self) -> Vec<(Successor, f64)> {
		self.successors
			.iter()
			.map(|(successor, transition)| (successor.clone(), transition.frequency))
			.collect()
	}

	/// True when the state offers no way to continue a walk: it has no
	/// successors, or only the absorption marker.
	pub fn is_absorbing(&self) -> bool {
		self.successors.keys().all(Successor::is_end)
	}

	/// Merges another state into this one.
	///
	/// Both states must represent the same token (`key`).
	/// Successor counts and the total are summed; frequencies go stale and
	/// the caller is expected to recompute them.
	///
	/// # Errors
	/// Returns an error if the state keys do not match.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.key != other.key {
			return Err(MarkovError::Internal(format!(
				"state key mismatch: {:?} vs {:?}",
				self.key, other.key
			)));
		}

		for (successor, transition) in &other.successors {
			let entry = self
				.successors
				.entry(successor.clone())
				.or_insert(Transition { count: 0, frequency: 0.0 });
			entry.count += transition.count;
		}
		self.total += other.total;

		Ok(())
	}
}
