use std::collections::{HashMap, HashSet};
use std::fmt;

use log::debug;
use rand::Rng;
use rand::prelude::IteratorRandom;
use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use super::state::TokenState;
use super::traverse_input::TraverseInput;
use super::walker::ChainWalker;

/// A successor observed after a token.
///
/// Either a real token, or the reserved absorption marker meaning the
/// observed sequence ended there. The marker is distinct from every real
/// token and may appear anywhere a successor is expected.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Successor {
	/// A real follow-up token.
	Token(String),
	/// End of sequence (absorption marker).
	End,
}

impl Successor {
	/// True for the absorption marker.
	pub fn is_end(&self) -> bool {
		matches!(self, Successor::End)
	}

	/// The real token, if any.
	pub fn as_token(&self) -> Option<&str> {
		match self {
			Successor::Token(token) => Some(token),
			Successor::End => None,
		}
	}
}

/// First-order Markov frequency table.
///
/// The `FrequencyTable` stores one state per observed token and allows
/// stochastic regeneration of sequences from the observed transition
/// frequencies.
///
/// # Responsibilities
/// - Ingest ordered token sequences and accumulate successor counts
/// - Keep per-token frequencies consistent, recomputing only touched keys
/// - Expose successor distributions to the sampler and the chain walker
/// - Merge with another independently built table
///
/// # Invariants
/// - Every stored count is >= 1 and never decreases
/// - Each state's total equals the sum of its successor counts
/// - After any mutation, frequencies of a mutated key sum to 1.0 within
///   rounding error; untouched keys are never rescanned
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FrequencyTable {
	/// Mapping from a token to its successor distribution.
	states: HashMap<String, TokenState>,
}

impl FrequencyTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self { states: HashMap::new() }
	}

	/// True when no token has been observed yet.
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Number of distinct tokens with an outgoing distribution.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	/// True when `token` has an outgoing distribution.
	pub fn contains(&self, token: &str) -> bool {
		self.states.contains_key(token)
	}

	/// Iterates over the observed tokens, in no particular order.
	pub fn tokens(&self) -> impl Iterator<Item = &str> {
		self.states.keys().map(String::as_str)
	}

	/// Adds an ordered token sequence to the table.
	///
	/// Each token is paired with the one following it; the final token is
	/// paired with the absorption marker. Afterwards, frequencies are
	/// recomputed for exactly the keys touched by this call — untouched
	/// keys keep their stored frequencies bit-for-bit.
	///
	/// # Notes
	/// - An empty sequence is a no-op and performs no table write.
	/// - A single-token sequence records only `token → absorption`.
	pub fn add<I, S>(&mut self, sequence: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let tokens: Vec<String> = sequence.into_iter().map(Into::into).collect();
		if tokens.is_empty() {
			return;
		}

		let mut touched = HashSet::new();
		for (i, orig) in tokens.iter().enumerate() {
			let next = match tokens.get(i + 1) {
				Some(token) => Successor::Token(token.clone()),
				None => Successor::End,
			};

			// Get or create the state for this token
			let state = self
				.states
				.entry(orig.clone())
				.or_insert_with(|| TokenState::new(orig));
			state.observe(next);
			touched.insert(orig.clone());
		}

		// Incremental recompute: only the keys that received new
		// observations in this call.
		for key in &touched {
			if let Some(state) = self.states.get_mut(key) {
				state.recalc_frequencies();
			}
		}
	}

	/// Returns the list of `(successor, frequency)` pairs for a token.
	///
	/// An unknown token yields an empty list; callers treat that as "no
	/// outgoing transitions". This accessor never fails.
	pub fn retrieve(&self, token: &str) -> Vec<(Successor, f64)> {
		self.states
			.get(token)
			.map(TokenState::retrieve)
			.unwrap_or_default()
	}

	/// Observation count for a `(token, successor)` pair, 0 when absent.
	pub fn count(&self, token: &str, successor: &Successor) -> u64 {
		self.states
			.get(token)
			.and_then(|state| state.successors().get(successor))
			.map_or(0, |transition| transition.count)
	}

	/// Total number of observations recorded for a token, 0 when absent.
	pub fn total(&self, token: &str) -> u64 {
		self.states.get(token).map_or(0, TokenState::total)
	}

	/// True when a token cannot continue a walk: it is unknown, has no
	/// successors, or only ever led to the absorption marker.
	pub fn is_absorbing(&self, token: &str) -> bool {
		self.states.get(token).map_or(true, TokenState::is_absorbing)
	}

	/// Clears the table and its totals.
	pub fn reset(&mut self) {
		self.states.clear();
	}

	/// Picks a uniformly random root token from the table.
	///
	/// Useful for starting a generation run.
	///
	/// # Errors
	/// Fails with `EmptyModel` if no token has been observed.
	pub fn random_root<R: Rng>(&self, rng: &mut R) -> Result<&str> {
		self.states
			.keys()
			.choose(rng)
			.map(String::as_str)
			.ok_or(MarkovError::EmptyModel)
	}

	/// Merges another table into this one.
	///
	/// Tokens absent from this table are copied verbatim together with
	/// their totals (already internally consistent, no recompute needed).
	/// Tokens present in both have their successor counts and totals
	/// summed, and their frequencies recomputed afterwards — only for that
	/// changed-key set, never a full-table rescan.
	///
	/// Merging is commutative and associative with respect to the final
	/// counts.
	pub fn consume(&mut self, other: &FrequencyTable) -> Result<()> {
		let mut changed = Vec::new();
		for (key, state) in &other.states {
			if let Some(existing) = self.states.get_mut(key) {
				existing.merge(state)?;
				changed.push(key.clone());
			} else {
				self.states.insert(key.clone(), state.clone());
			}
		}

		for key in &changed {
			if let Some(state) = self.states.get_mut(key) {
				state.recalc_frequencies();
			}
		}

		debug!("consumed {} keys ({} merged in place)", other.len(), changed.len());
		Ok(())
	}

	/// Generates a token sequence using the process-wide RNG.
	///
	/// See [`ChainWalker`] for the walk semantics.
	pub fn traverse(&self, input: &TraverseInput) -> Result<Vec<String>> {
		self.traverse_with(input, &mut rand::rng())
	}

	/// Generates a token sequence with an explicit random source.
	///
	/// Passing a seeded generator makes the run reproducible.
	///
	/// # Errors
	/// - `EmptyModel` when the table has no tokens.
	/// - `NoRoot` when `input.root` is set but unknown to the table.
	pub fn traverse_with<R: Rng>(&self, input: &TraverseInput, rng: &mut R) -> Result<Vec<String>> {
		let walker = ChainWalker::new(self, input, rng)?;
		Ok(walker.collect())
	}

	/// Read access to the raw states, for the codec.
	pub(crate) fn states(&self) -> &HashMap<String, TokenState> {
		&self.states
	}

	/// Rebuilds a table from already-validated states, for the codec.
	pub(crate) fn from_states(states: HashMap<String, TokenState>) -> Self {
		Self { states }
	}
}

/// Renders the whole table, one token per line, sorted for stable output.
///
/// The absorption marker is shown as `<end>`. Each successor is printed as
/// `successor: count (frequency)`.
impl fmt::Display for FrequencyTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut keys: Vec<&String> = self.states.keys().collect();
		keys.sort();

		for key in keys {
			let Some(state) = self.states.get(key) else { continue };
			let mut entries: Vec<String> = state
				.successors()
				.iter()
				.map(|(successor, transition)| {
					let shown = match successor {
						Successor::Token(token) => token.as_str(),
						Successor::End => "<end>",
					};
					format!("{shown}: {} ({:.4})", transition.count, transition.frequency)
				})
				.collect();
			entries.sort();
			writeln!(f, "{key} [{}]: {}", state.total(), entries.join(", "))?;
		}
		Ok(())
	}
}
