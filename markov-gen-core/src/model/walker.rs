use rand::Rng;

use crate::error::{MarkovError, Result};
use super::freq_table::{FrequencyTable, Successor};
use super::sampler;
use super::traverse_input::TraverseInput;

/// Phase of a generation run.
///
/// A walk moves `Idle → Seeded → Walking` and ends in `Absorbed` (or simply
/// stops once the target length is reached). A restart moves `Walking` back
/// to `Seeded` with a fresh random root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkState {
	/// No root chosen yet.
	Idle,
	/// A root is chosen but has not been emitted.
	Seeded,
	/// Tokens are being emitted.
	Walking,
	/// The walk ended on a token without real successors.
	Absorbed,
}

/// Restartable generation state machine over a frequency table.
///
/// The walker pulls one token per `next()` call from the sampler against
/// the table until an absorbing state or the requested length is reached,
/// which makes it a plain [`Iterator`]. One walker produces one finite
/// sequence; collecting it eagerly and stepping it lazily are externally
/// indistinguishable.
///
/// # Responsibilities
/// - Seed the walk from an explicit or uniformly random root
/// - Advance one transition per step, stochastic or best mode
/// - Restart from a fresh root on early absorption when configured
/// - Enforce the hard `target_len` bound
///
/// # Notes
/// - The walker only reads the table; it holds no external resources, so
///   dropping it early needs no cleanup.
/// - An end-marker draw on a token that also has real successors is
///   redrawn; absorption applies only when nothing real is on offer.
pub struct ChainWalker<'a, R: Rng> {
	table: &'a FrequencyTable,
	input: &'a TraverseInput,
	rng: R,
	current: Option<String>,
	emitted: usize,
	state: WalkState,
}

impl<'a, R: Rng> ChainWalker<'a, R> {
	/// Prepares a walk over `table` with the given parameters.
	///
	/// # Errors
	/// - `EmptyModel` when the table has no tokens.
	/// - `NoRoot` when `input.root` is set but absent from the table.
	pub fn new(table: &'a FrequencyTable, input: &'a TraverseInput, rng: R) -> Result<Self> {
		if table.is_empty() {
			return Err(MarkovError::EmptyModel);
		}
		if let Some(root) = &input.root {
			if !table.contains(root) {
				return Err(MarkovError::NoRoot(root.clone()));
			}
		}

		Ok(Self {
			table,
			input,
			rng,
			current: None,
			emitted: 0,
			state: WalkState::Idle,
		})
	}

	/// Current phase of the walk.
	pub fn state(&self) -> WalkState {
		self.state
	}

	/// Number of tokens emitted so far.
	pub fn emitted(&self) -> usize {
		self.emitted
	}

	/// Absorption handling. Returns false when the walk must stop.
	///
	/// A restart always re-seeds from a uniformly random root, even when
	/// the run started from an explicit one.
	fn try_restart(&mut self) -> bool {
		if !self.input.restart_on_error {
			self.state = WalkState::Absorbed;
			return false;
		}

		if let Some(min_len) = self.input.min_len {
			if self.emitted >= min_len.saturating_sub(1) {
				// Close enough: early termination is acceptable.
				self.state = WalkState::Absorbed;
				return false;
			}
		}

		match self.table.random_root(&mut self.rng) {
			Ok(root) => {
				self.current = Some(root.to_owned());
				self.state = WalkState::Seeded;
				true
			}
			// Cannot happen on a non-empty table. Kept for safety.
			Err(_) => {
				self.state = WalkState::Absorbed;
				false
			}
		}
	}

	/// Picks the next real token from `successors`, or `None` when the
	/// draw concludes that the walk should absorb.
	fn pick_next(&mut self, current: &str, successors: &[(Successor, f64)]) -> Option<String> {
		if self.input.force_best {
			match sampler::pick_best(&mut self.rng, current, successors) {
				Ok(Successor::Token(token)) => Some(token),
				_ => None,
			}
		} else {
			loop {
				match sampler::pick_weighted(&mut self.rng, successors) {
					// End-marker draws are repeated: with a real successor
					// available, absorption is not a valid outcome here.
					Some(Successor::End) => continue,
					Some(Successor::Token(token)) => return Some(token),
					None => return None,
				}
			}
		}
	}
}

impl<R: Rng> Iterator for ChainWalker<'_, R> {
	type Item = String;

	fn next(&mut self) -> Option<String> {
		loop {
			if self.emitted >= self.input.target_len {
				return None;
			}

			match self.state {
				WalkState::Absorbed => return None,

				WalkState::Idle => {
					let root = match &self.input.root {
						Some(root) => root.clone(),
						None => match self.table.random_root(&mut self.rng) {
							Ok(root) => root.to_owned(),
							// Cannot happen: emptiness is checked in `new`.
							Err(_) => {
								self.state = WalkState::Absorbed;
								return None;
							}
						},
					};
					self.current = Some(root);
					self.state = WalkState::Seeded;
				}

				WalkState::Seeded => {
					let Some(token) = self.current.clone() else {
						self.state = WalkState::Absorbed;
						return None;
					};
					self.state = WalkState::Walking;
					self.emitted += 1;
					return Some(token);
				}

				WalkState::Walking => {
					let Some(current) = self.current.clone() else {
						self.state = WalkState::Absorbed;
						return None;
					};

					if self.table.is_absorbing(&current) {
						if !self.try_restart() {
							return None;
						}
						continue;
					}

					let successors = self.table.retrieve(&current);
					match self.pick_next(&current, &successors) {
						Some(token) => {
							self.current = Some(token.clone());
							self.emitted += 1;
							return Some(token);
						}
						None => {
							if !self.try_restart() {
								return None;
							}
						}
					}
				}
			}
		}
	}
}
