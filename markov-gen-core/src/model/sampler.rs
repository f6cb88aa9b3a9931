use rand::Rng;
use rand::prelude::IteratorRandom;

use crate::error::{MarkovError, Result};
use super::freq_table::Successor;

/// Tolerance used when comparing accumulated frequencies against 1.0 and
/// when detecting ties in best mode. Counts of the same magnitude divide to
/// exactly equal frequencies, so the epsilon only has to absorb rounding
/// from the division itself.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Draws one successor with probability proportional to its weight.
///
/// The weights are the stored frequencies of a token's successors and
/// should sum to 1. Accumulated floating-point rounding across many
/// increments can leave the sum slightly off; the unaccounted mass is
/// treated as a synthetic residual bucket carrying the absorption marker.
/// A negative residual (weights summing to slightly over 1) is clamped to
/// zero instead of raising a domain error.
///
/// This method performs:
/// - an O(n) scan over the choices
/// - a cumulative subtraction to select a bucket
///
/// Returns `None` if there are no choices at all.
pub fn pick_weighted<R: Rng>(rng: &mut R, choices: &[(Successor, f64)]) -> Option<Successor> {
	if choices.is_empty() {
		return None;
	}

	let mut roll = rng.random::<f64>();

	let mut fallback = None;
	for (successor, weight) in choices {
		if roll < *weight {
			return Some(successor.clone());
		}
		roll -= weight;
		fallback = Some(successor);
	}

	// The roll slipped past every bucket. Either the weights genuinely sum
	// to less than 1 (drift) and the leftover mass belongs to the residual
	// end-marker bucket, or the scan lost the last bucket to rounding.
	let total: f64 = choices.iter().map(|(_, weight)| weight).sum();
	if total < 1.0 - WEIGHT_EPSILON {
		return Some(Successor::End);
	}
	fallback.cloned()
}

/// Deterministic "best" selection: the successor with the maximum
/// frequency, ties broken uniformly at random.
///
/// The random tie-break is intentional — a first-wins rule would bias the
/// output toward map iteration order. The absorption marker never competes
/// with real successors; it is returned only when it is the sole option.
///
/// # Errors
/// Fails with `NoSuccessor` when `choices` is empty.
pub fn pick_best<R: Rng>(
	rng: &mut R,
	token: &str,
	choices: &[(Successor, f64)],
) -> Result<Successor> {
	if choices.is_empty() {
		return Err(MarkovError::NoSuccessor(token.to_owned()));
	}

	let mut best = f64::NEG_INFINITY;
	for (successor, weight) in choices {
		if !successor.is_end() && *weight > best {
			best = *weight;
		}
	}
	if best == f64::NEG_INFINITY {
		// Only the absorption marker is on offer.
		return Ok(Successor::End);
	}

	let picked = choices
		.iter()
		.filter(|(successor, weight)| {
			!successor.is_end() && (best - *weight).abs() <= WEIGHT_EPSILON
		})
		.choose(rng);

	match picked {
		Some((successor, _)) => Ok(successor.clone()),
		// Unreachable: a maximum was found above. Kept for safety.
		None => Err(MarkovError::NoSuccessor(token.to_owned())),
	}
}
