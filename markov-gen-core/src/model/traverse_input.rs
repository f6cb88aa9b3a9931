/// Parameters for one generation run.
///
/// `TraverseInput` gathers the knobs of a single walk over the frequency
/// table: how many tokens to produce, where to start, how to pick
/// successors and what to do when a walk absorbs early.
///
/// # Invariants
/// - `target_len` is a hard bound: a run never emits more tokens
/// - `min_len`, when set, only matters on absorption with restart enabled:
///   reaching it makes early termination acceptable
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraverseInput {
	/// Hard bound on the number of tokens produced.
	pub target_len: usize,

	/// Acceptable early-termination length. Only consulted when a walk
	/// absorbs with `restart_on_error` enabled: once at least
	/// `min_len - 1` tokens were emitted, the run stops instead of
	/// restarting from a fresh root.
	pub min_len: Option<usize>,

	/// Explicit root token. When unset, a uniformly random token of the
	/// table seeds the walk.
	pub root: Option<String>,

	/// Follow the highest-frequency successor instead of sampling.
	pub force_best: bool,

	/// Re-seed from a random root when the walk absorbs before
	/// `target_len`, accumulating toward the target. When disabled, the
	/// run simply stops at absorption and may come up short.
	pub restart_on_error: bool,
}

impl TraverseInput {
	/// Creates inputs with the default walk behavior: stochastic sampling,
	/// random root, restart on absorption, no minimum length.
	pub fn new(target_len: usize) -> Self {
		Self {
			target_len,
			min_len: None,
			root: None,
			force_best: false,
			restart_on_error: true,
		}
	}
}
