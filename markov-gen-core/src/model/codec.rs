use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use log::info;

use crate::error::{MarkovError, Result};
use super::freq_table::{FrequencyTable, Successor};
use super::state::{TokenState, Transition};

/// Reserved key representing the absorption marker in persisted documents.
///
/// The NUL string cannot be produced by whitespace tokenization, which
/// keeps the sentinel distinguishable from any real token.
pub const END_KEY: &str = "\u{0}";

/// Persisted successor records: successor key → `[count, frequency]`.
type PersistedSuccessors = BTreeMap<String, (u64, f64)>;
/// The persisted document: token → successor records.
type PersistedTable = BTreeMap<String, PersistedSuccessors>;

impl FrequencyTable {
	/// Serializes the table to a JSON document at `path`.
	///
	/// The document maps each token to its successor records, each a
	/// two-element `[count, frequency]` array; the absorption marker is
	/// stored under [`END_KEY`]. Totals are not persisted — they are
	/// derivable from the counts. `BTreeMap` ordering keeps the output
	/// stable across runs.
	///
	/// # Errors
	/// Fails with `EmptySave` if the table has no observations.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		if self.is_empty() {
			return Err(MarkovError::EmptySave);
		}
		let path = path.as_ref();

		let mut document = PersistedTable::new();
		for (token, state) in self.states() {
			let mut successors = PersistedSuccessors::new();
			for (successor, transition) in state.successors() {
				let key = match successor {
					Successor::Token(token) => token.clone(),
					Successor::End => END_KEY.to_owned(),
				};
				successors.insert(key, (transition.count, transition.frequency));
			}
			document.insert(token.clone(), successors);
		}

		let json = serde_json::to_string_pretty(&document)?;
		fs::write(path, json).map_err(|source| MarkovError::io(source, Some(path.to_path_buf())))?;

		info!("saved {} keys to {}", self.len(), path.display());
		Ok(())
	}

	/// Reads a persisted table back from `path`.
	///
	/// Totals are reconstructed by summing the persisted counts. Persisted
	/// frequencies are range-checked (they must lie in `[0, 1]`) but never
	/// trusted as state: every frequency is re-derived from the counts, so
	/// a hand-edited file cannot smuggle in an inconsistent distribution.
	///
	/// # Errors
	/// Fails with `Corrupt` on a malformed document, a token without
	/// successor entries, an out-of-range frequency, or a zero observation
	/// total. Negative counts are unrepresentable and rejected at parse.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|source| MarkovError::io(source, Some(path.to_path_buf())))?;
		let document: PersistedTable = serde_json::from_str(&text)
			.map_err(|err| MarkovError::corrupt(path, err.to_string()))?;

		if document.is_empty() {
			// `save` refuses empty tables, so nothing well-formed ever
			// produces this.
			return Err(MarkovError::corrupt(path, "document contains no tokens"));
		}

		let mut states = HashMap::new();
		for (token, persisted) in document {
			if persisted.is_empty() {
				return Err(MarkovError::corrupt(
					path,
					format!("token {token:?} has no successor entries"),
				));
			}

			let mut successors = HashMap::new();
			for (key, (count, frequency)) in persisted {
				if !(0.0..=1.0).contains(&frequency) {
					return Err(MarkovError::corrupt(
						path,
						format!("frequency {frequency} of token {token:?} is outside [0, 1]"),
					));
				}
				let successor = if key == END_KEY {
					Successor::End
				} else {
					Successor::Token(key)
				};
				successors.insert(successor, Transition { count, frequency });
			}

			let mut state = TokenState::from_successors(token.clone(), successors);
			if state.total() == 0 {
				return Err(MarkovError::corrupt(
					path,
					format!("token {token:?} has a zero observation total"),
				));
			}
			state.recalc_frequencies();
			states.insert(token, state);
		}

		info!("loaded {} keys from {}", states.len(), path.display());
		Ok(FrequencyTable::from_states(states))
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::tempdir;

	use super::*;

	fn example_table() -> FrequencyTable {
		let mut table = FrequencyTable::new();
		table.add(["A", "B", "C", "A", "D", "C"]);
		table
	}

	#[test]
	fn save_refuses_empty_tables() {
		let dir = tempdir().unwrap();
		let table = FrequencyTable::new();
		assert!(matches!(
			table.save(dir.path().join("model.json")),
			Err(MarkovError::EmptySave)
		));
	}

	#[test]
	fn round_trip_preserves_counts_and_frequencies() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("model.json");

		let original = example_table();
		original.save(&path).unwrap();
		let loaded = FrequencyTable::load(&path).unwrap();

		assert_eq!(loaded.len(), original.len());
		for token in original.tokens() {
			assert_eq!(loaded.total(token), original.total(token));
			for (successor, frequency) in original.retrieve(token) {
				assert_eq!(loaded.count(token, &successor), original.count(token, &successor));
				let reloaded = loaded
					.retrieve(token)
					.into_iter()
					.find(|(s, _)| *s == successor)
					.map(|(_, f)| f)
					.unwrap();
				assert!((reloaded - frequency).abs() < 1e-9);
			}
		}
	}

	#[test]
	fn persisted_document_uses_the_reserved_end_key() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("model.json");

		example_table().save(&path).unwrap();
		let text = fs::read_to_string(&path).unwrap();

		// "C" ended a sequence, so its record carries the sentinel.
		assert!(text.contains("\\u0000"));
	}

	#[test]
	fn malformed_json_is_corrupt() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("model.json");
		fs::write(&path, "not json at all {").unwrap();

		assert!(matches!(
			FrequencyTable::load(&path),
			Err(MarkovError::Corrupt { .. })
		));
	}

	#[test]
	fn empty_document_is_corrupt() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("model.json");
		fs::write(&path, "{}").unwrap();

		assert!(matches!(
			FrequencyTable::load(&path),
			Err(MarkovError::Corrupt { .. })
		));
	}

	#[test]
	fn out_of_range_frequency_is_corrupt() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("model.json");
		fs::write(&path, r#"{"a": {"b": [1, 1.5]}}"#).unwrap();

		assert!(matches!(
			FrequencyTable::load(&path),
			Err(MarkovError::Corrupt { .. })
		));
	}

	#[test]
	fn negative_count_is_corrupt() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("model.json");
		fs::write(&path, r#"{"a": {"b": [-1, 0.5]}}"#).unwrap();

		assert!(matches!(
			FrequencyTable::load(&path),
			Err(MarkovError::Corrupt { .. })
		));
	}

	#[test]
	fn token_without_successors_is_corrupt() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("model.json");
		fs::write(&path, r#"{"a": {}}"#).unwrap();

		assert!(matches!(
			FrequencyTable::load(&path),
			Err(MarkovError::Corrupt { .. })
		));
	}

	#[test]
	fn hand_edited_frequencies_are_re_derived() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("model.json");
		// Counts say 3:1 but the stored frequencies pretend otherwise.
		fs::write(&path, r#"{"a": {"b": [3, 0.1], "c": [1, 0.9]}}"#).unwrap();

		let table = FrequencyTable::load(&path).unwrap();
		let b = table
			.retrieve("a")
			.into_iter()
			.find(|(s, _)| *s == Successor::Token("b".to_owned()))
			.map(|(_, f)| f)
			.unwrap();
		assert!((b - 0.75).abs() < 1e-9);
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let dir = tempdir().unwrap();
		assert!(matches!(
			FrequencyTable::load(dir.path().join("nope.json")),
			Err(MarkovError::Io { .. })
		));
	}
}
