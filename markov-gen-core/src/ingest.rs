use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::info;

use crate::error::{MarkovError, Result};
use crate::io::{list_files, read_corpus_lines, sibling_path};
use crate::model::freq_table::FrequencyTable;

/// Punctuation stripped during normalization before tokenization.
const STRIPPED: [char; 5] = ['.', ',', '!', '?', ':'];

/// Normalizes one line of raw text: strips the punctuation set.
///
/// Anything heavier (casing, stemming) is deliberately out of scope — the
/// table treats tokens as opaque values.
pub fn normalize_line(line: &str) -> String {
	line.replace(STRIPPED, "")
}

/// Splits normalized text into tokens on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
	text.split_whitespace().map(str::to_owned).collect()
}

/// Ingests a whole document as a single token sequence.
///
/// Lines are normalized and joined with spaces first, so line breaks do
/// not introduce absorption points mid-document.
pub fn add_document(table: &mut FrequencyTable, text: &str) {
	let joined = text
		.lines()
		.map(normalize_line)
		.collect::<Vec<_>>()
		.join(" ");
	table.add(tokenize(&joined));
}

/// Builds a table from corpus lines, one line per token sequence.
///
/// Lines are split into chunks (based on CPU cores * factor), partial
/// tables are built in parallel and merged sequentially. Merge
/// commutativity guarantees the result matches a sequential build.
///
/// # Notes
/// - Uses MPSC channels to collect partial tables from threads.
/// - Each line is normalized, tokenized and fed to `add` independently,
///   so chunk boundaries never split a token sequence.
pub fn build_from_lines(lines: &[String]) -> Result<FrequencyTable> {
	if lines.is_empty() {
		return Ok(FrequencyTable::new());
	}

	let cpus = num_cpus::get();
	let factor = 8;
	let chunks = cpus * factor;
	let chunk_size = lines.len().div_ceil(chunks).max(1);

	let (tx, rx) = mpsc::channel();
	for chunk in lines.chunks(chunk_size) {
		let tx = tx.clone();
		let chunk: Vec<String> = chunk.to_vec();

		thread::spawn(move || {
			let mut partial = FrequencyTable::new();
			for line in chunk {
				partial.add(tokenize(&normalize_line(&line)));
			}
			// A dropped receiver means the build was abandoned.
			let _ = tx.send(partial);
		});
	}
	drop(tx);

	let mut table = FrequencyTable::new();
	for partial in rx.iter() {
		table.consume(&partial)?;
	}

	info!("built model from {} lines ({} keys)", lines.len(), table.len());
	Ok(table)
}

/// Builds (or fast-loads) a table for a corpus path.
///
/// - A directory ingests every `.txt` file inside it, merging the partial
///   tables.
/// - A file is ingested line by line; a `postcard` snapshot is written
///   next to it (`<stem>.bin`) and reused by later builds.
pub fn load_or_build<P: AsRef<Path>>(path: P) -> Result<FrequencyTable> {
	let path = path.as_ref();

	if path.is_dir() {
		let mut table = FrequencyTable::new();
		for file in list_files(path, "txt")
			.map_err(|source| MarkovError::io(source, Some(path.to_path_buf())))?
		{
			let partial = build_corpus_file(&path.join(&file))?;
			table.consume(&partial)?;
		}
		return Ok(table);
	}

	build_corpus_file(path)
}

/// Ingests a single corpus file, going through the binary snapshot when
/// one exists.
fn build_corpus_file(path: &Path) -> Result<FrequencyTable> {
	let snapshot = sibling_path(path, "bin")
		.map_err(|source| MarkovError::io(source, Some(path.to_path_buf())))?;

	if snapshot.exists() {
		let bytes = std::fs::read(&snapshot)
			.map_err(|source| MarkovError::io(source, Some(snapshot.clone())))?;
		let table: FrequencyTable = postcard::from_bytes(&bytes)?;
		info!("loaded snapshot {}", snapshot.display());
		return Ok(table);
	}

	let lines = read_corpus_lines(path)
		.map_err(|source| MarkovError::io(source, Some(path.to_path_buf())))?;
	let table = build_from_lines(&lines)?;

	let bytes = postcard::to_stdvec(&table)?;
	std::fs::write(&snapshot, bytes)
		.map_err(|source| MarkovError::io(source, Some(snapshot)))?;

	Ok(table)
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::tempdir;

	use super::*;

	#[test]
	fn normalization_strips_the_punctuation_set() {
		assert_eq!(normalize_line("Hey, you! Ready? Go: now."), "Hey you Ready Go now");
		assert_eq!(normalize_line("unchanged line"), "unchanged line");
	}

	#[test]
	fn tokenize_splits_on_any_whitespace() {
		assert_eq!(tokenize("a  b\tc"), vec!["a", "b", "c"]);
		assert!(tokenize("   ").is_empty());
	}

	#[test]
	fn add_document_joins_lines_into_one_sequence() {
		let mut table = FrequencyTable::new();
		add_document(&mut table, "hello world\nsup hello\nthere");

		// "world" continues into "sup" across the line break: only the
		// final token of the document absorbs.
		use crate::model::freq_table::Successor;
		assert_eq!(table.count("world", &Successor::Token("sup".to_owned())), 1);
		assert_eq!(table.count("there", &Successor::End), 1);
		assert_eq!(table.count("hello", &Successor::End), 0);
	}

	#[test]
	fn parallel_build_matches_sequential_ingestion() {
		let lines: Vec<String> = (0..64)
			.map(|i| format!("alpha beta gamma {} delta alpha beta", i % 7))
			.collect();

		let parallel = build_from_lines(&lines).unwrap();

		let mut sequential = FrequencyTable::new();
		for line in &lines {
			sequential.add(tokenize(&normalize_line(line)));
		}

		assert_eq!(parallel.len(), sequential.len());
		for token in sequential.tokens() {
			assert_eq!(parallel.total(token), sequential.total(token), "total of {token}");
			for (successor, _) in sequential.retrieve(token) {
				assert_eq!(
					parallel.count(token, &successor),
					sequential.count(token, &successor),
					"count of {token} -> {successor:?}"
				);
			}
		}
	}

	#[test]
	fn corpus_file_build_writes_and_reuses_the_snapshot() {
		let dir = tempdir().unwrap();
		let corpus = dir.path().join("corpus.txt");
		fs::write(&corpus, "hello world\nsup bro\n\nhello there\n").unwrap();

		let first = load_or_build(&corpus).unwrap();
		assert!(dir.path().join("corpus.bin").exists());

		// Second build must go through the snapshot and agree.
		let second = load_or_build(&corpus).unwrap();
		assert_eq!(second.len(), first.len());
		for token in first.tokens() {
			assert_eq!(second.total(token), first.total(token));
		}
	}

	#[test]
	fn directory_ingestion_merges_every_txt_file() {
		let dir = tempdir().unwrap();
		fs::write(dir.path().join("a.txt"), "hello world\n").unwrap();
		fs::write(dir.path().join("b.txt"), "hello there\n").unwrap();
		fs::write(dir.path().join("ignored.md"), "not a corpus\n").unwrap();

		let table = load_or_build(dir.path()).unwrap();

		use crate::model::freq_table::Successor;
		assert_eq!(table.total("hello"), 2);
		assert_eq!(table.count("hello", &Successor::Token("world".to_owned())), 1);
		assert_eq!(table.count("hello", &Successor::Token("there".to_owned())), 1);
		assert!(!table.contains("not"));
	}

	#[test]
	fn missing_corpus_is_an_io_error() {
		let dir = tempdir().unwrap();
		assert!(matches!(
			load_or_build(dir.path().join("nope.txt")),
			Err(MarkovError::Io { .. })
		));
	}
}
