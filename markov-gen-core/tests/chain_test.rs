//! End-to-end coverage of the model lifecycle: ingest, generate, merge,
//! persist, reload.

use rand::SeedableRng;
use rand::rngs::StdRng;

use tempfile::tempdir;

use markov_gen_core::error::MarkovError;
use markov_gen_core::ingest;
use markov_gen_core::model::freq_table::{FrequencyTable, Successor};
use markov_gen_core::model::traverse_input::TraverseInput;

fn assert_same_counts(a: &FrequencyTable, b: &FrequencyTable) {
	assert_eq!(a.len(), b.len());
	for token in a.tokens() {
		assert_eq!(a.total(token), b.total(token), "total of {token}");
		for (successor, _) in a.retrieve(token) {
			assert_eq!(
				a.count(token, &successor),
				b.count(token, &successor),
				"count of {token} -> {successor:?}"
			);
		}
	}
}

#[test]
fn lifecycle_build_generate_save_load_consume() {
	let dir = tempdir().unwrap();
	let model_path = dir.path().join("chain.json");

	let mut chain = FrequencyTable::new();
	chain.add(["hello", "world", "sup", "hello", "there", "sup", "bro"]);

	// Generation is bounded and reproducible under a fixed seed.
	let input = TraverseInput::new(5);
	let mut rng = StdRng::seed_from_u64(11);
	let generated = chain.traverse_with(&input, &mut rng).unwrap();
	assert!(generated.len() <= 5);
	assert!(generated.iter().all(|token| chain.contains(token)));

	chain.save(&model_path).unwrap();

	// A fresh table loaded from disk plus new observations.
	let mut reloaded = FrequencyTable::load(&model_path).unwrap();
	assert_same_counts(&chain, &reloaded);
	reloaded.add(["hello", "nuts"]);

	let mut input = TraverseInput::new(5);
	input.force_best = true;
	let mut rng = StdRng::seed_from_u64(12);
	let best_walk = reloaded.traverse_with(&input, &mut rng).unwrap();
	assert!(!best_walk.is_empty());

	// Consuming the reloaded table folds its counts back in.
	chain.consume(&reloaded).unwrap();
	assert_eq!(chain.count("hello", &Successor::Token("nuts".to_owned())), 1);
	assert_eq!(chain.total("hello"), 5);

	for token in chain.tokens() {
		let sum: f64 = chain.retrieve(token).iter().map(|(_, f)| f).sum();
		assert!((sum - 1.0).abs() < 1e-9, "frequencies of {token} sum to {sum}");
	}
}

#[test]
fn merge_order_does_not_change_counts() {
	let corpora = [
		"the cat sat on the mat",
		"the dog sat on the cat",
		"a mouse ran past the dog",
	];

	let mut combined = FrequencyTable::new();
	for corpus in &corpora {
		combined.add(ingest::tokenize(corpus));
	}

	let tables: Vec<FrequencyTable> = corpora
		.iter()
		.map(|corpus| {
			let mut table = FrequencyTable::new();
			table.add(ingest::tokenize(corpus));
			table
		})
		.collect();

	// Fold the partial tables in two different orders.
	let mut forward = FrequencyTable::new();
	for table in &tables {
		forward.consume(table).unwrap();
	}
	let mut backward = FrequencyTable::new();
	for table in tables.iter().rev() {
		backward.consume(table).unwrap();
	}

	assert_same_counts(&combined, &forward);
	assert_same_counts(&combined, &backward);
}

#[test]
fn round_trip_after_merging_snapshots() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("merged.json");

	let mut left = FrequencyTable::new();
	left.add(["hello", "world", "sup", "hello", "there", "sup", "bro"]);
	let mut right = FrequencyTable::new();
	right.add(["hello", "nuts"]);

	left.consume(&right).unwrap();
	left.save(&path).unwrap();

	let reloaded = FrequencyTable::load(&path).unwrap();
	assert_same_counts(&left, &reloaded);
}

#[test]
fn generation_errors_surface_to_the_caller() {
	let empty = FrequencyTable::new();
	assert!(matches!(
		empty.traverse(&TraverseInput::new(3)),
		Err(MarkovError::EmptyModel)
	));

	let mut table = FrequencyTable::new();
	table.add(["a", "b"]);
	let mut input = TraverseInput::new(3);
	input.root = Some("missing".to_owned());
	assert!(matches!(
		table.traverse(&input),
		Err(MarkovError::NoRoot(root)) if root == "missing"
	));
}

#[test]
fn corpus_ingestion_feeds_generation() {
	let dir = tempdir().unwrap();
	let corpus = dir.path().join("songs.txt");
	std::fs::write(
		&corpus,
		"shine on you crazy diamond\nwish you were here\nshine on forever\n",
	)
	.unwrap();

	let table = ingest::load_or_build(&corpus).unwrap();
	assert!(table.contains("shine"));
	assert_eq!(table.total("shine"), 2);

	let mut input = TraverseInput::new(8);
	input.root = Some("shine".to_owned());
	let mut rng = StdRng::seed_from_u64(21);
	let tokens = table.traverse_with(&input, &mut rng).unwrap();
	assert_eq!(tokens[0], "shine");
	assert!(tokens.len() <= 8);
}
