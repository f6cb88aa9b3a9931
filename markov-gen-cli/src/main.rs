use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use markov_gen_core::ingest;
use markov_gen_core::model::freq_table::FrequencyTable;
use markov_gen_core::model::traverse_input::TraverseInput;

/// Generate text in the style of a corpus using a first-order Markov model.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// Corpus file (or directory of .txt files) to ingest
	corpus: Option<PathBuf>,

	/// Number of tokens to generate
	#[arg(short = 'n', long, default_value_t = 150)]
	length: usize,

	/// Accept early termination once this many tokens were produced
	#[arg(long, value_name = "COUNT")]
	min_length: Option<usize>,

	/// Root token to start from (random when omitted)
	#[arg(long, value_name = "TOKEN")]
	root: Option<String>,

	/// Always follow the highest-frequency successor
	#[arg(long)]
	best: bool,

	/// Stop at absorption instead of restarting from a new root
	#[arg(long)]
	no_restart: bool,

	/// Seed for reproducible generation
	#[arg(long, value_name = "SEED")]
	seed: Option<u64>,

	/// Load a previously saved model (a corpus, if also given, is merged in)
	#[arg(long, value_name = "PATH")]
	load: Option<PathBuf>,

	/// Save the model as JSON after building
	#[arg(long, value_name = "PATH")]
	save: Option<PathBuf>,

	/// Print the frequency table before generating
	#[arg(long)]
	dump: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
	let cli = Cli::parse();

	let mut table = match &cli.load {
		Some(path) => FrequencyTable::load(path)?,
		None => FrequencyTable::new(),
	};

	if let Some(corpus) = &cli.corpus {
		let built = ingest::load_or_build(corpus)?;
		table.consume(&built)?;
	}

	if table.is_empty() {
		return Err("a corpus path or --load is required".into());
	}
	info!("model ready: {} tokens", table.len());

	if cli.dump {
		print!("{table}");
	}

	if let Some(path) = &cli.save {
		table.save(path)?;
	}

	let mut input = TraverseInput::new(cli.length);
	input.min_len = cli.min_length;
	input.root = cli.root.clone();
	input.force_best = cli.best;
	input.restart_on_error = !cli.no_restart;

	let tokens = match cli.seed {
		Some(seed) => table.traverse_with(&input, &mut StdRng::seed_from_u64(seed))?,
		None => table.traverse(&input)?,
	};
	println!("{}", tokens.join(" "));

	Ok(())
}
