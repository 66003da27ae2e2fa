// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! `sweep` command line.
//!
//! ```text
//! sweep run --index words.idx --universe words.txt --k 3
//! sweep build-index --keys keys.txt --out words.idx
//! ```
//!
//! Hits are printed to stdout as JSON lines; logs go to stderr.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use comb_sweep::config::{SearchConfig, VerifyDepth};
use comb_sweep::derive::{CancelAfter, KeyDeriver, PhraseDeriver};
use comb_sweep::driver::{DriverHandle, Outcome, SearchDriver};
use comb_sweep::index::IndexWriter;

#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(about = "Resumable exhaustive sweep of k-combinations against a fingerprint index")]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep combinations of the universe, resuming from the checkpoint if any
    Run(RunArgs),

    /// Build an index file from a newline-separated list of keys
    BuildIndex {
        #[arg(long, value_name = "FILE")]
        keys: PathBuf,

        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Sorted fingerprint index
    #[arg(long, value_name = "FILE")]
    index: PathBuf,

    /// Symbols, one per line
    #[arg(long, value_name = "FILE")]
    universe: PathBuf,

    /// Combination size
    #[arg(short, long)]
    k: Option<usize>,

    /// TOML configuration; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    checkpoint: Option<PathBuf>,

    /// Stop after deriving this many combinations in this session
    #[arg(long, value_name = "N")]
    stop_after: Option<u64>,

    /// Check the ordering of every index entry at load
    #[arg(long)]
    full_verify: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => run(args),
        Command::BuildIndex { keys, out } => build_index(keys, out),
    }
}

fn setup_tracing(verbose: bool) {
    let default = if verbose {
        "comb_sweep=debug,sweep=debug"
    } else {
        "comb_sweep=info,sweep=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::from_toml_file(path)?,
        None => SearchConfig::default(),
    };
    if args.k.is_some() {
        config.k = args.k;
    }
    if let Some(checkpoint) = args.checkpoint {
        config.checkpoint_path = checkpoint;
    }
    if args.full_verify {
        config.verify_depth = VerifyDepth::Full;
    }

    let handle = DriverHandle::default();
    let deriver: Box<dyn KeyDeriver> = match args.stop_after {
        Some(limit) => Box::new(CancelAfter::new(PhraseDeriver, handle.clone(), limit)),
        None => Box::new(PhraseDeriver),
    };

    let mut driver = SearchDriver::initialize(config, &args.index, &args.universe, deriver)?
        .with_handle(handle);
    let summary = driver.run();

    let mut stdout = io::stdout().lock();
    for found in &summary.found {
        serde_json::to_writer(&mut stdout, found)?;
        writeln!(stdout)?;
    }

    match summary.outcome {
        Outcome::Exhausted => info!(total_tested = summary.total_tested, "search space exhausted"),
        Outcome::Interrupted => info!(
            total_tested = summary.total_tested,
            "interrupted; run again to continue from the checkpoint"
        ),
    }
    Ok(())
}

fn build_index(keys: PathBuf, out: PathBuf) -> Result<(), Box<dyn Error>> {
    let text = std::fs::read_to_string(&keys)?;
    let mut writer = IndexWriter::new();
    writer.extend(
        text.lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty()),
    );
    info!(keys = %keys.display(), count = writer.len(), "read keys");
    writer.write_path(&out)?;
    Ok(())
}
