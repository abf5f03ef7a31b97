use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::warn;
use stable_match::{BatchConfig, BatchError, BatchReport, PopulationShape};

/// Run many random trials, solve each with deferred acceptance and check
/// every result for blocking pairs.
#[derive(Parser, Debug)]
#[command(name = "stable-batch", version)]
struct Args {
    /// Number of trials
    #[arg(short, long, default_value_t = 1000)]
    trials: u64,

    /// Buyers per trial
    #[arg(short, long, default_value_t = 5)]
    buyers: u32,

    /// Sellers per trial; defaults to total buyer demand
    #[arg(short, long)]
    sellers: Option<u32>,

    /// Largest capacity a buyer may draw
    #[arg(short = 'c', long, default_value_t = 3)]
    max_capacity: u32,

    /// Classic one-to-one matching: as many sellers as buyers, capacity 1
    #[arg(long, conflicts_with_all = ["sellers", "max_capacity"])]
    one_to_one: bool,

    /// Master seed
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,

    /// Worker threads (needs the `runtime` feature)
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Pin workers to CPU cores
    #[arg(long)]
    pin: bool,

    /// Slots per worker ring buffer
    #[arg(long, default_value_t = 1024)]
    ring_capacity: usize,

    /// Write per-trial outcomes to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> BatchConfig {
        let shape = if self.one_to_one {
            PopulationShape::OneToOne { count: self.buyers }
        } else if let Some(sellers) = self.sellers {
            PopulationShape::Fixed {
                buyers: self.buyers,
                sellers,
                max_capacity: self.max_capacity,
            }
        } else {
            PopulationShape::Polygamous {
                buyers: self.buyers,
                max_capacity: self.max_capacity,
            }
        };

        BatchConfig {
            trials: self.trials,
            shape,
            seed: self.seed,
            workers: self.workers,
            pin_workers: self.pin,
            ring_capacity: self.ring_capacity,
        }
    }
}

#[cfg(feature = "runtime")]
fn run(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    stable_match::run_batch_parallel(config)
}

#[cfg(not(feature = "runtime"))]
fn run(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    if config.workers > 1 {
        warn!("built without the `runtime` feature, running {} workers' trials on one thread", config.workers);
    }
    stable_match::run_batch(config)
}

fn main() -> Result<ExitCode, BatchError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config();
    let report = run(&config)?;

    if let Some(path) = &args.csv {
        report.write_csv(File::create(path)?)?;
    }

    let summary = report.summary();
    println!("{}", summary);

    if summary.unstable.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        for outcome in report.unstable() {
            warn!(
                "trial {} seed {:#x}: blocking pair buyer {:?} / seller {:?}",
                outcome.trial, outcome.seed, outcome.blocking_buyer, outcome.blocking_seller
            );
        }
        Ok(ExitCode::FAILURE)
    }
}
