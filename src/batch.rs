//! Batch harness - many independent trials, one report.
//!
//! Trial seeds come from a single master seed, so a batch reports the same
//! outcomes whether it runs on one thread or on many.

use std::fmt;
use std::io;

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::engine::{TrialEngine, TrialOutcome, TrialResult, TrialSpec};
use crate::error::BatchError;
use crate::generator::PopulationShape;

/// Upper bound for recorded solve latencies (60 s)
const MAX_LATENCY_NS: u64 = 60_000_000_000;

/// Batch configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    pub trials: u64,
    pub shape: PopulationShape,
    /// Master seed; per-trial seeds are drawn from it in trial order
    pub seed: u64,
    /// Worker threads (only used by `run_batch_parallel`)
    pub workers: usize,
    /// Pin each worker to its own core
    pub pin_workers: bool,
    /// Slots per worker ring buffer
    pub ring_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            shape: PopulationShape::default(),
            seed: 0x5EED,
            workers: 1,
            pin_workers: false,
            ring_capacity: 1024,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.trials == 0 {
            return Err(BatchError::InvalidConfig("trial count must be positive".into()));
        }
        if self.workers == 0 {
            return Err(BatchError::InvalidConfig("worker count must be positive".into()));
        }
        if self.ring_capacity == 0 {
            return Err(BatchError::InvalidConfig("ring capacity must be positive".into()));
        }
        self.shape.validate()?;
        Ok(())
    }

    /// The batch's trials, in id order.
    pub fn trial_specs(&self) -> impl Iterator<Item = TrialSpec> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..self.trials).map(move |id| TrialSpec { id, seed: rng.gen() })
    }
}

/// Aggregated outcome of a batch
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One outcome per trial, ascending by trial id
    pub outcomes: Vec<TrialOutcome>,
    /// Solve latency distribution in nanoseconds
    pub solve_latency: Histogram<u64>,
}

/// Headline numbers of a batch, for logs and machine-readable output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub trials: u64,
    /// Ids of trials whose matching had a blocking pair
    pub unstable: Vec<u64>,
    pub matched_sellers: u64,
    pub total_sellers: u64,
    pub underfilled_buyers: u64,
    pub proposals: u64,
    pub solve_p50_ns: u64,
    pub solve_p99_ns: u64,
    pub solve_max_ns: u64,
}

impl BatchReport {
    /// Trials whose matching had a blocking pair
    pub fn unstable(&self) -> impl Iterator<Item = &TrialOutcome> {
        self.outcomes.iter().filter(|o| !o.stable)
    }

    pub fn all_stable(&self) -> bool {
        self.outcomes.iter().all(|o| o.stable)
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            started_at: self.started_at,
            finished_at: self.finished_at,
            trials: self.outcomes.len() as u64,
            unstable: self.unstable().map(|o| o.trial).collect(),
            matched_sellers: self.outcomes.iter().map(|o| o.matched as u64).sum(),
            total_sellers: self.outcomes.iter().map(|o| o.sellers as u64).sum(),
            underfilled_buyers: self.outcomes.iter().map(|o| o.underfilled_buyers as u64).sum(),
            proposals: self.outcomes.iter().map(|o| o.proposals).sum(),
            solve_p50_ns: self.solve_latency.value_at_quantile(0.50),
            solve_p99_ns: self.solve_latency.value_at_quantile(0.99),
            solve_max_ns: self.solve_latency.max(),
        }
    }

    /// Write one CSV row per trial.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), BatchError> {
        let mut csv = csv::Writer::from_writer(writer);
        for outcome in &self.outcomes {
            csv.serialize(outcome)?;
        }
        csv.flush()?;
        Ok(())
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unstable.is_empty() {
            write!(f, "all {} trials stable", self.trials)?;
        } else {
            write!(
                f,
                "{} of {} trials unstable: {:?}",
                self.unstable.len(),
                self.trials,
                self.unstable
            )?;
        }
        write!(
            f,
            " ({}/{} sellers matched, {} proposals, solve p50 {} ns, p99 {} ns)",
            self.matched_sellers,
            self.total_sellers,
            self.proposals,
            self.solve_p50_ns,
            self.solve_p99_ns
        )
    }
}

/// Gathers outcomes as they arrive, in any order.
struct Collector {
    outcomes: Vec<TrialOutcome>,
    solve_latency: Histogram<u64>,
    first_error: Option<BatchError>,
    received: u64,
}

impl Collector {
    fn new(trials: u64) -> Result<Self, BatchError> {
        Ok(Self {
            outcomes: Vec::with_capacity(trials.min(1 << 20) as usize),
            solve_latency: Histogram::new_with_bounds(1, MAX_LATENCY_NS, 3)?,
            first_error: None,
            received: 0,
        })
    }

    fn record(&mut self, result: TrialResult) {
        self.received += 1;
        match result {
            Ok(outcome) => {
                if !outcome.stable {
                    warn!(
                        "trial {} (seed {:#x}) unstable: buyer {:?} and seller {:?} block",
                        outcome.trial, outcome.seed, outcome.blocking_buyer, outcome.blocking_seller
                    );
                }
                self.solve_latency.saturating_record(outcome.solve_ns.max(1));
                self.outcomes.push(outcome);
            }
            Err(err) => {
                if self.first_error.is_none() {
                    self.first_error = Some(err);
                }
            }
        }
    }

    #[cfg(feature = "runtime")]
    fn drain(&mut self, outputs: &mut [rtrb::Consumer<TrialResult>]) {
        for output in outputs.iter_mut() {
            while let Ok(result) = output.pop() {
                self.record(result);
            }
        }
    }

    fn finish(mut self, started_at: DateTime<Utc>) -> Result<BatchReport, BatchError> {
        if let Some(err) = self.first_error {
            return Err(err);
        }
        self.outcomes.sort_unstable_by_key(|o| o.trial);

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            outcomes: self.outcomes,
            solve_latency: self.solve_latency,
        };
        info!("{}", report.summary());
        Ok(report)
    }
}

/// Run every trial on the calling thread.
pub fn run_batch(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    config.validate()?;
    let started_at = Utc::now();
    let engine = TrialEngine::new(config.shape);
    let mut collector = Collector::new(config.trials)?;

    for spec in config.trial_specs() {
        let outcome = engine.run_trial(spec)?;
        collector.record(Ok(outcome));
    }

    collector.finish(started_at)
}

/// Spread trials over `config.workers` threads.
///
/// Specs go out round-robin over one SPSC ring per worker and results come
/// back over a second ring per worker; the calling thread both dispatches
/// and drains. Falls back to `run_batch` for a single worker.
#[cfg(feature = "runtime")]
pub fn run_batch_parallel(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    use rtrb::{PushError, RingBuffer};

    config.validate()?;
    if config.workers == 1 {
        return run_batch(config);
    }

    let started_at = Utc::now();
    let engine = TrialEngine::new(config.shape);
    let cores = if config.pin_workers {
        core_affinity::get_core_ids().unwrap_or_default()
    } else {
        Vec::new()
    };
    let mut collector = Collector::new(config.trials)?;

    std::thread::scope(|scope| {
        let mut inputs = Vec::with_capacity(config.workers);
        let mut outputs = Vec::with_capacity(config.workers);

        for worker in 0..config.workers {
            let (spec_tx, mut spec_rx) = RingBuffer::<TrialSpec>::new(config.ring_capacity);
            let (mut result_tx, result_rx) = RingBuffer::<TrialResult>::new(config.ring_capacity);
            let core = cores.get(worker % cores.len().max(1)).copied();
            let engine = &engine;
            scope.spawn(move || engine.run(&mut spec_rx, &mut result_tx, core));
            inputs.push(spec_tx);
            outputs.push(result_rx);
        }

        for (index, mut spec) in config.trial_specs().enumerate() {
            let input = &mut inputs[index % config.workers];
            while let Err(PushError::Full(back)) = input.push(spec) {
                spec = back;
                collector.drain(&mut outputs);
                std::hint::spin_loop();
            }
        }
        // Abandon the inputs so workers exit once drained
        drop(inputs);

        while collector.received < config.trials {
            collector.drain(&mut outputs);
            if outputs.iter().all(|o| o.is_abandoned() && o.is_empty()) {
                break;
            }
            std::hint::spin_loop();
        }
    });

    collector.finish(started_at)
}
