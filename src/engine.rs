//! Trial Engine - generate, solve and verify one profile per trial.
//!
//! With the `runtime` feature the engine can also run as a worker loop fed
//! by rtrb ring buffers, one engine per thread.

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::BatchError;
use crate::generator::{PopulationShape, ProfileGenerator};
use crate::matching::{MatchingEngine, Solution};
use crate::profile::PreferenceProfile;
use crate::stability::find_blocking_pair;

/// One unit of batch work: an id and the seed its profile is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialSpec {
    pub id: u64,
    pub seed: u64,
}

/// Everything the harness reports about one trial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrialOutcome {
    pub trial: u64,
    pub seed: u64,
    pub buyers: u32,
    pub sellers: u32,
    /// Sum of buyer capacities
    pub demand: u64,
    /// Sellers held at termination
    pub matched: u32,
    /// Buyers that ended below capacity
    pub underfilled_buyers: u32,
    pub rounds: u32,
    pub proposals: u64,
    pub displaced: u64,
    pub rejected: u64,
    pub stable: bool,
    pub blocking_buyer: Option<u32>,
    pub blocking_seller: Option<u32>,
    pub solve_ns: u64,
    pub verify_ns: u64,
    /// Hash of the final seller->buyer map
    pub state_hash: u64,
}

/// What a worker sends back per trial
pub type TrialResult = Result<TrialOutcome, BatchError>;

/// Runs trials of a fixed population shape.
#[derive(Clone, Copy, Debug)]
pub struct TrialEngine {
    shape: PopulationShape,
}

impl TrialEngine {
    pub fn new(shape: PopulationShape) -> Self {
        Self { shape }
    }

    #[inline]
    pub fn shape(&self) -> PopulationShape {
        self.shape
    }

    /// Draw a profile from `spec.seed`, solve it and verify the result.
    pub fn run_trial(&self, spec: TrialSpec) -> TrialResult {
        let mut generator = ProfileGenerator::new(ChaCha8Rng::seed_from_u64(spec.seed));
        let profile = generator.generate(&self.shape)?;
        evaluate(spec, &profile)
    }

    /// Run the engine as a batch worker.
    ///
    /// # Arguments
    /// * `input` - Consumer end of the trial spec ring buffer
    /// * `output` - Producer end of the result ring buffer
    /// * `core` - CPU core to pin this thread to, if any
    ///
    /// # Note
    /// Returns once `input` is abandoned and drained, or once nobody is
    /// left reading `output`.
    #[cfg(feature = "runtime")]
    pub fn run(
        &self,
        input: &mut rtrb::Consumer<TrialSpec>,
        output: &mut rtrb::Producer<TrialResult>,
        core: Option<core_affinity::CoreId>,
    ) {
        if let Some(core) = core {
            self.pin_to_core(core);
        }

        let mut completed = 0u64;
        loop {
            match input.pop() {
                Ok(spec) => {
                    let mut result = self.run_trial(spec);
                    loop {
                        match output.push(result) {
                            Ok(()) => break,
                            Err(rtrb::PushError::Full(back)) => {
                                if output.is_abandoned() {
                                    return;
                                }
                                result = back;
                                std::hint::spin_loop();
                            }
                        }
                    }
                    completed += 1;
                }
                Err(_) => {
                    if input.is_abandoned() && input.is_empty() {
                        break;
                    }
                    std::hint::spin_loop();
                }
            }
        }

        log::debug!("worker finished after {} trials", completed);
    }

    /// Pin the current thread to `core`.
    #[cfg(feature = "runtime")]
    pub fn pin_to_core(&self, core: core_affinity::CoreId) {
        if !core_affinity::set_for_current(core) {
            log::debug!("could not pin worker to core {}", core.id);
        }
    }
}

/// Solve and verify an already built profile, timing both phases.
pub fn evaluate(spec: TrialSpec, profile: &PreferenceProfile) -> TrialResult {
    let start = Instant::now();
    let Solution {
        assignment, stats, ..
    } = MatchingEngine::new(profile).solve();
    let solve_ns = start.elapsed().as_nanos() as u64;

    let start = Instant::now();
    let blocking = find_blocking_pair(profile, &assignment)?;
    let verify_ns = start.elapsed().as_nanos() as u64;

    let underfilled_buyers = (0..profile.buyer_count())
        .filter(|&b| assignment.held_count(b) < profile.capacity(b))
        .count() as u32;

    Ok(TrialOutcome {
        trial: spec.id,
        seed: spec.seed,
        buyers: profile.buyer_count(),
        sellers: profile.seller_count(),
        demand: profile.total_capacity(),
        matched: assignment.matched_count(),
        underfilled_buyers,
        rounds: stats.rounds,
        proposals: stats.proposals,
        displaced: stats.displaced,
        rejected: stats.rejected,
        stable: blocking.is_none(),
        blocking_buyer: blocking.map(|p| p.buyer),
        blocking_seller: blocking.map(|p| p.seller),
        solve_ns,
        verify_ns,
        state_hash: assignment.state_hash(),
    })
}
