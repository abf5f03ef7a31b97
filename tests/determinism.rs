//! Determinism Test - Golden Master verification.
//!
//! Verifies that the same seed produces the same profile, the same
//! proposal sequence and the same final assignment on every run.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use stable_match::{
    run_batch, BatchConfig, MatchEvent, MatchingEngine, PopulationShape, PreferenceProfile,
    ProfileGenerator, ProposalOutcome,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn generate_profile(seed: u64, shape: PopulationShape) -> PreferenceProfile {
    ProfileGenerator::new(ChaCha8Rng::seed_from_u64(seed))
        .generate(&shape)
        .unwrap()
}

/// Compute a hash of all proposal events
fn hash_events(events: &[MatchEvent]) -> u64 {
    let mut hasher = DefaultHasher::new();

    for event in events {
        event.round.hash(&mut hasher);
        event.buyer.hash(&mut hasher);
        event.seller.hash(&mut hasher);
        match event.outcome {
            ProposalOutcome::Accepted => "Accepted".hash(&mut hasher),
            ProposalOutcome::Displaced { previous } => {
                "Displaced".hash(&mut hasher);
                previous.hash(&mut hasher);
            }
            ProposalOutcome::Rejected { holder } => {
                "Rejected".hash(&mut hasher);
                holder.hash(&mut hasher);
            }
        }
    }

    hasher.finish()
}

/// Run the engine round by round and return (event hash, state hash)
fn run_engine(profile: &PreferenceProfile) -> (u64, u64) {
    let mut engine = MatchingEngine::new(profile);
    let mut all_events = Vec::new();

    loop {
        let events = engine.run_round();
        if events.is_empty() {
            break;
        }
        all_events.extend(events);
    }

    (hash_events(&all_events), engine.assignment().state_hash())
}

#[test]
fn test_determinism_small() {
    const SEED: u64 = 0xDEADBEEF;
    const RUNS: usize = 10;

    let shape = PopulationShape::Polygamous {
        buyers: 40,
        max_capacity: 3,
    };
    let profile = generate_profile(SEED, shape);

    let (first_event_hash, first_state_hash) = run_engine(&profile);

    for run in 1..RUNS {
        let regenerated = generate_profile(SEED, shape);
        assert_eq!(regenerated, profile, "Profile mismatch on run {}", run);

        let (event_hash, state_hash) = run_engine(&regenerated);
        assert_eq!(event_hash, first_event_hash, "Event hash mismatch on run {}", run);
        assert_eq!(state_hash, first_state_hash, "State hash mismatch on run {}", run);
    }
}

#[test]
fn test_determinism_large() {
    const SEED: u64 = 0xCAFEBABE;
    const RUNS: usize = 3;

    let shape = PopulationShape::OneToOne { count: 400 };
    let profile = generate_profile(SEED, shape);

    let (first_event_hash, first_state_hash) = run_engine(&profile);

    for run in 1..RUNS {
        let (event_hash, state_hash) = run_engine(&profile);
        assert_eq!(event_hash, first_event_hash, "Event hash mismatch on run {}", run);
        assert_eq!(state_hash, first_state_hash, "State hash mismatch on run {}", run);
    }
}

#[test]
fn test_solve_matches_stepped_run() {
    let profile = generate_profile(7, PopulationShape::default());

    let (_, stepped) = run_engine(&profile);
    let solved = MatchingEngine::new(&profile).solve();

    assert_eq!(solved.assignment.state_hash(), stepped);
}

#[test]
fn test_different_seeds_produce_different_results() {
    let shape = PopulationShape::OneToOne { count: 50 };
    let (hash1, _) = run_engine(&generate_profile(1, shape));
    let (hash2, _) = run_engine(&generate_profile(2, shape));

    assert_ne!(hash1, hash2, "Different seeds should produce different results");
}

#[test]
fn test_batch_reports_are_reproducible() {
    let config = BatchConfig {
        trials: 200,
        shape: PopulationShape::Fixed {
            buyers: 8,
            sellers: 12,
            max_capacity: 3,
        },
        seed: 0xABCDEF,
        ..BatchConfig::default()
    };

    let first = run_batch(&config).unwrap();
    let second = run_batch(&config).unwrap();

    let fingerprint = |report: &stable_match::BatchReport| {
        report
            .outcomes
            .iter()
            .map(|o| (o.trial, o.seed, o.state_hash, o.proposals, o.stable))
            .collect::<Vec<_>>()
    };
    assert_eq!(fingerprint(&first), fingerprint(&second));
    assert!(first.all_stable());
}
