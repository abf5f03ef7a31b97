//! # Stable-Match
//!
//! Capacitated deferred acceptance between buyers and sellers, plus a
//! verifier that searches the result for blocking pairs.
//!
//! ## Design Principles
//!
//! - **Immutable Inputs**: A `PreferenceProfile` is validated once and never mutated
//! - **Cursor Proposals**: Rankings are read through per-buyer cursors, never consumed
//! - **Two Views, One Truth**: Seller->buyer and buyer->sellers maps change together
//! - **Injected Randomness**: Only the generator draws random numbers, from an RNG it is handed
//!
//! ## Architecture
//!
//! ```text
//! [ProfileGenerator] --> [PreferenceProfile] --> [MatchingEngine] --> [Assignment]
//!                                |                                         |
//!                                +-----------> [is_stable] <---------------+
//! ```
//!
//! ## Example
//!
//! ```
//! use stable_match::{is_stable, solve, PreferenceProfile};
//!
//! let profile = PreferenceProfile::new(
//!     vec![vec![0, 1], vec![1, 0]], // buyer rankings over sellers
//!     vec![vec![0, 1], vec![1, 0]], // seller rankings over buyers
//!     vec![1, 1],                   // buyer capacities
//! )
//! .unwrap();
//!
//! let assignment = solve(&profile);
//! assert_eq!(assignment.holder(0), Some(0));
//! assert_eq!(assignment.holder(1), Some(1));
//! assert_eq!(is_stable(&profile, &assignment), Ok(true));
//! ```

pub mod error;
pub mod event;
pub mod profile;
pub mod assignment;
pub mod cursor;
pub mod matching;
pub mod stability;
pub mod generator;
pub mod engine;
pub mod batch;

// Re-exports for convenience
pub use assignment::Assignment;
pub use batch::{run_batch, BatchConfig, BatchReport, BatchSummary};
#[cfg(feature = "runtime")]
pub use batch::run_batch_parallel;
pub use cursor::ProposalCursors;
pub use engine::{TrialEngine, TrialOutcome, TrialSpec};
pub use error::{AssignmentError, BatchError, ProfileError};
pub use event::{MatchEvent, ProposalOutcome, Side};
pub use generator::{PopulationShape, ProfileGenerator};
pub use matching::{solve, MatchingEngine, Solution, SolveStats};
pub use profile::{BuyerId, PreferenceProfile, SellerId};
pub use stability::{blocking_pairs, find_blocking_pair, is_stable, BlockingPair};
