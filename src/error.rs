//! Error types.
//!
//! Every error here is a precondition violation detected at a boundary:
//! profile construction, assignment verification, or the batch harness.
//! Nothing inside the solver itself can fail.

use thiserror::Error;

use crate::event::Side;
use crate::profile::{BuyerId, SellerId};

/// A preference profile that cannot be solved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// A ranking does not list every member of the opposite population.
    #[error("{side:?} {index} ranks {found} entries, expected {expected}")]
    RankingLength {
        side: Side,
        index: u32,
        expected: u32,
        found: usize,
    },

    /// A ranking names someone outside the opposite population.
    #[error("{side:?} {index} ranks entry {entry}, population size is {bound}")]
    EntryOutOfRange {
        side: Side,
        index: u32,
        entry: u32,
        bound: u32,
    },

    /// A ranking lists the same entry twice (ties are not supported).
    #[error("{side:?} {index} ranks entry {entry} more than once")]
    DuplicateEntry { side: Side, index: u32, entry: u32 },

    /// One capacity per buyer is required.
    #[error("expected {expected} buyer capacities, got {found}")]
    CapacityCountMismatch { expected: usize, found: usize },

    /// Capacity must lie in `1..=seller_count`.
    #[error("buyer {buyer} has capacity {capacity}, allowed range is 1..={seller_count}")]
    InvalidCapacity {
        buyer: BuyerId,
        capacity: u32,
        seller_count: u32,
    },

    /// Populations must fit below the `u32::MAX` unmatched sentinel.
    #[error("{side:?} population of {size} exceeds the supported maximum")]
    PopulationTooLarge { side: Side, size: usize },

    /// Buyers exist but there is nobody to match them with.
    #[error("{buyers} buyers but no sellers")]
    NoSellers { buyers: u32 },
}

/// An assignment that does not fit the profile it is checked against,
/// or whose two views disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("assignment covers {found} {side:?}s, profile has {expected}")]
    DimensionMismatch {
        side: Side,
        expected: u32,
        found: u32,
    },

    #[error("seller {seller} is held by buyer {buyer}, only {buyer_count} buyers exist")]
    BuyerOutOfRange {
        seller: SellerId,
        buyer: BuyerId,
        buyer_count: u32,
    },

    #[error("seller {seller} is recorded under buyer {recorded:?} but held by {holder:?}")]
    InconsistentViews {
        seller: SellerId,
        holder: Option<BuyerId>,
        recorded: Option<BuyerId>,
    },

    #[error("buyer {buyer} holds {held} sellers, capacity is {capacity}")]
    CapacityExceeded {
        buyer: BuyerId,
        held: u32,
        capacity: u32,
    },
}

/// Failures of the batch harness.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("invalid batch configuration: {0}")]
    InvalidConfig(String),

    #[error("latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
