//! Side and proposal event types.
//!
//! Events are the engine's output stream: one per proposal, in the order
//! the proposals were made. They are what the invariant tests replay.

use crate::profile::{BuyerId, SellerId};

/// Population side (buyers propose, sellers decide)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Proposing side, capacity >= 1
    Buyer = 0,
    /// Deciding side, capacity 1
    Seller = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buyer => Side::Seller,
            Side::Seller => Side::Buyer,
        }
    }
}

/// What the seller did with a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// Seller was unmatched and now holds the proposer
    Accepted,
    /// Seller dropped `previous` for the proposer
    Displaced { previous: BuyerId },
    /// Seller kept `holder`, whom it ranks higher
    Rejected { holder: BuyerId },
}

impl ProposalOutcome {
    /// Whether the proposer ends up holding the seller
    #[inline]
    pub const fn is_held(self) -> bool {
        !matches!(self, ProposalOutcome::Rejected { .. })
    }
}

/// A single proposal and its outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchEvent {
    /// Round the proposal was made in (1-based)
    pub round: u32,
    /// Proposing buyer
    pub buyer: BuyerId,
    /// Seller proposed to
    pub seller: SellerId,
    /// Position of `seller` in the buyer's ranking (0 = favourite)
    pub rank: u32,
    pub outcome: ProposalOutcome,
}

impl MatchEvent {
    /// The buyer that lost or was refused a hold by this proposal, if any.
    #[inline]
    pub fn loser(&self) -> Option<BuyerId> {
        match self.outcome {
            ProposalOutcome::Accepted => None,
            ProposalOutcome::Displaced { previous } => Some(previous),
            ProposalOutcome::Rejected { .. } => Some(self.buyer),
        }
    }
}
