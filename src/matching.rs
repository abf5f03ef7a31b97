//! Matching Engine - capacitated, buyer-proposing deferred acceptance.
//!
//! Runs in rounds:
//! 1. PROPOSING: every buyer below capacity with sellers left proposes to
//!    its next-most-preferred seller, advancing its cursor
//! 2. DECIDING: the seller keeps whichever of proposer and current holder
//!    it ranks higher; the other buyer will propose again later
//!
//! The solve ends after the first round in which nobody proposed.

use log::{debug, trace};

use crate::assignment::Assignment;
use crate::cursor::ProposalCursors;
use crate::event::{MatchEvent, ProposalOutcome};
use crate::profile::{BuyerId, PreferenceProfile};

/// Counters collected during a solve
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Rounds in which at least one proposal was made
    pub rounds: u32,
    pub proposals: u64,
    /// Proposals to an unmatched seller
    pub accepted: u64,
    /// Proposals that took a seller from another buyer
    pub displaced: u64,
    /// Proposals the seller turned down
    pub rejected: u64,
}

/// Final state of a solve
#[derive(Clone, Debug)]
pub struct Solution {
    pub assignment: Assignment,
    pub cursors: ProposalCursors,
    pub stats: SolveStats,
}

/// The matching engine core
///
/// Borrows the profile for the whole solve; the assignment and cursors are
/// owned and only mutated through `run_round`.
pub struct MatchingEngine<'p> {
    profile: &'p PreferenceProfile,
    assignment: Assignment,
    cursors: ProposalCursors,
    stats: SolveStats,
    done: bool,
}

impl<'p> MatchingEngine<'p> {
    /// Create an engine with every seller unmatched and every cursor at the
    /// top of its ranking.
    pub fn new(profile: &'p PreferenceProfile) -> Self {
        Self {
            profile,
            assignment: Assignment::for_profile(profile),
            cursors: ProposalCursors::new(profile.buyer_count()),
            stats: SolveStats::default(),
            done: false,
        }
    }

    /// Run one round of proposals.
    ///
    /// Buyers are visited in index order and each one's spare capacity is
    /// read at its turn, so a buyer displaced earlier in the round proposes
    /// again in the same round.
    ///
    /// # Returns
    /// The round's events in proposal order; empty once the solve is done.
    pub fn run_round(&mut self) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        let round = self.stats.rounds + 1;
        for buyer in 0..self.profile.buyer_count() {
            if let Some(event) = self.propose(buyer, round) {
                events.push(event);
            }
        }

        if events.is_empty() {
            self.done = true;
        } else {
            self.stats.rounds = round;
        }
        events
    }

    /// Make `buyer`'s next proposal, if it has spare capacity and sellers
    /// left to propose to.
    fn propose(&mut self, buyer: BuyerId, round: u32) -> Option<MatchEvent> {
        if self.assignment.held_count(buyer) >= self.profile.capacity(buyer) {
            return None;
        }
        let (seller, rank) = self.cursors.advance(self.profile, buyer)?;

        let outcome = match self.assignment.holder(seller) {
            None => {
                self.assignment.hold(seller, buyer);
                self.stats.accepted += 1;
                ProposalOutcome::Accepted
            }
            Some(holder) if self.profile.seller_prefers(seller, buyer, holder) => {
                self.assignment.hold(seller, buyer);
                self.stats.displaced += 1;
                ProposalOutcome::Displaced { previous: holder }
            }
            Some(holder) => {
                self.stats.rejected += 1;
                ProposalOutcome::Rejected { holder }
            }
        };
        self.stats.proposals += 1;

        trace!(
            "round {}: buyer {} -> seller {} (rank {}): {:?}",
            round,
            buyer,
            seller,
            rank,
            outcome
        );

        Some(MatchEvent {
            round,
            buyer,
            seller,
            rank,
            outcome,
        })
    }

    /// Run rounds until no buyer can propose, then hand back the frozen
    /// result.
    pub fn solve(mut self) -> Solution {
        while !self.run_round().is_empty() {}

        debug!(
            "solved {}x{} profile: {} rounds, {} proposals ({} accepted, {} displaced, {} rejected), {} sellers matched",
            self.profile.buyer_count(),
            self.profile.seller_count(),
            self.stats.rounds,
            self.stats.proposals,
            self.stats.accepted,
            self.stats.displaced,
            self.stats.rejected,
            self.assignment.matched_count(),
        );

        Solution {
            assignment: self.assignment,
            cursors: self.cursors,
            stats: self.stats,
        }
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    /// Whether the last round made no proposals
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Whether `buyer` will propose again: below capacity with sellers left
    #[inline]
    pub fn is_active(&self, buyer: BuyerId) -> bool {
        self.assignment.held_count(buyer) < self.profile.capacity(buyer)
            && !self.cursors.is_exhausted(self.profile, buyer)
    }

    #[inline]
    pub fn profile(&self) -> &'p PreferenceProfile {
        self.profile
    }

    #[inline]
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    #[inline]
    pub fn cursors(&self) -> &ProposalCursors {
        &self.cursors
    }

    #[inline]
    pub fn stats(&self) -> SolveStats {
        self.stats
    }
}

/// Solve `profile` with buyer-proposing deferred acceptance.
pub fn solve(profile: &PreferenceProfile) -> Assignment {
    MatchingEngine::new(profile).solve().assignment
}
