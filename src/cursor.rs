//! Proposal cursors - one read position per buyer over its ranking.
//!
//! A cursor only moves forward, so everything before it is exactly the set
//! of sellers the buyer has already proposed to.

use crate::profile::{BuyerId, PreferenceProfile, SellerId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalCursors {
    positions: Vec<u32>,
}

impl ProposalCursors {
    /// All cursors at the start of their rankings.
    pub fn new(buyer_count: u32) -> Self {
        Self {
            positions: vec![0; buyer_count as usize],
        }
    }

    /// Number of sellers `buyer` has proposed to so far
    #[inline]
    pub fn position(&self, buyer: BuyerId) -> u32 {
        self.positions[buyer as usize]
    }

    #[inline]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Whether `buyer` has proposed to every seller
    #[inline]
    pub fn is_exhausted(&self, profile: &PreferenceProfile, buyer: BuyerId) -> bool {
        self.position(buyer) >= profile.seller_count()
    }

    /// Whether `buyer` already proposed to `seller`.
    #[inline]
    pub fn has_proposed(&self, profile: &PreferenceProfile, buyer: BuyerId, seller: SellerId) -> bool {
        profile.buyer_rank(buyer, seller) < self.position(buyer)
    }

    /// Peek at `buyer`'s next seller without consuming it.
    #[inline]
    pub fn peek(&self, profile: &PreferenceProfile, buyer: BuyerId) -> Option<SellerId> {
        profile
            .buyer_ranking(buyer)
            .get(self.position(buyer) as usize)
            .copied()
    }

    /// Take `buyer`'s next seller and its rank, advancing the cursor.
    #[inline]
    pub fn advance(&mut self, profile: &PreferenceProfile, buyer: BuyerId) -> Option<(SellerId, u32)> {
        let rank = self.position(buyer);
        let seller = self.peek(profile, buyer)?;
        self.positions[buyer as usize] = rank + 1;
        Some((seller, rank))
    }
}
