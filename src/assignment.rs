//! Assignment - the seller->buyer map and its buyer->sellers inverse.
//!
//! Both views are updated together by every mutation, so they agree after
//! each individual proposal, not only once the solve has finished.
//! `check_consistency` re-derives that agreement from scratch for tests and
//! for the verifier's precondition checks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashSet;

use crate::error::AssignmentError;
use crate::event::Side;
use crate::profile::{BuyerId, PreferenceProfile, SellerId, UNMATCHED};

/// Set of sellers held by one buyer
pub type HeldSet = FxHashSet<SellerId>;

/// Seller->buyer matching with an incrementally maintained inverse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    /// `holders[s]` is the buyer holding seller `s`, or `UNMATCHED`
    holders: Vec<BuyerId>,
    /// `held[b]` is the set of sellers held by buyer `b`
    held: Vec<HeldSet>,
}

impl Assignment {
    /// Create an assignment with every seller unmatched.
    pub fn new(buyer_count: u32, seller_count: u32) -> Self {
        Self {
            holders: vec![UNMATCHED; seller_count as usize],
            held: (0..buyer_count).map(|_| HeldSet::default()).collect(),
        }
    }

    /// Create an empty assignment sized for `profile`.
    pub fn for_profile(profile: &PreferenceProfile) -> Self {
        Self::new(profile.buyer_count(), profile.seller_count())
    }

    /// Build an assignment from the seller->buyer view alone.
    ///
    /// Used to hand externally produced matchings to the verifier.
    pub fn from_holders(
        buyer_count: u32,
        holders: &[Option<BuyerId>],
    ) -> Result<Self, AssignmentError> {
        let mut assignment = Self::new(buyer_count, holders.len() as u32);
        for (seller, holder) in holders.iter().enumerate() {
            if let Some(buyer) = *holder {
                if buyer >= buyer_count {
                    return Err(AssignmentError::BuyerOutOfRange {
                        seller: seller as SellerId,
                        buyer,
                        buyer_count,
                    });
                }
                assignment.hold(seller as SellerId, buyer);
            }
        }
        Ok(assignment)
    }

    #[inline]
    pub fn buyer_count(&self) -> u32 {
        self.held.len() as u32
    }

    #[inline]
    pub fn seller_count(&self) -> u32 {
        self.holders.len() as u32
    }

    /// Buyer currently holding `seller`, if any
    #[inline]
    pub fn holder(&self, seller: SellerId) -> Option<BuyerId> {
        match self.holders[seller as usize] {
            UNMATCHED => None,
            buyer => Some(buyer),
        }
    }

    /// Number of sellers `buyer` holds
    #[inline]
    pub fn held_count(&self, buyer: BuyerId) -> u32 {
        self.held[buyer as usize].len() as u32
    }

    /// Sellers held by `buyer`, unordered
    #[inline]
    pub fn held_set(&self, buyer: BuyerId) -> &HeldSet {
        &self.held[buyer as usize]
    }

    /// Sellers held by `buyer`, ascending by id
    pub fn held_by(&self, buyer: BuyerId) -> Vec<SellerId> {
        let mut sellers: Vec<_> = self.held[buyer as usize].iter().copied().collect();
        sellers.sort_unstable();
        sellers
    }

    #[inline]
    pub fn holds(&self, buyer: BuyerId, seller: SellerId) -> bool {
        self.holders[seller as usize] == buyer
    }

    /// Number of sellers held by somebody
    pub fn matched_count(&self) -> u32 {
        self.holders.iter().filter(|&&b| b != UNMATCHED).count() as u32
    }

    /// Sellers nobody holds, ascending
    pub fn unmatched_sellers(&self) -> impl Iterator<Item = SellerId> + '_ {
        self.holders
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == UNMATCHED)
            .map(|(s, _)| s as SellerId)
    }

    /// Matched `(seller, buyer)` pairs, ascending by seller
    pub fn pairs(&self) -> impl Iterator<Item = (SellerId, BuyerId)> + '_ {
        self.holders
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b != UNMATCHED)
            .map(|(s, &b)| (s as SellerId, b))
    }

    /// The seller->buyer view as options
    pub fn to_holders(&self) -> Vec<Option<BuyerId>> {
        (0..self.seller_count()).map(|s| self.holder(s)).collect()
    }

    /// Make `buyer` the holder of `seller`, returning the displaced buyer.
    pub(crate) fn hold(&mut self, seller: SellerId, buyer: BuyerId) -> Option<BuyerId> {
        let previous = self.release(seller);
        self.holders[seller as usize] = buyer;
        self.held[buyer as usize].insert(seller);
        previous
    }

    /// Unmatch `seller`, returning the buyer that held it.
    pub(crate) fn release(&mut self, seller: SellerId) -> Option<BuyerId> {
        let previous = self.holder(seller)?;
        self.holders[seller as usize] = UNMATCHED;
        self.held[previous as usize].remove(&seller);
        Some(previous)
    }

    // ========================================================================
    // Invariant checks
    // ========================================================================

    /// Verify that the buyer->sellers view is exactly the inverse of the
    /// seller->buyer view.
    pub fn check_consistency(&self) -> Result<(), AssignmentError> {
        let buyer_count = self.buyer_count();
        for (seller, &buyer) in self.holders.iter().enumerate() {
            if buyer != UNMATCHED && buyer >= buyer_count {
                return Err(AssignmentError::BuyerOutOfRange {
                    seller: seller as SellerId,
                    buyer,
                    buyer_count,
                });
            }
        }

        for (buyer, sellers) in self.held.iter().enumerate() {
            for &seller in sellers {
                let holder = self.holders.get(seller as usize).copied();
                if holder != Some(buyer as BuyerId) {
                    return Err(AssignmentError::InconsistentViews {
                        seller,
                        holder: holder.filter(|&b| b != UNMATCHED),
                        recorded: Some(buyer as BuyerId),
                    });
                }
            }
        }

        // Every held seller appears in its holder's set, and the set sizes
        // add up, so no seller is recorded under two buyers.
        let recorded: usize = self.held.iter().map(|s| s.len()).sum();
        if recorded != self.matched_count() as usize {
            for (seller, &buyer) in self.holders.iter().enumerate() {
                if buyer != UNMATCHED && !self.held[buyer as usize].contains(&(seller as SellerId)) {
                    return Err(AssignmentError::InconsistentViews {
                        seller: seller as SellerId,
                        holder: Some(buyer),
                        recorded: None,
                    });
                }
            }
        }

        Ok(())
    }

    /// Verify that this assignment can be read against `profile`: same
    /// population sizes, consistent views, no buyer over capacity.
    pub fn check_against(&self, profile: &PreferenceProfile) -> Result<(), AssignmentError> {
        if self.seller_count() != profile.seller_count() {
            return Err(AssignmentError::DimensionMismatch {
                side: Side::Seller,
                expected: profile.seller_count(),
                found: self.seller_count(),
            });
        }
        if self.buyer_count() != profile.buyer_count() {
            return Err(AssignmentError::DimensionMismatch {
                side: Side::Buyer,
                expected: profile.buyer_count(),
                found: self.buyer_count(),
            });
        }

        self.check_consistency()?;

        for buyer in 0..self.buyer_count() {
            let held = self.held_count(buyer);
            let capacity = profile.capacity(buyer);
            if held > capacity {
                return Err(AssignmentError::CapacityExceeded {
                    buyer,
                    held,
                    capacity,
                });
            }
        }

        Ok(())
    }

    /// Compute a hash of the seller->buyer view (for determinism testing)
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.holders.hash(&mut hasher);
        hasher.finish()
    }
}
