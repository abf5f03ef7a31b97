//! Preference Profile - immutable rankings, capacities and rank lookups.
//!
//! Rankings are stored flat (row-major, one row per participant) next to
//! their inverse permutations, so "where does X rank Y" is a single index
//! instead of a linear search through the ranking.

use crate::error::ProfileError;
use crate::event::Side;

/// Buyer identity, an index in `[0, B)`
pub type BuyerId = u32;

/// Seller identity, an index in `[0, S)`
pub type SellerId = u32;

/// Sentinel for "no buyer" in compact holder tables (like a null pointer).
pub const UNMATCHED: u32 = u32::MAX;

/// Largest population a profile accepts; `UNMATCHED` must stay out of range.
pub const MAX_POPULATION: usize = (u32::MAX - 1) as usize;

/// Validated, read-only preferences for one trial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreferenceProfile {
    buyer_count: u32,
    seller_count: u32,
    /// Row `b`: sellers in buyer `b`'s order of preference
    buyer_rankings: Vec<SellerId>,
    /// Row `s`: buyers in seller `s`'s order of preference
    seller_rankings: Vec<BuyerId>,
    /// Row `b`, column `s`: position of seller `s` in buyer `b`'s ranking
    buyer_ranks: Vec<u32>,
    /// Row `s`, column `b`: position of buyer `b` in seller `s`'s ranking
    seller_ranks: Vec<u32>,
    capacities: Vec<u32>,
}

impl PreferenceProfile {
    /// Build a profile, rejecting anything that is not a strict total order
    /// over the opposite population or any capacity outside `1..=S`.
    ///
    /// # Arguments
    /// * `buyer_rankings` - one permutation of `[0, S)` per buyer
    /// * `seller_rankings` - one permutation of `[0, B)` per seller
    /// * `capacities` - one capacity per buyer
    pub fn new(
        buyer_rankings: Vec<Vec<SellerId>>,
        seller_rankings: Vec<Vec<BuyerId>>,
        capacities: Vec<u32>,
    ) -> Result<Self, ProfileError> {
        let buyer_count = population_size(Side::Buyer, buyer_rankings.len())?;
        let seller_count = population_size(Side::Seller, seller_rankings.len())?;

        if capacities.len() != buyer_rankings.len() {
            return Err(ProfileError::CapacityCountMismatch {
                expected: buyer_rankings.len(),
                found: capacities.len(),
            });
        }

        for (buyer, &capacity) in capacities.iter().enumerate() {
            if capacity == 0 || capacity > seller_count {
                return Err(ProfileError::InvalidCapacity {
                    buyer: buyer as BuyerId,
                    capacity,
                    seller_count,
                });
            }
        }

        let (buyer_rankings, buyer_ranks) =
            flatten_rankings(Side::Buyer, &buyer_rankings, seller_count)?;
        let (seller_rankings, seller_ranks) =
            flatten_rankings(Side::Seller, &seller_rankings, buyer_count)?;

        Ok(Self {
            buyer_count,
            seller_count,
            buyer_rankings,
            seller_rankings,
            buyer_ranks,
            seller_ranks,
            capacities,
        })
    }

    /// Number of buyers (`B`)
    #[inline]
    pub fn buyer_count(&self) -> u32 {
        self.buyer_count
    }

    /// Number of sellers (`S`)
    #[inline]
    pub fn seller_count(&self) -> u32 {
        self.seller_count
    }

    /// Maximum number of sellers `buyer` may hold
    #[inline]
    pub fn capacity(&self, buyer: BuyerId) -> u32 {
        self.capacities[buyer as usize]
    }

    #[inline]
    pub fn capacities(&self) -> &[u32] {
        &self.capacities
    }

    /// Sum of all buyer capacities (aggregate demand)
    pub fn total_capacity(&self) -> u64 {
        self.capacities.iter().map(|&c| c as u64).sum()
    }

    /// Sellers in `buyer`'s order of preference, most preferred first
    #[inline]
    pub fn buyer_ranking(&self, buyer: BuyerId) -> &[SellerId] {
        let row = buyer as usize * self.seller_count as usize;
        &self.buyer_rankings[row..row + self.seller_count as usize]
    }

    /// Buyers in `seller`'s order of preference, most preferred first
    #[inline]
    pub fn seller_ranking(&self, seller: SellerId) -> &[BuyerId] {
        let row = seller as usize * self.buyer_count as usize;
        &self.seller_rankings[row..row + self.buyer_count as usize]
    }

    /// Position of `seller` in `buyer`'s ranking (0 = most preferred)
    #[inline]
    pub fn buyer_rank(&self, buyer: BuyerId, seller: SellerId) -> u32 {
        self.buyer_ranks[buyer as usize * self.seller_count as usize + seller as usize]
    }

    /// Position of `buyer` in `seller`'s ranking (0 = most preferred)
    #[inline]
    pub fn seller_rank(&self, seller: SellerId, buyer: BuyerId) -> u32 {
        self.seller_ranks[seller as usize * self.buyer_count as usize + buyer as usize]
    }

    /// Whether `seller` strictly prefers `challenger` to `incumbent`
    #[inline]
    pub fn seller_prefers(&self, seller: SellerId, challenger: BuyerId, incumbent: BuyerId) -> bool {
        self.seller_rank(seller, challenger) < self.seller_rank(seller, incumbent)
    }
}

fn population_size(side: Side, len: usize) -> Result<u32, ProfileError> {
    if len > MAX_POPULATION {
        return Err(ProfileError::PopulationTooLarge { side, size: len });
    }
    Ok(len as u32)
}

/// Check that every row is a permutation of `[0, bound)` and build the flat
/// ranking table together with its inverse.
fn flatten_rankings(
    side: Side,
    rows: &[Vec<u32>],
    bound: u32,
) -> Result<(Vec<u32>, Vec<u32>), ProfileError> {
    let width = bound as usize;
    let mut flat = Vec::with_capacity(rows.len() * width);
    let mut ranks = vec![UNMATCHED; rows.len() * width];

    for (index, row) in rows.iter().enumerate() {
        let index = index as u32;
        if row.len() != width {
            return Err(ProfileError::RankingLength {
                side,
                index,
                expected: bound,
                found: row.len(),
            });
        }

        let inverse = &mut ranks[index as usize * width..(index as usize + 1) * width];
        for (position, &entry) in row.iter().enumerate() {
            if entry >= bound {
                return Err(ProfileError::EntryOutOfRange {
                    side,
                    index,
                    entry,
                    bound,
                });
            }
            let slot = &mut inverse[entry as usize];
            if *slot != UNMATCHED {
                return Err(ProfileError::DuplicateEntry { side, index, entry });
            }
            *slot = position as u32;
        }
        flat.extend_from_slice(row);
    }

    Ok((flat, ranks))
}
