//! Stability Verifier - blocking-pair search over a finished assignment.
//!
//! `(b, s)` blocks when `b` does not hold `s`, `s` strictly prefers `b` to
//! its holder (or has none), and `b` either has a free slot or ranks `s`
//! above the worst seller it holds. With capacities above one, "the buyer's
//! match" is a set, so the buyer side is compared against its worst-ranked
//! hold rather than a single partner.
//!
//! Cost is O(B x S): one pass to find each buyer's worst hold, then for each
//! seller a scan of the buyers it ranks above its holder.

use crate::assignment::Assignment;
use crate::error::AssignmentError;
use crate::profile::{BuyerId, PreferenceProfile, SellerId};

/// A buyer and seller who would both rather be matched to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockingPair {
    pub buyer: BuyerId,
    pub seller: SellerId,
}

/// Per-buyer view used by the scan: `None` for a free slot, otherwise the
/// rank of the worst seller held.
fn buyer_thresholds(profile: &PreferenceProfile, assignment: &Assignment) -> Vec<Option<u32>> {
    (0..profile.buyer_count())
        .map(|buyer| {
            if assignment.held_count(buyer) < profile.capacity(buyer) {
                return None;
            }
            assignment
                .held_set(buyer)
                .iter()
                .map(|&seller| profile.buyer_rank(buyer, seller))
                .max()
        })
        .collect()
}

fn scan<F>(profile: &PreferenceProfile, assignment: &Assignment, mut found: F) -> Result<(), AssignmentError>
where
    F: FnMut(BlockingPair) -> bool,
{
    assignment.check_against(profile)?;
    let thresholds = buyer_thresholds(profile, assignment);

    for seller in 0..profile.seller_count() {
        let ranking = profile.seller_ranking(seller);
        let better = match assignment.holder(seller) {
            Some(holder) => &ranking[..profile.seller_rank(seller, holder) as usize],
            None => ranking,
        };

        for &buyer in better {
            let blocks = match thresholds[buyer as usize] {
                None => true,
                Some(worst) => profile.buyer_rank(buyer, seller) < worst,
            };
            if blocks && !found(BlockingPair { buyer, seller }) {
                return Ok(());
            }
        }
    }

    Ok(())
}

/// First blocking pair in seller order, then in that seller's preference
/// order.
pub fn find_blocking_pair(
    profile: &PreferenceProfile,
    assignment: &Assignment,
) -> Result<Option<BlockingPair>, AssignmentError> {
    let mut first = None;
    scan(profile, assignment, |pair| {
        first = Some(pair);
        false
    })?;
    Ok(first)
}

/// Every blocking pair.
pub fn blocking_pairs(
    profile: &PreferenceProfile,
    assignment: &Assignment,
) -> Result<Vec<BlockingPair>, AssignmentError> {
    let mut pairs = Vec::new();
    scan(profile, assignment, |pair| {
        pairs.push(pair);
        true
    })?;
    Ok(pairs)
}

/// Whether `assignment` has no blocking pair under `profile`.
///
/// # Errors
/// Fails if the assignment does not fit the profile (different population
/// sizes, out-of-range buyer, disagreeing views, over-capacity buyer).
pub fn is_stable(profile: &PreferenceProfile, assignment: &Assignment) -> Result<bool, AssignmentError> {
    Ok(find_blocking_pair(profile, assignment)?.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Side;
    use crate::matching::solve;

    /// The seller-side-only check: for each matched seller, look at buyers
    /// it prefers to its holder and compare against a single partner of
    /// theirs. Unmatched sellers and buyers with free slots are invisible
    /// to it.
    fn one_directional_check(profile: &PreferenceProfile, assignment: &Assignment) -> bool {
        for (seller, holder) in assignment.pairs() {
            let ranking = profile.seller_ranking(seller);
            let better = &ranking[..profile.seller_rank(seller, holder) as usize];
            for &buyer in better {
                let partner = match assignment.held_by(buyer).first() {
                    Some(&partner) => partner,
                    None => continue,
                };
                if profile.buyer_rank(buyer, seller) < profile.buyer_rank(buyer, partner) {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn test_two_by_two_stable() {
        let profile = PreferenceProfile::new(
            vec![vec![0, 1], vec![1, 0]],
            vec![vec![0, 1], vec![1, 0]],
            vec![1, 1],
        )
        .unwrap();
        let assignment = solve(&profile);

        assert_eq!(assignment.to_holders(), vec![Some(0), Some(1)]);
        assert_eq!(is_stable(&profile, &assignment), Ok(true));
    }

    #[test]
    fn test_swapped_pairs_block() {
        let profile = PreferenceProfile::new(
            vec![vec![0, 1], vec![1, 0]],
            vec![vec![0, 1], vec![1, 0]],
            vec![1, 1],
        )
        .unwrap();
        let swapped = Assignment::from_holders(2, &[Some(1), Some(0)]).unwrap();

        assert_eq!(is_stable(&profile, &swapped), Ok(false));
        assert_eq!(
            blocking_pairs(&profile, &swapped).unwrap(),
            vec![
                BlockingPair { buyer: 0, seller: 0 },
                BlockingPair { buyer: 1, seller: 1 },
            ]
        );
    }

    #[test]
    fn test_single_buyer_capacity_two() {
        let profile = PreferenceProfile::new(vec![vec![0, 1]], vec![vec![0], vec![0]], vec![2]).unwrap();
        let assignment = solve(&profile);

        assert_eq!(assignment.held_by(0), vec![0, 1]);
        assert_eq!(is_stable(&profile, &assignment), Ok(true));
    }

    #[test]
    fn test_spare_capacity_with_unmatched_seller() {
        // Buyer 0 has capacity 2 but holds only seller 1; seller 0 sits
        // unmatched even though both would take each other. The naive check
        // only walks matched sellers and compares against one partner, so
        // it misses the pair.
        let profile = PreferenceProfile::new(
            vec![vec![0, 1, 2], vec![2, 1, 0]],
            vec![vec![0, 1], vec![1, 0], vec![1, 0]],
            vec![2, 1],
        )
        .unwrap();
        let assignment = Assignment::from_holders(2, &[None, Some(0), Some(1)]).unwrap();

        assert!(one_directional_check(&profile, &assignment));
        assert_eq!(is_stable(&profile, &assignment), Ok(false));
        assert_eq!(
            find_blocking_pair(&profile, &assignment).unwrap(),
            Some(BlockingPair { buyer: 0, seller: 0 })
        );

        let solved = solve(&profile);
        assert_eq!(is_stable(&profile, &solved), Ok(true));
        assert_eq!(solved.held_by(0), vec![0, 1]);
    }

    #[test]
    fn test_worst_hold_not_first_hold() {
        // Buyer 0 is full with sellers 0 and 2. Seller 1 prefers buyer 0 to
        // its holder, and buyer 0 ranks seller 1 above seller 2 but below
        // seller 0. Comparing against an arbitrary single hold (seller 0)
        // hides the block; comparing against the worst hold finds it.
        let profile = PreferenceProfile::new(
            vec![vec![0, 1, 2], vec![1, 0, 2]],
            vec![vec![0, 1], vec![0, 1], vec![0, 1]],
            vec![2, 1],
        )
        .unwrap();
        let assignment = Assignment::from_holders(2, &[Some(0), Some(1), Some(0)]).unwrap();

        assert!(one_directional_check(&profile, &assignment));
        assert_eq!(
            find_blocking_pair(&profile, &assignment).unwrap(),
            Some(BlockingPair { buyer: 0, seller: 1 })
        );
    }

    #[test]
    fn test_full_buyer_preferring_holds_does_not_block() {
        // Seller 1 prefers buyer 0, but buyer 0 is full with sellers it
        // likes more.
        let profile = PreferenceProfile::new(
            vec![vec![0, 2, 1], vec![1, 0, 2]],
            vec![vec![0, 1], vec![0, 1], vec![0, 1]],
            vec![2, 1],
        )
        .unwrap();
        let assignment = Assignment::from_holders(2, &[Some(0), Some(1), Some(0)]).unwrap();

        assert_eq!(is_stable(&profile, &assignment), Ok(true));
        assert!(blocking_pairs(&profile, &assignment).unwrap().is_empty());
    }

    #[test]
    fn test_reverification_is_idempotent() {
        let profile = PreferenceProfile::new(
            vec![vec![1, 0, 2], vec![0, 2, 1], vec![2, 1, 0]],
            vec![vec![2, 0, 1], vec![1, 2, 0], vec![0, 1, 2]],
            vec![1, 1, 1],
        )
        .unwrap();
        let assignment = solve(&profile);
        let profile_before = profile.clone();
        let assignment_before = assignment.clone();

        let first = is_stable(&profile, &assignment);
        let second = is_stable(&profile, &assignment);

        assert_eq!(first, Ok(true));
        assert_eq!(first, second);
        assert_eq!(profile, profile_before);
        assert_eq!(assignment, assignment_before);
    }

    #[test]
    fn test_misuse_is_reported() {
        let profile = PreferenceProfile::new(
            vec![vec![0, 1], vec![1, 0]],
            vec![vec![0, 1], vec![1, 0]],
            vec![1, 1],
        )
        .unwrap();

        let short = Assignment::new(2, 1);
        assert_eq!(
            is_stable(&profile, &short),
            Err(AssignmentError::DimensionMismatch { side: Side::Seller, expected: 2, found: 1 })
        );

        let foreign = Assignment::from_holders(3, &[Some(2), None]).unwrap();
        assert!(matches!(
            is_stable(&profile, &foreign),
            Err(AssignmentError::DimensionMismatch { side: Side::Buyer, .. })
        ));

        let over = Assignment::from_holders(2, &[Some(1), Some(1)]).unwrap();
        assert!(matches!(
            find_blocking_pair(&profile, &over),
            Err(AssignmentError::CapacityExceeded { buyer: 1, .. })
        ));
    }

    #[test]
    fn test_empty_assignment_with_demand_is_unstable() {
        let profile = PreferenceProfile::new(vec![vec![0]], vec![vec![0]], vec![1]).unwrap();
        let empty = Assignment::for_profile(&profile);

        assert_eq!(
            find_blocking_pair(&profile, &empty).unwrap(),
            Some(BlockingPair { buyer: 0, seller: 0 })
        );
    }
}
