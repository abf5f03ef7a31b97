//! Preference generator - random profiles from an injected RNG.
//!
//! The generator owns no global state: whoever builds it decides where the
//! randomness comes from, so a seeded `ChaCha8Rng` gives reproducible
//! profiles and separate trials can be generated on separate threads.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::ProfileError;
use crate::event::Side;
use crate::profile::PreferenceProfile;

/// How a generated trial is sized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopulationShape {
    /// `count` buyers and `count` sellers, every capacity 1
    OneToOne { count: u32 },
    /// Each buyer wants `1..=max_capacity` sellers; there are exactly as
    /// many sellers as total demand
    Polygamous { buyers: u32, max_capacity: u32 },
    /// Fixed populations; capacities drawn from
    /// `1..=min(max_capacity, sellers)`
    Fixed {
        buyers: u32,
        sellers: u32,
        max_capacity: u32,
    },
}

impl PopulationShape {
    pub fn buyers(&self) -> u32 {
        match *self {
            PopulationShape::OneToOne { count } => count,
            PopulationShape::Polygamous { buyers, .. } => buyers,
            PopulationShape::Fixed { buyers, .. } => buyers,
        }
    }

    /// Reject shapes that can never yield a valid profile.
    pub fn validate(&self) -> Result<(), ProfileError> {
        match *self {
            PopulationShape::Fixed { buyers, sellers: 0, .. } if buyers > 0 => {
                Err(ProfileError::NoSellers { buyers })
            }
            _ => Ok(()),
        }
    }
}

impl Default for PopulationShape {
    fn default() -> Self {
        PopulationShape::Polygamous {
            buyers: 5,
            max_capacity: 3,
        }
    }
}

/// Random profile source.
pub struct ProfileGenerator<R> {
    rng: R,
}

impl<R: Rng> ProfileGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Hand the RNG back, e.g. to keep drawing from the same stream.
    pub fn into_inner(self) -> R {
        self.rng
    }

    /// Draw capacities, then one uniform permutation per participant.
    pub fn generate(&mut self, shape: &PopulationShape) -> Result<PreferenceProfile, ProfileError> {
        shape.validate()?;

        let (capacities, seller_count) = match *shape {
            PopulationShape::OneToOne { count } => (vec![1u32; count as usize], count),
            PopulationShape::Polygamous { buyers, max_capacity } => {
                let upper = max_capacity.max(1);
                let capacities: Vec<u32> = (0..buyers)
                    .map(|_| self.rng.gen_range(1..=upper))
                    .collect();
                let total: u64 = capacities.iter().map(|&c| c as u64).sum();
                let seller_count = u32::try_from(total).map_err(|_| ProfileError::PopulationTooLarge {
                    side: Side::Seller,
                    size: total as usize,
                })?;
                (capacities, seller_count)
            }
            PopulationShape::Fixed {
                buyers,
                sellers,
                max_capacity,
            } => {
                let upper = max_capacity.min(sellers).max(1);
                let capacities: Vec<u32> = (0..buyers).map(|_| self.rng.gen_range(1..=upper)).collect();
                (capacities, sellers)
            }
        };

        let buyer_count = capacities.len() as u32;
        let buyer_rankings = self.permutations(buyer_count, seller_count);
        let seller_rankings = self.permutations(seller_count, buyer_count);

        PreferenceProfile::new(buyer_rankings, seller_rankings, capacities)
    }

    /// `rows` independent shuffles of `[0, width)`
    fn permutations(&mut self, rows: u32, width: u32) -> Vec<Vec<u32>> {
        let mut base: Vec<u32> = (0..width).collect();
        (0..rows)
            .map(|_| {
                base.shuffle(&mut self.rng);
                base.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn generator(seed: u64) -> ProfileGenerator<ChaCha8Rng> {
        ProfileGenerator::new(ChaCha8Rng::seed_from_u64(seed))
    }

    #[test]
    fn test_one_to_one_shape() {
        let profile = generator(1).generate(&PopulationShape::OneToOne { count: 6 }).unwrap();

        assert_eq!(profile.buyer_count(), 6);
        assert_eq!(profile.seller_count(), 6);
        assert!(profile.capacities().iter().all(|&c| c == 1));
    }

    #[test]
    fn test_polygamous_supply_matches_demand() {
        let shape = PopulationShape::Polygamous {
            buyers: 20,
            max_capacity: 3,
        };
        let profile = generator(2).generate(&shape).unwrap();

        assert_eq!(profile.buyer_count(), 20);
        assert_eq!(profile.total_capacity(), profile.seller_count() as u64);
        assert!(profile.capacities().iter().all(|&c| (1..=3).contains(&c)));
    }

    #[test]
    fn test_fixed_shape_caps_capacity() {
        let shape = PopulationShape::Fixed {
            buyers: 10,
            sellers: 2,
            max_capacity: 5,
        };
        let profile = generator(3).generate(&shape).unwrap();

        assert_eq!(profile.seller_count(), 2);
        assert!(profile.capacities().iter().all(|&c| (1..=2).contains(&c)));
    }

    #[test]
    fn test_fixed_shape_without_sellers_rejected() {
        let shape = PopulationShape::Fixed {
            buyers: 3,
            sellers: 0,
            max_capacity: 1,
        };
        assert_eq!(
            generator(4).generate(&shape),
            Err(ProfileError::NoSellers { buyers: 3 })
        );
    }

    #[test]
    fn test_same_seed_same_profile() {
        let shape = PopulationShape::default();
        let a = generator(99).generate(&shape).unwrap();
        let b = generator(99).generate(&shape).unwrap();
        let c = generator(100).generate(&shape).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_max_capacity_treated_as_one() {
        let shape = PopulationShape::Polygamous {
            buyers: 4,
            max_capacity: 0,
        };
        let profile = generator(5).generate(&shape).unwrap();
        assert_eq!(profile.seller_count(), 4);
    }
}
