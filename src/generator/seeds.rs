//! Seed derivation for the generator
//!
//! Every noise field and placement stream gets its own seed derived from the
//! world seed, so changing one system's algorithm never shifts another's output.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seeds for each generator system, derived from one world seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenSeeds {
    /// World seed as configured
    pub world: u64,
    /// Continent/ocean elevation field
    pub elevation: u64,
    /// Temperature field
    pub temperature: u64,
    /// Moisture field
    pub moisture: u64,
    /// Rare island field (mushroom fields)
    pub rarity: u64,
    /// Start point search order
    pub start: u64,
    /// Rare-location ring angles and distances
    pub rings: u64,
}

impl GenSeeds {
    pub fn from_world(world: u64) -> Self {
        Self {
            world,
            elevation: derive_seed(world, "elevation"),
            temperature: derive_seed(world, "temperature"),
            moisture: derive_seed(world, "moisture"),
            rarity: derive_seed(world, "rarity"),
            start: derive_seed(world, "start"),
            rings: derive_seed(world, "rings"),
        }
    }

    /// Noise seeds are 32-bit; fold the upper half in rather than truncating.
    pub fn noise_seed(seed: u64) -> u32 {
        (seed ^ (seed >> 32)) as u32
    }
}

fn derive_seed(world: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    world.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

/// Seed for one placement region of one structure salt.
///
/// A cheap integer mix (splitmix64 finalizer) since this runs once per region
/// per tile and must not allocate.
pub fn region_seed(world: u64, rx: i32, rz: i32, salt: u64) -> u64 {
    let mut h = world
        ^ (rx as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (rz as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ salt.wrapping_mul(0x1656_67B1_9E37_79F9);
    h ^= h >> 30;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^ (h >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        let a = GenSeeds::from_world(12345);
        let b = GenSeeds::from_world(12345);
        assert_eq!(a, b);
    }

    #[test]
    fn test_systems_get_different_seeds() {
        let seeds = GenSeeds::from_world(12345);
        assert_ne!(seeds.elevation, seeds.temperature);
        assert_ne!(seeds.temperature, seeds.moisture);
        assert_ne!(seeds.start, seeds.rings);
    }

    #[test]
    fn test_region_seed_varies_per_region() {
        let base = region_seed(7, 0, 0, 1);
        assert_ne!(base, region_seed(7, 1, 0, 1));
        assert_ne!(base, region_seed(7, 0, 1, 1));
        assert_ne!(base, region_seed(7, 0, 0, 2));
        assert_ne!(region_seed(7, -1, 0, 1), region_seed(7, 1, 0, 1));
        assert_eq!(base, region_seed(7, 0, 0, 1));
    }
}
