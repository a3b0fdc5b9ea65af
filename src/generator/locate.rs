//! One-off world searches: the start point and the rare-location rings.
//!
//! Both are deterministic for a sampler's seed and version, and slow enough
//! that callers run them off the interactive thread.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::biome::Biome;
use super::sampler::{Sampler, Stage};
use super::{GenVersion, Pos};

/// Half-edge of the square searched for a start point, in query samples
const START_RADIUS: i32 = 64;
/// Half-edge of the square searched when snapping a rare location to land
const SNAP_RADIUS: i32 = 28;

/// Rare locations per ring, innermost first
const RINGS: [usize; 8] = [3, 6, 10, 15, 21, 28, 36, 9];
const LEGACY_RINGS: [usize; 1] = [3];
/// Inner edge of the first ring and spacing between rings, in world units
const RING_START: f64 = 1280.0;
const RING_SPACING: f64 = 3072.0;
const RING_JITTER: f64 = 1280.0;

fn is_start_biome(biome: Biome) -> bool {
    matches!(
        biome,
        Biome::Plains | Biome::Forest | Biome::Taiga | Biome::Jungle | Biome::Savanna
    )
}

/// Pick a uniformly random sample in a square whose biome passes `accept`,
/// reading one row at a time so `abort`, if given, is honoured between rows.
///
/// Returns `Err(())` on abort, `Ok(None)` if nothing matched.
fn search_square(
    sampler: &Sampler,
    stage: Stage,
    center: (i32, i32),
    radius: i32,
    rng: &mut ChaCha8Rng,
    accept: impl Fn(Biome) -> bool,
    abort: Option<&AtomicBool>,
) -> Result<Option<(i32, i32)>, ()> {
    let width = (radius * 2 + 1) as usize;
    let mut row = vec![Biome::default(); width];
    let mut found = None;
    let mut seen = 0u32;

    for dz in -radius..=radius {
        if abort.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(());
        }
        let z = center.1 + dz;
        sampler.fill_area(stage, &mut row, center.0 - radius, z, width, 1);
        for (i, biome) in row.iter().enumerate() {
            if accept(*biome) {
                // Reservoir sampling keeps the pick uniform without a second pass
                seen += 1;
                if rng.gen_range(0..seen) == 0 {
                    found = Some((center.0 - radius + i as i32, z));
                }
            }
        }
    }

    Ok(found)
}

fn sample_center(stage: Stage, x: i32, z: i32) -> Pos {
    let s = stage.scale as i32;
    Pos::new(x * s + s / 2, z * s + s / 2)
}

/// Find the start point near the origin. Falls back to the origin when no
/// start biome is nearby. Returns `None` only if `abort` was raised.
pub fn find_start_point(sampler: &Sampler, abort: &AtomicBool) -> Option<Pos> {
    let stage = Stage::query();
    let mut rng = ChaCha8Rng::seed_from_u64(sampler.seeds().start);

    match search_square(sampler, stage, (0, 0), START_RADIUS, &mut rng, is_start_biome, Some(abort)) {
        Err(()) => None,
        Ok(Some((x, z))) => Some(sample_center(stage, x, z)),
        Ok(None) => Some(Pos::new(0, 0)),
    }
}

/// Iterator over the rare locations of a world, ring by ring.
///
/// Each location is placed at a jittered distance on its ring, evenly spaced
/// by angle, then snapped to a random land sample nearby if there is one.
pub struct RareLocations<'a> {
    sampler: &'a Sampler,
    rng: ChaCha8Rng,
    rings: &'static [usize],
    ring: usize,
    index: usize,
    angle: f64,
}

impl<'a> RareLocations<'a> {
    pub fn new(sampler: &'a Sampler) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(sampler.seeds().rings);
        let angle = rng.gen_range(0.0..TAU);
        let rings: &'static [usize] = if sampler.version() == GenVersion::Legacy {
            &LEGACY_RINGS
        } else {
            &RINGS
        };
        Self {
            sampler,
            rng,
            rings,
            ring: 0,
            index: 0,
            angle,
        }
    }

    /// Total number of locations this iterator yields.
    pub fn total(&self) -> usize {
        self.rings.iter().sum()
    }
}

impl Iterator for RareLocations<'_> {
    type Item = Pos;

    fn next(&mut self) -> Option<Pos> {
        let count = *self.rings.get(self.ring)?;

        let distance = RING_START + RING_SPACING * self.ring as f64 + self.rng.gen_range(0.0..RING_JITTER);
        let raw = Pos::new(
            (self.angle.cos() * distance).round() as i32,
            (self.angle.sin() * distance).round() as i32,
        );

        let stage = Stage::query();
        let center = stage.sample_of(raw);
        let snapped = search_square(
            self.sampler,
            stage,
            center,
            SNAP_RADIUS,
            &mut self.rng,
            |b| !b.is_ocean(),
            None,
        );
        let pos = match snapped {
            Ok(Some((x, z))) => sample_center(stage, x, z),
            _ => raw,
        };

        self.angle += TAU / count as f64;
        self.index += 1;
        if self.index == count {
            self.index = 0;
            self.ring += 1;
            // Offset the next ring so its locations do not line up with this one
            self.angle += self.rng.gen_range(0.0..TAU);
        }

        Some(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_point_is_deterministic() {
        let sampler = Sampler::new(1234, GenVersion::Nether);
        let abort = AtomicBool::new(false);
        let a = find_start_point(&sampler, &abort).unwrap();
        let b = find_start_point(&sampler, &abort).unwrap();
        assert_eq!(a, b);
        assert!(a.x.abs() <= (START_RADIUS + 1) * 4 && a.z.abs() <= (START_RADIUS + 1) * 4);
    }

    #[test]
    fn test_start_point_honours_abort() {
        let sampler = Sampler::new(1234, GenVersion::Nether);
        let abort = AtomicBool::new(true);
        assert_eq!(find_start_point(&sampler, &abort), None);
    }

    #[test]
    fn test_ring_counts_follow_version() {
        let legacy = Sampler::new(5, GenVersion::Legacy);
        let current = Sampler::new(5, GenVersion::Nether);
        assert_eq!(RareLocations::new(&legacy).total(), 3);
        assert_eq!(RareLocations::new(&legacy).count(), 3);
        assert_eq!(RareLocations::new(&current).total(), 128);
    }

    #[test]
    fn test_first_ring_distance() {
        let sampler = Sampler::new(77, GenVersion::Aquatic);
        let snap = (SNAP_RADIUS as f64 + 1.0) * 4.0 * std::f64::consts::SQRT_2;
        for pos in RareLocations::new(&sampler).take(3) {
            let d = ((pos.x as f64).powi(2) + (pos.z as f64).powi(2)).sqrt();
            assert!(d >= RING_START - snap && d <= RING_START + RING_JITTER + snap, "distance {d}");
        }
    }
}
