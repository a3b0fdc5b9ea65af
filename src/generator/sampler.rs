//! Bulk biome sampling
//!
//! A `Sampler` evaluates four fractal noise fields (elevation, temperature,
//! moisture, rarity) in world coordinates and classifies each sample into a
//! `Biome`. A `Stage` selects the sampling scale and how many octaves are
//! evaluated: coarse stages skip the fine octaves they could not resolve
//! anyway, which keeps zoomed-out tiles cheap while staying consistent with
//! the finer levels.

use noise::{NoiseFn, Perlin};

use super::biome::Biome;
use super::seeds::GenSeeds;
use super::{GenVersion, Pos};

/// Wavelengths of the base octave of each field, in world units
const ELEVATION_WAVELENGTH: f64 = 3072.0;
const TEMPERATURE_WAVELENGTH: f64 = 6144.0;
const MOISTURE_WAVELENGTH: f64 = 4096.0;
const RARITY_WAVELENGTH: f64 = 1536.0;

/// Normalized fBm sits well inside [-1, 1]; stretch it back out
const FIELD_GAIN: f64 = 1.6;
/// Pulls the elevation field down so roughly half the world is sea
const SEA_BIAS: f64 = 0.1;

/// Generator entry point for one map scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Stage {
    /// World units per sample
    pub scale: u32,
    /// Noise octaves evaluated at this stage
    pub octaves: u32,
}

impl Stage {
    /// Scales the generator has stages for, finest first.
    pub const SCALES: [u32; 5] = [1, 4, 16, 64, 256];

    /// Look up the stage for a scale. Only the five fixed scales exist.
    pub fn from_scale(scale: u32) -> Option<Stage> {
        let octaves = match scale {
            1 => 6,
            4 => 5,
            16 => 4,
            64 => 3,
            256 => 2,
            _ => return None,
        };
        Some(Stage { scale, octaves })
    }

    /// Stage used for point queries (viability, start point search)
    pub fn query() -> Stage {
        Stage { scale: 4, octaves: 5 }
    }

    /// Sample coordinate containing a world position
    pub fn sample_of(&self, pos: Pos) -> (i32, i32) {
        let s = self.scale as i32;
        (pos.x.div_euclid(s), pos.z.div_euclid(s))
    }
}

/// Biome sampler for one seed and generator version. Immutable once built
/// and shared between worker threads.
pub struct Sampler {
    seeds: GenSeeds,
    version: GenVersion,
    elevation: Perlin,
    temperature: Perlin,
    moisture: Perlin,
    rarity: Perlin,
}

impl Sampler {
    pub fn new(seed: u64, version: GenVersion) -> Self {
        let seeds = GenSeeds::from_world(seed);
        Self {
            elevation: Perlin::new(GenSeeds::noise_seed(seeds.elevation)),
            temperature: Perlin::new(GenSeeds::noise_seed(seeds.temperature)),
            moisture: Perlin::new(GenSeeds::noise_seed(seeds.moisture)),
            rarity: Perlin::new(GenSeeds::noise_seed(seeds.rarity)),
            seeds,
            version,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seeds.world
    }

    pub fn seeds(&self) -> &GenSeeds {
        &self.seeds
    }

    pub fn version(&self) -> GenVersion {
        self.version
    }

    /// Fill `out` with `w * h` biomes, row-major, for sample coordinates
    /// `[x, x + w) x [z, z + h)` at the stage's scale.
    pub fn fill_area(&self, stage: Stage, out: &mut [Biome], x: i32, z: i32, w: usize, h: usize) {
        debug_assert!(out.len() >= w * h, "output buffer too small");
        let scale = stage.scale as f64;
        for (row, line) in out.chunks_mut(w).take(h).enumerate() {
            let wz = (z as f64 + row as f64) * scale + scale * 0.5;
            for (col, cell) in line.iter_mut().enumerate() {
                let wx = (x as f64 + col as f64) * scale + scale * 0.5;
                *cell = self.classify(wx, wz, stage.octaves);
            }
        }
    }

    /// Biome at one sample coordinate.
    pub fn biome_at(&self, stage: Stage, x: i32, z: i32) -> Biome {
        let mut out = [Biome::default()];
        self.fill_area(stage, &mut out, x, z, 1, 1);
        out[0]
    }

    /// Biome of the sample containing a world position.
    pub fn biome_at_world(&self, stage: Stage, pos: Pos) -> Biome {
        let (x, z) = stage.sample_of(pos);
        self.biome_at(stage, x, z)
    }

    fn classify(&self, wx: f64, wz: f64, octaves: u32) -> Biome {
        let elevation = fbm(&self.elevation, wx, wz, ELEVATION_WAVELENGTH, octaves) * FIELD_GAIN - SEA_BIAS;
        let temperature = fbm(&self.temperature, wx, wz, TEMPERATURE_WAVELENGTH, octaves) * FIELD_GAIN;
        let moisture = fbm(&self.moisture, wx, wz, MOISTURE_WAVELENGTH, octaves) * FIELD_GAIN;
        // Rarity is only consulted in deep water; keep it cheap
        let rarity = if elevation < -0.3 {
            fbm(&self.rarity, wx, wz, RARITY_WAVELENGTH, octaves.min(3)) * FIELD_GAIN
        } else {
            0.0
        };

        Biome::classify(
            elevation as f32,
            temperature as f32,
            moisture as f32,
            rarity as f32,
            self.version.has_ocean_variants(),
        )
    }
}

/// Fractal Brownian motion, normalized by total amplitude.
fn fbm(noise: &Perlin, x: f64, z: f64, wavelength: f64, octaves: u32) -> f64 {
    let mut frequency = 1.0 / wavelength;
    let mut amplitude = 1.0;
    let mut sum = 0.0;
    let mut norm = 0.0;
    for _ in 0..octaves {
        sum += noise.get([x * frequency, z * frequency]) * amplitude;
        norm += amplitude;
        frequency *= 2.0;
        amplitude *= 0.5;
    }
    if norm > 0.0 { sum / norm } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_lookup() {
        for scale in Stage::SCALES {
            assert_eq!(Stage::from_scale(scale).unwrap().scale, scale);
        }
        assert!(Stage::from_scale(2).is_none());
        assert!(Stage::from_scale(0).is_none());
        assert!(Stage::from_scale(1).unwrap().octaves > Stage::from_scale(256).unwrap().octaves);
    }

    #[test]
    fn test_sample_of_floors_negative_positions() {
        let stage = Stage::from_scale(4).unwrap();
        assert_eq!(stage.sample_of(Pos::new(-1, 7)), (-1, 1));
        assert_eq!(stage.sample_of(Pos::new(-4, -5)), (-1, -2));
    }

    #[test]
    fn test_fill_area_is_deterministic() {
        let stage = Stage::from_scale(16).unwrap();
        let a = Sampler::new(42, GenVersion::Nether);
        let b = Sampler::new(42, GenVersion::Nether);
        let mut out_a = vec![Biome::default(); 32 * 16];
        let mut out_b = vec![Biome::default(); 32 * 16];
        a.fill_area(stage, &mut out_a, -16, 3, 32, 16);
        b.fill_area(stage, &mut out_b, -16, 3, 32, 16);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_fill_area_matches_point_queries() {
        let stage = Stage::from_scale(64).unwrap();
        let sampler = Sampler::new(9, GenVersion::Aquatic);
        let mut out = vec![Biome::default(); 8 * 4];
        sampler.fill_area(stage, &mut out, 10, -2, 8, 4);
        for row in 0..4 {
            for col in 0..8 {
                let expected = sampler.biome_at(stage, 10 + col as i32, -2 + row as i32);
                assert_eq!(out[row * 8 + col], expected);
            }
        }
    }

    #[test]
    fn test_world_has_land_and_sea() {
        let stage = Stage::from_scale(256).unwrap();
        let sampler = Sampler::new(1, GenVersion::Nether);
        let mut out = vec![Biome::default(); 64 * 64];
        sampler.fill_area(stage, &mut out, -32, -32, 64, 64);
        assert!(out.iter().any(|b| b.is_ocean()));
        assert!(out.iter().any(|b| !b.is_ocean()));
    }
}
