//! Point-of-interest placement
//!
//! Every kind is placed on its own grid of square regions. Each region holds
//! at most one candidate, rolled from a per-region random stream; a candidate
//! becomes a real point of interest only if the biome under it is viable for
//! the kind.
//!
//! Placement parameters changed between generator versions, so each kind maps
//! to a short list of `(VersionRange, PlacementConfig)` entries. Among the
//! entries whose range contains the version, the one whose range starts latest
//! wins (later entries win ties). A kind with no matching entry does not exist
//! in that version.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::biome::Biome;
use super::sampler::{Sampler, Stage};
use super::seeds::region_seed;
use super::{GenVersion, Pos};

/// World units per chunk; region sizes are given in chunks
pub const CHUNK: i32 = 16;

/// Point-of-interest kind.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    DesertTemple,
    JungleTemple,
    SwampHut,
    Igloo,
    Village,
    Mansion,
    Monument,
    OceanRuin,
    Shipwreck,
    Outpost,
    RuinedPortal,
}

/// How the candidate chunk offset inside a region is rolled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spread {
    /// Uniform over the chunk range
    Linear,
    /// Mean of two uniform rolls, biased toward the region centre
    Triangular,
}

/// Inclusive range of generator versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionRange {
    pub min: GenVersion,
    pub max: GenVersion,
}

impl VersionRange {
    pub const fn between(min: GenVersion, max: GenVersion) -> Self {
        Self { min, max }
    }

    pub const fn since(min: GenVersion) -> Self {
        Self { min, max: GenVersion::Nether }
    }

    pub const fn all() -> Self {
        Self { min: GenVersion::Legacy, max: GenVersion::Nether }
    }

    pub fn contains(&self, version: GenVersion) -> bool {
        self.min <= version && version <= self.max
    }
}

/// Placement parameters of one kind in one version range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementConfig {
    /// Mixed into the region seed so kinds sharing a grid do not collide
    pub salt: u64,
    /// Region edge in chunks
    pub region_chunks: i32,
    /// Candidate chunk offsets are rolled in `[0, chunk_range)`
    pub chunk_range: i32,
    pub spread: Spread,
    /// One region in `chance` holds a candidate (1 = every region)
    pub chance: u32,
}

impl PlacementConfig {
    const fn new(salt: u64, region_chunks: i32, chunk_range: i32) -> Self {
        Self { salt, region_chunks, chunk_range, spread: Spread::Linear, chance: 1 }
    }

    const fn triangular(mut self) -> Self {
        self.spread = Spread::Triangular;
        self
    }

    const fn one_in(mut self, chance: u32) -> Self {
        self.chance = chance;
        self
    }

    /// Region edge in world units.
    pub fn region_size(&self) -> i32 {
        self.region_chunks * CHUNK
    }

    /// Candidate position of region `(rx, rz)`, if the region holds one.
    pub fn candidate(&self, seed: u64, rx: i32, rz: i32) -> Option<Pos> {
        let mut rng = ChaCha8Rng::seed_from_u64(region_seed(seed, rx, rz, self.salt));
        if self.chance > 1 && rng.gen_range(0..self.chance) != 0 {
            return None;
        }

        let range = self.chunk_range.max(1);
        let mut roll = || match self.spread {
            Spread::Linear => rng.gen_range(0..range),
            Spread::Triangular => (rng.gen_range(0..range) + rng.gen_range(0..range)) / 2,
        };
        let cx = rx * self.region_chunks + roll();
        let cz = rz * self.region_chunks + roll();

        Some(Pos::new(cx * CHUNK + CHUNK / 2, cz * CHUNK + CHUNK / 2))
    }
}

pub type PlacementEntry = (VersionRange, PlacementConfig);

const DESERT_TEMPLE: &[PlacementEntry] = &[
    (VersionRange::between(GenVersion::Legacy, GenVersion::Legacy), PlacementConfig::new(0x00DB_1A71, 32, 24)),
    (VersionRange::since(GenVersion::Aquatic), PlacementConfig::new(0x00DB_1A72, 32, 24)),
];

const JUNGLE_TEMPLE: &[PlacementEntry] = &[
    (VersionRange::between(GenVersion::Legacy, GenVersion::Legacy), PlacementConfig::new(0x00DB_1A71, 32, 24)),
    (VersionRange::since(GenVersion::Aquatic), PlacementConfig::new(0x00E5_3B04, 32, 24)),
];

const SWAMP_HUT: &[PlacementEntry] = &[
    (VersionRange::between(GenVersion::Legacy, GenVersion::Legacy), PlacementConfig::new(0x00DB_1A71, 32, 24)),
    (VersionRange::since(GenVersion::Aquatic), PlacementConfig::new(0x00E5_3B05, 32, 24)),
];

const IGLOO: &[PlacementEntry] = &[
    (VersionRange::between(GenVersion::Legacy, GenVersion::Legacy), PlacementConfig::new(0x00DB_1A71, 32, 24)),
    (VersionRange::since(GenVersion::Aquatic), PlacementConfig::new(0x00E5_3B06, 32, 24)),
];

const VILLAGE: &[PlacementEntry] = &[
    (VersionRange::all(), PlacementConfig::new(0x0009_C3A1, 32, 24)),
];

const MANSION: &[PlacementEntry] = &[
    (VersionRange::all(), PlacementConfig::new(0x0A3F_20D1, 80, 60).triangular()),
];

const MONUMENT: &[PlacementEntry] = &[
    (VersionRange::all(), PlacementConfig::new(0x00A4_8E12, 32, 27).triangular()),
];

const OCEAN_RUIN: &[PlacementEntry] = &[
    (VersionRange::between(GenVersion::Aquatic, GenVersion::Pillage), PlacementConfig::new(0x00E2_D5A3, 16, 8)),
    (VersionRange::since(GenVersion::Nether), PlacementConfig::new(0x00E2_D5A3, 20, 12)),
];

const SHIPWRECK: &[PlacementEntry] = &[
    (VersionRange::between(GenVersion::Aquatic, GenVersion::Pillage), PlacementConfig::new(0x0028_A7B4, 15, 7)),
    (VersionRange::since(GenVersion::Nether), PlacementConfig::new(0x0028_A7B4, 24, 20)),
];

const OUTPOST: &[PlacementEntry] = &[
    (VersionRange::since(GenVersion::Pillage), PlacementConfig::new(0x0100_45A6, 32, 24).one_in(5)),
];

const RUINED_PORTAL: &[PlacementEntry] = &[
    (VersionRange::since(GenVersion::Nether), PlacementConfig::new(0x0213_38E7, 40, 25)),
];

/// Pick the placement entry for a version: latest-starting matching range,
/// later entries winning ties.
pub fn select_placement(entries: &[PlacementEntry], version: GenVersion) -> Option<PlacementConfig> {
    let mut best: Option<&PlacementEntry> = None;
    for entry in entries.iter().filter(|(range, _)| range.contains(version)) {
        match best {
            Some((range, _)) if range.min > entry.0.min => {}
            _ => best = Some(entry),
        }
    }
    best.map(|(_, config)| *config)
}

impl PoiKind {
    pub const ALL: [PoiKind; 11] = [
        PoiKind::DesertTemple,
        PoiKind::JungleTemple,
        PoiKind::SwampHut,
        PoiKind::Igloo,
        PoiKind::Village,
        PoiKind::Mansion,
        PoiKind::Monument,
        PoiKind::OceanRuin,
        PoiKind::Shipwreck,
        PoiKind::Outpost,
        PoiKind::RuinedPortal,
    ];

    /// Position in `ALL`
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PoiKind::DesertTemple => "Desert temple",
            PoiKind::JungleTemple => "Jungle temple",
            PoiKind::SwampHut => "Swamp hut",
            PoiKind::Igloo => "Igloo",
            PoiKind::Village => "Village",
            PoiKind::Mansion => "Woodland mansion",
            PoiKind::Monument => "Ocean monument",
            PoiKind::OceanRuin => "Ocean ruin",
            PoiKind::Shipwreck => "Shipwreck",
            PoiKind::Outpost => "Outpost",
            PoiKind::RuinedPortal => "Ruined portal",
        }
    }

    fn entries(&self) -> &'static [PlacementEntry] {
        match self {
            PoiKind::DesertTemple => DESERT_TEMPLE,
            PoiKind::JungleTemple => JUNGLE_TEMPLE,
            PoiKind::SwampHut => SWAMP_HUT,
            PoiKind::Igloo => IGLOO,
            PoiKind::Village => VILLAGE,
            PoiKind::Mansion => MANSION,
            PoiKind::Monument => MONUMENT,
            PoiKind::OceanRuin => OCEAN_RUIN,
            PoiKind::Shipwreck => SHIPWRECK,
            PoiKind::Outpost => OUTPOST,
            PoiKind::RuinedPortal => RUINED_PORTAL,
        }
    }

    /// Placement parameters in a version, `None` if the kind does not exist.
    pub fn placement(&self, version: GenVersion) -> Option<PlacementConfig> {
        select_placement(self.entries(), version)
    }

    /// Whether the biome under `pos` allows this kind.
    pub fn is_viable(&self, sampler: &Sampler, pos: Pos) -> bool {
        let biome = sampler.biome_at_world(Stage::query(), pos);
        self.allows(biome, sampler.version())
    }

    /// Biome rule behind `is_viable`.
    pub fn allows(&self, biome: Biome, version: GenVersion) -> bool {
        match self {
            PoiKind::DesertTemple => biome == Biome::Desert,
            PoiKind::JungleTemple => biome == Biome::Jungle,
            PoiKind::SwampHut => biome == Biome::Swamp,
            PoiKind::Igloo => matches!(biome, Biome::SnowyTundra | Biome::SnowyTaiga),
            PoiKind::Village => {
                matches!(biome, Biome::Plains | Biome::Desert | Biome::Savanna | Biome::Taiga)
                    || (version >= GenVersion::Pillage && biome == Biome::SnowyTundra)
            }
            PoiKind::Mansion => biome == Biome::DarkForest,
            PoiKind::Monument => biome == Biome::DeepOcean,
            PoiKind::OceanRuin => biome.is_ocean(),
            PoiKind::Shipwreck => biome.is_ocean() || biome == Biome::Beach,
            PoiKind::Outpost => matches!(
                biome,
                Biome::Plains | Biome::Desert | Biome::Savanna | Biome::Taiga | Biome::SnowyTundra
            ),
            PoiKind::RuinedPortal => biome != Biome::MushroomFields,
        }
    }
}

impl std::fmt::Display for PoiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
