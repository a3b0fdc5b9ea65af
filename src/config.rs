//! World configuration, loadable from JSON.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compose::Marker;
use crate::error::{AtlasError, Result};
use crate::generator::{GenVersion, PoiKind, Stage};

/// One map resolution level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Tile edge in pixels
    pub pixels: u32,
    /// World units per pixel
    pub scale: u32,
}

impl LevelConfig {
    pub fn stage(&self) -> Result<Stage> {
        Stage::from_scale(self.scale).ok_or(AtlasError::UnsupportedScale { scale: self.scale })
    }

    /// Tile edge in world units
    pub fn tile_size(&self) -> i32 {
        (self.pixels * self.scale) as i32
    }
}

/// Which markers are drawn. Everything starts hidden.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub kinds: BTreeSet<PoiKind>,
    pub start_point: bool,
    pub rare_locations: bool,
}

impl Visibility {
    pub fn is_visible(&self, marker: Marker) -> bool {
        match marker {
            Marker::Poi(kind) => self.kinds.contains(&kind),
            Marker::StartPoint => self.start_point,
            Marker::RareLocation => self.rare_locations,
        }
    }

    pub fn set_visible(&mut self, marker: Marker, visible: bool) {
        match marker {
            Marker::Poi(kind) if visible => {
                self.kinds.insert(kind);
            }
            Marker::Poi(kind) => {
                self.kinds.remove(&kind);
            }
            Marker::StartPoint => self.start_point = visible,
            Marker::RareLocation => self.rare_locations = visible,
        }
    }

    pub fn wants_landmarks(&self) -> bool {
        self.start_point || self.rare_locations
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    pub version: GenVersion,
    /// Map levels, finest first
    pub levels: Vec<LevelConfig>,
    /// Edge of point-of-interest tiles in world units
    pub poi_tile_size: i32,
    /// Tiles kept by each eviction cache
    pub cache_capacity: usize,
    /// Higher values switch to finer levels sooner
    pub quality: f64,
    /// Points of interest are shown while the active level is below this
    pub poi_max_level: i32,
    /// Marker edge in screen pixels
    pub icon_size: f64,
    pub visibility: Visibility,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            version: GenVersion::default(),
            levels: Stage::SCALES
                .iter()
                .map(|&scale| LevelConfig { pixels: 512, scale })
                .collect(),
            poi_tile_size: 2048,
            cache_capacity: 100,
            quality: 1.0,
            poi_max_level: 3,
            icon_size: 20.0,
            visibility: Visibility::default(),
        }
    }
}

impl WorldConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: WorldConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(AtlasError::InvalidConfig("at least one map level is required".into()));
        }
        for level in &self.levels {
            level.stage()?;
            if level.pixels == 0 {
                return Err(AtlasError::InvalidConfig("level pixels must be positive".into()));
            }
            if u64::from(level.pixels) * u64::from(level.scale) > i32::MAX as u64 {
                return Err(AtlasError::InvalidConfig(format!(
                    "level {}x{} is too large",
                    level.pixels, level.scale
                )));
            }
        }
        if self.levels.windows(2).any(|pair| pair[0].scale >= pair[1].scale) {
            return Err(AtlasError::InvalidConfig("level scales must increase".into()));
        }
        if self.poi_tile_size <= 0 {
            return Err(AtlasError::InvalidConfig("poi_tile_size must be positive".into()));
        }
        if !(self.quality.is_finite() && self.quality > 0.0) {
            return Err(AtlasError::InvalidConfig(format!("bad quality {}", self.quality)));
        }
        if !(self.icon_size.is_finite() && self.icon_size > 0.0) {
            return Err(AtlasError::InvalidConfig(format!("bad icon size {}", self.icon_size)));
        }
        Ok(())
    }

    pub fn scales(&self) -> Vec<u32> {
        self.levels.iter().map(|l| l.scale).collect()
    }
}
