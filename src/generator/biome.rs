//! Biome ids, classification and colours
//!
//! Classification works on normalized fields in roughly [-1, 1]: elevation
//! (below zero is sea), temperature and moisture.

/// Biome id produced by the sampler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Biome {
    #[default]
    Ocean,
    DeepOcean,
    WarmOcean,
    LukewarmOcean,
    ColdOcean,
    FrozenOcean,
    Beach,
    Plains,
    Desert,
    Savanna,
    Badlands,
    Forest,
    DarkForest,
    Jungle,
    Swamp,
    Taiga,
    SnowyTaiga,
    SnowyTundra,
    Mountains,
    MushroomFields,
}

/// Sea floor depth below which open ocean becomes deep ocean
const DEEP_OCEAN: f32 = -0.35;
/// Shore band above sea level
const BEACH_BAND: f32 = 0.03;
/// Elevation above which land is mountains regardless of climate
const MOUNTAIN: f32 = 0.55;
/// Rarity field threshold for mushroom islands in deep water
const MUSHROOM_RARITY: f32 = 0.72;

impl Biome {
    /// Classify lowland biomes by temperature and moisture only.
    fn classify_lowland(elevation: f32, temperature: f32, moisture: f32) -> Biome {
        match (temperature, moisture) {
            // Freezing
            (t, m) if t < -0.45 => {
                if m > 0.0 { Biome::SnowyTaiga } else { Biome::SnowyTundra }
            }

            // Cold
            (t, m) if t < -0.1 => {
                if m > 0.1 { Biome::Taiga } else { Biome::Plains }
            }

            // Temperate
            (t, m) if t < 0.3 => {
                if m > 0.2 && elevation < 0.08 { Biome::Swamp }
                else if m > 0.35 { Biome::DarkForest }
                else if m > 0.0 { Biome::Forest }
                else { Biome::Plains }
            }

            // Hot
            (_, m) => {
                if m > 0.3 { Biome::Jungle }
                else if m > -0.1 { Biome::Savanna }
                else if elevation > 0.3 { Biome::Badlands }
                else { Biome::Desert }
            }
        }
    }

    fn classify_ocean(temperature: f32, ocean_variants: bool) -> Biome {
        if !ocean_variants {
            return Biome::Ocean;
        }
        match temperature {
            t if t > 0.5 => Biome::WarmOcean,
            t if t > 0.15 => Biome::LukewarmOcean,
            t if t < -0.45 => Biome::FrozenOcean,
            t if t < -0.15 => Biome::ColdOcean,
            _ => Biome::Ocean,
        }
    }

    /// Classify a sample from its climate fields.
    pub fn classify(
        elevation: f32,
        temperature: f32,
        moisture: f32,
        rarity: f32,
        ocean_variants: bool,
    ) -> Biome {
        if elevation < DEEP_OCEAN {
            if rarity > MUSHROOM_RARITY {
                return Biome::MushroomFields;
            }
            return Biome::DeepOcean;
        }
        if elevation < 0.0 {
            return Self::classify_ocean(temperature, ocean_variants);
        }
        if elevation < BEACH_BAND && temperature > -0.45 {
            return Biome::Beach;
        }
        if elevation > MOUNTAIN {
            return Biome::Mountains;
        }
        Self::classify_lowland(elevation, temperature, moisture)
    }

    pub fn is_ocean(&self) -> bool {
        matches!(
            self,
            Biome::Ocean
                | Biome::DeepOcean
                | Biome::WarmOcean
                | Biome::LukewarmOcean
                | Biome::ColdOcean
                | Biome::FrozenOcean
        )
    }

    pub fn is_snowy(&self) -> bool {
        matches!(self, Biome::SnowyTaiga | Biome::SnowyTundra | Biome::FrozenOcean)
    }

    /// Get RGB colour for map rendering
    pub fn color(&self) -> [u8; 3] {
        match self {
            // Ocean
            Biome::Ocean => [0, 0, 112],
            Biome::DeepOcean => [0, 0, 48],
            Biome::WarmOcean => [0, 0, 172],
            Biome::LukewarmOcean => [0, 0, 144],
            Biome::ColdOcean => [32, 32, 112],
            Biome::FrozenOcean => [112, 112, 214],
            Biome::Beach => [250, 222, 85],

            // Dry
            Biome::Plains => [141, 179, 96],
            Biome::Desert => [250, 148, 24],
            Biome::Savanna => [189, 178, 95],
            Biome::Badlands => [217, 69, 21],

            // Wooded
            Biome::Forest => [5, 102, 33],
            Biome::DarkForest => [64, 81, 26],
            Biome::Jungle => [83, 123, 9],
            Biome::Swamp => [7, 249, 178],
            Biome::Taiga => [11, 102, 89],

            // Cold
            Biome::SnowyTaiga => [49, 85, 74],
            Biome::SnowyTundra => [255, 255, 255],
            Biome::Mountains => [96, 96, 96],

            Biome::MushroomFields => [255, 0, 255],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocean_depths() {
        assert_eq!(Biome::classify(-0.8, 0.0, 0.0, 0.0, true), Biome::DeepOcean);
        assert_eq!(Biome::classify(-0.8, 0.0, 0.0, 0.9, true), Biome::MushroomFields);
        assert_eq!(Biome::classify(-0.1, 0.0, 0.0, 0.0, true), Biome::Ocean);
    }

    #[test]
    fn test_ocean_variants_follow_version() {
        assert_eq!(Biome::classify(-0.1, 0.8, 0.0, 0.0, true), Biome::WarmOcean);
        assert_eq!(Biome::classify(-0.1, 0.8, 0.0, 0.0, false), Biome::Ocean);
        assert_eq!(Biome::classify(-0.1, -0.8, 0.0, 0.0, true), Biome::FrozenOcean);
    }

    #[test]
    fn test_lowland_climates() {
        assert_eq!(Biome::classify(0.2, 0.8, -0.5, 0.0, true), Biome::Desert);
        assert_eq!(Biome::classify(0.2, 0.8, 0.6, 0.0, true), Biome::Jungle);
        assert_eq!(Biome::classify(0.05, 0.0, 0.4, 0.0, true), Biome::Swamp);
        assert_eq!(Biome::classify(0.2, -0.8, -0.2, 0.0, true), Biome::SnowyTundra);
        assert_eq!(Biome::classify(0.9, 0.0, 0.0, 0.0, true), Biome::Mountains);
    }

    #[test]
    fn test_colors_distinguish_ocean_from_land() {
        assert_ne!(Biome::Ocean.color(), Biome::Plains.color());
        assert!(Biome::WarmOcean.is_ocean());
        assert!(!Biome::Beach.is_ocean());
    }
}
