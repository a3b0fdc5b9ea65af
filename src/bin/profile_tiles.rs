//! Profiling tool for tile generation cost per level and kind

use std::sync::Arc;
use std::time::{Duration, Instant};

use biome_atlas::config::WorldConfig;
use biome_atlas::generator::{GenVersion, PoiKind, Sampler};
use biome_atlas::scheduler::{Scheduler, Task};
use biome_atlas::tile::{GenParams, Tile, TileKind};

/// Tiles generated per level or kind
const SAMPLES: i32 = 4;

fn time_tiles(params: &Arc<GenParams>, kind: TileKind, size: i32) -> Duration {
    let start = Instant::now();
    for i in 0..SAMPLES {
        let tile = Tile::new(Arc::clone(params), kind, size, i - SAMPLES / 2, i % 2);
        tile.run();
    }
    start.elapsed() / SAMPLES as u32
}

fn main() {
    let seed = 1337u64;
    let config = WorldConfig { seed, version: GenVersion::Nether, ..WorldConfig::default() };
    let params = Arc::new(GenParams::new(Arc::new(Sampler::new(config.seed, config.version))));

    println!("=== Tile Profiling ===");
    println!("Seed: {}, version: {}", seed, config.version);
    println!();

    println!("Map tiles ({} samples each):", SAMPLES);
    let mut map_total = Duration::ZERO;
    for level in &config.levels {
        let Ok(stage) = level.stage() else {
            println!("  scale {:>3}: unsupported", level.scale);
            continue;
        };
        let kind = TileKind::Map { pixels: level.pixels, stage };
        let per_tile = time_tiles(&params, kind, level.tile_size());
        map_total += per_tile;
        println!("  scale {:>3} ({}px): {:?} per tile", level.scale, level.pixels, per_tile);
    }

    println!("\nPoint-of-interest tiles ({} world units):", config.poi_tile_size);
    let mut poi_total = Duration::ZERO;
    for kind in PoiKind::ALL {
        let per_tile = time_tiles(&params, TileKind::Poi(kind), config.poi_tile_size);
        poi_total += per_tile;
        println!("  {:<18} {:?} per tile", kind.display_name(), per_tile);
    }

    // Full screen of the finest level through the scheduler
    let Ok(scheduler) = Scheduler::new(0) else {
        println!("\nFailed to build worker pool");
        return;
    };
    let Some(level) = config.levels.first() else {
        return;
    };
    let Ok(stage) = level.stage() else {
        return;
    };
    let kind = TileKind::Map { pixels: level.pixels, stage };
    let start = Instant::now();
    for ti in 0..4 {
        for tj in 0..4 {
            let tile = Arc::new(Tile::new(Arc::clone(&params), kind, level.tile_size(), ti, tj));
            tile.submit(&scheduler);
        }
    }
    scheduler.drain_all();
    let pool_time = start.elapsed();

    println!("\n=== Summary ===");
    println!("Map, all levels:       {:?}", map_total);
    println!("POI, all kinds:        {:?}", poi_total);
    println!("16 tiles on {} threads: {:?}", scheduler.threads(), pool_time);
}
