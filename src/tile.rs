//! Tiles: the unit of deferred map and point-of-interest computation.
//!
//! A tile covers one grid cell `(ti, tj)` of a fixed world size. Map tiles
//! render a biome bitmap; point-of-interest tiles collect the positions of
//! one kind inside their bounds. Output is published once, after it is
//! complete, so readers on other threads either see nothing or all of it.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::trace;

use crate::generator::{Biome, GenVersion, PoiKind, Pos, Sampler, Stage};
use crate::scheduler::{Scheduler, Task, TaskHandle};

/// Generation parameters shared by every tile of a world.
pub struct GenParams {
    pub seed: u64,
    pub version: GenVersion,
    pub sampler: Arc<Sampler>,
}

impl GenParams {
    pub fn new(sampler: Arc<Sampler>) -> Self {
        Self {
            seed: sampler.seed(),
            version: sampler.version(),
            sampler,
        }
    }
}

/// What a tile (and the grid that owns it) computes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileKind {
    /// Biome bitmap of `pixels x pixels`, sampled at the grid's entry stage
    Map { pixels: u32, stage: Stage },
    /// Positions of one point-of-interest kind
    Poi(PoiKind),
}

/// RGB bitmap, row-major, 3 bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileImage {
    pub size: u32,
    pub rgb: Vec<u8>,
}

impl TileImage {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.size + x) * 3) as usize;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileOutput {
    Image(TileImage),
    Positions(Vec<Pos>),
}

pub struct Tile {
    ti: i32,
    tj: i32,
    /// Edge length in world units
    size: i32,
    kind: TileKind,
    params: Arc<GenParams>,
    output: OnceLock<TileOutput>,
    stopped: AtomicBool,
    priority: AtomicU32,
    ticket: Mutex<Option<TaskHandle>>,
}

impl Tile {
    pub fn new(params: Arc<GenParams>, kind: TileKind, size: i32, ti: i32, tj: i32) -> Self {
        Self {
            ti,
            tj,
            size,
            kind,
            params,
            output: OnceLock::new(),
            stopped: AtomicBool::new(false),
            priority: AtomicU32::new(0),
            ticket: Mutex::new(None),
        }
    }

    pub fn ti(&self) -> i32 {
        self.ti
    }

    pub fn tj(&self) -> i32 {
        self.tj
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    /// World-space bounds `(x0, z0, x1, z1)`, half-open.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (
            self.ti * self.size,
            self.tj * self.size,
            (self.ti + 1) * self.size,
            (self.tj + 1) * self.size,
        )
    }

    pub fn is_done(&self) -> bool {
        self.output.get().is_some()
    }

    pub fn output(&self) -> Option<&TileOutput> {
        self.output.get()
    }

    pub fn image(&self) -> Option<&TileImage> {
        match self.output.get() {
            Some(TileOutput::Image(image)) => Some(image),
            _ => None,
        }
    }

    pub fn positions(&self) -> Option<&[Pos]> {
        match self.output.get() {
            Some(TileOutput::Positions(positions)) => Some(positions),
            _ => None,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn set_stopped(&self, stopped: bool) {
        self.stopped.store(stopped, Ordering::Release);
    }

    pub fn priority(&self) -> u32 {
        self.priority.load(Ordering::Relaxed)
    }

    pub fn set_priority(&self, priority: u32) {
        self.priority.store(priority, Ordering::Relaxed);
    }

    /// Queue this tile on the scheduler at its current priority.
    pub fn submit(self: &Arc<Self>, scheduler: &Scheduler) {
        let task: Arc<dyn Task> = Arc::clone(self) as Arc<dyn Task>;
        let handle = scheduler.submit(task, self.priority());
        *self.lock_ticket() = Some(handle);
    }

    /// Take the tile off the scheduler queue if it has not started yet.
    /// On success the tile is marked stopped.
    pub fn try_take(&self, scheduler: &Scheduler) -> bool {
        let mut ticket = self.lock_ticket();
        match *ticket {
            Some(handle) if scheduler.cancel_if_pending(handle) => {
                *ticket = None;
                self.set_stopped(true);
                true
            }
            _ => false,
        }
    }

    /// Whether the tile is still waiting in the scheduler queue.
    pub fn is_queued(&self, scheduler: &Scheduler) -> bool {
        self.lock_ticket().is_some_and(|handle| scheduler.is_pending(handle))
    }

    fn lock_ticket(&self) -> std::sync::MutexGuard<'_, Option<TaskHandle>> {
        self.ticket.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn render_map(&self, pixels: u32, stage: Stage) -> TileOutput {
        let n = pixels as usize;
        let mut biomes = vec![Biome::default(); n * n];
        let x = self.ti * pixels as i32;
        let z = self.tj * pixels as i32;
        self.params.sampler.fill_area(stage, &mut biomes, x, z, n, n);

        let mut rgb = Vec::with_capacity(n * n * 3);
        for biome in &biomes {
            rgb.extend_from_slice(&biome.color());
        }

        TileOutput::Image(TileImage { size: pixels, rgb })
    }

    fn collect_positions(&self, kind: PoiKind) -> TileOutput {
        let Some(config) = kind.placement(self.params.version) else {
            return TileOutput::Positions(Vec::new());
        };

        let (x0, z0, x1, z1) = self.bounds();
        let region = config.region_size();
        // Regions are larger than or unaligned with tiles; scan every region
        // touching the bounds, flooring both edges
        let ri0 = x0.div_euclid(region);
        let rj0 = z0.div_euclid(region);
        let ri1 = (x1 - 1).div_euclid(region);
        let rj1 = (z1 - 1).div_euclid(region);

        let mut positions = Vec::new();
        for ri in ri0..=ri1 {
            for rj in rj0..=rj1 {
                let Some(pos) = config.candidate(self.params.seed, ri, rj) else {
                    continue;
                };
                if pos.x >= x0 && pos.x < x1 && pos.z >= z0 && pos.z < z1
                    && kind.is_viable(&self.params.sampler, pos)
                {
                    positions.push(pos);
                }
            }
        }

        TileOutput::Positions(positions)
    }
}

impl Task for Tile {
    fn run(&self) {
        if self.is_done() || self.is_stopped() {
            return;
        }

        let output = match self.kind {
            TileKind::Map { pixels, stage } => self.render_map(pixels, stage),
            TileKind::Poi(kind) => self.collect_positions(kind),
        };
        trace!(ti = self.ti, tj = self.tj, kind = ?self.kind, "tile computed");
        let _ = self.output.set(output);
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("ti", &self.ti)
            .field("tj", &self.tj)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("done", &self.is_done())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(version: GenVersion) -> Arc<GenParams> {
        Arc::new(GenParams::new(Arc::new(Sampler::new(7, version))))
    }

    fn map_kind(pixels: u32, scale: u32) -> TileKind {
        TileKind::Map { pixels, stage: Stage::from_scale(scale).unwrap() }
    }

    #[test]
    fn test_map_tile_fills_bitmap() {
        let tile = Tile::new(params(GenVersion::Nether), map_kind(16, 64), 16 * 64, -1, 2);
        assert!(!tile.is_done());
        tile.run();

        let image = tile.image().unwrap();
        assert_eq!(image.size, 16);
        assert_eq!(image.rgb.len(), 16 * 16 * 3);
        assert!(tile.positions().is_none());
    }

    #[test]
    fn test_map_tile_matches_sampler() {
        let params = params(GenVersion::Nether);
        let tile = Tile::new(Arc::clone(&params), map_kind(8, 16), 8 * 16, 3, -4);
        tile.run();

        let image = tile.image().unwrap();
        let stage = Stage::from_scale(16).unwrap();
        let biome = params.sampler.biome_at(stage, 3 * 8 + 5, -4 * 8 + 2);
        assert_eq!(image.pixel(5, 2), biome.color());
    }

    #[test]
    fn test_poi_positions_inside_bounds() {
        for (ti, tj) in [(0, 0), (-1, -1), (2, -3)] {
            let tile = Tile::new(params(GenVersion::Nether), TileKind::Poi(PoiKind::RuinedPortal), 2048, ti, tj);
            tile.run();

            let (x0, z0, x1, z1) = tile.bounds();
            let positions = tile.positions().unwrap();
            for pos in positions {
                assert!(pos.x >= x0 && pos.x < x1 && pos.z >= z0 && pos.z < z1);
            }
        }
    }

    #[test]
    fn test_poi_tile_finds_every_viable_candidate() {
        let params = params(GenVersion::Nether);
        let kind = PoiKind::RuinedPortal;
        let config = kind.placement(GenVersion::Nether).unwrap();
        let region = config.region_size();

        // Tiles covering [-4096, 4096) on both axes
        let mut from_tiles = Vec::new();
        for ti in -2..2 {
            for tj in -2..2 {
                let tile = Tile::new(Arc::clone(&params), TileKind::Poi(kind), 2048, ti, tj);
                tile.run();
                from_tiles.extend_from_slice(tile.positions().unwrap());
            }
        }

        let mut expected = Vec::new();
        for ri in (-4096i32).div_euclid(region)..=4095i32.div_euclid(region) {
            for rj in (-4096i32).div_euclid(region)..=4095i32.div_euclid(region) {
                if let Some(pos) = config.candidate(params.seed, ri, rj) {
                    let inside = (-4096..4096).contains(&pos.x) && (-4096..4096).contains(&pos.z);
                    if inside && kind.is_viable(&params.sampler, pos) {
                        expected.push(pos);
                    }
                }
            }
        }

        from_tiles.sort_by_key(|p| (p.x, p.z));
        expected.sort_by_key(|p| (p.x, p.z));
        assert_eq!(from_tiles, expected);
        assert!(!expected.is_empty());
    }

    #[test]
    fn test_missing_kind_yields_empty_result() {
        let tile = Tile::new(params(GenVersion::Legacy), TileKind::Poi(PoiKind::Outpost), 2048, 0, 0);
        tile.run();
        assert!(tile.is_done());
        assert_eq!(tile.positions().unwrap().len(), 0);
    }

    #[test]
    fn test_stopped_tile_does_nothing() {
        let tile = Tile::new(params(GenVersion::Nether), map_kind(4, 256), 4 * 256, 0, 0);
        tile.set_stopped(true);
        tile.run();
        assert!(!tile.is_done());

        tile.set_stopped(false);
        tile.run();
        assert!(tile.is_done());
    }

    #[test]
    fn test_done_tile_is_not_recomputed() {
        let tile = Tile::new(params(GenVersion::Nether), map_kind(4, 256), 4 * 256, 1, 1);
        tile.run();
        let first = tile.output().unwrap() as *const TileOutput;
        tile.run();
        assert_eq!(first, tile.output().unwrap() as *const TileOutput);
    }

    #[test]
    fn test_try_take_marks_stopped() {
        let scheduler = Scheduler::new(1).unwrap();
        scheduler.pause();
        let tile = Arc::new(Tile::new(params(GenVersion::Nether), map_kind(4, 256), 4 * 256, 0, 0));
        assert!(!tile.try_take(&scheduler));

        tile.submit(&scheduler);
        assert!(tile.is_queued(&scheduler));
        assert!(tile.try_take(&scheduler));
        assert!(tile.is_stopped());
        assert!(!tile.is_queued(&scheduler));
        assert!(!tile.try_take(&scheduler));
    }
}
