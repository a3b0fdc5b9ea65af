//! The world cache: every grid of one world, composed into frames.
//!
//! `WorldCache` owns one map grid per resolution level and one grid per
//! point-of-interest kind. Each frame it decides which grids the zoom level
//! needs, moves their windows over the viewport, collapses the others, draws
//! whatever tiles are finished, and trims the eviction caches. Nothing on the
//! frame path waits for a worker.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::EvictionCache;
use crate::compose::{Canvas, FrameStats, Marker, ScreenRect, Selection, Viewport};
use crate::config::WorldConfig;
use crate::error::Result;
use crate::generator::{PoiKind, Pos, Sampler};
use crate::grid::TileGrid;
use crate::landmarks::{LandmarkTask, Landmarks, Phase};
use crate::scheduler::Scheduler;
use crate::tile::{GenParams, TileKind};

/// Highlighted markers are drawn this much larger than normal ones
const HIGHLIGHT_SCALE: f64 = 1.5;
/// Closest zoom, in screen pixels per world unit
const MAX_ZOOM: f64 = 64.0;
/// At the farthest zoom the coarsest level is this far past its threshold
const MIN_ZOOM_DIVISOR: f64 = 8.0;

/// Pick the finest map level worth drawing at `zoom` (pixels per world unit).
///
/// Returns -1 when even the finest level is coarser than the screen, in which
/// case only level 0 is drawn. `scales` must be ascending.
pub fn select_active_level(zoom: f64, quality: f64, scales: &[u32]) -> i32 {
    let Some(&finest) = scales.first() else {
        return -1;
    };
    if zoom >= quality / finest as f64 {
        return -1;
    }
    scales
        .iter()
        .skip(1)
        .position(|&scale| zoom >= quality / scale as f64)
        .map_or(scales.len() as i32 - 1, |k| k as i32)
}

pub struct WorldCache {
    config: WorldConfig,
    scheduler: Arc<Scheduler>,
    sampler: Arc<Sampler>,
    /// Map grids, finest first
    levels: Vec<TileGrid>,
    /// One grid per kind, in `PoiKind::ALL` order
    poi_grids: Vec<TileGrid>,
    map_cache: EvictionCache,
    poi_cache: EvictionCache,
    landmarks: Arc<Landmarks>,
    active: i32,
    query: Option<(f64, f64)>,
    selection: Option<Selection>,
}

impl WorldCache {
    pub fn new(config: WorldConfig, scheduler: Arc<Scheduler>) -> Result<Self> {
        config.validate()?;

        let sampler = Arc::new(Sampler::new(config.seed, config.version));
        let params = Arc::new(GenParams::new(Arc::clone(&sampler)));

        let levels = config
            .levels
            .iter()
            .map(|level| -> Result<TileGrid> {
                let kind = TileKind::Map { pixels: level.pixels, stage: level.stage()? };
                Ok(TileGrid::new(Arc::clone(&params), kind, level.tile_size()))
            })
            .collect::<Result<Vec<_>>>()?;

        let poi_grids = PoiKind::ALL
            .iter()
            .map(|&kind| TileGrid::new(Arc::clone(&params), TileKind::Poi(kind), config.poi_tile_size))
            .collect();

        info!(
            seed = config.seed,
            version = %config.version,
            levels = levels.len(),
            threads = scheduler.threads(),
            "world created"
        );

        Ok(Self {
            config,
            scheduler,
            sampler,
            levels,
            poi_grids,
            map_cache: EvictionCache::new(),
            poi_cache: EvictionCache::new(),
            landmarks: Arc::new(Landmarks::default()),
            active: 0,
            query: None,
            selection: None,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn level(&self, index: usize) -> Option<&TileGrid> {
        self.levels.get(index)
    }

    pub fn poi_grid(&self, kind: PoiKind) -> &TileGrid {
        &self.poi_grids[kind.index()]
    }

    /// Active level chosen by the last frame
    pub fn active_level(&self) -> i32 {
        self.active
    }

    pub fn quality(&self) -> f64 {
        self.config.quality
    }

    pub fn set_quality(&mut self, quality: f64) {
        if quality.is_finite() && quality > 0.0 {
            self.config.quality = quality;
        }
    }

    /// Zoom range frames are drawn at. The far end keeps the coarsest
    /// level's window a bounded number of tiles across.
    pub fn zoom_limits(&self) -> (f64, f64) {
        let coarsest = self.config.levels.last().map_or(1, |level| level.scale);
        let min = self.config.quality / (coarsest as f64 * MIN_ZOOM_DIVISOR);
        (min, MAX_ZOOM.max(min))
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        let (min, max) = self.zoom_limits();
        if zoom.is_nan() {
            min
        } else {
            zoom.clamp(min, max)
        }
    }

    pub fn is_visible(&self, marker: Marker) -> bool {
        self.config.visibility.is_visible(marker)
    }

    pub fn set_visible(&mut self, marker: Marker, visible: bool) {
        self.config.visibility.set_visible(marker, visible);
    }

    pub fn start_point(&self) -> Phase<'_, Pos> {
        self.landmarks.start.phase()
    }

    pub fn rare_locations(&self) -> Phase<'_, Vec<Pos>> {
        self.landmarks.rare.phase()
    }

    /// Ask the next frame to select the marker under screen point `(sx, sy)`.
    pub fn select_at(&mut self, sx: f64, sy: f64) {
        self.query = Some((sx, sy));
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Tiles held by the map and point-of-interest eviction caches.
    pub fn cached_tiles(&self) -> (usize, usize) {
        (self.map_cache.len(), self.poi_cache.len())
    }

    fn pois_active(&self) -> bool {
        self.active < self.config.poi_max_level
    }

    fn is_active_level(&self, index: usize) -> bool {
        let index = index as i32;
        index == self.active || index == self.active + 1
    }

    /// Move every grid's window for this viewport. Inactive grids are
    /// collapsed onto the origin, releasing their tiles to the caches.
    fn update_grids(&mut self, view: &Viewport) {
        let (min_x, min_z, max_x, max_z) = view.world_bounds();

        for index in (0..self.levels.len()).rev() {
            let active = self.is_active_level(index);
            let grid = &mut self.levels[index];
            if active {
                grid.update(&mut self.map_cache, &self.scheduler, min_x, min_z, max_x, max_z);
            } else {
                grid.update(&mut self.map_cache, &self.scheduler, 0.0, 0.0, 0.0, 0.0);
            }
        }

        let pois_active = self.pois_active();
        for (kind, grid) in PoiKind::ALL.iter().zip(self.poi_grids.iter_mut()) {
            if pois_active && self.config.visibility.is_visible(Marker::Poi(*kind)) {
                grid.update(&mut self.poi_cache, &self.scheduler, min_x, min_z, max_x, max_z);
            } else {
                grid.update(&mut self.poi_cache, &self.scheduler, 0.0, 0.0, 0.0, 0.0);
            }
        }
    }

    fn ensure_landmarks(&self) {
        if self.config.visibility.wants_landmarks() && self.landmarks.begin() {
            debug!("starting landmark search");
            let task = LandmarkTask {
                landmarks: Arc::clone(&self.landmarks),
                sampler: Arc::clone(&self.sampler),
            };
            self.scheduler.submit(Arc::new(task), 0);
        }
    }

    /// Compose one frame into `canvas`.
    ///
    /// The viewport's zoom is clamped to `zoom_limits`.
    pub fn frame<C: Canvas + ?Sized>(&mut self, view: &Viewport, canvas: &mut C) -> FrameStats {
        let view = &Viewport { zoom: self.clamp_zoom(view.zoom), ..*view };
        self.active = select_active_level(view.zoom, self.config.quality, &self.config.scales());
        self.update_grids(view);

        let mut stats = FrameStats::default();

        // Coarse level first so the finer one draws over it
        for index in [self.active + 1, self.active] {
            let Some(grid) = usize::try_from(index).ok().and_then(|i| self.levels.get(i)) else {
                continue;
            };
            let size = grid.tile_size() as f64;
            for tile in grid.tiles() {
                match tile.image() {
                    Some(image) => {
                        let rect = view.square(tile.ti() as f64 * size, tile.tj() as f64 * size, size);
                        canvas.draw_image(image, rect);
                        canvas.draw_outline(rect);
                        stats.tiles_drawn += 1;
                    }
                    None => stats.tiles_outstanding += 1,
                }
            }
        }

        let query = self.query.take();
        let mut hit = None;
        let icon = self.config.icon_size;
        let mut place = |canvas: &mut C, stats: &mut FrameStats, marker: Marker, pos: Pos| {
            let (x, y) = view.to_screen(pos.x as f64, pos.z as f64);
            canvas.draw_marker(marker, x, y, icon);
            stats.markers_drawn += 1;
            if let Some((qx, qy)) = query {
                if ScreenRect::centered(x, y, icon).contains(qx, qy) {
                    hit = Some(Selection { marker, pos });
                }
            }
        };

        if self.pois_active() {
            for (kind, grid) in PoiKind::ALL.iter().zip(&self.poi_grids) {
                let marker = Marker::Poi(*kind);
                if !self.config.visibility.is_visible(marker) {
                    continue;
                }
                stats.tiles_outstanding += grid.outstanding();
                for &pos in grid.tiles().filter_map(|t| t.positions()).flatten() {
                    let (x, y) = view.to_screen(pos.x as f64, pos.z as f64);
                    if view.contains_screen(x, y) {
                        place(&mut *canvas, &mut stats, marker, pos);
                    }
                }
            }
        }

        if self.config.visibility.start_point {
            if let Phase::Ready(&pos) = self.landmarks.start.phase() {
                place(&mut *canvas, &mut stats, Marker::StartPoint, pos);
            }
        }
        if self.config.visibility.rare_locations {
            if let Phase::Ready(locations) = self.landmarks.rare.phase() {
                for &pos in locations {
                    place(&mut *canvas, &mut stats, Marker::RareLocation, pos);
                }
            }
        }

        self.ensure_landmarks();

        // A query that hits nothing keeps the previous selection
        if let Some(selection) = hit {
            debug!(marker = %selection.marker, pos = %selection.pos, "marker selected");
            self.selection = Some(selection);
        }
        if let Some(selection) = &self.selection {
            let (x, y) = view.to_screen(selection.pos.x as f64, selection.pos.z as f64);
            canvas.draw_highlight(selection, x, y, icon * HIGHLIGHT_SCALE);
        }

        self.clean_caches();
        stats
    }

    /// Trim both eviction caches to the configured capacity.
    pub fn clean_caches(&mut self) {
        let capacity = self.config.cache_capacity;
        let maps = self.map_cache.clean(capacity, &self.scheduler);
        let pois = self.poi_cache.clean(capacity, &self.scheduler);
        if maps + pois > 0 {
            debug!(
                maps,
                pois,
                map_cache = self.map_cache.len(),
                poi_cache = self.poi_cache.len(),
                "eviction caches trimmed"
            );
        }
    }
}

impl Drop for WorldCache {
    fn drop(&mut self) {
        // Tiles must outlive any worker still computing them
        self.landmarks.close();
        self.scheduler.clear_pending();
        self.scheduler.drain_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelConfig;
    use crate::generator::GenVersion;
    use crate::scheduler::Task;
    use crate::tile::TileImage;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        images: Vec<ScreenRect>,
        markers: Vec<(Marker, f64, f64)>,
        highlights: Vec<(Selection, f64)>,
    }

    impl Canvas for Recorder {
        fn draw_image(&mut self, _image: &TileImage, rect: ScreenRect) {
            self.images.push(rect);
        }

        fn draw_outline(&mut self, _rect: ScreenRect) {}

        fn draw_marker(&mut self, marker: Marker, cx: f64, cy: f64, _size: f64) {
            self.markers.push((marker, cx, cy));
        }

        fn draw_highlight(&mut self, selection: &Selection, _cx: f64, _cy: f64, size: f64) {
            self.highlights.push((*selection, size));
        }
    }

    fn small_config(version: GenVersion) -> WorldConfig {
        WorldConfig {
            seed: 2024,
            version,
            levels: [1, 4, 16, 64, 256]
                .into_iter()
                .map(|scale| LevelConfig { pixels: 16, scale })
                .collect(),
            ..WorldConfig::default()
        }
    }

    fn world(config: WorldConfig) -> WorldCache {
        let scheduler = Arc::new(Scheduler::new(2).unwrap());
        WorldCache::new(config, scheduler).unwrap()
    }

    fn view(zoom: f64) -> Viewport {
        Viewport { width: 256, height: 256, focus_x: 0.0, focus_z: 0.0, zoom }
    }

    fn frames_until(world: &mut WorldCache, view: &Viewport, done: impl Fn(&WorldCache, &FrameStats) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(60);
        loop {
            let stats = world.frame(view, &mut Recorder::default());
            if done(world, &stats) {
                return;
            }
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_active_level_thresholds() {
        let scales = [1, 4, 16, 64, 256];
        assert_eq!(select_active_level(2.0, 1.0, &scales), -1);
        assert_eq!(select_active_level(1.0, 1.0, &scales), -1);
        assert_eq!(select_active_level(0.5, 1.0, &scales), 0);
        assert_eq!(select_active_level(0.25, 1.0, &scales), 0);
        assert_eq!(select_active_level(0.1, 1.0, &scales), 1);
        assert_eq!(select_active_level(0.004, 1.0, &scales), 3);
        assert_eq!(select_active_level(0.001, 1.0, &scales), 4);
        // Higher quality needs more zoom for the same level
        assert_eq!(select_active_level(0.5, 2.0, &scales), 0);
        assert_eq!(select_active_level(0.3, 2.0, &scales), 1);
    }

    #[test]
    fn test_unsupported_scale_is_rejected() {
        let mut config = small_config(GenVersion::Nether);
        config.levels[0].scale = 2;
        let scheduler = Arc::new(Scheduler::new(1).unwrap());
        assert!(WorldCache::new(config, scheduler).is_err());
    }

    #[test]
    fn test_inactive_grids_collapse_to_origin() {
        let mut world = world(small_config(GenVersion::Nether));
        world.frame(&view(0.05), &mut Recorder::default());
        assert_eq!(world.active_level(), 2);

        let origin = crate::grid::Window::new(0, 0, 1, 1);
        assert_eq!(world.level(0).unwrap().window(), origin);
        assert_eq!(world.level(1).unwrap().window(), origin);
        assert!(world.level(2).unwrap().window().area() > 1);
        assert!(world.level(3).unwrap().window().area() > 1);
        assert_eq!(world.level(4).unwrap().window(), origin);
        // Nothing is visible, so no point-of-interest grid is active
        assert_eq!(world.poi_grid(PoiKind::Village).window(), origin);
    }

    #[test]
    fn test_frames_complete_and_draw_coarse_first() {
        let mut world = world(small_config(GenVersion::Nether));
        let view = view(0.05);
        frames_until(&mut world, &view, |_, stats| stats.is_complete());

        let mut canvas = Recorder::default();
        let stats = world.frame(&view, &mut canvas);
        assert!(stats.is_complete());
        assert_eq!(stats.tiles_drawn, canvas.images.len());

        let coarse = world.level(3).unwrap().window().area();
        let fine = world.level(2).unwrap().window().area();
        assert_eq!(stats.tiles_drawn, coarse + fine);
        // 16 px at scale 64 is 1024 units, 51.2 px at this zoom
        assert!(canvas.images[..coarse].iter().all(|r| (r.w - 51.2).abs() < 1e-6));
        assert!(canvas.images[coarse..].iter().all(|r| (r.w - 12.8).abs() < 1e-6));
    }

    #[test]
    fn test_points_of_interest_only_near_enough() {
        let mut config = small_config(GenVersion::Nether);
        config.visibility.kinds.insert(PoiKind::RuinedPortal);
        let mut world = world(config);

        world.frame(&view(0.05), &mut Recorder::default());
        assert!(world.poi_grid(PoiKind::RuinedPortal).window().area() > 1);
        assert_eq!(world.poi_grid(PoiKind::Village).window().area(), 1);

        // Active level 3 is past the cutoff
        world.frame(&view(0.01), &mut Recorder::default());
        assert_eq!(world.active_level(), 3);
        assert_eq!(world.poi_grid(PoiKind::RuinedPortal).window().area(), 1);
    }

    #[test]
    fn test_markers_stay_on_screen() {
        let mut config = small_config(GenVersion::Nether);
        config.visibility.kinds.insert(PoiKind::RuinedPortal);
        let mut world = world(config);
        let view = view(0.02);
        frames_until(&mut world, &view, |_, stats| stats.is_complete());

        let mut canvas = Recorder::default();
        let stats = world.frame(&view, &mut canvas);
        assert_eq!(stats.markers_drawn, canvas.markers.len());
        for (marker, x, y) in &canvas.markers {
            assert_eq!(*marker, Marker::Poi(PoiKind::RuinedPortal));
            assert!(view.contains_screen(*x, *y));
        }
    }

    #[test]
    fn test_landmarks_become_ready() {
        let mut config = small_config(GenVersion::Legacy);
        config.visibility.start_point = true;
        let mut world = world(config);
        assert_eq!(world.start_point(), Phase::NotStarted);

        world.frame(&view(0.05), &mut Recorder::default());
        assert_ne!(world.start_point(), Phase::NotStarted);

        frames_until(&mut world, &view(0.05), |w, _| {
            w.start_point().ready().is_some() && w.rare_locations().ready().is_some()
        });
        assert_eq!(world.rare_locations().ready().map(Vec::len), Some(3));
    }

    #[test]
    fn test_selection_hits_and_misses() {
        let mut config = small_config(GenVersion::Legacy);
        config.visibility.start_point = true;
        let mut world = world(config);
        let view = view(0.05);
        frames_until(&mut world, &view, |w, _| w.start_point().ready().is_some());
        let start = *world.start_point().ready().unwrap();

        let (x, y) = view.to_screen(start.x as f64, start.z as f64);
        world.select_at(x + 3.0, y - 3.0);
        let mut canvas = Recorder::default();
        world.frame(&view, &mut canvas);
        let expected = Selection { marker: Marker::StartPoint, pos: start };
        assert_eq!(world.selection(), Some(expected));
        assert_eq!(canvas.highlights, vec![(expected, 30.0)]);

        // The selection persists without a new query
        world.frame(&view, &mut Recorder::default());
        assert_eq!(world.selection(), Some(expected));

        // A query away from every marker leaves it in place
        world.select_at(x + 100.0, y + 100.0);
        let mut canvas = Recorder::default();
        world.frame(&view, &mut canvas);
        assert_eq!(world.selection(), Some(expected));
        assert_eq!(canvas.highlights.len(), 1);

        world.clear_selection();
        let mut canvas = Recorder::default();
        world.frame(&view, &mut canvas);
        assert_eq!(world.selection(), None);
        assert!(canvas.highlights.is_empty());
    }

    fn paused_world(config: WorldConfig) -> WorldCache {
        let scheduler = Arc::new(Scheduler::new(1).unwrap());
        scheduler.pause();
        WorldCache::new(config, scheduler).unwrap()
    }

    #[test]
    fn test_zoom_is_clamped() {
        let world = paused_world(WorldConfig::default());
        let (min, max) = world.zoom_limits();
        assert_eq!(min, 1.0 / 2048.0);
        assert_eq!(world.clamp_zoom(0.0), min);
        assert_eq!(world.clamp_zoom(-3.0), min);
        assert_eq!(world.clamp_zoom(f64::NAN), min);
        assert_eq!(world.clamp_zoom(f64::INFINITY), max);
        assert_eq!(world.clamp_zoom(0.25), 0.25);
    }

    #[test]
    fn test_farthest_zoom_keeps_windows_bounded() {
        let mut world = paused_world(WorldConfig::default());
        let far = Viewport { width: 1024, height: 768, focus_x: 0.0, focus_z: 0.0, zoom: 0.0 };

        for zoom in [0.0, -1.0, 1e-5, f64::NAN, 1.0 / 2048.0] {
            world.frame(&Viewport { zoom, ..far }, &mut Recorder::default());
            assert_eq!(world.active_level(), 4);
            let window = world.level(4).unwrap().window();
            // 1024 px at 2048 units per px over 131072-unit tiles, padded
            assert!(window.width <= 32 && window.height <= 32, "{window:?}");
            assert_eq!(world.level(3).unwrap().window().area(), 1);
        }
        assert!(world.scheduler().pending_len() <= 32 * 32 + 1);
    }

    struct Slow {
        started: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
    }

    impl Task for Slow {
        fn run(&self) {
            self.started.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_drop_waits_for_running_work() {
        let world = world(small_config(GenVersion::Nether));
        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        world.scheduler().submit(
            Arc::new(Slow { started: Arc::clone(&started), finished: Arc::clone(&finished) }),
            0,
        );

        let deadline = Instant::now() + Duration::from_secs(10);
        while !started.load(Ordering::SeqCst) {
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
        drop(world);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_caches_respect_capacity() {
        let mut config = small_config(GenVersion::Nether);
        config.cache_capacity = 20;
        let mut world = world(config);

        for step in 0..10 {
            let mut v = view(0.05);
            v.focus_x = step as f64 * 20_000.0;
            world.frame(&v, &mut Recorder::default());
            world.scheduler().drain_all();
        }
        world.clean_caches();
        let (maps, pois) = world.cached_tiles();
        assert!(maps <= 20);
        assert_eq!(pois, 0);
    }
}
