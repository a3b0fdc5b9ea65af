//! Windowed tile grids.
//!
//! A grid materializes a rectangle of tiles at one tile size and content
//! kind. When the viewport moves it relocates the tiles it keeps, hands the
//! rest to the eviction cache, takes back matching tiles from the cache and
//! schedules whatever is still missing, nearest to the window centre first.

use std::sync::Arc;

use tracing::debug;

use crate::cache::EvictionCache;
use crate::scheduler::Scheduler;
use crate::tile::{GenParams, Tile, TileKind};

/// Share of the viewport span added on each side when a resize is triggered
const PAD_FRACTION: f64 = 0.2;

/// Rectangle of grid cells, in tile units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Window {
    pub x: i32,
    pub z: i32,
    pub width: i32,
    pub height: i32,
}

impl Window {
    pub fn new(x: i32, z: i32, width: i32, height: i32) -> Self {
        Self { x, z, width, height }
    }

    /// Slot index of cell `(ti, tj)` if it lies inside the window.
    pub fn slot(&self, ti: i32, tj: i32) -> Option<usize> {
        let col = i64::from(ti) - i64::from(self.x);
        let row = i64::from(tj) - i64::from(self.z);
        if col >= 0 && col < i64::from(self.width) && row >= 0 && row < i64::from(self.height) {
            Some(row as usize * self.width as usize + col as usize)
        } else {
            None
        }
    }

    pub fn area(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize
    }

    /// Window of cells covering the world rectangle, grown by `pad` world
    /// units on x and z. Cell indices saturate at the `i32` range.
    fn covering(tile_size: f64, min: (f64, f64), max: (f64, f64), pad: (f64, f64)) -> Self {
        let cell = |v: f64| (v / tile_size).floor() as i64;
        let i0 = cell(min.0 - pad.0);
        let j0 = cell(min.1 - pad.1);
        let i1 = cell(max.0 + pad.0).saturating_add(1);
        let j1 = cell(max.1 + pad.1).saturating_add(1);
        let clamp = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        Self::new(clamp(i0), clamp(j0), clamp(i1.saturating_sub(i0)), clamp(j1.saturating_sub(j0)))
    }
}

/// What a window resize did, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResizeReport {
    /// Tiles carried over from the previous window
    pub kept: usize,
    /// Tiles taken back from the eviction cache
    pub reused: usize,
    /// Tiles created for empty slots
    pub allocated: usize,
    /// Tiles handed to the scheduler
    pub scheduled: usize,
    /// Tiles moved from the window into the eviction cache
    pub displaced: usize,
}

pub struct TileGrid {
    params: Arc<GenParams>,
    kind: TileKind,
    /// Tile edge length in world units
    tile_size: i32,
    window: Window,
    cells: Vec<Option<Arc<Tile>>>,
}

impl TileGrid {
    pub fn new(params: Arc<GenParams>, kind: TileKind, tile_size: i32) -> Self {
        Self {
            params,
            kind,
            tile_size,
            window: Window::default(),
            cells: Vec::new(),
        }
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Tiles of the current window, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = &Arc<Tile>> {
        self.cells.iter().flatten()
    }

    pub fn tile_at(&self, ti: i32, tj: i32) -> Option<&Arc<Tile>> {
        self.window.slot(ti, tj).and_then(|i| self.cells[i].as_ref())
    }

    /// Tiles in the window that have no output yet.
    pub fn outstanding(&self) -> usize {
        self.tiles().filter(|t| !t.is_done()).count()
    }

    fn owns(&self, tile: &Tile) -> bool {
        tile.size() == self.tile_size && tile.kind() == self.kind
    }

    /// Replace the window, scheduling every slot that has no output yet.
    pub fn resize_window(
        &mut self,
        cache: &mut EvictionCache,
        scheduler: &Scheduler,
        window: Window,
    ) -> ResizeReport {
        let mut report = ResizeReport::default();
        let mut cells: Vec<Option<Arc<Tile>>> = vec![None; window.area()];

        for tile in self.cells.drain(..).flatten() {
            match window.slot(tile.ti(), tile.tj()) {
                Some(i) => {
                    cells[i] = Some(tile);
                    report.kept += 1;
                }
                None => {
                    cache.push(tile);
                    report.displaced += 1;
                }
            }
        }

        // Matching tiles in the cache are pulled off the queue; the ones that
        // land in an empty slot come back into the grid
        let tile_size = self.tile_size;
        let kind = self.kind;
        cache.retain(|tile| {
            if tile.size() != tile_size || tile.kind() != kind {
                return true;
            }
            tile.try_take(scheduler);
            match window.slot(tile.ti(), tile.tj()) {
                Some(i) if cells[i].is_none() => {
                    cells[i] = Some(Arc::clone(tile));
                    report.reused += 1;
                    false
                }
                _ => true,
            }
        });

        let mut to_submit = Vec::new();
        for row in 0..window.height {
            for col in 0..window.width {
                let slot = &mut cells[row as usize * window.width as usize + col as usize];
                let priority = sq_dist(col - window.width / 2, row - window.height / 2);
                match slot {
                    None => {
                        let tile = Arc::new(Tile::new(
                            Arc::clone(&self.params),
                            self.kind,
                            self.tile_size,
                            window.x.saturating_add(col),
                            window.z.saturating_add(row),
                        ));
                        *slot = Some(Arc::clone(&tile));
                        report.allocated += 1;
                        to_submit.push((priority, tile));
                    }
                    Some(tile) => {
                        if (tile.is_stopped() || tile.try_take(scheduler)) && !tile.is_done() {
                            tile.set_stopped(false);
                            to_submit.push((priority, Arc::clone(tile)));
                        }
                    }
                }
            }
        }

        // Stable, so equal priorities keep row-major discovery order
        to_submit.sort_by_key(|(priority, _)| *priority);
        for (priority, tile) in &to_submit {
            tile.set_priority(*priority);
            tile.submit(scheduler);
        }
        report.scheduled = to_submit.len();

        self.cells = cells;
        self.window = window;
        debug!(
            kind = ?self.kind,
            ?window,
            kept = report.kept,
            reused = report.reused,
            allocated = report.allocated,
            scheduled = report.scheduled,
            displaced = report.displaced,
            "grid window resized"
        );
        report
    }

    /// Track a world-space rectangle, resizing only when it has left the
    /// current window or shrunk to under half of it. Returns whether the
    /// window changed.
    ///
    /// An all-zero rectangle collapses an unused grid onto the origin cell.
    pub fn update(
        &mut self,
        cache: &mut EvictionCache,
        scheduler: &Scheduler,
        min_x: f64,
        min_z: f64,
        max_x: f64,
        max_z: f64,
    ) -> bool {
        let size = self.tile_size as f64;
        let needed = Window::covering(size, (min_x, min_z), (max_x, max_z), (0.0, 0.0));
        let current = self.window;

        let end = |start: i32, len: i32| i64::from(start) + i64::from(len);
        let shrunk = i64::from(needed.width) * 2 < i64::from(current.width)
            || i64::from(needed.height) * 2 < i64::from(current.height);
        let escaped = needed.x < current.x
            || needed.z < current.z
            || end(needed.x, needed.width) > end(current.x, current.width)
            || end(needed.z, needed.height) > end(current.z, current.height);
        if !shrunk && !escaped {
            return false;
        }

        let pad = (PAD_FRACTION * (max_x - min_x), PAD_FRACTION * (max_z - min_z));
        let window = Window::covering(size, (min_x, min_z), (max_x, max_z), pad);
        self.resize_window(cache, scheduler, window);
        true
    }
}

fn sq_dist(x: i32, z: i32) -> u32 {
    let (x, z) = (i64::from(x), i64::from(z));
    (x * x + z * z).min(u32::MAX as i64) as u32
}
