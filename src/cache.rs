//! Eviction cache for tiles displaced from grid windows.
//!
//! Tiles that leave a window are appended here so a later window can take
//! them back without recomputing. The cache is trimmed from the old end once
//! it grows past its capacity.

use std::sync::Arc;

use crate::scheduler::Scheduler;
use crate::tile::Tile;

/// Share of the capacity kept unconditionally when trimming, newest first
const KEEP_FRACTION: f64 = 0.8;

/// Ordered holding area of displaced tiles, oldest first.
#[derive(Default, Debug)]
pub struct EvictionCache {
    tiles: Vec<Arc<Tile>>,
}

impl EvictionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn push(&mut self, tile: Arc<Tile>) {
        self.tiles.push(tile);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tile>> {
        self.tiles.iter()
    }

    /// Keep only the tiles for which `keep` returns true, preserving order.
    /// Used by grids to repossess tiles.
    pub fn retain(&mut self, keep: impl FnMut(&Arc<Tile>) -> bool) {
        self.tiles.retain(keep);
    }

    /// Trim the cache once it holds more than `capacity` tiles.
    ///
    /// The newest `0.8 * capacity` tiles always stay. Older tiles are dropped
    /// if they are done, stopped, or can still be taken off the scheduler
    /// queue; a tile that is currently running stays, so the cache can remain
    /// above the target until it finishes. Returns the number dropped.
    pub fn clean(&mut self, capacity: usize, scheduler: &Scheduler) -> usize {
        if self.tiles.len() <= capacity {
            return 0;
        }

        let keep_newest = (capacity as f64 * KEEP_FRACTION) as usize;
        let before = self.tiles.len();
        let old_end = before.saturating_sub(keep_newest);

        let mut index = 0;
        self.tiles.retain(|tile| {
            let old = index < old_end;
            index += 1;
            !old || !(tile.is_done() || tile.is_stopped() || tile.try_take(scheduler))
        });

        before - self.tiles.len()
    }
}
