//! Start point and rare locations, computed once per world in the background.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::generator::{find_start_point, Pos, RareLocations, Sampler};
use crate::scheduler::Task;

/// Observable state of a value computed once in the background.
#[derive(Debug, PartialEq, Eq)]
pub enum Phase<'a, T> {
    NotStarted,
    InProgress,
    Ready(&'a T),
}

impl<'a, T> Phase<'a, T> {
    pub fn ready(self) -> Option<&'a T> {
        match self {
            Phase::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Write-once cell with an explicit "started" mark.
#[derive(Debug)]
pub struct Published<T> {
    started: AtomicBool,
    value: OnceLock<T>,
}

impl<T> Default for Published<T> {
    fn default() -> Self {
        Self {
            started: AtomicBool::new(false),
            value: OnceLock::new(),
        }
    }
}

impl<T> Published<T> {
    /// Mark the computation as started. Returns `false` if it already was.
    pub fn begin(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    /// Publish the finished value. Later calls are ignored.
    pub fn publish(&self, value: T) {
        let _ = self.value.set(value);
    }

    pub fn phase(&self) -> Phase<'_, T> {
        match self.value.get() {
            Some(value) => Phase::Ready(value),
            None if self.started.load(Ordering::Acquire) => Phase::InProgress,
            None => Phase::NotStarted,
        }
    }
}

/// Landmarks of one world.
#[derive(Debug, Default)]
pub struct Landmarks {
    pub start: Published<Pos>,
    pub rare: Published<Vec<Pos>>,
    closing: AtomicBool,
}

impl Landmarks {
    /// Move both cells to in-progress. Returns `true` only for the caller
    /// that should start the computation.
    pub fn begin(&self) -> bool {
        let start = self.start.begin();
        let rare = self.rare.begin();
        start && rare
    }

    /// Ask a running computation to abandon its work.
    pub fn close(&self) {
        self.closing.store(true, Ordering::Release);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Compute and publish both landmarks on the calling thread, stopping
    /// early if the world is closed.
    pub fn compute(&self, sampler: &Sampler) {
        let Some(start) = find_start_point(sampler, &self.closing) else {
            debug!("start point search abandoned");
            return;
        };
        info!(%start, "start point found");
        self.start.publish(start);

        let locations = RareLocations::new(sampler);
        let mut rare = Vec::with_capacity(locations.total());
        for pos in locations {
            if self.is_closing() {
                debug!(found = rare.len(), "rare location search abandoned");
                return;
            }
            rare.push(pos);
        }
        info!(count = rare.len(), "rare locations found");
        self.rare.publish(rare);
    }
}

/// Background job that fills a world's landmarks.
pub struct LandmarkTask {
    pub landmarks: Arc<Landmarks>,
    pub sampler: Arc<Sampler>,
}

impl Task for LandmarkTask {
    fn run(&self) {
        self.landmarks.compute(&self.sampler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenVersion;

    #[test]
    fn test_published_phases() {
        let cell: Published<u32> = Published::default();
        assert_eq!(cell.phase(), Phase::NotStarted);
        assert!(cell.begin());
        assert!(!cell.begin());
        assert_eq!(cell.phase(), Phase::InProgress);
        cell.publish(5);
        cell.publish(6);
        assert_eq!(cell.phase(), Phase::Ready(&5));
        assert_eq!(cell.phase().ready(), Some(&5));
    }

    #[test]
    fn test_compute_publishes_both() {
        let sampler = Sampler::new(99, GenVersion::Legacy);
        let landmarks = Landmarks::default();
        assert!(landmarks.begin());
        assert!(!landmarks.begin());
        landmarks.compute(&sampler);

        assert!(landmarks.start.phase().ready().is_some());
        assert_eq!(landmarks.rare.phase().ready().map(Vec::len), Some(3));
    }

    #[test]
    fn test_closed_landmarks_stay_in_progress() {
        let sampler = Sampler::new(99, GenVersion::Nether);
        let landmarks = Landmarks::default();
        landmarks.begin();
        landmarks.close();
        landmarks.compute(&sampler);

        assert_eq!(landmarks.start.phase(), Phase::InProgress);
        assert_eq!(landmarks.rare.phase(), Phase::InProgress);
    }
}
