//! Tiled, cancellable background computation of a procedurally generated
//! world map, composed on demand for an interactive viewer.
//!
//! Re-exports modules for use by binaries and tools.

pub mod cache;
pub mod compose;
pub mod config;
pub mod error;
pub mod generator;
pub mod grid;
pub mod landmarks;
pub mod raster;
pub mod scheduler;
pub mod tile;
pub mod viewer;
pub mod world;

pub use error::{AtlasError, Result};
