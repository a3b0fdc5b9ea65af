//! Screen-side types: viewport geometry, markers and the drawing target.

use serde::Serialize;

use crate::generator::{PoiKind, Pos};
use crate::tile::TileImage;

/// The visible part of the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Screen size in pixels
    pub width: u32,
    pub height: u32,
    /// World position shown at the screen centre
    pub focus_x: f64,
    pub focus_z: f64,
    /// Screen pixels per world unit
    pub zoom: f64,
}

impl Viewport {
    /// World rectangle `(min_x, min_z, max_x, max_z)` covered by the screen.
    pub fn world_bounds(&self) -> (f64, f64, f64, f64) {
        let half_w = self.width as f64 / self.zoom / 2.0;
        let half_h = self.height as f64 / self.zoom / 2.0;
        (
            self.focus_x - half_w,
            self.focus_z - half_h,
            self.focus_x + half_w,
            self.focus_z + half_h,
        )
    }

    pub fn to_screen(&self, x: f64, z: f64) -> (f64, f64) {
        (
            self.width as f64 / 2.0 + (x - self.focus_x) * self.zoom,
            self.height as f64 / 2.0 + (z - self.focus_z) * self.zoom,
        )
    }

    pub fn to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            self.focus_x + (sx - self.width as f64 / 2.0) / self.zoom,
            self.focus_z + (sy - self.height as f64 / 2.0) / self.zoom,
        )
    }

    pub fn contains_screen(&self, sx: f64, sy: f64) -> bool {
        sx >= 0.0 && sx < self.width as f64 && sy >= 0.0 && sy < self.height as f64
    }

    /// Screen rectangle of the world square with corner `(x, z)` and edge `size`.
    pub fn square(&self, x: f64, z: f64, size: f64) -> ScreenRect {
        let (sx, sy) = self.to_screen(x, z);
        let edge = size * self.zoom;
        ScreenRect { x: sx, y: sy, w: edge, h: edge }
    }
}

/// Axis-aligned rectangle in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ScreenRect {
    pub fn centered(cx: f64, cy: f64, size: f64) -> Self {
        Self { x: cx - size / 2.0, y: cy - size / 2.0, w: size, h: size }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

/// Something drawn as an icon over the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Poi(PoiKind),
    StartPoint,
    RareLocation,
}

impl Marker {
    pub fn display_name(&self) -> &'static str {
        match self {
            Marker::Poi(kind) => kind.display_name(),
            Marker::StartPoint => "Start point",
            Marker::RareLocation => "Rare location",
        }
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The marker picked by the last selection query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub marker: Marker,
    pub pos: Pos,
}

/// Counters for one composed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub tiles_drawn: usize,
    pub markers_drawn: usize,
    /// Tiles in the active grids with no output yet
    pub tiles_outstanding: usize,
}

impl FrameStats {
    pub fn is_complete(&self) -> bool {
        self.tiles_outstanding == 0
    }
}

/// Drawing target for composed frames.
pub trait Canvas {
    /// Draw a tile bitmap scaled into `rect`.
    fn draw_image(&mut self, image: &TileImage, rect: ScreenRect);

    /// Draw a thin border around a tile.
    fn draw_outline(&mut self, rect: ScreenRect);

    /// Draw a marker icon of edge `size` centred on `(cx, cy)`.
    fn draw_marker(&mut self, marker: Marker, cx: f64, cy: f64, size: f64);

    /// Draw the selected marker, larger and emphasised.
    fn draw_highlight(&mut self, selection: &Selection, cx: f64, cy: f64, size: f64);
}
