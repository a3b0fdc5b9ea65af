//! Software framebuffer that composed frames are drawn into.
//!
//! Pixels are packed `0x00RRGGBB`, the layout minifb presents directly.

use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::compose::{Canvas, Marker, ScreenRect, Selection};
use crate::error::Result;
use crate::generator::PoiKind;
use crate::tile::TileImage;

const BACKGROUND: [u8; 3] = [5, 5, 15];
const OUTLINE_ALPHA: f64 = 96.0 / 255.0;

fn pack(rgb: [u8; 3]) -> u32 {
    ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | rgb[2] as u32
}

fn unpack(pixel: u32) -> [u8; 3] {
    [(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8]
}

/// Icon colour of a marker
pub fn marker_color(marker: Marker) -> [u8; 3] {
    match marker {
        Marker::Poi(kind) => match kind {
            PoiKind::DesertTemple => [250, 210, 90],
            PoiKind::JungleTemple => [60, 140, 40],
            PoiKind::SwampHut => [110, 70, 130],
            PoiKind::Igloo => [220, 240, 255],
            PoiKind::Village => [200, 120, 60],
            PoiKind::Mansion => [120, 60, 20],
            PoiKind::Monument => [40, 200, 190],
            PoiKind::OceanRuin => [130, 160, 170],
            PoiKind::Shipwreck => [150, 110, 70],
            PoiKind::Outpost => [90, 90, 90],
            PoiKind::RuinedPortal => [160, 40, 220],
        },
        Marker::StartPoint => [255, 255, 255],
        Marker::RareLocation => [230, 40, 40],
    }
}

pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![pack(BACKGROUND); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        unpack(self.pixels[y * self.width + x])
    }

    pub fn clear(&mut self) {
        self.pixels.fill(pack(BACKGROUND));
    }

    /// Integer pixel span `[start, end)` of a screen interval, clipped to `limit`.
    fn span(start: f64, len: f64, limit: usize) -> (usize, usize) {
        let a = start.floor().clamp(0.0, limit as f64) as usize;
        let b = (start + len).floor().clamp(0.0, limit as f64) as usize;
        (a, b)
    }

    fn fill_rect(&mut self, rect: ScreenRect, rgb: [u8; 3]) {
        let (x0, x1) = Self::span(rect.x, rect.w, self.width);
        let (y0, y1) = Self::span(rect.y, rect.h, self.height);
        let color = pack(rgb);
        for y in y0..y1 {
            self.pixels[y * self.width + x0..y * self.width + x1].fill(color);
        }
    }

    fn blend(&mut self, x: i64, y: i64, rgb: [u8; 3], alpha: f64) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = y as usize * self.width + x as usize;
        let old = unpack(self.pixels[i]);
        let mix = |a: u8, b: u8| (a as f64 * (1.0 - alpha) + b as f64 * alpha).round() as u8;
        self.pixels[i] = pack([mix(old[0], rgb[0]), mix(old[1], rgb[1]), mix(old[2], rgb[2])]);
    }

    fn border(&mut self, rect: ScreenRect, thickness: i64, rgb: [u8; 3], alpha: f64) {
        let x0 = rect.x.floor() as i64;
        let y0 = rect.y.floor() as i64;
        let x1 = (rect.x + rect.w).floor() as i64 - 1;
        let y1 = (rect.y + rect.h).floor() as i64 - 1;
        if x1 < x0 || y1 < y0 {
            return;
        }
        for t in 0..thickness {
            // Skip rows and columns entirely off screen
            for x in (x0 + t).max(0)..=(x1 - t).min(self.width as i64 - 1) {
                self.blend(x, y0 + t, rgb, alpha);
                if y1 - t != y0 + t {
                    self.blend(x, y1 - t, rgb, alpha);
                }
            }
            for y in (y0 + t + 1).max(0)..=(y1 - t - 1).min(self.height as i64 - 1) {
                self.blend(x0 + t, y, rgb, alpha);
                if x1 - t != x0 + t {
                    self.blend(x1 - t, y, rgb, alpha);
                }
            }
        }
    }

    pub fn to_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            Rgb(self.get(x as usize, y as usize))
        })
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_image().save(path)?;
        Ok(())
    }
}

impl Canvas for Framebuffer {
    fn draw_image(&mut self, image: &TileImage, rect: ScreenRect) {
        if image.size == 0 || rect.w <= 0.0 || rect.h <= 0.0 {
            return;
        }
        let (x0, x1) = Self::span(rect.x, rect.w, self.width);
        let (y0, y1) = Self::span(rect.y, rect.h, self.height);
        let last = image.size - 1;
        for y in y0..y1 {
            let v = (((y as f64 + 0.5 - rect.y) / rect.h * image.size as f64) as u32).min(last);
            let row = y * self.width;
            for x in x0..x1 {
                let u = (((x as f64 + 0.5 - rect.x) / rect.w * image.size as f64) as u32).min(last);
                self.pixels[row + x] = pack(image.pixel(u, v));
            }
        }
    }

    fn draw_outline(&mut self, rect: ScreenRect) {
        self.border(rect, 1, [0, 0, 0], OUTLINE_ALPHA);
    }

    fn draw_marker(&mut self, marker: Marker, cx: f64, cy: f64, size: f64) {
        let rect = ScreenRect::centered(cx, cy, size);
        self.fill_rect(rect, marker_color(marker));
        self.border(rect, 1, [0, 0, 0], 1.0);
    }

    fn draw_highlight(&mut self, selection: &Selection, cx: f64, cy: f64, size: f64) {
        let rect = ScreenRect::centered(cx, cy, size);
        self.fill_rect(rect, marker_color(selection.marker));
        self.border(rect, 2, [255, 255, 255], 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Pos;

    fn checker(size: u32) -> TileImage {
        let mut rgb = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let c = if (x + y) % 2 == 0 { 255 } else { 0 };
                rgb.extend_from_slice(&[c, c, c]);
            }
        }
        TileImage { size, rgb }
    }

    #[test]
    fn test_draw_image_scales_up() {
        let mut fb = Framebuffer::new(8, 8);
        fb.draw_image(&checker(2), ScreenRect { x: 0.0, y: 0.0, w: 8.0, h: 8.0 });
        assert_eq!(fb.get(0, 0), [255, 255, 255]);
        assert_eq!(fb.get(3, 3), [255, 255, 255]);
        assert_eq!(fb.get(4, 0), [0, 0, 0]);
        assert_eq!(fb.get(7, 7), [255, 255, 255]);
    }

    #[test]
    fn test_draw_image_clips() {
        let mut fb = Framebuffer::new(4, 4);
        fb.draw_image(&checker(4), ScreenRect { x: -2.0, y: 2.0, w: 4.0, h: 4.0 });
        // Source column 2, row 0
        assert_eq!(fb.get(0, 2), [255, 255, 255]);
        assert_eq!(fb.get(1, 2), [0, 0, 0]);
        assert_eq!(fb.get(2, 2), BACKGROUND);
        assert_eq!(fb.get(0, 0), BACKGROUND);
    }

    #[test]
    fn test_marker_and_highlight() {
        let mut fb = Framebuffer::new(40, 40);
        fb.draw_marker(Marker::RareLocation, 20.0, 20.0, 10.0);
        assert_eq!(fb.get(20, 20), marker_color(Marker::RareLocation));
        assert_eq!(fb.get(15, 15), [0, 0, 0]);
        assert_eq!(fb.get(10, 10), BACKGROUND);

        let selection = Selection { marker: Marker::StartPoint, pos: Pos::new(0, 0) };
        fb.draw_highlight(&selection, 20.0, 20.0, 20.0);
        assert_eq!(fb.get(10, 10), [255, 255, 255]);
        assert_eq!(fb.get(11, 11), [255, 255, 255]);
    }

    #[test]
    fn test_to_image_matches_pixels() {
        let mut fb = Framebuffer::new(3, 2);
        fb.draw_marker(Marker::Poi(PoiKind::Village), 1.0, 1.0, 0.5);
        let image = fb.to_image();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, fb.get(2, 1));
    }
}
