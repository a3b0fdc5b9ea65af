use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use tracing::info;

use crate::compose::{Marker, Viewport};
use crate::error::Result;
use crate::generator::PoiKind;
use crate::raster::Framebuffer;
use crate::world::WorldCache;

/// Screen pixels panned per frame while an arrow key is held
const PAN_STEP: f64 = 12.0;
const ZOOM_STEP: f64 = 1.25;
const QUALITY_STEP: f64 = 1.25;
/// Mouse travel, in pixels, that turns a click into a drag
const DRAG_THRESHOLD: f32 = 3.0;

/// Keys toggling point-of-interest kinds, in `PoiKind::ALL` order
const KIND_KEYS: [Key; 11] = [
    Key::Key1,
    Key::Key2,
    Key::Key3,
    Key::Key4,
    Key::Key5,
    Key::Key6,
    Key::Key7,
    Key::Key8,
    Key::Key9,
    Key::Key0,
    Key::O,
];

/// Left-button state between frames
#[derive(Default)]
struct Pointer {
    pressed_at: Option<(f32, f32)>,
    last: Option<(f32, f32)>,
    dragging: bool,
}

fn print_controls() {
    println!("Viewer started. Controls:");
    println!("  Arrows / drag: Pan");
    println!("  Wheel / = / -: Zoom");
    println!("  Click: Select marker");
    println!("  C: Clear selection");
    for (key, kind) in ["1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "O"].iter().zip(PoiKind::ALL) {
        println!("  {key}: Toggle {}", kind.display_name());
    }
    println!("  S: Toggle start point");
    println!("  R: Toggle rare locations");
    println!("  P: Pause / resume workers");
    println!("  [ / ]: Lower / raise quality");
    println!("  Esc: Exit");
}

fn toggle(world: &mut WorldCache, marker: Marker) {
    let visible = !world.is_visible(marker);
    world.set_visible(marker, visible);
    println!("{}: {}", marker, if visible { "shown" } else { "hidden" });
}

/// Run the interactive map viewer until the window is closed.
pub fn run_viewer(world: &mut WorldCache, mut view: Viewport) -> Result<()> {
    view.zoom = world.clamp_zoom(view.zoom);
    let width = view.width as usize;
    let height = view.height as usize;

    let mut window = Window::new(
        &format!("Biome Atlas - seed {}", world.config().seed),
        width,
        height,
        WindowOptions {
            resize: false,
            scale: minifb::Scale::X1,
            ..WindowOptions::default()
        },
    )?;

    // Limit to ~60fps
    window.set_target_fps(60);

    let mut framebuffer = Framebuffer::new(width, height);
    let mut pointer = Pointer::default();
    let mut title = String::new();

    print_controls();

    while window.is_open() && !window.is_key_down(Key::Escape) {
        // Keyboard pan and zoom
        let step = PAN_STEP / view.zoom;
        if window.is_key_down(Key::Left) {
            view.focus_x -= step;
        }
        if window.is_key_down(Key::Right) {
            view.focus_x += step;
        }
        if window.is_key_down(Key::Up) {
            view.focus_z -= step;
        }
        if window.is_key_down(Key::Down) {
            view.focus_z += step;
        }
        if window.is_key_pressed(Key::Equal, KeyRepeat::Yes) {
            view.zoom = world.clamp_zoom(view.zoom * ZOOM_STEP);
        }
        if window.is_key_pressed(Key::Minus, KeyRepeat::Yes) {
            view.zoom = world.clamp_zoom(view.zoom / ZOOM_STEP);
        }

        // Wheel zoom keeps the world point under the cursor in place
        if let Some((_, dy)) = window.get_scroll_wheel() {
            if dy != 0.0 {
                let factor = if dy > 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
                match window.get_mouse_pos(MouseMode::Clamp) {
                    Some((mx, my)) => {
                        let (wx, wz) = view.to_world(mx as f64, my as f64);
                        view.zoom = world.clamp_zoom(view.zoom * factor);
                        let (nx, nz) = view.to_world(mx as f64, my as f64);
                        view.focus_x += wx - nx;
                        view.focus_z += wz - nz;
                    }
                    None => view.zoom = world.clamp_zoom(view.zoom * factor),
                }
            }
        }

        // Drag pans, a click without travel selects
        let mouse_down = window.get_mouse_down(MouseButton::Left);
        if let Some((mx, my)) = window.get_mouse_pos(MouseMode::Clamp) {
            if mouse_down {
                match pointer.pressed_at {
                    None => pointer.pressed_at = Some((mx, my)),
                    Some((px, py)) => {
                        if (mx - px).abs() > DRAG_THRESHOLD || (my - py).abs() > DRAG_THRESHOLD {
                            pointer.dragging = true;
                        }
                    }
                }
                if pointer.dragging {
                    if let Some((lx, ly)) = pointer.last {
                        view.focus_x -= (mx - lx) as f64 / view.zoom;
                        view.focus_z -= (my - ly) as f64 / view.zoom;
                    }
                }
                pointer.last = Some((mx, my));
            } else {
                if pointer.pressed_at.is_some() && !pointer.dragging {
                    world.select_at(mx as f64, my as f64);
                }
                pointer = Pointer::default();
            }
        }

        for (key, kind) in KIND_KEYS.iter().zip(PoiKind::ALL) {
            if window.is_key_pressed(*key, KeyRepeat::No) {
                toggle(world, Marker::Poi(kind));
            }
        }
        if window.is_key_pressed(Key::S, KeyRepeat::No) {
            toggle(world, Marker::StartPoint);
        }
        if window.is_key_pressed(Key::R, KeyRepeat::No) {
            toggle(world, Marker::RareLocation);
        }
        if window.is_key_pressed(Key::C, KeyRepeat::No) {
            world.clear_selection();
        }
        if window.is_key_pressed(Key::P, KeyRepeat::No) {
            let scheduler = world.scheduler();
            if scheduler.is_paused() {
                scheduler.resume();
                println!("Workers resumed");
            } else {
                scheduler.pause();
                println!("Workers paused");
            }
        }
        if window.is_key_pressed(Key::LeftBracket, KeyRepeat::No) {
            world.set_quality(world.quality() / QUALITY_STEP);
            println!("Quality: {:.2}", world.quality());
        }
        if window.is_key_pressed(Key::RightBracket, KeyRepeat::No) {
            world.set_quality(world.quality() * QUALITY_STEP);
            println!("Quality: {:.2}", world.quality());
        }
        // Quality moves the zoom limits
        view.zoom = world.clamp_zoom(view.zoom);

        framebuffer.clear();
        let stats = world.frame(&view, &mut framebuffer);

        let mut new_title = format!(
            "Biome Atlas - {:.0},{:.0} - zoom {:.4} - level {} - {} pending",
            view.focus_x,
            view.focus_z,
            view.zoom,
            world.active_level(),
            stats.tiles_outstanding,
        );
        if let Some(selection) = world.selection() {
            new_title.push_str(&format!(" - {} at {}", selection.marker, selection.pos));
        }
        if new_title != title {
            window.set_title(&new_title);
            title = new_title;
        }

        window.update_with_buffer(framebuffer.pixels(), framebuffer.width(), framebuffer.height())?;
    }

    info!("viewer closed");
    Ok(())
}
