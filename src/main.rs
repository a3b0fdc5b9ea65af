use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};

use biome_atlas::compose::{Marker, Viewport};
use biome_atlas::config::WorldConfig;
use biome_atlas::generator::{GenVersion, PoiKind, Pos, Sampler};
use biome_atlas::landmarks::Landmarks;
use biome_atlas::raster::Framebuffer;
use biome_atlas::scheduler::Scheduler;
use biome_atlas::viewer;
use biome_atlas::world::WorldCache;
use biome_atlas::{AtlasError, Result};

#[derive(Parser, Debug)]
#[command(name = "biome_atlas")]
#[command(about = "Explore a procedurally generated world map with points of interest")]
struct Args {
    /// World seed (uses the config seed, or a random one, if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Generator version
    #[arg(short, long, value_enum)]
    version: Option<GenVersion>,

    /// World configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value = "0")]
    threads: usize,

    /// Window or snapshot width in pixels
    #[arg(short = 'W', long, default_value = "1024")]
    width: u32,

    /// Window or snapshot height in pixels
    #[arg(short = 'H', long, default_value = "768")]
    height: u32,

    /// World X coordinate at the centre of the view
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    x: f64,

    /// World Z coordinate at the centre of the view
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    z: f64,

    /// Screen pixels per world unit
    #[arg(long, default_value = "0.25")]
    zoom: f64,

    /// Level of detail; higher values switch to finer levels sooner
    #[arg(short, long)]
    quality: Option<f64>,

    /// Point-of-interest kinds to show (comma separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    show: Vec<PoiKind>,

    /// Show the start point
    #[arg(long)]
    show_start: bool,

    /// Show the rare locations
    #[arg(long)]
    show_rare: bool,

    /// Render the view headless and write it to a PNG file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Maximum frames to wait for a complete snapshot
    #[arg(long, default_value = "2000")]
    frame_budget: usize,

    /// Print the start point and rare locations as JSON and exit
    #[arg(long)]
    landmarks: bool,
}

#[derive(Serialize)]
struct LandmarkReport {
    seed: u64,
    version: GenVersion,
    start_point: Option<Pos>,
    rare_locations: Vec<Pos>,
}

fn main() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig {
            seed: rand::random(),
            ..WorldConfig::default()
        },
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(version) = args.version {
        config.version = version;
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    for kind in &args.show {
        config.visibility.set_visible(Marker::Poi(*kind), true);
    }
    if args.show_start {
        config.visibility.start_point = true;
    }
    if args.show_rare {
        config.visibility.rare_locations = true;
    }
    config.validate()?;
    if !(args.zoom.is_finite() && args.zoom > 0.0) {
        return Err(AtlasError::InvalidConfig(format!("bad zoom {}", args.zoom)));
    }

    if args.landmarks {
        return print_landmarks(&config);
    }

    let scheduler = Arc::new(Scheduler::new(args.threads)?);
    let mut world = WorldCache::new(config, scheduler)?;
    let view = Viewport {
        width: args.width,
        height: args.height,
        focus_x: args.x,
        focus_z: args.z,
        zoom: args.zoom,
    };

    match &args.snapshot {
        Some(path) => snapshot(&mut world, view, args.frame_budget, path),
        None => viewer::run_viewer(&mut world, view),
    }
}

/// Compute the landmarks on this thread and print them.
fn print_landmarks(config: &WorldConfig) -> Result<()> {
    let sampler = Sampler::new(config.seed, config.version);
    let landmarks = Landmarks::default();
    landmarks.begin();
    landmarks.compute(&sampler);

    let report = LandmarkReport {
        seed: config.seed,
        version: config.version,
        start_point: landmarks.start.phase().ready().copied(),
        rare_locations: landmarks.rare.phase().ready().cloned().unwrap_or_default(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Run frames until the view is complete or the budget runs out, then save.
fn snapshot(world: &mut WorldCache, view: Viewport, budget: usize, path: &Path) -> Result<()> {
    let mut framebuffer = Framebuffer::new(view.width as usize, view.height as usize);
    let wants_landmarks = world.config().visibility.wants_landmarks();
    let started = Instant::now();

    let mut frames = 0;
    loop {
        framebuffer.clear();
        let stats = world.frame(&view, &mut framebuffer);
        frames += 1;

        let landmarks_ready = !wants_landmarks
            || (world.start_point().ready().is_some() && world.rare_locations().ready().is_some());
        if stats.is_complete() && landmarks_ready {
            // Draw once more so landmarks published during the last frame show up
            framebuffer.clear();
            let stats = world.frame(&view, &mut framebuffer);
            info!(
                frames,
                tiles = stats.tiles_drawn,
                markers = stats.markers_drawn,
                elapsed = ?started.elapsed(),
                "view complete"
            );
            break;
        }
        if frames >= budget {
            warn!(frames, outstanding = stats.tiles_outstanding, "frame budget exhausted, saving partial view");
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    framebuffer.save_png(path)?;
    info!(path = %path.display(), "snapshot saved");
    Ok(())
}
