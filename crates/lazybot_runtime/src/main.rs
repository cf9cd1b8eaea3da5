//! LazyBot headless runner
//!
//! Loads a scene, ticks it a fixed number of times and logs where every
//! entity ended up.
//!
//! Run with: cargo run -p lazybot_runtime -- --scene crates/lazybot_runtime/scenes/demo.toml

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lazybot_runtime::{load_scene, World};

/// Run a LazyBot scene without a renderer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene file (.toml or .json)
    #[arg(short, long)]
    scene: PathBuf,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Override the scene seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the scene tick length in seconds
    #[arg(long)]
    dt: Option<f32>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut scene = match load_scene(&args.scene) {
        Ok(scene) => scene,
        Err(err) => {
            log::error!("Failed to load {}: {}", args.scene.display(), err);
            return ExitCode::FAILURE;
        }
    };
    if let Some(seed) = args.seed {
        scene.seed = seed;
    }
    if let Some(dt) = args.dt.filter(|dt| *dt > 0.0) {
        scene.dt = dt;
    }

    let mut world = match World::from_config(&scene) {
        Ok(world) => world,
        Err(err) => {
            log::error!("Failed to build {}: {}", args.scene.display(), err);
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "Running {} ticks of {:.4}s (seed {})",
        args.ticks,
        world.dt(),
        scene.seed
    );
    world.run(args.ticks);

    let events = world.drain_events().len();
    log::info!(
        "Finished after {:.2}s simulated, {} behaviour events",
        world.elapsed(),
        events
    );
    for entity in world.summary() {
        log::info!(
            "{:<12} {:>4} state={:<8} pos=({:.2}, {:.2}, {:.2}) health={:.1} targets={}{}",
            entity.name,
            entity.id.to_string(),
            entity.state,
            entity.position.x,
            entity.position.y,
            entity.position.z,
            entity.health,
            entity.targets,
            if entity.dead { " dead" } else { "" }
        );
    }
    log::info!("{} audio requests", world.audio_journal().lock().len());

    ExitCode::SUCCESS
}
