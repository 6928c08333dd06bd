#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
use anyhow::{Context, Result};
#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use rand::rngs::StdRng;
#[cfg(not(target_arch = "wasm32"))]
use rand::SeedableRng;

#[cfg(not(target_arch = "wasm32"))]
use hero_backdrop::{
    app::{run_windowed, WindowInitError},
    run_headless, Archetype, BackdropConfig, HeadlessSummary, SceneBootstrapper, Viewport,
};

#[cfg(not(target_arch = "wasm32"))]
const HEADLESS_STEP_MS: f64 = 16.0;

/// Animated wireframe backdrop viewer.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Parser)]
#[command(name = "hero-backdrop", version, about)]
struct Cli {
    /// Render offscreen for a fixed number of frames and print a summary.
    #[arg(long)]
    headless: bool,

    /// Frames to render in headless mode.
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// JSON file overriding the default scene parameters.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seed for the object layout. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Headless viewport width.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Headless viewport height.
    #[arg(long, default_value_t = 720)]
    height: u32,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => BackdropConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BackdropConfig::default(),
    };

    if cli.headless {
        return headless(&cli, config);
    }

    match run_windowed(config.clone(), cli.seed) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!("{err}. Falling back to --headless mode.");
            headless(&cli, config)
        }
        Err(err) => Err(err),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn headless(cli: &Cli, config: BackdropConfig) -> Result<()> {
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let summary = run_headless(
        &SceneBootstrapper::new(config),
        Viewport::new(cli.width, cli.height, 1.0),
        cli.frames,
        HEADLESS_STEP_MS,
        None,
        &mut rng,
    )
    .context("headless run failed")?;
    print_summary(&summary);
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn print_summary(summary: &HeadlessSummary) {
    println!(
        "Rendered {} frames, {} objects per frame",
        summary.frames, summary.draws_per_frame
    );
    for archetype in Archetype::ALL {
        println!(" {:>12}: {}", archetype.label(), summary.count(archetype));
    }
    let camera = summary.camera_position;
    println!(
        "Camera at ({:.2}, {:.2}, {:.2})",
        camera.x, camera.y, camera.z
    );
    println!("Final object states:");
    for (archetype, transform) in &summary.objects {
        println!(
            " - {} pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2}) scale={:.2}",
            archetype.label(),
            transform.position.x,
            transform.position.y,
            transform.position.z,
            transform.rotation.x,
            transform.rotation.y,
            transform.rotation.z,
            transform.scale
        );
    }
}
