mod world;

use std::path::PathBuf;

use clap::Parser;
use log::info;
use pacer_core::{fatal, logsys, run_headless, EngineConfig};

use crate::world::Overworld;

/// Fixed-rate tile overworld demo
#[derive(Parser)]
#[command(name = "pacer", version, about, long_about = None)]
struct Cli {
    /// TOML config file; missing file means defaults
    #[arg(short, long, value_name = "PATH", default_value = "pacer.toml")]
    config: PathBuf,

    /// Override the target frame rate
    #[arg(long, value_name = "HZ")]
    hz: Option<f64>,

    /// Run without a window against an in-memory buffer
    #[arg(long)]
    headless: bool,

    /// Ticks to run in headless mode
    #[arg(long, default_value = "600")]
    frames: u64,
}

fn main() -> anyhow::Result<()> {
    logsys::init();
    fatal::install_panic_hook();

    let cli = Cli::parse();
    let mut config = EngineConfig::load_or_default(&cli.config).unwrap_or_else(|e| fatal::terminate(&e));
    if let Some(hz) = cli.hz {
        config.target_hz = hz;
    }
    if let Err(e) = config.validate() {
        fatal::terminate(&e);
    }

    let world = Overworld::new(config.logical_width, config.logical_height)?;

    if cli.headless {
        let (world, stats) = run_headless(&config, world, cli.frames).unwrap_or_else(|e| fatal::terminate(&e));
        info!(
            target: "runtime",
            "headless done: {} ticks, last raw {:.3} ms, cooked {:.3} ms, player at {:?}",
            world.ticks(),
            stats.raw_frame_time_ms,
            stats.cooked_frame_time_ms,
            world.player().position()
        );
        return Ok(());
    }

    pacer_platform_winit::run_winit_app(config, world).unwrap_or_else(|e| fatal::terminate(&e));
    Ok(())
}
