//! Demo host for the hexview viewport optimizer.
//!
//! Generates a seeded synthetic cell population, flies a scripted camera
//! from the whole globe down to street level and back across the
//! anti-meridian, and feeds a simulated frame time back into the optimizer.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p hexview-demo -- --cells 20000 --steps 480`.

mod flight;
mod session;
mod synthetic;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::Parser;
use hexview_config::{CliArgs, Config, ViewportConfig};
use hexview_debug::DebugState;
use hexview_viewport::ViewportOptimizer;
use tracing::{info, warn};

use crate::session::Session;

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from(".hexview"));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.viewport.validate() {
        eprintln!("{e}, using default viewport options");
        config.viewport = ViewportConfig::default();
    }

    let log_dir = config_dir.join("logs");
    hexview_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        cells = config.demo.cell_count,
        steps = config.demo.steps,
        seed = config.demo.seed,
        max_cells = config.viewport.max_cells,
        culling = config.viewport.enable_culling,
        adaptive = config.viewport.enable_adaptive_update,
        "hexview demo starting"
    );

    let started = Instant::now();
    let cells = synthetic::generate_cells(config.demo.cell_count, config.demo.seed);
    info!(
        count = cells.len(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "generated synthetic cells"
    );

    let debug_state = Arc::new(Mutex::new(DebugState::default()));
    let mut debug_server = if config.debug.debug_server {
        let port = hexview_debug::get_debug_port(config.debug.debug_port);
        hexview_debug::create_debug_server(port)
    } else {
        None
    };
    if let Some(server) = debug_server.as_mut()
        && let Err(e) = server.start(debug_state.clone())
    {
        warn!("Failed to start debug server: {e}");
    }

    let optimizer = ViewportOptimizer::new(config.viewport.clone());
    let mut session = Session::new(optimizer, &cells, &config.demo);
    if debug_server.is_some() {
        session = session.with_debug_state(debug_state);
    }

    let summary = session.run();
    let metrics = session.optimizer().performance_metrics();

    info!(
        steps = summary.steps_run,
        updates = summary.updates,
        cache_hits = summary.cache_hits,
        lod_changes = summary.lod_changes,
        cache_clears = summary.cache_clears,
        quit_early = summary.quit_early,
        max_visible = summary.max_visible,
        mean_visible = summary.mean_visible(),
        avg_processing_ms = metrics.average_processing_ms,
        cache_hit_rate = metrics.cache_hit_rate,
        cache_mb = metrics.memory_usage_mb,
        elapsed_s = started.elapsed().as_secs_f64(),
        "flight complete"
    );

    if let Some(mut server) = debug_server {
        server.stop();
    }
}
