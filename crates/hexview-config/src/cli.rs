//! Command-line argument parsing for the hexview demo host.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// hexview command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "hexview", about = "Viewport LOD culling demo")]
pub struct CliArgs {
    /// Global visible cell ceiling.
    #[arg(long)]
    pub max_cells: Option<usize>,

    /// Disable cell culling (truncate only).
    #[arg(long)]
    pub disable_culling: bool,

    /// Disable adaptive LOD adjustment.
    #[arg(long)]
    pub disable_adaptive: bool,

    /// Target frame rate for adaptive LOD.
    #[arg(long)]
    pub target_fps: Option<f64>,

    /// Number of synthetic cells.
    #[arg(long)]
    pub cells: Option<usize>,

    /// Number of simulated view changes.
    #[arg(long)]
    pub steps: Option<u32>,

    /// RNG seed for synthetic cells.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Start the debug API on this port.
    #[arg(long)]
    pub debug_port: Option<u16>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(max) = args.max_cells {
            self.viewport.max_cells = max;
        }
        if args.disable_culling {
            self.viewport.enable_culling = false;
        }
        if args.disable_adaptive {
            self.viewport.enable_adaptive_update = false;
        }
        if let Some(fps) = args.target_fps {
            self.viewport.target_frame_rate = fps;
        }
        if let Some(cells) = args.cells {
            self.demo.cell_count = cells;
        }
        if let Some(steps) = args.steps {
            self.demo.steps = steps;
        }
        if let Some(seed) = args.seed {
            self.demo.seed = seed;
        }
        if let Some(port) = args.debug_port {
            self.debug.debug_server = true;
            self.debug.debug_port = port;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
