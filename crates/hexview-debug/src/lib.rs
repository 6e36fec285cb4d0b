//! HTTP debug API for the viewport optimizer.
//!
//! Exposes the latest metrics, the LOD/cache debug dump and a small command
//! channel over local HTTP. Only started in debug builds.

pub mod server;

pub use server::{DebugServer, DebugServerError};


use hexview_viewport::{CullResult, DebugInfo, PerformanceMetrics, ViewportOptimizer};
use serde::Serialize;

/// Default port for the debug API.
pub const DEFAULT_DEBUG_PORT: u16 = 9310;

/// State shared between the host loop and the debug server.
/// Updated by the host after each optimizer call, read by the server on request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DebugState {
    pub calls: u64,
    /// Seconds since the recorded optimizer was created.
    pub uptime_seconds: f64,
    pub lod_level: usize,
    pub visible_cells: usize,
    pub culled_cells: usize,
    pub update_required: bool,
    pub from_cache: bool,
    pub metrics: PerformanceMetrics,
    /// Served separately on `/lod`.
    #[serde(skip)]
    pub debug_info: Option<DebugInfo>,
    /// Set by `POST /command {"command":"clear_caches"}`; the host clears and resets it.
    #[serde(skip)]
    pub clear_caches_requested: bool,
    #[serde(skip)]
    pub quit_requested: bool,
}

impl DebugState {
    /// Capture the outcome of one optimizer call.
    pub fn record(&mut self, result: &CullResult<'_>, optimizer: &ViewportOptimizer) {
        self.calls += 1;
        self.uptime_seconds = optimizer.uptime().as_secs_f64();
        self.lod_level = result.lod_level;
        self.visible_cells = result.visible_cells.len();
        self.culled_cells = result.culled_cells.len();
        self.update_required = result.update_required;
        self.from_cache = result.from_cache;
        self.metrics = optimizer.performance_metrics();
        self.debug_info = Some(optimizer.debug_info());
    }
}

/// Creates a debug server in debug builds, returns `None` in release builds.
pub fn create_debug_server(port: u16) -> Option<DebugServer> {
    if cfg!(debug_assertions) {
        Some(DebugServer::new(port))
    } else {
        None
    }
}

/// Debug port from `HEXVIEW_DEBUG_PORT`, falling back to `default`.
pub fn get_debug_port(default: u16) -> u16 {
    std::env::var("HEXVIEW_DEBUG_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
