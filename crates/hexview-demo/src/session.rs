//! Drives the optimizer along a flight path and simulates render cost.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hexview_config::DemoConfig;
use hexview_debug::DebugState;
use hexview_viewport::{Cell, ViewportOptimizer};
use tracing::{debug, info, warn};

use crate::flight::FlightPath;

/// Aggregate numbers for one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlightSummary {
    pub steps_run: u32,
    pub updates: u32,
    pub cache_hits: u32,
    pub lod_changes: u32,
    pub max_visible: usize,
    pub total_visible: usize,
    pub cache_clears: u32,
    pub quit_early: bool,
}

impl FlightSummary {
    pub fn mean_visible(&self) -> f64 {
        if self.steps_run == 0 {
            0.0
        } else {
            self.total_visible as f64 / f64::from(self.steps_run)
        }
    }
}

/// Simulated frame time: measured culling time plus a fixed draw cost per
/// visible cell.
pub fn simulated_frame_time_ms(processing_ms: f64, visible: usize, draw_cost_us: f64) -> f64 {
    processing_ms + visible as f64 * draw_cost_us / 1000.0
}

pub struct Session<'a> {
    optimizer: ViewportOptimizer,
    cells: &'a [Cell],
    path: FlightPath,
    draw_cost_us: f64,
    step_interval: Duration,
    debug_state: Option<Arc<Mutex<DebugState>>>,
}

impl<'a> Session<'a> {
    pub fn new(optimizer: ViewportOptimizer, cells: &'a [Cell], demo: &DemoConfig) -> Self {
        Self {
            optimizer,
            cells,
            path: FlightPath::new(demo.steps),
            draw_cost_us: demo.draw_cost_us,
            step_interval: Duration::from_millis(demo.step_interval_ms),
            debug_state: None,
        }
    }

    /// Publish per-step results to the debug API.
    pub fn with_debug_state(mut self, state: Arc<Mutex<DebugState>>) -> Self {
        self.debug_state = Some(state);
        self
    }

    pub fn optimizer(&self) -> &ViewportOptimizer {
        &self.optimizer
    }

    pub fn run(&mut self) -> FlightSummary {
        let mut summary = FlightSummary::default();
        let mut frame_time_ms: Option<f64> = None;
        let mut last_lod: Option<usize> = None;

        for step in 0..self.path.steps() {
            if self.poll_commands(&mut summary) {
                summary.quit_early = true;
                info!(step, "quit requested");
                break;
            }

            let view = self.path.view_at(step);
            let result = self.optimizer.optimize_viewport(self.cells, &view, frame_time_ms);

            let processing = self.optimizer.performance_metrics().processing_time_ms;
            let visible = result.visible_cells.len();
            frame_time_ms = Some(simulated_frame_time_ms(processing, visible, self.draw_cost_us));

            summary.steps_run += 1;
            summary.total_visible += visible;
            summary.max_visible = summary.max_visible.max(visible);
            if result.update_required {
                summary.updates += 1;
            }
            if result.from_cache {
                summary.cache_hits += 1;
            }
            if last_lod.is_some_and(|lod| lod != result.lod_level) {
                summary.lod_changes += 1;
            }
            last_lod = Some(result.lod_level);

            debug!(
                step,
                lon = view.longitude,
                lat = view.latitude,
                zoom = view.zoom,
                lod = result.lod_level,
                visible,
                culled = result.culled_cells.len(),
                from_cache = result.from_cache,
                frame_ms = frame_time_ms.unwrap_or_default(),
                "step"
            );

            if let Some(state) = &self.debug_state {
                match state.lock() {
                    Ok(mut state) => state.record(&result, &self.optimizer),
                    Err(_) => warn!("debug state lock poisoned"),
                }
            }

            if !self.step_interval.is_zero() {
                thread::sleep(self.step_interval);
            }
        }

        summary
    }

    /// Apply pending debug commands. Returns true when a quit was requested.
    fn poll_commands(&mut self, summary: &mut FlightSummary) -> bool {
        let Some(state) = &self.debug_state else {
            return false;
        };
        let Ok(mut state) = state.lock() else {
            return false;
        };
        if state.clear_caches_requested {
            state.clear_caches_requested = false;
            self.optimizer.clear_caches();
            summary.cache_clears += 1;
        }
        state.quit_requested
    }
}
