//! The caller-owned viewport optimizer.
//!
//! One [`ViewportOptimizer`] per map view. Calls must be serialized; every
//! call runs to completion and always yields a well-formed [`CullResult`].

use std::time::{Duration, Instant};

use hexview_config::{ViewportConfig, ViewportConfigUpdate};
use serde::Serialize;
use tracing::{info, trace, warn};

use crate::bounds::{ViewState, calculate_bounds};
use crate::cache::{CacheKey, LastUpdate, ViewportCache, should_update};
use crate::cell::{Cell, CellId};
use crate::culling::cull_cells;
use crate::lod::{AdaptiveSettings, LodLevel, LodSelector, LodTable};
use crate::performance::{PerformanceMetrics, PerformanceMonitor};

/// Output of one optimizer call.
#[derive(Debug)]
pub struct CullResult<'a> {
    /// Cells to render, most important first.
    pub visible_cells: Vec<&'a Cell>,
    pub culled_cells: Vec<&'a Cell>,
    /// Index of the selected tier.
    pub lod_level: usize,
    /// Whether the view moved enough for the renderer to refresh.
    pub update_required: bool,
    /// The partition was re-derived from a cache entry.
    pub from_cache: bool,
}

/// Diagnostic dump of optimizer state.
#[derive(Clone, Debug, Serialize)]
pub struct DebugInfo {
    pub lod_levels: Vec<LodLevel>,
    pub current_lod: usize,
    pub adaptive_bias: i32,
    pub adaptive: AdaptiveSettings,
    pub cache_size: usize,
    pub visibility_map_size: usize,
    pub performance_history: Vec<f64>,
    /// Time of the last committed update, in ms since the optimizer was created.
    pub last_update_ms: Option<f64>,
    pub config: ViewportConfig,
}

/// Viewport culling state: tier selection, caches and timing history.
pub struct ViewportOptimizer {
    config: ViewportConfig,
    selector: LodSelector,
    cache: ViewportCache,
    monitor: PerformanceMonitor,
    last_update: Option<LastUpdate>,
    created_at: Instant,
    over_memory_limit: bool,
}

impl Default for ViewportOptimizer {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportOptimizer {
    /// Create an optimizer with the built-in LOD tiers.
    pub fn new(config: ViewportConfig) -> Self {
        Self::with_lod_table(config, LodTable::default())
    }

    /// Create an optimizer with a custom tier table.
    pub fn with_lod_table(config: ViewportConfig, table: LodTable) -> Self {
        let adaptive = AdaptiveSettings::from_frame_rate(config.target_frame_rate);
        Self {
            selector: LodSelector::new(table, adaptive),
            config,
            cache: ViewportCache::new(),
            monitor: PerformanceMonitor::new(),
            last_update: None,
            created_at: Instant::now(),
            over_memory_limit: false,
        }
    }

    /// Decide which of `cells` to render for `view`.
    ///
    /// `frame_time_ms` is the host's most recent frame time; when present and
    /// adaptive updates are enabled it nudges the LOD tier.
    pub fn optimize_viewport<'a>(
        &mut self,
        cells: &'a [Cell],
        view: &ViewState,
        frame_time_ms: Option<f64>,
    ) -> CullResult<'a> {
        self.optimize_viewport_at(cells, view, frame_time_ms, Instant::now())
    }

    /// [`optimize_viewport`](Self::optimize_viewport) with an explicit clock reading.
    pub fn optimize_viewport_at<'a>(
        &mut self,
        cells: &'a [Cell],
        view: &ViewState,
        frame_time_ms: Option<f64>,
        now: Instant,
    ) -> CullResult<'a> {
        let started = Instant::now();

        let update_required = should_update(
            self.last_update.as_ref(),
            view,
            now,
            self.config.update_interval_ms,
            self.selector.current_level().update_threshold,
        );
        if update_required {
            self.last_update = Some(LastUpdate { view: *view, at: now });
        }

        let lod_level = self.selector.select(
            view,
            frame_time_ms,
            self.config.enable_lod,
            self.config.enable_adaptive_update,
        );
        let lod = *self.selector.table().level(lod_level);
        let budget = lod.max_cells.min(self.config.max_cells);
        let key = CacheKey::from_view(view);

        // `update_required` only reports whether the renderer should refresh.
        // A cache miss is always recomputed so the partition matches `view`.
        let (partition, from_cache) = match self.cache.lookup(&key, lod_level, cells, budget) {
            Some(partition) => (partition, true),
            None => {
                let bounds = calculate_bounds(view, self.config.preload_radius);
                let partition =
                    cull_cells(cells, &bounds, &lod, budget, self.config.enable_culling);
                self.cache.insert(key, lod_level, &partition);
                (partition, false)
            }
        };

        self.monitor.record(started.elapsed());
        self.check_memory_limit();

        trace!(
            cells = cells.len(),
            visible = partition.visible.len(),
            lod_level,
            update_required,
            from_cache,
            "optimized viewport"
        );

        CullResult {
            visible_cells: partition.visible,
            culled_cells: partition.culled,
            lod_level,
            update_required,
            from_cache,
        }
    }

    fn check_memory_limit(&mut self) {
        let usage = self.cache.memory_usage_mb();
        let over = usage > self.config.memory_limit_mb;
        if over && !self.over_memory_limit {
            warn!(
                usage_mb = usage,
                limit_mb = self.config.memory_limit_mb,
                "viewport cache estimate exceeds memory limit"
            );
        }
        self.over_memory_limit = over;
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.monitor
            .metrics(self.cache.memory_usage_mb(), self.cache.hit_rate())
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            lod_levels: self.selector.table().levels().to_vec(),
            current_lod: self.selector.current(),
            adaptive_bias: self.selector.bias(),
            adaptive: *self.selector.adaptive(),
            cache_size: self.cache.len(),
            visibility_map_size: self.cache.visibility_len(),
            performance_history: self.monitor.history().collect(),
            last_update_ms: self.last_update.map(|update| {
                update.at.saturating_duration_since(self.created_at).as_secs_f64() * 1000.0
            }),
            config: self.config.clone(),
        }
    }

    /// Drop cached partitions and the visibility map.
    pub fn clear_caches(&mut self) {
        self.cache.clear();
        self.over_memory_limit = false;
        info!("viewport caches cleared");
    }

    /// Apply a partial option update. Cached partitions depend on the
    /// options, so caches are cleared.
    pub fn update_options(&mut self, update: &ViewportConfigUpdate) {
        if update.is_empty() {
            return;
        }
        self.config.apply(update);
        if update.target_frame_rate.is_some() {
            self.selector
                .set_adaptive(AdaptiveSettings::from_frame_rate(self.config.target_frame_rate));
        }
        if !self.config.enable_adaptive_update {
            self.selector.reset_bias();
        }
        self.cache.clear();
        self.over_memory_limit = false;
        info!(?update, "viewport options updated");
    }

    /// Last known visibility of a cell.
    pub fn cell_visibility(&self, id: CellId) -> Option<bool> {
        self.cache.cell_visibility(id)
    }

    /// Time since the optimizer was created.
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn current_lod(&self) -> usize {
        self.selector.current()
    }

    pub fn lod_table(&self) -> &LodTable {
        self.selector.table()
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }
}
