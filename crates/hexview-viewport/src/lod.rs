//! Zoom-based LOD tier selection with frame-time adaptation.
//!
//! Tiers are ordered coarse to fine: index 0 is the world view, the last
//! index is street level. The adaptive bias moves at most one tier per call.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bounds::ViewState;

/// One level-of-detail tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Inclusive lower zoom bound.
    pub min_zoom: f64,
    /// Exclusive upper zoom bound.
    pub max_zoom: f64,
    /// Target cell resolution for this tier.
    pub resolution: u8,
    /// Cell budget for this tier.
    pub max_cells: usize,
    /// Cells further than this from the bounds centre are culled.
    pub cull_distance_km: f64,
    /// View deltas below this are treated as jitter.
    pub update_threshold: f64,
}

impl LodLevel {
    /// Whether `zoom` falls inside `[min_zoom, max_zoom)`.
    pub fn contains_zoom(&self, zoom: f64) -> bool {
        zoom >= self.min_zoom && zoom < self.max_zoom
    }
}

/// The six built-in tiers, world view to street level.
pub const DEFAULT_LOD_LEVELS: [LodLevel; 6] = [
    LodLevel {
        min_zoom: 0.0,
        max_zoom: 2.0,
        resolution: 1,
        max_cells: 1_000,
        cull_distance_km: 20_000.0,
        update_threshold: 2.0,
    },
    LodLevel {
        min_zoom: 2.0,
        max_zoom: 4.0,
        resolution: 2,
        max_cells: 2_000,
        cull_distance_km: 10_000.0,
        update_threshold: 1.0,
    },
    LodLevel {
        min_zoom: 4.0,
        max_zoom: 6.0,
        resolution: 3,
        max_cells: 5_000,
        cull_distance_km: 5_000.0,
        update_threshold: 0.5,
    },
    LodLevel {
        min_zoom: 6.0,
        max_zoom: 9.0,
        resolution: 4,
        max_cells: 10_000,
        cull_distance_km: 2_000.0,
        update_threshold: 0.2,
    },
    LodLevel {
        min_zoom: 9.0,
        max_zoom: 12.0,
        resolution: 5,
        max_cells: 20_000,
        cull_distance_km: 500.0,
        update_threshold: 0.1,
    },
    LodLevel {
        min_zoom: 12.0,
        max_zoom: 24.0,
        resolution: 6,
        max_cells: 50_000,
        cull_distance_km: 100.0,
        update_threshold: 0.05,
    },
];

/// Reasons a LOD table is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodTableError {
    #[error("LOD table must have at least one tier")]
    Empty,
    #[error("tier {index} has an empty zoom range [{min_zoom}, {max_zoom})")]
    EmptyZoomRange {
        index: usize,
        min_zoom: f64,
        max_zoom: f64,
    },
    #[error("tier {index} does not start where the previous tier ends")]
    NotContiguous { index: usize },
    #[error("tier {index} breaks the monotonic {field} ordering")]
    NotMonotonic { index: usize, field: &'static str },
}

/// A validated, ordered list of LOD tiers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LodTable {
    levels: Vec<LodLevel>,
}

impl Default for LodTable {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LOD_LEVELS.to_vec(),
        }
    }
}

impl LodTable {
    /// Build a table, checking that tiers are contiguous and that budgets and
    /// thresholds move in the right direction as zoom increases.
    pub fn new(levels: Vec<LodLevel>) -> Result<Self, LodTableError> {
        if levels.is_empty() {
            return Err(LodTableError::Empty);
        }
        for (index, level) in levels.iter().enumerate() {
            if level.min_zoom.partial_cmp(&level.max_zoom) != Some(std::cmp::Ordering::Less) {
                return Err(LodTableError::EmptyZoomRange {
                    index,
                    min_zoom: level.min_zoom,
                    max_zoom: level.max_zoom,
                });
            }
            if index == 0 {
                continue;
            }
            let prev = &levels[index - 1];
            if prev.max_zoom != level.min_zoom {
                return Err(LodTableError::NotContiguous { index });
            }
            let checks = [
                ("resolution", level.resolution >= prev.resolution),
                ("max_cells", level.max_cells >= prev.max_cells),
                (
                    "cull_distance_km",
                    level.cull_distance_km <= prev.cull_distance_km,
                ),
                (
                    "update_threshold",
                    level.update_threshold <= prev.update_threshold,
                ),
            ];
            if let Some((field, _)) = checks.into_iter().find(|(_, ok)| !ok) {
                return Err(LodTableError::NotMonotonic { index, field });
            }
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Index of the finest tier.
    pub fn finest(&self) -> usize {
        self.levels.len() - 1
    }

    /// Tier at `index`, clamped to the finest tier.
    pub fn level(&self, index: usize) -> &LodLevel {
        &self.levels[index.min(self.finest())]
    }
}

/// First tier containing `zoom`, or the finest tier when none does.
pub fn base_lod_index(table: &LodTable, zoom: f64) -> usize {
    table
        .levels()
        .iter()
        .position(|level| level.contains_zoom(zoom))
        .unwrap_or_else(|| table.finest())
}

/// Frame-time targets for adaptive LOD.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdaptiveSettings {
    /// Frame time budget in milliseconds. Zero disables adaptation.
    pub target_frame_time_ms: f64,
    /// Step coarser when `frame_time / target` exceeds this.
    pub performance_margin: f64,
    /// Step finer when `frame_time / target` drops below this.
    pub adaptive_threshold: f64,
}

impl AdaptiveSettings {
    pub fn from_frame_rate(target_frame_rate: f64) -> Self {
        let target_frame_time_ms = if target_frame_rate.is_finite() && target_frame_rate > 0.0 {
            1000.0 / target_frame_rate
        } else {
            0.0
        };
        Self {
            target_frame_time_ms,
            performance_margin: 1.2,
            adaptive_threshold: 0.8,
        }
    }

    /// Direction to move for a measured frame time: -1 coarser, +1 finer, 0 stay.
    pub fn step_for(&self, frame_time_ms: f64) -> i32 {
        if self.target_frame_time_ms <= 0.0 || !frame_time_ms.is_finite() {
            return 0;
        }
        let ratio = frame_time_ms / self.target_frame_time_ms;
        if ratio > self.performance_margin {
            -1
        } else if ratio < self.adaptive_threshold {
            1
        } else {
            0
        }
    }
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self::from_frame_rate(60.0)
    }
}

/// Selects a tier from zoom and nudges it from frame-time history.
#[derive(Clone, Debug)]
pub struct LodSelector {
    table: LodTable,
    adaptive: AdaptiveSettings,
    /// Tiers the adaptive logic has moved away from the zoom tier.
    bias: i32,
    current: usize,
}

impl LodSelector {
    pub fn new(table: LodTable, adaptive: AdaptiveSettings) -> Self {
        Self {
            table,
            adaptive,
            bias: 0,
            current: 0,
        }
    }

    /// Select the tier for a view.
    ///
    /// With `enable_lod` off the finest tier is always used. Adaptation moves
    /// one tier per call at most. A call without a frame time keeps the
    /// current offset from the zoom tier; disabling adaptation drops it.
    pub fn select(
        &mut self,
        view: &ViewState,
        frame_time_ms: Option<f64>,
        enable_lod: bool,
        enable_adaptive: bool,
    ) -> usize {
        let index = if !enable_lod {
            self.bias = 0;
            self.table.finest()
        } else {
            let base = base_lod_index(&self.table, view.sanitized_zoom());
            match frame_time_ms {
                _ if !enable_adaptive => {
                    self.bias = 0;
                    base
                }
                Some(frame_time) => self.adapt(base, self.adaptive.step_for(frame_time)),
                None => self.adapt(base, 0),
            }
        };

        if index != self.current {
            debug!(from = self.current, to = index, zoom = view.zoom, "LOD tier changed");
        }
        self.current = index;
        index
    }

    fn adapt(&mut self, base: usize, step: i32) -> usize {
        let finest = self.table.finest() as i32;
        let base = base as i32;
        let current = (base + self.bias).clamp(0, finest);
        let next = (current + step).clamp(0, finest);
        self.bias = next - base;
        next as usize
    }

    /// Index returned by the last call to [`select`](Self::select).
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_level(&self) -> &LodLevel {
        self.table.level(self.current)
    }

    pub fn bias(&self) -> i32 {
        self.bias
    }

    pub fn reset_bias(&mut self) {
        self.bias = 0;
    }

    pub fn table(&self) -> &LodTable {
        &self.table
    }

    pub fn adaptive(&self) -> &AdaptiveSettings {
        &self.adaptive
    }

    pub fn set_adaptive(&mut self, adaptive: AdaptiveSettings) {
        self.adaptive = adaptive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> LodSelector {
        LodSelector::new(LodTable::default(), AdaptiveSettings::from_frame_rate(60.0))
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = LodTable::new(DEFAULT_LOD_LEVELS.to_vec()).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.finest(), 5);
    }

    #[test]
    fn test_base_index_by_zoom() {
        let table = LodTable::default();
        assert_eq!(base_lod_index(&table, 0.0), 0);
        assert_eq!(base_lod_index(&table, 1.99), 0);
        assert_eq!(base_lod_index(&table, 2.0), 1);
        assert_eq!(base_lod_index(&table, 5.5), 2);
        assert_eq!(base_lod_index(&table, 11.0), 4);
        assert_eq!(base_lod_index(&table, 18.0), 5);
    }

    #[test]
    fn test_zoom_beyond_table_falls_back_to_finest() {
        let table = LodTable::default();
        assert_eq!(base_lod_index(&table, 30.0), 5);
        assert_eq!(base_lod_index(&table, -1.0), 5);
    }

    #[test]
    fn test_tier_boundaries_are_monotonic() {
        let table = LodTable::default();
        let mut prev = *table.level(0);
        for level in table.levels() {
            for zoom in [level.min_zoom, (level.min_zoom + level.max_zoom) / 2.0] {
                let selected = table.level(base_lod_index(&table, zoom));
                assert!(selected.resolution >= prev.resolution);
                assert!(selected.max_cells >= prev.max_cells);
                prev = *selected;
            }
        }
    }

    #[test]
    fn test_lod_disabled_uses_finest() {
        let mut selector = selector();
        let view = ViewState::new(0.0, 0.0, 1.0);
        assert_eq!(selector.select(&view, Some(100.0), false, true), 5);
    }

    #[test]
    fn test_no_frame_time_keeps_base() {
        let mut selector = selector();
        let view = ViewState::new(0.0, 0.0, 7.0);
        assert_eq!(selector.select(&view, None, true, true), 3);
    }

    #[test]
    fn test_slow_frames_step_one_tier_per_call() {
        let mut selector = selector();
        let view = ViewState::new(0.0, 0.0, 13.0);
        // 40ms against a 16.7ms target: ratio ~2.4
        let picks: Vec<usize> = (0..7)
            .map(|_| selector.select(&view, Some(40.0), true, true))
            .collect();
        assert_eq!(picks, vec![4, 3, 2, 1, 0, 0, 0]);
    }

    #[test]
    fn test_fast_frames_step_finer_but_not_past_finest() {
        let mut selector = selector();
        let view = ViewState::new(0.0, 0.0, 3.0);
        let picks: Vec<usize> = (0..6)
            .map(|_| selector.select(&view, Some(1.0), true, true))
            .collect();
        assert_eq!(picks, vec![2, 3, 4, 5, 5, 5]);
    }

    #[test]
    fn test_frame_time_inside_band_holds() {
        let mut selector = selector();
        let view = ViewState::new(0.0, 0.0, 7.0);
        selector.select(&view, Some(40.0), true, true);
        assert_eq!(selector.current(), 2);
        // ratio 1.0 sits between threshold and margin: the degraded tier holds.
        assert_eq!(selector.select(&view, Some(16.7), true, true), 2);
    }

    #[test]
    fn test_missing_frame_time_holds_degraded_tier() {
        let mut selector = selector();
        let view = ViewState::new(0.0, 0.0, 13.0);
        let frames = [
            Some(100.0),
            Some(100.0),
            Some(100.0),
            Some(100.0),
            None,
            Some(16.7),
            None,
            Some(100.0),
            None,
            Some(1.0),
        ];
        let picks: Vec<usize> = frames
            .iter()
            .map(|frame| selector.select(&view, *frame, true, true))
            .collect();
        assert_eq!(picks, vec![4, 3, 2, 1, 1, 1, 1, 0, 0, 1]);
        for pair in picks.windows(2) {
            assert!(pair[0].abs_diff(pair[1]) <= 1, "jumped {} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_disabling_adaptation_drops_offset() {
        let mut selector = selector();
        let view = ViewState::new(0.0, 0.0, 13.0);
        selector.select(&view, Some(100.0), true, true);
        selector.select(&view, Some(100.0), true, true);
        assert_eq!(selector.bias(), -2);
        assert_eq!(selector.select(&view, Some(100.0), true, false), 5);
        assert_eq!(selector.bias(), 0);
        assert_eq!(selector.select(&view, Some(100.0), true, true), 4);
    }

    #[test]
    fn test_adaptive_disabled_ignores_frame_time() {
        let mut selector = selector();
        let view = ViewState::new(0.0, 0.0, 7.0);
        assert_eq!(selector.select(&view, Some(500.0), true, false), 3);
        assert_eq!(selector.bias(), 0);
    }

    #[test]
    fn test_zero_target_frame_rate_never_adapts() {
        let settings = AdaptiveSettings::from_frame_rate(0.0);
        assert_eq!(settings.step_for(1000.0), 0);
        assert_eq!(settings.step_for(0.0), 0);
        assert_eq!(AdaptiveSettings::default().step_for(f64::NAN), 0);
    }

    #[test]
    fn test_rejects_gapped_table() {
        let mut levels = DEFAULT_LOD_LEVELS.to_vec();
        levels[2].min_zoom = 4.5;
        assert_eq!(
            LodTable::new(levels),
            Err(LodTableError::NotContiguous { index: 2 })
        );
    }

    #[test]
    fn test_rejects_non_monotonic_budget() {
        let mut levels = DEFAULT_LOD_LEVELS.to_vec();
        levels[3].max_cells = 100;
        assert_eq!(
            LodTable::new(levels),
            Err(LodTableError::NotMonotonic {
                index: 3,
                field: "max_cells"
            })
        );
    }

    #[test]
    fn test_rejects_empty_table() {
        assert_eq!(LodTable::new(Vec::new()), Err(LodTableError::Empty));
        let mut levels = DEFAULT_LOD_LEVELS.to_vec();
        levels[0].max_zoom = f64::NAN;
        assert!(matches!(
            LodTable::new(levels),
            Err(LodTableError::EmptyZoomRange { index: 0, .. })
        ));
    }
}
