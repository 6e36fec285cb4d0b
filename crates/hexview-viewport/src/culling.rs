//! Cell culling and importance ranking.
//!
//! Each cell goes through the bounds, resolution band, distance and minimum
//! area filters in that order. All survivors are ranked by importance and
//! only then truncated to the budget, so the visible set never depends on
//! input order beyond ties.

use std::cmp::Ordering;

use tracing::trace;

use crate::bounds::{ViewportBounds, haversine_km};
use crate::cell::{Cell, GeoPoint};
use crate::lod::LodLevel;

/// Resolution the importance ranking prefers.
pub const IDEAL_RESOLUTION: u8 = 3;

/// Allowed distance between a cell's resolution and the tier's.
pub const RESOLUTION_BAND: u8 = 1;

/// Tiers below this resolution drop small cells.
pub const COARSE_RESOLUTION_LIMIT: u8 = 3;

/// Minimum cell area (km²) kept at coarse tiers.
pub const MIN_COARSE_AREA: f64 = 100_000.0;

/// First filter a cell failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullReason {
    OutOfBounds,
    Resolution,
    Distance,
    TooSmall,
    OverBudget,
}

/// Per-reason culled counts for one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CullStats {
    pub out_of_bounds: usize,
    pub resolution: usize,
    pub distance: usize,
    pub too_small: usize,
    pub over_budget: usize,
}

impl CullStats {
    fn record(&mut self, reason: CullReason) {
        match reason {
            CullReason::OutOfBounds => self.out_of_bounds += 1,
            CullReason::Resolution => self.resolution += 1,
            CullReason::Distance => self.distance += 1,
            CullReason::TooSmall => self.too_small += 1,
            CullReason::OverBudget => self.over_budget += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.out_of_bounds + self.resolution + self.distance + self.too_small + self.over_budget
    }
}

/// Visible/culled split of an input slice.
#[derive(Debug, Default)]
pub struct CullPartition<'a> {
    pub visible: Vec<&'a Cell>,
    pub culled: Vec<&'a Cell>,
    pub stats: CullStats,
}

/// Run the filters on one cell. `None` means the cell survives.
pub fn classify(
    cell: &Cell,
    bounds: &ViewportBounds,
    center: GeoPoint,
    lod: &LodLevel,
) -> Option<CullReason> {
    if !bounds.contains(cell.center) {
        return Some(CullReason::OutOfBounds);
    }
    if cell.resolution.abs_diff(lod.resolution) > RESOLUTION_BAND {
        return Some(CullReason::Resolution);
    }
    if haversine_km(cell.center, center) > lod.cull_distance_km {
        return Some(CullReason::Distance);
    }
    if lod.resolution < COARSE_RESOLUTION_LIMIT && cell.area < MIN_COARSE_AREA {
        return Some(CullReason::TooSmall);
    }
    None
}

/// Importance ordering: land first, then resolution closest to
/// [`IDEAL_RESOLUTION`], then larger area first.
pub fn importance_order(a: &Cell, b: &Cell) -> Ordering {
    b.is_land
        .cmp(&a.is_land)
        .then_with(|| {
            a.resolution
                .abs_diff(IDEAL_RESOLUTION)
                .cmp(&b.resolution.abs_diff(IDEAL_RESOLUTION))
        })
        .then_with(|| b.area.total_cmp(&a.area))
}

/// Stable-sort `visible` by importance and split off everything past `budget`.
///
/// Returns the overflow in ranked order.
pub fn rank_and_truncate<'a>(visible: &mut Vec<&'a Cell>, budget: usize) -> Vec<&'a Cell> {
    visible.sort_by(|a, b| importance_order(a, b));
    if visible.len() > budget {
        visible.split_off(budget)
    } else {
        Vec::new()
    }
}

/// Partition `cells` for a tier.
///
/// With culling disabled the input order is kept and simply cut at `budget`.
pub fn cull_cells<'a>(
    cells: &'a [Cell],
    bounds: &ViewportBounds,
    lod: &LodLevel,
    budget: usize,
    enable_culling: bool,
) -> CullPartition<'a> {
    if !enable_culling {
        let split = budget.min(cells.len());
        let (visible, culled) = cells.split_at(split);
        return CullPartition {
            visible: visible.iter().collect(),
            culled: culled.iter().collect(),
            stats: CullStats {
                over_budget: culled.len(),
                ..CullStats::default()
            },
        };
    }

    let center = bounds.center();
    let mut partition = CullPartition::default();
    for cell in cells {
        match classify(cell, bounds, center, lod) {
            None => partition.visible.push(cell),
            Some(reason) => {
                partition.stats.record(reason);
                partition.culled.push(cell);
            }
        }
    }

    let overflow = rank_and_truncate(&mut partition.visible, budget);
    partition.stats.over_budget = overflow.len();
    partition.culled.extend(overflow);

    trace!(
        visible = partition.visible.len(),
        out_of_bounds = partition.stats.out_of_bounds,
        resolution = partition.stats.resolution,
        distance = partition.stats.distance,
        too_small = partition.stats.too_small,
        over_budget = partition.stats.over_budget,
        "culled cells"
    );

    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::DEFAULT_LOD_LEVELS;

    fn cell(id: u64, resolution: u8, lat: f64, lon: f64, area: f64, is_land: bool) -> Cell {
        Cell::new(id, resolution, GeoPoint::new(lat, lon), area, is_land)
    }

    fn europe() -> ViewportBounds {
        ViewportBounds {
            north: 60.0,
            south: 35.0,
            west: -10.0,
            east: 30.0,
        }
    }

    fn ids(cells: &[&Cell]) -> Vec<u64> {
        cells.iter().map(|c| c.id.0).collect()
    }

    #[test]
    fn test_filters_apply_in_order() {
        let lod = DEFAULT_LOD_LEVELS[4]; // resolution 5, 500 km
        let bounds = europe();
        let center = bounds.center();

        let outside = cell(1, 9, -40.0, 100.0, 1.0, true);
        assert_eq!(
            classify(&outside, &bounds, center, &lod),
            Some(CullReason::OutOfBounds)
        );

        let wrong_res = cell(2, 7, 48.0, 10.0, 1.0, true);
        assert_eq!(
            classify(&wrong_res, &bounds, center, &lod),
            Some(CullReason::Resolution)
        );

        // In bounds but ~2000 km from (47.5, 10).
        let far = cell(3, 5, 36.0, -9.0, 1.0, true);
        assert_eq!(
            classify(&far, &bounds, center, &lod),
            Some(CullReason::Distance)
        );

        let ok = cell(4, 4, 47.0, 9.0, 1.0, true);
        assert_eq!(classify(&ok, &bounds, center, &lod), None);
    }

    #[test]
    fn test_resolution_band_is_plus_minus_one() {
        let lod = DEFAULT_LOD_LEVELS[2]; // resolution 3
        let bounds = europe();
        let center = bounds.center();
        for (res, expected) in [(1, false), (2, true), (3, true), (4, true), (5, false)] {
            let c = cell(res as u64, res, 47.5, 10.0, 1.0, false);
            assert_eq!(classify(&c, &bounds, center, &lod).is_none(), expected, "res {res}");
        }
    }

    #[test]
    fn test_small_cells_dropped_only_at_coarse_tiers() {
        let bounds = ViewportBounds::WORLD;
        let center = bounds.center();
        let small = cell(1, 2, 0.0, 0.0, 50_000.0, true);
        assert_eq!(
            classify(&small, &bounds, center, &DEFAULT_LOD_LEVELS[1]),
            Some(CullReason::TooSmall)
        );
        let small_res3 = cell(2, 3, 0.0, 0.0, 50_000.0, true);
        assert_eq!(
            classify(&small_res3, &bounds, center, &DEFAULT_LOD_LEVELS[2]),
            None
        );
    }

    #[test]
    fn test_importance_order() {
        let sea_ideal = cell(1, 3, 0.0, 0.0, 10.0, false);
        let land_far_res = cell(2, 5, 0.0, 0.0, 10.0, true);
        let land_ideal_small = cell(3, 3, 0.0, 0.0, 5.0, true);
        let land_ideal_big = cell(4, 3, 0.0, 0.0, 50.0, true);
        let mut cells = vec![&sea_ideal, &land_far_res, &land_ideal_small, &land_ideal_big];
        cells.sort_by(|a, b| importance_order(a, b));
        assert_eq!(ids(&cells), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_budget_keeps_most_important() {
        let lod = DEFAULT_LOD_LEVELS[2];
        let cells: Vec<Cell> = (0..10)
            .map(|i| cell(i, 3, 47.5, 10.0, i as f64, i % 2 == 0))
            .collect();
        let partition = cull_cells(&cells, &europe(), &lod, 3, true);
        assert_eq!(ids(&partition.visible), vec![8, 6, 4]);
        assert_eq!(partition.culled.len(), 7);
        assert_eq!(partition.stats.over_budget, 7);
    }

    #[test]
    fn test_disabled_culling_slices_input() {
        let lod = DEFAULT_LOD_LEVELS[0];
        let cells: Vec<Cell> = (0..5).map(|i| cell(i, 9, -80.0, 170.0, 0.0, false)).collect();
        let partition = cull_cells(&cells, &europe(), &lod, 2, false);
        assert_eq!(ids(&partition.visible), vec![0, 1]);
        assert_eq!(ids(&partition.culled), vec![2, 3, 4]);
    }

    #[test]
    fn test_empty_input() {
        let partition = cull_cells(&[], &europe(), &DEFAULT_LOD_LEVELS[0], 10, true);
        assert!(partition.visible.is_empty());
        assert!(partition.culled.is_empty());
        assert_eq!(partition.stats.total(), 0);
    }

    #[test]
    fn test_zero_budget_culls_everything() {
        let cells = vec![cell(1, 3, 47.5, 10.0, 1.0, true)];
        let partition = cull_cells(&cells, &europe(), &DEFAULT_LOD_LEVELS[2], 0, true);
        assert!(partition.visible.is_empty());
        assert_eq!(partition.culled.len(), 1);
    }

    #[test]
    fn test_antimeridian_bounds_keep_cells_on_both_sides() {
        let bounds = ViewportBounds {
            north: 10.0,
            south: -10.0,
            west: 170.0,
            east: -170.0,
        };
        let lod = DEFAULT_LOD_LEVELS[3];
        let cells = vec![
            cell(1, 4, 0.0, 179.0, 1.0, true),
            cell(2, 4, 0.0, -179.0, 1.0, true),
            cell(3, 4, 0.0, 0.0, 1.0, true),
        ];
        let partition = cull_cells(&cells, &bounds, &lod, 100, true);
        assert_eq!(ids(&partition.visible), vec![1, 2]);
        assert_eq!(partition.stats.out_of_bounds, 1);
    }
}
