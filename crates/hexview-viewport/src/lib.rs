//! Viewport optimization for hexagonal cell maps.
//!
//! Given a pre-computed cell population and the current map view, decides
//! which cells to render: bounds with preload margin, a zoom-driven LOD tier
//! nudged by frame time, culling filters ranked by importance under a cell
//! budget, and a quantized-view cache.

mod bounds;
mod cache;
mod cell;
mod culling;
mod lod;
mod optimizer;
mod performance;


pub use bounds::{
    EARTH_RADIUS_KM, MAX_LATITUDE, ViewState, ViewportBounds, calculate_bounds, haversine_km,
    longitude_delta, wrap_longitude,
};
pub use cache::{
    CacheKey, LastUpdate, MAX_CACHE_ENTRIES, MAX_VISIBILITY_ENTRIES, ORIENTATION_THRESHOLD_DEG,
    RETAINED_CACHE_ENTRIES, ViewportCache, should_update,
};
pub use cell::{Cell, CellId, GeoPoint};
pub use culling::{
    COARSE_RESOLUTION_LIMIT, CullPartition, CullReason, CullStats, IDEAL_RESOLUTION,
    MIN_COARSE_AREA, RESOLUTION_BAND, classify, cull_cells, importance_order, rank_and_truncate,
};
pub use hexview_config::{ViewportConfig, ViewportConfigUpdate};
pub use lod::{
    AdaptiveSettings, DEFAULT_LOD_LEVELS, LodLevel, LodSelector, LodTable, LodTableError,
    base_lod_index,
};
pub use optimizer::{CullResult, DebugInfo, ViewportOptimizer};
pub use performance::{HISTORY_LEN, PerformanceMetrics, PerformanceMonitor};
