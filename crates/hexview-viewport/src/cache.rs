//! Update gating and memoized culling results.
//!
//! Results are keyed by a quantized view state so sub-threshold jitter lands
//! on the same entry. Entries hold cell ids only; a hit re-partitions the
//! caller's current slice by id, so refreshed inputs with stable ids are
//! served correctly.

use std::collections::VecDeque;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::debug;

use crate::bounds::{ViewState, longitude_delta};
use crate::cell::{Cell, CellId};
use crate::culling::{CullPartition, CullStats, rank_and_truncate};

/// Entry count that triggers eviction.
pub const MAX_CACHE_ENTRIES: usize = 100;

/// Entries kept (most recently inserted) after eviction.
pub const RETAINED_CACHE_ENTRIES: usize = MAX_CACHE_ENTRIES / 2;

/// Visibility map size that triggers a full reset.
pub const MAX_VISIBILITY_ENTRIES: usize = 100_000;

/// Pitch and bearing changes below this many degrees count as jitter.
pub const ORIENTATION_THRESHOLD_DEG: f64 = 5.0;

// Rough per-item footprints used for the memory estimate.
const BYTES_PER_CACHED_ID: usize = 24;
const BYTES_PER_VISIBILITY_ENTRY: usize = 24;

/// The last view state that triggered a recomputation.
#[derive(Clone, Copy, Debug)]
pub struct LastUpdate {
    pub view: ViewState,
    pub at: Instant,
}

/// Decide whether a view change warrants recomputation.
///
/// Returns `false` only when there is a previous update, it is younger than
/// `update_interval_ms`, and every view delta is below its threshold.
pub fn should_update(
    last: Option<&LastUpdate>,
    view: &ViewState,
    now: Instant,
    update_interval_ms: f64,
    update_threshold: f64,
) -> bool {
    let Some(last) = last else {
        return true;
    };
    let elapsed_ms = now.saturating_duration_since(last.at).as_secs_f64() * 1000.0;
    if elapsed_ms >= update_interval_ms || update_interval_ms.is_nan() {
        return true;
    }

    let prev = &last.view;
    let below = (view.zoom - prev.zoom).abs() < update_threshold
        && (view.latitude - prev.latitude).abs() < update_threshold
        && longitude_delta(prev.longitude, view.longitude) < update_threshold
        && (view.pitch - prev.pitch).abs() < ORIENTATION_THRESHOLD_DEG
        && longitude_delta(prev.bearing, view.bearing) < ORIENTATION_THRESHOLD_DEG;
    !below
}

/// View state quantized to 0.01° of latitude/longitude and 0.1 of zoom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    lat: i32,
    lon: i32,
    zoom: i32,
}

impl CacheKey {
    pub fn from_view(view: &ViewState) -> Self {
        // `as` saturates and maps NaN to 0.
        Self {
            lat: (view.latitude * 100.0).round() as i32,
            lon: (view.longitude * 100.0).round() as i32,
            zoom: (view.zoom * 10.0).round() as i32,
        }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    lod_level: usize,
    visible: Vec<CellId>,
    visible_set: FxHashSet<CellId>,
}

/// Memoized partitions plus a global last-known visibility map.
#[derive(Debug, Default)]
pub struct ViewportCache {
    entries: FxHashMap<CacheKey, CacheEntry>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<CacheKey>,
    visibility: FxHashMap<CellId, bool>,
    hits: u64,
    lookups: u64,
}

impl ViewportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive a partition of `cells` from the entry for `key`.
    ///
    /// Misses when there is no entry or it was computed at another tier.
    /// Cells whose ids the entry does not know are culled.
    pub fn lookup<'a>(
        &mut self,
        key: &CacheKey,
        lod_level: usize,
        cells: &'a [Cell],
        budget: usize,
    ) -> Option<CullPartition<'a>> {
        self.lookups += 1;
        let entry = self
            .entries
            .get(key)
            .filter(|entry| entry.lod_level == lod_level)?;
        self.hits += 1;

        let (mut visible, mut culled): (Vec<&Cell>, Vec<&Cell>) = cells
            .iter()
            .partition(|cell| entry.visible_set.contains(&cell.id));
        let overflow = rank_and_truncate(&mut visible, budget);
        let stats = CullStats {
            over_budget: overflow.len(),
            ..CullStats::default()
        };
        culled.extend(overflow);
        Some(CullPartition {
            visible,
            culled,
            stats,
        })
    }

    /// Store a freshly computed partition and prune.
    pub fn insert(&mut self, key: CacheKey, lod_level: usize, partition: &CullPartition<'_>) {
        let visible: Vec<CellId> = partition.visible.iter().map(|cell| cell.id).collect();
        let visible_set = visible.iter().copied().collect();
        let entry = CacheEntry {
            lod_level,
            visible,
            visible_set,
        };

        if self.entries.insert(key, entry).is_some() {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key);

        for cell in &partition.visible {
            self.visibility.insert(cell.id, true);
        }
        for cell in &partition.culled {
            self.visibility.insert(cell.id, false);
        }

        self.prune();
    }

    fn prune(&mut self) {
        if self.entries.len() > MAX_CACHE_ENTRIES {
            let evict = self.entries.len() - RETAINED_CACHE_ENTRIES;
            for key in self.order.drain(..evict) {
                self.entries.remove(&key);
            }
            debug!(evicted = evict, retained = self.entries.len(), "pruned viewport cache");
        }
        if self.visibility.len() > MAX_VISIBILITY_ENTRIES {
            debug!(size = self.visibility.len(), "reset visibility map");
            self.visibility.clear();
        }
    }

    /// Last known visibility of a cell, if it has been seen since the last reset.
    pub fn cell_visibility(&self, id: CellId) -> Option<bool> {
        self.visibility.get(&id).copied()
    }

    /// Visible ids stored for `key`, in ranked order.
    pub fn cached_visible(&self, key: &CacheKey) -> Option<&[CellId]> {
        self.entries.get(key).map(|entry| entry.visible.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn visibility_len(&self) -> usize {
        self.visibility.len()
    }

    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }

    /// Estimated footprint of entries and the visibility map, in MB.
    pub fn memory_usage_mb(&self) -> f64 {
        let cached_ids: usize = self.entries.values().map(|e| e.visible.len() * 2).sum();
        let bytes = cached_ids * BYTES_PER_CACHED_ID
            + self.visibility.len() * BYTES_PER_VISIBILITY_ENTRY;
        bytes as f64 / (1024.0 * 1024.0)
    }

    /// Drop all entries, the visibility map and hit statistics.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.visibility.clear();
        self.hits = 0;
        self.lookups = 0;
    }
}
