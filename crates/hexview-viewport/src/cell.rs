//! Pre-computed hexagonal cells consumed by the optimizer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque 64-bit cell identity (an H3-style index).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:015x}", self.0)
    }
}

/// A geographic point in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A hexagonal cell produced upstream. The optimizer only reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    /// Hierarchy resolution. Smaller is coarser.
    pub resolution: u8,
    pub center: GeoPoint,
    /// Cell area in km².
    pub area: f64,
    pub is_land: bool,
}

impl Cell {
    pub fn new(id: u64, resolution: u8, center: GeoPoint, area: f64, is_land: bool) -> Self {
        Self {
            id: CellId(id),
            resolution,
            center,
            area,
            is_land,
        }
    }
}
