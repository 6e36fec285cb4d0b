//! View state, viewport bounding boxes and great-circle helpers.
//!
//! Bounds are derived from zoom alone: the visible span is treated as
//! inversely proportional to `2^zoom`. Boxes whose `west > east` cross the
//! anti-meridian and use an OR-combined longitude test.

use serde::{Deserialize, Serialize};

use crate::cell::GeoPoint;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude limit of the Web-Mercator-safe range.
pub const MAX_LATITUDE: f64 = 85.0;

/// Camera state emitted by the host map view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    /// Camera pitch in degrees.
    #[serde(default)]
    pub pitch: f64,
    /// Camera bearing in degrees.
    #[serde(default)]
    pub bearing: f64,
}

impl ViewState {
    pub fn new(longitude: f64, latitude: f64, zoom: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom,
            pitch: 0.0,
            bearing: 0.0,
        }
    }

    /// Zoom with non-finite and negative values mapped to 0.
    pub fn sanitized_zoom(&self) -> f64 {
        if self.zoom.is_finite() {
            self.zoom.max(0.0)
        } else {
            0.0
        }
    }
}

/// Geographic bounding box in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ViewportBounds {
    /// The whole Web-Mercator-safe globe.
    pub const WORLD: Self = Self {
        north: MAX_LATITUDE,
        south: -MAX_LATITUDE,
        east: 180.0,
        west: -180.0,
    };

    /// Whether the box wraps across ±180°.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Point-in-box test, anti-meridian aware.
    pub fn contains(&self, point: GeoPoint) -> bool {
        if point.lat < self.south || point.lat > self.north {
            return false;
        }
        let lon = wrap_longitude(point.lon);
        if self.crosses_antimeridian() {
            lon >= self.west || lon <= self.east
        } else {
            lon >= self.west && lon <= self.east
        }
    }

    /// Midpoint of the box. For crossing boxes the longitude midpoint is
    /// taken across the anti-meridian.
    pub fn center(&self) -> GeoPoint {
        let lat = (self.north + self.south) / 2.0;
        let lon = if self.crosses_antimeridian() {
            wrap_longitude((self.west + self.east + 360.0) / 2.0)
        } else {
            (self.west + self.east) / 2.0
        };
        GeoPoint::new(lat, lon)
    }
}

/// Compute the preload bounding box for a view.
///
/// `radius_multiplier` scales the half extents; values that are not finite
/// and positive fall back to 1.0.
pub fn calculate_bounds(view: &ViewState, radius_multiplier: f64) -> ViewportBounds {
    let multiplier = if radius_multiplier.is_finite() && radius_multiplier > 0.0 {
        radius_multiplier
    } else {
        1.0
    };
    let scale = 2f64.powf(view.sanitized_zoom());
    let lat_half = 180.0 / scale * multiplier;
    let lon_half = 360.0 / scale * multiplier;

    let lat = finite_or_zero(view.latitude).clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let lon = wrap_longitude(finite_or_zero(view.longitude));

    let north = (lat + lat_half).min(MAX_LATITUDE);
    let south = (lat - lat_half).max(-MAX_LATITUDE);

    if lon_half * 2.0 >= 360.0 {
        return ViewportBounds {
            north,
            south,
            east: 180.0,
            west: -180.0,
        };
    }

    ViewportBounds {
        north,
        south,
        east: wrap_longitude(lon + lon_half),
        west: wrap_longitude(lon - lon_half),
    }
}

/// Wrap a longitude into `[-180, 180]`.
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Absolute longitude difference along the shorter way round, in `[0, 180]`.
pub fn longitude_delta(a: f64, b: f64) -> f64 {
    let d = (b - a).rem_euclid(360.0);
    if d > 180.0 { 360.0 - d } else { d }
}

/// Great-circle distance between two points in kilometres (Haversine).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h slightly past 1 for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
