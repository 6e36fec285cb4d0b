//! Seeded synthetic cell population.

use hexview_viewport::{Cell, GeoPoint};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Average area of a resolution-0 hexagon in km².
const RES0_AREA_KM2: f64 = 4_357_449.0;
/// Each finer resolution divides cell area by roughly seven.
const APERTURE: f64 = 7.0;
const MAX_RESOLUTION: u8 = 7;
const LAND_FRACTION: f64 = 0.29;

/// Generate `count` cells spread uniformly over the sphere.
///
/// Same seed, same cells. Ids are sequential so log output stays readable.
pub fn generate_cells(count: usize, seed: u64) -> Vec<Cell> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            // Uniform on the sphere, not on the lat/lon rectangle.
            let lat = (2.0 * rng.random::<f64>() - 1.0).asin().to_degrees();
            let lon = rng.random::<f64>() * 360.0 - 180.0;
            let resolution = rng.random_range(0..=MAX_RESOLUTION);
            let area = RES0_AREA_KM2 / APERTURE.powi(resolution as i32)
                * rng.random_range(0.8..1.2);
            Cell::new(
                i as u64,
                resolution,
                GeoPoint::new(lat, lon),
                area,
                rng.random_bool(LAND_FRACTION),
            )
        })
        .collect()
}
