//! Scripted camera flight for the demo host.

use hexview_viewport::{ViewState, wrap_longitude};

const START_LONGITUDE: f64 = 150.0;
/// Total eastward pan over the flight; carries the camera across 180°.
const PAN_DEGREES: f64 = 80.0;
const MAX_ZOOM: f64 = 14.0;
const LATITUDE_SWING: f64 = 30.0;

/// Zooms from the whole globe down to street level and back while panning
/// east over the anti-meridian.
#[derive(Clone, Copy, Debug)]
pub struct FlightPath {
    steps: u32,
}

impl FlightPath {
    pub fn new(steps: u32) -> Self {
        Self { steps: steps.max(1) }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Camera for `step` in `0..steps`; later steps hold the final view.
    pub fn view_at(&self, step: u32) -> ViewState {
        let t = if self.steps == 1 {
            0.0
        } else {
            f64::from(step.min(self.steps - 1)) / f64::from(self.steps - 1)
        };
        // Triangle: 0 -> MAX_ZOOM at the midpoint -> 0.
        let zoom = MAX_ZOOM * (1.0 - (2.0 * t - 1.0).abs());
        let longitude = wrap_longitude(START_LONGITUDE + PAN_DEGREES * t);
        let latitude = LATITUDE_SWING * (t * std::f64::consts::PI).sin();
        ViewState {
            longitude,
            latitude,
            zoom,
            pitch: 0.0,
            bearing: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_profile() {
        let path = FlightPath::new(101);
        assert_eq!(path.view_at(0).zoom, 0.0);
        assert!((path.view_at(50).zoom - MAX_ZOOM).abs() < 1e-9);
        assert!(path.view_at(100).zoom.abs() < 1e-9);
        assert!(path.view_at(25).zoom > path.view_at(10).zoom);
        assert!(path.view_at(90).zoom < path.view_at(75).zoom);
    }

    #[test]
    fn test_crosses_antimeridian() {
        let path = FlightPath::new(200);
        let lons: Vec<f64> = (0..path.steps()).map(|s| path.view_at(s).longitude).collect();
        assert!(lons.iter().all(|l| (-180.0..=180.0).contains(l)));
        assert!(lons.first().is_some_and(|l| *l > 0.0));
        assert!(lons.last().is_some_and(|l| *l < 0.0));
    }

    #[test]
    fn test_past_end_holds_final_view() {
        let path = FlightPath::new(10);
        assert_eq!(path.view_at(9), path.view_at(500));
    }

    #[test]
    fn test_single_step() {
        let path = FlightPath::new(0);
        assert_eq!(path.steps(), 1);
        assert_eq!(path.view_at(0).zoom, 0.0);
    }
}
