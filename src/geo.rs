//! Great-circle distance between two points on Earth.

use crate::models::Coordinates;

/// Mean Earth radius used by the finder.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance from `origin` to `target`, in kilometers, rounded to
/// two decimals (half away from zero).
///
/// Uses the `cos`-only form of the haversine:
///
/// ```text
/// a = 0.5 - cos(Δlat)/2 + cos(lat1)·cos(lat2)·(1 - cos(Δlon))/2
/// d = 2R·asin(√a)
/// ```
pub fn distance_km(origin: Coordinates, target: Coordinates) -> f64 {
    let p = std::f64::consts::PI / 180.0;
    let a = 0.5 - ((target.latitude - origin.latitude) * p).cos() / 2.0
        + (origin.latitude * p).cos()
            * (target.latitude * p).cos()
            * (1.0 - ((target.longitude - origin.longitude) * p).cos())
            / 2.0;
    // Floating error can push `a` a hair outside [0, 1] for (near-)identical
    // or antipodal points.
    let a = a.clamp(0.0, 1.0);
    round_2dp(2.0 * EARTH_RADIUS_KM * a.sqrt().asin())
}

fn round_2dp(km: f64) -> f64 {
    ((km + f64::EPSILON) * 100.0).round() / 100.0
}
