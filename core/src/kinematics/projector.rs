use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the spherical dead-reckoning step.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Knots to metres per second.
pub const KNOTS_TO_MPS: f64 = 0.514444;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Position reached after `dt_secs` at `speed_knots` along `course_deg`.
    pub fn advance(&self, speed_knots: f64, course_deg: f64, dt_secs: f64) -> Self {
        let (latitude, longitude) =
            project(self.latitude, self.longitude, speed_knots, course_deg, dt_secs);
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle forward step ("destination point given distance and bearing").
///
/// Returns the start point untouched when there is nothing to travel, so that
/// repeated zero-length steps never accumulate rounding drift.
pub fn project(
    lat_deg: f64,
    lon_deg: f64,
    speed_knots: f64,
    course_deg: f64,
    dt_secs: f64,
) -> (f64, f64) {
    let distance_m = speed_knots * KNOTS_TO_MPS * dt_secs;
    if distance_m == 0.0 || !distance_m.is_finite() {
        return (lat_deg, lon_deg);
    }

    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = course_deg.to_radians();
    let lat1 = lat_deg.to_radians();
    let lon1 = lon_deg.to_radians();

    let sin_lat2 = lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    (lat2.to_degrees(), normalize_longitude(lon2.to_degrees()))
}

/// Wraps a longitude into [-180, 180).
pub fn normalize_longitude(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Wraps a course into [0, 360).
pub fn normalize_course(course_deg: f64) -> f64 {
    let wrapped = course_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Haversine distance in metres, used to check projected steps.
pub fn distance_m(from: GeoPosition, to: GeoPosition) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (to.longitude - from.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().clamp(-1.0, 1.0).asin()
}

/// Initial great-circle bearing from `from` to `to`, in [0, 360).
pub fn bearing_deg(from: GeoPosition, to: GeoPosition) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();
    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    normalize_course(y.atan2(x).to_degrees())
}
