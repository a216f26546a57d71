// src/gps/geodesy.rs
//! Great-circle distance on the WGS84 mean sphere

use super::data::PositionFix;

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two latitude/longitude pairs, in meters.
///
/// Symmetric in its arguments and zero (up to floating-point epsilon) for
/// identical points.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance between two fixes, in meters.
pub fn distance_between(a: &PositionFix, b: &PositionFix) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let d = haversine_distance(35.6586, 139.7454, 35.6586, 139.7454);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            (52.5200, 13.4050, 48.8566, 2.3522),
            (35.6586, 139.7454, 35.6595, 139.7449),
            (-33.8688, 151.2093, 51.5074, -0.1278),
        ];
        for (lat1, lon1, lat2, lon2) in pairs {
            let ab = haversine_distance(lat1, lon1, lat2, lon2);
            let ba = haversine_distance(lat2, lon2, lat1, lon1);
            assert!((ab - ba).abs() < 1e-9);
        }
    }

    #[test]
    fn test_known_distance_berlin_paris() {
        // Berlin to Paris is roughly 878 km.
        let d = haversine_distance(52.5200, 13.4050, 48.8566, 2.3522);
        assert!((d - 878_000.0).abs() < 10_000.0);
    }

    #[test]
    fn test_small_northward_offset() {
        // 0.001 degrees of latitude is about 111.19 m on the mean sphere.
        let d = haversine_distance(35.0, 139.0, 35.001, 139.0);
        assert!((d - 111.19).abs() < 0.1);
    }
}
