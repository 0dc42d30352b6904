//! Geographic helpers shared by the pipeline stages.

/// Mean Earth radius used for all great-circle distances (meters).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of arc on the [`EARTH_RADIUS_METERS`] sphere.
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Slack on degree radii so coarse queries never under-cover the exact check.
const DEGREE_RADIUS_PADDING: f64 = 1.05;

/// Great-circle distance between two coordinates in meters (haversine).
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Convert a distance in meters to a degree radius that fully covers it at
/// the given latitude.
///
/// Longitude degrees shrink towards the poles, so the larger of the two axis
/// conversions is returned. Used to size R-tree envelope queries before an
/// exact haversine check.
pub fn meters_to_degrees(meters: f64, ref_lat: f64) -> f64 {
    let cos_lat = ref_lat.to_radians().cos().abs().max(0.01);
    let lat_deg = meters / METERS_PER_DEGREE;
    let lng_deg = meters / (METERS_PER_DEGREE * cos_lat);
    lat_deg.max(lng_deg) * DEGREE_RADIUS_PADDING
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_distance(46.5, 7.9, 46.5, 7.9), 0.0);
    }

    #[test]
    fn test_haversine_known_value() {
        // London to Paris is about 344 km
        let dist = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
        assert!(dist > 340_000.0 && dist < 350_000.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        // R * pi / 180
        assert!((dist - 111_194.93).abs() < 1.0);
    }

    #[test]
    fn test_meters_to_degrees_covers_longitude() {
        let deg = meters_to_degrees(100.0, 60.0);
        // At 60 degrees a longitude degree is roughly half as long
        assert!(deg > 100.0 / METERS_PER_DEGREE);
        let covered = haversine_distance(60.0, 10.0, 60.0, 10.0 + deg);
        assert!(covered >= 100.0);
    }

    #[test]
    fn test_meters_to_degrees_covers_equator() {
        let deg = meters_to_degrees(50.0, 0.0);
        assert!(haversine_distance(0.0, 0.0, 0.0, deg) >= 50.0);
        assert!(haversine_distance(0.0, 0.0, deg, 0.0) >= 50.0);
    }
}
