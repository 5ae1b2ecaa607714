//! Coordinate synthesis
//!
//! Turns a base location plus the configured overrides into the location
//! handed back to the hooked application. Randomization draws a point
//! uniformly over the disk of the configured radius around the base, so
//! repeated calls differ and never stray further than the radius.

use crate::constants::EARTH_RADIUS_METERS;
use crate::location::LocationRecord;
use rand::Rng;
use std::f64::consts::TAU;

/// Overrides applied on top of the base location
///
/// A value is meaningless while its `use_*` flag is false.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SynthesisParams {
    pub use_accuracy: bool,
    /// Meters
    pub accuracy: f64,
    pub use_altitude: bool,
    /// Meters
    pub altitude: f64,
    pub use_randomize: bool,
    /// Meters
    pub randomize_radius: f64,
}

/// Produce the location reported to the application
///
/// `real` is the reading the platform returned, when there is one. Fields the
/// overrides do not touch come from `real` first and `base` second.
pub fn synthesize<R: Rng + ?Sized>(
    base: &LocationRecord,
    real: Option<&LocationRecord>,
    params: &SynthesisParams,
    rng: &mut R,
) -> LocationRecord {
    let (latitude, longitude) = if params.use_randomize {
        random_point_in_disk(base.latitude, base.longitude, params.randomize_radius, rng)
    } else {
        (base.latitude, base.longitude)
    };

    let altitude = if params.use_altitude {
        Some(params.altitude)
    } else {
        real.and_then(|r| r.altitude).or(base.altitude)
    };

    let accuracy = if params.use_accuracy {
        Some(params.accuracy)
    } else {
        real.and_then(|r| r.accuracy).or(base.accuracy)
    };

    LocationRecord {
        latitude,
        longitude,
        altitude,
        accuracy,
        bearing: real.and_then(|r| r.bearing).or(base.bearing),
        speed: real.and_then(|r| r.speed).or(base.speed),
        time: real.and_then(|r| r.time).or(base.time),
    }
}

/// Sample a point uniformly over the disk of `radius_m` meters around
/// (`latitude`, `longitude`)
///
/// The radial distance is `r * sqrt(u)` so density is uniform per unit area.
/// A non-positive or non-finite radius returns the center unchanged.
pub fn random_point_in_disk<R: Rng + ?Sized>(
    latitude: f64,
    longitude: f64,
    radius_m: f64,
    rng: &mut R,
) -> (f64, f64) {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return (latitude, longitude);
    }

    let bearing = rng.random::<f64>() * TAU;
    let distance = radius_m * rng.random::<f64>().sqrt();
    destination_point(latitude, longitude, bearing, distance)
}

/// Point reached by travelling `distance_m` along the great circle that
/// leaves (`latitude`, `longitude`) with `bearing_rad` (clockwise from north)
///
/// Longitude scaling by `cos(latitude)` falls out of the spherical formula.
pub fn destination_point(latitude: f64, longitude: f64, bearing_rad: f64, distance_m: f64) -> (f64, f64) {
    let phi1 = latitude.to_radians();
    let lambda1 = longitude.to_radians();
    let delta = distance_m / EARTH_RADIUS_METERS;

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * bearing_rad.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (bearing_rad.sin() * delta.sin() * phi1.cos())
            .atan2(delta.cos() - phi1.sin() * sin_phi2);

    (phi2.to_degrees(), normalize_longitude(lambda2.to_degrees()))
}

/// Haversine distance in meters
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
}

/// Wrap a longitude into [-180, 180]
pub fn normalize_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_distance_is_identity() {
        let (lat, lon) = destination_point(37.0, -122.0, 1.0, 0.0);
        assert!((lat - 37.0).abs() < 1e-12);
        assert!((lon + 122.0).abs() < 1e-12);
    }

    #[test]
    fn test_destination_distance_matches_haversine() {
        for (lat, bearing) in [(0.0, 0.3), (60.0, 1.7), (-45.0, 4.0), (89.9, 2.5)] {
            let (lat2, lon2) = destination_point(lat, 10.0, bearing, 750.0);
            let d = great_circle_distance(lat, 10.0, lat2, lon2);
            assert!((d - 750.0).abs() < 1e-3, "lat {} got {}", lat, d);
        }
    }

    #[test]
    fn test_east_offset_grows_with_latitude() {
        // Same eastward distance spans more degrees of longitude near the pole
        let (_, lon_equator) = destination_point(0.0, 0.0, TAU / 4.0, 1000.0);
        let (_, lon_north) = destination_point(60.0, 0.0, TAU / 4.0, 1000.0);
        assert!(lon_north > lon_equator * 1.9);
    }

    #[test]
    fn test_normalize_longitude_wraps_antimeridian() {
        assert_eq!(normalize_longitude(179.5), 179.5);
        assert!((normalize_longitude(180.5) + 179.5).abs() < 1e-9);
        assert!((normalize_longitude(-180.5) - 179.5).abs() < 1e-9);
        assert_eq!(normalize_longitude(540.0), 180.0);
    }

    #[test]
    fn test_invalid_radius_returns_center() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(random_point_in_disk(1.0, 2.0, -5.0, &mut rng), (1.0, 2.0));
        assert_eq!(random_point_in_disk(1.0, 2.0, f64::NAN, &mut rng), (1.0, 2.0));
        assert_eq!(random_point_in_disk(1.0, 2.0, 0.0, &mut rng), (1.0, 2.0));
    }

    #[test]
    fn test_real_reading_fields_pass_through() {
        let base = LocationRecord::new(10.0, 20.0).with_altitude(1.0);
        let mut real = LocationRecord::new(0.0, 0.0).with_altitude(99.0).with_accuracy(12.0);
        real.bearing = Some(90.0);
        real.speed = Some(3.0);
        real.time = Some(1_700_000_000_000);

        let mut rng = StdRng::seed_from_u64(1);
        let out = synthesize(&base, Some(&real), &SynthesisParams::default(), &mut rng);

        assert_eq!((out.latitude, out.longitude), (10.0, 20.0));
        assert_eq!(out.altitude, Some(99.0));
        assert_eq!(out.accuracy, Some(12.0));
        assert_eq!(out.bearing, Some(90.0));
        assert_eq!(out.speed, Some(3.0));
        assert_eq!(out.time, Some(1_700_000_000_000));
    }
}
