//! Spherical geometry for radius searches.

use serde::Serialize;

/// Radius of the Earth used to turn a linear distance into an angular one.
///
/// The distance given to [`radius_from_distance`] must be in the same unit.
pub const EARTH_RADIUS: f64 = 6378.0;

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle angle between two points, in radians (haversine).
    pub fn angular_distance(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let d_phi = phi2 - phi1;
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }
}

/// Angular radius (radians) of the spherical cap covering `distance`.
pub fn radius_from_distance(distance: f64) -> f64 {
    distance / EARTH_RADIUS
}

/// Spherical cap: every point whose angular distance to `center` is at most `radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphericalCap {
    pub center: GeoPoint,
    pub radius: f64,
}

impl SphericalCap {
    pub fn new(center: GeoPoint, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.angular_distance(point) <= self.radius
    }

    /// Latitude band (degrees) that encloses the cap, clamped to the poles.
    pub fn latitude_bounds(&self) -> (f64, f64) {
        let delta = self.radius.to_degrees();
        (
            (self.center.latitude - delta).max(-90.0),
            (self.center.latitude + delta).min(90.0),
        )
    }
}
