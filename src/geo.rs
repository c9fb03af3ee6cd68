//! Geographic positions and great-circle distance.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic position in decimal degrees.
///
/// # Examples
///
/// ```
/// use muster::GeoPoint;
///
/// let oslo = GeoPoint::new(59.9139, 10.7522).unwrap();
/// let bergen = GeoPoint::new(60.3913, 5.3221).unwrap();
/// let d = oslo.distance_km(bergen);
/// assert!(d > 280.0 && d < 330.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, [-180, 180].
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a validated position.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPosition` when either coordinate is
    /// non-finite or outside its range.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        let point = Self { lat, lon };
        point.validate()?;
        Ok(point)
    }

    /// Checks that both coordinates are finite and in range.
    ///
    /// Deserialized positions are unchecked until this is called; the
    /// reconciler validates every decoded payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lon_ok = self.lon.is_finite() && (-180.0..=180.0).contains(&self.lon);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(ValidationError::InvalidPosition {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }

    /// Great-circle distance to another position, in kilometres (haversine).
    #[must_use]
    pub fn distance_km(&self, other: Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}
