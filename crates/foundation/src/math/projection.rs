//! Spherical Web Mercator (EPSG:3857) <-> geographic (EPSG:4326).
//!
//! The map works in Web Mercator meters; the trajectory backend speaks
//! longitude/latitude degrees.

use std::f64::consts::PI;

use super::Vec2;

/// Sphere radius used by Web Mercator (the WGS84 semi-major axis, meters).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// Half the width of the Web Mercator world (meters).
pub const HALF_WORLD_M: f64 = PI * EARTH_RADIUS_M;
/// Latitude at which the Web Mercator world becomes square.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    /// EPSG:3857, meters. The map's working projection.
    #[default]
    WebMercator,
    /// EPSG:4326, degrees as `(lon, lat)`.
    Geographic,
}

impl Projection {
    pub fn code(self) -> &'static str {
        match self {
            Projection::WebMercator => "EPSG:3857",
            Projection::Geographic => "EPSG:4326",
        }
    }
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ProjectionError {
    NonFinite { x: f64, y: f64 },
    LatitudeOutOfRange(f64),
}

impl std::fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::NonFinite { x, y } => {
                write!(f, "coordinate is not finite: ({x}, {y})")
            }
            ProjectionError::LatitudeOutOfRange(lat) => {
                write!(f, "latitude out of range: {lat}")
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Project `(lon, lat)` degrees to Web Mercator meters.
///
/// Latitudes beyond the Mercator limit are clamped onto the world edge.
pub fn from_lon_lat(lon_lat: Vec2) -> Result<Vec2, ProjectionError> {
    if !lon_lat.is_finite() {
        return Err(ProjectionError::NonFinite {
            x: lon_lat.x,
            y: lon_lat.y,
        });
    }
    if lon_lat.y.abs() > 90.0 {
        return Err(ProjectionError::LatitudeOutOfRange(lon_lat.y));
    }

    let x = EARTH_RADIUS_M * lon_lat.x.to_radians();
    let lat = lon_lat.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    Ok(Vec2::new(x, y.clamp(-HALF_WORLD_M, HALF_WORLD_M)))
}

/// Unproject Web Mercator meters to `(lon, lat)` degrees.
pub fn to_lon_lat(point: Vec2) -> Result<Vec2, ProjectionError> {
    if !point.is_finite() {
        return Err(ProjectionError::NonFinite {
            x: point.x,
            y: point.y,
        });
    }

    let lon = (point.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (point.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    Ok(Vec2::new(lon, lat))
}

/// Transform a point between the two supported projections.
pub fn transform(point: Vec2, from: Projection, to: Projection) -> Result<Vec2, ProjectionError> {
    match (from, to) {
        (Projection::WebMercator, Projection::Geographic) => to_lon_lat(point),
        (Projection::Geographic, Projection::WebMercator) => from_lon_lat(point),
        _ if point.is_finite() => Ok(point),
        _ => Err(ProjectionError::NonFinite {
            x: point.x,
            y: point.y,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EARTH_RADIUS_M, HALF_WORLD_M, Projection, ProjectionError, from_lon_lat, to_lon_lat,
        transform,
    };
    use crate::math::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_maps_to_origin() {
        let p = from_lon_lat(Vec2::new(0.0, 0.0)).unwrap();
        assert_close(p.x, 0.0, 1e-9);
        assert_close(p.y, 0.0, 1e-9);
    }

    #[test]
    fn antimeridian_is_world_edge() {
        let p = from_lon_lat(Vec2::new(180.0, 0.0)).unwrap();
        assert_close(p.x, HALF_WORLD_M, 1e-6);
    }

    #[test]
    fn los_angeles_round_trip() {
        let la = Vec2::new(-118.24, 34.05);
        let projected = from_lon_lat(la).unwrap();
        // Known EPSG:3857 coordinates for downtown LA.
        assert_close(projected.x, -13_162_416.59, 0.01);
        assert_close(projected.y, 4_035_517.78, 0.01);

        let back = to_lon_lat(projected).unwrap();
        assert_close(back.x, la.x, 1e-9);
        assert_close(back.y, la.y, 1e-9);
    }

    #[test]
    fn poles_clamp_to_world_edge() {
        let p = from_lon_lat(Vec2::new(0.0, 90.0)).unwrap();
        assert_close(p.y, HALF_WORLD_M, 1e-3);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            from_lon_lat(Vec2::new(0.0, 91.0)),
            Err(ProjectionError::LatitudeOutOfRange(91.0))
        );
        assert!(matches!(
            to_lon_lat(Vec2::new(f64::NEG_INFINITY, 0.0)),
            Err(ProjectionError::NonFinite { .. })
        ));
    }

    #[test]
    fn identity_transform_passes_through() {
        let p = Vec2::new(EARTH_RADIUS_M, 1.0);
        let q = transform(p, Projection::WebMercator, Projection::WebMercator).unwrap();
        assert_eq!(p, q);
    }
}
