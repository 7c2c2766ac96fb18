//! Wire format of the trajectory search backend.
//!
//! Query:
//! - `GET <search_path>?bbox=<minLon>,<minLat>,<maxLon>,<maxLat>` (EPSG:4326)
//!
//! Response (HAL style):
//! ```json
//! { "_embedded": { "trajectories": [
//!     { "geometry": { "type": "LineString", "coordinates": [[lon, lat], ...] },
//!       "start": "2008-10-23 02:53:04",
//!       "durationInMinutes": 42,
//!       "_links": { "self": { "href": "http://host/api/trajectories/<uuid>" } } }
//! ] } }
//! ```
//!
//! Records are decoded into [`scene::Feature`]s in the map projection, with
//! the self link as the feature id.

use foundation::bounds::Extent;
use foundation::math::{Projection, Vec2, canonical_f64, from_lon_lat};
use scene::feature::{Feature, FeatureId, Geometry, TrajectoryAttributes};
use serde::Deserialize;

use crate::error::{BboxError, LoadError};

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "_embedded")]
    pub embedded: Embedded,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Embedded {
    pub trajectories: Vec<TrajectoryRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrajectoryRecord {
    pub geometry: GeoJsonGeometry,
    #[serde(default)]
    pub start: Option<StartValue>,
    #[serde(rename = "durationInMinutes")]
    pub duration_in_minutes: f64,
    #[serde(rename = "_links")]
    pub links: Links,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Link,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

/// GeoJSON geometry in `(lon, lat[, alt])` positions. Only the kinds a
/// trajectory can take are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeoJsonGeometry {
    Point(Vec<f64>),
    LineString(Vec<Vec<f64>>),
    MultiLineString(Vec<Vec<Vec<f64>>>),
}

/// `start` as sent by the server; kept as text either way.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StartValue {
    Text(String),
    Number(serde_json::Number),
}

impl std::fmt::Display for StartValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartValue::Text(s) => f.write_str(s),
            StartValue::Number(n) => n.fmt(f),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub include_start: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            include_start: true,
        }
    }
}

/// Decode one search response body into features, in response order.
pub fn decode_search_response(
    body: &[u8],
    opts: DecodeOptions,
) -> Result<Vec<Feature>, LoadError> {
    let resp: SearchResponse = serde_json::from_slice(body)?;
    resp.embedded
        .trajectories
        .into_iter()
        .map(|record| record.into_feature(opts))
        .collect()
}

impl TrajectoryRecord {
    pub fn into_feature(self, opts: DecodeOptions) -> Result<Feature, LoadError> {
        let geometry = self.geometry.to_map()?;
        let start = if opts.include_start {
            self.start.map(|s| s.to_string())
        } else {
            None
        };
        Ok(Feature::new(
            FeatureId::new(self.links.self_link.href),
            geometry,
            TrajectoryAttributes {
                start,
                duration_minutes: self.duration_in_minutes,
            },
        ))
    }
}

impl GeoJsonGeometry {
    /// Project into the map's working projection.
    pub fn to_map(&self) -> Result<Geometry, LoadError> {
        Ok(match self {
            GeoJsonGeometry::Point(p) => Geometry::Point(project_position(p)?),
            GeoJsonGeometry::LineString(line) => Geometry::LineString(project_line(line)?),
            GeoJsonGeometry::MultiLineString(lines) => Geometry::MultiLineString(
                lines
                    .iter()
                    .map(|l| project_line(l))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

fn project_line(line: &[Vec<f64>]) -> Result<Vec<Vec2>, LoadError> {
    line.iter().map(|p| project_position(p)).collect()
}

fn project_position(pos: &[f64]) -> Result<Vec2, LoadError> {
    let [lon, lat, ..] = pos else {
        return Err(LoadError::Parse(format!(
            "position needs at least 2 values, got {}",
            pos.len()
        )));
    };
    Ok(from_lon_lat(Vec2::new(*lon, *lat))?)
}

/// Geographic decimal places kept in the query string.
const BBOX_SCALE: f64 = 1e9;

fn round_coord(v: f64) -> f64 {
    canonical_f64((v * BBOX_SCALE).round() / BBOX_SCALE)
}

/// `minLon,minLat,maxLon,maxLat` for an extent in any supported projection.
pub fn bbox_param(extent: &Extent) -> Result<String, LoadError> {
    let geo = extent.to_projection(Projection::Geographic)?;
    let [min_lon, min_lat] = geo.min.map(round_coord);
    let [max_lon, max_lat] = geo.max.map(round_coord);
    Ok(format!("{min_lon},{min_lat},{max_lon},{max_lat}"))
}

pub fn search_url(base_url: &str, search_path: &str, extent: &Extent) -> Result<String, LoadError> {
    let base = base_url.trim_end_matches('/');
    let path = search_path.trim_start_matches('/');
    Ok(format!("{base}/{path}?bbox={}", bbox_param(extent)?))
}

/// Parse a `minLon,minLat,maxLon,maxLat` string into a geographic extent.
pub fn parse_bbox(s: &str) -> Result<Extent, BboxError> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(BboxError::WrongArity(parts.len()));
    }

    let mut values = [0.0f64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| BboxError::NotANumber(part.to_string()))?;
    }

    let [min_lon, min_lat, max_lon, max_lat] = values;
    if min_lon > max_lon || min_lat > max_lat {
        return Err(BboxError::Inverted);
    }
    Ok(Extent::geographic(min_lon, min_lat, max_lon, max_lat))
}
