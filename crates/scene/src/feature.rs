use foundation::bounds::Extent;
use foundation::math::{Projection, Vec2, distance_to_segment};

/// Stable feature identity: the backend's self link, used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Line,
}

/// Vector geometry in the map's working projection (Web Mercator meters).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Vec2),
    LineString(Vec<Vec2>),
    MultiLineString(Vec<Vec<Vec2>>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) | Geometry::MultiLineString(_) => GeometryKind::Line,
        }
    }

    fn lines(&self) -> &[Vec<Vec2>] {
        match self {
            Geometry::Point(_) => &[],
            Geometry::LineString(v) => std::slice::from_ref(v),
            Geometry::MultiLineString(v) => v,
        }
    }

    fn vertices(&self) -> Box<dyn Iterator<Item = Vec2> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(*p)),
            _ => Box::new(self.lines().iter().flatten().copied()),
        }
    }

    /// Bounding extent, `None` for geometries without vertices.
    pub fn extent(&self) -> Option<Extent> {
        Extent::from_points(self.vertices(), Projection::WebMercator)
    }

    /// Shortest distance from `p` to the rendered geometry, in map units.
    ///
    /// A single-vertex line behaves like a point.
    pub fn distance_to(&self, p: Vec2) -> Option<f64> {
        if let Geometry::Point(q) = self {
            return Some(p.distance(*q));
        }

        let mut best: Option<f64> = None;
        for line in self.lines() {
            let d = match line.as_slice() {
                [] => continue,
                [only] => p.distance(*only),
                _ => line
                    .windows(2)
                    .map(|w| distance_to_segment(p, w[0], w[1]))
                    .fold(f64::INFINITY, f64::min),
            };
            best = Some(best.map_or(d, |b| b.min(d)));
        }
        best
    }
}

/// Attributes carried by a trajectory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrajectoryAttributes {
    /// Start timestamp as sent by the backend; absent when not requested.
    pub start: Option<String>,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub attributes: TrajectoryAttributes,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: Geometry, attributes: TrajectoryAttributes) -> Self {
        Self {
            id,
            geometry,
            attributes,
        }
    }
}
