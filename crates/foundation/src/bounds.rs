use crate::math::{Projection, ProjectionError, Vec2, transform};

/// Axis-aligned rectangular region in a given projection.
///
/// Invariant for usable extents: `min <= max` on both axes. The all
/// `-infinity` extent is the "viewport not yet known" sentinel; see
/// [`Extent::UNSET`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    pub min: [f64; 2],
    pub max: [f64; 2],
    pub projection: Projection,
}

impl Extent {
    pub const UNSET: Extent = Extent {
        min: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        max: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        projection: Projection::WebMercator,
    };

    /// An extent in the map's working projection.
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self {
            min,
            max,
            projection: Projection::WebMercator,
        }
    }

    /// An extent in `(lon, lat)` degrees.
    pub fn geographic(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min: [min_lon, min_lat],
            max: [max_lon, max_lat],
            projection: Projection::Geographic,
        }
    }

    /// Smallest extent containing both corners, in any order.
    pub fn from_corners(a: Vec2, b: Vec2, projection: Projection) -> Self {
        Self {
            min: [a.x.min(b.x), a.y.min(b.y)],
            max: [a.x.max(b.x), a.y.max(b.y)],
            projection,
        }
    }

    /// True for the "not yet determined" sentinel.
    pub fn is_unset(&self) -> bool {
        self.min[0] == f64::NEG_INFINITY
    }

    /// Finite and correctly ordered.
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
            && self.min[0] <= self.max[0]
            && self.min[1] <= self.max[1]
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        )
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }

    pub fn contains_extent(&self, other: &Extent) -> bool {
        self.min[0] <= other.min[0]
            && self.min[1] <= other.min[1]
            && self.max[0] >= other.max[0]
            && self.max[1] >= other.max[1]
    }

    /// Closed-interval overlap test; touching edges intersect.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }

    pub fn buffer(&self, amount: f64) -> Self {
        Self {
            min: [self.min[0] - amount, self.min[1] - amount],
            max: [self.max[0] + amount, self.max[1] + amount],
            projection: self.projection,
        }
    }

    pub fn union(&self, other: &Extent) -> Self {
        Self {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
            projection: self.projection,
        }
    }

    /// Bounding extent of a set of points, `None` if empty.
    pub fn from_points<I>(points: I, projection: Projection) -> Option<Self>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Self::from_corners(first, first, projection);
        for p in iter {
            out.min = [out.min[0].min(p.x), out.min[1].min(p.y)];
            out.max = [out.max[0].max(p.x), out.max[1].max(p.y)];
        }
        Some(out)
    }

    /// Reproject the two corners into `target`.
    pub fn to_projection(&self, target: Projection) -> Result<Self, ProjectionError> {
        let a = transform(self.min.into(), self.projection, target)?;
        let b = transform(self.max.into(), self.projection, target)?;
        Ok(Self::from_corners(a, b, target))
    }
}

#[cfg(test)]
mod tests {
    use super::Extent;
    use crate::math::{Projection, Vec2};

    #[test]
    fn sentinel_is_unset_and_invalid() {
        assert!(Extent::UNSET.is_unset());
        assert!(!Extent::UNSET.is_valid());
        assert!(!Extent::new([0.0, 0.0], [1.0, 1.0]).is_unset());
    }

    #[test]
    fn inverted_extent_is_invalid() {
        assert!(!Extent::new([1.0, 0.0], [0.0, 1.0]).is_valid());
    }

    #[test]
    fn containment_and_intersection() {
        let outer = Extent::new([0.0, 0.0], [10.0, 10.0]);
        let inner = Extent::new([2.0, 2.0], [3.0, 3.0]);
        let touching = Extent::new([10.0, 0.0], [12.0, 1.0]);
        let far = Extent::new([20.0, 20.0], [21.0, 21.0]);

        assert!(outer.contains_extent(&inner));
        assert!(!inner.contains_extent(&outer));
        assert!(outer.intersects(&touching));
        assert!(!outer.intersects(&far));
        assert!(outer.contains_point(Vec2::new(10.0, 5.0)));
    }

    #[test]
    fn geographic_round_trip_through_mercator() {
        let geo = Extent::geographic(-119.0, 33.5, -117.5, 34.6);
        let merc = geo.to_projection(Projection::WebMercator).unwrap();
        assert_eq!(merc.projection, Projection::WebMercator);
        assert!(merc.is_valid());

        let back = merc.to_projection(Projection::Geographic).unwrap();
        let got = back.min.iter().chain(back.max.iter());
        let want = geo.min.iter().chain(geo.max.iter());
        for (a, b) in got.zip(want) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn bounding_extent_of_points() {
        let e = Extent::from_points(
            [Vec2::new(3.0, -1.0), Vec2::new(-2.0, 4.0), Vec2::new(0.0, 0.0)],
            Projection::WebMercator,
        )
        .unwrap();
        assert_eq!(e.min, [-2.0, -1.0]);
        assert_eq!(e.max, [3.0, 4.0]);
        assert!(Extent::from_points(std::iter::empty(), Projection::WebMercator).is_none());
    }
}
