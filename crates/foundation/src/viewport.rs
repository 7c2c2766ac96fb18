use crate::bounds::Extent;
use crate::math::{HALF_WORLD_M, Projection, ProjectionError, Vec2, from_lon_lat};

/// Pixel size of the zoom-0 world square.
pub const WORLD_TILE_PX: f64 = 256.0;

/// Map units per pixel at an integer or fractional zoom level.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    (2.0 * HALF_WORLD_M / WORLD_TILE_PX) / 2f64.powf(zoom)
}

/// A 2D map view: where the map is centered, how zoomed, how large on screen.
///
/// Pixel coordinates have their origin at the top-left corner with `y`
/// growing downwards; map coordinates have `y` growing north.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    /// Center in Web Mercator meters.
    pub center: Vec2,
    /// Map units per pixel.
    pub resolution: f64,
    pub size_px: [u32; 2],
}

impl Viewport {
    pub fn new(center: Vec2, resolution: f64, size_px: [u32; 2]) -> Self {
        Self {
            center,
            resolution,
            size_px,
        }
    }

    pub fn from_lon_lat(
        center_lon_lat: Vec2,
        zoom: f64,
        size_px: [u32; 2],
    ) -> Result<Self, ProjectionError> {
        Ok(Self::new(
            from_lon_lat(center_lon_lat)?,
            resolution_for_zoom(zoom),
            size_px,
        ))
    }

    fn half_size_px(&self) -> Vec2 {
        Vec2::new(self.size_px[0] as f64 / 2.0, self.size_px[1] as f64 / 2.0)
    }

    /// The visible region in map units.
    pub fn extent(&self) -> Extent {
        let half = self.half_size_px().scale(self.resolution);
        Extent {
            min: [self.center.x - half.x, self.center.y - half.y],
            max: [self.center.x + half.x, self.center.y + half.y],
            projection: Projection::WebMercator,
        }
    }

    pub fn pixel_to_map(&self, pixel: Vec2) -> Vec2 {
        let half = self.half_size_px();
        Vec2::new(
            self.center.x + (pixel.x - half.x) * self.resolution,
            self.center.y - (pixel.y - half.y) * self.resolution,
        )
    }

    pub fn map_to_pixel(&self, point: Vec2) -> Vec2 {
        let half = self.half_size_px();
        Vec2::new(
            half.x + (point.x - self.center.x) / self.resolution,
            half.y - (point.y - self.center.y) / self.resolution,
        )
    }
}
