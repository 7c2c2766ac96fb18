use foundation::bounds::Extent;
use foundation::math::{HALF_WORLD_M, Projection, Vec2};

/// Column/row of a cell in a [`TileGrid`]. Columns grow east, rows grow south.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub col: i64,
    pub row: i64,
}

impl TileCoord {
    pub const fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.col, self.row)
    }
}

/// Square tile grid anchored at `origin` (top-left corner).
///
/// At a given resolution each cell spans `tile_size_px * resolution` map
/// units, so the cells of one resolution tile the plane without gaps or
/// overlaps.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileGrid {
    pub origin: Vec2,
    pub tile_size_px: u32,
}

impl TileGrid {
    /// Grid anchored at the top-left corner of the Web Mercator world.
    pub fn web_mercator(tile_size_px: u32) -> Self {
        Self {
            origin: Vec2::new(-HALF_WORLD_M, HALF_WORLD_M),
            tile_size_px,
        }
    }

    pub fn with_origin(origin: Vec2, tile_size_px: u32) -> Self {
        Self {
            origin,
            tile_size_px,
        }
    }

    /// Width (and height) of one cell in map units.
    pub fn tile_span(&self, resolution: f64) -> f64 {
        self.tile_size_px as f64 * resolution
    }

    pub fn tile_extent(&self, coord: TileCoord, resolution: f64) -> Extent {
        let span = self.tile_span(resolution);
        let min_x = self.origin.x + coord.col as f64 * span;
        let max_y = self.origin.y - coord.row as f64 * span;
        Extent {
            min: [min_x, max_y - span],
            max: [min_x + span, max_y],
            projection: Projection::WebMercator,
        }
    }

    /// Cells intersecting `extent`, row-major from the top-left.
    ///
    /// An extent edge lying exactly on a cell boundary does not pull in the
    /// neighboring cell.
    pub fn tiles_for_extent(&self, extent: &Extent, resolution: f64) -> Vec<TileCoord> {
        self.tile_range(extent, resolution)
            .map(|range| range.iter().collect())
            .unwrap_or_default()
    }

    /// Index bounds of the cells intersecting `extent`, without enumerating
    /// them. `None` for an unusable extent or resolution.
    pub fn tile_range(&self, extent: &Extent, resolution: f64) -> Option<TileRange> {
        let span = self.tile_span(resolution);
        if !(span > 0.0) || !extent.is_valid() {
            return None;
        }

        let (col_min, col_max) = index_range(extent.min[0] - self.origin.x, extent.max[0] - self.origin.x, span);
        let (row_min, row_max) = index_range(self.origin.y - extent.max[1], self.origin.y - extent.min[1], span);
        Some(TileRange {
            col_min,
            col_max,
            row_min,
            row_max,
        })
    }
}

/// Inclusive block of cells.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileRange {
    pub col_min: i64,
    pub col_max: i64,
    pub row_min: i64,
    pub row_max: i64,
}

impl TileRange {
    /// Number of cells, saturating for ranges too large to count.
    pub fn cell_count(&self) -> u64 {
        let cols = self.col_max.abs_diff(self.col_min).saturating_add(1);
        let rows = self.row_max.abs_diff(self.row_min).saturating_add(1);
        cols.saturating_mul(rows)
    }

    /// Cells in row-major order, produced on demand.
    pub fn iter(self) -> impl Iterator<Item = TileCoord> {
        let TileRange {
            col_min,
            col_max,
            row_min,
            row_max,
        } = self;
        (row_min..=row_max).flat_map(move |row| (col_min..=col_max).map(move |col| TileCoord::new(col, row)))
    }
}

/// Inclusive cell index range covering `[lo, hi]` offsets from the origin.
fn index_range(lo: f64, hi: f64, span: f64) -> (i64, i64) {
    let first = (lo / span).floor() as i64;
    let last = ((hi / span).ceil() as i64 - 1).max(first);
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::{TileCoord, TileGrid, TileRange};
    use foundation::bounds::Extent;
    use foundation::math::{HALF_WORLD_M, Vec2};
    use pretty_assertions::assert_eq;

    fn unit_grid() -> TileGrid {
        // 256px cells at resolution 1.0 → 256 map-unit cells anchored at (0, 0).
        TileGrid::with_origin(Vec2::new(0.0, 0.0), 256)
    }

    #[test]
    fn covers_extent_row_major() {
        let grid = unit_grid();
        let e = Extent::new([100.0, -300.0], [300.0, -100.0]);
        assert_eq!(
            grid.tiles_for_extent(&e, 1.0),
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(1, 0),
                TileCoord::new(0, 1),
                TileCoord::new(1, 1),
            ]
        );
    }

    #[test]
    fn aligned_edges_do_not_pull_in_neighbors() {
        let grid = unit_grid();
        let cell = grid.tile_extent(TileCoord::new(2, 3), 1.0);
        assert_eq!(cell.min, [512.0, -1024.0]);
        assert_eq!(cell.max, [768.0, -768.0]);
        assert_eq!(grid.tiles_for_extent(&cell, 1.0), vec![TileCoord::new(2, 3)]);
    }

    #[test]
    fn cells_tile_without_gaps_or_overlaps() {
        let grid = unit_grid();
        let tiles = grid.tiles_for_extent(&Extent::new([10.0, -700.0], [700.0, -10.0]), 1.0);
        assert_eq!(tiles.len(), 9);

        let total: f64 = tiles
            .iter()
            .map(|t| {
                let e = grid.tile_extent(*t, 1.0);
                e.width() * e.height()
            })
            .sum();
        assert_eq!(total, 9.0 * 256.0 * 256.0);

        for (i, a) in tiles.iter().enumerate() {
            for b in &tiles[i + 1..] {
                let ea = grid.tile_extent(*a, 1.0);
                let eb = grid.tile_extent(*b, 1.0);
                let overlap_w = ea.max[0].min(eb.max[0]) - ea.min[0].max(eb.min[0]);
                let overlap_h = ea.max[1].min(eb.max[1]) - ea.min[1].max(eb.min[1]);
                assert!(overlap_w <= 0.0 || overlap_h <= 0.0, "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn resolution_scales_cells() {
        let grid = unit_grid();
        let e = Extent::new([0.0, -512.0], [512.0, 0.0]);
        assert_eq!(grid.tiles_for_extent(&e, 1.0).len(), 4);
        assert_eq!(grid.tiles_for_extent(&e, 2.0).len(), 1);
    }

    #[test]
    fn web_mercator_zoom_zero_is_one_cell() {
        let grid = TileGrid::web_mercator(256);
        let world = Extent::new([-HALF_WORLD_M, -HALF_WORLD_M], [HALF_WORLD_M, HALF_WORLD_M]);
        let res0 = 2.0 * HALF_WORLD_M / 256.0;
        assert_eq!(grid.tiles_for_extent(&world, res0), vec![TileCoord::new(0, 0)]);
    }

    #[test]
    fn huge_extents_are_bounded_without_enumeration() {
        let grid = unit_grid();
        // 0.25 map-unit cells over a 2e8 square.
        let e = Extent::new([-1.0e8, -1.0e8], [1.0e8, 1.0e8]);
        let range = grid.tile_range(&e, 1.0 / 1024.0).expect("range");
        assert_eq!(range.cell_count(), 800_000_000 * 800_000_000);

        let first: Vec<_> = range.iter().take(3).collect();
        assert_eq!(
            first,
            vec![
                TileCoord::new(range.col_min, range.row_min),
                TileCoord::new(range.col_min + 1, range.row_min),
                TileCoord::new(range.col_min + 2, range.row_min),
            ]
        );
        assert_eq!(grid.tile_range(&Extent::new([0.0, 0.0], [1.0, 1.0]), 0.0), None);
    }

    #[test]
    fn range_matches_enumerated_cells() {
        let grid = unit_grid();
        let e = Extent::new([100.0, -300.0], [300.0, -100.0]);
        let range = grid.tile_range(&e, 1.0).expect("range");
        assert_eq!(
            range,
            TileRange {
                col_min: 0,
                col_max: 1,
                row_min: 0,
                row_max: 1,
            }
        );
        assert_eq!(range.cell_count(), 4);
        assert_eq!(range.iter().collect::<Vec<_>>(), grid.tiles_for_extent(&e, 1.0));
    }
}
