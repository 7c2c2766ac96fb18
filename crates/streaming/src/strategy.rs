use foundation::bounds::Extent;
use foundation::math::Projection;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheError, CoverageCache};
use crate::grid::{TileCoord, TileGrid};
use crate::request::Request;
use crate::residency::ResidencyState;

pub const DEFAULT_TILE_SIZE_PX: u32 = 256;

fn default_tile_size_px() -> u32 {
    DEFAULT_TILE_SIZE_PX
}

/// What unit of space is tracked for coverage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StrategyMode {
    /// Fixed grid cells of `tile_size_px` pixels at each resolution.
    Tiled {
        #[serde(default = "default_tile_size_px")]
        tile_size_px: u32,
    },
    /// The whole viewport; skipped when inside an extent already loaded at
    /// the same resolution.
    Bbox,
}

impl Default for StrategyMode {
    fn default() -> Self {
        StrategyMode::Tiled {
            tile_size_px: DEFAULT_TILE_SIZE_PX,
        }
    }
}

/// A region that needs fetching, already marked as requested.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Region {
    pub request: Request,
    pub extent: Extent,
    pub resolution: f64,
    /// Grid cell in tiled mode.
    pub tile: Option<TileCoord>,
}

/// Decides which parts of a viewport still need loading.
///
/// Every region returned is marked covered before it is handed out, so the
/// same region is never returned twice for a resolution until coverage is
/// evicted or reset.
#[derive(Debug)]
pub struct ExtentLoadingStrategy {
    mode: StrategyMode,
    grid: TileGrid,
    max_regions: usize,
    coverage: CoverageCache,
}

impl Default for ExtentLoadingStrategy {
    fn default() -> Self {
        Self::new(StrategyMode::default())
    }
}

impl ExtentLoadingStrategy {
    pub fn new(mode: StrategyMode) -> Self {
        let tile_size_px = match mode {
            StrategyMode::Tiled { tile_size_px } => tile_size_px,
            StrategyMode::Bbox => DEFAULT_TILE_SIZE_PX,
        };
        Self {
            mode,
            grid: TileGrid::web_mercator(tile_size_px),
            max_regions: usize::MAX,
            coverage: CoverageCache::new(),
        }
    }

    /// Tiled strategy over a custom grid.
    pub fn with_grid(grid: TileGrid) -> Self {
        Self {
            mode: StrategyMode::Tiled {
                tile_size_px: grid.tile_size_px,
            },
            grid,
            max_regions: usize::MAX,
            coverage: CoverageCache::new(),
        }
    }

    /// Cap the number of regions handed out per evaluation. Regions past the
    /// cap stay uncovered and are picked up by a later evaluation.
    pub fn with_max_regions(mut self, max_regions: usize) -> Self {
        self.max_regions = max_regions.max(1);
        self
    }

    pub fn mode(&self) -> StrategyMode {
        self.mode
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn coverage(&self) -> &CoverageCache {
        &self.coverage
    }

    pub fn compute_missing_regions(&mut self, extent: &Extent, resolution: f64) -> Vec<Region> {
        if extent.is_unset() {
            tracing::debug!("viewport extent not yet known; nothing to load");
            return Vec::new();
        }
        if !extent.is_valid() || !resolution.is_finite() || resolution <= 0.0 {
            tracing::debug!(?extent, resolution, "ignoring unusable viewport");
            return Vec::new();
        }

        let extent = if extent.projection == Projection::WebMercator {
            *extent
        } else {
            match extent.to_projection(Projection::WebMercator) {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(%err, "cannot bring viewport into map projection");
                    return Vec::new();
                }
            }
        };

        let regions = match self.mode {
            StrategyMode::Tiled { .. } => self.missing_tiles(&extent, resolution),
            StrategyMode::Bbox => self.missing_bbox(extent, resolution),
        };
        tracing::debug!(
            resolution,
            regions = regions.len(),
            covered = self.coverage.len(),
            "computed missing regions"
        );
        regions
    }

    fn missing_tiles(&mut self, extent: &Extent, resolution: f64) -> Vec<Region> {
        let Some(range) = self.grid.tile_range(extent, resolution) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for tile in range.iter() {
            if self.coverage.is_tile_covered(resolution, tile) {
                continue;
            }
            if out.len() >= self.max_regions {
                tracing::warn!(
                    max = self.max_regions,
                    cells = range.cell_count(),
                    "region cap reached; deferring the rest"
                );
                break;
            }
            let tile_extent = self.grid.tile_extent(tile, resolution);
            let request = self.coverage.request_tile(resolution, tile, tile_extent);
            out.push(Region {
                request,
                extent: tile_extent,
                resolution,
                tile: Some(tile),
            });
        }
        out
    }

    fn missing_bbox(&mut self, extent: Extent, resolution: f64) -> Vec<Region> {
        if self.coverage.is_extent_covered(resolution, &extent) {
            return Vec::new();
        }
        let request = self.coverage.request_extent(resolution, extent);
        vec![Region {
            request,
            extent,
            resolution,
            tile: None,
        }]
    }

    /// Record the outcome of a request on its region.
    pub fn mark(&mut self, request: Request, state: ResidencyState) -> Result<(), CacheError> {
        self.coverage.set_state(request, state)
    }

    /// Make every covered region eligible for loading again.
    pub fn evict_all(&mut self) -> usize {
        self.coverage.evict_all()
    }

    /// Forget all coverage.
    pub fn reset(&mut self) {
        self.coverage.clear();
    }
}
