use std::collections::BTreeMap;

use foundation::bounds::Extent;
use foundation::math::StableF64;

use crate::grid::TileCoord;
use crate::request::Request;
use crate::residency::{Residency, ResidencyState};

/// A covered region within one resolution level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RegionKey {
    Tile(TileCoord),
    /// A whole requested extent (bbox mode), numbered in issue order.
    Extent(u64),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CoverageKey {
    pub resolution: StableF64,
    pub region: RegionKey,
}

impl CoverageKey {
    pub fn new(resolution: f64, region: RegionKey) -> Self {
        Self {
            resolution: StableF64(resolution),
            region,
        }
    }
}

#[derive(Debug, Clone)]
struct CoverageEntry {
    extent: Extent,
    residency: Residency,
    /// The request currently responsible for this region.
    request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    UnknownRequest(Request),
    /// The region was re-requested since; only the newest request may update it.
    Superseded(Request),
    /// The region was evicted after the request was issued.
    Evicted(Request),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::UnknownRequest(req) => write!(f, "unknown request {req}"),
            CacheError::Superseded(req) => write!(f, "request {req} was superseded"),
            CacheError::Evicted(req) => write!(f, "region for request {req} was evicted"),
        }
    }
}

impl std::error::Error for CacheError {}

/// Bookkeeping of which regions have been requested, per resolution.
///
/// Notes on determinism:
/// - Levels and entries live in `BTreeMap`s for stable traversal order.
/// - Request ids are never reused, not even across [`CoverageCache::clear`].
///
/// The cache holds no feature data; it only answers "was this region already
/// asked for at this resolution".
#[derive(Debug)]
pub struct CoverageCache {
    next_request: u64,
    next_extent: u64,
    levels: BTreeMap<StableF64, BTreeMap<RegionKey, CoverageEntry>>,
    requests: BTreeMap<Request, CoverageKey>,
}

impl Default for CoverageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageCache {
    pub fn new() -> Self {
        Self {
            next_request: 1,
            next_extent: 0,
            levels: BTreeMap::new(),
            requests: BTreeMap::new(),
        }
    }

    /// Number of tracked regions across all resolutions, evicted ones included.
    pub fn len(&self) -> usize {
        self.levels.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tracked regions currently in `state`.
    pub fn count(&self, state: ResidencyState) -> usize {
        self.levels
            .values()
            .flat_map(BTreeMap::values)
            .filter(|e| e.residency.state == state)
            .count()
    }

    pub fn is_tile_covered(&self, resolution: f64, coord: TileCoord) -> bool {
        self.levels
            .get(&StableF64(resolution))
            .and_then(|level| level.get(&RegionKey::Tile(coord)))
            .is_some_and(|e| e.residency.state.is_covered())
    }

    /// True if some covered region at `resolution` fully contains `extent`.
    pub fn is_extent_covered(&self, resolution: f64, extent: &Extent) -> bool {
        self.levels.get(&StableF64(resolution)).is_some_and(|level| {
            level
                .values()
                .any(|e| e.residency.state.is_covered() && e.extent.contains_extent(extent))
        })
    }

    pub fn request_tile(&mut self, resolution: f64, coord: TileCoord, extent: Extent) -> Request {
        self.request(CoverageKey::new(resolution, RegionKey::Tile(coord)), extent)
    }

    /// Track a whole extent. Evicted extents it contains are dropped.
    pub fn request_extent(&mut self, resolution: f64, extent: Extent) -> Request {
        if let Some(level) = self.levels.get_mut(&StableF64(resolution)) {
            let requests = &mut self.requests;
            level.retain(|key, e| {
                let stale = matches!(key, RegionKey::Extent(_))
                    && e.residency.state == ResidencyState::Evicted
                    && extent.contains_extent(&e.extent);
                if stale {
                    requests.remove(&e.request);
                }
                !stale
            });
        }

        let slot = self.next_extent;
        self.next_extent += 1;
        self.request(CoverageKey::new(resolution, RegionKey::Extent(slot)), extent)
    }

    fn request(&mut self, key: CoverageKey, extent: Extent) -> Request {
        let req = Request(self.next_request);
        self.next_request += 1;

        let level = self.levels.entry(key.resolution).or_default();
        let previous = level.insert(
            key.region,
            CoverageEntry {
                extent,
                residency: Residency::new(),
                request: req,
            },
        );
        if let Some(previous) = previous {
            self.requests.remove(&previous.request);
        }
        self.requests.insert(req, key);
        req
    }

    pub fn key_for_request(&self, req: Request) -> Option<&CoverageKey> {
        self.requests.get(&req)
    }

    pub fn state(&self, key: &CoverageKey) -> Option<ResidencyState> {
        self.entry(key).map(|e| e.residency.state)
    }

    pub fn state_for_request(&self, req: Request) -> Option<ResidencyState> {
        self.key_for_request(req).and_then(|key| self.state(key))
    }

    fn entry(&self, key: &CoverageKey) -> Option<&CoverageEntry> {
        self.levels.get(&key.resolution)?.get(&key.region)
    }

    /// Record the outcome of `req` on its region.
    pub fn set_state(&mut self, req: Request, state: ResidencyState) -> Result<(), CacheError> {
        let key = *self.requests.get(&req).ok_or(CacheError::UnknownRequest(req))?;
        let entry = self
            .levels
            .get_mut(&key.resolution)
            .and_then(|level| level.get_mut(&key.region))
            .ok_or(CacheError::UnknownRequest(req))?;

        if entry.request != req {
            return Err(CacheError::Superseded(req));
        }
        if entry.residency.state == ResidencyState::Evicted {
            return Err(CacheError::Evicted(req));
        }
        entry.residency.state = state;
        Ok(())
    }

    /// Mark every region evicted so the next viewport evaluation requests it
    /// again. Returns how many regions changed state.
    pub fn evict_all(&mut self) -> usize {
        let mut evicted = 0;
        for entry in self.levels.values_mut().flat_map(BTreeMap::values_mut) {
            if entry.residency.state != ResidencyState::Evicted {
                entry.residency.state = ResidencyState::Evicted;
                evicted += 1;
            }
        }
        evicted
    }

    /// Forget all coverage. Request ids keep counting up.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.requests.clear();
    }
}
