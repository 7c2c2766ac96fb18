use foundation::bounds::Extent;

use crate::toggle::Generation;

/// Identifies a load request in a deterministic, stable way.
///
/// Small and copyable so it can be carried by fetch tasks and used as a
/// cache key without allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// One region to fetch, stamped with the toggle generation it was issued under.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FetchTask {
    pub request: Request,
    pub generation: Generation,
    /// Region in the map's working projection.
    pub extent: Extent,
    pub resolution: f64,
}
