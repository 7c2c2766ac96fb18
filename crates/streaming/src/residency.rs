/// Lifecycle of a covered region.
///
/// Requested → Resident | Failed → Evicted
///
/// `Requested`, `Resident` and `Failed` all count as covered: a region is
/// marked before its fetch completes and a failure does not un-mark it.
/// Only `Evicted` regions are eligible for another request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResidencyState {
    Requested,
    Resident,
    Failed,
    Evicted,
}

impl ResidencyState {
    pub fn is_covered(self) -> bool {
        !matches!(self, ResidencyState::Evicted)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Residency {
    pub state: ResidencyState,
}

impl Residency {
    pub fn new() -> Self {
        Self {
            state: ResidencyState::Requested,
        }
    }
}

impl Default for Residency {
    fn default() -> Self {
        Self::new()
    }
}
