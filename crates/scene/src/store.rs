use std::cell::OnceCell;
use std::collections::BTreeMap;

use foundation::Viewport;
use foundation::bounds::Extent;
use foundation::math::{Projection, Vec2};

use crate::feature::{Feature, FeatureId};
use crate::spatial::{Bvh, Item as BvhItem};

#[derive(Debug, Clone)]
struct Entry {
    /// Paint slot; higher slots are drawn on top.
    slot: u64,
    extent: Option<Extent>,
    feature: Feature,
}

/// Outcome of a [`FeatureStore::merge`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub replaced: usize,
}

/// In-memory store of loaded features, keyed by stable id.
///
/// Ordering contract:
/// - Paint order is first-insertion order. Replacing a feature keeps its slot.
/// - `all()` yields features bottom-most first; pixel queries yield the
///   topmost first.
///
/// The spatial index is rebuilt lazily on the first query after a mutation.
#[derive(Debug, Default)]
pub struct FeatureStore {
    next_slot: u64,
    entries: BTreeMap<FeatureId, Entry>,
    paint_order: BTreeMap<u64, FeatureId>,
    index: OnceCell<Bvh>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.entries.get(id).map(|e| &e.feature)
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.entries.contains_key(id)
    }

    /// Merge a batch. Features already present (same id) are replaced in
    /// place; features absent from the batch are left untouched.
    pub fn merge<I>(&mut self, features: I) -> MergeStats
    where
        I: IntoIterator<Item = Feature>,
    {
        let mut stats = MergeStats::default();
        for feature in features {
            let extent = feature.geometry.extent();
            match self.entries.get_mut(&feature.id) {
                Some(entry) => {
                    entry.extent = extent;
                    entry.feature = feature;
                    stats.replaced += 1;
                }
                None => {
                    let slot = self.next_slot;
                    self.next_slot += 1;
                    self.paint_order.insert(slot, feature.id.clone());
                    self.entries.insert(
                        feature.id.clone(),
                        Entry {
                            slot,
                            extent,
                            feature,
                        },
                    );
                    stats.inserted += 1;
                }
            }
        }

        if stats != MergeStats::default() {
            self.index = OnceCell::new();
        }
        stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.paint_order.clear();
        self.index = OnceCell::new();
    }

    /// All features, bottom-most painted first.
    pub fn all(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.paint_order
            .values()
            .filter_map(|id| self.entries.get(id))
            .map(|e| &e.feature)
    }

    /// Features whose geometry lies within `tolerance_px` of `pixel`.
    ///
    /// Topmost (last painted) first.
    pub fn query_at_pixel(
        &self,
        viewport: &Viewport,
        pixel: Vec2,
        tolerance_px: f64,
    ) -> Vec<&Feature> {
        let point = viewport.pixel_to_map(pixel);
        let tolerance = tolerance_px.max(0.0) * viewport.resolution;
        self.query_near(point, tolerance)
    }

    /// Features within `tolerance` map units of `point`, topmost first.
    pub fn query_near(&self, point: Vec2, tolerance: f64) -> Vec<&Feature> {
        let probe = Extent::from_corners(point, point, Projection::WebMercator).buffer(tolerance);
        let index = self.index.get_or_init(|| self.build_index());

        let mut out: Vec<&Feature> = Vec::new();
        for slot in index.query(&probe).into_iter().rev() {
            let Some(entry) = self.paint_order.get(&slot).and_then(|id| self.entries.get(id))
            else {
                continue;
            };
            let Some(d) = entry.feature.geometry.distance_to(point) else {
                continue;
            };
            if d <= tolerance {
                out.push(&entry.feature);
            }
        }
        out
    }

    fn build_index(&self) -> Bvh {
        let items = self
            .entries
            .values()
            .filter_map(|e| {
                e.extent.map(|bounds| BvhItem {
                    slot: e.slot,
                    bounds,
                })
            })
            .collect();
        Bvh::build(items)
    }
}
