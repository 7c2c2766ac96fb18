use foundation::bounds::Extent;
use foundation::math::precision::stable_total_cmp_f64;

/// A deterministic bounding volume hierarchy over 2D map extents.
///
/// Items are identified by their paint slot in the feature store.
///
/// Ordering contract:
/// - `query` returns slots in ascending order (bottom-most painted first).
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Extent,
        items: Vec<Item>,
    },
    Internal {
        bounds: Extent,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub slot: u64,
    pub bounds: Extent,
}

impl Bvh {
    pub fn build(items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        let mut items = items;
        if !items.is_empty() {
            let _root = build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Slots whose bounds intersect `query`, in ascending slot order.
    pub fn query(&self, query: &Extent) -> Vec<u64> {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<u64> = Vec::new();
        let mut stack: Vec<usize> = vec![0];

        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if !bounds.intersects(query) {
                        continue;
                    }
                    for item in items {
                        if item.bounds.intersects(query) {
                            hits.push(item.slot);
                        }
                    }
                }
                Node::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if !bounds.intersects(query) {
                        continue;
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

const LEAF_MAX: usize = 8;

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    if items.len() <= LEAF_MAX {
        let bounds = bounds_for_items(items);
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let bounds = bounds_for_items(items);
    let axis = split_axis(&bounds);

    items.sort_by(|a, b| {
        let ca = centroid_axis(&a.bounds, axis);
        let cb = centroid_axis(&b.bounds, axis);
        stable_total_cmp_f64(ca, cb).then_with(|| a.slot.cmp(&b.slot))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Placeholder; patched once children are built.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);

    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

fn centroid_axis(extent: &Extent, axis: usize) -> f64 {
    (extent.min[axis] + extent.max[axis]) * 0.5
}

fn split_axis(bounds: &Extent) -> usize {
    // Ties prefer X.
    if bounds.width() >= bounds.height() { 0 } else { 1 }
}

fn bounds_for_items(items: &[Item]) -> Extent {
    let mut b = items[0].bounds;
    for item in &items[1..] {
        b = b.union(&item.bounds);
    }
    b
}
