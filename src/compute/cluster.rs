//! Overlap clustering: partition a polygon set into maximal
//! mutually-intersecting groups.
//!
//! Candidate pairs come from an envelope index, so the pass is close to
//! O(n log n) instead of quadratic. Exact `Intersects` confirms each
//! candidate pair before the union-find join; the resulting partition is
//! canonical regardless of traversal order.

use geo::{BoundingRect, Intersects, MultiPolygon};
use rustc_hash::FxHashMap;

use crate::index::EnvelopeIndex;

/// Arena-indexed disjoint-set with path compression.
#[derive(Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    /// Create `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    /// Representative of the set containing `x`, compressing the path.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            cur = std::mem::replace(&mut self.parent[cur], root);
        }
        root
    }

    /// Join the sets containing `x` and `y`.
    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x != root_y {
            self.parent[root_x] = root_y;
        }
    }

    /// Group member indices by set representative.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for i in 0..self.parent.len() {
            let root = self.find(i);
            by_root.entry(root).or_default().push(i);
        }
        let mut groups: Vec<Vec<usize>> = by_root.into_values().collect();
        // Stable output order for deterministic downstream processing.
        groups.sort_by_key(|g| g[0]);
        groups
    }
}

/// Partition `geometries` into groups connected by chains of pairwise
/// intersection. Every index appears in exactly one group; singletons are
/// groups of size one.
pub fn partition(geometries: &[MultiPolygon<f64>]) -> Vec<Vec<usize>> {
    let n = geometries.len();
    if n == 0 {
        return Vec::new();
    }

    let index = EnvelopeIndex::build(geometries);
    let mut sets = DisjointSet::new(n);

    for (i, geom) in geometries.iter().enumerate() {
        let Some(envelope) = geom.bounding_rect() else {
            continue;
        };
        for j in index.query(&envelope) {
            // Each unordered pair is checked once.
            if j <= i {
                continue;
            }
            if geom.intersects(&geometries[j]) {
                sets.union(i, j);
            }
        }
    }

    sets.groups()
}

/// Groups of size greater than one, for merging. Singletons are handled
/// by the caller as pass-through.
pub fn find_overlap_groups(geometries: &[MultiPolygon<f64>]) -> Vec<Vec<usize>> {
    partition(geometries)
        .into_iter()
        .filter(|group| group.len() > 1)
        .collect()
}
