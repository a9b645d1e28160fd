//! Bulk-loaded envelope index over a fixed geometry set.
//!
//! A thin wrapper around an R-tree holding `(envelope, item id)` entries.
//! The index is built once from a finite batch and queried read-only
//! afterwards; envelope queries may return false positives that the caller
//! must confirm with an exact `Intersects` test.

use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::{AABB, RTree, RTreeObject, primitives::Rectangle};

/// R-tree node parameters. A branching factor of 100 trades query fan-out
/// for build cost and suits overlay sets in the tens of thousands.
#[derive(Debug)]
pub struct NodeParams;

impl rstar::RTreeParams for NodeParams {
    const MIN_SIZE: usize = 50;
    const MAX_SIZE: usize = 100;
    const REINSERTION_COUNT: usize = 25;
    type DefaultInsertionStrategy = rstar::RStarInsertionStrategy;
}

/// One index entry: an axis-aligned envelope tagged with an item id.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEnvelope {
    rect: Rectangle<[f64; 2]>,
    /// Caller-defined id, usually an index into a geometry slice.
    pub item: usize,
}

impl IndexedEnvelope {
    fn new(rect: Rect<f64>, item: usize) -> Self {
        Self {
            rect: Rectangle::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
            item,
        }
    }
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.rect.envelope()
    }
}

/// Read-only envelope index over a batch of geometries.
#[derive(Debug)]
pub struct EnvelopeIndex {
    tree: RTree<IndexedEnvelope, NodeParams>,
    len: usize,
}

impl EnvelopeIndex {
    /// Bulk-load an index over the given geometries. Entries keep their
    /// position in `geometries` as item id; empty geometries (no bounding
    /// rectangle) are skipped.
    pub fn build(geometries: &[MultiPolygon<f64>]) -> Self {
        let entries: Vec<IndexedEnvelope> = geometries
            .iter()
            .enumerate()
            .filter_map(|(i, geom)| geom.bounding_rect().map(|rect| IndexedEnvelope::new(rect, i)))
            .collect();
        Self::from_entries(entries)
    }

    /// Bulk-load an index from pre-computed `(envelope, id)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Rect<f64>, usize)>) -> Self {
        let entries: Vec<IndexedEnvelope> = pairs
            .into_iter()
            .map(|(rect, item)| IndexedEnvelope::new(rect, item))
            .collect();
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<IndexedEnvelope>) -> Self {
        let len = entries.len();
        Self {
            tree: RTree::bulk_load_with_params(entries),
            len,
        }
    }

    /// Item ids of all entries whose envelope intersects the query
    /// envelope. May include false positives.
    pub fn query(&self, envelope: &Rect<f64>) -> impl Iterator<Item = usize> + '_ {
        let aabb = AABB::from_corners(
            [envelope.min().x, envelope.min().y],
            [envelope.max().x, envelope.max().y],
        );
        self.tree
            .locate_in_envelope_intersecting(&aabb)
            .map(|entry| entry.item)
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
