//! Core data types: input records, per-feature results, run statistics.

use geo::{Area, MultiPolygon, Polygon};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One polygonal feature with its attribute map.
///
/// Records are immutable once loaded. Attributes keep their source order
/// so downstream emitters see a stable column layout.
#[derive(Debug, Clone)]
pub struct PolygonRecord {
    /// Polygonal geometry, normalized to a multi-polygon.
    pub geometry: MultiPolygon<f64>,
    /// Attribute name/value pairs in source order.
    pub attributes: Vec<(String, String)>,
    /// Identifier of the source feature, used in log messages.
    pub source_id: String,
}

impl PolygonRecord {
    /// Create a record from a multi-polygon.
    pub fn new(
        geometry: MultiPolygon<f64>,
        attributes: Vec<(String, String)>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            geometry,
            attributes,
            source_id: source_id.into(),
        }
    }

    /// Create a record from a single polygon.
    pub fn from_polygon(
        polygon: Polygon<f64>,
        attributes: Vec<(String, String)>,
        source_id: impl Into<String>,
    ) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]), attributes, source_id)
    }

    /// Look up an attribute value by field name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Unsigned planar area of the record's geometry.
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }
}

/// Accumulated overlap statistics for one group key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Sum of intersection areas attributed to this group.
    pub area: f64,
    /// Number of overlay members of this group that intersected.
    pub count: usize,
}

impl GroupStats {
    pub(crate) fn add(&mut self, area: f64) {
        self.area += area;
        self.count += 1;
    }
}

/// Overlap statistics for one subject feature.
///
/// Produced once per feature during the streaming pass and handed to the
/// caller for emission; the engine never retains these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntersectionResult {
    /// Unsigned planar area of the subject feature itself.
    pub feature_area: f64,
    /// Total area of overlap with the overlay set.
    pub intersection_area: f64,
    /// Number of overlay members (merged clusters count once) that
    /// actually intersected.
    pub intersecting_count: usize,
    /// Per-group overlap statistics, present when grouping is enabled.
    pub group_stats: FxHashMap<String, GroupStats>,
}

/// Counters describing how the overlay collection was loaded and merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    /// Records read from the overlay collection.
    pub read: usize,
    /// Records kept after validity guarding.
    pub kept: usize,
    /// Records that were invalid but repaired in place.
    pub repaired: usize,
    /// Records dropped as empty or unrepairable.
    pub dropped: usize,
    /// Overlap groups successfully merged into one geometry.
    pub merged_groups: usize,
    /// Overlap groups whose members were inserted unmerged after every
    /// merge strategy failed.
    pub passthrough_groups: usize,
}
