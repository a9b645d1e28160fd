//! The overlap engine: builds a merged, indexed overlay set and streams
//! per-feature intersection statistics over it.
//!
//! Construction makes one sequential pass over the overlay collection:
//! validity guarding, optional overlap deduplication (cluster + robust
//! union), optional tiling of oversized merged geometries, and a single
//! bulk index load. The engine is read-only afterwards; the subject
//! collection is consumed one feature at a time and results are handed to
//! the caller without being retained.

use geo::{Area, BooleanOps, BoundingRect, HasDimensions, Intersects, MultiPolygon};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::compute::{cluster, tiling, union, validity};
use crate::config::EngineConfig;
use crate::error::{OverlapError, Result};
use crate::index::EnvelopeIndex;
use crate::types::{GroupStats, IntersectionResult, LoadStats, PolygonRecord};

/// Group key recorded for overlay members with a missing attribute value.
const NULL_KEY: &str = "<null>";

/// One overlay member: a guarded (possibly merged) geometry with its
/// group key. A member counts once toward the intersecting count no
/// matter how many tiles it was split into.
#[derive(Debug)]
struct Member {
    group_key: Option<String>,
}

/// One indexable piece of a member: the whole geometry, or one grid tile
/// of it.
#[derive(Debug)]
struct Part {
    geometry: MultiPolygon<f64>,
    member: usize,
}

/// Read-only overlap lookup structure over an overlay collection.
#[derive(Debug)]
pub struct OverlapEngine {
    members: Vec<Member>,
    parts: Vec<Part>,
    index: EnvelopeIndex,
    group_keys: Vec<String>,
    stats: LoadStats,
    grouping: bool,
}

impl OverlapEngine {
    /// Build the engine from the overlay collection.
    ///
    /// Empty and unrepairable geometries are dropped with a warning. With
    /// deduplication enabled, mutually-overlapping members are clustered
    /// and merged; a cluster whose merge fails is inserted unmerged.
    ///
    /// # Errors
    ///
    /// [`OverlapError::EmptyInput`] when no usable geometry remains after
    /// guarding; [`OverlapError::GroupFieldMissing`] when the configured
    /// group field is absent from every overlay record.
    pub fn build(records: Vec<PolygonRecord>, config: &EngineConfig) -> Result<Self> {
        let mut stats = LoadStats {
            read: records.len(),
            ..LoadStats::default()
        };

        // Validity guard: the only gate through which overlay geometry
        // enters the clusterer, the merge chain, or the index.
        let mut geometries: Vec<MultiPolygon<f64>> = Vec::with_capacity(records.len());
        let mut keys: Vec<Option<String>> = Vec::with_capacity(records.len());
        let grouping = config.group_field.is_some();
        let mut field_seen = false;

        for record in &records {
            if let Some(field) = config.group_field.as_deref() {
                field_seen |= record.attribute(field).is_some();
            }
            match validity::guard(record.geometry.clone()) {
                validity::GuardOutcome::Valid(geom) => {
                    geometries.push(geom);
                    keys.push(group_key(record, config.group_field.as_deref()));
                }
                validity::GuardOutcome::Repaired(geom) => {
                    log::warn!("repaired invalid overlay geometry {}", record.source_id);
                    stats.repaired += 1;
                    geometries.push(geom);
                    keys.push(group_key(record, config.group_field.as_deref()));
                }
                validity::GuardOutcome::Dropped => {
                    log::warn!("dropped unusable overlay geometry {}", record.source_id);
                    stats.dropped += 1;
                }
            }
        }
        stats.kept = geometries.len();

        if geometries.is_empty() {
            return Err(OverlapError::EmptyInput);
        }
        if let Some(field) = config.group_field.as_deref()
            && !field_seen
        {
            return Err(OverlapError::GroupFieldMissing(field.to_string()));
        }

        let mut members = Vec::new();
        let mut member_geoms = Vec::new();

        if config.deduplicate {
            for group in cluster::partition(&geometries) {
                if group.len() == 1 {
                    let idx = group[0];
                    members.push(Member {
                        group_key: keys[idx].clone(),
                    });
                    member_geoms.push(geometries[idx].clone());
                    continue;
                }

                // The merged cluster inherits the first member's key.
                let first_key = keys[group[0]].clone();
                let cluster_geoms: Vec<MultiPolygon<f64>> =
                    group.iter().map(|&i| geometries[i].clone()).collect();
                match union::robust_union(cluster_geoms, &config.merge) {
                    Ok(Some(merged)) => {
                        stats.merged_groups += 1;
                        members.push(Member {
                            group_key: first_key,
                        });
                        member_geoms.push(merged);
                    }
                    Ok(None) | Err(_) => {
                        // Every strategy exhausted: keep the members
                        // unmerged rather than lose or corrupt them.
                        log::warn!(
                            "failed to merge overlap group of {}, inserting members unmerged",
                            group.len()
                        );
                        stats.passthrough_groups += 1;
                        for &idx in &group {
                            members.push(Member {
                                group_key: keys[idx].clone(),
                            });
                            member_geoms.push(geometries[idx].clone());
                        }
                    }
                }
            }
        } else {
            for (geom, key) in geometries.into_iter().zip(keys) {
                members.push(Member { group_key: key });
                member_geoms.push(geom);
            }
        }

        // Oversized members are split into grid tiles so each query only
        // touches the tiles its envelope overlaps.
        let mut parts = Vec::with_capacity(member_geoms.len());
        for (member_id, geom) in member_geoms.into_iter().enumerate() {
            match tiling::grid_size_for(&geom, &config.tiling) {
                Some(grid) => {
                    let tiles = tiling::split_into_tiles(&geom, grid);
                    log::info!(
                        "split oversized member into {} tiles ({}x{} grid)",
                        tiles.len(),
                        grid,
                        grid
                    );
                    for tile in tiles {
                        parts.push(Part {
                            geometry: tile,
                            member: member_id,
                        });
                    }
                }
                None => parts.push(Part {
                    geometry: geom,
                    member: member_id,
                }),
            }
        }

        let index = EnvelopeIndex::from_pairs(
            parts
                .iter()
                .enumerate()
                .filter_map(|(i, part)| part.geometry.bounding_rect().map(|rect| (rect, i))),
        );

        let group_keys = sorted_group_keys(&members);

        Ok(Self {
            members,
            parts,
            index,
            group_keys,
            stats,
            grouping,
        })
    }

    /// Overlap statistics for one subject feature.
    ///
    /// Returns `None` for features whose geometry is empty or cannot be
    /// repaired; such features are skipped, not errors. A feature that
    /// overlaps nothing yields a result with zero area and count.
    pub fn accumulate(&self, record: &PolygonRecord) -> Option<IntersectionResult> {
        let Some(geom) = validity::ensure_valid(record.geometry.clone()) else {
            log::warn!("skipping subject feature {} with unusable geometry", record.source_id);
            return None;
        };
        let envelope = geom.bounding_rect()?;

        let candidates: SmallVec<[usize; 16]> = self.index.query(&envelope).collect();
        let mut member_areas: FxHashMap<usize, f64> = FxHashMap::default();

        for part_id in candidates {
            let part = &self.parts[part_id];
            if !part.geometry.intersects(&geom) {
                continue;
            }
            let intersection = geom.intersection(&part.geometry);
            if intersection.is_empty() {
                continue;
            }
            let area = intersection.unsigned_area();
            if !area.is_finite() {
                log::warn!(
                    "skipping candidate with non-finite intersection area for feature {}",
                    record.source_id
                );
                continue;
            }
            if area > 0.0 {
                *member_areas.entry(part.member).or_insert(0.0) += area;
            }
        }

        let mut result = IntersectionResult {
            feature_area: geom.unsigned_area(),
            ..IntersectionResult::default()
        };
        for (member_id, area) in member_areas {
            result.intersection_area += area;
            result.intersecting_count += 1;
            if self.grouping {
                let key = self.members[member_id]
                    .group_key
                    .clone()
                    .unwrap_or_else(|| NULL_KEY.to_string());
                result
                    .group_stats
                    .entry(key)
                    .or_insert_with(GroupStats::default)
                    .add(area);
            }
        }
        Some(result)
    }

    /// Stream the subject collection through the engine, invoking `emit`
    /// once per feature with usable geometry.
    ///
    /// Results are never buffered; the return value is the sum of all
    /// emitted intersection areas.
    pub fn run<I, F>(&self, records: I, mut emit: F) -> f64
    where
        I: IntoIterator<Item = PolygonRecord>,
        F: FnMut(&PolygonRecord, IntersectionResult),
    {
        let mut total = 0.0;
        for record in records {
            if let Some(result) = self.accumulate(&record) {
                total += result.intersection_area;
                emit(&record, result);
            }
        }
        total
    }

    /// Distinct group keys in emission order: numeric when every pair of
    /// keys compares numerically, lexicographic otherwise.
    pub fn group_keys(&self) -> &[String] {
        &self.group_keys
    }

    /// Number of overlay members after guarding and deduplication.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Counters from the build pass.
    pub fn load_stats(&self) -> LoadStats {
        self.stats
    }
}

fn group_key(record: &PolygonRecord, field: Option<&str>) -> Option<String> {
    let field = field?;
    Some(
        record
            .attribute(field)
            .map(str::to_string)
            .unwrap_or_else(|| NULL_KEY.to_string()),
    )
}

/// Deduplicate and sort group keys. The order is numeric when every key
/// parses as a number (so "10" sorts after "9") and lexicographic
/// otherwise; mixing the two per pair would not be a total order.
fn sorted_group_keys(members: &[Member]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for member in members {
        if let Some(key) = &member.group_key
            && !keys.contains(key)
        {
            keys.push(key.clone());
        }
    }
    if keys.iter().all(|k| k.parse::<f64>().is_ok()) {
        keys.sort_by(|a, b| {
            let na = a.parse::<f64>().unwrap_or(f64::NAN);
            let nb = b.parse::<f64>().unwrap_or(f64::NAN);
            na.total_cmp(&nb)
        });
    } else {
        keys.sort();
    }
    keys
}
