//! Validity guarding: repair-or-drop policy for polygonal geometry.
//!
//! Every geometry entering the spatial index, the overlap clusterer, or the
//! robust union chain passes through [`guard`] first. Invalid geometry is
//! repaired on a best-effort basis; geometry that stays invalid is dropped,
//! never propagated downstream.

use geo::{Area, BooleanOps, CoordsIter, HasDimensions, MultiPolygon, Validation};

use crate::types::PolygonRecord;

/// Outcome of guarding one geometry.
#[derive(Debug, Clone)]
pub enum GuardOutcome {
    /// The geometry was already valid and is returned unchanged.
    Valid(MultiPolygon<f64>),
    /// The geometry was invalid but repair produced a usable replacement.
    Repaired(MultiPolygon<f64>),
    /// The geometry is empty or could not be repaired.
    Dropped,
}

impl GuardOutcome {
    /// The guarded geometry, if any.
    pub fn into_geometry(self) -> Option<MultiPolygon<f64>> {
        match self {
            GuardOutcome::Valid(geom) | GuardOutcome::Repaired(geom) => Some(geom),
            GuardOutcome::Dropped => None,
        }
    }
}

/// Apply the repair-or-drop policy to one geometry.
pub fn guard(geom: MultiPolygon<f64>) -> GuardOutcome {
    if geom.is_empty() {
        return GuardOutcome::Dropped;
    }
    if has_finite_coords(&geom) && geom.is_valid() {
        return GuardOutcome::Valid(geom);
    }
    match repair(&geom) {
        Some(fixed) => GuardOutcome::Repaired(fixed),
        None => GuardOutcome::Dropped,
    }
}

/// Guard a geometry, discarding the valid/repaired distinction.
///
/// Returns `None` for empty or unrepairable input.
pub fn ensure_valid(geom: MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    guard(geom).into_geometry()
}

/// Best-effort repair of an invalid polygonal geometry.
///
/// Re-runs the geometry through the boolean-ops kernel by unioning it with
/// an empty operand, which resolves self-intersections and strips
/// degenerate rings. Returns `None` when the result is still empty,
/// non-finite, or invalid.
pub fn repair(geom: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    if !has_finite_coords(geom) {
        return None;
    }
    let rebuilt = geom.union(&MultiPolygon::<f64>::new(Vec::new()));
    let cleaned = MultiPolygon::new(
        rebuilt
            .0
            .into_iter()
            .filter(|p| p.unsigned_area() > 0.0)
            .collect(),
    );
    if cleaned.is_empty() || !cleaned.is_valid() {
        return None;
    }
    Some(cleaned)
}

/// Whether every coordinate of the geometry is finite.
pub fn has_finite_coords(geom: &MultiPolygon<f64>) -> bool {
    geom.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Summary of a validity inspection over a record collection.
///
/// `issues` holds per-record detail lines, capped at `detail_cap` entries
/// to bound memory on large collections; counters keep counting past the
/// cap.
#[derive(Debug, Clone, Default)]
pub struct ValidityReport {
    /// Records inspected.
    pub total: usize,
    /// Records with empty geometry.
    pub empty: usize,
    /// Records with invalid geometry.
    pub invalid: usize,
    /// Invalid records that repair would fix.
    pub fixable: usize,
    /// Per-record issue descriptions, at most `detail_cap` entries.
    pub issues: Vec<String>,
    detail_cap: usize,
}

impl ValidityReport {
    fn push_issue(&mut self, line: String) {
        if self.issues.len() < self.detail_cap {
            self.issues.push(line);
        }
    }
}

/// Default cap on collected issue details.
pub const DEFAULT_DETAIL_CAP: usize = 10_000;

/// Inspect a record collection for empty and invalid geometry.
///
/// Does not modify the records; reports whether repair would succeed for
/// each invalid geometry.
pub fn inspect(records: &[PolygonRecord], detail_cap: usize) -> ValidityReport {
    let mut report = ValidityReport {
        detail_cap,
        ..ValidityReport::default()
    };

    for record in records {
        report.total += 1;

        if record.geometry.is_empty() {
            report.empty += 1;
            report.push_issue(format!("{}: geometry is empty", record.source_id));
            continue;
        }

        if !has_finite_coords(&record.geometry) {
            report.invalid += 1;
            report.push_issue(format!(
                "{}: invalid geometry - non-finite coordinates",
                record.source_id
            ));
            continue;
        }

        if let Err(problem) = record.geometry.check_validation() {
            report.invalid += 1;
            if repair(&record.geometry).is_some() {
                report.fixable += 1;
            }
            report.push_issue(format!(
                "{}: invalid geometry - {}",
                record.source_id, problem
            ));
        }
    }

    report
}
