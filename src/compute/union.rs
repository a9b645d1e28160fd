//! Robust union: merge a cluster of polygons through a tiered fallback
//! chain.
//!
//! Bulk set-wise union is far cheaper than pairwise accumulation but is
//! numerically fragile on large or dirty inputs. The chain always prefers
//! the cheapest strategy that yields a valid result:
//!
//! 1. trivial (zero or one member)
//! 2. large clusters: spatial sort, then iterative fan-in over medium
//!    batches to bound the peak working set
//! 3. repair pass over every member, dropping the unrepairable
//! 4. bulk union over the whole batch
//! 5. small batches: pairwise accumulation with validity guarding at every
//!    step; a topology failure here is a hard error for this merge
//! 6. larger batches: sub-batching with fan-in through the same chain
//!
//! A batch that exhausts every strategy surfaces as an error; the engine
//! recovers by inserting the group's members unmerged.

use geo::{
    BooleanOps, BoundingRect, HasDimensions, MultiPolygon, Polygon, Validation, unary_union,
};

use crate::compute::validity;
use crate::config::MergeConfig;
use crate::error::{OverlapError, Result};

/// Merge a non-empty list of polygonal geometries into one.
///
/// Returns `Ok(None)` when the input is empty or every member is dropped
/// by the validity guard, `Ok(Some(_))` with a valid non-empty geometry on
/// success, and `Err(OverlapError::MergeFailure)` when every strategy is
/// exhausted. Callers recover from the error by falling back to unmerged
/// per-member insertion.
pub fn robust_union(
    mut geoms: Vec<MultiPolygon<f64>>,
    cfg: &MergeConfig,
) -> Result<Option<MultiPolygon<f64>>> {
    if geoms.is_empty() {
        return Ok(None);
    }
    if geoms.len() == 1 {
        return Ok(geoms.pop());
    }

    if geoms.len() <= cfg.large_cluster {
        return merge_batch(geoms, cfg);
    }

    // Large cluster: sort by envelope center so spatially adjacent members
    // land in the same batch, then reduce through rounds of medium-sized
    // batch merges. The reduction is iterative; cluster size never grows
    // the call stack.
    spatial_sort(&mut geoms);
    let mut layer = geoms;
    while layer.len() > 1 {
        if layer.len() <= cfg.medium_batch.max(2) {
            return merge_batch(layer, cfg);
        }
        let mut next = Vec::with_capacity(layer.len().div_ceil(cfg.medium_batch.max(1)));
        let mut members = layer.into_iter();
        loop {
            let batch: Vec<_> = members.by_ref().take(cfg.medium_batch.max(1)).collect();
            if batch.is_empty() {
                break;
            }
            if let Some(merged) = merge_batch(batch, cfg)? {
                next.push(merged);
            }
        }
        layer = next;
    }
    Ok(layer.pop())
}

/// Merge one batch through tiers 3-6.
///
/// Recursion only happens through sub-batching, whose batch size is
/// strictly smaller than the input, so the depth is logarithmic in the
/// batch size.
fn merge_batch(geoms: Vec<MultiPolygon<f64>>, cfg: &MergeConfig) -> Result<Option<MultiPolygon<f64>>> {
    // Repair pass: unrepairable members are dropped, not fatal.
    let before = geoms.len();
    let mut members: Vec<MultiPolygon<f64>> =
        geoms.into_iter().filter_map(validity::ensure_valid).collect();
    if members.len() < before {
        log::warn!(
            "dropped {} unrepairable geometries before merge",
            before - members.len()
        );
    }

    if members.is_empty() {
        return Ok(None);
    }
    if members.len() == 1 {
        return Ok(members.pop());
    }

    // Primary strategy: one set-wise union over the whole batch.
    if let Some(merged) = bulk_union(&members) {
        return Ok(Some(merged));
    }
    log::warn!(
        "bulk union failed for batch of {}, falling back",
        members.len()
    );

    // Sub-batching: the chunk is at least 2 and at most half the member
    // count, so every recursion step strictly shrinks. Batches too small
    // to split that way go through pairwise accumulation instead.
    let half = members.len().div_ceil(2);
    if members.len() <= cfg.pairwise_limit || half < 2 {
        return pairwise_union(members).map(Some);
    }
    let chunk = cfg.fallback_batch.clamp(2, half);
    let mut next = Vec::with_capacity(members.len().div_ceil(chunk));
    let mut iter = members.into_iter();
    loop {
        let batch: Vec<_> = iter.by_ref().take(chunk).collect();
        if batch.is_empty() {
            break;
        }
        if let Some(merged) = merge_batch(batch, cfg)? {
            next.push(merged);
        }
    }
    match next.len() {
        0 => Ok(None),
        1 => Ok(next.pop()),
        _ => merge_batch(next, cfg),
    }
}

/// Set-wise union over a batch, returning `None` when the result cannot be
/// made valid.
fn bulk_union(members: &[MultiPolygon<f64>]) -> Option<MultiPolygon<f64>> {
    let polygons: Vec<&Polygon<f64>> = members.iter().flat_map(|m| m.0.iter()).collect();
    let merged = unary_union(polygons);
    if merged.is_empty() {
        return None;
    }
    if merged.is_valid() {
        return Some(merged);
    }
    validity::repair(&merged)
}

/// Pairwise accumulation for small batches. Both operands and the running
/// result are validity-guarded at every step; a topology failure is a hard
/// error for this merge and propagates to the caller.
fn pairwise_union(members: Vec<MultiPolygon<f64>>) -> Result<MultiPolygon<f64>> {
    let mut result: Option<MultiPolygon<f64>> = None;
    let mut skipped = 0usize;

    for geom in members {
        let Some(geom) = validity::ensure_valid(geom) else {
            skipped += 1;
            continue;
        };
        result = Some(match result {
            None => geom,
            Some(acc) => merge_pair(acc, geom)?,
        });
    }

    if skipped > 0 {
        log::warn!("skipped {} geometries during pairwise union", skipped);
    }
    result.ok_or_else(|| {
        OverlapError::MergeFailure("every member dropped during pairwise union".to_string())
    })
}

/// Union of exactly two guarded operands, with the result re-validated.
fn merge_pair(a: MultiPolygon<f64>, b: MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    let merged = a.union(&b);
    if merged.is_empty() {
        return Err(OverlapError::MergeFailure(
            "pairwise union produced an empty geometry".to_string(),
        ));
    }
    if merged.is_valid() {
        return Ok(merged);
    }
    validity::repair(&merged).ok_or_else(|| {
        OverlapError::MergeFailure(
            "pairwise union produced an invalid geometry that cannot be repaired".to_string(),
        )
    })
}

/// Sort by envelope center, X first then Y, so batch-local merges operate
/// on spatially adjacent geometry.
fn spatial_sort(geoms: &mut [MultiPolygon<f64>]) {
    geoms.sort_by(|a, b| {
        let ca = envelope_center(a);
        let cb = envelope_center(b);
        ca.0.total_cmp(&cb.0).then(ca.1.total_cmp(&cb.1))
    });
}

fn envelope_center(geom: &MultiPolygon<f64>) -> (f64, f64) {
    match geom.bounding_rect() {
        Some(rect) => (
            (rect.min().x + rect.max().x) / 2.0,
            (rect.min().y + rect.max().y) / 2.0,
        ),
        None => (f64::MAX, f64::MAX),
    }
}
