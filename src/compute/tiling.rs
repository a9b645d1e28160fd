//! Grid decomposition of oversized merged geometries.
//!
//! Intersecting a subject feature against one huge merged geometry is a
//! hot-path cost: every query pays for the full vertex set. Splitting the
//! geometry into an NxN grid of tiles and indexing the tiles bounds each
//! query to the handful of tiles its envelope touches.

use geo::{BooleanOps, BoundingRect, CoordsIter, HasDimensions, MultiPolygon, Rect, Validation};

use crate::config::TilingConfig;

/// Grid size for a merged geometry, or `None` when direct intersection is
/// cheap enough.
///
/// The envelope area is checked first because it is free; vertex counting
/// walks the coordinate list and is only consulted below the envelope
/// bands. Larger geometries get finer grids.
pub fn grid_size_for(geom: &MultiPolygon<f64>, cfg: &TilingConfig) -> Option<usize> {
    let rect = geom.bounding_rect()?;
    let envelope_area = rect.width() * rect.height();

    if envelope_area > cfg.envelope_area_threshold {
        let grid = if envelope_area > cfg.envelope_area_large {
            15
        } else if envelope_area > cfg.envelope_area_medium {
            10
        } else {
            7
        };
        return Some(grid);
    }

    let vertices = geom.coords_count();
    if vertices > cfg.vertex_count_large {
        Some(10)
    } else if vertices > cfg.vertex_count_medium {
        Some(7)
    } else {
        None
    }
}

/// Split a geometry into grid tiles covering its envelope.
///
/// Cells whose envelope does not intersect the geometry's envelope are
/// skipped; cells with an empty intersection produce no tile. The returned
/// tiles are valid, non-empty, and their areas sum to the input area.
pub fn split_into_tiles(geom: &MultiPolygon<f64>, grid_size: usize) -> Vec<MultiPolygon<f64>> {
    let Some(envelope) = geom.bounding_rect() else {
        return Vec::new();
    };
    let tile_width = envelope.width() / grid_size as f64;
    let tile_height = envelope.height() / grid_size as f64;
    // Per-part envelopes, so cells over empty stretches of a sparse
    // multi-polygon are skipped before the boolean op.
    let part_envelopes: Vec<Rect<f64>> =
        geom.0.iter().filter_map(|p| p.bounding_rect()).collect();
    let mut tiles = Vec::new();

    for i in 0..grid_size {
        for j in 0..grid_size {
            let min_x = envelope.min().x + i as f64 * tile_width;
            let min_y = envelope.min().y + j as f64 * tile_height;
            // The last row and column close exactly on the envelope edge
            // so no sliver is lost to rounding.
            let max_x = if i == grid_size - 1 {
                envelope.max().x
            } else {
                envelope.min().x + (i + 1) as f64 * tile_width
            };
            let max_y = if j == grid_size - 1 {
                envelope.max().y
            } else {
                envelope.min().y + (j + 1) as f64 * tile_height
            };

            let cell = Rect::new(
                geo::coord! { x: min_x, y: min_y },
                geo::coord! { x: max_x, y: max_y },
            );
            if !part_envelopes.iter().any(|part| rects_intersect(part, &cell)) {
                continue;
            }

            let tile = geom.intersection(&cell.to_polygon());
            if !tile.is_empty() && tile.is_valid() {
                tiles.push(tile);
            }
        }
    }

    tiles
}

fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x
        && a.max().x >= b.min().x
        && a.min().y <= b.max().y
        && a.max().y >= b.min().y
}
