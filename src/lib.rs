//! Polygon overlap resolution and streaming intersection aggregation.
//!
//! ```rust
//! use geo::polygon;
//! use geoverlap::{EngineConfig, OverlapEngine, PolygonRecord};
//!
//! let overlay = vec![PolygonRecord::from_polygon(
//!     polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)],
//!     Vec::new(),
//!     "zone-1",
//! )];
//! let engine = OverlapEngine::build(overlay, &EngineConfig::default())?;
//!
//! let feature = PolygonRecord::from_polygon(
//!     polygon![(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)],
//!     Vec::new(),
//!     "parcel-7",
//! );
//! let result = engine.accumulate(&feature).unwrap();
//! assert_eq!(result.intersecting_count, 1);
//! # Ok::<(), geoverlap::OverlapError>(())
//! ```

pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod types;

pub use config::{EngineConfig, MergeConfig, TilingConfig};
pub use engine::OverlapEngine;
pub use error::{OverlapError, Result};

pub use geo::{MultiPolygon, Polygon, Rect};

pub use compute::cluster::{DisjointSet, find_overlap_groups, partition};
pub use compute::tiling::{grid_size_for, split_into_tiles};
pub use compute::union::robust_union;
pub use compute::validity::{DEFAULT_DETAIL_CAP, GuardOutcome, ValidityReport, ensure_valid, inspect};

pub use index::EnvelopeIndex;

pub use types::{GroupStats, IntersectionResult, LoadStats, PolygonRecord};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{OverlapEngine, OverlapError, PolygonRecord, Result};

    pub use geo::{MultiPolygon, Polygon, Rect};

    pub use crate::{EngineConfig, MergeConfig, TilingConfig};

    pub use crate::{GroupStats, IntersectionResult, LoadStats};
}
