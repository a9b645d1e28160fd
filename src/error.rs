//! Error types for the overlap engine.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OverlapError>;

/// Errors produced by the overlap engine.
///
/// Per-geometry problems (unrepairable members, failed candidate
/// intersections) are recovered locally and logged; they never surface
/// here. Only conditions that make the whole run meaningless are fatal.
#[derive(Debug, Error)]
pub enum OverlapError {
    /// The overlay collection yielded zero usable polygonal geometries
    /// after validity guarding. No statistics can be produced.
    #[error("overlay collection contains no usable polygonal geometries")]
    EmptyInput,

    /// The configured group field is absent from every overlay record.
    #[error("group field '{0}' does not exist in overlay attributes")]
    GroupFieldMissing(String),

    /// A caller-supplied argument was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every merge strategy was exhausted for one overlap group. The
    /// engine recovers by inserting the group's members unmerged; this
    /// variant only crosses module boundaries, not the public API.
    #[error("failed to merge overlap group: {0}")]
    MergeFailure(String),
}
