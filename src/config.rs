//! Engine configuration.
//!
//! The batch-size tiers and tiling bands are empirically chosen constants
//! inherited from production use; they are exposed as plain fields so
//! callers can tune them, but the defaults are the recommended values.

use serde::{Deserialize, Serialize};

/// Batch tiers for the robust union fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Clusters above this size are spatially sorted and reduced through
    /// medium-sized batches instead of a single bulk union.
    #[serde(default = "MergeConfig::default_large_cluster")]
    pub large_cluster: usize,

    /// Batch size used for the fan-in reduction of large clusters.
    #[serde(default = "MergeConfig::default_medium_batch")]
    pub medium_batch: usize,

    /// At or below this size a failed bulk union falls back to pairwise
    /// accumulation; above it, to sub-batching.
    #[serde(default = "MergeConfig::default_pairwise_limit")]
    pub pairwise_limit: usize,

    /// Sub-batch size used when bulk union fails on a larger batch.
    #[serde(default = "MergeConfig::default_fallback_batch")]
    pub fallback_batch: usize,
}

impl MergeConfig {
    const fn default_large_cluster() -> usize {
        100
    }

    const fn default_medium_batch() -> usize {
        50
    }

    const fn default_pairwise_limit() -> usize {
        5
    }

    const fn default_fallback_batch() -> usize {
        20
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            large_cluster: Self::default_large_cluster(),
            medium_batch: Self::default_medium_batch(),
            pairwise_limit: Self::default_pairwise_limit(),
            fallback_batch: Self::default_fallback_batch(),
        }
    }
}

/// Thresholds controlling grid decomposition of oversized merged geometries.
///
/// Envelope area is checked first because it is free; the vertex count is
/// only consulted for geometries below the envelope bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilingConfig {
    /// Envelope area above which tiling is always used.
    pub envelope_area_threshold: f64,
    /// Envelope area band mapped to a 10x10 grid.
    pub envelope_area_medium: f64,
    /// Envelope area band mapped to a 15x15 grid.
    pub envelope_area_large: f64,
    /// Vertex count mapped to a 7x7 grid.
    pub vertex_count_medium: usize,
    /// Vertex count mapped to a 10x10 grid.
    pub vertex_count_large: usize,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            envelope_area_threshold: 1e9,
            envelope_area_medium: 5e9,
            envelope_area_large: 1e10,
            vertex_count_medium: 20_000,
            vertex_count_large: 50_000,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Merge mutually-overlapping overlay members before indexing.
    #[serde(default)]
    pub deduplicate: bool,

    /// Attribute field whose values key the per-group statistics.
    #[serde(default)]
    pub group_field: Option<String>,

    /// Robust union batch tiers.
    #[serde(default)]
    pub merge: MergeConfig,

    /// Tile splitting thresholds.
    #[serde(default)]
    pub tiling: TilingConfig,
}

impl EngineConfig {
    /// Enable deduplication of mutually-overlapping overlay members.
    pub fn with_deduplication(mut self) -> Self {
        self.deduplicate = true;
        self
    }

    /// Track per-group statistics keyed by the given attribute field.
    pub fn with_group_field(mut self, field: impl Into<String>) -> Self {
        self.group_field = Some(field.into());
        self
    }

    /// Override the merge batch tiers.
    pub fn with_merge(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }

    /// Override the tiling thresholds.
    pub fn with_tiling(mut self, tiling: TilingConfig) -> Self {
        self.tiling = tiling;
        self
    }
}
