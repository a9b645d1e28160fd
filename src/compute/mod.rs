//! Geometry computation kernels: validity guarding, overlap clustering,
//! robust union, and grid tiling.

pub mod cluster;
pub mod tiling;
pub mod union;
pub mod validity;
