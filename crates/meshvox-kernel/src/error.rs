//! Error types for the voxelization kernel.

use thiserror::Error;

/// Errors that can occur while voxelizing a triangle stream.
#[derive(Error, Debug)]
pub enum VoxelError {
    /// Settings were rejected before the pipeline started.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The mesh bounds collapse to a single point, so no mesh-to-grid
    /// transform exists.
    #[error("mesh has degenerate bounds: {0}")]
    DegenerateMesh(String),

    /// The sink refused a voxel mid-stream.
    #[error("voxel sink write failed: {0}")]
    SinkWrite(#[from] std::io::Error),

    /// A pipeline contract was violated. This is a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, VoxelError>;
