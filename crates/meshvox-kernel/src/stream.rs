//! Contracts between the kernel and its external collaborators.

use std::io;

use crate::triangle::VisualTriangle;

/// A single output voxel: grid position plus packed 8-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voxel32 {
    /// Grid position.
    pub pos: nalgebra::Point3<i32>,
    /// Color packed as `0xAARRGGBB`.
    pub argb: u32,
}

/// A single-consumer stream of colored triangles backed by shared vertex
/// data.
///
/// The kernel reads `vertex_count` and `vertices` once before spawning
/// workers, then drains `next_triangle` from the orchestrator thread only.
pub trait TriangleStream {
    /// Total number of vertices backing the stream.
    fn vertex_count(&self) -> u64;

    /// Contiguous `x y z` coordinates, three per vertex.
    fn vertices(&self) -> &[f32];

    /// The next triangle, or `None` once the stream is exhausted.
    fn next_triangle(&mut self) -> Option<VisualTriangle>;
}

/// A consumer of voxels in unspecified order.
pub trait VoxelSink {
    /// False once the sink can no longer accept voxels.
    fn can_write(&self) -> bool {
        true
    }

    /// Write one voxel.
    fn write(&mut self, voxel: Voxel32) -> io::Result<()>;

    /// Flush any buffered voxels.
    fn flush(&mut self) -> io::Result<()>;
}
