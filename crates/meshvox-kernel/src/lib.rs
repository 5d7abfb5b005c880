#![warn(missing_docs)]

//! Surface voxelization kernel for colored triangle meshes.
//!
//! Converts a stream of colored or textured triangles into a sparse cubic
//! grid of weighted voxel colors by:
//! 1. Fitting the mesh bounds into the grid with an affine transform
//! 2. Subdividing large diagonal triangles to bound clipping cost
//! 3. Clipping each triangle against the six faces of every candidate voxel
//! 4. Accumulating fragment areas into per-voxel weighted colors
//!
//! Work is spread over a fixed pool of worker threads feeding from a
//! bounded command queue; worker-local maps are merged pairwise when the
//! stream is drained.
//!
//! # Example
//!
//! ```ignore
//! use meshvox_kernel::{voxelize_stream, VoxelSettings};
//!
//! let settings = VoxelSettings { resolution: 128, ..VoxelSettings::default() };
//! let stats = voxelize_stream(&mut stream, &mut sink, &settings, None)?;
//! println!("{} voxels", stats.voxels);
//! ```

pub mod clip;
pub mod convert;
pub mod error;
pub mod map;
pub mod math;
pub mod pipeline;
pub mod stream;
pub mod subdivide;
pub mod texture;
pub mod triangle;
pub mod voxelizer;

pub use convert::{voxelize_stream, VoxelStats};
pub use error::{Result, VoxelError};
pub use map::{downscale, ColorStrategy, VoxelMap, WeightedColor};
pub use stream::{TriangleStream, Voxel32, VoxelSink};
pub use texture::Texture;
pub use triangle::{TexturedTriangle, Triangle, TriangleKind, VisualTriangle};
pub use voxelizer::{TriangleObserver, Voxelizer};

use serde::{Deserialize, Serialize};

/// Voxelization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoxelSettings {
    /// Edge length of the cubic voxel grid.
    pub resolution: u32,
    /// How colors of overlapping triangles combine.
    pub strategy: ColorStrategy,
    /// Axis permutation applied by the mesh-to-grid transform.
    pub permutation: [usize; 3],
    /// Halve the output resolution with a 2x box filter.
    pub downscale: bool,
    /// Worker thread count. Defaults to the available parallelism.
    pub threads: Option<usize>,
}

impl Default for VoxelSettings {
    fn default() -> Self {
        Self {
            resolution: 128,
            strategy: ColorStrategy::Max,
            permutation: [0, 1, 2],
            downscale: false,
            threads: None,
        }
    }
}

impl VoxelSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(VoxelError::InvalidSettings(
                "resolution must be positive".into(),
            ));
        }
        if self.downscale && self.resolution < 2 {
            return Err(VoxelError::InvalidSettings(
                "resolution must be at least 2 to downscale".into(),
            ));
        }
        let mut axes = self.permutation;
        axes.sort_unstable();
        if axes != [0, 1, 2] {
            return Err(VoxelError::InvalidSettings(format!(
                "{:?} is not a permutation of the three axes",
                self.permutation
            )));
        }
        if self.threads == Some(0) {
            return Err(VoxelError::InvalidSettings(
                "thread count must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The resolution of the delivered grid, after any downscale.
    pub fn output_resolution(&self) -> u32 {
        if self.downscale {
            self.resolution / 2
        } else {
            self.resolution
        }
    }
}
