//! Orchestration: drive a triangle stream through the worker pool and into
//! a voxel sink.

use std::io;
use std::thread;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelError};
use crate::map::downscale;
use crate::math::{Point3, Transform};
use crate::pipeline::VoxelizerPool;
use crate::stream::{TriangleStream, Voxel32, VoxelSink};
use crate::voxelizer::TriangleObserver;
use crate::VoxelSettings;

/// Summary of a completed voxelization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelStats {
    /// Triangles pulled from the input stream.
    pub triangles: u64,
    /// Voxels delivered to the sink.
    pub voxels: u64,
    /// Resolution of the delivered grid, after any downscale.
    pub resolution: u32,
}

/// The mesh AABB of a flat `x y z` vertex slice.
fn find_bounds(vertices: &[f32]) -> (Point3, Point3) {
    let mut min = Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    for vertex in vertices.chunks_exact(3) {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex[axis]);
            max[axis] = max[axis].max(vertex[axis]);
        }
    }
    (min, max)
}

/// Voxelize `stream` into `sink` under `settings`.
///
/// An empty stream flushes the sink and succeeds. The optional `observer`
/// is invoked for every sub-triangle entering per-voxel processing.
pub fn voxelize_stream<S: TriangleStream, K: VoxelSink + ?Sized>(
    stream: &mut S,
    sink: &mut K,
    settings: &VoxelSettings,
    observer: Option<TriangleObserver>,
) -> Result<VoxelStats> {
    settings.validate()?;

    if stream.vertex_count() == 0 {
        warn!("mesh has no vertices, writing an empty voxel model");
        sink.flush()?;
        return Ok(VoxelStats {
            triangles: 0,
            voxels: 0,
            resolution: settings.output_resolution(),
        });
    }
    info!("loaded model with {} vertices", stream.vertex_count());

    let (mesh_min, mesh_max) = find_bounds(stream.vertices());
    let size = mesh_max - mesh_min;
    if size.max() <= 0.0 {
        return Err(VoxelError::DegenerateMesh(format!(
            "all vertices coincide at {:?}",
            mesh_min
        )));
    }
    let transform =
        Transform::fit_bounds(&mesh_min, &mesh_max, settings.resolution, settings.permutation);

    let threads = settings.threads.unwrap_or_else(|| {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    });
    let pool = VoxelizerPool::spawn(
        threads,
        transform,
        settings.resolution,
        settings.strategy,
        observer,
    );

    let mut triangles = 0u64;
    while let Some(triangle) = stream.next_triangle() {
        triangles += 1;
        pool.submit(triangle);
    }
    debug!("submitted all triangles, waiting for the queue to drain");
    pool.wait_idle();
    info!("voxelized {triangles} triangles, merging {threads} worker maps");

    let mut result = pool.merge_maps();
    pool.shutdown();

    let mut resolution = settings.resolution;
    if settings.downscale {
        resolution /= 2;
        info!("downscaling to resolution {resolution}");
        result = downscale(&result, settings.strategy);
    }

    info!("writing {} voxels", result.len());
    let mut voxels = 0u64;
    for (pos, color) in result.iter() {
        if !sink.can_write() {
            return Err(VoxelError::SinkWrite(io::Error::other(
                "sink refused further voxels",
            )));
        }
        let [r, g, b, a] = color.to_rgba();
        sink.write(Voxel32 {
            pos: pos.map(|c| c as i32),
            argb: u32::from_be_bytes([a, r, g, b]),
        })?;
        voxels += 1;
    }
    sink.flush()?;

    Ok(VoxelStats {
        triangles,
        voxels,
        resolution,
    })
}
