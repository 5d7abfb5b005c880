//! Adaptive subdivision of large diagonal triangles.
//!
//! Triangles spanning a large voxel volume are cut down by midpoint
//! subdivision before per-voxel clipping, so the number of failed
//! cube-intersection tests stays bounded. Axis-parallel triangles are
//! exempt: their bounding volume is thin along one axis regardless of size.

use crate::math::{Real, Vec3};
use crate::triangle::TexturedTriangle;

/// Voxel-AABB volume at which a triangle gets subdivided.
const VOLUME_LIMIT: u64 = 512;

/// 1 / sqrt(3).
const SQRT_THIRD: Real = 0.577_350_26;

/// Normalized diagonality of a triangle: 0 when the normal is axis-aligned,
/// 1 when it points along a corner diagonal.
fn diagonality(t: &TexturedTriangle) -> Real {
    let normal = t.normal().abs().normalize();
    let diagonal = Vec3::new(SQRT_THIRD, SQRT_THIRD, SQRT_THIRD);
    (normal.dot(&diagonal) - SQRT_THIRD) / (1.0 - SQRT_THIRD)
}

/// Append `triangle` to `out`, subdividing until every piece's voxel AABB
/// volume is below the limit. Triangles within 60 degrees of axis-aligned
/// are passed through whole.
///
/// The triangle must have a non-zero normal.
pub fn subdivide_large_triangles(
    triangle: &TexturedTriangle,
    resolution: u32,
    out: &mut Vec<TexturedTriangle>,
) {
    debug_assert!(out.is_empty());
    out.push(*triangle);

    if diagonality(triangle) < 0.5 {
        return;
    }

    let mut i = 0;
    while i < out.len() {
        let t = out[i];
        let size = t.voxel_max(resolution) - t.voxel_min(resolution);
        let volume = size[0] as u64 * size[1] as u64 * size[2] as u64;

        if volume < VOLUME_LIMIT {
            i += 1;
            continue;
        }

        // The center piece replaces the current slot so it is re-examined;
        // the corner pieces are appended.
        let [center, c0, c1, c2] = t.subdivide4();
        out[i] = center;
        out.push(c0);
        out.push(c1);
        out.push(c2);
    }
}
