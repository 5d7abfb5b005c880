//! Per-triangle voxelization: subdivision, six-plane clipping and color
//! accumulation.

use std::ops::Range;
use std::sync::Arc;

use crate::clip::{split_triangle, SplitSink};
use crate::map::{ColorStrategy, VoxelMap, WeightedColor};
use crate::math::{self, Point3, Real, Transform, Vec3, VoxelPos};
use crate::subdivide::subdivide_large_triangles;
use crate::triangle::{TexturedTriangle, VisualTriangle};

/// Callback invoked for every sub-triangle entering per-voxel processing.
pub type TriangleObserver = Arc<dyn Fn(&TexturedTriangle) + Send + Sync>;

/// Voxel centers farther than this from the triangle plane are skipped.
/// Slightly above the worst-case half diagonal of sqrt(3).
const PLANE_DISTANCE_LIMIT: Real = 2.0;

/// Reusable per-worker state for voxelizing triangles into a sparse map.
///
/// The three clip buffers are long-lived: they are cleared at the start of
/// every triangle but keep their capacity across commands.
pub struct Voxelizer {
    transform: Transform,
    resolution: u32,
    strategy: ColorStrategy,
    observer: Option<TriangleObserver>,
    subdivided: Vec<TexturedTriangle>,
    pre_split: Vec<TexturedTriangle>,
    post_split: Vec<TexturedTriangle>,
}

impl Voxelizer {
    /// Create a voxelizer for the given mesh-to-grid transform.
    pub fn new(
        transform: Transform,
        resolution: u32,
        strategy: ColorStrategy,
        observer: Option<TriangleObserver>,
    ) -> Self {
        Self {
            transform,
            resolution,
            strategy,
            observer,
            subdivided: Vec::new(),
            pre_split: Vec::new(),
            post_split: Vec::new(),
        }
    }

    /// Voxelize one mesh-space triangle into `out`.
    ///
    /// Triangles that degenerate after transformation are dropped.
    pub fn voxelize(&mut self, triangle: &VisualTriangle, out: &mut VoxelMap) {
        self.subdivided.clear();
        self.pre_split.clear();
        self.post_split.clear();

        let grid = triangle.geometry.transformed(&self.transform);
        if grid.normal().norm_squared() == 0.0 {
            return;
        }

        subdivide_large_triangles(&grid, self.resolution, &mut self.subdivided);

        if let Some(observer) = &self.observer {
            for sub in &self.subdivided {
                observer(sub);
            }
        }

        for i in 0..self.subdivided.len() {
            let sub = self.subdivided[i];
            self.voxelize_sub_triangle(triangle, &sub, out);
        }
    }

    /// Scan the voxel AABB of one sub-triangle, clipping it against every
    /// candidate cube.
    fn voxelize_sub_triangle(
        &mut self,
        visual: &VisualTriangle,
        sub: &TexturedTriangle,
        out: &mut VoxelMap,
    ) {
        let normal = sub.normal();
        if normal.norm_squared() == 0.0 {
            return;
        }
        let plane_org = sub.vertex(0);
        let plane_normal = normal.normalize();

        let vmin = sub.voxel_min(self.resolution);
        let vmax = sub.voxel_max(self.resolution);

        for z in scan_range(vmin.z, vmax.z, self.resolution) {
            for y in scan_range(vmin.y, vmax.y, self.resolution) {
                for x in scan_range(vmin.x, vmax.x, self.resolution) {
                    let pos = VoxelPos::new(x, y, z);
                    let center =
                        Point3::new(x as Real + 0.5, y as Real + 0.5, z as Real + 0.5);
                    let distance =
                        math::distance_point_plane(&center, &plane_org, &plane_normal);
                    if distance.abs() > PLANE_DISTANCE_LIMIT {
                        continue;
                    }

                    self.pre_split.push(*sub);
                    let color = voxelize_voxel(
                        visual,
                        pos,
                        &mut self.pre_split,
                        &mut self.post_split,
                    );
                    if color.weight > 0.0 {
                        out.insert(pos, color, self.strategy);
                    }
                }
            }
        }
    }
}

/// The voxel indices scanned along one axis for a triangle whose AABB spans
/// `[min, max]`. Starts inside the grid and always covers at least one
/// voxel, so geometry lying in the grid's far boundary plane lands in the
/// last layer and flat axis-aligned triangles still get scanned.
fn scan_range(min: u32, max: u32, resolution: u32) -> Range<u32> {
    let lo = min.min(resolution - 1);
    let hi = max.max(lo + 1).min(resolution);
    lo..hi
}

/// Clip the triangle in `pre` against the six faces of the unit cube at
/// `pos` and accumulate the surviving fragments into one weighted color.
///
/// Both buffers are left empty. The within-triangle accumulation is always
/// an area-weighted blend; the configured strategy applies only when the
/// result is inserted into a map.
fn voxelize_voxel(
    visual: &VisualTriangle,
    pos: VoxelPos,
    pre: &mut Vec<TexturedTriangle>,
    post: &mut Vec<TexturedTriangle>,
) -> WeightedColor {
    for (offset, keep_lo) in [(1u32, true), (0u32, false)] {
        for axis in 0..3 {
            let plane = pos[axis] + offset;
            for t in pre.iter() {
                let mut sink = if keep_lo {
                    SplitSink::LoOnly(&mut *post)
                } else {
                    SplitSink::HiOnly(&mut *post)
                };
                split_triangle(t, axis, plane, &mut sink);
            }
            pre.clear();
            if post.is_empty() {
                return WeightedColor::zero();
            }
            std::mem::swap(pre, post);
        }
    }

    // The fragments sit in `pre` after the final swap.
    let mut area_sum = 0.0;
    let mut color_sum = Vec3::zeros();
    for fragment in pre.iter() {
        let area = fragment.area();
        area_sum += area;
        color_sum += visual.color_at(&fragment.uv_center()) * area;
    }
    pre.clear();

    if area_sum == 0.0 {
        return WeightedColor::zero();
    }
    WeightedColor::new(area_sum, color_sum / area_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::texture::Texture;
    use crate::triangle::TriangleKind;

    fn visual(vertices: [[Real; 3]; 3], kind: TriangleKind) -> VisualTriangle {
        VisualTriangle::new(
            TexturedTriangle::new(
                vertices.map(|v| Point3::new(v[0], v[1], v[2])),
                [
                    Vec2::new(0.0, 0.0),
                    Vec2::new(1.0, 0.0),
                    Vec2::new(0.0, 1.0),
                ],
            ),
            kind,
        )
    }

    fn voxelize_one(triangle: &VisualTriangle, resolution: u32, strategy: ColorStrategy) -> VoxelMap {
        let mut voxelizer = Voxelizer::new(Transform::identity(), resolution, strategy, None);
        let mut map = VoxelMap::new();
        voxelizer.voxelize(triangle, &mut map);
        map
    }

    #[test]
    fn test_unit_triangle_occupies_origin_voxel() {
        let t = visual(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            TriangleKind::Matte,
        );
        let map = voxelize_one(&t, 2, ColorStrategy::Blend);
        assert_eq!(map.len(), 1);
        let color = map.get(&VoxelPos::new(0, 0, 0)).unwrap();
        assert!((color.weight - 0.5).abs() < 1e-4);
        assert!((color.value - Vec3::new(0.5, 0.5, 0.5)).norm() < 1e-5);
    }

    #[test]
    fn test_large_triangle_covers_lower_wedge() {
        let t = visual(
            [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 0.0]],
            TriangleKind::Matte,
        );
        let map = voxelize_one(&t, 4, ColorStrategy::Blend);
        // Voxels on or below the line x + y <= 4 in the z = 0 layer.
        assert_eq!(map.len(), 10);
        for (pos, _) in map.iter() {
            assert_eq!(pos.z, 0);
            assert!(pos.x + pos.y <= 3);
        }
        let total: Real = map.iter().map(|(_, c)| c.weight).sum();
        assert!((total - 8.0).abs() < 8.0 * 1e-4);
    }

    #[test]
    fn test_fragment_areas_conserved_for_diagonal_triangle() {
        let t = visual(
            [[0.2, 0.1, 0.3], [5.7, 0.4, 1.2], [1.1, 5.9, 5.3]],
            TriangleKind::Matte,
        );
        let map = voxelize_one(&t, 8, ColorStrategy::Blend);
        let area = t.geometry.area();
        let total: Real = map.iter().map(|(_, c)| c.weight).sum();
        assert!((total - area).abs() < area * 1e-4);
    }

    #[test]
    fn test_output_stays_in_grid() {
        let t = visual(
            [[0.0, 0.0, 0.0], [8.0, 0.0, 0.0], [0.0, 8.0, 8.0]],
            TriangleKind::Matte,
        );
        let map = voxelize_one(&t, 8, ColorStrategy::Blend);
        assert!(!map.is_empty());
        for (pos, _) in map.iter() {
            assert!(pos.x < 8 && pos.y < 8 && pos.z < 8);
        }
    }

    #[test]
    fn test_degenerate_triangle_is_dropped() {
        let t = visual(
            [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]],
            TriangleKind::Matte,
        );
        let map = voxelize_one(&t, 4, ColorStrategy::Blend);
        assert!(map.is_empty());
    }

    #[test]
    fn test_textured_triangle_samples_checker() {
        // 2x2 checker: black at (0,0) and (1,1), white elsewhere.
        let texture = Arc::new(Texture::new(
            2,
            2,
            vec![
                0, 0, 0, 255, 255, 255, 255, 255, //
                255, 255, 255, 255, 0, 0, 0, 255,
            ],
        ));
        let t = VisualTriangle::new(
            TexturedTriangle::new(
                [
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(4.0, 0.0, 0.0),
                    Point3::new(0.0, 4.0, 0.0),
                ],
                [
                    Vec2::new(0.0, 0.0),
                    Vec2::new(1.0, 0.0),
                    Vec2::new(0.0, 1.0),
                ],
            ),
            TriangleKind::Textured(texture.clone()),
        );
        let map = voxelize_one(&t, 4, ColorStrategy::Blend);
        assert!(!map.is_empty());
        // Every voxel's color matches a nearest-neighbor lookup at the UV
        // centroid of its fragments, which all lie within the voxel, so the
        // color must equal one of the two texels.
        for (pos, color) in map.iter() {
            let expected = t.color_at(&Vec2::new(
                (pos.x as Real + 0.5) / 4.0,
                (pos.y as Real + 0.5) / 4.0,
            ));
            assert!(
                (color.value - expected).norm() < 1e-5,
                "voxel {pos:?} got {:?}, expected {expected:?}",
                color.value
            );
        }
    }

    #[test]
    fn test_transform_is_applied() {
        // Mesh-space triangle in [0, 1]^2, scaled into a grid of 4.
        let transform = Transform::fit_bounds(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 1.0),
            4,
            [0, 1, 2],
        );
        let t = visual(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            TriangleKind::Matte,
        );
        let mut voxelizer = Voxelizer::new(transform, 4, ColorStrategy::Blend, None);
        let mut map = VoxelMap::new();
        voxelizer.voxelize(&t, &mut map);
        // The scaled triangle spans the z = 0 layer below x + y <= 4.
        assert_eq!(map.len(), 10);
        let total: Real = map.iter().map(|(_, c)| c.weight).sum();
        assert!((total - 8.0).abs() < 8.0 * 1e-3);
    }

    #[test]
    fn test_observer_sees_subdivided_triangles() {
        use std::sync::Mutex;
        let seen: Arc<Mutex<Vec<TexturedTriangle>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: TriangleObserver = Arc::new(move |t: &TexturedTriangle| {
            sink.lock().unwrap().push(*t);
        });

        let t = visual(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            TriangleKind::Matte,
        );
        let mut voxelizer =
            Voxelizer::new(Transform::identity(), 2, ColorStrategy::Blend, Some(observer));
        let mut map = VoxelMap::new();
        voxelizer.voxelize(&t, &mut map);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
