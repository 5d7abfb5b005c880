//! Triangle types flowing through the voxelization pipeline.

use std::sync::Arc;

use crate::math::{Point3, Real, Transform, Vec2, Vec3, VoxelPos};
use crate::texture::Texture;

/// A plain geometric triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// The three vertices.
    pub vertices: [Point3; 3],
}

impl Triangle {
    /// Create a triangle from its vertices.
    pub fn new(vertices: [Point3; 3]) -> Self {
        Self { vertices }
    }

    /// The un-normalized normal (cross product of two edges).
    pub fn normal(&self) -> Vec3 {
        let e01 = self.vertices[1] - self.vertices[0];
        let e02 = self.vertices[2] - self.vertices[0];
        e01.cross(&e02)
    }

    /// The surface area.
    pub fn area(&self) -> Real {
        self.normal().norm() / 2.0
    }

    /// Lower corner of the integer voxel AABB, clamped to `[0, resolution]`.
    pub fn voxel_min(&self, resolution: u32) -> VoxelPos {
        self.voxel_corner(resolution, Real::min, Real::floor)
    }

    /// Upper corner of the integer voxel AABB, clamped to `[0, resolution]`.
    pub fn voxel_max(&self, resolution: u32) -> VoxelPos {
        self.voxel_corner(resolution, Real::max, Real::ceil)
    }

    fn voxel_corner(
        &self,
        resolution: u32,
        pick: fn(Real, Real) -> Real,
        round: fn(Real) -> Real,
    ) -> VoxelPos {
        let mut corner = VoxelPos::origin();
        for axis in 0..3 {
            let extreme = pick(
                pick(self.vertices[0][axis], self.vertices[1][axis]),
                self.vertices[2][axis],
            );
            corner[axis] = round(extreme).clamp(0.0, resolution as Real) as u32;
        }
        corner
    }
}

/// A triangle with texture coordinates paired 1:1 with its vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexturedTriangle {
    /// Vertex positions.
    pub triangle: Triangle,
    /// Per-vertex texture coordinates.
    pub uvs: [Vec2; 3],
}

impl TexturedTriangle {
    /// Create a textured triangle from vertices and texture coordinates.
    pub fn new(vertices: [Point3; 3], uvs: [Vec2; 3]) -> Self {
        Self {
            triangle: Triangle::new(vertices),
            uvs,
        }
    }

    /// Vertex `i`.
    pub fn vertex(&self, i: usize) -> Point3 {
        self.triangle.vertices[i]
    }

    /// Texture coordinate of vertex `i`.
    pub fn uv(&self, i: usize) -> Vec2 {
        self.uvs[i]
    }

    /// The un-normalized normal.
    pub fn normal(&self) -> Vec3 {
        self.triangle.normal()
    }

    /// The surface area.
    pub fn area(&self) -> Real {
        self.triangle.area()
    }

    /// Lower corner of the integer voxel AABB, clamped to `[0, resolution]`.
    pub fn voxel_min(&self, resolution: u32) -> VoxelPos {
        self.triangle.voxel_min(resolution)
    }

    /// Upper corner of the integer voxel AABB, clamped to `[0, resolution]`.
    pub fn voxel_max(&self, resolution: u32) -> VoxelPos {
        self.triangle.voxel_max(resolution)
    }

    /// Centroid of the texture coordinates.
    pub fn uv_center(&self) -> Vec2 {
        (self.uvs[0] + self.uvs[1] + self.uvs[2]) / 3.0
    }

    /// The triangle with `transform` applied to its vertices.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            triangle: Triangle::new([
                transform.apply(&self.triangle.vertices[0]),
                transform.apply(&self.triangle.vertices[1]),
                transform.apply(&self.triangle.vertices[2]),
            ]),
            uvs: self.uvs,
        }
    }

    /// Classical midpoint subdivision into four triangles: the inverted
    /// center triangle first, then the three corner triangles. Texture
    /// coordinates are midpoint-averaged alongside the vertices.
    pub fn subdivide4(&self) -> [TexturedTriangle; 4] {
        let [v0, v1, v2] = self.triangle.vertices;
        let [t0, t1, t2] = self.uvs;
        let m01 = nalgebra::center(&v0, &v1);
        let m12 = nalgebra::center(&v1, &v2);
        let m20 = nalgebra::center(&v2, &v0);
        let u01 = (t0 + t1) / 2.0;
        let u12 = (t1 + t2) / 2.0;
        let u20 = (t2 + t0) / 2.0;
        [
            TexturedTriangle::new([m01, m12, m20], [u01, u12, u20]),
            TexturedTriangle::new([v0, m01, m20], [t0, u01, u20]),
            TexturedTriangle::new([m01, v1, m12], [u01, t1, u12]),
            TexturedTriangle::new([m20, m12, v2], [u20, u12, t2]),
        ]
    }
}

/// How a triangle obtains its color.
#[derive(Debug, Clone)]
pub enum TriangleKind {
    /// No material: solid mid-gray.
    Matte,
    /// A single constant linear RGB color.
    Colored(Vec3),
    /// A diffuse texture sampled at the triangle's texture coordinates.
    Textured(Arc<Texture>),
}

/// A textured triangle tagged with its color source.
#[derive(Debug, Clone)]
pub struct VisualTriangle {
    /// The geometry, including texture coordinates.
    pub geometry: TexturedTriangle,
    /// The color source.
    pub kind: TriangleKind,
}

impl VisualTriangle {
    /// Create a visual triangle.
    pub fn new(geometry: TexturedTriangle, kind: TriangleKind) -> Self {
        Self { geometry, kind }
    }

    /// Linear RGB color at a texture coordinate, dispatching on the kind.
    pub fn color_at(&self, uv: &Vec2) -> Vec3 {
        match &self.kind {
            TriangleKind::Matte => Vec3::new(0.5, 0.5, 0.5),
            TriangleKind::Colored(color) => *color,
            TriangleKind::Textured(texture) => texture.sample(uv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right_triangle() -> TexturedTriangle {
        TexturedTriangle::new(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
            ],
        )
    }

    #[test]
    fn test_area_and_normal() {
        let t = right_triangle();
        assert!((t.area() - 0.5).abs() < 1e-6);
        assert_eq!(t.normal(), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_voxel_bounds_clamp() {
        let t = Triangle::new([
            Point3::new(-1.5, 0.2, 0.0),
            Point3::new(9.5, 0.2, 0.0),
            Point3::new(0.0, 3.7, 2.0),
        ]);
        assert_eq!(t.voxel_min(8), VoxelPos::new(0, 0, 0));
        assert_eq!(t.voxel_max(8), VoxelPos::new(8, 4, 2));
    }

    #[test]
    fn test_subdivide4_conserves_area() {
        let t = TexturedTriangle::new(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(4.0, 1.0, 0.0),
                Point3::new(1.0, 3.0, 2.0),
            ],
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
            ],
        );
        let children = t.subdivide4();
        let sum: Real = children.iter().map(|c| c.area()).sum();
        assert!((sum - t.area()).abs() < 1e-5);
        // Each child covers a quarter of the parent.
        for child in &children {
            assert!((child.area() - t.area() / 4.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_subdivide4_uvs_follow_vertices() {
        let t = right_triangle();
        let children = t.subdivide4();
        // The center triangle's texture coordinates are the edge midpoints.
        assert_eq!(children[0].uv(0), Vec2::new(0.5, 0.0));
        assert_eq!(children[0].uv(1), Vec2::new(0.5, 0.5));
        assert_eq!(children[0].uv(2), Vec2::new(0.0, 0.5));
        // Corner children keep the original corner.
        assert_eq!(children[1].uv(0), t.uv(0));
        assert_eq!(children[2].uv(1), t.uv(1));
        assert_eq!(children[3].uv(2), t.uv(2));
    }

    #[test]
    fn test_color_at_dispatch() {
        let matte = VisualTriangle::new(right_triangle(), TriangleKind::Matte);
        assert_eq!(matte.color_at(&Vec2::new(0.3, 0.3)), Vec3::new(0.5, 0.5, 0.5));

        let red = VisualTriangle::new(
            right_triangle(),
            TriangleKind::Colored(Vec3::new(1.0, 0.0, 0.0)),
        );
        assert_eq!(red.color_at(&Vec2::new(0.9, 0.1)), Vec3::new(1.0, 0.0, 0.0));
    }
}
