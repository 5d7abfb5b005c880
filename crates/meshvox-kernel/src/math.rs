//! Math types for the voxelization kernel.
//!
//! Thin wrappers around nalgebra providing the scalar type, interpolation
//! and plane helpers, and the affine mesh-to-grid transform.

use nalgebra::{Matrix3, Vector2, Vector3};

/// Scalar type used for all geometric work.
pub type Real = f32;

/// A point in mesh or grid space.
pub type Point3 = nalgebra::Point3<Real>;

/// A vector in 3D space.
pub type Vec3 = Vector3<Real>;

/// A texture coordinate.
pub type Vec2 = Vector2<Real>;

/// An integer voxel coordinate.
pub type VoxelPos = nalgebra::Point3<u32>;

/// Tolerance below which a vertex counts as lying on a splitting plane.
pub const EPSILON: Real = 1.0 / 65_536.0;

/// True when `x` is within the planar tolerance of zero.
pub fn near_zero(x: Real) -> bool {
    x.abs() < EPSILON
}

/// Componentwise linear interpolation `a + (b - a) * t`.
pub fn mix_point(a: &Point3, b: &Point3, t: Real) -> Point3 {
    a + (b - a) * t
}

/// Componentwise linear interpolation of texture coordinates.
pub fn mix_uv(a: &Vec2, b: &Vec2, t: Real) -> Vec2 {
    a + (b - a) * t
}

/// Parameter `t` at which the ray `org + t * dir` crosses the plane
/// `position[axis] == plane`. Returns 0 for rays parallel to the plane.
pub fn intersect_ray_axis_plane(org: &Point3, dir: &Vec3, axis: usize, plane: u32) -> Real {
    let d = -dir[axis];
    if near_zero(d) {
        0.0
    } else {
        (org[axis] - plane as Real) / d
    }
}

/// Signed distance from `p` to the plane through `org` with unit normal
/// `normal`.
pub fn distance_point_plane(p: &Point3, org: &Point3, normal: &Vec3) -> Real {
    normal.dot(&(p - org))
}

/// An affine mesh-to-grid transform: a linear part composed with a
/// translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Linear part (axis permutation composed with uniform scale).
    pub linear: Matrix3<Real>,
    /// Translation applied after the linear part.
    pub translation: Vec3,
}

impl Transform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            linear: Matrix3::identity(),
            translation: Vec3::zeros(),
        }
    }

    /// The unique transform that permutes axes by `permutation`, moves the
    /// box `[min, max]` to the origin, uniformly scales its longest axis to
    /// `[0, resolution]` and centers the shorter axes within the cube.
    ///
    /// The box must have a positive extent on at least one axis.
    pub fn fit_bounds(
        min: &Point3,
        max: &Point3,
        resolution: u32,
        permutation: [usize; 3],
    ) -> Self {
        let size = max - min;
        let longest = size[0].max(size[1]).max(size[2]);
        let scale = resolution as Real / longest;

        let mut linear = Matrix3::zeros();
        let mut translation = Vec3::zeros();
        for (out_axis, &src_axis) in permutation.iter().enumerate() {
            linear[(out_axis, src_axis)] = scale;
            let extent = size[src_axis] * scale;
            translation[out_axis] = -min[src_axis] * scale + (resolution as Real - extent) / 2.0;
        }

        Self {
            linear,
            translation,
        }
    }

    /// Apply the transform to a point.
    pub fn apply(&self, p: &Point3) -> Point3 {
        self.linear * p + self.translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_endpoints() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(5.0, 6.0, 7.0);
        assert_eq!(mix_point(&a, &b, 0.0), a);
        assert_eq!(mix_point(&a, &b, 1.0), b);
        assert_eq!(mix_point(&a, &b, 0.5), Point3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_intersect_ray_axis_plane() {
        let org = Point3::new(0.0, 0.0, 0.0);
        let dir = Vec3::new(2.0, 0.0, 0.0);
        let t = intersect_ray_axis_plane(&org, &dir, 0, 1);
        assert!((t - 0.5).abs() < 1e-6);

        // Rays parallel to the plane return 0 instead of diverging.
        let parallel = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(intersect_ray_axis_plane(&org, &parallel, 0, 1), 0.0);
    }

    #[test]
    fn test_distance_point_plane() {
        let org = Point3::new(0.0, 0.0, 2.0);
        let normal = Vec3::new(0.0, 0.0, 1.0);
        let d = distance_point_plane(&Point3::new(7.0, -3.0, 5.0), &org, &normal);
        assert!((d - 3.0).abs() < 1e-6);
        let d = distance_point_plane(&Point3::new(0.0, 0.0, 0.0), &org, &normal);
        assert!((d + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_bounds_unit_cube() {
        let t = Transform::fit_bounds(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 1.0),
            8,
            [0, 1, 2],
        );
        assert_eq!(t.apply(&Point3::new(0.0, 0.0, 0.0)), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(t.apply(&Point3::new(1.0, 1.0, 1.0)), Point3::new(8.0, 8.0, 8.0));
    }

    #[test]
    fn test_fit_bounds_centers_short_axes() {
        // x spans 4, y spans 2, z spans 1: y and z are centered.
        let t = Transform::fit_bounds(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(4.0, 2.0, 1.0),
            8,
            [0, 1, 2],
        );
        let lo = t.apply(&Point3::new(0.0, 0.0, 0.0));
        let hi = t.apply(&Point3::new(4.0, 2.0, 1.0));
        assert_eq!(lo, Point3::new(0.0, 2.0, 3.0));
        assert_eq!(hi, Point3::new(8.0, 6.0, 5.0));
    }

    #[test]
    fn test_fit_bounds_permutation() {
        // Output x takes input z, output z takes input x.
        let t = Transform::fit_bounds(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 1.0),
            4,
            [2, 1, 0],
        );
        let p = t.apply(&Point3::new(1.0, 0.0, 0.5));
        assert_eq!(p, Point3::new(2.0, 0.0, 4.0));
    }

    #[test]
    fn test_fit_bounds_offset_mesh() {
        let t = Transform::fit_bounds(
            &Point3::new(-2.0, -2.0, -2.0),
            &Point3::new(2.0, 2.0, 2.0),
            16,
            [0, 1, 2],
        );
        assert_eq!(t.apply(&Point3::new(-2.0, -2.0, -2.0)), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(t.apply(&Point3::new(0.0, 0.0, 0.0)), Point3::new(8.0, 8.0, 8.0));
    }
}
