//! Triangle clipping against axis-aligned planes.
//!
//! Splits one textured triangle into at most three sub-triangles on either
//! side of a plane `position[axis] == plane`. Texture coordinates are
//! interpolated with the same parameter as the vertices, so a vertex-UV
//! pair stays a linear function of the unclipped edge parameter through
//! every split.

use crate::math::{self, near_zero, Real};
use crate::triangle::TexturedTriangle;

/// Where the pieces of a split triangle are collected.
pub enum SplitSink<'a> {
    /// Sort pieces into separate buffers for the two sides.
    Both {
        /// Pieces below or on the plane.
        lo: &'a mut Vec<TexturedTriangle>,
        /// Pieces above the plane.
        hi: &'a mut Vec<TexturedTriangle>,
    },
    /// Keep only pieces below or on the plane.
    LoOnly(&'a mut Vec<TexturedTriangle>),
    /// Keep only pieces above the plane.
    HiOnly(&'a mut Vec<TexturedTriangle>),
}

impl SplitSink<'_> {
    fn push(&mut self, t: TexturedTriangle, lo: bool) {
        match self {
            SplitSink::Both { lo: out_lo, hi: out_hi } => {
                if lo {
                    out_lo.push(t);
                } else {
                    out_hi.push(t);
                }
            }
            SplitSink::LoOnly(out) => {
                if lo {
                    out.push(t);
                }
            }
            SplitSink::HiOnly(out) => {
                if !lo {
                    out.push(t);
                }
            }
        }
    }

    /// A triangle lying in the plane sorts below, but it is inside both
    /// closed half-spaces, so a discarding clip keeps it.
    fn push_planar(&mut self, t: TexturedTriangle) {
        match self {
            SplitSink::Both { lo, .. } => lo.push(t),
            SplitSink::LoOnly(out) | SplitSink::HiOnly(out) => out.push(t),
        }
    }
}

/// Split `t` by the plane `position[axis] == plane`, pushing the resulting
/// pieces into `sink`. A vertex within [`math::EPSILON`] of the plane
/// counts as planar; the lo side is closed (`v[axis] <= plane`).
pub fn split_triangle(t: &TexturedTriangle, axis: usize, plane: u32, sink: &mut SplitSink<'_>) {
    let plane_r = plane as Real;

    let planar = [
        near_zero(t.vertex(0)[axis] - plane_r),
        near_zero(t.vertex(1)[axis] - plane_r),
        near_zero(t.vertex(2)[axis] - plane_r),
    ];
    let planar_sum = planar.iter().filter(|&&p| p).count();

    // The triangle lies in the splitting plane.
    if planar_sum == 3 {
        sink.push_planar(*t);
        return;
    }

    let lo = [
        t.vertex(0)[axis] <= plane_r,
        t.vertex(1)[axis] <= plane_r,
        t.vertex(2)[axis] <= plane_r,
    ];
    let lo_sum = lo.iter().filter(|&&l| l).count();

    // All vertices on one side: nothing to split.
    if lo_sum == 0 {
        sink.push(*t, false);
        return;
    }
    if lo_sum == 3 {
        sink.push(*t, true);
        return;
    }

    // An edge lies on the plane; the non-planar vertex decides the side.
    if planar_sum == 2 {
        let non_planar = if !planar[0] {
            0
        } else if !planar[1] {
            1
        } else {
            2
        };
        sink.push(*t, lo[non_planar]);
        return;
    }

    // One vertex lies on the plane.
    if planar_sum == 1 {
        let planar_index = if planar[0] {
            0
        } else if planar[1] {
            1
        } else {
            2
        };
        let others = [(planar_index + 1) % 3, (planar_index + 2) % 3];
        let other_lo_sum = lo[others[0]] as usize + lo[others[1]] as usize;

        // Both non-planar vertices on one side: still nothing to split.
        if other_lo_sum != 1 {
            sink.push(*t, other_lo_sum == 2);
            return;
        }

        // The plane goes through the planar vertex. One intersection on the
        // opposite edge yields two triangles instead of a triangle and a
        // quad.
        let pivot = t.vertex(planar_index);
        let pivot_uv = t.uv(planar_index);
        let a = t.vertex(others[0]);
        let a_uv = t.uv(others[0]);
        let b = t.vertex(others[1]);
        let b_uv = t.uv(others[1]);

        let s = math::intersect_ray_axis_plane(&a, &(b - a), axis, plane);
        let cut = math::mix_point(&a, &b, s);
        let cut_uv = math::mix_uv(&a_uv, &b_uv, s);

        let first = TexturedTriangle::new([pivot, a, cut], [pivot_uv, a_uv, cut_uv]);
        let second = TexturedTriangle::new([pivot, cut, b], [pivot_uv, cut_uv, b_uv]);
        let first_lo = lo[others[0]];
        sink.push(first, first_lo);
        sink.push(second, !first_lo);
        return;
    }

    // Regular case: no planar vertices, the plane isolates one vertex from
    // the other two. The split produces the isolated triangle and a quad.
    debug_assert!(lo_sum == 1 || lo_sum == 2);
    let isolated_lo = lo_sum == 1;
    let isolated = if isolated_lo {
        lo.iter().position(|&l| l)
    } else {
        lo.iter().position(|&l| !l)
    }
    .unwrap_or(2);
    let others = [(isolated + 1) % 3, (isolated + 2) % 3];

    let iso = t.vertex(isolated);
    let iso_uv = t.uv(isolated);
    let a = t.vertex(others[0]);
    let a_uv = t.uv(others[0]);
    let b = t.vertex(others[1]);
    let b_uv = t.uv(others[1]);

    // Both intersections lie on the edges adjacent to the isolated vertex.
    let sa = math::intersect_ray_axis_plane(&iso, &(a - iso), axis, plane);
    let sb = math::intersect_ray_axis_plane(&iso, &(b - iso), axis, plane);
    let cut_a = math::mix_point(&iso, &a, sa);
    let cut_a_uv = math::mix_uv(&iso_uv, &a_uv, sa);
    let cut_b = math::mix_point(&iso, &b, sb);
    let cut_b_uv = math::mix_uv(&iso_uv, &b_uv, sb);

    let isolated_triangle =
        TexturedTriangle::new([iso, cut_a, cut_b], [iso_uv, cut_a_uv, cut_b_uv]);
    let quad_first = TexturedTriangle::new([cut_a, a, b], [cut_a_uv, a_uv, b_uv]);
    let quad_second =
        TexturedTriangle::new([cut_a, cut_b, b], [cut_a_uv, cut_b_uv, b_uv]);

    sink.push(isolated_triangle, isolated_lo);
    sink.push(quad_first, !isolated_lo);
    sink.push(quad_second, !isolated_lo);
}
