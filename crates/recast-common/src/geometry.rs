//! 2D geometry operations
//!
//! Most operations work on the XZ plane (Y-up coordinate system). Points are
//! passed as slices whose first three components are `x, y, z`.

use glam::Vec3;

/// Calculate twice the signed area of a 2D triangle on the XZ plane.
///
/// The sign indicates the winding order:
/// - Positive: clockwise (when looking down Y axis)
/// - Negative: counter-clockwise (when looking down Y axis)
/// - Zero: degenerate (collinear points)
#[inline]
pub fn tri_area_2d(a: &[f32], b: &[f32], c: &[f32]) -> f32 {
    let abx = b[0] - a[0];
    let abz = b[2] - a[2];
    let acx = c[0] - a[0];
    let acz = c[2] - a[2];
    acx * abz - abx * acz
}

/// Check if point c is left of the line from a to b (on XZ plane).
#[inline]
pub fn left(a: &[f32], b: &[f32], c: &[f32]) -> bool {
    tri_area_2d(a, b, c) < 0.0
}

/// Check if point c is right of the line from a to b (on XZ plane).
#[inline]
pub fn right(a: &[f32], b: &[f32], c: &[f32]) -> bool {
    tri_area_2d(a, b, c) > 0.0
}

/// Sum of the fan triangle areas of a convex polygon on the XZ plane.
///
/// Triangles are `(v0, v[j-1], v[j])` for `j in 2..nverts`. Each triangle
/// contributes its absolute doubled area, so the result does not depend on
/// the polygon winding.
pub fn convex_poly_area_2d(verts: &[f32], nverts: usize) -> f32 {
    let mut area = 0.0;
    let va = &verts[0..3];
    for j in 2..nverts {
        let vb = &verts[(j - 1) * 3..j * 3];
        let vc = &verts[j * 3..(j + 1) * 3];
        area += tri_area_2d(va, vb, vc).abs();
    }
    area
}

/// Check if a point lies inside a polygon on the XZ plane (winding number).
pub fn point_in_polygon_2d(p: &[f32], verts: &[f32], nverts: usize) -> bool {
    let mut winding = 0;

    for i in 0..nverts {
        let j = (i + 1) % nverts;
        let v1 = &verts[i * 3..];
        let v2 = &verts[j * 3..];

        if v1[2] <= p[2] {
            if v2[2] > p[2] && left(v1, v2, p) {
                winding += 1;
            }
        } else if v2[2] <= p[2] && right(v1, v2, p) {
            winding -= 1;
        }
    }

    winding != 0
}

/// Calculate the squared distance from a point to a line segment on the XZ plane.
pub fn dist_point_segment_sqr_2d(p: &[f32], a: &[f32], b: &[f32]) -> f32 {
    let dx = b[0] - a[0];
    let dz = b[2] - a[2];
    let px = p[0] - a[0];
    let pz = p[2] - a[2];

    let d = dx * dx + dz * dz;
    if d < f32::EPSILON {
        // Segment is a point
        return px * px + pz * pz;
    }

    let t = ((px * dx + pz * dz) / d).clamp(0.0, 1.0);
    let qx = a[0] + t * dx - p[0];
    let qz = a[2] + t * dz - p[2];
    qx * qx + qz * qz
}

/// Smallest squared XZ distance from a point to any polygon edge.
pub fn dist_point_poly_edges_sqr_2d(p: &[f32], verts: &[f32], nverts: usize) -> f32 {
    let mut min_dist = f32::MAX;
    for i in 0..nverts {
        let j = (i + 1) % nverts;
        let d = dist_point_segment_sqr_2d(p, &verts[i * 3..], &verts[j * 3..]);
        min_dist = min_dist.min(d);
    }
    min_dist
}

/// Axis-aligned bounds of a flat `[x, y, z, ...]` vertex buffer.
///
/// Returns `None` for an empty buffer.
pub fn calc_bounds(verts: &[f32]) -> Option<(Vec3, Vec3)> {
    let mut chunks = verts.chunks_exact(3);
    let first = Vec3::from_slice(chunks.next()?);
    let bounds = chunks.fold((first, first), |(bmin, bmax), v| {
        let v = Vec3::from_slice(v);
        (bmin.min(v), bmax.max(v))
    });
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tri_area_2d() {
        // Counter-clockwise triangle (negative in Y-up system)
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [0.0, 0.0, 1.0];
        assert!(tri_area_2d(&a, &b, &c) < 0.0);

        // Clockwise triangle (positive in Y-up system)
        assert!(tri_area_2d(&a, &c, &b) > 0.0);

        // Collinear points
        let d = [2.0, 0.0, 0.0];
        assert_eq!(tri_area_2d(&a, &b, &d), 0.0);
    }

    #[test]
    fn test_convex_poly_area_ignores_winding_and_height() {
        let cw = [
            0.0, 0.0, 0.0, //
            0.0, 1.0, 2.0, //
            3.0, 7.0, 2.0, //
            3.0, 0.0, 0.0, //
        ];
        let ccw = [
            0.0, 0.0, 0.0, //
            3.0, 0.0, 0.0, //
            3.0, 0.0, 2.0, //
            0.0, 0.0, 2.0, //
        ];
        // 3 x 2 rectangle, doubled area
        assert_eq!(convex_poly_area_2d(&cw, 4), 12.0);
        assert_eq!(convex_poly_area_2d(&ccw, 4), 12.0);
        assert_eq!(convex_poly_area_2d(&ccw, 2), 0.0);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            0.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, //
            2.0, 0.0, 2.0, //
            0.0, 0.0, 2.0, //
        ];
        assert!(point_in_polygon_2d(&[1.0, 10.0, 1.0], &square, 4));
        assert!(!point_in_polygon_2d(&[3.0, 0.0, 1.0], &square, 4));
        assert!(!point_in_polygon_2d(&[1.0, 0.0, -0.5], &square, 4));
    }

    #[test]
    fn test_point_edge_distance() {
        let square = [
            0.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, //
            2.0, 0.0, 2.0, //
            0.0, 0.0, 2.0, //
        ];
        assert_eq!(dist_point_poly_edges_sqr_2d(&[1.0, 0.0, 0.5], &square, 4), 0.25);
        assert_eq!(dist_point_poly_edges_sqr_2d(&[3.0, 0.0, 1.0], &square, 4), 1.0);
        assert_eq!(dist_point_segment_sqr_2d(&[5.0, 0.0, 0.0], &[0.0; 3], &[0.0; 3]), 25.0);
    }

    #[test]
    fn test_calc_bounds() {
        assert!(calc_bounds(&[]).is_none());

        let verts = [1.0, 2.0, 3.0, -1.0, 5.0, 0.0];
        let (bmin, bmax) = calc_bounds(&verts).unwrap();
        assert_eq!(bmin, Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(bmax, Vec3::new(1.0, 5.0, 3.0));
    }
}
