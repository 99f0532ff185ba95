//! Common utilities for Detour navigation mesh operations
//!
//! Points are `[x, y, z]` slices; 2D operations work on the XZ plane.

/// Tolerance used by the triangle height test
const DT_HEIGHT_EPS: f32 = 1e-6;

/// Derives the signed xz-plane area of the triangle ABC
#[inline]
pub fn dt_tri_area_2d(a: &[f32], b: &[f32], c: &[f32]) -> f32 {
    recast_common::tri_area_2d(a, b, c)
}

/// Distance squared from a point to a segment on the xz-plane
///
/// Returns the squared distance and the segment parameter of the closest point.
pub fn dt_dist_pt_seg_sqr_2d(pt: &[f32], p: &[f32], q: &[f32]) -> (f32, f32) {
    let pqx = q[0] - p[0];
    let pqz = q[2] - p[2];
    let dx = pt[0] - p[0];
    let dz = pt[2] - p[2];

    let d = pqx * pqx + pqz * pqz;
    let mut t = pqx * dx + pqz * dz;
    if d > 0.0 {
        t /= d;
    }
    let t = t.clamp(0.0, 1.0);

    let dx = p[0] + t * pqx - pt[0];
    let dz = p[2] + t * pqz - pt[2];
    (dx * dx + dz * dz, t)
}

/// Derives the y-axis height of the point on triangle ABC below or above `p`
///
/// Returns `None` if `p` lies outside the triangle on the xz-plane or the
/// triangle is degenerate.
pub fn dt_closest_height_point_triangle(
    p: &[f32],
    a: &[f32],
    b: &[f32],
    c: &[f32],
) -> Option<f32> {
    let v0 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let v1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v2 = [p[0] - a[0], p[1] - a[1], p[2] - a[2]];

    // Barycentric coordinates scaled by the denominator
    let mut denom = v0[0] * v1[2] - v0[2] * v1[0];
    if denom.abs() < DT_HEIGHT_EPS {
        return None;
    }

    let mut u = v1[2] * v2[0] - v1[0] * v2[2];
    let mut v = v0[0] * v2[2] - v0[2] * v2[0];

    if denom < 0.0 {
        denom = -denom;
        u = -u;
        v = -v;
    }

    if u >= 0.0 && v >= 0.0 && (u + v) <= denom {
        Some(a[1] + (v0[1] * u + v1[1] * v) / denom)
    } else {
        None
    }
}

/// Derives the centroid of a convex polygon
pub fn dt_calc_poly_center(tc: &mut [f32; 3], idx: &[u16], verts: &[f32]) {
    *tc = [0.0; 3];
    if idx.is_empty() {
        return;
    }

    for &i in idx {
        let v = &verts[i as usize * 3..i as usize * 3 + 3];
        tc[0] += v[0];
        tc[1] += v[1];
        tc[2] += v[2];
    }

    let scale = 1.0 / idx.len() as f32;
    tc[0] *= scale;
    tc[1] *= scale;
    tc[2] *= scale;
}

/// Generates a random point inside a convex polygon
///
/// The polygon is fan triangulated from its first vertex. `s` picks a
/// triangle weighted by its xz-area, `t` picks the point inside that
/// triangle. Both must be in [0, 1]. `areas` needs room for `npts` values.
pub fn dt_random_point_in_convex_poly(
    pts: &[f32],
    npts: usize,
    areas: &mut [f32],
    s: f32,
    t: f32,
    out: &mut [f32; 3],
) {
    if npts < 3 {
        if npts > 0 {
            out.copy_from_slice(&pts[0..3]);
        }
        return;
    }

    // Calculate triangle areas
    let mut area_sum = 0.0;
    for i in 2..npts {
        areas[i] = dt_tri_area_2d(&pts[0..3], &pts[(i - 1) * 3..i * 3], &pts[i * 3..i * 3 + 3]).abs();
        area_sum += areas[i];
    }

    // Find sub triangle weighted by area
    let thr = s * area_sum;
    let mut acc = 0.0;
    let mut u = 1.0;
    let mut tri = npts - 1;
    for (i, &dacc) in areas.iter().enumerate().take(npts).skip(2) {
        if dacc > 0.0 && thr >= acc && thr < acc + dacc {
            u = (thr - acc) / dacc;
            tri = i;
            break;
        }
        acc += dacc;
    }
    let u = u.clamp(0.0, 1.0);

    let v = t.clamp(0.0, 1.0).sqrt();
    let a = 1.0 - v;
    let b = (1.0 - u) * v;
    let c = u * v;

    let pa = &pts[0..3];
    let pb = &pts[(tri - 1) * 3..tri * 3];
    let pc = &pts[tri * 3..tri * 3 + 3];

    for k in 0..3 {
        out[k] = a * pa[k] + b * pb[k] + c * pc[k];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_VERTS_PER_POLY;
    use recast_common::point_in_polygon_2d;

    const HEXAGON: [f32; 18] = [
        2.0, 0.0, 0.0, //
        4.0, 0.5, 1.0, //
        4.0, 1.0, 3.0, //
        2.0, 1.5, 4.0, //
        0.0, 1.0, 3.0, //
        0.0, 0.5, 1.0, //
    ];

    #[test]
    fn test_closest_height_point_triangle() {
        let a = [0.0, 0.0, 0.0];
        let b = [0.0, 2.0, 2.0];
        let c = [2.0, 2.0, 0.0];

        assert_eq!(dt_closest_height_point_triangle(&[0.5, 9.0, 0.5], &a, &b, &c), Some(1.0));
        assert_eq!(dt_closest_height_point_triangle(&a, &a, &b, &c), Some(0.0));
        assert_eq!(dt_closest_height_point_triangle(&[2.0, 0.0, 2.0], &a, &b, &c), None);

        // Winding does not matter
        assert_eq!(dt_closest_height_point_triangle(&[0.5, 0.0, 0.5], &a, &c, &b), Some(1.0));

        // Point on edge a-d of a proper triangle
        let d = [4.0, 0.0, 4.0];
        assert_eq!(dt_closest_height_point_triangle(&[1.0, 0.0, 1.0], &a, &b, &d), Some(0.0));

        // Collinear on the xz-plane
        let e = [0.0, 0.0, 4.0];
        assert_eq!(dt_closest_height_point_triangle(&[0.0, 0.0, 1.0], &a, &b, &e), None);
    }

    #[test]
    fn test_dist_pt_seg_sqr_2d() {
        let p = [0.0, 0.0, 0.0];
        let q = [4.0, 2.0, 0.0];

        let (d, t) = dt_dist_pt_seg_sqr_2d(&[1.0, 5.0, 2.0], &p, &q);
        assert_eq!(d, 4.0);
        assert_eq!(t, 0.25);

        let (d, t) = dt_dist_pt_seg_sqr_2d(&[-3.0, 0.0, 0.0], &p, &q);
        assert_eq!(d, 9.0);
        assert_eq!(t, 0.0);

        let (d, t) = dt_dist_pt_seg_sqr_2d(&[1.0, 0.0, 1.0], &p, &p);
        assert_eq!(d, 2.0);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_calc_poly_center() {
        let verts = [0.0, 0.0, 0.0, 2.0, 3.0, 0.0, 2.0, 0.0, 2.0, 0.0, 3.0, 2.0];
        let mut center = [9.0; 3];
        dt_calc_poly_center(&mut center, &[0, 1, 2, 3], &verts);
        assert_eq!(center, [1.0, 1.5, 1.0]);

        dt_calc_poly_center(&mut center, &[], &verts);
        assert_eq!(center, [0.0; 3]);
    }

    #[test]
    fn test_random_point_in_convex_poly_stays_inside() {
        let mut areas = [0.0; MAX_VERTS_PER_POLY];
        let mut pt = [0.0; 3];

        for i in 0..=20 {
            for j in 0..=20 {
                let s = i as f32 / 20.0;
                let t = j as f32 / 20.0;
                dt_random_point_in_convex_poly(&HEXAGON, 6, &mut areas, s, t, &mut pt);

                let inside = point_in_polygon_2d(&pt, &HEXAGON, 6)
                    || recast_common::dist_point_poly_edges_sqr_2d(&pt, &HEXAGON, 6) < 1e-6;
                assert!(inside, "s={s} t={t} gave {pt:?}");
                assert!((0.0..=1.5).contains(&pt[1]));
            }
        }
    }

    #[test]
    fn test_random_point_corners() {
        let mut areas = [0.0; MAX_VERTS_PER_POLY];
        let mut pt = [0.0; 3];

        // t = 0 collapses onto the fan apex
        dt_random_point_in_convex_poly(&HEXAGON, 6, &mut areas, 0.7, 0.0, &mut pt);
        assert_eq!(pt, [2.0, 0.0, 0.0]);

        // s = 0, t = 1 is the second vertex of the first fan triangle
        dt_random_point_in_convex_poly(&HEXAGON, 6, &mut areas, 0.0, 1.0, &mut pt);
        assert_eq!(pt, [4.0, 0.5, 1.0]);

        // Degenerate input returns the first vertex
        dt_random_point_in_convex_poly(&HEXAGON, 2, &mut areas, 0.5, 0.5, &mut pt);
        assert_eq!(pt, [2.0, 0.0, 0.0]);
    }
}
