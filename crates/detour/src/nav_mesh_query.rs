//! Navigation mesh query implementation for Detour
//!
//! [`NavMeshQuery`] is a read-only handle over a [`NavMesh`] for per-polygon
//! queries. It never mutates the mesh, so any number of queries can share one.

use super::detour_common::dt_calc_poly_center;
use super::nav_mesh::{MeshTile, Poly};
use super::{MAX_VERTS_PER_POLY, NavMesh, PolyRef, PolyType, Status};
use recast_common::convex_poly_area_2d;

/// Read-only query interface over a navigation mesh
#[derive(Debug, Clone, Copy)]
pub struct NavMeshQuery<'a> {
    nav_mesh: &'a NavMesh,
}

impl<'a> NavMeshQuery<'a> {
    /// Creates a new query object for the navigation mesh
    pub fn new(nav_mesh: &'a NavMesh) -> Self {
        Self { nav_mesh }
    }

    /// Gets the navigation mesh
    pub fn nav_mesh(&self) -> &'a NavMesh {
        self.nav_mesh
    }

    /// Gets the surface height of a polygon at the XZ position of `pos`
    pub fn poly_height(&self, poly_ref: PolyRef, pos: &[f32; 3]) -> crate::status::Result<f32> {
        self.nav_mesh.get_poly_height(poly_ref, pos)
    }

    /// Gets the tile and polygon for a reference
    pub fn tile_and_poly(&self, poly_ref: PolyRef) -> crate::status::Result<(&'a MeshTile, &'a Poly)> {
        self.nav_mesh
            .get_tile_and_poly_by_ref(poly_ref)
            .map_err(|_| Status::InvalidParam)
    }

    /// Gets the centroid of a polygon's vertices
    pub fn get_poly_center(&self, poly_ref: PolyRef) -> crate::status::Result<[f32; 3]> {
        let (tile, poly) = self.tile_and_poly(poly_ref)?;
        let mut center = [0.0; 3];
        dt_calc_poly_center(&mut center, poly.vert_indices(), &tile.verts);
        Ok(center)
    }

    /// Gets the area of a ground polygon projected on the XZ plane
    ///
    /// Off-mesh connections have no surface and report zero.
    pub fn get_poly_area(&self, poly_ref: PolyRef) -> crate::status::Result<f32> {
        let (tile, poly) = self.tile_and_poly(poly_ref)?;
        if poly.get_type() != PolyType::Ground {
            return Ok(0.0);
        }

        let mut verts = [0.0; MAX_VERTS_PER_POLY * 3];
        let nv = tile.poly_verts(poly, &mut verts);
        Ok(convex_poly_area_2d(&verts, nv) * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mesh_helpers::create_two_area_navmesh;
    use recast_common::Result;

    #[test]
    fn test_query_polygon_properties() -> Result<()> {
        let nav_mesh = create_two_area_navmesh()?;
        let query = NavMeshQuery::new(&nav_mesh);
        let base = nav_mesh.get_poly_ref_base(nav_mesh.get_tile(0).unwrap());
        let second = PolyRef::new(base.id() | 1);

        assert_eq!(query.get_poly_area(base), Ok(1.0));
        assert_eq!(query.get_poly_area(second), Ok(3.0));
        assert_eq!(query.get_poly_center(second), Ok([2.5, 0.0, 0.5]));
        assert_eq!(query.poly_height(second, &[2.0, 5.0, 0.5]), Ok(0.0));
        assert!(std::ptr::eq(query.nav_mesh(), &nav_mesh));
        Ok(())
    }

    #[test]
    fn test_query_rejects_bad_refs() -> Result<()> {
        let nav_mesh = create_two_area_navmesh()?;
        let query = NavMeshQuery::new(&nav_mesh);

        assert_eq!(query.get_poly_center(PolyRef::new(0)), Err(Status::InvalidParam));
        assert_eq!(query.get_poly_area(PolyRef::new(0x7fff_ffff)), Err(Status::InvalidParam));
        Ok(())
    }
}
