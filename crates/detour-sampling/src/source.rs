//! Read-only view of a navigation mesh used by the sampler

use detour::status::Result;
use detour::{MeshTile, NavMesh, NavMeshQuery, PolyRef};

/// The mesh queries random point sampling relies on
///
/// Tile slots are addressed by index in `0..tile_count()`. A slot without a
/// header is free and is skipped by the sampler.
pub trait NavMeshSource {
    /// Number of tile slots, free slots included
    fn tile_count(&self) -> usize;

    /// Tile slot at `index`
    fn tile_at(&self, index: usize) -> Option<&MeshTile>;

    /// Reference of polygon 0 in `tile`
    fn poly_ref_base(&self, tile: &MeshTile) -> PolyRef;

    /// Surface height of a polygon at the XZ position of `pos`
    fn poly_height(&self, poly_ref: PolyRef, pos: &[f32; 3]) -> Result<f32>;
}

impl NavMeshSource for NavMesh {
    fn tile_count(&self) -> usize {
        self.get_max_tiles()
    }

    fn tile_at(&self, index: usize) -> Option<&MeshTile> {
        self.get_tile(index)
    }

    fn poly_ref_base(&self, tile: &MeshTile) -> PolyRef {
        self.get_poly_ref_base(tile)
    }

    fn poly_height(&self, poly_ref: PolyRef, pos: &[f32; 3]) -> Result<f32> {
        self.get_poly_height(poly_ref, pos)
    }
}

impl NavMeshSource for NavMeshQuery<'_> {
    fn tile_count(&self) -> usize {
        self.nav_mesh().get_max_tiles()
    }

    fn tile_at(&self, index: usize) -> Option<&MeshTile> {
        self.nav_mesh().get_tile(index)
    }

    fn poly_ref_base(&self, tile: &MeshTile) -> PolyRef {
        self.nav_mesh().get_poly_ref_base(tile)
    }

    fn poly_height(&self, poly_ref: PolyRef, pos: &[f32; 3]) -> Result<f32> {
        NavMeshQuery::poly_height(self, poly_ref, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detour::test_mesh_helpers::create_two_area_navmesh;
    use detour::{QueryFilter, Status};
    use recast_common::Result;

    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_shared_types_are_sync() {
        assert_sync::<NavMesh>();
        assert_sync::<NavMeshQuery<'static>>();
        assert_sync::<QueryFilter>();
    }

    #[test]
    fn test_query_and_mesh_agree() -> Result<()> {
        let nav_mesh = create_two_area_navmesh()?;
        let query = NavMeshQuery::new(&nav_mesh);

        assert_eq!(NavMeshSource::tile_count(&nav_mesh), 1);
        assert_eq!(NavMeshSource::tile_count(&query), 1);

        let tile = NavMeshSource::tile_at(&query, 0).unwrap();
        let base = NavMeshSource::poly_ref_base(&query, tile);
        assert_eq!(base, NavMeshSource::poly_ref_base(&nav_mesh, tile));
        assert!(NavMeshSource::tile_at(&nav_mesh, 1).is_none());

        let pos = [0.5, 0.0, 0.5];
        assert_eq!(NavMeshSource::poly_height(&query, base, &pos), Ok(0.0));
        assert_eq!(
            NavMeshSource::poly_height(&nav_mesh, base, &[3.0, 0.0, 0.5]),
            Err(Status::OutOfBounds)
        );
        Ok(())
    }
}
