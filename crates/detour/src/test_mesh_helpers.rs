//! Navigation mesh fixtures shared by the tests of this and dependent crates
//!
//! Polygons are given as lists of `[x, y, z]` corners. Every polygon gets its
//! own vertices, so fixtures never depend on vertex welding.

use crate::nav_mesh_builder::NavMeshBuilder;
use crate::{
    MAX_VERTS_PER_POLY, MESH_NULL_IDX, MeshTile, NavMesh, NavMeshCreateParams, NavMeshParams,
    PolyFlags,
};
use recast_common::{Error, Result};

/// Tile size used by all fixtures
pub const TEST_TILE_SIZE: f32 = 10.0;

/// Navigation mesh parameters with `max_tiles` slots of [`TEST_TILE_SIZE`]
pub fn test_params(max_tiles: i32) -> NavMeshParams {
    NavMeshParams {
        origin: [0.0, 0.0, 0.0],
        tile_width: TEST_TILE_SIZE,
        tile_height: TEST_TILE_SIZE,
        max_tiles,
        max_polys_per_tile: 256,
    }
}

/// Axis aligned rectangle on the y = 0 plane
pub fn rect(x: f32, z: f32, width: f32, depth: f32) -> Vec<[f32; 3]> {
    vec![
        [x, 0.0, z],
        [x + width, 0.0, z],
        [x + width, 0.0, z + depth],
        [x, 0.0, z + depth],
    ]
}

/// Builds a tile at grid position (x, y) holding the given polygons
///
/// All polygons are walkable ground with area id 0 and no detail mesh.
pub fn build_test_tile(x: i32, y: i32, polys: &[Vec<[f32; 3]>]) -> Result<MeshTile> {
    let mut params = NavMeshCreateParams {
        tile_x: x,
        tile_y: y,
        poly_count: polys.len() as i32,
        nvp: MAX_VERTS_PER_POLY as i32,
        ..Default::default()
    };

    for corners in polys {
        if corners.len() > MAX_VERTS_PER_POLY {
            return Err(Error::InvalidMesh(format!(
                "polygon has {} corners, at most {} allowed",
                corners.len(),
                MAX_VERTS_PER_POLY
            )));
        }

        let base = params.vert_count as u16;
        for (i, corner) in corners.iter().enumerate() {
            params.verts.extend_from_slice(corner);
            params.polys.push(base + i as u16);
        }
        params
            .polys
            .extend(std::iter::repeat(MESH_NULL_IDX).take(MAX_VERTS_PER_POLY - corners.len()));
        params.vert_count += corners.len() as i32;
        params.poly_flags.push(PolyFlags::WALK);
        params.poly_areas.push(0);
    }

    NavMeshBuilder::build_tile(&params)
}

/// Creates a one tile mesh with two adjacent ground polygons
///
/// Polygon 0 is a 1x1 square (area 1.0), polygon 1 a 3x1 rectangle
/// (area 3.0) flagged `WALK | SWIM`.
pub fn create_two_area_navmesh() -> Result<NavMesh> {
    let mut tile = build_test_tile(0, 0, &[rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 3.0, 1.0)])?;
    tile.polys[0].area = 1;
    tile.polys[1].area = 2;
    tile.polys[1].flags = PolyFlags::WALK | PolyFlags::SWIM;

    let mut nav_mesh = NavMesh::new(test_params(1))?;
    nav_mesh.add_tile(tile)?;
    Ok(nav_mesh)
}

/// Creates a mesh with `max_tiles` free slots and no tiles
pub fn create_empty_navmesh(max_tiles: i32) -> Result<NavMesh> {
    NavMesh::new(test_params(max_tiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolyType;

    #[test]
    fn test_build_test_tile_layout() -> Result<()> {
        let tile = build_test_tile(
            1,
            2,
            &[rect(0.0, 0.0, 1.0, 1.0), vec![[2.0, 0.0, 0.0], [3.0, 0.0, 0.0], [2.0, 0.0, 1.0]]],
        )?;

        assert_eq!(tile.polys.len(), 2);
        assert_eq!(tile.polys[0].vert_indices(), &[0, 1, 2, 3]);
        assert_eq!(tile.polys[1].vert_indices(), &[4, 5, 6]);
        assert!(tile.polys.iter().all(|p| p.get_type() == PolyType::Ground));

        let header = tile.header.as_ref().unwrap();
        assert_eq!((header.x, header.y), (1, 2));
        Ok(())
    }

    #[test]
    fn test_build_test_tile_rejects_large_polygons() {
        let heptagon: Vec<[f32; 3]> = (0..7).map(|i| [i as f32, 0.0, (i * i) as f32]).collect();
        assert!(build_test_tile(0, 0, &[heptagon]).is_err());
    }

    #[test]
    fn test_empty_navmesh() -> Result<()> {
        let nav_mesh = create_empty_navmesh(5)?;
        assert_eq!(nav_mesh.get_max_tiles(), 5);
        assert_eq!(nav_mesh.tiles().count(), 0);
        Ok(())
    }
}
