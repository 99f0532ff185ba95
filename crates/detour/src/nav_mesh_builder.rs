//! Navigation mesh builder for creating tile data
//!
//! Turns flat polygon mesh buffers into a [`MeshTile`] that can be added to a
//! [`NavMesh`](crate::NavMesh). Off-mesh connections become two-vertex
//! polygons stored after the ground polygons.

use super::{
    MAX_VERTS_PER_POLY, MESH_NULL_IDX, MeshTile, Poly, PolyDetail, PolyFlags, PolyType, Status,
    TileHeader,
};
use recast_common::{Error, Result, calc_bounds};

/// Input data for building a single tile
#[derive(Debug, Clone)]
pub struct NavMeshCreateParams {
    /// Tile grid position
    pub tile_x: i32,
    pub tile_y: i32,
    pub tile_layer: i32,
    /// User defined data stored in the tile header
    pub user_id: u32,

    /// Polygon mesh vertices [x,y,z,...]
    pub verts: Vec<f32>,
    pub vert_count: i32,
    /// Polygon vertex indices, `nvp` per polygon, unused slots set to [`MESH_NULL_IDX`]
    pub polys: Vec<u16>,
    pub poly_flags: Vec<PolyFlags>,
    pub poly_areas: Vec<u8>,
    pub poly_count: i32,
    /// Maximum number of vertices per polygon
    pub nvp: i32,

    /// Detail sub-meshes, `[vert_base, vert_count, tri_base, tri_count]` per polygon
    pub detail_meshes: Vec<u32>,
    /// Detail vertices [x,y,z,...] that are not polygon vertices
    pub detail_verts: Vec<f32>,
    pub detail_vert_count: i32,
    /// Detail triangles [a,b,c,flags,...]
    pub detail_tris: Vec<u8>,
    pub detail_tri_count: i32,

    /// Off-mesh connection end points [ax,ay,az,bx,by,bz,...]
    pub off_mesh_con_verts: Vec<f32>,
    pub off_mesh_con_flags: Vec<PolyFlags>,
    pub off_mesh_con_areas: Vec<u8>,
    pub off_mesh_con_count: i32,
}

impl Default for NavMeshCreateParams {
    fn default() -> Self {
        Self {
            tile_x: 0,
            tile_y: 0,
            tile_layer: 0,
            user_id: 0,
            verts: Vec::new(),
            vert_count: 0,
            polys: Vec::new(),
            poly_flags: Vec::new(),
            poly_areas: Vec::new(),
            poly_count: 0,
            nvp: MAX_VERTS_PER_POLY as i32,
            detail_meshes: Vec::new(),
            detail_verts: Vec::new(),
            detail_vert_count: 0,
            detail_tris: Vec::new(),
            detail_tri_count: 0,
            off_mesh_con_verts: Vec::new(),
            off_mesh_con_flags: Vec::new(),
            off_mesh_con_areas: Vec::new(),
            off_mesh_con_count: 0,
        }
    }
}

/// Builder for creating navigation mesh tiles from polygon mesh data
pub struct NavMeshBuilder;

impl NavMeshBuilder {
    /// Creates a navigation mesh tile from NavMeshCreateParams
    pub fn build_tile(params: &NavMeshCreateParams) -> Result<MeshTile> {
        Self::validate_params(params)?;

        let mut tile = MeshTile::new();

        tile.verts = params.verts.clone();
        tile.polys = Self::build_polygons(params)?;
        tile.detail_meshes = Self::build_detail_meshes(params)?;
        tile.detail_verts = params.detail_verts.clone();
        tile.detail_tris = params.detail_tris.clone();

        Self::append_off_mesh_connections(params, &mut tile);

        let (bmin, bmax) = calc_bounds(&tile.verts)
            .ok_or(Error::detour(Status::InvalidParam))?;

        tile.header = Some(TileHeader {
            user_id: params.user_id,
            bmin: bmin.to_array(),
            bmax: bmax.to_array(),
            poly_count: tile.polys.len() as i32,
            vert_count: (tile.verts.len() / 3) as i32,
            off_mesh_con_count: params.off_mesh_con_count,
            ..TileHeader::new(params.tile_x, params.tile_y, params.tile_layer)
        });

        log::debug!(
            "Built tile ({}, {}, {}): {} polygons, {} off-mesh connections",
            params.tile_x,
            params.tile_y,
            params.tile_layer,
            params.poly_count,
            params.off_mesh_con_count
        );

        Ok(tile)
    }

    /// Validates input parameters
    fn validate_params(params: &NavMeshCreateParams) -> Result<()> {
        if params.vert_count < 3 || params.poly_count < 1 {
            return Err(Error::detour(Status::InvalidParam));
        }

        if params.nvp < 3 || params.nvp > MAX_VERTS_PER_POLY as i32 {
            return Err(Error::detour(Status::InvalidParam));
        }

        if params.verts.len() != params.vert_count as usize * 3 {
            return Err(Error::detour(Status::InvalidParam));
        }

        if params.verts.iter().any(|v| !v.is_finite()) {
            return Err(Error::detour(Status::InvalidParam));
        }

        let index_count = params
            .poly_count
            .checked_mul(params.nvp)
            .ok_or(Error::detour(Status::InvalidParam))?;
        if params.polys.len() != index_count as usize {
            return Err(Error::detour(Status::InvalidParam));
        }

        if params.off_mesh_con_count < 0 {
            return Err(Error::detour(Status::InvalidParam));
        }

        // Total polygon count has to fit in the 16 bit polygon index
        let total_polys = params
            .poly_count
            .checked_add(params.off_mesh_con_count)
            .ok_or(Error::detour(Status::InvalidParam))?;
        if total_polys > u16::MAX as i32 {
            return Err(Error::detour(Status::InvalidParam));
        }

        if params.off_mesh_con_verts.len() != params.off_mesh_con_count as usize * 6 {
            return Err(Error::detour(Status::InvalidParam));
        }

        if !params.detail_meshes.is_empty() {
            if params.detail_meshes.len() != params.poly_count as usize * 4 {
                return Err(Error::detour(Status::InvalidParam));
            }
            if params.detail_verts.len() != params.detail_vert_count.max(0) as usize * 3
                || params.detail_tris.len() != params.detail_tri_count.max(0) as usize * 4
            {
                return Err(Error::detour(Status::InvalidParam));
            }
        }

        Ok(())
    }

    /// Builds polygon structures from raw data
    fn build_polygons(params: &NavMeshCreateParams) -> Result<Vec<Poly>> {
        let nvp = params.nvp as usize;
        let mut polys = Vec::with_capacity(params.poly_count as usize);

        for (i, indices) in params.polys.chunks_exact(nvp).enumerate() {
            let area = params.poly_areas.get(i).copied().unwrap_or(0);
            let flags = params.poly_flags.get(i).copied().unwrap_or_default();
            let mut poly = Poly::new(area, PolyType::Ground, flags);

            for &v in indices.iter().take_while(|&&v| v != MESH_NULL_IDX) {
                if v as i32 >= params.vert_count {
                    return Err(Error::detour(Status::InvalidParam));
                }
                poly.verts[poly.vert_count as usize] = v;
                poly.vert_count += 1;
            }

            if poly.vert_count < 3 {
                log::warn!("Polygon {} has only {} vertices", i, poly.vert_count);
                return Err(Error::detour(Status::InvalidParam));
            }

            polys.push(poly);
        }

        Ok(polys)
    }

    /// Builds detail mesh records, one per ground polygon
    fn build_detail_meshes(params: &NavMeshCreateParams) -> Result<Vec<PolyDetail>> {
        params
            .detail_meshes
            .chunks_exact(4)
            .map(|d| {
                let vert_count = u8::try_from(d[1])
                    .map_err(|_| Error::detour(Status::InvalidParam))?;
                let tri_count = u8::try_from(d[3])
                    .map_err(|_| Error::detour(Status::InvalidParam))?;

                let vert_end = d[0] as usize + vert_count as usize;
                let tri_end = d[2] as usize + tri_count as usize;
                if vert_end > params.detail_vert_count as usize
                    || tri_end > params.detail_tri_count as usize
                {
                    return Err(Error::detour(Status::InvalidParam));
                }

                Ok(PolyDetail {
                    vert_base: d[0],
                    tri_base: d[2],
                    vert_count,
                    tri_count,
                })
            })
            .collect()
    }

    /// Stores each off-mesh connection as a two-vertex polygon
    fn append_off_mesh_connections(params: &NavMeshCreateParams, tile: &mut MeshTile) {
        for (i, ends) in params.off_mesh_con_verts.chunks_exact(6).enumerate() {
            let base = (tile.verts.len() / 3) as u16;
            tile.verts.extend_from_slice(ends);

            let area = params.off_mesh_con_areas.get(i).copied().unwrap_or(0);
            let flags = params.off_mesh_con_flags.get(i).copied().unwrap_or_default();
            let mut poly = Poly::new(area, PolyType::OffMeshConnection, flags);
            poly.verts[0] = base;
            poly.verts[1] = base + 1;
            poly.vert_count = 2;
            tile.polys.push(poly);
        }
    }
}
