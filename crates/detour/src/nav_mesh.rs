//! Navigation mesh implementation for Detour
//!
//! The navigation mesh is a fixed pool of tile slots. Each occupied slot holds
//! a tile of convex polygons that index into the tile's shared vertex buffer.

use std::collections::HashMap;

use super::detour_common::{dt_closest_height_point_triangle, dt_dist_pt_seg_sqr_2d};
use super::{MAX_VERTS_PER_POLY, NavMeshParams, PolyFlags, PolyRef, PolyType, Status};
use recast_common::{Error, Result, dist_point_poly_edges_sqr_2d, point_in_polygon_2d};

/// Number of bits for polygon id
const DT_POLY_BITS: u32 = 16;
/// Number of bits for tile id
const DT_TILE_BITS: u32 = 10;
/// Number of bits for salt
const DT_SALT_BITS: u32 = 6;

/// Maximum polygon id value (16 bits)
const DT_POLY_MASK: u32 = (1 << DT_POLY_BITS) - 1;
/// Maximum tile id value (10 bits)
const DT_TILE_MASK: u32 = (1 << DT_TILE_BITS) - 1;
/// Maximum salt value (6 bits)
const DT_SALT_MASK: u32 = (1 << DT_SALT_BITS) - 1;

/// Squared XZ distance under which a point counts as lying on a polygon edge
const DT_EDGE_EPS_SQR: f32 = 1e-6;

/// Creates a PolyRef from salt, tile and polygon ids
#[inline]
pub fn encode_poly_ref_with_salt(salt: u32, tile_id: u32, poly_id: u32) -> PolyRef {
    PolyRef::new(
        ((salt & DT_SALT_MASK) << (DT_POLY_BITS + DT_TILE_BITS))
            | ((tile_id & DT_TILE_MASK) << DT_POLY_BITS)
            | (poly_id & DT_POLY_MASK),
    )
}

/// Decodes a PolyRef into salt, tile and polygon ids
/// Note: The returned tile_id is 1-based to avoid PolyRef(0)
#[inline]
pub fn decode_poly_ref_full(reference: PolyRef) -> (u32, u32, u32) {
    let id = reference.id();
    let salt = (id >> (DT_POLY_BITS + DT_TILE_BITS)) & DT_SALT_MASK;
    let tile_id = (id >> DT_POLY_BITS) & DT_TILE_MASK;
    let poly_id = id & DT_POLY_MASK;
    (salt, tile_id, poly_id)
}

/// Converts a 1-based tile ID to a 0-based tile index
#[inline]
fn tile_id_to_index(tile_id: u32) -> Option<usize> {
    if tile_id == 0 {
        None
    } else {
        Some((tile_id - 1) as usize)
    }
}

/// Polygon in the navigation mesh
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Poly {
    /// Vertices of the polygon (indices into the tile vertex array)
    pub verts: [u16; MAX_VERTS_PER_POLY],
    /// Flags for the polygon
    pub flags: PolyFlags,
    /// Number of vertices in the polygon
    pub vert_count: u8,
    /// Area ID of the polygon
    pub area: u8,
    /// Polygon type
    pub poly_type: PolyType,
}

impl Poly {
    /// Creates a new polygon
    pub fn new(area: u8, poly_type: PolyType, flags: PolyFlags) -> Self {
        Self {
            verts: [0; MAX_VERTS_PER_POLY],
            flags,
            vert_count: 0,
            area,
            poly_type,
        }
    }

    /// Returns the polygon type
    pub fn get_type(&self) -> PolyType {
        self.poly_type
    }

    /// Vertex indices in use
    pub fn vert_indices(&self) -> &[u16] {
        &self.verts[..self.vert_count as usize]
    }
}

/// Mesh tile in the navigation mesh
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct MeshTile {
    /// Salt value for the tile
    pub salt: u32,
    /// Tile header, `None` while the slot is free
    pub header: Option<TileHeader>,
    /// Polygons in the tile
    pub polys: Vec<Poly>,
    /// Vertices in the tile [x,y,z,...]
    pub verts: Vec<f32>,
    /// Detailed mesh data, one entry per ground polygon
    pub detail_meshes: Vec<PolyDetail>,
    /// Detailed mesh vertices [x,y,z,...]
    pub detail_verts: Vec<f32>,
    /// Detailed mesh triangles [a,b,c,flags,...]
    pub detail_tris: Vec<u8>,
    /// Next free tile in the free list
    #[cfg_attr(feature = "serialization", serde(default))]
    pub next: Option<usize>,
}

impl Default for MeshTile {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshTile {
    /// Creates a new empty mesh tile
    pub fn new() -> Self {
        Self {
            salt: 1,
            header: None,
            polys: Vec::new(),
            verts: Vec::new(),
            detail_meshes: Vec::new(),
            detail_verts: Vec::new(),
            detail_tris: Vec::new(),
            next: None,
        }
    }

    /// Position of vertex `index` in the shared vertex buffer
    #[inline]
    pub fn vertex(&self, index: u16) -> &[f32] {
        let i = index as usize * 3;
        &self.verts[i..i + 3]
    }

    /// Copies the polygon's vertices into a flat `[x,y,z,...]` buffer
    pub fn poly_verts(&self, poly: &Poly, out: &mut [f32; MAX_VERTS_PER_POLY * 3]) -> usize {
        let nv = (poly.vert_count as usize).min(MAX_VERTS_PER_POLY);
        for (j, &vi) in poly.verts[..nv].iter().enumerate() {
            out[j * 3..j * 3 + 3].copy_from_slice(self.vertex(vi));
        }
        nv
    }
}

/// Tile header information
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct TileHeader {
    /// Tile position (x, y, layer)
    pub x: i32,
    pub y: i32,
    pub layer: i32,
    /// User defined data
    pub user_id: u32,
    /// Bounding box of the tile
    pub bmin: [f32; 3],
    pub bmax: [f32; 3],
    /// Number of polys in the tile
    pub poly_count: i32,
    /// Number of vertices in the tile
    pub vert_count: i32,
    /// Number of off-mesh connections in the tile
    pub off_mesh_con_count: i32,
}

impl TileHeader {
    /// Creates a new tile header
    pub fn new(x: i32, y: i32, layer: i32) -> Self {
        Self {
            x,
            y,
            layer,
            user_id: 0,
            bmin: [0.0; 3],
            bmax: [0.0; 3],
            poly_count: 0,
            vert_count: 0,
            off_mesh_con_count: 0,
        }
    }
}

/// Detailed mesh for a polygon
#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PolyDetail {
    /// Index of the first vertex in the detail_verts array
    pub vert_base: u32,
    /// Index of the first triangle in the detail_tris array
    pub tri_base: u32,
    /// Number of vertices
    pub vert_count: u8,
    /// Number of triangles
    pub tri_count: u8,
}

/// Navigation mesh structure
#[derive(Debug)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NavMesh {
    /// Navigation mesh parameters
    params: NavMeshParams,
    /// Tile slots
    tiles: Vec<MeshTile>,
    /// Next available tile slot
    next_free: Option<usize>,
    /// Tile grid position lookup, rebuilt after deserialization
    #[cfg_attr(feature = "serialization", serde(skip))]
    pos_lookup: HashMap<(i32, i32, i32), usize>,
}

impl NavMesh {
    /// Creates a new navigation mesh with `max_tiles` empty slots
    pub fn new(params: NavMeshParams) -> Result<Self> {
        Self::validate_params(&params)?;

        let max_tiles = params.max_tiles as usize;
        let tiles = (0..max_tiles)
            .map(|i| MeshTile {
                next: (i + 1 < max_tiles).then_some(i + 1),
                ..MeshTile::new()
            })
            .collect();

        Ok(Self {
            params,
            tiles,
            next_free: Some(0),
            pos_lookup: HashMap::new(),
        })
    }

    fn validate_params(params: &NavMeshParams) -> Result<()> {
        if params.origin.iter().any(|v| !v.is_finite()) {
            return Err(Error::detour(Status::InvalidParam));
        }

        if !(params.tile_width > 0.0 && params.tile_height > 0.0) {
            return Err(Error::detour(Status::InvalidParam));
        }

        if params.max_tiles <= 0 || params.max_polys_per_tile <= 0 {
            return Err(Error::detour(Status::InvalidParam));
        }

        if params.max_tiles >= (1 << DT_TILE_BITS) {
            return Err(Error::detour(Status::InvalidParam));
        }

        if params.max_polys_per_tile >= (1 << DT_POLY_BITS) {
            return Err(Error::detour(Status::InvalidParam));
        }

        Ok(())
    }

    /// Adds a tile to the first free slot and returns its base reference
    pub fn add_tile(&mut self, mut tile: MeshTile) -> Result<PolyRef> {
        let header = tile
            .header
            .as_ref()
            .ok_or(Error::detour(Status::InvalidParam))?;
        let key = (header.x, header.y, header.layer);

        if self.pos_lookup.contains_key(&key) {
            return Err(Error::detour(Status::AlreadyExists));
        }

        if tile.polys.len() > self.params.max_polys_per_tile as usize {
            return Err(Error::detour(Status::InvalidParam));
        }

        Self::validate_tile_data(&tile)?;

        let tile_idx = self
            .next_free
            .ok_or(Error::detour(Status::OutOfMemory))?;
        let slot = self
            .tiles
            .get(tile_idx)
            .ok_or(Error::detour(Status::DataCorrupted))?;
        if slot.header.is_some() {
            return Err(Error::detour(Status::DataCorrupted));
        }
        self.next_free = slot.next;

        // The slot keeps its salt so references handed out before a removal stay stale
        tile.salt = self.tiles[tile_idx].salt;
        tile.next = None;

        let base = encode_poly_ref_with_salt(tile.salt, (tile_idx + 1) as u32, 0);
        log::info!(
            "Added tile ({}, {}, {}) to slot {} with {} polygons",
            key.0,
            key.1,
            key.2,
            tile_idx,
            tile.polys.len()
        );

        self.pos_lookup.insert(key, tile_idx);
        self.tiles[tile_idx] = tile;

        Ok(base)
    }

    /// Checks that every polygon only references existing vertices and that
    /// ground polygons have at least 3 of them
    fn validate_tile_data(tile: &MeshTile) -> Result<()> {
        if tile.verts.len() % 3 != 0 {
            return Err(Error::detour(Status::DataCorrupted));
        }

        let vert_count = tile.verts.len() / 3;
        for poly in &tile.polys {
            if poly.vert_count as usize > MAX_VERTS_PER_POLY {
                return Err(Error::detour(Status::DataCorrupted));
            }
            if poly.get_type() == PolyType::Ground && poly.vert_count < 3 {
                return Err(Error::detour(Status::DataCorrupted));
            }
            if poly.vert_indices().iter().any(|&v| v as usize >= vert_count) {
                return Err(Error::detour(Status::DataCorrupted));
            }
        }

        Ok(())
    }

    /// Removes the tile addressed by `reference` and returns its data
    ///
    /// The slot's salt is bumped so references into the removed tile no longer resolve.
    pub fn remove_tile(&mut self, reference: PolyRef) -> Result<MeshTile> {
        let (salt, tile_id, _) = decode_poly_ref_full(reference);
        let tile_idx =
            tile_id_to_index(tile_id).ok_or(Error::detour(Status::InvalidParam))?;

        let slot = self
            .tiles
            .get_mut(tile_idx)
            .ok_or(Error::detour(Status::InvalidParam))?;

        if slot.header.is_none() || (slot.salt & DT_SALT_MASK) != salt {
            return Err(Error::detour(Status::InvalidParam));
        }

        let mut next_salt = (slot.salt + 1) & DT_SALT_MASK;
        if next_salt == 0 {
            next_salt = 1;
        }

        let free_slot = MeshTile {
            salt: next_salt,
            next: self.next_free,
            ..MeshTile::new()
        };
        let old_tile = std::mem::replace(slot, free_slot);
        self.next_free = Some(tile_idx);

        if let Some(header) = &old_tile.header {
            self.pos_lookup.remove(&(header.x, header.y, header.layer));
            log::info!(
                "Removed tile ({}, {}, {}) from slot {}",
                header.x,
                header.y,
                header.layer,
                tile_idx
            );
        }

        Ok(old_tile)
    }

    /// Gets the navigation mesh parameters
    pub fn get_params(&self) -> &NavMeshParams {
        &self.params
    }

    /// Gets the number of tile slots
    pub fn get_max_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Gets the tile slot at `index`, free slots included
    pub fn get_tile(&self, index: usize) -> Option<&MeshTile> {
        self.tiles.get(index)
    }

    /// Iterates over occupied tiles
    pub fn tiles(&self) -> impl Iterator<Item = &MeshTile> {
        self.tiles.iter().filter(|t| t.header.is_some())
    }

    /// Gets the tile at the specified grid coordinates
    pub fn get_tile_at(&self, x: i32, y: i32, layer: i32) -> Option<&MeshTile> {
        self.pos_lookup
            .get(&(x, y, layer))
            .and_then(|&idx| self.tiles.get(idx))
    }

    /// Calculates the tile grid location of a world position
    pub fn calc_tile_loc(&self, pos: &[f32; 3]) -> (i32, i32) {
        let tx = ((pos[0] - self.params.origin[0]) / self.params.tile_width).floor() as i32;
        let ty = ((pos[2] - self.params.origin[2]) / self.params.tile_height).floor() as i32;
        (tx, ty)
    }

    /// Gets the base polygon reference for a tile
    ///
    /// Returns the null reference if the tile does not belong to this mesh.
    pub fn get_poly_ref_base(&self, tile: &MeshTile) -> PolyRef {
        self.tiles
            .iter()
            .position(|t| std::ptr::eq(t, tile))
            .map(|idx| encode_poly_ref_with_salt(tile.salt, (idx + 1) as u32, 0))
            .unwrap_or_default()
    }

    /// Gets the tile and polygon for a reference
    pub fn get_tile_and_poly_by_ref(&self, reference: PolyRef) -> Result<(&MeshTile, &Poly)> {
        let (salt, tile_id, poly_id) = decode_poly_ref_full(reference);

        let tile_idx =
            tile_id_to_index(tile_id).ok_or(Error::detour(Status::InvalidParam))?;

        let tile = self
            .tiles
            .get(tile_idx)
            .filter(|t| t.header.is_some() && (t.salt & DT_SALT_MASK) == salt)
            .ok_or(Error::detour(Status::InvalidParam))?;

        let poly = tile
            .polys
            .get(poly_id as usize)
            .ok_or(Error::detour(Status::InvalidParam))?;

        Ok((tile, poly))
    }

    /// Checks whether a reference points at a polygon of an occupied tile
    pub fn is_valid_poly_ref(&self, reference: PolyRef) -> bool {
        reference.is_valid() && self.get_tile_and_poly_by_ref(reference).is_ok()
    }

    /// Gets the height of the polygon surface at the XZ position of `pos`
    ///
    /// Uses the polygon's detail triangles when the tile has them, otherwise
    /// the fan triangles of the polygon itself. Positions on the polygon
    /// boundary are accepted.
    pub fn get_poly_height(&self, reference: PolyRef, pos: &[f32; 3]) -> crate::status::Result<f32> {
        if !pos.iter().all(|v| v.is_finite()) {
            return Err(Status::InvalidParam);
        }

        let (tile, poly) = self
            .get_tile_and_poly_by_ref(reference)
            .map_err(|_| Status::InvalidParam)?;

        // Off-mesh connections don't have a surface
        if poly.poly_type == PolyType::OffMeshConnection {
            return Err(Status::InvalidParam);
        }

        let mut verts = [0.0f32; MAX_VERTS_PER_POLY * 3];
        let nv = tile.poly_verts(poly, &mut verts);
        if nv < 3 {
            return Err(Status::DataCorrupted);
        }
        let verts = &verts[..nv * 3];

        if !point_in_polygon_2d(pos, verts, nv)
            && dist_point_poly_edges_sqr_2d(pos, verts, nv) > DT_EDGE_EPS_SQR
        {
            return Err(Status::OutOfBounds);
        }

        let ip = (decode_poly_ref_full(reference).2) as usize;
        let height = match tile.detail_meshes.get(ip).filter(|pd| pd.tri_count > 0) {
            Some(pd) => Self::detail_height(tile, poly, pd, pos),
            None => (2..nv).find_map(|j| {
                dt_closest_height_point_triangle(
                    pos,
                    &verts[0..3],
                    &verts[(j - 1) * 3..j * 3],
                    &verts[j * 3..j * 3 + 3],
                )
            }),
        };

        // Points on an edge can miss every triangle by rounding; use the closest edge
        Ok(height.unwrap_or_else(|| Self::closest_edge_height(pos, verts, nv)))
    }

    fn detail_height(tile: &MeshTile, poly: &Poly, pd: &PolyDetail, pos: &[f32; 3]) -> Option<f32> {
        let detail_vertex = |k: u8| {
            if k < poly.vert_count {
                Some(tile.vertex(poly.verts[k as usize]))
            } else {
                let i = (pd.vert_base as usize + (k - poly.vert_count) as usize) * 3;
                tile.detail_verts.get(i..i + 3)
            }
        };

        for j in 0..pd.tri_count as usize {
            let t_base = (pd.tri_base as usize + j) * 4;
            let Some(t) = tile.detail_tris.get(t_base..t_base + 3) else {
                continue;
            };
            if let (Some(a), Some(b), Some(c)) =
                (detail_vertex(t[0]), detail_vertex(t[1]), detail_vertex(t[2]))
            {
                if let Some(h) = dt_closest_height_point_triangle(pos, a, b, c) {
                    return Some(h);
                }
            }
        }

        None
    }

    fn closest_edge_height(pos: &[f32; 3], verts: &[f32], nv: usize) -> f32 {
        let mut best = (f32::MAX, verts[1]);
        for i in 0..nv {
            let va = &verts[i * 3..i * 3 + 3];
            let vb = &verts[((i + 1) % nv) * 3..((i + 1) % nv) * 3 + 3];
            let (d, t) = dt_dist_pt_seg_sqr_2d(pos, va, vb);
            if d < best.0 {
                best = (d, va[1] + (vb[1] - va[1]) * t);
            }
        }
        best.1
    }

    /// Rebuilds the grid position lookup from the tile headers
    fn rebuild_lookup(&mut self) {
        self.pos_lookup = self
            .tiles
            .iter()
            .enumerate()
            .filter_map(|(idx, t)| t.header.as_ref().map(|h| ((h.x, h.y, h.layer), idx)))
            .collect();
    }

    /// Checks the invariants that deserialized data must uphold
    #[cfg(feature = "serialization")]
    fn validate_loaded(&self) -> Result<()> {
        Self::validate_params(&self.params)?;
        if self.tiles.len() != self.params.max_tiles as usize {
            return Err(Error::detour(Status::DataCorrupted));
        }
        self.validate_free_list()?;
        for tile in self.tiles() {
            Self::validate_tile_data(tile)?;
        }
        Ok(())
    }

    /// Walks the free list from `next_free`; it must visit every free slot
    /// exactly once and nothing else
    #[cfg(feature = "serialization")]
    fn validate_free_list(&self) -> Result<()> {
        let mut visited = vec![false; self.tiles.len()];
        let mut free_count = 0;
        let mut cursor = self.next_free;

        while let Some(idx) = cursor {
            let tile = self
                .tiles
                .get(idx)
                .ok_or(Error::detour(Status::DataCorrupted))?;
            if tile.header.is_some() || visited[idx] {
                return Err(Error::detour(Status::DataCorrupted));
            }
            visited[idx] = true;
            free_count += 1;
            cursor = tile.next;
        }

        let empty = self.tiles.iter().filter(|t| t.header.is_none()).count();
        if free_count != empty {
            return Err(Error::detour(Status::DataCorrupted));
        }
        Ok(())
    }

    /// Serializes the navigation mesh to JSON bytes
    #[cfg(feature = "serialization")]
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes a navigation mesh from JSON bytes
    #[cfg(feature = "serialization")]
    pub fn from_json_bytes(data: &[u8]) -> Result<Self> {
        let mut nav_mesh: NavMesh =
            serde_json::from_slice(data).map_err(|e| Error::Serialization(e.to_string()))?;
        nav_mesh.validate_loaded()?;
        nav_mesh.rebuild_lookup();
        Ok(nav_mesh)
    }

    /// Saves the navigation mesh to a file in JSON format
    #[cfg(feature = "serialization")]
    pub fn save_to_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json_bytes()?)?;
        Ok(())
    }

    /// Loads a navigation mesh from a JSON file
    #[cfg(feature = "serialization")]
    pub fn load_from_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json_bytes(&data)
    }
}
