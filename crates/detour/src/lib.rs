//! Tiled navigation meshes for runtime queries
//!
//! This crate holds the Detour side of a navigation mesh: tiles of convex
//! polygons sharing a vertex buffer, stable polygon references, polygon
//! filters and surface height queries.
//!
//! # Features
//!
//! - **Tiles**: fixed pool of tile slots, addressed by index or grid position
//! - **Polygon references**: salted references that go stale when a tile is removed
//! - **Filters**: include/exclude flag filtering or any custom predicate
//! - **Height queries**: surface height from detail triangles or polygon fans
//! - **Persistence**: JSON round trips (`serialization` feature)
//! - **Fixtures**: `test_mesh_helpers` for dependent crates' tests (`test-utils` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use detour::{NavMesh, NavMeshParams, NavMeshQuery, NavMeshBuilder};
//!
//! let mut nav_mesh = NavMesh::new(params)?;
//! nav_mesh.add_tile(NavMeshBuilder::build_tile(&create_params)?)?;
//!
//! let query = NavMeshQuery::new(&nav_mesh);
//! let height = query.poly_height(poly_ref, &[1.0, 0.0, 1.0])?;
//! ```

pub mod detour_common;
pub mod nav_mesh;
pub mod nav_mesh_builder;
pub mod nav_mesh_query;
pub mod status;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_mesh_helpers;


pub use nav_mesh::{MeshTile, NavMesh, Poly, PolyDetail, TileHeader};
pub use nav_mesh_builder::{NavMeshBuilder, NavMeshCreateParams};
pub use nav_mesh_query::NavMeshQuery;
pub use status::Status;

use std::fmt;

/// Maximum number of vertices per polygon
pub const MAX_VERTS_PER_POLY: usize = 6;

/// Marks an unused vertex slot in padded polygon index data
pub const MESH_NULL_IDX: u16 = 0xffff;

/// Reference to a polygon in the navigation mesh
///
/// Packs a salt, a 1-based tile id and the polygon index within that tile.
/// The zero reference is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PolyRef(u32);

impl PolyRef {
    /// Creates a reference from its raw id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id
    pub fn id(&self) -> u32 {
        self.0
    }

    /// Checks if the reference is non-null
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PolyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Polygon type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum PolyType {
    /// Regular walkable surface polygon
    #[default]
    Ground,
    /// Two-vertex link between two points on the mesh
    OffMeshConnection,
}

bitflags::bitflags! {
    /// User flags attached to each polygon, matched by [`QueryFilter`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(
        feature = "serialization",
        derive(serde::Serialize, serde::Deserialize)
    )]
    pub struct PolyFlags: u16 {
        /// Walkable ground
        const WALK = 0x01;
        /// Water
        const SWIM = 0x02;
        /// Doors
        const DOOR = 0x04;
        /// Jump links
        const JUMP = 0x08;
        /// Disabled polygons
        const DISABLED = 0x10;
    }
}

impl Default for PolyFlags {
    fn default() -> Self {
        PolyFlags::WALK
    }
}

/// Parameters that define the tile layout of a navigation mesh
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NavMeshParams {
    /// World space origin of the tile grid
    pub origin: [f32; 3],
    /// Width of each tile along the x-axis
    pub tile_width: f32,
    /// Height of each tile along the z-axis
    pub tile_height: f32,
    /// Number of tile slots
    pub max_tiles: i32,
    /// Maximum number of polygons per tile
    pub max_polys_per_tile: i32,
}

/// Decides whether a polygon takes part in a query
pub trait PolyFilter {
    /// Returns true if the polygon can be visited
    fn pass_filter(&self, poly_ref: PolyRef, tile: &MeshTile, poly: &Poly) -> bool;
}

impl<F> PolyFilter for F
where
    F: Fn(PolyRef, &MeshTile, &Poly) -> bool,
{
    fn pass_filter(&self, poly_ref: PolyRef, tile: &MeshTile, poly: &Poly) -> bool {
        self(poly_ref, tile, poly)
    }
}

/// Flag based polygon filter
///
/// A polygon passes when it has at least one include flag and no exclude flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    /// Flags a polygon must share at least one of
    pub include_flags: PolyFlags,
    /// Flags that reject a polygon
    pub exclude_flags: PolyFlags,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            include_flags: PolyFlags::from_bits_retain(0xffff),
            exclude_flags: PolyFlags::empty(),
        }
    }
}

impl QueryFilter {
    /// Creates a filter from include and exclude flags
    pub fn new(include_flags: PolyFlags, exclude_flags: PolyFlags) -> Self {
        Self {
            include_flags,
            exclude_flags,
        }
    }

    pub fn with_include_flags(mut self, flags: PolyFlags) -> Self {
        self.include_flags = flags;
        self
    }

    pub fn with_exclude_flags(mut self, flags: PolyFlags) -> Self {
        self.exclude_flags = flags;
        self
    }
}

impl PolyFilter for QueryFilter {
    fn pass_filter(&self, _poly_ref: PolyRef, _tile: &MeshTile, poly: &Poly) -> bool {
        poly.flags.intersects(self.include_flags) && !poly.flags.intersects(self.exclude_flags)
    }
}
