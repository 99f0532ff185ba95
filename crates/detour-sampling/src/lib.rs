//! Random point sampling on Detour navigation meshes
//!
//! Points are drawn uniformly by area within a tile: one tile slot is picked
//! per query, then a polygon weighted by its XZ area, then a point inside it
//! with the height snapped to the polygon surface.
//!
//! # Example
//!
//! ```rust,ignore
//! use detour::QueryFilter;
//! use detour_sampling::RandomPointSampler;
//! use rand::SeedableRng;
//!
//! let filter = QueryFilter::default();
//! let sampler = RandomPointSampler::new(&nav_mesh, &filter);
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
//! let (poly_ref, pos) = sampler.sample_with_rng(&mut rng)?;
//! ```

pub mod config;
pub mod error;
pub mod sampler;
pub mod source;

pub use config::{FilterConfig, SampleConfig};
pub use error::{ConfigError, Result, SampleError};
pub use sampler::{RandomPointSampler, find_random_point};
pub use source::NavMeshSource;
