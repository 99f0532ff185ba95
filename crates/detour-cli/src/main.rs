//! CLI utility for sampling random points on Detour navigation meshes

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use detour::{
    NavMesh, NavMeshBuilder, NavMeshCreateParams, NavMeshParams, NavMeshQuery, PolyFilter,
    PolyFlags, PolyRef, PolyType, QueryFilter, MAX_VERTS_PER_POLY, MESH_NULL_IDX,
};
use detour_sampling::{FilterConfig, RandomPointSampler, SampleConfig};

/// A CLI utility for sampling random points on Detour navigation meshes
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sample random points on a navigation mesh
    Sample {
        /// Input navigation mesh file (JSON format)
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Number of points to sample
        #[clap(long)]
        count: Option<usize>,

        /// Random seed
        #[clap(long)]
        seed: Option<u64>,

        /// Polygon flags to include (decimal or 0x hex)
        #[clap(long, value_parser = parse_flags)]
        include: Option<u16>,

        /// Polygon flags to exclude (decimal or 0x hex)
        #[clap(long, value_parser = parse_flags)]
        exclude: Option<u16>,

        /// Sample configuration file (JSON), overridden by explicit flags
        #[clap(long, value_parser)]
        config: Option<PathBuf>,

        /// Output file, one `ref x,y,z` line per point
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Compare polygon selection frequency with polygon area
    Stats {
        /// Input navigation mesh file (JSON format)
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Number of samples
        #[clap(long, default_value = "10000")]
        trials: usize,

        /// Random seed
        #[clap(long, default_value = "0")]
        seed: u64,

        /// Polygon flags to include (decimal or 0x hex)
        #[clap(long, value_parser = parse_flags, default_value = "0xffff")]
        include: u16,

        /// Polygon flags to exclude (decimal or 0x hex)
        #[clap(long, value_parser = parse_flags, default_value = "0")]
        exclude: u16,
    },

    /// Print a summary of a navigation mesh
    Info {
        /// Input navigation mesh file (JSON format)
        #[clap(long, value_parser)]
        mesh: PathBuf,
    },

    /// Write a flat grid navigation mesh for experiments
    Grid {
        /// Output navigation mesh file (JSON format)
        #[clap(long, value_parser)]
        output: PathBuf,

        /// Number of tiles along x
        #[clap(long, default_value = "2")]
        tiles_x: i32,

        /// Number of tiles along z
        #[clap(long, default_value = "2")]
        tiles_y: i32,

        /// Polygons per tile side
        #[clap(long, default_value = "2")]
        cells: usize,
    },
}

/// Parse a decimal or `0x` prefixed hexadecimal flag mask
fn parse_flags(s: &str) -> Result<u16, String> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    }
    .map_err(|e| format!("invalid flag mask '{}': {}", s, e))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match args.command {
        Commands::Sample {
            mesh,
            count,
            seed,
            include,
            exclude,
            config,
            output,
        } => {
            let config = resolve_sample_config(config.as_deref(), count, seed, include, exclude)?;
            sample_points(&mesh, &config, output.as_deref())
        }
        Commands::Stats {
            mesh,
            trials,
            seed,
            include,
            exclude,
        } => {
            let filter = FilterConfig {
                include_flags: include,
                exclude_flags: exclude,
            };
            filter.validate()?;
            print_stats(&mesh, trials, seed, &filter)
        }
        Commands::Info { mesh } => print_info(&mesh),
        Commands::Grid {
            output,
            tiles_x,
            tiles_y,
            cells,
        } => write_grid(&output, tiles_x, tiles_y, cells),
    }
}

/// Merge the optional configuration file with explicit command line values
fn resolve_sample_config(
    path: Option<&Path>,
    count: Option<usize>,
    seed: Option<u64>,
    include: Option<u16>,
    exclude: Option<u16>,
) -> Result<SampleConfig> {
    let mut config = match path {
        Some(path) => SampleConfig::load(path)
            .with_context(|| format!("Failed to load sample config: {}", path.display()))?,
        None => SampleConfig::default(),
    };

    if let Some(count) = count {
        config.count = count;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(include) = include {
        config.filter.include_flags = include;
    }
    if let Some(exclude) = exclude {
        config.filter.exclude_flags = exclude;
    }

    config.validate()?;
    Ok(config)
}

fn load_nav_mesh(path: &Path) -> Result<NavMesh> {
    let nav_mesh = NavMesh::load_from_json(path)
        .with_context(|| format!("Failed to load navigation mesh: {}", path.display()))?;
    log::info!(
        "Loaded navigation mesh with {} of {} tiles",
        nav_mesh.tiles().count(),
        nav_mesh.get_max_tiles()
    );
    Ok(nav_mesh)
}

fn format_point(poly_ref: PolyRef, pos: &[f32; 3]) -> String {
    format!("{} {},{},{}", poly_ref, pos[0], pos[1], pos[2])
}

/// Sample random points and print or save them
fn sample_points(mesh_path: &Path, config: &SampleConfig, output: Option<&Path>) -> Result<()> {
    let nav_mesh = load_nav_mesh(mesh_path)?;
    let filter = config.filter.to_query_filter();
    let sampler = RandomPointSampler::new(&nav_mesh, &filter);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let points = sampler
        .sample_many(&mut rng, config.count)
        .map_err(|e| anyhow!("Failed to sample random points: {}", e))?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(std::io::stdout().lock()),
    };

    for (poly_ref, pos) in &points {
        writeln!(writer, "{}", format_point(*poly_ref, pos))?;
    }
    writer.flush()?;

    if let Some(path) = output {
        println!("Saved {} points to {}", points.len(), path.display());
    }

    Ok(())
}

/// Per polygon sampling statistics
#[derive(Debug, Clone, PartialEq)]
struct PolyStats {
    poly_ref: PolyRef,
    area: f32,
    area_fraction: f64,
    frequency: f64,
}

/// Sampling statistics for one tile
#[derive(Debug, Clone, PartialEq)]
struct TileStats {
    location: (i32, i32, i32),
    samples: usize,
    polys: Vec<PolyStats>,
}

/// Relates selection counts to the area share of each eligible polygon
/// within its tile
fn collect_stats(
    query: &NavMeshQuery<'_>,
    filter: &dyn PolyFilter,
    counts: &BTreeMap<PolyRef, usize>,
) -> Vec<TileStats> {
    let nav_mesh = query.nav_mesh();
    let mut result = Vec::new();

    for tile in nav_mesh.tiles() {
        let Some(header) = tile.header.as_ref() else {
            continue;
        };
        let base = nav_mesh.get_poly_ref_base(tile);

        let eligible: Vec<(PolyRef, f32)> = tile
            .polys
            .iter()
            .enumerate()
            .filter(|(_, poly)| poly.get_type() == PolyType::Ground)
            .map(|(i, poly)| (PolyRef::new(base.id() | i as u32), poly))
            .filter(|(poly_ref, poly)| filter.pass_filter(*poly_ref, tile, poly))
            .map(|(poly_ref, _)| (poly_ref, query.get_poly_area(poly_ref).unwrap_or(0.0)))
            .collect();

        let total_area: f32 = eligible.iter().map(|(_, area)| area).sum();
        let samples: usize = eligible
            .iter()
            .map(|(poly_ref, _)| counts.get(poly_ref).copied().unwrap_or(0))
            .sum();

        let polys = eligible
            .into_iter()
            .map(|(poly_ref, area)| PolyStats {
                poly_ref,
                area,
                area_fraction: if total_area > 0.0 {
                    (area / total_area) as f64
                } else {
                    0.0
                },
                frequency: if samples > 0 {
                    counts.get(&poly_ref).copied().unwrap_or(0) as f64 / samples as f64
                } else {
                    0.0
                },
            })
            .collect();

        result.push(TileStats {
            location: (header.x, header.y, header.layer),
            samples,
            polys,
        });
    }

    result
}

fn print_stats(mesh_path: &Path, trials: usize, seed: u64, filter: &FilterConfig) -> Result<()> {
    let nav_mesh = load_nav_mesh(mesh_path)?;
    let query = NavMeshQuery::new(&nav_mesh);
    let filter: QueryFilter = filter.into();
    let sampler = RandomPointSampler::new(&query, &filter);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut counts = BTreeMap::new();
    for _ in 0..trials {
        let (poly_ref, _) = sampler
            .sample_with_rng(&mut rng)
            .map_err(|e| anyhow!("Failed to sample random point: {}", e))?;
        *counts.entry(poly_ref).or_insert(0usize) += 1;
    }

    println!("{} samples, seed {}", trials, seed);
    for tile in collect_stats(&query, &filter, &counts) {
        let (x, y, layer) = tile.location;
        println!("Tile ({}, {}, {}): {} samples", x, y, layer, tile.samples);
        for poly in &tile.polys {
            println!(
                "  {}  area {:>10.3}  area share {:>7.4}  selected {:>7.4}",
                poly.poly_ref, poly.area, poly.area_fraction, poly.frequency
            );
        }
    }

    Ok(())
}

/// Bounds of all occupied tiles
fn mesh_bounds(nav_mesh: &NavMesh) -> Option<(Vec3, Vec3)> {
    nav_mesh
        .tiles()
        .filter_map(|tile| tile.header.as_ref())
        .map(|h| (Vec3::from(h.bmin), Vec3::from(h.bmax)))
        .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)))
}

fn print_info(mesh_path: &Path) -> Result<()> {
    let nav_mesh = load_nav_mesh(mesh_path)?;

    let (ground, off_mesh) = nav_mesh
        .tiles()
        .flat_map(|tile| tile.polys.iter())
        .fold((0, 0), |(ground, off_mesh), poly| match poly.get_type() {
            PolyType::Ground => (ground + 1, off_mesh),
            PolyType::OffMeshConnection => (ground, off_mesh + 1),
        });

    let params = nav_mesh.get_params();
    println!("Tile slots: {}", nav_mesh.get_max_tiles());
    println!("Valid tiles: {}", nav_mesh.tiles().count());
    println!("Tile size: {} x {}", params.tile_width, params.tile_height);
    println!("Ground polygons: {}", ground);
    println!("Off-mesh connections: {}", off_mesh);

    match mesh_bounds(&nav_mesh) {
        Some((bmin, bmax)) => println!("Bounds: min={:?}, max={:?}", bmin, bmax),
        None => println!("Bounds: empty mesh"),
    }

    Ok(())
}

/// World size of one grid tile
const GRID_TILE_SIZE: f32 = 10.0;

/// Flat walkable tile split into `cells * cells` quads over a shared vertex lattice
fn grid_tile_params(tile_x: i32, tile_y: i32, cells: usize) -> NavMeshCreateParams {
    let side = cells + 1;
    let origin_x = tile_x as f32 * GRID_TILE_SIZE;
    let origin_z = tile_y as f32 * GRID_TILE_SIZE;
    let coord = |i: usize| GRID_TILE_SIZE * i as f32 / cells as f32;

    let verts: Vec<f32> = (0..side * side)
        .flat_map(|i| [origin_x + coord(i % side), 0.0, origin_z + coord(i / side)])
        .collect();

    let mut polys = Vec::with_capacity(cells * cells * MAX_VERTS_PER_POLY);
    for cz in 0..cells {
        for cx in 0..cells {
            let v = (cz * side + cx) as u16;
            let above = v + side as u16;
            polys.extend_from_slice(&[v, v + 1, above + 1, above]);
            polys.extend(std::iter::repeat(MESH_NULL_IDX).take(MAX_VERTS_PER_POLY - 4));
        }
    }

    let poly_count = cells * cells;
    NavMeshCreateParams {
        tile_x,
        tile_y,
        vert_count: (side * side) as i32,
        verts,
        polys,
        poly_flags: vec![PolyFlags::WALK; poly_count],
        poly_areas: vec![0; poly_count],
        poly_count: poly_count as i32,
        nvp: MAX_VERTS_PER_POLY as i32,
        ..Default::default()
    }
}

/// Builds a `tiles_x` by `tiles_y` grid of flat tiles
fn build_grid_navmesh(tiles_x: i32, tiles_y: i32, cells: usize) -> Result<NavMesh> {
    if tiles_x <= 0 || tiles_y <= 0 || cells == 0 {
        bail!("Grid needs at least one tile and one cell per side");
    }

    // Lattice vertices must stay below the null index
    let lattice = cells.checked_add(1).and_then(|side| side.checked_mul(side));
    if !lattice.is_some_and(|n| n < MESH_NULL_IDX as usize) {
        bail!("Too many cells per tile side: {}", cells);
    }

    let max_tiles = tiles_x
        .checked_mul(tiles_y)
        .ok_or_else(|| anyhow!("Too many tiles: {}x{}", tiles_x, tiles_y))?;

    let mut nav_mesh = NavMesh::new(NavMeshParams {
        origin: [0.0, 0.0, 0.0],
        tile_width: GRID_TILE_SIZE,
        tile_height: GRID_TILE_SIZE,
        max_tiles,
        max_polys_per_tile: (cells * cells) as i32,
    })?;

    for tile_y in 0..tiles_y {
        for tile_x in 0..tiles_x {
            let tile = NavMeshBuilder::build_tile(&grid_tile_params(tile_x, tile_y, cells))?;
            nav_mesh.add_tile(tile)?;
        }
    }

    Ok(nav_mesh)
}

fn write_grid(output: &Path, tiles_x: i32, tiles_y: i32, cells: usize) -> Result<()> {
    let nav_mesh = build_grid_navmesh(tiles_x, tiles_y, cells).context("Failed to build grid mesh")?;
    nav_mesh
        .save_to_json(output)
        .with_context(|| format!("Failed to save navigation mesh: {}", output.display()))?;
    println!(
        "Saved {}x{} tile grid with {} polygons per tile to {}",
        tiles_x,
        tiles_y,
        cells * cells,
        output.display()
    );
    Ok(())
}
