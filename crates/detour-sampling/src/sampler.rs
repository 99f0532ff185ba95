//! Area weighted random point sampling
//!
//! A query picks one tile uniformly by slot, then one eligible polygon in
//! that tile with probability proportional to its XZ area, then a uniform
//! point inside that polygon. The point's height is snapped to the polygon
//! surface.

use detour::detour_common::dt_random_point_in_convex_poly;
use detour::{MAX_VERTS_PER_POLY, MeshTile, Poly, PolyFilter, PolyRef, PolyType};
use rand::Rng;
use recast_common::convex_poly_area_2d;

use crate::error::{Result, SampleError};
use crate::source::NavMeshSource;

/// Finds a random point on the navigation mesh
///
/// `frand` must return uniform values in [0, 1). It is called once for the
/// tile, once per eligible polygon of that tile and twice for the point.
///
/// Tiles are picked uniformly by slot, not by area, so a small tile gets as
/// many samples as a large one.
pub fn find_random_point<S, F, R>(source: &S, filter: &F, mut frand: R) -> Result<(PolyRef, [f32; 3])>
where
    S: NavMeshSource + ?Sized,
    F: PolyFilter + ?Sized,
    R: FnMut() -> f32,
{
    let (tile_index, tile) = pick_tile(source, frand())?;
    let base = source.poly_ref_base(tile);

    let (poly_ref, poly) =
        pick_poly(tile, base, filter, &mut frand).ok_or(SampleError::NoEligiblePolygon { tile_index })?;

    let mut verts = [0.0f32; MAX_VERTS_PER_POLY * 3];
    let nv = tile.poly_verts(poly, &mut verts);
    let mut areas = [0.0f32; MAX_VERTS_PER_POLY];

    let s = frand();
    let t = frand();
    let mut pt = [0.0f32; 3];
    dt_random_point_in_convex_poly(&verts, nv, &mut areas, s, t, &mut pt);

    pt[1] = source
        .poly_height(poly_ref, &pt)
        .map_err(|status| SampleError::HeightQueryFailed { poly_ref, status })?;

    log::debug!(
        "Sampled point ({}, {}, {}) on polygon {} in tile slot {}",
        pt[0],
        pt[1],
        pt[2],
        poly_ref,
        tile_index
    );

    Ok((poly_ref, pt))
}

/// Picks the slot at `u * tile_count`, then scans forward with wrap-around to
/// the first occupied slot
fn pick_tile<S>(source: &S, u: f32) -> Result<(usize, &MeshTile)>
where
    S: NavMeshSource + ?Sized,
{
    let tile_count = source.tile_count();
    if tile_count == 0 {
        return Err(SampleError::NoValidTile);
    }

    // Saturating cast maps NaN and negative draws to slot 0
    let start = ((u * tile_count as f32) as usize).min(tile_count - 1);

    (0..tile_count)
        .map(|i| (start + i) % tile_count)
        .find_map(|index| {
            source
                .tile_at(index)
                .filter(|tile| tile.header.is_some())
                .map(|tile| (index, tile))
        })
        .ok_or(SampleError::NoValidTile)
}

/// Single pass reservoir selection weighted by polygon area
///
/// A polygon replaces the held one when `u * area_sum <= poly_area`, which
/// leaves each eligible polygon selected with probability `poly_area / total`.
fn pick_poly<'t, F, R>(
    tile: &'t MeshTile,
    base: PolyRef,
    filter: &F,
    frand: &mut R,
) -> Option<(PolyRef, &'t Poly)>
where
    F: PolyFilter + ?Sized,
    R: FnMut() -> f32,
{
    let mut selected = None;
    let mut area_sum = 0.0f32;
    let mut verts = [0.0f32; MAX_VERTS_PER_POLY * 3];

    for (i, poly) in tile.polys.iter().enumerate() {
        // Off-mesh connections have no surface to sample
        if poly.get_type() != PolyType::Ground {
            continue;
        }

        let poly_ref = PolyRef::new(base.id() | i as u32);
        if !filter.pass_filter(poly_ref, tile, poly) {
            continue;
        }

        // Fewer than 3 vertices weighs 0 but still takes its draw
        let nv = tile.poly_verts(poly, &mut verts);
        let poly_area = convex_poly_area_2d(&verts, nv);
        area_sum += poly_area;

        let u = frand();
        if u * area_sum <= poly_area {
            selected = Some((poly_ref, poly));
        }

        log::trace!(
            "Polygon {} area {} (running sum {}), draw {}",
            poly_ref,
            poly_area,
            area_sum,
            u
        );
    }

    selected
}

/// Random point sampler bound to one navigation mesh and filter
#[derive(Debug)]
pub struct RandomPointSampler<'a, S: ?Sized, F: ?Sized> {
    source: &'a S,
    filter: &'a F,
}

impl<S: ?Sized, F: ?Sized> Clone for RandomPointSampler<'_, S, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized, F: ?Sized> Copy for RandomPointSampler<'_, S, F> {}

impl<'a, S, F> RandomPointSampler<'a, S, F>
where
    S: NavMeshSource + ?Sized,
    F: PolyFilter + ?Sized,
{
    /// Creates a sampler over `source` restricted to polygons passing `filter`
    pub fn new(source: &'a S, filter: &'a F) -> Self {
        Self { source, filter }
    }

    /// Samples one point using `frand` as the uniform source
    pub fn sample<R: FnMut() -> f32>(&self, frand: R) -> Result<(PolyRef, [f32; 3])> {
        find_random_point(self.source, self.filter, frand)
    }

    /// Samples one point drawing uniforms from `rng`
    pub fn sample_with_rng<R: Rng>(&self, rng: &mut R) -> Result<(PolyRef, [f32; 3])> {
        self.sample(|| rng.gen::<f32>())
    }

    /// Samples `count` points, stopping at the first failure
    pub fn sample_many<R: Rng>(&self, rng: &mut R, count: usize) -> Result<Vec<(PolyRef, [f32; 3])>> {
        (0..count).map(|_| self.sample_with_rng(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detour::test_mesh_helpers::{
        build_test_tile, create_empty_navmesh, create_two_area_navmesh, rect, test_params,
    };
    use detour::{NavMesh, NavMeshQuery, PolyFlags, QueryFilter, Status};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use recast_common::{dist_point_poly_edges_sqr_2d, point_in_polygon_2d};
    use std::collections::HashMap;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    /// Returns a uniform source that replays `values` and counts the draws
    fn scripted(values: &[f32]) -> impl FnMut() -> f32 + '_ {
        let mut next = 0;
        move || {
            let v = values[next];
            next += 1;
            v
        }
    }

    /// Source whose height query leaves the sampled y untouched
    struct RawHeights<'a>(&'a NavMesh);

    impl NavMeshSource for RawHeights<'_> {
        fn tile_count(&self) -> usize {
            self.0.get_max_tiles()
        }
        fn tile_at(&self, index: usize) -> Option<&MeshTile> {
            self.0.get_tile(index)
        }
        fn poly_ref_base(&self, tile: &MeshTile) -> PolyRef {
            self.0.get_poly_ref_base(tile)
        }
        fn poly_height(&self, _poly_ref: PolyRef, pos: &[f32; 3]) -> detour::status::Result<f32> {
            Ok(pos[1])
        }
    }

    /// Source whose height query always fails
    struct NoHeights<'a>(&'a NavMesh);

    impl NavMeshSource for NoHeights<'_> {
        fn tile_count(&self) -> usize {
            self.0.get_max_tiles()
        }
        fn tile_at(&self, index: usize) -> Option<&MeshTile> {
            self.0.get_tile(index)
        }
        fn poly_ref_base(&self, tile: &MeshTile) -> PolyRef {
            self.0.get_poly_ref_base(tile)
        }
        fn poly_height(&self, _poly_ref: PolyRef, _pos: &[f32; 3]) -> detour::status::Result<f32> {
            Err(Status::NotFound)
        }
    }

    fn poly_ref(nav_mesh: &NavMesh, tile_index: usize, poly: u32) -> PolyRef {
        let base = nav_mesh.get_poly_ref_base(nav_mesh.get_tile(tile_index).unwrap());
        PolyRef::new(base.id() | poly)
    }

    /// Counts how often each polygon is selected over `trials` samples
    fn selection_counts(
        nav_mesh: &NavMesh,
        filter: &QueryFilter,
        seed: u64,
        trials: usize,
    ) -> std::result::Result<HashMap<PolyRef, usize>, SampleError> {
        let sampler = RandomPointSampler::new(nav_mesh, filter);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut counts = HashMap::new();
        for (poly_ref, _) in sampler.sample_many(&mut rng, trials)? {
            *counts.entry(poly_ref).or_insert(0) += 1;
        }
        Ok(counts)
    }

    #[test]
    fn test_single_polygon_found_from_any_tile_draw() -> TestResult {
        // Four slots with only slot 2 occupied
        let mut nav_mesh = NavMesh::new(test_params(4))?;
        let first = nav_mesh.add_tile(build_test_tile(0, 0, &[rect(0.0, 0.0, 1.0, 1.0)])?)?;
        let second = nav_mesh.add_tile(build_test_tile(1, 0, &[rect(10.0, 0.0, 1.0, 1.0)])?)?;
        nav_mesh.add_tile(build_test_tile(2, 0, &[rect(20.0, 0.0, 2.0, 2.0)])?)?;
        nav_mesh.remove_tile(first)?;
        nav_mesh.remove_tile(second)?;

        let expected = poly_ref(&nav_mesh, 2, 0);
        let filter = QueryFilter::default();

        for u in [0.0, 0.3, 0.55, 0.8, 0.999] {
            let draws = [u, 0.5, 0.25, 0.5];
            let (found, pos) = find_random_point(&nav_mesh, &filter, scripted(&draws))?;
            assert_eq!(found, expected);
            assert!((20.0..=22.0).contains(&pos[0]));
            assert!((0.0..=2.0).contains(&pos[2]));
        }
        Ok(())
    }

    #[test]
    fn test_no_valid_tile() -> TestResult {
        let filter = QueryFilter::default();

        let empty = create_empty_navmesh(3)?;
        let result = find_random_point(&empty, &filter, || 0.5);
        assert_eq!(result, Err(SampleError::NoValidTile));

        // Every tile removed again
        let mut nav_mesh = create_two_area_navmesh()?;
        let base = poly_ref(&nav_mesh, 0, 0);
        nav_mesh.remove_tile(base)?;
        let result = find_random_point(&nav_mesh, &filter, || 0.5);
        assert_eq!(result, Err(SampleError::NoValidTile));
        Ok(())
    }

    #[test]
    fn test_no_eligible_polygon() -> TestResult {
        let nav_mesh = create_two_area_navmesh()?;

        let filter = QueryFilter::default().with_exclude_flags(PolyFlags::WALK);
        let result = find_random_point(&nav_mesh, &filter, || 0.5);
        assert_eq!(result, Err(SampleError::NoEligiblePolygon { tile_index: 0 }));

        let reject_all = |_: PolyRef, _: &MeshTile, _: &Poly| false;
        let result = find_random_point(&nav_mesh, &reject_all, || 0.5);
        assert_eq!(result, Err(SampleError::NoEligiblePolygon { tile_index: 0 }));
        Ok(())
    }

    #[test]
    fn test_selection_follows_area_ratio() -> TestResult {
        // Areas 1.0 and 3.0
        let nav_mesh = create_two_area_navmesh()?;
        let large = poly_ref(&nav_mesh, 0, 1);

        let trials = 100_000;
        let counts = selection_counts(&nav_mesh, &QueryFilter::default(), 7, trials)?;
        let fraction = counts.get(&large).copied().unwrap_or(0) as f64 / trials as f64;
        assert!((0.73..=0.77).contains(&fraction), "large polygon fraction {fraction}");
        Ok(())
    }

    #[test]
    fn test_selection_converges_to_area_fractions() -> TestResult {
        let mut nav_mesh = NavMesh::new(test_params(1))?;
        nav_mesh.add_tile(build_test_tile(
            0,
            0,
            &[
                rect(0.0, 0.0, 1.0, 1.0),
                rect(1.0, 0.0, 2.0, 1.0),
                rect(3.0, 0.0, 5.0, 1.0),
            ],
        )?)?;

        let trials = 40_000;
        let counts = selection_counts(&nav_mesh, &QueryFilter::default(), 99, trials)?;

        for (poly, expected) in [(0, 0.125), (1, 0.25), (2, 0.625)] {
            let found = counts.get(&poly_ref(&nav_mesh, 0, poly)).copied().unwrap_or(0);
            let fraction = found as f64 / trials as f64;
            assert!(
                (fraction - expected).abs() < 0.01,
                "polygon {poly}: {fraction} vs {expected}"
            );
        }
        Ok(())
    }

    #[test]
    fn test_off_mesh_polygon_never_selected() -> TestResult {
        let mut tile = build_test_tile(0, 0, &[rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 8.0, 8.0)])?;
        tile.polys[1].poly_type = PolyType::OffMeshConnection;

        let mut nav_mesh = NavMesh::new(test_params(1))?;
        nav_mesh.add_tile(tile)?;

        let counts = selection_counts(&nav_mesh, &QueryFilter::default(), 3, 2_000)?;
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&poly_ref(&nav_mesh, 0, 0)), Some(&2_000));
        Ok(())
    }

    #[test]
    fn test_point_inside_polygon_before_height_snap() -> TestResult {
        let hexagon = vec![
            [2.0, 0.0, 0.0],
            [4.0, 0.5, 1.0],
            [4.0, 1.0, 3.0],
            [2.0, 1.5, 4.0],
            [0.0, 1.0, 3.0],
            [0.0, 0.5, 1.0],
        ];
        let triangle = vec![[5.0, 2.0, 0.0], [9.0, 3.0, 0.0], [5.0, 4.0, 6.0]];

        let mut nav_mesh = NavMesh::new(test_params(1))?;
        nav_mesh.add_tile(build_test_tile(0, 0, &[hexagon, triangle])?)?;

        let raw = RawHeights(&nav_mesh);
        let filter = QueryFilter::default();
        let sampler = RandomPointSampler::new(&raw, &filter);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for _ in 0..2_000 {
            let (found, pos) = sampler.sample_with_rng(&mut rng)?;
            let (tile, poly) = nav_mesh.get_tile_and_poly_by_ref(found)?;
            let mut verts = [0.0; MAX_VERTS_PER_POLY * 3];
            let nv = tile.poly_verts(poly, &mut verts);

            let inside = point_in_polygon_2d(&pos, &verts, nv)
                || dist_point_poly_edges_sqr_2d(&pos, &verts, nv) < 1e-6;
            assert!(inside, "{pos:?} outside polygon {found}");

            // Interpolated height stays within the vertex heights
            let (lo, hi) = (0..nv).fold((f32::MAX, f32::MIN), |(lo, hi), i| {
                (lo.min(verts[i * 3 + 1]), hi.max(verts[i * 3 + 1]))
            });
            assert!(pos[1] >= lo - 1e-4 && pos[1] <= hi + 1e-4);
        }
        Ok(())
    }

    #[test]
    fn test_height_snapped_to_surface() -> TestResult {
        let sloped = vec![[0.0, 0.0, 0.0], [2.0, 2.0, 0.0], [2.0, 2.0, 2.0], [0.0, 0.0, 2.0]];
        let mut nav_mesh = NavMesh::new(test_params(1))?;
        nav_mesh.add_tile(build_test_tile(0, 0, &[sloped])?)?;

        let query = NavMeshQuery::new(&nav_mesh);
        let filter = QueryFilter::default();
        let sampler = RandomPointSampler::new(&query, &filter);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for (_, pos) in sampler.sample_many(&mut rng, 200)? {
            assert!((pos[1] - pos[0]).abs() < 1e-4, "{pos:?} not on y = x");
        }
        Ok(())
    }

    #[test]
    fn test_height_query_failure() -> TestResult {
        let nav_mesh = create_two_area_navmesh()?;
        let source = NoHeights(&nav_mesh);

        let draws = [0.0, 0.0, 0.9, 0.5, 0.5];
        let result = find_random_point(&source, &QueryFilter::default(), scripted(&draws));
        assert_eq!(
            result,
            Err(SampleError::HeightQueryFailed {
                poly_ref: poly_ref(&nav_mesh, 0, 0),
                status: Status::NotFound,
            })
        );
        Ok(())
    }

    #[test]
    fn test_draw_count() -> TestResult {
        let nav_mesh = create_two_area_navmesh()?;

        let mut draws = 0;
        find_random_point(&nav_mesh, &QueryFilter::default(), || {
            draws += 1;
            0.5
        })?;
        assert_eq!(draws, 1 + 2 + 2);

        let mut draws = 0;
        let filter = QueryFilter::default().with_exclude_flags(PolyFlags::SWIM);
        find_random_point(&nav_mesh, &filter, || {
            draws += 1;
            0.5
        })?;
        assert_eq!(draws, 1 + 1 + 2);
        Ok(())
    }

    /// Source serving one tile as is, without the checks `NavMesh::add_tile` runs
    struct LooseTile(MeshTile);

    impl NavMeshSource for LooseTile {
        fn tile_count(&self) -> usize {
            1
        }
        fn tile_at(&self, index: usize) -> Option<&MeshTile> {
            (index == 0).then_some(&self.0)
        }
        fn poly_ref_base(&self, _tile: &MeshTile) -> PolyRef {
            PolyRef::new(1 << 16)
        }
        fn poly_height(&self, _poly_ref: PolyRef, pos: &[f32; 3]) -> detour::status::Result<f32> {
            Ok(pos[1])
        }
    }

    #[test]
    fn test_degenerate_polygon_still_draws() -> TestResult {
        let mut tile = build_test_tile(
            0,
            0,
            &[rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 1.0, 1.0), rect(2.0, 0.0, 2.0, 1.0)],
        )?;
        tile.polys[0].vert_count = 2;
        let source = LooseTile(tile);

        let mut draws = 0;
        let (found, _) = find_random_point(&source, &QueryFilter::default(), || {
            draws += 1;
            0.5
        })?;
        assert_eq!(draws, 1 + 3 + 2);
        assert_eq!(found, PolyRef::new((1 << 16) | 2));
        Ok(())
    }

    #[test]
    fn test_reservoir_tie_selects_later_polygon() -> TestResult {
        // Doubled areas are 2 and 6, so u = 0.75 gives 0.75 * 8 == 6
        let nav_mesh = create_two_area_navmesh()?;
        let filter = QueryFilter::default();

        let (found, _) = find_random_point(&nav_mesh, &filter, scripted(&[0.0, 0.99, 0.75, 0.5, 0.5]))?;
        assert_eq!(found, poly_ref(&nav_mesh, 0, 1));

        let (found, _) = find_random_point(&nav_mesh, &filter, scripted(&[0.0, 0.99, 0.76, 0.5, 0.5]))?;
        assert_eq!(found, poly_ref(&nav_mesh, 0, 0));
        Ok(())
    }

    #[test]
    fn test_sample_many_stops_on_failure() -> TestResult {
        let nav_mesh = create_two_area_navmesh()?;
        let filter = QueryFilter::default();
        let sampler = RandomPointSampler::new(&nav_mesh, &filter);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(sampler.sample_many(&mut rng, 25)?.len(), 25);
        assert!(sampler.sample_many(&mut rng, 0)?.is_empty());

        let empty = create_empty_navmesh(1)?;
        let sampler = RandomPointSampler::new(&empty, &filter);
        assert_eq!(sampler.sample_many(&mut rng, 3), Err(SampleError::NoValidTile));
        Ok(())
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() -> TestResult {
        let nav_mesh = create_two_area_navmesh()?;
        let filter = QueryFilter::default();
        let sampler = RandomPointSampler::new(&nav_mesh, &filter);

        let a = sampler.sample_many(&mut ChaCha8Rng::seed_from_u64(42), 50)?;
        let b = sampler.sample_many(&mut ChaCha8Rng::seed_from_u64(42), 50)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_concurrent_sampling() -> TestResult {
        let nav_mesh = create_two_area_navmesh()?;
        let filter = QueryFilter::default();
        let sampler = RandomPointSampler::new(&nav_mesh, &filter);

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4u64)
                .map(|seed| {
                    scope.spawn(move || {
                        let mut rng = ChaCha8Rng::seed_from_u64(seed);
                        sampler.sample_many(&mut rng, 100)
                    })
                })
                .collect();
            handles.into_iter().filter_map(|h| h.join().ok()).collect()
        });

        assert_eq!(results.len(), 4);
        for points in results {
            assert_eq!(points?.len(), 100);
        }
        Ok(())
    }
}
