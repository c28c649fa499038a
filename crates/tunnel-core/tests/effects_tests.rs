// Effect pools, path building and ambient spawn cadence.

use glam::Vec3;
use std::collections::HashSet;
use tunnel_core::constants::*;
use tunnel_core::effects::{bowed, smooth, EdgeGraph};
use tunnel_core::random::stream;
use tunnel_core::*;

fn mesh() -> TunnelMesh {
    build_tunnel(&TunnelConfig::default()).unwrap()
}

fn ambient_pool(capacity: usize, edges: &[Edge]) -> EffectPool {
    EffectPool::new(
        PoolConfig::ambient(capacity, false),
        edges,
        SeededRandom::derive(42, stream::AMBIENT_FX),
    )
}

#[test]
fn spawning_at_capacity_evicts_exactly_the_oldest() {
    let mesh = mesh();
    let mut pool = ambient_pool(3, &mesh.edges);
    let ids: Vec<u64> = (0..3)
        .map(|i| pool.spawn_along_edges(i as f64).unwrap())
        .collect();
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.stats().evicted, 0);

    let newest = pool.spawn_along_edges(3.0).unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.stats().evicted, 1);
    let live: Vec<u64> = pool.arcs().map(|a| a.id).collect();
    assert_eq!(live, vec![ids[1], ids[2], newest]);
}

#[test]
fn pool_never_exceeds_capacity() {
    let mesh = mesh();
    let mut pool = ambient_pool(AMBIENT_MAX_ARCS, &mesh.edges);
    for i in 0..200 {
        pool.spawn_along_edges(i as f64 * 5.0);
        assert!(pool.len() <= pool.capacity());
    }
    assert_eq!(pool.len(), AMBIENT_MAX_ARCS);
    assert_eq!(pool.stats().spawned, 200);
    assert_eq!(pool.stats().evicted, 200 - AMBIENT_MAX_ARCS as u64);
}

#[test]
fn zero_capacity_is_treated_as_one() {
    let mesh = mesh();
    let mut pool = ambient_pool(0, &mesh.edges);
    pool.spawn_along_edges(0.0);
    pool.spawn_along_edges(1.0);
    assert_eq!(pool.capacity(), 1);
    assert_eq!(pool.len(), 1);
}

#[test]
fn empty_edge_cache_is_a_silent_noop() {
    let mut pool = ambient_pool(4, &[]);
    assert_eq!(pool.spawn_along_edges(0.0), None);
    assert!(pool.is_empty());
    pool.update(100.0, 0.1);
    assert!(pool.vertices().is_empty());
}

#[test]
fn arcs_expire_after_their_lifetime() {
    let mesh = mesh();
    let mut pool = ambient_pool(8, &mesh.edges);
    pool.spawn_along_edges(0.0).unwrap();
    pool.update(AMBIENT_LIFETIME_MS.0 * 0.5, 0.016);
    assert_eq!(pool.len(), 1);
    let ratio = pool.arcs().next().unwrap().params.lifetime_ratio;
    assert!(ratio > 0.0 && ratio < 1.0);

    pool.update(AMBIENT_LIFETIME_MS.1 + 1.0, 0.016);
    assert!(pool.is_empty());
    assert_eq!(pool.stats().expired, 1);
}

#[test]
fn vertices_form_a_line_list_with_shared_params() {
    let mesh = mesh();
    let mut pool = ambient_pool(4, &mesh.edges);
    pool.set_field_intensity(1.1);
    pool.spawn_along_edges(0.0).unwrap();
    pool.update(100.0, 0.1);
    let verts = pool.vertices();
    assert!(!verts.is_empty());
    assert_eq!(verts.len() % 2, 0);
    assert!(verts.len() <= pool.max_vertices());
    assert_eq!(verts[0].along, 0.0);
    assert_eq!(verts[verts.len() - 1].along, 1.0);
    for v in verts {
        assert!((v.params[1] - 1.1).abs() < 1e-6);
        assert_eq!(v.params[2], TRAIL_LENGTH);
    }
}

#[test]
fn trails_follow_the_flag() {
    let mesh = mesh();
    let mut pool = EffectPool::new(
        PoolConfig::ambient(4, true),
        &mesh.edges,
        SeededRandom::new(1),
    );
    pool.spawn_along_edges(0.0).unwrap();
    pool.update(10.0, 0.01);
    assert!(pool.vertices().iter().all(|v| v.params[2] == 0.0));
    pool.set_trails(true);
    pool.update(20.0, 0.01);
    assert!(pool.vertices().iter().all(|v| v.params[2] == TRAIL_LENGTH));
}

#[test]
fn reactive_arc_joins_the_two_points() {
    let mut pool = EffectPool::new(
        PoolConfig::reactive(REACTIVE_MAX_ARCS, false),
        &[],
        SeededRandom::derive(42, stream::REACTIVE_FX),
    );
    let a = Vec3::new(1.0, 0.0, 5.0);
    let b = Vec3::new(-1.0, 2.0, 8.0);
    pool.spawn_between(a, b, 0.0);
    let arc = pool.arcs().next().unwrap();
    assert_eq!(arc.path.len(), REACTIVE_SAMPLES);
    assert!(arc.path[0].distance(a) < 1e-5);
    assert!(arc.path[REACTIVE_SAMPLES - 1].distance(b) < 1e-5);
    assert!(arc.lifetime_ms >= REACTIVE_LIFETIME_MS.0 && arc.lifetime_ms <= REACTIVE_LIFETIME_MS.1);
}

#[test]
fn bowed_path_bends_away_from_the_chord() {
    let a = Vec3::ZERO;
    let b = Vec3::new(4.0, 0.0, 0.0);
    let path = bowed(a, b, 0.25, 9);
    assert_eq!(path.len(), 9);
    let mid = path[4];
    // peak offset of a quadratic Bezier is half the control offset
    assert!((mid.distance(Vec3::new(2.0, 0.0, 0.0)) - 0.5).abs() < 1e-4);
}

#[test]
fn random_walk_follows_mesh_edges() {
    let mesh = mesh();
    let key = |p: Vec3| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
    let edge_set: HashSet<_> = mesh
        .edges
        .iter()
        .flat_map(|e| [(key(e.from), key(e.to)), (key(e.to), key(e.from))])
        .collect();
    let graph = EdgeGraph::new(&mesh.edges);
    let mut rng = SeededRandom::new(5);
    for _ in 0..20 {
        let walk = graph.random_walk(8, &mut rng);
        assert_eq!(walk.len(), 9);
        for w in walk.windows(2) {
            assert!(edge_set.contains(&(key(w[0]), key(w[1]))));
        }
    }
    assert!(EdgeGraph::new(&[]).random_walk(8, &mut rng).is_empty());
}

#[test]
fn smoothing_passes_through_control_points() {
    let pts = [
        Vec3::ZERO,
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(3.0, 1.0, 1.0),
    ];
    let out = smooth(&pts);
    assert_eq!(out.len(), 3 * PATH_SUBDIVISIONS + 1);
    for (i, p) in pts.iter().enumerate() {
        assert!(out[i * PATH_SUBDIVISIONS].distance(*p) < 1e-5);
    }
}

#[test]
fn refresh_edges_replaces_the_cache() {
    let mesh = mesh();
    let mut pool = ambient_pool(4, &[]);
    assert_eq!(pool.edge_count(), 0);
    pool.refresh_edges(&mesh.edges);
    assert_eq!(pool.edge_count(), mesh.edges.len());
    assert!(pool.spawn_along_edges(0.0).is_some());
    pool.dispose();
    assert!(pool.is_empty());
    assert_eq!(pool.edge_count(), 0);
}

#[test]
fn cadence_waits_one_jittered_interval() {
    let mut cadence = AmbientCadence::new(2.0, false, SeededRandom::new(3));
    // first call only arms the timer
    assert!(!cadence.should_spawn(0.0));
    // 500ms nominal interval, jitter within [0.8, 1.2]
    assert!(!cadence.should_spawn(390.0));
    assert!(cadence.should_spawn(610.0));
    assert!(!cadence.should_spawn(620.0));
}

#[test]
fn cadence_spawn_count_tracks_rate() {
    let mut cadence = AmbientCadence::new(AMBIENT_BASE_RATE, false, SeededRandom::new(11));
    let mut spawned = 0;
    let mut t = 0.0;
    while t < 60_000.0 {
        if cadence.should_spawn(t) {
            spawned += 1;
        }
        t += 16.0;
    }
    // ~1.6/s over a minute, allowing for jitter and frame quantisation
    assert!((80..=110).contains(&spawned), "spawned {spawned}");
}

#[test]
fn reduced_motion_halves_the_rate() {
    let full = AmbientCadence::new(2.0, false, SeededRandom::new(1));
    let reduced = AmbientCadence::new(2.0, true, SeededRandom::new(1));
    assert_eq!(full.effective_rate(0.0), 2.0);
    assert_eq!(reduced.effective_rate(0.0), 1.0);
}

#[test]
fn rate_boost_decays_back_to_base() {
    let mut cadence = AmbientCadence::new(1.6, false, SeededRandom::new(1));
    cadence.boost_rate(LINK_RATE_BOOST, LINK_RATE_BOOST_MS, 1000.0);
    assert!((cadence.effective_rate(1000.0) - 4.6).abs() < 1e-5);
    let mut prev = f32::MAX;
    let mut t = 1000.0;
    while t < 1000.0 + LINK_RATE_BOOST_MS + BOOST_DECAY_MS + 100.0 {
        let boost = cadence.current_boost(t);
        assert!(boost >= 0.0 && boost <= prev);
        prev = boost;
        t += 25.0;
    }
    assert_eq!(cadence.effective_rate(t), 1.6);
}
