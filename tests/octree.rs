use physim::simulation::octree::{child_bbox, NodeKind, Octree, OctreeSettings};
use physim::NVec3;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_points(n: usize, seed: u64) -> Vec<NVec3> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            NVec3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            )
        })
        .collect()
}

fn cube_corners() -> Vec<NVec3> {
    (0..8)
        .map(|k| NVec3::new((k & 1) as f64, ((k >> 1) & 1) as f64, ((k >> 2) & 1) as f64))
        .collect()
}

// ==================================================================================
// Structure
// ==================================================================================

#[test]
fn octree_every_point_in_exactly_one_leaf() {
    let points = random_points(2000, 42);
    let tree = Octree::from_points(&points, OctreeSettings::default());

    let mut seen = vec![0usize; points.len()];
    for node in 0..tree.nodes().len() {
        for &i in tree.leaf_indices(node) {
            seen[i] += 1;
        }
    }
    assert!(seen.iter().all(|&c| c == 1), "coverage counts {:?}", seen.iter().filter(|&&c| c != 1).count());

    for (node, n) in tree.nodes().iter().enumerate() {
        if let NodeKind::Leaf { len, .. } = n.kind {
            let depth_capped = tree.depth() >= tree.settings().max_depth;
            assert!(len <= tree.settings().lod || depth_capped, "leaf {} holds {} items", node, len);
        }
    }
}

#[test]
fn octree_children_tile_parent() {
    let points = random_points(500, 7);
    let tree = Octree::from_points(&points, OctreeSettings { lod: 4, ..Default::default() });

    for n in tree.nodes() {
        let NodeKind::Internal { children } = n.kind else {
            continue;
        };
        for (k, &c) in children.iter().enumerate() {
            let child = &tree.nodes()[c];
            let (cmin, cmax) = child_bbox(&n.min, &n.max, k);
            assert_eq!((child.min, child.max), (cmin, cmax), "child {} box mismatch", k);
            // the parent's center is a corner of every child
            for axis in 0..3 {
                let c = n.center[axis];
                assert!(child.min[axis] == c || child.max[axis] == c, "center not a corner of child {}", k);
            }
        }
    }
}

#[test]
fn octree_cube_corners_split_once() {
    let tree = Octree::from_points(&cube_corners(), OctreeSettings { lod: 1, ..Default::default() });
    assert_eq!(tree.depth(), 1);
    assert_eq!(tree.leaf_count(), 8);
    for node in 0..tree.nodes().len() {
        if node != tree.root() {
            assert_eq!(tree.leaf_indices(node).len(), 1, "leaf {} not holding one corner", node);
        }
    }
}

#[test]
fn octree_max_depth_caps_coincident_points() {
    let points = vec![NVec3::new(1.0, 2.0, 3.0); 20];
    let settings = OctreeSettings { lod: 2, max_depth: 5 };
    let tree = Octree::from_points(&points, settings);
    assert!(tree.depth() <= 5, "depth {}", tree.depth());
}

#[test]
fn octree_empty_input_is_a_single_leaf() {
    let tree = Octree::from_points(&[], OctreeSettings::default());
    assert_eq!(tree.depth(), 0);
    assert_eq!(tree.leaf_count(), 1);
    assert!(tree.point_query(&NVec3::zeros()).is_empty());
    assert!(tree.radius_query(&NVec3::zeros(), 1.0).is_empty());
}

// ==================================================================================
// Queries
// ==================================================================================

#[test]
fn octree_radius_query_never_misses() {
    let points = random_points(3000, 1);
    let tree = Octree::from_points(&points, OctreeSettings::default());
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..50 {
        let c = NVec3::new(rng.gen_range(-6.0..6.0), rng.gen_range(-6.0..6.0), rng.gen_range(-6.0..6.0));
        let r = rng.gen_range(0.1..2.0);
        let found = tree.radius_query(&c, r);
        for (i, p) in points.iter().enumerate() {
            if (p - c).norm() <= r {
                assert!(found.binary_search(&i).is_ok(), "point {} at {:?} missed by query {:?} r {}", i, p, c, r);
            }
        }
        assert!(found.windows(2).all(|w| w[0] < w[1]), "result not sorted and unique");
    }
}

#[test]
fn octree_point_query_finds_own_leaf() {
    let points = random_points(1000, 3);
    let tree = Octree::from_points(&points, OctreeSettings::default());
    for (i, p) in points.iter().enumerate() {
        assert!(tree.point_query(p).contains(&i), "point {} not in its leaf", i);
    }
    assert!(tree.point_query(&NVec3::repeat(100.0)).is_empty());
}

#[test]
fn octree_triangles_are_stored_by_number() {
    let vertices = vec![
        NVec3::new(0.0, 0.0, 0.0),
        NVec3::new(1.0, 0.0, 0.0),
        NVec3::new(0.0, 1.0, 0.0),
        NVec3::new(10.0, 10.0, 10.0),
        NVec3::new(11.0, 10.0, 10.0),
        NVec3::new(10.0, 11.0, 10.0),
    ];
    let triangles = [[0, 1, 2], [3, 4, 5]];
    let tree = Octree::from_triangles(&vertices, &triangles, OctreeSettings { lod: 1, ..Default::default() });

    let near_far = tree.point_query(&NVec3::new(10.0, 10.0, 10.0));
    assert!(near_far.contains(&1) && !near_far.contains(&0), "far query {:?}", near_far);
    let near_origin = tree.point_query(&NVec3::new(0.0, 0.0, 0.0));
    assert!(near_origin.contains(&0) && !near_origin.contains(&1), "origin query {:?}", near_origin);

    let all = tree.radius_query(&NVec3::repeat(5.0), 20.0);
    assert_eq!(all, vec![0, 1]);
}

#[test]
fn octree_triangle_is_stored_where_its_edge_passes() {
    let vertices = vec![
        // triangle 0: the edge 0-1 passes through the (-x, +y, +z) octant
        NVec3::new(-0.9, -0.1, 0.5),
        NVec3::new(0.1, 0.9, 0.5),
        NVec3::new(0.9, 0.9, 0.5),
        // triangle 1: small, inside the (-x, +y, +z) octant so it splits
        NVec3::new(-0.9, 0.9, 0.9),
        NVec3::new(-0.8, 0.9, 0.9),
        NVec3::new(-0.9, 0.8, 0.9),
        // triangle 2: spans the root box
        NVec3::new(-1.0, -1.0, -1.0),
        NVec3::new(1.0, -1.0, -1.0),
        NVec3::new(1.0, 1.0, 1.0),
    ];
    let triangles = [[0, 1, 2], [3, 4, 5], [6, 7, 8]];
    let tree = Octree::from_triangles(&vertices, &triangles, OctreeSettings { lod: 1, ..Default::default() });
    assert!(tree.depth() >= 2, "depth {}", tree.depth());

    // on the edge 0-1, away from all of triangle 0's vertices
    let on_edge = NVec3::new(-0.05, 0.75, 0.5);
    let found = tree.point_query(&on_edge);
    assert!(found.contains(&0), "edge point query {:?}", found);

    // an octant the triangle never reaches
    let below = tree.point_query(&NVec3::new(0.5, -0.5, -0.5));
    assert!(!below.contains(&0), "triangle 0 stored below its plane: {:?}", below);
}
