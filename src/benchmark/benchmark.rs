use std::time::Instant;

use crate::geometry::Plane;
use crate::simulation::integrator::Solver;
use crate::simulation::octree::{Octree, OctreeSettings};
use crate::simulation::params::Parameters;
use crate::simulation::simulator::Simulator;
use crate::simulation::states::{NVec3, SizedParticle};

/// Deterministic scattered points, no rand needed
fn scattered_points(n: usize) -> Vec<NVec3> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            NVec3::new(
                (i_f * 0.37).sin() * 5.0,
                (i_f * 0.13).cos() * 5.0,
                (i_f * 0.07).sin() * 5.0,
            )
        })
        .collect()
}

/// Octree build time and radius queries against a brute-force scan
pub fn bench_octree() {
    let ns = [1000, 4000, 16000, 64000];
    let radius = 0.5;

    for n in ns {
        let points = scattered_points(n);

        let t0 = Instant::now();
        let tree = Octree::from_points(&points, OctreeSettings::default());
        let dt_build = t0.elapsed().as_secs_f64();

        // query at every 10th point
        let queries: Vec<NVec3> = points.iter().step_by(10).copied().collect();

        let t1 = Instant::now();
        let mut found_tree = 0;
        for q in &queries {
            found_tree += tree
                .radius_query(q, radius)
                .into_iter()
                .filter(|&j| (points[j] - q).norm_squared() <= radius * radius)
                .count();
        }
        let dt_tree = t1.elapsed().as_secs_f64();

        let t2 = Instant::now();
        let mut found_brute = 0;
        for q in &queries {
            found_brute += points.iter().filter(|p| (*p - q).norm_squared() <= radius * radius).count();
        }
        let dt_brute = t2.elapsed().as_secs_f64();

        println!(
            "N = {n:6}, build = {:8.6} s, octree = {:8.6} s, brute = {:8.6} s, leaves = {}, depth = {}, hits = {}/{}",
            dt_build,
            dt_tree,
            dt_brute,
            tree.leaf_count(),
            tree.depth(),
            found_tree,
            found_brute
        );
    }
}

/// Time per step of a box of colliding sized particles, for each solver
pub fn bench_step() {
    let ns = [100, 200, 400, 800];
    let steps = 50;

    for solver in [Solver::EulerOrig, Solver::EulerSemi, Solver::Verlet] {
        for n in ns {
            let mut sim = Simulator::with_parameters(Parameters {
                dt: 0.005,
                solver,
                visc_drag: 0.0,
                particle_collisions: true,
            });
            sim.add_gravity_acceleration(NVec3::new(0.0, -9.81, 0.0));
            sim.add_geometry(Plane::new(NVec3::y(), NVec3::zeros()));

            for (i, x) in scattered_points(n).into_iter().enumerate() {
                let mut p = SizedParticle::new(x + NVec3::new(0.0, 6.0, 0.0), 0.05);
                p.particle.lifetime = f64::INFINITY;
                p.particle.cur_vel = NVec3::new((i % 3) as f64 - 1.0, 0.0, 0.0);
                sim.insert_sized_particle(p);
            }

            let t0 = Instant::now();
            for _ in 0..steps {
                sim.apply_time_step();
            }
            let per_step = t0.elapsed().as_secs_f64() / steps as f64;

            println!("{:?}: N = {n:4}, {:8.6} s/step", solver, per_step);
        }
    }
}
