//! The simulation driver
//!
//! [`Simulator`] owns every particle collection, the fixed geometry, the
//! force fields, meshes and fluids, and advances all of them by one time
//! step in a fixed order: sized particles, agents, free particles, meshes,
//! then fluids.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace, warn};

use crate::geometry::Geometry;
use crate::simulation::collision::{pair_mut, resolve_geometry, resolve_pair};
use crate::simulation::emitter::Emitter;
use crate::simulation::fluids::Fluid;
use crate::simulation::forces::{compute_forces, Field, FieldSet, Gravity};
use crate::simulation::integrator::{integrate, Solver};
use crate::simulation::meshes::Mesh;
use crate::simulation::params::Parameters;
use crate::simulation::states::{AgentParticle, NVec3, Particle, PointMass, SizedParticle};

pub struct Simulator {
    free: Vec<Particle>,
    sized: Vec<SizedParticle>,
    agents: Vec<AgentParticle>,
    geometry: Vec<Geometry>,
    fields: FieldSet,
    meshes: Vec<Box<dyn Mesh>>,
    fluids: Vec<Fluid>,
    params: Parameters,
    free_emitter: Emitter,
    sized_emitter: Emitter,
    pool: Option<ThreadPool>, // workers of the parallel fluid stage
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_parameters(Parameters::default())
    }

    pub fn with_parameters(params: Parameters) -> Self {
        Self {
            free: Vec::new(),
            sized: Vec::new(),
            agents: Vec::new(),
            geometry: Vec::new(),
            fields: FieldSet::new(),
            meshes: Vec::new(),
            fluids: Vec::new(),
            params,
            free_emitter: Emitter::default(),
            sized_emitter: Emitter::default(),
            pool: None,
        }
    }

    // ========================================================================
    // Particles
    // ========================================================================

    /// Add a free particle initialised by the free emitter. Returns its index.
    pub fn add_free_particle(&mut self) -> usize {
        let mut p = Particle {
            index: self.free.len(),
            ..Particle::default()
        };
        self.free_emitter.emit(&mut p);
        p.sync_previous(self.params.dt);
        self.free.push(p);
        debug!(index = self.free.len() - 1, "added free particle");
        self.free.len() - 1
    }

    pub fn add_free_particles(&mut self, n: usize) {
        for _ in 0..n {
            self.add_free_particle();
        }
    }

    /// Add an already initialised free particle. Returns its index.
    pub fn insert_free_particle(&mut self, mut p: Particle) -> usize {
        p.index = self.free.len();
        p.sync_previous(self.params.dt);
        self.free.push(p);
        self.free.len() - 1
    }

    /// Add a sized particle initialised by the sized emitter. Returns its index.
    pub fn add_sized_particle(&mut self) -> usize {
        let mut p = SizedParticle::default();
        p.particle.index = self.sized.len();
        self.sized_emitter.emit(&mut p);
        p.particle.sync_previous(self.params.dt);
        self.sized.push(p);
        debug!(index = self.sized.len() - 1, "added sized particle");
        self.sized.len() - 1
    }

    pub fn add_sized_particles(&mut self, n: usize) {
        for _ in 0..n {
            self.add_sized_particle();
        }
    }

    /// Add an already initialised sized particle. Returns its index.
    pub fn insert_sized_particle(&mut self, mut p: SizedParticle) -> usize {
        p.particle.index = self.sized.len();
        p.particle.sync_previous(self.params.dt);
        self.sized.push(p);
        self.sized.len() - 1
    }

    /// Agents are not emitted: the caller provides their full state
    pub fn add_agent_particle(&mut self, mut a: AgentParticle) -> usize {
        a.particle.index = self.agents.len();
        a.particle.sync_previous(self.params.dt);
        self.agents.push(a);
        debug!(index = self.agents.len() - 1, "added agent particle");
        self.agents.len() - 1
    }

    /// Remove the `i`-th free particle; the last particle takes its place
    pub fn remove_free_particle(&mut self, i: usize) -> Option<Particle> {
        let removed = swap_remove_reindex(&mut self.free, i)?;
        debug!(index = i, "removed free particle");
        Some(removed)
    }

    pub fn remove_sized_particle(&mut self, i: usize) -> Option<SizedParticle> {
        let removed = swap_remove_reindex(&mut self.sized, i)?;
        debug!(index = i, "removed sized particle");
        Some(removed)
    }

    pub fn remove_agent_particle(&mut self, i: usize) -> Option<AgentParticle> {
        let removed = swap_remove_reindex(&mut self.agents, i)?;
        debug!(index = i, "removed agent particle");
        Some(removed)
    }

    pub fn clear_free_particles(&mut self) {
        self.free.clear();
    }

    pub fn clear_sized_particles(&mut self) {
        self.sized.clear();
    }

    pub fn clear_agent_particles(&mut self) {
        self.agents.clear();
    }

    /// Remove particles of every kind
    pub fn clear_particles(&mut self) {
        self.clear_free_particles();
        self.clear_sized_particles();
        self.clear_agent_particles();
    }

    // ========================================================================
    // Geometry, fields, meshes and fluids
    // ========================================================================

    pub fn add_geometry(&mut self, g: impl Into<Geometry>) -> usize {
        let g = g.into();
        if g.is_degenerate() {
            warn!("degenerate geometry added, it will never collide");
        }
        self.geometry.push(g);
        debug!(index = self.geometry.len() - 1, "added geometry");
        self.geometry.len() - 1
    }

    /// Order-preserving: geometry is tested in insertion order
    pub fn remove_geometry(&mut self, i: usize) -> Option<Geometry> {
        if i < self.geometry.len() {
            Some(self.geometry.remove(i))
        } else {
            None
        }
    }

    pub fn clear_geometry(&mut self) {
        self.geometry.clear();
    }

    pub fn add_field(&mut self, f: impl Field + Send + Sync + 'static) {
        self.fields.push(Box::new(f));
        debug!(fields = self.fields.len(), "added force field");
    }

    /// Uniform gravity `g` acting on every particle
    pub fn add_gravity_acceleration(&mut self, g: NVec3) {
        self.add_field(Gravity { g });
    }

    pub fn remove_field(&mut self, i: usize) -> bool {
        self.fields.remove(i).is_some()
    }

    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }

    /// Take ownership of a mesh; its particles get a previous position
    /// consistent with their velocity
    pub fn add_mesh(&mut self, mut mesh: Box<dyn Mesh>) -> usize {
        let dt = self.params.dt;
        for p in mesh.particles_mut() {
            p.sync_previous(dt);
        }
        self.meshes.push(mesh);
        debug!(index = self.meshes.len() - 1, "added mesh");
        self.meshes.len() - 1
    }

    pub fn remove_mesh(&mut self, i: usize) -> Option<Box<dyn Mesh>> {
        if i < self.meshes.len() {
            Some(self.meshes.remove(i))
        } else {
            None
        }
    }

    pub fn clear_meshes(&mut self) {
        self.meshes.clear();
    }

    pub fn add_fluid(&mut self, mut fluid: Fluid) -> usize {
        let dt = self.params.dt;
        for p in fluid.particles_mut() {
            p.particle.sync_previous(dt);
        }
        self.fluids.push(fluid);
        debug!(index = self.fluids.len() - 1, "added fluid");
        self.fluids.len() - 1
    }

    pub fn clear_fluids(&mut self) {
        self.fluids.clear();
    }

    /// Remove everything the simulator owns. Parameters and emitters are kept.
    pub fn clear_simulation(&mut self) {
        self.clear_particles();
        self.clear_geometry();
        self.clear_fields();
        self.clear_meshes();
        self.clear_fluids();
        debug!("cleared simulation");
    }

    /// Re-emit every non-fixed free and sized particle
    pub fn reset_simulation(&mut self) {
        let dt = self.params.dt;
        for p in self.free.iter_mut().filter(|p| !p.fixed) {
            self.free_emitter.emit(p);
            p.sync_previous(dt);
        }
        for p in self.sized.iter_mut().filter(|p| !p.particle.fixed) {
            self.sized_emitter.emit(p);
            p.particle.sync_previous(dt);
        }
        debug!(free = self.free.len(), sized = self.sized.len(), "reset simulation");
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Negative or non-finite steps are rejected with a warning
    pub fn set_time_step(&mut self, dt: f64) {
        if !(dt >= 0.0) || !dt.is_finite() {
            warn!(dt, "ignoring invalid time step");
            return;
        }
        self.params.dt = dt;
    }

    pub fn set_viscous_drag(&mut self, drag: f64) {
        if !(drag >= 0.0) || !drag.is_finite() {
            warn!(drag, "ignoring invalid viscous drag");
            return;
        }
        self.params.visc_drag = drag;
    }

    pub fn set_solver(&mut self, solver: Solver) {
        self.params.solver = solver;
    }

    pub fn set_particle_particle_collisions(&mut self, on: bool) {
        self.params.particle_collisions = on;
    }

    pub fn set_free_emitter(&mut self, emitter: Emitter) {
        self.free_emitter = emitter;
    }

    pub fn set_sized_emitter(&mut self, emitter: Emitter) {
        self.sized_emitter = emitter;
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn time_step(&self) -> f64 {
        self.params.dt
    }

    pub fn solver(&self) -> Solver {
        self.params.solver
    }

    pub fn viscous_drag(&self) -> f64 {
        self.params.visc_drag
    }

    pub fn particle_particle_collisions(&self) -> bool {
        self.params.particle_collisions
    }

    pub fn free_particles(&self) -> &[Particle] {
        &self.free
    }

    pub fn sized_particles(&self) -> &[SizedParticle] {
        &self.sized
    }

    pub fn agent_particles(&self) -> &[AgentParticle] {
        &self.agents
    }

    pub fn free_particles_mut(&mut self) -> &mut [Particle] {
        &mut self.free
    }

    pub fn sized_particles_mut(&mut self) -> &mut [SizedParticle] {
        &mut self.sized
    }

    pub fn agent_particles_mut(&mut self) -> &mut [AgentParticle] {
        &mut self.agents
    }

    pub fn geometry(&self) -> &[Geometry] {
        &self.geometry
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn meshes(&self) -> &[Box<dyn Mesh>] {
        &self.meshes
    }

    pub fn fluids(&self) -> &[Fluid] {
        &self.fluids
    }

    pub fn fluids_mut(&mut self) -> &mut [Fluid] {
        &mut self.fluids
    }

    pub fn free_emitter(&self) -> &Emitter {
        &self.free_emitter
    }

    pub fn sized_emitter(&self) -> &Emitter {
        &self.sized_emitter
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advance everything by one time step
    pub fn apply_time_step(&mut self) {
        self.simulate_sized_particles();
        self.simulate_agent_particles();
        self.simulate_free_particles();
        self.simulate_meshes();
        self.simulate_fluids();
    }

    /// Same as [`Simulator::apply_time_step`] with the fluid stage split
    /// over `n` worker threads. `n <= 1` runs everything sequentially.
    pub fn apply_time_step_parallel(&mut self, n: usize) {
        self.simulate_sized_particles();
        self.simulate_agent_particles();
        self.simulate_free_particles();
        self.simulate_meshes();
        if n <= 1 {
            self.simulate_fluids();
        } else {
            self.simulate_fluids_parallel(n);
        }
    }

    pub fn simulate_free_particles(&mut self) {
        trace!(n = self.free.len(), "free particles");
        let params = &self.params;
        for i in 0..self.free.len() {
            let p = &mut self.free[i];
            if !advance(p, &mut self.free_emitter, &self.fields, &self.geometry, params) {
                continue;
            }
            if !params.particle_collisions {
                continue;
            }
            // free particles only collide with radius-bearing ones
            for s in self.sized.iter_mut() {
                resolve_pair(p, s, params.solver, params.dt);
            }
            for a in self.agents.iter_mut() {
                resolve_pair(p, a, params.solver, params.dt);
            }
        }
    }

    pub fn simulate_sized_particles(&mut self) {
        trace!(n = self.sized.len(), "sized particles");
        let params = &self.params;
        for i in 0..self.sized.len() {
            if !advance(&mut self.sized[i], &mut self.sized_emitter, &self.fields, &self.geometry, params) {
                continue;
            }
            if !params.particle_collisions {
                continue;
            }
            for j in i + 1..self.sized.len() {
                let (p, q) = pair_mut(&mut self.sized, i, j);
                resolve_pair(p, q, params.solver, params.dt);
            }
            let p = &mut self.sized[i];
            for a in self.agents.iter_mut() {
                resolve_pair(p, a, params.solver, params.dt);
            }
        }
    }

    /// Agents steer toward their target instead of feeling the fields. They
    /// never expire.
    pub fn simulate_agent_particles(&mut self) {
        trace!(n = self.agents.len(), "agent particles");
        let params = &self.params;
        let dt = params.dt;
        for i in 0..self.agents.len() {
            let a = &mut self.agents[i];
            if a.particle.fixed {
                continue;
            }
            a.particle.reduce_lifetime(dt);

            // steering force and a semi-implicit Euler step capped at max speed
            a.particle.force = truncate(a.target - a.particle.cur_pos, a.max_force);
            let (pred_pos, pred_vel) = if dt > 0.0 && a.particle.mass > 0.0 {
                let pred_vel = truncate(a.particle.cur_vel + a.particle.force * (dt / a.particle.mass), a.max_speed);
                (a.particle.cur_pos + pred_vel * dt, pred_vel)
            } else {
                (a.particle.cur_pos, a.particle.cur_vel)
            };
            resolve_geometry(a, pred_pos, pred_vel, &self.geometry, params.solver, dt);

            if params.particle_collisions {
                let a = &mut self.agents[i];
                for s in self.sized.iter_mut() {
                    resolve_pair(a, s, params.solver, dt);
                }
                for j in i + 1..self.agents.len() {
                    let (a, b) = pair_mut(&mut self.agents, i, j);
                    resolve_pair(a, b, params.solver, dt);
                }
            }

            // seek: turn the velocity toward the target at full speed
            let a = &mut self.agents[i];
            let to_target = a.target - a.particle.cur_pos;
            let desired = match to_target.try_normalize(f64::EPSILON) {
                Some(u) => u * a.max_speed,
                None => NVec3::zeros(),
            };
            let steer = desired - a.particle.cur_vel;
            a.particle.cur_vel = truncate(a.particle.cur_vel + steer, a.max_speed);
        }
    }

    pub fn simulate_meshes(&mut self) {
        trace!(n = self.meshes.len(), "meshes");
        let params = &self.params;
        for mesh in self.meshes.iter_mut() {
            for p in mesh.particles_mut() {
                p.force = NVec3::zeros();
            }
            mesh.update_forces();

            for p in mesh.particles_mut().iter_mut().filter(|p| !p.fixed) {
                compute_forces(&self.fields, params.visc_drag, p);
                let (pred_pos, pred_vel) = integrate(params.solver, p, params.dt);
                resolve_geometry(p, pred_pos, pred_vel, &self.geometry, params.solver, params.dt);
            }

            for p in mesh.particles_mut() {
                p.force = NVec3::zeros();
            }
        }
    }

    pub fn simulate_fluids(&mut self) {
        trace!(n = self.fluids.len(), "fluids");
        let params = &self.params;
        for fluid in self.fluids.iter_mut() {
            fluid.update_forces();
            for p in fluid.particles_mut().iter_mut().filter(|p| !p.particle.fixed) {
                step_fluid_particle(p, &self.fields, &self.geometry, params);
            }
        }
    }

    /// Fluid stage on a pool of `n` threads. Falls back to the sequential
    /// stage when the pool cannot be created.
    fn simulate_fluids_parallel(&mut self, n: usize) {
        trace!(n = self.fluids.len(), threads = n, "fluids (parallel)");
        let reuse = self.pool.as_ref().is_some_and(|p| p.current_num_threads() == n);
        if !reuse {
            match ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => self.pool = Some(pool),
                Err(e) => {
                    warn!(error = %e, threads = n, "could not build thread pool, running fluids sequentially");
                    self.pool = None;
                    self.simulate_fluids();
                    return;
                }
            }
        }
        let Some(pool) = self.pool.as_ref() else {
            self.simulate_fluids();
            return;
        };

        let params = &self.params;
        let fields = &self.fields;
        let geometry = &self.geometry;
        let fluids = &mut self.fluids;
        pool.install(|| {
            for fluid in fluids.iter_mut() {
                fluid.update_forces_parallel();
                fluid
                    .particles_mut()
                    .par_iter_mut()
                    .filter(|p| !p.particle.fixed)
                    .for_each(|p| step_fluid_particle(p, fields, geometry, params));
            }
        });
    }
}

/// Fields, drag, integration and geometry pass of one fluid particle. The SPH
/// force must already be in `force`.
fn step_fluid_particle<P: PointMass>(p: &mut P, fields: &FieldSet, geometry: &[Geometry], params: &Parameters) {
    compute_forces(fields, params.visc_drag, p.state_mut());
    let (pred_pos, pred_vel) = integrate(params.solver, p.state(), params.dt);
    resolve_geometry(p, pred_pos, pred_vel, geometry, params.solver, params.dt);
}

/// Shared first part of the free and sized particle loops: lifetime and
/// start-time bookkeeping, forces, integration and geometry pass.
///
/// Returns `false` when the particle did not move this step (fixed,
/// re-emitted or not started yet).
fn advance<P: PointMass>(
    p: &mut P,
    emitter: &mut Emitter,
    fields: &FieldSet,
    geometry: &[Geometry],
    params: &Parameters,
) -> bool {
    let dt = params.dt;
    if p.state().fixed {
        return false;
    }
    if p.state().lifetime <= 0.0 {
        // re-emitted in place, simulated again from the next step
        emitter.emit(p);
        p.state_mut().sync_previous(dt);
        return false;
    }

    let s = p.state_mut();
    s.reduce_starttime(dt);
    if s.starttime > 0.0 {
        return false;
    }

    s.force = NVec3::zeros();
    compute_forces(fields, params.visc_drag, s);
    s.reduce_lifetime(dt);

    let (pred_pos, pred_vel) = integrate(params.solver, p.state(), dt);
    resolve_geometry(p, pred_pos, pred_vel, geometry, params.solver, dt);
    true
}

/// Scale `v` down to length `max` if it is longer
fn truncate(v: NVec3, max: f64) -> NVec3 {
    let len = v.norm();
    if len > max && len > 0.0 {
        v * (max / len)
    } else {
        v
    }
}

/// `swap_remove` that keeps each particle's `index` equal to its position
fn swap_remove_reindex<P: PointMass>(v: &mut Vec<P>, i: usize) -> Option<P> {
    if i >= v.len() {
        return None;
    }
    let removed = v.swap_remove(i);
    if let Some(moved) = v.get_mut(i) {
        moved.state_mut().index = i;
    }
    Some(removed)
}
