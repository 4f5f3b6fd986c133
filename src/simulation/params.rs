//! Numerical and physical parameters for the simulator
//!
//! `Parameters` holds runtime settings:
//! - time step and integration scheme,
//! - viscous drag coefficient,
//! - whether particle-particle collisions are resolved

use crate::simulation::integrator::Solver;

#[derive(Debug, Clone)]
pub struct Parameters {
    pub dt: f64, // step size
    pub solver: Solver, // integration scheme
    pub visc_drag: f64, // velocity-proportional drag coefficient
    pub particle_collisions: bool, // pair pass on/off
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            dt: 0.01,
            solver: Solver::EulerSemi,
            visc_drag: 0.05,
            particle_collisions: false,
        }
    }
}
