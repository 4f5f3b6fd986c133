//! Fixed-step time integrators for a single particle
//!
//! Provides explicit Euler, semi-implicit Euler and position Verlet.
//! Every scheme is a pure function of the particle state and `dt`; the
//! result is a prediction that the collision resolver may still correct.

use serde::Deserialize;

use super::states::{NVec3, Particle};

/// Which integration scheme the simulator uses, chosen once for all particles
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    #[serde(rename = "euler")] // x' = x + dt v, v' = v + dt F/m
    EulerOrig,

    #[serde(rename = "euler_semi")] // v' first, then x' = x + dt v'
    EulerSemi,

    #[serde(rename = "verlet")] // position Verlet, needs a consistent prev_pos
    Verlet,
}

/// Damping applied to the Verlet displacement term
const VERLET_DAMPING: f64 = 1.0;

/// Predict the next position and velocity of `p` under its accumulated force
/// Returns `(pred_pos, pred_vel)`, leaving the particle untouched
pub fn integrate(solver: Solver, p: &Particle, dt: f64) -> (NVec3, NVec3) {
    if dt <= 0.0 { // frozen time, nothing moves
        return (p.cur_pos, p.cur_vel);
    }
    if !(p.mass > 0.0) { // no usable F/m
        return (p.cur_pos, p.cur_vel);
    }
    let accel = p.force / p.mass; // F/m

    match solver {
        Solver::EulerOrig => {
            let pred_pos = p.cur_pos + dt * p.cur_vel;
            let pred_vel = p.cur_vel + dt * accel;
            (pred_pos, pred_vel)
        }
        Solver::EulerSemi => {
            let pred_vel = p.cur_vel + dt * accel;
            let pred_pos = p.cur_pos + dt * pred_vel;
            (pred_pos, pred_vel)
        }
        Solver::Verlet => {
            // x_n+1 = x_n + k (x_n - x_n-1) + a dt^2
            let pred_pos = p.cur_pos + VERLET_DAMPING * (p.cur_pos - p.prev_pos) + accel * (dt * dt);
            // v_n+1 = (x_n+1 - x_n) / dt
            let pred_vel = (pred_pos - p.cur_pos) / dt;
            (pred_pos, pred_vel)
        }
    }
}
