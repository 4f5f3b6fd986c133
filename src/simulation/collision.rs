//! Collision resolution for one particle in one time step
//!
//! The geometry pass tests the predicted motion against fixed geometry, the pair pass
//! corrects overlapping pairs of particles. Both are written once over
//! the [`PointMass`] capability and shared by every particle kind.

use crate::geometry::Geometry;
use crate::simulation::integrator::Solver;
use crate::simulation::states::{NVec3, Particle, PointMass};

/// Distance a center found inside another particle is pushed past its surface
pub const CONTACT_EPS: f64 = 1e-3;

/// Squared center distances below this carry no usable collision axis
pub const MIN_DIST2: f64 = 1e-12;

// ============================================================================
// Geometry pass
// ============================================================================

/// Test the prediction of `p` against every geometry in order.
///
/// Resolution does not stop at the first hit: each correction becomes the
/// prediction tested against the remaining geometry, so a particle may be
/// corrected several times in one step. With the Verlet solver `prev_pos`
/// is re-derived from every corrected state.
///
/// Returns the corrected state, or `None` when nothing was hit.
pub fn geometry_phase(
    geometry: &[Geometry],
    p: &Particle,
    radius: Option<f64>,
    pred_pos: NVec3,
    pred_vel: NVec3,
    solver: Solver,
    dt: f64,
) -> Option<Particle> {
    let mut pred_pos = pred_pos;
    let mut pred_vel = pred_vel;
    let mut corrected = None;

    for g in geometry {
        let mut out = p.clone();
        if g.update(&pred_pos, &pred_vel, p, radius, &mut out) {
            if solver == Solver::Verlet {
                out.sync_previous(dt);
            }
            pred_pos = out.cur_pos;
            pred_vel = out.cur_vel;
            corrected = Some(out);
        }
    }
    corrected
}

/// Run the geometry pass on a particle and commit the outcome.
///
/// Without a collision the prediction is accepted (`prev_pos` becomes the
/// old position); otherwise the corrected state replaces the particle's.
/// Returns whether any geometry was hit.
pub fn resolve_geometry<P: PointMass + ?Sized>(
    p: &mut P,
    pred_pos: NVec3,
    pred_vel: NVec3,
    geometry: &[Geometry],
    solver: Solver,
    dt: f64,
) -> bool {
    let radius = p.radius();
    match geometry_phase(geometry, p.state(), radius, pred_pos, pred_vel, solver, dt) {
        Some(c) => {
            *p.state_mut() = c;
            true
        }
        None => {
            commit(p.state_mut(), pred_pos, pred_vel);
            false
        }
    }
}

/// Accept a prediction unchanged
pub fn commit(p: &mut Particle, pred_pos: NVec3, pred_vel: NVec3) {
    p.save_position();
    p.cur_pos = pred_pos;
    p.cur_vel = pred_vel;
}

// ============================================================================
// Pair pass: particle against particle
// ============================================================================

/// Whether the spheres of `a` and `b` touch. Radius-less particles count as
/// spheres of radius zero.
pub fn overlapping<A, B>(a: &A, b: &B) -> bool
where
    A: PointMass + ?Sized,
    B: PointMass + ?Sized,
{
    let sum_r = a.radius().unwrap_or(0.0) + b.radius().unwrap_or(0.0);
    (a.state().cur_pos - b.state().cur_pos).norm_squared() <= sum_r * sum_r
}

/// Resolve the collision of two particles whose current positions hold this
/// step's committed prediction.
///
/// Positions are separated until the spheres are tangent, then the elastic
/// impulse is applied along the center line. Fixed particles are never
/// moved; their partner takes the whole correction. Pairs whose centers
/// (almost) coincide are skipped. Returns whether a correction happened.
pub fn resolve_pair<A, B>(a: &mut A, b: &mut B, solver: Solver, dt: f64) -> bool
where
    A: PointMass + ?Sized,
    B: PointMass + ?Sized,
{
    if !overlapping(&*a, &*b) {
        return false;
    }
    let ra = a.radius().unwrap_or(0.0);
    let rb = b.radius().unwrap_or(0.0);
    let (pa, pb) = (a.state_mut(), b.state_mut());
    if pa.fixed && pb.fixed {
        return false;
    }
    if (pb.cur_pos - pa.cur_pos).norm_squared() < MIN_DIST2 {
        return false;
    }

    separate(pa, ra, pb, rb);
    elastic_impulse(pa, pb);

    if solver == Solver::Verlet {
        if !pa.fixed {
            pa.sync_previous(dt);
        }
        if !pb.fixed {
            pb.sync_previous(dt);
        }
    }
    true
}

/// Move the centers of two overlapping spheres apart along the center line
/// until they are tangent.
///
/// A center lying strictly inside the other sphere is first pushed to that
/// sphere's surface plus [`CONTACT_EPS`]. The remaining overlap is split
/// with the circle-circle intersection distances: each sphere moves by the
/// depth of its cap beyond the radical plane.
pub fn separate(a: &mut Particle, ra: f64, b: &mut Particle, rb: f64) {
    let d = b.cur_pos - a.cur_pos;
    let dist = d.norm();
    if dist * dist < MIN_DIST2 {
        return;
    }
    let u = d / dist; // from a to b

    // the smaller sphere's center sits inside the larger one
    let (inner_is_b, outer_r) = if rb <= ra { (true, ra) } else { (false, rb) };
    if dist < outer_r {
        let move_b = if a.fixed { true } else if b.fixed { false } else { inner_is_b };
        if move_b {
            b.cur_pos = a.cur_pos + u * (outer_r + CONTACT_EPS);
        } else {
            a.cur_pos = b.cur_pos - u * (outer_r + CONTACT_EPS);
        }
    }

    let dist = (b.cur_pos - a.cur_pos).norm();
    let overlap = ra + rb - dist;
    if overlap <= 0.0 {
        return;
    }

    // distance from a's center to the radical plane
    let d1 = (dist * dist + ra * ra - rb * rb) / (2.0 * dist);
    let mut move_a = (ra - d1).clamp(0.0, overlap);
    let mut move_b = overlap - move_a;
    if a.fixed {
        move_a = 0.0;
        move_b = overlap;
    } else if b.fixed {
        move_a = overlap;
        move_b = 0.0;
    }

    a.cur_pos -= u * move_a;
    b.cur_pos += u * move_b;
}

/// Two-body elastic collision along the center line:
/// `v1' = v1 - 2 m2 / (m1 + m2) * <v1 - v2, p1 - p2> / |p1 - p2|^2 * (p1 - p2)`
/// and symmetrically for `v2'`. A fixed particle acts as an infinite mass.
/// Returns `false` (no change) when the centers nearly coincide.
pub fn elastic_impulse(a: &mut Particle, b: &mut Particle) -> bool {
    let d = a.cur_pos - b.cur_pos;
    let d2 = d.norm_squared();
    if d2 < MIN_DIST2 {
        return false;
    }
    let wa = if a.fixed { 0.0 } else { 1.0 / a.mass }; // inverse masses
    let wb = if b.fixed { 0.0 } else { 1.0 / b.mass };
    let wsum = wa + wb;
    if !(wsum > 0.0) || !wsum.is_finite() {
        return false;
    }

    let k = (a.cur_vel - b.cur_vel).dot(&d) / d2;
    a.cur_vel -= d * (2.0 * wa / wsum * k);
    b.cur_vel += d * (2.0 * wb / wsum * k);
    true
}

/// Mutable references to two distinct elements of a slice
pub(crate) fn pair_mut<T>(v: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert!(i < j, "pair_mut needs i < j");
    let (lo, hi) = v.split_at_mut(j);
    (&mut lo[i], &mut hi[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::states::SizedParticle;

    #[test]
    fn unequal_radii_become_tangent() {
        let mut a = SizedParticle::new(NVec3::zeros(), 2.0);
        let mut b = SizedParticle::new(NVec3::new(2.5, 0.0, 0.0), 1.0);
        assert!(resolve_pair(&mut a, &mut b, Solver::EulerSemi, 0.01));
        let dist = (b.particle.cur_pos - a.particle.cur_pos).norm();
        assert!((dist - 3.0).abs() < 1e-9, "dist {}", dist);
    }

    #[test]
    fn fixed_partner_does_not_move() {
        let mut a = SizedParticle::new(NVec3::zeros(), 1.0);
        a.particle.fixed = true;
        let mut b = SizedParticle::new(NVec3::new(1.5, 0.0, 0.0), 1.0);
        b.particle.cur_vel = NVec3::new(-1.0, 0.0, 0.0);
        assert!(resolve_pair(&mut a, &mut b, Solver::EulerSemi, 0.01));
        assert_eq!(a.particle.cur_pos, NVec3::zeros());
        assert_eq!(a.particle.cur_vel, NVec3::zeros());
        assert!((b.particle.cur_pos.x - 2.0).abs() < 1e-9);
        assert!((b.particle.cur_vel.x - 1.0).abs() < 1e-9, "vel {:?}", b.particle.cur_vel);
    }

    #[test]
    fn coincident_centers_are_skipped() {
        let mut a = SizedParticle::new(NVec3::zeros(), 1.0);
        let mut b = SizedParticle::new(NVec3::zeros(), 1.0);
        a.particle.cur_vel = NVec3::x();
        assert!(!resolve_pair(&mut a, &mut b, Solver::Verlet, 0.01));
        assert!(a.particle.cur_vel.iter().all(|c| c.is_finite()));
        assert_eq!(a.particle.cur_vel, NVec3::x());
    }

    #[test]
    fn point_inside_sized_is_pushed_to_surface() {
        let mut s = SizedParticle::new(NVec3::zeros(), 1.0);
        let mut p = Particle::at(NVec3::new(0.5, 0.0, 0.0));
        assert!(resolve_pair(&mut p, &mut s, Solver::EulerSemi, 0.01));
        assert!(p.cur_pos.x >= 1.0, "pos {:?}", p.cur_pos);
        assert_eq!(s.particle.cur_pos, NVec3::zeros());
    }
}
