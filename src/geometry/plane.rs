//! Infinite plane `n . x + d = 0` with unit normal

use crate::simulation::states::{NVec3, Particle};

/// Denominators and normal lengths below this are treated as zero
const EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    normal: NVec3, // unit normal, zero when degenerate
    dconst: f64, // d in n . x + d = 0
}

impl Plane {
    /// Plane with normal `n` (normalised here) through `p`
    pub fn new(n: NVec3, p: NVec3) -> Self {
        let len = n.norm();
        let normal = if len > EPS { n / len } else { NVec3::zeros() };
        Self {
            normal,
            dconst: -p.dot(&normal),
        }
    }

    /// Plane through three points, normal `(p1 - p0) x (p2 - p0)`
    pub fn from_points(p0: &NVec3, p1: &NVec3, p2: &NVec3) -> Self {
        Self::new((p1 - p0).cross(&(p2 - p0)), *p1)
    }

    pub fn normal(&self) -> &NVec3 {
        &self.normal
    }

    pub fn constant(&self) -> f64 {
        self.dconst
    }

    /// A plane built from a zero normal; it never intersects anything
    pub fn is_degenerate(&self) -> bool {
        self.normal.norm_squared() < EPS
    }

    pub fn signed_distance(&self, p: &NVec3) -> f64 {
        self.normal.dot(p) + self.dconst
    }

    pub fn is_inside(&self, p: &NVec3, tol: f64) -> bool {
        !self.is_degenerate() && self.signed_distance(p).abs() <= tol
    }

    /// Orthogonal projection of `p` onto the plane
    pub fn project(&self, p: &NVec3) -> NVec3 {
        p - self.normal * self.signed_distance(p)
    }

    /// True when `p1` and `p2` are on different sides or one lies on the plane
    pub fn intersec_segment(&self, p1: &NVec3, p2: &NVec3) -> bool {
        if self.is_degenerate() {
            return false;
        }
        self.signed_distance(p1) * self.signed_distance(p2) <= 0.0
    }

    /// Intersection point of the segment with the plane, if any
    pub fn segment_intersection(&self, p1: &NVec3, p2: &NVec3) -> Option<NVec3> {
        if !self.intersec_segment(p1, p2) {
            return None;
        }
        let seg = p2 - p1;
        let denom = seg.dot(&self.normal);
        if denom.abs() < EPS {
            // segment lies in the plane
            return Some(*p1);
        }
        let r = (-self.dconst - p1.dot(&self.normal)) / denom;
        Some((1.0 - r) * *p1 + r * *p2)
    }

    pub fn intersec_sphere(&self, c: &NVec3, r: f64) -> bool {
        !self.is_degenerate() && self.signed_distance(c).abs() <= r
    }

    /// Collision response of a point particle.
    ///
    /// `p` holds the state before the step. Position and velocity are
    /// reflected with restitution `p.bouncing`, then the tangential part of
    /// the pre-step velocity is damped by `p.friction`.
    pub fn update_particle(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle) {
        p.save_position();
        let n = self.normal;
        let bounce = p.bouncing;

        let wn = n * self.signed_distance(pred_pos);
        p.cur_pos = pred_pos - (1.0 + bounce) * wn;

        let vt = p.cur_vel; // velocity before the step
        p.cur_vel = pred_vel - n * ((1.0 + bounce) * n.dot(pred_vel));

        let v_tangent = vt - n * n.dot(&vt);
        p.cur_vel -= p.friction * v_tangent;
    }

    /// Collision response against a one-sided plane: only a predicted
    /// position behind the plane is reflected, and only an approaching
    /// velocity is bounced.
    pub fn push_out(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle) {
        p.save_position();
        let n = self.normal;
        let bounce = p.bouncing;

        let pen = self.signed_distance(pred_pos).min(0.0);
        p.cur_pos = pred_pos - (1.0 + bounce) * pen * n;

        let vt = p.cur_vel;
        let vn = n.dot(pred_vel);
        if vn < 0.0 {
            p.cur_vel = pred_vel - n * ((1.0 + bounce) * vn);
            let v_tangent = vt - n * n.dot(&vt);
            p.cur_vel -= p.friction * v_tangent;
        } else {
            p.cur_vel = *pred_vel;
        }
    }

    /// Collision response of a particle of radius `r`: reflect against the
    /// copy of this plane shifted by `r` toward the side the particle comes from
    pub fn update_sized(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle, r: f64) {
        let side = self.side_of(&p.cur_pos, pred_pos);
        let n = self.normal * side;
        let on_plane = self.project(pred_pos);
        Plane::new(n, on_plane + n * r).push_out(pred_pos, pred_vel, p);
    }

    /// +1 or -1: the side of `from`, falling back to the side of `to`
    pub(crate) fn side_of(&self, from: &NVec3, to: &NVec3) -> f64 {
        let d = self.signed_distance(from);
        if d.abs() > EPS {
            return d.signum();
        }
        let d = self.signed_distance(to);
        if d.abs() > EPS { d.signum() } else { 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_orientation() {
        let pl = Plane::from_points(&NVec3::zeros(), &NVec3::x(), &NVec3::y());
        assert!((pl.normal() - NVec3::z()).norm() < 1e-12);
        assert!(pl.constant().abs() < 1e-12);
    }

    #[test]
    fn segment_intersection_point() {
        let pl = Plane::new(NVec3::y(), NVec3::zeros());
        let i = pl
            .segment_intersection(&NVec3::new(1.0, 2.0, 0.0), &NVec3::new(1.0, -2.0, 0.0))
            .unwrap();
        assert!((i - NVec3::new(1.0, 0.0, 0.0)).norm() < 1e-12, "got {:?}", i);
        assert!(pl.segment_intersection(&NVec3::new(0.0, 1.0, 0.0), &NVec3::new(0.0, 2.0, 0.0)).is_none());
    }

    #[test]
    fn degenerate_never_hits() {
        let pl = Plane::from_points(&NVec3::zeros(), &NVec3::x(), &(NVec3::x() * 2.0));
        assert!(pl.is_degenerate());
        assert!(!pl.intersec_segment(&NVec3::y(), &-NVec3::y()));
        assert!(!pl.intersec_sphere(&NVec3::zeros(), 10.0));
    }
}
