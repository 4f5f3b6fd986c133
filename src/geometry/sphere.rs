//! Solid sphere

use crate::geometry::plane::Plane;
use crate::simulation::states::{NVec3, Particle};

/// Tolerance of the inside test
const INSIDE_TOL: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub center: NVec3,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: NVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn is_inside(&self, p: &NVec3, tol: f64) -> bool {
        (p - self.center).norm_squared() - self.radius * self.radius <= tol
    }

    /// A segment hits the sphere when exactly one endpoint is inside
    pub fn intersec_segment(&self, p1: &NVec3, p2: &NVec3) -> bool {
        self.is_inside(p1, INSIDE_TOL) != self.is_inside(p2, INSIDE_TOL)
    }

    pub fn intersec_sphere(&self, c: &NVec3, r: f64) -> bool {
        let sum = self.radius + r;
        (c - self.center).norm_squared() <= sum * sum
    }

    /// Point where the segment crosses the surface: the root of
    /// `|p1 + t (p2 - p1) - c|^2 = R^2` closest to `[0, 1]`
    pub fn segment_intersection(&self, p1: &NVec3, p2: &NVec3) -> Option<NVec3> {
        let d = p2 - p1;
        let f = p1 - self.center;
        let a = d.norm_squared();
        if a == 0.0 {
            return None;
        }
        let b = 2.0 * f.dot(&d);
        let c = f.norm_squared() - self.radius * self.radius;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let t1 = (-b - sq) / (2.0 * a);
        let t2 = (-b + sq) / (2.0 * a);
        let t = if interval_distance(t1) <= interval_distance(t2) { t1 } else { t2 };
        Some(p1 + d * t)
    }

    /// Contact point for a particle moving from `from` to `to`: the crossing
    /// point when there is one, otherwise the surface point closest to `to`
    fn contact_point(&self, from: &NVec3, to: &NVec3) -> Option<NVec3> {
        if self.intersec_segment(from, to) {
            if let Some(i) = self.segment_intersection(from, to) {
                return Some(i);
            }
        }
        let dir = to - self.center;
        let len = dir.norm();
        if len < 1e-12 {
            return None;
        }
        Some(self.center + dir * (self.radius / len))
    }

    /// Collision response of a point particle: reflect on the tangent plane
    /// at the contact point
    pub fn update_particle(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle) {
        match self.contact_point(&p.cur_pos, pred_pos) {
            Some(i) => Plane::new(i - self.center, i).update_particle(pred_pos, pred_vel, p),
            None => accept(pred_pos, pred_vel, p),
        }
    }

    /// Collision response of a particle of radius `r`: the sphere grown by
    /// `r` is treated as the obstacle of the particle's centre
    pub fn update_sized(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle, r: f64) {
        let grown = Sphere::new(self.center, self.radius + r);
        match grown.contact_point(&p.cur_pos, pred_pos) {
            Some(i) => {
                // normal points away from the centre, toward where the particle belongs
                let inside_start = self.is_inside(&p.cur_pos, INSIDE_TOL);
                let n = if inside_start { self.center - i } else { i - self.center };
                Plane::new(n, i).push_out(pred_pos, pred_vel, p);
            }
            None => accept(pred_pos, pred_vel, p),
        }
    }
}

/// Take the prediction unchanged
fn accept(pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle) {
    p.save_position();
    p.cur_pos = *pred_pos;
    p.cur_vel = *pred_vel;
}

/// Distance from `t` to the interval [0, 1]
fn interval_distance(t: f64) -> f64 {
    if t < 0.0 {
        -t
    } else if t > 1.0 {
        t - 1.0
    } else {
        0.0
    }
}
