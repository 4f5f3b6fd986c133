//! Planar quadrilateral given by four coplanar vertices
//!
//! The supporting plane is built from the first three vertices and the
//! inside test is "on the plane and inside the vertices' bounding box",
//! which is exact for axis-aligned rectangles.

use crate::geometry::plane::Plane;
use crate::simulation::states::{NVec3, Particle};

const ON_PLANE_TOL: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    vertices: [NVec3; 4],
    plane: Plane,
    min: NVec3,
    max: NVec3,
}

impl Rectangle {
    pub fn new(v1: NVec3, v2: NVec3, v3: NVec3, v4: NVec3) -> Self {
        let plane = Plane::from_points(&v1, &v2, &v3);
        let min = v1.inf(&v2).inf(&v3).inf(&v4);
        let max = v1.sup(&v2).sup(&v3).sup(&v4);
        Self {
            vertices: [v1, v2, v3, v4],
            plane,
            min,
            max,
        }
    }

    pub fn vertices(&self) -> &[NVec3; 4] {
        &self.vertices
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Degenerate when the first three vertices are collinear or the fourth
    /// is off their plane
    pub fn is_degenerate(&self) -> bool {
        self.plane.is_degenerate() || !self.plane.is_inside(&self.vertices[3], ON_PLANE_TOL)
    }

    pub fn is_inside(&self, p: &NVec3, tol: f64) -> bool {
        self.plane.is_inside(p, tol) && in_box(p, &self.min, &self.max, tol)
    }

    pub fn intersec_segment(&self, p1: &NVec3, p2: &NVec3) -> bool {
        self.segment_intersection(p1, p2).is_some()
    }

    pub fn segment_intersection(&self, p1: &NVec3, p2: &NVec3) -> Option<NVec3> {
        let i = self.plane.segment_intersection(p1, p2)?;
        if self.is_inside(&i, ON_PLANE_TOL) { Some(i) } else { None }
    }

    /// The sphere touches the plane and its centre projects inside the
    /// rectangle's box grown by `r`
    pub fn intersec_sphere(&self, c: &NVec3, r: f64) -> bool {
        if !self.plane.intersec_sphere(c, r) {
            return false;
        }
        in_box(&self.plane.project(c), &self.min, &self.max, r)
    }

    pub fn update_particle(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle) {
        self.plane.update_particle(pred_pos, pred_vel, p);
    }

    pub fn update_sized(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle, r: f64) {
        self.plane.update_sized(pred_pos, pred_vel, p, r);
    }
}

fn in_box(p: &NVec3, min: &NVec3, max: &NVec3, tol: f64) -> bool {
    (0..3).all(|k| min[k] - tol <= p[k] && p[k] <= max[k] + tol)
}
