//! Compound triangle-mesh obstacle with an octree broad phase

use crate::geometry::triangle::Triangle;
use crate::simulation::octree::{Octree, OctreeSettings};
use crate::simulation::states::{NVec3, Particle};

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    tris: Vec<Triangle>,
    octree: Octree,
    min: NVec3,
    max: NVec3,
}

impl Object {
    /// Build from a vertex list and index triples. Returns `None` when a
    /// triple refers to a vertex that does not exist.
    pub fn new(vertices: &[NVec3], triangles: &[[usize; 3]], settings: OctreeSettings) -> Option<Self> {
        if triangles.iter().flatten().any(|&v| v >= vertices.len()) {
            return None;
        }

        let tris: Vec<Triangle> = triangles
            .iter()
            .map(|[a, b, c]| Triangle::new(vertices[*a], vertices[*b], vertices[*c]))
            .collect();

        let mut min = NVec3::repeat(f64::INFINITY);
        let mut max = NVec3::repeat(f64::NEG_INFINITY);
        for t in &tris {
            let (tmin, tmax) = t.bounding_box();
            min = min.inf(&tmin);
            max = max.sup(&tmax);
        }

        Some(Self {
            tris,
            octree: Octree::from_triangles(vertices, triangles, settings),
            min,
            max,
        })
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.tris
    }

    pub fn partition(&self) -> &Octree {
        &self.octree
    }

    /// True when every triangle is degenerate (or there are none)
    pub fn is_degenerate(&self) -> bool {
        self.tris.iter().all(Triangle::is_degenerate)
    }

    pub fn is_inside(&self, p: &NVec3, tol: f64) -> bool {
        if !(0..3).all(|k| self.min[k] <= p[k] && p[k] <= self.max[k]) {
            return false;
        }
        self.octree
            .point_query(p)
            .iter()
            .any(|&t| self.tris[t].is_inside(p, tol))
    }

    /// Candidate triangles for the segment: those in the leaves of both
    /// endpoints, plus those near the segment's bounding sphere so that an
    /// endpoint outside the tree or a leaf skipped in between is not missed
    fn segment_candidates(&self, p1: &NVec3, p2: &NVec3) -> Vec<usize> {
        let mut idxs: Vec<usize> = self.octree.point_query(p1).to_vec();
        idxs.extend_from_slice(self.octree.point_query(p2));
        let mid = (p1 + p2) * 0.5;
        idxs.extend(self.octree.radius_query(&mid, (p2 - p1).norm() * 0.5));
        idxs.sort_unstable();
        idxs.dedup();
        idxs
    }

    pub fn intersec_segment(&self, p1: &NVec3, p2: &NVec3) -> bool {
        self.segment_candidates(p1, p2)
            .into_iter()
            .any(|t| self.tris[t].intersec_segment(p1, p2))
    }

    pub fn intersec_sphere(&self, c: &NVec3, r: f64) -> bool {
        self.octree
            .radius_query(c, r)
            .into_iter()
            .any(|t| self.tris[t].intersec_sphere(c, r))
    }

    /// Point particle: find the first candidate triangle crossed by the motion
    /// `input.cur_pos -> pred_pos` and apply its response to `out`
    pub fn update_particle(&self, pred_pos: &NVec3, pred_vel: &NVec3, input: &Particle, out: &mut Particle) -> bool {
        for t in self.segment_candidates(&input.cur_pos, pred_pos) {
            let tri = &self.tris[t];
            if tri.intersec_segment(&input.cur_pos, pred_pos) {
                *out = input.clone();
                tri.update_particle(pred_pos, pred_vel, out);
                return true;
            }
        }
        false
    }

    /// Particle of radius `r`: candidates come from a radius query around the
    /// prediction plus the endpoint leaves
    pub fn update_sized(&self, pred_pos: &NVec3, pred_vel: &NVec3, input: &Particle, out: &mut Particle, r: f64) -> bool {
        let mut idxs = self.octree.radius_query(pred_pos, r);
        idxs.extend(self.segment_candidates(&input.cur_pos, pred_pos));
        idxs.sort_unstable();
        idxs.dedup();

        for t in idxs {
            let tri = &self.tris[t];
            if tri.intersec_segment(&input.cur_pos, pred_pos) || tri.intersec_sphere(pred_pos, r) {
                *out = input.clone();
                tri.update_sized(pred_pos, pred_vel, out, r);
                return true;
            }
        }
        false
    }
}
