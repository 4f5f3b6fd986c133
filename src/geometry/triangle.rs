//! Triangle, the building block of compound objects

use crate::geometry::plane::Plane;
use crate::simulation::states::{NVec3, Particle};

/// Padding of the triangle's bounding box
const BOX_PADDING: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    p0: NVec3,
    p1: NVec3,
    p2: NVec3,
    plane: Plane,
    min: NVec3,
    max: NVec3,
    area: f64,
}

impl Triangle {
    pub fn new(p0: NVec3, p1: NVec3, p2: NVec3) -> Self {
        let plane = Plane::from_points(&p0, &p1, &p2);
        let pad = NVec3::repeat(BOX_PADDING);
        let min = p0.inf(&p1).inf(&p2) - pad;
        let max = p0.sup(&p1).sup(&p2) + pad;
        let area = 0.5 * (p1 - p0).cross(&(p2 - p0)).norm();
        Self { p0, p1, p2, plane, min, max, area }
    }

    pub fn vertices(&self) -> [NVec3; 3] {
        [self.p0, self.p1, self.p2]
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Zero-area triangles never report intersections
    pub fn is_degenerate(&self) -> bool {
        self.plane.is_degenerate()
    }

    pub fn bounding_box(&self) -> (NVec3, NVec3) {
        (self.min, self.max)
    }

    /// Area-sum test: `p` is inside when the three sub-triangles it spans
    /// add up to the triangle's own area
    pub fn is_inside(&self, p: &NVec3, tol: f64) -> bool {
        if self.is_degenerate() || !self.plane.is_inside(p, tol) {
            return false;
        }
        let inside_box = (0..3).all(|k| self.min[k] <= p[k] && p[k] <= self.max[k]);
        if !inside_box {
            return false;
        }
        let a0 = tri_area(p, &self.p1, &self.p2);
        let a1 = tri_area(&self.p0, p, &self.p2);
        let a2 = tri_area(&self.p0, &self.p1, p);
        (a0 + a1 + a2 - self.area).abs() <= tol.max(1e-9 * self.area.max(1.0))
    }

    pub fn intersec_segment(&self, p1: &NVec3, p2: &NVec3) -> bool {
        self.segment_intersection(p1, p2).is_some()
    }

    pub fn segment_intersection(&self, p1: &NVec3, p2: &NVec3) -> Option<NVec3> {
        if self.is_degenerate() {
            return None;
        }
        let i = self.plane.segment_intersection(p1, p2)?;
        if self.is_inside(&i, 1e-6) { Some(i) } else { None }
    }

    pub fn intersec_sphere(&self, c: &NVec3, r: f64) -> bool {
        if self.is_degenerate() {
            return false;
        }
        (c - self.closest_point(c)).norm_squared() <= r * r
    }

    /// Point of the triangle closest to `p`
    pub fn closest_point(&self, p: &NVec3) -> NVec3 {
        let (a, b, c) = (&self.p0, &self.p1, &self.p2);
        let ab = b - a;
        let ac = c - a;

        // vertex region A
        let ap = p - a;
        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return *a;
        }

        // vertex region B
        let bp = p - b;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return *b;
        }

        // edge region AB
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return a + ab * v;
        }

        // vertex region C
        let cp = p - c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return *c;
        }

        // edge region AC
        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return a + ac * w;
        }

        // edge region BC
        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return b + (c - b) * w;
        }

        // face region
        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        a + ab * v + ac * w
    }

    /// Collision response of a point particle: reflect on the supporting plane
    pub fn update_particle(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle) {
        self.plane.update_particle(pred_pos, pred_vel, p);
    }

    /// Collision response of a particle of radius `r`: reflect against the
    /// tangent plane at distance `r` from the closest point of the triangle
    pub fn update_sized(&self, pred_pos: &NVec3, pred_vel: &NVec3, p: &mut Particle, r: f64) {
        let closest = self.closest_point(pred_pos);
        let side = self.plane.side_of(&p.cur_pos, pred_pos);
        let crossed = self.plane.signed_distance(pred_pos) * side < 0.0;

        let away = pred_pos - closest;
        let n = if crossed || away.norm() < 1e-12 {
            self.plane.normal() * side
        } else {
            away.normalize()
        };
        Plane::new(n, closest + n * r).push_out(pred_pos, pred_vel, p);
    }
}

fn tri_area(a: &NVec3, b: &NVec3, c: &NVec3) -> f64 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::new(NVec3::zeros(), NVec3::x(), NVec3::z())
    }

    #[test]
    fn closest_point_regions() {
        let t = unit_triangle();
        // above the face
        let q = t.closest_point(&NVec3::new(0.2, 3.0, 0.2));
        assert!((q - NVec3::new(0.2, 0.0, 0.2)).norm() < 1e-12, "face: {:?}", q);
        // beyond vertex B
        let q = t.closest_point(&NVec3::new(2.0, 0.0, -1.0));
        assert!((q - NVec3::x()).norm() < 1e-12, "vertex: {:?}", q);
        // beyond the hypotenuse
        let q = t.closest_point(&NVec3::new(1.0, 0.0, 1.0));
        assert!((q - NVec3::new(0.5, 0.0, 0.5)).norm() < 1e-12, "edge: {:?}", q);
    }

    #[test]
    fn segment_through_face_and_outside() {
        let t = unit_triangle();
        assert!(t.intersec_segment(&NVec3::new(0.2, 1.0, 0.2), &NVec3::new(0.2, -1.0, 0.2)));
        assert!(!t.intersec_segment(&NVec3::new(0.9, 1.0, 0.9), &NVec3::new(0.9, -1.0, 0.9)));
    }
}
