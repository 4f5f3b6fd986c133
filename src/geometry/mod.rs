//! Fixed geometry the particles collide against
//!
//! Every shape answers the same three questions: does a motion segment
//! cross it, does a sphere touch it, and how is a colliding particle
//! corrected. [`Geometry`] dispatches them by pattern matching.

pub mod object;
pub mod plane;
pub mod rectangle;
pub mod sphere;
pub mod triangle;

pub use object::Object;
pub use plane::Plane;
pub use rectangle::Rectangle;
pub use sphere::Sphere;
pub use triangle::Triangle;

use crate::simulation::states::{NVec3, Particle};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Plane(Plane),
    Sphere(Sphere),
    Triangle(Triangle),
    Rectangle(Rectangle),
    Object(Object),
}

impl Geometry {
    pub fn intersec_segment(&self, p1: &NVec3, p2: &NVec3) -> bool {
        match self {
            Geometry::Plane(g) => g.intersec_segment(p1, p2),
            Geometry::Sphere(g) => g.intersec_segment(p1, p2),
            Geometry::Triangle(g) => g.intersec_segment(p1, p2),
            Geometry::Rectangle(g) => g.intersec_segment(p1, p2),
            Geometry::Object(g) => g.intersec_segment(p1, p2),
        }
    }

    pub fn intersec_sphere(&self, c: &NVec3, r: f64) -> bool {
        match self {
            Geometry::Plane(g) => g.intersec_sphere(c, r),
            Geometry::Sphere(g) => g.intersec_sphere(c, r),
            Geometry::Triangle(g) => g.intersec_sphere(c, r),
            Geometry::Rectangle(g) => g.intersec_sphere(c, r),
            Geometry::Object(g) => g.intersec_sphere(c, r),
        }
    }

    /// Shapes that can never report a collision
    pub fn is_degenerate(&self) -> bool {
        match self {
            Geometry::Plane(g) => g.is_degenerate(),
            Geometry::Sphere(g) => !(g.radius > 0.0),
            Geometry::Triangle(g) => g.is_degenerate(),
            Geometry::Rectangle(g) => g.is_degenerate(),
            Geometry::Object(g) => g.is_degenerate(),
        }
    }

    /// Test the motion `input.cur_pos -> pred_pos` of a particle against
    /// this shape and, on contact, write the corrected state into `out`.
    ///
    /// Point particles (`radius == None`) use the segment test only. Particles
    /// with a radius also collide when the sphere at `pred_pos` touches the
    /// shape. Returns whether a collision happened; `out` is untouched otherwise.
    pub fn update(
        &self,
        pred_pos: &NVec3,
        pred_vel: &NVec3,
        input: &Particle,
        radius: Option<f64>,
        out: &mut Particle,
    ) -> bool {
        let touches = || {
            self.intersec_segment(&input.cur_pos, pred_pos)
                || radius.is_some_and(|r| self.intersec_sphere(pred_pos, r))
        };

        match (self, radius) {
            // objects run their own broad phase
            (Geometry::Object(g), None) => g.update_particle(pred_pos, pred_vel, input, out),
            (Geometry::Object(g), Some(r)) => g.update_sized(pred_pos, pred_vel, input, out, r),
            _ if !touches() => false,
            (Geometry::Plane(g), None) => respond(input, out, |p| g.update_particle(pred_pos, pred_vel, p)),
            (Geometry::Plane(g), Some(r)) => respond(input, out, |p| g.update_sized(pred_pos, pred_vel, p, r)),
            (Geometry::Sphere(g), None) => respond(input, out, |p| g.update_particle(pred_pos, pred_vel, p)),
            (Geometry::Sphere(g), Some(r)) => respond(input, out, |p| g.update_sized(pred_pos, pred_vel, p, r)),
            (Geometry::Triangle(g), None) => respond(input, out, |p| g.update_particle(pred_pos, pred_vel, p)),
            (Geometry::Triangle(g), Some(r)) => respond(input, out, |p| g.update_sized(pred_pos, pred_vel, p, r)),
            (Geometry::Rectangle(g), None) => respond(input, out, |p| g.update_particle(pred_pos, pred_vel, p)),
            (Geometry::Rectangle(g), Some(r)) => respond(input, out, |p| g.update_sized(pred_pos, pred_vel, p, r)),
        }
    }
}

/// Start `out` from the pre-step state and let the shape correct it
fn respond(input: &Particle, out: &mut Particle, correct: impl FnOnce(&mut Particle)) -> bool {
    *out = input.clone();
    correct(out);
    true
}

impl From<Plane> for Geometry {
    fn from(g: Plane) -> Self {
        Geometry::Plane(g)
    }
}

impl From<Sphere> for Geometry {
    fn from(g: Sphere) -> Self {
        Geometry::Sphere(g)
    }
}

impl From<Triangle> for Geometry {
    fn from(g: Triangle) -> Self {
        Geometry::Triangle(g)
    }
}

impl From<Rectangle> for Geometry {
    fn from(g: Rectangle) -> Self {
        Geometry::Rectangle(g)
    }
}

impl From<Object> for Geometry {
    fn from(g: Object) -> Self {
        Geometry::Object(g)
    }
}
