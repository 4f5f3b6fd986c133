//! Particle emitters
//!
//! An [`Emitter`] assigns the initial attributes of a particle when it is
//! added to the simulator and every time its lifetime runs out. Emitters are
//! plain owned values: the simulator keeps its own copy and cloning one gives
//! an independent emitter with its own random stream.

use std::f64::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::simulation::states::{NVec3, PointMass};

/// User callback run after the built-in initialisers
pub type EmitHook = Arc<dyn Fn(&mut dyn PointMass) + Send + Sync>;

/// Where emitted particles appear
#[derive(Debug, Clone, PartialEq)]
pub enum EmitSource {
    /// Every particle starts at the same point
    Point(NVec3),

    /// Uniformly distributed over the parallelogram `origin + l w u + m h v`
    Rect {
        origin: NVec3,
        u: NVec3,
        v: NVec3,
        width: f64,
        height: f64,
    },

    /// Particles leave `origin` with a velocity aimed at a random point of the
    /// disc of radius `radius` centred at `origin + axis * length`
    Hose {
        origin: NVec3,
        axis: NVec3, // unit
        radius: f64,
        length: f64,
    },
}

#[derive(Clone)]
pub struct Emitter {
    pub source: EmitSource,
    pub velocity: NVec3, // initial velocity (ignored by hoses)
    pub mass: f64,
    pub charge: f64,
    pub bouncing: f64,
    pub friction: f64,
    pub lifetime: f64,
    pub starttime: f64,
    pub fixed: bool,
    pub radius: f64, // sized kinds only
    hook: Option<EmitHook>,
    rng: StdRng,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            source: EmitSource::Point(NVec3::zeros()),
            velocity: NVec3::zeros(),
            mass: 1.0,
            charge: 0.0,
            bouncing: 0.8,
            friction: 0.2,
            lifetime: 10.0,
            starttime: 0.0,
            fixed: false,
            radius: 1.0,
            hook: None,
            rng: StdRng::seed_from_u64(0),
        }
    }
}

impl Emitter {
    pub fn new(source: EmitSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Reseed the random stream used by the rectangle and hose sources
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_velocity(mut self, v: NVec3) -> Self {
        self.velocity = v;
        self
    }

    /// Install a callback that runs after all other initialisers
    pub fn with_hook(mut self, hook: impl Fn(&mut dyn PointMass) + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Initialise `p` in order: position, velocity, scalar attributes, radius,
    /// then the user hook. The particle's index is left as assigned by the caller.
    pub fn emit(&mut self, p: &mut dyn PointMass) {
        let (pos, vel) = self.sample();
        {
            let s = p.state_mut();
            s.cur_pos = pos;
            s.prev_pos = pos;
            s.cur_vel = vel;
            s.force = NVec3::zeros();
            s.mass = self.mass;
            s.charge = self.charge;
            s.bouncing = self.bouncing;
            s.friction = self.friction;
            s.lifetime = self.lifetime;
            s.starttime = self.starttime;
            s.fixed = self.fixed;
        }
        p.set_radius(self.radius);

        if let Some(hook) = &self.hook {
            hook(p);
        }
    }

    fn sample(&mut self) -> (NVec3, NVec3) {
        match &self.source {
            EmitSource::Point(at) => (*at, self.velocity),
            EmitSource::Rect { origin, u, v, width, height } => {
                let l: f64 = self.rng.gen();
                let m: f64 = self.rng.gen();
                (origin + u * (l * width) + v * (m * height), self.velocity)
            }
            EmitSource::Hose { origin, axis, radius, length } => {
                // orthonormal basis (v, w) of the disc
                let v = any_perpendicular(axis);
                let w = axis.cross(&v);
                let centre = origin + axis * *length;

                let x = radius * self.rng.gen::<f64>();
                let y = radius * self.rng.gen::<f64>();
                let phi = 2.0 * PI * self.rng.gen::<f64>();
                let aim = centre + v * (x * phi.cos()) + w * (y * phi.sin());
                (*origin, aim - origin)
            }
        }
    }
}

/// Unit vector perpendicular to `u`
fn any_perpendicular(u: &NVec3) -> NVec3 {
    // cross with the axis `u` is least aligned with
    let helper = if u.x.abs() <= u.y.abs() && u.x.abs() <= u.z.abs() {
        NVec3::x()
    } else if u.y.abs() <= u.z.abs() {
        NVec3::y()
    } else {
        NVec3::z()
    };
    u.cross(&helper).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::states::{Particle, SizedParticle};

    #[test]
    fn perpendicular_is_orthogonal_unit() {
        for u in [NVec3::x(), NVec3::y(), NVec3::new(1.0, 2.0, 3.0).normalize()] {
            let v = any_perpendicular(&u);
            assert!(v.dot(&u).abs() < 1e-12, "not perpendicular: {:?}", v);
            assert!((v.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rect_source_stays_inside() {
        let mut e = Emitter::new(EmitSource::Rect {
            origin: NVec3::new(1.0, 0.0, 1.0),
            u: NVec3::x(),
            v: NVec3::z(),
            width: 2.0,
            height: 3.0,
        })
        .with_seed(7);

        let mut p = Particle::default();
        for _ in 0..100 {
            e.emit(&mut p);
            assert!(p.cur_pos.x >= 1.0 && p.cur_pos.x <= 3.0, "x out of range {:?}", p.cur_pos);
            assert!(p.cur_pos.z >= 1.0 && p.cur_pos.z <= 4.0, "z out of range {:?}", p.cur_pos);
            assert_eq!(p.cur_pos.y, 0.0);
        }
    }

    #[test]
    fn hook_runs_last_and_sees_radius() {
        let mut e = Emitter::default().with_hook(|p: &mut dyn PointMass| {
            let r = p.radius().unwrap_or(0.0);
            p.state_mut().cur_pos.y = r * 2.0;
        });
        e.radius = 0.25;

        let mut s = SizedParticle::default();
        e.emit(&mut s);
        assert_eq!(s.radius, 0.25);
        assert!((s.particle.cur_pos.y - 0.5).abs() < 1e-12);
    }
}
