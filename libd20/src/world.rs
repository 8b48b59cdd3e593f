//! Physics world: bodies, gravity, contact materials and the fixed-step advance.
//!
//! One call to [`PhysicsWorld::step`] does, in order:
//! 1. forces and gravity into velocities, then damping
//! 2. broad phase (every dynamic body against every static body and every
//!    other dynamic body) and narrow phase contact generation
//! 3. sequential impulses: accumulated normal impulses with a restitution
//!    target, Coulomb friction clamped by the current normal impulse
//! 4. positional correction of the deepest contact of each touching pair
//! 5. new velocities into positions and orientations

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::body::{BodyId, MaterialId, RigidBody};
use crate::collision::{broad_phase_overlap, Contact, NarrowPhase};
use crate::math::{orthonormal_basis, Matrix3, Real, Vector3, EPS};

/// Friction and restitution for a pair of surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactMaterial {
    /// Coulomb coefficient, >= 0.
    pub friction: Real,
    /// Fraction of approach speed returned as rebound, in [0, 1].
    pub restitution: Real,
}

impl ContactMaterial {
    /// Clamps `friction` to >= 0 and `restitution` to [0, 1].
    pub fn new(friction: Real, restitution: Real) -> Self {
        Self {
            friction: friction.max(0.0),
            restitution: restitution.clamp(0.0, 1.0),
        }
    }

    fn sanitized(self) -> Self {
        Self::new(self.friction, self.restitution)
    }
}

impl Default for ContactMaterial {
    /// Moderate friction, no bounce.
    fn default() -> Self {
        Self::new(0.3, 0.0)
    }
}

/// Solver and environment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vector3<Real>,
    /// Used for pairs without an explicit [`ContactMaterial`].
    pub default_material: ContactMaterial,
    /// Sequential-impulse sweeps over all contacts per step.
    pub solver_iterations: usize,
    /// Approach speeds below this bounce with zero restitution (m/s).
    /// Keeps resting contacts from jittering under gravity.
    pub restitution_threshold: Real,
    /// Fraction of the remaining penetration removed per step.
    pub position_correction: Real,
    /// Penetration tolerated without correction.
    pub penetration_slop: Real,
    pub allow_sleep: bool,
    /// Bodies slower than this (linear and angular) start counting toward sleep.
    pub sleep_speed_limit: Real,
    /// Seconds below the speed limit before a body is put to sleep.
    pub sleep_time_limit: Real,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vector3::new(0.0, -9.82, 0.0),
            default_material: ContactMaterial::default(),
            solver_iterations: 10,
            restitution_threshold: 0.3,
            position_correction: 0.4,
            penetration_slop: 0.005,
            allow_sleep: false,
            sleep_speed_limit: 0.1,
            sleep_time_limit: 1.0,
        }
    }
}

impl WorldConfig {
    /// Zero-gravity variant, mostly for tests.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = Vector3::zeros();
        self
    }

    #[must_use]
    pub fn with_sleep(mut self, allow: bool) -> Self {
        self.allow_sleep = allow;
        self
    }
}

/// Solver row built from one contact.
#[derive(Debug, Clone)]
struct ContactConstraint {
    a: usize,
    b: usize,
    ra: Vector3<Real>,
    rb: Vector3<Real>,
    normal: Vector3<Real>,
    tangents: [Vector3<Real>; 2],
    inv_mass_a: Real,
    inv_mass_b: Real,
    inv_inertia_a: Matrix3<Real>,
    inv_inertia_b: Matrix3<Real>,
    normal_mass: Real,
    tangent_mass: [Real; 2],
    /// Target separating speed after the solve.
    bias: Real,
    friction: Real,
    normal_impulse: Real,
    tangent_impulse: [Real; 2],
}

impl ContactConstraint {
    fn relative_velocity(&self, bodies: &[RigidBody]) -> Vector3<Real> {
        bodies[self.a].velocity_at(&self.ra) - bodies[self.b].velocity_at(&self.rb)
    }

    /// `impulse` acts on `a`; `b` receives the opposite.
    fn apply(&self, bodies: &mut [RigidBody], impulse: Vector3<Real>) {
        if self.inv_mass_a > 0.0 {
            let a = &mut bodies[self.a];
            a.velocity += impulse * self.inv_mass_a;
            a.angular_velocity += self.inv_inertia_a * self.ra.cross(&impulse);
        }
        if self.inv_mass_b > 0.0 {
            let b = &mut bodies[self.b];
            b.velocity -= impulse * self.inv_mass_b;
            b.angular_velocity -= self.inv_inertia_b * self.rb.cross(&impulse);
        }
    }
}

/// Deepest penetration of a touching pair, used for positional correction.
#[derive(Debug, Clone, Copy)]
struct PairPenetration {
    a: usize,
    b: usize,
    normal: Vector3<Real>,
    depth: Real,
}

/// `1/m_a + 1/m_b + n·((I_a⁻¹(r_a×n))×r_a) + n·((I_b⁻¹(r_b×n))×r_b)`
fn effective_inv_mass(
    dir: &Vector3<Real>,
    inv_mass_a: Real,
    inv_inertia_a: &Matrix3<Real>,
    ra: &Vector3<Real>,
    inv_mass_b: Real,
    inv_inertia_b: &Matrix3<Real>,
    rb: &Vector3<Real>,
) -> Real {
    let ang_a = (inv_inertia_a * ra.cross(dir)).cross(ra).dot(dir);
    let ang_b = (inv_inertia_b * rb.cross(dir)).cross(rb).dot(dir);
    inv_mass_a + inv_mass_b + ang_a + ang_b
}

/// Owns every body and advances them together.
#[derive(Debug)]
pub struct PhysicsWorld {
    config: WorldConfig,
    bodies: Vec<RigidBody>,
    materials: HashMap<(MaterialId, MaterialId), ContactMaterial>,
    contacts: Vec<Contact>,
    constraints: Vec<ContactConstraint>,
    penetrations: Vec<PairPenetration>,
    narrow: NarrowPhase,
    time: Real,
    steps: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(config: WorldConfig) -> Self {
        let config = WorldConfig {
            default_material: config.default_material.sanitized(),
            ..config
        };
        Self {
            config,
            bodies: Vec::new(),
            materials: HashMap::new(),
            contacts: Vec::new(),
            constraints: Vec::new(),
            penetrations: Vec::new(),
            narrow: NarrowPhase::default(),
            time: 0.0,
            steps: 0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vector3<Real> {
        self.config.gravity
    }

    pub fn add_body(&mut self, body: RigidBody) -> BodyId {
        self.bodies.push(body);
        BodyId(self.bodies.len() - 1)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Register friction/restitution for a material pair. Order does not matter.
    pub fn add_contact_material(&mut self, a: MaterialId, b: MaterialId, material: ContactMaterial) {
        self.materials.insert(material_key(a, b), material.sanitized());
    }

    /// Material for a pair, falling back to the world default.
    pub fn contact_material(&self, a: MaterialId, b: MaterialId) -> ContactMaterial {
        self.materials
            .get(&material_key(a, b))
            .copied()
            .unwrap_or(self.config.default_material)
    }

    /// Contacts found during the last step.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Simulated seconds since the world was created.
    pub fn time(&self) -> Real {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Advance every dynamic body by exactly `dt` seconds.
    ///
    /// Non-positive or non-finite `dt` is ignored.
    pub fn step(&mut self, dt: Real) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }

        let gravity = self.config.gravity;
        for body in &mut self.bodies {
            body.integrate_velocity(&gravity, dt);
        }

        self.detect_contacts();
        self.prepare_constraints();
        for _ in 0..self.config.solver_iterations {
            self.solve_velocities();
        }
        self.correct_positions();

        for body in &mut self.bodies {
            body.integrate_pose(dt);
        }

        if self.config.allow_sleep {
            let (limit, time_limit) = (self.config.sleep_speed_limit, self.config.sleep_time_limit);
            for (i, body) in self.bodies.iter_mut().enumerate() {
                if body.update_sleep(limit, time_limit, dt) {
                    trace!(body = i, "body fell asleep");
                }
            }
        }

        self.time += dt;
        self.steps += 1;
    }

    fn detect_contacts(&mut self) {
        self.contacts.clear();
        self.penetrations.clear();

        let n = self.bodies.len();
        for i in 0..n {
            let a = &self.bodies[i];
            if a.is_static() {
                continue;
            }
            for j in 0..n {
                let b = &self.bodies[j];
                // dynamic pairs are visited once, from the lower index
                if i == j || (!b.is_static() && j < i) {
                    continue;
                }
                if a.is_asleep() && (b.is_static() || b.is_asleep()) {
                    continue;
                }
                if !broad_phase_overlap(a, b) {
                    continue;
                }
                let start = self.contacts.len();
                let added = self
                    .narrow
                    .collide(BodyId(i), a, BodyId(j), b, &mut self.contacts);
                if added == 0 {
                    continue;
                }
                let deepest = self.contacts[start..]
                    .iter()
                    .max_by(|p, q| p.depth.total_cmp(&q.depth));
                if let Some(c) = deepest {
                    self.penetrations.push(PairPenetration {
                        a: i,
                        b: j,
                        normal: c.normal,
                        depth: c.depth,
                    });
                }
            }
        }

        // a moving body touching a sleeping one wakes it
        for c in &self.contacts {
            let (a, b) = (c.body_a.0, c.body_b.0);
            let awake = |body: &RigidBody| !body.is_static() && !body.is_asleep();
            if awake(&self.bodies[a]) && self.bodies[b].is_asleep() {
                self.bodies[b].wake();
            } else if awake(&self.bodies[b]) && self.bodies[a].is_asleep() {
                self.bodies[a].wake();
            }
        }
    }

    fn prepare_constraints(&mut self) {
        self.constraints.clear();
        let threshold = self.config.restitution_threshold;

        for c in &self.contacts {
            let (ia, ib) = (c.body_a.0, c.body_b.0);
            let (a, b) = (&self.bodies[ia], &self.bodies[ib]);
            let ra = c.point - a.position;
            let rb = c.point - b.position;
            let (inv_mass_a, inv_mass_b) = (a.inv_mass(), b.inv_mass());
            let inv_inertia_a = a.inv_inertia_world();
            let inv_inertia_b = b.inv_inertia_world();

            let k_normal = effective_inv_mass(
                &c.normal, inv_mass_a, &inv_inertia_a, &ra, inv_mass_b, &inv_inertia_b, &rb,
            );
            if k_normal <= EPS {
                continue;
            }
            let (t1, t2) = orthonormal_basis(&c.normal);
            let tangent_mass = [t1, t2].map(|t| {
                let k = effective_inv_mass(
                    &t, inv_mass_a, &inv_inertia_a, &ra, inv_mass_b, &inv_inertia_b, &rb,
                );
                if k > EPS {
                    1.0 / k
                } else {
                    0.0
                }
            });

            let material = self.contact_material(a.material, b.material);
            let approach = (a.velocity_at(&ra) - b.velocity_at(&rb)).dot(&c.normal);
            let bias = if approach < -threshold {
                -material.restitution * approach
            } else {
                0.0
            };

            self.constraints.push(ContactConstraint {
                a: ia,
                b: ib,
                ra,
                rb,
                normal: c.normal,
                tangents: [t1, t2],
                inv_mass_a,
                inv_mass_b,
                inv_inertia_a,
                inv_inertia_b,
                normal_mass: 1.0 / k_normal,
                tangent_mass,
                bias,
                friction: material.friction,
                normal_impulse: 0.0,
                tangent_impulse: [0.0; 2],
            });
        }
    }

    /// One Gauss-Seidel sweep over all contacts.
    fn solve_velocities(&mut self) {
        let bodies = &mut self.bodies;
        for c in &mut self.constraints {
            // normal: push the separating speed toward `bias`, never pull
            let vn = c.relative_velocity(bodies).dot(&c.normal);
            let lambda = (c.bias - vn) * c.normal_mass;
            let previous = c.normal_impulse;
            c.normal_impulse = (previous + lambda).max(0.0);
            c.apply(bodies, c.normal * (c.normal_impulse - previous));

            // friction: cancel sliding, bounded by the Coulomb cone
            let max_friction = c.friction * c.normal_impulse;
            for k in 0..2 {
                let t = c.tangents[k];
                let vt = c.relative_velocity(bodies).dot(&t);
                let lambda = -vt * c.tangent_mass[k];
                let previous = c.tangent_impulse[k];
                c.tangent_impulse[k] = (previous + lambda).clamp(-max_friction, max_friction);
                c.apply(bodies, t * (c.tangent_impulse[k] - previous));
            }
        }
    }

    fn correct_positions(&mut self) {
        let slop = self.config.penetration_slop;
        let percent = self.config.position_correction;
        for p in &self.penetrations {
            let inv_mass_a = self.bodies[p.a].inv_mass();
            let inv_mass_b = self.bodies[p.b].inv_mass();
            let total = inv_mass_a + inv_mass_b;
            if total <= 0.0 {
                continue;
            }
            let magnitude = (p.depth - slop).max(0.0) * percent / total;
            if magnitude <= 0.0 {
                continue;
            }
            self.bodies[p.a].position += p.normal * (magnitude * inv_mass_a);
            self.bodies[p.b].position -= p.normal * (magnitude * inv_mass_b);
        }
    }
}

fn material_key(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Pose;
    use crate::math::{quat_from_euler, Point3};
    use crate::shape::{Polyhedron, Shape};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    const DT: Real = 1.0 / 60.0;
    const DIE: MaterialId = MaterialId(0);
    const FLOOR: MaterialId = MaterialId(1);
    const WALL: MaterialId = MaterialId(2);

    fn cube(mass: Real) -> RigidBody {
        let shape = Arc::new(Shape::cuboid(Vector3::new(0.5, 0.5, 0.5)).expect("cube"));
        RigidBody::dynamic(shape, mass).expect("body").with_material(DIE)
    }

    fn floor() -> RigidBody {
        RigidBody::fixed(Arc::new(Shape::plane(Vector3::y_axis()))).with_material(FLOOR)
    }

    fn wall_at_x(x: Real) -> RigidBody {
        let shape = Arc::new(Shape::cuboid(Vector3::new(0.25, 2.0, 4.0)).expect("wall"));
        RigidBody::fixed(shape)
            .with_position(Point3::new(x, 0.0, 0.0))
            .with_material(WALL)
    }

    /// Drop a cube from 2 m and return (impact speed, largest upward speed afterwards).
    fn drop_onto_floor(material: ContactMaterial) -> (Real, Real) {
        let mut world = PhysicsWorld::default();
        world.add_body(floor());
        world.add_contact_material(DIE, FLOOR, material);
        let id = world.add_body(cube(1.2).with_position(Point3::new(0.0, 2.0, 0.0)));

        let mut impact: Real = 0.0;
        let mut rebound: Real = 0.0;
        for _ in 0..180 {
            let before = world.body(id).expect("die").velocity.y;
            world.step(DT);
            let after = world.body(id).expect("die").velocity.y;
            if impact == 0.0 && before < 0.0 && after > before + 1.0 {
                impact = -before;
            }
            if impact > 0.0 {
                rebound = rebound.max(after);
            }
        }
        (impact, rebound)
    }

    #[test]
    fn test_free_fall_speeds_up_every_step() {
        let mut world = PhysicsWorld::default();
        let id = world.add_body(cube(1.2).with_position(Point3::new(0.0, 100.0, 0.0)));
        let mut last = 0.0;
        for _ in 0..60 {
            world.step(DT);
            let down = -world.body(id).expect("die").velocity.y;
            assert!(down > last, "downward speed must grow: {down} <= {last}");
            last = down;
        }
        assert_relative_eq!(last, 9.82, epsilon = 1e-3);
        assert_relative_eq!(world.time(), 1.0, epsilon = 1e-4);
        assert_eq!(world.step_count(), 60);
    }

    #[test]
    fn test_static_bodies_never_move() {
        let mut world = PhysicsWorld::default();
        let floor_id = world.add_body(floor());
        let wall_id = world.add_body(wall_at_x(1.5));
        let before: Vec<Pose> = [floor_id, wall_id]
            .iter()
            .map(|&id| world.body(id).expect("static").pose())
            .collect();

        let die = cube(1.2)
            .with_position(Point3::new(0.5, 1.5, 0.0))
            .with_orientation(quat_from_euler(0.3, 1.1, -0.4))
            .with_velocity(Vector3::new(4.0, -2.0, 0.0));
        let die_id = world.add_body(die);
        world.body_mut(die_id).expect("die").angular_velocity = Vector3::new(5.0, -3.0, 8.0);

        for _ in 0..300 {
            world.step(DT);
        }
        for (id, pose) in [floor_id, wall_id].iter().zip(&before) {
            let body = world.body(*id).expect("static");
            assert_eq!(body.pose(), *pose);
            assert_eq!(body.velocity, Vector3::zeros());
            assert_eq!(body.angular_velocity, Vector3::zeros());
        }
    }

    #[test]
    fn test_cube_comes_to_rest_on_floor() {
        let mut world = PhysicsWorld::default();
        world.add_body(floor());
        let id = world.add_body(cube(1.2).with_position(Point3::new(0.0, 0.8, 0.0)));
        for _ in 0..240 {
            world.step(DT);
        }
        let body = world.body(id).expect("die");
        assert!((body.position.y - 0.5).abs() < 0.02, "y = {}", body.position.y);
        assert!(body.speed() < 0.05);
        assert!(body.angular_speed() < 0.05);
        assert_relative_eq!(body.orientation.quaternion().norm(), 1.0, epsilon = 1e-5);
        assert_eq!(world.contacts().len(), 4);
    }

    #[test]
    fn test_bouncy_wall_returns_restitution_times_speed() {
        let mut world = PhysicsWorld::new(WorldConfig::default().zero_gravity());
        world.add_contact_material(DIE, WALL, ContactMaterial::new(0.06, 0.72));
        world.add_body(wall_at_x(3.75));
        let id = world.add_body(
            cube(1.2)
                .with_position(Point3::new(2.0, 0.0, 0.0))
                .with_velocity(Vector3::new(3.0, 0.0, 0.0)),
        );
        for _ in 0..120 {
            world.step(DT);
        }
        let body = world.body(id).expect("die");
        let expected = -0.72 * 3.0;
        assert!(
            (body.velocity.x - expected).abs() < 0.15,
            "rebound {} vs {}",
            body.velocity.x,
            expected
        );
        assert!(body.angular_speed() < 0.3);
        assert!(body.position.x < 2.5);
    }

    #[test]
    fn test_sticky_floor_kills_rebound() {
        let (impact, rebound) = drop_onto_floor(ContactMaterial::new(0.38, 0.10));
        assert!(impact > 4.0, "impact speed {impact}");
        assert!(rebound < 0.2 * impact, "rebound {rebound} for impact {impact}");

        let (impact, lively) = drop_onto_floor(ContactMaterial::new(0.06, 0.72));
        assert!(lively > 0.5 * impact, "rebound {lively} for impact {impact}");
        assert!(lively > rebound);
    }

    #[test]
    fn test_friction_stops_sliding_without_reversing() {
        let mut world = PhysicsWorld::default();
        world.add_body(floor());
        world.add_contact_material(DIE, FLOOR, ContactMaterial::new(0.38, 0.1));
        let id = world.add_body(
            cube(1.2)
                .with_position(Point3::new(0.0, 0.5, 0.0))
                .with_velocity(Vector3::new(3.0, 0.0, 0.0)),
        );
        for _ in 0..120 {
            world.step(DT);
            assert!(world.body(id).expect("die").velocity.x > -0.05);
        }
        let body = world.body(id).expect("die");
        assert!(body.velocity.x.abs() < 0.05, "still sliding at {}", body.velocity.x);
        // v^2 / (2 mu g) = 9 / 7.46
        assert!(body.position.x > 0.9 && body.position.x < 1.6, "x = {}", body.position.x);
    }

    #[test]
    fn test_contact_material_lookup_is_symmetric() {
        let mut world = PhysicsWorld::default();
        world.add_contact_material(WALL, DIE, ContactMaterial::new(0.06, 0.72));
        assert_eq!(world.contact_material(DIE, WALL), ContactMaterial::new(0.06, 0.72));
        assert_eq!(world.contact_material(WALL, DIE), ContactMaterial::new(0.06, 0.72));
        assert_eq!(world.contact_material(DIE, FLOOR), world.config().default_material);

        world.add_contact_material(DIE, FLOOR, ContactMaterial::new(-1.0, 3.0));
        let m = world.contact_material(FLOOR, DIE);
        assert_eq!(m.friction, 0.0);
        assert_eq!(m.restitution, 1.0);
    }

    #[test]
    fn test_partial_material_keeps_defaults() {
        let m: ContactMaterial = serde_json::from_str(r#"{"restitution": 0.5}"#).expect("parse");
        assert_eq!(m, ContactMaterial::new(0.3, 0.5));

        let cfg: WorldConfig =
            serde_json::from_str(r#"{"default_material": {"friction": 0.9}}"#).expect("parse");
        assert_eq!(cfg.default_material, ContactMaterial::new(0.9, 0.0));
        assert_eq!(cfg.solver_iterations, 10);
    }

    #[test]
    fn test_resting_body_falls_asleep_and_wakes() {
        let mut world = PhysicsWorld::new(WorldConfig::default().with_sleep(true));
        world.add_body(floor());
        let id = world.add_body(cube(1.2).with_position(Point3::new(0.0, 0.6, 0.0)));
        for _ in 0..240 {
            world.step(DT);
        }
        assert!(world.body(id).expect("die").is_asleep());
        let y = world.body(id).expect("die").position.y;
        for _ in 0..60 {
            world.step(DT);
        }
        assert_eq!(world.body(id).expect("die").position.y, y);

        let body = world.body_mut(id).expect("die");
        body.wake();
        body.apply_impulse(Vector3::new(0.0, 6.0, 0.0));
        world.step(DT);
        assert!(!world.body(id).expect("die").is_asleep());
        assert!(world.body(id).expect("die").position.y > y);
    }

    #[test]
    fn test_icosahedron_settles_on_a_face() {
        let mut world = PhysicsWorld::default();
        world.add_body(floor());
        let shape = Arc::new(Shape::Polyhedron(Polyhedron::icosahedron(1.0).expect("ico")));
        let die = RigidBody::dynamic(shape, 1.2)
            .expect("die")
            .with_damping(0.1, 0.1)
            .with_position(Point3::new(0.0, 2.0, 0.0))
            .with_orientation(quat_from_euler(0.4, 1.3, 2.2));
        let id = world.add_body(die);
        world.body_mut(id).expect("die").angular_velocity = Vector3::new(4.0, 1.0, -3.0);
        for _ in 0..600 {
            world.step(DT);
        }
        let body = world.body(id).expect("die");
        // inradius of a unit-circumradius icosahedron
        assert!((body.position.y - 0.7947).abs() < 0.05, "y = {}", body.position.y);
        assert!(body.speed() < 0.12);
        assert!(body.angular_speed() < 0.22);
    }

    #[test]
    fn test_missing_body_lookup() {
        let world = PhysicsWorld::default();
        assert!(world.body(BodyId(3)).is_none());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_non_positive_step_is_ignored() {
        let mut world = PhysicsWorld::default();
        let id = world.add_body(cube(1.0).with_position(Point3::new(0.0, 5.0, 0.0)));
        world.step(0.0);
        world.step(-1.0);
        world.step(Real::NAN);
        assert_eq!(world.step_count(), 0);
        assert_eq!(world.body(id).expect("die").velocity, Vector3::zeros());
    }
}
