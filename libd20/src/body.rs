//! Rigid-body state: pose, velocities, mass properties, material and sleep state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DiceError, DiceResult};
use crate::math::{Matrix3, Point3, Real, UnitQuaternion, Vector3};
use crate::shape::Shape;

/// Handle to a body stored in a [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub(crate) usize);

impl BodyId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Surface tag used to look up friction and restitution for a pair of bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Integrated and pushed around by contacts.
    Dynamic,
    /// Infinite mass: floors and walls. Never moved by the simulation.
    Static,
}

/// Position and orientation, the only state a renderer needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3<Real>,
    pub orientation: UnitQuaternion<Real>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

/// A rigid body with linear and angular dynamics.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub position: Point3<Real>,
    /// Always unit length; renormalised after every integration step.
    pub orientation: UnitQuaternion<Real>,
    pub velocity: Vector3<Real>,
    /// World frame, radians per second.
    pub angular_velocity: Vector3<Real>,

    /// Decay rates in [0, 1), applied as `v *= (1 - damping)^dt`.
    pub linear_damping: Real,
    pub angular_damping: Real,

    pub material: MaterialId,

    kind: BodyKind,
    mass: Real,
    inv_mass: Real,
    inv_inertia_body: Matrix3<Real>,
    shape: Arc<Shape>,

    force: Vector3<Real>,
    torque: Vector3<Real>,

    asleep: bool,
    sleepy_time: Real,
}

impl RigidBody {
    /// Dynamic body whose inertia is derived from `shape` as a uniform solid.
    ///
    /// Fails with [`DiceError::OffCenterShape`] unless the shape's centre of
    /// mass sits on the body origin.
    pub fn dynamic(shape: Arc<Shape>, mass: Real) -> DiceResult<Self> {
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(DiceError::InvalidMass(mass));
        }
        let inertia = shape.inertia(mass)?;
        let inv_inertia_body = inertia.try_inverse().ok_or(DiceError::SingularInertia)?;
        Ok(Self {
            kind: BodyKind::Dynamic,
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia_body,
            ..Self::with_shape(shape)
        })
    }

    /// Static body: zero inverse mass and inverse inertia.
    pub fn fixed(shape: Arc<Shape>) -> Self {
        Self::with_shape(shape)
    }

    fn with_shape(shape: Arc<Shape>) -> Self {
        Self {
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            material: MaterialId(0),
            kind: BodyKind::Static,
            mass: 0.0,
            inv_mass: 0.0,
            inv_inertia_body: Matrix3::zeros(),
            shape,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            asleep: false,
            sleepy_time: 0.0,
        }
    }

    pub fn with_position(mut self, position: Point3<Real>) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: UnitQuaternion<Real>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_velocity(mut self, velocity: Vector3<Real>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: set linear and angular damping (each clamped to [0, 1)).
    pub fn with_damping(mut self, linear: Real, angular: Real) -> Self {
        self.linear_damping = linear.clamp(0.0, 0.999);
        self.angular_damping = angular.clamp(0.0, 0.999);
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// Mass in kg; 0 for static bodies.
    pub fn mass(&self) -> Real {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> Real {
        self.inv_mass
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            orientation: self.orientation,
        }
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.position = pose.position;
        self.orientation = pose.orientation;
    }

    /// `I⁻¹_world = R * I⁻¹_body * Rᵀ`; zero for static bodies.
    pub fn inv_inertia_world(&self) -> Matrix3<Real> {
        let binding = self.orientation.to_rotation_matrix();
        let r = binding.matrix();
        r * self.inv_inertia_body * r.transpose()
    }

    /// Velocity of the material point at offset `r` from the body origin.
    #[inline]
    pub fn velocity_at(&self, r: &Vector3<Real>) -> Vector3<Real> {
        self.velocity + self.angular_velocity.cross(r)
    }

    /// Linear speed, m/s.
    pub fn speed(&self) -> Real {
        self.velocity.norm()
    }

    /// Angular speed, rad/s.
    pub fn angular_speed(&self) -> Real {
        self.angular_velocity.norm()
    }

    /// Instantaneous change of momentum through the centre of mass.
    pub fn apply_impulse(&mut self, impulse: Vector3<Real>) {
        if self.is_static() {
            return;
        }
        self.wake();
        self.velocity += impulse * self.inv_mass;
    }

    /// Force accumulated until the end of the next step.
    pub fn apply_force(&mut self, force: Vector3<Real>) {
        if self.is_static() {
            return;
        }
        self.wake();
        self.force += force;
    }

    /// Torque accumulated until the end of the next step.
    pub fn apply_torque(&mut self, torque: Vector3<Real>) {
        if self.is_static() {
            return;
        }
        self.wake();
        self.torque += torque;
    }

    /// Zero velocities and pending forces. Pose is untouched.
    pub fn reset_motion(&mut self) {
        self.velocity = Vector3::zeros();
        self.angular_velocity = Vector3::zeros();
        self.force = Vector3::zeros();
        self.torque = Vector3::zeros();
        self.sleepy_time = 0.0;
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Put the body back into the simulation. Harmless on an awake body.
    pub fn wake(&mut self) {
        self.asleep = false;
        self.sleepy_time = 0.0;
    }

    /// Freeze the body until it is woken.
    pub fn sleep(&mut self) {
        if self.is_static() {
            return;
        }
        self.asleep = true;
        self.velocity = Vector3::zeros();
        self.angular_velocity = Vector3::zeros();
    }

    /// Semi-implicit Euler, first half: forces and gravity into velocities, then damping.
    pub(crate) fn integrate_velocity(&mut self, gravity: &Vector3<Real>, dt: Real) {
        if self.is_static() || self.asleep {
            self.force = Vector3::zeros();
            self.torque = Vector3::zeros();
            return;
        }
        self.velocity += (gravity + self.force * self.inv_mass) * dt;
        self.angular_velocity += self.inv_inertia_world() * self.torque * dt;
        self.velocity *= crate::math::damping_factor(self.linear_damping, dt);
        self.angular_velocity *= crate::math::damping_factor(self.angular_damping, dt);
        self.force = Vector3::zeros();
        self.torque = Vector3::zeros();
    }

    /// Semi-implicit Euler, second half: new velocities into pose.
    pub(crate) fn integrate_pose(&mut self, dt: Real) {
        if self.is_static() || self.asleep {
            return;
        }
        self.position += self.velocity * dt;
        self.orientation =
            crate::math::integrate_orientation(&self.orientation, &self.angular_velocity, dt);
    }

    /// Accumulate rest time; returns true when the body just fell asleep.
    pub(crate) fn update_sleep(
        &mut self,
        speed_limit: Real,
        time_limit: Real,
        dt: Real,
    ) -> bool {
        if self.is_static() || self.asleep {
            return false;
        }
        if self.speed() < speed_limit && self.angular_speed() < speed_limit {
            self.sleepy_time += dt;
            if self.sleepy_time >= time_limit {
                self.sleep();
                return true;
            }
        } else {
            self.sleepy_time = 0.0;
        }
        false
    }
}
