//! The dice tray: floor, four walls, one d20 and the roll controller, driven
//! by wall-clock frame deltas.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::body::{BodyId, MaterialId, Pose, RigidBody};
use crate::error::{DiceError, DiceResult};
use crate::face::{TopFaceResolver, TopFaceResult};
use crate::math::{Point3, Real, Unit, Vector3};
use crate::roll::{RollConfig, RollController, RollOutcome, RollState};
use crate::shape::{Polyhedron, Shape};
use crate::stepper::FixedStepper;
use crate::world::{ContactMaterial, PhysicsWorld, WorldConfig};

pub const DIE_MATERIAL: MaterialId = MaterialId(0);
pub const FLOOR_MATERIAL: MaterialId = MaterialId(1);
pub const WALL_MATERIAL: MaterialId = MaterialId(2);

const DIE_FLOOR: ContactMaterial = ContactMaterial {
    friction: 0.38,
    restitution: 0.10,
};

const DIE_WALL: ContactMaterial = ContactMaterial {
    friction: 0.06,
    restitution: 0.72,
};

/// Material fields as they appear in a config file; absent ones keep the
/// pair's own default rather than the generic one.
#[derive(Deserialize)]
struct MaterialPatch {
    friction: Option<Real>,
    restitution: Option<Real>,
}

impl MaterialPatch {
    fn over(self, base: ContactMaterial) -> ContactMaterial {
        // left unclamped so validate() can report bad values
        ContactMaterial {
            friction: self.friction.unwrap_or(base.friction),
            restitution: self.restitution.unwrap_or(base.restitution),
        }
    }
}

fn die_floor_patch<'de, D: Deserializer<'de>>(d: D) -> Result<ContactMaterial, D::Error> {
    MaterialPatch::deserialize(d).map(|p| p.over(DIE_FLOOR))
}

fn die_wall_patch<'de, D: Deserializer<'de>>(d: D) -> Result<ContactMaterial, D::Error> {
    MaterialPatch::deserialize(d).map(|p| p.over(DIE_WALL))
}

/// Startup constants for the tray. Every field has a default, so a partial
/// JSON document only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrayConfig {
    /// Magnitude of gravity, pointing down -Y.
    pub gravity: Real,
    pub die_mass: Real,
    /// Circumradius of the icosahedron.
    pub die_radius: Real,
    pub die_linear_damping: Real,
    pub die_angular_damping: Real,
    /// Half the inner width of the square tray.
    pub tray_half_extent: Real,
    pub wall_height: Real,
    pub wall_thickness: Real,
    /// A partial object overrides only the fields it names.
    #[serde(deserialize_with = "die_floor_patch")]
    pub die_floor: ContactMaterial,
    #[serde(deserialize_with = "die_wall_patch")]
    pub die_wall: ContactMaterial,
    pub default_material: ContactMaterial,
    /// Physics tick, seconds.
    pub fixed_step: Real,
    /// Frame deltas are clamped to this before accumulation.
    pub max_frame_dt: Real,
    pub solver_iterations: usize,
    pub allow_sleep: bool,
    pub roll: RollConfig,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            gravity: 9.82,
            die_mass: 1.2,
            die_radius: 1.0,
            die_linear_damping: 0.1,
            die_angular_damping: 0.1,
            tray_half_extent: 3.5,
            wall_height: 6.0,
            wall_thickness: 0.5,
            die_floor: DIE_FLOOR,
            die_wall: DIE_WALL,
            default_material: ContactMaterial::default(),
            fixed_step: 1.0 / 60.0,
            max_frame_dt: 0.05,
            solver_iterations: 10,
            allow_sleep: false,
            roll: RollConfig::default(),
        }
    }
}

fn invalid(field: &'static str, value: Real, reason: &'static str) -> DiceError {
    DiceError::InvalidConfig {
        field,
        value,
        reason,
    }
}

fn check_positive(field: &'static str, value: Real) -> DiceResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite and > 0"))
    }
}

fn check_non_negative(field: &'static str, value: Real) -> DiceResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite and >= 0"))
    }
}

fn check_damping(field: &'static str, value: Real) -> DiceResult<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, value, "must be in [0, 1)"))
    }
}

fn check_material(
    friction: &'static str,
    restitution: &'static str,
    m: &ContactMaterial,
) -> DiceResult<()> {
    check_non_negative(friction, m.friction)?;
    if !(0.0..=1.0).contains(&m.restitution) {
        return Err(invalid(restitution, m.restitution, "must be in [0, 1]"));
    }
    Ok(())
}

impl TrayConfig {
    /// Reject values the simulation cannot work with.
    pub fn validate(&self) -> DiceResult<()> {
        check_non_negative("gravity", self.gravity)?;
        check_positive("die_mass", self.die_mass)?;
        check_positive("die_radius", self.die_radius)?;
        check_damping("die_linear_damping", self.die_linear_damping)?;
        check_damping("die_angular_damping", self.die_angular_damping)?;
        check_positive("tray_half_extent", self.tray_half_extent)?;
        check_positive("wall_height", self.wall_height)?;
        check_positive("wall_thickness", self.wall_thickness)?;
        check_material("die_floor.friction", "die_floor.restitution", &self.die_floor)?;
        check_material("die_wall.friction", "die_wall.restitution", &self.die_wall)?;
        check_material(
            "default_material.friction",
            "default_material.restitution",
            &self.default_material,
        )?;
        check_positive("fixed_step", self.fixed_step)?;
        check_positive("max_frame_dt", self.max_frame_dt)?;
        if self.max_frame_dt < self.fixed_step {
            return Err(invalid(
                "max_frame_dt",
                self.max_frame_dt,
                "must be at least fixed_step",
            ));
        }
        if self.solver_iterations == 0 {
            return Err(invalid("solver_iterations", 0.0, "must be at least 1"));
        }

        let roll = &self.roll;
        check_non_negative("roll.lin_eps", roll.lin_eps)?;
        check_non_negative("roll.ang_eps", roll.ang_eps)?;
        if roll.settle_frames_required == 0 {
            return Err(invalid("roll.settle_frames_required", 0.0, "must be at least 1"));
        }
        check_positive("roll.max_roll_seconds", roll.max_roll_seconds)?;
        for (field, (min, max)) in roll.launch.spans() {
            if !(min.is_finite() && max.is_finite()) {
                return Err(invalid(field, if min.is_finite() { max } else { min }, "must be finite"));
            }
            if min > max {
                return Err(invalid(field, min, "min must not exceed max"));
            }
        }
        let launch = &roll.launch;
        let reach = launch
            .position_x
            .0
            .abs()
            .max(launch.position_x.1.abs())
            .max(launch.position_z.0.abs())
            .max(launch.position_z.1.abs());
        if reach + self.die_radius > self.tray_half_extent {
            return Err(invalid(
                "roll.launch.position",
                reach,
                "die would start outside the tray",
            ));
        }
        if launch.position_y.0 < self.die_radius {
            return Err(invalid(
                "roll.launch.position_y",
                launch.position_y.0,
                "die would start below the floor",
            ));
        }
        Ok(())
    }

    /// Physics settings derived from the tray constants.
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            gravity: Vector3::new(0.0, -self.gravity, 0.0),
            default_material: self.default_material,
            solver_iterations: self.solver_iterations,
            allow_sleep: self.allow_sleep,
            ..WorldConfig::default()
        }
    }
}

/// Floor plane at y = 0, four walls around a square of side
/// `2 * tray_half_extent`, and the die resting at the centre.
fn build_world(config: &TrayConfig) -> DiceResult<(PhysicsWorld, BodyId, TopFaceResolver)> {
    let mut world = PhysicsWorld::new(config.world_config());
    world.add_contact_material(DIE_MATERIAL, FLOOR_MATERIAL, config.die_floor);
    world.add_contact_material(DIE_MATERIAL, WALL_MATERIAL, config.die_wall);

    let floor = Arc::new(Shape::plane(Unit::new_normalize(Vector3::y())));
    world.add_body(RigidBody::fixed(floor).with_material(FLOOR_MATERIAL));

    let e = config.tray_half_extent;
    let t = config.wall_thickness;
    let h = config.wall_height;
    let offset = e + t / 2.0;
    // x walls span the z walls' thickness so the corners are closed
    let x_wall = Arc::new(Shape::cuboid(Vector3::new(t / 2.0, h / 2.0, e + t))?);
    let z_wall = Arc::new(Shape::cuboid(Vector3::new(e + t, h / 2.0, t / 2.0))?);
    for (shape, x, z) in [
        (&x_wall, offset, 0.0),
        (&x_wall, -offset, 0.0),
        (&z_wall, 0.0, offset),
        (&z_wall, 0.0, -offset),
    ] {
        let wall = RigidBody::fixed(Arc::clone(shape))
            .with_position(Point3::new(x, h / 2.0, z))
            .with_material(WALL_MATERIAL);
        world.add_body(wall);
    }

    let ico = Polyhedron::icosahedron(config.die_radius)?;
    let resolver = TopFaceResolver::from_polyhedron(&ico);
    let die = RigidBody::dynamic(Arc::new(Shape::from(ico)), config.die_mass)?
        .with_position(Point3::new(0.0, config.die_radius, 0.0))
        .with_damping(config.die_linear_damping, config.die_angular_damping)
        .with_material(DIE_MATERIAL);
    let die = world.add_body(die);

    Ok((world, die, resolver))
}

/// World, controller and frame accumulator behind one handle.
///
/// The caller supplies frame deltas through [`advance`](Self::advance) and
/// polls [`die_pose`](Self::die_pose), [`state`](Self::state) and
/// [`result`](Self::result) afterwards.
#[derive(Debug)]
pub struct DiceTray<R = StdRng> {
    config: TrayConfig,
    world: PhysicsWorld,
    controller: RollController<R>,
    stepper: FixedStepper,
    die: BodyId,
}

impl DiceTray<StdRng> {
    pub fn from_seed(config: TrayConfig, seed: u64) -> DiceResult<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(config: TrayConfig) -> DiceResult<Self> {
        Self::new(config, StdRng::from_entropy())
    }
}

impl<R: Rng> DiceTray<R> {
    /// Build the tray and read the face currently on top. The controller
    /// starts `Idle`.
    pub fn new(config: TrayConfig, rng: R) -> DiceResult<Self> {
        config.validate()?;
        let (world, die, resolver) = build_world(&config)?;
        let mut controller = RollController::new(config.roll.clone(), die, resolver, rng);
        controller.prime(&world);
        let stepper = FixedStepper::new(config.fixed_step, config.max_frame_dt);
        debug!(bodies = world.body_count(), "dice tray ready");
        Ok(Self {
            config,
            world,
            controller,
            stepper,
            die,
        })
    }

    pub fn config(&self) -> &TrayConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn controller(&self) -> &RollController<R> {
        &self.controller
    }

    pub fn die(&self) -> BodyId {
        self.die
    }

    /// Launch the die. No-op (returns `false`) while a roll is in flight.
    pub fn start_roll(&mut self) -> bool {
        self.controller.start_roll(&mut self.world)
    }

    /// Feed one frame's elapsed wall time. Runs every fixed step that is due,
    /// checking for settle after each, and returns the outcome if the roll
    /// finished during this call.
    pub fn advance(&mut self, real_dt: Real) -> Option<RollOutcome> {
        let ticks = self.stepper.accumulate(real_dt);
        let step = self.stepper.step();
        let mut outcome = None;
        for _ in 0..ticks {
            self.world.step(step);
            if let Some(done) = self.controller.after_step(&self.world, step) {
                outcome = Some(done);
            }
        }
        outcome
    }

    /// Start a roll and feed `frame_dt` per frame until it finishes.
    ///
    /// Returns the outcome and the number of frames used. `None` if a roll was
    /// already in flight (nothing is advanced) or `max_frames` ran out first.
    pub fn roll_blocking(&mut self, frame_dt: Real, max_frames: u32) -> Option<(RollOutcome, u32)> {
        if !self.start_roll() {
            return None;
        }
        for frame in 1..=max_frames {
            if let Some(outcome) = self.advance(frame_dt) {
                return Some((outcome, frame));
            }
        }
        None
    }

    pub fn die_pose(&self) -> Pose {
        self.world.body(self.die).map(RigidBody::pose).unwrap_or_default()
    }

    pub fn state(&self) -> RollState {
        self.controller.state()
    }

    pub fn result(&self) -> Option<TopFaceResult> {
        self.controller.result()
    }
}
