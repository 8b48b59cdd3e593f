//! Roll lifecycle: launch the die, watch it come to rest, read the top face.
//!
//! ```text
//! Idle ──start_roll──▶ Rolling ──settled / timed out──▶ Finalized
//!  ▲                                                       │
//!  └──────────────────────── start_roll ◀──────────────────┘
//! ```
//!
//! [`RollController::after_step`] must be called once after every fixed
//! physics step so the settle counter sees each step exactly once.

use std::f32::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::body::{BodyId, Pose};
use crate::face::{TopFaceResolver, TopFaceResult};
use crate::math::{quat_from_euler, Point3, Real, Vector3};
use crate::world::PhysicsWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollState {
    /// Nothing in flight; the last result (if any) is on display.
    Idle,
    Rolling,
    /// The roll ended and its result is available. Accepts a new roll.
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalizeReason {
    /// Both speeds stayed under threshold for the required number of steps.
    Settled,
    /// The roll ran out of time; the face on top at that moment counts.
    TimedOut,
}

/// Bookkeeping for the roll in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollSession {
    pub state: RollState,
    /// Consecutive steps with the die below both speed thresholds.
    pub settle_frames: u32,
    /// Simulated seconds since launch.
    pub elapsed: Real,
    /// World time at launch.
    pub roll_start_time: Real,
}

impl Default for RollSession {
    fn default() -> Self {
        Self {
            state: RollState::Idle,
            settle_frames: 0,
            elapsed: 0.0,
            roll_start_time: 0.0,
        }
    }
}

/// Sampling ranges for the launch. Each component is drawn independently and
/// uniformly; a span with `min == max` always yields `min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchRanges {
    pub position_x: (Real, Real),
    pub position_y: (Real, Real),
    pub position_z: (Real, Real),
    pub impulse_x: (Real, Real),
    pub impulse_y: (Real, Real),
    pub impulse_z: (Real, Real),
    pub torque: (Real, Real),
}

impl Default for LaunchRanges {
    fn default() -> Self {
        Self {
            position_x: (-1.0, 1.0),
            position_y: (3.0, 3.0),
            position_z: (-1.0, 1.0),
            impulse_x: (-2.5, 2.5),
            impulse_y: (2.8, 4.4),
            impulse_z: (-2.5, 2.5),
            torque: (-18.0, 18.0),
        }
    }
}

impl LaunchRanges {
    pub(crate) fn spans(&self) -> [(&'static str, (Real, Real)); 7] {
        [
            ("launch.position_x", self.position_x),
            ("launch.position_y", self.position_y),
            ("launch.position_z", self.position_z),
            ("launch.impulse_x", self.impulse_x),
            ("launch.impulse_y", self.impulse_y),
            ("launch.impulse_z", self.impulse_z),
            ("launch.torque", self.torque),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollConfig {
    /// Linear speed below which a step counts towards settling, m/s.
    pub lin_eps: Real,
    /// Angular speed below which a step counts towards settling, rad/s.
    pub ang_eps: Real,
    pub settle_frames_required: u32,
    pub max_roll_seconds: Real,
    pub launch: LaunchRanges,
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            lin_eps: 0.12,
            ang_eps: 0.22,
            settle_frames_required: 18,
            max_roll_seconds: 6.0,
            launch: LaunchRanges::default(),
        }
    }
}

/// What a finished roll produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollOutcome {
    pub result: TopFaceResult,
    pub reason: FinalizeReason,
    /// Simulated seconds from launch to finalisation.
    pub elapsed: Real,
    /// Die pose at finalisation.
    pub pose: Pose,
}

/// Drives one die through repeated rolls.
///
/// The random source is injected so a seeded or fixed-sequence generator
/// reproduces a roll exactly.
#[derive(Debug)]
pub struct RollController<R> {
    config: RollConfig,
    die: BodyId,
    resolver: TopFaceResolver,
    rng: R,
    session: RollSession,
    result: Option<TopFaceResult>,
}

impl<R: Rng> RollController<R> {
    pub fn new(config: RollConfig, die: BodyId, resolver: TopFaceResolver, rng: R) -> Self {
        Self {
            config,
            die,
            resolver,
            rng,
            session: RollSession::default(),
            result: None,
        }
    }

    pub fn config(&self) -> &RollConfig {
        &self.config
    }

    pub fn die(&self) -> BodyId {
        self.die
    }

    pub fn resolver(&self) -> &TopFaceResolver {
        &self.resolver
    }

    pub fn state(&self) -> RollState {
        self.session.state
    }

    pub fn session(&self) -> &RollSession {
        &self.session
    }

    /// Last resolved face: from the most recent finished roll, or from
    /// [`prime`](Self::prime) before the first roll.
    pub fn result(&self) -> Option<TopFaceResult> {
        self.result
    }

    /// Read the face currently on top without starting a roll. The state is
    /// left untouched.
    pub fn prime(&mut self, world: &PhysicsWorld) -> Option<TopFaceResult> {
        let body = world.body(self.die)?;
        let result = self.resolver.resolve(&body.orientation);
        self.result = Some(result);
        Some(result)
    }

    /// Launch a new roll. Returns `false` without touching anything if a roll
    /// is already in flight or the die is missing from `world`.
    pub fn start_roll(&mut self, world: &mut PhysicsWorld) -> bool {
        if self.session.state == RollState::Rolling {
            debug!("start_roll ignored: roll already in progress");
            return false;
        }
        let now = world.time();
        let Some(die) = world.body_mut(self.die) else {
            warn!(body = self.die.index(), "start_roll ignored: die body not in world");
            return false;
        };

        let launch = &self.config.launch;
        let rng = &mut self.rng;
        let position = Point3::new(
            sample(rng, launch.position_x),
            sample(rng, launch.position_y),
            sample(rng, launch.position_z),
        );
        let orientation = quat_from_euler(
            rng.gen_range(0.0..TAU),
            rng.gen_range(0.0..TAU),
            rng.gen_range(0.0..TAU),
        );
        let impulse = Vector3::new(
            sample(rng, launch.impulse_x),
            sample(rng, launch.impulse_y),
            sample(rng, launch.impulse_z),
        );
        let torque = Vector3::new(
            sample(rng, launch.torque),
            sample(rng, launch.torque),
            sample(rng, launch.torque),
        );

        die.reset_motion();
        die.wake();
        die.set_pose(Pose {
            position,
            orientation,
        });
        die.apply_impulse(impulse);
        die.apply_torque(torque);

        self.session = RollSession {
            state: RollState::Rolling,
            settle_frames: 0,
            elapsed: 0.0,
            roll_start_time: now,
        };
        debug!(
            ?position,
            ?impulse,
            ?torque,
            start = now,
            "roll launched"
        );
        true
    }

    /// Settle bookkeeping for one physics step of length `dt` that has just
    /// run. Returns the outcome on the step that finalises the roll.
    pub fn after_step(&mut self, world: &PhysicsWorld, dt: Real) -> Option<RollOutcome> {
        if self.session.state != RollState::Rolling {
            return None;
        }
        self.session.elapsed += dt.max(0.0);

        let body = world.body(self.die);
        let still = body.map_or(false, |b| {
            b.speed() < self.config.lin_eps && b.angular_speed() < self.config.ang_eps
        });
        if still {
            self.session.settle_frames += 1;
        } else {
            self.session.settle_frames = 0;
        }
        trace!(
            settle_frames = self.session.settle_frames,
            elapsed = self.session.elapsed,
            "settle check"
        );

        let reason = if self.session.settle_frames >= self.config.settle_frames_required {
            FinalizeReason::Settled
        } else if self.session.elapsed >= self.config.max_roll_seconds {
            FinalizeReason::TimedOut
        } else {
            return None;
        };

        let pose = body.map(|b| b.pose()).unwrap_or_default();
        let result = self.resolver.resolve(&pose.orientation);
        self.result = Some(result);
        self.session.state = RollState::Finalized;

        match reason {
            FinalizeReason::Settled => info!(
                value = result.value(),
                elapsed = self.session.elapsed,
                "roll settled"
            ),
            FinalizeReason::TimedOut => warn!(
                value = result.value(),
                elapsed = self.session.elapsed,
                "roll timed out before settling"
            ),
        }

        Some(RollOutcome {
            result,
            reason,
            elapsed: self.session.elapsed,
            pose,
        })
    }
}

fn sample<R: Rng>(rng: &mut R, (min, max): (Real, Real)) -> Real {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBody;
    use crate::shape::{Polyhedron, Shape};
    use crate::world::WorldConfig;
    use approx::assert_relative_eq;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    const DT: Real = 1.0 / 60.0;

    fn floating_die<R: Rng>(rng: R) -> (PhysicsWorld, RollController<R>) {
        let mut world = PhysicsWorld::new(WorldConfig::default().zero_gravity());
        let ico = Polyhedron::icosahedron(1.0).expect("icosahedron");
        let resolver = TopFaceResolver::from_polyhedron(&ico);
        let body = RigidBody::dynamic(Arc::new(Shape::from(ico)), 1.2).expect("die");
        let die = world.add_body(body);
        let controller = RollController::new(RollConfig::default(), die, resolver, rng);
        (world, controller)
    }

    #[test]
    fn test_start_roll_enters_rolling() {
        let (mut world, mut roll) = floating_die(StdRng::seed_from_u64(1));
        assert_eq!(roll.state(), RollState::Idle);
        assert!(roll.result().is_none());
        assert!(roll.prime(&world).is_some());
        assert_eq!(roll.state(), RollState::Idle);

        assert!(roll.start_roll(&mut world));
        assert_eq!(roll.state(), RollState::Rolling);
        assert_eq!(roll.session().settle_frames, 0);
        assert_relative_eq!(roll.session().elapsed, 0.0);

        let die = world.body(roll.die()).expect("die");
        assert!(die.position.x >= -1.0 && die.position.x < 1.0);
        assert!(die.position.z >= -1.0 && die.position.z < 1.0);
        assert_relative_eq!(die.position.y, 3.0);
        // impulse of at least 2.8 upward on 1.2 kg
        assert!(die.velocity.y >= 2.8 / 1.2 - 1e-4);
    }

    #[test]
    fn test_fixed_sequence_rng_gives_lower_bounds() {
        let (mut world, mut roll) = floating_die(StepRng::new(0, 0));
        assert!(roll.start_roll(&mut world));
        let die = world.body(roll.die()).expect("die");
        assert_relative_eq!(die.position, Point3::new(-1.0, 3.0, -1.0));
        assert_relative_eq!(die.orientation.angle(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(
            die.velocity,
            Vector3::new(-2.5, 2.8, -2.5) / 1.2,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_second_start_is_ignored() {
        let (mut world, mut roll) = floating_die(StdRng::seed_from_u64(2));
        assert!(roll.start_roll(&mut world));
        for _ in 0..5 {
            world.step(DT);
            roll.after_step(&world, DT);
        }
        let session = *roll.session();
        let pose = world.body(roll.die()).expect("die").pose();

        assert!(!roll.start_roll(&mut world));
        assert_eq!(*roll.session(), session);
        assert_eq!(world.body(roll.die()).expect("die").pose(), pose);
    }

    #[test]
    fn test_settles_after_required_still_steps() {
        let (mut world, mut roll) = floating_die(StdRng::seed_from_u64(3));
        assert!(roll.start_roll(&mut world));
        world.body_mut(roll.die()).expect("die").reset_motion();

        for i in 1..18 {
            world.step(DT);
            assert!(roll.after_step(&world, DT).is_none());
            assert_eq!(roll.session().settle_frames, i);
        }
        world.step(DT);
        let outcome = roll.after_step(&world, DT).expect("finalized");
        assert_eq!(outcome.reason, FinalizeReason::Settled);
        assert_eq!(roll.state(), RollState::Finalized);
        assert_eq!(roll.result(), Some(outcome.result));
        assert!((1..=20).contains(&outcome.result.value()));

        // finalized controllers do nothing until the next launch
        world.step(DT);
        assert!(roll.after_step(&world, DT).is_none());
        assert!(roll.start_roll(&mut world));
        assert_eq!(roll.state(), RollState::Rolling);
    }

    #[test]
    fn test_motion_resets_settle_counter() {
        let (mut world, mut roll) = floating_die(StdRng::seed_from_u64(4));
        assert!(roll.start_roll(&mut world));
        let id = roll.die();
        world.body_mut(id).expect("die").reset_motion();
        for _ in 0..10 {
            world.step(DT);
            roll.after_step(&world, DT);
        }
        assert_eq!(roll.session().settle_frames, 10);

        world.body_mut(id).expect("die").velocity = Vector3::new(0.5, 0.0, 0.0);
        world.step(DT);
        roll.after_step(&world, DT);
        assert_eq!(roll.session().settle_frames, 0);
        assert_eq!(roll.state(), RollState::Rolling);
    }

    #[test]
    fn test_never_settling_roll_times_out() {
        let (mut world, mut roll) = floating_die(StdRng::seed_from_u64(5));
        assert!(roll.start_roll(&mut world));

        let mut outcome = None;
        let mut steps = 0;
        while outcome.is_none() && steps < 1000 {
            world.step(DT);
            outcome = roll.after_step(&world, DT);
            steps += 1;
        }
        let outcome = outcome.expect("timed out");
        assert_eq!(outcome.reason, FinalizeReason::TimedOut);
        assert!((360..=361).contains(&steps));
        assert!(outcome.elapsed >= 6.0 - 1e-3);
        assert_eq!(roll.state(), RollState::Finalized);
    }

    #[test]
    fn test_missing_die_is_rejected() {
        let (_, mut roll) = floating_die(StdRng::seed_from_u64(6));
        let mut empty = PhysicsWorld::default();
        assert!(!roll.start_roll(&mut empty));
        assert_eq!(roll.state(), RollState::Idle);
        assert!(roll.prime(&empty).is_none());
    }

    #[test]
    fn test_same_seed_same_launch() {
        let (mut w1, mut r1) = floating_die(StdRng::seed_from_u64(42));
        let (mut w2, mut r2) = floating_die(StdRng::seed_from_u64(42));
        r1.start_roll(&mut w1);
        r2.start_roll(&mut w2);
        let a = w1.body(r1.die()).expect("die");
        let b = w2.body(r2.die()).expect("die");
        assert_eq!(a.pose(), b.pose());
        assert_eq!(a.velocity, b.velocity);
    }

    #[test]
    fn test_sample_handles_empty_span() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_relative_eq!(sample(&mut rng, (3.0, 3.0)), 3.0);
        assert_relative_eq!(sample(&mut rng, (2.0, 1.0)), 2.0);
        for _ in 0..100 {
            let v = sample(&mut rng, (-18.0, 18.0));
            assert!((-18.0..18.0).contains(&v));
        }
    }
}
