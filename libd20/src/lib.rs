//! libd20: rigid-body simulation of a twenty-sided die rolled in a walled tray.
//!
//! - Convex polyhedron geometry with exact mass properties
//! - Semi-implicit Euler integration, SAT contact generation against planes
//!   and boxes, sequential-impulse solver with restitution and Coulomb friction
//! - Fixed-step accumulator so frame rate never changes the simulation
//! - Roll state machine with a velocity debounce and a hard timeout
//! - Top-face resolution from body-space face normals
//!
//! Example:
//! ```no_run
//! use libd20::{DiceTray, TrayConfig};
//!
//! let mut tray = DiceTray::from_seed(TrayConfig::default(), 7)?;
//! tray.start_roll();
//! loop {
//!     if let Some(outcome) = tray.advance(1.0 / 60.0) {
//!         println!("rolled {}", outcome.result.value());
//!         break;
//!     }
//! }
//! # Ok::<(), libd20::DiceError>(())
//! ```

pub mod body;
pub mod collision;
pub mod error;
pub mod face;
pub mod math;
pub mod roll;
pub mod shape;
pub mod stepper;
pub mod tray;
pub mod world;

pub use body::{BodyId, BodyKind, MaterialId, Pose, RigidBody};
pub use collision::Contact;
pub use error::{DiceError, DiceResult};
pub use face::{resolve_top_face, FaceFrame, TopFaceResolver, TopFaceResult};
pub use math::Real;
pub use roll::{
    FinalizeReason, LaunchRanges, RollConfig, RollController, RollOutcome, RollSession, RollState,
};
pub use shape::{MassProperties, Polyhedron, Shape};
pub use stepper::FixedStepper;
pub use tray::{DiceTray, TrayConfig};
pub use world::{ContactMaterial, PhysicsWorld, WorldConfig};
