//! Naubino - gameplay core of a real-time connect/merge puzzle
//!
//! Core modules:
//! - `graph`: Naub/joint arena, join/unjoin/merge and cycle detection
//! - `naubino`: The world (factory, collision/merge system, stepping)
//! - `pointer`: Drag anchors driven by an external input layer
//! - `physics`: Physics substrate seam plus a small deterministic engine
//! - `arena`: Spawner collaborator (population cap, spawn cadence)
//! - `hunter`: Scripted drag driver used by tests and the demo

pub mod arena;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod hunter;
pub mod naubino;
pub mod physics;
pub mod pointer;
pub mod timer;

pub use arena::{ArenaConfig, ArenaMode};
pub use config::NaubinoConfig;
pub use error::{NaubinoError, NaubinoResult, Violation};
pub use events::NaubinoEvent;
pub use graph::{JointId, Naub, NaubColor, NaubGraph, NaubId, NaubJoint};
pub use hunter::Hunter;
pub use naubino::{Naubino, StepReport, TouchOutcome};
pub use physics::{PhysicsWorld, SimplePhysics};
pub use pointer::{Pointer, PointerId, PointerSystem};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Uniform naub radius (world units)
    pub const NAUB_RADIUS: f32 = 1.0;

    /// Joint rest length is this many times the summed radii
    pub const JOINT_LENGTH_FACTOR: f32 = 2.0;
    /// Stiffness of naub joints (0..1, per solver iteration)
    pub const JOINT_STIFFNESS: f32 = 0.2;

    /// Stiffness of the zero-length pointer constraint
    pub const POINTER_STIFFNESS: f32 = 0.7;
    /// Fraction of the remaining distance a pointer anchor covers per step
    pub const POINTER_CATCH_UP: f32 = 0.25;
    /// Maximum anchor travel per step (world units)
    pub const POINTER_MAX_STEP: f32 = 0.5;

    /// Score awarded per naub in a popped cycle
    pub const POINTS_PER_NAUB: f32 = 1.25;

    /// Average body speed (units/s) above which the world counts as exploding
    pub const EXPLOSION_SPEED: f32 = 600.0;

    /// Constraint solver iterations per step
    pub const SOLVER_ITERATIONS: u32 = 4;
    /// Fraction of velocity lost per step
    pub const AIR_FRICTION: f32 = 0.05;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Unit vector pointing along `rot` radians (0 = +x)
#[inline]
pub fn direction_from_angle(rot: f32) -> Vec2 {
    polar_to_cartesian(1.0, rot)
}
