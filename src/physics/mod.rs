//! Physics substrate seam
//!
//! The naub world never integrates bodies itself. It creates circles, anchors
//! and distance constraints through `PhysicsWorld`, advances it once per step
//! and consumes the collision-start pairs that step reports.

pub mod simple;

pub use simple::SimplePhysics;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{AIR_FRICTION, SOLVER_ITERATIONS};

/// Opaque handle to a rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Opaque handle to a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstraintHandle(pub u32);

/// Second end of a constraint
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintTarget {
    Body(BodyHandle),
    /// Fixed world point
    Point(Vec2),
}

/// Distance constraint between a body and a body or world point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintDesc {
    pub body: BodyHandle,
    pub target: ConstraintTarget,
    /// Rest length
    pub length: f32,
    /// Fraction of the error corrected per solver iteration (0..1]
    pub stiffness: f32,
}

/// Two bodies that started touching during a step (ordered, `a < b`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionPair {
    pub fn new(x: BodyHandle, y: BodyHandle) -> Self {
        if x <= y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }
}

/// Solver tuning shared by substrate implementations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Constraint/contact solver passes per step
    pub iterations: u32,
    /// Fraction of velocity lost per step
    pub air_friction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            iterations: SOLVER_ITERATIONS,
            air_friction: AIR_FRICTION,
        }
    }
}

/// The operations the naub world needs from a 2D rigid-body engine
pub trait PhysicsWorld {
    /// Add a dynamic, colliding circle
    fn add_circle(&mut self, pos: Vec2, radius: f32) -> BodyHandle;
    /// Add a non-colliding body that only moves when positioned explicitly
    fn add_kinematic(&mut self, pos: Vec2) -> BodyHandle;
    fn remove_body(&mut self, body: BodyHandle);

    fn position(&self, body: BodyHandle) -> Option<Vec2>;
    /// Teleport a body; dynamic bodies keep their velocity
    fn set_position(&mut self, body: BodyHandle, pos: Vec2);
    fn velocity(&self, body: BodyHandle) -> Option<Vec2>;
    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2);

    fn add_constraint(&mut self, desc: ConstraintDesc) -> ConstraintHandle;
    /// Move the first end of a constraint onto another body
    fn rebind_constraint(&mut self, constraint: ConstraintHandle, body: BodyHandle);
    fn set_constraint_target(&mut self, constraint: ConstraintHandle, target: ConstraintTarget);
    fn remove_constraint(&mut self, constraint: ConstraintHandle);

    /// Integrate one step; returns the pairs that started touching
    fn step(&mut self, dt: f32) -> Vec<CollisionPair>;

    /// Colliding bodies overlapping the circle at `center`, closest first
    fn query_region(&self, center: Vec2, radius: f32) -> Vec<BodyHandle>;

    /// Mean speed of all dynamic bodies (0 when there are none)
    fn average_speed(&self) -> f32;

    fn body_count(&self) -> usize;
    fn constraint_count(&self) -> usize;
}
