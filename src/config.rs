//! World configuration
//!
//! Tuning knobs for the naub world, loadable from JSON so hosts can keep them
//! next to their own settings.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{NaubinoError, NaubinoResult};
use crate::physics::PhysicsConfig;

/// Naub world configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaubinoConfig {
    /// Arena size in world units (spawners and renderers use it)
    pub size: Vec2,
    /// Radius given to every naub at creation
    pub naub_radius: f32,

    // === Constraints ===
    /// Stiffness of naub joints (0..1]
    pub joint_stiffness: f32,
    /// Stiffness of the pointer drag constraint (0..1]
    pub pointer_stiffness: f32,

    // === Pointer motion ===
    /// Fraction of the remaining distance covered by an anchor per step (0..1]
    pub pointer_catch_up: f32,
    /// Upper bound on anchor travel per step
    pub pointer_max_step: f32,

    // === Scoring / diagnostics ===
    /// Points per naub in a popped cycle
    pub points_per_naub: f32,
    /// Average body speed that flags the world as exploding
    pub explosion_speed: f32,

    /// Fixed timestep in seconds
    pub dt: f32,
    /// Physics substrate tuning
    pub physics: PhysicsConfig,
}

impl Default for NaubinoConfig {
    fn default() -> Self {
        Self {
            size: Vec2::new(200.0, 200.0),
            naub_radius: NAUB_RADIUS,

            joint_stiffness: JOINT_STIFFNESS,
            pointer_stiffness: POINTER_STIFFNESS,

            pointer_catch_up: POINTER_CATCH_UP,
            pointer_max_step: POINTER_MAX_STEP,

            points_per_naub: POINTS_PER_NAUB,
            explosion_speed: EXPLOSION_SPEED,

            dt: SIM_DT,
            physics: PhysicsConfig::default(),
        }
    }
}

impl NaubinoConfig {
    /// Parse and validate a JSON config; missing fields take defaults
    pub fn from_json(json: &str) -> NaubinoResult<Self> {
        let config: Self = serde_json::from_str(json).inspect_err(|e| {
            log::warn!("Failed to parse naubino config: {}", e);
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> NaubinoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> NaubinoResult<()> {
        let unit = |v: f32| v > 0.0 && v <= 1.0;

        if !(self.naub_radius > 0.0) {
            return Err(NaubinoError::InvalidConfig("naub_radius must be positive"));
        }
        if !unit(self.joint_stiffness) || !unit(self.pointer_stiffness) {
            return Err(NaubinoError::InvalidConfig("stiffness must be in (0, 1]"));
        }
        if !unit(self.pointer_catch_up) {
            return Err(NaubinoError::InvalidConfig("pointer_catch_up must be in (0, 1]"));
        }
        if !(self.pointer_max_step > 0.0) {
            return Err(NaubinoError::InvalidConfig("pointer_max_step must be positive"));
        }
        if !(self.dt > 0.0) {
            return Err(NaubinoError::InvalidConfig("dt must be positive"));
        }
        if self.physics.iterations == 0 {
            return Err(NaubinoError::InvalidConfig("physics.iterations must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.physics.air_friction) {
            return Err(NaubinoError::InvalidConfig("physics.air_friction must be in [0, 1)"));
        }
        Ok(())
    }
}
