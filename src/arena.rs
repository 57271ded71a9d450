//! Arena mode: the spawner collaborator
//!
//! Spawns naub pairs just outside the arena at a shrinking interval, ties
//! each one to the arena center with a weak constraint and lets go of that
//! constraint when the world reports the naub gone. The population cap lives
//! here; the world only exposes its live count.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::{NaubinoError, NaubinoResult, Violation};
use crate::events::NaubinoEvent;
use crate::graph::{NaubColor, NaubId};
use crate::naubino::Naubino;
use crate::physics::{ConstraintDesc, ConstraintHandle, ConstraintTarget, PhysicsWorld};
use crate::polar_to_cartesian;
use crate::timer::Timer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Keep spawning pairs in one go until at least this many naubs live
    pub min_naubs: usize,
    /// Population cap; `None` is unbounded
    pub max_naubs: Option<usize>,
    /// Seconds between spawns at the start
    pub spawn_interval: f32,
    /// Floor the spawn interval decays toward
    pub min_spawn_interval: f32,
    /// Steps for the interval to cover ~63% of the way to the floor
    pub interval_decay_steps: f32,
    /// Stiffness of the pull toward the arena center
    pub center_stiffness: f32,
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            min_naubs: 0,
            max_naubs: Some(80),
            spawn_interval: 3.0,
            min_spawn_interval: 0.5,
            interval_decay_steps: 1200.0,
            center_stiffness: 0.0002,
            seed: 0,
        }
    }
}

impl ArenaConfig {
    pub fn validate(&self) -> NaubinoResult<()> {
        if !(self.spawn_interval > 0.0) || !(self.min_spawn_interval > 0.0) {
            return Err(NaubinoError::InvalidConfig("spawn intervals must be positive"));
        }
        if !(self.interval_decay_steps >= 1.0) {
            return Err(NaubinoError::InvalidConfig("interval_decay_steps must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.center_stiffness) {
            return Err(NaubinoError::InvalidConfig("center_stiffness must be in [0, 1]"));
        }
        Ok(())
    }
}

pub struct ArenaMode {
    config: ArenaConfig,
    spammer: Timer,
    /// Turn off to freeze the population
    pub spawning: bool,
    center: Vec2,
    center_joints: BTreeMap<NaubId, ConstraintHandle>,
    rng: Pcg32,
}

impl ArenaMode {
    /// Fails with `InvalidConfig` if `config` does not validate
    pub fn new<P: PhysicsWorld>(naubino: &Naubino<P>, config: ArenaConfig) -> NaubinoResult<Self> {
        config.validate()?;
        let mut spammer = Timer::new(config.spawn_interval);
        spammer.start();
        let rng = Pcg32::seed_from_u64(config.seed);
        Ok(Self {
            center: naubino.config().size * 0.5,
            config,
            spammer,
            spawning: true,
            center_joints: BTreeMap::new(),
            rng,
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Seconds until the next spawn, at the current cadence
    pub fn spawn_interval(&self) -> f32 {
        self.spammer.interval
    }

    pub fn center_pos(&self) -> Vec2 {
        self.center
    }

    /// Move the attractor every spawned naub is pulled toward
    pub fn set_center_pos<P: PhysicsWorld>(&mut self, naubino: &mut Naubino<P>, center: Vec2) {
        self.center = center;
        for constraint in self.center_joints.values() {
            naubino
                .physics_mut()
                .set_constraint_target(*constraint, ConstraintTarget::Point(center));
        }
    }

    /// Naubs still tied to the center
    pub fn center_joint_count(&self) -> usize {
        self.center_joints.len()
    }

    /// Spawn on timer and shorten the interval
    pub fn step<P: PhysicsWorld>(&mut self, naubino: &mut Naubino<P>) -> NaubinoResult<()> {
        if !self.spawning {
            return Ok(());
        }
        if self.spammer.step(naubino.config().dt) {
            self.spam_naub_bunch(naubino)?;
        }

        let interval = self.spammer.interval;
        let floor = self.config.min_spawn_interval;
        self.spammer.interval = interval - (interval - floor) / self.config.interval_decay_steps;
        Ok(())
    }

    /// Feed one world event; drops center constraints of removed naubs
    pub fn on_event<P: PhysicsWorld>(&mut self, naubino: &mut Naubino<P>, event: &NaubinoEvent) {
        if let NaubinoEvent::NaubRemoved(naub) = event {
            if let Some(constraint) = self.center_joints.remove(naub) {
                naubino.physics_mut().remove_constraint(constraint);
            }
        }
    }

    /// One pair, then more while below `min_naubs`; nothing above the cap
    pub fn spam_naub_bunch<P: PhysicsWorld>(
        &mut self,
        naubino: &mut Naubino<P>,
    ) -> NaubinoResult<Vec<NaubId>> {
        let mut spawned = Vec::new();
        loop {
            if self.at_capacity(naubino) {
                log::trace!("Arena full ({} naubs), skipping spawn", naubino.naub_count());
                break;
            }
            spawned.extend(self.spam_naub_pair(naubino)?);
            if naubino.naub_count() >= self.config.min_naubs {
                break;
            }
        }
        Ok(spawned)
    }

    /// A randomly colored, randomly rotated pair just outside the arena
    pub fn spam_naub_pair<P: PhysicsWorld>(
        &mut self,
        naubino: &mut Naubino<P>,
    ) -> NaubinoResult<Vec<NaubId>> {
        let pos = self.random_naub_pos(naubino);
        let rot = self.rng.random_range(0.0..TAU);
        let naubs = naubino.create_naub_chain(2, Some(pos), Some(rot))?;

        for &naub in &naubs {
            let color = NaubColor::ALL[self.rng.random_range(0..NaubColor::ALL.len())];
            naubino.set_naub_color(naub, color)?;

            let body = naubino.naub_body(naub).ok_or(Violation::MissingBody(naub))?;
            let constraint = naubino.physics_mut().add_constraint(ConstraintDesc {
                body,
                target: ConstraintTarget::Point(self.center),
                length: 0.0,
                stiffness: self.config.center_stiffness,
            });
            self.center_joints.insert(naub, constraint);
        }

        log::debug!("Spawned naub pair at ({:.1}, {:.1})", pos.x, pos.y);
        Ok(naubs)
    }

    /// A point on a circle enclosing the whole arena
    pub fn random_naub_pos<P: PhysicsWorld>(&mut self, naubino: &Naubino<P>) -> Vec2 {
        let config = naubino.config();
        let radius = config.size.length() * 0.5 + config.naub_radius * 4.0;
        let angle = self.rng.random_range(0.0..TAU);
        config.size * 0.5 + polar_to_cartesian(radius, angle)
    }

    fn at_capacity<P: PhysicsWorld>(&self, naubino: &Naubino<P>) -> bool {
        self.config
            .max_naubs
            .is_some_and(|max| naubino.naub_count() + 2 > max)
    }
}
