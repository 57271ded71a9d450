//! The naub world
//!
//! `Naubino` owns the graph, the physics substrate, the pointer system and the
//! tables tying naubs and joints to bodies and constraints. One `step` moves
//! pointer anchors, advances physics, turns collision starts into joins,
//! merges and pops, then reconciles the live sets.

mod collision;
mod factory;

pub use collision::TouchOutcome;
pub use factory::chain_offsets;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::NaubinoConfig;
use crate::error::{NaubinoResult, Violation};
use crate::events::{EventQueue, NaubinoEvent};
use crate::graph::{JointId, NaubColor, NaubGraph, NaubId};
use crate::physics::{
    BodyHandle, ConstraintDesc, ConstraintHandle, ConstraintTarget, PhysicsWorld, SimplePhysics,
};
use crate::pointer::{Pointer, PointerId, PointerSystem};

/// Renderer-facing view of a live naub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaubSnapshot {
    pub id: NaubId,
    pub pos: Vec2,
    pub radius: f32,
    pub color: NaubColor,
    /// A live pointer is dragging it
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSnapshot {
    pub id: JointId,
    pub a: NaubId,
    pub b: NaubId,
}

/// What one step left behind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepReport {
    pub naubs: Vec<NaubSnapshot>,
    pub joints: Vec<JointSnapshot>,
    /// Points scored since the previous report
    pub score_delta: f32,
    pub score: f32,
    pub exploding: bool,
}

/// Naub <-> body lookup, owned by the world
#[derive(Debug, Default)]
struct BodyTable {
    by_naub: BTreeMap<NaubId, BodyHandle>,
    by_body: HashMap<BodyHandle, NaubId>,
}

impl BodyTable {
    fn insert(&mut self, naub: NaubId, body: BodyHandle) {
        self.by_naub.insert(naub, body);
        self.by_body.insert(body, naub);
    }

    fn remove(&mut self, naub: NaubId) -> Option<BodyHandle> {
        let body = self.by_naub.remove(&naub)?;
        self.by_body.remove(&body);
        Some(body)
    }

    fn body(&self, naub: NaubId) -> Option<BodyHandle> {
        self.by_naub.get(&naub).copied()
    }

    fn naub(&self, body: BodyHandle) -> Option<NaubId> {
        self.by_body.get(&body).copied()
    }
}

pub struct Naubino<P: PhysicsWorld = SimplePhysics> {
    config: NaubinoConfig,
    physics: P,
    graph: NaubGraph,
    pointers: PointerSystem,
    bodies: BodyTable,
    constraints: BTreeMap<JointId, ConstraintHandle>,
    /// Pruned of dead entries at the end of every step
    live_naubs: BTreeSet<NaubId>,
    live_joints: BTreeSet<JointId>,
    events: EventQueue,
    score: f32,
    /// Points not yet handed out in a report
    pending_score: f32,
    steps: u64,
    exploding: bool,
}

impl Naubino<SimplePhysics> {
    /// Fails with `InvalidConfig` if `config` does not validate
    pub fn new(config: NaubinoConfig) -> NaubinoResult<Self> {
        let physics = SimplePhysics::new(config.physics);
        Self::with_physics(config, physics)
    }
}

impl Default for Naubino<SimplePhysics> {
    fn default() -> Self {
        let config = NaubinoConfig::default();
        let physics = SimplePhysics::new(config.physics);
        Self::build(config, physics)
    }
}

impl<P: PhysicsWorld> Naubino<P> {
    /// Build a world on top of any physics substrate
    pub fn with_physics(config: NaubinoConfig, physics: P) -> NaubinoResult<Self> {
        config.validate()?;
        Ok(Self::build(config, physics))
    }

    fn build(config: NaubinoConfig, physics: P) -> Self {
        log::info!(
            "Naubino world created ({}x{}, naub radius {})",
            config.size.x,
            config.size.y,
            config.naub_radius
        );
        let pointers = PointerSystem::new(config.pointer_catch_up, config.pointer_max_step);
        Self {
            config,
            physics,
            graph: NaubGraph::new(),
            pointers,
            bodies: BodyTable::default(),
            constraints: BTreeMap::new(),
            live_naubs: BTreeSet::new(),
            live_joints: BTreeSet::new(),
            events: EventQueue::default(),
            score: 0.0,
            pending_score: 0.0,
            steps: 0,
            exploding: false,
        }
    }

    pub fn config(&self) -> &NaubinoConfig {
        &self.config
    }

    pub fn graph(&self) -> &NaubGraph {
        &self.graph
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    /// For collaborators that own extra bodies or constraints (spawners)
    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn pointers(&self) -> &PointerSystem {
        &self.pointers
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_exploding(&self) -> bool {
        self.exploding
    }

    /// Live naub ids as of the last reconciliation, plus any created since
    pub fn live_naubs(&self) -> impl Iterator<Item = NaubId> + '_ {
        self.live_naubs.iter().copied()
    }

    pub fn live_joints(&self) -> impl Iterator<Item = JointId> + '_ {
        self.live_joints.iter().copied()
    }

    /// Naubs currently alive, the count spawners cap against
    pub fn naub_count(&self) -> usize {
        self.live_naubs.iter().filter(|id| self.graph.is_alive(**id)).count()
    }

    pub fn joint_count(&self) -> usize {
        self.live_joints
            .iter()
            .filter(|id| self.graph.joint(**id).is_some_and(|j| j.alive))
            .count()
    }

    /// Live pointers
    pub fn pointer_count(&self) -> usize {
        self.pointers.iter().filter(|p| p.is_alive()).count()
    }

    pub fn naub_body(&self, id: NaubId) -> Option<BodyHandle> {
        self.bodies.body(id)
    }

    pub fn naub_position(&self, id: NaubId) -> Option<Vec2> {
        self.physics.position(self.bodies.body(id)?)
    }

    pub fn set_naub_position(&mut self, id: NaubId, pos: Vec2) -> NaubinoResult<()> {
        let body = self.live_body(id)?;
        self.physics.set_position(body, pos);
        Ok(())
    }

    pub fn set_naub_color(&mut self, id: NaubId, color: NaubColor) -> NaubinoResult<()> {
        self.graph.set_color(id, color)
    }

    pub fn join_naubs(&mut self, a: NaubId, b: NaubId) -> NaubinoResult<Option<JointId>> {
        self.live_body(a)?;
        self.live_body(b)?;
        let joint = self.graph.join(a, b)?;
        if let Some(id) = joint {
            self.attach_joint(id)?;
        }
        Ok(joint)
    }

    pub fn unjoin_naubs(&mut self, a: NaubId, b: NaubId) -> NaubinoResult<Option<JointId>> {
        let joint = self.graph.unjoin(a, b)?;
        if let Some(id) = joint {
            self.detach_joint(id);
        }
        Ok(joint)
    }

    /// Fuse `other` into `naub` and mirror the rewiring in physics.
    /// Returns the joints created on `naub`.
    pub fn merge_naubs(&mut self, naub: NaubId, other: NaubId) -> NaubinoResult<Vec<JointId>> {
        let body = self.live_body(naub)?;
        let outcome = self.graph.merge(naub, other)?;

        for joint in &outcome.removed_joints {
            self.detach_joint(*joint);
        }
        for joint in &outcome.created_joints {
            self.attach_joint(*joint)?;
        }
        for pointer in &outcome.moved_pointers {
            self.pointers.transfer(&mut self.physics, *pointer, naub, body);
        }
        if let Some(other_body) = self.bodies.remove(other) {
            self.physics.remove_body(other_body);
        }

        log::debug!(
            "Merged naub {} into {} ({} joints re-homed, {} pointers moved)",
            other,
            naub,
            outcome.created_joints.len(),
            outcome.moved_pointers.len()
        );
        self.events.push(NaubinoEvent::NaubsMerged { survivor: naub, merged: other });
        self.events.push(NaubinoEvent::NaubRemoved(other));
        Ok(outcome.created_joints)
    }

    /// Remove a naub with its joints, pointers and body
    pub fn remove_naub(&mut self, id: NaubId) -> NaubinoResult<()> {
        let removal = self.graph.remove_naub(id)?;
        for joint in removal.joints {
            self.detach_joint(joint);
        }
        for pointer in removal.pointers {
            self.pointers.detach(&mut self.physics, pointer);
        }
        if let Some(body) = self.bodies.remove(id) {
            self.physics.remove_body(body);
        }
        self.events.push(NaubinoEvent::NaubRemoved(id));
        Ok(())
    }

    /// The live naub under `pos`, closest first
    pub fn find_naub(&self, pos: Vec2) -> Option<NaubId> {
        self.physics
            .query_region(pos, self.config.naub_radius)
            .into_iter()
            .filter_map(|body| self.bodies.naub(body))
            .find(|id| self.graph.is_alive(*id))
    }

    /// Put a pointer on whatever naub is under `pos`
    pub fn touch_down(&mut self, pos: Vec2) -> Option<PointerId> {
        let naub = self.find_naub(pos)?;
        match self.connect_pointer_naub(naub) {
            Ok(pointer) => Some(pointer),
            Err(e) => {
                log::warn!("Touch down on naub {} failed: {}", naub, e);
                None
            }
        }
    }

    pub fn connect_pointer_naub(&mut self, naub: NaubId) -> NaubinoResult<PointerId> {
        let body = self.live_body(naub)?;
        let pos = self
            .physics
            .position(body)
            .ok_or(Violation::MissingBody(naub))?;
        let pointer = self.pointers.connect(
            &mut self.physics,
            naub,
            body,
            pos,
            self.config.pointer_stiffness,
        );
        self.graph.attach_pointer(naub, pointer)?;
        log::trace!("Pointer {} down on naub {}", pointer, naub);
        Ok(pointer)
    }

    pub fn pointer(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.get(id)
    }

    pub fn pointer_mut(&mut self, id: PointerId) -> Option<&mut Pointer> {
        self.pointers.get_mut(id)
    }

    /// True if a live pointer is dragging `naub`
    pub fn is_selected(&self, naub: NaubId) -> bool {
        self.graph
            .naub(naub)
            .is_some_and(|n| n.pointers().any(|p| self.pointers.is_alive(p)))
    }

    /// Advance the world by one fixed step
    pub fn step(&mut self) -> NaubinoResult<StepReport> {
        let dt = self.config.dt;
        self.pointers.step(&mut self.physics, dt);

        let started = self.physics.step(dt);
        for pair in started {
            self.handle_collision(pair)?;
        }

        self.reconcile();
        self.check_stability();
        self.steps += 1;
        debug_assert!(
            self.graph.check_invariants().is_ok(),
            "naub graph corrupted at step {}",
            self.steps
        );

        let mut report = self.snapshot();
        report.score_delta = std::mem::take(&mut self.pending_score);
        Ok(report)
    }

    /// Current state without stepping
    pub fn snapshot(&self) -> StepReport {
        let naubs = self
            .live_naubs
            .iter()
            .filter_map(|id| self.graph.naub(*id).filter(|n| n.alive))
            .map(|naub| NaubSnapshot {
                id: naub.id,
                pos: self.naub_position(naub.id).unwrap_or_default(),
                radius: naub.radius,
                color: naub.color,
                selected: self.is_selected(naub.id),
            })
            .collect();
        let joints = self
            .live_joints
            .iter()
            .filter_map(|id| self.graph.joint(*id).filter(|j| j.alive))
            .map(|joint| JointSnapshot {
                id: joint.id,
                a: joint.naubs.0,
                b: joint.naubs.1,
            })
            .collect();

        StepReport {
            naubs,
            joints,
            score_delta: self.pending_score,
            score: self.score,
            exploding: self.exploding,
        }
    }

    pub fn drain_events(&mut self) -> Vec<NaubinoEvent> {
        self.events.drain()
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    fn live_body(&self, id: NaubId) -> Result<BodyHandle, Violation> {
        let naub = self.graph.naub(id).ok_or(Violation::UnknownNaub(id))?;
        if !naub.alive {
            return Err(Violation::DeadNaub(id));
        }
        self.bodies.body(id).ok_or(Violation::MissingBody(id))
    }

    fn register_naub(&mut self, id: NaubId, body: BodyHandle) {
        self.bodies.insert(id, body);
        self.live_naubs.insert(id);
        self.events.push(NaubinoEvent::NaubAdded(id));
    }

    /// Back a graph joint with a physics constraint
    fn attach_joint(&mut self, id: JointId) -> NaubinoResult<()> {
        let joint = self.graph.joint(id).ok_or(Violation::UnknownJoint(id))?;
        let (a, b) = joint.naubs;
        let length = joint.rest_length;
        let body_a = self.live_body(a)?;
        let body_b = self.live_body(b)?;

        let constraint = self.physics.add_constraint(ConstraintDesc {
            body: body_a,
            target: ConstraintTarget::Body(body_b),
            length,
            stiffness: self.config.joint_stiffness,
        });
        self.constraints.insert(id, constraint);
        self.live_joints.insert(id);
        self.events.push(NaubinoEvent::JointAdded { joint: id, a, b });
        Ok(())
    }

    fn detach_joint(&mut self, id: JointId) {
        if let Some(constraint) = self.constraints.remove(&id) {
            self.physics.remove_constraint(constraint);
        }
        self.events.push(NaubinoEvent::JointRemoved(id));
    }

    /// Reclaim released pointers and prune the live sets
    fn reconcile(&mut self) {
        for pointer in self.pointers.reclaim(&mut self.physics) {
            self.graph.detach_pointer(pointer.naub(), pointer.id);
            self.events.push(NaubinoEvent::PointerRemoved {
                pointer: pointer.id,
                naub: pointer.naub(),
            });
        }

        let graph = &self.graph;
        self.live_naubs.retain(|id| graph.is_alive(*id));
        self.live_joints
            .retain(|id| graph.joint(*id).is_some_and(|j| j.alive));
    }

    fn check_stability(&mut self) {
        let speed = self.physics.average_speed();
        let exploding = speed > self.config.explosion_speed;
        if exploding && !self.exploding {
            log::warn!(
                "World is exploding: average speed {:.1} > {:.1}",
                speed,
                self.config.explosion_speed
            );
            self.events.push(NaubinoEvent::Exploding { average_speed: speed });
        } else if !exploding && self.exploding {
            log::info!("World settled (average speed {:.1})", speed);
        }
        self.exploding = exploding;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NaubinoError;

    fn world() -> Naubino {
        Naubino::default()
    }

    fn has_event(events: &[NaubinoEvent], wanted: &NaubinoEvent) -> bool {
        events.iter().any(|e| e == wanted)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = NaubinoConfig {
            naub_radius: 0.0,
            ..NaubinoConfig::default()
        };
        let err = Naubino::new(config).err().unwrap();
        assert!(matches!(err, NaubinoError::InvalidConfig(_)));
        assert!(Naubino::new(NaubinoConfig::default()).is_ok());
    }

    #[test]
    fn test_find_naub_at_center() {
        let mut naubino = world();
        let a = naubino.create_naub(Some(Vec2::new(10.0, 10.0)));
        let b = naubino.create_naub(Some(Vec2::new(-10.0, -10.0)));
        assert_eq!(naubino.find_naub(Vec2::new(10.0, 10.0)), Some(a));
        assert_eq!(naubino.find_naub(Vec2::new(-10.0, -10.0)), Some(b));
    }

    #[test]
    fn test_find_naub_near_border() {
        let mut naubino = world();
        let radius = naubino.config().naub_radius;
        let a = naubino.create_naub(Some(Vec2::new(10.0, 10.0)));
        naubino.create_naub(Some(Vec2::new(-10.0, -10.0)));
        assert_eq!(naubino.find_naub(Vec2::new(10.0 + radius * 0.9, 10.0)), Some(a));
    }

    #[test]
    fn test_find_naub_misses_empty_space() {
        let mut naubino = world();
        naubino.create_naub(Some(Vec2::new(10.0, 10.0)));
        naubino.create_naub(Some(Vec2::new(-10.0, -10.0)));
        assert_eq!(naubino.find_naub(Vec2::new(-20.0, 0.0)), None);
        assert_eq!(naubino.touch_down(Vec2::new(-20.0, 0.0)), None);
    }

    #[test]
    fn test_touch_down_selects() {
        let mut naubino = world();
        let a = naubino.create_naub(Some(Vec2::new(10.0, 10.0)));
        assert!(!naubino.is_selected(a));

        let pointer = naubino.touch_down(Vec2::new(10.0, 10.0)).expect("hit");
        assert!(naubino.is_selected(a));
        assert_eq!(naubino.pointer(pointer).unwrap().naub(), a);
        assert_eq!(naubino.pointer_count(), 1);
    }

    #[test]
    fn test_pointer_moves_naub() {
        let mut naubino = world();
        let a = naubino.create_naub(Some(Vec2::new(10.0, 10.0)));
        let pointer = naubino.connect_pointer_naub(a).unwrap();
        let before = naubino.naub_position(a).unwrap();

        naubino.pointer_mut(pointer).unwrap().move_to(before - Vec2::new(10.0, 0.0));
        for _ in 0..10 {
            naubino.step().unwrap();
        }
        assert!(naubino.naub_position(a).unwrap().x < before.x);
    }

    #[test]
    fn test_pointer_up_is_reclaimed_next_step() {
        let mut naubino = world();
        let a = naubino.create_naub(None);
        let pointer = naubino.connect_pointer_naub(a).unwrap();
        assert_eq!(naubino.physics().body_count(), 2);

        let p = naubino.pointer_mut(pointer).unwrap();
        p.up();
        p.up();
        assert!(!naubino.is_selected(a));

        naubino.step().unwrap();
        assert!(naubino.pointer(pointer).is_none());
        assert_eq!(naubino.graph().naub(a).unwrap().pointers().count(), 0);
        assert_eq!(naubino.physics().body_count(), 1);
        assert_eq!(naubino.physics().constraint_count(), 0);
        assert!(has_event(
            &naubino.drain_events(),
            &NaubinoEvent::PointerRemoved { pointer, naub: a }
        ));
    }

    #[test]
    fn test_remove_naub_cleans_physics() {
        let mut naubino = world();
        let chain = naubino.create_naub_chain(3, None, None).unwrap();
        let pointer = naubino.connect_pointer_naub(chain[1]).unwrap();
        assert_eq!(naubino.physics().body_count(), 4);
        assert_eq!(naubino.physics().constraint_count(), 3);
        naubino.drain_events();

        naubino.remove_naub(chain[1]).unwrap();
        assert_eq!(naubino.physics().body_count(), 2);
        assert_eq!(naubino.physics().constraint_count(), 0);
        assert!(!naubino.pointers().is_alive(pointer));

        let events = naubino.drain_events();
        assert!(has_event(&events, &NaubinoEvent::NaubRemoved(chain[1])));
        let removed_joints = events
            .iter()
            .filter(|e| matches!(e, NaubinoEvent::JointRemoved(_)))
            .count();
        assert_eq!(removed_joints, 2);

        naubino.step().unwrap();
        assert_eq!(naubino.naub_count(), 2);
        assert_eq!(naubino.joint_count(), 0);
        assert_eq!(naubino.live_naubs().count(), 2);
        assert_eq!(naubino.live_joints().count(), 0);
        assert_eq!(naubino.pointers().len(), 0);
    }

    #[test]
    fn test_double_remove_is_violation() {
        let mut naubino = world();
        let a = naubino.create_naub(None);
        naubino.remove_naub(a).unwrap();
        let err = naubino.remove_naub(a).unwrap_err();
        assert_eq!(err.violation(), Some(Violation::AlreadyRemoved(a)));
    }

    #[test]
    fn test_join_self_is_violation() {
        let mut naubino = world();
        let a = naubino.create_naub(None);
        let err = naubino.join_naubs(a, a).unwrap_err();
        assert!(matches!(err.violation(), Some(Violation::SelfLoop { .. })));
        let err = naubino.unjoin_naubs(a, a).unwrap_err();
        assert!(matches!(err.violation(), Some(Violation::SelfLoop { .. })));
        assert_eq!(naubino.physics().constraint_count(), 0);
    }

    #[test]
    fn test_join_and_unjoin_mirror_constraints() {
        let mut naubino = world();
        let a = naubino.create_naub(Some(Vec2::new(0.0, 0.0)));
        let b = naubino.create_naub(Some(Vec2::new(4.0, 0.0)));

        let joint = naubino.join_naubs(a, b).unwrap().expect("new joint");
        assert_eq!(naubino.join_naubs(b, a).unwrap(), None);
        assert_eq!(naubino.physics().constraint_count(), 1);

        assert_eq!(naubino.unjoin_naubs(a, b).unwrap(), Some(joint));
        assert_eq!(naubino.physics().constraint_count(), 0);
    }

    #[test]
    fn test_merge_moves_body_count() {
        let mut naubino = world();
        let left = naubino.create_naub_chain(2, Some(Vec2::new(0.0, -10.0)), None).unwrap();
        let right = naubino.create_naub_chain(2, Some(Vec2::new(0.0, 10.0)), None).unwrap();

        let created = naubino.merge_naubs(left[0], right[0]).unwrap();
        assert_eq!(created.len(), 1);
        assert!(naubino.graph().is_joined(left[0], right[1]));
        assert_eq!(naubino.physics().body_count(), 3);
        assert_eq!(naubino.physics().constraint_count(), 2);
        assert!(naubino.naub_body(right[0]).is_none());
    }

    #[test]
    fn test_step_report() {
        let mut naubino = world();
        naubino.create_naub_chain(3, None, None).unwrap();
        let report = naubino.step().unwrap();

        assert_eq!(report.naubs.len(), 3);
        assert_eq!(report.joints.len(), 2);
        assert_eq!(report.score_delta, 0.0);
        assert!(!report.exploding);

        let json = serde_json::to_string(&report).unwrap();
        let back: StepReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_explosion_is_diagnostic_only() {
        let mut naubino = world();
        let a = naubino.create_naub(Some(Vec2::new(-50.0, 0.0)));
        let b = naubino.create_naub(Some(Vec2::new(50.0, 0.0)));
        for naub in [a, b] {
            let body = naubino.naub_body(naub).unwrap();
            naubino.physics_mut().set_velocity(body, Vec2::new(0.0, 5000.0));
        }

        let report = naubino.step().unwrap();
        assert!(report.exploding);
        assert!(naubino.is_exploding());
        assert_eq!(naubino.naub_count(), 2);
        let explosions = naubino
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, NaubinoEvent::Exploding { .. }))
            .count();
        assert_eq!(explosions, 1);
    }
}
