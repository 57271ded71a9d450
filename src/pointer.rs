//! Pointers: externally driven drag anchors
//!
//! A pointer owns a kinematic anchor body tied to its naub by a zero-length
//! constraint. The input layer only moves the pointer's target; each step the
//! anchor catches up with the target at a bounded speed and the solver drags
//! the naub along.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::graph::NaubId;
use crate::physics::{BodyHandle, ConstraintDesc, ConstraintHandle, ConstraintTarget, PhysicsWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointerId(pub u32);

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Pointer {
    pub id: PointerId,
    naub: NaubId,
    /// Where the input layer wants the anchor
    target: Vec2,
    anchor_pos: Vec2,
    anchor: Option<BodyHandle>,
    constraint: Option<ConstraintHandle>,
    alive: bool,
}

impl Pointer {
    pub fn naub(&self) -> NaubId {
        self.naub
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn anchor_pos(&self) -> Vec2 {
        self.anchor_pos
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Shift the target by `delta`
    pub fn move_by(&mut self, delta: Vec2) {
        self.target += delta;
    }

    pub fn move_to(&mut self, pos: Vec2) {
        self.target = pos;
    }

    /// Release the pointer. Detached at the next step; releasing twice is fine.
    pub fn up(&mut self) {
        self.alive = false;
    }

    fn advance(&mut self, catch_up: f32, max_step: f32) -> Vec2 {
        let step = ((self.target - self.anchor_pos) * catch_up).clamp_length_max(max_step);
        self.anchor_pos += step;
        self.anchor_pos
    }

    fn detach<P: PhysicsWorld>(&mut self, physics: &mut P) {
        if let Some(constraint) = self.constraint.take() {
            physics.remove_constraint(constraint);
        }
        if let Some(anchor) = self.anchor.take() {
            physics.remove_body(anchor);
        }
    }
}

#[derive(Debug)]
pub struct PointerSystem {
    pointers: BTreeMap<PointerId, Pointer>,
    next_id: u32,
    catch_up: f32,
    max_step: f32,
}

impl PointerSystem {
    pub fn new(catch_up: f32, max_step: f32) -> Self {
        Self {
            pointers: BTreeMap::new(),
            next_id: 0,
            catch_up,
            max_step,
        }
    }

    /// Anchor a new pointer at `pos` and tie it to `body`
    pub fn connect<P: PhysicsWorld>(
        &mut self,
        physics: &mut P,
        naub: NaubId,
        body: BodyHandle,
        pos: Vec2,
        stiffness: f32,
    ) -> PointerId {
        let id = PointerId(self.next_id);
        self.next_id += 1;

        let anchor = physics.add_kinematic(pos);
        let constraint = physics.add_constraint(ConstraintDesc {
            body,
            target: ConstraintTarget::Body(anchor),
            length: 0.0,
            stiffness,
        });
        self.pointers.insert(
            id,
            Pointer {
                id,
                naub,
                target: pos,
                anchor_pos: pos,
                anchor: Some(anchor),
                constraint: Some(constraint),
                alive: true,
            },
        );
        id
    }

    pub fn get(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.get(&id)
    }

    pub fn get_mut(&mut self, id: PointerId) -> Option<&mut Pointer> {
        self.pointers.get_mut(&id)
    }

    pub fn is_alive(&self, id: PointerId) -> bool {
        self.pointers.get(&id).is_some_and(Pointer::is_alive)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pointer> {
        self.pointers.values()
    }

    /// Tracked pointers (released ones linger until the next reclaim)
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Move every live anchor toward its target
    pub fn step<P: PhysicsWorld>(&mut self, physics: &mut P, dt: f32) {
        for pointer in self.pointers.values_mut().filter(|p| p.alive) {
            let Some(anchor) = pointer.anchor else {
                continue;
            };
            let before = pointer.anchor_pos;
            let after = pointer.advance(self.catch_up, self.max_step);
            physics.set_position(anchor, after);
            if dt > 0.0 {
                physics.set_velocity(anchor, (after - before) / dt);
            }
        }
    }

    /// Rebind a pointer onto another naub, keeping its anchor
    pub fn transfer<P: PhysicsWorld>(
        &mut self,
        physics: &mut P,
        id: PointerId,
        naub: NaubId,
        body: BodyHandle,
    ) {
        if let Some(pointer) = self.pointers.get_mut(&id) {
            pointer.naub = naub;
            if let Some(constraint) = pointer.constraint {
                physics.rebind_constraint(constraint, body);
            }
        }
    }

    /// Kill a pointer and detach it from physics right away
    pub fn detach<P: PhysicsWorld>(&mut self, physics: &mut P, id: PointerId) {
        if let Some(pointer) = self.pointers.get_mut(&id) {
            pointer.alive = false;
            pointer.detach(physics);
        }
    }

    /// Drop dead pointers, returning them
    pub fn reclaim<P: PhysicsWorld>(&mut self, physics: &mut P) -> Vec<Pointer> {
        let dead: Vec<PointerId> = self
            .pointers
            .values()
            .filter(|p| !p.alive)
            .map(|p| p.id)
            .collect();

        let mut removed = Vec::with_capacity(dead.len());
        for id in dead {
            if let Some(mut pointer) = self.pointers.remove(&id) {
                pointer.detach(physics);
                removed.push(pointer);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::SimplePhysics;

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (SimplePhysics, PointerSystem, PointerId, BodyHandle) {
        let mut physics = SimplePhysics::default();
        let body = physics.add_circle(Vec2::ZERO, 1.0);
        let mut system = PointerSystem::new(0.25, 0.5);
        let id = system.connect(&mut physics, NaubId(0), body, Vec2::ZERO, 0.7);
        (physics, system, id, body)
    }

    #[test]
    fn test_connect_adds_anchor_and_constraint() {
        let (physics, system, id, _) = setup();
        assert_eq!(physics.body_count(), 2);
        assert_eq!(physics.constraint_count(), 1);
        assert!(system.is_alive(id));
        assert_eq!(system.get(id).unwrap().naub(), NaubId(0));
    }

    #[test]
    fn test_moves_when_target_set() {
        let (mut physics, mut system, id, _) = setup();
        system.get_mut(id).unwrap().move_to(Vec2::new(10.0, 0.0));
        system.step(&mut physics, DT);

        let pointer = system.get(id).unwrap();
        assert!(pointer.anchor_pos().x > 0.0);
        // Bounded by max_step
        assert!(pointer.anchor_pos().x <= 0.5 + 1e-6);
    }

    #[test]
    fn test_move_by_accumulates() {
        let (_, mut system, id, _) = setup();
        let pointer = system.get_mut(id).unwrap();
        pointer.move_by(Vec2::new(1.0, 0.0));
        pointer.move_by(Vec2::new(0.0, 2.0));
        assert_eq!(pointer.target(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_catches_up_with_target() {
        let (mut physics, mut system, id, _) = setup();
        system.get_mut(id).unwrap().move_to(Vec2::new(2.0, 0.0));
        for _ in 0..100 {
            system.step(&mut physics, DT);
        }
        let anchor = system.get(id).unwrap().anchor_pos();
        assert!((anchor - Vec2::new(2.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_anchor_drags_body() {
        let (mut physics, mut system, id, body) = setup();
        system.get_mut(id).unwrap().move_to(Vec2::new(-10.0, 0.0));
        for _ in 0..10 {
            system.step(&mut physics, DT);
            physics.step(DT);
        }
        assert!(physics.position(body).unwrap().x < -1.0);
    }

    #[test]
    fn test_up_then_reclaim_cleans_physics() {
        let (mut physics, mut system, id, _) = setup();
        let pointer = system.get_mut(id).unwrap();
        pointer.up();
        pointer.up();
        assert!(!system.is_alive(id));
        assert_eq!(system.len(), 1);

        let removed = system.reclaim(&mut physics);
        assert_eq!(removed.len(), 1);
        assert!(system.is_empty());
        assert_eq!(physics.body_count(), 1);
        assert_eq!(physics.constraint_count(), 0);
    }

    #[test]
    fn test_transfer_rebinds() {
        let (mut physics, mut system, id, _) = setup();
        let other = physics.add_circle(Vec2::new(5.0, 0.0), 1.0);
        system.transfer(&mut physics, id, NaubId(1), other);
        assert_eq!(system.get(id).unwrap().naub(), NaubId(1));

        // The other body is now pulled onto the anchor at the origin
        for _ in 0..5 {
            system.step(&mut physics, DT);
            physics.step(DT);
        }
        assert!(physics.position(other).unwrap().x < 5.0);
    }
}
