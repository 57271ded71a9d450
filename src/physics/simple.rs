//! Small deterministic position-based 2D engine
//!
//! Enough physics for the naub world: circles, kinematic anchors, distance
//! constraints and circle contacts. Iteration order is by handle and contact
//! lists are sorted, so identical inputs give identical runs.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use super::{
    BodyHandle, CollisionPair, ConstraintDesc, ConstraintHandle, ConstraintTarget, PhysicsConfig,
    PhysicsWorld,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Dynamic,
    Kinematic,
}

#[derive(Debug, Clone)]
struct Body {
    kind: BodyKind,
    pos: Vec2,
    /// Position at the start of the current step
    prev: Vec2,
    vel: Vec2,
    radius: f32,
}

impl Body {
    /// Mass scales with area; kinematic bodies are immovable
    fn inv_mass(&self) -> f32 {
        match self.kind {
            BodyKind::Dynamic => 1.0 / (self.radius * self.radius).max(f32::EPSILON),
            BodyKind::Kinematic => 0.0,
        }
    }

    fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }
}

#[derive(Debug, Default)]
pub struct SimplePhysics {
    config: PhysicsConfig,
    bodies: BTreeMap<BodyHandle, Body>,
    constraints: BTreeMap<ConstraintHandle, ConstraintDesc>,
    /// Pairs touching at the end of the last step
    contacts: BTreeSet<CollisionPair>,
    next_body: u32,
    next_constraint: u32,
}

impl SimplePhysics {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    fn insert_body(&mut self, kind: BodyKind, pos: Vec2, radius: f32) -> BodyHandle {
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            handle,
            Body {
                kind,
                pos,
                prev: pos,
                vel: Vec2::ZERO,
                radius,
            },
        );
        handle
    }

    /// Sweep-and-prune along x, then exact circle tests
    fn overlapping_pairs(&self) -> Vec<CollisionPair> {
        let mut spans: Vec<(f32, f32, BodyHandle)> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.is_dynamic())
            .map(|(handle, body)| (body.pos.x - body.radius, body.pos.x + body.radius, *handle))
            .collect();
        spans.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.2.cmp(&y.2)));

        let mut pairs = Vec::new();
        for (i, &(_, max_x, h1)) in spans.iter().enumerate() {
            for &(min_x, _, h2) in &spans[i + 1..] {
                if min_x > max_x {
                    break;
                }
                let (b1, b2) = (&self.bodies[&h1], &self.bodies[&h2]);
                let reach = b1.radius + b2.radius;
                if b1.pos.distance_squared(b2.pos) < reach * reach {
                    pairs.push(CollisionPair::new(h1, h2));
                }
            }
        }
        pairs.sort();
        pairs
    }
}

fn solve_constraint(bodies: &mut BTreeMap<BodyHandle, Body>, desc: &ConstraintDesc) {
    let Some(a) = bodies.get(&desc.body) else {
        return;
    };
    let (pa, wa) = (a.pos, a.inv_mass());
    let (pb, wb) = match desc.target {
        ConstraintTarget::Body(handle) => match bodies.get(&handle) {
            Some(b) => (b.pos, b.inv_mass()),
            None => return,
        },
        ConstraintTarget::Point(point) => (point, 0.0),
    };

    let total = wa + wb;
    let delta = pb - pa;
    let dist = delta.length();
    if total <= 0.0 || dist < f32::EPSILON {
        return;
    }

    let correction = delta * ((dist - desc.length) / dist) * desc.stiffness;
    if let Some(a) = bodies.get_mut(&desc.body) {
        a.pos += correction * (wa / total);
    }
    if let ConstraintTarget::Body(handle) = desc.target {
        if let Some(b) = bodies.get_mut(&handle) {
            b.pos -= correction * (wb / total);
        }
    }
}

/// Push two overlapping circles apart along their center line
fn separate(bodies: &mut BTreeMap<BodyHandle, Body>, pair: CollisionPair) {
    let (Some(a), Some(b)) = (bodies.get(&pair.a), bodies.get(&pair.b)) else {
        return;
    };
    let delta = b.pos - a.pos;
    let dist = delta.length();
    let overlap = a.radius + b.radius - dist;
    let (wa, wb) = (a.inv_mass(), b.inv_mass());
    let total = wa + wb;
    if overlap <= 0.0 || total <= 0.0 {
        return;
    }

    let normal = if dist > f32::EPSILON { delta / dist } else { Vec2::X };
    let push = normal * overlap;
    if let Some(a) = bodies.get_mut(&pair.a) {
        a.pos -= push * (wa / total);
    }
    if let Some(b) = bodies.get_mut(&pair.b) {
        b.pos += push * (wb / total);
    }
}

impl PhysicsWorld for SimplePhysics {
    fn add_circle(&mut self, pos: Vec2, radius: f32) -> BodyHandle {
        self.insert_body(BodyKind::Dynamic, pos, radius)
    }

    fn add_kinematic(&mut self, pos: Vec2) -> BodyHandle {
        self.insert_body(BodyKind::Kinematic, pos, 0.0)
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
        self.contacts.retain(|pair| pair.a != body && pair.b != body);
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.pos)
    }

    fn set_position(&mut self, body: BodyHandle, pos: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pos = pos;
            b.prev = pos;
        }
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.vel)
    }

    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.vel = vel;
        }
    }

    fn add_constraint(&mut self, desc: ConstraintDesc) -> ConstraintHandle {
        let handle = ConstraintHandle(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.insert(handle, desc);
        handle
    }

    fn rebind_constraint(&mut self, constraint: ConstraintHandle, body: BodyHandle) {
        if let Some(desc) = self.constraints.get_mut(&constraint) {
            desc.body = body;
        }
    }

    fn set_constraint_target(&mut self, constraint: ConstraintHandle, target: ConstraintTarget) {
        if let Some(desc) = self.constraints.get_mut(&constraint) {
            desc.target = target;
        }
    }

    fn remove_constraint(&mut self, constraint: ConstraintHandle) {
        self.constraints.remove(&constraint);
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionPair> {
        let keep = 1.0 - self.config.air_friction;
        for body in self.bodies.values_mut().filter(|b| b.is_dynamic()) {
            body.prev = body.pos;
            body.vel *= keep;
            body.pos += body.vel * dt;
        }

        let mut touching = BTreeSet::new();
        for pass in 0..self.config.iterations.max(1) {
            for desc in self.constraints.values() {
                solve_constraint(&mut self.bodies, desc);
            }
            let pairs = self.overlapping_pairs();
            for pair in &pairs {
                separate(&mut self.bodies, *pair);
            }
            if pass == 0 {
                touching.extend(pairs);
            }
        }

        if dt > 0.0 {
            for body in self.bodies.values_mut().filter(|b| b.is_dynamic()) {
                body.vel = (body.pos - body.prev) / dt;
            }
        }

        let started: Vec<CollisionPair> = touching.difference(&self.contacts).copied().collect();
        self.contacts = touching;
        started
    }

    fn query_region(&self, center: Vec2, radius: f32) -> Vec<BodyHandle> {
        let mut hits: Vec<(f32, BodyHandle)> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.is_dynamic())
            .filter_map(|(handle, body)| {
                let dist = body.pos.distance(center);
                (dist < body.radius + radius).then_some((dist, *handle))
            })
            .collect();
        hits.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
        hits.into_iter().map(|(_, handle)| handle).collect()
    }

    fn average_speed(&self) -> f32 {
        let (sum, count) = self
            .bodies
            .values()
            .filter(|b| b.is_dynamic())
            .fold((0.0, 0usize), |(sum, count), b| (sum + b.vel.length(), count + 1));
        if count == 0 { 0.0 } else { sum / count as f32 }
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_constraint_pulls_to_rest_length() {
        let mut physics = SimplePhysics::default();
        let a = physics.add_circle(Vec2::new(0.0, 0.0), 1.0);
        let b = physics.add_circle(Vec2::new(5.0, 0.0), 1.0);
        physics.add_constraint(ConstraintDesc {
            body: a,
            target: ConstraintTarget::Body(b),
            length: 4.0,
            stiffness: 0.2,
        });

        // Oscillates around the rest length; friction settles it
        for _ in 0..600 {
            physics.step(DT);
        }
        let dist = physics.position(a).unwrap().distance(physics.position(b).unwrap());
        assert!((dist - 4.0).abs() < 0.1, "distance {dist}");
    }

    #[test]
    fn test_point_constraint_only_moves_body() {
        let mut physics = SimplePhysics::default();
        let a = physics.add_circle(Vec2::new(10.0, 0.0), 1.0);
        physics.add_constraint(ConstraintDesc {
            body: a,
            target: ConstraintTarget::Point(Vec2::ZERO),
            length: 0.0,
            stiffness: 0.1,
        });
        physics.step(DT);
        assert!(physics.position(a).unwrap().x < 10.0);
    }

    #[test]
    fn test_collision_start_reported_once() {
        let mut physics = SimplePhysics::default();
        let a = physics.add_circle(Vec2::new(0.0, 0.0), 1.0);
        let b = physics.add_circle(Vec2::new(1.5, 0.0), 1.0);

        let started = physics.step(DT);
        assert_eq!(started, vec![CollisionPair::new(a, b)]);

        // Separation impulse carries them apart; no new start
        let started = physics.step(DT);
        assert!(started.is_empty());
        let dist = physics.position(a).unwrap().distance(physics.position(b).unwrap());
        assert!(dist >= 2.0 - 1e-4);
    }

    #[test]
    fn test_kinematic_bodies_do_not_collide() {
        let mut physics = SimplePhysics::default();
        let anchor = physics.add_kinematic(Vec2::ZERO);
        let a = physics.add_circle(Vec2::ZERO, 1.0);

        assert!(physics.step(DT).is_empty());
        assert_eq!(physics.query_region(Vec2::ZERO, 1.0), vec![a]);
        assert_eq!(physics.position(anchor), Some(Vec2::ZERO));
    }

    #[test]
    fn test_kinematic_not_integrated() {
        let mut physics = SimplePhysics::default();
        let anchor = physics.add_kinematic(Vec2::ZERO);
        physics.set_velocity(anchor, Vec2::new(100.0, 0.0));
        physics.step(DT);
        assert_eq!(physics.position(anchor), Some(Vec2::ZERO));
    }

    #[test]
    fn test_query_region_closest_first() {
        let mut physics = SimplePhysics::default();
        let far = physics.add_circle(Vec2::new(1.5, 0.0), 1.0);
        let near = physics.add_circle(Vec2::new(-0.5, 0.0), 1.0);
        let _outside = physics.add_circle(Vec2::new(10.0, 0.0), 1.0);

        assert_eq!(physics.query_region(Vec2::ZERO, 1.0), vec![near, far]);
        assert!(physics.query_region(Vec2::new(-20.0, 0.0), 1.0).is_empty());
    }

    #[test]
    fn test_air_friction_slows_bodies() {
        let mut physics = SimplePhysics::default();
        let a = physics.add_circle(Vec2::ZERO, 1.0);
        physics.set_velocity(a, Vec2::new(60.0, 0.0));
        physics.step(DT);
        let speed = physics.average_speed();
        assert!(speed < 60.0 && speed > 50.0, "speed {speed}");
        assert!(physics.position(a).unwrap().x > 0.0);
    }

    #[test]
    fn test_removal_restores_counts() {
        let mut physics = SimplePhysics::default();
        let a = physics.add_circle(Vec2::ZERO, 1.0);
        let b = physics.add_circle(Vec2::new(1.0, 0.0), 1.0);
        let c = physics.add_constraint(ConstraintDesc {
            body: a,
            target: ConstraintTarget::Body(b),
            length: 4.0,
            stiffness: 0.5,
        });
        physics.step(DT);
        assert_eq!((physics.body_count(), physics.constraint_count()), (2, 1));

        physics.remove_constraint(c);
        physics.remove_body(a);
        physics.remove_body(b);
        assert_eq!((physics.body_count(), physics.constraint_count()), (0, 0));
        assert_eq!(physics.average_speed(), 0.0);
    }
}
