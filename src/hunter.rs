//! Scripted drag driver
//!
//! A hunter grabs one naub and drags it onto another, the way a player would.
//! The demo binary and the end-to-end tests use it as their input layer.

use std::ops::Range;

use rand::Rng;

use crate::graph::NaubId;
use crate::naubino::Naubino;
use crate::physics::PhysicsWorld;
use crate::pointer::PointerId;

/// How far ahead of its naub the pointer leads, in naub radii
pub const HUNTER_LEAD: Range<f32> = 0.8..1.2;

#[derive(Debug, Clone)]
pub struct Hunter {
    naub_a: NaubId,
    naub_b: NaubId,
    pointer: Option<PointerId>,
    lead: f32,
    finished: bool,
}

impl Hunter {
    /// Touch down on `naub_a`, aiming for `naub_b`
    pub fn new<P: PhysicsWorld, R: Rng>(
        naubino: &mut Naubino<P>,
        naub_a: NaubId,
        naub_b: NaubId,
        rng: &mut R,
    ) -> Self {
        let lead = rng.random_range(HUNTER_LEAD) * naubino.config().naub_radius;
        let pointer = naubino
            .naub_position(naub_a)
            .and_then(|pos| naubino.touch_down(pos));
        if pointer.is_none() {
            log::warn!("Hunter found nothing to grab at naub {}", naub_a);
        }
        Self {
            naub_a,
            naub_b,
            pointer,
            lead,
            finished: pointer.is_none(),
        }
    }

    /// Lead the pointer toward the prey, or let go once the hunt is over
    pub fn step<P: PhysicsWorld>(&mut self, naubino: &mut Naubino<P>) {
        if self.finished {
            return;
        }

        let graph = naubino.graph();
        let hunting = graph.is_alive(self.naub_a) && graph.merges_with(self.naub_a, self.naub_b);
        let positions = naubino
            .naub_position(self.naub_a)
            .zip(naubino.naub_position(self.naub_b));
        let (Some((a_pos, b_pos)), true) = (positions, hunting) else {
            self.release(naubino);
            return;
        };

        let diff = b_pos - a_pos;
        let target = if diff.length() > self.lead {
            a_pos + diff.normalize() * self.lead
        } else {
            b_pos
        };
        if let Some(pointer) = self.pointer.and_then(|id| naubino.pointer_mut(id)) {
            pointer.move_to(target);
        }
    }

    fn release<P: PhysicsWorld>(&mut self, naubino: &mut Naubino<P>) {
        if let Some(pointer) = self.pointer.and_then(|id| naubino.pointer_mut(id)) {
            pointer.up();
        }
        log::debug!("Hunter {} -> {} finished", self.naub_a, self.naub_b);
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn pointer(&self) -> Option<PointerId> {
        self.pointer
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_hunter_moves_naub() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut naubino = Naubino::default();
        let radius = naubino.config().naub_radius;
        let a = naubino.create_naub(Some(Vec2::ZERO));
        let b = naubino.create_naub(Some(Vec2::new(radius * 100.0, 0.0)));

        let mut hunter = Hunter::new(&mut naubino, a, b, &mut rng);
        assert!(hunter.pointer().is_some());
        for _ in 0..30 {
            hunter.step(&mut naubino);
            naubino.step().unwrap();
        }
        assert!(naubino.naub_position(a).unwrap().x > radius);
        assert!(!hunter.is_finished());
    }

    #[test]
    fn test_hunter_misses_empty_naub() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut naubino = Naubino::default();
        let a = naubino.create_naub(None);
        let b = naubino.create_naub(Some(Vec2::new(10.0, 0.0)));
        naubino.remove_naub(a).unwrap();

        let hunter = Hunter::new(&mut naubino, a, b, &mut rng);
        assert!(hunter.pointer().is_none());
        assert!(hunter.is_finished());
    }

    #[test]
    fn test_hunter_joins_then_lets_go() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut naubino = Naubino::default();
        let a = naubino.create_naub(Some(Vec2::ZERO));
        let b = naubino.create_naub(Some(Vec2::new(12.0, 0.0)));

        let mut hunter = Hunter::new(&mut naubino, a, b, &mut rng);
        for _ in 0..300 {
            if hunter.is_finished() {
                break;
            }
            hunter.step(&mut naubino);
            naubino.step().unwrap();
        }
        assert!(hunter.is_finished());
        assert!(naubino.graph().is_joined(a, b));

        naubino.step().unwrap();
        assert_eq!(naubino.pointer_count(), 0);
        assert!(naubino.pointers().is_empty());
    }

    #[test]
    fn test_two_long_chains_consume_each_other() {
        let mut rng = Pcg32::seed_from_u64(42);
        let mut naubino = Naubino::default();
        let bodies_before = naubino.physics().body_count();
        let constraints_before = naubino.physics().constraint_count();

        let a = naubino.create_naub_chain(100, Some(Vec2::new(0.0, -10.0)), None).unwrap();
        let b = naubino.create_naub_chain(100, Some(Vec2::new(0.0, 10.0)), None).unwrap();
        let mut hunters = [
            Hunter::new(&mut naubino, a[0], b[0], &mut rng),
            Hunter::new(&mut naubino, a[99], b[99], &mut rng),
        ];

        for _ in 0..500 {
            for hunter in &mut hunters {
                hunter.step(&mut naubino);
            }
            naubino.step().unwrap();
            if naubino.naub_count() == 0 && naubino.pointers().is_empty() {
                break;
            }
        }

        assert_eq!(naubino.naub_count(), 0);
        assert_eq!(naubino.pointer_count(), 0);
        assert!(naubino.pointers().is_empty());
        assert_eq!(naubino.physics().body_count(), bodies_before);
        assert_eq!(naubino.physics().constraint_count(), constraints_before);
        // The two merged-away endpoints are never popped
        assert_eq!(naubino.score(), 198.0 * naubino.config().points_per_naub);
    }
}
