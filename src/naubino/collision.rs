//! Collision/merge system
//!
//! Each collision start is resolved back to a naub pair. Only pairs where a
//! live pointer drags one side may change the graph; for those the
//! compatibility rule picks a join (free end) or a merge, and a merge is
//! followed by cycle detection and popping.

use super::Naubino;
use crate::error::NaubinoResult;
use crate::events::NaubinoEvent;
use crate::graph::{JointId, NaubId};
use crate::physics::{CollisionPair, PhysicsWorld};

/// Terminal state of one touching pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchOutcome {
    Ignored,
    Joined(JointId),
    Merged,
    /// Merged and closed at least one loop
    Popped { naubs: usize, points: f32 },
}

impl<P: PhysicsWorld> Naubino<P> {
    pub(super) fn handle_collision(&mut self, pair: CollisionPair) -> NaubinoResult<TouchOutcome> {
        // Bodies without a naub (anchors, removed naubs, foreign bodies)
        let (Some(a), Some(b)) = (self.bodies.naub(pair.a), self.bodies.naub(pair.b)) else {
            return Ok(TouchOutcome::Ignored);
        };
        log::trace!("Naubs {} and {} touched", a, b);
        self.events.push(NaubinoEvent::NaubsCollided { a, b });

        if !self.is_selected(a) && !self.is_selected(b) {
            return Ok(TouchOutcome::Ignored);
        }
        self.naub_touches_naub(a, b)
    }

    /// Apply the join/merge rule to `a` touching `b`, without the selection gate
    pub fn naub_touches_naub(&mut self, a: NaubId, b: NaubId) -> NaubinoResult<TouchOutcome> {
        if !self.graph.merges_with(a, b) {
            return Ok(TouchOutcome::Ignored);
        }

        if self.graph.degree(a) == 0 {
            let Some(joint) = self.join_naubs(a, b)? else {
                return Ok(TouchOutcome::Ignored);
            };
            log::debug!("Joined naub {} onto {}", a, b);
            self.events.push(NaubinoEvent::NaubsJoined { a, b, joint });
            return Ok(TouchOutcome::Joined(joint));
        }

        self.merge_naubs(a, b)?;
        let mut popped = 0;
        let mut points = 0.0;
        for cycle in self.find_cycles(a) {
            popped += cycle.len();
            points += self.pop_cycle(&cycle)?;
        }

        if popped == 0 {
            Ok(TouchOutcome::Merged)
        } else {
            Ok(TouchOutcome::Popped { naubs: popped, points })
        }
    }

    /// The first cycle through `root`'s component, if any
    pub fn find_cycles(&self, root: NaubId) -> Vec<Vec<NaubId>> {
        self.graph.find_cycles(root)
    }

    /// Remove every naub of `cycle` and score it
    pub fn pop_cycle(&mut self, cycle: &[NaubId]) -> NaubinoResult<f32> {
        for &naub in cycle {
            self.remove_naub(naub)?;
        }
        let points = cycle.len() as f32 * self.config.points_per_naub;
        self.score += points;
        self.pending_score += points;

        log::info!("Popped a cycle of {} naubs (+{:.2}, score {:.2})", cycle.len(), points, self.score);
        self.events.push(NaubinoEvent::CyclePopped {
            naubs: cycle.to_vec(),
            points,
        });
        Ok(points)
    }
}
