//! Domain events
//!
//! The world pushes events in the order things happen; collaborators
//! (spawner, renderer, score UI) drain them once per step.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::graph::{JointId, NaubId};
use crate::pointer::PointerId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NaubinoEvent {
    NaubAdded(NaubId),
    /// Two naubs started touching (selected or not)
    NaubsCollided { a: NaubId, b: NaubId },
    /// A free naub was joined onto another
    NaubsJoined { a: NaubId, b: NaubId, joint: JointId },
    JointAdded { joint: JointId, a: NaubId, b: NaubId },
    JointRemoved(JointId),
    NaubsMerged { survivor: NaubId, merged: NaubId },
    /// A closed loop was removed and scored
    CyclePopped { naubs: Vec<NaubId>, points: f32 },
    NaubRemoved(NaubId),
    PointerRemoved { pointer: PointerId, naub: NaubId },
    /// Average body speed crossed the stability threshold
    Exploding { average_speed: f32 },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<NaubinoEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: NaubinoEvent) {
        self.events.push_back(event);
    }

    /// Take every pending event, oldest first
    pub fn drain(&mut self) -> Vec<NaubinoEvent> {
        self.events.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaubinoEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = EventQueue::default();
        queue.push(NaubinoEvent::NaubAdded(NaubId(0)));
        queue.push(NaubinoEvent::NaubRemoved(NaubId(0)));

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.drain(),
            vec![NaubinoEvent::NaubAdded(NaubId(0)), NaubinoEvent::NaubRemoved(NaubId(0))]
        );
        assert!(queue.is_empty());
    }
}
