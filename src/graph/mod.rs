//! Naub graph
//!
//! Naubs and joints live in index arenas; adjacency and joint endpoints are
//! ids, so merges and removals only rebind ids. Ids are monotonic and never
//! reused, and dead entries stay in the arena so liveness checks stay cheap.
//!
//! The graph is purely structural. Physics bodies and constraints belong to
//! the world, which mirrors every joint created or removed here.

pub mod cycle;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::JOINT_LENGTH_FACTOR;
use crate::error::{NaubinoResult, Violation};
use crate::pointer::PointerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NaubId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JointId(pub u32);

impl fmt::Display for NaubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "j{}", self.0)
    }
}

/// Naub color palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NaubColor {
    #[default]
    Red,
    Pink,
    Green,
    Blue,
    Purple,
    Yellow,
}

impl NaubColor {
    pub const ALL: [NaubColor; 6] = [
        NaubColor::Red,
        NaubColor::Pink,
        NaubColor::Green,
        NaubColor::Blue,
        NaubColor::Purple,
        NaubColor::Yellow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NaubColor::Red => "red",
            NaubColor::Pink => "pink",
            NaubColor::Green => "green",
            NaubColor::Blue => "blue",
            NaubColor::Purple => "purple",
            NaubColor::Yellow => "yellow",
        }
    }
}

/// Rest length of a joint between naubs of the given radii
#[inline]
pub fn joint_rest_length(radius_a: f32, radius_b: f32) -> f32 {
    (radius_a + radius_b) * JOINT_LENGTH_FACTOR
}

/// A single game piece
#[derive(Debug, Clone)]
pub struct Naub {
    pub id: NaubId,
    pub radius: f32,
    pub color: NaubColor,
    pub alive: bool,
    /// neighbor -> joint
    joints: BTreeMap<NaubId, JointId>,
    pointers: BTreeSet<PointerId>,
}

impl Naub {
    pub fn neighbors(&self) -> impl Iterator<Item = NaubId> + '_ {
        self.joints.keys().copied()
    }

    pub fn joints(&self) -> impl Iterator<Item = (NaubId, JointId)> + '_ {
        self.joints.iter().map(|(n, j)| (*n, *j))
    }

    pub fn degree(&self) -> usize {
        self.joints.len()
    }

    pub fn is_joined(&self, other: NaubId) -> bool {
        self.joints.contains_key(&other)
    }

    pub fn pointers(&self) -> impl Iterator<Item = PointerId> + '_ {
        self.pointers.iter().copied()
    }
}

/// An elastic edge between two naubs
#[derive(Debug, Clone)]
pub struct NaubJoint {
    pub id: JointId,
    pub naubs: (NaubId, NaubId),
    pub rest_length: f32,
    pub alive: bool,
}

impl NaubJoint {
    /// The endpoint opposite `naub`
    pub fn other(&self, naub: NaubId) -> NaubId {
        if self.naubs.0 == naub { self.naubs.1 } else { self.naubs.0 }
    }
}

/// What `merge` changed, so the world can mirror it in physics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub removed_joints: Vec<JointId>,
    pub created_joints: Vec<JointId>,
    pub moved_pointers: Vec<PointerId>,
}

/// What `remove_naub` detached
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    pub joints: Vec<JointId>,
    pub pointers: Vec<PointerId>,
}

#[derive(Debug, Clone, Default)]
pub struct NaubGraph {
    naubs: Vec<Naub>,
    joints: Vec<NaubJoint>,
}

impl NaubGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_naub(&mut self, radius: f32, color: NaubColor) -> NaubId {
        let id = NaubId(self.naubs.len() as u32);
        self.naubs.push(Naub {
            id,
            radius,
            color,
            alive: true,
            joints: BTreeMap::new(),
            pointers: BTreeSet::new(),
        });
        id
    }

    pub fn naub(&self, id: NaubId) -> Option<&Naub> {
        self.naubs.get(id.0 as usize)
    }

    pub fn joint(&self, id: JointId) -> Option<&NaubJoint> {
        self.joints.get(id.0 as usize)
    }

    /// Every naub ever created, dead ones included
    pub fn naubs(&self) -> impl Iterator<Item = &Naub> {
        self.naubs.iter()
    }

    pub fn joints(&self) -> impl Iterator<Item = &NaubJoint> {
        self.joints.iter()
    }

    pub fn is_alive(&self, id: NaubId) -> bool {
        self.naub(id).is_some_and(|n| n.alive)
    }

    pub fn is_joined(&self, a: NaubId, b: NaubId) -> bool {
        self.naub(a).is_some_and(|n| n.is_joined(b))
    }

    pub fn degree(&self, id: NaubId) -> usize {
        self.naub(id).map_or(0, Naub::degree)
    }

    pub fn set_color(&mut self, id: NaubId, color: NaubColor) -> NaubinoResult<()> {
        self.naub_mut(id)?.color = color;
        Ok(())
    }

    fn naub_mut(&mut self, id: NaubId) -> Result<&mut Naub, Violation> {
        self.naubs.get_mut(id.0 as usize).ok_or(Violation::UnknownNaub(id))
    }

    fn live_naub(&self, id: NaubId) -> Result<&Naub, Violation> {
        let naub = self.naub(id).ok_or(Violation::UnknownNaub(id))?;
        if !naub.alive {
            return Err(Violation::DeadNaub(id));
        }
        Ok(naub)
    }

    /// Join two live naubs. Returns the new joint, or `None` if they were
    /// already joined.
    pub fn join(&mut self, a: NaubId, b: NaubId) -> NaubinoResult<Option<JointId>> {
        if a == b {
            return Err(Violation::SelfLoop { op: "join", naub: a }.into());
        }
        let rest_length = joint_rest_length(self.live_naub(a)?.radius, self.live_naub(b)?.radius);
        if self.is_joined(a, b) {
            return Ok(None);
        }

        let id = JointId(self.joints.len() as u32);
        self.joints.push(NaubJoint {
            id,
            naubs: (a, b),
            rest_length,
            alive: true,
        });
        self.naub_mut(a)?.joints.insert(b, id);
        self.naub_mut(b)?.joints.insert(a, id);
        Ok(Some(id))
    }

    /// Remove the joint between two naubs from both sides. Returns the dead
    /// joint, or `None` if they were not joined.
    pub fn unjoin(&mut self, a: NaubId, b: NaubId) -> NaubinoResult<Option<JointId>> {
        if a == b {
            return Err(Violation::SelfLoop { op: "unjoin", naub: a }.into());
        }
        self.naub(b).ok_or(Violation::UnknownNaub(b))?;
        let Some(id) = self.naub_mut(a)?.joints.remove(&b) else {
            return Ok(None);
        };
        self.naub_mut(b)?.joints.remove(&a);
        if let Some(joint) = self.joints.get_mut(id.0 as usize) {
            joint.alive = false;
        }
        Ok(Some(id))
    }

    /// Fuse `other` into `naub`: every neighbor of `other` is re-homed onto
    /// `naub`, its pointers move over, and `other` dies.
    pub fn merge(&mut self, naub: NaubId, other: NaubId) -> NaubinoResult<MergeOutcome> {
        if naub == other {
            return Err(Violation::SelfLoop { op: "merge", naub }.into());
        }
        self.live_naub(naub)?;
        let neighbors: Vec<NaubId> = self.live_naub(other)?.neighbors().collect();

        let mut outcome = MergeOutcome::default();
        for neighbor in neighbors {
            if let Some(joint) = self.unjoin(other, neighbor)? {
                outcome.removed_joints.push(joint);
            }
            if neighbor == naub {
                continue;
            }
            if let Some(joint) = self.join(naub, neighbor)? {
                outcome.created_joints.push(joint);
            }
        }

        let pointers = std::mem::take(&mut self.naub_mut(other)?.pointers);
        outcome.moved_pointers = pointers.iter().copied().collect();
        self.naub_mut(naub)?.pointers.extend(pointers);

        self.naub_mut(other)?.alive = false;
        Ok(outcome)
    }

    /// Detach all joints and pointers of a naub and mark it dead
    pub fn remove_naub(&mut self, id: NaubId) -> NaubinoResult<Removal> {
        if !self.naub(id).ok_or(Violation::UnknownNaub(id))?.alive {
            return Err(Violation::AlreadyRemoved(id).into());
        }

        let neighbors: Vec<NaubId> = self.naub_mut(id)?.joints.keys().copied().collect();
        let mut removal = Removal::default();
        for neighbor in neighbors {
            if let Some(joint) = self.unjoin(id, neighbor)? {
                removal.joints.push(joint);
            }
        }

        let naub = self.naub_mut(id)?;
        removal.pointers = std::mem::take(&mut naub.pointers).into_iter().collect();
        naub.alive = false;
        Ok(removal)
    }

    pub fn attach_pointer(&mut self, id: NaubId, pointer: PointerId) -> NaubinoResult<()> {
        self.live_naub(id)?;
        self.naub_mut(id)?.pointers.insert(pointer);
        Ok(())
    }

    pub fn detach_pointer(&mut self, id: NaubId, pointer: PointerId) -> bool {
        self.naubs
            .get_mut(id.0 as usize)
            .is_some_and(|n| n.pointers.remove(&pointer))
    }

    /// True if `other` is a neighbor or a neighbor's neighbor
    pub fn is_near(&self, naub: NaubId, other: NaubId) -> bool {
        let Some(n) = self.naub(naub) else {
            return false;
        };
        n.is_joined(other) || n.neighbors().any(|neighbor| self.is_joined(neighbor, other))
    }

    /// The single rule deciding whether a touch becomes a join or merge
    pub fn merges_with(&self, naub: NaubId, other: NaubId) -> bool {
        let (Some(a), Some(b)) = (self.naub(naub), self.naub(other)) else {
            return false;
        };
        if naub == other || !a.alive || !b.alive {
            return false;
        }
        let joker = a.degree() == 0;
        let colors_alike = a.color == b.color;
        joker || (colors_alike && !self.is_near(naub, other))
    }

    /// All naubs connected to `root`, depth-first, `root` first
    pub fn reachable_naubs(&self, root: NaubId) -> Vec<NaubId> {
        let mut visited = BTreeSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(naub) = self.naub(id) else {
                continue;
            };
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(naub.neighbors().filter(|n| !visited.contains(n)));
        }
        order
    }

    /// Verify symmetric adjacency, no self loops and joint liveness
    pub fn check_invariants(&self) -> Result<(), Violation> {
        for naub in &self.naubs {
            for (neighbor, joint_id) in naub.joints() {
                if neighbor == naub.id {
                    return Err(Violation::SelfLoop { op: "join", naub: naub.id });
                }
                if !naub.alive {
                    return Err(Violation::DeadNaub(naub.id));
                }
                let back = self.naub(neighbor).and_then(|n| n.joints.get(&naub.id));
                if back != Some(&joint_id) {
                    return Err(Violation::Asymmetric { naub: naub.id });
                }
                let joint = self.joint(joint_id).ok_or(Violation::UnknownJoint(joint_id))?;
                if !joint.alive || !self.is_alive(neighbor) {
                    return Err(Violation::DanglingJoint(joint_id));
                }
            }
            if !naub.alive && !naub.pointers.is_empty() {
                return Err(Violation::DeadNaub(naub.id));
            }
        }
        for joint in self.joints.iter().filter(|j| j.alive) {
            let (a, b) = joint.naubs;
            let listed = self.naub(a).and_then(|n| n.joints.get(&b)) == Some(&joint.id)
                && self.naub(b).and_then(|n| n.joints.get(&a)) == Some(&joint.id);
            if !listed || !self.is_alive(a) || !self.is_alive(b) {
                return Err(Violation::DanglingJoint(joint.id));
            }
        }
        Ok(())
    }
}
