//! Error types
//!
//! Graph invariant breaches are bugs in the caller; they surface as
//! `NaubinoError::GraphInvariantViolation` so tests can assert on misuse and
//! hosts can decide whether to abort.

use thiserror::Error;

use crate::graph::{JointId, NaubId};
use crate::pointer::PointerId;

pub type NaubinoResult<T> = Result<T, NaubinoError>;

#[derive(Debug, Error)]
pub enum NaubinoError {
    #[error("graph invariant violation: {0}")]
    GraphInvariantViolation(#[from] Violation),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// A concrete breach of the naub graph's preconditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("cannot {op} naub {naub} with itself")]
    SelfLoop { op: &'static str, naub: NaubId },

    #[error("naub {0} is dead")]
    DeadNaub(NaubId),

    #[error("naub {0} does not exist")]
    UnknownNaub(NaubId),

    #[error("naub {0} was already removed")]
    AlreadyRemoved(NaubId),

    #[error("joint {0} does not exist")]
    UnknownJoint(JointId),

    #[error("pointer {0} does not exist")]
    UnknownPointer(PointerId),

    #[error("naub {0} has no physics body")]
    MissingBody(NaubId),

    #[error("adjacency of naub {naub} is not symmetric")]
    Asymmetric { naub: NaubId },

    #[error("live joint {0} has a dead endpoint")]
    DanglingJoint(JointId),
}

impl NaubinoError {
    /// The underlying graph violation, if this is one
    pub fn violation(&self) -> Option<Violation> {
        match self {
            NaubinoError::GraphInvariantViolation(v) => Some(*v),
            _ => None,
        }
    }
}
