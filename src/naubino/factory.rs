//! Naub factory: single naubs and evenly spaced chains

use glam::Vec2;

use super::Naubino;
use crate::direction_from_angle;
use crate::error::NaubinoResult;
use crate::graph::{NaubColor, NaubId, joint_rest_length};
use crate::physics::PhysicsWorld;

/// Offsets of chain members from the chain center, spaced by `rest_lengths`
/// along `rot`. There is one more offset than rest lengths.
pub fn chain_offsets(rest_lengths: &[f32], rot: f32) -> Vec<Vec2> {
    let mut sums = Vec::with_capacity(rest_lengths.len() + 1);
    let mut total = 0.0;
    sums.push(0.0);
    for length in rest_lengths {
        total += length;
        sums.push(total);
    }

    let dir = direction_from_angle(rot);
    sums.into_iter().map(|s| dir * (s - 0.5 * total)).collect()
}

impl<P: PhysicsWorld> Naubino<P> {
    /// Create a naub with the default color at `pos` (origin if `None`)
    pub fn create_naub(&mut self, pos: Option<Vec2>) -> NaubId {
        let radius = self.config.naub_radius;
        let id = self.graph.add_naub(radius, NaubColor::default());
        let body = self.physics.add_circle(pos.unwrap_or(Vec2::ZERO), radius);
        self.register_naub(id, body);
        log::trace!("Created naub {}", id);
        id
    }

    /// `n` naubs spaced by their rest lengths along `rot` (0 if `None`),
    /// joined pairwise and centered on `center` (origin if `None`)
    pub fn create_naub_chain(
        &mut self,
        n: usize,
        center: Option<Vec2>,
        rot: Option<f32>,
    ) -> NaubinoResult<Vec<NaubId>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let center = center.unwrap_or(Vec2::ZERO);
        let rot = rot.unwrap_or(0.0);
        let radius = self.config.naub_radius;
        let rest_lengths = vec![joint_rest_length(radius, radius); n - 1];

        let naubs: Vec<NaubId> = chain_offsets(&rest_lengths, rot)
            .into_iter()
            .map(|offset| self.create_naub(Some(center + offset)))
            .collect();
        for pair in naubs.windows(2) {
            self.join_naubs(pair[0], pair[1])?;
        }

        log::debug!("Created chain of {} naubs at ({:.1}, {:.1})", n, center.x, center.y);
        Ok(naubs)
    }
}
