//! Cycle detection
//!
//! Depth-first search from a merge point. Every visited naub gets a discovery
//! order and a mark; reaching a naub that is still on the stack closes a
//! loop, and the loop is every on-stack naub discovered at or after it. The
//! search stops at the first loop, so at most one cycle is reported.

use std::collections::HashMap;

use super::{NaubGraph, NaubId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Finished,
}

/// A naub on the search path and how far its neighbor scan got
struct Frame {
    naub: NaubId,
    neighbors: Vec<NaubId>,
    next: usize,
}

#[derive(Default)]
struct CycleSearch {
    visits: HashMap<NaubId, (u32, Mark)>,
    next_order: u32,
}

impl CycleSearch {
    /// Mark `v` on the stack and list its neighbors, minus the entry edge
    fn enter(&mut self, graph: &NaubGraph, v: NaubId, pre: Option<NaubId>) -> Frame {
        self.next_order += 1;
        self.visits.insert(v, (self.next_order, Mark::OnStack));

        let neighbors = graph
            .naub(v)
            .map(|naub| naub.neighbors().filter(|w| Some(*w) != pre).collect())
            .unwrap_or_default();
        Frame {
            naub: v,
            neighbors,
            next: 0,
        }
    }

    /// Iterative depth-first search; the path lives on an explicit stack so
    /// component size is not bounded by the thread stack
    fn run(&mut self, graph: &NaubGraph, root: NaubId) -> Option<Vec<NaubId>> {
        let mut stack = vec![self.enter(graph, root, None)];

        while let Some(frame) = stack.last_mut() {
            let v = frame.naub;
            let Some(&w) = frame.neighbors.get(frame.next) else {
                stack.pop();
                if let Some(visit) = self.visits.get_mut(&v) {
                    visit.1 = Mark::Finished;
                }
                continue;
            };
            frame.next += 1;

            match self.visits.get(&w).copied() {
                None => {
                    let child = self.enter(graph, w, Some(v));
                    stack.push(child);
                }
                Some((order, Mark::OnStack)) => {
                    let cycle = self.collect_from(order);
                    if cycle.len() > 1 {
                        return Some(cycle);
                    }
                }
                Some((_, Mark::Finished)) => {}
            }
        }
        None
    }

    /// On-stack naubs discovered at or after `order`, in discovery order
    fn collect_from(&self, order: u32) -> Vec<NaubId> {
        let mut cycle: Vec<(u32, NaubId)> = self
            .visits
            .iter()
            .filter(|(_, (o, mark))| *o >= order && *mark == Mark::OnStack)
            .map(|(id, (o, _))| (*o, *id))
            .collect();
        cycle.sort_unstable();
        cycle.into_iter().map(|(_, id)| id).collect()
    }
}

impl NaubGraph {
    /// The first cycle in `root`'s component, if any (at most one entry)
    pub fn find_cycles(&self, root: NaubId) -> Vec<Vec<NaubId>> {
        if !self.is_alive(root) {
            return Vec::new();
        }
        let mut search = CycleSearch::default();
        search.run(self, root).into_iter().collect()
    }
}
