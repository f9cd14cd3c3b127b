//! Iterative dataflow analyses over method bodies.

pub mod typing;
pub mod usedef;

use std::collections::{BTreeMap, VecDeque};

use crate::dex::body::{BlockId, InsnId, MethodBody};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One analysis over the CFG. The engine drives blocks from a worklist,
/// re-queueing a block whenever the state on one of its incoming edges
/// changes; the analysis supplies the merge and the transfer function.
pub trait DataflowAnalysis {
    type State: Clone + PartialEq;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    /// Merges the per-edge states reaching `block`. The `None` key carries
    /// the boundary state of a start block.
    fn enter_block(
        &mut self,
        body: &MethodBody,
        block: BlockId,
        incoming: &BTreeMap<Option<BlockId>, Self::State>,
    ) -> Self::State;

    /// Applies one instruction to the state. The body is mutable so
    /// analyses can record results on the instructions themselves.
    fn visit(&mut self, body: &mut MethodBody, insn: InsnId, state: Self::State) -> Self::State;
}

/// Generic worklist fixpoint. States are kept per edge rather than merged
/// in place, so a change on one edge is observed even when the other edges
/// already carry the merged value. Inline data tables are not visited.
pub fn run_dataflow<A: DataflowAnalysis>(analysis: &mut A, body: &mut MethodBody, boundary: A::State) {
    let forward = analysis.direction() == Direction::Forward;
    let mut edge_states: Vec<BTreeMap<Option<BlockId>, A::State>> =
        vec![BTreeMap::new(); body.num_blocks()];
    let mut starts = if forward { vec![body.entry()] } else { body.exit_blocks() };
    if forward {
        /* Handlers of regions where nothing throws, and code reachable only
         * through them, have no incoming edges but are still emitted. Each
         * such component is visited from its first block in layout order,
         * entered with the boundary state. */
        let mut reached = vec![false; body.num_blocks()];
        for &s in &starts {
            reach_from(body, s, &mut reached);
        }
        while let Some(&root) = body.order().iter().find(|b| !reached[b.0]) {
            starts.push(root);
            reach_from(body, root, &mut reached);
        }
    }

    let mut worklist: VecDeque<BlockId> = VecDeque::new();
    for &start in &starts {
        edge_states[start.0].insert(None, boundary.clone());
        worklist.push_back(start);
    }

    while let Some(bb) = worklist.pop_front() {
        let incoming = edge_states[bb.0].clone();
        let mut state = analysis.enter_block(body, bb, &incoming);

        let count = body.block(bb).insns.len();
        let indices: Vec<usize> = if forward {
            (0..count).collect()
        } else {
            (0..count).rev().collect()
        };
        for index in indices {
            if !body.block(bb).insns[index].is_instruction() {
                continue;
            }
            state = analysis.visit(body, InsnId { block: bb, index }, state);
        }

        let next: Vec<BlockId> = if forward {
            let blk = body.block(bb);
            blk.succs().iter().chain(blk.ex_succs()).copied().collect()
        } else {
            body.block(bb).preds().to_vec()
        };
        for out in next {
            if edge_states[out.0].get(&Some(bb)) != Some(&state) {
                edge_states[out.0].insert(Some(bb), state.clone());
                worklist.push_back(out);
            }
        }
    }
}

fn reach_from(body: &MethodBody, root: BlockId, reached: &mut [bool]) {
    let mut stack = vec![root];
    while let Some(b) = stack.pop() {
        if std::mem::replace(&mut reached[b.0], true) {
            continue;
        }
        let blk = body.block(b);
        stack.extend(blk.succs().iter().chain(blk.ex_succs()).copied());
    }
}
