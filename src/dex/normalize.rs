//! Rewrites try regions so that every region is entered only through its
//! first block. Structured-exception backends cannot express jumps into
//! the middle of a protected range, so offending blocks are either moved
//! out of the region, absorbed by extending it, or the region is split.

use log::debug;

use crate::dex::body::{BlockId, MethodBody, TryRegion};
use crate::dex::error::DexError;

/// Normalizes all try regions of `body`. After this pass every region's
/// blocks other than the first have only in-region predecessors, regions
/// stay sorted by start pc, and every region end pc has a block.
pub fn normalize_exceptions(body: &mut MethodBody) -> Result<(), DexError> {
    let mut i = 0;
    while i < body.tries.len() {
        if restructure_one(body, i)? {
            body.tries.sort_by_key(|t| (t.start_pc, t.end_pc));
            i = 0;
        } else {
            i += 1;
        }
    }
    add_end_blocks(body);
    Ok(())
}

/* Finds the first block of the region, other than its entry, with a
 * predecessor outside of it, and applies one rewrite. Returns whether
 * anything changed; the caller re-runs until the region is clean. */
fn restructure_one(body: &mut MethodBody, idx: usize) -> Result<bool, DexError> {
    let region = body.tries[idx].clone();
    let members = body.region_blocks(&region);
    for &bid in &members {
        if body.block(bid).pc() == region.start_pc {
            continue;
        }
        let intruder = match body
            .block(bid)
            .preds()
            .iter()
            .copied()
            .find(|p| !members.contains(p))
        {
            Some(p) => p,
            None => continue,
        };
        let bb = body.block(bid);
        if bb.succs().is_empty() && !bb.has_ex_succs() && !starts_with_bound_value(body, bid) {
            debug!(
                "relocating {} out of try region {:04x}..{:04x}",
                bb.name(),
                region.start_pc,
                region.end_pc
            );
            body.move_to_end(bid);
        } else if can_extend_over(body, intruder, &region) {
            let new_end = body.block(intruder).end_pc();
            debug!(
                "extending try region {:04x}..{:04x} to {:04x}",
                region.start_pc, region.end_pc, new_end
            );
            body.tries[idx].end_pc = new_end;
        } else {
            let pc = body.block(bid).pc();
            debug!(
                "splitting try region {:04x}..{:04x} at {:04x}",
                region.start_pc, region.end_pc, pc
            );
            let rest = body.tries[idx].split_at(pc);
            body.tries.insert(idx + 1, rest);
        }
        return Ok(true);
    }
    Ok(false)
}

/* Blocks opening with move-result or move-exception bind a value their
 * physical predecessor left behind and cannot be torn away from it. */
fn starts_with_bound_value(body: &MethodBody, bid: BlockId) -> bool {
    matches!(
        body.block(bid).first(),
        Some(ins) if ins.is_move_result() || ins.opcode == crate::dex::opcodes::MOVE_EXCEPTION
    )
}

/* A region may swallow its intruding predecessor only when that block sits
 * immediately at the region's end and is not itself protected elsewhere,
 * so the extension cannot change which handler covers it. */
fn can_extend_over(body: &MethodBody, pred: BlockId, region: &TryRegion) -> bool {
    match body.block_at(region.end_pc) {
        Some(end_block) => end_block == pred && !body.block(pred).has_ex_succs(),
        None => false,
    }
}

/* Region end pcs produced by splitting or by the original try table may
 * fall past all existing blocks; give each one an empty labelled block so
 * the region bounds always name a block. */
fn add_end_blocks(body: &mut MethodBody) {
    let mut n = 0;
    for i in 0..body.tries.len() {
        let end = body.tries[i].end_pc;
        if body.block_at(end).is_none() {
            body.insert_block(end, format!("final.{}", n));
            n += 1;
        }
    }
}
