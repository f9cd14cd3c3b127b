//! Method bodies as control flow graphs: block discovery, edge wiring and
//! exception handler connection.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use log::{debug, warn};

use crate::dex::error::DexError;
use crate::dex::instructions::Instruction;
use crate::types::{ConstantPool, DexType, MethodDesc};

/// Index of a block in the method's block arena. Stable across reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

/// Identity of an instruction: its block and position within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InsnId {
    pub block: BlockId,
    pub index: usize,
}

/// One entry of the method's try/catch table. `catch_type` of `None` is a
/// catch-all. The pc range is half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryRegion {
    pub start_pc: u32,
    pub end_pc: u32,
    pub handler_pc: u32,
    pub catch_type: Option<DexType>,
}

impl TryRegion {
    pub fn contains(&self, pc: u32) -> bool {
        pc >= self.start_pc && pc < self.end_pc
    }

    /// Shrinks this region to end at `pc` and returns the remainder, which
    /// keeps the same handler.
    pub fn split_at(&mut self, pc: u32) -> TryRegion {
        let rest = TryRegion { start_pc: pc, ..self.clone() };
        self.end_pc = pc;
        rest
    }
}

#[derive(Debug)]
pub struct BasicBlock {
    name: String,
    pc: u32,
    pub insns: Vec<Instruction>,
    preds: Vec<BlockId>,
    succs: Vec<BlockId>,
    ex_succs: Vec<BlockId>,
    fallthrough: Option<BlockId>,
    fallthrough_pred: Option<BlockId>,
    relocated: bool,
}

impl BasicBlock {
    fn new(name: String, pc: u32) -> BasicBlock {
        BasicBlock {
            name,
            pc,
            insns: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            ex_succs: Vec::new(),
            fallthrough: None,
            fallthrough_pred: None,
            relocated: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// First pc past the block's code units.
    pub fn end_pc(&self) -> u32 {
        self.insns.iter().map(|i| i.size()).sum::<u32>() + self.pc
    }

    pub fn preds(&self) -> &[BlockId] {
        &self.preds
    }

    pub fn succs(&self) -> &[BlockId] {
        &self.succs
    }

    pub fn ex_succs(&self) -> &[BlockId] {
        &self.ex_succs
    }

    pub fn has_ex_succs(&self) -> bool {
        !self.ex_succs.is_empty()
    }

    pub fn fallthrough(&self) -> Option<BlockId> {
        self.fallthrough
    }

    pub fn fallthrough_pred(&self) -> Option<BlockId> {
        self.fallthrough_pred
    }

    pub fn is_relocated(&self) -> bool {
        self.relocated
    }

    pub fn first(&self) -> Option<&Instruction> {
        self.insns.first()
    }

    /// Last executable instruction, skipping trailing data tables.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.insns.iter().rev().find(|i| i.is_instruction())
    }

    /// True when control leaves the method here: the block ends in a
    /// return or throw.
    pub fn is_exit(&self) -> bool {
        matches!(self.terminator(), Some(t) if t.is_return() || t.is_throw())
    }
}

/// A decoded method body, partitioned into basic blocks.
#[derive(Debug)]
pub struct MethodBody {
    pub method: MethodDesc,
    pub num_registers: u16,
    pub in_words: u16,
    pub out_words: u16,
    code: Vec<u16>,
    /// Opaque debug-info blob from the container; carried, never decoded.
    pub debug_info: Vec<u8>,
    pub tries: Vec<TryRegion>,
    blocks: Vec<BasicBlock>,
    order: Vec<BlockId>,
    by_pc: BTreeMap<u32, BlockId>,
}

impl MethodBody {
    /// Decodes `code` and builds the control flow graph: block discovery
    /// from branch targets and try boundaries, edge wiring, exception
    /// handler connection, and invoke register normalization.
    pub fn build(
        method: MethodDesc,
        num_registers: u16,
        out_words: u16,
        code: Vec<u16>,
        tries: Vec<TryRegion>,
        pool: &dyn ConstantPool,
    ) -> Result<MethodBody, DexError> {
        let in_words = method.in_words();
        let mut body = MethodBody {
            method,
            num_registers,
            in_words,
            out_words,
            code,
            debug_info: Vec::new(),
            tries,
            blocks: Vec::new(),
            order: Vec::new(),
            by_pc: BTreeMap::new(),
        };
        let sig = body.method.signature();
        if body.code.is_empty() {
            fail!(Structural, ("empty method body"), ("{}", sig));
        }
        if body.num_registers < body.in_words {
            fail!(
                Structural,
                ("{} registers cannot hold {} argument words", body.num_registers, body.in_words),
                ("{}", sig)
            );
        }
        let boundaries = body.discover_entries().map_err(|e| e.context(sig.as_str()))?;
        body.materialize(&boundaries).map_err(|e| e.context(sig.as_str()))?;
        body.connect_handlers().map_err(|e| e.context(sig.as_str()))?;
        body.resolve_invokes(pool).map_err(|e| e.context(sig.as_str()))?;
        debug!("built cfg for {}: {} blocks", sig, body.blocks.len());
        Ok(body)
    }

    /* Phase 1: follow control flow from the method entry and all try
     * starts/handlers, collecting every pc that starts a block. Try region
     * end pcs become block boundaries too, so regions always end on a
     * block edge. */
    fn discover_entries(&self) -> Result<BTreeSet<u32>, DexError> {
        let len = self.code.len();
        let mut worklist: VecDeque<u32> = VecDeque::new();
        let mut entries: BTreeSet<u32> = BTreeSet::new();
        let mut boundaries: BTreeSet<u32> = BTreeSet::new();
        worklist.push_back(0);
        for t in &self.tries {
            if t.start_pc as usize >= len || t.handler_pc as usize >= len || t.end_pc as usize > len {
                fail!(
                    Structural,
                    "try region {:04x}..{:04x} -> {:04x} outside method code",
                    t.start_pc,
                    t.end_pc,
                    t.handler_pc
                );
            }
            worklist.push_back(t.start_pc);
            worklist.push_back(t.handler_pc);
            if (t.end_pc as usize) < len {
                boundaries.insert(t.end_pc);
            }
        }

        let check = |target: i64, from: u32| -> Result<u32, DexError> {
            if target < 0 || target as usize >= len {
                fail!(
                    Structural,
                    "branch target {:04x} of instruction at {:04x} outside method code",
                    target,
                    from
                );
            }
            Ok(target as u32)
        };

        let mut scanned: BTreeSet<u32> = BTreeSet::new();
        while let Some(entry) = worklist.pop_front() {
            if !entries.insert(entry) {
                continue;
            }
            let mut pc = entry;
            while (pc as usize) < len {
                if !scanned.insert(pc) && pc != entry {
                    break;
                }
                let ins = Instruction::decode(&self.code, pc)?;
                if !ins.is_instruction() {
                    // Fell into an inline data table; the block ended above.
                    break;
                }
                if ins.is_uncond_branch() {
                    worklist.push_back(check(ins.target(), pc)?);
                    break;
                } else if ins.is_cond_branch() {
                    worklist.push_back(check(ins.target(), pc)?);
                    worklist.push_back(pc + ins.size());
                    break;
                } else if ins.is_switch() {
                    for t in ins.switch_targets() {
                        worklist.push_back(check(t, pc)?);
                    }
                    worklist.push_back(pc + ins.size());
                    break;
                } else if ins.is_return() || ins.is_throw() {
                    break;
                }
                pc += ins.size();
            }
        }
        boundaries.extend(entries);
        Ok(boundaries)
    }

    /* Phase 2: carve the code array into blocks at the discovered
     * boundaries and wire the normal control flow edges. Inline data
     * tables and alignment nops after a terminator stay attached to their
     * block so the blocks cover the code array without gaps. */
    fn materialize(&mut self, boundaries: &BTreeSet<u32>) -> Result<(), DexError> {
        let len = self.code.len();
        let starts: Vec<u32> = boundaries.iter().copied().collect();
        for &pc in &starts {
            self.insert_block(pc, String::new());
        }

        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(len as u32);
            let bid = self.by_pc[&start];
            let mut pc = start;
            let mut terminated = false;
            let mut reached_end = false;
            while pc < end {
                let ins = Instruction::decode(&self.code, pc)?;
                let next = pc + ins.size();
                if next > end {
                    fail!(
                        Structural,
                        "block boundary {:04x} falls inside the instruction at {:04x}",
                        end,
                        pc
                    );
                }
                if terminated && ins.is_instruction() && ins.opcode != 0 {
                    fail!(Structural, "unreachable code at {:04x} after block end", pc);
                }
                if !terminated && ins.is_instruction() {
                    if ins.is_uncond_branch() {
                        let succ = self.block_at_checked(ins.target() as u32, pc)?;
                        self.add_successor(bid, succ);
                    } else if ins.is_cond_branch() {
                        let succ = self.block_at_checked(ins.target() as u32, pc)?;
                        self.add_successor(bid, succ);
                        reached_end = true;
                    } else if ins.is_switch() {
                        for t in ins.switch_targets() {
                            let succ = self.block_at_checked(t as u32, pc)?;
                            self.add_successor(bid, succ);
                        }
                        reached_end = true;
                    } else if next == end && ins.info().can_continue() {
                        reached_end = true;
                    }
                    terminated = ins.ends_block();
                }
                self.blocks[bid.0].insns.push(ins);
                pc = next;
            }
            if reached_end {
                if end as usize >= len {
                    fail!(Structural, "control falls off the end of the method at {:04x}", end);
                }
                let succ = self.by_pc[&end];
                self.add_fallthrough(bid, succ);
            }
        }
        self.rename_blocks();
        Ok(())
    }

    /* Exception edges: an instruction that can throw connects its block to
     * every handler of an enclosing try region whose catch type could match
     * one of the declared thrown classes. When the class hierarchy cannot
     * settle the question the edge is added pessimistically. */
    fn connect_handlers(&mut self) -> Result<(), DexError> {
        for ti in 0..self.tries.len() {
            let region = self.tries[ti].clone();
            let handler = match self.block_at(region.handler_pc) {
                Some(h) => h,
                None => fail!(
                    Structural,
                    "exception handler pc {:04x} is not a block start",
                    region.handler_pc
                ),
            };
            if self.block_at(region.start_pc).is_none() {
                fail!(
                    Structural,
                    "try region start {:04x} is not a block start",
                    region.start_pc
                );
            }
            for bid in self.order.clone() {
                let reaches = self.blocks[bid.0].insns.iter().any(|ins| {
                    ins.may_throw()
                        && region.contains(ins.pc)
                        && Self::throw_reaches(ins, region.catch_type.as_ref())
                });
                if reaches {
                    self.add_exception_successor(bid, handler);
                }
            }
        }
        Ok(())
    }

    fn throw_reaches(ins: &Instruction, catch_type: Option<&DexType>) -> bool {
        let info = ins.info();
        if info.may_throw_anything() {
            return true;
        }
        let catch = match catch_type {
            None => return true,
            Some(c) => c,
        };
        for desc in info.throw_descriptors() {
            let thrown = DexType::object(desc);
            match thrown.subtype_of(catch) {
                Some(true) => return true,
                Some(false) => match catch.subtype_of(&thrown) {
                    Some(true) => return true,
                    Some(false) => {}
                    None => {
                        warn!(
                            "cannot order {} and {}, keeping handler reachable",
                            catch, thrown
                        );
                        return true;
                    }
                },
                None => {
                    warn!(
                        "cannot order {} and {}, keeping handler reachable",
                        thrown, catch
                    );
                    return true;
                }
            }
        }
        false
    }

    /* Invoke register lists still count long/double arguments twice;
     * collapse them now that the callee signatures can be resolved. */
    fn resolve_invokes(&mut self, pool: &dyn ConstantPool) -> Result<(), DexError> {
        for bb in &mut self.blocks {
            for ins in &mut bb.insns {
                if !ins.is_invoke() {
                    continue;
                }
                let idx = ins.operand.pool_index().unwrap_or(u32::MAX);
                let mref = match pool.method(idx) {
                    Some(m) => m,
                    None => fail!(
                        Structural,
                        "unresolvable method index {} at {:04x}",
                        idx,
                        ins.pc
                    ),
                };
                ins.fix_invoke_registers(mref)?;
            }
        }
        Ok(())
    }

    fn rename_blocks(&mut self) {
        for (i, &bid) in self.order.iter().enumerate() {
            self.blocks[bid.0].name =
                if i == 0 { "entry".to_string() } else { format!("bb{}", i) };
        }
    }

    pub fn entry(&self) -> BlockId {
        self.order[0]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0]
    }

    pub fn insn(&self, id: InsnId) -> &Instruction {
        &self.blocks[id.block.0].insns[id.index]
    }

    pub fn insn_mut(&mut self, id: InsnId) -> &mut Instruction {
        &mut self.blocks[id.block.0].insns[id.index]
    }

    /// Blocks in layout order: pc order, with relocated blocks at the end.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn code_len(&self) -> u32 {
        self.code.len() as u32
    }

    pub fn block_at(&self, pc: u32) -> Option<BlockId> {
        self.by_pc.get(&pc).copied()
    }

    fn block_at_checked(&self, pc: u32, from: u32) -> Result<BlockId, DexError> {
        match self.block_at(pc) {
            Some(b) => Ok(b),
            None => fail!(
                Structural,
                "branch from {:04x} into the middle of an instruction at {:04x}",
                from,
                pc
            ),
        }
    }

    pub fn exit_blocks(&self) -> Vec<BlockId> {
        self.order
            .iter()
            .copied()
            .filter(|&b| self.blocks[b.0].is_exit())
            .collect()
    }

    pub fn add_successor(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.0].succs.push(to);
        self.blocks[to.0].preds.push(from);
    }

    pub fn add_fallthrough(&mut self, from: BlockId, to: BlockId) {
        self.add_successor(from, to);
        self.blocks[from.0].fallthrough = Some(to);
        self.blocks[to.0].fallthrough_pred = Some(from);
    }

    pub fn add_exception_successor(&mut self, from: BlockId, handler: BlockId) {
        if !self.blocks[from.0].ex_succs.contains(&handler) {
            self.blocks[from.0].ex_succs.push(handler);
            self.blocks[handler.0].preds.push(from);
        }
    }

    /// Inserts an empty block at `pc`, keeping layout order sorted ahead of
    /// any relocated blocks. Used for synthesized region-end labels.
    pub fn insert_block(&mut self, pc: u32, name: String) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::new(name, pc));
        let at = self
            .order
            .iter()
            .position(|&b| self.blocks[b.0].relocated || self.blocks[b.0].pc > pc)
            .unwrap_or(self.order.len());
        self.order.insert(at, id);
        self.by_pc.insert(pc, id);
        id
    }

    /* Detaches `id` from its physical fallthrough, compensating with a
     * synthetic goto in the predecessor, and moves it to the end of the
     * layout. The block keeps its pc and name. */
    pub fn move_to_end(&mut self, id: BlockId) {
        use crate::dex::instructions::Operand;
        use crate::dex::opcodes::GOTO16;
        if let Some(pred) = self.blocks[id.0].fallthrough_pred.take() {
            let target = self.blocks[id.0].pc;
            let at = self.blocks[pred.0]
                .insns
                .last()
                .map(|i| i.pc)
                .unwrap_or(self.blocks[pred.0].pc);
            self.blocks[pred.0].insns.push(Instruction::synthetic(
                GOTO16,
                Vec::new(),
                Operand::Target(target as i64),
                at,
            ));
            self.blocks[pred.0].fallthrough = None;
        }
        self.blocks[id.0].relocated = true;
        self.order.retain(|&b| b != id);
        self.order.push(id);
    }

    /// Blocks of a try region in layout order, starting at the region's
    /// start block and stopping at its end pc. Relocated blocks are not
    /// members even when their pc falls inside the region.
    pub fn region_blocks(&self, region: &TryRegion) -> Vec<BlockId> {
        let start = match self.block_at(region.start_pc) {
            Some(b) => b,
            None => return Vec::new(),
        };
        let mut members = Vec::new();
        let mut inside = false;
        for &bid in &self.order {
            if bid == start {
                inside = true;
            }
            if inside {
                let b = &self.blocks[bid.0];
                if b.relocated || b.pc >= region.end_pc {
                    break;
                }
                members.push(bid);
            }
        }
        members
    }
}

impl fmt::Display for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} registers)", self.method, self.num_registers)?;
        for &bid in &self.order {
            let bb = &self.blocks[bid.0];
            write!(f, "  {}:", bb.name)?;
            if !bb.preds.is_empty() {
                write!(f, "    ; preds:")?;
                for p in &bb.preds {
                    write!(f, " {}", self.blocks[p.0].name)?;
                }
            }
            writeln!(f)?;
            for ins in &bb.insns {
                writeln!(f, "    {}", ins)?;
            }
        }
        Ok(())
    }
}
