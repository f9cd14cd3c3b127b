//! Reaching-definitions use-def chains. Register moves do not count as
//! definitions; they copy the definition sets, so a chain of moves still
//! points at the original defining instruction.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{run_dataflow, DataflowAnalysis, Direction};
use crate::dex::body::{BlockId, InsnId, MethodBody};
use crate::dex::instructions::Def;

/// Definition sets per register word. Wide values are tracked through
/// their low word.
#[derive(Debug, Clone, PartialEq)]
pub struct RegDefs {
    regs: Vec<BTreeSet<Def>>,
}

impl RegDefs {
    /// Boundary state: every method argument defines the register words it
    /// is passed in, which are the last `in_words` registers of the frame.
    pub fn entry(body: &MethodBody) -> RegDefs {
        let mut regs = vec![BTreeSet::new(); body.num_registers as usize];
        let mut reg = body.num_registers - body.in_words;
        for i in 0..body.method.num_calling_params() {
            regs[reg as usize].insert(Def::Argument(i as u16));
            reg += body.method.calling_param(i).words();
        }
        RegDefs { regs }
    }

    pub fn defs(&self, reg: u16) -> &BTreeSet<Def> {
        &self.regs[reg as usize]
    }

    fn define(&mut self, reg: u16, def: Def) {
        let set = &mut self.regs[reg as usize];
        set.clear();
        set.insert(def);
    }

    fn copy(&mut self, dest: u16, src: u16) {
        if dest != src {
            self.regs[dest as usize] = self.regs[src as usize].clone();
        }
    }

    fn merge(&mut self, other: &RegDefs) {
        for (set, o) in self.regs.iter_mut().zip(&other.regs) {
            set.extend(o.iter().copied());
        }
    }
}

/// Runs the analysis and leaves the per-operand definition sets on the
/// instructions. The reverse mapping, definition to use sites, is kept on
/// the analysis itself.
pub struct UseDefAnalysis {
    uses: BTreeMap<Def, BTreeSet<InsnId>>,
}

impl UseDefAnalysis {
    pub fn new() -> UseDefAnalysis {
        UseDefAnalysis { uses: BTreeMap::new() }
    }

    pub fn analyse(&mut self, body: &mut MethodBody) {
        self.uses.clear();
        let boundary = RegDefs::entry(body);
        run_dataflow(self, body, boundary);
    }

    /// Instructions that read a value produced by `def`.
    pub fn uses_of(&self, def: Def) -> Option<&BTreeSet<InsnId>> {
        self.uses.get(&def)
    }

    fn record_use(&mut self, body: &mut MethodBody, at: InsnId, operand: usize, defs: &BTreeSet<Def>) {
        body.insn_mut(at).reg_defs[operand] = defs.clone();
        for &def in defs {
            self.uses.entry(def).or_default().insert(at);
        }
    }
}

impl Default for UseDefAnalysis {
    fn default() -> Self {
        UseDefAnalysis::new()
    }
}

impl DataflowAnalysis for UseDefAnalysis {
    type State = RegDefs;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn enter_block(
        &mut self,
        _body: &MethodBody,
        _block: BlockId,
        incoming: &BTreeMap<Option<BlockId>, RegDefs>,
    ) -> RegDefs {
        let mut it = incoming.values();
        let mut state = it.next().cloned().unwrap_or_else(|| RegDefs { regs: Vec::new() });
        for other in it {
            state.merge(other);
        }
        state
    }

    fn visit(&mut self, body: &mut MethodBody, id: InsnId, mut state: RegDefs) -> RegDefs {
        let ins = body.insn(id);
        if ins.is_move() {
            let dest = ins.registers[0];
            let src = ins.registers[1];
            let defs = state.defs(src).clone();
            self.record_use(body, id, 1, &defs);
            state.copy(dest, src);
        } else {
            let nregs = ins.registers.len();
            let writes = ins.writes_operand(0);
            let reads: Vec<(usize, u16)> = (0..nregs)
                .filter(|&i| body.insn(id).reads_operand(i))
                .map(|i| (i, body.insn(id).registers[i]))
                .collect();
            for (i, reg) in reads {
                let defs = state.defs(reg).clone();
                self.record_use(body, id, i, &defs);
            }
            if writes {
                let dest = body.insn(id).registers[0];
                state.define(dest, Def::Insn(id));
            }
        }
        state
    }
}
