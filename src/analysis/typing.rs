//! Type inference over register operands. Dalvik registers are untyped
//! and most opcodes are polymorphic compared to JVM bytecode, so every
//! operand needs a concrete type before retargeting. Primitive constants
//! are just bits; they start out as placeholder cells that get resolved
//! when an instruction or a merge forces a concrete type on them, and any
//! cell still unresolved at the end defaults to int or long.

use std::collections::BTreeMap;

use log::debug;

use crate::analysis::{run_dataflow, DataflowAnalysis, Direction};
use crate::dex::body::{BlockId, InsnId, MethodBody};
use crate::dex::error::DexError;
use crate::dex::opcodes::*;
use crate::types::{CellId, ConstantPool, DexType, CLASS, OBJECT, STRING, THROWABLE};

/// Resolves each method body's operand types in place. Errors indicate
/// malformed bytecode: a register used at two irreconcilable types, or a
/// dangling pool index.
pub fn assign_types(body: &mut MethodBody, pool: &dyn ConstantPool) -> Result<(), DexError> {
    let mut inference = TypeInference::new(pool, body.method.return_type.clone());
    inference.run(body)
}

/* Union-find over placeholder cells. Two placeholders that must agree get
 * merged; resolving any member of a class types the whole class. */
struct Cells {
    parent: Vec<CellId>,
    resolved: Vec<Option<DexType>>,
}

impl Cells {
    fn new() -> Cells {
        Cells { parent: Vec::new(), resolved: Vec::new() }
    }

    fn fresh(&mut self) -> CellId {
        let id = self.parent.len() as CellId;
        self.parent.push(id);
        self.resolved.push(None);
        id
    }

    fn find(&mut self, cell: CellId) -> CellId {
        let mut c = cell;
        while self.parent[c as usize] != c {
            let up = self.parent[self.parent[c as usize] as usize];
            self.parent[c as usize] = up;
            c = up;
        }
        c
    }

    fn value(&mut self, cell: CellId) -> Option<DexType> {
        let root = self.find(cell);
        self.resolved[root as usize].clone()
    }

    fn resolve(&mut self, cell: CellId, ty: &DexType) -> Result<(), DexError> {
        let root = self.find(cell);
        match &self.resolved[root as usize] {
            None => {
                self.resolved[root as usize] = Some(ty.clone());
                Ok(())
            }
            Some(have) if have.is_compatible(ty) => Ok(()),
            Some(have) => Err(err!(
                TypeConflict,
                "constant already typed {} cannot also be {}",
                have,
                ty
            )),
        }
    }

    fn union(&mut self, a: CellId, b: CellId) -> Result<(), DexError> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return Ok(());
        }
        let merged = match (self.resolved[ra as usize].take(), self.resolved[rb as usize].take()) {
            (None, v) | (v, None) => v,
            (Some(x), Some(y)) if x.is_compatible(&y) => Some(x),
            (Some(x), Some(y)) => {
                fail!(TypeConflict, "constant already typed {} cannot also be {}", x, y)
            }
        };
        self.parent[ra as usize] = rb;
        self.resolved[rb as usize] = merged;
        Ok(())
    }
}

/// Per-register types plus the pending invoke result type.
#[derive(Debug, Clone, PartialEq)]
pub struct RegTypes {
    types: Vec<DexType>,
    result: DexType,
}

impl RegTypes {
    /// Boundary state: locals are uninitialized (void), the trailing
    /// registers hold the receiver and parameters, with the high word of a
    /// wide parameter marked void.
    fn entry(body: &MethodBody) -> RegTypes {
        let mut types = vec![DexType::Void; body.num_registers as usize];
        let mut reg = (body.num_registers - body.in_words) as usize;
        for i in 0..body.method.num_calling_params() {
            let p = body.method.calling_param(i).clone();
            let words = p.words();
            types[reg] = p;
            reg += words as usize;
        }
        RegTypes { types, result: DexType::Void }
    }
}

pub struct TypeInference<'a> {
    pool: &'a dyn ConstantPool,
    return_type: DexType,
    cells: Cells,
    error: Option<DexError>,
}

impl<'a> TypeInference<'a> {
    pub fn new(pool: &'a dyn ConstantPool, return_type: DexType) -> TypeInference<'a> {
        TypeInference { pool, return_type, cells: Cells::new(), error: None }
    }

    pub fn run(&mut self, body: &mut MethodBody) -> Result<(), DexError> {
        let boundary = RegTypes::entry(body);
        run_dataflow(self, body, boundary);
        if let Some(e) = self.error.take() {
            return Err(e.context(format!("{}", body.method)));
        }
        self.finalize(body);
        Ok(())
    }

    /* Rewrites leftover placeholders to their resolved types; a constant
     * nothing ever constrained is plain int or long bits. */
    fn finalize(&mut self, body: &mut MethodBody) {
        for &bid in &body.order().to_vec() {
            for ins in &mut body.block_mut(bid).insns {
                let pc = ins.pc;
                for slot in &mut ins.reg_types {
                    if let Some(ty) = slot {
                        match *ty {
                            DexType::Word32(c) => {
                                *slot = Some(self.cells.value(c).unwrap_or_else(|| {
                                    debug!("constant at {:04x} never constrained, taking int", pc);
                                    DexType::Int
                                }));
                            }
                            DexType::Word64(c) => {
                                *slot = Some(self.cells.value(c).unwrap_or_else(|| {
                                    debug!("constant at {:04x} never constrained, taking long", pc);
                                    DexType::Long
                                }));
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    fn fresh32(&mut self) -> DexType {
        DexType::Word32(self.cells.fresh())
    }

    fn fresh64(&mut self) -> DexType {
        DexType::Word64(self.cells.fresh())
    }

    fn record(&mut self, result: Result<(), DexError>, pc: u32) {
        if self.error.is_none() {
            if let Err(e) = result {
                self.error = Some(e.context(format!("instruction at {:04x}", pc)));
            }
        }
    }

    /* Requires the value in `ty` to be usable as `expected`. Placeholders
     * get resolved, concrete types only need representation compatibility. */
    fn constrain(&mut self, ty: &DexType, expected: &DexType) -> Result<(), DexError> {
        match (ty, expected) {
            (DexType::Word32(a), DexType::Word32(b)) | (DexType::Word64(a), DexType::Word64(b)) => {
                self.cells.union(*a, *b)
            }
            (DexType::Word32(c), e) if !e.is_placeholder() && e.words() == 1 && *e != DexType::Void => {
                self.cells.resolve(*c, e)
            }
            (DexType::Word64(c), e) if !e.is_placeholder() && e.words() == 2 => {
                self.cells.resolve(*c, e)
            }
            (DexType::Word32(_) | DexType::Word64(_), e) => {
                fail!(TypeConflict, "untyped constant cannot be used as {}", e)
            }
            (t, DexType::Word32(c)) if t.words() == 1 && *t != DexType::Void => {
                self.cells.resolve(*c, t)
            }
            (t, DexType::Word64(c)) if t.words() == 2 => self.cells.resolve(*c, t),
            (t, e) => {
                if t.is_compatible(e) {
                    Ok(())
                } else {
                    fail!(TypeConflict, "register holds {} where {} is required", t, e)
                }
            }
        }
    }

    fn check(&mut self, state: &RegTypes, reg: u16, expected: &DexType, pc: u32) {
        let ty = state.types[reg as usize].clone();
        let res = self.constrain(&ty, expected);
        self.record(res, pc);
    }

    /* Merge of two register slots at a block entry. Inconsistent live
     * values are a verifier error in the source, so a primitive mismatch
     * means both paths treat the register as dead. Distinct object types
     * have to be assumed convertible and widen to java.lang.Object. */
    fn merge_one(&mut self, a: &DexType, b: &DexType) -> DexType {
        if a == b {
            match (a, b) {
                (DexType::Word32(x), DexType::Word32(y))
                | (DexType::Word64(x), DexType::Word64(y)) => {
                    if self.cells.union(*x, *y).is_err() {
                        return DexType::Void;
                    }
                }
                _ => {}
            }
            return a.clone();
        }
        if a.is_reference() && b.is_reference() {
            return DexType::object(OBJECT);
        }
        if a.is_placeholder() && !b.is_placeholder() {
            if self.constrain(a, b).is_ok() {
                return a.clone();
            }
            return DexType::Void;
        }
        if b.is_placeholder() && !a.is_placeholder() {
            if self.constrain(b, a).is_ok() {
                return b.clone();
            }
            return DexType::Void;
        }
        if a.is_prim_word() && b.is_prim_word() {
            return DexType::Int;
        }
        DexType::Void
    }

    fn type_operand(&mut self, body: &MethodBody, id: InsnId) -> Option<DexType> {
        let ins = body.insn(id);
        let idx = ins.operand.pool_index()?;
        let ty = self.pool.type_descriptor(idx).and_then(DexType::from_descriptor);
        if ty.is_none() {
            self.record(
                Err(err!(Structural, "unresolvable type index {}", idx)),
                ins.pc,
            );
        }
        ty
    }

    fn field_operand(&mut self, body: &MethodBody, id: InsnId) -> Option<DexType> {
        let ins = body.insn(id);
        let idx = ins.operand.pool_index()?;
        let f = self.pool.field(idx).map(|f| f.field_type.clone());
        if f.is_none() {
            self.record(
                Err(err!(Structural, "unresolvable field index {}", idx)),
                ins.pc,
            );
        }
        f
    }

    /* Element type of the array operand in register slot 1. Unknown when
     * the array register holds an untyped constant (a null), in which case
     * the access can only throw and any type will do. */
    fn element_of(&mut self, state: &RegTypes, reg: u16, pc: u32) -> Option<DexType> {
        let ty = &state.types[reg as usize];
        match ty {
            DexType::Array(e) => Some((**e).clone()),
            DexType::Object(_) | DexType::Word32(_) => None,
            other => {
                self.record(
                    Err(err!(TypeConflict, "array access on non-array type {}", other)),
                    pc,
                );
                None
            }
        }
    }
}

impl<'a> DataflowAnalysis for TypeInference<'a> {
    type State = RegTypes;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn enter_block(
        &mut self,
        _body: &MethodBody,
        _block: BlockId,
        incoming: &BTreeMap<Option<BlockId>, RegTypes>,
    ) -> RegTypes {
        let mut it = incoming.values();
        let mut state = match it.next() {
            Some(first) => first.clone(),
            None => return RegTypes { types: Vec::new(), result: DexType::Void },
        };
        for other in it {
            for i in 0..state.types.len() {
                state.types[i] = self.merge_one(&state.types[i].clone(), &other.types[i]);
            }
            state.result = self.merge_one(&state.result.clone(), &other.result);
        }
        state
    }

    fn visit(&mut self, body: &mut MethodBody, id: InsnId, mut state: RegTypes) -> RegTypes {
        if self.error.is_some() {
            return state;
        }
        let (regs, pc, op) = {
            let ins = body.insn(id);
            (ins.registers.clone(), ins.pc, ins.opcode)
        };
        let prev_out = body.insn(id).reg_types.first().cloned().flatten();
        {
            let ins = body.insn_mut(id);
            for (i, &r) in regs.iter().enumerate() {
                ins.reg_types[i] = Some(state.types[r as usize].clone());
            }
        }

        let mut out: Option<DexType> = None;
        match op {
            MOVE | MOVE_FROM16 | MOVE16 | MOVE_OBJECT | MOVE_OBJECT_FROM16 | MOVE_OBJECT16
            | MOVE_WIDE | MOVE_WIDE_FROM16 | MOVE_WIDE16 => {
                out = Some(state.types[regs[1] as usize].clone());
            }
            MOVE_RESULT | MOVE_RESULT_WIDE | MOVE_RESULT_OBJECT => {
                out = Some(state.result.clone());
            }
            MOVE_EXCEPTION => out = Some(DexType::object(THROWABLE)),
            CONST4 | CONST16 | CONST | CONST_HIGH16 => {
                out = Some(prev_out.unwrap_or_else(|| self.fresh32()));
            }
            CONST_WIDE16 | CONST_WIDE32 | CONST_WIDE | CONST_WIDE_HIGH16 => {
                out = Some(prev_out.unwrap_or_else(|| self.fresh64()));
            }
            CONST_STRING | CONST_STRING_JUMBO => out = Some(DexType::object(STRING)),
            CONST_CLASS => out = Some(DexType::object(CLASS)),
            INSTANCE_OF | ARRAY_LENGTH => out = Some(DexType::Int),
            CMPL_FLOAT | CMPG_FLOAT => {
                self.check(&state, regs[1], &DexType::Float, pc);
                self.check(&state, regs[2], &DexType::Float, pc);
                out = Some(DexType::Int);
            }
            CMPL_DOUBLE | CMPG_DOUBLE => {
                self.check(&state, regs[1], &DexType::Double, pc);
                self.check(&state, regs[2], &DexType::Double, pc);
                out = Some(DexType::Int);
            }
            CMP_LONG => {
                self.check(&state, regs[1], &DexType::Long, pc);
                self.check(&state, regs[2], &DexType::Long, pc);
                out = Some(DexType::Int);
            }
            NEG_INT | NOT_INT | ADD_INT_LIT16..=XOR_INT_LIT16 | ADD_INT_LIT8..=USHR_INT_LIT8 => {
                self.check(&state, regs[1], &DexType::Int, pc);
                out = Some(DexType::Int);
            }
            ADD_INT..=USHR_INT => {
                self.check(&state, regs[1], &DexType::Int, pc);
                self.check(&state, regs[2], &DexType::Int, pc);
                out = Some(DexType::Int);
            }
            ADD_INT_2ADDR..=USHR_INT_2ADDR => {
                self.check(&state, regs[0], &DexType::Int, pc);
                self.check(&state, regs[1], &DexType::Int, pc);
                out = Some(DexType::Int);
            }
            NEG_LONG | NOT_LONG => {
                self.check(&state, regs[1], &DexType::Long, pc);
                out = Some(DexType::Long);
            }
            ADD_LONG..=USHR_LONG => {
                self.check(&state, regs[1], &DexType::Long, pc);
                self.check(&state, regs[2], &DexType::Long, pc);
                out = Some(DexType::Long);
            }
            ADD_LONG_2ADDR..=USHR_LONG_2ADDR => {
                self.check(&state, regs[0], &DexType::Long, pc);
                self.check(&state, regs[1], &DexType::Long, pc);
                out = Some(DexType::Long);
            }
            NEG_FLOAT => {
                self.check(&state, regs[1], &DexType::Float, pc);
                out = Some(DexType::Float);
            }
            ADD_FLOAT..=REM_FLOAT => {
                self.check(&state, regs[1], &DexType::Float, pc);
                self.check(&state, regs[2], &DexType::Float, pc);
                out = Some(DexType::Float);
            }
            ADD_FLOAT_2ADDR..=REM_FLOAT_2ADDR => {
                self.check(&state, regs[0], &DexType::Float, pc);
                self.check(&state, regs[1], &DexType::Float, pc);
                out = Some(DexType::Float);
            }
            NEG_DOUBLE => {
                self.check(&state, regs[1], &DexType::Double, pc);
                out = Some(DexType::Double);
            }
            ADD_DOUBLE..=REM_DOUBLE => {
                self.check(&state, regs[1], &DexType::Double, pc);
                self.check(&state, regs[2], &DexType::Double, pc);
                out = Some(DexType::Double);
            }
            ADD_DOUBLE_2ADDR..=REM_DOUBLE_2ADDR => {
                self.check(&state, regs[0], &DexType::Double, pc);
                self.check(&state, regs[1], &DexType::Double, pc);
                out = Some(DexType::Double);
            }
            INT_TO_LONG => {
                self.check(&state, regs[1], &DexType::Int, pc);
                out = Some(DexType::Long);
            }
            INT_TO_FLOAT => {
                self.check(&state, regs[1], &DexType::Int, pc);
                out = Some(DexType::Float);
            }
            INT_TO_DOUBLE => {
                self.check(&state, regs[1], &DexType::Int, pc);
                out = Some(DexType::Double);
            }
            INT_TO_BYTE | INT_TO_CHAR | INT_TO_SHORT => {
                self.check(&state, regs[1], &DexType::Int, pc);
                out = Some(DexType::Int);
            }
            LONG_TO_INT => {
                self.check(&state, regs[1], &DexType::Long, pc);
                out = Some(DexType::Int);
            }
            LONG_TO_FLOAT => {
                self.check(&state, regs[1], &DexType::Long, pc);
                out = Some(DexType::Float);
            }
            LONG_TO_DOUBLE => {
                self.check(&state, regs[1], &DexType::Long, pc);
                out = Some(DexType::Double);
            }
            FLOAT_TO_INT => {
                self.check(&state, regs[1], &DexType::Float, pc);
                out = Some(DexType::Int);
            }
            FLOAT_TO_LONG => {
                self.check(&state, regs[1], &DexType::Float, pc);
                out = Some(DexType::Long);
            }
            FLOAT_TO_DOUBLE => {
                self.check(&state, regs[1], &DexType::Float, pc);
                out = Some(DexType::Double);
            }
            DOUBLE_TO_INT => {
                self.check(&state, regs[1], &DexType::Double, pc);
                out = Some(DexType::Int);
            }
            DOUBLE_TO_LONG => {
                self.check(&state, regs[1], &DexType::Double, pc);
                out = Some(DexType::Long);
            }
            DOUBLE_TO_FLOAT => {
                self.check(&state, regs[1], &DexType::Double, pc);
                out = Some(DexType::Float);
            }
            NEW_INSTANCE | CHECK_CAST => out = self.type_operand(body, id),
            NEW_ARRAY => {
                self.check(&state, regs[1], &DexType::Int, pc);
                out = self.type_operand(body, id);
            }
            AGET..=AGET_SHORT => {
                self.check(&state, regs[2], &DexType::Int, pc);
                out = Some(match self.element_of(&state, regs[1], pc) {
                    Some(e) => e,
                    None => match op {
                        AGET_WIDE => self.fresh64(),
                        AGET_OBJECT => DexType::object(OBJECT),
                        AGET_BOOLEAN => DexType::Boolean,
                        AGET_BYTE => DexType::Byte,
                        AGET_CHAR => DexType::Char,
                        AGET_SHORT => DexType::Short,
                        _ => self.fresh32(),
                    },
                });
            }
            APUT..=APUT_SHORT => {
                self.check(&state, regs[2], &DexType::Int, pc);
                if let Some(e) = self.element_of(&state, regs[1], pc) {
                    self.check(&state, regs[0], &e, pc);
                }
            }
            IGET..=IGET_SHORT | SGET..=SGET_SHORT => {
                out = self.field_operand(body, id);
            }
            IPUT..=IPUT_SHORT | SPUT..=SPUT_SHORT => {
                if let Some(f) = self.field_operand(body, id) {
                    self.check(&state, regs[0], &f, pc);
                }
            }
            IF_EQ | IF_NE => {
                // eq/ne compare references as well as ints
                let a = state.types[regs[0] as usize].clone();
                let b = state.types[regs[1] as usize].clone();
                if a.is_reference() || b.is_reference() {
                    // a null constant compared against a reference is one too
                    if a.is_placeholder() {
                        let res = self.constrain(&a, &DexType::object(OBJECT));
                        self.record(res, pc);
                    }
                    if b.is_placeholder() {
                        let res = self.constrain(&b, &DexType::object(OBJECT));
                        self.record(res, pc);
                    }
                } else {
                    self.check(&state, regs[0], &DexType::Int, pc);
                    self.check(&state, regs[1], &DexType::Int, pc);
                }
            }
            IF_LT | IF_GE | IF_GT | IF_LE => {
                self.check(&state, regs[0], &DexType::Int, pc);
                self.check(&state, regs[1], &DexType::Int, pc);
            }
            IF_EQZ | IF_NEZ => {
                let t = &state.types[regs[0] as usize];
                if !t.is_reference() && !t.is_placeholder() {
                    self.check(&state, regs[0], &DexType::Int, pc);
                }
            }
            IF_LTZ | IF_GEZ | IF_GTZ | IF_LEZ => {
                self.check(&state, regs[0], &DexType::Int, pc);
            }
            INVOKE_VIRTUAL..=INVOKE_INTERFACE | INVOKE_VIRTUAL_RANGE..=INVOKE_INTERFACE_RANGE => {
                let idx = body.insn(id).operand.pool_index().unwrap_or(u32::MAX);
                match self.pool.method(idx).cloned() {
                    Some(m) => {
                        let receiver = op != INVOKE_STATIC && op != INVOKE_STATIC_RANGE;
                        for (i, &r) in regs.iter().enumerate() {
                            let p = m.calling_param(i, receiver).clone();
                            self.check(&state, r, &p, pc);
                        }
                        state.result = m.return_type.clone();
                    }
                    None => self.record(
                        Err(err!(Structural, "unresolvable method index {}", idx)),
                        pc,
                    ),
                }
            }
            FILLED_NEW_ARRAY | FILLED_NEW_ARRAY_RANGE => {
                if let Some(arr) = self.type_operand(body, id) {
                    if let Some(e) = arr.element_type().cloned() {
                        for &r in &regs {
                            self.check(&state, r, &e, pc);
                        }
                    }
                    state.result = arr;
                }
            }
            PACKED_SWITCH | SPARSE_SWITCH => {
                self.check(&state, regs[0], &DexType::Int, pc);
            }
            RETURN | RETURN_WIDE | RETURN_OBJECT => {
                let ret = self.return_type.clone();
                self.check(&state, regs[0], &ret, pc);
            }
            THROW => {
                self.check(&state, regs[0], &DexType::object(THROWABLE), pc);
            }
            MONITOR_ENTER | MONITOR_EXIT => {
                self.check(&state, regs[0], &DexType::object(OBJECT), pc);
            }
            _ => {}
        }

        if let Some(ty) = out {
            state.types[regs[0] as usize] = ty.clone();
            body.insn_mut(id).reg_types[0] = Some(ty);
        }
        state
    }
}
