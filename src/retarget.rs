//! Retargets a typed method body into a stack-machine instruction stream.
//! Register reads become typed loads, writes become stores, and the
//! calling convention moves from arguments-at-the-end registers to
//! arguments-at-the-start local slots.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dex::body::{BlockId, MethodBody};
use crate::dex::error::DexError;
use crate::dex::instructions::Instruction;
use crate::dex::opcodes::*;
use crate::types::{ConstantPool, DexType};

/// Branch target, identified by the target block's entry pc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{:04x}", self.0)
    }
}

/// Representation class of a stack slot or local variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JvmKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl JvmKind {
    pub fn of(ty: &DexType) -> JvmKind {
        match ty {
            DexType::Long | DexType::Word64(_) => JvmKind::Long,
            DexType::Float => JvmKind::Float,
            DexType::Double => JvmKind::Double,
            DexType::Object(_) | DexType::Array(_) => JvmKind::Reference,
            _ => JvmKind::Int,
        }
    }

    pub fn words(&self) -> u16 {
        match self {
            JvmKind::Long | JvmKind::Double => 2,
            _ => 1,
        }
    }

    fn prefix(&self) -> char {
        match self {
            JvmKind::Int => 'i',
            JvmKind::Long => 'l',
            JvmKind::Float => 'f',
            JvmKind::Double => 'd',
            JvmKind::Reference => 'a',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumKind {
    Int,
    Long,
    Float,
    Double,
}

impl NumKind {
    fn words(&self) -> u16 {
        match self {
            NumKind::Long | NumKind::Double => 2,
            _ => 1,
        }
    }

    fn prefix(&self) -> char {
        match self {
            NumKind::Int => 'i',
            NumKind::Long => 'l',
            NumKind::Float => 'f',
            NumKind::Double => 'd',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
}

impl BinOp {
    fn mnemonic(&self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Rem => "rem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
            BinOp::Ushr => "ushr",
        }
    }
}

/// Long/float/double comparisons that push an int.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpKind {
    LongCmp,
    FloatL,
    FloatG,
    DoubleL,
    DoubleG,
}

/// Conditional branch tests. The two-register int and reference forms pop
/// two values, the zero/null forms pop one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Test {
    IntEq,
    IntNe,
    IntLt,
    IntGe,
    IntGt,
    IntLe,
    RefEq,
    RefNe,
    EqZ,
    NeZ,
    LtZ,
    GeZ,
    GtZ,
    LeZ,
    IsNull,
    NotNull,
}

impl Test {
    fn pops(&self) -> i32 {
        match self {
            Test::IntEq | Test::IntNe | Test::IntLt | Test::IntGe | Test::IntGt | Test::IntLe
            | Test::RefEq | Test::RefNe => 2,
            _ => 1,
        }
    }
}

/// Element kind for array loads and stores. Boolean arrays share the byte
/// form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
    Byte,
    Char,
    Short,
}

impl ArrayKind {
    fn of(ty: &DexType) -> ArrayKind {
        match ty {
            DexType::Boolean | DexType::Byte => ArrayKind::Byte,
            DexType::Char => ArrayKind::Char,
            DexType::Short => ArrayKind::Short,
            DexType::Long | DexType::Word64(_) => ArrayKind::Long,
            DexType::Float => ArrayKind::Float,
            DexType::Double => ArrayKind::Double,
            DexType::Object(_) | DexType::Array(_) => ArrayKind::Reference,
            _ => ArrayKind::Int,
        }
    }

    fn words(&self) -> u16 {
        match self {
            ArrayKind::Long | ArrayKind::Double => 2,
            _ => 1,
        }
    }

    fn prefix(&self) -> char {
        match self {
            ArrayKind::Int => 'i',
            ArrayKind::Long => 'l',
            ArrayKind::Float => 'f',
            ArrayKind::Double => 'd',
            ArrayKind::Reference => 'a',
            ArrayKind::Byte => 'b',
            ArrayKind::Char => 'c',
            ArrayKind::Short => 's',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

/// One stack-machine instruction. Field and method references carry
/// resolved owner/name/descriptor strings, types carry internal names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StackOp {
    Mark(Label),
    Nop,
    Load { kind: JvmKind, slot: u16 },
    Store { kind: JvmKind, slot: u16 },
    PushInt(i32),
    PushLong(i64),
    PushFloat(f32),
    PushDouble(f64),
    PushString(String),
    PushClass(String),
    PushNull,
    Pop,
    Pop2,
    Dup,
    Neg(NumKind),
    Convert(NumKind, NumKind),
    TruncToByte,
    TruncToChar,
    TruncToShort,
    Binary(BinOp, NumKind),
    Cmp(CmpKind),
    Goto(Label),
    If(Test, Label),
    TableSwitch { low: i32, high: i32, default: Label, targets: Vec<Label> },
    LookupSwitch { pairs: Vec<(i32, Label)>, default: Label },
    Return(Option<JvmKind>),
    Throw,
    MonitorEnter,
    MonitorExit,
    CheckCast(String),
    InstanceOf(String),
    ArrayLength,
    New(String),
    NewArray(DexType),
    ArrayLoad(ArrayKind),
    ArrayStore(ArrayKind),
    GetField { owner: String, name: String, descriptor: String },
    PutField { owner: String, name: String, descriptor: String },
    GetStatic { owner: String, name: String, descriptor: String },
    PutStatic { owner: String, name: String, descriptor: String },
    Invoke { kind: InvokeKind, owner: String, name: String, descriptor: String },
}

fn descriptor_words(descriptor: &str) -> i32 {
    match descriptor.as_bytes().first() {
        Some(b'J') | Some(b'D') => 2,
        _ => 1,
    }
}

impl StackOp {
    /* Net stack effect in words. Invoke is handled at the emission site,
     * where the callee's parameter list is at hand. */
    fn effect(&self) -> i32 {
        use StackOp::*;
        match self {
            Mark(_) | Nop | Goto(_) | CheckCast(_) | InstanceOf(_) | ArrayLength | NewArray(_)
            | TruncToByte | TruncToChar | TruncToShort | Neg(_) => 0,
            Load { kind, .. } => kind.words() as i32,
            Store { kind, .. } => -(kind.words() as i32),
            PushInt(_) | PushFloat(_) | PushString(_) | PushClass(_) | PushNull | Dup | New(_) => 1,
            PushLong(_) | PushDouble(_) => 2,
            Pop => -1,
            Pop2 => -2,
            Convert(from, to) => to.words() as i32 - from.words() as i32,
            Binary(_, kind) => -(kind.words() as i32),
            Cmp(CmpKind::FloatL) | Cmp(CmpKind::FloatG) => -1,
            Cmp(_) => -3,
            If(test, _) => -test.pops(),
            TableSwitch { .. } | LookupSwitch { .. } => -1,
            Return(Some(kind)) => -(kind.words() as i32),
            Return(None) => 0,
            Throw | MonitorEnter | MonitorExit => -1,
            ArrayLoad(kind) => kind.words() as i32 - 2,
            ArrayStore(kind) => -(kind.words() as i32) - 2,
            GetField { descriptor, .. } => descriptor_words(descriptor) - 1,
            PutField { descriptor, .. } => -descriptor_words(descriptor) - 1,
            GetStatic { descriptor, .. } => descriptor_words(descriptor),
            PutStatic { descriptor, .. } => -descriptor_words(descriptor),
            Invoke { .. } => 0,
        }
    }
}

impl fmt::Display for StackOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use StackOp::*;
        match self {
            Mark(l) => write!(f, "{}:", l),
            Nop => write!(f, "nop"),
            Load { kind, slot } => write!(f, "{}load {}", kind.prefix(), slot),
            Store { kind, slot } => write!(f, "{}store {}", kind.prefix(), slot),
            PushInt(v) => write!(f, "ipush {}", v),
            PushLong(v) => write!(f, "lpush {}", v),
            PushFloat(v) => write!(f, "fpush {}", v),
            PushDouble(v) => write!(f, "dpush {}", v),
            PushString(s) => write!(f, "spush {:?}", s),
            PushClass(c) => write!(f, "cpush {}", c),
            PushNull => write!(f, "apush null"),
            Pop => write!(f, "pop"),
            Pop2 => write!(f, "pop2"),
            Dup => write!(f, "dup"),
            Neg(k) => write!(f, "{}neg", k.prefix()),
            Convert(from, to) => write!(f, "{}2{}", from.prefix(), to.prefix()),
            TruncToByte => write!(f, "i2b"),
            TruncToChar => write!(f, "i2c"),
            TruncToShort => write!(f, "i2s"),
            Binary(op, k) => write!(f, "{}{}", k.prefix(), op.mnemonic()),
            Cmp(CmpKind::LongCmp) => write!(f, "lcmp"),
            Cmp(CmpKind::FloatL) => write!(f, "fcmpl"),
            Cmp(CmpKind::FloatG) => write!(f, "fcmpg"),
            Cmp(CmpKind::DoubleL) => write!(f, "dcmpl"),
            Cmp(CmpKind::DoubleG) => write!(f, "dcmpg"),
            Goto(l) => write!(f, "goto {}", l),
            If(test, l) => write!(f, "if{:?} {}", test, l),
            TableSwitch { low, high, default, .. } => {
                write!(f, "tableswitch {}..{} default {}", low, high, default)
            }
            LookupSwitch { pairs, default } => {
                write!(f, "lookupswitch [{}] default {}", pairs.len(), default)
            }
            Return(Some(k)) => write!(f, "{}return", k.prefix()),
            Return(None) => write!(f, "return"),
            Throw => write!(f, "athrow"),
            MonitorEnter => write!(f, "monitorenter"),
            MonitorExit => write!(f, "monitorexit"),
            CheckCast(c) => write!(f, "checkcast {}", c),
            InstanceOf(c) => write!(f, "instanceof {}", c),
            ArrayLength => write!(f, "arraylength"),
            New(c) => write!(f, "new {}", c),
            NewArray(e) => write!(f, "newarray {}", e),
            ArrayLoad(k) => write!(f, "{}aload", k.prefix()),
            ArrayStore(k) => write!(f, "{}astore", k.prefix()),
            GetField { owner, name, .. } => write!(f, "getfield {}.{}", owner, name),
            PutField { owner, name, .. } => write!(f, "putfield {}.{}", owner, name),
            GetStatic { owner, name, .. } => write!(f, "getstatic {}.{}", owner, name),
            PutStatic { owner, name, .. } => write!(f, "putstatic {}.{}", owner, name),
            Invoke { owner, name, descriptor, .. } => {
                write!(f, "invoke {}.{}{}", owner, name, descriptor)
            }
        }
    }
}

/// One normalized try region in output form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionEntry {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    pub catch_type: Option<String>,
}

/// Retargeted method: the op stream, the exception table, and the frame
/// bounds for the target machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackMethod {
    pub ops: Vec<StackOp>,
    pub exception_table: Vec<ExceptionEntry>,
    pub max_stack: u16,
    pub max_locals: u16,
}

/// Retargets a body whose types have been assigned. Consumes the graph
/// read-only.
pub fn retarget(body: &MethodBody, pool: &dyn ConstantPool) -> Result<StackMethod, DexError> {
    let mut r = Retargeter::new(body, pool);
    r.run(body).map_err(|e| e.context(format!("{}", body.method)))
}

struct Retargeter<'a> {
    pool: &'a dyn ConstantPool,
    arg_words: u16,
    local_words: u16,
    ops: Vec<StackOp>,
    depth: i32,
    /// Values on the stack at the current block's entry (a caught exception
    /// or an invoke result bound across the block boundary).
    entry_slots: i32,
    max_stack: i32,
}

impl<'a> Retargeter<'a> {
    fn new(body: &MethodBody, pool: &'a dyn ConstantPool) -> Retargeter<'a> {
        Retargeter {
            pool,
            arg_words: body.in_words,
            local_words: body.num_registers - body.in_words,
            ops: Vec::new(),
            depth: 0,
            entry_slots: 0,
            max_stack: 0,
        }
    }

    fn run(&mut self, body: &MethodBody) -> Result<StackMethod, DexError> {
        let mut table = Vec::with_capacity(body.tries.len());
        for t in &body.tries {
            table.push(ExceptionEntry {
                start: Label(t.start_pc),
                end: Label(t.end_pc),
                handler: Label(t.handler_pc),
                catch_type: match &t.catch_type {
                    Some(ty) => Some(ty.internal_name().ok_or_else(|| {
                        err!(Structural, "catch type {} is not a reference type", ty)
                    })?),
                    None => None,
                },
            });
        }

        for &bid in body.order() {
            let bb = body.block(bid);
            self.depth = 0;
            self.entry_slots = 0;
            self.emit(StackOp::Mark(Label(bb.pc())));
            for (i, ins) in bb.insns.iter().enumerate() {
                if !ins.is_instruction() {
                    continue;
                }
                self.translate(body, bid, i, ins)
                    .map_err(|e| e.context(format!("instruction at {:04x}", ins.pc)))?;
            }
        }
        debug!(
            "retargeted {}: {} ops, stack {} locals {}",
            body.method,
            self.ops.len(),
            self.max_stack,
            body.num_registers
        );
        Ok(StackMethod {
            ops: std::mem::take(&mut self.ops),
            exception_table: table,
            max_stack: self.max_stack as u16,
            max_locals: body.num_registers,
        })
    }

    /* Argument registers sit at the end of the dalvik frame but at the
     * start of the target frame; swap the two halves. Wide pairs stay
     * adjacent because both halves shift by the same amount. */
    fn map_reg(&self, reg: u16) -> u16 {
        if reg < self.local_words {
            reg + self.arg_words
        } else {
            reg - self.local_words
        }
    }

    fn emit(&mut self, op: StackOp) {
        self.adjust(op.effect());
        self.ops.push(op);
    }

    fn emit_invoke(&mut self, op: StackOp, arg_words: i32, ret_words: i32) {
        self.adjust(ret_words - arg_words);
        self.ops.push(op);
    }

    fn adjust(&mut self, delta: i32) {
        self.depth += delta;
        if self.depth < 0 {
            // Value produced before this block's label (invoke result or
            // caught exception); account for it at the block's entry.
            self.entry_slots += -self.depth;
            self.depth = 0;
        }
        if self.depth + self.entry_slots > self.max_stack {
            self.max_stack = self.depth + self.entry_slots;
        }
    }

    fn reg_type<'i>(&self, ins: &'i Instruction, idx: usize) -> Result<&'i DexType, DexError> {
        match ins.reg_types.get(idx).and_then(|t| t.as_ref()) {
            Some(t) => Ok(t),
            None => fail!(Structural, "operand {} has no inferred type", idx),
        }
    }

    fn load(&mut self, ins: &Instruction, idx: usize) -> Result<(), DexError> {
        let kind = JvmKind::of(self.reg_type(ins, idx)?);
        let slot = self.map_reg(ins.registers[idx]);
        self.emit(StackOp::Load { kind, slot });
        Ok(())
    }

    fn store(&mut self, ins: &Instruction, idx: usize) -> Result<(), DexError> {
        let kind = JvmKind::of(self.reg_type(ins, idx)?);
        let slot = self.map_reg(ins.registers[idx]);
        self.emit(StackOp::Store { kind, slot });
        Ok(())
    }

    fn load_all(&mut self, ins: &Instruction) -> Result<(), DexError> {
        for i in 0..ins.registers.len() {
            self.load(ins, i)?;
        }
        Ok(())
    }

    fn label_of(&self, body: &MethodBody, target: i64, pc: u32) -> Result<Label, DexError> {
        match body.block_at(target as u32) {
            Some(b) => Ok(Label(body.block(b).pc())),
            None => fail!(
                Structural,
                "branch target {:04x} of instruction at {:04x} has no block",
                target,
                pc
            ),
        }
    }

    fn fallthrough_label(&self, body: &MethodBody, bid: BlockId) -> Result<Label, DexError> {
        match body.block(bid).fallthrough() {
            Some(b) => Ok(Label(body.block(b).pc())),
            None => fail!(Structural, "switch block {} has no fallthrough", body.block(bid).name()),
        }
    }

    fn string_operand(&self, ins: &Instruction) -> Result<String, DexError> {
        let idx = ins.operand.pool_index().unwrap_or(u32::MAX);
        match self.pool.string(idx) {
            Some(s) => Ok(s.to_string()),
            None => fail!(Structural, "unresolvable string index {}", idx),
        }
    }

    fn type_operand(&self, ins: &Instruction) -> Result<DexType, DexError> {
        let idx = ins.operand.pool_index().unwrap_or(u32::MAX);
        match self.pool.type_descriptor(idx).and_then(DexType::from_descriptor) {
            Some(t) => Ok(t),
            None => fail!(Structural, "unresolvable type index {}", idx),
        }
    }

    fn internal_type_operand(&self, ins: &Instruction) -> Result<String, DexError> {
        let ty = self.type_operand(ins)?;
        match ty.internal_name() {
            Some(n) => Ok(n),
            None => fail!(Structural, "type operand {} is not a reference type", ty),
        }
    }

    fn field_operand(&self, ins: &Instruction) -> Result<(String, String, String), DexError> {
        let idx = ins.operand.pool_index().unwrap_or(u32::MAX);
        match self.pool.field(idx) {
            Some(f) => {
                let owner = f.owner.internal_name().ok_or_else(|| {
                    err!(Structural, "field owner {} is not a class", f.owner)
                })?;
                Ok((owner, f.name.clone(), f.field_type.descriptor()))
            }
            None => fail!(Structural, "unresolvable field index {}", idx),
        }
    }

    fn push_int(&mut self, value: i32) {
        self.emit(StackOp::PushInt(value));
    }

    /* Push the decoded constant with the type inference settled on for the
     * destination register. An untyped zero assigned a reference type is a
     * null. */
    fn push_const(&mut self, ins: &Instruction) -> Result<(), DexError> {
        let value = ins.operand.lit();
        match self.reg_type(ins, 0)? {
            DexType::Long => self.emit(StackOp::PushLong(value)),
            DexType::Float => self.emit(StackOp::PushFloat(f32::from_bits(value as u32))),
            DexType::Double => self.emit(StackOp::PushDouble(f64::from_bits(value as u64))),
            DexType::Object(_) | DexType::Array(_) => {
                if value != 0 {
                    fail!(TypeConflict, "non-zero constant {:#x} typed as a reference", value);
                }
                self.emit(StackOp::PushNull);
            }
            _ => self.push_int(value as i32),
        }
        Ok(())
    }

    fn push_fill_element(&mut self, element: &DexType, bits: i64) {
        match element {
            DexType::Long => self.emit(StackOp::PushLong(bits)),
            DexType::Float => self.emit(StackOp::PushFloat(f32::from_bits(bits as u32))),
            DexType::Double => self.emit(StackOp::PushDouble(f64::from_bits(bits as u64))),
            _ => self.push_int(bits as i32),
        }
    }

    /* The invoke result is left on the stack for an immediately following
     * move-result; when nothing binds it, pop it to keep the stack
     * balanced across the instruction. */
    fn result_consumed(&self, body: &MethodBody, bid: BlockId, index: usize) -> bool {
        let bb = body.block(bid);
        let next = bb.insns[index + 1..]
            .iter()
            .find(|i| i.is_instruction())
            .or_else(|| {
                bb.fallthrough()
                    .and_then(|f| body.block(f).insns.iter().find(|i| i.is_instruction()))
            });
        matches!(next, Some(n) if n.is_move_result())
    }

    fn discard_result(&mut self, ret: &DexType) {
        match ret.words() {
            2 => self.emit(StackOp::Pop2),
            _ => {
                if *ret != DexType::Void {
                    self.emit(StackOp::Pop);
                }
            }
        }
    }

    fn arith3(&mut self, ins: &Instruction, op: BinOp, kind: NumKind) -> Result<(), DexError> {
        self.load(ins, 1)?;
        self.load(ins, 2)?;
        self.emit(StackOp::Binary(op, kind));
        self.store(ins, 0)
    }

    fn arith2(&mut self, ins: &Instruction, op: BinOp, kind: NumKind) -> Result<(), DexError> {
        self.load(ins, 0)?;
        self.load(ins, 1)?;
        self.emit(StackOp::Binary(op, kind));
        self.store(ins, 0)
    }

    /* Literal forms. The literal goes first so that rsub comes out as
     * literal minus register; shifts need the value first instead. */
    fn arith_lit(&mut self, ins: &Instruction, op: BinOp) -> Result<(), DexError> {
        let lit = ins.operand.lit() as i32;
        if matches!(op, BinOp::Shl | BinOp::Shr | BinOp::Ushr) {
            self.load(ins, 1)?;
            self.push_int(lit);
        } else {
            self.push_int(lit);
            self.load(ins, 1)?;
        }
        self.emit(StackOp::Binary(op, NumKind::Int));
        self.store(ins, 0)
    }

    fn unary(&mut self, ins: &Instruction, op: StackOp) -> Result<(), DexError> {
        self.load(ins, 1)?;
        self.emit(op);
        self.store(ins, 0)
    }

    fn cmp(&mut self, ins: &Instruction, kind: CmpKind) -> Result<(), DexError> {
        self.load(ins, 1)?;
        self.load(ins, 2)?;
        self.emit(StackOp::Cmp(kind));
        self.store(ins, 0)
    }

    fn cond1(&mut self, body: &MethodBody, ins: &Instruction, test: Test) -> Result<(), DexError> {
        self.load(ins, 0)?;
        let l = self.label_of(body, ins.target(), ins.pc)?;
        self.emit(StackOp::If(test, l));
        Ok(())
    }

    fn cond2(&mut self, body: &MethodBody, ins: &Instruction, test: Test) -> Result<(), DexError> {
        self.load(ins, 0)?;
        self.load(ins, 1)?;
        let l = self.label_of(body, ins.target(), ins.pc)?;
        self.emit(StackOp::If(test, l));
        Ok(())
    }

    fn invoke(
        &mut self,
        body: &MethodBody,
        bid: BlockId,
        index: usize,
        ins: &Instruction,
        kind: InvokeKind,
    ) -> Result<(), DexError> {
        self.load_all(ins)?;
        let idx = ins.operand.pool_index().unwrap_or(u32::MAX);
        let m = match self.pool.method(idx) {
            Some(m) => m.clone(),
            None => fail!(Structural, "unresolvable method index {}", idx),
        };
        let owner = m.owner.internal_name().ok_or_else(|| {
            err!(Structural, "method owner {} is not a class", m.owner)
        })?;
        let receiver = kind != InvokeKind::Static;
        let mut arg_words = receiver as i32;
        for p in &m.params {
            arg_words += p.words() as i32;
        }
        self.emit_invoke(
            StackOp::Invoke { kind, owner, name: m.name.clone(), descriptor: m.descriptor() },
            arg_words,
            m.return_type.words() as i32 * (m.return_type != DexType::Void) as i32,
        );
        if m.return_type != DexType::Void && !self.result_consumed(body, bid, index) {
            self.discard_result(&m.return_type);
        }
        Ok(())
    }

    fn translate(
        &mut self,
        body: &MethodBody,
        bid: BlockId,
        index: usize,
        ins: &Instruction,
    ) -> Result<(), DexError> {
        match ins.opcode {
            NOP => self.emit(StackOp::Nop),
            MOVE | MOVE_FROM16 | MOVE16 | MOVE_WIDE | MOVE_WIDE_FROM16 | MOVE_WIDE16
            | MOVE_OBJECT | MOVE_OBJECT_FROM16 | MOVE_OBJECT16 => {
                self.load(ins, 1)?;
                self.store(ins, 0)?;
            }
            MOVE_RESULT | MOVE_RESULT_WIDE | MOVE_RESULT_OBJECT | MOVE_EXCEPTION => {
                // The value is already on the stack, left by the previous
                // instruction or by the exception dispatch.
                self.store(ins, 0)?;
            }
            RETURN_VOID => self.emit(StackOp::Return(None)),
            RETURN | RETURN_WIDE | RETURN_OBJECT => {
                self.load(ins, 0)?;
                let kind = JvmKind::of(self.reg_type(ins, 0)?);
                self.emit(StackOp::Return(Some(kind)));
            }
            CONST4 | CONST16 | CONST | CONST_HIGH16 | CONST_WIDE16 | CONST_WIDE32 | CONST_WIDE
            | CONST_WIDE_HIGH16 => {
                self.push_const(ins)?;
                self.store(ins, 0)?;
            }
            CONST_STRING | CONST_STRING_JUMBO => {
                let s = self.string_operand(ins)?;
                self.emit(StackOp::PushString(s));
                self.store(ins, 0)?;
            }
            CONST_CLASS => {
                let c = self.internal_type_operand(ins)?;
                self.emit(StackOp::PushClass(c));
                self.store(ins, 0)?;
            }
            MONITOR_ENTER => {
                self.load(ins, 0)?;
                self.emit(StackOp::MonitorEnter);
            }
            MONITOR_EXIT => {
                self.load(ins, 0)?;
                self.emit(StackOp::MonitorExit);
            }
            CHECK_CAST => {
                self.load(ins, 0)?;
                let c = self.internal_type_operand(ins)?;
                self.emit(StackOp::CheckCast(c));
                self.store(ins, 0)?;
            }
            INSTANCE_OF => {
                self.load(ins, 1)?;
                let c = self.internal_type_operand(ins)?;
                self.emit(StackOp::InstanceOf(c));
                self.store(ins, 0)?;
            }
            ARRAY_LENGTH => {
                self.load(ins, 1)?;
                self.emit(StackOp::ArrayLength);
                self.store(ins, 0)?;
            }
            NEW_INSTANCE => {
                let c = self.internal_type_operand(ins)?;
                self.emit(StackOp::New(c));
                self.store(ins, 0)?;
            }
            NEW_ARRAY => {
                self.load(ins, 1)?;
                let arr = self.type_operand(ins)?;
                let element = arr.element_type().cloned().ok_or_else(|| {
                    err!(Structural, "new-array type {} is not an array", arr)
                })?;
                self.emit(StackOp::NewArray(element));
                self.store(ins, 0)?;
            }
            FILLED_NEW_ARRAY | FILLED_NEW_ARRAY_RANGE => {
                let arr = self.type_operand(ins)?;
                let element = arr.element_type().cloned().ok_or_else(|| {
                    err!(Structural, "filled-new-array type {} is not an array", arr)
                })?;
                self.push_int(ins.registers.len() as i32);
                self.emit(StackOp::NewArray(element.clone()));
                let kind = ArrayKind::of(&element);
                for i in 0..ins.registers.len() {
                    self.emit(StackOp::Dup);
                    self.push_int(i as i32);
                    self.load(ins, i)?;
                    self.emit(StackOp::ArrayStore(kind));
                }
                if !self.result_consumed(body, bid, index) {
                    self.emit(StackOp::Pop);
                }
            }
            FILL_ARRAY_DATA => {
                let element = match self.reg_type(ins, 0)? {
                    DexType::Array(e) => (**e).clone(),
                    other => fail!(Structural, "fill-array-data on non-array type {}", other),
                };
                let kind = ArrayKind::of(&element);
                for i in 0..ins.num_fill_elements() {
                    self.load(ins, 0)?;
                    self.push_int(i as i32);
                    let bits = ins.fill_element_bits(i);
                    self.push_fill_element(&element, bits);
                    self.emit(StackOp::ArrayStore(kind));
                }
            }
            THROW => {
                self.load(ins, 0)?;
                self.emit(StackOp::Throw);
            }
            GOTO | GOTO16 | GOTO32 => {
                let l = self.label_of(body, ins.target(), ins.pc)?;
                self.emit(StackOp::Goto(l));
            }
            PACKED_SWITCH => {
                self.load(ins, 0)?;
                let default = self.fallthrough_label(body, bid)?;
                let mut targets = Vec::new();
                for t in ins.switch_targets() {
                    targets.push(self.label_of(body, t, ins.pc)?);
                }
                self.emit(StackOp::TableSwitch {
                    low: ins.min_switch_key(),
                    high: ins.max_switch_key(),
                    default,
                    targets,
                });
            }
            SPARSE_SWITCH => {
                self.load(ins, 0)?;
                let default = self.fallthrough_label(body, bid)?;
                let keys = ins.switch_keys();
                let mut pairs = Vec::with_capacity(keys.len());
                for (key, t) in keys.into_iter().zip(ins.switch_targets()) {
                    pairs.push((key, self.label_of(body, t, ins.pc)?));
                }
                self.emit(StackOp::LookupSwitch { pairs, default });
            }
            CMPL_FLOAT => self.cmp(ins, CmpKind::FloatL)?,
            CMPG_FLOAT => self.cmp(ins, CmpKind::FloatG)?,
            CMPL_DOUBLE => self.cmp(ins, CmpKind::DoubleL)?,
            CMPG_DOUBLE => self.cmp(ins, CmpKind::DoubleG)?,
            CMP_LONG => self.cmp(ins, CmpKind::LongCmp)?,
            IF_EQ => {
                let refs = self.reg_type(ins, 0)?.is_reference()
                    || self.reg_type(ins, 1)?.is_reference();
                let test = if refs { Test::RefEq } else { Test::IntEq };
                self.cond2(body, ins, test)?;
            }
            IF_NE => {
                let refs = self.reg_type(ins, 0)?.is_reference()
                    || self.reg_type(ins, 1)?.is_reference();
                let test = if refs { Test::RefNe } else { Test::IntNe };
                self.cond2(body, ins, test)?;
            }
            IF_LT => self.cond2(body, ins, Test::IntLt)?,
            IF_GE => self.cond2(body, ins, Test::IntGe)?,
            IF_GT => self.cond2(body, ins, Test::IntGt)?,
            IF_LE => self.cond2(body, ins, Test::IntLe)?,
            IF_EQZ => {
                let test = if self.reg_type(ins, 0)?.is_reference() { Test::IsNull } else { Test::EqZ };
                self.cond1(body, ins, test)?;
            }
            IF_NEZ => {
                let test = if self.reg_type(ins, 0)?.is_reference() { Test::NotNull } else { Test::NeZ };
                self.cond1(body, ins, test)?;
            }
            IF_LTZ => self.cond1(body, ins, Test::LtZ)?,
            IF_GEZ => self.cond1(body, ins, Test::GeZ)?,
            IF_GTZ => self.cond1(body, ins, Test::GtZ)?,
            IF_LEZ => self.cond1(body, ins, Test::LeZ)?,
            AGET..=AGET_SHORT => {
                self.load(ins, 1)?;
                self.load(ins, 2)?;
                let kind = ArrayKind::of(self.reg_type(ins, 0)?);
                self.emit(StackOp::ArrayLoad(kind));
                self.store(ins, 0)?;
            }
            APUT..=APUT_SHORT => {
                self.load(ins, 1)?;
                self.load(ins, 2)?;
                self.load(ins, 0)?;
                let kind = ArrayKind::of(self.reg_type(ins, 0)?);
                self.emit(StackOp::ArrayStore(kind));
            }
            IGET..=IGET_SHORT => {
                self.load(ins, 1)?;
                let (owner, name, descriptor) = self.field_operand(ins)?;
                self.emit(StackOp::GetField { owner, name, descriptor });
                self.store(ins, 0)?;
            }
            IPUT..=IPUT_SHORT => {
                self.load(ins, 1)?;
                self.load(ins, 0)?;
                let (owner, name, descriptor) = self.field_operand(ins)?;
                self.emit(StackOp::PutField { owner, name, descriptor });
            }
            SGET..=SGET_SHORT => {
                let (owner, name, descriptor) = self.field_operand(ins)?;
                self.emit(StackOp::GetStatic { owner, name, descriptor });
                self.store(ins, 0)?;
            }
            SPUT..=SPUT_SHORT => {
                self.load(ins, 0)?;
                let (owner, name, descriptor) = self.field_operand(ins)?;
                self.emit(StackOp::PutStatic { owner, name, descriptor });
            }
            INVOKE_VIRTUAL | INVOKE_VIRTUAL_RANGE => {
                self.invoke(body, bid, index, ins, InvokeKind::Virtual)?;
            }
            INVOKE_SUPER | INVOKE_SUPER_RANGE | INVOKE_DIRECT | INVOKE_DIRECT_RANGE => {
                self.invoke(body, bid, index, ins, InvokeKind::Special)?;
            }
            INVOKE_STATIC | INVOKE_STATIC_RANGE => {
                self.invoke(body, bid, index, ins, InvokeKind::Static)?;
            }
            INVOKE_INTERFACE | INVOKE_INTERFACE_RANGE => {
                self.invoke(body, bid, index, ins, InvokeKind::Interface)?;
            }
            // Logical not has no direct stack form; xor with all-ones.
            NOT_INT => {
                self.load(ins, 1)?;
                self.push_int(-1);
                self.emit(StackOp::Binary(BinOp::Xor, NumKind::Int));
                self.store(ins, 0)?;
            }
            NOT_LONG => {
                self.load(ins, 1)?;
                self.emit(StackOp::PushLong(-1));
                self.emit(StackOp::Binary(BinOp::Xor, NumKind::Long));
                self.store(ins, 0)?;
            }
            NEG_INT => self.unary(ins, StackOp::Neg(NumKind::Int))?,
            NEG_LONG => self.unary(ins, StackOp::Neg(NumKind::Long))?,
            NEG_FLOAT => self.unary(ins, StackOp::Neg(NumKind::Float))?,
            NEG_DOUBLE => self.unary(ins, StackOp::Neg(NumKind::Double))?,
            INT_TO_LONG => self.unary(ins, StackOp::Convert(NumKind::Int, NumKind::Long))?,
            INT_TO_FLOAT => self.unary(ins, StackOp::Convert(NumKind::Int, NumKind::Float))?,
            INT_TO_DOUBLE => self.unary(ins, StackOp::Convert(NumKind::Int, NumKind::Double))?,
            LONG_TO_INT => self.unary(ins, StackOp::Convert(NumKind::Long, NumKind::Int))?,
            LONG_TO_FLOAT => self.unary(ins, StackOp::Convert(NumKind::Long, NumKind::Float))?,
            LONG_TO_DOUBLE => self.unary(ins, StackOp::Convert(NumKind::Long, NumKind::Double))?,
            FLOAT_TO_INT => self.unary(ins, StackOp::Convert(NumKind::Float, NumKind::Int))?,
            FLOAT_TO_LONG => self.unary(ins, StackOp::Convert(NumKind::Float, NumKind::Long))?,
            FLOAT_TO_DOUBLE => self.unary(ins, StackOp::Convert(NumKind::Float, NumKind::Double))?,
            DOUBLE_TO_INT => self.unary(ins, StackOp::Convert(NumKind::Double, NumKind::Int))?,
            DOUBLE_TO_LONG => self.unary(ins, StackOp::Convert(NumKind::Double, NumKind::Long))?,
            DOUBLE_TO_FLOAT => self.unary(ins, StackOp::Convert(NumKind::Double, NumKind::Float))?,
            INT_TO_BYTE => self.unary(ins, StackOp::TruncToByte)?,
            INT_TO_CHAR => self.unary(ins, StackOp::TruncToChar)?,
            INT_TO_SHORT => self.unary(ins, StackOp::TruncToShort)?,
            op if (ADD_INT..=USHR_INT).contains(&op) => {
                self.arith3(ins, BIN_OPS[(op - ADD_INT) as usize], NumKind::Int)?;
            }
            op if (ADD_LONG..=USHR_LONG).contains(&op) => {
                self.arith3(ins, BIN_OPS[(op - ADD_LONG) as usize], NumKind::Long)?;
            }
            op if (ADD_FLOAT..=REM_FLOAT).contains(&op) => {
                self.arith3(ins, BIN_OPS[(op - ADD_FLOAT) as usize], NumKind::Float)?;
            }
            op if (ADD_DOUBLE..=REM_DOUBLE).contains(&op) => {
                self.arith3(ins, BIN_OPS[(op - ADD_DOUBLE) as usize], NumKind::Double)?;
            }
            op if (ADD_INT_2ADDR..=USHR_INT_2ADDR).contains(&op) => {
                self.arith2(ins, BIN_OPS[(op - ADD_INT_2ADDR) as usize], NumKind::Int)?;
            }
            op if (ADD_LONG_2ADDR..=USHR_LONG_2ADDR).contains(&op) => {
                self.arith2(ins, BIN_OPS[(op - ADD_LONG_2ADDR) as usize], NumKind::Long)?;
            }
            op if (ADD_FLOAT_2ADDR..=REM_FLOAT_2ADDR).contains(&op) => {
                self.arith2(ins, BIN_OPS[(op - ADD_FLOAT_2ADDR) as usize], NumKind::Float)?;
            }
            op if (ADD_DOUBLE_2ADDR..=REM_DOUBLE_2ADDR).contains(&op) => {
                self.arith2(ins, BIN_OPS[(op - ADD_DOUBLE_2ADDR) as usize], NumKind::Double)?;
            }
            op if (ADD_INT_LIT16..=XOR_INT_LIT16).contains(&op) => {
                self.arith_lit(ins, BIN_OPS[(op - ADD_INT_LIT16) as usize])?;
            }
            op if (ADD_INT_LIT8..=USHR_INT_LIT8).contains(&op) => {
                self.arith_lit(ins, BIN_OPS[(op - ADD_INT_LIT8) as usize])?;
            }
            _ => fail!(
                Unsupported,
                "no retargeting rule for {}",
                ins.info().mnemonic
            ),
        }
        Ok(())
    }
}

/// Binary opcode order shared by every arithmetic family, including the
/// literal forms where rsub takes sub's slot (literal minus register).
const BIN_OPS: [BinOp; 11] = [
    BinOp::Add,
    BinOp::Sub,
    BinOp::Mul,
    BinOp::Div,
    BinOp::Rem,
    BinOp::And,
    BinOp::Or,
    BinOp::Xor,
    BinOp::Shl,
    BinOp::Shr,
    BinOp::Ushr,
];
