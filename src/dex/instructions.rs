//! Decoding of Dalvik instructions from raw code units.

use std::collections::BTreeSet;
use std::fmt;

use crate::dex::body::InsnId;
use crate::dex::error::DexError;
use crate::dex::opcodes::{self, opcode, Format, Opcode, OperandKind, PayloadKind};
use crate::types::{DexType, MethodRef};

/// The non-register operand of an instruction, decoded per its
/// [`OperandKind`]. Branch targets are absolute pcs, not offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Lit(i64),
    Target(i64),
    Str(u32),
    Type(u32),
    Field(u32),
    Method(u32),
}

impl Operand {
    pub fn lit(&self) -> i64 {
        match self {
            Operand::Lit(v) => *v,
            _ => 0,
        }
    }

    pub fn pool_index(&self) -> Option<u32> {
        match self {
            Operand::Str(i) | Operand::Type(i) | Operand::Field(i) | Operand::Method(i) => {
                Some(*i)
            }
            _ => None,
        }
    }
}

/* Where a register's value was defined: a calling parameter of the method,
 * or an instruction identified by its position in the block arena. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Def {
    Argument(u16),
    Insn(InsnId),
}

/// A single decoded instruction, together with the per-operand type and
/// reaching-definition annotations filled in by the analyses.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub pc: u32,
    /// Code units occupied; 0 for synthetic instructions.
    words: u32,
    pub opcode: u8,
    /// Set when this is an inline data table rather than an instruction.
    payload_kind: Option<PayloadKind>,
    pub registers: Vec<u16>,
    pub operand: Operand,
    /// Copy of the inline table a switch or fill-array-data points at.
    payload: Vec<u16>,
    pub reg_types: Vec<Option<DexType>>,
    pub reg_defs: Vec<BTreeSet<Def>>,
}

#[inline]
fn lo8(w: u16) -> u8 {
    (w & 0xff) as u8
}

#[inline]
fn a8(w: u16) -> u16 {
    w >> 8
}

#[inline]
fn a4(w: u16) -> u16 {
    (w >> 8) & 0x0f
}

#[inline]
fn b4(w: u16) -> u16 {
    w >> 12
}

#[inline]
fn s4(w: u16) -> i64 {
    ((w as i16) >> 12) as i64
}

#[inline]
fn s8(w: u16) -> i64 {
    ((w as i16) >> 8) as i64
}

#[inline]
fn s16(w: u16) -> i64 {
    w as i16 as i64
}

#[inline]
fn u32_at(code: &[u16], p: usize) -> u32 {
    code[p] as u32 | ((code[p + 1] as u32) << 16)
}

#[inline]
fn i32_at(code: &[u16], p: usize) -> i64 {
    u32_at(code, p) as i32 as i64
}

#[inline]
fn i64_at(code: &[u16], p: usize) -> i64 {
    (u32_at(code, p) as u64 | ((u32_at(code, p + 2) as u64) << 32)) as i64
}

impl Instruction {
    /// Decodes the instruction starting at code unit `pc`. For switches and
    /// fill-array-data the inline table it references is copied into the
    /// instruction; for the inline tables themselves a non-executable
    /// placeholder covering the whole table is produced.
    pub fn decode(code: &[u16], pc: u32) -> Result<Instruction, DexError> {
        let p = pc as usize;
        if p >= code.len() {
            fail!(Decode, "instruction pc {:04x} past end of code", pc);
        }
        let word0 = code[p];
        let op = lo8(word0);
        if op == opcodes::NOP && a8(word0) != 0 {
            return Self::decode_payload(code, pc);
        }
        if opcodes::is_undefined(op) {
            fail!(Decode, "undefined opcode {:#04x} at {:04x}", op, pc);
        }
        let info = opcode(op);
        let words = info.format.words();
        if p + words > code.len() {
            fail!(Decode, "truncated {} instruction at {:04x}", info.mnemonic, pc);
        }
        let w = &code[p..p + words];

        let mut registers = Vec::with_capacity(info.format.registers());
        let mut operand = Operand::None;
        let spc = pc as i64;
        match info.format {
            Format::F10x => {}
            Format::F10t => operand = Operand::Target(spc + s8(word0)),
            Format::F11n => {
                registers.push(a4(word0));
                operand = Operand::Lit(s4(word0));
            }
            Format::F11x => registers.push(a8(word0)),
            Format::F12x => {
                registers.push(a4(word0));
                registers.push(b4(word0));
            }
            Format::F20t => operand = Operand::Target(spc + s16(w[1])),
            Format::F21c => {
                registers.push(a8(word0));
                operand = Self::pool_operand(info, w[1] as u32);
            }
            Format::F21h => {
                registers.push(a8(word0));
                operand = Operand::Lit(((w[1] as i32) << 16) as i64);
            }
            Format::F21h64 => {
                registers.push(a8(word0));
                operand = Operand::Lit(((w[1] as u64) << 48) as i64);
            }
            Format::F21s => {
                registers.push(a8(word0));
                operand = Operand::Lit(s16(w[1]));
            }
            Format::F21t => {
                registers.push(a8(word0));
                operand = Operand::Target(spc + s16(w[1]));
            }
            Format::F22b => {
                registers.push(a8(word0));
                registers.push(w[1] & 0xff);
                operand = Operand::Lit(s8(w[1]));
            }
            Format::F22c => {
                registers.push(a4(word0));
                registers.push(b4(word0));
                operand = Self::pool_operand(info, w[1] as u32);
            }
            Format::F22s => {
                registers.push(a4(word0));
                registers.push(b4(word0));
                operand = Operand::Lit(s16(w[1]));
            }
            Format::F22t => {
                registers.push(a4(word0));
                registers.push(b4(word0));
                operand = Operand::Target(spc + s16(w[1]));
            }
            Format::F22x => {
                registers.push(a8(word0));
                registers.push(w[1]);
            }
            Format::F23x => {
                registers.push(a8(word0));
                registers.push(w[1] & 0xff);
                registers.push(w[1] >> 8);
            }
            Format::F30t => operand = Operand::Target(spc + i32_at(w, 1)),
            Format::F31c => {
                registers.push(a8(word0));
                operand = Self::pool_operand(info, u32_at(w, 1));
            }
            Format::F31i => {
                registers.push(a8(word0));
                operand = Operand::Lit(i32_at(w, 1));
            }
            Format::F31t => {
                registers.push(a8(word0));
                operand = Operand::Target(spc + i32_at(w, 1));
            }
            Format::F32x => {
                registers.push(w[1]);
                registers.push(w[2]);
            }
            Format::F35c => {
                let count = b4(word0);
                if count > 5 {
                    fail!(
                        Decode,
                        "{} at {:04x} claims {} registers",
                        info.mnemonic,
                        pc,
                        count
                    );
                }
                for i in 0..count {
                    registers.push(match i {
                        4 => a4(word0),
                        _ => (w[2] >> (i * 4)) & 0x0f,
                    });
                }
                operand = Self::pool_operand(info, w[1] as u32);
            }
            Format::F3rc => {
                let count = a8(word0);
                for i in 0..count {
                    registers.push(w[2].wrapping_add(i));
                }
                operand = Self::pool_operand(info, w[1] as u32);
            }
            Format::F51l => {
                registers.push(a8(word0));
                operand = Operand::Lit(i64_at(w, 1));
            }
        }

        let mut inst = Instruction {
            pc,
            words: words as u32,
            opcode: op,
            payload_kind: None,
            registers,
            operand,
            payload: Vec::new(),
            reg_types: Vec::new(),
            reg_defs: Vec::new(),
        };
        inst.reg_types = vec![None; inst.registers.len()];
        inst.reg_defs = vec![BTreeSet::new(); inst.registers.len()];

        // Copy the inline table the instruction points at
        if matches!(
            op,
            opcodes::PACKED_SWITCH | opcodes::SPARSE_SWITCH | opcodes::FILL_ARRAY_DATA
        ) {
            let target = inst.target();
            let table = Self::decode_payload(code, Self::check_pc(target, code.len(), pc)?)?;
            if table.payload_kind != Some(Self::expected_payload(op)) {
                fail!(
                    Decode,
                    "{} at {:04x} references a {} table",
                    info.mnemonic,
                    pc,
                    table.mnemonic()
                );
            }
            let t = target as usize;
            inst.payload = code[t..t + table.words as usize].to_vec();
        }
        Ok(inst)
    }

    /// Builds a synthetic instruction, used for the gotos inserted when
    /// blocks are relocated. Synthetic instructions occupy no code units.
    pub fn synthetic(opcode: u8, registers: Vec<u16>, operand: Operand, pc: u32) -> Instruction {
        let n = registers.len();
        Instruction {
            pc,
            words: 0,
            opcode,
            payload_kind: None,
            registers,
            operand,
            payload: Vec::new(),
            reg_types: vec![None; n],
            reg_defs: vec![BTreeSet::new(); n],
        }
    }

    fn pool_operand(info: &Opcode, idx: u32) -> Operand {
        match info.operand {
            OperandKind::Str => Operand::Str(idx),
            OperandKind::Type => Operand::Type(idx),
            OperandKind::Field => Operand::Field(idx),
            OperandKind::Method => Operand::Method(idx),
            _ => Operand::None,
        }
    }

    fn expected_payload(op: u8) -> PayloadKind {
        match op {
            opcodes::PACKED_SWITCH => PayloadKind::PackedSwitch,
            opcodes::SPARSE_SWITCH => PayloadKind::SparseSwitch,
            _ => PayloadKind::ArrayData,
        }
    }

    fn check_pc(target: i64, len: usize, from: u32) -> Result<u32, DexError> {
        if target < 0 || target as usize >= len {
            fail!(
                Structural,
                "target {:04x} of instruction at {:04x} outside method code",
                target,
                from
            );
        }
        Ok(target as u32)
    }

    /// Decodes an inline data table into a placeholder spanning its words.
    fn decode_payload(code: &[u16], pc: u32) -> Result<Instruction, DexError> {
        let p = pc as usize;
        let kind = match code[p] {
            opcodes::PACKED_SWITCH_PAYLOAD => PayloadKind::PackedSwitch,
            opcodes::SPARSE_SWITCH_PAYLOAD => PayloadKind::SparseSwitch,
            opcodes::FILL_ARRAY_DATA_PAYLOAD => PayloadKind::ArrayData,
            w => fail!(Decode, "invalid data table ident {:04x} at {:04x}", w, pc),
        };
        if p + 2 > code.len() {
            fail!(Decode, "truncated data table at {:04x}", pc);
        }
        let words = match kind {
            PayloadKind::PackedSwitch => code[p + 1] as usize * 2 + 4,
            PayloadKind::SparseSwitch => code[p + 1] as usize * 4 + 2,
            PayloadKind::ArrayData => {
                if p + 4 > code.len() {
                    fail!(Decode, "truncated data table at {:04x}", pc);
                }
                let width = code[p + 1] as usize;
                let count = u32_at(code, p + 2) as usize;
                (count * width + 1) / 2 + 4
            }
        };
        if p + words > code.len() {
            fail!(Decode, "data table at {:04x} overruns method code", pc);
        }
        Ok(Instruction {
            pc,
            words: words as u32,
            opcode: opcodes::NOP,
            payload_kind: Some(kind),
            registers: Vec::new(),
            operand: Operand::None,
            payload: Vec::new(),
            reg_types: Vec::new(),
            reg_defs: Vec::new(),
        })
    }

    pub fn info(&self) -> &'static Opcode {
        opcode(self.opcode)
    }

    pub fn mnemonic(&self) -> &'static str {
        match self.payload_kind {
            Some(PayloadKind::PackedSwitch) => "packed-switch-table",
            Some(PayloadKind::SparseSwitch) => "sparse-switch-table",
            Some(PayloadKind::ArrayData) => "fill-array-data-table",
            None => self.info().mnemonic,
        }
    }

    /// Code units occupied; synthetic instructions report 0.
    pub fn size(&self) -> u32 {
        self.words
    }

    /// False for the inline data table placeholders.
    pub fn is_instruction(&self) -> bool {
        self.payload_kind.is_none()
    }

    pub fn is_synthetic(&self) -> bool {
        self.words == 0
    }

    pub fn is_uncond_branch(&self) -> bool {
        matches!(self.opcode, opcodes::GOTO | opcodes::GOTO16 | opcodes::GOTO32)
    }

    pub fn is_cond_branch(&self) -> bool {
        (opcodes::IF_EQ..=opcodes::IF_LEZ).contains(&self.opcode)
    }

    pub fn is_switch(&self) -> bool {
        matches!(self.opcode, opcodes::PACKED_SWITCH | opcodes::SPARSE_SWITCH)
    }

    pub fn is_return(&self) -> bool {
        (opcodes::RETURN_VOID..=opcodes::RETURN_OBJECT).contains(&self.opcode)
    }

    pub fn is_throw(&self) -> bool {
        self.opcode == opcodes::THROW
    }

    pub fn is_move(&self) -> bool {
        (opcodes::MOVE..=opcodes::MOVE_OBJECT16).contains(&self.opcode)
    }

    pub fn is_move_result(&self) -> bool {
        (opcodes::MOVE_RESULT..=opcodes::MOVE_RESULT_OBJECT).contains(&self.opcode)
    }

    pub fn is_invoke(&self) -> bool {
        (opcodes::INVOKE_VIRTUAL..=opcodes::INVOKE_INTERFACE_RANGE).contains(&self.opcode)
            && self.opcode != 0x73
    }

    pub fn is_invoke_static(&self) -> bool {
        matches!(self.opcode, opcodes::INVOKE_STATIC | opcodes::INVOKE_STATIC_RANGE)
    }

    /// True when this instruction always ends its basic block.
    pub fn ends_block(&self) -> bool {
        self.is_uncond_branch()
            || self.is_cond_branch()
            || self.is_switch()
            || self.is_return()
            || self.is_throw()
    }

    pub fn may_throw(&self) -> bool {
        self.is_instruction() && self.info().may_throw()
    }

    pub fn reads_operand(&self, idx: usize) -> bool {
        if idx > 0 {
            return true;
        }
        let info = self.info();
        !info.sets_register() || info.reads_register0()
    }

    pub fn writes_operand(&self, idx: usize) -> bool {
        idx == 0 && self.info().sets_register()
    }

    /* Invoke register lists contain two entries for each long or double
     * argument; collapse them to one entry per calling parameter now that
     * the callee's signature is known. */
    pub fn fix_invoke_registers(&mut self, method: &MethodRef) -> Result<(), DexError> {
        let receiver = !self.is_invoke_static();
        let expect = method.num_calling_params(receiver);
        if expect == self.registers.len() {
            return Ok(());
        }
        let mut registers = Vec::with_capacity(expect);
        let mut j = 0;
        for i in 0..expect {
            if j >= self.registers.len() {
                fail!(
                    Structural,
                    "invoke at {:04x} passes too few registers for {}",
                    self.pc,
                    method.descriptor()
                );
            }
            registers.push(self.registers[j]);
            j += method.calling_param(i, receiver).words() as usize;
        }
        if j != self.registers.len() {
            fail!(
                Structural,
                "invoke at {:04x} passes {} registers where {} are expected",
                self.pc,
                self.registers.len(),
                j
            );
        }
        self.registers = registers;
        self.reg_types = vec![None; expect];
        self.reg_defs = vec![BTreeSet::new(); expect];
        Ok(())
    }

    pub fn target(&self) -> i64 {
        match self.operand {
            Operand::Target(t) => t,
            _ => -1,
        }
    }

    #[inline]
    fn pl_u16(&self, p: usize) -> usize {
        self.payload[p] as usize
    }

    #[inline]
    fn pl_i32(&self, p: usize) -> i32 {
        (self.payload[p] as u32 | ((self.payload[p + 1] as u32) << 16)) as i32
    }

    /// Absolute pcs of the switch case targets, in table order.
    pub fn switch_targets(&self) -> Vec<i64> {
        let pc = self.pc as i64;
        match self.opcode {
            opcodes::PACKED_SWITCH => {
                let size = self.pl_u16(1);
                (0..size).map(|i| pc + self.pl_i32(4 + i * 2) as i64).collect()
            }
            opcodes::SPARSE_SWITCH => {
                let size = self.pl_u16(1);
                (0..size)
                    .map(|i| pc + self.pl_i32(2 + size * 2 + i * 2) as i64)
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Case keys in the same order as [`switch_targets`](Self::switch_targets).
    pub fn switch_keys(&self) -> Vec<i32> {
        match self.opcode {
            opcodes::PACKED_SWITCH => {
                let size = self.pl_u16(1);
                let first = self.pl_i32(2);
                (0..size as i32).map(|i| first + i).collect()
            }
            opcodes::SPARSE_SWITCH => {
                let size = self.pl_u16(1);
                (0..size).map(|i| self.pl_i32(2 + i * 2)).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn min_switch_key(&self) -> i32 {
        self.pl_i32(2)
    }

    pub fn max_switch_key(&self) -> i32 {
        let size = self.pl_u16(1);
        match self.opcode {
            opcodes::PACKED_SWITCH => self.pl_i32(2) + size as i32 - 1,
            _ => self.pl_i32(2 + (size - 1) * 2),
        }
    }

    pub fn num_fill_elements(&self) -> usize {
        if self.opcode == opcodes::FILL_ARRAY_DATA {
            self.pl_i32(2) as usize
        } else {
            0
        }
    }

    /// Element byte width of a fill-array-data table.
    pub fn fill_element_width(&self) -> usize {
        self.pl_u16(1)
    }

    /// Raw bits of fill element `idx`, sign-extended to 64 bits.
    pub fn fill_element_bits(&self, idx: usize) -> i64 {
        let base = 4;
        match self.fill_element_width() {
            1 => {
                let w = self.payload[base + idx / 2];
                if idx & 1 != 0 {
                    (w as i16 >> 8) as i64
                } else {
                    (w as i8) as i64
                }
            }
            2 => self.payload[base + idx] as i16 as i64,
            4 => self.pl_i32(base + idx * 2) as i64,
            8 => {
                (self.pl_i32(base + idx * 4) as u32 as u64
                    | ((self.pl_i32(base + idx * 4 + 2) as u32 as u64) << 32))
                    as i64
            }
            _ => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}: {}", self.pc, self.mnemonic())?;
        for (i, r) in self.registers.iter().enumerate() {
            write!(f, "{} v{}", if i == 0 { "" } else { "," }, r)?;
        }
        match self.operand {
            Operand::None => {}
            Operand::Lit(v) => write!(f, ", #{}", v)?,
            Operand::Target(t) => write!(f, ", {:04x}", t)?,
            Operand::Str(i) => write!(f, ", string@{}", i)?,
            Operand::Type(i) => write!(f, ", type@{}", i)?,
            Operand::Field(i) => write!(f, ", field@{}", i)?,
            Operand::Method(i) => write!(f, ", method@{}", i)?,
        }
        Ok(())
    }
}
