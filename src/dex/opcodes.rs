/* Static description of the Dalvik instruction set: one table entry per
 * opcode giving its mnemonic, encoding format, operand interpretation,
 * register behaviour and the exceptions it may raise. */

use bitflags::bitflags;
use once_cell::sync::Lazy;

use crate::types::{
    ARITHMETIC, ARRAY_INDEX_OUT_OF_BOUNDS, ARRAY_STORE, CLASS_CAST, ERROR,
    ILLEGAL_MONITOR_STATE, NEGATIVE_ARRAY_SIZE, NULL_POINTER,
};

pub const NOP: u8 = 0x00;
pub const MOVE: u8 = 0x01;
pub const MOVE_FROM16: u8 = 0x02;
pub const MOVE16: u8 = 0x03;
pub const MOVE_WIDE: u8 = 0x04;
pub const MOVE_WIDE_FROM16: u8 = 0x05;
pub const MOVE_WIDE16: u8 = 0x06;
pub const MOVE_OBJECT: u8 = 0x07;
pub const MOVE_OBJECT_FROM16: u8 = 0x08;
pub const MOVE_OBJECT16: u8 = 0x09;
pub const MOVE_RESULT: u8 = 0x0a;
pub const MOVE_RESULT_WIDE: u8 = 0x0b;
pub const MOVE_RESULT_OBJECT: u8 = 0x0c;
pub const MOVE_EXCEPTION: u8 = 0x0d;
pub const RETURN_VOID: u8 = 0x0e;
pub const RETURN: u8 = 0x0f;
pub const RETURN_WIDE: u8 = 0x10;
pub const RETURN_OBJECT: u8 = 0x11;
pub const CONST4: u8 = 0x12;
pub const CONST16: u8 = 0x13;
pub const CONST: u8 = 0x14;
pub const CONST_HIGH16: u8 = 0x15;
pub const CONST_WIDE16: u8 = 0x16;
pub const CONST_WIDE32: u8 = 0x17;
pub const CONST_WIDE: u8 = 0x18;
pub const CONST_WIDE_HIGH16: u8 = 0x19;
pub const CONST_STRING: u8 = 0x1a;
pub const CONST_STRING_JUMBO: u8 = 0x1b;
pub const CONST_CLASS: u8 = 0x1c;
pub const MONITOR_ENTER: u8 = 0x1d;
pub const MONITOR_EXIT: u8 = 0x1e;
pub const CHECK_CAST: u8 = 0x1f;
pub const INSTANCE_OF: u8 = 0x20;
pub const ARRAY_LENGTH: u8 = 0x21;
pub const NEW_INSTANCE: u8 = 0x22;
pub const NEW_ARRAY: u8 = 0x23;
pub const FILLED_NEW_ARRAY: u8 = 0x24;
pub const FILLED_NEW_ARRAY_RANGE: u8 = 0x25;
pub const FILL_ARRAY_DATA: u8 = 0x26;
pub const THROW: u8 = 0x27;
pub const GOTO: u8 = 0x28;
pub const GOTO16: u8 = 0x29;
pub const GOTO32: u8 = 0x2a;
pub const PACKED_SWITCH: u8 = 0x2b;
pub const SPARSE_SWITCH: u8 = 0x2c;
pub const CMPL_FLOAT: u8 = 0x2d;
pub const CMPG_FLOAT: u8 = 0x2e;
pub const CMPL_DOUBLE: u8 = 0x2f;
pub const CMPG_DOUBLE: u8 = 0x30;
pub const CMP_LONG: u8 = 0x31;
pub const IF_EQ: u8 = 0x32;
pub const IF_NE: u8 = 0x33;
pub const IF_LT: u8 = 0x34;
pub const IF_GE: u8 = 0x35;
pub const IF_GT: u8 = 0x36;
pub const IF_LE: u8 = 0x37;
pub const IF_EQZ: u8 = 0x38;
pub const IF_NEZ: u8 = 0x39;
pub const IF_LTZ: u8 = 0x3a;
pub const IF_GEZ: u8 = 0x3b;
pub const IF_GTZ: u8 = 0x3c;
pub const IF_LEZ: u8 = 0x3d;
pub const AGET: u8 = 0x44;
pub const AGET_WIDE: u8 = 0x45;
pub const AGET_OBJECT: u8 = 0x46;
pub const AGET_BOOLEAN: u8 = 0x47;
pub const AGET_BYTE: u8 = 0x48;
pub const AGET_CHAR: u8 = 0x49;
pub const AGET_SHORT: u8 = 0x4a;
pub const APUT: u8 = 0x4b;
pub const APUT_WIDE: u8 = 0x4c;
pub const APUT_OBJECT: u8 = 0x4d;
pub const APUT_BOOLEAN: u8 = 0x4e;
pub const APUT_BYTE: u8 = 0x4f;
pub const APUT_CHAR: u8 = 0x50;
pub const APUT_SHORT: u8 = 0x51;
pub const IGET: u8 = 0x52;
pub const IGET_WIDE: u8 = 0x53;
pub const IGET_OBJECT: u8 = 0x54;
pub const IGET_BOOLEAN: u8 = 0x55;
pub const IGET_BYTE: u8 = 0x56;
pub const IGET_CHAR: u8 = 0x57;
pub const IGET_SHORT: u8 = 0x58;
pub const IPUT: u8 = 0x59;
pub const IPUT_WIDE: u8 = 0x5a;
pub const IPUT_OBJECT: u8 = 0x5b;
pub const IPUT_BOOLEAN: u8 = 0x5c;
pub const IPUT_BYTE: u8 = 0x5d;
pub const IPUT_CHAR: u8 = 0x5e;
pub const IPUT_SHORT: u8 = 0x5f;
pub const SGET: u8 = 0x60;
pub const SGET_WIDE: u8 = 0x61;
pub const SGET_OBJECT: u8 = 0x62;
pub const SGET_BOOLEAN: u8 = 0x63;
pub const SGET_BYTE: u8 = 0x64;
pub const SGET_CHAR: u8 = 0x65;
pub const SGET_SHORT: u8 = 0x66;
pub const SPUT: u8 = 0x67;
pub const SPUT_WIDE: u8 = 0x68;
pub const SPUT_OBJECT: u8 = 0x69;
pub const SPUT_BOOLEAN: u8 = 0x6a;
pub const SPUT_BYTE: u8 = 0x6b;
pub const SPUT_CHAR: u8 = 0x6c;
pub const SPUT_SHORT: u8 = 0x6d;
pub const INVOKE_VIRTUAL: u8 = 0x6e;
pub const INVOKE_SUPER: u8 = 0x6f;
pub const INVOKE_DIRECT: u8 = 0x70;
pub const INVOKE_STATIC: u8 = 0x71;
pub const INVOKE_INTERFACE: u8 = 0x72;
pub const INVOKE_VIRTUAL_RANGE: u8 = 0x74;
pub const INVOKE_SUPER_RANGE: u8 = 0x75;
pub const INVOKE_DIRECT_RANGE: u8 = 0x76;
pub const INVOKE_STATIC_RANGE: u8 = 0x77;
pub const INVOKE_INTERFACE_RANGE: u8 = 0x78;
pub const NEG_INT: u8 = 0x7b;
pub const NOT_INT: u8 = 0x7c;
pub const NEG_LONG: u8 = 0x7d;
pub const NOT_LONG: u8 = 0x7e;
pub const NEG_FLOAT: u8 = 0x7f;
pub const NEG_DOUBLE: u8 = 0x80;
pub const INT_TO_LONG: u8 = 0x81;
pub const INT_TO_FLOAT: u8 = 0x82;
pub const INT_TO_DOUBLE: u8 = 0x83;
pub const LONG_TO_INT: u8 = 0x84;
pub const LONG_TO_FLOAT: u8 = 0x85;
pub const LONG_TO_DOUBLE: u8 = 0x86;
pub const FLOAT_TO_INT: u8 = 0x87;
pub const FLOAT_TO_LONG: u8 = 0x88;
pub const FLOAT_TO_DOUBLE: u8 = 0x89;
pub const DOUBLE_TO_INT: u8 = 0x8a;
pub const DOUBLE_TO_LONG: u8 = 0x8b;
pub const DOUBLE_TO_FLOAT: u8 = 0x8c;
pub const INT_TO_BYTE: u8 = 0x8d;
pub const INT_TO_CHAR: u8 = 0x8e;
pub const INT_TO_SHORT: u8 = 0x8f;
pub const ADD_INT: u8 = 0x90;
pub const SUB_INT: u8 = 0x91;
pub const MUL_INT: u8 = 0x92;
pub const DIV_INT: u8 = 0x93;
pub const REM_INT: u8 = 0x94;
pub const AND_INT: u8 = 0x95;
pub const OR_INT: u8 = 0x96;
pub const XOR_INT: u8 = 0x97;
pub const SHL_INT: u8 = 0x98;
pub const SHR_INT: u8 = 0x99;
pub const USHR_INT: u8 = 0x9a;
pub const ADD_LONG: u8 = 0x9b;
pub const SUB_LONG: u8 = 0x9c;
pub const MUL_LONG: u8 = 0x9d;
pub const DIV_LONG: u8 = 0x9e;
pub const REM_LONG: u8 = 0x9f;
pub const AND_LONG: u8 = 0xa0;
pub const OR_LONG: u8 = 0xa1;
pub const XOR_LONG: u8 = 0xa2;
pub const SHL_LONG: u8 = 0xa3;
pub const SHR_LONG: u8 = 0xa4;
pub const USHR_LONG: u8 = 0xa5;
pub const ADD_FLOAT: u8 = 0xa6;
pub const SUB_FLOAT: u8 = 0xa7;
pub const MUL_FLOAT: u8 = 0xa8;
pub const DIV_FLOAT: u8 = 0xa9;
pub const REM_FLOAT: u8 = 0xaa;
pub const ADD_DOUBLE: u8 = 0xab;
pub const SUB_DOUBLE: u8 = 0xac;
pub const MUL_DOUBLE: u8 = 0xad;
pub const DIV_DOUBLE: u8 = 0xae;
pub const REM_DOUBLE: u8 = 0xaf;
pub const ADD_INT_2ADDR: u8 = 0xb0;
pub const USHR_INT_2ADDR: u8 = 0xba;
pub const ADD_LONG_2ADDR: u8 = 0xbb;
pub const USHR_LONG_2ADDR: u8 = 0xc5;
pub const ADD_FLOAT_2ADDR: u8 = 0xc6;
pub const REM_FLOAT_2ADDR: u8 = 0xca;
pub const ADD_DOUBLE_2ADDR: u8 = 0xcb;
pub const REM_DOUBLE_2ADDR: u8 = 0xcf;
pub const ADD_INT_LIT16: u8 = 0xd0;
pub const RSUB_INT: u8 = 0xd1;
pub const XOR_INT_LIT16: u8 = 0xd7;
pub const ADD_INT_LIT8: u8 = 0xd8;
pub const RSUB_INT_LIT8: u8 = 0xd9;
pub const USHR_INT_LIT8: u8 = 0xe2;

// Idents of the inline data tables that can follow the executable code.
pub const PACKED_SWITCH_PAYLOAD: u16 = 0x0100;
pub const SPARSE_SWITCH_PAYLOAD: u16 = 0x0200;
pub const FILL_ARRAY_DATA_PAYLOAD: u16 = 0x0300;

/// The three kinds of inline data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    PackedSwitch,
    SparseSwitch,
    ArrayData,
}

/// Instruction encoding formats, named after the Dalvik convention:
/// word count, register count, then the operand style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    F10t,
    F10x,
    F11n,
    F11x,
    F12x,
    F20t,
    F21c,
    F21h,
    F21h64,
    F21s,
    F21t,
    F22b,
    F22c,
    F22s,
    F22t,
    F22x,
    F23x,
    F30t,
    F31c,
    F31i,
    F31t,
    F32x,
    F35c,
    F3rc,
    F51l,
}

impl Format {
    /// Code units occupied by instructions of this format.
    pub fn words(&self) -> usize {
        use Format::*;
        match self {
            F10t | F10x | F11n | F11x | F12x => 1,
            F20t | F21c | F21h | F21h64 | F21s | F21t | F22b | F22c | F22s | F22t | F22x
            | F23x => 2,
            F30t | F31c | F31i | F31t | F32x | F35c | F3rc => 3,
            F51l => 5,
        }
    }

    /// Fixed register operand count; `F35c` and `F3rc` carry their own.
    pub fn registers(&self) -> usize {
        use Format::*;
        match self {
            F10t | F10x | F20t | F30t | F35c | F3rc => 0,
            F11n | F11x | F21c | F21h | F21h64 | F21s | F21t | F31c | F31i | F31t | F51l => 1,
            F12x | F22b | F22c | F22s | F22t | F22x | F32x => 2,
            F23x => 3,
        }
    }
}

/// How the non-register operand of an instruction is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    /// Immediate literal
    Lit,
    /// Branch target, stored as an absolute pc
    Target,
    /// String pool index
    Str,
    /// Type pool index
    Type,
    /// Field pool index
    Field,
    /// Method pool index
    Method,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpcodeFlags: u8 {
        /// Execution can fall through to the next instruction.
        const CAN_CONTINUE    = 0b0000_0001;
        /// The first register operand is written.
        const SETS_REGISTER   = 0b0000_0010;
        /// The first register operand is also read (2addr forms).
        const READS_REGISTER0 = 0b0000_0100;
    }
}

/* Throw lists: anything with a declared runtime exception may equally
 * throw an Error of some kind. An empty list means "anything". */
const THROWS_ANYTHING: &[&str] = &[];
const THROWS_ERROR: &[&str] = &[ERROR];
const THROWS_NULL: &[&str] = &[ERROR, NULL_POINTER];
const THROWS_CLASS_CAST: &[&str] = &[ERROR, CLASS_CAST];
const THROWS_NULL_MONITOR: &[&str] = &[ERROR, NULL_POINTER, ILLEGAL_MONITOR_STATE];
const THROWS_NULL_ARRAY: &[&str] = &[ERROR, NULL_POINTER, ARRAY_INDEX_OUT_OF_BOUNDS];
const THROWS_NULL_ARRAY_STORE: &[&str] =
    &[ERROR, NULL_POINTER, ARRAY_INDEX_OUT_OF_BOUNDS, ARRAY_STORE];
const THROWS_NEGATIVE_ARRAY: &[&str] = &[ERROR, NEGATIVE_ARRAY_SIZE];
const THROWS_ARITHMETIC: &[&str] = &[ERROR, ARITHMETIC];

#[derive(Debug)]
pub struct Opcode {
    pub mnemonic: &'static str,
    pub format: Format,
    pub operand: OperandKind,
    pub flags: OpcodeFlags,
    throws: Option<&'static [&'static str]>,
}

impl Opcode {
    fn new(
        mnemonic: &'static str,
        format: Format,
        operand: OperandKind,
        flags: OpcodeFlags,
        throws: Option<&'static [&'static str]>,
    ) -> Opcode {
        Opcode { mnemonic, format, operand, flags, throws }
    }

    pub fn may_throw(&self) -> bool {
        self.throws.is_some()
    }

    /// True when the opcode can raise anything at all (invokes, throw).
    pub fn may_throw_anything(&self) -> bool {
        matches!(self.throws, Some(l) if l.is_empty())
    }

    /// Descriptors of the exception classes this opcode can raise.
    pub fn throw_descriptors(&self) -> &'static [&'static str] {
        self.throws.unwrap_or(&[])
    }

    pub fn can_continue(&self) -> bool {
        self.flags.contains(OpcodeFlags::CAN_CONTINUE)
    }

    pub fn sets_register(&self) -> bool {
        self.flags.contains(OpcodeFlags::SETS_REGISTER)
    }

    pub fn reads_register0(&self) -> bool {
        self.flags.contains(OpcodeFlags::READS_REGISTER0)
    }
}

pub fn opcode(op: u8) -> &'static Opcode {
    &OPCODES[op as usize]
}

/// True for opcodes left undefined by the instruction set.
pub fn is_undefined(op: u8) -> bool {
    matches!(op, 0x3e..=0x43 | 0x73 | 0x79 | 0x7a | 0xe3..=0xff)
}

static OPCODES: Lazy<Vec<Opcode>> = Lazy::new(|| {
    use Format::*;
    use OperandKind as K;
    let term = OpcodeFlags::empty();
    let c = OpcodeFlags::CAN_CONTINUE;
    let d = c | OpcodeFlags::SETS_REGISTER;
    let ud = d | OpcodeFlags::READS_REGISTER0;
    let i = Opcode::new;
    let undef = |m| Opcode::new(m, F10x, K::None, c, None);
    vec![
        /* 00 */
        i("nop", F10x, K::None, c, None),
        i("move", F12x, K::None, d, None),
        i("move/from16", F22x, K::None, d, None),
        i("move/16", F32x, K::None, d, None),
        i("move-wide", F12x, K::None, d, None),
        i("move-wide/from16", F22x, K::None, d, None),
        i("move-wide/16", F32x, K::None, d, None),
        i("move-object", F12x, K::None, d, None),
        i("move-object/from16", F22x, K::None, d, None),
        i("move-object/16", F32x, K::None, d, None),
        i("move-result", F11x, K::None, d, None),
        i("move-result-wide", F11x, K::None, d, None),
        i("move-result-object", F11x, K::None, d, None),
        i("move-exception", F11x, K::None, d, None),
        i("return-void", F10x, K::None, term, None),
        i("return", F11x, K::None, term, None),
        /* 10 */
        i("return-wide", F11x, K::None, term, None),
        i("return-object", F11x, K::None, term, None),
        i("const/4", F11n, K::Lit, d, None),
        i("const/16", F21s, K::Lit, d, None),
        i("const", F31i, K::Lit, d, None),
        i("const/high16", F21h, K::Lit, d, None),
        i("const-wide/16", F21s, K::Lit, d, None),
        i("const-wide/32", F31i, K::Lit, d, None),
        i("const-wide", F51l, K::Lit, d, None),
        i("const-wide/high16", F21h64, K::Lit, d, None),
        i("const-string", F21c, K::Str, d, None),
        i("const-string/jumbo", F31c, K::Str, d, None),
        i("const-class", F21c, K::Type, d, None),
        i("monitor-enter", F11x, K::None, c, Some(THROWS_NULL)),
        i("monitor-exit", F11x, K::None, c, Some(THROWS_NULL_MONITOR)),
        i("check-cast", F21c, K::Type, c, Some(THROWS_CLASS_CAST)),
        /* 20 */
        i("instance-of", F22c, K::Type, d, None),
        i("array-length", F12x, K::None, d, Some(THROWS_NULL)),
        i("new-instance", F21c, K::Type, d, Some(THROWS_ERROR)),
        i("new-array", F22c, K::Type, d, Some(THROWS_NEGATIVE_ARRAY)),
        i("filled-new-array", F35c, K::Type, c, Some(THROWS_ERROR)),
        i("filled-new-array/range", F3rc, K::Type, c, Some(THROWS_ERROR)),
        i("fill-array-data", F31t, K::Target, c, Some(THROWS_NULL)),
        i("throw", F11x, K::None, term, Some(THROWS_ANYTHING)),
        i("goto", F10t, K::Target, term, None),
        i("goto/16", F20t, K::Target, term, None),
        i("goto/32", F30t, K::Target, term, None),
        i("packed-switch", F31t, K::Target, c, None),
        i("sparse-switch", F31t, K::Target, c, None),
        i("cmpl-float", F23x, K::None, d, None),
        i("cmpg-float", F23x, K::None, d, None),
        i("cmpl-double", F23x, K::None, d, None),
        /* 30 */
        i("cmpg-double", F23x, K::None, d, None),
        i("cmp-long", F23x, K::None, d, None),
        i("if-eq", F22t, K::Target, c, None),
        i("if-ne", F22t, K::Target, c, None),
        i("if-lt", F22t, K::Target, c, None),
        i("if-ge", F22t, K::Target, c, None),
        i("if-gt", F22t, K::Target, c, None),
        i("if-le", F22t, K::Target, c, None),
        i("if-eqz", F21t, K::Target, c, None),
        i("if-nez", F21t, K::Target, c, None),
        i("if-ltz", F21t, K::Target, c, None),
        i("if-gez", F21t, K::Target, c, None),
        i("if-gtz", F21t, K::Target, c, None),
        i("if-lez", F21t, K::Target, c, None),
        undef("undef-3e"),
        undef("undef-3f"),
        /* 40 */
        undef("undef-40"),
        undef("undef-41"),
        undef("undef-42"),
        undef("undef-43"),
        i("aget", F23x, K::None, d, Some(THROWS_NULL_ARRAY)),
        i("aget-wide", F23x, K::None, d, Some(THROWS_NULL_ARRAY)),
        i("aget-object", F23x, K::None, d, Some(THROWS_NULL_ARRAY)),
        i("aget-boolean", F23x, K::None, d, Some(THROWS_NULL_ARRAY)),
        i("aget-byte", F23x, K::None, d, Some(THROWS_NULL_ARRAY)),
        i("aget-char", F23x, K::None, d, Some(THROWS_NULL_ARRAY)),
        i("aget-short", F23x, K::None, d, Some(THROWS_NULL_ARRAY)),
        i("aput", F23x, K::None, c, Some(THROWS_NULL_ARRAY_STORE)),
        i("aput-wide", F23x, K::None, c, Some(THROWS_NULL_ARRAY_STORE)),
        i("aput-object", F23x, K::None, c, Some(THROWS_NULL_ARRAY_STORE)),
        i("aput-boolean", F23x, K::None, c, Some(THROWS_NULL_ARRAY_STORE)),
        i("aput-byte", F23x, K::None, c, Some(THROWS_NULL_ARRAY_STORE)),
        /* 50 */
        i("aput-char", F23x, K::None, c, Some(THROWS_NULL_ARRAY_STORE)),
        i("aput-short", F23x, K::None, c, Some(THROWS_NULL_ARRAY_STORE)),
        i("iget", F22c, K::Field, d, Some(THROWS_NULL)),
        i("iget-wide", F22c, K::Field, d, Some(THROWS_NULL)),
        i("iget-object", F22c, K::Field, d, Some(THROWS_NULL)),
        i("iget-boolean", F22c, K::Field, d, Some(THROWS_NULL)),
        i("iget-byte", F22c, K::Field, d, Some(THROWS_NULL)),
        i("iget-char", F22c, K::Field, d, Some(THROWS_NULL)),
        i("iget-short", F22c, K::Field, d, Some(THROWS_NULL)),
        i("iput", F22c, K::Field, c, Some(THROWS_NULL)),
        i("iput-wide", F22c, K::Field, c, Some(THROWS_NULL)),
        i("iput-object", F22c, K::Field, c, Some(THROWS_NULL)),
        i("iput-boolean", F22c, K::Field, c, Some(THROWS_NULL)),
        i("iput-byte", F22c, K::Field, c, Some(THROWS_NULL)),
        i("iput-char", F22c, K::Field, c, Some(THROWS_NULL)),
        i("iput-short", F22c, K::Field, c, Some(THROWS_NULL)),
        /* 60 */
        i("sget", F21c, K::Field, d, Some(THROWS_ERROR)),
        i("sget-wide", F21c, K::Field, d, Some(THROWS_ERROR)),
        i("sget-object", F21c, K::Field, d, Some(THROWS_ERROR)),
        i("sget-boolean", F21c, K::Field, d, Some(THROWS_ERROR)),
        i("sget-byte", F21c, K::Field, d, Some(THROWS_ERROR)),
        i("sget-char", F21c, K::Field, d, Some(THROWS_ERROR)),
        i("sget-short", F21c, K::Field, d, Some(THROWS_ERROR)),
        i("sput", F21c, K::Field, c, Some(THROWS_ERROR)),
        i("sput-wide", F21c, K::Field, c, Some(THROWS_ERROR)),
        i("sput-object", F21c, K::Field, c, Some(THROWS_ERROR)),
        i("sput-boolean", F21c, K::Field, c, Some(THROWS_ERROR)),
        i("sput-byte", F21c, K::Field, c, Some(THROWS_ERROR)),
        i("sput-char", F21c, K::Field, c, Some(THROWS_ERROR)),
        i("sput-short", F21c, K::Field, c, Some(THROWS_ERROR)),
        i("invoke-virtual", F35c, K::Method, c, Some(THROWS_ANYTHING)),
        i("invoke-super", F35c, K::Method, c, Some(THROWS_ANYTHING)),
        /* 70 */
        i("invoke-direct", F35c, K::Method, c, Some(THROWS_ANYTHING)),
        i("invoke-static", F35c, K::Method, c, Some(THROWS_ANYTHING)),
        i("invoke-interface", F35c, K::Method, c, Some(THROWS_ANYTHING)),
        undef("undef-73"),
        i("invoke-virtual/range", F3rc, K::Method, c, Some(THROWS_ANYTHING)),
        i("invoke-super/range", F3rc, K::Method, c, Some(THROWS_ANYTHING)),
        i("invoke-direct/range", F3rc, K::Method, c, Some(THROWS_ANYTHING)),
        i("invoke-static/range", F3rc, K::Method, c, Some(THROWS_ANYTHING)),
        i("invoke-interface/range", F3rc, K::Method, c, Some(THROWS_ANYTHING)),
        undef("undef-79"),
        undef("undef-7a"),
        i("neg-int", F12x, K::None, d, None),
        i("not-int", F12x, K::None, d, None),
        i("neg-long", F12x, K::None, d, None),
        i("not-long", F12x, K::None, d, None),
        i("neg-float", F12x, K::None, d, None),
        /* 80 */
        i("neg-double", F12x, K::None, d, None),
        i("int-to-long", F12x, K::None, d, None),
        i("int-to-float", F12x, K::None, d, None),
        i("int-to-double", F12x, K::None, d, None),
        i("long-to-int", F12x, K::None, d, None),
        i("long-to-float", F12x, K::None, d, None),
        i("long-to-double", F12x, K::None, d, None),
        i("float-to-int", F12x, K::None, d, None),
        i("float-to-long", F12x, K::None, d, None),
        i("float-to-double", F12x, K::None, d, None),
        i("double-to-int", F12x, K::None, d, None),
        i("double-to-long", F12x, K::None, d, None),
        i("double-to-float", F12x, K::None, d, None),
        i("int-to-byte", F12x, K::None, d, None),
        i("int-to-char", F12x, K::None, d, None),
        i("int-to-short", F12x, K::None, d, None),
        /* 90 */
        i("add-int", F23x, K::None, d, None),
        i("sub-int", F23x, K::None, d, None),
        i("mul-int", F23x, K::None, d, None),
        i("div-int", F23x, K::None, d, Some(THROWS_ARITHMETIC)),
        i("rem-int", F23x, K::None, d, Some(THROWS_ARITHMETIC)),
        i("and-int", F23x, K::None, d, None),
        i("or-int", F23x, K::None, d, None),
        i("xor-int", F23x, K::None, d, None),
        i("shl-int", F23x, K::None, d, None),
        i("shr-int", F23x, K::None, d, None),
        i("ushr-int", F23x, K::None, d, None),
        i("add-long", F23x, K::None, d, None),
        i("sub-long", F23x, K::None, d, None),
        i("mul-long", F23x, K::None, d, None),
        i("div-long", F23x, K::None, d, Some(THROWS_ARITHMETIC)),
        i("rem-long", F23x, K::None, d, Some(THROWS_ARITHMETIC)),
        /* a0 */
        i("and-long", F23x, K::None, d, None),
        i("or-long", F23x, K::None, d, None),
        i("xor-long", F23x, K::None, d, None),
        i("shl-long", F23x, K::None, d, None),
        i("shr-long", F23x, K::None, d, None),
        i("ushr-long", F23x, K::None, d, None),
        i("add-float", F23x, K::None, d, None),
        i("sub-float", F23x, K::None, d, None),
        i("mul-float", F23x, K::None, d, None),
        i("div-float", F23x, K::None, d, Some(THROWS_ARITHMETIC)),
        i("rem-float", F23x, K::None, d, Some(THROWS_ARITHMETIC)),
        i("add-double", F23x, K::None, d, None),
        i("sub-double", F23x, K::None, d, None),
        i("mul-double", F23x, K::None, d, None),
        i("div-double", F23x, K::None, d, Some(THROWS_ARITHMETIC)),
        i("rem-double", F23x, K::None, d, Some(THROWS_ARITHMETIC)),
        /* b0 */
        i("add-int/2addr", F12x, K::None, ud, None),
        i("sub-int/2addr", F12x, K::None, ud, None),
        i("mul-int/2addr", F12x, K::None, ud, None),
        i("div-int/2addr", F12x, K::None, ud, Some(THROWS_ARITHMETIC)),
        i("rem-int/2addr", F12x, K::None, ud, Some(THROWS_ARITHMETIC)),
        i("and-int/2addr", F12x, K::None, ud, None),
        i("or-int/2addr", F12x, K::None, ud, None),
        i("xor-int/2addr", F12x, K::None, ud, None),
        i("shl-int/2addr", F12x, K::None, ud, None),
        i("shr-int/2addr", F12x, K::None, ud, None),
        i("ushr-int/2addr", F12x, K::None, ud, None),
        i("add-long/2addr", F12x, K::None, ud, None),
        i("sub-long/2addr", F12x, K::None, ud, None),
        i("mul-long/2addr", F12x, K::None, ud, None),
        i("div-long/2addr", F12x, K::None, ud, Some(THROWS_ARITHMETIC)),
        i("rem-long/2addr", F12x, K::None, ud, Some(THROWS_ARITHMETIC)),
        /* c0 */
        i("and-long/2addr", F12x, K::None, ud, None),
        i("or-long/2addr", F12x, K::None, ud, None),
        i("xor-long/2addr", F12x, K::None, ud, None),
        i("shl-long/2addr", F12x, K::None, ud, None),
        i("shr-long/2addr", F12x, K::None, ud, None),
        i("ushr-long/2addr", F12x, K::None, ud, None),
        i("add-float/2addr", F12x, K::None, ud, None),
        i("sub-float/2addr", F12x, K::None, ud, None),
        i("mul-float/2addr", F12x, K::None, ud, None),
        i("div-float/2addr", F12x, K::None, ud, Some(THROWS_ARITHMETIC)),
        i("rem-float/2addr", F12x, K::None, ud, Some(THROWS_ARITHMETIC)),
        i("add-double/2addr", F12x, K::None, ud, None),
        i("sub-double/2addr", F12x, K::None, ud, None),
        i("mul-double/2addr", F12x, K::None, ud, None),
        i("div-double/2addr", F12x, K::None, ud, Some(THROWS_ARITHMETIC)),
        i("rem-double/2addr", F12x, K::None, ud, Some(THROWS_ARITHMETIC)),
        /* d0 */
        i("add-int/lit16", F22s, K::Lit, d, None),
        i("rsub-int", F22s, K::Lit, d, None),
        i("mul-int/lit16", F22s, K::Lit, d, None),
        i("div-int/lit16", F22s, K::Lit, d, Some(THROWS_ARITHMETIC)),
        i("rem-int/lit16", F22s, K::Lit, d, Some(THROWS_ARITHMETIC)),
        i("and-int/lit16", F22s, K::Lit, d, None),
        i("or-int/lit16", F22s, K::Lit, d, None),
        i("xor-int/lit16", F22s, K::Lit, d, None),
        i("add-int/lit8", F22b, K::Lit, d, None),
        i("rsub-int/lit8", F22b, K::Lit, d, None),
        i("mul-int/lit8", F22b, K::Lit, d, None),
        i("div-int/lit8", F22b, K::Lit, d, Some(THROWS_ARITHMETIC)),
        i("rem-int/lit8", F22b, K::Lit, d, Some(THROWS_ARITHMETIC)),
        i("and-int/lit8", F22b, K::Lit, d, None),
        i("or-int/lit8", F22b, K::Lit, d, None),
        i("xor-int/lit8", F22b, K::Lit, d, None),
        /* e0 */
        i("shl-int/lit8", F22b, K::Lit, d, None),
        i("shr-int/lit8", F22b, K::Lit, d, None),
        i("ushr-int/lit8", F22b, K::Lit, d, None),
        undef("undef-e3"),
        undef("undef-e4"),
        undef("undef-e5"),
        undef("undef-e6"),
        undef("undef-e7"),
        undef("undef-e8"),
        undef("undef-e9"),
        undef("undef-ea"),
        undef("undef-eb"),
        undef("undef-ec"),
        undef("undef-ed"),
        undef("undef-ee"),
        undef("undef-ef"),
        /* f0 */
        undef("undef-f0"),
        undef("undef-f1"),
        undef("undef-f2"),
        undef("undef-f3"),
        undef("undef-f4"),
        undef("undef-f5"),
        undef("undef-f6"),
        undef("undef-f7"),
        undef("undef-f8"),
        undef("undef-f9"),
        undef("undef-fa"),
        undef("undef-fb"),
        undef("undef-fc"),
        undef("undef-fd"),
        undef("undef-fe"),
        undef("undef-ff"),
    ]
});
