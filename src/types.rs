/* Core types shared across decoding, analysis and retargeting: the Dalvik
 * type lattice, references into the constant pool, and method descriptors. */

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Identifier of a constant-typing cell, see [`crate::analysis::typing`].
pub type CellId = u32;

// Descriptors of classes the lifter reasons about statically.
pub const OBJECT: &str = "Ljava/lang/Object;";
pub const STRING: &str = "Ljava/lang/String;";
pub const CLASS: &str = "Ljava/lang/Class;";
pub const THROWABLE: &str = "Ljava/lang/Throwable;";
pub const ERROR: &str = "Ljava/lang/Error;";
pub const NULL_POINTER: &str = "Ljava/lang/NullPointerException;";
pub const ARITHMETIC: &str = "Ljava/lang/ArithmeticException;";
pub const INDEX_OUT_OF_BOUNDS: &str = "Ljava/lang/IndexOutOfBoundsException;";
pub const ARRAY_INDEX_OUT_OF_BOUNDS: &str = "Ljava/lang/ArrayIndexOutOfBoundsException;";
pub const ARRAY_STORE: &str = "Ljava/lang/ArrayStoreException;";
pub const CLASS_CAST: &str = "Ljava/lang/ClassCastException;";
pub const NEGATIVE_ARRAY_SIZE: &str = "Ljava/lang/NegativeArraySizeException;";
pub const ILLEGAL_MONITOR_STATE: &str = "Ljava/lang/IllegalMonitorStateException;";

/* Direct supertype of every system class the lifter knows about. Subtype
 * queries walk this chain; classes missing from it are unresolvable and
 * queries about them answer None. */
static SYSTEM_SUPERTYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut t = HashMap::new();
    t.insert(THROWABLE, OBJECT);
    t.insert(STRING, OBJECT);
    t.insert(CLASS, OBJECT);
    t.insert("Ljava/lang/Exception;", THROWABLE);
    t.insert(ERROR, THROWABLE);
    t.insert("Ljava/lang/LinkageError;", ERROR);
    t.insert("Ljava/lang/VirtualMachineError;", ERROR);
    t.insert("Ljava/lang/OutOfMemoryError;", "Ljava/lang/VirtualMachineError;");
    t.insert("Ljava/lang/RuntimeException;", "Ljava/lang/Exception;");
    t.insert(NULL_POINTER, "Ljava/lang/RuntimeException;");
    t.insert(ARITHMETIC, "Ljava/lang/RuntimeException;");
    t.insert(INDEX_OUT_OF_BOUNDS, "Ljava/lang/RuntimeException;");
    t.insert(ARRAY_INDEX_OUT_OF_BOUNDS, INDEX_OUT_OF_BOUNDS);
    t.insert(ARRAY_STORE, "Ljava/lang/RuntimeException;");
    t.insert(CLASS_CAST, "Ljava/lang/RuntimeException;");
    t.insert(NEGATIVE_ARRAY_SIZE, "Ljava/lang/RuntimeException;");
    t.insert(ILLEGAL_MONITOR_STATE, "Ljava/lang/RuntimeException;");
    t
});

/* Dalvik types as tracked per register. Word32 and Word64 are placeholders
 * for constants whose width is known but whose interpretation (int vs float,
 * long vs double, null reference) is not yet. Two placeholders of the same
 * width compare equal regardless of their cell, so dataflow states converge;
 * the cells themselves are unified separately. */
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub enum DexType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    /// A class reference holding its full descriptor, e.g. `Ljava/lang/String;`
    Object(String),
    Array(Box<DexType>),
    /// Untyped 32 bit constant
    Word32(CellId),
    /// Untyped 64 bit constant
    Word64(CellId),
}

impl PartialEq for DexType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DexType::Word32(_), DexType::Word32(_)) => true,
            (DexType::Word64(_), DexType::Word64(_)) => true,
            (DexType::Object(a), DexType::Object(b)) => a == b,
            (DexType::Array(a), DexType::Array(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl DexType {
    pub fn object(descriptor: &str) -> DexType {
        DexType::Object(descriptor.to_string())
    }

    /// Parses a type descriptor, e.g. `[Ljava/lang/String;` or `I`.
    pub fn from_descriptor(desc: &str) -> Option<DexType> {
        let mut c = desc.chars();
        let t = match c.next()? {
            'Z' => DexType::Boolean,
            'B' => DexType::Byte,
            'C' => DexType::Char,
            'S' => DexType::Short,
            'I' => DexType::Int,
            'J' => DexType::Long,
            'F' => DexType::Float,
            'D' => DexType::Double,
            'V' => DexType::Void,
            'L' => {
                if !desc.ends_with(';') { return None; }
                DexType::Object(desc.to_string())
            }
            '[' => DexType::Array(Box::new(DexType::from_descriptor(c.as_str())?)),
            _ => return None,
        };
        // Primitives must be a single character
        match t {
            DexType::Object(_) | DexType::Array(_) => {}
            _ if desc.len() != 1 => return None,
            _ => {}
        }
        Some(t)
    }

    pub fn descriptor(&self) -> String {
        match self {
            DexType::Boolean => "Z".to_string(),
            DexType::Byte => "B".to_string(),
            DexType::Char => "C".to_string(),
            DexType::Short => "S".to_string(),
            DexType::Int => "I".to_string(),
            DexType::Long => "J".to_string(),
            DexType::Float => "F".to_string(),
            DexType::Double => "D".to_string(),
            DexType::Void => "V".to_string(),
            DexType::Object(d) => d.clone(),
            DexType::Array(e) => format!("[{}", e.descriptor()),
            DexType::Word32(_) => "I?".to_string(),
            DexType::Word64(_) => "J?".to_string(),
        }
    }

    /// Internal form of a class or array reference, e.g. `java/lang/String`.
    pub fn internal_name(&self) -> Option<String> {
        match self {
            DexType::Object(d) => Some(d[1..d.len() - 1].to_string()),
            DexType::Array(_) => Some(self.descriptor()),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, DexType::Object(_) | DexType::Array(_))
    }

    /// Single-word primitives, including unresolved 32 bit constants.
    pub fn is_prim_word(&self) -> bool {
        matches!(
            self,
            DexType::Boolean
                | DexType::Byte
                | DexType::Char
                | DexType::Short
                | DexType::Int
                | DexType::Float
                | DexType::Word32(_)
        )
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, DexType::Long | DexType::Double | DexType::Word64(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, DexType::Word32(_) | DexType::Word64(_))
    }

    /// Number of register words a value of this type occupies.
    pub fn words(&self) -> u16 {
        if self.is_wide() { 2 } else { 1 }
    }

    pub fn element_type(&self) -> Option<&DexType> {
        match self {
            DexType::Array(e) => Some(e),
            _ => None,
        }
    }

    /* Whether values of the two types share a machine representation, i.e.
     * a register holding one can be reinterpreted as the other. This is the
     * tolerance used by instruction operand checks. */
    pub fn is_compatible(&self, other: &DexType) -> bool {
        use DexType::*;
        if self == other { return true; }
        match (self, other) {
            (Boolean | Byte | Char | Short | Int | Word32(_),
             Boolean | Byte | Char | Short | Int | Word32(_)) => true,
            (Float | Word32(_), Float | Word32(_)) => true,
            (Long | Word64(_), Long | Word64(_)) => true,
            (Double | Word64(_), Double | Word64(_)) => true,
            (Object(_) | Array(_) | Word32(_), Object(_) | Array(_) | Word32(_)) => true,
            _ => false,
        }
    }

    /// `Some(true)`/`Some(false)` when the class hierarchy can answer the
    /// question, `None` when either side is outside the known system classes.
    pub fn subtype_of(&self, other: &DexType) -> Option<bool> {
        match (self, other) {
            (a, b) if a == b => Some(true),
            (DexType::Array(_), DexType::Object(d)) if d == OBJECT => Some(true),
            (DexType::Array(a), DexType::Array(b)) => a.subtype_of(b),
            (DexType::Object(_), DexType::Object(d)) if d == OBJECT => Some(true),
            (DexType::Object(a), DexType::Object(b)) => {
                if !SYSTEM_SUPERTYPES.contains_key(a.as_str()) {
                    return None;
                }
                let mut cur = a.as_str();
                while let Some(&up) = SYSTEM_SUPERTYPES.get(cur) {
                    if up == b.as_str() { return Some(true); }
                    cur = up;
                }
                if SYSTEM_SUPERTYPES.contains_key(b.as_str()) { Some(false) } else { None }
            }
            _ => Some(false),
        }
    }
}

impl fmt::Display for DexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}

/// A field as referenced from the constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub owner: DexType,
    pub name: String,
    pub field_type: DexType,
}

/// A method as referenced from the constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: DexType,
    pub name: String,
    pub return_type: DexType,
    pub params: Vec<DexType>,
}

impl MethodRef {
    pub fn descriptor(&self) -> String {
        let mut d = "(".to_string();
        for p in &self.params { d.push_str(&p.descriptor()); }
        d.push(')');
        d.push_str(&self.return_type.descriptor());
        d
    }

    /// Number of parameters as seen by a call site: the receiver counts as
    /// parameter 0 when `receiver` is set.
    pub fn num_calling_params(&self, receiver: bool) -> usize {
        self.params.len() + receiver as usize
    }

    /// Type of calling parameter `idx`; parameter 0 is the receiver when
    /// `receiver` is set.
    pub fn calling_param(&self, idx: usize, receiver: bool) -> &DexType {
        if receiver {
            if idx == 0 { return &self.owner; }
            &self.params[idx - 1]
        } else {
            &self.params[idx]
        }
    }
}

/// Identity and signature of the method whose body is being lifted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDesc {
    pub owner: DexType,
    pub name: String,
    pub return_type: DexType,
    pub params: Vec<DexType>,
    pub is_static: bool,
}

impl MethodDesc {
    pub fn num_calling_params(&self) -> usize {
        self.params.len() + !self.is_static as usize
    }

    pub fn calling_param(&self, idx: usize) -> &DexType {
        if !self.is_static {
            if idx == 0 { return &self.owner; }
            &self.params[idx - 1]
        } else {
            &self.params[idx]
        }
    }

    /// Register words consumed by the calling parameters.
    pub fn in_words(&self) -> u16 {
        let mut w = !self.is_static as u16;
        for p in &self.params { w += p.words(); }
        w
    }

    pub fn signature(&self) -> String {
        let mut s = String::new();
        s.push_str(&self.owner.descriptor());
        s.push_str("->");
        s.push_str(&self.name);
        s.push('(');
        for p in &self.params { s.push_str(&p.descriptor()); }
        s.push(')');
        s.push_str(&self.return_type.descriptor());
        s
    }
}

impl fmt::Display for MethodDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// Resolves pool indices embedded in instructions. Implemented by whatever
/// owns the dex string/type/field/method tables; tests use [`SimplePool`].
pub trait ConstantPool {
    fn string(&self, idx: u32) -> Option<&str>;
    fn type_descriptor(&self, idx: u32) -> Option<&str>;
    fn field(&self, idx: u32) -> Option<&FieldRef>;
    fn method(&self, idx: u32) -> Option<&MethodRef>;
}

/// Table-backed pool, indices are plain vector positions.
#[derive(Debug, Default)]
pub struct SimplePool {
    pub strings: Vec<String>,
    pub types: Vec<String>,
    pub fields: Vec<FieldRef>,
    pub methods: Vec<MethodRef>,
}

impl ConstantPool for SimplePool {
    fn string(&self, idx: u32) -> Option<&str> {
        self.strings.get(idx as usize).map(|s| s.as_str())
    }

    fn type_descriptor(&self, idx: u32) -> Option<&str> {
        self.types.get(idx as usize).map(|s| s.as_str())
    }

    fn field(&self, idx: u32) -> Option<&FieldRef> {
        self.fields.get(idx as usize)
    }

    fn method(&self, idx: u32) -> Option<&MethodRef> {
        self.methods.get(idx as usize)
    }
}
