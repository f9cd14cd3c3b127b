use std::fmt;

macro_rules! err {
    ($kind:ident, ($fmtstr:literal $(, $args:expr)*), ($contextfmt:literal $(, $contextargs:expr)*)) => {
        DexError::new(crate::dex::error::ErrorKind::$kind, format!($fmtstr $(, $args)*))
            .context(format!($contextfmt $(, $contextargs)*))
    };
    ($kind:ident, $fmtstr:literal $(, $args:expr)*) => {
        DexError::new(crate::dex::error::ErrorKind::$kind, format!($fmtstr $(, $args)*))
    };
}

macro_rules! fail {
    ($kind:ident, ($fmtstr:literal $(, $args:expr)*), ($contextfmt:literal $(, $contextargs:expr)*)) => {
        return Err(err!($kind, ($fmtstr $(, $args)*), ($contextfmt $(, $contextargs)*)))
    };
    ($kind:ident, $fmtstr:literal $(, $args:expr)*) => {
        return Err(err!($kind, $fmtstr $(, $args)*))
    };
}

/// Broad failure classes, so callers can decide whether to skip a single
/// method or abandon the whole container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind
{
    /// Malformed code units: truncated instructions, bad payload idents.
    Decode,
    /// Well-formed instructions arranged impossibly: branches out of range,
    /// jumps into the middle of an instruction, unresolvable pool indices.
    Structural,
    /// The type lattice proved a register holds incompatible types.
    TypeConflict,
    /// Valid input the lifter deliberately does not handle.
    Unsupported,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DexError
{
    kind: ErrorKind,
    msg: String,
    contexts: Vec<String>,
}

impl DexError
{
    pub(crate) fn new(kind: ErrorKind, msg: impl Into<String>) -> Self
    {
        DexError {
            kind,
            msg: msg.into(),
            contexts: Vec::new(),
        }
    }

    /// Appends an outer context frame, e.g. the method whose analysis the
    /// error aborted.
    pub fn context(self, context: impl Into<String>) -> Self
    {
        let mut contexts = self.contexts;
        contexts.push(context.into());
        DexError { kind: self.kind, msg: self.msg, contexts }
    }

    pub fn kind(&self) -> ErrorKind
    {
        self.kind
    }
}

impl fmt::Display for DexError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.msg)?;
        let mut connector = " for ";
        for context in &self.contexts
        {
            write!(f, "{}{}", connector, context)?;
            connector = " of ";
        }
        Ok(())
    }
}

impl std::error::Error for DexError {}
