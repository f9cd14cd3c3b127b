#[macro_use]
pub mod error;

pub mod opcodes;
pub mod instructions;
pub mod body;
pub mod normalize;
