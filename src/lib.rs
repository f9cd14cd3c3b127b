//! # Dexlift
//!
//! A library for lifting Dalvik register bytecode into JVM-style stack
//! instructions: instruction decoding, control flow reconstruction,
//! exception region normalization, use-def and type dataflow analyses,
//! and register-to-stack retargeting.
//!
use crate::analysis::typing::assign_types;
use crate::analysis::usedef::UseDefAnalysis;
use crate::dex::body::{MethodBody, TryRegion};
use crate::dex::error::DexError;
use crate::dex::normalize::normalize_exceptions;
use crate::retarget::{retarget, StackMethod};
use crate::types::{ConstantPool, MethodDesc};

#[macro_use]
pub mod dex;
pub mod analysis;
pub mod retarget;
mod tests;
pub mod types;

/// Runs the whole pipeline over one method: decode and build the CFG,
/// normalize try regions, compute use-def chains, assign operand types,
/// and emit the stack-machine form.
///
/// A failure is fatal for this method only; callers lifting a whole
/// container skip the method and continue.
///
/// # Examples
///
/// ```no_run
///  use dexlift::{lift_method, types::{DexType, MethodDesc, SimplePool}};
///
///  let method = MethodDesc {
///      owner: DexType::object("LExample;"),
///      name: "sum".to_string(),
///      return_type: DexType::Int,
///      params: vec![DexType::Int, DexType::Int],
///      is_static: true,
///  };
///  let pool = SimplePool::default();
///  let code = vec![0x0090, 0x0100, 0x000f];
///  let lifted = lift_method(method, 2, 0, code, vec![], &pool).unwrap();
///  println!("{} ops, stack depth {}", lifted.stack.ops.len(), lifted.stack.max_stack);
/// ```
pub fn lift_method(
    method: MethodDesc,
    num_registers: u16,
    out_words: u16,
    code: Vec<u16>,
    tries: Vec<TryRegion>,
    pool: &dyn ConstantPool,
) -> Result<LiftedMethod, DexError> {
    let mut body = MethodBody::build(method, num_registers, out_words, code, tries, pool)?;
    normalize_exceptions(&mut body)?;
    let mut usedef = UseDefAnalysis::new();
    usedef.analyse(&mut body);
    assign_types(&mut body, pool)?;
    let stack = retarget(&body, pool)?;
    Ok(LiftedMethod { body, usedef, stack })
}

/// Everything the pipeline produces for one method: the annotated graph,
/// the use-def chains, and the retargeted instruction stream.
pub struct LiftedMethod {
    pub body: MethodBody,
    pub usedef: UseDefAnalysis,
    pub stack: StackMethod,
}
