//! AST to Bril lowering module.
//!
//! This module handles the translation of the typed AST into a flat,
//! label-and-branch Bril program. Lowering never simplifies: every literal
//! gets its own constant and every variable read its own copy.

pub mod context;
pub mod stmt;
pub mod expr;

use tracing::debug;

use crate::ir::ast::Program as Unit;
use crate::ir::typeck::TypeOracle;
use crate::ir::Program;
use crate::LowerError;

/// The main Gen struct that orchestrates the lowering process.
pub use context::{Gen, ValueHandle};
pub use expr::{opcode_for, CallSite};

/// Knobs for a lowering run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerOptions {
    /// Callee text that lowers to a `print` effect
    pub print_builtin: String,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            print_builtin: "console.log".to_string(),
        }
    }
}

/// Entry point: lower a whole translation unit into a fresh program whose
/// `main` holds the top-level statements. Either the full program is
/// returned or nothing is.
pub fn lower(
    unit: &Unit,
    types: &dyn TypeOracle,
    options: &LowerOptions,
) -> Result<Program, LowerError> {
    let mut g = Gen::new(types, options);
    g.lower_program(unit)?;
    let program = g.finish();
    debug!(
        functions = program.functions.len(),
        instrs = program.functions.iter().map(|f| f.instrs.len()).sum::<usize>(),
        "lowering finished"
    );
    Ok(program)
}
