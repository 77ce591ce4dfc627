//! Structural checks over a lowered program.
//!
//! These are the shape guarantees the lowering makes: a well-formed `main`,
//! unique function names, labels defined once, branch targets that exist,
//! and every argument name defined before it is read (parameters count as
//! defined on entry). Callees are not resolved.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use super::{Function, Program};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("program has no main function")]
    MissingMain,

    #[error("main must take no parameters and return nothing")]
    BadMainSignature,

    #[error("function '{0}' is defined more than once")]
    DuplicateFunction(String),

    #[error("label '{label}' is defined more than once in @{function}")]
    DuplicateLabel { function: String, label: String },

    #[error("@{function}: instruction {index} targets undefined label '{label}'")]
    UndefinedLabel {
        function: String,
        index: usize,
        label: String,
    },

    #[error("@{function}: instruction {index} reads '{name}' before it is defined")]
    UndefinedVariable {
        function: String,
        index: usize,
        name: String,
    },
}

pub fn verify_program(program: &Program) -> Result<(), VerifyError> {
    let main = program.main().ok_or(VerifyError::MissingMain)?;
    if !main.args.is_empty() || main.return_type.is_some() {
        return Err(VerifyError::BadMainSignature);
    }

    let mut seen = HashSet::new();
    for f in &program.functions {
        if !seen.insert(f.name.as_str()) {
            return Err(VerifyError::DuplicateFunction(f.name.clone()));
        }
        verify_function(f)?;
    }
    debug!(functions = program.functions.len(), "program verified");
    Ok(())
}

pub fn verify_function(func: &Function) -> Result<(), VerifyError> {
    let mut labels = HashSet::new();
    for instr in &func.instrs {
        if let Some(name) = instr.label_name() {
            if !labels.insert(name) {
                return Err(VerifyError::DuplicateLabel {
                    function: func.name.clone(),
                    label: name.to_string(),
                });
            }
        }
    }

    let mut defined: HashSet<&str> = func.args.iter().map(|a| a.name.as_str()).collect();
    for (index, instr) in func.instrs.iter().enumerate() {
        if let Some(label) = instr.labels().iter().find(|l| !labels.contains(l.as_str())) {
            return Err(VerifyError::UndefinedLabel {
                function: func.name.clone(),
                index,
                label: label.clone(),
            });
        }
        if let Some(name) = instr.args().iter().find(|a| !defined.contains(a.as_str())) {
            return Err(VerifyError::UndefinedVariable {
                function: func.name.clone(),
                index,
                name: name.clone(),
            });
        }
        if let Some(dest) = instr.dest() {
            defined.insert(dest);
        }
    }
    Ok(())
}
