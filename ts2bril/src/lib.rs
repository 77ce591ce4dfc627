pub mod frontend;
pub mod ir;
pub mod source;

use thiserror::Error;

pub use ir::AstNodeId;
pub use ir::ir_generator::LowerOptions;
pub use source::SourceSet;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lexical(#[from] frontend::lexer::LexicalError),

    #[error("Parse error ({line}:{col}): {message}\n  Context: {context}")]
    Parse {
        line: usize,
        col: usize,
        context: String,
        message: String,
    },

    #[error("{kind} ({line}:{col}) - {message}")]
    Lower {
        kind: LowerErrorKind,
        line: usize,
        col: usize,
        message: String,
    },

    #[error("SourceNotFound - no unit named '{name}' is loaded")]
    SourceNotFound { name: String },
}

/// A failed lowering, attributed to the AST node that could not be lowered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} - {message}")]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub node: AstNodeId,
    pub message: String,
}

impl LowerError {
    pub fn new(kind: LowerErrorKind, node: AstNodeId, message: impl Into<String>) -> Self {
        Self {
            kind,
            node,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LowerErrorKind {
    UnsupportedType,
    UnsupportedExpression,
    UnsupportedStatement,
    UnsupportedAssignmentTarget,
    UnsupportedOperator,
    UnsupportedAnonymousFunction,
    UnsupportedReturnType,
}

impl std::fmt::Display for LowerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LowerErrorKind::UnsupportedType => write!(f, "UnsupportedType"),
            LowerErrorKind::UnsupportedExpression => write!(f, "UnsupportedExpression"),
            LowerErrorKind::UnsupportedStatement => write!(f, "UnsupportedStatement"),
            LowerErrorKind::UnsupportedAssignmentTarget => {
                write!(f, "UnsupportedAssignmentTarget")
            }
            LowerErrorKind::UnsupportedOperator => write!(f, "UnsupportedOperator"),
            LowerErrorKind::UnsupportedAnonymousFunction => {
                write!(f, "UnsupportedAnonymousFunction")
            }
            LowerErrorKind::UnsupportedReturnType => write!(f, "UnsupportedReturnType"),
        }
    }
}

pub fn compile_to_ir(source: &str) -> Result<ir::Program, CompileError> {
    compile_with_options(source, &LowerOptions::default())
}

pub fn compile_with_options(
    source: &str,
    options: &LowerOptions,
) -> Result<ir::Program, CompileError> {
    let parsed = ir::ast::parse_to_ast(source)?;
    let types = ir::typeck::check_program(&parsed.program, options);

    let mut program = ir::ir_generator::lower(&parsed.program, &types, options)
        .map_err(|e| ir::error_utils::make_lower_error(e, source, &parsed.spans))?;

    // Attach node spans so instruction mappings resolve to source positions
    program.source_map.attach_spans(source, &parsed.spans);

    Ok(program)
}

/// Lower one unit out of a set of loaded sources.
pub fn compile_unit(
    sources: &SourceSet,
    name: &str,
    options: &LowerOptions,
) -> Result<ir::Program, CompileError> {
    let source = sources.get(name).ok_or_else(|| CompileError::SourceNotFound {
        name: name.to_string(),
    })?;
    compile_with_options(source, options)
}
