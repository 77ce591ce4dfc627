use crate::ir::ast::AstSpanRecord;
use crate::ir::SourceIndex;
use crate::{CompileError, LowerError};

/// Turn a lowering failure into a positioned compile error.
///
/// The node's span start is converted to a 1-based line and column. A node
/// without a recorded span reports `0:0`.
pub fn make_lower_error(err: LowerError, source: &str, spans: &[AstSpanRecord]) -> CompileError {
    let (line, col) = spans
        .iter()
        .find(|s| s.id == err.node)
        .map(|s| {
            let (l, c) = SourceIndex::new(source).line_col(s.start);
            (l + 1, c + 1)
        })
        .unwrap_or((0, 0));

    CompileError::Lower {
        kind: err.kind,
        line,
        col,
        message: err.message,
    }
}
