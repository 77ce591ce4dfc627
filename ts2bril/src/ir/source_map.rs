//! Instruction provenance.
//!
//! Every instruction the generator emits is tagged with the AST node (and,
//! inside `if`/`for`, the structural component) it was lowered from. Once the
//! parser's spans are attached, each tag can be resolved to a source position.

use std::collections::HashMap;

use super::ast::AstSpanRecord;

/// Position of an instruction inside a program: (function index, instruction index).
pub type InstrLocation = (usize, usize);

#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    /// Indexed by function, then instruction
    mappings: Vec<Vec<Vec<AstMapping>>>,
    nodes: HashMap<AstNodeId, AstSpanInfo>,
    index: Option<SourceIndex>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(&mut self, at: InstrLocation, mapping: AstMapping) {
        let (func, instr) = at;
        if self.mappings.len() <= func {
            self.mappings.resize_with(func + 1, Vec::new);
        }
        let instrs = &mut self.mappings[func];
        if instrs.len() <= instr {
            instrs.resize_with(instr + 1, Vec::new);
        }
        instrs[instr].push(mapping);
    }

    pub fn get_mappings_for_instr(&self, at: InstrLocation) -> Vec<&AstMapping> {
        let (func, instr) = at;
        match self.mappings.get(func).and_then(|f| f.get(instr)) {
            Some(tags) => tags.iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn get_instrs_for_ast(&self, ast_id: AstNodeId) -> Vec<InstrLocation> {
        self.locations_where(|m| m.ast_node_id == ast_id)
    }

    pub fn get_instrs_for_component(&self, component: ControlFlowComponent) -> Vec<InstrLocation> {
        self.locations_where(|m| m.component == Some(component))
    }

    fn locations_where(&self, pred: impl Fn(&AstMapping) -> bool) -> Vec<InstrLocation> {
        let mut out = Vec::new();
        for (f, instrs) in self.mappings.iter().enumerate() {
            for (i, tags) in instrs.iter().enumerate() {
                if tags.iter().any(&pred) {
                    out.push((f, i));
                }
            }
        }
        out
    }

    /// Register the parser's node spans and stamp each mapping with its node's span.
    pub fn attach_spans(&mut self, source: &str, spans: &[AstSpanRecord]) {
        self.index = Some(SourceIndex::new(source));
        for s in spans {
            self.nodes.insert(
                s.id,
                AstSpanInfo {
                    id: s.id,
                    span: SourceSpan {
                        start: s.start,
                        end: s.end,
                    },
                    kind: s.kind,
                },
            );
        }
        for mapping in self.mappings.iter_mut().flatten().flatten() {
            if let Some(info) = self.nodes.get(&mapping.ast_node_id) {
                mapping.source_span = info.span;
            }
        }
    }

    pub fn get_ast_info_by_id(&self, id: AstNodeId) -> Option<&AstSpanInfo> {
        self.nodes.get(&id)
    }

    /// 1-based line and column where a node starts.
    pub fn position_of(&self, id: AstNodeId) -> Option<(usize, usize)> {
        let info = self.nodes.get(&id)?;
        let (line, col) = self.index.as_ref()?.line_col(info.span.start);
        Some((line + 1, col + 1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstNodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AstNodeKind {
    VarDecl,
    Declarator,
    If,
    For,
    While,
    Function,
    Param,
    Return,
    Block,
    ExprStmt,
    Empty,
    Number,
    BigInt,
    Bool,
    Str,
    Ident,
    Assign,
    Binary,
    Unary,
    Call,
    Member,
}

/// Which part of an `if`/`for` an instruction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFlowComponent {
    Condition,
    ThenBranch,
    ElseBranch,
    LoopInit,
    LoopBody,
    LoopUpdate,
    /// Labels, branches and jumps the construct adds around its parts
    ControlFlowGlue,
}

#[derive(Debug, Clone)]
pub struct AstMapping {
    pub ast_node_id: AstNodeId,
    pub description: String,
    pub component: Option<ControlFlowComponent>,
    /// Filled in by [`SourceMap::attach_spans`]
    pub source_span: SourceSpan,
}

impl AstMapping {
    pub fn new(ast_node_id: AstNodeId, description: String) -> Self {
        Self {
            ast_node_id,
            description,
            component: None,
            source_span: SourceSpan::default(),
        }
    }

    pub fn with_component(mut self, component: ControlFlowComponent) -> Self {
        self.component = Some(component);
        self
    }
}

/// Byte range `start..end` in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct AstSpanInfo {
    pub id: AstNodeId,
    pub span: SourceSpan,
    pub kind: AstNodeKind,
}

/// Line start offsets of a source text.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    line_starts: Vec<usize>,
}

impl SourceIndex {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { line_starts }
    }

    /// 0-based line and byte column of an offset.
    pub fn line_col(&self, byte: usize) -> (usize, usize) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= byte)
            .saturating_sub(1);
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        (line, byte.saturating_sub(start))
    }
}
