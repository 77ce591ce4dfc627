use crate::frontend::parser::Parser;
use crate::ir::{AstNodeId, AstNodeKind};
use crate::CompileError;

/// A translation unit: the root container of statements.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `let a: T = e, b = f;`: a declaration list
    VarDecl {
        id: AstNodeId,
        kind: DeclKind,
        decls: Vec<VarDeclarator>,
    },
    If {
        id: AstNodeId,
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `for (init; condition; update) body` with every header part optional
    For {
        id: AstNodeId,
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    While {
        id: AstNodeId,
        condition: Expr,
        body: Box<Stmt>,
    },
    /// Function declaration; `body` is absent for overload signatures
    Function {
        id: AstNodeId,
        name: Option<String>,
        params: Vec<Param>,
        return_type: Option<String>,
        body: Option<Vec<Stmt>>,
    },
    Return {
        id: AstNodeId,
        value: Option<Expr>,
    },
    Block {
        id: AstNodeId,
        statements: Vec<Stmt>,
    },
    /// Expression used as a statement (e.g., a call with ignored result)
    ExprStmt { id: AstNodeId, expr: Expr },
    /// A lone `;`
    Empty { id: AstNodeId },
}

impl Stmt {
    pub fn id(&self) -> AstNodeId {
        match self {
            Stmt::VarDecl { id, .. } => *id,
            Stmt::If { id, .. } => *id,
            Stmt::For { id, .. } => *id,
            Stmt::While { id, .. } => *id,
            Stmt::Function { id, .. } => *id,
            Stmt::Return { id, .. } => *id,
            Stmt::Block { id, .. } => *id,
            Stmt::ExprStmt { id, .. } => *id,
            Stmt::Empty { id } => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VarDeclarator {
    pub id: AstNodeId,
    pub name: String,
    pub annotation: Option<String>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: AstNodeId,
    pub name: String,
    pub annotation: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// Numeric literal such as `1` or `2.5`
    Number(AstNodeId, f64),
    /// BigInt literal such as `7n`
    BigInt(AstNodeId, i64),
    Bool(AstNodeId, bool),
    Str(AstNodeId, String),
    Ident(AstNodeId, String),
    Assign {
        id: AstNodeId,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        id: AstNodeId,
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        id: AstNodeId,
        op: UnOp,
        operand: Box<Expr>,
    },
    Call {
        id: AstNodeId,
        callee: Box<Expr>,
        /// Callee exactly as written, whitespace and all
        callee_source: String,
        args: Vec<Expr>,
    },
    /// Property access: `object.property`
    Member {
        id: AstNodeId,
        object: Box<Expr>,
        property: String,
    },
}

impl Expr {
    pub fn id(&self) -> AstNodeId {
        match self {
            Expr::Number(id, _) => *id,
            Expr::BigInt(id, _) => *id,
            Expr::Bool(id, _) => *id,
            Expr::Str(id, _) => *id,
            Expr::Ident(id, _) => *id,
            Expr::Assign { id, .. } => *id,
            Expr::Binary { id, .. } => *id,
            Expr::Unary { id, .. } => *id,
            Expr::Call { id, .. } => *id,
            Expr::Member { id, .. } => *id,
        }
    }

    /// Dotted source text of a name or property chain (`console.log`).
    /// Other expression shapes have no callee text.
    pub fn callee_text(&self) -> Option<String> {
        match self {
            Expr::Ident(_, name) => Some(name.clone()),
            Expr::Member {
                object, property, ..
            } => object
                .callee_text()
                .map(|base| format!("{base}.{property}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    StrictEq,
    Neq,
    StrictNeq,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::StrictEq => "===",
            BinOp::Neq => "!=",
            BinOp::StrictNeq => "!==",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,
    Neg,
}

/// Helper for generating unique AST node IDs during parsing
#[derive(Default)]
pub struct AstNodeIdGenerator {
    next_id: usize,
}

impl AstNodeIdGenerator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    pub fn next(&mut self) -> AstNodeId {
        let id = AstNodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// A record of an AST node's span in the source
#[derive(Debug, Clone)]
pub struct AstSpanRecord {
    pub id: AstNodeId,
    pub start: usize,
    pub end: usize,
    pub kind: AstNodeKind,
}

#[derive(Default)]
pub struct SpanCollector {
    spans: Vec<AstSpanRecord>,
}

impl SpanCollector {
    pub fn new() -> Self {
        Self { spans: Vec::new() }
    }
    pub fn add(&mut self, id: AstNodeId, start: usize, end: usize, kind: AstNodeKind) {
        self.spans.push(AstSpanRecord {
            id,
            start,
            end,
            kind,
        });
    }
    pub fn into_vec(self) -> Vec<AstSpanRecord> {
        self.spans
    }
}

/// Parsed AST along with span information for each node
pub struct ParsedAst {
    pub program: Program,
    pub spans: Vec<AstSpanRecord>,
}

pub fn parse_to_ast(source: &str) -> Result<ParsedAst, CompileError> {
    let mut parser = Parser::new(source)?;
    let program = parser.parse_program()?;
    Ok(ParsedAst {
        program,
        spans: parser.into_spans(),
    })
}
