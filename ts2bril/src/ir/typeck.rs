//! Type oracle.
//!
//! Lowering never infers types; it asks a [`TypeOracle`] for the type of the
//! node an instruction's annotation comes from. [`check_program`] builds the
//! table the oracle answers from: one [`SourceType`] per expression,
//! declarator, parameter and function node.

use std::collections::HashMap;
use std::fmt;

use crate::ir::ast::{BinOp, Expr, Program, Stmt, UnOp};
use crate::ir::ir_generator::LowerOptions;
use crate::ir::symbol_table::{SymbolInfo, SymbolKind, SymbolTable};
use crate::ir::{AstNodeId, Type};
use crate::{LowerError, LowerErrorKind};

/// A type as written or inferred in the source language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceType {
    Number,
    BigInt,
    Boolean,
    String,
    Void,
    Named(String),
    Unknown,
}

impl SourceType {
    pub fn from_annotation(text: &str) -> Self {
        match text {
            "number" => SourceType::Number,
            "bigint" => SourceType::BigInt,
            "boolean" => SourceType::Boolean,
            "string" => SourceType::String,
            "void" => SourceType::Void,
            other => SourceType::Named(other.to_string()),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Number => write!(f, "number"),
            SourceType::BigInt => write!(f, "bigint"),
            SourceType::Boolean => write!(f, "boolean"),
            SourceType::String => write!(f, "string"),
            SourceType::Void => write!(f, "void"),
            SourceType::Named(name) => write!(f, "{name}"),
            SourceType::Unknown => write!(f, "unknown"),
        }
    }
}

pub trait TypeOracle {
    /// The source-level type recorded for a node, if any.
    fn source_type(&self, node: AstNodeId) -> Option<&SourceType>;

    /// The Bril type of a node: `int` for number/bigint, `bool` for boolean.
    fn bril_type(&self, node: AstNodeId) -> Result<Type, LowerError> {
        match self.source_type(node) {
            Some(SourceType::Number | SourceType::BigInt) => Ok(Type::Int),
            Some(SourceType::Boolean) => Ok(Type::Bool),
            other => {
                let shown = other.map_or_else(|| "unknown".to_string(), |t| t.to_string());
                Err(LowerError::new(
                    LowerErrorKind::UnsupportedType,
                    node,
                    format!("type '{shown}' has no Bril equivalent"),
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<AstNodeId, SourceType>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: AstNodeId, ty: SourceType) {
        self.types.insert(node, ty);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeOracle for TypeTable {
    fn source_type(&self, node: AstNodeId) -> Option<&SourceType> {
        self.types.get(&node)
    }
}

/// Record a type for every node the lowering may ask about.
pub fn check_program(program: &Program, options: &LowerOptions) -> TypeTable {
    let mut checker = Checker {
        table: TypeTable::new(),
        symbols: SymbolTable::new(),
        print_builtin: &options.print_builtin,
    };
    checker.check_block(&program.statements);
    checker.table
}

struct Checker<'o> {
    table: TypeTable,
    symbols: SymbolTable,
    print_builtin: &'o str,
}

impl<'o> Checker<'o> {
    fn check_block(&mut self, stmts: &[Stmt]) {
        // First pass: hoist function declarations so calls may precede them
        for s in stmts {
            if let Stmt::Function {
                name: Some(name),
                return_type,
                ..
            } = s
            {
                let ty = return_type
                    .as_deref()
                    .map_or(SourceType::Void, SourceType::from_annotation);
                self.symbols.declare(
                    name.clone(),
                    SymbolInfo {
                        kind: SymbolKind::Function,
                        ty,
                    },
                );
            }
        }

        // Second pass: statements in order
        for s in stmts {
            self.check_stmt(s);
        }
    }

    fn check_stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::VarDecl { decls, .. } => {
                for d in decls {
                    let init_ty = d.init.as_ref().map(|e| self.check_expr(e));
                    let ty = match (&d.annotation, init_ty) {
                        (Some(text), _) => SourceType::from_annotation(text),
                        (None, Some(t)) => t,
                        (None, None) => SourceType::Unknown,
                    };
                    self.table.insert(d.id, ty.clone());
                    self.symbols.declare(
                        d.name.clone(),
                        SymbolInfo {
                            kind: SymbolKind::Variable,
                            ty,
                        },
                    );
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(condition);
                self.scoped(|this| this.check_stmt(then_branch));
                if let Some(else_branch) = else_branch {
                    self.scoped(|this| this.check_stmt(else_branch));
                }
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
                ..
            } => self.scoped(|this| {
                if let Some(init) = init {
                    this.check_stmt(init);
                }
                if let Some(cond) = condition {
                    this.check_expr(cond);
                }
                if let Some(update) = update {
                    this.check_expr(update);
                }
                this.check_stmt(body);
            }),
            Stmt::While {
                condition, body, ..
            } => {
                self.check_expr(condition);
                self.scoped(|this| this.check_stmt(body));
            }
            Stmt::Function {
                id,
                params,
                return_type,
                body,
                ..
            } => {
                let ret = return_type
                    .as_deref()
                    .map_or(SourceType::Void, SourceType::from_annotation);
                self.table.insert(*id, ret);

                self.scoped(|this| {
                    for p in params {
                        let ty = p
                            .annotation
                            .as_deref()
                            .map_or(SourceType::Unknown, SourceType::from_annotation);
                        this.table.insert(p.id, ty.clone());
                        this.symbols.declare(
                            p.name.clone(),
                            SymbolInfo {
                                kind: SymbolKind::Variable,
                                ty,
                            },
                        );
                    }
                    if let Some(body) = body {
                        this.check_block(body);
                    }
                });
            }
            Stmt::Return { value, .. } => {
                if let Some(v) = value {
                    self.check_expr(v);
                }
            }
            Stmt::Block { statements, .. } => self.scoped(|this| this.check_block(statements)),
            Stmt::ExprStmt { expr, .. } => {
                self.check_expr(expr);
            }
            Stmt::Empty { .. } => {}
        }
    }

    fn check_expr(&mut self, e: &Expr) -> SourceType {
        let ty = match e {
            Expr::Number(..) => SourceType::Number,
            Expr::BigInt(..) => SourceType::BigInt,
            Expr::Bool(..) => SourceType::Boolean,
            Expr::Str(..) => SourceType::String,
            Expr::Ident(_, name) => match self.symbols.lookup(name) {
                Some(info) if info.kind == SymbolKind::Variable => info.ty.clone(),
                _ => SourceType::Unknown,
            },
            Expr::Assign { target, value, .. } => {
                self.check_expr(target);
                self.check_expr(value)
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                let l = self.check_expr(left);
                let r = self.check_expr(right);
                match op {
                    BinOp::Add if l == SourceType::String || r == SourceType::String => {
                        SourceType::String
                    }
                    op if op.is_arithmetic() => {
                        if l == SourceType::BigInt {
                            SourceType::BigInt
                        } else {
                            SourceType::Number
                        }
                    }
                    BinOp::And | BinOp::Or => r,
                    _ => SourceType::Boolean,
                }
            }
            Expr::Unary { op, operand, .. } => {
                let inner = self.check_expr(operand);
                match op {
                    UnOp::Not => SourceType::Boolean,
                    UnOp::Neg => inner,
                }
            }
            Expr::Call {
                callee,
                callee_source,
                args,
                ..
            } => {
                for a in args {
                    self.check_expr(a);
                }
                if *callee_source == self.print_builtin {
                    SourceType::Void
                } else {
                    match callee.callee_text().as_deref() {
                        Some(t) => self
                            .symbols
                            .lookup_function(t)
                            .map_or(SourceType::Unknown, |info| info.ty.clone()),
                        None => {
                            self.check_expr(callee);
                            SourceType::Unknown
                        }
                    }
                }
            }
            Expr::Member { object, .. } => {
                self.check_expr(object);
                SourceType::Unknown
            }
        };
        self.table.insert(e.id(), ty.clone());
        ty
    }

    fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.symbols.enter_scope();
        let result = f(self);
        self.symbols.exit_scope();
        result
    }
}
