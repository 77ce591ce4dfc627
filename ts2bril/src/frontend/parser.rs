//! Recursive-descent parser for the TypeScript subset.
//!
//! Every node gets a fresh [`AstNodeId`] and a byte span; the ids are what the
//! type checker keys its table on and what lowering errors point back to.

use super::lexer::{self, LexicalError, Token};
use crate::ir::ast::*;
use crate::ir::{AstNodeId, AstNodeKind};
use crate::CompileError;

type PResult<T> = Result<T, CompileError>;

/// Deepest statement or expression nesting the parser descends into.
const MAX_NESTING: usize = 128;

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(usize, Token, usize)>,
    pos: usize,
    depth: usize,
    ids: AstNodeIdGenerator,
    spans: SpanCollector,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Result<Self, LexicalError> {
        let tokens = lexer::tokenize(source)?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
            ids: AstNodeIdGenerator::new(),
            spans: SpanCollector::new(),
        })
    }

    pub fn into_spans(self) -> Vec<AstSpanRecord> {
        self.spans.into_vec()
    }

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.statement()?);
        }
        Ok(Program { statements })
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn statement(&mut self) -> PResult<Stmt> {
        self.nested(Self::statement_kind)
    }

    fn statement_kind(&mut self) -> PResult<Stmt> {
        match self.peek() {
            Some(Token::Let | Token::Const | Token::Var) => {
                let start = self.start();
                let stmt = self.var_declaration(start)?;
                self.consume_semicolon()?;
                Ok(stmt)
            }
            Some(Token::If) => self.if_statement(),
            Some(Token::For) => self.for_statement(),
            Some(Token::While) => self.while_statement(),
            Some(Token::Function) => self.function_declaration(),
            Some(Token::Return) => self.return_statement(),
            Some(Token::LBrace) => {
                let start = self.start();
                let statements = self.block()?;
                let id = self.finish(start, AstNodeKind::Block);
                Ok(Stmt::Block { id, statements })
            }
            Some(Token::Semicolon) => {
                let start = self.start();
                self.advance();
                let id = self.finish(start, AstNodeKind::Empty);
                Ok(Stmt::Empty { id })
            }
            _ => {
                let start = self.start();
                let expr = self.expression()?;
                self.consume_semicolon()?;
                let id = self.finish(start, AstNodeKind::ExprStmt);
                Ok(Stmt::ExprStmt { id, expr })
            }
        }
    }

    /// `let|const|var declarator (, declarator)*` without the trailing `;`
    fn var_declaration(&mut self, start: usize) -> PResult<Stmt> {
        let kind = match self.advance() {
            Some(Token::Let) => DeclKind::Let,
            Some(Token::Const) => DeclKind::Const,
            _ => DeclKind::Var,
        };

        let mut decls = Vec::new();
        loop {
            let decl_start = self.start();
            let name = self.expect_ident("expected variable name")?;
            let annotation = if self.eat(&Token::Colon) {
                Some(self.type_annotation()?)
            } else {
                None
            };
            let init = if self.eat(&Token::Assign) {
                Some(self.assignment()?)
            } else {
                None
            };
            let id = self.finish(decl_start, AstNodeKind::Declarator);
            decls.push(VarDeclarator {
                id,
                name,
                annotation,
                init,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        let id = self.finish(start, AstNodeKind::VarDecl);
        Ok(Stmt::VarDecl { id, kind, decls })
    }

    fn type_annotation(&mut self) -> PResult<String> {
        self.expect_ident("expected a type name")
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&Token::If, "expected 'if'")?;
        self.expect(&Token::LParen, "expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.expect(&Token::RParen, "expected ')' after if condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.eat(&Token::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        let id = self.finish(start, AstNodeKind::If);
        Ok(Stmt::If {
            id,
            condition,
            then_branch,
            else_branch,
        })
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&Token::For, "expected 'for'")?;
        self.expect(&Token::LParen, "expected '(' after 'for'")?;

        let init = match self.peek() {
            Some(Token::Semicolon) => None,
            Some(Token::Let | Token::Const | Token::Var) => {
                let init_start = self.start();
                Some(Box::new(self.var_declaration(init_start)?))
            }
            _ => {
                let init_start = self.start();
                let expr = self.expression()?;
                let id = self.finish(init_start, AstNodeKind::ExprStmt);
                Some(Box::new(Stmt::ExprStmt { id, expr }))
            }
        };
        self.expect(&Token::Semicolon, "expected ';' after for initializer")?;

        let condition = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Token::Semicolon, "expected ';' after for condition")?;

        let update = if self.check(&Token::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Token::RParen, "expected ')' after for clauses")?;

        let body = Box::new(self.statement()?);
        let id = self.finish(start, AstNodeKind::For);
        Ok(Stmt::For {
            id,
            init,
            condition,
            update,
            body,
        })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&Token::While, "expected 'while'")?;
        self.expect(&Token::LParen, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.expect(&Token::RParen, "expected ')' after while condition")?;
        let body = Box::new(self.statement()?);
        let id = self.finish(start, AstNodeKind::While);
        Ok(Stmt::While {
            id,
            condition,
            body,
        })
    }

    fn function_declaration(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&Token::Function, "expected 'function'")?;

        // The name is optional here; lowering rejects anonymous declarations.
        let name = match self.peek() {
            Some(Token::Ident(_)) => Some(self.expect_ident("expected function name")?),
            _ => None,
        };

        self.expect(&Token::LParen, "expected '(' before parameters")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let param_start = self.start();
                let param_name = self.expect_ident("expected parameter name")?;
                let annotation = if self.eat(&Token::Colon) {
                    Some(self.type_annotation()?)
                } else {
                    None
                };
                let id = self.finish(param_start, AstNodeKind::Param);
                params.push(Param {
                    id,
                    name: param_name,
                    annotation,
                });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "expected ')' after parameters")?;

        let return_type = if self.eat(&Token::Colon) {
            Some(self.type_annotation()?)
        } else {
            None
        };

        let body = if self.check(&Token::LBrace) {
            Some(self.block()?)
        } else {
            self.consume_semicolon()?;
            None
        };

        let id = self.finish(start, AstNodeKind::Function);
        Ok(Stmt::Function {
            id,
            name,
            params,
            return_type,
            body,
        })
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&Token::Return, "expected 'return'")?;
        let value = if self.statement_ends_here() {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume_semicolon()?;
        let id = self.finish(start, AstNodeKind::Return);
        Ok(Stmt::Return { id, value })
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(&Token::LBrace, "expected '{'")?;
        let mut statements = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.at_end() {
                return Err(self.error_here("Unexpected end of input. Expected '}'"));
            }
            statements.push(self.statement()?);
        }
        self.expect(&Token::RBrace, "expected '}'")?;
        Ok(statements)
    }

    /// Accept `;`, or an implied one before `}`, end of input, or a line break.
    fn consume_semicolon(&mut self) -> PResult<()> {
        if self.eat(&Token::Semicolon) || self.statement_ends_here() {
            return Ok(());
        }
        Err(self.error_here(format!("expected ';', found {}", self.describe_current())))
    }

    fn statement_ends_here(&self) -> bool {
        match self.tokens.get(self.pos) {
            None => true,
            Some((_, Token::Semicolon | Token::RBrace, _)) => true,
            Some((start, _, _)) => self.source[self.prev_end()..*start].contains('\n'),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    pub fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        self.nested(Self::assignment_level)
    }

    fn assignment_level(&mut self) -> PResult<Expr> {
        let start = self.start();
        let target = self.logical_or()?;
        if self.eat(&Token::Assign) {
            // Right-associative: a = b = c
            let value = self.assignment()?;
            let id = self.finish(start, AstNodeKind::Assign);
            return Ok(Expr::Assign {
                id,
                target: Box::new(target),
                value: Box::new(value),
            });
        }
        Ok(target)
    }

    fn logical_or(&mut self) -> PResult<Expr> {
        self.binary_level(Self::logical_and, &[(Token::OrOr, BinOp::Or)])
    }

    fn logical_and(&mut self) -> PResult<Expr> {
        self.binary_level(Self::equality, &[(Token::AndAnd, BinOp::And)])
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::relational,
            &[
                (Token::Eq, BinOp::Eq),
                (Token::StrictEq, BinOp::StrictEq),
                (Token::Neq, BinOp::Neq),
                (Token::StrictNeq, BinOp::StrictNeq),
            ],
        )
    }

    fn relational(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::additive,
            &[
                (Token::Lt, BinOp::Lt),
                (Token::Le, BinOp::Le),
                (Token::Gt, BinOp::Gt),
                (Token::Ge, BinOp::Ge),
            ],
        )
    }

    fn additive(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::multiplicative,
            &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)],
        )
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        self.binary_level(
            Self::unary,
            &[
                (Token::Star, BinOp::Mul),
                (Token::Slash, BinOp::Div),
                (Token::Percent, BinOp::Mod),
            ],
        )
    }

    /// One left-associative precedence level.
    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> PResult<Expr>,
        ops: &[(Token, BinOp)],
    ) -> PResult<Expr> {
        let start = self.start();
        let mut left = next(self)?;
        'level: loop {
            for (tok, op) in ops {
                if self.eat(tok) {
                    let right = next(self)?;
                    let id = self.finish(start, AstNodeKind::Binary);
                    left = Expr::Binary {
                        id,
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'level;
                }
            }
            return Ok(left);
        }
    }

    fn unary(&mut self) -> PResult<Expr> {
        self.nested(Self::prefix)
    }

    fn prefix(&mut self) -> PResult<Expr> {
        let start = self.start();
        let op = match self.peek() {
            Some(Token::Bang) => UnOp::Not,
            Some(Token::Minus) => UnOp::Neg,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        let id = self.finish(start, AstNodeKind::Unary);
        Ok(Expr::Unary {
            id,
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let start = self.start();
        let mut expr = self.primary()?;
        loop {
            if self.check(&Token::LParen) {
                let callee_source = self.source[start..self.prev_end()].to_string();
                self.advance();
                let mut args = Vec::new();
                if !self.check(&Token::RParen) {
                    loop {
                        args.push(self.assignment()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen, "expected ')' after call arguments")?;
                let id = self.finish(start, AstNodeKind::Call);
                expr = Expr::Call {
                    id,
                    callee: Box::new(expr),
                    callee_source,
                    args,
                };
            } else if self.eat(&Token::Dot) {
                let property = self.expect_ident("expected property name after '.'")?;
                let id = self.finish(start, AstNodeKind::Member);
                expr = Expr::Member {
                    id,
                    object: Box::new(expr),
                    property,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> PResult<Expr> {
        let start = self.start();
        let token = match self.advance() {
            Some(tok) => tok,
            None => {
                return Err(self.error_here("Unexpected end of input. Expected an expression"))
            }
        };

        match token {
            Token::Number(text) => {
                // Out-of-range literals parse to infinity, which JSON cannot carry
                let value = text
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| self.error_at(start, format!("invalid number '{text}'")))?;
                let id = self.finish(start, AstNodeKind::Number);
                Ok(Expr::Number(id, value))
            }
            Token::BigInt(text) => {
                let value: i64 = text.parse().map_err(|_| {
                    self.error_at(start, format!("BigInt literal '{text}n' does not fit in 64 bits"))
                })?;
                let id = self.finish(start, AstNodeKind::BigInt);
                Ok(Expr::BigInt(id, value))
            }
            Token::True => {
                let id = self.finish(start, AstNodeKind::Bool);
                Ok(Expr::Bool(id, true))
            }
            Token::False => {
                let id = self.finish(start, AstNodeKind::Bool);
                Ok(Expr::Bool(id, false))
            }
            Token::Str(s) => {
                let id = self.finish(start, AstNodeKind::Str);
                Ok(Expr::Str(id, s))
            }
            Token::Ident(name) => {
                let id = self.finish(start, AstNodeKind::Ident);
                Ok(Expr::Ident(id, name))
            }
            Token::LParen => {
                // Parentheses only group; no node of their own
                let inner = self.expression()?;
                self.expect(&Token::RParen, "expected ')'")?;
                Ok(inner)
            }
            other => Err(self.error_at(
                start,
                format!("Unexpected token '{other}'. Expected an expression"),
            )),
        }
    }

    /// Run one recursive production, failing instead of overflowing the stack.
    fn nested<T>(&mut self, production: fn(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here(format!(
                "nesting deeper than {MAX_NESTING} levels is not supported"
            )));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    // ── Token cursor ─────────────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, tok, _)| tok)
    }

    fn check(&self, tok: &Token) -> bool {
        self.peek() == Some(tok)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(_, tok, _)| tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.check(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Token, message: &str) -> PResult<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.error_here(format!("{message}, found {}", self.describe_current())))
        }
    }

    fn expect_ident(&mut self, message: &str) -> PResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error_here(format!("{message}, found {}", self.describe_current()))),
        }
    }

    /// Byte offset where the next token starts.
    fn start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(s, _, _)| *s)
            .unwrap_or(self.source.len())
    }

    /// Byte offset where the previously consumed token ends.
    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].2
        }
    }

    /// Allocate an id for a node spanning `start` up to the last consumed token.
    fn finish(&mut self, start: usize, kind: AstNodeKind) -> AstNodeId {
        let id = self.ids.next();
        let end = self.prev_end().max(start);
        self.spans.add(id, start, end, kind);
        id
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(tok) => format!("'{tok}'"),
            None => "end of input".to_string(),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> CompileError {
        self.error_at(self.start(), message)
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> CompileError {
        let (line, col) = lexer::line_col(self.source, position);
        CompileError::Parse {
            line,
            col,
            context: lexer::line_at(self.source, position),
            message: message.into(),
        }
    }
}
