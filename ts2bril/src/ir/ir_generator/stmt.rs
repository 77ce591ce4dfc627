use tracing::debug;

use super::context::Gen;
use super::expr::CallSite;
use crate::ir::ast::{Expr, Param, Program, Stmt, VarDeclarator};
use crate::ir::*;
use crate::{LowerError, LowerErrorKind};

impl<'a> Gen<'a> {
    pub fn lower_program(&mut self, p: &Program) -> Result<(), LowerError> {
        self.emit_block(&p.statements)
    }

    pub fn lower_stmt(&mut self, s: &Stmt) -> Result<(), LowerError> {
        match s {
            Stmt::VarDecl { decls, .. } => {
                for d in decls {
                    self.lower_declarator(d)?;
                }
                Ok(())
            }
            Stmt::ExprStmt { id, expr } => self.with_ast_context(*id, None, |this| {
                match expr {
                    Expr::Call {
                        id,
                        callee,
                        callee_source,
                        args,
                    } => {
                        this.lower_call(*id, callee, callee_source, args, CallSite::Statement)?;
                    }
                    other => {
                        this.lower_expr(other)?;
                    }
                }
                Ok(())
            }),
            Stmt::If {
                id,
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(*id, condition, then_branch, else_branch.as_deref()),
            Stmt::For {
                id,
                init,
                condition,
                update,
                body,
            } => self.lower_for(
                *id,
                init.as_deref(),
                condition.as_ref(),
                update.as_ref(),
                body,
            ),
            Stmt::Function {
                id,
                name,
                params,
                return_type,
                body,
            } => self.lower_function(
                *id,
                name.as_deref(),
                params,
                return_type.as_deref(),
                body.as_deref(),
            ),
            Stmt::Return { id, value } => self.with_ast_context(*id, None, |this| {
                match value {
                    Some(v) => {
                        let handle = this.lower_expr(v)?;
                        this.emit_effect(EffectOp::Ret, vec![handle.name], Vec::new(), Vec::new());
                    }
                    None => this.emit_effect(EffectOp::Ret, Vec::new(), Vec::new(), Vec::new()),
                }
                Ok(())
            }),
            Stmt::Block { statements, .. } => self.emit_block(statements),
            Stmt::While { id, .. } => Err(self.make_error(
                LowerErrorKind::UnsupportedStatement,
                *id,
                "while loops cannot be lowered",
            )),
            Stmt::Empty { id } => Err(self.make_error(
                LowerErrorKind::UnsupportedStatement,
                *id,
                "empty statements cannot be lowered",
            )),
        }
    }

    /// `name: T = init` becomes the initializer's instructions plus one copy into `name`.
    /// Without an initializer nothing is emitted.
    pub fn lower_declarator(&mut self, d: &VarDeclarator) -> Result<(), LowerError> {
        let Some(init) = &d.init else {
            return Ok(());
        };
        self.with_ast_context(d.id, None, |this| {
            let value = match init {
                Expr::Call {
                    id,
                    callee,
                    callee_source,
                    args,
                } => this
                    .lower_call(
                        *id,
                        callee,
                        callee_source,
                        args,
                        CallSite::Declaration {
                            decl: d.id,
                            name: &d.name,
                        },
                    )?
                    .ok_or_else(|| {
                        this.make_error(
                            LowerErrorKind::UnsupportedExpression,
                            *id,
                            "call produced no value",
                        )
                    })?,
                other => this.lower_expr(other)?,
            };
            let ty = this.bril_type(d.id)?;
            this.emit_value_into(d.name.clone(), ValueOp::Id, ty, vec![value.name], Vec::new());
            Ok(())
        })
    }

    pub fn lower_if(
        &mut self,
        ast_id: AstNodeId,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), LowerError> {
        let sfx = self.fresh_suffix();
        let then_label = format!("then{sfx}");
        let else_label = format!("else{sfx}");
        let end_label = format!("endif{sfx}");

        let c = self.with_parent_component(ControlFlowComponent::Condition, |this| {
            this.lower_expr(cond)
        })?;

        // Targets are (true, false), in that order
        self.glue(ast_id, |this| {
            this.emit_effect(
                EffectOp::Br,
                vec![c.name],
                Vec::new(),
                vec![then_label.clone(), else_label.clone()],
            );
            this.emit_label(&then_label);
        });

        self.with_parent_component(ControlFlowComponent::ThenBranch, |this| {
            this.lower_stmt(then_branch)
        })?;

        self.glue(ast_id, |this| {
            this.emit_effect(EffectOp::Jmp, Vec::new(), Vec::new(), vec![end_label.clone()]);
            this.emit_label(&else_label);
        });

        if let Some(blk) = else_branch {
            self.with_parent_component(ControlFlowComponent::ElseBranch, |this| {
                this.lower_stmt(blk)
            })?;
        }

        self.glue(ast_id, |this| this.emit_label(&end_label));
        Ok(())
    }

    pub fn lower_for(
        &mut self,
        ast_id: AstNodeId,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), LowerError> {
        let sfx = self.fresh_suffix();
        let cond_label = format!("for.cond{sfx}");
        let body_label = format!("for.body{sfx}");
        let end_label = format!("for.end{sfx}");

        if let Some(init) = init {
            self.with_parent_component(ControlFlowComponent::LoopInit, |this| {
                this.lower_stmt(init)
            })?;
        }

        self.glue(ast_id, |this| this.emit_label(&cond_label));

        // No condition: the body is reached by falling through
        if let Some(cond) = cond {
            let c = self.with_parent_component(ControlFlowComponent::Condition, |this| {
                this.lower_expr(cond)
            })?;
            self.glue(ast_id, |this| {
                this.emit_effect(
                    EffectOp::Br,
                    vec![c.name],
                    Vec::new(),
                    vec![body_label.clone(), end_label.clone()],
                )
            });
        }

        self.glue(ast_id, |this| this.emit_label(&body_label));

        self.with_parent_component(ControlFlowComponent::LoopBody, |this| this.lower_stmt(body))?;

        if let Some(update) = update {
            self.with_parent_component(ControlFlowComponent::LoopUpdate, |this| {
                this.lower_expr(update)
            })?;
        }

        self.glue(ast_id, |this| {
            this.emit_effect(EffectOp::Jmp, Vec::new(), Vec::new(), vec![cond_label.clone()]);
            this.emit_label(&end_label);
        });
        Ok(())
    }

    pub fn emit_block(&mut self, stmts: &[Stmt]) -> Result<(), LowerError> {
        for s in stmts {
            self.lower_stmt(s)?;
        }
        Ok(())
    }

    pub fn lower_function(
        &mut self,
        ast_id: AstNodeId,
        name: Option<&str>,
        params: &[Param],
        return_type: Option<&str>,
        body: Option<&[Stmt]>,
    ) -> Result<(), LowerError> {
        let name = name.ok_or_else(|| {
            self.make_error(
                LowerErrorKind::UnsupportedAnonymousFunction,
                ast_id,
                "function declarations must be named",
            )
        })?;
        // `main` is the implicit entry and is always present
        if self.out.functions.iter().any(|f| f.name == name) {
            let message = if name == "main" {
                "function 'main' is reserved for the entry".to_string()
            } else {
                format!("function '{name}' is already declared")
            };
            return Err(self.make_error(LowerErrorKind::UnsupportedStatement, ast_id, message));
        }

        let mut args = Vec::with_capacity(params.len());
        for p in params {
            args.push(Argument {
                name: p.name.clone(),
                ty: self.bril_type(p.id)?,
            });
        }
        let ret = self.resolve_return_type(ast_id, return_type)?;

        debug!(function = name, params = args.len(), "lowering function");
        let prev = self.open_function(name, args, ret);
        // A body starts outside any enclosing if/for component
        let outer_component = self.parent_component.take();
        self.with_ast_context(ast_id, None, |this| match body {
            Some(stmts) => this.emit_block(stmts),
            None => Ok(()),
        })?;
        self.parent_component = outer_component;
        debug!(
            function = name,
            instrs = self.current_function().instrs.len(),
            "function lowered"
        );
        self.restore_function(prev);
        Ok(())
    }

    /// Return-type text → Bril type. A missing annotation counts as `void`.
    pub fn resolve_return_type(
        &self,
        ast_id: AstNodeId,
        text: Option<&str>,
    ) -> Result<Option<Type>, LowerError> {
        match text.unwrap_or("void") {
            "void" => Ok(None),
            "number" => Ok(Some(Type::Int)),
            "boolean" => Ok(Some(Type::Bool)),
            other => Err(self.make_error(
                LowerErrorKind::UnsupportedReturnType,
                ast_id,
                format!("return type '{other}' is not one of void, number, boolean"),
            )),
        }
    }
}
