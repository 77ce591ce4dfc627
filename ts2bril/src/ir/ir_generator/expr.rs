use super::context::{Gen, ValueHandle};
use crate::ir::ast::{BinOp, Expr};
use crate::ir::*;
use crate::{LowerError, LowerErrorKind};

/// Where a call expression sits, which decides the instruction it lowers to.
#[derive(Debug, Clone, Copy)]
pub enum CallSite<'d> {
    /// Directly under an expression statement: `foo(1);`
    Statement,
    /// Initializer of a declarator: `let x: number = foo(1);`
    Declaration { decl: AstNodeId, name: &'d str },
    /// Anywhere else inside an expression
    Nested,
}

impl<'a> Gen<'a> {
    pub fn lower_expr(&mut self, e: &Expr) -> Result<ValueHandle, LowerError> {
        self.with_ast_context(e.id(), None, |this| match e {
            Expr::Number(_, n) => Ok(this.emit_const(Type::Float, Literal::Float(*n))),

            Expr::BigInt(_, n) => Ok(this.emit_const(Type::Int, Literal::Int(*n))),

            Expr::Bool(_, b) => Ok(this.emit_const(Type::Bool, Literal::Bool(*b))),

            // Every read is a fresh copy, never the producer's name
            Expr::Ident(id, name) => {
                let ty = this.bril_type(*id)?;
                Ok(this.emit_value(ValueOp::Id, ty, vec![name.clone()]))
            }

            Expr::Assign { target, value, .. } => this.lower_assign(target, value),

            Expr::Binary {
                id,
                op,
                left,
                right,
            } => {
                let (opcode, ty) = opcode_for(*op).ok_or_else(|| {
                    this.make_error(
                        LowerErrorKind::UnsupportedOperator,
                        *id,
                        format!("operator '{}' has no Bril opcode", op.symbol()),
                    )
                })?;
                let l = this.lower_expr(left)?;
                let r = this.lower_expr(right)?;
                Ok(this.emit_value(opcode, ty, vec![l.name, r.name]))
            }

            Expr::Call {
                id,
                callee,
                callee_source,
                args,
            } => this
                .lower_call(*id, callee, callee_source, args, CallSite::Nested)?
                .ok_or_else(|| {
                    this.make_error(
                        LowerErrorKind::UnsupportedExpression,
                        *id,
                        "call produced no value",
                    )
                }),

            Expr::Str(id, _) => Err(this.make_error(
                LowerErrorKind::UnsupportedExpression,
                *id,
                "string literals cannot be lowered",
            )),
            Expr::Unary { id, op, .. } => Err(this.make_error(
                LowerErrorKind::UnsupportedExpression,
                *id,
                format!("unary operator {op:?} cannot be lowered"),
            )),
            Expr::Member { id, .. } => Err(this.make_error(
                LowerErrorKind::UnsupportedExpression,
                *id,
                "property access is only supported as a call target",
            )),
        })
    }

    /// `name = value`: the right side first, then a copy into the target's name.
    pub fn lower_assign(&mut self, target: &Expr, value: &Expr) -> Result<ValueHandle, LowerError> {
        let rhs = self.lower_expr(value)?;
        let (target_id, name) = match target {
            Expr::Ident(id, name) => (*id, name),
            other => {
                return Err(self.make_error(
                    LowerErrorKind::UnsupportedAssignmentTarget,
                    other.id(),
                    "only a bare identifier can be assigned to",
                ))
            }
        };
        let ty = self.bril_type(target_id)?;
        Ok(self.emit_value_into(name.clone(), ValueOp::Id, ty, vec![rhs.name], Vec::new()))
    }

    /// Lower a call. Arguments are evaluated left to right before anything else.
    /// Returns `None` only for a void call at statement level.
    pub fn lower_call(
        &mut self,
        id: AstNodeId,
        callee: &Expr,
        callee_source: &str,
        args: &[Expr],
        site: CallSite<'_>,
    ) -> Result<Option<ValueHandle>, LowerError> {
        self.with_ast_context(id, None, |this| {
            let mut values = Vec::with_capacity(args.len());
            for a in args {
                values.push(this.lower_expr(a)?.name);
            }

            if callee_source == this.options.print_builtin {
                this.emit_effect(EffectOp::Print, values, Vec::new(), Vec::new());
                // Expressions always produce a value
                return Ok(Some(this.emit_const(Type::Int, Literal::Int(0))));
            }

            let func = callee.callee_text().ok_or_else(|| {
                this.make_error(
                    LowerErrorKind::UnsupportedExpression,
                    callee.id(),
                    "call target must be a name",
                )
            })?;

            match site {
                CallSite::Statement => {
                    this.emit_effect(EffectOp::Call, values, vec![func], Vec::new());
                    Ok(None)
                }
                CallSite::Declaration { decl, name } => {
                    let ty = this.bril_type(decl)?;
                    Ok(Some(this.emit_value_into(
                        name.to_string(),
                        ValueOp::Call,
                        ty,
                        values,
                        vec![func],
                    )))
                }
                CallSite::Nested => Err(this.make_error(
                    LowerErrorKind::UnsupportedExpression,
                    id,
                    format!(
                        "call to '{func}' must be a statement or a declaration initializer"
                    ),
                )),
            }
        })
    }
}

/// Operator token → (opcode, result type).
pub fn opcode_for(op: BinOp) -> Option<(ValueOp, Type)> {
    let entry = match op {
        BinOp::Add => (ValueOp::Fadd, Type::Float),
        BinOp::Sub => (ValueOp::Fsub, Type::Float),
        BinOp::Mul => (ValueOp::Fmul, Type::Float),
        BinOp::Div => (ValueOp::Fdiv, Type::Float),
        BinOp::Lt => (ValueOp::Flt, Type::Bool),
        BinOp::Le => (ValueOp::Fle, Type::Bool),
        BinOp::Gt => (ValueOp::Fgt, Type::Bool),
        BinOp::Ge => (ValueOp::Fge, Type::Bool),
        BinOp::Eq | BinOp::StrictEq => (ValueOp::Feq, Type::Bool),
        BinOp::Mod | BinOp::Neq | BinOp::StrictNeq | BinOp::And | BinOp::Or => return None,
    };
    Some(entry)
}
