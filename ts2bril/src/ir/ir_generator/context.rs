use tracing::trace;

use crate::ir::typeck::TypeOracle;
use crate::ir::*;
use crate::{LowerError, LowerErrorKind};

use super::LowerOptions;

/// Transient result of lowering an expression: the name holding the value and its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueHandle {
    pub name: String,
    pub ty: Type,
}

impl ValueHandle {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Cursor to the function instructions are currently emitted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionCtx {
    pub index: usize,
}

pub struct Gen<'a> {
    pub out: Program,
    /// Shared by temporaries and label suffixes for the whole run
    pub fresh_count: usize,
    pub types: &'a dyn TypeOracle,
    pub options: &'a LowerOptions,
    pub current_ast_node: Option<(AstNodeId, Option<ControlFlowComponent>)>,
    pub parent_component: Option<ControlFlowComponent>,
    pub fn_ctx: FunctionCtx,
}

impl<'a> Gen<'a> {
    /// A fresh context whose current function is the implicit `main`.
    pub fn new(types: &'a dyn TypeOracle, options: &'a LowerOptions) -> Self {
        let mut out = Program::new();
        out.functions.push(Function::new("main", Vec::new(), None));
        Self {
            out,
            fresh_count: 0,
            types,
            options,
            current_ast_node: None,
            parent_component: None,
            fn_ctx: FunctionCtx { index: 0 },
        }
    }

    pub fn finish(self) -> Program {
        self.out
    }

    fn next_fresh(&mut self) -> usize {
        let n = self.fresh_count;
        self.fresh_count += 1;
        n
    }

    pub fn fresh_var(&mut self) -> String {
        format!("v{}", self.next_fresh())
    }

    /// `.N`, appended to a structural label prefix such as `then` or `for.cond`.
    pub fn fresh_suffix(&mut self) -> String {
        format!(".{}", self.next_fresh())
    }

    /// Start a new function and make it current. Returns the cursor to restore afterwards.
    pub fn open_function(
        &mut self,
        name: &str,
        args: Vec<Argument>,
        return_type: Option<Type>,
    ) -> FunctionCtx {
        self.out
            .functions
            .push(Function::new(name, args, return_type));
        let prev = self.fn_ctx;
        self.fn_ctx = FunctionCtx {
            index: self.out.functions.len() - 1,
        };
        prev
    }

    pub fn restore_function(&mut self, prev: FunctionCtx) {
        self.fn_ctx = prev;
    }

    pub fn current_function(&self) -> &Function {
        &self.out.functions[self.fn_ctx.index]
    }

    pub fn emit(&mut self, i: Instr) {
        let func_index = self.fn_ctx.index;
        let instrs = &mut self.out.functions[func_index].instrs;
        let instr_index = instrs.len();
        trace!(function = func_index, "emit {}", i);
        instrs.push(i);

        if let Some((ast_id, component)) = self.current_ast_node {
            let description =
                self.generate_description(&self.out.functions[func_index].instrs[instr_index]);
            let mut mapping = AstMapping::new(ast_id, description);
            if let Some(comp) = component.or(self.parent_component) {
                mapping = mapping.with_component(comp);
            }
            self.out
                .source_map
                .add_mapping((func_index, instr_index), mapping);
        }
    }

    pub fn emit_label(&mut self, name: &str) {
        self.emit(Instr::Label {
            name: name.to_string(),
        });
    }

    /// `v<N>: ty = const value`
    pub fn emit_const(&mut self, ty: Type, value: Literal) -> ValueHandle {
        let dest = self.fresh_var();
        self.emit(Instr::Constant {
            dest: dest.clone(),
            ty,
            value,
        });
        ValueHandle::new(dest, ty)
    }

    /// `v<N>: ty = op args...` into a fresh temporary
    pub fn emit_value(&mut self, op: ValueOp, ty: Type, args: Vec<String>) -> ValueHandle {
        let dest = self.fresh_var();
        self.emit_value_into(dest, op, ty, args, Vec::new())
    }

    /// `dest: ty = op args...` into a caller-chosen name
    pub fn emit_value_into(
        &mut self,
        dest: String,
        op: ValueOp,
        ty: Type,
        args: Vec<String>,
        funcs: Vec<String>,
    ) -> ValueHandle {
        self.emit(Instr::Value {
            op,
            dest: dest.clone(),
            ty,
            args,
            funcs,
        });
        ValueHandle::new(dest, ty)
    }

    pub fn emit_effect(
        &mut self,
        op: EffectOp,
        args: Vec<String>,
        funcs: Vec<String>,
        labels: Vec<String>,
    ) {
        self.emit(Instr::Effect {
            op,
            args,
            funcs,
            labels,
        });
    }

    /// Ask the oracle for a node's Bril type.
    pub fn bril_type(&self, node: AstNodeId) -> Result<Type, LowerError> {
        self.types.bril_type(node)
    }

    pub fn make_error(
        &self,
        kind: LowerErrorKind,
        node: AstNodeId,
        message: impl Into<String>,
    ) -> LowerError {
        LowerError::new(kind, node, message)
    }

    pub fn generate_description(&self, instr: &Instr) -> String {
        match instr {
            Instr::Label { name } => format!("Label: {name}"),
            Instr::Constant { dest, .. } => format!("Constant into {dest}"),
            Instr::Value {
                op: ValueOp::Id,
                dest,
                ..
            } => format!("Copy into {dest}"),
            Instr::Value {
                op: ValueOp::Call,
                dest,
                funcs,
                ..
            } => format!("Call {} into {dest}", funcs.join(", ")),
            Instr::Value { op, dest, .. } => format!("{op} into {dest}"),
            Instr::Effect { op: EffectOp::Br, .. } => "Conditional branch".to_string(),
            Instr::Effect {
                op: EffectOp::Jmp, ..
            } => "Unconditional jump".to_string(),
            Instr::Effect {
                op: EffectOp::Call,
                funcs,
                ..
            } => format!("Call {}", funcs.join(", ")),
            Instr::Effect {
                op: EffectOp::Print,
                ..
            } => "Print".to_string(),
            Instr::Effect { op: EffectOp::Ret, .. } => "Return".to_string(),
            Instr::Effect { op, .. } => op.to_string(),
        }
    }

    pub fn with_ast_context<F, R>(
        &mut self,
        ast_id: AstNodeId,
        component: Option<ControlFlowComponent>,
        f: F,
    ) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let prev = self.current_ast_node;
        self.current_ast_node = Some((ast_id, component));
        let result = f(self);
        self.current_ast_node = prev;
        result
    }

    /// Context for the labels, branches and jumps a construct wraps around its parts.
    pub fn glue<F, R>(&mut self, ast_id: AstNodeId, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.with_ast_context(ast_id, Some(ControlFlowComponent::ControlFlowGlue), f)
    }

    pub fn with_parent_component<F, R>(&mut self, component: ControlFlowComponent, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let prev = self.parent_component;
        self.parent_component = Some(component);
        let result = f(self);
        self.parent_component = prev;
        result
    }
}
