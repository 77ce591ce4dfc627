use crate::ir::typeck::SourceType;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
}

#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub kind: SymbolKind,
    /// Variable type, or return type for functions
    pub ty: SourceType,
}

/// Lexically nested scopes, innermost last.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, SymbolInfo>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding only the global scope
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        // The global scope is never popped
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declare a symbol in the innermost scope. Redeclaration shadows and
    /// hands back the previous entry.
    pub fn declare(&mut self, name: String, info: SymbolInfo) -> Option<SymbolInfo> {
        self.scopes.last_mut()?.insert(name, info)
    }

    /// Look up a symbol, innermost scope first
    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn lookup_function(&self, name: &str) -> Option<&SymbolInfo> {
        self.lookup(name)
            .filter(|info| info.kind == SymbolKind::Function)
    }
}
