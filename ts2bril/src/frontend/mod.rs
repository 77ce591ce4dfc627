//! Front end: turns TypeScript-subset source text into the typed AST in
//! [`crate::ir::ast`].

pub mod lexer;
pub mod parser;
