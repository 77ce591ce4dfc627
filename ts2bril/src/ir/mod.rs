//! Intermediate Representation (IR) module.
//!
//! This module contains the Bril program definitions, the typed AST the
//! lowering consumes, the type oracle, the AST-to-Bril generator, source
//! mapping, and the structural helpers downstream consumers rely on.

pub mod ir;
pub use ir::*;
pub mod source_map;
pub use source_map::*;
pub mod ir_generator;
pub mod symbol_table;
pub mod typeck;
pub mod error_utils;
pub mod ast;
pub mod blocks;
pub mod verify;
