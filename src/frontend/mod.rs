//! Front-end contracts
//!
//! The parser and the semantic passes live outside this crate. This module only
//! holds what they hand to the backend: the typed AST and the symbol table.

pub mod ast;
pub mod symbols;

pub use ast::{BinOp, ClassDecl, Expr, ExprKind, MethodDecl, Program, SourceType, Stmt, UnOp, VarDecl};
pub use symbols::{MethodSymbol, SymbolTable};
