//! Intermediate Representation (IR) and register allocation
//!
//! AST → three-address IR → liveness → virtual registers.

pub mod fold;
pub mod ir;
pub mod liveness;
pub mod lower;
pub mod regalloc;
pub mod types;

pub use ir::{ClassUnit, Instruction, Method, Operand, Variable};
pub use lower::lower_program;
pub use regalloc::{allocate_class, AllocationMode};
pub use types::{ClassResolver, TypeTag};
