//! Bytecode back ends

pub mod jasmin;

pub use jasmin::{emit_class, JasminEmitter};
