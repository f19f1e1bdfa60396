//! jmmc: a J-- compiler backend
//!
//! Lowers a typed AST of a small Java subset into a three-address IR, assigns
//! virtual registers by liveness-driven graph coloring and emits Jasmin
//! assembly for the JVM.
//!
//! # Example
//!
//! ```no_run
//! use jmmc::{compile_file, util::config::CompilerConfig, Result};
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let compilation = compile_file(Path::new("Simple.json"), &CompilerConfig::default())?;
//!     print!("{}", compilation.jasmin);
//!     Ok(())
//! }
//! ```

#![warn(rust_2018_idioms)]

pub mod backend;
pub mod driver;
pub mod error;
pub mod frontend;
pub mod middle;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use driver::{compile, compile_file, compile_with_symbols, load_program, Compilation};
pub use error::{CompileError, CompileResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tool name
pub const NAME: &str = "jmmc (J-- compiler backend)";
