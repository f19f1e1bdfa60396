//! 编译流水线
//!
//! fold → lower → allocate → emit, one compilation unit at a time.

use crate::backend::emit_class;
use crate::error::CompileResult;
use crate::frontend::{Program, SymbolTable};
use crate::middle::fold::fold_program;
use crate::middle::ir::ClassUnit;
use crate::middle::lower::lower_program;
use crate::middle::regalloc::{allocate_class, AllocationMode};
use crate::util::config::CompilerConfig;
use anyhow::Context;
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Result of compiling one class
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Allocated IR
    pub unit: ClassUnit,
    /// Jasmin assembly
    pub jasmin: String,
}

impl Compilation {
    /// Textual IR, registers included
    pub fn ir(&self) -> String {
        self.unit.to_string()
    }
}

/// Compile a validated program, cataloging its symbols first
pub fn compile(
    program: &Program,
    config: &CompilerConfig,
) -> CompileResult<Compilation> {
    let symbols = SymbolTable::from_program(program);
    compile_with_symbols(program, &symbols, config)
}

/// Compile with a symbol table supplied by the semantic passes
pub fn compile_with_symbols(
    program: &Program,
    symbols: &SymbolTable,
    config: &CompilerConfig,
) -> CompileResult<Compilation> {
    info!("compiling class `{}`", program.class.name);

    let program = if config.fold_constants {
        debug!("folding constants");
        Cow::Owned(fold_program(program))
    } else {
        Cow::Borrowed(program)
    };

    let mut unit = lower_program(&program, symbols)?;
    allocate_class(&mut unit, AllocationMode::from(config.register_allocation))?;
    let jasmin = emit_class(&unit)?;

    debug!(
        "`{}`: {} methods, {} bytes of Jasmin",
        unit.name,
        unit.methods.len(),
        jasmin.len()
    );
    Ok(Compilation { unit, jasmin })
}

/// Read a JSON-encoded program
pub fn load_program(path: &Path) -> anyhow::Result<Program> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&source)
        .with_context(|| format!("Failed to decode program: {}", path.display()))
}

/// Compile the JSON-encoded program at `path`
pub fn compile_file(
    path: &Path,
    config: &CompilerConfig,
) -> anyhow::Result<Compilation> {
    debug!("compiling file {}", path.display());
    let program = load_program(path)?;
    compile(&program, config).with_context(|| format!("Failed to compile: {}", path.display()))
}
