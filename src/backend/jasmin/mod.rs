//! Jasmin 汇编生成
//!
//! Turns an allocated [`ClassUnit`] into Jasmin assembly text: the class
//! header, one `.field` line per field and one `.method` block per method.
//! Registers map 1:1 onto JVM local variable slots.

pub mod method;
pub mod opcode;
pub mod stack;


use crate::error::CompileResult;
use crate::middle::ir::{ClassUnit, Method};
use crate::middle::types::ClassResolver;
use tracing::debug;

pub use method::MethodWriter;

/// Class-level emission context
pub struct JasminEmitter<'a> {
    unit: &'a ClassUnit,
    resolver: ClassResolver,
}

impl<'a> JasminEmitter<'a> {
    pub fn new(unit: &'a ClassUnit) -> Self {
        Self {
            unit,
            resolver: ClassResolver::new(&unit.name, &unit.imports),
        }
    }

    /// Emit the whole class
    pub fn emit(&self) -> CompileResult<String> {
        let unit = self.unit;
        debug!("emitting Jasmin for `{}`", unit.name);

        let mut blocks = vec![format!(
            ".class public {}\n.super {}",
            unit.name,
            self.resolver.super_class(unit.super_class.as_deref())
        )];

        if !unit.fields.is_empty() {
            let fields: Vec<String> = unit
                .fields
                .iter()
                .map(|field| {
                    format!(
                        ".field private {} {}",
                        field.name,
                        self.resolver.descriptor(&field.ty)
                    )
                })
                .collect();
            blocks.push(fields.join("\n"));
        }

        // 没有构造器时补一个默认构造器
        if unit.constructor().is_none() {
            let constructor = Method::default_constructor(&unit.name, unit.super_class.as_deref());
            blocks.push(self.emit_method(&constructor)?);
        }

        for method in &unit.methods {
            blocks.push(self.emit_method(method)?);
        }

        let mut text = blocks.join("\n\n");
        text.push('\n');
        Ok(text)
    }

    pub fn emit_method(
        &self,
        method: &Method,
    ) -> CompileResult<String> {
        MethodWriter::new(self.unit, method, &self.resolver)?.emit()
    }
}

/// Emit `unit` as Jasmin text
pub fn emit_class(unit: &ClassUnit) -> CompileResult<String> {
    JasminEmitter::new(unit).emit()
}
