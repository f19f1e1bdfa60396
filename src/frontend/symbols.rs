//! Symbol table catalog
//!
//! 由语义分析阶段填充，后端只读使用。`SymbolTable::from_program` 只是对已经
//! 通过校验的声明做编目，不做任何检查。

use crate::frontend::ast::{Program, SourceType, VarDecl};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declared signature and locals of one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSymbol {
    pub return_type: SourceType,
    pub params: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub is_static: bool,
}

/// Read-only class/method/field catalog with resolved types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    pub class_name: String,
    pub super_class: Option<String>,
    /// Dotted import paths
    pub imports: Vec<String>,
    pub fields: Vec<VarDecl>,
    pub methods: IndexMap<String, MethodSymbol>,
}

impl SymbolTable {
    /// Catalog the declarations of an already validated program
    pub fn from_program(program: &Program) -> Self {
        let class = &program.class;
        let methods = class
            .methods
            .iter()
            .map(|m| {
                (
                    m.name.clone(),
                    MethodSymbol {
                        return_type: m.return_type.clone(),
                        params: m.params.clone(),
                        locals: m.locals.clone(),
                        is_static: m.is_static,
                    },
                )
            })
            .collect();

        SymbolTable {
            class_name: class.name.clone(),
            super_class: class.extends.clone(),
            imports: program.imports.clone(),
            fields: class.fields.clone(),
            methods,
        }
    }

    pub fn method(
        &self,
        name: &str,
    ) -> Option<&MethodSymbol> {
        self.methods.get(name)
    }

    pub fn field(
        &self,
        name: &str,
    ) -> Option<&VarDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Simple (last segment) names of all imports
    pub fn imported_names(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .map(|path| path.rsplit('.').next().unwrap_or(path.as_str()))
    }

    /// Whether `name` denotes a class usable as a static call target
    pub fn is_class_name(
        &self,
        name: &str,
    ) -> bool {
        name == self.class_name || self.imported_names().any(|imported| imported == name)
    }
}
