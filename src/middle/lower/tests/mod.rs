//! IR 降级测试

mod stmt;

use crate::frontend::ast::{ClassDecl, MethodDecl, Program, SourceType, Stmt, VarDecl};
use crate::frontend::symbols::SymbolTable;
use crate::middle::ir::{Instruction, Method};
use crate::middle::lower::lower_method;

/// 创建一个只有一个方法的程序
pub(super) fn program_with(
    method: MethodDecl,
    fields: Vec<VarDecl>,
    imports: &[&str],
) -> Program {
    Program {
        imports: imports.iter().map(|s| s.to_string()).collect(),
        class: ClassDecl {
            name: "Test".to_string(),
            extends: None,
            fields,
            methods: vec![method],
        },
    }
}

pub(super) fn method(
    name: &str,
    return_type: SourceType,
    params: Vec<VarDecl>,
    locals: Vec<VarDecl>,
    body: Vec<Stmt>,
) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        is_public: true,
        is_static: false,
        return_type,
        params,
        locals,
        body,
    }
}

/// 降级程序中的唯一方法
pub(super) fn lower_only(program: &Program) -> Method {
    let symbols = SymbolTable::from_program(program);
    lower_method(&symbols, &program.class.methods[0]).expect("lowering failed")
}

pub(super) fn labels(method: &Method) -> Vec<&str> {
    method
        .instructions
        .iter()
        .filter_map(|i| match i {
            Instruction::Label(name) => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

pub(super) fn position(
    method: &Method,
    pred: impl Fn(&Instruction) -> bool,
) -> usize {
    method
        .instructions
        .iter()
        .position(pred)
        .expect("instruction not found")
}
