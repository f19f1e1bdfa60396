//! IR 降级
//!
//! 将语义分析后的类型化 AST 降级为三地址 IR。
//!
//! 每个方法使用独立的 [`LoweringContext`]：临时变量计数器、标签计数器和变量表都
//! 归该方法所有，不在方法之间共享。
//!
//! 表达式降级返回 `(结果操作数, 前置指令)`：前置指令必须在读取结果操作数之前执行。

mod expr;
mod stmt;

use crate::error::{CompileError, CompileResult};
use crate::frontend::ast::{MethodDecl, Program};
use crate::frontend::symbols::SymbolTable;
use crate::middle::ir::{
    ClassUnit, Instruction, Method, Operand, VarEntry, VarKind, VarTable, Variable, THIS,
};
use crate::middle::types::TypeTag;
use indexmap::IndexSet;
use tracing::{debug, trace};

/// Lowered expression: the result operand plus the instructions computing it
pub type Lowered = (Operand, Vec<Instruction>);

/// Storage an identifier resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Place {
    /// `this`, parameter, local or temporary
    Var(Variable),
    Field(Variable),
}

/// Per-method lowering state
pub struct LoweringContext<'a> {
    symbols: &'a SymbolTable,
    method_name: String,
    is_static: bool,
    vars: VarTable,
    next_temp: usize,
    next_label: usize,
}

impl<'a> LoweringContext<'a> {
    /// Context for `method`, with `this`, parameters and locals registered in
    /// declaration order
    pub fn new(
        symbols: &'a SymbolTable,
        method: &MethodDecl,
    ) -> Self {
        let mut vars = VarTable::new();
        if !method.is_static {
            vars.insert(
                THIS.to_string(),
                VarEntry::new(TypeTag::reference(&symbols.class_name), VarKind::This),
            );
        }
        for param in &method.params {
            vars.insert(
                param.name.clone(),
                VarEntry::new(TypeTag::from_source(&param.ty), VarKind::Parameter),
            );
        }
        for local in &method.locals {
            vars.insert(
                local.name.clone(),
                VarEntry::new(TypeTag::from_source(&local.ty), VarKind::Local),
            );
        }

        Self {
            symbols,
            method_name: method.name.clone(),
            is_static: method.is_static,
            vars,
            next_temp: 0,
            next_label: 0,
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Fresh `tmpN`, skipping names the source already uses
    pub fn fresh_temp(
        &mut self,
        ty: TypeTag,
    ) -> Variable {
        loop {
            let name = format!("tmp{}", self.next_temp);
            self.next_temp += 1;
            if !self.vars.contains_key(&name) && self.symbols.field(&name).is_none() {
                self.vars
                    .insert(name.clone(), VarEntry::new(ty.clone(), VarKind::Temporary));
                return Variable::new(&name, ty);
            }
        }
    }

    /// Monotonic per-method label id; every construct that needs labels takes one
    pub fn fresh_label_id(&mut self) -> usize {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    pub(crate) fn this_var(&self) -> CompileResult<Variable> {
        if self.is_static {
            return Err(CompileError::lookup(&self.method_name, THIS));
        }
        Ok(Variable::this(&self.symbols.class_name))
    }

    /// Locals and parameters shadow fields
    pub(crate) fn resolve(
        &self,
        name: &str,
    ) -> Option<Place> {
        if let Some(entry) = self.vars.get(name) {
            return Some(Place::Var(Variable::new(name, entry.ty.clone())));
        }
        if self.is_static {
            return None;
        }
        self.symbols
            .field(name)
            .map(|field| Place::Field(Variable::new(&field.name, TypeTag::from_source(&field.ty))))
    }

    pub(crate) fn resolve_or_fail(
        &self,
        name: &str,
    ) -> CompileResult<Place> {
        self.resolve(name)
            .ok_or_else(|| CompileError::lookup(&self.method_name, name))
    }

    fn finish(
        self,
        method: &MethodDecl,
        instructions: Vec<Instruction>,
    ) -> Method {
        Method {
            name: method.name.clone(),
            is_public: method.is_public,
            is_static: method.is_static,
            is_constructor: false,
            params: method
                .params
                .iter()
                .map(|p| Variable::new(&p.name, TypeTag::from_source(&p.ty)))
                .collect(),
            return_type: TypeTag::from_source(&method.return_type),
            instructions,
            vars: self.vars,
        }
    }
}

/// Lower one method
pub fn lower_method(
    symbols: &SymbolTable,
    method: &MethodDecl,
) -> CompileResult<Method> {
    debug!("lowering method `{}`", method.name);
    let mut ctx = LoweringContext::new(symbols, method);

    let mut instructions = Vec::new();
    for stmt in &method.body {
        instructions.extend(ctx.lower_stmt(stmt)?);
    }

    let mut instructions = drop_unused_labels(instructions);

    let return_type = TypeTag::from_source(&method.return_type);
    if return_type.is_void() && !matches!(instructions.last(), Some(Instruction::Return(_))) {
        instructions.push(Instruction::Return(None));
    }

    let lowered = ctx.finish(method, instructions);
    lowered.validate()?;
    trace!(
        "`{}` lowered to {} instructions, {} variables",
        lowered.name,
        lowered.instructions.len(),
        lowered.vars.len()
    );
    Ok(lowered)
}

/// Remove labels nothing jumps to, such as the end of an if whose branches both return
fn drop_unused_labels(instructions: Vec<Instruction>) -> Vec<Instruction> {
    let targets: IndexSet<&str> = instructions
        .iter()
        .filter_map(Instruction::jump_target)
        .collect();
    let keep: Vec<bool> = instructions
        .iter()
        .map(|instr| match instr {
            Instruction::Label(name) => targets.contains(name.as_str()),
            _ => true,
        })
        .collect();
    instructions
        .into_iter()
        .zip(keep)
        .filter_map(|(instr, keep)| keep.then_some(instr))
        .collect()
}

/// Lower a whole compilation unit; the default constructor comes first
pub fn lower_program(
    program: &Program,
    symbols: &SymbolTable,
) -> CompileResult<ClassUnit> {
    let class = &program.class;
    debug!("lowering class `{}` ({} methods)", class.name, class.methods.len());

    let mut methods = vec![Method::default_constructor(
        &class.name,
        class.extends.as_deref(),
    )];
    for method in &class.methods {
        methods.push(lower_method(symbols, method)?);
    }

    Ok(ClassUnit {
        name: class.name.clone(),
        super_class: class.extends.clone(),
        imports: program.imports.clone(),
        fields: class
            .fields
            .iter()
            .map(|f| Variable::new(&f.name, TypeTag::from_source(&f.ty)))
            .collect(),
        methods,
    })
}

#[cfg(test)]
mod tests;
