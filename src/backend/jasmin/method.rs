//! 方法体生成
//!
//! One [`MethodWriter`] holds the state of exactly one method while its
//! instructions are translated: the slot of every variable, the emitted lines
//! and the operand stack depth.

use super::opcode;
use super::stack::StackTracker;
use crate::error::{CompileError, CompileResult};
use crate::middle::ir::{
    BinaryOperator, ClassUnit, Condition, Instruction, InvokeKind, Method, Operand, UnaryOperator,
    VarKind, Variable, INIT, THIS,
};
use crate::middle::regalloc::sequential_registers;
use crate::middle::types::{ClassResolver, TypeTag};
use indexmap::IndexMap;
use tracing::trace;

pub struct MethodWriter<'a> {
    unit: &'a ClassUnit,
    method: &'a Method,
    resolver: &'a ClassResolver,
    /// Local variable slot of each name; dead temporaries are absent
    slots: IndexMap<String, u16>,
    code: Vec<String>,
    stack: StackTracker,
    next_label: usize,
}

impl<'a> MethodWriter<'a> {
    /// Fails when an allocated method reaches emission without registers
    pub fn new(
        unit: &'a ClassUnit,
        method: &'a Method,
        resolver: &'a ClassResolver,
    ) -> CompileResult<Self> {
        let slots = if method.needs_allocation() {
            if let Some((name, _)) = method
                .vars
                .iter()
                .find(|(_, entry)| entry.kind != VarKind::Temporary && entry.register.is_none())
            {
                return Err(CompileError::emit(
                    &method.name,
                    format!("no register assigned to `{}`", name),
                ));
            }
            method
                .vars
                .iter()
                .filter_map(|(name, entry)| entry.register.map(|r| (name.clone(), r)))
                .collect()
        } else {
            sequential_registers(method)
        };

        let mut writer = Self {
            unit,
            method,
            resolver,
            slots,
            code: Vec::new(),
            stack: StackTracker::new(),
            next_label: 0,
        };
        writer.place_unlisted();
        Ok(writer)
    }

    /// Names referenced by instructions but missing from the table get fresh
    /// slots after the allocated ones and keep their carried type
    fn place_unlisted(&mut self) {
        let method = self.method;
        for instr in &method.instructions {
            for var in instr.variables() {
                if var.name == THIS
                    || method.vars.contains_key(&var.name)
                    || self.slots.contains_key(&var.name)
                {
                    continue;
                }
                let slot = self.locals_limit();
                trace!(
                    "`{}`: `{}` is not in the variable table, placing it in slot {}",
                    method.name,
                    var.name,
                    slot
                );
                self.slots.insert(var.name.clone(), slot);
            }
        }
    }

    /// Value for `.limit locals`
    pub fn locals_limit(&self) -> u16 {
        let used = self.slots.values().map(|s| s + 1).max().unwrap_or(0);
        used.max(self.method.locals_limit())
    }

    pub fn max_stack(&self) -> u16 {
        self.stack.max()
    }

    /// Translate the whole method into a `.method` block
    pub fn emit(mut self) -> CompileResult<String> {
        let method = self.method;
        let instructions = &method.instructions;

        let mut idx = 0;
        while idx < instructions.len() {
            if let Some((dest, class, args)) = fused_constructor(instructions, idx) {
                self.emit_new_object(dest, class, args)?;
                idx += 2;
                continue;
            }
            self.emit_instruction(&instructions[idx])?;
            idx += 1;
        }
        if !method.return_type.is_void() && !instructions.last().is_some_and(Instruction::is_terminator) {
            self.emit_fallback_return();
        }

        trace!(
            "`{}`: stack {}, locals {}",
            method.name,
            self.max_stack(),
            self.locals_limit()
        );

        let mut lines = vec![
            self.header(),
            format!("    .limit stack {}", self.max_stack()),
            format!("    .limit locals {}", self.locals_limit()),
        ];
        lines.append(&mut self.code);
        lines.push(".end method".to_string());
        Ok(lines.join("\n"))
    }

    fn header(&self) -> String {
        let method = self.method;
        let descriptor = self
            .resolver
            .method_descriptor(method.params.iter().map(|p| &p.ty), &method.return_type);
        format!(
            ".method {}{}{}{}",
            if method.is_public { "public " } else { "private " },
            if method.is_static { "static " } else { "" },
            method.name,
            descriptor
        )
    }

    // =====================
    // 输出与栈
    // =====================

    fn line(
        &mut self,
        text: impl Into<String>,
    ) {
        self.code.push(format!("    {}", text.into()));
    }

    fn label(
        &mut self,
        name: &str,
    ) {
        self.code.push(format!("{}:", name));
    }

    fn fresh_label(
        &mut self,
        prefix: &str,
    ) -> String {
        let label = format!("{}_{}", prefix, self.next_label);
        self.next_label += 1;
        label
    }

    fn error(
        &self,
        detail: impl Into<String>,
    ) -> CompileError {
        CompileError::emit(&self.method.name, detail)
    }

    // =====================
    // 变量
    // =====================

    fn slot_of(
        &self,
        name: &str,
    ) -> Option<u16> {
        if name == THIS {
            return Some(0);
        }
        self.slots.get(name).copied()
    }

    /// Declared type, falling back to the type the operand carries
    fn type_of<'v>(
        &'v self,
        var: &'v Variable,
    ) -> &'v TypeTag {
        self.method
            .vars
            .get(&var.name)
            .map(|entry| &entry.ty)
            .unwrap_or(&var.ty)
    }

    fn load(
        &mut self,
        operand: &Operand,
    ) -> CompileResult<()> {
        match operand {
            Operand::Literal { value, .. } => {
                self.line(opcode::push_int(*value));
                self.stack.push(1);
                Ok(())
            }
            Operand::Variable(var) => self.load_var(var),
        }
    }

    fn load_var(
        &mut self,
        var: &Variable,
    ) -> CompileResult<()> {
        if var.name == THIS {
            self.line("aload_0");
            self.stack.push(1);
            return Ok(());
        }
        let slot = self
            .slot_of(&var.name)
            .ok_or_else(|| self.error(format!("`{}` is read but has no register", var.name)))?;
        let text = opcode::load(self.type_of(var), slot);
        self.line(text);
        self.stack.push(1);
        Ok(())
    }

    /// Store the top of the stack; a dead temporary just drops it
    fn store(
        &mut self,
        dest: &Variable,
    ) {
        let text = match self.slot_of(&dest.name) {
            Some(slot) => opcode::store(self.type_of(dest), slot),
            None => "pop".to_string(),
        };
        self.line(text);
        self.stack.pop(1);
    }

    // =====================
    // 指令
    // =====================

    fn emit_instruction(
        &mut self,
        instr: &Instruction,
    ) -> CompileResult<()> {
        match instr {
            Instruction::Assign { dest, rhs } => {
                let slot = self.slot_of(&dest.name);
                if let (Some(slot), Some(delta)) = (slot, increment(dest, rhs)) {
                    self.line(format!("iinc {} {}", slot, delta));
                    return Ok(());
                }
                // 合并后的复制
                if slot.is_some() && instr.as_copy().and_then(|(_, src)| self.slot_of(&src.name)) == slot {
                    return Ok(());
                }
                self.emit_value(rhs)?;
                self.store(dest);
                Ok(())
            }
            Instruction::Invoke {
                kind,
                receiver,
                class,
                method,
                args,
                ret,
            } => {
                self.emit_invoke(*kind, receiver.as_ref(), class, method, args, ret)?;
                if !ret.is_void() {
                    self.line("pop");
                    self.stack.pop(1);
                }
                Ok(())
            }
            Instruction::PutField {
                object,
                field,
                value,
            } => {
                let owner = self.field_owner(object)?;
                self.load(object)?;
                self.load(value)?;
                let descriptor = self.resolver.descriptor(&field.ty);
                self.line(format!("putfield {}/{} {}", owner, field.name, descriptor));
                self.stack.pop(2);
                Ok(())
            }
            Instruction::ArrayStore {
                array,
                index,
                value,
            } => {
                self.load_var(array)?;
                self.load(index)?;
                self.load(value)?;
                let elem = self.type_of(array).element().unwrap_or(value.ty()).clone();
                self.line(opcode::array_store(&elem));
                self.stack.pop(3);
                Ok(())
            }
            Instruction::Return(None) => {
                self.line("return");
                Ok(())
            }
            Instruction::Return(Some(value)) => {
                self.load(value)?;
                let ty = if self.method.return_type.is_void() {
                    value.ty().clone()
                } else {
                    self.method.return_type.clone()
                };
                self.line(opcode::return_op(&ty));
                self.stack.pop(1);
                Ok(())
            }
            Instruction::Label(name) => {
                self.label(name);
                Ok(())
            }
            Instruction::Goto(label) => {
                self.line(format!("goto {}", label));
                Ok(())
            }
            Instruction::CondBranch { cond, label } => self.emit_branch(cond, label),
            Instruction::BinaryOp { .. }
            | Instruction::UnaryOp { .. }
            | Instruction::SingleOp(_)
            | Instruction::NewObject { .. }
            | Instruction::NewArray { .. }
            | Instruction::GetField { .. }
            | Instruction::ArrayLoad { .. }
            | Instruction::ArrayLength { .. } => {
                Err(self.error(format!("value `{}` is not assigned", instr)))
            }
        }
    }

    /// Keeps a branch to the end of the method on a real instruction
    fn emit_fallback_return(&mut self) {
        let ty = self.method.return_type.clone();
        self.line(if ty.is_reference() { "aconst_null" } else { "iconst_0" });
        self.stack.push(1);
        self.line(opcode::return_op(&ty));
        self.stack.pop(1);
    }

    /// Code leaving exactly one value on the stack
    fn emit_value(
        &mut self,
        instr: &Instruction,
    ) -> CompileResult<()> {
        match instr {
            Instruction::BinaryOp { op, lhs, rhs, .. } => {
                self.load(lhs)?;
                self.load(rhs)?;
                match opcode::arithmetic(*op) {
                    Some(text) => {
                        self.line(text);
                        self.stack.pop(1);
                        Ok(())
                    }
                    None => self.emit_comparison_value(*op, lhs),
                }
            }
            Instruction::UnaryOp {
                op: UnaryOperator::Not,
                operand,
                ..
            } => {
                self.load(operand)?;
                self.line("iconst_1");
                self.stack.push(1);
                self.line("ixor");
                self.stack.pop(1);
                Ok(())
            }
            Instruction::SingleOp(operand) => self.load(operand),
            Instruction::NewObject { class } => {
                let class = self.resolver.qualify(class);
                self.line(format!("new {}", class));
                self.stack.push(1);
                Ok(())
            }
            Instruction::NewArray { length, elem } => {
                self.load(length)?;
                let text = match elem {
                    TypeTag::Int32 => "newarray int".to_string(),
                    TypeTag::Bool => "newarray boolean".to_string(),
                    TypeTag::Reference(name) => format!("anewarray {}", self.resolver.qualify(name)),
                    TypeTag::Array(_) => format!("anewarray {}", self.resolver.descriptor(elem)),
                    TypeTag::Void => return Err(self.error("array of void")),
                };
                self.line(text);
                Ok(())
            }
            Instruction::GetField { object, field } => {
                let owner = self.field_owner(object)?;
                self.load(object)?;
                let descriptor = self.resolver.descriptor(&field.ty);
                self.line(format!("getfield {}/{} {}", owner, field.name, descriptor));
                Ok(())
            }
            Instruction::Invoke {
                kind,
                receiver,
                class,
                method,
                args,
                ret,
            } => {
                if ret.is_void() {
                    return Err(self.error(format!("void call `{}` used as a value", method)));
                }
                self.emit_invoke(*kind, receiver.as_ref(), class, method, args, ret)
            }
            Instruction::ArrayLoad { array, index, ty } => {
                self.load_var(array)?;
                self.load(index)?;
                let elem = self.type_of(array).element().unwrap_or(ty).clone();
                self.line(opcode::array_load(&elem));
                self.stack.pop(1);
                Ok(())
            }
            Instruction::ArrayLength { array } => {
                self.load_var(array)?;
                self.line("arraylength");
                Ok(())
            }
            _ => Err(self.error(format!("`{}` does not produce a value", instr))),
        }
    }

    /// Both operands are on the stack; leaves 0 / 1
    fn emit_comparison_value(
        &mut self,
        op: BinaryOperator,
        lhs: &Operand,
    ) -> CompileResult<()> {
        let jump = self.compare_jump(op, lhs)?;
        let on_true = self.fresh_label("CMP_TRUE");
        let end = self.fresh_label("CMP_END");

        self.line(format!("{} {}", jump, on_true));
        self.stack.pop(2);
        self.line("iconst_0");
        self.stack.push(1);
        self.line(format!("goto {}", end));
        self.stack.pop(1);
        self.label(&on_true);
        self.line("iconst_1");
        self.stack.push(1);
        self.label(&end);
        Ok(())
    }

    /// `if_icmp<cc>` or, for references, `if_acmp<cc>`
    fn compare_jump(
        &self,
        op: BinaryOperator,
        lhs: &Operand,
    ) -> CompileResult<String> {
        let cc = opcode::condition_code(op)
            .ok_or_else(|| self.error(format!("`{}` is not a comparison", op.symbol())))?;
        if lhs.ty().is_reference() {
            if !matches!(op, BinaryOperator::Eq | BinaryOperator::Ne) {
                return Err(self.error(format!("ordered comparison `{}` of references", op.symbol())));
            }
            Ok(format!("if_acmp{}", cc))
        } else {
            Ok(format!("if_icmp{}", cc))
        }
    }

    fn emit_branch(
        &mut self,
        cond: &Condition,
        label: &str,
    ) -> CompileResult<()> {
        match cond {
            Condition::Single(operand) => {
                self.load(operand)?;
                self.line(format!("ifne {}", label));
                self.stack.pop(1);
            }
            Condition::Compare { op, lhs, rhs } => {
                if is_zero(rhs) && lhs.ty().is_int_like() {
                    let cc = opcode::condition_code(*op)
                        .ok_or_else(|| self.error(format!("`{}` is not a comparison", op.symbol())))?;
                    self.load(lhs)?;
                    self.line(format!("if{} {}", cc, label));
                    self.stack.pop(1);
                } else {
                    let jump = self.compare_jump(*op, lhs)?;
                    self.load(lhs)?;
                    self.load(rhs)?;
                    self.line(format!("{} {}", jump, label));
                    self.stack.pop(2);
                }
            }
        }
        Ok(())
    }

    fn emit_invoke(
        &mut self,
        kind: InvokeKind,
        receiver: Option<&Operand>,
        class: &str,
        name: &str,
        args: &[Operand],
        ret: &TypeTag,
    ) -> CompileResult<()> {
        if let Some(receiver) = receiver {
            self.load(receiver)?;
        }
        for arg in args {
            self.load(arg)?;
        }
        let opcode = match kind {
            InvokeKind::Virtual => "invokevirtual",
            InvokeKind::Static => "invokestatic",
            InvokeKind::Special => "invokespecial",
        };
        let owner = self.resolver.qualify(class);
        let descriptor = self.invoke_descriptor(class, name, args, ret);
        self.line(format!("{} {}/{}{}", opcode, owner, name, descriptor));

        self.stack.pop(args.len() as u16 + u16::from(receiver.is_some()));
        if !ret.is_void() {
            self.stack.push(1);
        }
        Ok(())
    }

    /// Declared signature for methods of this class, argument types otherwise
    fn invoke_descriptor(
        &self,
        class: &str,
        name: &str,
        args: &[Operand],
        ret: &TypeTag,
    ) -> String {
        let declared = (class == self.unit.name)
            .then(|| self.unit.method(name))
            .flatten()
            .filter(|target| target.params.len() == args.len());
        match declared {
            Some(target) => self
                .resolver
                .method_descriptor(target.params.iter().map(|p| &p.ty), &target.return_type),
            None => self.resolver.method_descriptor(args.iter().map(Operand::ty), ret),
        }
    }

    /// `new C; dup; invokespecial C/<init>; store`
    fn emit_new_object(
        &mut self,
        dest: &Variable,
        class: &str,
        args: &[Operand],
    ) -> CompileResult<()> {
        let owner = self.resolver.qualify(class);
        self.line(format!("new {}", owner));
        self.stack.push(1);
        self.line("dup");
        self.stack.push(1);
        for arg in args {
            self.load(arg)?;
        }
        let descriptor = self.invoke_descriptor(class, INIT, args, &TypeTag::Void);
        self.line(format!("invokespecial {}/{}{}", owner, INIT, descriptor));
        self.stack.pop(1 + args.len() as u16);
        self.store(dest);
        Ok(())
    }

    fn field_owner(
        &self,
        object: &Operand,
    ) -> CompileResult<String> {
        object
            .ty()
            .class_name()
            .map(|class| self.resolver.qualify(class))
            .ok_or_else(|| self.error(format!("field access on non-object `{}`", object)))
    }
}

/// `tmp := new C` immediately followed by `invokespecial tmp.<init>(..)`
fn fused_constructor(
    instructions: &[Instruction],
    idx: usize,
) -> Option<(&Variable, &str, &[Operand])> {
    let Instruction::Assign { dest, rhs } = instructions.get(idx)? else {
        return None;
    };
    let Instruction::NewObject { class } = rhs.as_ref() else {
        return None;
    };
    match instructions.get(idx + 1)? {
        Instruction::Invoke {
            kind: InvokeKind::Special,
            receiver: Some(Operand::Variable(receiver)),
            method,
            args,
            ..
        } if receiver.name == dest.name && method == INIT => Some((dest, class.as_str(), args.as_slice())),
        _ => None,
    }
}

/// `c` when `dest := dest + c`, `dest := c + dest` or `dest := dest - c`
fn increment(
    dest: &Variable,
    value: &Instruction,
) -> Option<i32> {
    let Instruction::BinaryOp {
        op,
        lhs,
        rhs,
        ty: TypeTag::Int32,
    } = value
    else {
        return None;
    };
    let same = |operand: &Operand| operand.variable_name() == Some(dest.name.as_str());
    let delta = match (op, lhs, rhs) {
        (BinaryOperator::Add, var, Operand::Literal { value, .. }) if same(var) => Some(*value),
        (BinaryOperator::Add, Operand::Literal { value, .. }, var) if same(var) => Some(*value),
        (BinaryOperator::Sub, var, Operand::Literal { value, .. }) if same(var) => value.checked_neg(),
        _ => None,
    };
    delta.filter(|d| opcode::fits_iinc(*d))
}

fn is_zero(operand: &Operand) -> bool {
    matches!(operand, Operand::Literal { value: 0, .. })
}
