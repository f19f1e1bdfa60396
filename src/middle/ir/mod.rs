//! Intermediate Representation
//!
//! 三地址形式的类型化 IR。控制流用显式的 `Label` / `Goto` / `CondBranch` 指令编码在
//! 每个方法的线性指令列表中。

pub mod pretty;

use crate::error::{CompileError, CompileResult};
use crate::frontend::ast::BinOp;
use crate::middle::types::TypeTag;
use indexmap::IndexMap;

/// Named variable or temporary
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub ty: TypeTag,
}

impl Variable {
    pub fn new(
        name: &str,
        ty: TypeTag,
    ) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }

    pub fn this(class: &str) -> Self {
        Self::new(THIS, TypeTag::reference(class))
    }
}

/// Name of the method receiver
pub const THIS: &str = "this";

/// Instruction operand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Immediate; booleans are 0 / 1
    Literal { value: i32, ty: TypeTag },
    Variable(Variable),
}

impl Operand {
    pub fn int(value: i32) -> Self {
        Operand::Literal {
            value,
            ty: TypeTag::Int32,
        }
    }

    pub fn bool(value: bool) -> Self {
        Operand::Literal {
            value: value as i32,
            ty: TypeTag::Bool,
        }
    }

    pub fn var(
        name: &str,
        ty: TypeTag,
    ) -> Self {
        Operand::Variable(Variable::new(name, ty))
    }

    pub fn ty(&self) -> &TypeTag {
        match self {
            Operand::Literal { ty, .. } => ty,
            Operand::Variable(var) => &var.ty,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Operand::Variable(var) => Some(var),
            Operand::Literal { .. } => None,
        }
    }

    pub fn variable_name(&self) -> Option<&str> {
        self.as_variable().map(|v| v.name.as_str())
    }
}

impl From<Variable> for Operand {
    fn from(var: Variable) -> Self {
        Operand::Variable(var)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOperator {
    pub fn is_relational(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Lt | Le | Gt | Ge | Eq | Ne)
    }

    pub fn is_arithmetic(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Add | Sub | Mul | Div)
    }

    /// Comparison that holds exactly when `self` does not
    pub fn negate(self) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        match self {
            Lt => Some(Ge),
            Le => Some(Gt),
            Gt => Some(Le),
            Ge => Some(Lt),
            Eq => Some(Ne),
            Ne => Some(Eq),
            _ => None,
        }
    }

    pub fn result_type(self) -> TypeTag {
        if self.is_arithmetic() {
            TypeTag::Int32
        } else {
            TypeTag::Bool
        }
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            And => "&&",
            Or => "||",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
        }
    }
}

impl From<BinOp> for BinaryOperator {
    fn from(op: BinOp) -> Self {
        match op {
            BinOp::Add => BinaryOperator::Add,
            BinOp::Sub => BinaryOperator::Sub,
            BinOp::Mul => BinaryOperator::Mul,
            BinOp::Div => BinaryOperator::Div,
            BinOp::And => BinaryOperator::And,
            BinOp::Or => BinaryOperator::Or,
            BinOp::Lt => BinaryOperator::Lt,
            BinOp::Le => BinaryOperator::Le,
            BinOp::Gt => BinaryOperator::Gt,
            BinOp::Ge => BinaryOperator::Ge,
            BinOp::Eq => BinaryOperator::Eq,
            BinOp::Ne => BinaryOperator::Ne,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Static,
    Special,
}

/// Condition of a conditional branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Branch if the boolean operand is true
    Single(Operand),
    /// Branch if the comparison holds
    Compare {
        op: BinaryOperator,
        lhs: Operand,
        rhs: Operand,
    },
}

impl Condition {
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Condition::Single(op) => vec![op],
            Condition::Compare { lhs, rhs, .. } => vec![lhs, rhs],
        }
    }
}

/// Constructor method name
pub const INIT: &str = "<init>";

/// Instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Assign {
        dest: Variable,
        rhs: Box<Instruction>,
    },
    BinaryOp {
        op: BinaryOperator,
        lhs: Operand,
        rhs: Operand,
        ty: TypeTag,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Operand,
        ty: TypeTag,
    },
    /// Pass-through of a single operand
    SingleOp(Operand),
    NewObject {
        class: String,
    },
    NewArray {
        length: Operand,
        elem: TypeTag,
    },
    GetField {
        object: Operand,
        field: Variable,
    },
    PutField {
        object: Operand,
        field: Variable,
        value: Operand,
    },
    Invoke {
        kind: InvokeKind,
        /// Receiver object; `None` for static calls
        receiver: Option<Operand>,
        /// Static type of the receiver, or the class of a static call
        class: String,
        method: String,
        args: Vec<Operand>,
        ret: TypeTag,
    },
    ArrayLoad {
        array: Variable,
        index: Operand,
        ty: TypeTag,
    },
    ArrayStore {
        array: Variable,
        index: Operand,
        value: Operand,
    },
    ArrayLength {
        array: Variable,
    },
    Return(Option<Operand>),
    Label(String),
    Goto(String),
    CondBranch {
        cond: Condition,
        label: String,
    },
}

impl Instruction {
    /// `dest := rhs`
    pub fn assign(
        dest: Variable,
        rhs: Instruction,
    ) -> Self {
        Instruction::Assign {
            dest,
            rhs: Box::new(rhs),
        }
    }

    /// Type of the value this instruction produces, if any
    pub fn result_type(&self) -> Option<TypeTag> {
        match self {
            Instruction::Assign { rhs, .. } => rhs.result_type(),
            Instruction::BinaryOp { ty, .. } | Instruction::UnaryOp { ty, .. } => Some(ty.clone()),
            Instruction::SingleOp(op) => Some(op.ty().clone()),
            Instruction::NewObject { class } => Some(TypeTag::Reference(class.clone())),
            Instruction::NewArray { elem, .. } => TypeTag::array_of(elem.clone()),
            Instruction::GetField { field, .. } => Some(field.ty.clone()),
            Instruction::Invoke { ret, .. } if !ret.is_void() => Some(ret.clone()),
            Instruction::ArrayLoad { ty, .. } => Some(ty.clone()),
            Instruction::ArrayLength { .. } => Some(TypeTag::Int32),
            _ => None,
        }
    }

    /// `(dest, src)` when this is a direct copy `dest := src`
    pub fn as_copy(&self) -> Option<(&Variable, &Variable)> {
        match self {
            Instruction::Assign { dest, rhs } => match rhs.as_ref() {
                Instruction::SingleOp(Operand::Variable(src)) => Some((dest, src)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Name written by this instruction (only assignment destinations)
    pub fn defined(&self) -> Option<&str> {
        match self {
            Instruction::Assign { dest, .. } => Some(&dest.name),
            _ => None,
        }
    }

    /// Names read by this instruction, in operand order
    pub fn used(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_used(&mut names);
        names
    }

    fn collect_used<'a>(
        &'a self,
        out: &mut Vec<&'a str>,
    ) {
        let mut push = |op: &'a Operand| {
            if let Some(name) = op.variable_name() {
                out.push(name);
            }
        };
        match self {
            Instruction::Assign { rhs, .. } => rhs.collect_used(out),
            Instruction::BinaryOp { lhs, rhs, .. } => {
                push(lhs);
                push(rhs);
            }
            Instruction::UnaryOp { operand, .. } => push(operand),
            Instruction::SingleOp(op) => push(op),
            Instruction::NewObject { .. } => {}
            Instruction::NewArray { length, .. } => push(length),
            Instruction::GetField { object, .. } => push(object),
            Instruction::PutField { object, value, .. } => {
                push(object);
                push(value);
            }
            Instruction::Invoke { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    push(receiver);
                }
                args.iter().for_each(push);
            }
            Instruction::ArrayLoad { array, index, .. } => {
                out.push(&array.name);
                if let Some(name) = index.variable_name() {
                    out.push(name);
                }
            }
            Instruction::ArrayStore {
                array,
                index,
                value,
            } => {
                out.push(&array.name);
                for op in [index, value] {
                    if let Some(name) = op.variable_name() {
                        out.push(name);
                    }
                }
            }
            Instruction::ArrayLength { array } => out.push(&array.name),
            Instruction::Return(value) => {
                if let Some(value) = value {
                    push(value);
                }
            }
            Instruction::Label(_) | Instruction::Goto(_) => {}
            Instruction::CondBranch { cond, .. } => cond.operands().into_iter().for_each(push),
        }
    }

    /// Every variable mentioned (used or defined), with its carried type
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables<'a>(
        &'a self,
        out: &mut Vec<&'a Variable>,
    ) {
        let mut push = |op: &'a Operand| {
            if let Some(var) = op.as_variable() {
                out.push(var);
            }
        };
        match self {
            Instruction::Assign { dest, rhs } => {
                out.push(dest);
                rhs.collect_variables(out);
            }
            Instruction::BinaryOp { lhs, rhs, .. } => {
                push(lhs);
                push(rhs);
            }
            Instruction::UnaryOp { operand, .. } => push(operand),
            Instruction::SingleOp(op) => push(op),
            Instruction::NewObject { .. } => {}
            Instruction::NewArray { length, .. } => push(length),
            Instruction::GetField { object, .. } => push(object),
            Instruction::PutField { object, value, .. } => {
                push(object);
                push(value);
            }
            Instruction::Invoke { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    push(receiver);
                }
                args.iter().for_each(push);
            }
            Instruction::ArrayLoad { array, index, .. } => {
                out.push(array);
                if let Some(var) = index.as_variable() {
                    out.push(var);
                }
            }
            Instruction::ArrayStore {
                array,
                index,
                value,
            } => {
                out.push(array);
                for op in [index, value] {
                    if let Some(var) = op.as_variable() {
                        out.push(var);
                    }
                }
            }
            Instruction::ArrayLength { array } => out.push(array),
            Instruction::Return(value) => {
                if let Some(value) = value {
                    push(value);
                }
            }
            Instruction::Label(_) | Instruction::Goto(_) => {}
            Instruction::CondBranch { cond, .. } => cond.operands().into_iter().for_each(push),
        }
    }

    /// Label this instruction may jump to
    pub fn jump_target(&self) -> Option<&str> {
        match self {
            Instruction::Goto(label) | Instruction::CondBranch { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Whether control never falls through to the next instruction
    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Goto(_) | Instruction::Return(_))
    }
}

/// Role of a variable table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    This,
    Parameter,
    Local,
    /// Compiler-generated temporary
    Temporary,
}

/// Variable table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarEntry {
    pub ty: TypeTag,
    pub kind: VarKind,
    /// Virtual register, set by the allocator
    pub register: Option<u16>,
}

impl VarEntry {
    pub fn new(
        ty: TypeTag,
        kind: VarKind,
    ) -> Self {
        Self {
            ty,
            kind,
            register: None,
        }
    }

    /// `this` and parameters occupy fixed slots
    pub fn is_reserved(&self) -> bool {
        matches!(self.kind, VarKind::This | VarKind::Parameter)
    }
}

/// Name → entry, in declaration order
pub type VarTable = IndexMap<String, VarEntry>;

/// Method IR
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub is_public: bool,
    pub is_static: bool,
    pub is_constructor: bool,
    pub params: Vec<Variable>,
    pub return_type: TypeTag,
    pub instructions: Vec<Instruction>,
    pub vars: VarTable,
}

impl Method {
    /// The synthesized default constructor of `class`
    pub fn default_constructor(
        class: &str,
        super_class: Option<&str>,
    ) -> Self {
        let mut vars = VarTable::new();
        vars.insert(
            THIS.to_string(),
            VarEntry::new(TypeTag::reference(class), VarKind::This),
        );
        Method {
            name: INIT.to_string(),
            is_public: true,
            is_static: false,
            is_constructor: true,
            params: Vec::new(),
            return_type: TypeTag::Void,
            instructions: vec![
                Instruction::Invoke {
                    kind: InvokeKind::Special,
                    receiver: Some(Variable::this(class).into()),
                    class: super_class.unwrap_or("Object").to_string(),
                    method: INIT.to_string(),
                    args: Vec::new(),
                    ret: TypeTag::Void,
                },
                Instruction::Return(None),
            ],
            vars,
        }
    }

    /// `public static void main(String[] args)`
    pub fn is_main(&self) -> bool {
        self.is_static && self.name == "main"
    }

    /// Constructors and `main` keep the trivial slot layout
    pub fn needs_allocation(&self) -> bool {
        !self.is_constructor && !self.is_main()
    }

    pub fn register_of(
        &self,
        name: &str,
    ) -> Option<u16> {
        self.vars.get(name).and_then(|entry| entry.register)
    }

    /// Whether the allocator (or the trivial layout) has run
    pub fn has_registers(&self) -> bool {
        self.vars.values().any(|entry| entry.register.is_some())
    }

    /// Number of local variable slots the registers need
    pub fn locals_limit(&self) -> u16 {
        let used = self
            .vars
            .values()
            .filter_map(|entry| entry.register)
            .map(|r| r + 1)
            .max()
            .unwrap_or(0);
        let reserved = self.params.len() as u16 + u16::from(!self.is_static);
        used.max(reserved)
    }

    pub fn clear_registers(&mut self) {
        for entry in self.vars.values_mut() {
            entry.register = None;
        }
    }

    /// Every name an instruction references must be in the variable table
    pub fn validate(&self) -> CompileResult<()> {
        for instr in &self.instructions {
            for var in instr.variables() {
                if !self.vars.contains_key(&var.name) {
                    return Err(CompileError::lookup(&self.name, &var.name));
                }
            }
        }
        Ok(())
    }

    /// Index of each label instruction
    pub fn label_indices(&self) -> IndexMap<&str, usize> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(idx, instr)| match instr {
                Instruction::Label(name) => Some((name.as_str(), idx)),
                _ => None,
            })
            .collect()
    }
}

/// Class unit
#[derive(Debug, Clone, PartialEq)]
pub struct ClassUnit {
    pub name: String,
    pub super_class: Option<String>,
    pub imports: Vec<String>,
    pub fields: Vec<Variable>,
    pub methods: Vec<Method>,
}

impl ClassUnit {
    pub fn method(
        &self,
        name: &str,
    ) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn constructor(&self) -> Option<&Method> {
        self.methods.iter().find(|m| m.is_constructor)
    }
}
