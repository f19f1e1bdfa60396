//! Typed AST handed over by the semantic-analysis passes
//!
//! 前端（解析 + 语义分析）不在本 crate 中实现；这里只定义它与后端之间的数据契约。
//! 每个表达式节点都带有语义分析阶段解析出的类型。

use serde::{Deserialize, Serialize};

/// Source-level type as written (and resolved) by the front end
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Int,
    Boolean,
    Void,
    /// A class name, either the current class, an imported class or `String`
    Class(String),
    Array(Box<SourceType>),
}

impl SourceType {
    /// `int[]`
    pub fn int_array() -> Self {
        SourceType::Array(Box::new(SourceType::Int))
    }

    pub fn class(name: &str) -> Self {
        SourceType::Class(name.to_string())
    }
}

/// Binary operators of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// Unary operators of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    Not,
}

/// Typed expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    /// Type resolved by the semantic pass
    pub ty: SourceType,
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    IntLit(i32),
    BoolLit(bool),
    /// Local, parameter, field or (as a call receiver) class name
    Ident(String),
    This,
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Paren(Box<Expr>),
    /// `new C()`
    NewObject(String),
    /// `new int[n]`
    NewArray {
        elem: SourceType,
        length: Box<Expr>,
    },
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Length(Box<Expr>),
}

impl Expr {
    pub fn new(
        kind: ExprKind,
        ty: SourceType,
    ) -> Self {
        Self { kind, ty }
    }

    pub fn int(value: i32) -> Self {
        Self::new(ExprKind::IntLit(value), SourceType::Int)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::BoolLit(value), SourceType::Boolean)
    }

    pub fn ident(
        name: &str,
        ty: SourceType,
    ) -> Self {
        Self::new(ExprKind::Ident(name.to_string()), ty)
    }

    pub fn this(class: &str) -> Self {
        Self::new(ExprKind::This, SourceType::class(class))
    }

    /// Builds a binary expression, typing it from the operator
    pub fn binary(
        op: BinOp,
        lhs: Expr,
        rhs: Expr,
    ) -> Self {
        let ty = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => SourceType::Int,
            _ => SourceType::Boolean,
        };
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn not(operand: Expr) -> Self {
        Self::new(
            ExprKind::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
            },
            SourceType::Boolean,
        )
    }

    pub fn call(
        receiver: Expr,
        method: &str,
        args: Vec<Expr>,
        ty: SourceType,
    ) -> Self {
        Self::new(
            ExprKind::Call {
                receiver: Box::new(receiver),
                method: method.to_string(),
                args,
            },
            ty,
        )
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// `target = value;`
    Assign {
        target: String,
        value: Expr,
    },
    /// `target[index] = value;`
    ArrayAssign {
        target: String,
        index: Expr,
        value: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
}

/// Variable declaration (field, parameter or local)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: SourceType,
}

impl VarDecl {
    pub fn new(
        name: &str,
        ty: SourceType,
    ) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

/// Method declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub is_static: bool,
    pub return_type: SourceType,
    #[serde(default)]
    pub params: Vec<VarDecl>,
    #[serde(default)]
    pub locals: Vec<VarDecl>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

fn default_public() -> bool {
    true
}

/// Class declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub fields: Vec<VarDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

/// One compilation unit: imports plus exactly one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Dotted import paths, e.g. `java.util.List` or `io`
    #[serde(default)]
    pub imports: Vec<String>,
    pub class: ClassDecl,
}
