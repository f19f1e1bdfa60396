//! 编译错误
//!
//! The backend only ever receives programs the semantic passes accepted, so every
//! variant here is an internal fault. None of them is recoverable; compilation of
//! the unit stops at the first one.

use thiserror::Error;

/// 编译错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// AST 形状无法降级
    #[error("unsupported construct in `{method}`: {construct}")]
    Unsupported { method: String, construct: String },

    /// 符号表或变量表中找不到名字
    #[error("lookup of `{name}` failed in `{method}`")]
    Lookup { method: String, name: String },

    /// 干涉图与变量表不一致
    #[error("register allocation invariant violated in `{method}`: {detail}")]
    Allocator { method: String, detail: String },

    /// 字节码生成失败
    #[error("cannot emit `{method}`: {detail}")]
    Emit { method: String, detail: String },
}

impl CompileError {
    pub fn unsupported(
        method: &str,
        construct: impl Into<String>,
    ) -> Self {
        CompileError::Unsupported {
            method: method.to_string(),
            construct: construct.into(),
        }
    }

    pub fn lookup(
        method: &str,
        name: &str,
    ) -> Self {
        CompileError::Lookup {
            method: method.to_string(),
            name: name.to_string(),
        }
    }

    pub fn allocator(
        method: &str,
        detail: impl Into<String>,
    ) -> Self {
        CompileError::Allocator {
            method: method.to_string(),
            detail: detail.into(),
        }
    }

    pub fn emit(
        method: &str,
        detail: impl Into<String>,
    ) -> Self {
        CompileError::Emit {
            method: method.to_string(),
            detail: detail.into(),
        }
    }

    /// Method the failure is localized to
    pub fn method(&self) -> &str {
        match self {
            CompileError::Unsupported { method, .. }
            | CompileError::Lookup { method, .. }
            | CompileError::Allocator { method, .. }
            | CompileError::Emit { method, .. } => method,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
