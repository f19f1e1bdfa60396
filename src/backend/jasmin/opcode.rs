//! 指令选择
//!
//! Opcode mnemonics keyed by [`TypeTag`].

use crate::middle::ir::BinaryOperator;
use crate::middle::types::TypeTag;

/// `iload` / `aload`, with the `_n` short form for slots 0..=3
pub fn load(
    ty: &TypeTag,
    slot: u16,
) -> String {
    with_slot(if ty.is_reference() { "aload" } else { "iload" }, slot)
}

/// `istore` / `astore`, with the `_n` short form for slots 0..=3
pub fn store(
    ty: &TypeTag,
    slot: u16,
) -> String {
    with_slot(if ty.is_reference() { "astore" } else { "istore" }, slot)
}

fn with_slot(
    base: &str,
    slot: u16,
) -> String {
    if slot <= 3 {
        format!("{}_{}", base, slot)
    } else {
        format!("{} {}", base, slot)
    }
}

/// Smallest instruction pushing the integer constant `value`
pub fn push_int(value: i32) -> String {
    match value {
        -1 => "iconst_m1".to_string(),
        0..=5 => format!("iconst_{}", value),
        v if i8::try_from(v).is_ok() => format!("bipush {}", v),
        v if i16::try_from(v).is_ok() => format!("sipush {}", v),
        v => format!("ldc {}", v),
    }
}

/// Arithmetic / logical opcode; `None` for comparisons
pub fn arithmetic(op: BinaryOperator) -> Option<&'static str> {
    match op {
        BinaryOperator::Add => Some("iadd"),
        BinaryOperator::Sub => Some("isub"),
        BinaryOperator::Mul => Some("imul"),
        BinaryOperator::Div => Some("idiv"),
        BinaryOperator::And => Some("iand"),
        BinaryOperator::Or => Some("ior"),
        _ => None,
    }
}

/// Condition code suffix (`lt`, `ge`, ...) of a comparison
pub fn condition_code(op: BinaryOperator) -> Option<&'static str> {
    match op {
        BinaryOperator::Lt => Some("lt"),
        BinaryOperator::Le => Some("le"),
        BinaryOperator::Gt => Some("gt"),
        BinaryOperator::Ge => Some("ge"),
        BinaryOperator::Eq => Some("eq"),
        BinaryOperator::Ne => Some("ne"),
        _ => None,
    }
}

pub fn return_op(ty: &TypeTag) -> &'static str {
    match ty {
        TypeTag::Void => "return",
        ty if ty.is_reference() => "areturn",
        _ => "ireturn",
    }
}

/// Element load opcode for an array of `elem`
pub fn array_load(elem: &TypeTag) -> &'static str {
    match elem {
        TypeTag::Bool => "baload",
        ty if ty.is_reference() => "aaload",
        _ => "iaload",
    }
}

/// Element store opcode for an array of `elem`
pub fn array_store(elem: &TypeTag) -> &'static str {
    match elem {
        TypeTag::Bool => "bastore",
        ty if ty.is_reference() => "aastore",
        _ => "iastore",
    }
}

/// `iinc` constants must fit a signed byte
pub fn fits_iinc(delta: i32) -> bool {
    i8::try_from(delta).is_ok()
}
