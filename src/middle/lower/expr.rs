//! 表达式降级

use super::{Lowered, LoweringContext, Place};
use crate::error::{CompileError, CompileResult};
use crate::frontend::ast::{BinOp, Expr, ExprKind, UnOp};
use crate::middle::ir::{
    BinaryOperator, Condition, Instruction, InvokeKind, Operand, UnaryOperator, Variable, INIT,
};
use crate::middle::types::TypeTag;

impl LoweringContext<'_> {
    /// Lower `expr` to an operand, staging any computation through a temporary
    pub fn lower_expr(
        &mut self,
        expr: &Expr,
    ) -> CompileResult<Lowered> {
        match &expr.kind {
            ExprKind::IntLit(value) => Ok((Operand::int(*value), Vec::new())),
            ExprKind::BoolLit(value) => Ok((Operand::bool(*value), Vec::new())),
            ExprKind::Paren(inner) => self.lower_expr(inner),
            _ => {
                let (rhs, mut pre) = self.lower_rhs(expr)?;
                if let Instruction::SingleOp(op) = rhs {
                    return Ok((op, pre));
                }
                let ty = rhs
                    .result_type()
                    .unwrap_or_else(|| TypeTag::from_source(&expr.ty));
                if ty.is_void() {
                    return Err(CompileError::unsupported(
                        self.method_name(),
                        "void call used as a value",
                    ));
                }
                let tmp = self.fresh_temp(ty);
                pre.push(Instruction::assign(tmp.clone(), rhs));
                Ok((tmp.into(), pre))
            }
        }
    }

    /// Lower `expr` to the instruction producing its value, without storing it.
    /// Assignments use this to write straight into their destination.
    pub fn lower_rhs(
        &mut self,
        expr: &Expr,
    ) -> CompileResult<(Instruction, Vec<Instruction>)> {
        match &expr.kind {
            ExprKind::IntLit(_) | ExprKind::BoolLit(_) => {
                let (op, pre) = self.lower_expr(expr)?;
                Ok((Instruction::SingleOp(op), pre))
            }
            ExprKind::Paren(inner) => self.lower_rhs(inner),
            ExprKind::This => Ok((Instruction::SingleOp(self.this_var()?.into()), Vec::new())),
            ExprKind::Ident(name) => match self.resolve_or_fail(name)? {
                Place::Var(var) => Ok((Instruction::SingleOp(var.into()), Vec::new())),
                Place::Field(field) => Ok((
                    Instruction::GetField {
                        object: self.this_var()?.into(),
                        field,
                    },
                    Vec::new(),
                )),
            },
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinOp::And => self.lower_and(lhs, rhs),
                BinOp::Or => self.lower_or(lhs, rhs),
                _ => {
                    let (lhs, mut pre) = self.lower_expr(lhs)?;
                    let (rhs, rhs_pre) = self.lower_expr(rhs)?;
                    pre.extend(rhs_pre);
                    let op = BinaryOperator::from(*op);
                    Ok((
                        Instruction::BinaryOp {
                            op,
                            lhs,
                            rhs,
                            ty: op.result_type(),
                        },
                        pre,
                    ))
                }
            },
            ExprKind::Unary {
                op: UnOp::Not,
                operand,
            } => {
                let (operand, pre) = self.lower_expr(operand)?;
                Ok((
                    Instruction::UnaryOp {
                        op: UnaryOperator::Not,
                        operand,
                        ty: TypeTag::Bool,
                    },
                    pre,
                ))
            }
            ExprKind::NewObject(class) => {
                let tmp = self.fresh_temp(TypeTag::reference(class));
                let pre = vec![
                    Instruction::assign(
                        tmp.clone(),
                        Instruction::NewObject {
                            class: class.clone(),
                        },
                    ),
                    Instruction::Invoke {
                        kind: InvokeKind::Special,
                        receiver: Some(tmp.clone().into()),
                        class: class.clone(),
                        method: INIT.to_string(),
                        args: Vec::new(),
                        ret: TypeTag::Void,
                    },
                ];
                Ok((Instruction::SingleOp(tmp.into()), pre))
            }
            ExprKind::NewArray { elem, length } => {
                let (length, pre) = self.lower_expr(length)?;
                Ok((
                    Instruction::NewArray {
                        length,
                        elem: TypeTag::from_source(elem),
                    },
                    pre,
                ))
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => self.lower_call(expr, receiver, method, args),
            ExprKind::Index { array, index } => {
                let (array, mut pre) = self.lower_to_variable(array)?;
                let (index, index_pre) = self.lower_to_variable(index)?;
                pre.extend(index_pre);
                let ty = array
                    .ty
                    .element()
                    .cloned()
                    .unwrap_or_else(|| TypeTag::from_source(&expr.ty));
                Ok((
                    Instruction::ArrayLoad {
                        array,
                        index: index.into(),
                        ty,
                    },
                    pre,
                ))
            }
            ExprKind::Length(array) => {
                let (array, pre) = self.lower_to_variable(array)?;
                Ok((Instruction::ArrayLength { array }, pre))
            }
        }
    }

    /// Lower `expr` to a variable; literals go through a temporary so that
    /// positions requiring a variable (array and index slots) stay uniform
    pub fn lower_to_variable(
        &mut self,
        expr: &Expr,
    ) -> CompileResult<(Variable, Vec<Instruction>)> {
        let (op, mut pre) = self.lower_expr(expr)?;
        match op {
            Operand::Variable(var) => Ok((var, pre)),
            literal @ Operand::Literal { .. } => {
                let tmp = self.fresh_temp(literal.ty().clone());
                pre.push(Instruction::assign(tmp.clone(), Instruction::SingleOp(literal)));
                Ok((tmp, pre))
            }
        }
    }

    /// `lhs && rhs`: `rhs` only runs when `lhs` is true
    fn lower_and(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CompileResult<(Instruction, Vec<Instruction>)> {
        let (lhs, mut pre) = self.lower_expr(lhs)?;
        let result = self.fresh_temp(TypeTag::Bool);
        let id = self.fresh_label_id();
        let rhs_label = format!("AND_RHS_{}", id);
        let end_label = format!("AND_END_{}", id);

        pre.push(Instruction::CondBranch {
            cond: Condition::Single(lhs),
            label: rhs_label.clone(),
        });
        pre.push(Instruction::assign(
            result.clone(),
            Instruction::SingleOp(Operand::bool(false)),
        ));
        pre.push(Instruction::Goto(end_label.clone()));
        pre.push(Instruction::Label(rhs_label));
        let (rhs, rhs_pre) = self.lower_expr(rhs)?;
        pre.extend(rhs_pre);
        pre.push(Instruction::assign(result.clone(), Instruction::SingleOp(rhs)));
        pre.push(Instruction::Label(end_label));

        Ok((Instruction::SingleOp(result.into()), pre))
    }

    /// `lhs || rhs`: `rhs` only runs when `lhs` is false
    fn lower_or(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CompileResult<(Instruction, Vec<Instruction>)> {
        let (lhs, mut pre) = self.lower_expr(lhs)?;
        let result = self.fresh_temp(TypeTag::Bool);
        let id = self.fresh_label_id();
        let true_label = format!("OR_TRUE_{}", id);
        let end_label = format!("OR_END_{}", id);

        pre.push(Instruction::CondBranch {
            cond: Condition::Single(lhs),
            label: true_label.clone(),
        });
        let (rhs, rhs_pre) = self.lower_expr(rhs)?;
        pre.extend(rhs_pre);
        pre.push(Instruction::assign(result.clone(), Instruction::SingleOp(rhs)));
        pre.push(Instruction::Goto(end_label.clone()));
        pre.push(Instruction::Label(true_label));
        pre.push(Instruction::assign(
            result.clone(),
            Instruction::SingleOp(Operand::bool(true)),
        ));
        pre.push(Instruction::Label(end_label));

        Ok((Instruction::SingleOp(result.into()), pre))
    }

    /// Receiver, then arguments, left to right
    fn lower_call(
        &mut self,
        expr: &Expr,
        receiver: &Expr,
        method: &str,
        args: &[Expr],
    ) -> CompileResult<(Instruction, Vec<Instruction>)> {
        let mut pre = Vec::new();

        let (kind, receiver, class) = match &receiver.kind {
            ExprKind::Ident(name) if self.resolve(name).is_none() && self.symbols.is_class_name(name) => {
                (InvokeKind::Static, None, name.clone())
            }
            _ => {
                let (op, receiver_pre) = self.lower_expr(receiver)?;
                pre.extend(receiver_pre);
                let class = match op.ty() {
                    TypeTag::Reference(class) => class.clone(),
                    other => {
                        return Err(CompileError::unsupported(
                            self.method_name(),
                            format!("call of `{}` on a value of type {}", method, other),
                        ))
                    }
                };
                (InvokeKind::Virtual, Some(op), class)
            }
        };

        let mut lowered_args = Vec::with_capacity(args.len());
        for arg in args {
            let (op, arg_pre) = self.lower_expr(arg)?;
            pre.extend(arg_pre);
            lowered_args.push(op);
        }

        let ret = if class == self.symbols.class_name {
            self.symbols
                .method(method)
                .map(|sig| TypeTag::from_source(&sig.return_type))
                .unwrap_or_else(|| TypeTag::from_source(&expr.ty))
        } else {
            TypeTag::from_source(&expr.ty)
        };

        Ok((
            Instruction::Invoke {
                kind,
                receiver,
                class,
                method: method.to_string(),
                args: lowered_args,
                ret,
            },
            pre,
        ))
    }

    /// Condition that holds when `expr` evaluates to `jump_if`
    pub fn lower_condition(
        &mut self,
        expr: &Expr,
        jump_if: bool,
    ) -> CompileResult<(Condition, Vec<Instruction>)> {
        match &expr.kind {
            ExprKind::Paren(inner) => self.lower_condition(inner, jump_if),
            ExprKind::Unary {
                op: UnOp::Not,
                operand,
            } => self.lower_condition(operand, !jump_if),
            ExprKind::Binary { op, lhs, rhs } => {
                let op = BinaryOperator::from(*op);
                match op.negate() {
                    Some(negated) => {
                        let (lhs, mut pre) = self.lower_expr(lhs)?;
                        let (rhs, rhs_pre) = self.lower_expr(rhs)?;
                        pre.extend(rhs_pre);
                        let op = if jump_if { op } else { negated };
                        Ok((Condition::Compare { op, lhs, rhs }, pre))
                    }
                    None => self.lower_value_condition(expr, jump_if),
                }
            }
            _ => self.lower_value_condition(expr, jump_if),
        }
    }

    fn lower_value_condition(
        &mut self,
        expr: &Expr,
        jump_if: bool,
    ) -> CompileResult<(Condition, Vec<Instruction>)> {
        let (op, pre) = self.lower_expr(expr)?;
        let cond = if jump_if {
            Condition::Single(op)
        } else {
            Condition::Compare {
                op: BinaryOperator::Eq,
                lhs: op,
                rhs: Operand::bool(false),
            }
        };
        Ok((cond, pre))
    }
}
