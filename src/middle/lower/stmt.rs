//! 语句降级

use super::{LoweringContext, Place};
use crate::error::CompileResult;
use crate::frontend::ast::{Expr, ExprKind, Stmt};
use crate::middle::ir::{Instruction, Variable};

impl LoweringContext<'_> {
    pub fn lower_stmt(
        &mut self,
        stmt: &Stmt,
    ) -> CompileResult<Vec<Instruction>> {
        match stmt {
            Stmt::Block(stmts) => {
                let mut out = Vec::new();
                for stmt in stmts {
                    out.extend(self.lower_stmt(stmt)?);
                }
                Ok(out)
            }
            Stmt::Assign { target, value } => self.lower_assign(target, value),
            Stmt::ArrayAssign {
                target,
                index,
                value,
            } => self.lower_array_assign(target, index, value),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.lower_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body } => self.lower_while(cond, body),
            Stmt::Expr(expr) => {
                let (rhs, mut out) = self.lower_rhs(expr)?;
                // 只有调用有副作用；其余结果直接丢弃
                if matches!(rhs, Instruction::Invoke { .. }) {
                    out.push(rhs);
                }
                Ok(out)
            }
            Stmt::Return(None) => Ok(vec![Instruction::Return(None)]),
            Stmt::Return(Some(value)) => {
                let (op, mut out) = self.lower_expr(value)?;
                out.push(Instruction::Return(Some(op)));
                Ok(out)
            }
        }
    }

    fn lower_assign(
        &mut self,
        target: &str,
        value: &Expr,
    ) -> CompileResult<Vec<Instruction>> {
        match self.resolve_or_fail(target)? {
            Place::Var(dest) => {
                let (rhs, mut out) = self.lower_rhs(value)?;
                out.push(Instruction::assign(dest, rhs));
                Ok(out)
            }
            Place::Field(field) => {
                let (value, mut out) = self.lower_expr(value)?;
                out.push(Instruction::PutField {
                    object: self.this_var()?.into(),
                    field,
                    value,
                });
                Ok(out)
            }
        }
    }

    fn lower_array_assign(
        &mut self,
        target: &str,
        index: &Expr,
        value: &Expr,
    ) -> CompileResult<Vec<Instruction>> {
        let (array, mut out) = self.array_variable(target)?;
        let (index, index_pre) = self.lower_to_variable(index)?;
        out.extend(index_pre);
        let (value, value_pre) = self.lower_expr(value)?;
        out.extend(value_pre);
        out.push(Instruction::ArrayStore {
            array,
            index: index.into(),
            value,
        });
        Ok(out)
    }

    /// Array held in a variable, or loaded from a field into a temporary
    fn array_variable(
        &mut self,
        name: &str,
    ) -> CompileResult<(Variable, Vec<Instruction>)> {
        match self.resolve_or_fail(name)? {
            Place::Var(var) => Ok((var, Vec::new())),
            Place::Field(field) => {
                let tmp = self.fresh_temp(field.ty.clone());
                let load = Instruction::GetField {
                    object: self.this_var()?.into(),
                    field,
                };
                Ok((tmp.clone(), vec![Instruction::assign(tmp, load)]))
            }
        }
    }

    /// ```text
    ///     <cond>
    ///     if (!cond) goto ELSE_k      ; ENDIF_k without an else branch
    ///     <then>
    ///     goto ENDIF_k                ; omitted when <then> ends in return
    /// ELSE_k:
    ///     <else>
    /// ENDIF_k:
    /// ```
    fn lower_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> CompileResult<Vec<Instruction>> {
        let id = self.fresh_label_id();
        let else_label = format!("ELSE_{}", id);
        let end_label = format!("ENDIF_{}", id);

        let (cond, mut out) = self.lower_condition(cond, false)?;
        let skip_to = if else_branch.is_some() {
            &else_label
        } else {
            &end_label
        };
        out.push(Instruction::CondBranch {
            cond,
            label: skip_to.clone(),
        });
        let then_code = self.lower_stmt(then_branch)?;
        let falls_through = !ends_in_terminator(&then_code);
        out.extend(then_code);

        if let Some(else_branch) = else_branch {
            if falls_through {
                out.push(Instruction::Goto(end_label.clone()));
            }
            out.push(Instruction::Label(else_label));
            out.extend(self.lower_stmt(else_branch)?);
        }
        out.push(Instruction::Label(end_label));
        Ok(out)
    }

    /// ```text
    /// WHILE_k:
    ///     <cond>
    ///     if (!cond) goto ENDWHILE_k  ; omitted for `while (true)`
    ///     <body>
    ///     goto WHILE_k                ; omitted when <body> ends in return
    /// ENDWHILE_k:
    /// ```
    fn lower_while(
        &mut self,
        cond: &Expr,
        body: &Stmt,
    ) -> CompileResult<Vec<Instruction>> {
        let id = self.fresh_label_id();
        let head_label = format!("WHILE_{}", id);
        let end_label = format!("ENDWHILE_{}", id);

        let mut out = vec![Instruction::Label(head_label.clone())];
        if !is_always_true(cond) {
            let (cond, cond_pre) = self.lower_condition(cond, false)?;
            out.extend(cond_pre);
            out.push(Instruction::CondBranch {
                cond,
                label: end_label.clone(),
            });
        }
        let body = self.lower_stmt(body)?;
        let falls_through = !ends_in_terminator(&body);
        out.extend(body);
        if falls_through {
            out.push(Instruction::Goto(head_label));
        }
        out.push(Instruction::Label(end_label));
        Ok(out)
    }
}

fn ends_in_terminator(code: &[Instruction]) -> bool {
    code.last().is_some_and(Instruction::is_terminator)
}

/// `true`, possibly parenthesized
fn is_always_true(cond: &Expr) -> bool {
    match &cond.kind {
        ExprKind::BoolLit(value) => *value,
        ExprKind::Paren(inner) => is_always_true(inner),
        _ => false,
    }
}
