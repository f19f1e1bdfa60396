//! 常量折叠
//!
//! Pure AST → AST transformation: literal-only subexpressions are replaced by
//! their value in a fresh tree, the input is never touched. Division by zero and
//! overflowing arithmetic are left for run time.

use crate::frontend::ast::{BinOp, ClassDecl, Expr, ExprKind, MethodDecl, Program, Stmt, UnOp};

/// Fold every method of the program
pub fn fold_program(program: &Program) -> Program {
    Program {
        imports: program.imports.clone(),
        class: ClassDecl {
            methods: program.class.methods.iter().map(fold_method).collect(),
            ..program.class.clone()
        },
    }
}

pub fn fold_method(method: &MethodDecl) -> MethodDecl {
    MethodDecl {
        body: method.body.iter().map(fold_stmt).collect(),
        ..method.clone()
    }
}

pub fn fold_stmt(stmt: &Stmt) -> Stmt {
    match stmt {
        Stmt::Block(stmts) => Stmt::Block(stmts.iter().map(fold_stmt).collect()),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If {
            cond: fold_expr(cond),
            then_branch: Box::new(fold_stmt(then_branch)),
            else_branch: else_branch.as_ref().map(|s| Box::new(fold_stmt(s))),
        },
        Stmt::While { cond, body } => Stmt::While {
            cond: fold_expr(cond),
            body: Box::new(fold_stmt(body)),
        },
        Stmt::Assign { target, value } => Stmt::Assign {
            target: target.clone(),
            value: fold_expr(value),
        },
        Stmt::ArrayAssign {
            target,
            index,
            value,
        } => Stmt::ArrayAssign {
            target: target.clone(),
            index: fold_expr(index),
            value: fold_expr(value),
        },
        Stmt::Expr(expr) => Stmt::Expr(fold_expr(expr)),
        Stmt::Return(value) => Stmt::Return(value.as_ref().map(fold_expr)),
    }
}

pub fn fold_expr(expr: &Expr) -> Expr {
    let kind = match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } => {
            let lhs = fold_expr(lhs);
            let rhs = fold_expr(rhs);
            if let Some(folded) = fold_binary(*op, &lhs.kind, &rhs.kind) {
                return Expr::new(folded, expr.ty.clone());
            }
            ExprKind::Binary {
                op: *op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }
        ExprKind::Unary { op, operand } => {
            let operand = fold_expr(operand);
            match (op, &operand.kind) {
                (UnOp::Not, ExprKind::BoolLit(b)) => ExprKind::BoolLit(!b),
                _ => ExprKind::Unary {
                    op: *op,
                    operand: Box::new(operand),
                },
            }
        }
        ExprKind::Paren(inner) => {
            let inner = fold_expr(inner);
            match inner.kind {
                ExprKind::IntLit(_) | ExprKind::BoolLit(_) => inner.kind,
                _ => ExprKind::Paren(Box::new(inner)),
            }
        }
        ExprKind::NewArray { elem, length } => ExprKind::NewArray {
            elem: elem.clone(),
            length: Box::new(fold_expr(length)),
        },
        ExprKind::Call {
            receiver,
            method,
            args,
        } => ExprKind::Call {
            receiver: Box::new(fold_expr(receiver)),
            method: method.clone(),
            args: args.iter().map(fold_expr).collect(),
        },
        ExprKind::Index { array, index } => ExprKind::Index {
            array: Box::new(fold_expr(array)),
            index: Box::new(fold_expr(index)),
        },
        ExprKind::Length(array) => ExprKind::Length(Box::new(fold_expr(array))),
        ExprKind::IntLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::Ident(_)
        | ExprKind::This
        | ExprKind::NewObject(_) => expr.kind.clone(),
    };
    Expr::new(kind, expr.ty.clone())
}

fn fold_binary(
    op: BinOp,
    lhs: &ExprKind,
    rhs: &ExprKind,
) -> Option<ExprKind> {
    match (lhs, rhs) {
        (ExprKind::IntLit(a), ExprKind::IntLit(b)) => {
            let (a, b) = (*a, *b);
            Some(match op {
                BinOp::Add => ExprKind::IntLit(a.checked_add(b)?),
                BinOp::Sub => ExprKind::IntLit(a.checked_sub(b)?),
                BinOp::Mul => ExprKind::IntLit(a.checked_mul(b)?),
                BinOp::Div => ExprKind::IntLit(a.checked_div(b)?),
                BinOp::Lt => ExprKind::BoolLit(a < b),
                BinOp::Le => ExprKind::BoolLit(a <= b),
                BinOp::Gt => ExprKind::BoolLit(a > b),
                BinOp::Ge => ExprKind::BoolLit(a >= b),
                BinOp::Eq => ExprKind::BoolLit(a == b),
                BinOp::Ne => ExprKind::BoolLit(a != b),
                BinOp::And | BinOp::Or => return None,
            })
        }
        (ExprKind::BoolLit(a), ExprKind::BoolLit(b)) => match op {
            BinOp::And => Some(ExprKind::BoolLit(*a && *b)),
            BinOp::Or => Some(ExprKind::BoolLit(*a || *b)),
            BinOp::Eq => Some(ExprKind::BoolLit(a == b)),
            BinOp::Ne => Some(ExprKind::BoolLit(a != b)),
            _ => None,
        },
        // `false && e` never evaluates `e`; same for `true || e`
        (ExprKind::BoolLit(false), _) if op == BinOp::And => Some(ExprKind::BoolLit(false)),
        (ExprKind::BoolLit(true), _) if op == BinOp::Or => Some(ExprKind::BoolLit(true)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::SourceType;

    #[test]
    fn test_fold_arithmetic() {
        let expr = Expr::binary(
            BinOp::Add,
            Expr::int(2),
            Expr::binary(BinOp::Mul, Expr::int(3), Expr::int(4)),
        );
        assert_eq!(fold_expr(&expr).kind, ExprKind::IntLit(14));
    }

    #[test]
    fn test_fold_keeps_variables() {
        let expr = Expr::binary(
            BinOp::Add,
            Expr::ident("a", SourceType::Int),
            Expr::binary(BinOp::Sub, Expr::int(5), Expr::int(1)),
        );
        let folded = fold_expr(&expr);
        match folded.kind {
            ExprKind::Binary { rhs, .. } => assert_eq!(rhs.kind, ExprKind::IntLit(4)),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_fold_is_pure() {
        let expr = Expr::binary(BinOp::Lt, Expr::int(1), Expr::int(2));
        let before = expr.clone();
        let folded = fold_expr(&expr);
        assert_eq!(expr, before);
        assert_eq!(folded.kind, ExprKind::BoolLit(true));
    }

    #[test]
    fn test_division_by_zero_not_folded() {
        let expr = Expr::binary(BinOp::Div, Expr::int(1), Expr::int(0));
        assert!(matches!(fold_expr(&expr).kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_short_circuit_literal() {
        let call = Expr::call(
            Expr::this("A"),
            "f",
            vec![],
            SourceType::Boolean,
        );
        let and = Expr::binary(BinOp::And, Expr::bool(false), call.clone());
        assert_eq!(fold_expr(&and).kind, ExprKind::BoolLit(false));
        let and = Expr::binary(BinOp::And, Expr::bool(true), call);
        assert!(matches!(fold_expr(&and).kind, ExprKind::Binary { .. }));
    }
}
