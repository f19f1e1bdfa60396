//! 语句降级测试

use super::{labels, lower_only, method, program_with};
use crate::frontend::ast::{BinOp, Expr, ExprKind, Program, SourceType, Stmt, VarDecl};
use crate::middle::ir::{BinaryOperator, Condition, Instruction, Operand, Variable};
use crate::middle::types::TypeTag;

fn x() -> Expr {
    Expr::ident("x", SourceType::Int)
}

/// while (x < 10) { x = x + 1; }
fn counting_loop() -> Stmt {
    Stmt::While {
        cond: Expr::binary(BinOp::Lt, x(), Expr::int(10)),
        body: Box::new(Stmt::Block(vec![Stmt::Assign {
            target: "x".to_string(),
            value: Expr::binary(BinOp::Add, x(), Expr::int(1)),
        }])),
    }
}

#[test]
fn test_while_loop_shape() {
    let program = program_with(
        method(
            "m",
            SourceType::Void,
            vec![VarDecl::new("x", SourceType::Int)],
            vec![],
            vec![counting_loop()],
        ),
        vec![],
        &[],
    );
    let lowered = lower_only(&program);

    assert_eq!(
        lowered.instructions,
        vec![
            Instruction::Label("WHILE_0".to_string()),
            Instruction::CondBranch {
                cond: Condition::Compare {
                    op: BinaryOperator::Ge,
                    lhs: Operand::var("x", TypeTag::Int32),
                    rhs: Operand::int(10),
                },
                label: "ENDWHILE_0".to_string(),
            },
            Instruction::assign(
                Variable::new("x", TypeTag::Int32),
                Instruction::BinaryOp {
                    op: BinaryOperator::Add,
                    lhs: Operand::var("x", TypeTag::Int32),
                    rhs: Operand::int(1),
                    ty: TypeTag::Int32,
                },
            ),
            Instruction::Goto("WHILE_0".to_string()),
            Instruction::Label("ENDWHILE_0".to_string()),
            Instruction::Return(None),
        ]
    );
}

#[test]
fn test_repeated_constructs_get_unique_labels() {
    let program = program_with(
        method(
            "m",
            SourceType::Void,
            vec![VarDecl::new("x", SourceType::Int)],
            vec![],
            vec![counting_loop(), counting_loop()],
        ),
        vec![],
        &[],
    );
    let lowered = lower_only(&program);
    assert_eq!(
        labels(&lowered),
        vec!["WHILE_0", "ENDWHILE_0", "WHILE_1", "ENDWHILE_1"]
    );
}

#[test]
fn test_if_else_shape() {
    // if (b) x = 1; else x = 2;
    let assign = |v| Stmt::Assign {
        target: "x".to_string(),
        value: Expr::int(v),
    };
    let program = program_with(
        method(
            "m",
            SourceType::Int,
            vec![VarDecl::new("b", SourceType::Boolean)],
            vec![VarDecl::new("x", SourceType::Int)],
            vec![
                Stmt::If {
                    cond: Expr::ident("b", SourceType::Boolean),
                    then_branch: Box::new(assign(1)),
                    else_branch: Some(Box::new(assign(2))),
                },
                Stmt::Return(Some(x())),
            ],
        ),
        vec![],
        &[],
    );
    let lowered = lower_only(&program);

    assert_eq!(
        lowered.instructions[0],
        Instruction::CondBranch {
            cond: Condition::Compare {
                op: BinaryOperator::Eq,
                lhs: Operand::var("b", TypeTag::Bool),
                rhs: Operand::bool(false),
            },
            label: "ELSE_0".to_string(),
        }
    );
    assert_eq!(lowered.instructions[2], Instruction::Goto("ENDIF_0".to_string()));
    assert_eq!(labels(&lowered), vec!["ELSE_0", "ENDIF_0"]);
    // 非 void 方法不追加 return
    assert!(matches!(lowered.instructions.last(), Some(Instruction::Return(Some(_)))));
}

#[test]
fn test_if_without_else_branches_to_end() {
    // if (!(x < 3)) x = 0;
    let program = program_with(
        method(
            "m",
            SourceType::Void,
            vec![VarDecl::new("x", SourceType::Int)],
            vec![],
            vec![Stmt::If {
                cond: Expr::not(Expr::new(
                    ExprKind::Paren(Box::new(Expr::binary(BinOp::Lt, x(), Expr::int(3)))),
                    SourceType::Boolean,
                )),
                then_branch: Box::new(Stmt::Assign {
                    target: "x".to_string(),
                    value: Expr::int(0),
                }),
                else_branch: None,
            }],
        ),
        vec![],
        &[],
    );
    let lowered = lower_only(&program);

    // !(x < 3) 为假时跳过 then 分支，即 x < 3 时跳转
    assert_eq!(
        lowered.instructions[0],
        Instruction::CondBranch {
            cond: Condition::Compare {
                op: BinaryOperator::Lt,
                lhs: Operand::var("x", TypeTag::Int32),
                rhs: Operand::int(3),
            },
            label: "ENDIF_0".to_string(),
        }
    );
    assert_eq!(labels(&lowered), vec!["ENDIF_0"]);
}

#[test]
fn test_array_assignment() {
    // a[i] = 5;
    let program = program_with(
        method(
            "m",
            SourceType::Void,
            vec![
                VarDecl::new("a", SourceType::int_array()),
                VarDecl::new("i", SourceType::Int),
            ],
            vec![],
            vec![Stmt::ArrayAssign {
                target: "a".to_string(),
                index: Expr::ident("i", SourceType::Int),
                value: Expr::int(5),
            }],
        ),
        vec![],
        &[],
    );
    let lowered = lower_only(&program);
    assert_eq!(
        lowered.instructions[0],
        Instruction::ArrayStore {
            array: Variable::new("a", TypeTag::int_array()),
            index: Operand::var("i", TypeTag::Int32),
            value: Operand::int(5),
        }
    );
}

#[test]
fn test_expression_statement_keeps_only_calls() {
    let program = program_with(
        method(
            "m",
            SourceType::Void,
            vec![VarDecl::new("a", SourceType::Int)],
            vec![],
            vec![
                Stmt::Expr(Expr::binary(BinOp::Add, x_param(), Expr::int(1))),
                Stmt::Expr(Expr::call(Expr::this("Test"), "m", vec![x_param()], SourceType::Void)),
            ],
        ),
        vec![],
        &[],
    );
    let lowered = lower_only(&program);
    assert_eq!(lowered.instructions.len(), 2);
    assert!(matches!(lowered.instructions[0], Instruction::Invoke { .. }));
    assert_eq!(lowered.instructions[1], Instruction::Return(None));
}

fn x_param() -> Expr {
    Expr::ident("a", SourceType::Int)
}

/// int f(boolean c) { if (c) return 1; else return 2; }
fn both_branches_return() -> Program {
    program_with(
        method(
            "f",
            SourceType::Int,
            vec![VarDecl::new("c", SourceType::Boolean)],
            vec![],
            vec![Stmt::If {
                cond: Expr::ident("c", SourceType::Boolean),
                then_branch: Box::new(Stmt::Return(Some(Expr::int(1)))),
                else_branch: Some(Box::new(Stmt::Return(Some(Expr::int(2))))),
            }],
        ),
        vec![],
        &[],
    )
}

#[test]
fn test_if_else_returning_on_both_branches() {
    let lowered = lower_only(&both_branches_return());

    assert_eq!(
        lowered.instructions,
        vec![
            Instruction::CondBranch {
                cond: Condition::Compare {
                    op: BinaryOperator::Eq,
                    lhs: Operand::var("c", TypeTag::Bool),
                    rhs: Operand::bool(false),
                },
                label: "ELSE_0".to_string(),
            },
            Instruction::Return(Some(Operand::int(1))),
            Instruction::Label("ELSE_0".to_string()),
            Instruction::Return(Some(Operand::int(2))),
        ]
    );
}

#[test]
fn test_infinite_loop_left_only_by_return() {
    // int w(int a) { while (true) { if (a > 10) return a; a = a + 1; } }
    let program = program_with(
        method(
            "w",
            SourceType::Int,
            vec![VarDecl::new("a", SourceType::Int)],
            vec![],
            vec![Stmt::While {
                cond: Expr::bool(true),
                body: Box::new(Stmt::Block(vec![
                    Stmt::If {
                        cond: Expr::binary(BinOp::Gt, x_param(), Expr::int(10)),
                        then_branch: Box::new(Stmt::Return(Some(x_param()))),
                        else_branch: None,
                    },
                    Stmt::Assign {
                        target: "a".to_string(),
                        value: Expr::binary(BinOp::Add, x_param(), Expr::int(1)),
                    },
                ])),
            }],
        ),
        vec![],
        &[],
    );
    let lowered = lower_only(&program);

    // 没有循环出口，ENDWHILE_0 无人跳转
    assert_eq!(labels(&lowered), vec!["WHILE_0", "ENDIF_1"]);
    assert_eq!(
        lowered
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::CondBranch { .. }))
            .count(),
        1
    );
    assert_eq!(lowered.instructions.last(), Some(&Instruction::Goto("WHILE_0".to_string())));
}
