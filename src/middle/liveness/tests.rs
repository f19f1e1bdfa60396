//! 活跃变量分析测试

use super::*;
use crate::middle::ir::{
    BinaryOperator, Condition, Instruction, Method, Operand, VarEntry, VarKind, VarTable, Variable,
};
use crate::middle::types::TypeTag;
use proptest::prelude::*;
use std::collections::HashSet;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

fn int_var(name: &str) -> Variable {
    Variable::new(name, TypeTag::Int32)
}

fn method_of(instructions: Vec<Instruction>) -> Method {
    let mut vars = VarTable::new();
    for name in NAMES {
        vars.insert(name.to_string(), VarEntry::new(TypeTag::Int32, VarKind::Local));
    }
    Method {
        name: "p".to_string(),
        is_public: true,
        is_static: true,
        is_constructor: false,
        params: Vec::new(),
        return_type: TypeTag::Int32,
        instructions,
        vars,
    }
}

fn set(names: &[&str]) -> NameSet {
    names.iter().map(|s| s.to_string()).collect()
}

/// Reference: `name` is live before `idx` iff some path from `idx` reads it
/// before writing it
fn brute_force_live_in(
    liveness: &Liveness,
    idx: usize,
    name: &str,
) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![idx];
    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        if liveness.used[node].contains(name) {
            return true;
        }
        if liveness.defined[node].contains(name) {
            continue;
        }
        stack.extend(liveness.successors[node].iter().copied());
    }
    false
}

#[test]
fn test_straight_line() {
    // b := a + 1; c := b; ret c
    let method = method_of(vec![
        Instruction::assign(
            int_var("b"),
            Instruction::BinaryOp {
                op: BinaryOperator::Add,
                lhs: Operand::var("a", TypeTag::Int32),
                rhs: Operand::int(1),
                ty: TypeTag::Int32,
            },
        ),
        Instruction::assign(int_var("c"), Instruction::SingleOp(Operand::var("b", TypeTag::Int32))),
        Instruction::Return(Some(Operand::var("c", TypeTag::Int32))),
    ]);
    let liveness = analyze(&method).unwrap();

    assert_eq!(liveness.live_in[0], set(&["a"]));
    assert_eq!(liveness.live_out[0], set(&["b"]));
    assert_eq!(liveness.live_in[1], set(&["b"]));
    assert_eq!(liveness.live_out[1], set(&["c"]));
    assert_eq!(liveness.live_in[2], set(&["c"]));
    assert!(liveness.live_out[2].is_empty());
    assert!(!liveness.is_live_in(3, "a"));
}

#[test]
fn test_loop_keeps_variable_live() {
    // WHILE_0: if (a >= 10) goto END; a := a + 1; goto WHILE_0; END: ret b
    let method = method_of(vec![
        Instruction::Label("WHILE_0".to_string()),
        Instruction::CondBranch {
            cond: Condition::Compare {
                op: BinaryOperator::Ge,
                lhs: Operand::var("a", TypeTag::Int32),
                rhs: Operand::int(10),
            },
            label: "ENDWHILE_0".to_string(),
        },
        Instruction::assign(
            int_var("a"),
            Instruction::BinaryOp {
                op: BinaryOperator::Add,
                lhs: Operand::var("a", TypeTag::Int32),
                rhs: Operand::int(1),
                ty: TypeTag::Int32,
            },
        ),
        Instruction::Goto("WHILE_0".to_string()),
        Instruction::Label("ENDWHILE_0".to_string()),
        Instruction::Return(Some(Operand::var("b", TypeTag::Int32))),
    ]);
    let liveness = analyze(&method).unwrap();

    assert_eq!(liveness.successors[1].as_slice(), &[2, 4]);
    assert_eq!(liveness.successors[3].as_slice(), &[0]);
    // a 和 b 在整个循环中都活跃
    for idx in 0..4 {
        assert!(liveness.is_live_in(idx, "a"), "a not live at {}", idx);
        assert!(liveness.is_live_in(idx, "b"), "b not live at {}", idx);
    }
    assert!(liveness.live_out[2].contains("a"));
    assert!(!liveness.is_live_in(5, "a"));
}

#[test]
fn test_dead_definition_not_live() {
    // a := 1; a := 2; ret a
    let method = method_of(vec![
        Instruction::assign(int_var("a"), Instruction::SingleOp(Operand::int(1))),
        Instruction::assign(int_var("a"), Instruction::SingleOp(Operand::int(2))),
        Instruction::Return(Some(Operand::var("a", TypeTag::Int32))),
    ]);
    let liveness = analyze(&method).unwrap();
    assert!(liveness.live_out[0].is_empty());
    assert!(liveness.live_in[1].is_empty());
}

#[test]
fn test_unknown_label_is_lookup_failure() {
    let method = method_of(vec![Instruction::Goto("NOWHERE".to_string())]);
    assert!(matches!(
        analyze(&method),
        Err(crate::error::CompileError::Lookup { name, .. }) if name == "NOWHERE"
    ));
}

fn operand_strategy() -> impl Strategy<Value = Operand> {
    prop_oneof![
        (0usize..4).prop_map(|i| Operand::var(NAMES[i], TypeTag::Int32)),
        (-3i32..10).prop_map(Operand::int),
    ]
}

fn instruction_strategy() -> impl Strategy<Value = Instruction> {
    prop_oneof![
        (0usize..4, operand_strategy(), operand_strategy()).prop_map(|(d, lhs, rhs)| {
            Instruction::assign(
                int_var(NAMES[d]),
                Instruction::BinaryOp {
                    op: BinaryOperator::Add,
                    lhs,
                    rhs,
                    ty: TypeTag::Int32,
                },
            )
        }),
        (0usize..4, operand_strategy())
            .prop_map(|(d, src)| Instruction::assign(int_var(NAMES[d]), Instruction::SingleOp(src))),
        (0usize..3).prop_map(|l| Instruction::Goto(format!("L{}", l))),
        (operand_strategy(), 0usize..3).prop_map(|(lhs, l)| Instruction::CondBranch {
            cond: Condition::Compare {
                op: BinaryOperator::Lt,
                lhs,
                rhs: Operand::int(0),
            },
            label: format!("L{}", l),
        }),
        operand_strategy().prop_map(|op| Instruction::Return(Some(op))),
    ]
}

fn method_strategy() -> impl Strategy<Value = Method> {
    (
        proptest::collection::vec(instruction_strategy(), 1..14),
        proptest::collection::vec(0usize..16, 3),
    )
        .prop_map(|(mut instructions, positions)| {
            for (label, pos) in positions.into_iter().enumerate() {
                let at = pos.min(instructions.len());
                instructions.insert(at, Instruction::Label(format!("L{}", label)));
            }
            method_of(instructions)
        })
}

proptest! {
    #[test]
    fn prop_matches_brute_force(method in method_strategy()) {
        let liveness = analyze(&method).unwrap();
        for idx in 0..method.instructions.len() {
            for name in NAMES {
                prop_assert_eq!(
                    liveness.is_live_in(idx, name),
                    brute_force_live_in(&liveness, idx, name),
                    "instruction {} variable {}", idx, name
                );
            }
        }
    }

    #[test]
    fn prop_live_out_is_union_of_successors(method in method_strategy()) {
        let liveness = analyze(&method).unwrap();
        for idx in 0..liveness.len() {
            let expected: NameSet = liveness.successors[idx]
                .iter()
                .flat_map(|&s| liveness.live_in[s].iter().cloned())
                .collect();
            prop_assert_eq!(&liveness.live_out[idx], &expected);
        }
    }
}
