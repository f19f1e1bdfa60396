//! 端到端流水线测试

use jmmc::frontend::{BinOp, ClassDecl, Expr, MethodDecl, Program, SourceType, Stmt, VarDecl};
use jmmc::middle::ir::Instruction;
use jmmc::util::config::CompilerConfig;
use jmmc::{compile, CompileError};

fn class_with(methods: Vec<MethodDecl>) -> Program {
    Program {
        imports: vec!["io".to_string()],
        class: ClassDecl {
            name: "Test".to_string(),
            extends: None,
            fields: vec![],
            methods,
        },
    }
}

fn method(
    name: &str,
    return_type: SourceType,
    params: Vec<VarDecl>,
    locals: Vec<VarDecl>,
    body: Vec<Stmt>,
) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        is_public: true,
        is_static: false,
        return_type,
        params,
        locals,
        body,
    }
}

fn int(name: &str) -> Expr {
    Expr::ident(name, SourceType::Int)
}

fn position(
    text: &str,
    needle: &str,
) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, text))
}

/// boolean a() / boolean b() / void m() { if (this.a() && this.b()) { io.println(); } }
fn short_circuit_program() -> Program {
    let flag = |name: &str| {
        method(
            name,
            SourceType::Boolean,
            vec![],
            vec![],
            vec![Stmt::Return(Some(Expr::bool(true)))],
        )
    };
    let call = |name: &str| Expr::call(Expr::this("Test"), name, vec![], SourceType::Boolean);
    let m = method(
        "m",
        SourceType::Void,
        vec![],
        vec![],
        vec![Stmt::If {
            cond: Expr::binary(BinOp::And, call("a"), call("b")),
            then_branch: Box::new(Stmt::Expr(Expr::call(
                Expr::ident("io", SourceType::class("io")),
                "println",
                vec![],
                SourceType::Void,
            ))),
            else_branch: None,
        }],
    );
    class_with(vec![flag("a"), flag("b"), m])
}

#[test]
fn test_short_circuit_and_skips_right_operand() {
    let compilation = compile(&short_circuit_program(), &CompilerConfig::default()).unwrap();
    let text = &compilation.jasmin;

    let call_a = position(text, "invokevirtual Test/a()Z");
    let branch = position(text, "ifne AND_RHS_1");
    let skip = position(text, "goto AND_END_1");
    let rhs = position(text, "AND_RHS_1:");
    let call_b = position(text, "invokevirtual Test/b()Z");
    let end = position(text, "AND_END_1:");
    assert!(call_a < branch && branch < skip && skip < rhs && rhs < call_b && call_b < end);

    // IR 中 b() 只出现在 AND_RHS 标签之后
    let m = compilation.unit.method("m").unwrap();
    let label = m
        .instructions
        .iter()
        .position(|i| matches!(i, Instruction::Label(l) if l == "AND_RHS_1"))
        .unwrap();
    let invoke_b = m
        .instructions
        .iter()
        .position(|i| match i {
            Instruction::Assign { rhs, .. } => {
                matches!(rhs.as_ref(), Instruction::Invoke { method, .. } if method == "b")
            }
            _ => false,
        })
        .unwrap();
    assert!(label < invoke_b);
}

/// int m(int a) { int c; c = 2 * 3 + a; return c; }
fn foldable() -> Program {
    class_with(vec![method(
        "m",
        SourceType::Int,
        vec![VarDecl::new("a", SourceType::Int)],
        vec![VarDecl::new("c", SourceType::Int)],
        vec![
            Stmt::Assign {
                target: "c".to_string(),
                value: Expr::binary(
                    BinOp::Add,
                    Expr::binary(BinOp::Mul, Expr::int(2), Expr::int(3)),
                    int("a"),
                ),
            },
            Stmt::Return(Some(int("c"))),
        ],
    )])
}

#[test]
fn test_constant_folding_switch() {
    let plain = compile(&foldable(), &CompilerConfig::default()).unwrap();
    assert!(plain.ir().contains("2.i32 *.i32 3.i32"), "{}", plain.ir());

    let config = CompilerConfig {
        fold_constants: true,
        ..CompilerConfig::default()
    };
    let folded = compile(&foldable(), &config).unwrap();
    assert!(folded.ir().contains("c.i32 :=.i32 6.i32 +.i32 a.i32"), "{}", folded.ir());
    assert!(folded.jasmin.contains("bipush 6"));
}

#[test]
fn test_disabled_allocation_is_identity() {
    let config = CompilerConfig {
        register_allocation: false,
        ..CompilerConfig::default()
    };
    let compilation = compile(&foldable(), &config).unwrap();
    let m = compilation.unit.method("m").unwrap();
    for (slot, entry) in m.vars.values().enumerate() {
        assert_eq!(entry.register, Some(slot as u16));
    }
}

#[test]
fn test_compilation_is_deterministic() {
    let first = compile(&short_circuit_program(), &CompilerConfig::default()).unwrap();
    let second = compile(&short_circuit_program(), &CompilerConfig::default()).unwrap();
    assert_eq!(first.jasmin, second.jasmin);
    assert_eq!(first.ir(), second.ir());
}

#[test]
fn test_unknown_name_is_reported_with_method() {
    let program = class_with(vec![method(
        "broken",
        SourceType::Int,
        vec![],
        vec![],
        vec![Stmt::Return(Some(int("missing")))],
    )]);
    let err = compile(&program, &CompilerConfig::default()).unwrap_err();
    assert!(matches!(&err, CompileError::Lookup { name, .. } if name == "missing"));
    assert_eq!(err.method(), "broken");
}
