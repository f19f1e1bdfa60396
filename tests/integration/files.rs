//! 文件级入口测试

use jmmc::util::config::{load_for_dir, save_project_config, CompilerConfig, ProjectConfig, CONFIG_FILE};
use jmmc::{compile_file, load_program};
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_fixture_compiles() {
    let compilation = compile_file(&fixture("simple.json"), &CompilerConfig::default()).unwrap();
    let text = &compilation.jasmin;

    assert!(text.starts_with(".class public Simple\n.super java/lang/Object\n"));
    assert!(text.contains(".method public add(II)I"));
    assert!(text.contains("    iload_1\n    iload_2\n    iadd\n    istore_3\n    iload_3\n    ireturn"));
    assert!(text.contains(".method public static main([Ljava/lang/String;)V"));
    assert!(text.contains("    new Simple\n    dup\n    invokespecial Simple/<init>()V"));
    assert!(text.contains("invokevirtual Simple/add(II)I"));
    assert!(text.contains("invokestatic io/println(I)V"));
    assert_eq!(text.matches(".end method").count(), 3);
}

#[test]
fn test_fixture_ir_lists_registers() {
    let compilation = compile_file(&fixture("simple.json"), &CompilerConfig::default()).unwrap();
    let ir = compilation.ir();
    assert!(ir.contains("c.i32 :=.i32 a.i32 +.i32 b.i32;"), "{}", ir);
    assert!(ir.contains("// registers: this=0, a=1, b=2, c=3"), "{}", ir);
}

#[test]
fn test_program_json_round_trip() {
    let program = load_program(&fixture("simple.json")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let copy = dir.path().join("copy.json");
    fs::write(&copy, serde_json::to_string_pretty(&program).unwrap()).unwrap();

    assert_eq!(load_program(&copy).unwrap(), program);
}

#[test]
fn test_missing_file() {
    let err = compile_file(&fixture("does_not_exist.json"), &CompilerConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Failed to read file"));
}

#[test]
fn test_malformed_program() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "imports": [], "class": { "methods": 3 } }"#).unwrap();

    let err = compile_file(&path, &CompilerConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Failed to decode program"));
}

#[test]
fn test_project_config_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProjectConfig {
        compiler: CompilerConfig {
            register_allocation: false,
            fold_constants: false,
        },
    };
    save_project_config(&dir.path().join(CONFIG_FILE), &config).unwrap();

    let loaded = load_for_dir(dir.path()).unwrap();
    assert!(!loaded.compiler.register_allocation);

    let compilation = compile_file(&fixture("simple.json"), &loaded.compiler).unwrap();
    let add = compilation.unit.method("add").unwrap();
    for (slot, name) in ["this", "a", "b", "c"].iter().enumerate() {
        assert_eq!(add.register_of(name), Some(slot as u16));
    }
    // main 不参与分配
    assert!(!compilation.unit.method("main").unwrap().has_registers());
}
