use ts2bril::ir::{EffectOp, Instr, Literal, Program, Type, ValueOp};
use ts2bril::{compile_to_ir, compile_with_options, LowerOptions};

fn lower(source: &str) -> Program {
    let options = LowerOptions {
        print_builtin: "print".to_string(),
    };
    compile_with_options(source, &options).unwrap()
}

fn konst(dest: &str, ty: Type, value: Literal) -> Instr {
    Instr::Constant {
        dest: dest.to_string(),
        ty,
        value,
    }
}

fn value(dest: &str, op: ValueOp, ty: Type, args: &[&str]) -> Instr {
    Instr::Value {
        op,
        dest: dest.to_string(),
        ty,
        args: args.iter().map(|s| s.to_string()).collect(),
        funcs: Vec::new(),
    }
}

fn effect(op: EffectOp, args: &[&str], labels: &[&str]) -> Instr {
    Instr::Effect {
        op,
        args: args.iter().map(|s| s.to_string()).collect(),
        funcs: Vec::new(),
        labels: labels.iter().map(|s| s.to_string()).collect(),
    }
}

fn label(name: &str) -> Instr {
    Instr::Label {
        name: name.to_string(),
    }
}

// ── Declarations and arithmetic ──────────────────────────────────────────

#[test]
fn declaration_with_addition() {
    let ir = lower("let x: number = 1 + 2;");

    assert_eq!(ir.functions.len(), 1);
    let main = ir.main().unwrap();
    assert!(main.args.is_empty());
    assert_eq!(main.return_type, None);
    assert_eq!(
        main.instrs,
        vec![
            konst("v0", Type::Float, Literal::Float(1.0)),
            konst("v1", Type::Float, Literal::Float(2.0)),
            value("v2", ValueOp::Fadd, Type::Float, &["v0", "v1"]),
            value("x", ValueOp::Id, Type::Int, &["v2"]),
        ]
    );
}

#[test]
fn identifier_reads_are_copied() {
    let ir = lower("let a: number = 1;\nlet b: number = a;");
    let main = ir.main().unwrap();
    assert_eq!(
        main.instrs,
        vec![
            konst("v0", Type::Float, Literal::Float(1.0)),
            value("a", ValueOp::Id, Type::Int, &["v0"]),
            value("v1", ValueOp::Id, Type::Int, &["a"]),
            value("b", ValueOp::Id, Type::Int, &["v1"]),
        ]
    );
}

#[test]
fn bigint_literal_is_int_constant() {
    let ir = lower("let n: bigint = 7n;");
    assert_eq!(
        ir.main().unwrap().instrs,
        vec![
            konst("v0", Type::Int, Literal::Int(7)),
            value("n", ValueOp::Id, Type::Int, &["v0"]),
        ]
    );
}

#[test]
fn comparison_is_bool_typed() {
    let ir = lower("let c: boolean = 1 <= 2;");
    let main = ir.main().unwrap();
    assert_eq!(
        main.instrs[2],
        value("v2", ValueOp::Fle, Type::Bool, &["v0", "v1"])
    );
    assert_eq!(main.instrs[3], value("c", ValueOp::Id, Type::Bool, &["v2"]));
}

#[test]
fn declaration_without_initializer_emits_nothing() {
    let ir = lower("let x: number;");
    assert!(ir.main().unwrap().instrs.is_empty());
}

#[test]
fn multiple_declarators_lower_in_order() {
    let ir = lower("let a: number = 1, b: number = 2;");
    let dests: Vec<_> = ir
        .main()
        .unwrap()
        .instrs
        .iter()
        .filter_map(|i| i.dest())
        .collect();
    assert_eq!(dests, vec!["v0", "a", "v1", "b"]);
}

#[test]
fn assignment_rebinds_name() {
    let ir = lower("let x: number = 1;\nx = x * 3;");
    let main = ir.main().unwrap();
    let last = main.instrs.last().unwrap();
    assert_eq!(last, &value("x", ValueOp::Id, Type::Int, &["v3"]));
    assert_eq!(
        main.instrs[4],
        value("v3", ValueOp::Fmul, Type::Float, &["v1", "v2"])
    );
}

#[test]
fn parentheses_only_group() {
    let ir = lower("let x: number = (1 + 2) * 3;");
    let ops: Vec<_> = ir
        .main()
        .unwrap()
        .instrs
        .iter()
        .filter_map(|i| i.opcode())
        .collect();
    assert_eq!(ops, vec!["const", "const", "fadd", "const", "fmul", "id"]);
}

// ── Control flow ─────────────────────────────────────────────────────────

#[test]
fn if_without_else() {
    let ir = lower("if (true) { print(1); }");
    assert_eq!(
        ir.main().unwrap().instrs,
        vec![
            konst("v1", Type::Bool, Literal::Bool(true)),
            effect(EffectOp::Br, &["v1"], &["then.0", "else.0"]),
            label("then.0"),
            konst("v2", Type::Float, Literal::Float(1.0)),
            effect(EffectOp::Print, &["v2"], &[]),
            konst("v3", Type::Int, Literal::Int(0)),
            effect(EffectOp::Jmp, &[], &["endif.0"]),
            label("else.0"),
            label("endif.0"),
        ]
    );
}

#[test]
fn if_with_else_branch() {
    let ir = lower("let x: number = 0;\nif (x > 1) { x = 2; } else { x = 3; }");
    let main = ir.main().unwrap();
    let labels: Vec<_> = main.instrs.iter().filter_map(|i| i.label_name()).collect();
    assert_eq!(labels, vec!["then.1", "else.1", "endif.1"]);

    let else_at = main
        .instrs
        .iter()
        .position(|i| i.label_name() == Some("else.1"))
        .unwrap();
    assert_eq!(
        main.instrs[else_at + 1],
        konst("v6", Type::Float, Literal::Float(3.0))
    );
    assert_eq!(
        main.instrs[else_at + 2],
        value("x", ValueOp::Id, Type::Int, &["v6"])
    );
    assert_eq!(main.instrs.last(), Some(&label("endif.1")));
}

#[test]
fn for_loop_shape() {
    let ir = lower("for (let i: number = 0; i < 10; i = i + 1) { print(i); }");
    assert_eq!(
        ir.main().unwrap().instrs,
        vec![
            konst("v1", Type::Float, Literal::Float(0.0)),
            value("i", ValueOp::Id, Type::Int, &["v1"]),
            label("for.cond.0"),
            value("v2", ValueOp::Id, Type::Int, &["i"]),
            konst("v3", Type::Float, Literal::Float(10.0)),
            value("v4", ValueOp::Flt, Type::Bool, &["v2", "v3"]),
            effect(EffectOp::Br, &["v4"], &["for.body.0", "for.end.0"]),
            label("for.body.0"),
            value("v5", ValueOp::Id, Type::Int, &["i"]),
            effect(EffectOp::Print, &["v5"], &[]),
            konst("v6", Type::Int, Literal::Int(0)),
            value("v7", ValueOp::Id, Type::Int, &["i"]),
            konst("v8", Type::Float, Literal::Float(1.0)),
            value("v9", ValueOp::Fadd, Type::Float, &["v7", "v8"]),
            value("i", ValueOp::Id, Type::Int, &["v9"]),
            effect(EffectOp::Jmp, &[], &["for.cond.0"]),
            label("for.end.0"),
        ]
    );
}

#[test]
fn for_loop_without_condition_has_no_branch() {
    let ir = lower("let i: number = 0;\nfor (;;) { i = 1; }");
    let main = ir.main().unwrap();
    assert!(!main.instrs.iter().any(|i| i.opcode() == Some("br")));
    assert_eq!(
        main.instrs.iter().filter(|i| i.opcode() == Some("jmp")).count(),
        1
    );
}

#[test]
fn for_loop_with_expression_initializer() {
    let ir = lower("let i: number = 5;\nfor (i = 0; i < 3; i = i + 1) {}");
    let main = ir.main().unwrap();
    let cond_at = main
        .instrs
        .iter()
        .position(|i| i.label_name().is_some_and(|l| l.starts_with("for.cond")))
        .unwrap();
    assert_eq!(main.instrs[cond_at - 1].dest(), Some("i"));
}

// ── Calls ────────────────────────────────────────────────────────────────

#[test]
fn bare_call_is_void_effect() {
    let ir = lower("foo(1, 2);");
    assert_eq!(
        ir.main().unwrap().instrs,
        vec![
            konst("v0", Type::Float, Literal::Float(1.0)),
            konst("v1", Type::Float, Literal::Float(2.0)),
            Instr::Effect {
                op: EffectOp::Call,
                args: vec!["v0".into(), "v1".into()],
                funcs: vec!["foo".into()],
                labels: Vec::new(),
            },
        ]
    );
}

#[test]
fn call_in_declaration_binds_name() {
    let source = r#"
        function add(a: number, b: number): number {
            return a + b;
        }
        let s: number = add(1, 2);
    "#;
    let ir = lower(source);

    assert_eq!(ir.functions.len(), 2);
    let add = ir.function("add").unwrap();
    assert_eq!(add.args.len(), 2);
    assert_eq!(add.args[0].name, "a");
    assert_eq!(add.args[0].ty, Type::Int);
    assert_eq!(add.return_type, Some(Type::Int));
    assert_eq!(
        add.instrs.last(),
        Some(&effect(EffectOp::Ret, &["v2"], &[]))
    );

    let main = ir.main().unwrap();
    assert_eq!(
        main.instrs[2],
        Instr::Value {
            op: ValueOp::Call,
            dest: "s".into(),
            ty: Type::Int,
            args: vec!["v3".into(), "v4".into()],
            funcs: vec!["add".into()],
        }
    );
    assert_eq!(main.instrs[3], value("s", ValueOp::Id, Type::Int, &["s"]));
}

#[test]
fn call_before_declaration_resolves_type() {
    let source = "let ok: boolean = check(1);\nfunction check(n: number): boolean { return true; }";
    let ir = lower(source);
    assert_eq!(ir.main().unwrap().instrs[1].ty(), Some(Type::Bool));
}

#[test]
fn default_print_builtin_is_console_log() {
    let ir = compile_to_ir("console.log(1, true);").unwrap();
    let main = ir.main().unwrap();
    assert_eq!(main.instrs[2], effect(EffectOp::Print, &["v0", "v1"], &[]));
    assert_eq!(main.instrs[3], konst("v2", Type::Int, Literal::Int(0)));
}

#[test]
fn print_builtin_matches_callee_as_written() {
    let ir = compile_to_ir("console . log(1);").unwrap();
    let main = ir.main().unwrap();
    assert_eq!(main.instrs.len(), 2);
    assert_eq!(main.instrs[1].opcode(), Some("call"));
    assert_eq!(main.instrs[1].to_string(), "call @console.log v0;");
}

#[test]
fn print_result_can_initialize_declaration() {
    let ir = lower("let r: number = print(1);");
    let main = ir.main().unwrap();
    assert_eq!(main.instrs.last(), Some(&value("r", ValueOp::Id, Type::Int, &["v1"])));
}

// ── Functions ────────────────────────────────────────────────────────────

#[test]
fn empty_void_function() {
    let ir = lower("function f(): void {}");
    let f = ir.function("f").unwrap();
    assert!(f.instrs.is_empty());
    assert!(f.args.is_empty());
    assert_eq!(f.return_type, None);
}

#[test]
fn missing_return_annotation_is_void() {
    let ir = lower("function g() { print(1); }");
    assert_eq!(ir.function("g").unwrap().return_type, None);
}

#[test]
fn body_less_declaration_has_no_instructions() {
    let ir = lower("function h(x: number): number;");
    let h = ir.function("h").unwrap();
    assert_eq!(h.args.len(), 1);
    assert!(h.instrs.is_empty());
}

#[test]
fn statements_after_function_return_to_main() {
    let source = "function f(): void { print(1); }\nlet x: number = 2;";
    let ir = lower(source);
    assert_eq!(ir.function("f").unwrap().instrs.len(), 3);
    let main = ir.main().unwrap();
    assert_eq!(main.instrs.len(), 2);
    assert_eq!(main.instrs[1].dest(), Some("x"));
}

#[test]
fn nested_function_restores_outer() {
    let source = r#"
        function outer(): void {
            function inner(): void { print(1); }
            print(2);
        }
    "#;
    let ir = lower(source);
    let names: Vec<_> = ir.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "outer", "inner"]);
    let outer = ir.function("outer").unwrap();
    assert_eq!(outer.instrs.len(), 3);
    assert_eq!(outer.instrs[0], konst("v2", Type::Float, Literal::Float(2.0)));
}

#[test]
fn bare_return() {
    let ir = lower("function f(): void { return; }");
    assert_eq!(
        ir.function("f").unwrap().instrs,
        vec![effect(EffectOp::Ret, &[], &[])]
    );
}

// ── Text form ────────────────────────────────────────────────────────────

#[test]
fn text_rendering() {
    let ir = lower("function f(a: number): boolean { return true; }\nlet x: number = 1;");
    let text = ir.to_string();
    assert!(text.contains("@main {"), "{text}");
    assert!(text.contains("  v1: float = const 1.0;"), "{text}");
    assert!(text.contains("  x: int = id v1;"), "{text}");
    assert!(text.contains("@f(a: int): bool {"), "{text}");
    assert!(text.contains("  ret v0;"), "{text}");
}
