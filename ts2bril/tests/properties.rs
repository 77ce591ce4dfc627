use std::collections::HashSet;

use ts2bril::ir::blocks::form_blocks;
use ts2bril::ir::verify::{verify_program, VerifyError};
use ts2bril::ir::{
    AstNodeKind, ControlFlowComponent, EffectOp, Function, Instr, Program, ValueOp,
};
use ts2bril::{compile_with_options, LowerOptions};

fn lower(source: &str) -> Program {
    let options = LowerOptions {
        print_builtin: "print".to_string(),
    };
    compile_with_options(source, &options).unwrap()
}

fn count_op(f: &Function, op: &str) -> usize {
    f.instrs.iter().filter(|i| i.opcode() == Some(op)).count()
}

const NESTED: &str = r#"
    function sum(n: number): number {
        let total: number = 0;
        for (let i: number = 0; i < n; i = i + 1) {
            if (i > 2) {
                total = total + i;
            } else {
                print(i);
            }
        }
        return total;
    }
    let r: number = sum(5);
    if (r == 7) { print(r); }
    for (let j: number = 0; j < 2; j = j + 1) {
        if (true) { print(j); }
    }
"#;

#[test]
fn lowered_programs_verify() {
    for source in [
        NESTED,
        "let x: number = 1 + 2;",
        "foo(1, 2);",
        "function f(): void {}",
        "if (true) { print(1); }",
    ] {
        let ir = lower(source);
        verify_program(&ir).unwrap_or_else(|e| panic!("{e}\n{ir}"));
    }
}

fn suffix(label: &str) -> usize {
    label.rsplit('.').next().unwrap().parse().unwrap()
}

#[test]
fn labels_are_unique() {
    let ir = lower(NESTED);
    let mut seen = HashSet::new();
    for f in &ir.functions {
        for name in f.instrs.iter().filter_map(|i| i.label_name()) {
            assert!(seen.insert(name.to_string()), "label {name} defined twice");
        }
    }
}

#[test]
fn construct_suffixes_increase_in_emission_order() {
    let ir = lower(NESTED);
    for f in &ir.functions {
        let openers: Vec<usize> = f
            .instrs
            .iter()
            .filter_map(|i| i.label_name())
            .filter(|l| l.starts_with("then.") || l.starts_with("for.cond."))
            .map(suffix)
            .collect();
        assert!(
            openers.windows(2).all(|w| w[0] < w[1]),
            "@{}: {openers:?}",
            f.name
        );
    }
}

#[test]
fn construct_labels_share_one_suffix() {
    let ir = lower("if (true) {} else {}\nfor (;;) {}");
    let labels: Vec<_> = ir
        .main()
        .unwrap()
        .instrs
        .iter()
        .filter_map(|i| i.label_name())
        .collect();
    assert_eq!(
        labels,
        vec!["then.0", "else.0", "endif.0", "for.cond.2", "for.body.2", "for.end.2"]
    );
}

#[test]
fn temporaries_are_never_reused() {
    let ir = lower(NESTED);
    let mut seen = HashSet::new();
    for f in &ir.functions {
        for dest in f.instrs.iter().filter_map(|i| i.dest()) {
            if dest.starts_with('v') && dest[1..].chars().all(|c| c.is_ascii_digit()) {
                assert!(seen.insert(dest.to_string()), "{dest} assigned twice");
            }
        }
    }
}

#[test]
fn one_branch_and_one_jump_per_construct() {
    let ir = lower(NESTED);
    // one for + one if
    let sum = ir.function("sum").unwrap();
    assert_eq!(count_op(sum, "br"), 2);
    assert_eq!(count_op(sum, "jmp"), 2);
    // if + for + if
    let main = ir.main().unwrap();
    assert_eq!(count_op(main, "br"), 3);
    assert_eq!(count_op(main, "jmp"), 3);
}

#[test]
fn branch_targets_come_in_true_false_order() {
    let ir = lower(NESTED);
    for f in &ir.functions {
        for i in &f.instrs {
            if let Instr::Effect {
                op: EffectOp::Br,
                labels,
                ..
            } = i
            {
                assert_eq!(labels.len(), 2);
                let ok = (labels[0].starts_with("then") && labels[1].starts_with("else"))
                    || (labels[0].starts_with("for.body") && labels[1].starts_with("for.end"));
                assert!(ok, "unexpected targets {labels:?}");
            }
        }
    }
}

#[test]
fn call_arguments_match_parameters() {
    let ir = lower(NESTED);
    let sum = ir.function("sum").unwrap();
    for f in &ir.functions {
        for i in &f.instrs {
            if let Instr::Value {
                op: ValueOp::Call,
                args,
                funcs,
                ..
            } = i
            {
                assert_eq!(funcs, &vec!["sum".to_string()]);
                assert_eq!(args.len(), sum.args.len());
            }
        }
    }
}

#[test]
fn every_instruction_is_attributed() {
    let ir = lower(NESTED);
    for (fi, f) in ir.functions.iter().enumerate() {
        for ii in 0..f.instrs.len() {
            assert!(
                !ir.source_map.get_mappings_for_instr((fi, ii)).is_empty(),
                "@{} instruction {ii} has no source node",
                f.name
            );
        }
    }
}

// ── Basic blocks ─────────────────────────────────────────────────────────

#[test]
fn blocks_split_at_labels_and_terminators() {
    let ir = lower("if (true) { print(1); }");
    let blocks = form_blocks(ir.main().unwrap());

    let labels: Vec<_> = blocks.iter().map(|b| b.label).collect();
    assert_eq!(
        labels,
        vec![None, Some("then.0"), Some("else.0"), Some("endif.0")]
    );
    assert_eq!(blocks[0].instrs.len(), 2);
    assert!(blocks[0].terminator().is_some());
    assert_eq!(blocks[1].body().len(), 4);
    assert!(blocks[2].body().is_empty());

    let total: usize = blocks.iter().map(|b| b.instrs.len()).sum();
    assert_eq!(total, ir.main().unwrap().instrs.len());
}

#[test]
fn empty_function_has_no_blocks() {
    let ir = lower("function f(): void {}");
    assert!(form_blocks(ir.function("f").unwrap()).is_empty());
}

// ── Verifier ─────────────────────────────────────────────────────────────

#[test]
fn verifier_rejects_undefined_reads() {
    let mut ir = lower("let x: number = 1;");
    ir.functions[0].instrs.remove(0);
    assert_eq!(
        verify_program(&ir),
        Err(VerifyError::UndefinedVariable {
            function: "main".into(),
            index: 0,
            name: "v0".into(),
        })
    );
}

#[test]
fn verifier_rejects_missing_labels() {
    let mut ir = lower("if (true) {}");
    ir.functions[0]
        .instrs
        .retain(|i| i.label_name() != Some("endif.0"));
    assert!(matches!(
        verify_program(&ir),
        Err(VerifyError::UndefinedLabel { label, .. }) if label == "endif.0"
    ));
}

#[test]
fn verifier_rejects_duplicate_functions() {
    let mut ir = lower("function f(): void {}");
    ir.functions.push(Function::new("f", Vec::new(), None));
    assert_eq!(
        verify_program(&ir),
        Err(VerifyError::DuplicateFunction("f".into()))
    );
}

#[test]
fn verifier_requires_main() {
    assert_eq!(verify_program(&Program::new()), Err(VerifyError::MissingMain));
}

#[test]
fn source_map_resolves_positions() {
    let ir = lower("let x: number = 1;\nif (x > 0) {\n    x = 2;\n}");
    let map = &ir.source_map;

    let then_instrs = map.get_instrs_for_component(ControlFlowComponent::ThenBranch);
    assert_eq!(then_instrs.len(), 2, "const and copy inside the then branch");

    let (f, i) = then_instrs[1];
    assert_eq!(ir.functions[f].instrs[i].dest(), Some("x"));
    let tag = map.get_mappings_for_instr((f, i))[0];
    assert_eq!(map.position_of(tag.ast_node_id), Some((3, 5)));
    assert_eq!(
        map.get_ast_info_by_id(tag.ast_node_id).map(|n| n.kind),
        Some(AstNodeKind::Assign)
    );
    assert!(map.get_instrs_for_ast(tag.ast_node_id).contains(&(f, i)));

    let glue = map.get_instrs_for_component(ControlFlowComponent::ControlFlowGlue);
    assert_eq!(glue.len(), 5, "br, then, jmp, else, endif");
}

#[test]
fn function_in_branch_is_not_tagged_with_branch() {
    let ir = lower("if (true) {\n    function f(): void { let y: number = 1; }\n}");
    let f_index = ir
        .functions
        .iter()
        .position(|f| f.name == "f")
        .expect("f is lowered");

    let tagged = ir
        .source_map
        .get_instrs_for_component(ControlFlowComponent::ThenBranch);
    assert!(tagged.iter().all(|&(f, _)| f != f_index), "{tagged:?}");
    assert!(!ir.functions[f_index].instrs.is_empty());
}
