use ts2bril::frontend::lexer::{tokenize, Token};
use ts2bril::ir::ast::{parse_to_ast, BinOp, DeclKind, Expr, Stmt};
use ts2bril::CompileError;

// ── Lexer ────────────────────────────────────────────────────────────────

#[test]
fn tokens_and_comments() {
    let source = "let x = 10n; // trailing\n/* block */ y === 'a'";
    let tokens: Vec<Token> = tokenize(source).unwrap().into_iter().map(|t| t.1).collect();
    assert_eq!(
        tokens,
        vec![
            Token::Let,
            Token::Ident("x".into()),
            Token::Assign,
            Token::BigInt("10".into()),
            Token::Semicolon,
            Token::Ident("y".into()),
            Token::StrictEq,
            Token::Str("a".into()),
        ]
    );
}

#[test]
fn unexpected_character() {
    match parse_to_ast("let x = 1;\nlet y = 2 # 3;") {
        Err(CompileError::Lexical(e)) => {
            assert_eq!(e.unexpected_char, '#');
            assert_eq!((e.line, e.column), (2, 11));
        }
        other => panic!("expected a lexical error, got {:?}", other.err()),
    }
}

// ── Parser ───────────────────────────────────────────────────────────────

#[test]
fn precedence_and_associativity() {
    let parsed = parse_to_ast("a = b = 1 + 2 * 3 < 4;").unwrap();
    let Stmt::ExprStmt { expr, .. } = &parsed.program.statements[0] else {
        panic!("expected an expression statement");
    };
    let Expr::Assign { value, .. } = expr else {
        panic!("expected assignment, got {expr:?}");
    };
    let Expr::Assign { value: inner, .. } = value.as_ref() else {
        panic!("assignment should be right-associative");
    };
    let Expr::Binary { op, left, .. } = inner.as_ref() else {
        panic!("expected a comparison");
    };
    assert_eq!(*op, BinOp::Lt);
    assert!(matches!(left.as_ref(), Expr::Binary { op: BinOp::Add, .. }));
}

#[test]
fn declarations_keep_annotations() {
    let parsed = parse_to_ast("const a: number = 1, b = true;").unwrap();
    let Stmt::VarDecl { kind, decls, .. } = &parsed.program.statements[0] else {
        panic!("expected a declaration");
    };
    assert_eq!(*kind, DeclKind::Const);
    assert_eq!(decls.len(), 2);
    assert_eq!(decls[0].annotation.as_deref(), Some("number"));
    assert_eq!(decls[1].annotation, None);
}

#[test]
fn automatic_semicolons() {
    let parsed = parse_to_ast("let a = 1\nlet b = 2\nfunction f() { return }").unwrap();
    assert_eq!(parsed.program.statements.len(), 3);
}

#[test]
fn member_call_target() {
    let parsed = parse_to_ast("console.log(1);").unwrap();
    let Stmt::ExprStmt { expr: Expr::Call { callee, args, .. }, .. } = &parsed.program.statements[0]
    else {
        panic!("expected a call statement");
    };
    assert_eq!(callee.callee_text().as_deref(), Some("console.log"));
    assert_eq!(args.len(), 1);
}

#[test]
fn every_node_gets_a_span() {
    let parsed = parse_to_ast("if (x) { y = 1; } else { z(); }").unwrap();
    let mut ids: Vec<_> = parsed.spans.iter().map(|s| s.id).collect();
    let count = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), count, "span ids must be unique");
    assert!(parsed.spans.iter().any(|s| s.id == parsed.program.statements[0].id()));
}

#[test]
fn missing_semicolon_is_reported() {
    match parse_to_ast("let a = 1 let b = 2;") {
        Err(CompileError::Parse { line, col, message, .. }) => {
            assert_eq!((line, col), (1, 11));
            assert!(message.contains("expected ';'"), "{message}");
        }
        other => panic!("expected a parse error, got {:?}", other.err()),
    }
}

#[test]
fn unclosed_block() {
    let result = parse_to_ast("function f(): void {");
    assert!(matches!(result, Err(CompileError::Parse { .. })));
}

#[test]
fn bad_for_header() {
    let result = parse_to_ast("for (let i = 0, i < 3) {}");
    assert!(matches!(result, Err(CompileError::Parse { .. })));
}

#[test]
fn deep_nesting_is_a_parse_error() {
    let depth = 100_000;
    let source = format!("let x = {}1{};", "(".repeat(depth), ")".repeat(depth));
    match parse_to_ast(&source) {
        Err(CompileError::Parse { line, message, .. }) => {
            assert_eq!(line, 1);
            assert!(message.contains("nesting"), "{message}");
        }
        other => panic!("expected a parse error, got {:?}", other.err()),
    }

    let blocks = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
    assert!(matches!(parse_to_ast(&blocks), Err(CompileError::Parse { .. })));
}

#[test]
fn moderate_nesting_parses() {
    let source = format!("let x = {}1{};", "(".repeat(30), ")".repeat(30));
    assert!(parse_to_ast(&source).is_ok());
}

#[test]
fn call_keeps_callee_as_written() {
    let parsed = parse_to_ast("console . log(1);").unwrap();
    let Stmt::ExprStmt { expr: Expr::Call { callee, callee_source, .. }, .. } =
        &parsed.program.statements[0]
    else {
        panic!("expected a call statement");
    };
    assert_eq!(callee_source, "console . log");
    assert_eq!(callee.callee_text().as_deref(), Some("console.log"));
}
