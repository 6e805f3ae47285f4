//! Integration tests for the Lumen parser.

use lumen_common::diagnostics::DiagnosticSink;
use lumen_parser::ast::{Ast, BinaryOp, ExprId, ExprKind, StmtId, StmtKind, TypeKind, UnaryOp};
use lumen_parser::{parse, ParseResult};

fn parse_ok(source: &str) -> (Ast, StmtId) {
    let mut sink = DiagnosticSink::new();
    let ParseResult { ast, root } = parse(source, "test.lum", &mut sink);
    assert!(
        !sink.has_errors(),
        "unexpected diagnostics for {source:?}: {:?}",
        sink.records()
    );
    (ast, root.expect("program root"))
}

fn parse_err(source: &str) -> DiagnosticSink {
    let mut sink = DiagnosticSink::new();
    let _ = parse(source, "test.lum", &mut sink);
    assert!(sink.has_errors(), "expected diagnostics for {source:?}");
    sink
}

/// The program's single top-level statement.
fn only_item(ast: &Ast, root: StmtId) -> StmtId {
    match &ast.stmt(root).kind {
        StmtKind::Program { items } => {
            let items = ast.stmt_list(*items);
            assert_eq!(items.len(), 1, "expected exactly one top-level item");
            items[0]
        }
        other => panic!("root is not a program: {other:?}"),
    }
}

/// Unwrap `expr;` at top level.
fn only_expr(ast: &Ast, root: StmtId) -> ExprId {
    match &ast.stmt(only_item(ast, root)).kind {
        StmtKind::ExprStmt(e) => *e,
        other => panic!("not an expression statement: {other:?}"),
    }
}

// ── Precedence ─────────────────────────────────────────────────────────

#[test]
fn multiplication_binds_tighter_than_addition() {
    let (ast, root) = parse_ok("a + b * c;");
    let e = only_expr(&ast, root);
    let ExprKind::Binary { op: BinaryOp::Add, lhs, rhs } = &ast.expr(e).kind else {
        panic!("expected Add at the top: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(ast.expr(*lhs).kind, ExprKind::Ident(ref n) if n == "a"));
    assert!(matches!(
        ast.expr(*rhs).kind,
        ExprKind::Binary { op: BinaryOp::Mul, .. }
    ));
}

#[test]
fn equality_binds_tighter_than_logical_and() {
    let (ast, root) = parse_ok("a == b && c;");
    let e = only_expr(&ast, root);
    let ExprKind::Binary { op: BinaryOp::And, lhs, rhs } = &ast.expr(e).kind else {
        panic!("expected And at the top: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(
        ast.expr(*lhs).kind,
        ExprKind::Binary { op: BinaryOp::Eq, .. }
    ));
    assert!(matches!(ast.expr(*rhs).kind, ExprKind::Ident(ref n) if n == "c"));
}

#[test]
fn shift_binds_tighter_than_comparison() {
    let (ast, root) = parse_ok("a << 1 < b;");
    let e = only_expr(&ast, root);
    assert!(matches!(
        ast.expr(e).kind,
        ExprKind::Binary { op: BinaryOp::Lt, .. }
    ));
}

#[test]
fn assignment_is_right_associative() {
    let (ast, root) = parse_ok("a = b = c;");
    let e = only_expr(&ast, root);
    let ExprKind::Assign { target, value } = &ast.expr(e).kind else {
        panic!("expected assignment: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(ast.expr(*target).kind, ExprKind::Ident(ref n) if n == "a"));
    assert!(matches!(ast.expr(*value).kind, ExprKind::Assign { .. }));
}

#[test]
fn unary_minus_binds_tighter_than_multiplication() {
    let (ast, root) = parse_ok("-a * b;");
    let e = only_expr(&ast, root);
    let ExprKind::Binary { op: BinaryOp::Mul, lhs, .. } = &ast.expr(e).kind else {
        panic!("expected Mul at the top: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(
        ast.expr(*lhs).kind,
        ExprKind::Unary { op: UnaryOp::Neg, .. }
    ));
}

#[test]
fn postfix_and_member_chain() {
    let (ast, root) = parse_ok("p.x++;");
    let e = only_expr(&ast, root);
    let ExprKind::Unary { op: UnaryOp::PostInc, operand } = &ast.expr(e).kind else {
        panic!("expected postfix increment: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(ast.expr(*operand).kind, ExprKind::Member { .. }));
}

#[test]
fn star_is_both_dereference_and_multiply() {
    let (ast, root) = parse_ok("*p * 2;");
    let e = only_expr(&ast, root);
    let ExprKind::Binary { op: BinaryOp::Mul, lhs, .. } = &ast.expr(e).kind else {
        panic!("expected Mul at the top: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(
        ast.expr(*lhs).kind,
        ExprKind::Unary { op: UnaryOp::Deref, .. }
    ));
}

#[test]
fn ternary_parses() {
    let (ast, root) = parse_ok("a ? b : c;");
    let e = only_expr(&ast, root);
    assert!(matches!(ast.expr(e).kind, ExprKind::Ternary { .. }));
}

#[test]
fn call_with_arguments() {
    let (ast, root) = parse_ok("add(1, 2 + 3);");
    let e = only_expr(&ast, root);
    let ExprKind::Call { callee, args } = &ast.expr(e).kind else {
        panic!("expected call: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(ast.expr(*callee).kind, ExprKind::Ident(ref n) if n == "add"));
    assert_eq!(ast.expr_list(*args).len(), 2);
}

#[test]
fn memory_primitives() {
    let (ast, root) = parse_ok("memcpy(d, s, sizeof<int>);");
    let e = only_expr(&ast, root);
    let ExprKind::Memcpy { len, .. } = &ast.expr(e).kind else {
        panic!("expected memcpy: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(ast.expr(*len).kind, ExprKind::SizeOfType(_)));

    let (ast, root) = parse_ok("cast<*int>(alloc(8));");
    let e = only_expr(&ast, root);
    let ExprKind::Cast { ty, expr } = &ast.expr(e).kind else {
        panic!("expected cast: {:?}", ast.expr(e).kind);
    };
    assert!(matches!(ast.ty(*ty).kind, TypeKind::Pointer(_)));
    assert!(matches!(ast.expr(*expr).kind, ExprKind::Alloc { .. }));
}

// ── Declarations ───────────────────────────────────────────────────────

#[test]
fn var_decl_with_annotation_and_init() {
    let (ast, root) = parse_ok("let i int = 0;");
    match &ast.stmt(only_item(&ast, root)).kind {
        StmtKind::VarDecl { name, mutable, annotation, init, .. } => {
            assert_eq!(name, "i");
            assert!(*mutable);
            assert!(annotation.is_some());
            assert!(init.is_some());
        }
        other => panic!("expected var decl: {other:?}"),
    }
}

#[test]
fn const_decl_is_immutable() {
    let (ast, root) = parse_ok("const PI float = 3.14;");
    match &ast.stmt(only_item(&ast, root)).kind {
        StmtKind::VarDecl { mutable, .. } => assert!(!mutable),
        other => panic!("expected var decl: {other:?}"),
    }
}

#[test]
fn inferred_var_decl_has_no_annotation() {
    let (ast, root) = parse_ok("let x = 42;");
    match &ast.stmt(only_item(&ast, root)).kind {
        StmtKind::VarDecl { annotation, init, .. } => {
            assert!(annotation.is_none());
            assert!(init.is_some());
        }
        other => panic!("expected var decl: {other:?}"),
    }
}

#[test]
fn function_declaration() {
    let (ast, root) = parse_ok("pub fn add(a int, b int) int { return a + b; }");
    match &ast.stmt(only_item(&ast, root)).kind {
        StmtKind::FnDecl { name, params, vis, .. } => {
            assert_eq!(name, "add");
            assert!(vis.is_public());
            let params = ast.params(*params);
            assert_eq!(params.len(), 2);
            assert_eq!(params[0].name, "a");
            assert_eq!(params[1].name, "b");
        }
        other => panic!("expected fn decl: {other:?}"),
    }
}

#[test]
fn struct_fields_partition_by_visibility() {
    let (ast, root) = parse_ok("struct Point { pub x int; pub y int; tag str; }");
    match &ast.stmt(only_item(&ast, root)).kind {
        StmtKind::StructDecl { public_fields, private_fields, .. } => {
            assert_eq!(ast.fields(*public_fields).len(), 2);
            assert_eq!(ast.fields(*private_fields).len(), 1);
        }
        other => panic!("expected struct decl: {other:?}"),
    }
}

#[test]
fn enum_members_keep_order() {
    let (ast, root) = parse_ok("enum Color { Red, Green, Blue }");
    match &ast.stmt(only_item(&ast, root)).kind {
        StmtKind::EnumDecl { members, .. } => {
            assert_eq!(members, &["Red", "Green", "Blue"]);
        }
        other => panic!("expected enum decl: {other:?}"),
    }
}

// ── Control flow ───────────────────────────────────────────────────────

#[test]
fn if_elif_else_chain() {
    let (ast, root) = parse_ok("fn f(x int) int { if x == 0 { return 1; } elif x == 1 { return 2; } elif x == 2 { return 3; } else { return 4; } }");
    // Walk: fn -> block -> if
    let StmtKind::FnDecl { body, .. } = &ast.stmt(only_item(&ast, root)).kind else {
        panic!("expected fn");
    };
    let StmtKind::Block { stmts } = &ast.stmt(*body).kind else {
        panic!("expected block");
    };
    let if_id = ast.stmt_list(*stmts)[0];
    let StmtKind::If { elifs, else_branch, .. } = &ast.stmt(if_id).kind else {
        panic!("expected if: {:?}", ast.stmt(if_id).kind);
    };
    assert_eq!(ast.elifs(*elifs).len(), 2);
    assert!(else_branch.is_some());
}

#[test]
fn loop_shape_infinite() {
    let (ast, root) = parse_ok("fn f() void { loop { break; } }");
    let loop_stmt = first_body_stmt(&ast, root);
    let StmtKind::Loop { init, cond, incr, .. } = &ast.stmt(loop_stmt).kind else {
        panic!("expected loop");
    };
    assert!(init.is_empty());
    assert!(cond.is_none());
    assert!(incr.is_none());
}

#[test]
fn loop_shape_while_like() {
    let (ast, root) = parse_ok("fn f() void { let i int = 0; loop (i < 10) : (i++) { } }");
    let loop_stmt = nth_body_stmt(&ast, root, 1);
    let StmtKind::Loop { init, cond, incr, .. } = &ast.stmt(loop_stmt).kind else {
        panic!("expected loop");
    };
    assert!(init.is_empty());
    assert!(cond.is_some());
    assert!(incr.is_some());
}

#[test]
fn loop_shape_for_like() {
    let (ast, root) = parse_ok("fn f() void { loop [let i int = 0;] (i < 10) : (i++) { } }");
    let loop_stmt = first_body_stmt(&ast, root);
    let StmtKind::Loop { init, cond, incr, .. } = &ast.stmt(loop_stmt).kind else {
        panic!("expected loop");
    };
    assert_eq!(init.len(), 1);
    assert!(cond.is_some());
    assert!(incr.is_some());
}

#[test]
fn defer_wraps_a_statement() {
    let (ast, root) = parse_ok("fn f() void { defer output(\"A\"); }");
    let defer_stmt = first_body_stmt(&ast, root);
    let StmtKind::Defer { stmt } = &ast.stmt(defer_stmt).kind else {
        panic!("expected defer");
    };
    assert!(matches!(ast.stmt(*stmt).kind, StmtKind::Print { newline: false, .. }));
}

// ── Directives ─────────────────────────────────────────────────────────

#[test]
fn module_and_use_directives() {
    let (ast, root) = parse_ok("@module main { @use util as u; fn main() int { return 0; } }");
    let module = only_item(&ast, root);
    let StmtKind::Module { name, body } = &ast.stmt(module).kind else {
        panic!("expected module: {:?}", ast.stmt(module).kind);
    };
    assert_eq!(name, "main");
    let body = ast.stmt_list(*body);
    assert_eq!(body.len(), 2);
    let StmtKind::Use { module, alias } = &ast.stmt(body[0]).kind else {
        panic!("expected use");
    };
    assert_eq!(module, "util");
    assert_eq!(alias.as_deref(), Some("u"));
}

// ── Types ──────────────────────────────────────────────────────────────

#[test]
fn pointer_and_array_types() {
    let (ast, root) = parse_ok("let p **int; let a [int; 4];");
    let StmtKind::Program { items } = &ast.stmt(root).kind else { panic!() };
    let items = ast.stmt_list(*items).to_vec();

    let StmtKind::VarDecl { annotation: Some(p_ty), .. } = &ast.stmt(items[0]).kind else {
        panic!("expected annotated decl");
    };
    let TypeKind::Pointer(inner) = &ast.ty(*p_ty).kind else {
        panic!("expected pointer type");
    };
    assert!(matches!(ast.ty(*inner).kind, TypeKind::Pointer(_)));

    let StmtKind::VarDecl { annotation: Some(a_ty), .. } = &ast.stmt(items[1]).kind else {
        panic!("expected annotated decl");
    };
    assert!(matches!(ast.ty(*a_ty).kind, TypeKind::Array { .. }));
}

// ── Error recovery ─────────────────────────────────────────────────────

#[test]
fn missing_semicolon_is_reported() {
    let sink = parse_err("let x int = 1");
    assert!(sink.records().iter().any(|d| d.message.contains(";")));
}

#[test]
fn recovery_continues_after_a_bad_statement() {
    let mut sink = DiagnosticSink::new();
    let ParseResult { ast, root } = parse(
        "let bad = ;\nlet good int = 1;",
        "test.lum",
        &mut sink,
    );
    assert!(sink.has_errors());
    let root = root.expect("partial failure still yields a root");
    let StmtKind::Program { items } = &ast.stmt(root).kind else { panic!() };
    // The good statement survived.
    assert_eq!(ast.stmt_list(*items).len(), 1);
}

#[test]
fn reparsing_is_structurally_identical() {
    let source = "@module m { fn f(n int) int { if n == 0 { return 1; } return n * f(n - 1); } }";
    let (ast1, root1) = parse_ok(source);
    let (ast2, root2) = parse_ok(source);
    assert_eq!(root1.index(), root2.index());
    assert_eq!(ast1.stmt_count(), ast2.stmt_count());
    assert_eq!(ast1.expr_count(), ast2.expr_count());
    assert_eq!(ast1.stmt(root1), ast2.stmt(root2));
}

// ── Helpers ────────────────────────────────────────────────────────────

fn first_body_stmt(ast: &Ast, root: StmtId) -> StmtId {
    nth_body_stmt(ast, root, 0)
}

fn nth_body_stmt(ast: &Ast, root: StmtId, n: usize) -> StmtId {
    let StmtKind::Program { items } = &ast.stmt(root).kind else {
        panic!("root is not a program");
    };
    let f = ast.stmt_list(*items)[0];
    let StmtKind::FnDecl { body, .. } = &ast.stmt(f).kind else {
        panic!("first item is not a function");
    };
    let StmtKind::Block { stmts } = &ast.stmt(*body).kind else {
        panic!("function body is not a block");
    };
    ast.stmt_list(*stmts)[n]
}
