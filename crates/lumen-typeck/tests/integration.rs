//! Integration tests for the type checker: declarations, inference,
//! functions, control flow, and scope-forest invariants.

use lumen_common::diagnostics::DiagnosticSink;
use lumen_parser::ast::Ast;
use lumen_typeck::error::TypeError;
use lumen_typeck::TypeckResult;

fn check_source(source: &str) -> (Ast, TypeckResult) {
    let mut sink = DiagnosticSink::new();
    let parse = lumen_parser::parse(source, "test.lum", &mut sink);
    assert!(
        !sink.has_errors(),
        "parse diagnostics for {source:?}: {:?}",
        sink.records()
    );
    let mut ast = parse.ast;
    let root = parse.root.expect("program root");
    let result = lumen_typeck::check(&mut ast, root);
    (ast, result)
}

fn check_ok(source: &str) -> (Ast, TypeckResult) {
    let (ast, result) = check_source(source);
    assert!(
        result.success(),
        "unexpected type errors for {source:?}: {:?}",
        result.errors
    );
    (ast, result)
}

fn check_err(source: &str) -> TypeckResult {
    let (_, result) = check_source(source);
    assert!(!result.success(), "expected type errors for {source:?}");
    result
}

// ── Variable declarations ──────────────────────────────────────────────

#[test]
fn annotated_declaration_with_matching_init() {
    check_ok("fn f() int { let i int = 0; return i; }");
}

#[test]
fn declaration_infers_from_initialiser() {
    check_ok("fn f() int { let x = 42; return x; }");
}

#[test]
fn annotation_mismatch_is_an_error() {
    let result = check_err("fn f() int { let x int = \"hi\"; return 0; }");
    assert!(matches!(
        result.errors[0],
        TypeError::TypeMismatch { context: "variable declaration", .. }
    ));
}

#[test]
fn declaration_needs_annotation_or_initialiser() {
    let result = check_err("fn f() int { let x; return 0; }");
    assert!(matches!(result.errors[0], TypeError::MissingTypeAnnotation { .. }));
}

#[test]
fn int_initialiser_satisfies_float_annotation() {
    // int <-> float is compatible, not exact.
    check_ok("fn f() float { let x float = 1; return x; }");
}

#[test]
fn duplicate_symbol_in_same_scope() {
    let result = check_err("fn f() int { let x = 1; let x = 2; return x; }");
    assert!(matches!(result.errors[0], TypeError::DuplicateSymbol { .. }));
}

#[test]
fn shadowing_in_nested_scope_is_allowed() {
    check_ok("fn f() int { let x = 1; { let x = 2; output(x); } return x; }");
}

#[test]
fn assignment_to_const_is_refused() {
    let result = check_err("fn f() int { const c int = 1; c = 2; return c; }");
    assert!(matches!(result.errors[0], TypeError::AssignToImmutable { .. }));
}

// ── Functions ──────────────────────────────────────────────────────────

#[test]
fn recursion_resolves_through_the_enclosing_scope() {
    check_ok("fn fact(n int) int { if n == 0 { return 1; } return n * fact(n - 1); }");
}

#[test]
fn undefined_identifier_is_an_error() {
    let result = check_err("fn main() int { return x; }");
    assert!(matches!(
        &result.errors[0],
        TypeError::UndefinedIdentifier { name, .. } if name == "x"
    ));
}

#[test]
fn wrong_argument_count() {
    let result = check_err("fn add(a int, b int) int { return a + b; } fn g() int { return add(1); }");
    assert!(matches!(
        result.errors[0],
        TypeError::WrongArgCount { expected: 2, found: 1, .. }
    ));
}

#[test]
fn wrong_argument_type() {
    let result = check_err("fn not(b bool) bool { return !b; } fn g() bool { return not(\"s\"); }");
    assert!(matches!(
        result.errors[0],
        TypeError::TypeMismatch { context: "argument", .. }
    ));
}

#[test]
fn calling_a_non_function() {
    let result = check_err("fn f() int { let x = 1; return x(); }");
    assert!(matches!(result.errors[0], TypeError::NotAFunction { .. }));
}

#[test]
fn return_value_in_void_function() {
    let result = check_err("fn f() void { return 1; }");
    assert!(matches!(result.errors[0], TypeError::VoidFunctionReturnsValue { .. }));
}

#[test]
fn missing_return_value() {
    let result = check_err("fn f() int { return; }");
    assert!(matches!(result.errors[0], TypeError::MissingReturnValue { .. }));
}

#[test]
fn return_type_mismatch() {
    let result = check_err("fn f() int { return \"no\"; }");
    assert!(matches!(result.errors[0], TypeError::ReturnTypeMismatch { .. }));
}

#[test]
fn int_return_satisfies_float_function() {
    check_ok("fn f() float { return 1; }");
}

#[test]
fn return_outside_function() {
    let result = check_err("return 1;");
    assert!(matches!(result.errors[0], TypeError::ReturnOutsideFunction { .. }));
}

// ── The main convention ────────────────────────────────────────────────

#[test]
fn main_must_return_int() {
    let result = check_err("fn main() void { }");
    assert!(matches!(result.errors[0], TypeError::MainMustReturnInt { .. }));
}

#[test]
fn unmarked_main_is_silent() {
    let (_, result) = check_ok("fn main() int { return 0; }");
    assert!(result.warnings.is_empty());
}

#[test]
fn private_main_is_promoted_with_a_warning() {
    let (_, result) = check_ok("priv fn main() int { return 0; }");
    assert_eq!(result.warnings.len(), 1);
    assert!(matches!(result.warnings[0], TypeError::MainPromotedPublic { .. }));
    assert!(result.warnings[0].is_warning());
}

// ── Conditions and control flow ────────────────────────────────────────

#[test]
fn conditions_are_strictly_bool() {
    let result = check_err("fn f() int { if 1 { return 1; } return 0; }");
    assert!(matches!(result.errors[0], TypeError::NonBoolCondition { .. }));
}

#[test]
fn bool_condition_is_fine() {
    check_ok("fn f(b bool) int { if b { return 1; } elif !b { return 2; } else { return 3; } }");
}

#[test]
fn loop_conditions_are_strictly_bool() {
    let result = check_err("fn f() void { loop (1) { } }");
    assert!(matches!(result.errors[0], TypeError::NonBoolCondition { .. }));
}

#[test]
fn all_three_loop_shapes_check() {
    check_ok("fn f() void { loop { break; } }");
    check_ok("fn f() void { let i int = 0; loop (i < 10) : (i++) { } }");
    check_ok("fn f() void { loop [let i int = 0;] (i < 10) : (i++) { output(i); } }");
}

#[test]
fn break_outside_loop() {
    let result = check_err("fn f() void { break; }");
    assert!(matches!(result.errors[0], TypeError::BreakOutsideLoop { .. }));
}

#[test]
fn continue_outside_loop() {
    let result = check_err("fn f() void { continue; }");
    assert!(matches!(result.errors[0], TypeError::ContinueOutsideLoop { .. }));
}

#[test]
fn defer_checks_its_statement() {
    check_ok("fn f() void { defer output(\"bye\"); }");
    let result = check_err("fn f() void { defer output(missing); }");
    assert!(matches!(result.errors[0], TypeError::UndefinedIdentifier { .. }));
}

// ── Operators ──────────────────────────────────────────────────────────

#[test]
fn arithmetic_widens_to_float() {
    check_ok("fn f() float { return 1 + 2.5; }");
    check_ok("fn f() int { return 1 + 2; }");
}

#[test]
fn arithmetic_rejects_strings() {
    let result = check_err("fn f() int { return \"a\" + 1; }");
    assert!(matches!(result.errors[0], TypeError::NonNumericOperand { .. }));
}

#[test]
fn comparisons_yield_bool() {
    check_ok("fn f(a int, b int) bool { return a <= b; }");
}

#[test]
fn comparison_of_mismatched_types() {
    let result = check_err("fn f() bool { return 1 == \"one\"; }");
    assert!(matches!(
        result.errors[0],
        TypeError::TypeMismatch { context: "comparison", .. }
    ));
}

#[test]
fn bitwise_requires_int() {
    check_ok("fn f(a int) int { return (a << 2) ^ ~a & 7 | 1; }");
    let result = check_err("fn f(a float) int { return a & 1; }");
    assert!(matches!(result.errors[0], TypeError::NonIntegerOperand { .. }));
}

// ── Pointers and memory primitives ─────────────────────────────────────

#[test]
fn address_of_and_dereference() {
    check_ok("fn f() int { let x = 1; let p *int = &x; return *p; }");
}

#[test]
fn address_of_requires_an_lvalue() {
    let result = check_err("fn f() void { let p = &(1 + 2); }");
    assert!(matches!(result.errors[0], TypeError::NotAssignable { .. }));
}

#[test]
fn dereference_requires_a_pointer() {
    let result = check_err("fn f() int { let x = 1; return *x; }");
    assert!(matches!(result.errors[0], TypeError::NotAPointer { .. }));
}

#[test]
fn null_assigns_to_typed_pointers() {
    check_ok("fn f() void { let p *int = null; }");
}

#[test]
fn alloc_free_and_memcpy() {
    check_ok(
        "fn f() void { let p = alloc(16); let q = alloc(16); memcpy(q, p, 16); free(p); free(q); }",
    );
}

#[test]
fn cast_yields_the_target_type() {
    check_ok("fn f() int { let p = alloc(8); let ip *int = cast<*int>(p); return *ip; }");
}

#[test]
fn sizeof_is_int() {
    check_ok("fn f() int { return sizeof<int> + sizeof(1 + 2); }");
}

// ── Enums and structs ──────────────────────────────────────────────────

#[test]
fn enum_members_are_ints() {
    check_ok("enum Color { Red, Green, Blue } fn f() int { return Color.Green; }");
}

#[test]
fn unknown_enum_member() {
    let result = check_err("enum Color { Red } fn f() int { return Color.Purple; }");
    assert!(matches!(result.errors[0], TypeError::MemberMissing { .. }));
}

#[test]
fn struct_member_access_types_the_field() {
    check_ok("struct Point { pub x int; pub y int; } fn f(p Point) int { return p.x; }");
}

#[test]
fn struct_member_missing() {
    let result = check_err("struct Point { pub x int; } fn f(p Point) int { return p.z; }");
    assert!(matches!(result.errors[0], TypeError::MemberMissing { .. }));
}

// ── Scope forest invariants ────────────────────────────────────────────

#[test]
fn hello_program_builds_the_expected_scopes() {
    let (_, result) = check_ok(
        "@module main { fn main() int { outputln(\"hi\"); return 0; } }",
    );
    let scopes = &result.scopes;
    let module = scopes.find_module("main").expect("module scope exists");
    assert!(scopes.get(module).is_module_scope);
    assert_eq!(scopes.get(module).module_name.as_deref(), Some("main"));

    let fn_scope = scopes
        .get(module)
        .children
        .iter()
        .copied()
        .find(|&c| scopes.get(c).is_function_scope)
        .expect("function scope under the module");
    assert_eq!(scopes.get(fn_scope).name, "main");
    // No parameters.
    assert!(scopes.get(fn_scope).symbols.is_empty());
}

#[test]
fn scope_depths_are_well_formed() {
    let (_, result) = check_ok(
        "@module m { fn f(a int) int { { let x = 1; loop (x < 3) { output(x); } } return a; } }",
    );
    let scopes = &result.scopes;
    let mut stack = vec![scopes.global()];
    while let Some(id) = stack.pop() {
        let scope = scopes.get(id);
        match scope.parent {
            Some(parent) => assert_eq!(scope.depth, scopes.get(parent).depth + 1),
            None => assert_eq!(scope.depth, 0),
        }
        for sym in &scope.symbols {
            assert_eq!(sym.scope_depth, scope.depth);
        }
        stack.extend(scope.children.iter().copied());
    }
}

#[test]
fn debug_tree_renders_the_forest() {
    let (_, result) = check_ok("@module m { fn f(a int) int { return a; } }");
    let tree = result.scopes.debug_tree();
    assert!(tree.contains("global"), "{tree}");
    assert!(tree.contains("m [module]"), "{tree}");
    assert!(tree.contains("f [fn] (1 symbols)"), "{tree}");
}

#[test]
fn rerunning_the_checker_is_deterministic() {
    let source = "@module m { fn f() int { return 1; } }";
    let (_, first) = check_ok(source);
    let (_, second) = check_ok(source);
    assert_eq!(first.scopes.len(), second.scopes.len());
    assert_eq!(first.errors, second.errors);
}
