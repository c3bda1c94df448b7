// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! End-to-end scenarios: source text in, scope tree and diagnostics out

use angelscript_frontend::symbols::{ScopeRef, Symbol};
use angelscript_frontend::{process, Analysis, FrontendConfiguration};

fn analyze(source: &str) -> Analysis {
    process(source, Some(std::path::Path::new("test.as")), &FrontendConfiguration::default())
}

fn global_variable_type(analysis: &Analysis, name: &str) -> Option<String> {
    match analysis.global_scope.borrow().find_symbol(name) {
        Some(Symbol::Variable(var)) => {
            let ty = var.ty.borrow();
            ty.as_ref().map(|t| t.name().to_string())
        }
        _ => None,
    }
}

fn diagnostics(analysis: &Analysis) -> Vec<String> {
    analysis.diagnostics.iter().map(|d| d.message().to_string()).collect()
}

fn assert_clean(analysis: &Analysis) {
    assert!(
        !analysis.diagnostics.has_errors(),
        "expected no errors, got {:?}",
        diagnostics(analysis)
    );
}

/// Collect all references of the whole scope tree
fn all_references(scope: &ScopeRef) -> Vec<(usize, String, usize)> {
    let mut result = Vec::new();
    let mut stack = vec![scope.clone()];
    while let Some(scope) = stack.pop() {
        let borrowed = scope.borrow();
        for reference in &borrowed.referenced {
            result.push((
                reference.usage.span.offset,
                reference.usage.text.to_string(),
                reference.declaration.span.offset,
            ));
        }
        stack.extend(borrowed.children().iter().cloned());
    }
    result
}

#[test]
fn scenario_local_arithmetic_initializer() {
    // S1
    let analysis = analyze("int x = 1 + 2 * 3;");
    assert_clean(&analysis);
    assert_eq!(global_variable_type(&analysis, "x").as_deref(), Some("int"));
}

#[test]
fn scenario_class_with_constructor() {
    // S2
    let analysis = analyze("class A { int v; A(int x) { v = x; } } A a(42);");
    assert_clean(&analysis);
    assert_eq!(global_variable_type(&analysis, "a").as_deref(), Some("A"));

    let class_scope = analysis.global_scope.borrow().find_child("A").expect("class scope");
    assert!(matches!(class_scope.borrow().find_symbol("v"), Some(Symbol::Variable(_))));
    let found = class_scope.borrow().find_symbol("A");
    match found {
        Some(Symbol::Function(ctor)) => assert_eq!(ctor.overloads().len(), 1),
        other => panic!("expected constructor symbol, got {:?}", other.map(|s| s.name().clone())),
    }
}

#[test]
fn scenario_initializer_type_mismatch() {
    // S3
    let source = "int a = 1; bool b = a;";
    let analysis = analyze(source);
    let messages = diagnostics(&analysis);
    assert!(
        messages.iter().any(|m| m.contains("mismatch")),
        "expected a type mismatch, got {messages:?}"
    );
    // the mismatch is located on the right-hand side `a`
    let rhs_offset = source.rfind('a').unwrap();
    let located = analysis
        .diagnostics
        .iter()
        .any(|d| d.message().contains("mismatch") && d.location().span.offset == rhs_offset);
    assert!(located, "diagnostic should cover the initializer");
    // the variable is still registered with its declared type
    assert_eq!(global_variable_type(&analysis, "b").as_deref(), Some("bool"));
}

#[test]
fn scenario_enum_and_enum_constructor() {
    // S4
    let analysis = analyze("enum E { X, Y = 5, Z, } E e = E(1);");
    assert_clean(&analysis);
    assert_eq!(global_variable_type(&analysis, "e").as_deref(), Some("E"));

    let enum_scope = analysis.global_scope.borrow().find_child("E").expect("enum scope");
    for member in ["X", "Y", "Z"] {
        match enum_scope.borrow().find_symbol(member) {
            Some(Symbol::Variable(var)) => {
                assert_eq!(var.ty.borrow().as_ref().map(|t| t.name().to_string()).as_deref(), Some("E"))
            }
            _ => panic!("missing enum member {member}"),
        }
    }
}

#[test]
fn scenario_overload_resolution_prefers_exact_match() {
    // S5
    let source = "int f(int x) { return x; } int f(float x) { return 0; } void g() { f(1); }";
    let analysis = analyze(source);
    assert_clean(&analysis);

    let int_overload_offset = source.find("f").unwrap();
    let call_offset = source.rfind("f(1)").unwrap();
    let references = all_references(&analysis.global_scope);
    let call = references
        .iter()
        .find(|(usage_offset, text, _)| text == "f" && *usage_offset == call_offset)
        .expect("call reference recorded");
    assert_eq!(call.2, int_overload_offset, "call must resolve to the int overload");
}

#[test]
fn scenario_overload_resolution_is_deterministic() {
    let source = "int f(int x) { return x; } int f(float x) { return 0; } void g() { f(1); }";
    let first = all_references(&analyze(source).global_scope);
    let second = all_references(&analyze(source).global_scope);
    assert_eq!(first, second);
}

#[test]
fn scenario_parser_recovery_keeps_class() {
    // S6
    let source = "class C { int ; }";
    let analysis = analyze(source);
    let messages = diagnostics(&analysis);
    assert!(
        messages.iter().any(|m| m.contains("class member")),
        "expected class member diagnostic, got {messages:?}"
    );
    assert!(analysis.global_scope.borrow().find_child("C").is_some());
}

#[test]
fn spans_round_trip_to_source_slices() {
    let source = "int x = 1 + 2 * 3;\nclass A { int v; }\n";
    let analysis = analyze(source);
    assert_clean(&analysis);
    let spans: Vec<_> = analysis
        .script
        .items
        .iter()
        .map(|item| {
            let span = angelscript_frontend::diagnostics::Spanned::span(item.range());
            source[span.offset..span.end()].to_string()
        })
        .collect();
    assert_eq!(spans, vec!["int x = 1 + 2 * 3;", "class A { int v; }"]);
}

#[test]
fn parser_always_terminates_on_junk() {
    for source in [
        "@@@ ) } ( [[[ 12 }",
        "class { { { ;",
        "void f( { } )",
        "= = = = =",
        "if while for class enum",
    ] {
        let analysis = analyze(source);
        assert!(analysis.diagnostics.has_errors(), "junk must produce diagnostics: {source}");
    }
}

#[test]
fn every_token_of_valid_input_is_classified() {
    let source = "int x = 1;";
    let analysis = analyze(source);
    assert_clean(&analysis);
    let resolved = analysis.highlights.resolved();
    // int x = 1 ;
    for index in 0..5 {
        assert!(resolved.contains_key(&index), "token {index} has no classification");
    }
}

#[test]
fn precedence_follows_the_reference_table() {
    // 1 + 2 * 3 == 7 must group as (1 + (2 * 3)) == 7 and type as bool
    let analysis = analyze("bool t = 1 + 2 * 3 == 7;");
    assert_clean(&analysis);
    // shifts bind looser than addition, comparisons looser still
    let analysis = analyze("bool u = 1 << 2 + 3 < 64;");
    assert_clean(&analysis);
    // logical operators force bool operands
    let analysis = analyze("bool v = 1 > 0 && 2 > 1 || false;");
    assert_clean(&analysis);
}

#[test]
fn operator_alias_rewrite_on_user_types() {
    let source = r#"
        class Vec {
            int x;
            Vec opAdd(Vec other) { return other; }
            bool opEquals(Vec other) { return x == other.x; }
        }
        void t() {
            Vec a;
            Vec b;
            Vec c = a + b;
            bool same = a == b;
        }
    "#;
    let analysis = analyze(source);
    assert_clean(&analysis);
}

#[test]
fn reflected_alias_when_primitive_meets_user_type() {
    let source = r#"
        class Scaled {
            Scaled opMul_r(int factor) { return this; }
        }
        void t() {
            Scaled s;
            Scaled twice = 2 * s;
        }
    "#;
    let analysis = analyze(source);
    assert_clean(&analysis);
}

#[test]
fn missing_operator_alias_is_diagnosed() {
    let source = "class Empty { } void t() { Empty e; Empty f; Empty g = e; e + f; }";
    let analysis = analyze(source);
    let messages = diagnostics(&analysis);
    assert!(
        messages.iter().any(|m| m.contains("Operator '+' of 'Empty'")),
        "got {messages:?}"
    );
}

#[test]
fn conditions_must_be_bool_convertible() {
    let analysis = analyze("void t() { if (1) { } }");
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("bool")));

    let analysis = analyze("void t() { while (true) { } }");
    assert_clean(&analysis);
}

#[test]
fn void_function_cannot_return_a_value() {
    let analysis = analyze("void t() { return 1; }");
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("cannot return a value")));
}

#[test]
fn bare_function_reference_statement_is_flagged() {
    let analysis = analyze("void f() { } void t() { f; }");
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("Function call without handler")));
}

#[test]
fn private_members_are_protected_from_outside() {
    let source = "class P { private int secret; int open; } void t() { P p; int a = p.open; int b = p.secret; }";
    let analysis = analyze(source);
    let messages = diagnostics(&analysis);
    assert!(
        messages.iter().any(|m| m.contains("not a public member")),
        "got {messages:?}"
    );
    // accessing the member from inside the class is fine
    let analysis = analyze("class P { private int secret; int reveal() { return secret; } }");
    assert_clean(&analysis);
}

#[test]
fn enum_constructor_requires_an_integer() {
    let analysis = analyze("enum E { A } void t() { E e = E(); }");
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("integer")));
}

#[test]
fn array_sugar_instantiates_the_template() {
    let source = "void t() { int[] xs; xs.insertLast(3); int n = xs[0]; }";
    let analysis = analyze(source);
    assert_clean(&analysis);

    // the indexer result is translated back to the element type
    let analysis = analyze("void t() { int[] xs; bool wrong = xs[0]; }");
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("mismatch")));
}

#[test]
fn namespace_access_through_scope_prefix() {
    let analysis = analyze("namespace ns { int value = 1; } void t() { int x = ns::value; }");
    assert_clean(&analysis);

    let analysis = analyze("void t() { int x = missing::value; }");
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("Invalid scope")));
}

#[test]
fn auto_takes_the_initializer_type() {
    let analysis = analyze("auto g = 1.5;");
    assert_clean(&analysis);
    assert_eq!(global_variable_type(&analysis, "g").as_deref(), Some("double"));
}

#[test]
fn string_literals_use_the_configured_string_type() {
    let analysis = analyze("string s = \"hi\"; uint n = s.length();");
    assert_clean(&analysis);
    assert_eq!(global_variable_type(&analysis, "s").as_deref(), Some("string"));
}

#[test]
fn virtual_property_accessors() {
    let source = r#"
        class T {
            int v;
            int prop {
                get { return v; }
                set { v = value; }
            }
        }
    "#;
    let analysis = analyze(source);
    assert_clean(&analysis);

    // a getter returning the wrong type is caught
    let source = r#"
        class T {
            bool v;
            int prop {
                get { return v; }
            }
        }
    "#;
    let analysis = analyze(source);
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("mismatch")));
}

#[test]
fn funcdef_delegates() {
    let source = r#"
        funcdef int Transform(int);
        int twice(int x) { return x + x; }
        void t() {
            Transform@ callback = twice;
            int result = callback(5);
        }
    "#;
    let analysis = analyze(source);
    assert_clean(&analysis);
}

#[test]
fn handle_identity_comparison() {
    let analysis = analyze("class H { } void t() { H@ h; if (h is null) { } if (h !is null) { } }");
    assert_clean(&analysis);
}

#[test]
fn undefined_symbols_are_reported() {
    let analysis = analyze("void t() { unknown(1); }");
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("'unknown' is not defined")));

    let analysis = analyze("void t() { int x = nothing; }");
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("'nothing' is not defined")));
}

#[test]
fn no_matching_overload_is_reported_with_candidates() {
    let source = "class W { } void f(int x) { } void t() { W w; f(w); }";
    let analysis = analyze(source);
    assert!(diagnostics(&analysis).iter().any(|m| m.contains("No matching signature")));
}

#[test]
fn go_to_definition_references_are_recorded() {
    let source = "int counter = 0; void t() { counter = counter + 1; }";
    let analysis = analyze(source);
    assert_clean(&analysis);
    let decl_offset = source.find("counter").unwrap();
    let references = all_references(&analysis.global_scope);
    let usages: Vec<_> =
        references.iter().filter(|(_, text, decl)| text == "counter" && *decl == decl_offset).collect();
    assert_eq!(usages.len(), 2, "both uses resolve to the declaration: {references:?}");
}
