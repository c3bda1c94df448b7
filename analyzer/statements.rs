// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Statement and control-flow analysis

use super::calls::construct_call_on_type;
use super::expressions::{
    analyze_assign, analyze_expr, analyze_init_list, expect_bool_convertible, Operand,
};
use super::types::analyze_type;
use super::AnalyzeCtx;
use crate::ast::{DataType, Statement, StatBlock, VarDecl, VarInit};
use crate::highlight::HighlightKind;
use crate::symbols::{
    can_type_convert, create_anonymous_child, insert_symbol, LinkedNode, ResolvedType, ScopeRef,
    Symbol, SymbolVariable, TypeOrFunction,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Analyze the statements of a block inside the given scope (the caller
/// decides whether the block got its own scope)
pub fn analyze_block_statements(ctx: &mut AnalyzeCtx, scope: &ScopeRef, block: &Rc<StatBlock>) {
    for statement in &block.statements {
        analyze_statement(ctx, scope, statement);
    }
}

pub fn analyze_statement(ctx: &mut AnalyzeCtx, scope: &ScopeRef, statement: &Statement) {
    match statement {
        Statement::Block(block) => {
            let block_scope = create_anonymous_child(scope, "block");
            block_scope.borrow_mut().linked_node = Some(LinkedNode::Block(block.clone()));
            analyze_block_statements(ctx, &block_scope, block);
        }
        Statement::Var(var) => {
            analyze_local_var(ctx, scope, var);
        }
        Statement::If(stat) => {
            let ty = analyze_assign(ctx, scope, &stat.condition);
            expect_bool_convertible(ctx, ty.as_ref(), &stat.condition.range);
            if let Some(then_branch) = &stat.then_branch {
                analyze_statement(ctx, scope, then_branch);
            }
            if let Some(else_branch) = &stat.else_branch {
                analyze_statement(ctx, scope, else_branch);
            }
        }
        Statement::While(stat) => {
            let loop_scope = create_anonymous_child(scope, "while");
            let ty = analyze_assign(ctx, &loop_scope, &stat.condition);
            expect_bool_convertible(ctx, ty.as_ref(), &stat.condition.range);
            if let Some(body) = &stat.body {
                analyze_statement(ctx, &loop_scope, body);
            }
        }
        Statement::DoWhile(stat) => {
            let loop_scope = create_anonymous_child(scope, "dowhile");
            analyze_statement(ctx, &loop_scope, &stat.body);
            let ty = analyze_assign(ctx, &loop_scope, &stat.condition);
            expect_bool_convertible(ctx, ty.as_ref(), &stat.condition.range);
        }
        Statement::For(stat) => {
            let loop_scope = create_anonymous_child(scope, "for");
            if let Some(initial) = &stat.initial {
                analyze_statement(ctx, &loop_scope, initial);
            }
            if let Some(condition) = &stat.condition {
                if let Some(assign) = &condition.assign {
                    let ty = analyze_assign(ctx, &loop_scope, assign);
                    expect_bool_convertible(ctx, ty.as_ref(), &condition.range);
                }
            }
            for increment in &stat.increments {
                analyze_assign(ctx, &loop_scope, increment);
            }
            if let Some(body) = &stat.body {
                analyze_statement(ctx, &loop_scope, body);
            }
        }
        Statement::Switch(stat) => {
            analyze_assign(ctx, scope, &stat.condition);
            let switch_scope = create_anonymous_child(scope, "switch");
            for case in &stat.cases {
                if let Some(expr) = &case.expr {
                    analyze_expr(ctx, &switch_scope, expr);
                }
                for statement in &case.statements {
                    analyze_statement(ctx, &switch_scope, statement);
                }
            }
        }
        Statement::Try(stat) => {
            let try_scope = create_anonymous_child(scope, "try");
            try_scope.borrow_mut().linked_node = Some(LinkedNode::Block(stat.try_block.clone()));
            analyze_block_statements(ctx, &try_scope, &stat.try_block);
            let catch_scope = create_anonymous_child(scope, "catch");
            catch_scope.borrow_mut().linked_node = Some(LinkedNode::Block(stat.catch_block.clone()));
            analyze_block_statements(ctx, &catch_scope, &stat.catch_block);
        }
        Statement::Return(stat) => {
            let value_ty = stat.assign.as_ref().and_then(|a| analyze_assign(ctx, scope, a));
            analyze_return(ctx, scope, statement, stat.assign.is_some(), value_ty);
        }
        Statement::Expr(stat) => {
            let Some(assign) = &stat.assign else { return };
            let ty = analyze_assign(ctx, scope, assign);
            // a function referenced but neither called nor taken as handler
            if let Some(ty) = ty {
                if matches!(ty.symbol, TypeOrFunction::Function(_)) && !ty.is_handler {
                    ctx.diags
                        .push_error("Function call without handler".to_string(), &stat.range);
                }
            }
        }
        Statement::Break(_) | Statement::Continue(_) => {}
    }
}

/// Match a return statement against the enclosing function-like scope
fn analyze_return(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    statement: &Statement,
    has_value: bool,
    value_ty: Option<ResolvedType>,
) {
    let Some(function_scope) = crate::symbols::find_function_like_ancestor(scope) else {
        ctx.diags.push_error(
            "Return statement outside of a function".to_string(),
            statement.range(),
        );
        return;
    };
    let (linked, key) = {
        let borrowed = function_scope.borrow();
        (borrowed.linked_node.clone(), borrowed.key.clone())
    };
    let expected = match linked {
        Some(LinkedNode::Func(func)) => match func.return_type() {
            Some(node) => analyze_type(ctx, &function_scope, node),
            // constructors and destructors return nothing
            None => Some(ResolvedType::from_type(ctx.builtins.void_type.clone())),
        },
        Some(LinkedNode::VirtualProp(prop)) => {
            if key.starts_with("get_") {
                // a getter returns the property's type
                analyze_type(ctx, &function_scope, &prop.ty)
            } else {
                // a setter returns nothing
                Some(ResolvedType::from_type(ctx.builtins.void_type.clone()))
            }
        }
        // lambda return types are not inferred yet
        Some(LinkedNode::Lambda(_)) => None,
        _ => None,
    };

    let Some(expected) = expected else { return };
    let returns_void = expected.is_primitive_named("void");
    if returns_void && has_value {
        ctx.diags.push_error(
            "A function with no return type cannot return a value".to_string(),
            statement.range(),
        );
        return;
    }
    if !returns_void && !has_value {
        ctx.diags.push_error(
            format!("This function must return '{}'", expected.name()),
            statement.range(),
        );
        return;
    }
    if let Some(value_ty) = value_ty {
        if !can_type_convert(&value_ty, &expected) {
            ctx.diags.push_error(
                format!(
                    "Type mismatch: cannot convert '{}' to '{}'",
                    value_ty.name(),
                    expected.name()
                ),
                statement.range(),
            );
        }
    }
}

/// A local variable declaration: resolve the declared type, analyze the
/// initializer, then insert the symbols into the current scope
fn analyze_local_var(ctx: &mut AnalyzeCtx, scope: &ScopeRef, node: &Rc<VarDecl>) {
    let declared = analyze_type(ctx, scope, &node.ty);
    let is_auto = matches!(node.ty.data, DataType::Auto(_));

    for declarator in &node.declarators {
        let ty = analyze_var_init(ctx, scope, node, declarator.init.as_ref(), &declared, is_auto);
        let variable = Rc::new(SymbolVariable {
            name: declarator.identifier.text.clone(),
            declared_at: declarator.identifier.clone(),
            declared_scope: Rc::downgrade(scope),
            ty: RefCell::new(ty),
            is_instance_member: false,
            access: node.access,
        });
        ctx.highlights.classify(declarator.identifier.clone(), HighlightKind::Variable);
        if insert_symbol(scope, Symbol::Variable(variable)).is_err() {
            ctx.diags.push_error(
                format!("'{}' is already declared", declarator.identifier.as_str()),
                &*declarator.identifier,
            );
        }
    }
}

/// Shared between local declarations and the hoisted global/member
/// variable tasks
pub fn analyze_var_init(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    node: &Rc<VarDecl>,
    init: Option<&VarInit>,
    declared: &Option<ResolvedType>,
    is_auto: bool,
) -> Option<ResolvedType> {
    match init {
        None => declared.clone(),
        Some(VarInit::InitList(list)) => {
            analyze_init_list(ctx, scope, list);
            // braced initializers do not infer a type yet
            declared.clone()
        }
        Some(VarInit::Assign(assign)) => {
            let init_ty = analyze_assign(ctx, scope, assign);
            if is_auto {
                // `auto` takes the initializer's type
                return init_ty;
            }
            if let (Some(init_ty), Some(declared)) = (&init_ty, declared) {
                if !can_type_convert(init_ty, declared) {
                    ctx.diags.push_error(
                        format!(
                            "Type mismatch: cannot convert '{}' to '{}'",
                            init_ty.name(),
                            declared.name()
                        ),
                        &assign.range,
                    );
                }
            }
            declared.clone()
        }
        Some(VarInit::ArgList(args)) => {
            let args: Vec<Operand> = args
                .args
                .iter()
                .map(|arg| Operand {
                    ty: analyze_assign(ctx, scope, &arg.value),
                    range: arg.value.range.clone(),
                })
                .collect();
            if let Some(declared) = declared {
                construct_call_on_type(
                    ctx,
                    scope,
                    node.ty.data.token(),
                    &node.range,
                    declared,
                    &args,
                );
            }
            declared.clone()
        }
    }
}
