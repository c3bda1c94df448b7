// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Expression analysis

The parser hands over flat `{term, op, term, ...}` chains; this module is
the authority on operator precedence. The chain is reshaped with a
shunting-yard pass and folded bottom up, running the binary operator rules
(including the rewrite to `opAdd`/`opEquals`/... alias method calls) on the
way.
*/

use super::calls::{
    check_function_match, check_member_access, construct_call_on_type, enclosing_class_type,
    method_call_on_type, MethodLookupError,
};
use super::operators::{AssignOp, BinaryOp};
use super::types::{analyze_scope, analyze_type};
use super::AnalyzeCtx;
use crate::ast::{
    ArgList, Assign, CastExpr, Condition, Expr, ExprPostOp, ExprTerm, ExprValue, FuncCall,
    InitItem, InitList, LambdaExpr, Literal, NodeRange, VarAccess,
};
use crate::completion::CompletionHint;
use crate::highlight::HighlightKind;
use crate::parser::{NumberKind, TokenKind, TokenRef};
use crate::symbols::{
    apply_template_translate, can_type_convert, common_number_type, create_anonymous_child,
    find_symbol_walking_parents, insert_symbol, push_completion_hint, push_reference,
    LinkedNode, ResolvedType, ScopeRef, Symbol, SymbolVariable, TypeOrFunction,
};
use std::cell::RefCell;
use std::rc::Rc;

/// An analyzed sub-expression: its resolved type (or nothing, when
/// resolution failed and a diagnostic was already emitted) and its source
/// range
#[derive(Clone)]
pub struct Operand {
    pub ty: Option<ResolvedType>,
    pub range: NodeRange,
}

pub fn analyze_assign(ctx: &mut AnalyzeCtx, scope: &ScopeRef, assign: &Rc<Assign>) -> Option<ResolvedType> {
    let lhs_ty = analyze_condition(ctx, scope, &assign.condition);
    let tail = match &assign.tail {
        Some(tail) => tail,
        None => return lhs_ty,
    };
    let rhs_ty = analyze_assign(ctx, scope, &tail.assign);
    let lhs = Operand { ty: lhs_ty, range: assign.condition.range.clone() };
    let rhs = Operand { ty: rhs_ty, range: tail.assign.range.clone() };
    analyze_assign_operator(ctx, scope, &tail.op, lhs, rhs)
}

fn analyze_condition(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    condition: &Condition,
) -> Option<ResolvedType> {
    let expr_ty = analyze_expr(ctx, scope, &condition.expr);
    let ternary = match &condition.ternary {
        Some(ternary) => ternary,
        None => return expr_ty,
    };
    expect_bool_convertible(ctx, expr_ty.as_ref(), &condition.expr.range);
    let true_ty = analyze_assign(ctx, scope, &ternary.true_assign);
    let false_ty = analyze_assign(ctx, scope, &ternary.false_assign);
    true_ty.or(false_ty)
}

pub fn expect_bool_convertible(
    ctx: &mut AnalyzeCtx,
    ty: Option<&ResolvedType>,
    range: &NodeRange,
) {
    let Some(ty) = ty else { return };
    let bool_ty = ResolvedType::from_type(ctx.builtins.bool_type.clone());
    if !can_type_convert(ty, &bool_ty) {
        ctx.diags.push_error(
            format!("Type mismatch: '{}' is not convertible to bool", ty.name()),
            range,
        );
    }
}

enum ShuntItem {
    Term(Operand),
    Op(TokenRef, BinaryOp),
}

/// Reshape the flat operator chain by precedence and fold it
pub fn analyze_expr(ctx: &mut AnalyzeCtx, scope: &ScopeRef, expr: &Expr) -> Option<ResolvedType> {
    // evaluate the terms left to right so diagnostics come out in source
    // order
    let mut input = Vec::new();
    let mut current = expr;
    loop {
        input.push(ShuntItem::Term(analyze_expr_term(ctx, scope, &current.head)));
        match &current.tail {
            Some(tail) => {
                match BinaryOp::parse(tail.op.as_str()) {
                    Some(op) => input.push(ShuntItem::Op(tail.op.clone(), op)),
                    None => {
                        // the tokenizer only marks closed set members as
                        // expression operators
                        ctx.diags.push_error(
                            format!("Unknown operator '{}'", tail.op.as_str()),
                            &*tail.op,
                        );
                        return None;
                    }
                }
                current = &tail.expr;
            }
            None => break,
        }
    }

    // shunting yard: push when the stack is empty or the operator binds
    // tighter than the top, otherwise pop into the output first
    let mut output: Vec<ShuntItem> = Vec::new();
    let mut stack: Vec<(TokenRef, BinaryOp)> = Vec::new();
    for item in input {
        match item {
            ShuntItem::Term(_) => output.push(item),
            ShuntItem::Op(token, op) => {
                while let Some((_, top)) = stack.last() {
                    if op.precedence() > top.precedence() {
                        break;
                    }
                    let (top_token, top_op) = stack.pop().unwrap();
                    output.push(ShuntItem::Op(top_token, top_op));
                }
                stack.push((token, op));
            }
        }
    }
    while let Some((token, op)) = stack.pop() {
        output.push(ShuntItem::Op(token, op));
    }

    // fold: every operator pops its two operands and pushes the result
    let mut operands: Vec<Operand> = Vec::new();
    for item in output {
        match item {
            ShuntItem::Term(operand) => operands.push(operand),
            ShuntItem::Op(token, op) => {
                let rhs = operands.pop();
                let lhs = operands.pop();
                let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
                    return None;
                };
                operands.push(analyze_binary_operator(ctx, scope, &token, op, lhs, rhs));
            }
        }
    }
    operands.pop().and_then(|operand| operand.ty)
}

fn analyze_expr_term(ctx: &mut AnalyzeCtx, scope: &ScopeRef, term: &ExprTerm) -> Operand {
    match term {
        ExprTerm::InitList { range, ty, list } => {
            if let Some(ty) = ty {
                analyze_type(ctx, scope, ty);
            }
            analyze_init_list(ctx, scope, list);
            // TODO: the type of a braced initializer is not inferred yet
            Operand { ty: None, range: range.clone() }
        }
        ExprTerm::Value { range, pre_ops, value, post_ops } => {
            let base = analyze_expr_value(ctx, scope, value, range);
            let mut operand = Operand { ty: base, range: range.clone() };
            for post_op in post_ops {
                operand = analyze_post_op(ctx, scope, operand, post_op);
            }
            for pre_op in pre_ops.iter().rev() {
                if pre_op.is("!") || pre_op.is("not") {
                    expect_bool_convertible(ctx, operand.ty.as_ref(), &operand.range);
                    operand.ty = Some(ResolvedType::from_type(ctx.builtins.bool_type.clone()));
                }
                // the sign, `~` and `++`/`--` keep the operand's type
            }
            operand
        }
    }
}

/// Braced initializer contents are analyzed for their side diagnostics.
/// The list itself resolves to no type.
pub fn analyze_init_list(ctx: &mut AnalyzeCtx, scope: &ScopeRef, list: &InitList) -> Option<ResolvedType> {
    for item in &list.items {
        match item {
            InitItem::Assign(assign) => {
                analyze_assign(ctx, scope, assign);
            }
            InitItem::List(nested) => {
                analyze_init_list(ctx, scope, nested);
            }
        }
    }
    None
}

fn analyze_expr_value(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    value: &ExprValue,
    range: &NodeRange,
) -> Option<ResolvedType> {
    match value {
        ExprValue::Void(_) => Some(ResolvedType::from_type(ctx.builtins.void_type.clone())),
        ExprValue::ConstructCall(call) => {
            let target = analyze_type(ctx, scope, &call.ty)?;
            let args = analyze_args(ctx, scope, &call.args);
            construct_call_on_type(ctx, scope, call.ty.data.token(), &call.range, &target, &args)
        }
        ExprValue::FuncCall(call) => analyze_func_call(ctx, scope, call),
        ExprValue::VarAccess(access) => analyze_var_access(ctx, scope, access),
        ExprValue::Cast(cast) => analyze_cast(ctx, scope, cast),
        ExprValue::Literal(literal) => analyze_literal(ctx, scope, literal, range),
        ExprValue::Assign(assign) => analyze_assign(ctx, scope, assign),
        ExprValue::Lambda(lambda) => analyze_lambda(ctx, scope, lambda),
    }
}

fn analyze_cast(ctx: &mut AnalyzeCtx, scope: &ScopeRef, cast: &CastExpr) -> Option<ResolvedType> {
    analyze_assign(ctx, scope, &cast.assign);
    analyze_type(ctx, scope, &cast.ty)
}

fn analyze_literal(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    literal: &Literal,
    range: &NodeRange,
) -> Option<ResolvedType> {
    let token = &literal.token;
    match token.kind() {
        TokenKind::Number => {
            let ty = match token.number_kind {
                NumberKind::Integer => &ctx.builtins.int_type,
                NumberKind::Float => &ctx.builtins.float_type,
                NumberKind::Double => &ctx.builtins.double_type,
            };
            Some(ResolvedType::from_type(ty.clone()))
        }
        TokenKind::String => {
            match find_symbol_walking_parents(scope, ctx.config.string_type.as_str()) {
                Some((Symbol::Type(ty), _)) => Some(ResolvedType::from_type(ty)),
                _ => None,
            }
        }
        _ => match token.as_str() {
            "true" | "false" => Some(ResolvedType::from_type(ctx.builtins.bool_type.clone())),
            // the type of a null literal is deliberately left open
            "null" => None,
            "this" => match enclosing_class_type(scope) {
                Some(ty) => Some(ResolvedType::from_type(ty)),
                None => {
                    ctx.diags.push_error("'this' is not available here".to_string(), range);
                    None
                }
            },
            _ => None,
        },
    }
}

fn analyze_args(ctx: &mut AnalyzeCtx, scope: &ScopeRef, args: &ArgList) -> Vec<Operand> {
    args.args
        .iter()
        .map(|arg| Operand {
            ty: analyze_assign(ctx, scope, &arg.value),
            range: arg.value.range.clone(),
        })
        .collect()
}

/// Call dispatch by the kind of symbol the callee resolves to
pub fn analyze_func_call(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    call: &FuncCall,
) -> Option<ResolvedType> {
    let args = analyze_args(ctx, scope, &call.args);
    let name = call.identifier.as_str();

    let hit = match &call.scope {
        Some(scope_node) => {
            let lookup = analyze_scope(ctx, scope, scope_node)?;
            let symbol = lookup.borrow().find_symbol(name);
            symbol.map(|s| (s, lookup.clone()))
        }
        None => find_symbol_walking_parents(scope, name),
    };
    let (symbol, _found_in) = match hit {
        Some(hit) => hit,
        None => {
            ctx.diags.push_error(format!("'{name}' is not defined"), &*call.identifier);
            return None;
        }
    };

    match symbol {
        Symbol::Type(ty) => {
            // `A(...)` constructs an A
            ctx.highlights.classify(call.identifier.clone(), HighlightKind::Type);
            if let Some(declared_at) = &ty.declared_at {
                push_reference(scope, declared_at.clone(), call.identifier.clone());
            }
            let target = ResolvedType::from_type(ty);
            construct_call_on_type(ctx, scope, &call.identifier, &call.range, &target, &args)
        }
        Symbol::Variable(var) => {
            push_reference(scope, var.declared_at.clone(), call.identifier.clone());
            let var_ty = var.ty.borrow().clone()?;
            match &var_ty.symbol {
                // a delegate value is called directly
                TypeOrFunction::Function(signature) => {
                    let signature = signature.clone();
                    check_function_match(
                        ctx,
                        scope,
                        &call.identifier,
                        &args,
                        &signature,
                        var_ty.template_translate.as_ref(),
                    )
                }
                TypeOrFunction::Type(_) => {
                    match method_call_on_type(ctx, scope, &var_ty, "opCall", &call.identifier, &args)
                    {
                        Ok(result) => result,
                        Err(_) => {
                            ctx.diags.push_error(
                                format!("Operator '()' of '{}' is not defined", var_ty.name()),
                                &*call.identifier,
                            );
                            None
                        }
                    }
                }
            }
        }
        Symbol::Function(function) => {
            check_function_match(ctx, scope, &call.identifier, &args, &function, None)
        }
    }
}

fn analyze_var_access(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    access: &VarAccess,
) -> Option<ResolvedType> {
    let identifier = access.identifier.as_ref()?;
    let name = identifier.as_str();

    let hit = match &access.scope {
        Some(scope_node) => {
            let lookup = analyze_scope(ctx, scope, scope_node)?;
            let symbol = lookup.borrow().find_symbol(name);
            symbol.map(|s| (s, lookup.clone()))
        }
        None => find_symbol_walking_parents(scope, name),
    };
    let (symbol, found_in) = match hit {
        Some(hit) => hit,
        None => {
            ctx.diags.push_error(format!("'{name}' is not defined"), &**identifier);
            return None;
        }
    };

    match symbol {
        Symbol::Variable(var) => {
            push_reference(scope, var.declared_at.clone(), identifier.clone());
            let kind = if matches!(found_in.borrow().linked_node, Some(LinkedNode::Enum(_))) {
                HighlightKind::EnumMember
            } else if found_in.borrow().linked_node.as_ref().is_some_and(|n| n.is_function_like())
            {
                HighlightKind::Parameter
            } else {
                HighlightKind::Variable
            };
            ctx.highlights.classify(identifier.clone(), kind);
            var.ty.borrow().clone()
        }
        Symbol::Function(function) => {
            // a bare function reference; only valid when taken as a handler
            ctx.highlights.classify(identifier.clone(), HighlightKind::Function);
            push_reference(scope, function.declared_at.clone(), identifier.clone());
            Some(ResolvedType::from_function(function))
        }
        Symbol::Type(ty) => {
            ctx.highlights.classify(identifier.clone(), HighlightKind::Type);
            if let Some(declared_at) = &ty.declared_at {
                push_reference(scope, declared_at.clone(), identifier.clone());
            }
            Some(ResolvedType::from_type(ty))
        }
    }
}

fn analyze_post_op(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    operand: Operand,
    post_op: &ExprPostOp,
) -> Operand {
    match post_op {
        ExprPostOp::Member { range, identifier } => {
            let result = analyze_member_access(ctx, scope, &operand, identifier, range);
            Operand { ty: result, range: operand.range.cover(range) }
        }
        ExprPostOp::MethodCall { range, identifier, args } => {
            let args = analyze_args(ctx, scope, args);
            let result = match &operand.ty {
                Some(lhs) => {
                    push_completion_hint(
                        scope,
                        CompletionHint::Type { range: range.clone(), target: lhs.clone() },
                    );
                    match method_call_on_type(ctx, scope, lhs, identifier.as_str(), identifier, &args)
                    {
                        Ok(result) => result,
                        Err(MethodLookupError::NotAMethod) => {
                            ctx.diags.push_error(
                                format!("'{}' is not a method", identifier.as_str()),
                                &**identifier,
                            );
                            None
                        }
                        Err(_) => {
                            ctx.diags.push_error(
                                format!("'{}' is not defined", identifier.as_str()),
                                &**identifier,
                            );
                            None
                        }
                    }
                }
                None => None,
            };
            Operand { ty: result, range: operand.range.cover(range) }
        }
        ExprPostOp::Index { range, args } => {
            let args = analyze_args(ctx, scope, args);
            let usage = range.start.clone();
            let result = match &operand.ty {
                Some(lhs) => match method_call_on_type(ctx, scope, lhs, "opIndex", &usage, &args) {
                    Ok(result) => result,
                    Err(_) => {
                        ctx.diags.push_error(
                            format!("Operator '[]' of '{}' is not defined", lhs.name()),
                            range,
                        );
                        None
                    }
                },
                None => None,
            };
            Operand { ty: result, range: operand.range.cover(range) }
        }
        ExprPostOp::Call { range, args } => {
            let args = analyze_args(ctx, scope, args);
            let usage = range.start.clone();
            let result = match &operand.ty {
                Some(lhs) => match &lhs.symbol {
                    TypeOrFunction::Function(signature) => {
                        let signature = signature.clone();
                        check_function_match(
                            ctx,
                            scope,
                            &usage,
                            &args,
                            &signature,
                            lhs.template_translate.as_ref(),
                        )
                    }
                    TypeOrFunction::Type(_) => {
                        match method_call_on_type(ctx, scope, lhs, "opCall", &usage, &args) {
                            Ok(result) => result,
                            Err(_) => {
                                ctx.diags.push_error(
                                    format!("Operator '()' of '{}' is not defined", lhs.name()),
                                    range,
                                );
                                None
                            }
                        }
                    }
                },
                None => None,
            };
            Operand { ty: result, range: operand.range.cover(range) }
        }
        ExprPostOp::IncDec { op } => {
            let result = match &operand.ty {
                Some(lhs) if number_like(lhs) => Some(lhs.clone()),
                Some(lhs) => {
                    let alias = if op.is("++") { "opPostInc" } else { "opPostDec" };
                    match method_call_on_type(ctx, scope, lhs, alias, op, &[]) {
                        Ok(result) => result,
                        Err(_) => {
                            ctx.diags.push_error(
                                format!("Operator '{}' of '{}' is not defined", op.as_str(), lhs.name()),
                                &**op,
                            );
                            None
                        }
                    }
                }
                None => None,
            };
            Operand { ty: result, range: operand.range.clone() }
        }
    }
}

fn analyze_member_access(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    operand: &Operand,
    identifier: &TokenRef,
    range: &NodeRange,
) -> Option<ResolvedType> {
    let lhs = operand.ty.as_ref()?;
    push_completion_hint(
        scope,
        CompletionHint::Type { range: range.clone(), target: lhs.clone() },
    );
    let symbol_type = lhs.as_type()?.clone();
    let members = match symbol_type.members_scope.borrow().clone() {
        Some(members) => members,
        None => {
            ctx.diags
                .push_error(format!("'{}' is not defined", identifier.as_str()), &**identifier);
            return None;
        }
    };
    let symbol = members.borrow().find_symbol(identifier.as_str());
    match symbol {
        Some(Symbol::Variable(var)) => {
            check_member_access(ctx, scope, identifier, identifier.as_str(), var.access, &members);
            push_reference(scope, var.declared_at.clone(), identifier.clone());
            let kind = if symbol_type.is_enum() {
                HighlightKind::EnumMember
            } else {
                HighlightKind::Variable
            };
            ctx.highlights.classify(identifier.clone(), kind);
            apply_template_translate(var.ty.borrow().as_ref(), lhs.template_translate.as_ref())
        }
        Some(Symbol::Function(function)) => {
            // `obj.method` without a call: a delegate reference
            ctx.highlights.classify(identifier.clone(), HighlightKind::Function);
            push_reference(scope, function.declared_at.clone(), identifier.clone());
            Some(ResolvedType::from_function(function))
        }
        Some(Symbol::Type(_)) | None => {
            ctx.diags
                .push_error(format!("'{}' is not defined", identifier.as_str()), &**identifier);
            None
        }
    }
}

fn number_like(ty: &ResolvedType) -> bool {
    ty.is_number_type() || ty.as_type().is_some_and(|t| t.is_enum())
}

fn user_type(ty: &ResolvedType) -> bool {
    ty.as_type().is_some_and(|t| !t.is_primitive() && !t.is_enum())
}

/// The binary operator rules: numeric fast path, then the rewrite to alias
/// method calls on user types
fn analyze_binary_operator(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    op_token: &TokenRef,
    op: BinaryOp,
    lhs: Operand,
    rhs: Operand,
) -> Operand {
    let range = lhs.range.cover(&rhs.range);
    let bool_ty = ResolvedType::from_type(ctx.builtins.bool_type.clone());

    // logical operators force both sides to bool and never dispatch
    if op.is_logical() {
        expect_bool_convertible(ctx, lhs.ty.as_ref(), &lhs.range);
        expect_bool_convertible(ctx, rhs.ty.as_ref(), &rhs.range);
        return Operand { ty: Some(bool_ty), range };
    }
    // handle identity is a plain comparison
    if op.is_identity() {
        return Operand { ty: Some(bool_ty), range };
    }

    // operators guard against unresolved operands
    let (Some(l), Some(r)) = (&lhs.ty, &rhs.ty) else {
        return Operand { ty: None, range };
    };

    if number_like(l) && number_like(r) {
        let ty = if op.is_comparison() {
            Some(bool_ty.clone())
        } else if l.is_number_type() && r.is_number_type() {
            Some(common_number_type(l, r))
        } else {
            // enum operands degrade to plain integers
            Some(ResolvedType::from_type(ctx.builtins.int_type.clone()))
        };
        return Operand { ty, range };
    }

    let dispatch = if user_type(l) {
        op.alias().map(|alias| (l.clone(), rhs.clone(), alias))
    } else if user_type(r) {
        // user types can overload against primitives from either side
        op.reflected_alias().map(|alias| (r.clone(), lhs.clone(), alias))
    } else {
        None
    };

    let Some((receiver, argument, alias)) = dispatch else {
        ctx.diags.push_error(
            format!("Operator '{op}' of '{}' is not defined", l.name()),
            &**op_token,
        );
        return Operand { ty: None, range };
    };

    match method_call_on_type(ctx, scope, &receiver, alias, op_token, &[argument]) {
        Ok(result) => {
            let ty = if op.is_comparison() { Some(bool_ty) } else { result };
            Operand { ty, range }
        }
        Err(_) => {
            ctx.diags.push_error(
                format!("Operator '{op}' of '{}' is not defined", receiver.name()),
                &**op_token,
            );
            Operand { ty: None, range }
        }
    }
}

/// Assignment and compound assignment typing
fn analyze_assign_operator(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    op_token: &TokenRef,
    lhs: Operand,
    rhs: Operand,
) -> Option<ResolvedType> {
    let op = AssignOp::parse(op_token.as_str())?;
    let (Some(l), Some(r)) = (&lhs.ty, &rhs.ty) else {
        return lhs.ty.clone();
    };

    if number_like(l) && number_like(r) {
        return Some(l.clone());
    }
    if op == AssignOp::Assign && can_type_convert(r, l) {
        return Some(l.clone());
    }

    if user_type(l) {
        match method_call_on_type(ctx, scope, l, op.alias(), op_token, &[rhs.clone()]) {
            Ok(result) => return result.or_else(|| Some(l.clone())),
            Err(_) => {
                ctx.diags.push_error(
                    format!("Operator '{op}' of '{}' is not defined", l.name()),
                    &**op_token,
                );
                return None;
            }
        }
    }

    if op == AssignOp::Assign {
        ctx.diags.push_error(
            format!("Type mismatch: cannot convert '{}' to '{}'", r.name(), l.name()),
            &rhs.range,
        );
    } else {
        ctx.diags.push_error(
            format!("Operator '{op}' of '{}' is not defined", l.name()),
            &**op_token,
        );
    }
    None
}

/// A lambda introduces its own function-like scope; the return type is not
/// inferred from context
fn analyze_lambda(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    lambda: &Rc<LambdaExpr>,
) -> Option<ResolvedType> {
    let lambda_scope = create_anonymous_child(scope, "lambda");
    lambda_scope.borrow_mut().linked_node = Some(LinkedNode::Lambda(lambda.clone()));

    for param in &lambda.params {
        let ty = param.ty.as_ref().and_then(|ty| analyze_type(ctx, &lambda_scope, ty));
        let Some(identifier) = &param.identifier else { continue };
        let variable = Rc::new(SymbolVariable {
            name: identifier.text.clone(),
            declared_at: identifier.clone(),
            declared_scope: Rc::downgrade(&lambda_scope),
            ty: RefCell::new(ty),
            is_instance_member: false,
            access: None,
        });
        let _ = insert_symbol(&lambda_scope, Symbol::Variable(variable));
        ctx.highlights.classify(identifier.clone(), HighlightKind::Parameter);
    }

    super::statements::analyze_block_statements(ctx, &lambda_scope, &lambda.body);
    None
}
