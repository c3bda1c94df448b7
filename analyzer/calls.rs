// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Function call dispatch, constructor rules and overload resolution

use super::expressions::Operand;
use super::AnalyzeCtx;
use crate::ast::{AccessModifier, NodeRange};
use crate::completion::CompletionHint;
use crate::highlight::HighlightKind;
use crate::parser::TokenRef;
use crate::symbols::{
    apply_template_translate, can_type_convert, push_completion_hint, push_reference,
    scope_is_inside, ResolvedType, ScopeRef, SymbolFunction, SymbolType, TemplateTranslation,
    TypeOrFunction,
};
use itertools::Itertools;
use std::rc::Rc;

/// Resolve the signatures of a function symbol on demand, in the scope it
/// was declared in
pub fn ensure_signature(ctx: &mut AnalyzeCtx, function: &Rc<SymbolFunction>) {
    if function.signature_resolved.get() {
        return;
    }
    function.signature_resolved.set(true);
    let scope = match function.declared_scope.upgrade() {
        Some(scope) => scope,
        None => return,
    };

    let param_types = function
        .source
        .params()
        .iter()
        .map(|param| super::types::analyze_type(ctx, &scope, &param.ty))
        .collect();
    *function.param_types.borrow_mut() = param_types;

    let return_type = match function.source.return_type_node() {
        Some(node) => super::types::analyze_type(ctx, &scope, node),
        None => constructed_type(&scope, function),
    };
    *function.return_type.borrow_mut() = return_type;
}

/// A constructor returns the type it lives in: its scope is the type's
/// member scope, and the type symbol is a sibling of that scope
fn constructed_type(scope: &ScopeRef, function: &Rc<SymbolFunction>) -> Option<ResolvedType> {
    if function.name.starts_with('~') {
        return None;
    }
    let parent = scope.borrow().parent()?;
    let key = scope.borrow().key.clone();
    let result = match parent.borrow().find_symbol(&key) {
        Some(crate::symbols::Symbol::Type(ty)) => Some(ResolvedType::from_type(ty)),
        _ => None,
    };
    result
}

/// The contract of the external overload matcher: given the caller
/// identifier, the argument operands, the head of the callee's overload
/// chain and the template translation of the receiver, pick the best
/// overload, record the reference, and return the (translated) return type.
///
/// Candidates are scored per argument: identical type 2, convertible (or
/// unknown) 1, otherwise rejected. Equal best scores on different overloads
/// surface as an ambiguity diagnostic; the first of them is still chosen so
/// resolution stays deterministic.
pub fn check_function_match(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    usage: &TokenRef,
    args: &[Operand],
    head: &Rc<SymbolFunction>,
    translate: Option<&Rc<TemplateTranslation>>,
) -> Option<ResolvedType> {
    push_completion_hint(
        scope,
        CompletionHint::Arguments {
            expected_callee: head.clone(),
            passing_ranges: args.iter().map(|a| a.range.clone()).collect(),
            template_translate: translate.cloned(),
        },
    );

    let overloads = head.overloads();
    let mut best: Option<(Rc<SymbolFunction>, i32)> = None;
    let mut ambiguous = false;
    for candidate in &overloads {
        ensure_signature(ctx, candidate);
        let score = match score_candidate(args, candidate, translate) {
            Some(score) => score,
            None => continue,
        };
        match &best {
            Some((_, best_score)) if *best_score == score => ambiguous = true,
            Some((_, best_score)) if *best_score > score => {}
            _ => {
                best = Some((candidate.clone(), score));
                ambiguous = false;
            }
        }
    }

    let chosen = match best {
        Some((chosen, _)) => chosen,
        None => {
            let passed = args
                .iter()
                .map(|a| a.ty.as_ref().map_or_else(|| "?".to_string(), |t| t.name().to_string()))
                .join(", ");
            ctx.diags.push_error(
                format!("No matching signature for '{}({passed})'", head.name),
                &**usage,
            );
            for candidate in overloads.iter().take(ctx.config.max_signature_notes) {
                ctx.diags.push_note(
                    format!("Candidate: '{}' with {} parameter(s)", candidate.name, candidate.max_args()),
                    &*candidate.declared_at,
                );
            }
            return None;
        }
    };
    if ambiguous {
        ctx.diags.push_error(format!("Ambiguous call to '{}'", head.name), &**usage);
    }

    push_reference(scope, chosen.declared_at.clone(), usage.clone());
    ctx.highlights.classify(usage.clone(), HighlightKind::Function);
    let result = apply_template_translate(chosen.return_type.borrow().as_ref(), translate);
    result
}

fn score_candidate(
    args: &[Operand],
    candidate: &Rc<SymbolFunction>,
    translate: Option<&Rc<TemplateTranslation>>,
) -> Option<i32> {
    if args.len() > candidate.max_args() || args.len() < candidate.min_args() {
        return None;
    }
    let param_types = candidate.param_types.borrow();
    let mut score = 0;
    for (arg, param) in args.iter().zip(param_types.iter()) {
        let param = apply_template_translate(param.as_ref(), translate);
        score += match (&arg.ty, &param) {
            (Some(arg_ty), Some(param_ty)) => {
                if same_resolved_symbol(arg_ty, param_ty) {
                    2
                } else if can_type_convert(arg_ty, param_ty) {
                    1
                } else {
                    return None;
                }
            }
            // unresolved on either side: best effort, counts as convertible
            _ => 1,
        };
    }
    Some(score)
}

fn same_resolved_symbol(a: &ResolvedType, b: &ResolvedType) -> bool {
    match (&a.symbol, &b.symbol) {
        (TypeOrFunction::Type(a), TypeOrFunction::Type(b)) => Rc::ptr_eq(a, b),
        (TypeOrFunction::Function(a), TypeOrFunction::Function(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// `TYPE(args)`: prefer a declared constructor, else apply the built-in
/// construction rules
pub fn construct_call_on_type(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    usage: &TokenRef,
    call_range: &NodeRange,
    target: &ResolvedType,
    args: &[Operand],
) -> Option<ResolvedType> {
    let symbol_type = match target.as_type() {
        Some(ty) => ty.clone(),
        None => return None,
    };

    let members_scope = symbol_type.members_scope.borrow().clone();
    if let Some(members) = members_scope {
        let constructor = members.borrow().find_symbol(symbol_type.name.as_str());
        if let Some(crate::symbols::Symbol::Function(head)) = constructor {
            check_function_match(
                ctx,
                scope,
                usage,
                args,
                &head,
                target.template_translate.as_ref(),
            )?;
            return Some(target.clone());
        }
    }

    if symbol_type.is_enum() {
        let int_convertible = args.len() == 1
            && args[0].ty.as_ref().is_none_or(|ty| {
                can_type_convert(ty, &ResolvedType::from_type(ctx.builtins.int_type.clone()))
            });
        if !int_convertible {
            ctx.diags
                .push_error("Enum constructor requires an integer".to_string(), call_range);
        }
        return Some(target.clone());
    }

    if !args.is_empty() {
        ctx.diags.push_error(
            format!("Type '{}' has no matching constructor", symbol_type.name),
            call_range,
        );
    }
    Some(target.clone())
}

/// `value.name(args)` and the operator aliases rewritten into it
pub fn method_call_on_type(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    receiver: &ResolvedType,
    method: &str,
    usage: &TokenRef,
    args: &[Operand],
) -> Result<Option<ResolvedType>, MethodLookupError> {
    let symbol_type = match receiver.as_type() {
        Some(ty) => ty.clone(),
        None => return Err(MethodLookupError::NoMembers),
    };
    let members = match symbol_type.members_scope.borrow().clone() {
        Some(members) => members,
        None => return Err(MethodLookupError::NoMembers),
    };
    let symbol = members.borrow().find_symbol(method);
    match symbol {
        Some(crate::symbols::Symbol::Function(head)) => {
            if let Some(source_decl) = function_access(&head) {
                check_member_access(ctx, scope, usage, method, source_decl, &members);
            }
            Ok(check_function_match(
                ctx,
                scope,
                usage,
                args,
                &head,
                receiver.template_translate.as_ref(),
            ))
        }
        Some(_) => Err(MethodLookupError::NotAMethod),
        None => Err(MethodLookupError::NotFound),
    }
}

pub enum MethodLookupError {
    /// The receiver has no member scope (primitives, unresolved)
    NoMembers,
    NotFound,
    NotAMethod,
}

fn function_access(function: &Rc<SymbolFunction>) -> Option<Option<AccessModifier>> {
    match &function.source {
        crate::symbols::FunctionSource::Func(decl) => Some(decl.access),
        _ => None,
    }
}

/// Public members are reachable from everywhere; private ones only from
/// inside the defining scope; protected ones also from scopes whose
/// enclosing class derives from the defining class
pub fn is_allowed_to_access_member(
    scope: &ScopeRef,
    access: Option<AccessModifier>,
    defining_scope: &ScopeRef,
) -> bool {
    match access {
        None => true,
        Some(AccessModifier::Private) => scope_is_inside(scope, defining_scope),
        Some(AccessModifier::Protected) => {
            if scope_is_inside(scope, defining_scope) {
                return true;
            }
            match (enclosing_class_type(scope), enclosing_class_type(defining_scope)) {
                (Some(current), Some(defining)) => current.derives_from(&defining),
                _ => false,
            }
        }
    }
}

pub(crate) fn check_member_access(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    usage: &TokenRef,
    name: &str,
    access: Option<AccessModifier>,
    defining_scope: &ScopeRef,
) {
    if !is_allowed_to_access_member(scope, access, defining_scope) {
        ctx.diags.push_error(format!("'{name}' is not a public member"), &**usage);
    }
}

/// The class type of the closest scope created for a class, if any
pub fn enclosing_class_type(scope: &ScopeRef) -> Option<Rc<SymbolType>> {
    let mut current = scope.clone();
    loop {
        let linked_class = match &current.borrow().linked_node {
            Some(crate::symbols::LinkedNode::Class(node)) => Some(node.identifier.text.clone()),
            Some(crate::symbols::LinkedNode::Interface(node)) => {
                Some(node.identifier.text.clone())
            }
            _ => None,
        };
        if let Some(name) = linked_class {
            let parent = current.borrow().parent()?;
            return match parent.borrow().find_symbol(&name) {
                Some(crate::symbols::Symbol::Type(ty)) => Some(ty),
                _ => None,
            };
        }
        let parent = current.borrow().parent();
        match parent {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}
