// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Resolution of type references and scope prefixes

use super::AnalyzeCtx;
use crate::ast::{DataType, NodeRange, RefModifier, ScopeNode, TypeNode};
use crate::completion::CompletionHint;
use crate::highlight::HighlightKind;
use crate::symbols::{
    find_symbol_walking_parents, push_completion_hint, push_reference, ResolvedType, ScopeRef,
    Symbol, SymbolType, TemplateTranslation, TypeSource,
};
use by_address::ByAddress;
use std::collections::HashMap;
use std::rc::Rc;

/// Resolve a parsed type reference against the scope tree.
///
/// `auto` resolves to nothing here; the caller substitutes the initializer
/// type.
pub fn analyze_type(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    node: &Rc<TypeNode>,
) -> Option<ResolvedType> {
    if matches!(node.data, DataType::Auto(_)) {
        return None;
    }

    let lookup_scope = match &node.scope {
        Some(scope_node) => analyze_scope(ctx, scope, scope_node)?,
        None => scope.clone(),
    };

    let token = node.data.token().clone();
    let name = token.as_str();

    let (symbol, found_in) = match find_symbol_walking_parents(&lookup_scope, name) {
        Some(hit) => hit,
        None => {
            ctx.diags.push_error(format!("'{name}' is not defined"), &*token);
            return None;
        }
    };

    // a constructor has the same name as its type and lives inside the
    // type's member scope; the type itself is one level up
    let (symbol, found_in) = if matches!(symbol, Symbol::Function(_))
        && found_in.borrow().key.as_str() == name
    {
        let parent = found_in.borrow().parent();
        match parent.and_then(|p| find_symbol_walking_parents(&p, name)) {
            Some(hit) => hit,
            None => (symbol, found_in),
        }
    } else {
        (symbol, found_in)
    };
    let _ = found_in;

    let symbol_type = match symbol {
        Symbol::Type(ty) => ty,
        Symbol::Variable(_) | Symbol::Function(_) => {
            ctx.diags.push_error(format!("'{name}' is not a type"), &*token);
            return None;
        }
    };

    ctx.highlights.classify(token.clone(), highlight_for_type(&symbol_type));
    if let Some(declared_at) = &symbol_type.declared_at {
        push_reference(scope, declared_at.clone(), token.clone());
    }

    // a funcdef type is used as a handler of its function signature
    if matches!(symbol_type.source, TypeSource::FuncDef(_)) {
        let signature = symbol_type.funcdef_signature.borrow().clone();
        if let Some(signature) = signature {
            let resolved = ResolvedType::from_function(signature).with_handler(true);
            return Some(wrap_array(ctx, scope, node, resolved));
        }
    }

    let template_translate = resolve_template_args(ctx, scope, node, &symbol_type);
    let resolved = ResolvedType {
        symbol: crate::symbols::TypeOrFunction::Type(symbol_type),
        is_handler: matches!(
            node.ref_modifier,
            Some(RefModifier::Handle) | Some(RefModifier::HandleConst)
        ),
        template_translate,
    };
    Some(wrap_array(ctx, scope, node, resolved))
}

fn highlight_for_type(symbol: &Rc<SymbolType>) -> HighlightKind {
    match symbol.source {
        TypeSource::Class(_) => HighlightKind::Class,
        TypeSource::Interface(_) => HighlightKind::Interface,
        TypeSource::Enum(_) => HighlightKind::Enum,
        TypeSource::Primitive => HighlightKind::Builtin,
        _ => HighlightKind::Type,
    }
}

/// Match declared template parameters against the written arguments
fn resolve_template_args(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    node: &Rc<TypeNode>,
    symbol_type: &Rc<SymbolType>,
) -> Option<Rc<TemplateTranslation>> {
    let params = symbol_type.template_types.as_ref()?;
    if node.template_args.is_empty() {
        return None;
    }
    if node.template_args.len() != params.len() {
        ctx.diags.push_error(
            format!(
                "Type '{}' takes {} template argument(s)",
                symbol_type.name,
                params.len()
            ),
            &node.range,
        );
    }
    let mut map = HashMap::new();
    for (param, arg) in params.iter().zip(node.template_args.iter()) {
        let resolved = analyze_type(ctx, scope, arg);
        map.insert(ByAddress(param.clone()), resolved);
    }
    Some(Rc::new(TemplateTranslation(map)))
}

/// `T[]` is sugar for an instantiation of the configured array type
fn wrap_array(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    node: &Rc<TypeNode>,
    inner: ResolvedType,
) -> ResolvedType {
    if !node.is_array {
        return inner;
    }
    let array_name = ctx.config.array_type.as_str();
    let array_type = match find_symbol_walking_parents(scope, array_name) {
        Some((Symbol::Type(ty), _)) => ty,
        _ => {
            ctx.diags.push_error(
                format!("The array type '{array_name}' is not defined"),
                &node.range,
            );
            return inner;
        }
    };
    let mut map = HashMap::new();
    if let Some(params) = &array_type.template_types {
        if let Some(param) = params.first() {
            map.insert(ByAddress(param.clone()), Some(inner));
        }
    }
    ResolvedType {
        symbol: crate::symbols::TypeOrFunction::Type(array_type),
        is_handler: matches!(
            node.ref_modifier,
            Some(RefModifier::Handle) | Some(RefModifier::HandleConst)
        ),
        template_translate: Some(Rc::new(TemplateTranslation(map))),
    }
}

/// Resolve `[::] id1::id2::...` to the scope it names.
///
/// The search starts at the global scope for `::`-anchored prefixes,
/// otherwise at the current scope; a failing first hop climbs one parent at
/// a time and retries. Every hop leaves a namespace completion hint.
pub fn analyze_scope(
    ctx: &mut AnalyzeCtx,
    scope: &ScopeRef,
    node: &Rc<ScopeNode>,
) -> Option<ScopeRef> {
    let mut current = if node.is_global { global_scope_of(scope) } else { scope.clone() };

    for (i, ident) in node.scope_list.iter().enumerate() {
        push_completion_hint(
            scope,
            CompletionHint::Namespace {
                range: NodeRange::single(ident.clone()),
                namespace_list: node.scope_list[..=i].to_vec(),
            },
        );

        let mut hop = current.borrow().find_child(ident.as_str());
        if hop.is_none() && i == 0 && !node.is_global {
            // the prefix may name a sibling of an enclosing scope
            let mut search = current.clone();
            while let Some(parent) = {
                let p = search.borrow().parent();
                p
            } {
                if let Some(found) = parent.borrow().find_child(ident.as_str()) {
                    hop = Some(found);
                    break;
                }
                search = parent;
            }
        }
        match hop {
            Some(found) => current = found,
            None => {
                ctx.diags.push_error("Invalid scope".to_string(), &**ident);
                return None;
            }
        }
    }
    Some(current)
}

pub fn global_scope_of(scope: &ScopeRef) -> ScopeRef {
    let mut current = scope.clone();
    loop {
        let parent = current.borrow().parent();
        match parent {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}
