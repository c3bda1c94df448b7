// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The semantic analyzer

Walks the AST produced by the parser, resolves identifiers and types
against the scope tree built by the [`hoist`] pass, rewrites operators to
alias method calls, checks conversions and control flow, and leaves
highlight reclassifications and completion hints behind.

Errors never abort: every unresolvable sub-expression yields no type and
the analysis continues, with operators and calls guarding against unknown
operands.
*/

use crate::diagnostics::BuildDiagnostics;
use crate::highlight::{HighlightKind, Highlights};
use crate::symbols::{
    create_anonymous_child, insert_symbol, FunctionSource, LinkedNode, ResolvedType, Symbol,
    SymbolVariable, TypeSource,
};
use crate::typeregister::BuiltinTypes;
use crate::FrontendConfiguration;
use std::cell::RefCell;
use std::rc::Rc;

pub mod calls;
pub mod expressions;
pub mod hoist;
pub mod operators;
pub mod statements;
pub mod types;

pub use hoist::{AnalyzeTask, HoistResult};

/// Everything the analysis functions need besides the current scope
pub struct AnalyzeCtx<'a> {
    pub diags: &'a mut BuildDiagnostics,
    pub highlights: &'a mut Highlights,
    pub builtins: &'a BuiltinTypes,
    pub config: &'a FrontendConfiguration,
}

/// Run the hoisted queue to completion
pub fn run(queue: Vec<AnalyzeTask>, ctx: &mut AnalyzeCtx) {
    for task in queue {
        run_task(task, ctx);
    }
}

fn run_task(task: AnalyzeTask, ctx: &mut AnalyzeCtx) {
    match task {
        AnalyzeTask::ResolveBases { ty, scope } => {
            let bases = match &ty.source {
                TypeSource::Class(node) => node.bases.clone(),
                TypeSource::Interface(node) => node.bases.clone(),
                _ => Vec::new(),
            };
            for base in bases {
                match crate::symbols::find_symbol_walking_parents(&scope, base.as_str()) {
                    Some((Symbol::Type(base_ty), _)) => {
                        ctx.highlights.classify(
                            base.clone(),
                            match base_ty.source {
                                TypeSource::Interface(_) => HighlightKind::Interface,
                                _ => HighlightKind::Class,
                            },
                        );
                        if let Some(declared_at) = &base_ty.declared_at {
                            crate::symbols::push_reference(
                                &scope,
                                declared_at.clone(),
                                base.clone(),
                            );
                        }
                        ty.base_types.borrow_mut().push(base_ty);
                    }
                    Some(_) => {
                        ctx.diags
                            .push_error(format!("'{}' is not a type", base.as_str()), &*base);
                    }
                    None => {
                        ctx.diags
                            .push_error(format!("'{}' is not defined", base.as_str()), &*base);
                    }
                }
            }
        }
        AnalyzeTask::ResolveSignature { function } => {
            calls::ensure_signature(ctx, &function);
        }
        AnalyzeTask::ResolveVariable { variable, node, declarator } => {
            let Some(scope) = variable.declared_scope.upgrade() else { return };
            let declared = types::analyze_type(ctx, &scope, &node.ty);
            let is_auto = matches!(node.ty.data, crate::ast::DataType::Auto(_));
            let init = node.declarators.get(declarator).and_then(|d| d.init.as_ref());
            let ty = statements::analyze_var_init(ctx, &scope, &node, init, &declared, is_auto);
            *variable.ty.borrow_mut() = ty;
        }
        AnalyzeTask::ResolveEnumMembers { node, enum_type } => {
            let Some(scope) = enum_type.members_scope.borrow().clone() else { return };
            let resolved = ResolvedType::from_type(enum_type.clone());
            for member in &node.members {
                if let Some(Symbol::Variable(variable)) =
                    scope.borrow().find_symbol(member.identifier.as_str())
                {
                    *variable.ty.borrow_mut() = Some(resolved.clone());
                }
                if let Some(value) = &member.value {
                    let value_ty = expressions::analyze_expr(ctx, &scope, value);
                    if let Some(value_ty) = value_ty {
                        let int_ty = ResolvedType::from_type(ctx.builtins.int_type.clone());
                        if !crate::symbols::can_type_convert(&value_ty, &int_ty) {
                            ctx.diags.push_error(
                                format!(
                                    "Type mismatch: cannot convert '{}' to 'int'",
                                    value_ty.name()
                                ),
                                &value.range,
                            );
                        }
                    }
                }
            }
        }
        AnalyzeTask::ResolveVirtualProp { variable, node } => {
            let Some(scope) = variable.declared_scope.upgrade() else { return };
            *variable.ty.borrow_mut() = types::analyze_type(ctx, &scope, &node.ty);
        }
        AnalyzeTask::FunctionBody { function } => analyze_function_body(ctx, &function),
        AnalyzeTask::VirtualPropBodies { variable, node } => {
            let Some(scope) = variable.declared_scope.upgrade() else { return };
            for accessor in &node.accessors {
                let prefix = match accessor.kind {
                    crate::ast::PropAccessorKind::Getter => "get",
                    crate::ast::PropAccessorKind::Setter => "set",
                };
                let key = format!("{prefix}_{}", node.identifier.as_str());
                let Some(accessor_scope) = scope.borrow().find_child(&key) else { continue };
                if accessor.kind == crate::ast::PropAccessorKind::Setter {
                    // setters receive the assigned value as `value`
                    let value = Rc::new(SymbolVariable {
                        name: "value".into(),
                        declared_at: node.identifier.clone(),
                        declared_scope: Rc::downgrade(&accessor_scope),
                        ty: RefCell::new(variable.ty.borrow().clone()),
                        is_instance_member: false,
                        access: None,
                    });
                    let _ = insert_symbol(&accessor_scope, Symbol::Variable(value));
                }
                if let Some(body) = &accessor.body {
                    statements::analyze_block_statements(ctx, &accessor_scope, body);
                }
            }
        }
    }
}

/// Create the body scope of a function, bind its parameters and analyze
/// the statements
fn analyze_function_body(ctx: &mut AnalyzeCtx, function: &Rc<crate::symbols::SymbolFunction>) {
    let node = match &function.source {
        FunctionSource::Func(node) => node.clone(),
        // interface methods, funcdefs and imports have no body
        _ => return,
    };
    let Some(parent) = function.declared_scope.upgrade() else { return };
    let body_scope = create_anonymous_child(&parent, function.name.as_str());
    body_scope.borrow_mut().linked_node = Some(LinkedNode::Func(node.clone()));

    calls::ensure_signature(ctx, function);
    let param_types = function.param_types.borrow().clone();
    for (param, ty) in node.params.iter().zip(param_types) {
        let Some(identifier) = &param.identifier else { continue };
        if let Some(default_value) = &param.default_value {
            expressions::analyze_assign(ctx, &body_scope, default_value);
        }
        let variable = Rc::new(SymbolVariable {
            name: identifier.text.clone(),
            declared_at: identifier.clone(),
            declared_scope: Rc::downgrade(&body_scope),
            ty: RefCell::new(ty),
            is_instance_member: false,
            access: None,
        });
        ctx.highlights.classify(identifier.clone(), HighlightKind::Parameter);
        if insert_symbol(&body_scope, Symbol::Variable(variable)).is_err() {
            ctx.diags.push_error(
                format!("'{}' is already declared", identifier.as_str()),
                &**identifier,
            );
        }
    }

    statements::analyze_block_statements(ctx, &body_scope, &node.body);
}
