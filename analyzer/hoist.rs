// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The hoist pass

Registers every top-level declaration into the scope tree before any body
is analyzed, so mutually referencing definitions resolve regardless of
source order. Produces the queue of analysis tasks that the analyzer then
runs: type-level resolution first (bases, signatures, enum members,
property types), then variable initializers, then function bodies.
*/

use crate::ast::{
    ClassDecl, ClassMember, EnumDecl, FuncDecl, FuncHead, InterfaceDecl, InterfaceMember, Script,
    ScriptItem, VarDecl, VirtualPropDecl,
};
use crate::diagnostics::BuildDiagnostics;
use crate::parser::TokenRef;
use crate::symbols::{
    find_or_create_child, insert_symbol, FunctionSource, LinkedNode, ScopeRef, Symbol,
    SymbolFunction, SymbolType, SymbolVariable, TypeSource,
};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::rc::Rc;

/// A unit of deferred analysis produced by hoisting
pub enum AnalyzeTask {
    /// Resolve the base list of a class or interface
    ResolveBases { ty: Rc<SymbolType>, scope: ScopeRef },
    /// Resolve parameter and return types of a function
    ResolveSignature { function: Rc<SymbolFunction> },
    /// Resolve the declared type of one variable declarator and analyze its
    /// initializer
    ResolveVariable { variable: Rc<SymbolVariable>, node: Rc<VarDecl>, declarator: usize },
    /// Give every enum member its type and analyze the value expressions
    ResolveEnumMembers { node: Rc<EnumDecl>, enum_type: Rc<SymbolType> },
    /// Resolve the type of a virtual property
    ResolveVirtualProp { variable: Rc<SymbolVariable>, node: Rc<VirtualPropDecl> },
    /// Analyze a function body in a fresh child scope
    FunctionBody { function: Rc<SymbolFunction> },
    /// Analyze the getter/setter bodies of a virtual property
    VirtualPropBodies { variable: Rc<SymbolVariable>, node: Rc<VirtualPropDecl> },
}

pub struct HoistResult {
    pub global_scope: ScopeRef,
    pub analyze_queue: Vec<AnalyzeTask>,
}

struct HoistCtx<'a> {
    diags: &'a mut BuildDiagnostics,
    /// System declarations skip body analysis and mark their types
    system: bool,
    types: Vec<AnalyzeTask>,
    vars: Vec<AnalyzeTask>,
    bodies: Vec<AnalyzeTask>,
}

/// Hoist all declarations of `script` into `scope` and return the ordered
/// analysis queue
pub fn hoist(
    script: &Script,
    scope: &ScopeRef,
    system: bool,
    diags: &mut BuildDiagnostics,
) -> Vec<AnalyzeTask> {
    let mut ctx =
        HoistCtx { diags, system, types: Vec::new(), vars: Vec::new(), bodies: Vec::new() };
    hoist_script(&mut ctx, scope, script);
    let mut queue = ctx.types;
    queue.extend(ctx.vars);
    queue.extend(ctx.bodies);
    queue
}

fn hoist_script(ctx: &mut HoistCtx, scope: &ScopeRef, script: &Script) {
    for item in &script.items {
        match item {
            ScriptItem::Namespace(node) => {
                let mut current = scope.clone();
                for name in &node.names {
                    current = find_or_create_child(&current, name.as_str());
                    let mut borrowed = current.borrow_mut();
                    if borrowed.linked_node.is_none() {
                        borrowed.linked_node = Some(LinkedNode::Namespace(node.clone()));
                    }
                }
                hoist_script(ctx, &current, &node.script);
            }
            ScriptItem::Class(node) => hoist_class(ctx, scope, node),
            ScriptItem::Mixin(node) => hoist_class(ctx, scope, &node.class),
            ScriptItem::Interface(node) => hoist_interface(ctx, scope, node),
            ScriptItem::Enum(node) => hoist_enum(ctx, scope, node),
            ScriptItem::TypeDef(node) => {
                let is_number =
                    crate::lexer::reserved_properties(node.prime_type.as_str()).is_prime_type
                        && !matches!(node.prime_type.as_str(), "void" | "bool");
                let ty = Rc::new(SymbolType {
                    name: node.identifier.text.clone(),
                    declared_at: Some(node.identifier.clone()),
                    source: TypeSource::TypeDef(node.clone()),
                    template_types: None,
                    members_scope: RefCell::new(None),
                    base_types: RefCell::new(Vec::new()),
                    funcdef_signature: RefCell::new(None),
                    is_system_type: ctx.system,
                    is_number_type: is_number,
                });
                insert_or_report(ctx, scope, Symbol::Type(ty), &node.identifier);
            }
            ScriptItem::FuncDef(node) => hoist_funcdef(ctx, scope, node),
            ScriptItem::Func(node) => hoist_function(ctx, scope, node),
            ScriptItem::VirtualProp(node) => hoist_virtual_prop(ctx, scope, node, false),
            ScriptItem::Var(node) => hoist_var(ctx, scope, node, false),
            ScriptItem::Import(node) => {
                let function = SymbolFunction::new(
                    node.identifier.text.clone(),
                    node.identifier.clone(),
                    FunctionSource::Import(node.clone()),
                    Rc::downgrade(scope),
                );
                chain_function(ctx, scope, function.clone(), &node.identifier);
                ctx.types.push(AnalyzeTask::ResolveSignature { function });
            }
        }
    }
}

fn hoist_funcdef(ctx: &mut HoistCtx, scope: &ScopeRef, node: &Rc<crate::ast::FuncDefDecl>) {
    let signature = SymbolFunction::new(
        node.identifier.text.clone(),
        node.identifier.clone(),
        FunctionSource::FuncDef(node.clone()),
        Rc::downgrade(scope),
    );
    ctx.types.push(AnalyzeTask::ResolveSignature { function: signature.clone() });
    let ty = Rc::new(SymbolType {
        name: node.identifier.text.clone(),
        declared_at: Some(node.identifier.clone()),
        source: TypeSource::FuncDef(node.clone()),
        template_types: None,
        members_scope: RefCell::new(None),
        base_types: RefCell::new(Vec::new()),
        funcdef_signature: RefCell::new(Some(signature)),
        is_system_type: ctx.system,
        is_number_type: false,
    });
    insert_or_report(ctx, scope, Symbol::Type(ty), &node.identifier);
}

fn hoist_class(ctx: &mut HoistCtx, scope: &ScopeRef, node: &Rc<ClassDecl>) {
    let members_scope = find_or_create_child(scope, node.identifier.as_str());
    members_scope.borrow_mut().linked_node = Some(LinkedNode::Class(node.clone()));

    let ty = Rc::new(SymbolType {
        name: node.identifier.text.clone(),
        declared_at: Some(node.identifier.clone()),
        source: TypeSource::Class(node.clone()),
        template_types: node.template_types.clone(),
        members_scope: RefCell::new(Some(members_scope.clone())),
        base_types: RefCell::new(Vec::new()),
        funcdef_signature: RefCell::new(None),
        is_system_type: ctx.system,
        is_number_type: false,
    });
    insert_or_report(ctx, scope, Symbol::Type(ty.clone()), &node.identifier);

    if let Some(template_types) = &node.template_types {
        for param in template_types {
            let param_ty = Rc::new(SymbolType {
                name: param.text.clone(),
                declared_at: Some(param.clone()),
                source: TypeSource::TemplateParam,
                template_types: None,
                members_scope: RefCell::new(None),
                base_types: RefCell::new(Vec::new()),
                funcdef_signature: RefCell::new(None),
                is_system_type: ctx.system,
                is_number_type: false,
            });
            insert_or_report(ctx, &members_scope, Symbol::Type(param_ty), param);
        }
    }

    if !node.bases.is_empty() {
        ctx.types.push(AnalyzeTask::ResolveBases { ty, scope: scope.clone() });
    }

    for member in &node.members {
        match member {
            ClassMember::Var(var) => hoist_var(ctx, &members_scope, var, true),
            ClassMember::Func(func) => hoist_function(ctx, &members_scope, func),
            ClassMember::VirtualProp(prop) => {
                hoist_virtual_prop(ctx, &members_scope, prop, true)
            }
            ClassMember::FuncDef(funcdef) => hoist_funcdef(ctx, &members_scope, funcdef),
        }
    }
}

fn hoist_interface(ctx: &mut HoistCtx, scope: &ScopeRef, node: &Rc<InterfaceDecl>) {
    let members_scope = find_or_create_child(scope, node.identifier.as_str());
    members_scope.borrow_mut().linked_node = Some(LinkedNode::Interface(node.clone()));

    let ty = Rc::new(SymbolType {
        name: node.identifier.text.clone(),
        declared_at: Some(node.identifier.clone()),
        source: TypeSource::Interface(node.clone()),
        template_types: None,
        members_scope: RefCell::new(Some(members_scope.clone())),
        base_types: RefCell::new(Vec::new()),
        funcdef_signature: RefCell::new(None),
        is_system_type: ctx.system,
        is_number_type: false,
    });
    insert_or_report(ctx, scope, Symbol::Type(ty.clone()), &node.identifier);

    if !node.bases.is_empty() {
        ctx.types.push(AnalyzeTask::ResolveBases { ty, scope: scope.clone() });
    }

    for member in &node.members {
        match member {
            InterfaceMember::Method(method) => {
                let function = SymbolFunction::new(
                    method.identifier.text.clone(),
                    method.identifier.clone(),
                    FunctionSource::IntfMethod(method.clone()),
                    Rc::downgrade(&members_scope),
                );
                chain_function(ctx, &members_scope, function.clone(), &method.identifier);
                ctx.types.push(AnalyzeTask::ResolveSignature { function });
            }
            InterfaceMember::VirtualProp(prop) => {
                hoist_virtual_prop(ctx, &members_scope, prop, true)
            }
        }
    }
}

fn hoist_enum(ctx: &mut HoistCtx, scope: &ScopeRef, node: &Rc<EnumDecl>) {
    let members_scope = find_or_create_child(scope, node.identifier.as_str());
    members_scope.borrow_mut().linked_node = Some(LinkedNode::Enum(node.clone()));

    let ty = Rc::new(SymbolType {
        name: node.identifier.text.clone(),
        declared_at: Some(node.identifier.clone()),
        source: TypeSource::Enum(node.clone()),
        template_types: None,
        members_scope: RefCell::new(Some(members_scope.clone())),
        base_types: RefCell::new(Vec::new()),
        funcdef_signature: RefCell::new(None),
        is_system_type: ctx.system,
        is_number_type: false,
    });
    insert_or_report(ctx, scope, Symbol::Type(ty.clone()), &node.identifier);

    for member in &node.members {
        let variable = Rc::new(SymbolVariable {
            name: member.identifier.text.clone(),
            declared_at: member.identifier.clone(),
            declared_scope: Rc::downgrade(&members_scope),
            ty: RefCell::new(None),
            is_instance_member: false,
            access: None,
        });
        insert_or_report(ctx, &members_scope, Symbol::Variable(variable), &member.identifier);
    }
    ctx.types.push(AnalyzeTask::ResolveEnumMembers { node: node.clone(), enum_type: ty });
}

fn hoist_function(ctx: &mut HoistCtx, scope: &ScopeRef, node: &Rc<FuncDecl>) {
    let name: SmolStr = match node.head {
        FuncHead::Destructor => format!("~{}", node.identifier.as_str()).into(),
        _ => node.identifier.text.clone(),
    };
    let function = SymbolFunction::new(
        name,
        node.identifier.clone(),
        FunctionSource::Func(node.clone()),
        Rc::downgrade(scope),
    );
    chain_function(ctx, scope, function.clone(), &node.identifier);
    ctx.types.push(AnalyzeTask::ResolveSignature { function: function.clone() });
    if !ctx.system {
        ctx.bodies.push(AnalyzeTask::FunctionBody { function });
    }
}

/// Insert a function symbol, chaining it as an overload when the name is
/// already bound to a function
fn chain_function(
    ctx: &mut HoistCtx,
    scope: &ScopeRef,
    function: Rc<SymbolFunction>,
    identifier: &TokenRef,
) {
    match insert_symbol(scope, Symbol::Function(function.clone())) {
        Ok(()) => {}
        Err(Symbol::Function(existing)) => existing.append_overload(function),
        Err(_) => {
            ctx.diags.push_error(
                format!("'{}' is already declared", identifier.as_str()),
                &**identifier,
            );
        }
    }
}

fn hoist_virtual_prop(
    ctx: &mut HoistCtx,
    scope: &ScopeRef,
    node: &Rc<VirtualPropDecl>,
    is_instance: bool,
) {
    let variable = Rc::new(SymbolVariable {
        name: node.identifier.text.clone(),
        declared_at: node.identifier.clone(),
        declared_scope: Rc::downgrade(scope),
        ty: RefCell::new(None),
        is_instance_member: is_instance,
        access: node.access,
    });
    insert_or_report(ctx, scope, Symbol::Variable(variable.clone()), &node.identifier);

    // the accessor scopes exist up front so return statements can find them
    for accessor in &node.accessors {
        let prefix = match accessor.kind {
            crate::ast::PropAccessorKind::Getter => "get",
            crate::ast::PropAccessorKind::Setter => "set",
        };
        let key = format!("{prefix}_{}", node.identifier.as_str());
        let accessor_scope = find_or_create_child(scope, &key);
        accessor_scope.borrow_mut().linked_node = Some(LinkedNode::VirtualProp(node.clone()));
    }

    ctx.types
        .push(AnalyzeTask::ResolveVirtualProp { variable: variable.clone(), node: node.clone() });
    if !ctx.system {
        ctx.bodies.push(AnalyzeTask::VirtualPropBodies { variable, node: node.clone() });
    }
}

fn hoist_var(ctx: &mut HoistCtx, scope: &ScopeRef, node: &Rc<VarDecl>, is_instance: bool) {
    for (index, declarator) in node.declarators.iter().enumerate() {
        let variable = Rc::new(SymbolVariable {
            name: declarator.identifier.text.clone(),
            declared_at: declarator.identifier.clone(),
            declared_scope: Rc::downgrade(scope),
            ty: RefCell::new(None),
            is_instance_member: is_instance,
            access: node.access,
        });
        insert_or_report(ctx, scope, Symbol::Variable(variable.clone()), &declarator.identifier);
        ctx.vars.push(AnalyzeTask::ResolveVariable {
            variable,
            node: node.clone(),
            declarator: index,
        });
    }
}

fn insert_or_report(ctx: &mut HoistCtx, scope: &ScopeRef, symbol: Symbol, identifier: &TokenRef) {
    if insert_symbol(scope, symbol).is_err() {
        ctx.diags.push_error(
            format!("'{}' is already declared", identifier.as_str()),
            &**identifier,
        );
    }
}
