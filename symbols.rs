// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The symbol graph built by the hoist pass and the analyzer

Scopes form a tree rooted in the global scope and outlive the analysis; they
are what the language-server queries (go-to-definition, completion) run
against. Symbols are owned by the scope that declares them.
*/

use crate::ast::{
    AccessModifier, ClassDecl, EnumDecl, FuncDecl, FuncDefDecl, ImportDecl, InterfaceDecl,
    IntfMethod, LambdaExpr, NamespaceDecl, Param, StatBlock, TypeDefDecl, TypeNode,
    VirtualPropDecl,
};
use crate::completion::CompletionHint;
use crate::parser::TokenRef;
use by_address::ByAddress;
use smol_str::SmolStr;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// What kind of declaration a [`SymbolType`] stands for
#[derive(Debug, Clone)]
pub enum TypeSource {
    Class(Rc<ClassDecl>),
    Interface(Rc<InterfaceDecl>),
    Enum(Rc<EnumDecl>),
    TypeDef(Rc<TypeDefDecl>),
    FuncDef(Rc<FuncDefDecl>),
    /// A type-template parameter of the enclosing class
    TemplateParam,
    Primitive,
}

#[derive(Debug)]
pub struct SymbolType {
    pub name: SmolStr,
    /// `None` for built-in types that have no declaration site
    pub declared_at: Option<TokenRef>,
    pub source: TypeSource,
    pub template_types: Option<Vec<TokenRef>>,
    /// The scope holding the members, for class/interface/enum types
    pub members_scope: RefCell<Option<ScopeRef>>,
    /// Resolved base classes and interfaces, filled by the analyzer
    pub base_types: RefCell<Vec<Rc<SymbolType>>>,
    /// The signature behind a funcdef type
    pub funcdef_signature: RefCell<Option<Rc<SymbolFunction>>>,
    pub is_system_type: bool,
    pub is_number_type: bool,
}

impl SymbolType {
    pub fn is_enum(&self) -> bool {
        matches!(self.source, TypeSource::Enum(_))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.source, TypeSource::Primitive)
    }

    pub fn is_template_param(&self) -> bool {
        matches!(self.source, TypeSource::TemplateParam)
    }

    /// True when `self` is `other` or transitively lists it as a base
    pub fn derives_from(self: &Rc<Self>, other: &Rc<SymbolType>) -> bool {
        if Rc::ptr_eq(self, other) {
            return true;
        }
        self.base_types.borrow().iter().any(|base| base.derives_from(other))
    }
}

#[derive(Debug)]
pub struct SymbolVariable {
    pub name: SmolStr,
    pub declared_at: TokenRef,
    pub declared_scope: WeakScope,
    /// Filled lazily: globals and members are hoisted before their types can
    /// be resolved
    pub ty: RefCell<Option<ResolvedType>>,
    pub is_instance_member: bool,
    pub access: Option<AccessModifier>,
}

/// The declaration behind a [`SymbolFunction`]
#[derive(Debug, Clone)]
pub enum FunctionSource {
    Func(Rc<FuncDecl>),
    IntfMethod(Rc<IntfMethod>),
    FuncDef(Rc<FuncDefDecl>),
    Import(Rc<ImportDecl>),
}

impl FunctionSource {
    pub fn params(&self) -> &[Param] {
        match self {
            FunctionSource::Func(f) => &f.params,
            FunctionSource::IntfMethod(m) => &m.params,
            FunctionSource::FuncDef(f) => &f.params,
            FunctionSource::Import(i) => &i.params,
        }
    }

    /// `None` for constructors and destructors
    pub fn return_type_node(&self) -> Option<&Rc<TypeNode>> {
        match self {
            FunctionSource::Func(f) => f.return_type(),
            FunctionSource::IntfMethod(m) => Some(&m.return_type),
            FunctionSource::FuncDef(f) => Some(&f.return_type),
            FunctionSource::Import(i) => Some(&i.return_type),
        }
    }
}

#[derive(Debug)]
pub struct SymbolFunction {
    pub name: SmolStr,
    pub declared_at: TokenRef,
    pub source: FunctionSource,
    pub declared_scope: WeakScope,
    /// Resolved lazily by the analyzer, before any call is checked
    pub return_type: RefCell<Option<ResolvedType>>,
    pub param_types: RefCell<Vec<Option<ResolvedType>>>,
    pub signature_resolved: Cell<bool>,
    /// Functions with the same name in the same scope chain up
    pub next_overload: RefCell<Option<Rc<SymbolFunction>>>,
}

impl SymbolFunction {
    pub fn new(
        name: SmolStr,
        declared_at: TokenRef,
        source: FunctionSource,
        declared_scope: WeakScope,
    ) -> Rc<Self> {
        Rc::new(Self {
            name,
            declared_at,
            source,
            declared_scope,
            return_type: RefCell::new(None),
            param_types: RefCell::new(Vec::new()),
            signature_resolved: Cell::new(false),
            next_overload: RefCell::new(None),
        })
    }

    /// All overloads in declaration order, starting with `self`
    pub fn overloads(self: &Rc<Self>) -> Vec<Rc<SymbolFunction>> {
        let mut result = vec![self.clone()];
        let mut current = self.clone();
        loop {
            let next = current.next_overload.borrow().clone();
            match next {
                Some(next) => {
                    result.push(next.clone());
                    current = next;
                }
                None => break,
            }
        }
        result
    }

    /// Chain `overload` behind the last overload of `self`
    pub fn append_overload(self: &Rc<Self>, overload: Rc<SymbolFunction>) {
        let mut current = self.clone();
        loop {
            let next = current.next_overload.borrow().clone();
            match next {
                Some(next) => current = next,
                None => break,
            }
        }
        *current.next_overload.borrow_mut() = Some(overload);
    }

    /// Number of parameters that must be passed (those without defaults)
    pub fn min_args(&self) -> usize {
        self.source.params().iter().filter(|p| p.default_value.is_none()).count()
    }

    pub fn max_args(&self) -> usize {
        self.source.params().len()
    }
}

#[derive(Debug, Clone, derive_more::From)]
pub enum Symbol {
    Type(Rc<SymbolType>),
    Variable(Rc<SymbolVariable>),
    Function(Rc<SymbolFunction>),
}

impl Symbol {
    pub fn name(&self) -> &SmolStr {
        match self {
            Symbol::Type(s) => &s.name,
            Symbol::Variable(s) => &s.name,
            Symbol::Function(s) => &s.name,
        }
    }

    pub fn declared_at(&self) -> Option<&TokenRef> {
        match self {
            Symbol::Type(s) => s.declared_at.as_ref(),
            Symbol::Variable(s) => Some(&s.declared_at),
            Symbol::Function(s) => Some(&s.declared_at),
        }
    }
}

/// A use site resolved back to its declaration, for go-to-definition
#[derive(Debug, Clone)]
pub struct Reference {
    pub declaration: TokenRef,
    pub usage: TokenRef,
}

/// The AST node a scope was created for
#[derive(Debug, Clone)]
pub enum LinkedNode {
    Class(Rc<ClassDecl>),
    Interface(Rc<InterfaceDecl>),
    Enum(Rc<EnumDecl>),
    Namespace(Rc<NamespaceDecl>),
    Func(Rc<FuncDecl>),
    VirtualProp(Rc<VirtualPropDecl>),
    Lambda(Rc<LambdaExpr>),
    Block(Rc<StatBlock>),
}

impl LinkedNode {
    /// Function-like scopes are where `return` statements resolve to
    pub fn is_function_like(&self) -> bool {
        matches!(self, LinkedNode::Func(_) | LinkedNode::VirtualProp(_) | LinkedNode::Lambda(_))
    }
}

pub type ScopeRef = Rc<RefCell<SymbolScope>>;
pub type WeakScope = Weak<RefCell<SymbolScope>>;

pub struct SymbolScope {
    pub key: SmolStr,
    parent: Option<WeakScope>,
    children: Vec<ScopeRef>,
    pub symbols: HashMap<SmolStr, Symbol>,
    pub referenced: Vec<Reference>,
    pub completion_hints: Vec<CompletionHint>,
    pub linked_node: Option<LinkedNode>,
    anonymous_count: usize,
}

impl std::fmt::Debug for SymbolScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // symbols can point back at scopes, so only name what is in here
        f.debug_struct("SymbolScope")
            .field("key", &self.key)
            .field("symbols", &self.symbols.keys().collect::<Vec<_>>())
            .field("children", &self.children.iter().map(|c| c.borrow().key.clone()).collect::<Vec<_>>())
            .finish()
    }
}

impl SymbolScope {
    pub fn new_root() -> ScopeRef {
        Rc::new(RefCell::new(SymbolScope {
            key: SmolStr::default(),
            parent: None,
            children: Vec::new(),
            symbols: HashMap::new(),
            referenced: Vec::new(),
            completion_hints: Vec::new(),
            linked_node: None,
            anonymous_count: 0,
        }))
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.parent.as_ref()?.upgrade()
    }

    pub fn is_anonymous(&self) -> bool {
        self.key.starts_with('#')
    }

    /// Shallow symbol lookup
    pub fn find_symbol(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).cloned()
    }

    /// Shallow child scope lookup by key
    pub fn find_child(&self, key: &str) -> Option<ScopeRef> {
        self.children.iter().find(|c| c.borrow().key == key).cloned()
    }

    pub fn children(&self) -> &[ScopeRef] {
        &self.children
    }
}

/// Find the named child or create it
pub fn find_or_create_child(scope: &ScopeRef, key: &str) -> ScopeRef {
    if let Some(existing) = scope.borrow().find_child(key) {
        return existing;
    }
    create_child(scope, key.into())
}

/// Create a child scope with a unique generated key, for blocks and loops
pub fn create_anonymous_child(scope: &ScopeRef, hint: &str) -> ScopeRef {
    let key = {
        let mut parent = scope.borrow_mut();
        parent.anonymous_count += 1;
        SmolStr::from(format!("#{hint}:{}", parent.anonymous_count))
    };
    create_child(scope, key)
}

fn create_child(scope: &ScopeRef, key: SmolStr) -> ScopeRef {
    let child = Rc::new(RefCell::new(SymbolScope {
        key,
        parent: Some(Rc::downgrade(scope)),
        children: Vec::new(),
        symbols: HashMap::new(),
        referenced: Vec::new(),
        completion_hints: Vec::new(),
        linked_node: None,
        anonymous_count: 0,
    }));
    scope.borrow_mut().children.push(child.clone());
    child
}

/// Insert a symbol, reporting the already present one on a name collision.
/// Function/function collisions are not handled here: the hoist pass chains
/// them as overloads instead.
pub fn insert_symbol(scope: &ScopeRef, symbol: Symbol) -> Result<(), Symbol> {
    let name = symbol.name().clone();
    let mut scope = scope.borrow_mut();
    match scope.symbols.get(&name) {
        Some(existing) => Err(existing.clone()),
        None => {
            scope.symbols.insert(name, symbol);
            Ok(())
        }
    }
}

/// Shallow lookup at `scope`, then walking parent scopes
pub fn find_symbol_walking_parents(scope: &ScopeRef, name: &str) -> Option<(Symbol, ScopeRef)> {
    let mut current = scope.clone();
    loop {
        let found = current.borrow().find_symbol(name);
        if let Some(symbol) = found {
            return Some((symbol, current));
        }
        let parent = current.borrow().parent();
        match parent {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// The closest enclosing scope created for a function, virtual property
/// accessor or lambda
pub fn find_function_like_ancestor(scope: &ScopeRef) -> Option<ScopeRef> {
    let mut current = scope.clone();
    loop {
        if current.borrow().linked_node.as_ref().is_some_and(|n| n.is_function_like()) {
            return Some(current);
        }
        let parent = current.borrow().parent();
        match parent {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// True when `scope` is `ancestor` or nested somewhere below it
pub fn scope_is_inside(scope: &ScopeRef, ancestor: &ScopeRef) -> bool {
    let mut current = scope.clone();
    loop {
        if Rc::ptr_eq(&current, ancestor) {
            return true;
        }
        let parent = current.borrow().parent();
        match parent {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

pub fn push_reference(scope: &ScopeRef, declaration: TokenRef, usage: TokenRef) {
    scope.borrow_mut().referenced.push(Reference { declaration, usage });
}

pub fn push_completion_hint(scope: &ScopeRef, hint: CompletionHint) {
    scope.borrow_mut().completion_hints.push(hint);
}

/// A type or function symbol with its instantiation context.
/// Immutable once created.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub symbol: TypeOrFunction,
    /// `@` handle types
    pub is_handler: bool,
    pub template_translate: Option<Rc<TemplateTranslation>>,
}

#[derive(Debug, Clone)]
pub enum TypeOrFunction {
    Type(Rc<SymbolType>),
    Function(Rc<SymbolFunction>),
}

/// Binding of a generic type's parameter tokens to the concrete types of an
/// instantiation site. Keyed by token identity.
#[derive(Debug, Default, derive_more::Deref)]
pub struct TemplateTranslation(pub HashMap<ByAddress<TokenRef>, Option<ResolvedType>>);

impl ResolvedType {
    pub fn from_type(symbol: Rc<SymbolType>) -> Self {
        Self { symbol: TypeOrFunction::Type(symbol), is_handler: false, template_translate: None }
    }

    pub fn from_function(symbol: Rc<SymbolFunction>) -> Self {
        Self {
            symbol: TypeOrFunction::Function(symbol),
            is_handler: false,
            template_translate: None,
        }
    }

    pub fn with_handler(mut self, is_handler: bool) -> Self {
        self.is_handler = is_handler;
        self
    }

    pub fn as_type(&self) -> Option<&Rc<SymbolType>> {
        match &self.symbol {
            TypeOrFunction::Type(t) => Some(t),
            TypeOrFunction::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<SymbolFunction>> {
        match &self.symbol {
            TypeOrFunction::Type(_) => None,
            TypeOrFunction::Function(f) => Some(f),
        }
    }

    pub fn name(&self) -> &SmolStr {
        match &self.symbol {
            TypeOrFunction::Type(t) => &t.name,
            TypeOrFunction::Function(f) => &f.name,
        }
    }

    pub fn is_number_type(&self) -> bool {
        self.as_type().is_some_and(|t| t.is_number_type)
    }

    pub fn is_primitive_named(&self, name: &str) -> bool {
        self.as_type().is_some_and(|t| t.is_primitive() && t.name == name)
    }
}

/// Substitute a template parameter through the instantiation's translation
/// map. Types that are not template parameters pass through unchanged.
pub fn apply_template_translate(
    ty: Option<&ResolvedType>,
    translate: Option<&Rc<TemplateTranslation>>,
) -> Option<ResolvedType> {
    let ty = ty?;
    let translate = match translate {
        Some(translate) => translate,
        None => return Some(ty.clone()),
    };
    if let TypeOrFunction::Type(symbol) = &ty.symbol {
        if symbol.is_template_param() {
            if let Some(token) = &symbol.declared_at {
                if let Some(substituted) = translate.get(&ByAddress(token.clone())) {
                    return substituted.clone();
                }
            }
        }
    }
    Some(ty.clone())
}

/// The implicit conversion test used by initializers, argument passing and
/// the binary operator rules
pub fn can_type_convert(src: &ResolvedType, dst: &ResolvedType) -> bool {
    match (&src.symbol, &dst.symbol) {
        (TypeOrFunction::Type(a), TypeOrFunction::Type(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            // unbound template parameters accept anything, best effort
            if a.is_template_param() || b.is_template_param() {
                return true;
            }
            if b.is_primitive() && b.name == "?" {
                return true;
            }
            if a.is_number_type && b.is_number_type {
                return true;
            }
            // enum values convert to integers, not the other way around
            if a.is_enum() && b.is_number_type {
                return true;
            }
            if matches!(b.source, TypeSource::FuncDef(_)) {
                return matches!(a.source, TypeSource::FuncDef(_)) && a.name == b.name;
            }
            a.derives_from(b)
        }
        (TypeOrFunction::Function(a), TypeOrFunction::Type(b)) => {
            // a function reference taken as a handler of a matching funcdef
            match &*b.funcdef_signature.borrow() {
                Some(signature) => signatures_compatible(a, signature),
                None => false,
            }
        }
        (TypeOrFunction::Function(a), TypeOrFunction::Function(b)) => {
            Rc::ptr_eq(a, b) || signatures_compatible(a, b)
        }
        (TypeOrFunction::Type(_), TypeOrFunction::Function(_)) => false,
    }
}

fn signatures_compatible(a: &Rc<SymbolFunction>, b: &Rc<SymbolFunction>) -> bool {
    a.source.params().len() == b.source.params().len()
}

/// The numeric type a math operator between two numeric primitives yields
pub fn common_number_type(lhs: &ResolvedType, rhs: &ResolvedType) -> ResolvedType {
    for name in ["double", "float"] {
        if lhs.is_primitive_named(name) {
            return lhs.clone();
        }
        if rhs.is_primitive_named(name) {
            return rhs.clone();
        }
    }
    lhs.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primitive(name: &str, is_number: bool) -> Rc<SymbolType> {
        Rc::new(SymbolType {
            name: name.into(),
            declared_at: None,
            source: TypeSource::Primitive,
            template_types: None,
            members_scope: RefCell::new(None),
            base_types: RefCell::new(Vec::new()),
            funcdef_signature: RefCell::new(None),
            is_system_type: true,
            is_number_type: is_number,
        })
    }

    #[test]
    fn numbers_convert_to_each_other_but_not_to_bool() {
        let int_ = ResolvedType::from_type(primitive("int", true));
        let double_ = ResolvedType::from_type(primitive("double", true));
        let bool_ = ResolvedType::from_type(primitive("bool", false));
        assert!(can_type_convert(&int_, &double_));
        assert!(can_type_convert(&double_, &int_));
        assert!(!can_type_convert(&int_, &bool_));
        assert!(!can_type_convert(&bool_, &int_));
    }

    #[test]
    fn common_number_type_prefers_wider() {
        let int_ = ResolvedType::from_type(primitive("int", true));
        let double_ = ResolvedType::from_type(primitive("double", true));
        assert_eq!(common_number_type(&int_, &double_).name(), "double");
        assert_eq!(common_number_type(&double_, &int_).name(), "double");
        assert_eq!(common_number_type(&int_, &int_).name(), "int");
    }

    #[test]
    fn scope_tree_navigation() {
        let root = SymbolScope::new_root();
        let ns = find_or_create_child(&root, "ns");
        assert!(Rc::ptr_eq(&find_or_create_child(&root, "ns"), &ns));
        let block = create_anonymous_child(&ns, "block");
        assert!(block.borrow().is_anonymous());
        assert!(scope_is_inside(&block, &root));
        assert!(!scope_is_inside(&root, &block));
        assert!(Rc::ptr_eq(&block.borrow().parent().unwrap(), &ns));
    }

    #[test]
    fn overload_chain_order() {
        let root = SymbolScope::new_root();
        let token = Rc::new(crate::parser::Token::default());
        let params = Vec::new();
        let decl = Rc::new(crate::ast::FuncDefDecl {
            range: crate::ast::NodeRange::single(token.clone()),
            entity: Default::default(),
            return_type: Rc::new(crate::ast::TypeNode {
                range: crate::ast::NodeRange::single(token.clone()),
                is_const: false,
                scope: None,
                data: crate::ast::DataType::Primitive(token.clone()),
                template_args: Vec::new(),
                is_array: false,
                ref_modifier: None,
            }),
            is_ref: false,
            identifier: token.clone(),
            params,
        });
        let make = || {
            SymbolFunction::new(
                "f".into(),
                token.clone(),
                FunctionSource::FuncDef(decl.clone()),
                Rc::downgrade(&root),
            )
        };
        let first = make();
        let second = make();
        let third = make();
        first.append_overload(second.clone());
        first.append_overload(third.clone());
        let chain = first.overloads();
        assert_eq!(chain.len(), 3);
        assert!(Rc::ptr_eq(&chain[1], &second));
        assert!(Rc::ptr_eq(&chain[2], &third));
    }
}
