// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The abstract syntax tree produced by the parser

One struct or enum per grammar production. Every node carries a [`NodeRange`]
pair of tokens delimiting its source span. Declarations that the symbol graph
links back to are shared behind `Rc`; expression interiors are plain owned
values.
*/

use crate::diagnostics::{SourceFile, Span, Spanned};
use crate::parser::TokenRef;
use std::rc::Rc;

/// The source span of a node, as its first and last token
#[derive(Debug, Clone)]
pub struct NodeRange {
    pub start: TokenRef,
    pub end: TokenRef,
}

impl NodeRange {
    pub fn new(start: TokenRef, end: TokenRef) -> Self {
        debug_assert!(start.index <= end.index, "node range must be ordered");
        Self { start, end }
    }

    /// A range covering a single token
    pub fn single(token: TokenRef) -> Self {
        Self { start: token.clone(), end: token }
    }

    /// The smallest range covering both `self` and `other`
    pub fn cover(&self, other: &NodeRange) -> NodeRange {
        let start =
            if self.start.index <= other.start.index { &self.start } else { &other.start };
        let end = if self.end.index >= other.end.index { &self.end } else { &other.end };
        NodeRange { start: start.clone(), end: end.clone() }
    }
}

impl Spanned for NodeRange {
    fn span(&self) -> Span {
        self.start.span.cover(&self.end.span)
    }

    fn source_file(&self) -> Option<&SourceFile> {
        Some(&self.start.source_file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessModifier {
    Private,
    Protected,
}

/// `shared`, `abstract`, `final` and `external` markers in front of a declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityAttributes {
    pub is_shared: bool,
    pub is_external: bool,
    pub is_abstract: bool,
    pub is_final: bool,
}

impl EntityAttributes {
    pub fn any(&self) -> bool {
        self.is_shared || self.is_external || self.is_abstract || self.is_final
    }
}

/// The tokens inside one `[...]` metadata block
pub type Metadata = Vec<TokenRef>;

/// A whole file, or the inside of a namespace
#[derive(Debug)]
pub struct Script {
    pub range: NodeRange,
    pub items: Vec<ScriptItem>,
}

#[derive(Debug, Clone)]
pub enum ScriptItem {
    Import(Rc<ImportDecl>),
    Enum(Rc<EnumDecl>),
    TypeDef(Rc<TypeDefDecl>),
    Class(Rc<ClassDecl>),
    Mixin(Rc<MixinDecl>),
    Interface(Rc<InterfaceDecl>),
    FuncDef(Rc<FuncDefDecl>),
    VirtualProp(Rc<VirtualPropDecl>),
    Var(Rc<VarDecl>),
    Func(Rc<FuncDecl>),
    Namespace(Rc<NamespaceDecl>),
}

impl ScriptItem {
    pub fn range(&self) -> &NodeRange {
        match self {
            ScriptItem::Import(n) => &n.range,
            ScriptItem::Enum(n) => &n.range,
            ScriptItem::TypeDef(n) => &n.range,
            ScriptItem::Class(n) => &n.range,
            ScriptItem::Mixin(n) => &n.range,
            ScriptItem::Interface(n) => &n.range,
            ScriptItem::FuncDef(n) => &n.range,
            ScriptItem::VirtualProp(n) => &n.range,
            ScriptItem::Var(n) => &n.range,
            ScriptItem::Func(n) => &n.range,
            ScriptItem::Namespace(n) => &n.range,
        }
    }
}

/// `namespace A::B { ... }`
#[derive(Debug)]
pub struct NamespaceDecl {
    pub range: NodeRange,
    pub names: Vec<TokenRef>,
    pub script: Script,
}

/// `class Foo : Base { ... }`
#[derive(Debug)]
pub struct ClassDecl {
    pub range: NodeRange,
    /// The span of the `{ ... }` body, distinct from the node range
    pub scope_range: NodeRange,
    pub metadata: Vec<Metadata>,
    pub entity: EntityAttributes,
    pub identifier: TokenRef,
    pub template_types: Option<Vec<TokenRef>>,
    pub bases: Vec<TokenRef>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    VirtualProp(Rc<VirtualPropDecl>),
    Var(Rc<VarDecl>),
    Func(Rc<FuncDecl>),
    FuncDef(Rc<FuncDefDecl>),
}

/// `mixin class Foo { ... }`
#[derive(Debug)]
pub struct MixinDecl {
    pub range: NodeRange,
    pub class: Rc<ClassDecl>,
}

/// `enum Color { red, green = 5 }`
#[derive(Debug)]
pub struct EnumDecl {
    pub range: NodeRange,
    pub scope_range: NodeRange,
    pub entity: EntityAttributes,
    pub identifier: TokenRef,
    pub members: Vec<EnumMember>,
}

#[derive(Debug)]
pub struct EnumMember {
    pub identifier: TokenRef,
    pub value: Option<Expr>,
}

/// `interface Foo { ... }`
#[derive(Debug)]
pub struct InterfaceDecl {
    pub range: NodeRange,
    pub entity: EntityAttributes,
    pub identifier: TokenRef,
    pub bases: Vec<TokenRef>,
    pub members: Vec<InterfaceMember>,
}

#[derive(Debug, Clone)]
pub enum InterfaceMember {
    VirtualProp(Rc<VirtualPropDecl>),
    Method(Rc<IntfMethod>),
}

/// A method declaration inside an interface, always ending in `;`
#[derive(Debug)]
pub struct IntfMethod {
    pub range: NodeRange,
    pub return_type: Rc<TypeNode>,
    pub is_ref: bool,
    pub identifier: TokenRef,
    pub params: Vec<Param>,
    pub is_const: bool,
}

/// `typedef double real;`
#[derive(Debug)]
pub struct TypeDefDecl {
    pub range: NodeRange,
    pub prime_type: TokenRef,
    pub identifier: TokenRef,
}

/// `funcdef bool Callback(int, int);`
#[derive(Debug)]
pub struct FuncDefDecl {
    pub range: NodeRange,
    pub entity: EntityAttributes,
    pub return_type: Rc<TypeNode>,
    pub is_ref: bool,
    pub identifier: TokenRef,
    pub params: Vec<Param>,
}

/// `import void f(int) from "other";`
#[derive(Debug)]
pub struct ImportDecl {
    pub range: NodeRange,
    pub return_type: Rc<TypeNode>,
    pub is_ref: bool,
    pub identifier: TokenRef,
    pub params: Vec<Param>,
    pub attrs: FuncAttrs,
    pub from_path: TokenRef,
}

#[derive(Debug, Clone)]
pub enum FuncHead {
    Constructor,
    Destructor,
    Returns { return_type: Rc<TypeNode>, is_ref: bool },
}

/// `override`, `final`, `explicit` and `property` after the parameter list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuncAttrs {
    pub is_override: bool,
    pub is_final: bool,
    pub is_explicit: bool,
    pub is_property: bool,
}

/// A function, method, constructor or destructor declaration
#[derive(Debug)]
pub struct FuncDecl {
    pub range: NodeRange,
    pub metadata: Vec<Metadata>,
    pub entity: EntityAttributes,
    pub access: Option<AccessModifier>,
    pub head: FuncHead,
    pub identifier: TokenRef,
    pub template_types: Option<Vec<TokenRef>>,
    pub params: Vec<Param>,
    pub is_const: bool,
    pub attrs: FuncAttrs,
    /// Always present; empty when the declaration ended in `;`
    pub body: Rc<StatBlock>,
}

impl FuncDecl {
    pub fn return_type(&self) -> Option<&Rc<TypeNode>> {
        match &self.head {
            FuncHead::Returns { return_type, .. } => Some(return_type),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Param {
    pub ty: Rc<TypeNode>,
    pub is_ref: bool,
    pub identifier: Option<TokenRef>,
    pub default_value: Option<Rc<Assign>>,
}

/// `int prop { get; set; }`
#[derive(Debug)]
pub struct VirtualPropDecl {
    pub range: NodeRange,
    pub metadata: Vec<Metadata>,
    pub access: Option<AccessModifier>,
    pub ty: Rc<TypeNode>,
    pub is_ref: bool,
    pub identifier: TokenRef,
    pub accessors: Vec<PropAccessor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropAccessorKind {
    Getter,
    Setter,
}

#[derive(Debug)]
pub struct PropAccessor {
    pub kind: PropAccessorKind,
    pub keyword: TokenRef,
    pub is_const: bool,
    pub attrs: FuncAttrs,
    pub body: Option<Rc<StatBlock>>,
}

/// One `TYPE id = init, id2, ...;` declaration with all its declarators
#[derive(Debug)]
pub struct VarDecl {
    pub range: NodeRange,
    pub metadata: Vec<Metadata>,
    pub access: Option<AccessModifier>,
    pub ty: Rc<TypeNode>,
    pub declarators: Vec<VarDeclarator>,
}

#[derive(Debug)]
pub struct VarDeclarator {
    pub identifier: TokenRef,
    pub init: Option<VarInit>,
}

#[derive(Debug)]
pub enum VarInit {
    InitList(InitList),
    Assign(Rc<Assign>),
    ArgList(ArgList),
}

/// `const Scope::DataType<T>[]@` — a type reference
#[derive(Debug)]
pub struct TypeNode {
    pub range: NodeRange,
    pub is_const: bool,
    pub scope: Option<Rc<ScopeNode>>,
    pub data: DataType,
    pub template_args: Vec<Rc<TypeNode>>,
    pub is_array: bool,
    pub ref_modifier: Option<RefModifier>,
}

#[derive(Debug, Clone)]
pub enum DataType {
    Identifier(TokenRef),
    /// One of the built-in value types (`int`, `double`, `bool`, ...)
    Primitive(TokenRef),
    /// The `?` type of variadic system functions
    Any(TokenRef),
    Auto(TokenRef),
}

impl DataType {
    pub fn token(&self) -> &TokenRef {
        match self {
            DataType::Identifier(t) | DataType::Primitive(t) | DataType::Any(t)
            | DataType::Auto(t) => t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefModifier {
    /// `@`
    Handle,
    /// `@const`
    HandleConst,
}

/// `::A::B::` prefix in front of an identifier or type
#[derive(Debug)]
pub struct ScopeNode {
    pub range: NodeRange,
    pub is_global: bool,
    pub scope_list: Vec<TokenRef>,
    /// Template arguments attached to the last scope segment
    pub template_args: Vec<Rc<TypeNode>>,
}

// --- Statements ---

#[derive(Debug)]
pub struct StatBlock {
    pub range: NodeRange,
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub enum Statement {
    Block(Rc<StatBlock>),
    If(Box<IfStat>),
    For(Box<ForStat>),
    While(Box<WhileStat>),
    DoWhile(Box<DoWhileStat>),
    Switch(Box<SwitchStat>),
    Try(Box<TryStat>),
    Return(ReturnStat),
    Break(JumpStat),
    Continue(JumpStat),
    Expr(ExprStat),
    Var(Rc<VarDecl>),
}

impl Statement {
    pub fn range(&self) -> &NodeRange {
        match self {
            Statement::Block(n) => &n.range,
            Statement::If(n) => &n.range,
            Statement::For(n) => &n.range,
            Statement::While(n) => &n.range,
            Statement::DoWhile(n) => &n.range,
            Statement::Switch(n) => &n.range,
            Statement::Try(n) => &n.range,
            Statement::Return(n) => &n.range,
            Statement::Break(n) | Statement::Continue(n) => &n.range,
            Statement::Expr(n) => &n.range,
            Statement::Var(n) => &n.range,
        }
    }
}

#[derive(Debug)]
pub struct IfStat {
    pub range: NodeRange,
    pub condition: Rc<Assign>,
    pub then_branch: Option<Statement>,
    pub else_branch: Option<Statement>,
}

#[derive(Debug)]
pub struct ForStat {
    pub range: NodeRange,
    pub initial: Option<Statement>,
    pub condition: Option<ExprStat>,
    pub increments: Vec<Rc<Assign>>,
    pub body: Option<Statement>,
}

#[derive(Debug)]
pub struct WhileStat {
    pub range: NodeRange,
    pub condition: Rc<Assign>,
    pub body: Option<Statement>,
}

#[derive(Debug)]
pub struct DoWhileStat {
    pub range: NodeRange,
    pub body: Statement,
    pub condition: Rc<Assign>,
}

#[derive(Debug)]
pub struct SwitchStat {
    pub range: NodeRange,
    pub condition: Rc<Assign>,
    pub cases: Vec<CaseStat>,
}

/// `case expr:` or `default:` with the statements that follow it
#[derive(Debug)]
pub struct CaseStat {
    pub range: NodeRange,
    pub expr: Option<Expr>,
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub struct TryStat {
    pub range: NodeRange,
    pub try_block: Rc<StatBlock>,
    pub catch_block: Rc<StatBlock>,
}

#[derive(Debug)]
pub struct ReturnStat {
    pub range: NodeRange,
    pub assign: Option<Rc<Assign>>,
}

#[derive(Debug)]
pub struct JumpStat {
    pub range: NodeRange,
}

/// `[ASSIGN] ';'`
#[derive(Debug)]
pub struct ExprStat {
    pub range: NodeRange,
    pub assign: Option<Rc<Assign>>,
}

// --- Expressions ---

/// A flat chain of terms separated by binary operators.
///
/// Operator precedence is not encoded here; the analyzer reshapes the chain
/// with a shunting-yard pass.
#[derive(Debug)]
pub struct Expr {
    pub range: NodeRange,
    pub head: ExprTerm,
    pub tail: Option<ExprTail>,
}

#[derive(Debug)]
pub struct ExprTail {
    pub op: TokenRef,
    pub expr: Box<Expr>,
}

#[derive(Debug)]
pub enum ExprTerm {
    /// `[TYPE '='] INITLIST`
    InitList { range: NodeRange, ty: Option<Rc<TypeNode>>, list: InitList },
    /// `{preOp} ExprValue {postOp}`
    Value { range: NodeRange, pre_ops: Vec<TokenRef>, value: ExprValue, post_ops: Vec<ExprPostOp> },
}

impl ExprTerm {
    pub fn range(&self) -> &NodeRange {
        match self {
            ExprTerm::InitList { range, .. } | ExprTerm::Value { range, .. } => range,
        }
    }
}

#[derive(Debug)]
pub enum ExprValue {
    /// The `void` placeholder argument
    Void(TokenRef),
    ConstructCall(ConstructCall),
    FuncCall(FuncCall),
    VarAccess(VarAccess),
    Cast(CastExpr),
    Literal(Literal),
    /// A parenthesized assignment expression
    Assign(Rc<Assign>),
    Lambda(Rc<LambdaExpr>),
}

#[derive(Debug)]
pub enum ExprPostOp {
    /// `.member`
    Member { range: NodeRange, identifier: TokenRef },
    /// `.method(args)`
    MethodCall { range: NodeRange, identifier: TokenRef, args: ArgList },
    /// `[index]`
    Index { range: NodeRange, args: ArgList },
    /// `(args)` — calling the value itself
    Call { range: NodeRange, args: ArgList },
    /// `++` or `--`
    IncDec { op: TokenRef },
}

#[derive(Debug)]
pub struct Literal {
    pub token: TokenRef,
}

#[derive(Debug)]
pub struct FuncCall {
    pub range: NodeRange,
    pub scope: Option<Rc<ScopeNode>>,
    pub identifier: TokenRef,
    pub args: ArgList,
}

#[derive(Debug)]
pub struct VarAccess {
    pub range: NodeRange,
    pub scope: Option<Rc<ScopeNode>>,
    pub identifier: Option<TokenRef>,
}

#[derive(Debug)]
pub struct ConstructCall {
    pub range: NodeRange,
    pub ty: Rc<TypeNode>,
    pub args: ArgList,
}

/// `cast<TYPE>(expr)`
#[derive(Debug)]
pub struct CastExpr {
    pub range: NodeRange,
    pub ty: Rc<TypeNode>,
    pub assign: Rc<Assign>,
}

/// `function(int a, b) { ... }`
#[derive(Debug)]
pub struct LambdaExpr {
    pub range: NodeRange,
    pub params: Vec<LambdaParam>,
    pub body: Rc<StatBlock>,
}

#[derive(Debug)]
pub struct LambdaParam {
    pub ty: Option<Rc<TypeNode>>,
    pub is_ref: bool,
    pub identifier: Option<TokenRef>,
}

/// `{ expr, { nested }, ... }`
#[derive(Debug)]
pub struct InitList {
    pub range: NodeRange,
    pub items: Vec<InitItem>,
}

#[derive(Debug)]
pub enum InitItem {
    Assign(Rc<Assign>),
    List(InitList),
}

/// `(name: expr, ...)` — a parenthesized or bracketed argument list
#[derive(Debug)]
pub struct ArgList {
    pub range: NodeRange,
    pub args: Vec<Arg>,
}

#[derive(Debug)]
pub struct Arg {
    pub name: Option<TokenRef>,
    pub value: Rc<Assign>,
}

/// `CONDITION [op ASSIGN]` — right associative
#[derive(Debug)]
pub struct Assign {
    pub range: NodeRange,
    pub condition: Condition,
    pub tail: Option<AssignTail>,
}

#[derive(Debug)]
pub struct AssignTail {
    pub op: TokenRef,
    pub assign: Rc<Assign>,
}

/// `EXPR ['?' ASSIGN ':' ASSIGN]`
#[derive(Debug)]
pub struct Condition {
    pub range: NodeRange,
    pub expr: Expr,
    pub ternary: Option<Ternary>,
}

/// Only present when both branches parsed successfully
#[derive(Debug)]
pub struct Ternary {
    pub true_assign: Rc<Assign>,
    pub false_assign: Rc<Assign>,
}
