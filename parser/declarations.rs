// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Parsing functions for top-level and class-level declarations

use super::expressions::{parse_arg_list, parse_assign, parse_expr, parse_init_list, parse_type_modifier};
use super::prelude::*;
use super::statements::parse_statblock;
use super::types::{parse_type, parse_type_templates};
use super::{CacheKind, CachedValue, TokenKind};
use std::rc::Rc;

#[cfg_attr(test, parser_test)]
/// ```test
/// class Foo { }
/// class Foo : Bar, Baz { int x; void f() { } }
/// shared abstract class C { private int x = 3; }
/// final class D;
/// enum E { A, B = 2, C, }
/// shared enum F { }
/// interface I { void f(int); int prop { get; set; } }
/// funcdef bool Callback(int, int);
/// typedef double real;
/// namespace A::B { int x; }
/// import void f(int) from "other";
/// mixin class M { void helper() { } }
/// [metadata] class WithMeta { }
/// int g_counter = 0;
/// A a(42);
/// void main() { }
/// int add(int a, int b = 1) { return a + b; }
/// int value { get const; set; }
/// ;
/// ```
pub fn parse_script(p: &mut ParserState) -> Script {
    parse_script_impl(p, false)
}

fn parse_script_impl(p: &mut ParserState, nested: bool) -> Script {
    let start = p.next(0);
    let mut items = Vec::new();
    loop {
        if p.is_end() {
            break;
        }
        let next = p.next(0);
        if next.is_reserved(";") {
            p.commit(HighlightKind::Operator);
            continue;
        }
        if next.is_reserved("}") {
            if nested {
                break;
            }
            p.error("Unexpected '}'");
            p.step();
            continue;
        }
        match parse_script_item(p) {
            Ok(item) => items.push(item),
            Err(ParseFailure::Pending) => {}
            Err(ParseFailure::Mismatch) => {
                p.error("Expected a declaration");
                p.step();
            }
        }
    }
    Script { range: p.range_from(&start), items }
}

fn parse_script_item(p: &mut ParserState) -> ParseResult<ScriptItem> {
    let next = p.next(0);
    if next.is_reserved("import") {
        return parse_import(p).map(ScriptItem::Import);
    }
    if next.is_reserved("typedef") {
        return parse_typedef(p).map(ScriptItem::TypeDef);
    }
    if next.is_reserved("namespace") {
        return parse_namespace(p).map(ScriptItem::Namespace);
    }
    if next.is_reserved("mixin") {
        return parse_mixin(p).map(ScriptItem::Mixin);
    }
    match parse_enum(p) {
        Err(ParseFailure::Mismatch) => {}
        result => return result.map(ScriptItem::Enum),
    }
    match parse_interface(p) {
        Err(ParseFailure::Mismatch) => {}
        result => return result.map(ScriptItem::Interface),
    }
    match parse_class(p) {
        Err(ParseFailure::Mismatch) => {}
        result => return result.map(ScriptItem::Class),
    }
    match parse_funcdef(p) {
        Err(ParseFailure::Mismatch) => {}
        result => return result.map(ScriptItem::FuncDef),
    }
    match parse_func(p) {
        Err(ParseFailure::Mismatch) => {}
        result => return result.map(ScriptItem::Func),
    }
    match parse_virtual_prop(p) {
        Err(ParseFailure::Mismatch) => {}
        result => return result.map(ScriptItem::VirtualProp),
    }
    parse_var(p).map(ScriptItem::Var)
}

/// `{'shared'|'abstract'|'final'|'external'}`, memoized because every
/// class/enum/interface/funcdef attempt at the same position re-parses it
pub(super) fn parse_entity_attributes(p: &mut ParserState) -> EntityAttributes {
    if let Some(CachedValue::EntityAttributes(Some(attrs))) =
        p.cache_restore(CacheKind::EntityAttributes)
    {
        return attrs;
    }
    let cache_start = p.position();
    let mut attrs = EntityAttributes::default();
    loop {
        let next = p.next(0);
        if next.kind() != TokenKind::Reserved {
            break;
        }
        match next.as_str() {
            "shared" => attrs.is_shared = true,
            "abstract" => attrs.is_abstract = true,
            "final" => attrs.is_final = true,
            "external" => attrs.is_external = true,
            _ => break,
        }
        p.commit(HighlightKind::Keyword);
    }
    p.cache_store(CacheKind::EntityAttributes, cache_start, CachedValue::EntityAttributes(Some(attrs)));
    attrs
}

/// Bracket-balanced `[...]` blocks in front of a declaration. The tokens
/// are preserved verbatim and classified as decorators. An unterminated
/// block backtracks cleanly.
fn parse_metadata(p: &mut ParserState) -> Vec<Metadata> {
    let mut blocks = Vec::new();
    while p.next(0).is_reserved("[") {
        let snapshot = p.next(0);
        let mut depth = 0usize;
        let mut tokens = Vec::new();
        loop {
            let t = p.next(0);
            if t.kind() == TokenKind::Eof {
                p.backtrack(&snapshot);
                return blocks;
            }
            if t.is_reserved("[") {
                depth += 1;
            } else if t.is_reserved("]") {
                depth -= 1;
            }
            p.commit(HighlightKind::Decorator);
            tokens.push(t);
            if depth == 0 {
                break;
            }
        }
        blocks.push(tokens);
    }
    blocks
}

fn parse_access(p: &mut ParserState) -> Option<AccessModifier> {
    let next = p.next(0);
    if next.is_reserved("private") {
        p.commit(HighlightKind::Keyword);
        Some(AccessModifier::Private)
    } else if next.is_reserved("protected") {
        p.commit(HighlightKind::Keyword);
        Some(AccessModifier::Protected)
    } else {
        None
    }
}

fn parse_func_attrs(p: &mut ParserState) -> FuncAttrs {
    let mut attrs = FuncAttrs::default();
    loop {
        let next = p.next(0);
        if next.kind() != TokenKind::Reserved {
            break;
        }
        match next.as_str() {
            "override" => attrs.is_override = true,
            "final" => attrs.is_final = true,
            "explicit" => attrs.is_explicit = true,
            "property" => attrs.is_property = true,
            _ => break,
        }
        p.commit(HighlightKind::Keyword);
    }
    attrs
}

fn template_idents(args: Vec<Rc<TypeNode>>) -> Vec<TokenRef> {
    args.iter()
        .filter_map(|t| match &t.data {
            DataType::Identifier(tok) => Some(tok.clone()),
            _ => None,
        })
        .collect()
}

pub fn parse_class(p: &mut ParserState) -> ParseResult<Rc<ClassDecl>> {
    let start = p.next(0);
    let metadata = parse_metadata(p);
    let entity = parse_entity_attributes(p);
    if !p.next(0).is_reserved("class") {
        p.backtrack(&start);
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Keyword);

    let identifier = p.next(0);
    if !identifier.is_identifier() {
        p.error("Expected class name");
        return Err(ParseFailure::Pending);
    }
    p.commit(HighlightKind::Class);

    let template_types = parse_type_templates(p).map(template_idents);

    if p.next(0).is_reserved(";") {
        p.commit(HighlightKind::Operator);
        let semicolon = p.prev();
        return Ok(Rc::new(ClassDecl {
            range: p.range_from(&start),
            scope_range: NodeRange::single(semicolon),
            metadata,
            entity,
            identifier,
            template_types,
            bases: Vec::new(),
            members: Vec::new(),
        }));
    }

    let mut bases = Vec::new();
    if p.next(0).is_reserved(":") {
        p.commit(HighlightKind::Operator);
        loop {
            let base = p.next(0);
            if !base.is_identifier() {
                p.error("Expected base type");
                break;
            }
            p.commit(HighlightKind::Type);
            bases.push(base);
            if p.next(0).is_reserved(",") {
                p.commit(HighlightKind::Operator);
                continue;
            }
            break;
        }
    }

    let lbrace = p.next(0);
    if !p.expect("{", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let members = parse_class_members(p);
    let scope_range = NodeRange::new(lbrace, p.prev());
    Ok(Rc::new(ClassDecl {
        range: p.range_from(&start),
        scope_range,
        metadata,
        entity,
        identifier,
        template_types,
        bases,
        members,
    }))
}

/// The VIRTPROP/VAR/FUNC disambiguation is done by trying each parser in a
/// fixed order and accepting the first non-mismatch
fn parse_class_members(p: &mut ParserState) -> Vec<ClassMember> {
    let mut members = Vec::new();
    loop {
        let next = p.next(0);
        if next.is_reserved("}") {
            p.commit(HighlightKind::Operator);
            break;
        }
        if next.kind() == TokenKind::Eof {
            p.error("Expected '}'");
            break;
        }
        if next.is_reserved(";") {
            p.commit(HighlightKind::Operator);
            continue;
        }
        match parse_funcdef(p) {
            Ok(n) => {
                members.push(ClassMember::FuncDef(n));
                continue;
            }
            Err(ParseFailure::Pending) => continue,
            Err(ParseFailure::Mismatch) => {}
        }
        match parse_func(p) {
            Ok(n) => {
                members.push(ClassMember::Func(n));
                continue;
            }
            Err(ParseFailure::Pending) => continue,
            Err(ParseFailure::Mismatch) => {}
        }
        match parse_virtual_prop(p) {
            Ok(n) => {
                members.push(ClassMember::VirtualProp(n));
                continue;
            }
            Err(ParseFailure::Pending) => continue,
            Err(ParseFailure::Mismatch) => {}
        }
        match parse_var(p) {
            Ok(n) => {
                members.push(ClassMember::Var(n));
                continue;
            }
            Err(ParseFailure::Pending) => continue,
            Err(ParseFailure::Mismatch) => {}
        }
        p.error("Expected a class member");
        p.step();
    }
    members
}

pub fn parse_mixin(p: &mut ParserState) -> ParseResult<Rc<MixinDecl>> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword); // 'mixin'
    match parse_class(p) {
        Ok(class) => Ok(Rc::new(MixinDecl { range: p.range_from(&start), class })),
        Err(_) => {
            p.error("Expected class after 'mixin'");
            Err(ParseFailure::Pending)
        }
    }
}

pub fn parse_interface(p: &mut ParserState) -> ParseResult<Rc<InterfaceDecl>> {
    let start = p.next(0);
    let entity = parse_entity_attributes(p);
    if !p.next(0).is_reserved("interface") {
        p.backtrack(&start);
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Keyword);

    let identifier = p.next(0);
    if !identifier.is_identifier() {
        p.error("Expected interface name");
        return Err(ParseFailure::Pending);
    }
    p.commit(HighlightKind::Interface);

    if p.next(0).is_reserved(";") {
        p.commit(HighlightKind::Operator);
        return Ok(Rc::new(InterfaceDecl {
            range: p.range_from(&start),
            entity,
            identifier,
            bases: Vec::new(),
            members: Vec::new(),
        }));
    }

    let mut bases = Vec::new();
    if p.next(0).is_reserved(":") {
        p.commit(HighlightKind::Operator);
        loop {
            let base = p.next(0);
            if !base.is_identifier() {
                p.error("Expected base type");
                break;
            }
            p.commit(HighlightKind::Type);
            bases.push(base);
            if p.next(0).is_reserved(",") {
                p.commit(HighlightKind::Operator);
                continue;
            }
            break;
        }
    }

    if !p.expect("{", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let mut members = Vec::new();
    loop {
        let next = p.next(0);
        if next.is_reserved("}") {
            p.commit(HighlightKind::Operator);
            break;
        }
        if next.kind() == TokenKind::Eof {
            p.error("Expected '}'");
            break;
        }
        if next.is_reserved(";") {
            p.commit(HighlightKind::Operator);
            continue;
        }
        match parse_virtual_prop(p) {
            Ok(n) => {
                members.push(InterfaceMember::VirtualProp(n));
                continue;
            }
            Err(ParseFailure::Pending) => continue,
            Err(ParseFailure::Mismatch) => {}
        }
        match parse_intf_method(p) {
            Ok(n) => {
                members.push(InterfaceMember::Method(n));
                continue;
            }
            Err(ParseFailure::Pending) => continue,
            Err(ParseFailure::Mismatch) => {}
        }
        p.error("Expected an interface member");
        p.step();
    }
    Ok(Rc::new(InterfaceDecl { range: p.range_from(&start), entity, identifier, bases, members }))
}

/// `TYPE ['&'] IDENT PARAMLIST ['const'] ';'`
fn parse_intf_method(p: &mut ParserState) -> ParseResult<Rc<IntfMethod>> {
    let start = p.next(0);
    let return_type = match parse_type(p) {
        Ok(ty) => ty,
        Err(_) => {
            p.backtrack(&start);
            return Err(ParseFailure::Mismatch);
        }
    };
    let is_ref = if p.next(0).is_reserved("&") {
        p.commit(HighlightKind::Operator);
        true
    } else {
        false
    };
    let identifier = p.next(0);
    if !identifier.is_identifier() || !p.next(1).is_reserved("(") {
        p.backtrack(&start);
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Function);
    let params = match parse_param_list(p) {
        Some(params) => params,
        None => {
            p.backtrack(&start);
            return Err(ParseFailure::Mismatch);
        }
    };
    let is_const = if p.next(0).is_reserved("const") {
        p.commit(HighlightKind::Keyword);
        true
    } else {
        false
    };
    p.expect(";", HighlightKind::Operator);
    Ok(Rc::new(IntfMethod {
        range: p.range_from(&start),
        return_type,
        is_ref,
        identifier,
        params,
        is_const,
    }))
}

pub fn parse_enum(p: &mut ParserState) -> ParseResult<Rc<EnumDecl>> {
    let start = p.next(0);
    let entity = parse_entity_attributes(p);
    if !p.next(0).is_reserved("enum") {
        p.backtrack(&start);
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Keyword);

    let identifier = p.next(0);
    if !identifier.is_identifier() {
        p.error("Expected enum name");
        return Err(ParseFailure::Pending);
    }
    p.commit(HighlightKind::Enum);

    if p.next(0).is_reserved(";") {
        p.commit(HighlightKind::Operator);
        let semicolon = p.prev();
        return Ok(Rc::new(EnumDecl {
            range: p.range_from(&start),
            scope_range: NodeRange::single(semicolon),
            entity,
            identifier,
            members: Vec::new(),
        }));
    }

    let lbrace = p.next(0);
    if !p.expect("{", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let mut members = Vec::new();
    loop {
        let next = p.next(0);
        if next.is_reserved("}") {
            p.commit(HighlightKind::Operator);
            break;
        }
        if next.kind() == TokenKind::Eof {
            p.error("Expected '}'");
            break;
        }
        if !next.is_identifier() {
            p.error("Expected enum member");
            p.step();
            continue;
        }
        p.commit(HighlightKind::EnumMember);
        let value = if p.next(0).is_reserved("=") {
            p.commit(HighlightKind::Operator);
            match parse_expr(p) {
                Ok(expr) => Some(expr),
                Err(ParseFailure::Mismatch) => {
                    p.error("Expected enum value");
                    None
                }
                Err(ParseFailure::Pending) => None,
            }
        } else {
            None
        };
        members.push(EnumMember { identifier: next, value });
        if !p.expect_continuous_or_close(",", "}", true) {
            break;
        }
    }
    let scope_range = NodeRange::new(lbrace, p.prev());
    Ok(Rc::new(EnumDecl {
        range: p.range_from(&start),
        scope_range,
        entity,
        identifier,
        members,
    }))
}

pub fn parse_typedef(p: &mut ParserState) -> ParseResult<Rc<TypeDefDecl>> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword); // 'typedef'
    let prime_type = p.next(0);
    if !prime_type.props.is_prime_type {
        p.error("Expected primitive type");
        return Err(ParseFailure::Pending);
    }
    p.commit(HighlightKind::Builtin);
    let identifier = p.next(0);
    if !identifier.is_identifier() {
        p.error("Expected identifier");
        return Err(ParseFailure::Pending);
    }
    p.commit(HighlightKind::Type);
    p.expect(";", HighlightKind::Operator);
    Ok(Rc::new(TypeDefDecl { range: p.range_from(&start), prime_type, identifier }))
}

pub fn parse_funcdef(p: &mut ParserState) -> ParseResult<Rc<FuncDefDecl>> {
    let start = p.next(0);
    let entity = parse_entity_attributes(p);
    if !p.next(0).is_reserved("funcdef") {
        p.backtrack(&start);
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Keyword);
    let return_type = match parse_type(p) {
        Ok(ty) => ty,
        Err(_) => {
            p.error("Expected type");
            return Err(ParseFailure::Pending);
        }
    };
    let is_ref = if p.next(0).is_reserved("&") {
        p.commit(HighlightKind::Operator);
        true
    } else {
        false
    };
    let identifier = p.next(0);
    if !identifier.is_identifier() {
        p.error("Expected identifier");
        return Err(ParseFailure::Pending);
    }
    p.commit(HighlightKind::Function);
    let params = match parse_param_list(p) {
        Some(params) => params,
        None => {
            p.error("Expected parameter list");
            return Err(ParseFailure::Pending);
        }
    };
    p.expect(";", HighlightKind::Operator);
    Ok(Rc::new(FuncDefDecl {
        range: p.range_from(&start),
        entity,
        return_type,
        is_ref,
        identifier,
        params,
    }))
}

pub fn parse_import(p: &mut ParserState) -> ParseResult<Rc<ImportDecl>> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword); // 'import'
    let return_type = match parse_type(p) {
        Ok(ty) => ty,
        Err(_) => {
            p.error("Expected type");
            return Err(ParseFailure::Pending);
        }
    };
    let is_ref = if p.next(0).is_reserved("&") {
        p.commit(HighlightKind::Operator);
        true
    } else {
        false
    };
    let identifier = p.next(0);
    if !identifier.is_identifier() {
        p.error("Expected identifier");
        return Err(ParseFailure::Pending);
    }
    p.commit(HighlightKind::Function);
    let params = match parse_param_list(p) {
        Some(params) => params,
        None => {
            p.error("Expected parameter list");
            return Err(ParseFailure::Pending);
        }
    };
    let attrs = parse_func_attrs(p);
    if !p.expect("from", HighlightKind::Keyword) {
        return Err(ParseFailure::Pending);
    }
    let from_path = p.next(0);
    if from_path.kind() != TokenKind::String {
        p.error("Expected module string");
        return Err(ParseFailure::Pending);
    }
    p.commit(HighlightKind::String);
    p.expect(";", HighlightKind::Operator);
    Ok(Rc::new(ImportDecl {
        range: p.range_from(&start),
        return_type,
        is_ref,
        identifier,
        params,
        attrs,
        from_path,
    }))
}

pub fn parse_namespace(p: &mut ParserState) -> ParseResult<Rc<NamespaceDecl>> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword); // 'namespace'
    let mut names = Vec::new();
    loop {
        let name = p.next(0);
        if !name.is_identifier() {
            p.error("Expected namespace name");
            return Err(ParseFailure::Pending);
        }
        p.commit(HighlightKind::Namespace);
        names.push(name);
        if p.next(0).is_reserved("::") {
            p.commit(HighlightKind::Operator);
            continue;
        }
        break;
    }
    if !p.expect("{", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let script = parse_script_impl(p, true);
    p.expect("}", HighlightKind::Operator);
    Ok(Rc::new(NamespaceDecl { range: p.range_from(&start), names, script }))
}

/// `'~'? (TYPE ['&'])? IDENT` lookahead deciding between destructor,
/// regular function and constructor heads. Returns `None` when the cursor
/// is not on a function head at all.
fn parse_func_head(p: &mut ParserState) -> Option<FuncHead> {
    let next = p.next(0);
    if next.is_reserved("~") {
        if p.next(1).is_identifier() && p.next(2).is_reserved("(") {
            p.commit(HighlightKind::Operator);
            return Some(FuncHead::Destructor);
        }
        return None;
    }
    let snapshot = p.next(0);
    if let Ok(return_type) = parse_type(p) {
        let is_ref = if p.next(0).is_reserved("&") {
            p.commit(HighlightKind::Operator);
            true
        } else {
            false
        };
        if p.next(0).is_identifier()
            && (p.next(1).is_reserved("(") || p.next(1).is_reserved("<"))
        {
            return Some(FuncHead::Returns { return_type, is_ref });
        }
        p.backtrack(&snapshot);
    }
    if p.next(0).is_identifier() && p.next(1).is_reserved("(") {
        return Some(FuncHead::Constructor);
    }
    None
}

pub fn parse_func(p: &mut ParserState) -> ParseResult<Rc<FuncDecl>> {
    let start = p.next(0);
    let metadata = parse_metadata(p);
    let entity = parse_entity_attributes(p);
    let access = parse_access(p);
    let head = match parse_func_head(p) {
        Some(head) => head,
        None => {
            p.backtrack(&start);
            return Err(ParseFailure::Mismatch);
        }
    };
    let identifier = p.next(0);
    p.commit(HighlightKind::Function);
    let template_types = parse_type_templates(p).map(template_idents);
    let params = match parse_param_list(p) {
        Some(params) => params,
        None => {
            // `A a(42);` is a variable with a constructor argument list, not
            // a function declaration: hand it back untouched
            p.backtrack(&start);
            return Err(ParseFailure::Mismatch);
        }
    };
    let is_const = if p.next(0).is_reserved("const") {
        p.commit(HighlightKind::Keyword);
        true
    } else {
        false
    };
    let attrs = parse_func_attrs(p);

    let next = p.next(0);
    let body = if next.is_reserved(";") {
        p.commit(HighlightKind::Operator);
        // a declaration without body still carries an empty block
        Rc::new(StatBlock { range: NodeRange::single(next), statements: Vec::new() })
    } else {
        match parse_statblock(p) {
            Ok(body) => body,
            Err(ParseFailure::Mismatch) => {
                p.backtrack(&start);
                return Err(ParseFailure::Mismatch);
            }
            Err(ParseFailure::Pending) => return Err(ParseFailure::Pending),
        }
    };

    Ok(Rc::new(FuncDecl {
        range: p.range_from(&start),
        metadata,
        entity,
        access,
        head,
        identifier,
        template_types,
        params,
        is_const,
        attrs,
        body,
    }))
}

/// `'(' ['void'] [TYPE TYPEMOD [IDENT] ['=' ASSIGN] {',' ...}] ')'`
///
/// Fully speculative: emits no diagnostics and rewinds on any failure, so
/// `parse_func` can cleanly hand argument-list initializers back to
/// `parse_var`.
fn parse_param_list(p: &mut ParserState) -> Option<Vec<Param>> {
    let start = p.next(0);
    if !start.is_reserved("(") {
        return None;
    }
    p.commit(HighlightKind::Operator);
    let mut params = Vec::new();
    if p.next(0).is_reserved(")") {
        p.commit(HighlightKind::Operator);
        return Some(params);
    }
    if p.next(0).is_reserved("void") && p.next(1).is_reserved(")") {
        p.commit(HighlightKind::Builtin);
        p.commit(HighlightKind::Operator);
        return Some(params);
    }
    loop {
        let ty = match parse_type(p) {
            Ok(ty) => ty,
            Err(_) => {
                p.backtrack(&start);
                return None;
            }
        };
        let is_ref = parse_type_modifier(p);
        let identifier = p.next(0);
        let identifier = if identifier.is_identifier() {
            p.commit(HighlightKind::Parameter);
            Some(identifier)
        } else {
            None
        };
        let default_value = if p.next(0).is_reserved("=") {
            p.commit(HighlightKind::Operator);
            match parse_assign(p) {
                Ok(assign) => Some(assign),
                Err(_) => {
                    p.backtrack(&start);
                    return None;
                }
            }
        } else {
            None
        };
        params.push(Param { ty, is_ref, identifier, default_value });
        let next = p.next(0);
        if next.is_reserved(")") {
            p.commit(HighlightKind::Operator);
            return Some(params);
        }
        if next.is_reserved(",") {
            p.commit(HighlightKind::Operator);
            continue;
        }
        p.backtrack(&start);
        return None;
    }
}

/// `[access] TYPE ['&'] IDENT '{' {('get'|'set') ['const'] FUNCATTR (STATBLOCK|';')} '}'`
pub fn parse_virtual_prop(p: &mut ParserState) -> ParseResult<Rc<VirtualPropDecl>> {
    let start = p.next(0);
    let metadata = parse_metadata(p);
    let access = parse_access(p);
    let ty = match parse_type(p) {
        Ok(ty) => ty,
        Err(_) => {
            p.backtrack(&start);
            return Err(ParseFailure::Mismatch);
        }
    };
    let is_ref = if p.next(0).is_reserved("&") {
        p.commit(HighlightKind::Operator);
        true
    } else {
        false
    };
    let identifier = p.next(0);
    if !identifier.is_identifier() || !p.next(1).is_reserved("{") {
        p.backtrack(&start);
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Variable);
    p.commit(HighlightKind::Operator); // '{'

    let mut accessors = Vec::new();
    loop {
        let next = p.next(0);
        if next.is_reserved("}") {
            p.commit(HighlightKind::Operator);
            break;
        }
        if next.kind() == TokenKind::Eof {
            p.error("Expected '}'");
            break;
        }
        let kind = if next.is_reserved("get") {
            PropAccessorKind::Getter
        } else if next.is_reserved("set") {
            PropAccessorKind::Setter
        } else {
            p.error("Expected 'get' or 'set'");
            p.step();
            continue;
        };
        p.commit(HighlightKind::Keyword);
        let is_const = if p.next(0).is_reserved("const") {
            p.commit(HighlightKind::Keyword);
            true
        } else {
            false
        };
        let attrs = parse_func_attrs(p);
        let body = if p.next(0).is_reserved(";") {
            p.commit(HighlightKind::Operator);
            None
        } else {
            match parse_statblock(p) {
                Ok(body) => Some(body),
                Err(_) => {
                    p.error("Expected accessor body or ';'");
                    None
                }
            }
        };
        accessors.push(PropAccessor { kind, keyword: next, is_const, attrs, body });
    }

    Ok(Rc::new(VirtualPropDecl {
        range: p.range_from(&start),
        metadata,
        access,
        ty,
        is_ref,
        identifier,
        accessors,
    }))
}

/// `[access] TYPE IDENT [init] {',' IDENT [init]} ';'` where `init` is
/// `'=' (INITLIST|ASSIGN)` or an argument list
pub fn parse_var(p: &mut ParserState) -> ParseResult<Rc<VarDecl>> {
    let start = p.next(0);
    let metadata = parse_metadata(p);
    let access = parse_access(p);
    let ty = match parse_type(p) {
        Ok(ty) => ty,
        Err(_) => {
            p.backtrack(&start);
            return Err(ParseFailure::Mismatch);
        }
    };
    if !p.next(0).is_identifier() {
        p.backtrack(&start);
        return Err(ParseFailure::Mismatch);
    }

    let mut declarators = Vec::new();
    loop {
        let identifier = p.next(0);
        if !identifier.is_identifier() {
            p.error("Expected identifier");
            break;
        }
        p.commit(HighlightKind::Variable);
        let next = p.next(0);
        let init = if next.is_reserved("=") {
            p.commit(HighlightKind::Operator);
            if p.next(0).is_reserved("{") {
                match parse_init_list(p) {
                    Ok(list) => Some(VarInit::InitList(list)),
                    Err(_) => None,
                }
            } else {
                match parse_assign(p) {
                    Ok(assign) => Some(VarInit::Assign(assign)),
                    Err(ParseFailure::Mismatch) => {
                        p.error("Expected initializer expression");
                        None
                    }
                    Err(ParseFailure::Pending) => None,
                }
            }
        } else if next.is_reserved("(") {
            match parse_arg_list(p) {
                Ok(args) => Some(VarInit::ArgList(args)),
                Err(_) => None,
            }
        } else {
            None
        };
        declarators.push(VarDeclarator { identifier, init });

        if p.next(0).is_reserved(",") {
            p.commit(HighlightKind::Operator);
            continue;
        }
        break;
    }
    p.expect(";", HighlightKind::Operator);
    Ok(Rc::new(VarDecl { range: p.range_from(&start), metadata, access, ty, declarators }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::BuildDiagnostics;

    fn script(source: &str) -> (Script, bool) {
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source(source, &mut diags);
        let script = parse_script(&mut p);
        let has_errors = p.diags().has_errors();
        (script, has_errors)
    }

    #[test]
    fn var_with_constructor_arguments_is_a_var() {
        let (script, errors) = script("A a(42);");
        assert!(!errors);
        assert_eq!(script.items.len(), 1);
        match &script.items[0] {
            ScriptItem::Var(var) => {
                assert!(matches!(var.declarators[0].init, Some(VarInit::ArgList(_))));
            }
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn function_declaration_wins_over_var_when_params_are_types() {
        let (script, errors) = script("A a(int x) { }");
        assert!(!errors);
        assert!(matches!(&script.items[0], ScriptItem::Func(_)));
    }

    #[test]
    fn class_recovery_keeps_the_node() {
        let (script, errors) = script("class C { int ; } int after;");
        assert!(errors);
        assert!(matches!(&script.items[0], ScriptItem::Class(_)));
        // parsing continued past the closing brace
        assert!(matches!(&script.items[1], ScriptItem::Var(_)));
    }

    #[test]
    fn enum_trailing_comma() {
        let (script, errors) = script("enum E { X, Y = 5, Z, }");
        assert!(!errors);
        match &script.items[0] {
            ScriptItem::Enum(e) => {
                assert_eq!(e.members.len(), 3);
                assert!(e.members[1].value.is_some());
            }
            _ => panic!("expected enum"),
        }
    }

    #[test]
    fn metadata_is_preserved_verbatim() {
        let (script, errors) = script("[meta [nested]] class C { }");
        assert!(!errors);
        match &script.items[0] {
            ScriptItem::Class(c) => {
                assert_eq!(c.metadata.len(), 1);
                let texts: Vec<_> = c.metadata[0].iter().map(|t| t.as_str().to_string()).collect();
                assert_eq!(texts, vec!["[", "meta", "[", "nested", "]", "]"]);
            }
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn unterminated_metadata_backtracks() {
        let (script, errors) = script("[meta class C { }");
        // the bracket never closes, so the tokens are reparsed without
        // metadata and the parser reports the stray bracket
        assert!(errors);
        drop(script);
    }

    #[test]
    fn scope_range_is_distinct_from_node_range() {
        let (script, _) = script("class C : B { int x; }");
        match &script.items[0] {
            ScriptItem::Class(c) => {
                assert_eq!(c.scope_range.start.as_str(), "{");
                assert_eq!(c.scope_range.end.as_str(), "}");
                assert!(c.range.start.index < c.scope_range.start.index);
            }
            _ => panic!("expected class"),
        }
    }
}
