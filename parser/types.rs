// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Module containing the parsing functions for type names and scope prefixes

use super::prelude::*;
use super::{CacheKind, CachedValue};
use std::rc::Rc;

#[cfg_attr(test, parser_test)]
/// ```test
/// int
/// const uint64
/// MyClass
/// array<int>
/// dictionary<string, MyClass@>
/// int[]
/// MyClass@
/// const MyClass@ const
/// ns::MyClass
/// ::Root
/// outer::inner::Leaf<int>
/// auto
/// ```
pub fn parse_type(p: &mut ParserState) -> ParseResult<Rc<TypeNode>> {
    let start = p.next(0);

    let is_const = if p.next(0).is_reserved("const") {
        p.commit(HighlightKind::Keyword);
        true
    } else {
        false
    };

    let scope = parse_scope(p);

    let next = p.next(0);
    let data = if next.is_identifier() {
        p.commit(HighlightKind::Type);
        DataType::Identifier(next)
    } else if next.props.is_prime_type {
        p.commit(HighlightKind::Builtin);
        DataType::Primitive(next)
    } else if next.is_reserved("?") {
        p.commit(HighlightKind::Builtin);
        DataType::Any(next)
    } else if next.is_reserved("auto") {
        p.commit(HighlightKind::Builtin);
        DataType::Auto(next)
    } else {
        p.backtrack(&start);
        return Err(ParseFailure::Mismatch);
    };

    let template_args = parse_type_templates(p).unwrap_or_default();

    let mut is_array = false;
    let mut ref_modifier = None;
    loop {
        let next = p.next(0);
        if next.is_reserved("[") && p.next(1).is_reserved("]") {
            p.commit(HighlightKind::Operator);
            p.commit(HighlightKind::Operator);
            is_array = true;
        } else if next.is_reserved("@") {
            p.commit(HighlightKind::Operator);
            if p.next(0).is_reserved("const") {
                p.commit(HighlightKind::Keyword);
                ref_modifier = Some(RefModifier::HandleConst);
            } else {
                ref_modifier = Some(RefModifier::Handle);
            }
        } else {
            break;
        }
    }

    Ok(Rc::new(TypeNode {
        range: p.range_from(&start),
        is_const,
        scope,
        data,
        template_args,
        is_array,
        ref_modifier,
    }))
}

/// `['::'] {IDENT '::'} [IDENT '<' TYPE {',' TYPE} '>' '::']`
///
/// Returns `None` when there is no scope prefix at the cursor. The result is
/// memoized: this production is speculatively attempted in front of every
/// type, function call and variable access.
pub fn parse_scope(p: &mut ParserState) -> Option<Rc<ScopeNode>> {
    if let Some(cached) = p.cache_restore(CacheKind::Scope) {
        match cached {
            CachedValue::Scope(scope) => return scope,
            _ => unreachable!("cache key and value kinds always agree"),
        }
    }
    let start = p.next(0);
    let cache_start = p.position();
    let scope = parse_scope_uncached(p, &start);
    p.cache_store(CacheKind::Scope, cache_start, CachedValue::Scope(scope.clone()));
    scope
}

fn parse_scope_uncached(p: &mut ParserState, start: &TokenRef) -> Option<Rc<ScopeNode>> {
    let is_global = if p.next(0).is_reserved("::") {
        p.commit(HighlightKind::Operator);
        true
    } else {
        false
    };

    let mut scope_list = Vec::new();
    let mut template_args = Vec::new();
    loop {
        let next = p.next(0);
        if !next.is_identifier() {
            break;
        }
        if p.next(1).is_reserved("::") {
            p.commit(HighlightKind::Namespace);
            p.commit(HighlightKind::Operator);
            scope_list.push(next);
            continue;
        }
        if p.next(1).is_reserved("<") {
            // a trailing `IDENT<...>::` segment ends the scope
            let snapshot = p.next(0);
            p.commit(HighlightKind::Type);
            if let Some(args) = parse_type_templates(p) {
                if p.next(0).is_reserved("::") {
                    p.commit(HighlightKind::Operator);
                    scope_list.push(next);
                    template_args = args;
                    break;
                }
            }
            p.backtrack(&snapshot);
        }
        break;
    }

    if scope_list.is_empty() && !is_global {
        return None;
    }
    Some(Rc::new(ScopeNode {
        range: p.range_from(start),
        is_global,
        scope_list,
        template_args,
    }))
}

/// `'<' TYPE {',' TYPE} '>'`
///
/// Returns `None` when the cursor is not on a template argument list; the
/// cursor is rewound to where it was. The result is memoized.
pub fn parse_type_templates(p: &mut ParserState) -> Option<Vec<Rc<TypeNode>>> {
    if let Some(cached) = p.cache_restore(CacheKind::TypeTemplates) {
        match cached {
            CachedValue::TypeTemplates(args) => return args,
            _ => unreachable!("cache key and value kinds always agree"),
        }
    }
    let start = p.next(0);
    let cache_start = p.position();
    let args = parse_type_templates_uncached(p, &start);
    p.cache_store(CacheKind::TypeTemplates, cache_start, CachedValue::TypeTemplates(args.clone()));
    args
}

fn parse_type_templates_uncached(
    p: &mut ParserState,
    start: &TokenRef,
) -> Option<Vec<Rc<TypeNode>>> {
    if !p.next(0).is_reserved("<") {
        return None;
    }
    p.commit(HighlightKind::Operator);

    let mut args = Vec::new();
    loop {
        match parse_type(p) {
            Ok(ty) => args.push(ty),
            Err(_) => {
                p.backtrack(start);
                return None;
            }
        }
        let next = p.next(0);
        if next.is_reserved(">") {
            p.commit(HighlightKind::Operator);
            return Some(args);
        }
        if next.is_reserved(",") {
            p.commit(HighlightKind::Operator);
            continue;
        }
        p.backtrack(start);
        return None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::BuildDiagnostics;

    #[test]
    fn type_suffixes() {
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source("const array<int>@ const", &mut diags);
        let ty = parse_type(&mut p).unwrap();
        assert!(ty.is_const);
        assert!(!ty.is_array);
        assert_eq!(ty.ref_modifier, Some(RefModifier::HandleConst));
        assert_eq!(ty.template_args.len(), 1);
        assert!(p.is_end());
    }

    #[test]
    fn array_suffix_needs_empty_brackets() {
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source("int[3]", &mut diags);
        let ty = parse_type(&mut p).unwrap();
        assert!(!ty.is_array);
        // the `[` is left for the caller
        assert!(p.next(0).is("["));
    }

    #[test]
    fn scope_is_not_parsed_without_double_colon() {
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source("foo", &mut diags);
        assert!(parse_scope(&mut p).is_none());
        assert_eq!(p.next(0).as_str(), "foo");
    }

    #[test]
    fn memoized_scope_restores_cursor() {
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source("a::b::c", &mut diags);
        let snapshot = p.next(0);
        let first = parse_scope(&mut p).expect("scope");
        let after = p.position();
        p.backtrack(&snapshot);
        let second = parse_scope(&mut p).expect("cached scope");
        assert_eq!(p.position(), after);
        assert_eq!(first.scope_list.len(), second.scope_list.len());
        assert!(Rc::ptr_eq(&first, &second));
    }
}
