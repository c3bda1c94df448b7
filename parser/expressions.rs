// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Parsing functions for the expression sub-grammar
//!
//! Binary operator chains are parsed flat, as `Expr { head, tail }` lists.
//! Precedence is not encoded here: the analyzer reshapes the chain with a
//! shunting-yard pass, so the parser stays a direct transcription of the
//! grammar.

use super::prelude::*;
use super::statements::parse_statblock;
use super::types::{parse_scope, parse_type};
use super::TokenKind;
use std::rc::Rc;

#[cfg_attr(test, parser_test)]
/// ```test
/// 42
/// -0.5
/// a + b * c
/// a >= b && c != d
/// value is null
/// handle !is null
/// bits << 2 | mask
/// arr[0].method(1, 2).field++
/// obj.prop
/// f(g(x), h())
/// ns::f(1)
/// array<int>(8)
/// cast<float>(total)
/// (a + b) * 2
/// ```
pub fn parse_expr(p: &mut ParserState) -> ParseResult<Expr> {
    let start = p.next(0);
    let head = parse_expr_term(p)?;
    let mut tail = None;
    if let Some((op, count)) = p.peek_expr_operator() {
        p.commit_virtual(&op, count, HighlightKind::Operator);
        match parse_expr(p) {
            Ok(rhs) => tail = Some(ExprTail { op, expr: Box::new(rhs) }),
            Err(ParseFailure::Mismatch) => p.error("Expected expression after operator"),
            Err(ParseFailure::Pending) => {}
        }
    }
    Ok(Expr { range: p.range_from(&start), head, tail })
}

#[cfg_attr(test, parser_test)]
/// ```test
/// x = y = z
/// total += f(1)
/// bits >>= 2
/// flag ? a : b
/// value
/// ```
pub fn parse_assign(p: &mut ParserState) -> ParseResult<Rc<Assign>> {
    let start = p.next(0);
    let condition = parse_condition(p)?;
    let mut tail = None;
    if let Some((op, count)) = p.peek_assign_operator() {
        p.commit_virtual(&op, count, HighlightKind::Operator);
        match parse_assign(p) {
            Ok(rhs) => tail = Some(AssignTail { op, assign: rhs }),
            Err(ParseFailure::Mismatch) => p.error("Expected expression after operator"),
            Err(ParseFailure::Pending) => {}
        }
    }
    Ok(Rc::new(Assign { range: p.range_from(&start), condition, tail }))
}

/// `EXPR ['?' ASSIGN ':' ASSIGN]`
///
/// The ternary is only attached when both branches parsed successfully.
fn parse_condition(p: &mut ParserState) -> ParseResult<Condition> {
    let start = p.next(0);
    let expr = parse_expr(p)?;
    let mut ternary = None;
    if p.next(0).is_reserved("?") {
        p.commit(HighlightKind::Operator);
        let true_assign = match parse_assign(p) {
            Ok(a) => Some(a),
            Err(ParseFailure::Mismatch) => {
                p.error("Expected expression");
                None
            }
            Err(ParseFailure::Pending) => None,
        };
        let false_assign = if p.expect(":", HighlightKind::Operator) {
            match parse_assign(p) {
                Ok(a) => Some(a),
                Err(ParseFailure::Mismatch) => {
                    p.error("Expected expression");
                    None
                }
                Err(ParseFailure::Pending) => None,
            }
        } else {
            None
        };
        ternary = true_assign
            .zip(false_assign)
            .map(|(true_assign, false_assign)| Ternary { true_assign, false_assign });
    }
    Ok(Condition { range: p.range_from(&start), expr, ternary })
}

/// `([TYPE '='] INITLIST) | ({preOp} EXPRVALUE {postOp})`
fn parse_expr_term(p: &mut ParserState) -> ParseResult<ExprTerm> {
    let start = p.next(0);

    if start.is_reserved("{") {
        let list = parse_init_list(p)?;
        return Ok(ExprTerm::InitList { range: p.range_from(&start), ty: None, list });
    }
    if let Ok(ty) = parse_type(p) {
        if p.next(0).is_reserved("=") && p.next(1).is_reserved("{") {
            p.commit(HighlightKind::Operator);
            let list = parse_init_list(p)?;
            return Ok(ExprTerm::InitList { range: p.range_from(&start), ty: Some(ty), list });
        }
        p.backtrack(&start);
    }

    let mut pre_ops = Vec::new();
    loop {
        let next = p.next(0);
        if next.kind() == TokenKind::Reserved && next.props.is_expr_pre_op {
            // `-1` etc. are a pre-op applied on the literal
            p.commit(HighlightKind::Operator);
            pre_ops.push(next);
        } else {
            break;
        }
    }

    let value = match parse_expr_value(p) {
        Ok(value) => value,
        Err(ParseFailure::Mismatch) if pre_ops.is_empty() => return Err(ParseFailure::Mismatch),
        Err(ParseFailure::Mismatch) => {
            p.error("Expected expression value");
            return Err(ParseFailure::Pending);
        }
        Err(ParseFailure::Pending) => return Err(ParseFailure::Pending),
    };

    let mut post_ops = Vec::new();
    loop {
        let next = p.next(0);
        if next.is_reserved(".") {
            let dot = next;
            p.commit(HighlightKind::Operator);
            let ident = p.next(0);
            if !ident.is_identifier() {
                p.error("Expected identifier after '.'");
                break;
            }
            if p.next(1).is_reserved("(") {
                p.commit(HighlightKind::Function);
                match parse_arg_list(p) {
                    Ok(args) => post_ops.push(ExprPostOp::MethodCall {
                        range: p.range_from(&dot),
                        identifier: ident,
                        args,
                    }),
                    Err(_) => break,
                }
            } else {
                p.commit(HighlightKind::Variable);
                post_ops
                    .push(ExprPostOp::Member { range: p.range_from(&dot), identifier: ident });
            }
        } else if next.is_reserved("[") {
            match parse_bracket_args(p) {
                Ok(args) => post_ops.push(ExprPostOp::Index { range: args.range.clone(), args }),
                Err(_) => break,
            }
        } else if next.is_reserved("(") {
            match parse_arg_list(p) {
                Ok(args) => post_ops.push(ExprPostOp::Call { range: args.range.clone(), args }),
                Err(_) => break,
            }
        } else if next.is_reserved("++") || next.is_reserved("--") {
            p.commit(HighlightKind::Operator);
            post_ops.push(ExprPostOp::IncDec { op: next });
        } else {
            break;
        }
    }

    Ok(ExprTerm::Value { range: p.range_from(&start), pre_ops, value, post_ops })
}

/// The most specific alternatives are tried first: cast, parenthesized
/// expression, literal, lambda, function call, construct call, variable
/// access
fn parse_expr_value(p: &mut ParserState) -> ParseResult<ExprValue> {
    let next = p.next(0);

    if next.is_reserved("void") {
        p.commit(HighlightKind::Builtin);
        return Ok(ExprValue::Void(next));
    }
    if next.is_reserved("cast") {
        return parse_cast(p).map(ExprValue::Cast);
    }
    if next.is_reserved("(") {
        p.commit(HighlightKind::Operator);
        let assign = match parse_assign(p) {
            Ok(assign) => assign,
            Err(ParseFailure::Mismatch) => {
                p.error("Expected expression");
                return Err(ParseFailure::Pending);
            }
            Err(ParseFailure::Pending) => return Err(ParseFailure::Pending),
        };
        p.expect(")", HighlightKind::Operator);
        return Ok(ExprValue::Assign(assign));
    }
    if next.kind() == TokenKind::Number {
        p.commit(HighlightKind::Number);
        return Ok(ExprValue::Literal(Literal { token: next }));
    }
    if next.kind() == TokenKind::String {
        p.commit(HighlightKind::String);
        return Ok(ExprValue::Literal(Literal { token: next }));
    }
    if next.is_reserved("true") || next.is_reserved("false") || next.is_reserved("null")
        || next.is_reserved("this")
    {
        p.commit(HighlightKind::Keyword);
        return Ok(ExprValue::Literal(Literal { token: next }));
    }
    if is_lambda_ahead(p) {
        return parse_lambda(p).map(|l| ExprValue::Lambda(Rc::new(l)));
    }

    // function call
    let snapshot = p.next(0);
    let scope = parse_scope(p);
    let ident = p.next(0);
    if ident.is_identifier() && p.next(1).is_reserved("(") {
        p.commit(HighlightKind::Function);
        let args = parse_arg_list(p)?;
        return Ok(ExprValue::FuncCall(FuncCall {
            range: p.range_from(&snapshot),
            scope,
            identifier: ident,
            args,
        }));
    }
    p.backtrack(&snapshot);

    // construct call, e.g. `array<int>(8)`
    if let Ok(ty) = parse_type(p) {
        if p.next(0).is_reserved("(") {
            let args = parse_arg_list(p)?;
            return Ok(ExprValue::ConstructCall(ConstructCall {
                range: p.range_from(&snapshot),
                ty,
                args,
            }));
        }
        p.backtrack(&snapshot);
    }

    // variable access
    let scope = parse_scope(p);
    let ident = p.next(0);
    if ident.is_identifier() {
        p.commit(HighlightKind::Variable);
        return Ok(ExprValue::VarAccess(VarAccess {
            range: p.range_from(&snapshot),
            scope,
            identifier: Some(ident),
        }));
    }
    if let Some(scope) = scope {
        return Ok(ExprValue::VarAccess(VarAccess {
            range: p.range_from(&snapshot),
            scope: Some(scope),
            identifier: None,
        }));
    }
    Err(ParseFailure::Mismatch)
}

/// `'cast' '<' TYPE '>' '(' ASSIGN ')'`
fn parse_cast(p: &mut ParserState) -> ParseResult<CastExpr> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword);
    if !p.expect("<", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let ty = match parse_type(p) {
        Ok(ty) => ty,
        Err(_) => {
            p.error("Expected type in cast");
            return Err(ParseFailure::Pending);
        }
    };
    if !p.expect(">", HighlightKind::Operator) || !p.expect("(", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let assign = match parse_assign(p) {
        Ok(assign) => assign,
        Err(_) => {
            p.error("Expected expression in cast");
            return Err(ParseFailure::Pending);
        }
    };
    p.expect(")", HighlightKind::Operator);
    Ok(CastExpr { range: p.range_from(&start), ty, assign })
}

/// A lambda is only committed to when `function ( ... ) {` is ahead.
///
/// The scan does not balance nested parentheses; lambda parameter lists
/// cannot contain any.
fn is_lambda_ahead(p: &ParserState) -> bool {
    if !p.next(0).is_reserved("function") || !p.next(1).is_reserved("(") {
        return false;
    }
    let mut i = 2;
    loop {
        let t = p.next(i);
        if t.is_reserved(")") {
            return p.next(i + 1).is_reserved("{");
        }
        if t.kind() == TokenKind::Eof {
            return false;
        }
        i += 1;
    }
}

/// `'function' '(' [[TYPE TYPEMOD] [IDENT]] {',' ...} ')' STATBLOCK`
fn parse_lambda(p: &mut ParserState) -> ParseResult<LambdaExpr> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword); // 'function'
    p.expect("(", HighlightKind::Operator);

    let mut params = Vec::new();
    if p.next(0).is_reserved(")") {
        p.commit(HighlightKind::Operator);
    } else {
        loop {
            let next = p.next(0);
            if next.is_identifier()
                && (p.next(1).is_reserved(",") || p.next(1).is_reserved(")"))
            {
                // untyped parameter
                p.commit(HighlightKind::Parameter);
                params.push(LambdaParam { ty: None, is_ref: false, identifier: Some(next) });
            } else {
                let ty = match parse_type(p) {
                    Ok(ty) => ty,
                    Err(_) => {
                        p.error("Expected lambda parameter");
                        break;
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
                params.push(LambdaParam { ty: Some(ty), is_ref, identifier });
            }
            if !p.expect_continuous_or_close(",", ")", true) {
                break;
            }
        }
    }

    let body = match parse_statblock(p) {
        Ok(body) => body,
        Err(_) => {
            p.error("Expected lambda body");
            return Err(ParseFailure::Pending);
        }
    };
    Ok(LambdaExpr { range: p.range_from(&start), params, body })
}

/// `['&' ['in'|'out'|'inout']]` after a parameter type
pub(super) fn parse_type_modifier(p: &mut ParserState) -> bool {
    if !p.next(0).is_reserved("&") {
        return false;
    }
    p.commit(HighlightKind::Operator);
    let next = p.next(0);
    if next.is_reserved("in") || next.is_reserved("out") || next.is_reserved("inout") {
        p.commit(HighlightKind::Keyword);
    }
    true
}

#[cfg_attr(test, parser_test)]
/// ```test
/// {}
/// {1, 2, 3}
/// {{1, 2}, {3, 4}}
/// {1, , 2}
/// ```
pub fn parse_init_list(p: &mut ParserState) -> ParseResult<InitList> {
    let start = p.next(0);
    if !start.is_reserved("{") {
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Operator);

    let mut items = Vec::new();
    loop {
        let next = p.next(0);
        if next.is_reserved("}") {
            p.commit(HighlightKind::Operator);
            break;
        }
        if next.is_reserved(",") {
            // empty slot
            p.commit(HighlightKind::Operator);
            continue;
        }
        if next.kind() == TokenKind::Eof {
            p.error("Expected '}'");
            break;
        }
        if next.is_reserved("{") {
            match parse_init_list(p) {
                Ok(list) => items.push(InitItem::List(list)),
                Err(_) => break,
            }
        } else {
            match parse_assign(p) {
                Ok(assign) => items.push(InitItem::Assign(assign)),
                Err(ParseFailure::Mismatch) => {
                    p.error("Expected expression in initializer list");
                    p.step();
                    continue;
                }
                Err(ParseFailure::Pending) => {}
            }
        }
        if !p.expect_continuous_or_close(",", "}", true) {
            break;
        }
    }
    Ok(InitList { range: p.range_from(&start), items })
}

/// `'(' [[IDENT ':'] ASSIGN {',' [IDENT ':'] ASSIGN}] ')'`
pub fn parse_arg_list(p: &mut ParserState) -> ParseResult<ArgList> {
    parse_arg_list_with(p, "(", ")")
}

/// The `[...]` variant of the argument list used by indexers
fn parse_bracket_args(p: &mut ParserState) -> ParseResult<ArgList> {
    parse_arg_list_with(p, "[", "]")
}

fn parse_arg_list_with(p: &mut ParserState, open: &str, close: &str) -> ParseResult<ArgList> {
    let start = p.next(0);
    if !start.is_reserved(open) {
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Operator);

    let mut args = Vec::new();
    if p.next(0).is_reserved(close) {
        p.commit(HighlightKind::Operator);
        return Ok(ArgList { range: p.range_from(&start), args });
    }
    loop {
        let mut name = None;
        if p.next(0).is_identifier() && p.next(1).is_reserved(":") {
            let ident = p.next(0);
            p.commit(HighlightKind::Parameter);
            p.commit(HighlightKind::Operator);
            name = Some(ident);
        }
        match parse_assign(p) {
            Ok(value) => args.push(Arg { name, value }),
            Err(ParseFailure::Mismatch) => p.error("Expected expression"),
            Err(ParseFailure::Pending) => {}
        }
        if !p.expect_continuous_or_close(",", close, true) {
            break;
        }
    }
    Ok(ArgList { range: p.range_from(&start), args })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::BuildDiagnostics;

    fn parse_ok(source: &str) -> Expr {
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source(source, &mut diags);
        let expr = parse_expr(&mut p).expect("should parse");
        assert!(!p.diags().has_errors(), "{:?}", p.diags().to_string_vec());
        assert!(p.is_end());
        expr
    }

    #[test]
    fn expression_chain_stays_flat() {
        // `1 + 2 * 3` parses into a right-leaning chain; precedence is the
        // analyzer's job
        let expr = parse_ok("1 + 2 * 3");
        let tail = expr.tail.expect("has tail");
        assert_eq!(tail.op.as_str(), "+");
        let tail2 = tail.expr.tail.as_ref().expect("has second tail");
        assert_eq!(tail2.op.as_str(), "*");
        assert!(tail2.expr.tail.is_none());
    }

    #[test]
    fn ternary_needs_both_branches() {
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source("a ? b : ;", &mut diags);
        let assign = parse_assign(&mut p).expect("parses with recovery");
        assert!(assign.condition.ternary.is_none());
        assert!(p.diags().has_errors());
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = {
            let mut diags = BuildDiagnostics::default();
            let mut p = ParserState::for_source("a = b = c", &mut diags);
            let assign = parse_assign(&mut p).expect("should parse");
            assert!(p.is_end());
            assign
        };
        let tail = expr.tail.as_ref().expect("outer tail");
        assert_eq!(tail.op.as_str(), "=");
        assert!(tail.assign.tail.is_some());
    }

    #[test]
    fn shift_right_is_one_operator() {
        let expr = parse_ok("a >> 2");
        let tail = expr.tail.expect("has tail");
        assert_eq!(tail.op.as_str(), ">>");
    }

    #[test]
    fn lambda_lookahead_rejects_calls() {
        // `function(x)` without a following block is a regular call of
        // something named `function`? No: `function` is reserved, so this is
        // not a value at all.
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source("function(x)", &mut diags);
        assert!(parse_expr(&mut p).is_err());
    }

    #[test]
    fn lambda_lookahead_sees_block() {
        let expr = parse_ok("function(int x) { return; }");
        match expr.head {
            ExprTerm::Value { value: ExprValue::Lambda(l), .. } => {
                assert_eq!(l.params.len(), 1);
                assert!(l.params[0].ty.is_some());
            }
            _ => panic!("expected lambda"),
        }
    }

    #[test]
    fn typed_initializer_term() {
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source("array<int> = {1, 2}", &mut diags);
        let expr = parse_expr(&mut p).expect("should parse");
        match expr.head {
            ExprTerm::InitList { ty, list, .. } => {
                assert!(ty.is_some());
                assert_eq!(list.items.len(), 2);
            }
            _ => panic!("expected init list term"),
        }
    }
}
