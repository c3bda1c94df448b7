// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Parsing functions for statements and statement blocks

use super::declarations::parse_var;
use super::expressions::{parse_assign, parse_expr};
use super::prelude::*;
use super::TokenKind;
use std::rc::Rc;

#[cfg_attr(test, parser_test)]
/// ```test
/// { }
/// { int x = 1; x += 2; }
/// { if (a) { } else if (b) { } else { } }
/// { while (x < 10) x++; }
/// { do { x--; } while (x > 0); }
/// { for (int i = 0; i < 10; i++) { } }
/// { for (;;) { break; } }
/// { switch (x) { case 1: return; case 2: break; default: continue; } }
/// { try { f(); } catch { g(); } }
/// { return x + 1; }
/// { ; }
/// ```
pub fn parse_statblock(p: &mut ParserState) -> ParseResult<Rc<StatBlock>> {
    let start = p.next(0);
    if !start.is_reserved("{") {
        return Err(ParseFailure::Mismatch);
    }
    p.commit(HighlightKind::Operator);

    let mut statements = Vec::new();
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
        match parse_var(p) {
            Ok(var) => {
                statements.push(Statement::Var(var));
                continue;
            }
            Err(ParseFailure::Pending) => continue,
            Err(ParseFailure::Mismatch) => {}
        }
        match parse_statement(p) {
            Ok(statement) => statements.push(statement),
            Err(ParseFailure::Pending) => {}
            Err(ParseFailure::Mismatch) => {
                // consume one token so the loop always makes progress
                p.error("Expected statement");
                p.step();
            }
        }
    }
    Ok(Rc::new(StatBlock { range: p.range_from(&start), statements }))
}

pub fn parse_statement(p: &mut ParserState) -> ParseResult<Statement> {
    let next = p.next(0);
    if next.is_reserved("{") {
        return parse_statblock(p).map(Statement::Block);
    }
    if next.is_reserved("if") {
        return parse_if(p).map(|s| Statement::If(Box::new(s)));
    }
    if next.is_reserved("for") {
        return parse_for(p).map(|s| Statement::For(Box::new(s)));
    }
    if next.is_reserved("while") {
        return parse_while(p).map(|s| Statement::While(Box::new(s)));
    }
    if next.is_reserved("do") {
        return parse_dowhile(p).map(|s| Statement::DoWhile(Box::new(s)));
    }
    if next.is_reserved("switch") {
        return parse_switch(p).map(|s| Statement::Switch(Box::new(s)));
    }
    if next.is_reserved("try") {
        return parse_try(p).map(|s| Statement::Try(Box::new(s)));
    }
    if next.is_reserved("return") {
        return parse_return(p).map(Statement::Return);
    }
    if next.is_reserved("break") {
        p.commit(HighlightKind::Keyword);
        p.expect(";", HighlightKind::Operator);
        return Ok(Statement::Break(JumpStat { range: p.range_from(&next) }));
    }
    if next.is_reserved("continue") {
        p.commit(HighlightKind::Keyword);
        p.expect(";", HighlightKind::Operator);
        return Ok(Statement::Continue(JumpStat { range: p.range_from(&next) }));
    }
    parse_exprstat(p).map(Statement::Expr)
}

/// `[ASSIGN] ';'`
fn parse_exprstat(p: &mut ParserState) -> ParseResult<ExprStat> {
    let start = p.next(0);
    if start.is_reserved(";") {
        p.commit(HighlightKind::Operator);
        return Ok(ExprStat { range: p.range_from(&start), assign: None });
    }
    let assign = match parse_assign(p) {
        Ok(assign) => Some(assign),
        Err(ParseFailure::Mismatch) => return Err(ParseFailure::Mismatch),
        Err(ParseFailure::Pending) => None,
    };
    p.expect(";", HighlightKind::Operator);
    Ok(ExprStat { range: p.range_from(&start), assign })
}

/// `'if' '(' ASSIGN ')' STATEMENT ['else' STATEMENT]`
fn parse_if(p: &mut ParserState) -> ParseResult<IfStat> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword);
    if !p.expect("(", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let condition = match parse_assign(p) {
        Ok(assign) => assign,
        Err(_) => {
            p.error("Expected condition");
            return Err(ParseFailure::Pending);
        }
    };
    p.expect(")", HighlightKind::Operator);
    let then_branch = match parse_statement(p) {
        Ok(statement) => Some(statement),
        Err(failure) => {
            if failure == ParseFailure::Mismatch {
                p.error("Expected statement");
            }
            None
        }
    };
    let mut else_branch = None;
    if p.next(0).is_reserved("else") {
        p.commit(HighlightKind::Keyword);
        match parse_statement(p) {
            Ok(statement) => else_branch = Some(statement),
            Err(ParseFailure::Mismatch) => p.error("Expected statement"),
            Err(ParseFailure::Pending) => {}
        }
    }
    Ok(IfStat { range: p.range_from(&start), condition, then_branch, else_branch })
}

/// `'for' '(' (VAR | EXPRSTAT) EXPRSTAT [ASSIGN {',' ASSIGN}] ')' STATEMENT`
fn parse_for(p: &mut ParserState) -> ParseResult<ForStat> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword);
    if !p.expect("(", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let initial = match parse_var(p) {
        Ok(var) => Some(Statement::Var(var)),
        Err(ParseFailure::Pending) => None,
        Err(ParseFailure::Mismatch) => match parse_exprstat(p) {
            Ok(stat) => Some(Statement::Expr(stat)),
            Err(_) => {
                p.error("Expected initializer");
                None
            }
        },
    };
    let condition = match parse_exprstat(p) {
        Ok(stat) => Some(stat),
        Err(_) => {
            p.error("Expected condition");
            None
        }
    };
    let mut increments = Vec::new();
    if p.next(0).is_reserved(")") {
        p.commit(HighlightKind::Operator);
    } else {
        loop {
            match parse_assign(p) {
                Ok(assign) => increments.push(assign),
                Err(ParseFailure::Mismatch) => p.error("Expected expression"),
                Err(ParseFailure::Pending) => {}
            }
            if !p.expect_continuous_or_close(",", ")", true) {
                break;
            }
        }
    }
    let body = match parse_statement(p) {
        Ok(statement) => Some(statement),
        Err(failure) => {
            if failure == ParseFailure::Mismatch {
                p.error("Expected statement");
            }
            None
        }
    };
    Ok(ForStat { range: p.range_from(&start), initial, condition, increments, body })
}

/// `'while' '(' ASSIGN ')' STATEMENT`
fn parse_while(p: &mut ParserState) -> ParseResult<WhileStat> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword);
    if !p.expect("(", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let condition = match parse_assign(p) {
        Ok(assign) => assign,
        Err(_) => {
            p.error("Expected condition");
            return Err(ParseFailure::Pending);
        }
    };
    p.expect(")", HighlightKind::Operator);
    let body = match parse_statement(p) {
        Ok(statement) => Some(statement),
        Err(failure) => {
            if failure == ParseFailure::Mismatch {
                p.error("Expected statement");
            }
            None
        }
    };
    Ok(WhileStat { range: p.range_from(&start), condition, body })
}

/// `'do' STATEMENT 'while' '(' ASSIGN ')' ';'`
fn parse_dowhile(p: &mut ParserState) -> ParseResult<DoWhileStat> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword);
    let body = match parse_statement(p) {
        Ok(statement) => statement,
        Err(_) => {
            p.error("Expected statement");
            return Err(ParseFailure::Pending);
        }
    };
    if !p.expect("while", HighlightKind::Keyword) || !p.expect("(", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let condition = match parse_assign(p) {
        Ok(assign) => assign,
        Err(_) => {
            p.error("Expected condition");
            return Err(ParseFailure::Pending);
        }
    };
    p.expect(")", HighlightKind::Operator);
    p.expect(";", HighlightKind::Operator);
    Ok(DoWhileStat { range: p.range_from(&start), body, condition })
}

/// `'switch' '(' ASSIGN ')' '{' {CASE} '}'`
fn parse_switch(p: &mut ParserState) -> ParseResult<SwitchStat> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword);
    if !p.expect("(", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let condition = match parse_assign(p) {
        Ok(assign) => assign,
        Err(_) => {
            p.error("Expected condition");
            return Err(ParseFailure::Pending);
        }
    };
    p.expect(")", HighlightKind::Operator);
    if !p.expect("{", HighlightKind::Operator) {
        return Err(ParseFailure::Pending);
    }
    let mut cases = Vec::new();
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
        if next.is_reserved("case") || next.is_reserved("default") {
            cases.push(parse_case(p));
        } else {
            p.error("Expected 'case' or 'default'");
            p.step();
        }
    }
    Ok(SwitchStat { range: p.range_from(&start), condition, cases })
}

/// `('case' EXPR | 'default') ':' {STATEMENT}`
///
/// Statements are absorbed until one reports a mismatch, which is how the
/// next `case` or the closing brace hands control back.
fn parse_case(p: &mut ParserState) -> CaseStat {
    let start = p.next(0);
    let expr = if start.is_reserved("case") {
        p.commit(HighlightKind::Keyword);
        match parse_expr(p) {
            Ok(expr) => Some(expr),
            Err(_) => {
                p.error("Expected case value");
                None
            }
        }
    } else {
        p.commit(HighlightKind::Keyword); // 'default'
        None
    };
    p.expect(":", HighlightKind::Operator);

    let mut statements = Vec::new();
    loop {
        match parse_statement(p) {
            Ok(statement) => statements.push(statement),
            Err(ParseFailure::Pending) => {}
            Err(ParseFailure::Mismatch) => break,
        }
    }
    CaseStat { range: p.range_from(&start), expr, statements }
}

/// `'try' STATBLOCK 'catch' STATBLOCK`
fn parse_try(p: &mut ParserState) -> ParseResult<TryStat> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword);
    let try_block = match parse_statblock(p) {
        Ok(block) => block,
        Err(_) => {
            p.error("Expected block after 'try'");
            return Err(ParseFailure::Pending);
        }
    };
    if !p.expect("catch", HighlightKind::Keyword) {
        return Err(ParseFailure::Pending);
    }
    let catch_block = match parse_statblock(p) {
        Ok(block) => block,
        Err(_) => {
            p.error("Expected block after 'catch'");
            return Err(ParseFailure::Pending);
        }
    };
    Ok(TryStat { range: p.range_from(&start), try_block, catch_block })
}

/// `'return' [ASSIGN] ';'`
fn parse_return(p: &mut ParserState) -> ParseResult<ReturnStat> {
    let start = p.next(0);
    p.commit(HighlightKind::Keyword);
    let assign = if p.next(0).is_reserved(";") {
        None
    } else {
        match parse_assign(p) {
            Ok(assign) => Some(assign),
            Err(ParseFailure::Mismatch) => {
                p.error("Expected expression or ';'");
                None
            }
            Err(ParseFailure::Pending) => None,
        }
    };
    p.expect(";", HighlightKind::Operator);
    Ok(ReturnStat { range: p.range_from(&start), assign })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::BuildDiagnostics;

    #[test]
    fn case_absorbs_until_mismatch() {
        let mut diags = BuildDiagnostics::default();
        let mut p =
            ParserState::for_source("switch (x) { case 1: f(); g(); case 2: default: h(); }", &mut diags);
        let stat = parse_statement(&mut p).expect("should parse");
        assert!(!p.diags().has_errors(), "{:?}", p.diags().to_string_vec());
        match stat {
            Statement::Switch(s) => {
                assert_eq!(s.cases.len(), 3);
                assert_eq!(s.cases[0].statements.len(), 2);
                assert_eq!(s.cases[1].statements.len(), 0);
                assert!(s.cases[2].expr.is_none());
            }
            _ => panic!("expected switch"),
        }
    }

    #[test]
    fn recovery_always_progresses() {
        // arbitrary junk inside a block must neither loop forever nor panic
        let mut diags = BuildDiagnostics::default();
        let mut p = ParserState::for_source("{ ) ) class ] ; foo }", &mut diags);
        let block = parse_statblock(&mut p).expect("should parse");
        assert!(p.diags().has_errors());
        assert!(p.is_end());
        drop(block);
    }
}
