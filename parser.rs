// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The AngelScript parser

This module is responsible to turn the token sequence produced by the
[`crate::lexer`] into the [`crate::ast`] tree.

The core of it is the [`ParserState`] that holds the cursor over the tokens,
the highlight classifications, and the memoization cache for speculatively
parsed productions. The submodules hold the actual grammar functions.

Grammar functions return [`ParseResult`]: `Err(Mismatch)` means the first
token did not belong to the production and the cursor has not moved, so the
caller may try an alternative. `Err(Pending)` means the production started
but failed partway through; diagnostics have been emitted and the cursor is
past the consumed prefix, so the caller must not try an alternative at this
position.
*/

use crate::ast::{EntityAttributes, ScopeNode, TypeNode};
use crate::diagnostics::{BuildDiagnostics, SourceFile, Span, Spanned};
use crate::highlight::{HighlightKind, Highlights};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::rc::Rc;

mod declarations;
mod expressions;
mod statements;
mod types;

pub use declarations::parse_script;
pub use expressions::{parse_assign, parse_expr};
pub use statements::parse_statement;
pub use types::parse_type;

/// Each parser submodule simply does `use super::prelude::*` to import the
/// typically used items
mod prelude {
    pub use super::{ParseFailure, ParseResult, ParserState, TokenRef};
    pub use crate::ast::*;
    pub use crate::highlight::HighlightKind;
    #[cfg(test)]
    pub use angelscript_parser_test_macro::parser_test;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Reserved,
    Comment,
    Unknown,
    /// The synthetic token returned when peeking past the end of the stream
    Eof,
}

/// Whether a number literal is an integer, `float` or `double`
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum NumberKind {
    #[default]
    Integer,
    Float,
    Double,
}

/// The property bag of a reserved word or mark, filled from the tables in
/// [`crate::lexer`]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ReservedProperties {
    pub is_prime_type: bool,
    pub is_expr_pre_op: bool,
    pub is_expr_op: bool,
    pub is_assign_op: bool,
    pub is_math_op: bool,
    pub is_comp_op: bool,
    pub is_logic_op: bool,
    pub is_bit_op: bool,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub span: Span,
    pub source_file: SourceFile,
    /// Position in the comment-stripped token sequence handed to the parser.
    /// Virtual tokens reuse the index of their first underlying token.
    pub index: usize,
    pub number_kind: NumberKind,
    pub props: ReservedProperties,
}

impl Default for Token {
    fn default() -> Self {
        Token {
            kind: TokenKind::Eof,
            text: Default::default(),
            span: Default::default(),
            source_file: Default::default(),
            index: usize::MAX,
            number_kind: Default::default(),
            props: Default::default(),
        }
    }
}

impl Token {
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Shorthand for comparing the token text
    pub fn is(&self, text: &str) -> bool {
        self.text.as_str() == text
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_reserved(&self, text: &str) -> bool {
        self.kind == TokenKind::Reserved && self.is(text)
    }
}

impl Spanned for Token {
    fn span(&self) -> Span {
        self.span.clone()
    }

    fn source_file(&self) -> Option<&SourceFile> {
        Some(&self.source_file)
    }
}

pub type TokenRef = Rc<Token>;

/// True when `b` directly follows `a` with no whitespace or comment between
pub fn tokens_adjacent(a: &Token, b: &Token) -> bool {
    a.index + 1 == b.index && a.span.is_valid() && b.span.is_valid() && a.span.end() == b.span.offset
}

/// Create a virtual token covering `parts`, carrying the given text.
///
/// Virtual tokens are synthesized for composite operators the lexer keeps
/// split (`>>`, `>>>=`, `!is`, ...); they are never inserted into the input
/// stream.
pub fn synthesize_token(parts: &[&TokenRef], text: &str) -> TokenRef {
    debug_assert!(!parts.is_empty());
    let span = parts.iter().fold(Span::default(), |acc, t| acc.cover(&t.span));
    Rc::new(Token {
        kind: TokenKind::Reserved,
        text: text.into(),
        span,
        source_file: parts[0].source_file.clone(),
        index: parts[0].index,
        number_kind: Default::default(),
        props: crate::lexer::reserved_properties(text),
    })
}

/// How a grammar function failed
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ParseFailure {
    /// The first token did not match the production; the cursor has not
    /// advanced and the caller may try an alternative
    Mismatch,
    /// The production started but failed partway through; diagnostics have
    /// been emitted and the cursor is past the consumed prefix
    Pending,
}

pub type ParseResult<T> = Result<T, ParseFailure>;

/// The productions whose speculative parses are memoized
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) enum CacheKind {
    Scope,
    TypeTemplates,
    EntityAttributes,
}

/// A memoized parse: the produced node (or `None` for "tried and failed")
/// and the cursor position after the parse
#[derive(Clone)]
pub(crate) enum CachedValue {
    Scope(Option<Rc<ScopeNode>>),
    TypeTemplates(Option<Vec<Rc<TypeNode>>>),
    EntityAttributes(Option<EntityAttributes>),
}

#[derive(Clone)]
struct CacheEntry {
    value: CachedValue,
    end: usize,
}

/// Cursor over the token sequence, with diagnostics emission, highlight
/// classification, backtracking and memoization
pub struct ParserState<'a> {
    tokens: Vec<TokenRef>,
    cursor: usize,
    eof: TokenRef,
    diags: &'a mut BuildDiagnostics,
    highlights: Highlights,
    caches: HashMap<(CacheKind, usize), CacheEntry>,
}

impl<'a> ParserState<'a> {
    /// `tokens` must already be comment-stripped and contiguously indexed,
    /// see [`prepare_tokens`]
    pub fn new(tokens: Vec<TokenRef>, diags: &'a mut BuildDiagnostics) -> Self {
        let eof = Rc::new(Token {
            span: tokens.last().map(|t| Span::new(t.span.end(), 0)).unwrap_or_default(),
            source_file: tokens
                .first()
                .map(|t| t.source_file.clone())
                .unwrap_or_default(),
            index: tokens.len(),
            ..Default::default()
        });
        Self { tokens, cursor: 0, eof, diags, highlights: Highlights::default(), caches: HashMap::new() }
    }

    /// Constructor that lexes the given source, for tests and one-shot use
    pub fn for_source(source: &str, diags: &'a mut BuildDiagnostics) -> Self {
        let file = Rc::new(crate::diagnostics::SourceFileInner::new(
            std::path::PathBuf::from("<memory>"),
            source.to_string(),
        ));
        let tokens = prepare_tokens(crate::lexer::lex(source, &file, diags));
        Self::new(tokens, diags)
    }

    /// Peek the token at cursor + `offset` without consuming.
    /// Offsets past the end return the synthetic end-of-file token.
    pub fn next(&self, offset: usize) -> TokenRef {
        self.tokens.get(self.cursor + offset).unwrap_or(&self.eof).clone()
    }

    /// The last committed token
    pub fn prev(&self) -> TokenRef {
        if self.cursor == 0 {
            return self.next(0);
        }
        self.tokens.get(self.cursor - 1).unwrap_or(&self.eof).clone()
    }

    /// True when the cursor is past the last token
    pub fn is_end(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Classify the current token for highlighting and advance the cursor
    pub fn commit(&mut self, kind: HighlightKind) {
        if let Some(t) = self.tokens.get(self.cursor) {
            self.highlights.classify(t.clone(), kind);
            self.cursor += 1;
        }
    }

    /// Classify a virtual token and advance the cursor past its `count`
    /// underlying tokens
    pub fn commit_virtual(&mut self, virt: &TokenRef, count: usize, kind: HighlightKind) {
        self.highlights.classify(virt.clone(), kind);
        self.cursor = (self.cursor + count).min(self.tokens.len());
    }

    /// Advance the cursor without classification (error recovery)
    pub fn step(&mut self) {
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
    }

    /// Rewind the cursor to a previously observed token
    pub fn backtrack(&mut self, token: &TokenRef) {
        debug_assert!(token.index <= self.tokens.len());
        self.cursor = token.index.min(self.tokens.len());
    }

    /// If the current token text equals `text`, commit it and return true.
    /// Otherwise emit a diagnostic and return false, leaving the cursor
    /// unchanged.
    pub fn expect(&mut self, text: &str, kind: HighlightKind) -> bool {
        if self.next(0).is(text) {
            self.commit(kind);
            true
        } else {
            self.error(format!("Expected '{text}'"));
            false
        }
    }

    /// Emit an error diagnostic at the current token's location
    pub fn error(&mut self, message: impl Into<String>) {
        let location = self.next(0).to_source_location();
        self.diags.push_error_with_span(message.into(), location);
    }

    /// Emit an error diagnostic at the given token's location
    pub fn error_on(&mut self, token: &Token, message: impl Into<String>) {
        self.diags.push_error_with_span(message.into(), token.to_source_location());
    }

    pub fn diags(&self) -> &BuildDiagnostics {
        self.diags
    }

    /// Give up the state, returning the collected highlight classifications
    pub fn into_highlights(self) -> Highlights {
        self.highlights
    }

    /// Enforce the closing of a separated list: accept `close` (commit and
    /// stop), else accept `sep` when allowed (commit and continue), else
    /// diagnose and stop. Returns true to continue with the next item.
    pub fn expect_continuous_or_close(&mut self, sep: &str, close: &str, allow_sep: bool) -> bool {
        let next = self.next(0);
        if next.is(close) {
            self.commit(HighlightKind::Operator);
            false
        } else if allow_sep && next.is(sep) {
            self.commit(HighlightKind::Operator);
            true
        } else {
            self.error(format!("Expected '{sep}' or '{close}'"));
            false
        }
    }

    /// The node range from `start` to the last committed token. Falls back
    /// to `start` alone when nothing was consumed.
    pub fn range_from(&self, start: &TokenRef) -> crate::ast::NodeRange {
        let end = self.prev();
        if end.index < start.index || end.kind == TokenKind::Eof {
            crate::ast::NodeRange::single(start.clone())
        } else {
            crate::ast::NodeRange::new(start.clone(), end)
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.cursor
    }

    /// Check the memoization cache for `kind` at the current cursor. On a
    /// hit, the cursor is advanced to the cached end position.
    pub(crate) fn cache_restore(&mut self, kind: CacheKind) -> Option<CachedValue> {
        let entry = self.caches.get(&(kind, self.cursor))?.clone();
        self.cursor = entry.end;
        Some(entry.value)
    }

    /// Store the parse that started at `start` and ended at the current
    /// cursor into the memoization cache
    pub(crate) fn cache_store(&mut self, kind: CacheKind, start: usize, value: CachedValue) {
        self.caches.insert((kind, start), CacheEntry { value, end: self.cursor });
    }

    /// Peek the binary expression operator at the cursor, synthesizing the
    /// composite operators the lexer keeps split. Returns the (possibly
    /// virtual) operator token and the number of underlying tokens.
    pub(crate) fn peek_expr_operator(&self) -> Option<(TokenRef, usize)> {
        let t0 = self.next(0);
        if t0.is_reserved(">") {
            let t1 = self.next(1);
            if tokens_adjacent(&t0, &t1) {
                if t1.is("=") {
                    return Some((synthesize_token(&[&t0, &t1], ">="), 2));
                }
                if t1.is(">") {
                    let t2 = self.next(2);
                    if tokens_adjacent(&t1, &t2) {
                        if t2.is("=") {
                            // '>>=' is an assignment operator
                            return None;
                        }
                        if t2.is(">") {
                            let t3 = self.next(3);
                            if tokens_adjacent(&t2, &t3) && t3.is("=") {
                                // '>>>='
                                return None;
                            }
                            return Some((synthesize_token(&[&t0, &t1, &t2], ">>>"), 3));
                        }
                    }
                    return Some((synthesize_token(&[&t0, &t1], ">>"), 2));
                }
            }
            return Some((t0, 1));
        }
        if t0.is_reserved("!") {
            let t1 = self.next(1);
            if t1.is_reserved("is") && tokens_adjacent(&t0, &t1) {
                return Some((synthesize_token(&[&t0, &t1], "!is"), 2));
            }
        }
        if t0.kind == TokenKind::Reserved && t0.props.is_expr_op {
            return Some((t0, 1));
        }
        None
    }

    /// Peek the assignment operator at the cursor, synthesizing `>>=` and
    /// `>>>=` from split right-angle tokens
    pub(crate) fn peek_assign_operator(&self) -> Option<(TokenRef, usize)> {
        let t0 = self.next(0);
        if t0.is_reserved(">") {
            let t1 = self.next(1);
            if t1.is(">") && tokens_adjacent(&t0, &t1) {
                let t2 = self.next(2);
                if t2.is("=") && tokens_adjacent(&t1, &t2) {
                    return Some((synthesize_token(&[&t0, &t1, &t2], ">>="), 3));
                }
                if t2.is(">") && tokens_adjacent(&t1, &t2) {
                    let t3 = self.next(3);
                    if t3.is("=") && tokens_adjacent(&t2, &t3) {
                        return Some((synthesize_token(&[&t0, &t1, &t2, &t3], ">>>="), 4));
                    }
                }
            }
            return None;
        }
        if t0.kind == TokenKind::Reserved && t0.props.is_assign_op {
            return Some((t0, 1));
        }
        None
    }
}

/// Strip comment tokens and re-index the sequence for the parser
pub fn prepare_tokens(tokens: Vec<Token>) -> Vec<TokenRef> {
    tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .enumerate()
        .map(|(index, t)| Rc::new(Token { index, ..t }))
        .collect()
}

/// Parse a whole source text into a [`crate::ast::Script`]
pub fn parse(
    source: &str,
    path: Option<&std::path::Path>,
    diags: &mut BuildDiagnostics,
) -> (crate::ast::Script, Highlights) {
    let file = Rc::new(crate::diagnostics::SourceFileInner::new(
        path.map(|p| p.to_path_buf()).unwrap_or_default(),
        source.to_string(),
    ));
    let tokens = prepare_tokens(crate::lexer::lex(source, &file, diags));
    parse_prepared_tokens(tokens, diags)
}

/// Parse an already prepared token sequence
pub fn parse_prepared_tokens(
    tokens: Vec<TokenRef>,
    diags: &mut BuildDiagnostics,
) -> (crate::ast::Script, Highlights) {
    let mut state = ParserState::new(tokens, diags);
    let script = declarations::parse_script(&mut state);
    (script, state.into_highlights())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_tokens(source: &str) -> Vec<TokenRef> {
        let file = Rc::new(crate::diagnostics::SourceFileInner::new(
            std::path::PathBuf::from("<test>"),
            source.to_string(),
        ));
        let mut diags = BuildDiagnostics::default();
        prepare_tokens(crate::lexer::lex(source, &file, &mut diags))
    }

    #[test]
    fn peeking_past_the_end_returns_eof() {
        let mut diags = BuildDiagnostics::default();
        let ps = ParserState::new(state_tokens("a b"), &mut diags);
        assert_eq!(ps.next(0).as_str(), "a");
        assert_eq!(ps.next(1).as_str(), "b");
        assert_eq!(ps.next(2).kind(), TokenKind::Eof);
        assert_eq!(ps.next(100).kind(), TokenKind::Eof);
    }

    #[test]
    fn backtrack_restores_the_cursor() {
        let mut diags = BuildDiagnostics::default();
        let mut ps = ParserState::new(state_tokens("a b c"), &mut diags);
        let snapshot = ps.next(0);
        ps.commit(HighlightKind::Variable);
        ps.commit(HighlightKind::Variable);
        assert_eq!(ps.next(0).as_str(), "c");
        ps.backtrack(&snapshot);
        assert_eq!(ps.next(0).as_str(), "a");
    }

    #[test]
    fn expect_leaves_cursor_on_mismatch() {
        let mut diags = BuildDiagnostics::default();
        let mut ps = ParserState::new(state_tokens("a"), &mut diags);
        assert!(!ps.expect(";", HighlightKind::Operator));
        assert_eq!(ps.next(0).as_str(), "a");
        assert!(ps.diags().has_errors());
    }

    #[test]
    fn shift_operators_are_synthesized_from_adjacent_tokens() {
        let mut diags = BuildDiagnostics::default();
        let ps = ParserState::new(state_tokens(">>"), &mut diags);
        let (op, count) = ps.peek_expr_operator().unwrap();
        assert_eq!(op.as_str(), ">>");
        assert_eq!(count, 2);
        assert!(op.props.is_bit_op);

        // a space between the tokens prevents the synthesis
        let ps = ParserState::new(state_tokens("> >"), &mut diags);
        let (op, count) = ps.peek_expr_operator().unwrap();
        assert_eq!(op.as_str(), ">");
        assert_eq!(count, 1);

        let ps = ParserState::new(state_tokens(">>>="), &mut diags);
        assert!(ps.peek_expr_operator().is_none());
        let (op, count) = ps.peek_assign_operator().unwrap();
        assert_eq!(op.as_str(), ">>>=");
        assert_eq!(count, 4);
    }

    #[test]
    fn not_is_needs_adjacency() {
        let mut diags = BuildDiagnostics::default();
        let ps = ParserState::new(state_tokens("!is"), &mut diags);
        let (op, count) = ps.peek_expr_operator().unwrap();
        assert_eq!(op.as_str(), "!is");
        assert_eq!(count, 2);

        let ps = ParserState::new(state_tokens("! is"), &mut diags);
        assert!(ps.peek_expr_operator().is_none());
    }

    #[test]
    fn cache_restores_value_and_cursor() {
        let mut diags = BuildDiagnostics::default();
        let mut ps = ParserState::new(state_tokens("shared abstract class"), &mut diags);
        assert!(ps.cache_restore(CacheKind::EntityAttributes).is_none());
        let start = ps.position();
        ps.commit(HighlightKind::Keyword);
        ps.commit(HighlightKind::Keyword);
        let attrs = EntityAttributes { is_shared: true, is_abstract: true, ..Default::default() };
        ps.cache_store(CacheKind::EntityAttributes, start, CachedValue::EntityAttributes(Some(attrs)));

        let snapshot = ps.next(0);
        let first = ps.tokens[0].clone();
        ps.backtrack(&first);
        match ps.cache_restore(CacheKind::EntityAttributes) {
            Some(CachedValue::EntityAttributes(Some(restored))) => assert_eq!(restored, attrs),
            _ => panic!("cache miss"),
        }
        assert_eq!(ps.position(), snapshot.index);
    }
}
