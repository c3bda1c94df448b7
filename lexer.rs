// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! This module contains the code for the lexer.
//!
//! The lexer produces the token sequence consumed by [`crate::parser`]. Note
//! that `>` is always emitted as a single token even where `>>` or `>=` was
//! written: inside template argument lists a `>` closes the list, so the
//! parser decides per context and synthesizes the composite operators from
//! adjacent tokens. `!is` is split the same way.

use crate::diagnostics::{BuildDiagnostics, SourceFile, Span};
use crate::parser::{NumberKind, ReservedProperties, Token, TokenKind};

const PRIME_TYPES: &[&str] = &[
    "void", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32",
    "uint64", "float", "double", "bool",
];

const MATH_OPS: &[&str] = &["+", "-", "*", "/", "%", "**"];

/// Binary bit operators; `~` is only a pre-op
const BIT_OPS: &[&str] = &["&", "|", "^", "<<", ">>", ">>>"];

const COMP_OPS: &[&str] = &["==", "!=", "<", ">", "<=", ">=", "is", "!is"];

const LOGIC_OPS: &[&str] = &["&&", "||", "^^", "and", "or", "xor"];

const ASSIGN_OPS: &[&str] =
    &["=", "+=", "-=", "*=", "/=", "%=", "**=", "&=", "|=", "^=", "<<=", ">>=", ">>>="];

const PRE_OPS: &[&str] = &["-", "+", "!", "++", "--", "~", "not"];

/// Marks the lexer actually emits, longest first so the scan can take the
/// first match. The `>`-composites and `!is` are deliberately absent.
const MARKS: &[&str] = &[
    "**=", "<<=", "<<", "<=", "==", "!=", "++", "--", "**", "&&", "||", "^^", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "::", "(", ")", "{", "}", "[", "]", ",", ";", ":", ".", "?",
    "@", "~", "!", "<", ">", "=", "+", "-", "*", "/", "%", "&", "|", "^",
];

/// Reserved words that are not operator marks
const KEYWORDS: &[&str] = &[
    "abstract", "and", "auto", "bool", "break", "case", "cast", "catch", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "explicit", "external", "false",
    "final", "float", "for", "from", "funcdef", "function", "get", "if", "import", "in", "inout",
    "int", "int16", "int32", "int64", "int8", "interface", "is", "mixin", "namespace", "not",
    "null", "or", "out", "override", "private", "property", "protected", "return", "set",
    "shared", "super", "switch", "this", "true", "try", "typedef", "uint", "uint16", "uint32",
    "uint64", "uint8", "void", "while", "xor",
];

/// The property bag of a reserved word or mark. Also answers for the virtual
/// tokens the parser synthesizes (`>>`, `>>>=`, `!is`, ...), which the lexer
/// itself never emits.
pub fn reserved_properties(text: &str) -> ReservedProperties {
    let is_math_op = MATH_OPS.contains(&text);
    let is_bit_op = BIT_OPS.contains(&text);
    let is_comp_op = COMP_OPS.contains(&text);
    let is_logic_op = LOGIC_OPS.contains(&text);
    ReservedProperties {
        is_prime_type: PRIME_TYPES.contains(&text),
        is_expr_pre_op: PRE_OPS.contains(&text),
        is_expr_op: is_math_op || is_bit_op || is_comp_op || is_logic_op,
        is_assign_op: ASSIGN_OPS.contains(&text),
        is_math_op,
        is_comp_op,
        is_logic_op,
        is_bit_op,
    }
}

fn lex_whitespace(text: &str) -> usize {
    let mut len = 0;
    for c in text.chars() {
        if !c.is_whitespace() {
            break;
        }
        len += c.len_utf8();
    }
    len
}

fn lex_comment(text: &str) -> usize {
    if text.starts_with("//") {
        return text.find(['\n', '\r']).unwrap_or(text.len());
    }
    if text.starts_with("/*") {
        return match text[2..].find("*/") {
            Some(pos) => pos + 4,
            // unterminated block comments swallow the rest of the file
            None => text.len(),
        };
    }
    0
}

/// Lex a string literal. Returns the length and whether it was terminated.
fn lex_string(text: &str) -> (usize, bool) {
    // heredoc strings have no escape sequences
    if let Some(rest) = text.strip_prefix("\"\"\"") {
        return match rest.find("\"\"\"") {
            Some(pos) => (pos + 6, true),
            None => (text.len(), false),
        };
    }
    let quote = match text.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return (0, true),
    };
    let bytes = text.as_bytes();
    let mut offset = 1;
    while offset < bytes.len() {
        match bytes[offset] {
            b'\\' => offset += 2,
            b'\n' | b'\r' => break,
            c if c == quote as u8 => return (offset + 1, true),
            _ => offset += 1,
        }
    }
    (offset.min(text.len()), false)
}

fn lex_number(text: &str) -> (usize, NumberKind) {
    let bytes = text.as_bytes();
    if bytes.first().is_none_or(|c| !c.is_ascii_digit()) {
        // a leading '.' does not start a number; '.5' is member access syntax
        return (0, NumberKind::Integer);
    }

    // radix prefixed integers
    if bytes[0] == b'0' && bytes.len() > 2 {
        let digits: fn(&u8) -> bool = match bytes[1] {
            b'x' | b'X' => |c| c.is_ascii_hexdigit(),
            b'o' | b'O' => |c| (b'0'..=b'7').contains(c),
            b'b' | b'B' => |c| *c == b'0' || *c == b'1',
            b'd' | b'D' => u8::is_ascii_digit,
            _ => |_| false,
        };
        let len = bytes[2..].iter().take_while(|c| digits(*c)).count();
        if len > 0 {
            return (len + 2, NumberKind::Integer);
        }
    }

    let mut len = bytes.iter().take_while(|c| c.is_ascii_digit()).count();
    let mut is_real = false;
    if bytes.get(len) == Some(&b'.') {
        let frac = bytes[len + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
        if frac > 0 {
            is_real = true;
            len += frac + 1;
        }
    }
    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let mut exp = len + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let digits = bytes[exp..].iter().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            is_real = true;
            len = exp + digits;
        }
    }
    if matches!(bytes.get(len), Some(b'f' | b'F')) {
        return (len + 1, NumberKind::Float);
    }
    (len, if is_real { NumberKind::Double } else { NumberKind::Integer })
}

fn lex_identifier(text: &str) -> usize {
    let mut len = 0;
    for (i, c) in text.chars().enumerate() {
        if !(c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())) {
            break;
        }
        len += c.len_utf8();
    }
    len
}

fn lex_mark(text: &str) -> usize {
    MARKS.iter().find(|m| text.starts_with(*m)).map_or(0, |m| m.len())
}

/// Lex the whole source into tokens. Comments are part of the output (they
/// matter for adjacency); [`crate::parser::prepare_tokens`] strips them.
pub fn lex(mut source: &str, file: &SourceFile, diags: &mut BuildDiagnostics) -> Vec<Token> {
    let mut result: Vec<Token> = vec![];
    let mut offset = 0;
    let mut push = |kind, len: usize, offset: usize, number_kind, props, source: &str| {
        result.push(Token {
            kind,
            text: source[..len].into(),
            span: Span::new(offset, len),
            source_file: file.clone(),
            index: result.len(),
            number_kind,
            props,
        });
    };
    while !source.is_empty() {
        let ws = lex_whitespace(source);
        if ws > 0 {
            offset += ws;
            source = &source[ws..];
            continue;
        }
        let len = lex_comment(source);
        if len > 0 {
            push(TokenKind::Comment, len, offset, NumberKind::Integer, Default::default(), source);
            offset += len;
            source = &source[len..];
            continue;
        }
        let (len, terminated) = lex_string(source);
        if len > 0 {
            if terminated {
                push(
                    TokenKind::String,
                    len,
                    offset,
                    NumberKind::Integer,
                    Default::default(),
                    source,
                );
            } else {
                diags.push_error_with_span(
                    "Unterminated string literal".into(),
                    crate::diagnostics::SourceLocation {
                        source_file: Some(file.clone()),
                        span: Span::new(offset, len),
                    },
                );
                push(
                    TokenKind::Unknown,
                    len,
                    offset,
                    NumberKind::Integer,
                    Default::default(),
                    source,
                );
            }
            offset += len;
            source = &source[len..];
            continue;
        }
        let (len, number_kind) = lex_number(source);
        if len > 0 {
            push(TokenKind::Number, len, offset, number_kind, Default::default(), source);
            offset += len;
            source = &source[len..];
            continue;
        }
        let len = lex_identifier(source);
        if len > 0 {
            let text = &source[..len];
            if KEYWORDS.contains(&text) {
                push(
                    TokenKind::Reserved,
                    len,
                    offset,
                    NumberKind::Integer,
                    reserved_properties(text),
                    source,
                );
            } else {
                push(
                    TokenKind::Identifier,
                    len,
                    offset,
                    NumberKind::Integer,
                    Default::default(),
                    source,
                );
            }
            offset += len;
            source = &source[len..];
            continue;
        }
        let len = lex_mark(source);
        if len > 0 {
            let text = &source[..len];
            push(
                TokenKind::Reserved,
                len,
                offset,
                NumberKind::Integer,
                reserved_properties(text),
                source,
            );
            offset += len;
            source = &source[len..];
            continue;
        }
        // not part of the language, keep it so the parser can diagnose it
        let len = source.chars().next().map_or(1, |c| c.len_utf8());
        push(TokenKind::Unknown, len, offset, NumberKind::Integer, Default::default(), source);
        offset += len;
        source = &source[len..];
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn compare(source: &str, expected: &[(TokenKind, &str)]) {
        let file = Rc::new(crate::diagnostics::SourceFileInner::new(
            PathBuf::from("test.as"),
            source.to_string(),
        ));
        let mut diags = BuildDiagnostics::default();
        let actual = lex(source, &file, &mut diags);
        let actual = actual.iter().map(|token| (token.kind, token.text.as_str())).collect::<Vec<_>>();
        assert_eq!(actual.as_slice(), expected);
    }

    #[test]
    fn basic_lexer_test() {
        compare(
            r#"45  /*hi*/ "string""#,
            &[
                (TokenKind::Number, "45"),
                (TokenKind::Comment, "/*hi*/"),
                (TokenKind::String, r#""string""#),
            ],
        );

        compare(
            "int x=a+3;",
            &[
                (TokenKind::Reserved, "int"),
                (TokenKind::Identifier, "x"),
                (TokenKind::Reserved, "="),
                (TokenKind::Identifier, "a"),
                (TokenKind::Reserved, "+"),
                (TokenKind::Number, "3"),
                (TokenKind::Reserved, ";"),
            ],
        );

        compare(
            "a//x\nb//y\r\nc",
            &[
                (TokenKind::Identifier, "a"),
                (TokenKind::Comment, "//x"),
                (TokenKind::Identifier, "b"),
                (TokenKind::Comment, "//y"),
                (TokenKind::Identifier, "c"),
            ],
        );
    }

    #[test]
    fn right_angle_brackets_stay_split() {
        compare(
            "a>>b",
            &[
                (TokenKind::Identifier, "a"),
                (TokenKind::Reserved, ">"),
                (TokenKind::Reserved, ">"),
                (TokenKind::Identifier, "b"),
            ],
        );
        compare(
            "a>>>=b",
            &[
                (TokenKind::Identifier, "a"),
                (TokenKind::Reserved, ">"),
                (TokenKind::Reserved, ">"),
                (TokenKind::Reserved, ">"),
                (TokenKind::Reserved, "="),
                (TokenKind::Identifier, "b"),
            ],
        );
        // but the left ones do not
        compare(
            "a<<=b",
            &[
                (TokenKind::Identifier, "a"),
                (TokenKind::Reserved, "<<="),
                (TokenKind::Identifier, "b"),
            ],
        );
    }

    #[test]
    fn number_kinds() {
        let file = Rc::new(crate::diagnostics::SourceFileInner::new(
            PathBuf::from("test.as"),
            String::new(),
        ));
        let mut diags = BuildDiagnostics::default();
        let kinds: Vec<_> = lex("1 0xFF 1.5 1e3 2.5f 0b101", &file, &mut diags)
            .iter()
            .map(|t| (t.text.to_string(), t.number_kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("1".into(), NumberKind::Integer),
                ("0xFF".into(), NumberKind::Integer),
                ("1.5".into(), NumberKind::Double),
                ("1e3".into(), NumberKind::Double),
                ("2.5f".into(), NumberKind::Float),
                ("0b101".into(), NumberKind::Integer),
            ]
        );
    }

    #[test]
    fn member_access_on_number_is_not_a_real() {
        compare(
            "a.5",
            &[
                (TokenKind::Identifier, "a"),
                (TokenKind::Reserved, "."),
                (TokenKind::Number, "5"),
            ],
        );
    }

    #[test]
    fn unterminated_string_is_diagnosed() {
        let file = Rc::new(crate::diagnostics::SourceFileInner::new(
            PathBuf::from("test.as"),
            String::new(),
        ));
        let mut diags = BuildDiagnostics::default();
        let tokens = lex("\"abc", &file, &mut diags);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert!(diags.has_errors());
    }

    #[test]
    fn reserved_word_properties() {
        assert!(reserved_properties("int").is_prime_type);
        assert!(reserved_properties("+").is_math_op);
        assert!(reserved_properties("+").is_expr_op);
        assert!(reserved_properties(">>").is_bit_op);
        assert!(reserved_properties(">>>=").is_assign_op);
        assert!(reserved_properties("!is").is_comp_op);
        assert!(reserved_properties("and").is_logic_op);
        assert!(reserved_properties("not").is_expr_pre_op);
        assert!(!reserved_properties("class").is_expr_op);
    }
}
