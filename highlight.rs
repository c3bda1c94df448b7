// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Token classifications for semantic highlighting
//!
//! The parser classifies every committed token; the analyzer appends
//! reclassifications once it knows what an identifier resolves to. Entries
//! are kept in emission order and later entries win.

use crate::parser::TokenRef;
use std::collections::HashMap;

/// What a token should be highlighted as.
///
/// The numeric value is the index into the semantic token legend announced to
/// the language client.
#[repr(u32)]
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    num_enum::IntoPrimitive,
    num_enum::TryFromPrimitive,
    strum::Display,
)]
pub enum HighlightKind {
    Operator,
    Builtin,
    Keyword,
    Namespace,
    Type,
    Class,
    Interface,
    Enum,
    EnumMember,
    Function,
    Variable,
    Parameter,
    Number,
    String,
    Decorator,
}

/// The classification sink filled by the parser and the analyzer
#[derive(Default)]
pub struct Highlights {
    entries: Vec<(TokenRef, HighlightKind)>,
}

impl Highlights {
    pub fn classify(&mut self, token: TokenRef, kind: HighlightKind) {
        self.entries.push((token, kind));
    }

    /// All classifications in emission order, including superseded ones
    pub fn entries(&self) -> &[(TokenRef, HighlightKind)] {
        &self.entries
    }

    /// The effective classification per token index (later entries win)
    pub fn resolved(&self) -> HashMap<usize, HighlightKind> {
        self.entries.iter().map(|(t, k)| (t.index, *k)).collect()
    }

    /// The effective classification of the given token, if any
    pub fn kind_of(&self, token: &TokenRef) -> Option<HighlightKind> {
        self.entries.iter().rev().find(|(t, _)| t.index == token.index).map(|(_, k)| *k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_classification_wins() {
        let token = crate::parser::Token::default();
        let token = std::rc::Rc::new(crate::parser::Token { index: 3, ..token });
        let mut h = Highlights::default();
        h.classify(token.clone(), HighlightKind::Variable);
        h.classify(token.clone(), HighlightKind::Function);
        assert_eq!(h.kind_of(&token), Some(HighlightKind::Function));
        assert_eq!(h.resolved()[&3], HighlightKind::Function);
    }

    #[test]
    fn numeric_encoding_round_trips() {
        let kind = HighlightKind::EnumMember;
        let raw: u32 = kind.into();
        assert_eq!(HighlightKind::try_from(raw), Ok(kind));
    }
}
