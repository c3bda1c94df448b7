// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Completion hints collected during analysis
//!
//! The analyzer appends hints to the scope that was active at the use site;
//! the language-server completer walks the scope tree and turns them into
//! completion items.

use crate::ast::NodeRange;
use crate::parser::TokenRef;
use crate::symbols::{ResolvedType, SymbolFunction, TemplateTranslation};
use std::rc::Rc;

#[derive(Clone)]
pub enum CompletionHint {
    /// A namespace prefix was typed; complete the names in it.
    /// Covers the range from the identifier through the `::`.
    Namespace { range: NodeRange, namespace_list: Vec<TokenRef> },
    /// A member access was typed; complete the members of the target type
    Type { range: NodeRange, target: ResolvedType },
    /// Inside a call's argument list; show the signature being filled
    Arguments {
        expected_callee: Rc<SymbolFunction>,
        passing_ranges: Vec<NodeRange>,
        template_translate: Option<Rc<TemplateTranslation>>,
    },
}

impl CompletionHint {
    /// The source range the hint is anchored to, if it has one
    pub fn range(&self) -> Option<&NodeRange> {
        match self {
            CompletionHint::Namespace { range, .. } | CompletionHint::Type { range, .. } => {
                Some(range)
            }
            CompletionHint::Arguments { passing_ranges, .. } => passing_ranges.first(),
        }
    }
}
