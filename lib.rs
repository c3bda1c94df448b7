// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

#![doc = include_str!("README.md")]
// It would be nice to keep the frontend free of unsafe code
#![deny(unsafe_code)]

use std::path::Path;
use std::rc::Rc;

pub mod analyzer;
pub mod ast;
pub mod completion;
pub mod diagnostics;
pub mod highlight;
pub mod lexer;
pub mod parser;
pub mod symbols;
pub mod typeregister;

use analyzer::AnalyzeCtx;
use diagnostics::BuildDiagnostics;
use highlight::Highlights;
use smol_str::SmolStr;
use symbols::ScopeRef;

/// FrontendConfiguration allows configuring different aspects of the
/// analysis.
#[derive(Clone)]
pub struct FrontendConfiguration {
    /// The name of the template type that `T[]` array syntax is sugar for
    pub array_type: SmolStr,
    /// The name of the type string literals resolve to
    pub string_type: SmolStr,
    /// How many candidate notes to attach to an overload mismatch error
    pub max_signature_notes: usize,
}

impl Default for FrontendConfiguration {
    fn default() -> Self {
        Self { array_type: "array".into(), string_type: "string".into(), max_signature_notes: 3 }
    }
}

/// Everything one run of the front end produces
pub struct Analysis {
    pub script: Rc<ast::Script>,
    pub global_scope: ScopeRef,
    pub highlights: Highlights,
    pub diagnostics: BuildDiagnostics,
}

/// Analyze an already parsed script: seed the global scope with the
/// built-in types, hoist the declarations, then run the analysis queue
pub fn analyze(
    script: &ast::Script,
    config: &FrontendConfiguration,
    diags: &mut BuildDiagnostics,
    highlights: &mut Highlights,
) -> ScopeRef {
    let (global_scope, builtins, mut queue) = typeregister::builtin_global_scope();
    queue.extend(analyzer::hoist::hoist(script, &global_scope, false, diags));

    let mut ctx = AnalyzeCtx { diags, highlights, builtins: &builtins, config };
    analyzer::run(queue, &mut ctx);
    global_scope
}

/// Parse and analyze a source text in one go
pub fn process(
    source: &str,
    path: Option<&Path>,
    config: &FrontendConfiguration,
) -> Analysis {
    let mut diagnostics = BuildDiagnostics::default();
    let (script, mut highlights) = parser::parse(source, path, &mut diagnostics);
    let script = Rc::new(script);
    let global_scope = analyze(&script, config, &mut diagnostics, &mut highlights);
    Analysis { script, global_scope, highlights, diagnostics }
}

/// Like [`process`], loading the source from disk first
pub fn process_file<P: AsRef<Path>>(
    path: P,
    config: &FrontendConfiguration,
) -> Result<Analysis, diagnostics::Diagnostic> {
    let source = diagnostics::load_from_path(path.as_ref())?;
    Ok(process(&source, Some(path.as_ref()), config))
}
