// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Span represent an error location within a file.
///
/// It is an offset in bytes within the file + the corresponding length.
#[derive(Debug, Clone)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn is_valid(&self) -> bool {
        self.offset != usize::MAX
    }

    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// The smallest span covering both `self` and `other`
    pub fn cover(&self, other: &Span) -> Span {
        if !self.is_valid() {
            return other.clone();
        }
        if !other.is_valid() {
            return self.clone();
        }
        let offset = self.offset.min(other.offset);
        let end = (self.offset + self.length).max(other.offset + other.length);
        Span { offset, length: end - offset }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

impl Default for Span {
    fn default() -> Self {
        Span { offset: usize::MAX, length: 0 }
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Span) -> bool {
        self.offset == other.offset && self.length == other.length
    }
}

/// Returns a span.  This is implemented for tokens and nodes
pub trait Spanned {
    fn span(&self) -> Span;
    fn source_file(&self) -> Option<&SourceFile>;
    fn to_source_location(&self) -> SourceLocation {
        SourceLocation { source_file: self.source_file().cloned(), span: self.span() }
    }
}

#[derive(Default)]
pub struct SourceFileInner {
    path: PathBuf,

    /// Complete source code of the path, used to map from offset to line number
    source: Option<String>,

    /// The offset of each linebreak
    line_offsets: std::cell::OnceCell<Vec<usize>>,
}

impl std::fmt::Debug for SourceFileInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.path)
    }
}

impl SourceFileInner {
    pub fn new(path: PathBuf, source: String) -> Self {
        Self { path, source: Some(source), line_offsets: Default::default() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a SourceFile that has just a path, but no contents
    pub fn from_path_only(path: PathBuf) -> Rc<Self> {
        Rc::new(Self { path, ..Default::default() })
    }

    /// Returns a tuple with the line (starting at 1) and column number (starting at 1)
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let line_offsets = self.line_offsets();
        line_offsets.binary_search(&offset).map_or_else(
            |line| {
                if line == 0 {
                    (1, offset + 1)
                } else {
                    let line_begin = *line_offsets.get(line - 1).unwrap_or(&0);
                    (line + 1, offset - line_begin + 1)
                }
            },
            |line| (line + 2, 1),
        )
    }

    fn line_offsets(&self) -> &[usize] {
        self.line_offsets.get_or_init(|| {
            self.source
                .as_ref()
                .map(|s| {
                    s.bytes()
                        .enumerate()
                        // Add the offset one past the '\n' into the index: That's the first char
                        // of the new line!
                        .filter_map(|(i, c)| if c == b'\n' { Some(i + 1) } else { None })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

pub type SourceFile = Rc<SourceFileInner>;

pub fn load_from_path(path: &Path) -> Result<String, Diagnostic> {
    std::fs::read_to_string(path).map_err(|err| Diagnostic {
        message: format!("Could not load {}: {}", path.display(), err),
        span: SourceLocation {
            source_file: Some(SourceFileInner::from_path_only(path.to_owned())),
            span: Default::default(),
        },
        level: DiagnosticLevel::Error,
    })
}

#[derive(Debug, Clone, Default)]
pub struct SourceLocation {
    pub source_file: Option<SourceFile>,
    pub span: Span,
}

impl Spanned for SourceLocation {
    fn span(&self) -> Span {
        self.span.clone()
    }

    fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(sf) = &self.source_file {
            let (line, col) = sf.line_column(self.span.offset);
            write!(f, "{}:{line}:{col}", sf.path().display())
        } else {
            write!(f, "<unknown>")
        }
    }
}

/// This enum describes the level or severity of a diagnostic message
#[derive(Debug, PartialEq, Copy, Clone, Default)]
#[non_exhaustive]
pub enum DiagnosticLevel {
    /// The diagnostic found is an error that prevents further analysis
    #[default]
    Error,
    /// The diagnostic found is a warning
    Warning,
    /// The diagnostic is a note to further help with the error or warning
    Note,
}

/// This structure represent a diagnostic emitted while processing a script.
///
/// It is basically a message, a level (warning or error), attached to a
/// position in the code
#[derive(Debug, Clone)]
pub struct Diagnostic {
    message: String,
    span: SourceLocation,
    level: DiagnosticLevel,
}

impl Diagnostic {
    /// Return the level for this diagnostic
    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }

    /// Return a message for this diagnostic
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns a tuple with the line (starting at 1) and column number (starting at 1)
    ///
    /// Can also return (0, 0) if the span is invalid
    pub fn line_column(&self) -> (usize, usize) {
        if !self.span.span.is_valid() {
            return (0, 0);
        }
        let offset = self.span.span.offset;

        match &self.span.source_file {
            None => (0, 0),
            Some(sl) => sl.line_column(offset),
        }
    }

    /// Return the length of this diagnostic in UTF-8 encoded bytes
    pub fn length(&self) -> usize {
        self.span.span.length
    }

    /// Return the path of the source file where this error is attached
    pub fn source_file(&self) -> Option<&Path> {
        self.span.source_file().map(|sf| sf.path())
    }

    /// The location this diagnostic is attached to
    pub fn location(&self) -> &SourceLocation {
        &self.span
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(sf) = self.span.source_file() {
            let (line, col) = self.line_column();
            write!(f, "{}:{}:{}: {}", sf.path().display(), line, col, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

#[derive(Default)]
pub struct BuildDiagnostics {
    inner: Vec<Diagnostic>,
}

impl IntoIterator for BuildDiagnostics {
    type Item = Diagnostic;
    type IntoIter = <Vec<Diagnostic> as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl BuildDiagnostics {
    pub fn push_diagnostic_with_span(
        &mut self,
        message: String,
        span: SourceLocation,
        level: DiagnosticLevel,
    ) {
        debug_assert!(
            !message.as_str().ends_with('.'),
            "Error message should not end with a period: ({message:?})"
        );
        self.inner.push(Diagnostic { message, span, level });
    }

    pub fn push_error_with_span(&mut self, message: String, span: SourceLocation) {
        self.push_diagnostic_with_span(message, span, DiagnosticLevel::Error)
    }

    pub fn push_error(&mut self, message: String, source: &dyn Spanned) {
        self.push_error_with_span(message, source.to_source_location());
    }

    pub fn push_warning_with_span(&mut self, message: String, span: SourceLocation) {
        self.push_diagnostic_with_span(message, span, DiagnosticLevel::Warning)
    }

    pub fn push_warning(&mut self, message: String, source: &dyn Spanned) {
        self.push_warning_with_span(message, source.to_source_location());
    }

    pub fn push_note_with_span(&mut self, message: String, span: SourceLocation) {
        self.push_diagnostic_with_span(message, span, DiagnosticLevel::Note)
    }

    pub fn push_note(&mut self, message: String, source: &dyn Spanned) {
        self.push_note_with_span(message, source.to_source_location());
    }

    pub fn push_internal_error(&mut self, err: Diagnostic) {
        self.inner.push(err)
    }

    /// Return true if there is at least one error diagnostic
    pub fn has_errors(&self) -> bool {
        self.inner.iter().any(|diag| diag.level == DiagnosticLevel::Error)
    }

    /// Return true if there are no diagnostics (warnings or errors); false otherwise
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn to_string_vec(&self) -> Vec<String> {
        self.inner.iter().map(|d| d.to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.inner.iter()
    }

    #[cfg(feature = "display-diagnostics")]
    fn call_diagnostics(&self) -> String {
        use annotate_snippets::{Level, Renderer, Snippet};

        let mut output = String::new();
        for d in self.inner.iter() {
            let level = match d.level {
                DiagnosticLevel::Error => Level::Error,
                DiagnosticLevel::Warning => Level::Warning,
                DiagnosticLevel::Note => Level::Note,
            };
            let message = level.title(d.message());
            let path;
            let message = match &d.span.source_file {
                Some(sf) if d.span.span.is_valid() && sf.source().is_some() => {
                    let source = sf.source().unwrap();
                    path = sf.path().to_string_lossy().to_string();
                    let start = d.span.span.offset.min(source.len());
                    let end = d.span.span.end().clamp(start, source.len());
                    message.snippet(
                        Snippet::source(source)
                            .origin(&path)
                            .fold(true)
                            .annotation(level.span(start..end)),
                    )
                }
                _ => message,
            };
            output.push_str(&Renderer::styled().render(message).to_string());
            output.push('\n');
        }
        output
    }

    #[cfg(feature = "display-diagnostics")]
    /// Print the diagnostics on the console
    pub fn print(self) {
        let to_print = self.call_diagnostics();
        if !to_print.is_empty() {
            eprintln!("{to_print}");
        }
    }

    #[cfg(feature = "display-diagnostics")]
    /// Print into a string
    pub fn diagnostics_as_string(self) -> String {
        self.call_diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_offset_line_column_mapping() {
        let content = r#"class Greeter {
    string name;
    Greeter(string n) { name = n; }
    void greet() {
        print("hello " + name);
    }
}
"#
        .to_string();
        let sf = SourceFileInner::new(PathBuf::from("foo.as"), content.clone());

        let mut line = 1;
        let mut column = 1;
        for offset in 0..content.len() {
            let b = *content.as_bytes().get(offset).unwrap();

            assert_eq!(sf.line_column(offset), (line, column));

            if b == b'\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
    }

    #[test]
    fn test_span_cover() {
        let a = Span::new(4, 3);
        let b = Span::new(10, 5);
        assert_eq!(a.cover(&b), Span::new(4, 11));
        assert_eq!(b.cover(&a), Span::new(4, 11));
        assert_eq!(Span::default().cover(&a), a);
    }
}
