//! Diagnostic collection and rendering

use lb_program::Program;
use lb_span::{LineIndex, Position};
use miette::{
    Diagnostic, GraphicalReportHandler, GraphicalTheme, LabeledSpan, NamedSource, Severity,
    SourceCode, SourceSpan,
};
use std::fmt::{self, Write as _};

use crate::error::BorrowError;

/// Collects diagnostics in emission order.
///
/// The checker emits in program order, so the collected list is already
/// ordered by position.
#[derive(Debug, Default)]
pub struct DiagnosticReporter {
    diagnostics: Vec<BorrowError>,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: BorrowError) {
        tracing::debug!(kind = %error.kind(), %error, "violation");
        self.diagnostics.push(error);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[BorrowError] {
        &self.diagnostics
    }

    /// Ends collection. An empty list means the program is well-formed.
    pub fn finish(self) -> Vec<BorrowError> {
        self.diagnostics
    }
}

/// Renders diagnostics as plain text, one block per error:
///
/// ```text
/// error[borrowck::owner_access]: cannot assign to `a` because it is exclusively borrowed by `foo`
///  --> statement 2: a = a + 1
///   = help: ...
/// ```
///
/// When the program carries source text and the statement has a span, the
/// location is given as `path:line:column` instead.
pub fn render_text(program: &Program, errors: &[BorrowError]) -> String {
    let lines = program
        .source
        .as_ref()
        .map(|source| LineIndex::new(&source.text));
    let mut out = String::new();
    for error in errors {
        let _ = writeln!(out, "error[{}]: {error}", error.kind().code());
        if let Some(position) = error.position() {
            let _ = writeln!(out, " --> {}", locate(program, lines.as_ref(), position));
        }
        if let Some(help) = error.help() {
            let _ = writeln!(out, "  = help: {help}");
        }
        out.push('\n');
    }
    out
}

fn locate(program: &Program, lines: Option<&LineIndex>, position: &Position) -> String {
    if let (Some(span), Some(lines), Some(source)) = (position.span, lines, &program.source) {
        let (line, column) = lines.line_col(span.span.start as usize);
        return format!("{}:{line}:{column}", source.path);
    }
    match program.statements.get(position.index) {
        Some(stmt) if !position.end_of_program => format!("{position}: {}", stmt.kind),
        _ => position.to_string(),
    }
}

/// Renders one diagnostic against the program's source text.
///
/// Returns `None` unless the program carries source text and the diagnostic
/// points at a statement with a span.
pub fn render_graphical(program: &Program, error: &BorrowError) -> Option<String> {
    let source = program.source.as_ref()?;
    let span = error.position()?.span?;
    let located = Located {
        error,
        source: NamedSource::new(&source.path, source.text.clone()),
        span: SourceSpan::from(span.range()),
    };
    let mut out = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
        .render_report(&mut out, &located)
        .ok()?;
    Some(out)
}

/// A borrow error attached to the source it was raised against
struct Located<'a> {
    error: &'a BorrowError,
    source: NamedSource<String>,
    span: SourceSpan,
}

impl fmt::Debug for Located<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.error, f)
    }
}

impl fmt::Display for Located<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.error, f)
    }
}

impl std::error::Error for Located<'_> {}

impl Diagnostic for Located<'_> {
    fn code<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        self.error.code()
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Error)
    }

    fn help<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        self.error.help()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.error.label()),
            self.span,
        ))))
    }
}
