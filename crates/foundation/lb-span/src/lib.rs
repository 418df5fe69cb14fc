//! Source spans and statement positions

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("file#{_0}")]
pub struct FileId(pub u32);

impl FileId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A byte offset span in a source file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("{start}..{end}")]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A span with associated file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileSpan {
    #[serde(default = "FileSpan::default_file")]
    pub file: FileId,
    #[serde(flatten)]
    pub span: Span,
}

impl FileSpan {
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }

    fn default_file() -> FileId {
        FileId(0)
    }
}

/// Where in a program a diagnostic was raised.
///
/// `index` is the zero-based statement index. Destruction events fired by the
/// implicit exit of the outermost scope carry `index == statement count`,
/// one past the last statement, and are displayed as "end of program".
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<FileSpan>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub end_of_program: bool,
}

impl Position {
    pub fn statement(index: usize, span: Option<FileSpan>) -> Self {
        Self {
            index,
            span,
            end_of_program: false,
        }
    }

    pub fn end_of_program(statement_count: usize) -> Self {
        Self {
            index: statement_count,
            span: None,
            end_of_program: true,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end_of_program {
            write!(f, "end of program")
        } else {
            write!(f, "statement {}", self.index)
        }
    }
}

/// Maps byte offsets to 1-based line and column numbers
///
/// Columns count characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(offset, _)| offset + 1))
            .collect();
        Self {
            text: text.to_string(),
            line_starts,
        }
    }

    /// Returns `(line, column)`, both starting at 1
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        // Offsets inside a character or past the end fall back to bytes
        let column = self
            .text
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        (line + 1, column + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_maps_offsets() {
        let index = LineIndex::new("let a = 5;\nlet b = &a;\n");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(4), (1, 5));
        assert_eq!(index.line_col(11), (2, 1));
        assert_eq!(index.line_col(15), (2, 5));
    }

    #[test]
    fn line_index_counts_characters() {
        let text = "let é = 5;
let ß = &é;
";
        let index = LineIndex::new(text);
        let second = text.find("= &").unwrap();
        assert_eq!(index.line_col(text.find('5').unwrap()), (1, 9));
        assert_eq!(index.line_col(second), (2, 7));
        assert_eq!(index.line_col(text.rfind('é').unwrap()), (2, 10));
    }

    #[test]
    fn position_display() {
        assert_eq!(Position::statement(3, None).to_string(), "statement 3");
        assert_eq!(Position::end_of_program(7).to_string(), "end of program");
    }

    #[test]
    fn empty_span() {
        assert!(Span::new(4, 4).is_empty());
        assert_eq!(Span::new(2, 9).len(), 7);
        assert_eq!(Span::new(2, 9).to_string(), "2..9");
    }
}
