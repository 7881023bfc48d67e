//! Source locations.
//!
//! Every token and AST node carries a [`Span`]. The span's `start_line` is the
//! line reported in diagnostics, so it is computed once by the lexer and never
//! recomputed downstream.

use serde::{Deserialize, Serialize};

/// Byte offsets of every line start, for O(log n) line/column lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// `line_starts[0] == 0`: line 1 starts at byte 0.
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self { line_starts }
    }

    /// 1-indexed line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line = (line_idx + 1) as u32;
        let col = (offset - self.line_starts[line_idx] + 1) as u32;
        (line, col)
    }

    /// Number of lines in the indexed source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// A contiguous region of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the start (inclusive).
    pub start: usize,
    /// Byte offset of the end (exclusive).
    pub end: usize,
    /// 1-indexed line of the start.
    pub start_line: u32,
    /// 1-indexed column of the start.
    pub start_col: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, start_line: u32, start_col: u32) -> Self {
        Self {
            start,
            end,
            start_line,
            start_col,
        }
    }

    /// Span for synthesized nodes and for diagnostics with no location.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// The line reported for this span; `0` means "no location".
    pub fn line(&self) -> u32 {
        self.start_line
    }

    pub fn is_dummy(&self) -> bool {
        self.start_line == 0
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (start_line, start_col) = if self.start <= other.start {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line,
            start_col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_lookup() {
        let source = "int main() {\n    return 0;\n}";
        let index = LineIndex::new(source);
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(4), (1, 5));
        assert_eq!(index.line_col(13), (2, 1));
        assert_eq!(index.line_col(17), (2, 5));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn merge_keeps_earliest_position() {
        let a = Span::new(10, 15, 2, 3);
        let b = Span::new(0, 5, 1, 1);
        let merged = a.merge(b);
        assert_eq!((merged.start, merged.end), (0, 15));
        assert_eq!(merged.line(), 1);
    }

    #[test]
    fn dummy_has_no_line() {
        assert!(Span::dummy().is_dummy());
        assert!(!Span::new(0, 1, 1, 1).is_dummy());
    }
}
