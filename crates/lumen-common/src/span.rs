use serde::Serialize;

/// Byte-offset span into source text. Start is inclusive, end is exclusive.
///
/// All positions in the Lumen compiler are tracked as byte offsets into the
/// original source string. Tokens additionally carry the 1-based line and
/// column at which they start; everything downstream converts offsets back
/// to (line, column) on demand via [`LineIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The slice of `source` this span refers to.
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.start as usize..self.end as usize]
    }
}

/// Pre-computed index of line start positions for on-demand line/column
/// lookup and source-line reconstruction in diagnostics.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line. The first entry is always 0.
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build a line index by scanning the source text for newline characters.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a 1-based (line, column) pair.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = self.line_starts.partition_point(|&start| start <= offset);
        let line_idx = line_idx.saturating_sub(1);
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Return the full text of the 1-based line `line` (without the
    /// trailing newline), or `None` if the line does not exist.
    pub fn line_text<'src>(&self, source: &'src str, line: u32) -> Option<&'src str> {
        let idx = line.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)? as usize;
        let end = match self.line_starts.get(idx + 1) {
            Some(&next) => (next as usize).saturating_sub(1),
            None => source.len(),
        };
        Some(&source[start..end.max(start)])
    }

    /// Return the number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_and_len() {
        let span = Span::new(5, 10);
        assert_eq!(span.start, 5);
        assert_eq!(span.end, 10);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
    }

    #[test]
    fn span_empty() {
        let span = Span::new(3, 3);
        assert_eq!(span.len(), 0);
        assert!(span.is_empty());
    }

    #[test]
    fn span_merge_and_text() {
        let a = Span::new(0, 5);
        let b = Span::new(6, 11);
        assert_eq!(a.merge(b), Span::new(0, 11));
        assert_eq!(a.text("hello world"), "hello");
        assert_eq!(b.text("hello world"), "world");
    }

    #[test]
    fn line_index_multiple_lines() {
        let src = "hello\nworld\nfoo";
        let idx = LineIndex::new(src);
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(6), (2, 1));
        assert_eq!(idx.line_col(12), (3, 1));
        assert_eq!(idx.line_col(13), (3, 2));
        assert_eq!(idx.line_count(), 3);
    }

    #[test]
    fn line_index_line_text() {
        let src = "ab\ncd\n";
        let idx = LineIndex::new(src);
        assert_eq!(idx.line_text(src, 1), Some("ab"));
        assert_eq!(idx.line_text(src, 2), Some("cd"));
        assert_eq!(idx.line_text(src, 3), Some(""));
        assert_eq!(idx.line_text(src, 4), None);
    }
}
