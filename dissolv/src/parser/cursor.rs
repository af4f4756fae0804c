//! Line-indexed source text and the per-pass scan cursor.
//!
//! The board file is read once and split into lines, remembering the byte
//! offset at which each line starts. Scan passes walk this index with a
//! `ScanCursor`; footprint records store their span so later passes can jump
//! straight to them instead of re-reading from the top of the file.

use std::path::Path;

use crate::parser::board_schema::RecordSpan;

/// Board file contents with a line index
#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    text: String,
    line_starts: Vec<usize>,
}

impl Source {
    pub fn new(text: impl Into<String>, name: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = Vec::new();
        if !text.is_empty() {
            line_starts.push(0);
            for (i, b) in text.bytes().enumerate() {
                if b == b'\n' && i + 1 < text.len() {
                    line_starts.push(i + 1);
                }
            }
        }
        Self {
            name: name.into(),
            text,
            line_starts,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        Ok(Self::new(text, name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line `idx` without its trailing newline (and carriage return).
    pub fn line(&self, idx: usize) -> Option<&str> {
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or(self.text.len());
        let line = &self.text[start..end];
        Some(line.trim_end_matches('\n').trim_end_matches('\r'))
    }

    /// Byte offset of the first character of line `idx`.
    pub fn offset_of(&self, idx: usize) -> usize {
        self.line_starts
            .get(idx)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Index of the line containing byte `offset`.
    pub fn line_at_offset(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    /// Find the line that closes the record opened on `start`, by balancing
    /// parentheses outside quoted strings. Falls back to the last line when
    /// the record never closes.
    pub fn record_span(&self, start: usize) -> RecordSpan {
        let mut depth: i64 = 0;
        let mut opened = false;
        let mut end = self.line_count().saturating_sub(1);

        'lines: for idx in start..self.line_count() {
            let line = self.line(idx).unwrap_or("");
            let mut in_string = false;
            let mut escaped = false;
            for ch in line.chars() {
                if in_string {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == '"' {
                        in_string = false;
                    }
                    continue;
                }
                match ch {
                    '"' => in_string = true,
                    '(' => {
                        depth += 1;
                        opened = true;
                    }
                    ')' => depth -= 1,
                    _ => {}
                }
            }
            if opened && depth <= 0 {
                end = idx;
                break 'lines;
            }
        }

        RecordSpan {
            start_line: start,
            end_line: end,
            offset: self.offset_of(start),
        }
    }

    pub fn cursor(&self) -> ScanCursor<'_> {
        ScanCursor::new(self)
    }
}

/// Sequential reader over a `Source`, owned by one scan pass
#[derive(Debug, Clone)]
pub struct ScanCursor<'a> {
    source: &'a Source,
    next: usize,
    last: Option<usize>,
}

impl<'a> ScanCursor<'a> {
    pub fn new(source: &'a Source) -> Self {
        Self {
            source,
            next: 0,
            last: None,
        }
    }

    pub fn source(&self) -> &'a Source {
        self.source
    }

    /// Read the next line, returning its index and text.
    pub fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let idx = self.next;
        let line = self.source.line(idx)?;
        self.next += 1;
        self.last = Some(idx);
        Some((idx, line))
    }

    /// Index of the line returned by the last `next_line` call.
    pub fn last_line(&self) -> Option<usize> {
        self.last
    }

    pub fn seek_line(&mut self, idx: usize) {
        self.next = idx;
        self.last = None;
    }

    pub fn seek_offset(&mut self, offset: usize) {
        let idx = self.source.line_at_offset(offset);
        self.seek_line(idx);
    }

    /// Skip the lines of a record that has already been consumed.
    pub fn skip_past(&mut self, span: &RecordSpan) {
        if span.end_line >= self.next {
            self.next = span.end_line + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_and_offsets() {
        let source = Source::new("(a\n  (b 1)\r\n)\n", "t.kicad_pcb");
        assert_eq!(source.line_count(), 3);
        assert_eq!(source.line(0), Some("(a"));
        assert_eq!(source.line(1), Some("  (b 1)"));
        assert_eq!(source.line(2), Some(")"));
        assert_eq!(source.line(3), None);
        assert_eq!(source.offset_of(1), 3);
        assert_eq!(source.line_at_offset(3), 1);
        assert_eq!(source.line_at_offset(5), 1);
    }

    #[test]
    fn test_record_span_ignores_quoted_parens() {
        let text = "(footprint \"X(1)\"\n\t(layer \"F.Cu\")\n\t(descr \")\")\n)\n(segment\n)\n";
        let source = Source::new(text, "t");
        let span = source.record_span(0);
        assert_eq!(span.start_line, 0);
        assert_eq!(span.end_line, 3);
        assert_eq!(span.offset, 0);
        assert!(span.contains_line(2));
        assert!(!span.contains_line(4));
    }

    #[test]
    fn test_single_line_record_span() {
        let source = Source::new("(net 1 \"GND\")\n(net 2 \"VCC\")\n", "t");
        let span = source.record_span(1);
        assert_eq!(span.start_line, 1);
        assert_eq!(span.end_line, 1);
    }

    #[test]
    fn test_cursor_seek_by_offset() {
        let source = Source::new("one\ntwo\nthree\n", "t");
        let mut cursor = source.cursor();
        assert_eq!(cursor.next_line(), Some((0, "one")));
        cursor.seek_offset(source.offset_of(2));
        assert_eq!(cursor.next_line(), Some((2, "three")));
        assert_eq!(cursor.last_line(), Some(2));
        assert_eq!(cursor.next_line(), None);
    }
}
