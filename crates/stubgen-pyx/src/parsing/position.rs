//! Conversion from tokenizer positions to byte offsets
//!
//! A [`PositionMap`] borrows the buffer it describes, so it can never outlive
//! or disagree with that buffer. The line-start table is computed on first use
//! and reused for every later lookup on the same map.

use once_cell::unsync::OnceCell;

use super::tokenizer::Position;

/// Lazily memoized line-start table for one text buffer
#[derive(Debug)]
pub struct PositionMap<'a> {
    text: &'a str,
    line_starts: OnceCell<Vec<usize>>,
}

impl<'a> PositionMap<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            line_starts: OnceCell::new(),
        }
    }

    /// The buffer this map was built for
    pub fn text(&self) -> &'a str {
        self.text
    }

    fn line_starts(&self) -> &[usize] {
        self.line_starts.get_or_init(|| {
            let bytes = self.text.as_bytes();
            let mut starts = vec![0];
            let mut idx = 0;
            while idx < bytes.len() {
                match bytes[idx] {
                    b'\r' if bytes.get(idx + 1) == Some(&b'\n') => {
                        idx += 2;
                        starts.push(idx);
                    }
                    b'\n' | b'\r' => {
                        idx += 1;
                        starts.push(idx);
                    }
                    _ => idx += 1,
                }
            }
            starts
        })
    }

    /// Number of lines in the buffer, counting a trailing empty line
    pub fn line_count(&self) -> usize {
        self.line_starts().len()
    }

    /// Byte offset of `position` in the buffer
    ///
    /// Lines past the end clamp to the end of the buffer; columns are clamped
    /// to the buffer length.
    pub fn offset(&self, position: Position) -> usize {
        let starts = self.line_starts();
        let Some(&line_start) = position
            .line
            .checked_sub(1)
            .and_then(|index| starts.get(index))
        else {
            return if position.line == 0 { 0 } else { self.text.len() };
        };
        (line_start + position.column).min(self.text.len())
    }

    /// Text of a 1-based line, including its line break
    pub fn line_text(&self, line: usize) -> &'a str {
        let start = self.offset(Position::new(line, 0));
        let end = self.offset(Position::new(line + 1, 0));
        &self.text[start..end.max(start)]
    }

    /// Text between two positions
    pub fn slice(&self, start: Position, end: Position) -> &'a str {
        let start = self.offset(start);
        let end = self.offset(end).max(start);
        &self.text[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        let map = PositionMap::new("ab\ncde\n\nf");
        assert_eq!(map.offset(Position::new(1, 0)), 0);
        assert_eq!(map.offset(Position::new(1, 1)), 1);
        assert_eq!(map.offset(Position::new(2, 0)), 3);
        assert_eq!(map.offset(Position::new(2, 2)), 5);
        assert_eq!(map.offset(Position::new(4, 0)), 8);
        assert_eq!(map.line_count(), 4);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let map = PositionMap::new("ab\ncd");
        assert_eq!(map.offset(Position::new(10, 0)), 5);
        assert_eq!(map.offset(Position::new(2, 99)), 5);
        assert_eq!(map.offset(Position::new(0, 3)), 0);
    }

    #[test]
    fn test_line_text_and_slice() {
        let map = PositionMap::new("first\r\nsecond\nthird");
        assert_eq!(map.line_text(1), "first\r\n");
        assert_eq!(map.line_text(2), "second\n");
        assert_eq!(map.line_text(3), "third");
        assert_eq!(map.line_text(4), "");
        assert_eq!(
            map.slice(Position::new(1, 2), Position::new(2, 3)),
            "rst\r\nsec"
        );
    }

    #[test]
    fn test_map_agrees_with_tokenizer() {
        let source = "def f(a,\n      b): pass\n";
        let map = PositionMap::new(source);
        for token in super::super::tokenizer::tokenize(source) {
            assert_eq!(map.slice(token.start, token.end), token.text);
        }
    }
}
