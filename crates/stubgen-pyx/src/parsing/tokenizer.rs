//! Lossless tokenizer for Python and Cython source text
//!
//! The tokenizer never fails. Characters it cannot classify and strings that
//! are never closed come back as [`TokenKind::ErrorToken`] so callers can
//! decide whether that matters to them. The preprocessor only needs comment,
//! bracket, colon and semicolon positions; the declaration parser reports
//! error tokens as syntax errors.

use std::fmt;

/// A (line, column) location; lines are 1-based, columns are 0-based byte offsets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Op,
    Comment,
    /// End of a logical line
    Newline,
    /// Line break inside brackets, or ending a blank / comment-only line
    NonLogicalNewline,
    ErrorToken,
    EndOfFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: Position,
    pub end: Position,
}

impl Token<'_> {
    /// Whether this token is the operator `op`
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    /// Whether this token is the name (or soft keyword) `name`
    pub fn is_name(&self, name: &str) -> bool {
        self.kind == TokenKind::Name && self.text == name
    }

    pub fn is_newline(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Newline | TokenKind::NonLogicalNewline
        )
    }
}

const THREE_CHAR_OPS: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const TWO_CHAR_OPS: &[&str] = &[
    "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "@=", ":=", "<>",
];
const ONE_CHAR_OPS: &[u8] = b"+-*/%@&|^~<>()[]{},:;.=!";

/// Valid string prefixes, compared case-insensitively
const STRING_PREFIXES: &[&str] = &[
    "r", "u", "b", "f", "t", "br", "rb", "fr", "rf", "tr", "rt", "c",
];

/// Tokenize `source` completely, ending with a [`TokenKind::EndOfFile`] token
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Tokenizer::new(source).collect()
}

/// Streaming tokenizer over one source buffer
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    line_start: usize,
    depth: usize,
    line_has_content: bool,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            line_start: 0,
            depth: 0,
            line_has_content: false,
            finished: false,
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.pos - self.line_start)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.source.as_bytes().get(self.pos + ahead).copied()
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn make(&mut self, kind: TokenKind, start_offset: usize, start: Position) -> Token<'a> {
        if !matches!(
            kind,
            TokenKind::Comment
                | TokenKind::Newline
                | TokenKind::NonLogicalNewline
                | TokenKind::EndOfFile
        ) {
            self.line_has_content = true;
        }
        Token {
            kind,
            text: &self.source[start_offset..self.pos],
            start,
            end: self.current_position(),
        }
    }

    /// Length of a line break starting at the current position, if any
    fn newline_len(&self) -> Option<usize> {
        match (self.peek(0), self.peek(1)) {
            (Some(b'\r'), Some(b'\n')) => Some(2),
            (Some(b'\n' | b'\r'), _) => Some(1),
            _ => None,
        }
    }

    fn advance_line(&mut self, newline_len: usize) {
        self.pos += newline_len;
        self.line += 1;
        self.line_start = self.pos;
    }

    fn lex_newline(&mut self, len: usize) -> Token<'a> {
        let start_offset = self.pos;
        let start = self.current_position();
        let kind = if self.depth == 0 && self.line_has_content {
            TokenKind::Newline
        } else {
            TokenKind::NonLogicalNewline
        };
        if kind == TokenKind::Newline {
            self.line_has_content = false;
        }
        let text = &self.source[start_offset..start_offset + len];
        self.advance_line(len);
        Token {
            kind,
            text,
            start,
            end: Position::new(start.line, start.column + len),
        }
    }

    fn lex_comment(&mut self) -> Token<'a> {
        let start_offset = self.pos;
        let start = self.current_position();
        let len = self
            .rest()
            .find(['\n', '\r'])
            .unwrap_or(self.source.len() - self.pos);
        self.pos += len;
        self.make(TokenKind::Comment, start_offset, start)
    }

    fn lex_name_or_string(&mut self) -> Token<'a> {
        let start_offset = self.pos;
        let start = self.current_position();
        let len = self
            .rest()
            .char_indices()
            .find(|(_, c)| !is_identifier_continue(*c))
            .map_or(self.source.len() - self.pos, |(idx, _)| idx);
        let word = &self.source[start_offset..start_offset + len];
        self.pos += len;
        if matches!(self.peek(0), Some(b'"' | b'\'')) && is_string_prefix(word) {
            return self.lex_string(start_offset, start);
        }
        self.make(TokenKind::Name, start_offset, start)
    }

    /// Lex a string literal whose opening quote is at the current position
    fn lex_string(&mut self, start_offset: usize, start: Position) -> Token<'a> {
        let Some(quote) = self.peek(0) else {
            return self.make(TokenKind::ErrorToken, start_offset, start);
        };
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        loop {
            let Some(byte) = self.peek(0) else {
                // Unterminated at end of input
                return self.make(TokenKind::ErrorToken, start_offset, start);
            };
            match byte {
                b'\\' => {
                    self.pos += 1;
                    if let Some(len) = self.newline_len() {
                        self.advance_line(len);
                    } else if let Some(ch) = self.rest().chars().next() {
                        self.pos += ch.len_utf8();
                    }
                }
                b'\n' | b'\r' => {
                    if !triple {
                        return self.make(TokenKind::ErrorToken, start_offset, start);
                    }
                    let len = self.newline_len().unwrap_or(1);
                    self.advance_line(len);
                }
                b if b == quote => {
                    if !triple {
                        self.pos += 1;
                        return self.make(TokenKind::String, start_offset, start);
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        self.pos += 3;
                        return self.make(TokenKind::String, start_offset, start);
                    }
                    self.pos += 1;
                }
                _ => {
                    let len = self.rest().chars().next().map_or(1, char::len_utf8);
                    self.pos += len;
                }
            }
        }
    }

    fn lex_number(&mut self) -> Token<'a> {
        let start_offset = self.pos;
        let start = self.current_position();
        let is_hex_like = self.rest().len() > 1
            && self.peek(0) == Some(b'0')
            && matches!(self.peek(1), Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B'));
        let mut previous = 0u8;
        while let Some(byte) = self.peek(0) {
            let exponent_sign =
                matches!(byte, b'+' | b'-') && matches!(previous, b'e' | b'E') && !is_hex_like;
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.' || exponent_sign {
                previous = byte;
                self.pos += 1;
            } else {
                break;
            }
        }
        self.make(TokenKind::Number, start_offset, start)
    }

    fn lex_operator(&mut self) -> Token<'a> {
        let start_offset = self.pos;
        let start = self.current_position();
        let rest = self.rest();
        let len = if THREE_CHAR_OPS.iter().any(|op| rest.starts_with(op)) {
            3
        } else if TWO_CHAR_OPS.iter().any(|op| rest.starts_with(op)) {
            2
        } else if rest
            .as_bytes()
            .first()
            .is_some_and(|b| ONE_CHAR_OPS.contains(b))
        {
            1
        } else {
            let len = rest.chars().next().map_or(1, char::len_utf8);
            self.pos += len;
            return self.make(TokenKind::ErrorToken, start_offset, start);
        };
        self.pos += len;
        match &self.source[start_offset..self.pos] {
            "(" | "[" | "{" => self.depth += 1,
            ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.make(TokenKind::Op, start_offset, start)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.finished {
            return None;
        }
        loop {
            let Some(byte) = self.peek(0) else {
                let start = self.current_position();
                if self.line_has_content {
                    self.line_has_content = false;
                    return Some(Token {
                        kind: TokenKind::Newline,
                        text: "",
                        start,
                        end: start,
                    });
                }
                self.finished = true;
                return Some(Token {
                    kind: TokenKind::EndOfFile,
                    text: "",
                    start,
                    end: start,
                });
            };

            match byte {
                b' ' | b'\t' | b'\x0c' => self.pos += 1,
                b'\n' | b'\r' => {
                    let len = self.newline_len().unwrap_or(1);
                    return Some(self.lex_newline(len));
                }
                b'\\' => {
                    let start_offset = self.pos;
                    let start = self.current_position();
                    self.pos += 1;
                    if let Some(len) = self.newline_len() {
                        self.advance_line(len);
                    } else {
                        return Some(self.make(TokenKind::ErrorToken, start_offset, start));
                    }
                }
                b'#' => return Some(self.lex_comment()),
                b'"' | b'\'' => {
                    let start_offset = self.pos;
                    let start = self.current_position();
                    return Some(self.lex_string(start_offset, start));
                }
                b'0'..=b'9' => return Some(self.lex_number()),
                b'.' if self.peek(1).is_some_and(|b| b.is_ascii_digit()) => {
                    return Some(self.lex_number());
                }
                _ => {
                    let starts_identifier = self
                        .rest()
                        .chars()
                        .next()
                        .is_some_and(is_identifier_start);
                    if starts_identifier {
                        return Some(self.lex_name_or_string());
                    }
                    return Some(self.lex_operator());
                }
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_string_prefix(word: &str) -> bool {
    STRING_PREFIXES
        .iter()
        .any(|prefix| prefix.eq_ignore_ascii_case(word))
}
