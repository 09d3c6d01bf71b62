//! Text-level rewrites that turn Cython source into one-statement-per-line form
//!
//! Each stage tokenizes its input, computes the spans it wants to rewrite and
//! applies them right to left, so offsets computed on the input stay valid
//! while the buffer is edited.

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    position::PositionMap,
    tokenizer::{Position, Token, TokenKind, tokenize},
};

static LEADING_TABS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\t+").expect("leading tab pattern is valid")
});

static LINE_CONTINUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\\n\s*").expect("line continuation pattern is valid")
});

/// Keywords that open an indented block when followed by a top-level colon
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "else", "elif", "for", "while", "with", "try", "except", "finally", "def", "class",
    "cdef", "cpdef", "ctypedef", "async", "match", "case",
];

/// Replacement of a byte span in a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
    /// Also remove whitespace that directly follows the span
    pub strip_following: bool,
}

impl TextEdit {
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
            strip_following: false,
        }
    }

    #[must_use]
    pub fn stripping_following(mut self) -> Self {
        self.strip_following = true;
        self
    }
}

/// Apply edits rightmost first
pub fn apply_edits(text: &str, mut edits: Vec<TextEdit>) -> String {
    if edits.is_empty() {
        return text.to_string();
    }
    edits.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut result = text.to_string();
    for edit in edits {
        let start = edit.start.min(result.len());
        let mut end = edit.end.clamp(start, result.len());
        if edit.strip_following {
            let tail = &result[end..];
            end += tail.len() - tail.trim_start().len();
        }
        result.replace_range(start..end, &edit.replacement);
    }
    result
}

/// Run every preprocessing stage in order
pub fn preprocess(code: &str) -> String {
    let stages: [(&str, fn(&str) -> String); 6] = [
        ("replace_tabs_with_spaces", replace_tabs_with_spaces),
        ("remove_comments", remove_comments),
        ("collapse_line_continuations", collapse_line_continuations),
        ("remove_contained_newlines", remove_contained_newlines),
        ("expand_colons", expand_colons),
        ("expand_semicolons", expand_semicolons),
    ];

    let mut code = code.to_string();
    for (name, stage) in stages {
        code = stage(&code);
        trace!("Preprocessing stage {name} produced {} bytes", code.len());
    }
    debug!("Preprocessed {} lines", code.lines().count());
    code
}

/// Replace each leading tab with four spaces
pub fn replace_tabs_with_spaces(code: &str) -> String {
    LEADING_TABS
        .replace_all(code, |caps: &regex::Captures<'_>| "    ".repeat(caps[0].len()))
        .into_owned()
}

/// Replace every comment with a single space
pub fn remove_comments(code: &str) -> String {
    let map = PositionMap::new(code);
    let edits = tokenize(code)
        .into_iter()
        .filter(|token| token.kind == TokenKind::Comment)
        .map(|token| TextEdit::replace(map.offset(token.start), map.offset(token.end), " "))
        .collect();
    apply_edits(code, edits)
}

/// Collapse backslash line continuations into a single space
pub fn collapse_line_continuations(code: &str) -> String {
    LINE_CONTINUATION.replace_all(code, " ").into_owned()
}

/// Remove line breaks nested inside brackets
pub fn remove_contained_newlines(code: &str) -> String {
    let map = PositionMap::new(code);
    let mut brackets: Vec<&str> = Vec::new();
    let mut edits = Vec::new();

    for token in tokenize(code) {
        if token.kind == TokenKind::Op && closing_bracket(token.text).is_some() {
            brackets.push(token.text);
        } else if let Some(open) = brackets.last()
            && closing_bracket(open) == Some(token.text)
        {
            brackets.pop();
        } else if token.kind == TokenKind::NonLogicalNewline && !brackets.is_empty() {
            let start = map.offset(token.start);
            edits.push(TextEdit::replace(start, start + token.text.len(), ""));
        }
    }
    apply_edits(code, edits)
}

/// Move the body of a one-line compound statement onto its own indented line
pub fn expand_colons(code: &str) -> String {
    let map = PositionMap::new(code);
    let mut edits = Vec::new();

    for colon in block_colon_positions(&tokenize(code)) {
        let line = map.line_text(colon.line);
        let tail = line.get(colon.column + 1..).unwrap_or_default();
        if tail.trim().is_empty() {
            continue;
        }
        let replacement = format!(":\n{}    ", line_indentation(line));
        trace!("Expanding block colon at {colon}");
        let start = map.offset(colon);
        edits.push(TextEdit::replace(start, start + 1, replacement).stripping_following());
    }
    apply_edits(code, edits)
}

/// Split semicolon-separated statements onto lines with the same indentation
pub fn expand_semicolons(code: &str) -> String {
    let map = PositionMap::new(code);
    let mut edits = Vec::new();

    for token in tokenize(code) {
        if !token.is_op(";") {
            continue;
        }
        let line = map.line_text(token.start.line);
        let start = map.offset(token.start);
        let tail = line.get(token.end.column..).unwrap_or_default();
        if tail.trim().is_empty() {
            // Trailing semicolon, nothing to split
            edits.push(TextEdit::replace(start, start + 1, ""));
            continue;
        }
        let replacement = format!("\n{}", line_indentation(line));
        edits.push(TextEdit::replace(start, start + 1, replacement).stripping_following());
    }
    apply_edits(code, edits)
}

/// Positions of colons that end the header of a compound statement
///
/// Only the first top-level colon of each logical segment is considered;
/// a header with a top-level `=` is an assignment and never opens a block.
fn block_colon_positions(tokens: &[Token<'_>]) -> Vec<Position> {
    let mut results = Vec::new();
    let mut brackets: Vec<&str> = Vec::new();
    let mut segment: Vec<&Token<'_>> = Vec::new();
    let mut seen_colon = false;
    let mut seen_equals = false;

    for token in tokens {
        if token.is_newline() || token.is_op(";") || token.kind == TokenKind::EndOfFile {
            segment.clear();
            seen_colon = false;
            seen_equals = false;
            continue;
        }
        if token.kind == TokenKind::Op && closing_bracket(token.text).is_some() {
            brackets.push(token.text);
        } else if let Some(open) = brackets.last()
            && closing_bracket(open) == Some(token.text)
        {
            brackets.pop();
        } else if token.is_op("=") && brackets.is_empty() {
            seen_equals = true;
        } else if token.is_op(":") && brackets.is_empty() && !seen_colon {
            seen_colon = true;
            if !seen_equals && is_block_header(&segment) {
                results.push(token.start);
            }
        }
        segment.push(token);
    }
    results
}

fn is_block_header(segment: &[&Token<'_>]) -> bool {
    segment
        .first()
        .is_some_and(|first| first.kind == TokenKind::Name && COMPOUND_KEYWORDS.contains(&first.text))
}

fn closing_bracket(open: &str) -> Option<&'static str> {
    match open {
        "(" => Some(")"),
        "[" => Some("]"),
        "{" => Some("}"),
        _ => None,
    }
}

fn line_indentation(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t', '\x0c']);
    &line[..line.len() - trimmed.len()]
}
