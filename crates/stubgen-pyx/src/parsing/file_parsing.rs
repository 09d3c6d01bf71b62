//! File-level preprocessing: `include` expansion and `= *` placeholders

use std::{fs, path::Path};

use cow_utils::CowUtils;
use log::{debug, warn};
use ruff_python_ast::Expr;

use super::{
    position::PositionMap,
    preprocess::{TextEdit, apply_edits},
    tokenizer::{Token, TokenKind, tokenize},
};

/// Prepare raw file contents for [`super::preprocess::preprocess`]
///
/// Line endings are normalized first. `include` directives are only expanded
/// when the path of the including file is known.
pub fn file_parsing_preprocess(source_path: Option<&Path>, code: &str) -> String {
    let code = code.cow_replace("\r\n", "\n");
    let code = match source_path {
        Some(path) => expand_includes(path, &code),
        None => code.into_owned(),
    };
    replace_equals_star(&code)
}

/// Substitute `include "file"` directives with the referenced file's text
pub fn expand_includes(source_path: &Path, code: &str) -> String {
    let map = PositionMap::new(code);
    let base = source_path.parent().unwrap_or_else(|| Path::new(""));
    let mut edits = Vec::new();
    let mut previous: Option<Token<'_>> = None;

    for token in tokenize(code) {
        if token.kind == TokenKind::String
            && let Some(include) = previous.filter(|prev| prev.is_name("include"))
        {
            let replacement = match string_literal_value(token.text) {
                Some(relative) => read_include(&base.join(relative)),
                None => {
                    warn!("Ignoring include with non-string argument {}", token.text);
                    "\n".to_string()
                }
            };
            edits.push(TextEdit::replace(
                map.offset(include.start),
                map.offset(token.end),
                replacement,
            ));
        }
        previous = Some(token);
    }
    apply_edits(code, edits)
}

/// Rewrite the `= *` default placeholder of declaration files to `= ...`
pub fn replace_equals_star(code: &str) -> String {
    let map = PositionMap::new(code);
    let tokens = tokenize(code);
    let edits = tokens
        .windows(2)
        .filter(|pair| pair[0].is_op("=") && pair[1].is_op("*"))
        .map(|pair| {
            TextEdit::replace(map.offset(pair[1].start), map.offset(pair[1].end), "...")
        })
        .collect();
    apply_edits(code, edits)
}

fn read_include(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => {
            debug!("Expanded include {}", path.display());
            text.cow_replace("\r\n", "\n").into_owned()
        }
        Err(err) => {
            warn!("Could not read include {}: {err}", path.display());
            "\n".to_string()
        }
    }
}

/// Evaluate a Python string literal token, rejecting bytes and f-strings
fn string_literal_value(literal: &str) -> Option<String> {
    let parsed = ruff_python_parser::parse_expression(literal).ok()?;
    match parsed.into_expr() {
        Expr::StringLiteral(string) => Some(string.value.to_str().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_replace_equals_star() {
        assert_eq!(
            replace_equals_star("cdef int f(int x = *)\ny = a * b\n"),
            "cdef int f(int x = ...)\ny = a * b\n"
        );
    }

    #[test]
    fn test_expand_includes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("inc.pxi"), "def helper(): pass\n").unwrap();
        let main = dir.path().join("main.pyx");

        let code = "include \"inc.pxi\"\nx = 1\n";
        assert_eq!(
            expand_includes(&main, code),
            "def helper(): pass\n\nx = 1\n"
        );
    }

    #[test]
    fn test_missing_include_becomes_newline() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.pyx");
        assert_eq!(
            expand_includes(&main, "include 'missing.pxi'\nx = 1\n"),
            "\n\nx = 1\n"
        );
    }

    #[test]
    fn test_non_string_include_argument() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.pyx");
        assert_eq!(expand_includes(&main, "include b'x.pxi'\n"), "\n\n");
    }

    #[test]
    fn test_includes_need_a_path() {
        let code = "include 'inc.pxi'\r\nx = 1\r\n";
        assert_eq!(
            file_parsing_preprocess(None, code),
            "include 'inc.pxi'\nx = 1\n"
        );
    }
}
