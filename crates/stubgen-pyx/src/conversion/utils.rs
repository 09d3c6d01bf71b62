//! Text helpers shared by the converter

use std::borrow::Cow;

use ruff_python_ast::str::{Quote, TripleQuotes};
use ruff_python_literal::escape::{AsciiEscape, UnicodeEscape};
use ruff_python_trivia::textwrap::dedent;

use crate::{
    parsing::{position::PositionMap, tokenizer::Position},
    syntax::{Expression, Span},
};

/// Placeholder emitted for expressions that are not safe to transcribe
pub const ELLIPSIS: &str = "...";

/// Whole source lines covered by `span`, dedented and right-trimmed
pub fn get_source(map: &PositionMap<'_>, span: Span) -> String {
    let text = map.slice(
        Position::new(span.start.line, 0),
        Position::new(span.end.line + 1, 0),
    );
    dedent(text).trim_end().to_string()
}

/// Render a literal-safe expression as stub text
///
/// None, names, numbers, booleans and string or bytes literals are written
/// out; anything else degrades to `...`.
pub fn unparse_expression(expression: &Expression) -> Cow<'_, str> {
    match expression {
        Expression::None => Cow::Borrowed("None"),
        Expression::Name(name) => Cow::Borrowed(name),
        Expression::Number(number) => Cow::Borrowed(number),
        Expression::Bool(true) => Cow::Borrowed("True"),
        Expression::Bool(false) => Cow::Borrowed("False"),
        Expression::Str(value) => UnicodeEscape::with_preferred_quote(value, Quote::Single)
            .str_repr(TripleQuotes::No)
            .to_string()
            .map_or(Cow::Borrowed(ELLIPSIS), Cow::Owned),
        Expression::Bytes(value) => AsciiEscape::with_preferred_quote(value, Quote::Single)
            .bytes_repr(TripleQuotes::No)
            .to_string()
            .map_or(Cow::Borrowed(ELLIPSIS), Cow::Owned),
        Expression::Attribute(_) | Expression::Import(_) | Expression::Other(_) => {
            Cow::Borrowed(ELLIPSIS)
        }
    }
}

/// Turn a docstring value back into a triple-quoted literal
///
/// Lines after the first are dedented as a block. Backslashes, embedded
/// triple quotes and a closing double quote are escaped so the literal
/// evaluates to the same text.
pub fn docstring_literal(doc: &str) -> String {
    if doc.is_empty() {
        return r#"""" """"#.to_string();
    }
    let (first, rest) = match doc.find('\n') {
        Some(newline) => doc.split_at(newline + 1),
        None => (doc, ""),
    };
    let joined = format!("{first}{}", dedent(rest));

    let mut escaped = joined.replace('\\', r"\\").replace(r#"""""#, r#"\"\"\""#);
    if escaped.ends_with('"') && !ends_with_escaped_quote(&escaped) {
        escaped.pop();
        escaped.push_str(r#"\""#);
    }
    format!(r#""""{escaped}""""#)
}

/// Whether the final `"` is preceded by an odd number of backslashes
fn ends_with_escaped_quote(text: &str) -> bool {
    let backslashes = text[..text.len() - 1]
        .chars()
        .rev()
        .take_while(|&c| c == '\\')
        .count();
    backslashes % 2 == 1
}
