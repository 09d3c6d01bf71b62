//! Rendering of the postprocessed tree back to stub text
//!
//! ruff's generator escapes newlines inside string literals, which would
//! flatten every docstring onto one line. Triple-quoted literals are
//! therefore re-rendered by hand and spliced over the generator's version.

use ruff_python_ast::{
    Expr, ExprStringLiteral, Stmt, StringFlags, StringLiteral,
    helpers::is_docstring_stmt,
    str::{Quote, TripleQuotes},
    str_prefix::StringLiteralPrefix,
    visitor::{Visitor, walk_expr},
};
use ruff_python_codegen::{Generator, Stylist};
use ruff_python_literal::char::is_printable;

use crate::types::FxIndexMap;

/// Render top-level statements, one blank line around definitions, after
/// the import block and after the module docstring
pub fn render_module(stylist: &Stylist<'_>, body: &[Stmt]) -> String {
    let mut out = String::new();
    let mut previous: Option<&Stmt> = None;
    for (index, stmt) in body.iter().enumerate() {
        if let Some(prev) = previous {
            out.push('\n');
            let after_docstring = index == 1 && is_docstring_stmt(prev);
            if after_docstring || needs_blank_line(prev, stmt) {
                out.push('\n');
            }
        }
        out.push_str(render_statement(stylist, stmt).trim_end());
        previous = Some(stmt);
    }
    out
}

fn needs_blank_line(previous: &Stmt, next: &Stmt) -> bool {
    is_definition(previous) || is_definition(next) || is_import(previous) != is_import(next)
}

fn is_definition(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::FunctionDef(_) | Stmt::ClassDef(_))
}

fn is_import(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Import(_) | Stmt::ImportFrom(_))
}

/// Render a statement, keeping triple-quoted strings multiline
fn render_statement(stylist: &Stylist<'_>, stmt: &Stmt) -> String {
    let mut rendered = Generator::from(stylist).stmt(stmt);

    let mut collector = TripleQuotedCollector {
        stylist,
        replacements: FxIndexMap::default(),
    };
    collector.visit_stmt(stmt);
    for (original, desired) in collector.replacements {
        rendered = apply_replacement(rendered, &original, &desired);
    }
    rendered
}

/// Generator output of each triple-quoted literal mapped to its desired text
struct TripleQuotedCollector<'sty> {
    stylist: &'sty Stylist<'sty>,
    replacements: FxIndexMap<String, String>,
}

impl TripleQuotedCollector<'_> {
    fn handle_literal(&mut self, expr: &Expr, literal: &ExprStringLiteral) {
        let Some(desired) = render_string_literal_expr(literal) else {
            return;
        };
        let generated = Generator::from(self.stylist).expr(expr);
        if generated != desired {
            self.replacements.insert(generated, desired);
        }
    }
}

impl<'ast> Visitor<'ast> for TripleQuotedCollector<'_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::StringLiteral(literal) = expr {
            self.handle_literal(expr, literal);
        }
        walk_expr(self, expr);
    }
}

fn apply_replacement(mut rendered: String, original: &str, desired: &str) -> String {
    let mut search_start = 0;
    while let Some(relative_pos) = rendered[search_start..].find(original) {
        let absolute_pos = search_start + relative_pos;
        rendered.replace_range(absolute_pos..absolute_pos + original.len(), desired);
        search_start = absolute_pos + desired.len();
    }
    rendered
}

/// Only literals made entirely of non-raw triple-quoted parts are handled
fn render_string_literal_expr(expr: &ExprStringLiteral) -> Option<String> {
    let parts: Option<Vec<String>> = expr.value.iter().map(render_string_literal_part).collect();
    Some(parts?.join(" "))
}

fn render_string_literal_part(literal: &StringLiteral) -> Option<String> {
    if matches!(literal.flags.prefix(), StringLiteralPrefix::Raw { .. })
        || literal.flags.triple_quotes() == TripleQuotes::No
    {
        return None;
    }
    Some(render_triple_quoted_literal(
        &literal.value,
        literal.flags.quote_style(),
        literal.flags.prefix().as_str(),
    ))
}

fn render_triple_quoted_literal(content: &str, quote: Quote, prefix: &str) -> String {
    let mut result = String::new();
    result.push_str(prefix);
    let token = quote_token(quote);
    result.push_str(token);
    append_triple_content(content, quote, &mut result);
    result.push_str(token);
    result
}

/// Escape embedded closing sequences and a quote right before the closing one
fn append_triple_content(content: &str, quote: Quote, buf: &mut String) {
    let triple = quote_token(quote);
    let quote_char = quote.as_char();
    let mut index = 0;
    while index < content.len() {
        let rest = &content[index..];
        if rest.starts_with(triple) {
            for _ in 0..3 {
                buf.push('\\');
                buf.push(quote_char);
            }
            index += triple.len();
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        index += ch.len_utf8();
        if ch == quote_char && index == content.len() {
            buf.push('\\');
            buf.push(ch);
        } else {
            push_triple_char(ch, buf);
        }
    }
}

fn push_triple_char(ch: char, buf: &mut String) {
    match ch {
        '\n' => buf.push('\n'),
        '\t' => buf.push_str("\\t"),
        '\r' => buf.push_str("\\r"),
        '\\' => buf.push_str("\\\\"),
        other if should_escape(other) => push_unicode_escape(other, buf),
        other => buf.push(other),
    }
}

fn should_escape(ch: char) -> bool {
    matches!(ch, '\0'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1f' | '\x7f')
        || (!ch.is_ascii() && !is_printable(ch))
}

fn push_unicode_escape(ch: char, buf: &mut String) {
    let code = ch as u32;
    if code < 0x100 {
        buf.push_str(&format!("\\x{code:02x}"));
    } else if code < 0x10000 {
        buf.push_str(&format!("\\u{code:04x}"));
    } else {
        buf.push_str(&format!("\\U{code:08x}"));
    }
}

fn quote_token(quote: Quote) -> &'static str {
    match quote {
        Quote::Single => "'''",
        Quote::Double => "\"\"\"",
    }
}
