//! Classification of expression text into the small set the converter models
//!
//! Expressions are parsed with ruff's Python parser. Anything that fails to
//! parse (casts, address-of and other C-only syntax) or that is not one of
//! the literal forms below is kept as [`Expression::Other`].

use ruff_python_ast::{Expr, ExprAttribute, ExprCall, ExprUnaryOp, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    None,
    Name(String),
    /// Dotted chain of plain names, e.g. `typing.TYPE_CHECKING`
    Attribute(Vec<String>),
    /// Numeric literal exactly as written, including a leading minus
    Number(String),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    /// `__import__("module")`
    Import(String),
    Other(String),
}

impl Expression {
    /// Dotted spelling of a name or attribute chain
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Self::Name(name) => Some(name.clone()),
            Self::Attribute(parts) => Some(parts.join(".")),
            _ => None,
        }
    }
}

/// Classify `text`, degrading to [`Expression::Other`] instead of failing
pub fn classify(text: &str) -> Expression {
    let trimmed = text.trim();
    match ruff_python_parser::parse_expression(trimmed) {
        Ok(parsed) => classify_expr(&parsed.into_expr(), trimmed),
        Err(_) => Expression::Other(trimmed.to_string()),
    }
}

/// Classify an already parsed expression whose source text is `text`
pub fn classify_expr(expr: &Expr, text: &str) -> Expression {
    match expr {
        Expr::NoneLiteral(_) => Expression::None,
        Expr::BooleanLiteral(literal) => Expression::Bool(literal.value),
        Expr::Name(name) => Expression::Name(name.id.as_str().to_string()),
        Expr::Attribute(attribute) => attribute_chain(attribute)
            .map_or_else(|| Expression::Other(text.to_string()), Expression::Attribute),
        Expr::NumberLiteral(_) => Expression::Number(text.to_string()),
        Expr::UnaryOp(ExprUnaryOp {
            op: UnaryOp::USub,
            operand,
            ..
        }) if matches!(operand.as_ref(), Expr::NumberLiteral(_)) => {
            Expression::Number(text.split_whitespace().collect())
        }
        Expr::StringLiteral(string) => Expression::Str(string.value.to_str().to_string()),
        Expr::BytesLiteral(bytes) => Expression::Bytes(bytes.value.bytes().collect()),
        Expr::Call(call) => import_call(call).map_or_else(
            || Expression::Other(text.to_string()),
            Expression::Import,
        ),
        _ => Expression::Other(text.to_string()),
    }
}

fn attribute_chain(attribute: &ExprAttribute) -> Option<Vec<String>> {
    let mut parts = vec![attribute.attr.as_str().to_string()];
    let mut current = attribute.value.as_ref();
    loop {
        match current {
            Expr::Attribute(inner) => {
                parts.push(inner.attr.as_str().to_string());
                current = inner.value.as_ref();
            }
            Expr::Name(name) => {
                parts.push(name.id.as_str().to_string());
                break;
            }
            _ => return None,
        }
    }
    parts.reverse();
    Some(parts)
}

/// Module named by a `__import__("module")` call
fn import_call(call: &ExprCall) -> Option<String> {
    let Expr::Name(func) = call.func.as_ref() else {
        return None;
    };
    if func.id.as_str() != "__import__" {
        return None;
    }
    match call.arguments.args.first() {
        Some(Expr::StringLiteral(module)) => Some(module.value.to_str().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        assert_eq!(classify("None"), Expression::None);
        assert_eq!(classify("True"), Expression::Bool(true));
        assert_eq!(classify(" 0x1F "), Expression::Number("0x1F".into()));
        assert_eq!(classify("-1.5"), Expression::Number("-1.5".into()));
        assert_eq!(classify("'a' 'b'"), Expression::Str("ab".into()));
        assert_eq!(classify("b'\\x00'"), Expression::Bytes(vec![0]));
    }

    #[test]
    fn test_names_and_attributes() {
        assert_eq!(classify("foo"), Expression::Name("foo".into()));
        assert_eq!(
            classify("typing.TYPE_CHECKING"),
            Expression::Attribute(vec!["typing".into(), "TYPE_CHECKING".into()])
        );
        assert_eq!(
            classify("a().b"),
            Expression::Other("a().b".into())
        );
    }

    #[test]
    fn test_import_call() {
        assert_eq!(
            classify("__import__('os.path')"),
            Expression::Import("os.path".into())
        );
        assert_eq!(classify("foo('x')"), Expression::Other("foo('x')".into()));
    }

    #[test]
    fn test_native_syntax_is_other() {
        assert_eq!(classify("<int>x"), Expression::Other("<int>x".into()));
        assert_eq!(classify("&x"), Expression::Other("&x".into()));
        assert_eq!(classify("1 + 2"), Expression::Other("1 + 2".into()));
    }

    #[test]
    fn test_dotted_name() {
        assert_eq!(
            classify("a.b.c").dotted_name().as_deref(),
            Some("a.b.c")
        );
        assert_eq!(classify("1").dotted_name(), None);
    }
}
