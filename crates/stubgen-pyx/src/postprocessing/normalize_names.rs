//! Rewriting of C type names to their Python equivalents

use log::trace;
use ruff_python_ast::{
    AtomicNodeIndex, Expr, ExprContext, ExprNoneLiteral, Stmt,
    name::Name,
    visitor::transformer::{Transformer, walk_expr},
};

/// Python spelling of a C type name, or `None` for names left unchanged
///
/// `void` maps to the `None` literal and is handled separately.
pub fn python_type_name(name: &str) -> Option<&'static str> {
    Some(match name {
        "bint" => "bool",
        "unicode" => "str",
        "char" | "short" | "Py_UNICODE" | "Py_UCS4" | "long" | "longlong" | "Py_hash_t"
        | "Py_ssize_t" | "size_t" | "ssize_t" | "ptrdiff_t" => "int",
        "double" | "longdouble" => "float",
        "longdoublecomplex" | "doublecomplex" | "floatcomplex" => "complex",
        _ => return None,
    })
}

/// Normalize every name in `body`
pub fn normalize_names(body: &mut [Stmt]) {
    let transformer = NameNormalizer;
    for stmt in body {
        transformer.visit_stmt(stmt);
    }
}

/// `void` becomes `None` only where the name is loaded
struct NameNormalizer;

impl Transformer for NameNormalizer {
    fn visit_expr(&self, expr: &mut Expr) {
        if let Expr::Name(name_expr) = expr {
            if name_expr.ctx == ExprContext::Load && name_expr.id.as_str() == "void" {
                trace!("Normalizing void to None");
                let range = name_expr.range;
                *expr = Expr::NoneLiteral(ExprNoneLiteral {
                    node_index: AtomicNodeIndex::NONE,
                    range,
                });
                return;
            }
            if let Some(replacement) = python_type_name(name_expr.id.as_str()) {
                trace!("Normalizing {} to {replacement}", name_expr.id);
                name_expr.id = Name::new(replacement);
            }
            return;
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ruff_python_codegen::{Generator, Stylist};
    use ruff_python_parser::parse_module;

    use super::*;

    fn normalize(code: &str) -> String {
        let parsed = parse_module(code).expect("stub should parse");
        let stylist = Stylist::from_tokens(parsed.tokens(), code);
        let mut body = parsed.syntax().body.to_vec();
        normalize_names(&mut body);
        body.iter()
            .map(|stmt| Generator::from(&stylist).stmt(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_signature_positions() {
        assert_eq!(
            normalize("def f(a: bint, b: Py_ssize_t = 0) -> double: ...\n"),
            "def f(a: bool, b: int = 0) -> float:\n    ..."
        );
    }

    #[test]
    fn test_void_becomes_none() {
        assert_eq!(normalize("def f() -> void: ...\n"), "def f() -> None:\n    ...");
    }

    #[test]
    fn test_nested_and_unmapped_names() {
        assert_eq!(
            normalize("x: list[unicode] = Foo\nchar = 1\n"),
            "x: list[str] = Foo\nint = 1"
        );
    }

    #[test]
    fn test_store_targets_are_normalized() {
        assert_eq!(
            normalize("long = np.int64\nfor bint in xs: ...\n"),
            "int = np.int64\nfor bool in xs:\n    ..."
        );
    }

    #[test]
    fn test_void_target_is_kept() {
        assert_eq!(normalize("void = 1\n"), "void = 1");
    }

    #[test]
    fn test_unmapped_names_pass_through() {
        for name in ["int", "object", "Foo", "np", "void_t"] {
            assert_eq!(python_type_name(name), None);
        }
        assert_eq!(python_type_name("longdoublecomplex"), Some("complex"));
    }
}
