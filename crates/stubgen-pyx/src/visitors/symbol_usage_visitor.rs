//! Symbol usage visitor over rendered stub syntax
//!
//! Import trimming keeps an import only when the name it binds is referenced
//! somewhere in the stub. References come from plain names, from every
//! prefix of a dotted attribute chain, and from forward-reference string
//! annotations, which are parsed and walked like ordinary expressions.

use log::trace;
use ruff_python_ast::{
    Expr, ExprAttribute, Parameters, Stmt,
    visitor::source_order::{self, SourceOrderVisitor},
};

use crate::types::FxIndexSet;

/// Visitor that collects every name a stub refers to
#[derive(Debug, Default)]
pub struct SymbolUsageVisitor {
    used_names: FxIndexSet<String>,
}

impl SymbolUsageVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect all names used in a module body
    pub fn collect_used_symbols(body: &[Stmt]) -> FxIndexSet<String> {
        let mut visitor = Self::new();
        visitor.visit_body(body);
        visitor.used_names
    }

    /// Walk a string annotation as if it were written without quotes
    fn visit_string_annotation(&mut self, annotation: Option<&Expr>) {
        let Some(Expr::StringLiteral(literal)) = annotation else {
            return;
        };
        let text = literal.value.to_str();
        match ruff_python_parser::parse_expression(text) {
            Ok(parsed) => {
                let mut nested = Self::new();
                nested.visit_expr(parsed.expr());
                self.used_names.extend(nested.used_names);
            }
            Err(err) => trace!("Ignoring unparsable string annotation {text:?}: {err}"),
        }
    }

    fn visit_parameter_annotations(&mut self, parameters: &Parameters) {
        for parameter in parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .chain(&parameters.kwonlyargs)
        {
            self.visit_string_annotation(parameter.parameter.annotation.as_deref());
        }
        for parameter in [&parameters.vararg, &parameters.kwarg].into_iter().flatten() {
            self.visit_string_annotation(parameter.annotation.as_deref());
        }
    }

    /// Record `a`, `a.b` and `a.b.c` for `a.b.c`
    ///
    /// When the chain does not start at a plain name the base expression is
    /// walked instead.
    fn track_attribute_chain(&mut self, attribute: &ExprAttribute) {
        let mut parts = vec![attribute.attr.as_str()];
        let mut current = attribute.value.as_ref();
        while let Expr::Attribute(inner) = current {
            parts.push(inner.attr.as_str());
            current = inner.value.as_ref();
        }

        let Expr::Name(base) = current else {
            source_order::walk_expr(self, current);
            return;
        };
        parts.push(base.id.as_str());
        parts.reverse();
        for end in 1..=parts.len() {
            self.used_names.insert(parts[..end].join("."));
        }
    }
}

impl<'a> SourceOrderVisitor<'a> for SymbolUsageVisitor {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::FunctionDef(function) => {
                self.visit_parameter_annotations(&function.parameters);
                self.visit_string_annotation(function.returns.as_deref());
            }
            Stmt::AnnAssign(assignment) => {
                self.visit_string_annotation(Some(&assignment.annotation));
            }
            _ => {}
        }
        source_order::walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Name(name) => {
                self.used_names.insert(name.id.as_str().to_string());
            }
            Expr::Attribute(attribute) => self.track_attribute_chain(attribute),
            _ => source_order::walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use ruff_python_parser::parse_module;

    use super::*;

    fn collect(code: &str) -> FxIndexSet<String> {
        let module = parse_module(code).expect("stub should parse").into_syntax();
        SymbolUsageVisitor::collect_used_symbols(&module.body)
    }

    #[test]
    fn test_plain_names() {
        let used = collect("def f(x: Foo) -> Bar: ...\nx: Baz = qux\n");
        for name in ["Foo", "Bar", "Baz", "qux"] {
            assert!(used.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_attribute_prefixes() {
        let used = collect("x: os.path.PathLike\n");
        assert!(used.contains("os"));
        assert!(used.contains("os.path"));
        assert!(used.contains("os.path.PathLike"));
    }

    #[test]
    fn test_attribute_on_call_walks_base() {
        let used = collect("x = factory().value\n");
        assert!(used.contains("factory"));
        assert!(!used.contains("value"));
    }

    #[test]
    fn test_string_annotations() {
        let used = collect(
            "def f(a: 'np.ndarray', /, *args: 'Args', k: 'Key', **kw: 'Kw') -> 'Ret': ...\nx: 'Dict[str, Model]'\n",
        );
        for name in ["np", "np.ndarray", "Args", "Key", "Kw", "Ret", "Dict", "Model"] {
            assert!(used.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_unparsable_string_annotation_is_ignored() {
        let used = collect("def f(a: 'not valid ::'): ...\n");
        assert!(!used.contains("not"));
    }

    #[test]
    fn test_decorators_and_bases() {
        let used = collect("@dataclass\nclass A(Base, metaclass=Meta): ...\n");
        for name in ["dataclass", "Base", "Meta"] {
            assert!(used.contains(name), "missing {name}");
        }
    }
}
