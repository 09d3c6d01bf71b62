//! Import collection for the module scope

use crate::syntax::{AssignmentNode, Expression, IfClause, ImportNode, Node};

/// Conditions whose body only exists for static tooling
const TYPE_CHECKING_GUARDS: &[&str] = &["TYPE_CHECKING", "typing.TYPE_CHECKING"];

/// Import-like statement, in the form it was written
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollectedImport<'a> {
    /// `import` / `cimport` / `from ... import|cimport`
    Statement(&'a ImportNode),
    /// `name = __import__("module")`
    Assignment(&'a AssignmentNode),
}

/// Every import of a scope in source order
///
/// `if TYPE_CHECKING:` clauses are treated as unconditional code; other
/// conditionals, class bodies and function bodies are not entered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportCollector<'a> {
    pub imports: Vec<CollectedImport<'a>>,
}

impl<'a> ImportCollector<'a> {
    pub fn collect(body: &'a [Node]) -> Self {
        let mut collector = Self::default();
        collector.visit_body(body);
        collector
    }

    fn visit_body(&mut self, body: &'a [Node]) {
        for node in body {
            self.visit_node(node);
        }
    }

    fn visit_node(&mut self, node: &'a Node) {
        match node {
            Node::StatList(nodes) => self.visit_body(nodes),
            Node::Import(import) => self.imports.push(CollectedImport::Statement(import)),
            Node::Assignment(assignment) => {
                if matches!(assignment.value, Expression::Import(_)) {
                    self.imports.push(CollectedImport::Assignment(assignment));
                }
            }
            Node::If(node) => {
                for clause in &node.clauses {
                    if is_type_checking_guard(clause) {
                        self.visit_body(&clause.body);
                    }
                }
            }
            Node::AnnotatedName(_)
            | Node::Function(_)
            | Node::NativeFunction(_)
            | Node::Class(_)
            | Node::ExtensionClass(_)
            | Node::Enum(_)
            | Node::TypeDef(_)
            | Node::Other(_) => {}
        }
    }
}

fn is_type_checking_guard(clause: &IfClause) -> bool {
    clause
        .condition
        .dotted_name()
        .is_some_and(|name| TYPE_CHECKING_GUARDS.contains(&name.as_str()))
}
