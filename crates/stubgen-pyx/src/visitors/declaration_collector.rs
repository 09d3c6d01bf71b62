//! Declaration collection over a parsed module or class body
//!
//! A [`ScopeCollector`] buckets the declarations of exactly one scope. Class
//! bodies get their own nested collector, while conditionals and function
//! bodies are never entered: whatever they declare is not part of the
//! scope's static shape.

use crate::syntax::{
    AnnotatedNameNode, AssignmentNode, AssignmentTarget, ClassNode, EnumNode, Expression,
    FunctionNode, ModuleNode, NativeFunctionNode, Node, TypeDefNode,
};

use super::import_collector::ImportCollector;

/// Module-level value declaration kept for the stub
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollectedAssignment<'a> {
    /// `name[: annotation] = value`
    Assignment(&'a AssignmentNode),
    /// `name: annotation`
    AnnotatedName(&'a AnnotatedNameNode),
    /// `ctypedef <type> Name`, rendered as an alias
    TypeAlias(&'a TypeDefNode),
}

/// Class declaration together with the declarations of its own body
#[derive(Debug, Clone, PartialEq)]
pub struct ClassCollector<'a> {
    pub node: &'a ClassNode,
    pub is_extension: bool,
    pub scope: ScopeCollector<'a>,
}

impl<'a> ClassCollector<'a> {
    pub fn new(node: &'a ClassNode, is_extension: bool) -> Self {
        Self {
            node,
            is_extension,
            scope: ScopeCollector::collect(&node.body),
        }
    }
}

/// Declarations of one scope, each list in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeCollector<'a> {
    pub assignments: Vec<CollectedAssignment<'a>>,
    /// `cpdef` functions only
    pub native_functions: Vec<&'a NativeFunctionNode>,
    pub functions: Vec<&'a FunctionNode>,
    pub classes: Vec<ClassCollector<'a>>,
    /// `cpdef` enums only
    pub enums: Vec<&'a EnumNode>,
}

impl<'a> ScopeCollector<'a> {
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
            Node::Assignment(assignment) => {
                let is_import = matches!(assignment.value, Expression::Import(_));
                let is_name = matches!(assignment.target, AssignmentTarget::Name { .. });
                if is_name && !is_import {
                    self.assignments
                        .push(CollectedAssignment::Assignment(assignment));
                }
            }
            Node::AnnotatedName(annotated) => {
                self.assignments
                    .push(CollectedAssignment::AnnotatedName(annotated));
            }
            Node::TypeDef(typedef) => {
                self.assignments.push(CollectedAssignment::TypeAlias(typedef));
            }
            Node::Function(function) => self.functions.push(function),
            Node::NativeFunction(function) => {
                if function.overridable {
                    self.native_functions.push(function);
                }
            }
            Node::Class(class) => self.classes.push(ClassCollector::new(class, false)),
            Node::ExtensionClass(class) => self.classes.push(ClassCollector::new(class, true)),
            Node::Enum(node) => {
                if node.create_wrapper {
                    self.enums.push(node);
                }
            }
            // Collected by the import collector
            Node::Import(_) => {}
            Node::If(_) | Node::Other(_) => {}
        }
    }
}

/// Imports and top-level declarations of one module
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleCollector<'a> {
    pub node: &'a ModuleNode,
    pub imports: ImportCollector<'a>,
    pub scope: ScopeCollector<'a>,
}

impl<'a> ModuleCollector<'a> {
    pub fn new(node: &'a ModuleNode) -> Self {
        Self {
            node,
            imports: ImportCollector::collect(&node.body),
            scope: ScopeCollector::collect(&node.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parsing::preprocess::preprocess,
        syntax::{CythonParser, DeclarationParser},
    };

    fn parse(code: &str) -> ModuleNode {
        CythonParser
            .parse_module(&preprocess(code), "test")
            .expect("source should parse")
    }

    #[test]
    fn test_collects_each_kind() {
        let module = parse(
            "x = 1\ny: int\nctypedef int Alias\nos = __import__('os')\nself.z = 1\n\ndef f(): pass\ncpdef g(): pass\ncdef h(): pass\nclass A: pass\ncpdef enum E:\n    ONE\ncdef enum Hidden:\n    TWO\n",
        );
        let scope = ScopeCollector::collect(&module.body);

        assert_eq!(scope.assignments.len(), 3);
        assert!(matches!(scope.assignments[2], CollectedAssignment::TypeAlias(_)));
        assert_eq!(scope.functions.len(), 1);
        assert_eq!(scope.native_functions.len(), 1);
        assert_eq!(scope.native_functions[0].name, "g");
        assert_eq!(scope.classes.len(), 1);
        assert_eq!(scope.enums.len(), 1);
    }

    #[test]
    fn test_class_scopes_are_independent() {
        let module = parse("class A:\n    x = 1\n    def m(self): pass\n    class B:\n        def n(self): pass\n");
        let scope = ScopeCollector::collect(&module.body);

        assert!(scope.functions.is_empty());
        assert!(scope.assignments.is_empty());
        let class = &scope.classes[0];
        assert!(!class.is_extension);
        assert_eq!(class.scope.assignments.len(), 1);
        assert_eq!(class.scope.functions[0].name, "m");
        assert_eq!(class.scope.classes[0].scope.functions[0].name, "n");
    }

    #[test]
    fn test_statement_lists_are_transparent() {
        let module = parse("cdef:\n    int x\n    cpdef enum E:\n        A\n");
        let scope = ScopeCollector::collect(&module.body);
        assert!(scope.native_functions.is_empty());
        assert_eq!(scope.enums.len(), 1);
    }

    #[test]
    fn test_conditionals_and_bodies_are_skipped() {
        let module = parse("if DEBUG:\n    def f(): pass\ndef g():\n    x = 1\n");
        let scope = ScopeCollector::collect(&module.body);
        assert_eq!(scope.functions.len(), 1);
        assert_eq!(scope.functions[0].name, "g");
        assert!(scope.assignments.is_empty());
    }

    #[test]
    fn test_module_collector() {
        let module = parse("import os\ncdef class Ext:\n    pass\n");
        let collector = ModuleCollector::new(&module);
        assert_eq!(collector.imports.imports.len(), 1);
        assert!(collector.scope.classes[0].is_extension);
    }
}
