//! Conversion of collected declarations into the stub model

use log::trace;

use super::{
    signature::{function_signature, native_function_signature},
    utils::{ELLIPSIS, docstring_literal, get_source, unparse_expression},
};
use crate::{
    error::StubgenError,
    model::{StubAssignment, StubClass, StubEnum, StubFunction, StubImport, StubModule, StubScope},
    parsing::position::PositionMap,
    syntax::{
        AssignmentTarget, EnumNode, Expression, FunctionNode, NativeFunctionNode, Span,
    },
    visitors::{
        ClassCollector, CollectedAssignment, CollectedImport, ImportCollector, ModuleCollector,
        ScopeCollector,
    },
};

/// Maps collected declarations to stub elements
///
/// Source text is only consulted for verbatim transcriptions: decorators,
/// imports and assignments whose value cannot be rendered safely.
#[derive(Debug)]
pub struct Converter<'s> {
    map: PositionMap<'s>,
}

impl<'s> Converter<'s> {
    /// Converter for declarations parsed from `source`
    pub fn new(source: &'s str) -> Self {
        Self {
            map: PositionMap::new(source),
        }
    }

    pub fn convert_module(&self, module: &ModuleCollector<'_>) -> Result<StubModule, StubgenError> {
        Ok(StubModule {
            doc: module.node.doc.as_deref().map(docstring_literal),
            imports: self.convert_imports(&module.imports),
            scope: self.convert_scope(&module.scope)?,
        })
    }

    pub fn convert_imports(&self, imports: &ImportCollector<'_>) -> Vec<StubImport> {
        imports
            .imports
            .iter()
            .map(|import| {
                let span = match import {
                    CollectedImport::Statement(node) => node.span,
                    CollectedImport::Assignment(node) => node.span,
                };
                StubImport::new(&self.source(span))
            })
            .collect()
    }

    /// Native functions are listed before plain ones
    pub fn convert_scope(&self, scope: &ScopeCollector<'_>) -> Result<StubScope, StubgenError> {
        let mut functions = Vec::with_capacity(scope.native_functions.len() + scope.functions.len());
        for function in &scope.native_functions {
            functions.push(self.convert_native_function(function)?);
        }
        for function in &scope.functions {
            functions.push(self.convert_function(function)?);
        }

        Ok(StubScope {
            enums: scope.enums.iter().map(|node| convert_enum(node)).collect(),
            classes: scope
                .classes
                .iter()
                .map(|class| self.convert_class(class))
                .collect::<Result<_, _>>()?,
            assignments: scope
                .assignments
                .iter()
                .map(|assignment| self.convert_assignment(*assignment))
                .collect(),
            functions,
        })
    }

    pub fn convert_class(&self, class: &ClassCollector<'_>) -> Result<StubClass, StubgenError> {
        let node = class.node;
        if node.name.is_empty() {
            return Err(StubgenError::InternalShape(
                "class declaration without a name".to_string(),
            ));
        }

        // Complex base expressions are dropped
        let bases = node
            .bases
            .iter()
            .filter_map(|base| match base {
                Expression::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect();
        let metaclass = match (&node.metaclass, class.is_extension) {
            (Some(Expression::Name(name)), false) => Some(name.clone()),
            _ => None,
        };
        trace!("Converting class {}", node.name);

        Ok(StubClass {
            name: node.name.clone(),
            doc: node.doc.as_deref().map(docstring_literal),
            bases,
            metaclass,
            decorators: self.decorators(&node.decorators),
            scope: self.convert_scope(&class.scope)?,
        })
    }

    pub fn convert_function(&self, node: &FunctionNode) -> Result<StubFunction, StubgenError> {
        Ok(StubFunction {
            name: node.name.clone(),
            is_async: node.is_async,
            doc: node.doc.as_deref().map(docstring_literal),
            decorators: self.decorators(&node.decorators),
            signature: function_signature(node)?,
        })
    }

    pub fn convert_native_function(
        &self,
        node: &NativeFunctionNode,
    ) -> Result<StubFunction, StubgenError> {
        Ok(StubFunction {
            name: node.name.clone(),
            is_async: false,
            doc: node.doc.as_deref().map(docstring_literal),
            decorators: self.decorators(&node.decorators),
            signature: native_function_signature(node)?,
        })
    }

    /// Structured `name = literal` when the value is safe, else the source text
    pub fn convert_assignment(&self, assignment: CollectedAssignment<'_>) -> StubAssignment {
        match assignment {
            CollectedAssignment::Assignment(node) => {
                if let AssignmentTarget::Name { name, annotation } = &node.target {
                    let value = unparse_expression(&node.value);
                    if value != ELLIPSIS {
                        return StubAssignment::Structured {
                            name: name.clone(),
                            annotation: annotation.clone(),
                            value: value.into_owned(),
                        };
                    }
                }
                StubAssignment::Statement(self.source(node.span))
            }
            CollectedAssignment::AnnotatedName(node) => {
                StubAssignment::Statement(self.source(node.span))
            }
            CollectedAssignment::TypeAlias(node) => StubAssignment::Structured {
                name: node.name.clone(),
                annotation: None,
                value: node.base_type.dotted(),
            },
        }
    }

    fn decorators(&self, spans: &[Span]) -> Vec<String> {
        spans.iter().map(|span| self.source(*span)).collect()
    }

    fn source(&self, span: Span) -> String {
        get_source(&self.map, span)
    }
}

pub fn convert_enum(node: &EnumNode) -> StubEnum {
    StubEnum {
        name: node.name.clone(),
        members: node.members.clone(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        model::{Argument, Signature},
        parsing::preprocess::preprocess,
        syntax::{CythonParser, DeclarationParser},
    };

    fn convert(code: &str) -> StubModule {
        let source = preprocess(code);
        let module = CythonParser.parse_module(&source, "test").unwrap();
        let collector = ModuleCollector::new(&module);
        Converter::new(&source).convert_module(&collector).unwrap()
    }

    #[test]
    fn test_plain_function() {
        let module = convert("def add(a, b): return a + b\n");
        assert_eq!(
            module.scope.functions,
            vec![StubFunction::new(
                "add",
                Signature::positional(vec![Argument::new("a"), Argument::new("b")])
            )]
        );
    }

    #[test]
    fn test_native_functions_come_first() {
        let module = convert("def a(): pass\ncpdef int b(): pass\n");
        let names: Vec<_> = module.scope.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(
            module.scope.functions[0].signature.return_annotation.as_deref(),
            Some("int")
        );
    }

    #[test]
    fn test_assignments() {
        let module = convert(
            "X = 1\nY: str = 'a'\nZ = compute()\nW: int\nctypedef np.int64_t Index\nV = -2\n",
        );
        let rendered: Vec<_> = module
            .scope
            .assignments
            .iter()
            .map(|assignment| assignment.render().into_owned())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "X = 1",
                "Y: str = 'a'",
                "Z = compute()",
                "W: int",
                "Index = np.int64_t",
                "V = -2",
            ]
        );
    }

    #[test]
    fn test_class_conversion() {
        let module = convert(
            "@decorate(1)\nclass A(Base, mod.Mixin, metaclass=Meta):\n    '''Doc.'''\n    x = 1\n    def m(self): pass\n",
        );
        let class = &module.scope.classes[0];
        assert_eq!(class.name, "A");
        assert_eq!(class.bases, vec!["Base"]);
        assert_eq!(class.metaclass.as_deref(), Some("Meta"));
        assert_eq!(class.decorators, vec!["@decorate(1)"]);
        assert_eq!(class.doc.as_deref(), Some("\"\"\"Doc.\"\"\""));
        assert_eq!(class.scope.assignments.len(), 1);
        assert_eq!(class.scope.functions[0].name, "m");
    }

    #[test]
    fn test_extension_class_has_no_metaclass() {
        let module = convert("cdef class E(Base):\n    cpdef int f(self): return 1\n");
        let class = &module.scope.classes[0];
        assert_eq!(class.bases, vec!["Base"]);
        assert_eq!(class.metaclass, None);
        assert_eq!(class.scope.functions[0].name, "f");
    }

    #[test]
    fn test_imports_and_docstring() {
        let module = convert(
            "\"\"\"Module.\"\"\"\nimport os\nfrom libc.math cimport sin\nif TYPE_CHECKING:\n    from typing import Any\nnp = __import__('numpy')\n",
        );
        let imports: Vec<_> = module.imports.iter().map(StubImport::statement).collect();
        assert_eq!(
            imports,
            vec![
                "import os",
                "from libc.math import sin",
                "from typing import Any",
                "np = __import__('numpy')",
            ]
        );
        assert_eq!(module.doc.as_deref(), Some("\"\"\"Module.\"\"\""));
    }

    #[test]
    fn test_enums() {
        let module = convert("cpdef enum Color:\n    RED\n    GREEN\n");
        assert_eq!(
            module.scope.enums,
            vec![StubEnum {
                name: Some("Color".into()),
                members: vec!["RED".into(), "GREEN".into()],
            }]
        );
    }
}
