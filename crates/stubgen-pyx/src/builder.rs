//! Rendering of the stub model into stub-file text
//!
//! The output must always be valid stub syntax: postprocessing re-parses it
//! unconditionally. Scope members render in a fixed order (enums, classes,
//! assignments, functions) with one blank line between non-empty blocks.

use ruff_python_trivia::textwrap::indent;

use crate::model::{
    Argument, Signature, StubAssignment, StubClass, StubEnum, StubFunction, StubModule, StubScope,
};

const INDENT: &str = "    ";

/// Renders stub text from a [`StubModule`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Builder {
    /// Render functions whose names are private, e.g. `_helper`
    pub include_private: bool,
}

impl Builder {
    pub fn new(include_private: bool) -> Self {
        Self { include_private }
    }

    pub fn build_module(&self, module: &StubModule) -> String {
        let mut sections = Vec::new();
        if let Some(doc) = &module.doc {
            sections.push(doc.clone());
        }
        if !module.imports.is_empty() {
            let imports: Vec<_> = module.imports.iter().map(|i| i.statement()).collect();
            sections.push(imports.join("\n"));
        }
        if let Some(scope) = self.build_scope(&module.scope) {
            sections.push(scope);
        }
        sections.join("\n\n")
    }

    /// `None` when nothing in the scope renders
    pub fn build_scope(&self, scope: &StubScope) -> Option<String> {
        let enums: Vec<String> = scope.enums.iter().filter_map(build_enum).collect();
        let classes: Vec<String> = scope
            .classes
            .iter()
            .map(|class| self.build_class(class))
            .collect();
        let assignments: Vec<_> = scope.assignments.iter().map(StubAssignment::render).collect();
        let functions: Vec<String> = scope
            .functions
            .iter()
            .filter_map(|function| self.build_function(function))
            .collect();

        let blocks: Vec<String> = [
            enums.join("\n"),
            classes.join("\n\n"),
            assignments.join("\n"),
            functions.join("\n"),
        ]
        .into_iter()
        .filter(|block| !block.is_empty())
        .collect();
        if blocks.is_empty() {
            None
        } else {
            Some(blocks.join("\n\n"))
        }
    }

    pub fn build_class(&self, class: &StubClass) -> String {
        let mut header: Vec<String> = class.bases.clone();
        if let Some(metaclass) = &class.metaclass {
            header.push(format!("metaclass={metaclass}"));
        }
        let mut out = decorator_lines(&class.decorators);
        out.push_str("class ");
        out.push_str(&class.name);
        if !header.is_empty() {
            out.push('(');
            out.push_str(&header.join(", "));
            out.push(')');
        }

        let body: Vec<String> = class
            .doc
            .iter()
            .cloned()
            .chain(self.build_scope(&class.scope))
            .collect();
        if body.is_empty() {
            out.push_str(": ...");
        } else {
            out.push_str(":\n");
            out.push_str(&indent(&body.join("\n"), INDENT));
        }
        out
    }

    /// `None` for a private function when private names are excluded
    pub fn build_function(&self, function: &StubFunction) -> Option<String> {
        if !self.include_private && is_private(&function.name) {
            return None;
        }

        let mut out = decorator_lines(&function.decorators);
        if function.is_async {
            out.push_str("async ");
        }
        out.push_str("def ");
        out.push_str(&function.name);
        out.push_str(&build_signature(&function.signature));
        match &function.doc {
            Some(doc) => {
                out.push_str(":\n");
                out.push_str(&indent(doc, INDENT));
            }
            None => out.push_str(": ..."),
        }
        Some(out)
    }
}

/// Parenthesized parameter list followed by the return annotation, if any
pub fn build_signature(signature: &Signature) -> String {
    let mut parts: Vec<String> = signature.posonly_args().iter().map(build_argument).collect();
    if signature.num_posonly_args() > 0 {
        parts.push("/".to_string());
    }
    parts.extend(signature.regular_args().iter().map(build_argument));
    match &signature.var_arg {
        Some(var_arg) => parts.push(format!("*{}", build_argument(var_arg))),
        None if signature.num_kwonly_args() > 0 => parts.push("*".to_string()),
        None => {}
    }
    parts.extend(signature.kwonly_args().iter().map(build_argument));
    if let Some(kw_arg) = &signature.kw_arg {
        parts.push(format!("**{}", build_argument(kw_arg)));
    }

    let mut out = format!("({})", parts.join(", "));
    if let Some(annotation) = &signature.return_annotation {
        out.push_str(" -> ");
        out.push_str(annotation);
    }
    out
}

pub fn build_argument(argument: &Argument) -> String {
    let mut out = argument.name.clone();
    if let Some(annotation) = &argument.annotation {
        out.push_str(": ");
        out.push_str(annotation);
    }
    if let Some(default) = &argument.default {
        out.push_str(" = ");
        out.push_str(default);
    }
    out
}

/// Named enums become a class of `int` members; unnamed ones render bare
pub fn build_enum(stub_enum: &StubEnum) -> Option<String> {
    if stub_enum.members.is_empty() {
        return None;
    }
    let members: Vec<String> = stub_enum
        .members
        .iter()
        .map(|member| format!("{member}: int"))
        .collect();
    let members = members.join("\n");
    Some(match &stub_enum.name {
        Some(name) => format!("class {name}:\n{}", indent(&members, INDENT)),
        None => members,
    })
}

/// `_name` and `__name` are private, dunder names are not
pub fn is_private(name: &str) -> bool {
    name.starts_with('_') && !name.ends_with('_')
}

fn decorator_lines(decorators: &[String]) -> String {
    decorators
        .iter()
        .map(|decorator| format!("{decorator}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::StubImport;

    fn args(names: &[&str]) -> Vec<Argument> {
        names.iter().copied().map(Argument::new).collect()
    }

    #[test]
    fn test_add_function() {
        let function = StubFunction::new("add", Signature::positional(args(&["a", "b"])));
        assert_eq!(
            Builder::default().build_function(&function).as_deref(),
            Some("def add(a, b): ...")
        );
    }

    #[test]
    fn test_positional_only_marker() {
        let signature = Signature::new(args(&["x", "y"]), 1, 0).unwrap();
        assert_eq!(build_signature(&signature), "(x, /, y)");
    }

    #[test]
    fn test_bare_star_before_keyword_only() {
        let signature = Signature::new(args(&["a", "key"]), 0, 1).unwrap();
        assert_eq!(build_signature(&signature), "(a, *, key)");
    }

    #[test]
    fn test_full_signature() {
        let mut signature = Signature::new(
            vec![
                Argument::new("self"),
                Argument::new("x").with_annotation("int").with_default("1"),
                Argument::new("flag").with_default("False"),
            ],
            1,
            1,
        )
        .unwrap();
        signature.var_arg = Some(Argument::new("args").with_annotation("str"));
        signature.kw_arg = Some(Argument::new("kwargs").with_annotation("object"));
        signature.return_annotation = Some("None".to_string());
        assert_eq!(
            build_signature(&signature),
            "(self, /, x: int = 1, *args: str, flag = False, **kwargs: object) -> None"
        );
    }

    #[test]
    fn test_enums() {
        let named = StubEnum {
            name: Some("Color".into()),
            members: vec!["RED".into(), "GREEN".into(), "BLUE".into()],
        };
        assert_eq!(
            build_enum(&named).as_deref(),
            Some("class Color:\n    RED: int\n    GREEN: int\n    BLUE: int")
        );

        let unnamed = StubEnum {
            name: None,
            members: vec!["A".into()],
        };
        assert_eq!(build_enum(&unnamed).as_deref(), Some("A: int"));

        let empty = StubEnum {
            name: Some("Empty".into()),
            members: Vec::new(),
        };
        assert_eq!(build_enum(&empty), None);
    }

    #[test]
    fn test_private_filtering() {
        let helper = StubFunction::new("_helper", Signature::default());
        let init = StubFunction::new("__init__", Signature::positional(args(&["self"])));

        let default = Builder::default();
        assert_eq!(default.build_function(&helper), None);
        assert!(default.build_function(&init).is_some());

        let include = Builder::new(true);
        assert!(include.build_function(&helper).is_some());
        assert!(include.build_function(&init).is_some());
    }

    #[test]
    fn test_empty_class() {
        let mut class = StubClass::new("Empty");
        class.bases = vec!["Base".into()];
        class.metaclass = Some("Meta".into());
        assert_eq!(
            Builder::default().build_class(&class),
            "class Empty(Base, metaclass=Meta): ..."
        );
    }

    #[test]
    fn test_module_layout() {
        let mut class = StubClass::new("Point");
        class.doc = Some("\"\"\"A point.\"\"\"".into());
        class.decorators = vec!["@final".into()];
        class.scope.assignments.push(StubAssignment::Structured {
            name: "x".into(),
            annotation: Some("int".into()),
            value: "0".into(),
        });
        let mut method = StubFunction::new("norm", Signature::positional(args(&["self"])));
        method.signature.return_annotation = Some("float".into());
        method.doc = Some("\"\"\"Length.\n\nEuclidean.\"\"\"".into());
        class.scope.functions.push(method);

        let mut fetch = StubFunction::new("fetch", Signature::default());
        fetch.is_async = true;

        let module = StubModule {
            doc: Some("\"\"\"Geometry.\"\"\"".into()),
            imports: vec![StubImport::new("import math")],
            scope: StubScope {
                enums: vec![StubEnum {
                    name: None,
                    members: vec!["ORIGIN".into()],
                }],
                classes: vec![class],
                assignments: vec![StubAssignment::Statement("TAU = math.tau".into())],
                functions: vec![fetch, StubFunction::new("_hidden", Signature::default())],
            },
        };

        assert_snapshot!(Builder::default().build_module(&module), @r#"
        """Geometry."""

        import math

        ORIGIN: int

        @final
        class Point:
            """A point."""
            x: int = 0
            def norm(self) -> float:
                """Length.

                Euclidean."""

        TAU = math.tau

        async def fetch(): ...
        "#);
    }

    #[test]
    fn test_empty_module() {
        assert_eq!(Builder::default().build_module(&StubModule::default()), "");
    }
}
