//! Source text handling ahead of declaration parsing

pub mod file_parsing;
pub mod position;
pub mod preprocess;
pub mod tokenizer;

use std::path::{Component, Path};

use log::debug;

use crate::{
    error::StubgenError,
    syntax::{DeclarationParser, ModuleNode},
};

/// Module name used when no source path is known
pub const DEFAULT_MODULE_NAME: &str = "__pyx_module__";

/// Preprocessed source together with the declaration tree parsed from it
///
/// The converter slices decorator and statement text out of `source`, so the
/// tree's positions always refer to this exact buffer.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub source: String,
    pub module: ModuleNode,
}

/// Run file-level and text-level preprocessing, then parse
pub fn parse_pyx(
    code: &str,
    module_name: Option<&str>,
    pyx_path: Option<&Path>,
    parser: &dyn DeclarationParser,
) -> Result<ParsedSource, StubgenError> {
    let module_name = match (module_name, pyx_path) {
        (Some(name), _) => name.to_string(),
        (None, Some(path)) => path_to_module_name(path),
        (None, None) => DEFAULT_MODULE_NAME.to_string(),
    };

    let source = preprocess::preprocess(&file_parsing::file_parsing_preprocess(pyx_path, code));
    let module = parser.parse_module(&source, &module_name)?;
    debug!(
        "Parsed module {module_name}: {} top-level statements",
        module.body.len()
    );
    Ok(ParsedSource { source, module })
}

/// Dotted module name for a source path, e.g. `pkg/my-mod.pyx` -> `pkg.my_mod`
pub fn path_to_module_name(path: &Path) -> String {
    let parts: Vec<String> = path
        .with_extension("")
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().replace(['-', '.', ' '], "_")),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        DEFAULT_MODULE_NAME.to_string()
    } else {
        parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::syntax::{CythonParser, Node};

    #[test]
    fn test_path_to_module_name() {
        assert_eq!(
            path_to_module_name(&PathBuf::from("pkg/sub-dir/my.mod.pyx")),
            "pkg.sub_dir.my_mod"
        );
        assert_eq!(path_to_module_name(Path::new("./a b.pyx")), "a_b");
        assert_eq!(path_to_module_name(Path::new("")), DEFAULT_MODULE_NAME);
    }

    #[test]
    fn test_parse_pyx_runs_every_stage() {
        let parsed = parse_pyx(
            "def f(x = *): pass\r\n",
            None,
            None,
            &CythonParser,
        )
        .unwrap();
        assert_eq!(parsed.module.name, DEFAULT_MODULE_NAME);
        assert_eq!(parsed.source, "def f(x = ...):\n    pass\n");
        assert!(matches!(&parsed.module.body[0], Node::Function(f) if f.name == "f"));
    }

    #[test]
    fn test_parse_pyx_reports_module_name() {
        let err = parse_pyx("x = (\n", None, Some(Path::new("pkg/mod.pyx")), &CythonParser)
            .unwrap_err();
        assert!(err.to_string().starts_with("pkg.mod:1:"));
    }
}
