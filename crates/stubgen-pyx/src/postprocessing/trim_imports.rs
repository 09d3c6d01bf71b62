//! Removal of imports the stub never refers to

use log::trace;
use ruff_python_ast::{Alias, Stmt};

use crate::types::FxIndexSet;

/// Modules whose imports are kept even when nothing refers to them
const RESERVED_MODULES: &[&str] = &["__future__", "asyncio"];

/// Name an import alias binds: the `as` name if present, else the imported name
pub(crate) fn bound_name(alias: &Alias) -> &str {
    alias
        .asname
        .as_ref()
        .map_or_else(|| alias.name.as_str(), |asname| asname.as_str())
}

/// Drop unused entries from top-level imports, and emptied statements
///
/// Wildcard imports and imports of reserved modules are kept untouched.
pub fn trim_imports(body: &mut Vec<Stmt>, used_names: &FxIndexSet<String>) {
    body.retain_mut(|stmt| match stmt {
        Stmt::Import(import) => {
            import.names.retain(|alias| {
                RESERVED_MODULES.contains(&alias.name.as_str())
                    || is_used(alias, used_names)
            });
            !import.names.is_empty()
        }
        Stmt::ImportFrom(import) => {
            let module = import.module.as_ref().map(|module| module.as_str());
            if import.level == 0 && module.is_some_and(|m| RESERVED_MODULES.contains(&m)) {
                return true;
            }
            import
                .names
                .retain(|alias| alias.name.as_str() == "*" || is_used(alias, used_names));
            !import.names.is_empty()
        }
        _ => true,
    });
}

fn is_used(alias: &Alias, used_names: &FxIndexSet<String>) -> bool {
    let name = bound_name(alias);
    let used = used_names.contains(name);
    if !used {
        trace!("Trimming unused import {name}");
    }
    used
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ruff_python_parser::parse_module;

    use super::*;
    use crate::visitors::SymbolUsageVisitor;

    fn trim(code: &str) -> Vec<String> {
        let mut body = parse_module(code).expect("stub should parse").into_syntax().body.to_vec();
        let used = SymbolUsageVisitor::collect_used_symbols(&body);
        trim_imports(&mut body, &used);
        body.iter()
            .filter_map(|stmt| match stmt {
                Stmt::Import(import) => Some(
                    import
                        .names
                        .iter()
                        .map(|alias| bound_name(alias).to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                Stmt::ImportFrom(import) => Some(
                    import
                        .names
                        .iter()
                        .map(|alias| bound_name(alias).to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_unused_import_is_removed() {
        assert_eq!(
            trim("import sys\nimport os\nX = os.getcwd()\n"),
            vec!["os"]
        );
    }

    #[test]
    fn test_partial_from_import() {
        assert_eq!(
            trim("from typing import Any, List as L, Dict\ndef f(x: L) -> Any: ...\n"),
            vec!["Any,L"]
        );
    }

    #[test]
    fn test_dotted_import_uses_full_chain() {
        assert_eq!(
            trim("import os.path\nimport xml.dom\nX: os.path.PathLike\n"),
            vec!["os.path"]
        );
    }

    #[test]
    fn test_exempt_imports() {
        assert_eq!(
            trim("from __future__ import annotations\nfrom asyncio import Future\nfrom numpy import *\n"),
            vec!["annotations", "Future", "*"]
        );
    }

    #[test]
    fn test_string_annotation_keeps_import() {
        assert_eq!(
            trim("import numpy as np\ndef f(a: 'np.ndarray'): ...\n"),
            vec!["np"]
        );
    }
}
