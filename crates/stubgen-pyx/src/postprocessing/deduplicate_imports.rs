//! Last-wins deduplication of top-level imports
//!
//! Of several imports binding the same name only the textually last one has
//! any effect, so earlier ones are dropped. Wildcard imports are keyed by
//! their module. Plain imports key on the full dotted name: `import a.b`
//! and `import a.c` both stay.

use log::trace;
use ruff_python_ast::{Stmt, StmtImportFrom};

use super::trim_imports::bound_name;
use crate::types::{FxIndexMap, FxIndexSet};

/// Position of one import entry: statement index, entry index
type EntryPosition = (usize, usize);

pub fn deduplicate_imports(body: &mut Vec<Stmt>) {
    let kept: FxIndexSet<EntryPosition> = last_bindings(body).into_values().collect();

    let mut index = 0;
    body.retain_mut(|stmt| {
        let stmt_index = index;
        index += 1;
        let names = match stmt {
            Stmt::Import(import) => &mut import.names,
            Stmt::ImportFrom(import) => &mut import.names,
            _ => return true,
        };
        let mut entry_index = 0;
        names.retain(|_| {
            let position = (stmt_index, entry_index);
            entry_index += 1;
            let keep = kept.contains(&position);
            if !keep {
                trace!("Dropping shadowed import entry {position:?}");
            }
            keep
        });
        !names.is_empty()
    });
}

/// Last entry binding each key
fn last_bindings(body: &[Stmt]) -> FxIndexMap<String, EntryPosition> {
    let mut last = FxIndexMap::default();
    for (stmt_index, stmt) in body.iter().enumerate() {
        match stmt {
            Stmt::Import(import) => {
                for (entry_index, alias) in import.names.iter().enumerate() {
                    last.insert(bound_name(alias).to_string(), (stmt_index, entry_index));
                }
            }
            Stmt::ImportFrom(import) => {
                for (entry_index, alias) in import.names.iter().enumerate() {
                    let key = if alias.name.as_str() == "*" {
                        format!("*:{}", from_module(import))
                    } else {
                        bound_name(alias).to_string()
                    };
                    last.insert(key, (stmt_index, entry_index));
                }
            }
            _ => {}
        }
    }
    last
}

/// Module spelled with its leading dots, e.g. `..pkg`
pub(crate) fn from_module(import: &StmtImportFrom) -> String {
    let mut module = ".".repeat(import.level as usize);
    if let Some(name) = &import.module {
        module.push_str(name.as_str());
    }
    module
}
