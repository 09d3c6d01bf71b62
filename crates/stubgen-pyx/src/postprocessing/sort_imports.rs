//! Sorting of import blocks in rendered stub text
//!
//! Each run of consecutive top-level imports is regrouped into sections
//! (`__future__`, standard library, third party, local) separated by blank
//! lines. Statements between runs are never moved.

use std::collections::BTreeMap;

use log::trace;
use ruff_python_ast::{Stmt, StmtImport, StmtImportFrom};
use ruff_python_parser::parse_module;
use ruff_text_size::{Ranged, TextRange};

use super::deduplicate_imports::from_module;
use crate::{
    error::StubgenError,
    stdlib_detection::import_section,
    types::{FxIndexMap, FxIndexSet, ImportSection},
};

/// Longest line before a from-import is wrapped in parentheses
const LINE_LENGTH: usize = 79;

/// Sort every import block of `text`
pub fn sort_imports(text: &str) -> Result<String, StubgenError> {
    let parsed = parse_module(text).map_err(|err| StubgenError::RenderedTextInvalid {
        message: err.to_string(),
    })?;
    let body = &parsed.syntax().body;

    let mut out = String::with_capacity(text.len());
    let mut copied_until = 0;
    let mut index = 0;
    while index < body.len() {
        if !is_import(&body[index]) {
            index += 1;
            continue;
        }
        let start = index;
        while index < body.len() && is_import(&body[index]) {
            index += 1;
        }
        let run = &body[start..index];
        let range = TextRange::new(run[0].start(), run[run.len() - 1].end());
        trace!("Sorting {} imports at {range:?}", run.len());

        out.push_str(&text[copied_until..usize::from(range.start())]);
        out.push_str(&sort_block(run));
        copied_until = usize::from(range.end());
    }
    out.push_str(&text[copied_until..]);
    Ok(out)
}

fn is_import(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Import(_) | Stmt::ImportFrom(_))
}

/// Imports of one section
#[derive(Debug, Default)]
struct SectionImports {
    /// `import module [as alias]`
    plain: FxIndexSet<(String, Option<String>)>,
    from: FxIndexMap<String, FromImports>,
}

/// Everything imported from one module
#[derive(Debug, Default)]
struct FromImports {
    wildcard: bool,
    names: FxIndexSet<String>,
    aliased: FxIndexSet<(String, String)>,
}

fn sort_block(run: &[Stmt]) -> String {
    let mut sections: BTreeMap<ImportSection, SectionImports> = BTreeMap::new();
    for stmt in run {
        match stmt {
            Stmt::Import(import) => add_import(&mut sections, import),
            Stmt::ImportFrom(import) => add_import_from(&mut sections, import),
            _ => {}
        }
    }

    sections
        .iter()
        .map(|(section, imports)| {
            trace!("Rendering {section} imports");
            render_section(imports)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn add_import(sections: &mut BTreeMap<ImportSection, SectionImports>, import: &StmtImport) {
    for alias in &import.names {
        let module = alias.name.as_str();
        sections
            .entry(import_section(module, 0))
            .or_default()
            .plain
            .insert((
                module.to_string(),
                alias.asname.as_ref().map(|asname| asname.as_str().to_string()),
            ));
    }
}

fn add_import_from(
    sections: &mut BTreeMap<ImportSection, SectionImports>,
    import: &StmtImportFrom,
) {
    let module = from_module(import);
    let section = import_section(
        import.module.as_ref().map_or("", |module| module.as_str()),
        import.level,
    );
    let imports = sections
        .entry(section)
        .or_default()
        .from
        .entry(module)
        .or_default();
    for alias in &import.names {
        match (alias.name.as_str(), &alias.asname) {
            ("*", _) => imports.wildcard = true,
            (name, Some(asname)) => {
                imports
                    .aliased
                    .insert((name.to_string(), asname.as_str().to_string()));
            }
            (name, None) => {
                imports.names.insert(name.to_string());
            }
        }
    }
}

fn render_section(section: &SectionImports) -> String {
    let mut lines = Vec::new();

    let mut plain: Vec<_> = section.plain.iter().collect();
    plain.sort_by_key(|(module, alias)| (module.to_lowercase(), module.clone(), alias.clone()));
    for (module, alias) in plain {
        lines.push(match alias {
            Some(alias) => format!("import {module} as {alias}"),
            None => format!("import {module}"),
        });
    }

    let mut modules: Vec<_> = section.from.iter().collect();
    modules.sort_by_key(|(module, _)| (module.to_lowercase(), (*module).clone()));
    for (module, imports) in modules {
        if imports.wildcard {
            lines.push(format!("from {module} import *"));
        }
        if !imports.names.is_empty() {
            let mut names: Vec<&String> = imports.names.iter().collect();
            names.sort_by_key(|name| name_order(name));
            lines.push(from_line(module, &names));
        }
        let mut aliased: Vec<_> = imports.aliased.iter().collect();
        aliased.sort_by_key(|(name, asname)| (name_order(name), asname.clone()));
        for (name, asname) in aliased {
            lines.push(from_line(module, &[&format!("{name} as {asname}")]));
        }
    }
    lines.join("\n")
}

/// Constants, then classes, then everything else, each case-insensitively
fn name_order(name: &str) -> (u8, String, String) {
    let is_constant = name.len() > 1
        && name.chars().any(char::is_alphabetic)
        && !name.chars().any(char::is_lowercase);
    let rank = if is_constant {
        0
    } else if name.starts_with(|c: char| c.is_uppercase()) {
        1
    } else {
        2
    };
    (rank, name.to_lowercase(), name.to_string())
}

fn from_line(module: &str, names: &[&String]) -> String {
    let joined = names
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let line = format!("from {module} import {joined}");
    if line.len() <= LINE_LENGTH {
        return line;
    }
    let mut wrapped = format!("from {module} import (\n");
    for name in names {
        wrapped.push_str("    ");
        wrapped.push_str(name);
        wrapped.push_str(",\n");
    }
    wrapped.push(')');
    wrapped
}
