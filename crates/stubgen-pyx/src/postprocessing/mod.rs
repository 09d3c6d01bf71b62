//! Postprocessing of rendered stub text
//!
//! The builder's output is always parsed first, even with every stage
//! disabled, so invalid output is reported instead of written. Stages run in
//! a fixed order: usage collection and import trimming, name normalization
//! and import deduplication on the tree; then re-rendering, import sorting
//! and the trailer on text.

mod deduplicate_imports;
mod normalize_names;
mod render;
mod sort_imports;
mod trailer;
mod trim_imports;

use std::path::Path;

use log::debug;
use ruff_python_codegen::Stylist;
use ruff_python_parser::parse_module;

pub use self::{
    deduplicate_imports::deduplicate_imports,
    normalize_names::{normalize_names, python_type_name},
    render::render_module,
    sort_imports::sort_imports,
    trailer::{TRAILER_PREFIX, append_trailer},
    trim_imports::trim_imports,
};
use crate::{config::Config, error::StubgenError, visitors::SymbolUsageVisitor};

/// Which postprocessing stages run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostprocessOptions {
    pub trim_imports: bool,
    pub normalize_names: bool,
    pub deduplicate_imports: bool,
    pub sort_imports: bool,
    pub trailer: bool,
}

impl Default for PostprocessOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PostprocessOptions {
    fn from(config: &Config) -> Self {
        Self {
            trim_imports: !config.no_trim_imports,
            normalize_names: !config.no_normalize_names,
            deduplicate_imports: !config.no_deduplicate_imports,
            sort_imports: !config.no_sort_imports,
            trailer: !config.exclude_epilog,
        }
    }
}

/// Run every enabled stage over the builder's output
pub fn postprocess(
    text: &str,
    pyx_path: Option<&Path>,
    options: PostprocessOptions,
) -> Result<String, StubgenError> {
    let parsed = parse_module(text).map_err(|err| StubgenError::RenderedTextInvalid {
        message: err.to_string(),
    })?;
    let stylist = Stylist::from_tokens(parsed.tokens(), text);
    let mut body = parsed.syntax().body.to_vec();

    if options.trim_imports {
        let used_names = SymbolUsageVisitor::collect_used_symbols(&body);
        debug!("Collected {} used names", used_names.len());
        trim_imports(&mut body, &used_names);
    }
    if options.normalize_names {
        normalize_names(&mut body);
    }
    if options.deduplicate_imports {
        deduplicate_imports(&mut body);
    }

    let mut rendered = render_module(&stylist, &body);
    if options.sort_imports {
        rendered = sort_imports(&rendered)?;
    }
    if options.trailer {
        rendered = append_trailer(&rendered, pyx_path);
    }
    Ok(rendered)
}
