//! Visitors over the declaration tree and over rendered stub syntax
//!
//! The declaration collectors bucket what a module exposes before
//! conversion; the usage visitor walks the re-parsed stub text.

mod declaration_collector;
mod import_collector;
mod symbol_usage_visitor;

pub use declaration_collector::{
    ClassCollector, CollectedAssignment, ModuleCollector, ScopeCollector,
};
pub use import_collector::{CollectedImport, ImportCollector};
pub use symbol_usage_visitor::SymbolUsageVisitor;
