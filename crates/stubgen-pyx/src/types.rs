//! Shared type definitions for the stubgen-pyx crate

use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Insertion-ordered hash map with the Fx hasher
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Insertion-ordered hash set with the Fx hasher
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Origin of an imported module, used to group import lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportSection {
    /// `from __future__ import ...`
    Future,

    /// Python standard library modules (e.g., os, sys, typing)
    StandardLibrary,

    /// Anything not recognised as stdlib or relative
    ThirdParty,

    /// Relative imports (`from . import x`)
    Local,
}

impl std::fmt::Display for ImportSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportSection::Future => write!(f, "future"),
            ImportSection::StandardLibrary => write!(f, "stdlib"),
            ImportSection::ThirdParty => write!(f, "third-party"),
            ImportSection::Local => write!(f, "local"),
        }
    }
}
