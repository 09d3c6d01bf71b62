//! Standard library detection for import grouping
//!
//! Classification uses ruff's stdlib tables pinned to one Python version so
//! that generated stubs sort the same way regardless of the host interpreter.

use ruff_python_stdlib::sys;

use crate::types::ImportSection;

/// Minor version of Python 3 whose stdlib table is used for grouping
pub const PYTHON_MINOR_VERSION: u8 = 10;

/// Check if a module name represents a Python standard library module
///
/// Submodules are recognised through their top-level package, so both `os`
/// and `os.path` are stdlib.
pub fn is_stdlib_module(module_name: &str, python_version: u8) -> bool {
    // Not part of ruff's table
    if module_name == "__future__" {
        return true;
    }

    if sys::is_known_standard_library(python_version, module_name) {
        return true;
    }

    module_name
        .split('.')
        .next()
        .is_some_and(|top_level| sys::is_known_standard_library(python_version, top_level))
}

/// Section an import of `module_name` at relative `level` belongs to
pub fn import_section(module_name: &str, level: u32) -> ImportSection {
    if level > 0 {
        ImportSection::Local
    } else if module_name == "__future__" {
        ImportSection::Future
    } else if is_stdlib_module(module_name, PYTHON_MINOR_VERSION) {
        ImportSection::StandardLibrary
    } else {
        ImportSection::ThirdParty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stdlib_module() {
        let py_version = 10;

        assert!(
            is_stdlib_module("__future__", py_version),
            "__future__ should be recognized as stdlib"
        );

        assert!(is_stdlib_module("os", py_version));
        assert!(is_stdlib_module("sys", py_version));
        assert!(is_stdlib_module("typing", py_version));

        assert!(is_stdlib_module("os.path", py_version));
        assert!(is_stdlib_module("collections.abc", py_version));

        assert!(!is_stdlib_module("numpy", py_version));
        assert!(!is_stdlib_module("cython", py_version));
        assert!(!is_stdlib_module("libc.math", py_version));
    }

    #[test]
    fn test_import_section() {
        assert_eq!(import_section("__future__", 0), ImportSection::Future);
        assert_eq!(import_section("typing", 0), ImportSection::StandardLibrary);
        assert_eq!(import_section("numpy", 0), ImportSection::ThirdParty);
        assert_eq!(import_section("", 1), ImportSection::Local);
        assert_eq!(import_section("pkg.mod", 2), ImportSection::Local);
    }
}
