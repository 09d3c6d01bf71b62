use std::fs;

use pretty_assertions::assert_eq;
use stubgen_pyx::{Config, StubGenerator};
use tempfile::TempDir;

const GEOMETRY_PYX: &str = r#""""Geometry helpers."""
import os
import sys
from libc.math cimport sqrt

ctypedef double real_t

cdef class Point:
    """A point in the plane."""
    cdef public double x, y

    def __init__(self, double x=0, double y=0):
        self.x = x; self.y = y

    cpdef real_t norm(self):
        return sqrt(self.x * self.x + self.y * self.y)

    cdef void _reset(self):
        self.x = 0

def distance(Point a, Point b, *, bint squared=False) -> double:
    """Distance between two points."""
    return 0.0

def _helper(): pass
"#;

fn generator(config: Config) -> StubGenerator {
    StubGenerator::new(config)
}

#[test]
fn test_convert_directory_with_companion() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(pkg.join("geometry.pyx"), GEOMETRY_PYX).unwrap();
    fs::write(
        pkg.join("geometry.pxd"),
        "cpdef enum Quadrant:\n    FIRST\n    SECOND\n",
    )
    .unwrap();

    let pattern = format!("{}/**/*.pyx", temp_dir.path().display());
    let results = generator(Config::default())
        .convert_glob(&pattern, None)
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_success(), "{}", results[0].status_message());
    let stub = fs::read_to_string(pkg.join("geometry.pyi")).unwrap();
    let expected = format!(
        r#""""Geometry helpers."""

from __future__ import annotations

class Quadrant:
    FIRST: int
    SECOND: int

class Point:
    """A point in the plane."""
    def norm(self) -> real_t:
        ...
    def __init__(self, x: float = 0, y: float = 0):
        ...

real_t = float

def distance(a: Point, b: Point, *, squared: bool = False) -> float:
    """Distance between two points."""

# This file was generated by stubgen-pyx from {}
"#,
        pkg.join("geometry.pyx").display()
    );
    assert_eq!(stub, expected);
}

#[test]
fn test_output_dir_and_options() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("geometry.pyx");
    fs::write(&source, GEOMETRY_PYX).unwrap();
    let output_dir = temp_dir.path().join("out");

    let config = Config {
        include_private: true,
        no_trim_imports: true,
        exclude_epilog: true,
        ..Config::default()
    };
    let pyi = generator(config)
        .convert_file(&source, Some(&output_dir))
        .unwrap();

    assert_eq!(pyi, output_dir.join("geometry.pyi"));
    let stub = fs::read_to_string(pyi).unwrap();
    assert!(stub.contains("import os\nimport sys\n\nfrom libc.math import sqrt\n"));
    assert!(stub.contains("def _helper():"));
    assert!(!stub.contains("_reset"));
    assert!(!stub.contains("# This file was generated"));
}

#[test]
fn test_continue_on_error_collects_failures() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("good.pyx"), "def ok(): pass\n").unwrap();
    fs::write(temp_dir.path().join("bad.pyx"), "def broken(:\n").unwrap();
    let pattern = format!("{}/*.pyx", temp_dir.path().display());

    let config = Config {
        continue_on_error: true,
        ..Config::default()
    };
    let results = generator(config).convert_glob(&pattern, None).unwrap();
    assert_eq!(results.len(), 2);
    let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].pyx_file.ends_with("bad.pyx"));
    assert!(temp_dir.path().join("good.pyi").exists());
    assert!(!temp_dir.path().join("bad.pyi").exists());

    let err = generator(Config::default())
        .convert_glob(&pattern, None)
        .unwrap_err();
    assert!(format!("{err:#}").contains("bad.pyx"));
}

#[test]
fn test_companion_can_be_disabled() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("mod.pyx"), "def f(): pass\n").unwrap();
    fs::write(temp_dir.path().join("mod.pxd"), "cpdef enum E:\n    A\n").unwrap();

    let config = Config {
        no_pxd_to_stubs: true,
        exclude_epilog: true,
        ..Config::default()
    };
    let pyi = generator(config)
        .convert_file(&temp_dir.path().join("mod.pyx"), None)
        .unwrap();
    assert_eq!(
        fs::read_to_string(pyi).unwrap(),
        "from __future__ import annotations\n\ndef f():\n    ...\n"
    );
}

#[test]
fn test_declaration_file_is_not_its_own_companion() {
    let temp_dir = TempDir::new().unwrap();
    let pxd = temp_dir.path().join("colors.pxd");
    fs::write(&pxd, "cpdef enum Color:\n    RED\n    GREEN\n").unwrap();

    let config = Config {
        exclude_epilog: true,
        ..Config::default()
    };
    let pyi = generator(config).convert_file(&pxd, None).unwrap();
    assert_eq!(pyi, temp_dir.path().join("colors.pyi"));

    let stub = fs::read_to_string(pyi).unwrap();
    assert_eq!(stub.matches("class Color").count(), 1);
    assert_eq!(stub.matches("RED: int").count(), 1);
}

#[test]
fn test_include_directive() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("shared.pxi"), "def shared(x: int) -> int: ...\n").unwrap();
    fs::write(
        temp_dir.path().join("main.pyx"),
        "include \"shared.pxi\"\n\ndef own(): pass\n",
    )
    .unwrap();

    let config = Config {
        exclude_epilog: true,
        ..Config::default()
    };
    let pyi = generator(config)
        .convert_file(&temp_dir.path().join("main.pyx"), None)
        .unwrap();
    let stub = fs::read_to_string(pyi).unwrap();
    assert!(stub.contains("def shared(x: int) -> int:"));
    assert!(stub.contains("def own():"));
}

#[test]
fn test_empty_glob() {
    let temp_dir = TempDir::new().unwrap();
    let pattern = format!("{}/**/*.pyx", temp_dir.path().display());
    let results = generator(Config::default())
        .convert_glob(&pattern, None)
        .unwrap();
    assert!(results.is_empty());
}
