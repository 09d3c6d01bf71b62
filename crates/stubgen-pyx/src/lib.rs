//! Generate `.pyi` type stubs from Cython `.pyx`/`.pxd` sources
//!
//! The pipeline runs preprocessing, declaration parsing, collection,
//! conversion to the stub model, rendering and postprocessing.
//! [`stubgen::StubGenerator`] drives it for strings, files and glob batches.

pub mod builder;
pub mod config;
pub mod conversion;
pub mod error;
pub mod model;
pub mod parsing;
pub mod postprocessing;
pub mod stdlib_detection;
pub mod stubgen;
pub mod syntax;
pub mod types;
pub mod visitors;

pub use config::Config;
pub use error::StubgenError;
pub use stubgen::{ConversionResult, StubGenerator};
