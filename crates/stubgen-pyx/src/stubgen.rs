//! Conversion facade: strings, single files and glob batches
//!
//! Files are converted independently and in parallel. With
//! `continue_on_error` every failure becomes a [`ConversionResult`];
//! otherwise the first failure aborts the batch.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    builder::Builder,
    config::Config,
    conversion::Converter,
    error::StubgenError,
    model::{StubImport, StubModule},
    parsing::parse_pyx,
    postprocessing::{PostprocessOptions, postprocess},
    syntax::{CythonParser, DeclarationParser},
    visitors::ModuleCollector,
};

/// Import added to every stub so annotations are never evaluated
pub const FUTURE_IMPORT: &str = "from __future__ import annotations";

/// Outcome of converting one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub pyx_file: PathBuf,
    pub pyi_file: PathBuf,
    /// Rendered error chain when the conversion failed
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn status_message(&self) -> String {
        match &self.error {
            None => format!(
                "Converted {} to {}",
                self.pyx_file.display(),
                self.pyi_file.display()
            ),
            Some(error) => format!("Failed to convert {}: {error}", self.pyx_file.display()),
        }
    }
}

/// Converts Cython sources into `.pyi` stubs
#[derive(Debug, Clone, Default)]
pub struct StubGenerator<P = CythonParser> {
    config: Config,
    parser: P,
}

impl StubGenerator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            parser: CythonParser::new(),
        }
    }
}

impl<P: DeclarationParser> StubGenerator<P> {
    /// Generator using a different declaration parser
    pub fn with_parser(config: Config, parser: P) -> Self {
        Self { config, parser }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert a `.pyx` source and its optional `.pxd` companion to stub text
    pub fn convert_str(
        &self,
        pyx: &str,
        pxd: Option<&str>,
        pyx_path: Option<&Path>,
    ) -> Result<String, StubgenError> {
        let mut module = self.convert_module(pyx, pyx_path)?;
        if let Some(pxd) = pxd {
            let pxd_path = pyx_path.map(|path| path.with_extension("pxd"));
            module.merge_companion(self.convert_module(pxd, pxd_path.as_deref())?);
        }
        module.imports.push(StubImport::new(FUTURE_IMPORT));

        let text = Builder::new(self.config.include_private).build_module(&module);
        let text = postprocess(&text, pyx_path, PostprocessOptions::from(&self.config))?;
        Ok(text.trim().to_string())
    }

    fn convert_module(&self, code: &str, path: Option<&Path>) -> Result<StubModule, StubgenError> {
        let parsed = parse_pyx(code, None, path, &self.parser)?;
        let collector = ModuleCollector::new(&parsed.module);
        Converter::new(&parsed.source).convert_module(&collector)
    }

    /// Convert one file and write the stub, returning the stub's path
    pub fn convert_file(&self, pyx_file: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
        debug!("Converting {}", pyx_file.display());
        let pyx = fs::read_to_string(pyx_file)
            .with_context(|| format!("Failed to read {}", pyx_file.display()))?;
        let pxd = self.read_companion(pyx_file);

        let stub = self
            .convert_str(&pyx, pxd.as_deref(), Some(pyx_file))
            .with_context(|| format!("Failed to convert {}", pyx_file.display()))?;

        let pyi_file = pyi_path(pyx_file, output_dir);
        if let Some(parent) = pyi_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&pyi_file, format!("{stub}\n"))
            .with_context(|| format!("Failed to write {}", pyi_file.display()))?;
        Ok(pyi_file)
    }

    /// The `.pxd` next to `pyx_file`, unless disabled, missing or unreadable
    ///
    /// A `.pxd` being converted on its own has no companion.
    fn read_companion(&self, pyx_file: &Path) -> Option<String> {
        if self.config.no_pxd_to_stubs {
            return None;
        }
        let pxd_file = pyx_file.with_extension("pxd");
        if pxd_file == pyx_file || !pxd_file.is_file() {
            return None;
        }
        match fs::read_to_string(&pxd_file) {
            Ok(text) => {
                debug!("Merging companion {}", pxd_file.display());
                Some(text)
            }
            Err(err) => {
                warn!("Skipping unreadable companion {}: {err}", pxd_file.display());
                None
            }
        }
    }

    /// Convert every file matching `pattern`, in discovery order
    pub fn convert_glob(
        &self,
        pattern: &str,
        output_dir: Option<&Path>,
    ) -> Result<Vec<ConversionResult>> {
        let files = discover_files(pattern)?;
        if files.is_empty() {
            warn!("No files match {pattern}");
            return Ok(Vec::new());
        }
        info!("Converting {} files", files.len());

        let results: Vec<ConversionResult> = if self.config.continue_on_error {
            files
                .par_iter()
                .map(|file| {
                    let error = self
                        .convert_file(file, output_dir)
                        .err()
                        .map(|err| format!("{err:#}"));
                    ConversionResult {
                        pyx_file: file.clone(),
                        pyi_file: pyi_path(file, output_dir),
                        error,
                    }
                })
                .collect()
        } else {
            files
                .par_iter()
                .map(|file| {
                    self.convert_file(file, output_dir)
                        .map(|pyi_file| ConversionResult {
                            pyx_file: file.clone(),
                            pyi_file,
                            error: None,
                        })
                })
                .collect::<Result<_>>()?
        };

        let failed = results.iter().filter(|result| !result.is_success()).count();
        info!(
            "Converted {} of {} files",
            results.len() - failed,
            results.len()
        );
        Ok(results)
    }
}

fn discover_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries =
        glob::glob(pattern).with_context(|| format!("Invalid file pattern {pattern}"))?;
    Ok(entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("Skipping unreadable path: {err}");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect())
}

/// `<stem>.pyi` next to the source, or inside `output_dir`
pub fn pyi_path(pyx_file: &Path, output_dir: Option<&Path>) -> PathBuf {
    let sibling = pyx_file.with_extension("pyi");
    match (output_dir, sibling.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => sibling,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn generator() -> StubGenerator {
        StubGenerator::new(Config {
            exclude_epilog: true,
            ..Config::default()
        })
    }

    #[test]
    fn test_end_to_end_function() {
        let stub = generator()
            .convert_str("def add(a, b): return a + b\n", None, None)
            .unwrap();
        assert_eq!(
            stub,
            "from __future__ import annotations\n\ndef add(a, b):\n    ..."
        );
    }

    #[test]
    fn test_companion_is_merged() {
        let pyx = "cdef class Point:\n    def norm(self) -> double:\n        return 0.0\n";
        let pxd = "from libc.stdint cimport int64_t\ncdef class Point:\n    cdef double x\ncpdef enum Axis:\n    X\n    Y\n";
        let stub = generator().convert_str(pyx, Some(pxd), None).unwrap();
        assert_eq!(
            stub,
            "from __future__ import annotations\n\nclass Axis:\n    X: int\n    Y: int\n\nclass Point:\n    def norm(self) -> float:\n        ..."
        );
    }

    #[test]
    fn test_syntax_errors_propagate() {
        let err = generator()
            .convert_str("def f(:\n    pass\n", None, Some(Path::new("bad.pyx")))
            .unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn test_pyi_path() {
        assert_eq!(
            pyi_path(Path::new("pkg/mod.pyx"), None),
            PathBuf::from("pkg/mod.pyi")
        );
        assert_eq!(
            pyi_path(Path::new("pkg/mod.pyx"), Some(Path::new("out"))),
            PathBuf::from("out/mod.pyi")
        );
    }

    #[test]
    fn test_status_message() {
        let result = ConversionResult {
            pyx_file: PathBuf::from("a.pyx"),
            pyi_file: PathBuf::from("a.pyi"),
            error: Some("boom".to_string()),
        };
        assert!(!result.is_success());
        assert_eq!(result.status_message(), "Failed to convert a.pyx: boom");
    }
}
