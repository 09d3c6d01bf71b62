//! Layered configuration
//!
//! Settings are read, in increasing precedence, from the built-in defaults,
//! the user config directory, the project (`stubgen-pyx.toml` or
//! `[tool.stubgen-pyx]` in `pyproject.toml`), an explicit `--config` file
//! and finally the command line. Each layer only overrides the keys it sets.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use etcetera::{BaseStrategy, choose_base_strategy};
use log::{debug, info, warn};
use serde::Deserialize;

/// File name of a standalone configuration file
pub const CONFIG_FILE_NAME: &str = "stubgen-pyx.toml";

/// Table name under `[tool]` in `pyproject.toml`
pub const PYPROJECT_TABLE: &str = "stubgen-pyx";

/// Effective settings of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub no_sort_imports: bool,
    pub no_trim_imports: bool,
    /// Ignore `.pxd` files next to the converted `.pyx` files
    pub no_pxd_to_stubs: bool,
    pub no_normalize_names: bool,
    pub no_deduplicate_imports: bool,
    /// Omit the generation banner
    pub exclude_epilog: bool,
    pub continue_on_error: bool,
    pub verbose: bool,
    pub include_private: bool,
}

/// Settings of one configuration source; unset keys leave lower layers alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLayer {
    pub no_sort_imports: Option<bool>,
    pub no_trim_imports: Option<bool>,
    pub no_pxd_to_stubs: Option<bool>,
    pub no_normalize_names: Option<bool>,
    pub no_deduplicate_imports: Option<bool>,
    pub exclude_epilog: Option<bool>,
    pub continue_on_error: Option<bool>,
    pub verbose: Option<bool>,
    pub include_private: Option<bool>,
}

impl ConfigLayer {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid stubgen-pyx configuration")
    }

    /// `[tool.stubgen-pyx]` of a `pyproject.toml`, if present
    pub fn from_pyproject(text: &str) -> Result<Option<Self>> {
        let document: toml::Table = toml::from_str(text).context("Invalid pyproject.toml")?;
        let Some(table) = document
            .get("tool")
            .and_then(|tool| tool.get(PYPROJECT_TABLE))
        else {
            return Ok(None);
        };
        let layer = table
            .clone()
            .try_into()
            .context("Invalid [tool.stubgen-pyx] table in pyproject.toml")?;
        Ok(Some(layer))
    }
}

impl Config {
    /// Resolve every file-based layer, then apply `cli` on top
    pub fn load(
        project_dir: Option<&Path>,
        config_path: Option<&Path>,
        cli: ConfigLayer,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = user_config_path().filter(|path| path.is_file()) {
            debug!("Loading user config from {}", path.display());
            config.apply(load_file(&path)?);
        }
        if let Some(dir) = project_dir
            && let Some(layer) = load_project_layer(dir)?
        {
            config.apply(layer);
        }
        if let Some(path) = config_path {
            debug!("Loading config from {}", path.display());
            config.apply(load_file(path)?);
        }
        config.apply(cli);
        Ok(config)
    }

    /// Override every key `layer` sets
    pub fn apply(&mut self, layer: ConfigLayer) {
        let ConfigLayer {
            no_sort_imports,
            no_trim_imports,
            no_pxd_to_stubs,
            no_normalize_names,
            no_deduplicate_imports,
            exclude_epilog,
            continue_on_error,
            verbose,
            include_private,
        } = layer;
        let pairs = [
            (&mut self.no_sort_imports, no_sort_imports),
            (&mut self.no_trim_imports, no_trim_imports),
            (&mut self.no_pxd_to_stubs, no_pxd_to_stubs),
            (&mut self.no_normalize_names, no_normalize_names),
            (&mut self.no_deduplicate_imports, no_deduplicate_imports),
            (&mut self.exclude_epilog, exclude_epilog),
            (&mut self.continue_on_error, continue_on_error),
            (&mut self.verbose, verbose),
            (&mut self.include_private, include_private),
        ];
        for (field, value) in pairs {
            if let Some(value) = value {
                *field = value;
            }
        }
    }

    /// Log settings that are legal but probably unintended
    pub fn validate(&self) {
        if self.no_sort_imports
            && self.no_trim_imports
            && self.no_normalize_names
            && self.no_deduplicate_imports
            && self.exclude_epilog
        {
            warn!("All postprocessing stages are disabled");
        }
        if self.continue_on_error {
            info!("Continuing past files that fail to convert");
        }
    }
}

/// `<config dir>/stubgen-pyx/stubgen-pyx.toml`
pub fn user_config_path() -> Option<PathBuf> {
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("stubgen-pyx").join(CONFIG_FILE_NAME))
}

fn load_file(path: &Path) -> Result<ConfigLayer> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    ConfigLayer::from_toml(&text).with_context(|| format!("In {}", path.display()))
}

/// `stubgen-pyx.toml` wins over `pyproject.toml` in the same directory
fn load_project_layer(dir: &Path) -> Result<Option<ConfigLayer>> {
    let standalone = dir.join(CONFIG_FILE_NAME);
    if standalone.is_file() {
        debug!("Loading project config from {}", standalone.display());
        return load_file(&standalone).map(Some);
    }

    let pyproject = dir.join("pyproject.toml");
    if !pyproject.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&pyproject)
        .with_context(|| format!("Failed to read {}", pyproject.display()))?;
    let layer = ConfigLayer::from_pyproject(&text)
        .with_context(|| format!("In {}", pyproject.display()))?;
    if layer.is_some() {
        debug!("Loading project config from {}", pyproject.display());
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_layer_overrides_only_set_keys() {
        let mut config = Config {
            no_sort_imports: true,
            verbose: true,
            ..Config::default()
        };
        config.apply(ConfigLayer {
            no_sort_imports: Some(false),
            include_private: Some(true),
            ..ConfigLayer::default()
        });
        assert_eq!(
            config,
            Config {
                verbose: true,
                include_private: true,
                ..Config::default()
            }
        );
    }

    #[test]
    fn test_parse_kebab_case_keys() {
        let layer = ConfigLayer::from_toml("no-trim-imports = true\nexclude-epilog = false\n")
            .unwrap();
        assert_eq!(layer.no_trim_imports, Some(true));
        assert_eq!(layer.exclude_epilog, Some(false));
        assert_eq!(layer.verbose, None);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(ConfigLayer::from_toml("no-such-option = true\n").is_err());
    }

    #[test]
    fn test_pyproject_table() {
        let text = "[project]\nname = \"pkg\"\n\n[tool.stubgen-pyx]\ninclude-private = true\n";
        let layer = ConfigLayer::from_pyproject(text).unwrap().unwrap();
        assert_eq!(layer.include_private, Some(true));

        assert_eq!(
            ConfigLayer::from_pyproject("[tool.other]\nx = 1\n").unwrap(),
            None
        );
    }

    #[test]
    fn test_project_and_explicit_layers() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.stubgen-pyx]\nno-sort-imports = true\ncontinue-on-error = true\n",
        )
        .unwrap();
        let explicit = dir.path().join("custom.toml");
        fs::write(&explicit, "continue-on-error = false\n").unwrap();

        let cli = ConfigLayer {
            exclude_epilog: Some(true),
            ..ConfigLayer::default()
        };
        let config = Config::load(Some(dir.path()), Some(&explicit), cli).unwrap();
        assert!(config.no_sort_imports);
        assert!(!config.continue_on_error);
        assert!(config.exclude_epilog);
    }

    #[test]
    fn test_standalone_file_wins_over_pyproject() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "no-trim-imports = true\n").unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.stubgen-pyx]\nno-sort-imports = true\n",
        )
        .unwrap();

        let layer = load_project_layer(dir.path()).unwrap().unwrap();
        assert_eq!(layer.no_trim_imports, Some(true));
        assert_eq!(layer.no_sort_imports, None);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Config::load(None, Some(&missing), ConfigLayer::default()).is_err());
    }
}
