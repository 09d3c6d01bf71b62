use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use stubgen_pyx::{
    Config, StubGenerator,
    config::ConfigLayer,
};

#[derive(Parser, Debug)]
#[command(name = "stubgen-pyx", version, about = "Generate .pyi stubs from Cython sources")]
struct Cli {
    /// Directory searched for `.pyx` files
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Glob pattern of files to convert, instead of DIR/**/*.pyx
    #[arg(long)]
    file: Option<String>,

    /// Write stubs here instead of next to their sources
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Configuration file applied after user and project configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    no_sort_imports: bool,

    #[arg(long)]
    no_trim_imports: bool,

    #[arg(long)]
    no_normalize_names: bool,

    /// Ignore `.pxd` files next to the converted sources
    #[arg(long)]
    no_pxd_to_stubs: bool,

    #[arg(long)]
    no_deduplicate_imports: bool,

    /// Omit the generation banner at the end of each stub
    #[arg(long)]
    exclude_epilog: bool,

    /// Keep converting after a file fails
    #[arg(long)]
    continue_on_error: bool,

    /// Include functions with private names
    #[arg(long)]
    include_private: bool,
}

impl Cli {
    /// Flags that were passed; absent flags leave configured values alone
    fn config_layer(&self) -> ConfigLayer {
        let set = |flag: bool| flag.then_some(true);
        ConfigLayer {
            no_sort_imports: set(self.no_sort_imports),
            no_trim_imports: set(self.no_trim_imports),
            no_pxd_to_stubs: set(self.no_pxd_to_stubs),
            no_normalize_names: set(self.no_normalize_names),
            no_deduplicate_imports: set(self.no_deduplicate_imports),
            exclude_epilog: set(self.exclude_epilog),
            continue_on_error: set(self.continue_on_error),
            verbose: set(self.verbose),
            include_private: set(self.include_private),
        }
    }

    fn pattern(&self) -> String {
        self.file.clone().unwrap_or_else(|| {
            self.dir
                .join("**")
                .join("*.pyx")
                .to_string_lossy()
                .into_owned()
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every file converted
fn run(cli: &Cli) -> Result<bool> {
    let config = Config::load(Some(&cli.dir), cli.config.as_deref(), cli.config_layer());
    init_logging(config.as_ref().is_ok_and(|config| config.verbose));
    let config = config?;
    config.validate();

    let generator = StubGenerator::new(config);
    let results = generator.convert_glob(&cli.pattern(), cli.output_dir.as_deref())?;

    let mut all_succeeded = true;
    for result in &results {
        if result.is_success() {
            info!("{}", result.status_message());
        } else {
            error!("{}", result.status_message());
            all_succeeded = false;
        }
    }
    Ok(all_succeeded)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
