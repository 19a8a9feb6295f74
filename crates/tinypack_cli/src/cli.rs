//! Command-line interface for tinypack.

use clap::Parser;
use std::path::{Path, PathBuf};
use tinypack_core::config::DEFAULT_CONFIG_FILE;
use tinypack_core::{BundleError, Config, OutputConfig};

/// tinypack - bundle an ES module graph into a single script
#[derive(Parser, Debug)]
#[command(name = "tinypack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file (defaults to ./tinypack.config.json when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Entry module
    #[arg(short, long)]
    pub entry: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long)]
    pub output_path: Option<PathBuf>,

    /// Output file name
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Directory module ids are relative to
    #[arg(long)]
    pub context: Option<PathBuf>,
}

impl Cli {
    /// Config file values overlaid with whatever flags were given.
    pub fn config(&self) -> Result<Config, BundleError> {
        let file = match &self.config {
            Some(path) => Some(Config::from_file(path)?),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Some(Config::from_file(Path::new(DEFAULT_CONFIG_FILE))?)
            }
            None => None,
        };

        let entry = self
            .entry
            .clone()
            .or_else(|| file.as_ref().map(|c| c.entry.clone()))
            .ok_or_else(|| missing("entry"))?;
        let path = self
            .output_path
            .clone()
            .or_else(|| file.as_ref().map(|c| c.output.path.clone()))
            .ok_or_else(|| missing("output path"))?;
        let filename = self
            .filename
            .clone()
            .or_else(|| file.as_ref().map(|c| c.output.filename.clone()))
            .ok_or_else(|| missing("output filename"))?;
        let context = self
            .context
            .clone()
            .or_else(|| file.as_ref().and_then(|c| c.context.clone()));

        let config = Config {
            entry,
            output: OutputConfig { path, filename },
            context,
        };
        config.validate()?;
        Ok(config)
    }
}

fn missing(what: &str) -> BundleError {
    BundleError::Config(format!("no {what} given (use a config file or pass it as a flag)"))
}
