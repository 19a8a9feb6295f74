//! Build configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BundleError, Result};

/// Looked up in the working directory when no config file is named.
pub const DEFAULT_CONFIG_FILE: &str = "tinypack.config.json";

/// ```json
/// { "entry": "src/index.js", "output": { "path": "dist", "filename": "bundle.js" } }
/// ```
///
/// `entry` and `output.path` are relative to `context`, which defaults to the
/// directory of the config file, or the working directory for configs built
/// in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub entry: PathBuf,
    pub output: OutputConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub filename: String,
}

impl Config {
    pub fn new(entry: impl Into<PathBuf>, path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            output: OutputConfig {
                path: path.into(),
                filename: filename.into(),
            },
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<PathBuf>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Reads a JSON config file. A relative `context` is taken relative to
    /// the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BundleError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Config = serde_json::from_str(&text)
            .map_err(|e| BundleError::Config(format!("{}: {e}", path.display())))?;

        let base = path.parent().unwrap_or(Path::new("."));
        let context = config.context.take().unwrap_or_else(|| PathBuf::from("."));
        config.context = Some(base.join(context));

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entry.as_os_str().is_empty() {
            return Err(BundleError::Config("`entry` must not be empty".into()));
        }
        let filename = self.output.filename.as_str();
        if filename.is_empty() || filename == "." || filename == ".." {
            return Err(BundleError::Config("`output.filename` must name a file".into()));
        }
        if filename.contains(['/', '\\']) {
            return Err(BundleError::Config(format!(
                "`output.filename` must be a plain file name, got `{filename}`"
            )));
        }
        Ok(())
    }

    /// Absolute directory that module ids are relative to.
    pub fn context_dir(&self) -> PathBuf {
        let context = self.context.clone().unwrap_or_else(|| PathBuf::from("."));
        if context.is_absolute() {
            return context;
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(&context))
            .unwrap_or(context)
    }

    pub fn output_file(&self) -> PathBuf {
        self.context_dir()
            .join(&self.output.path)
            .join(&self.output.filename)
    }
}
