use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{BundleError, Result};
use crate::graph::{GraphBuilder, ModuleTable};
use crate::resolver::{ModuleId, PathResolver};
use crate::runtime;
use crate::transform::EsmTransform;

/// Summary of a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub entry: ModuleId,
    pub output: PathBuf,
    pub modules: usize,
    pub bytes: usize,
}

/// Bundles the graph rooted at `config.entry` into `config.output_file()`.
///
/// Nothing is written unless every module was read, parsed and resolved.
pub async fn build(config: &Config) -> Result<BuildReport> {
    config.validate()?;

    let context = config.context_dir();
    tracing::info!("Starting build in {}", context.display());

    let resolver = Arc::new(PathResolver::new(&context));
    let entry = {
        let resolver = Arc::clone(&resolver);
        let path = config.entry.clone();
        tokio::task::spawn_blocking(move || resolver.entry_id(&path)).await??
    };
    tracing::info!("Entry point: {}", entry);

    let table = GraphBuilder::new(Arc::clone(&resolver), EsmTransform)
        .build(&entry)
        .await?;

    let output = config.output_file();
    let bytes = generate(&table, &output).await?;

    tracing::info!(
        "Build complete! {} modules, {} bytes written to {}",
        table.len(),
        bytes,
        output.display()
    );

    Ok(BuildReport {
        entry,
        output,
        modules: table.len(),
        bytes,
    })
}

/// Bundle text for `table`: the runtime loader applied to the serialized
/// table and its entry id.
pub fn render(table: &ModuleTable) -> Result<String> {
    let modules = table.to_json()?;
    let entry = serde_json::to_string(table.entry())?;
    Ok(runtime::bootstrap(&modules, &entry))
}

/// Renders `table` and writes it to `output`. Returns the artifact size.
pub async fn generate(table: &ModuleTable, output: &Path) -> Result<usize> {
    let bundle = render(table)?;
    let bytes = bundle.len();
    write_atomic(output.to_path_buf(), bundle).await?;
    Ok(bytes)
}

/// Writes through a temporary file in the target directory and renames it
/// into place, so `path` is either untouched or complete.
pub async fn write_atomic(path: PathBuf, contents: String) -> Result<()> {
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, contents.as_bytes())).await?
}

fn write_atomic_blocking(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| BundleError::io(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tinypack-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| BundleError::io(path, e))?;

    tmp.write_all(contents).map_err(|e| BundleError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| BundleError::io(path, e))?;

    // On failure the temporary file comes back inside the error and is
    // removed when dropped.
    tmp.persist(path).map_err(|e| BundleError::io(path, e.error))?;
    Ok(())
}
