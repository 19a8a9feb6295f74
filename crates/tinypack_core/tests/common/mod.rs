#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;

use tempfile::TempDir;
use tinypack_core::{Config, EsmTransform, ModuleId, Result, Transform, Transformed};

/// Throwaway project directory.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> &Self {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        self
    }

    pub fn config(&self, entry: &str) -> Config {
        Config::new(entry, "dist", "bundle.js").with_context(self.root())
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.root().join("dist/bundle.js")
    }
}

/// Wraps [`EsmTransform`] and records every module it is asked to compile.
#[derive(Default)]
pub struct CountingTransform {
    inner: EsmTransform,
    calls: Mutex<Vec<ModuleId>>,
}

impl CountingTransform {
    pub fn calls(&self) -> Vec<ModuleId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_for(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == id).count()
    }
}

impl Transform for CountingTransform {
    fn transform(&self, id: &ModuleId, source: &str) -> Result<Transformed> {
        self.calls.lock().unwrap().push(id.clone());
        self.inner.transform(id, source)
    }
}

/// Runs a bundle with node. `None` when node is not installed.
pub fn run_node(bundle: &Path) -> Option<Output> {
    let available = Command::new("node")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if !available {
        eprintln!("node not found on PATH, skipping bundle execution");
        return None;
    }
    Some(Command::new("node").arg(bundle).output().unwrap())
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
