//! Import specifier resolution.
//!
//! Module ids are forward-slash paths relative to the build context
//! directory, always starting with `./` or `../`. Two specifiers that name
//! the same file resolve to the same id; the graph builder relies on that
//! for deduplication.

use oxc_resolver::{ResolveOptions, Resolver};
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::{BundleError, Result};

/// Importer name reported when the entry itself cannot be mapped.
pub const ENTRY_IMPORTER: &str = "<entry>";

/// Canonical module identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory portion of the id (`./src/a.js` -> `./src`).
    pub fn dir(&self) -> &str {
        match self.0.rfind('/') {
            Some(i) => &self.0[..i],
            None => ".",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Specifiers we are able to map onto a file: `./x`, `../x`, `.` and `..`.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Lexically normalizes a slash-separated path into canonical id form.
///
/// Returns `None` when the path collapses to the context directory itself.
pub fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    let mut escapes = 0usize;

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    escapes += 1;
                }
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return None;
    }

    let mut out = if escapes == 0 {
        String::from(".")
    } else {
        vec![".."; escapes].join("/")
    };
    for s in segments {
        out.push('/');
        out.push_str(s);
    }
    Some(out)
}

fn to_slash(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_str()?),
            Component::CurDir => parts.push("."),
            Component::ParentDir => parts.push(".."),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}

fn unresolved(importer: impl fmt::Display, specifier: impl fmt::Display) -> BundleError {
    BundleError::UnresolvedImport {
        importer: importer.to_string(),
        specifier: specifier.to_string(),
    }
}

#[derive(Clone)]
pub struct PathResolver {
    context: PathBuf,
    canonical_context: PathBuf,
    probe: Arc<Resolver>,
}

impl PathResolver {
    pub fn new(context: &Path) -> Self {
        let context = if context.is_absolute() {
            context.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(context))
                .unwrap_or_else(|_| context.to_path_buf())
        };
        // oxc_resolver reports symlink-free paths; compare against the same form.
        let canonical_context = std::fs::canonicalize(&context).unwrap_or_else(|_| context.clone());

        let options = ResolveOptions {
            extensions: vec![".js".into(), ".mjs".into(), ".cjs".into()],
            ..ResolveOptions::default()
        };

        Self {
            context,
            canonical_context,
            probe: Arc::new(Resolver::new(options)),
        }
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    /// Filesystem location of a module.
    pub fn path_of(&self, id: &ModuleId) -> PathBuf {
        self.context.join(id.as_str())
    }

    /// Canonical id of the configured entry file.
    pub fn entry_id(&self, entry: &Path) -> Result<ModuleId> {
        let relative = if entry.is_absolute() {
            entry
                .strip_prefix(&self.context)
                .or_else(|_| entry.strip_prefix(&self.canonical_context))
                .map_err(|_| unresolved(ENTRY_IMPORTER, entry.display()))?
        } else {
            entry
        };

        let lexical = to_slash(relative)
            .and_then(|text| normalize(&text))
            .ok_or_else(|| unresolved(ENTRY_IMPORTER, entry.display()))?;
        Ok(self.settle(lexical))
    }

    /// Resolves `specifier` as written in `importer`.
    pub fn resolve(&self, importer: &ModuleId, specifier: &str) -> Result<ModuleId> {
        if !is_relative(specifier) {
            return Err(unresolved(importer, specifier));
        }

        let joined = format!("{}/{}", importer.dir(), specifier);
        let lexical = normalize(&joined).ok_or_else(|| unresolved(importer, specifier))?;
        Ok(self.settle(lexical))
    }

    /// Picks the final id for a lexically normalized path: the path itself if
    /// it is a file, otherwise whatever extension/index probing finds.
    fn settle(&self, lexical: String) -> ModuleId {
        if self.context.join(&lexical).is_file() {
            return ModuleId(lexical);
        }

        match self.probe.resolve(&self.context, &lexical) {
            Ok(resolution) => match self.id_for_path(resolution.path()) {
                Some(id) => {
                    tracing::debug!("probed {} -> {}", lexical, id);
                    id
                }
                None => ModuleId(lexical),
            },
            Err(_) => ModuleId(lexical),
        }
    }

    fn id_for_path(&self, path: &Path) -> Option<ModuleId> {
        let relative = match path
            .strip_prefix(&self.canonical_context)
            .or_else(|_| path.strip_prefix(&self.context))
        {
            Ok(inside) => to_slash(inside)?,
            Err(_) => escape_to(&self.canonical_context, path)?,
        };
        normalize(&relative).map(ModuleId)
    }
}

/// Slash path from `base` to `path` that climbs out with `..` segments.
/// `None` when the two share no root.
fn escape_to(base: &Path, path: &Path) -> Option<String> {
    let base: Vec<Component<'_>> = base.components().collect();
    let target: Vec<Component<'_>> = path.components().collect();

    let shared = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();
    if shared == 0 {
        return None;
    }

    let mut parts = vec![".."; base.len() - shared];
    for component in &target[shared..] {
        match component {
            Component::Normal(s) => parts.push(s.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}
