use indexmap::IndexMap;
use std::sync::Arc;

use crate::error::{BundleError, Result};
use crate::graph::ModuleRecord;
use crate::resolver::{ModuleId, PathResolver};
use crate::transform::{Transform, Transformed};

/// Reads one module from disk, transforms it and resolves its imports.
pub struct ModuleCompiler<T> {
    resolver: Arc<PathResolver>,
    transform: Arc<T>,
}

impl<T> Clone for ModuleCompiler<T> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<T: Transform> ModuleCompiler<T> {
    pub fn new(resolver: Arc<PathResolver>, transform: T) -> Self {
        Self {
            resolver,
            transform: Arc::new(transform),
        }
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub async fn compile(&self, id: ModuleId) -> Result<ModuleRecord> {
        let path = self.resolver.path_of(&id);

        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(source) => return Err(BundleError::SourceNotFound { id, path, source }),
        };

        // Parsing, lowering and resolution (which probes the filesystem) all
        // run on the blocking pool.
        let transform = Arc::clone(&self.transform);
        let resolver = Arc::clone(&self.resolver);
        tokio::task::spawn_blocking(move || -> Result<ModuleRecord> {
            let Transformed { specifiers, code } = transform.transform(&id, &source)?;

            let mut dependencies = IndexMap::with_capacity(specifiers.len());
            for specifier in specifiers {
                let dep = resolver.resolve(&id, &specifier)?;
                dependencies.insert(specifier, dep);
            }

            Ok(ModuleRecord {
                id,
                dependencies,
                code,
            })
        })
        .await?
    }
}
