//! Module graph discovery.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::compiler::ModuleCompiler;
use crate::error::Result;
use crate::resolver::{ModuleId, PathResolver};
use crate::transform::Transform;

/// One bundled module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    #[serde(skip)]
    pub id: ModuleId,
    /// Raw specifier as written in the source -> resolved module id.
    pub dependencies: IndexMap<String, ModuleId>,
    pub code: String,
}

/// All modules of one build, keyed by canonical id.
///
/// Kept ordered by id so that the serialized table does not depend on the
/// order in which modules were discovered.
#[derive(Clone, Debug)]
pub struct ModuleTable {
    entry: ModuleId,
    modules: BTreeMap<ModuleId, ModuleRecord>,
}

impl ModuleTable {
    pub fn new(entry: ModuleId) -> Self {
        Self {
            entry,
            modules: BTreeMap::new(),
        }
    }

    pub fn entry(&self) -> &ModuleId {
        &self.entry
    }

    /// Adds `record` unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, record: ModuleRecord) -> bool {
        match self.modules.entry(record.id.clone()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ModuleRecord> {
        self.modules.get(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    pub fn records(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.values()
    }

    /// `(importer, dependency)` pairs whose dependency has no record.
    pub fn missing_dependencies(&self) -> Vec<(&ModuleId, &ModuleId)> {
        self.modules
            .values()
            .flat_map(|record| record.dependencies.values().map(move |dep| (&record.id, dep)))
            .filter(|(_, dep)| !self.modules.contains_key(*dep))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.contains(self.entry.as_str()) && self.missing_dependencies().is_empty()
    }

    /// `{ id: { "dependencies": { spec: id }, "code": string } }`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.modules)
    }
}

/// Walks the import graph from an entry module and builds its [`ModuleTable`].
pub struct GraphBuilder<T> {
    compiler: ModuleCompiler<T>,
}

impl<T: Transform> GraphBuilder<T> {
    pub fn new(resolver: Arc<PathResolver>, transform: T) -> Self {
        Self {
            compiler: ModuleCompiler::new(resolver, transform),
        }
    }

    pub fn transform(&self) -> &T {
        self.compiler.transform()
    }

    /// Breadth-first discovery. Each batch is the whole current worklist,
    /// compiled concurrently; the table and the visited set are only touched
    /// here, in worklist order, so the outcome does not depend on scheduling.
    pub async fn build(&self, entry: &ModuleId) -> Result<ModuleTable> {
        tracing::info!("Building module graph from {}", entry);

        let mut table = ModuleTable::new(entry.clone());
        let mut visited = HashSet::from([entry.clone()]);
        let mut worklist = VecDeque::from([entry.clone()]);

        while !worklist.is_empty() {
            let batch: Vec<ModuleId> = worklist
                .drain(..)
                .filter(|id| !table.contains(id.as_str()))
                .collect();
            let compiled = self.compile_batch(&batch).await?;

            for record in compiled {
                tracing::debug!("compiled {} ({} dependencies)", record.id, record.dependencies.len());

                let deps: Vec<ModuleId> = record.dependencies.values().cloned().collect();
                // Recorded before its dependencies are queued: a cycle back to
                // the module finds it already present.
                table.insert(record);

                for dep in deps {
                    if visited.insert(dep.clone()) {
                        worklist.push_back(dep);
                    }
                }
            }
        }

        debug_assert!(table.is_closed());
        tracing::info!("Module graph complete: {} modules", table.len());
        Ok(table)
    }

    async fn compile_batch(&self, batch: &[ModuleId]) -> Result<Vec<ModuleRecord>> {
        let mut tasks = JoinSet::new();
        for (index, id) in batch.iter().enumerate() {
            let compiler = self.compiler.clone();
            let id = id.clone();
            tasks.spawn(async move { (index, compiler.compile(id).await) });
        }

        let mut results: Vec<Option<Result<ModuleRecord>>> = (0..batch.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined?;
            results[index] = Some(result);
        }

        // First failure in worklist order wins.
        results.into_iter().flatten().collect()
    }
}
