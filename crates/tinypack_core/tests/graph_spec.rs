mod common;

use common::{CountingTransform, Fixture};
use std::path::Path;
use std::sync::Arc;
use tinypack_core::{ErrorKind, GraphBuilder, ModuleId, ModuleTable, PathResolver, Result};

async fn build_graph(fixture: &Fixture, entry: &str) -> (Result<ModuleTable>, Arc<GraphBuilder<CountingTransform>>) {
    let resolver = Arc::new(PathResolver::new(fixture.root()));
    let builder = Arc::new(GraphBuilder::new(Arc::clone(&resolver), CountingTransform::default()));
    let entry = resolver.entry_id(Path::new(entry)).unwrap();
    (builder.build(&entry).await, builder)
}

fn dep<'t>(table: &'t ModuleTable, id: &str, specifier: &str) -> &'t str {
    table.get(id).unwrap().dependencies[specifier].as_str()
}

#[tokio::test]
async fn test_two_module_scenario() {
    let fixture = Fixture::new();
    fixture
        .write("a.js", "import './b.js';\n")
        .write("b.js", "export const value = 1;\n");

    let (table, builder) = build_graph(&fixture, "a.js").await;
    let table = table.unwrap();

    let ids: Vec<&str> = table.ids().map(ModuleId::as_str).collect();
    assert_eq!(ids, vec!["./a.js", "./b.js"]);
    assert_eq!(table.entry().as_str(), "./a.js");

    let a = table.get("./a.js").unwrap();
    assert_eq!(a.dependencies.len(), 1);
    assert_eq!(dep(&table, "./a.js", "./b.js"), "./b.js");
    assert!(table.get("./b.js").unwrap().dependencies.is_empty());

    assert!(table.is_closed());
    assert_eq!(builder.transform().calls().len(), 2);
}

#[tokio::test]
async fn test_diamond_compiles_shared_module_once() {
    let fixture = Fixture::new();
    fixture
        .write("main.js", "import './left.js';\nimport './right.js';\n")
        .write("left.js", "import { shared } from './lib/shared.js';\n")
        .write("right.js", "import * as s from './lib/../lib/shared.js';\n")
        .write("lib/shared.js", "export const shared = 1;\n");

    let (table, builder) = build_graph(&fixture, "main.js").await;
    let table = table.unwrap();

    assert_eq!(table.len(), 4);
    assert_eq!(builder.transform().count_for("./lib/shared.js"), 1);
    assert_eq!(builder.transform().calls().len(), 4);

    assert_eq!(dep(&table, "./left.js", "./lib/shared.js"), "./lib/shared.js");
    assert_eq!(dep(&table, "./right.js", "./lib/../lib/shared.js"), "./lib/shared.js");
    assert!(table.is_closed());
}

#[tokio::test]
async fn test_cycle_terminates() {
    let fixture = Fixture::new();
    fixture
        .write("a.js", "import { b } from './b.js';\nexport const a = 'a';\n")
        .write("b.js", "import { a } from './a.js';\nexport const b = 'b';\n");

    let (table, builder) = build_graph(&fixture, "a.js").await;
    let table = table.unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(dep(&table, "./a.js", "./b.js"), "./b.js");
    assert_eq!(dep(&table, "./b.js", "./a.js"), "./a.js");
    assert_eq!(builder.transform().calls().len(), 2);
}

#[tokio::test]
async fn test_self_import() {
    let fixture = Fixture::new();
    fixture.write("self.js", "import * as me from './self.js';\nexport const x = 1;\n");

    let (table, builder) = build_graph(&fixture, "self.js").await;
    let table = table.unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(dep(&table, "./self.js", "./self.js"), "./self.js");
    assert_eq!(builder.transform().calls().len(), 1);
}

#[tokio::test]
async fn test_compiles_each_file_once_regardless_of_edges() {
    const N: usize = 12;
    let fixture = Fixture::new();

    // Module i imports every module after it, plus itself and the entry.
    for i in 0..N {
        let mut source = String::new();
        for j in (i + 1)..N {
            source.push_str(&format!("import './m{j}.js';\n"));
        }
        source.push_str(&format!("import './m{i}.js';\nimport './m0.js';\n"));
        fixture.write(&format!("m{i}.js"), &source);
    }

    let (table, builder) = build_graph(&fixture, "m0.js").await;
    let table = table.unwrap();

    assert_eq!(table.len(), N);
    assert_eq!(builder.transform().calls().len(), N);
    for i in 0..N {
        assert_eq!(builder.transform().count_for(&format!("./m{i}.js")), 1);
    }
    assert!(table.is_closed());
}

#[tokio::test]
async fn test_same_specifier_from_different_directories() {
    let fixture = Fixture::new();
    fixture
        .write("index.js", "import './one/index.js';\nimport './two/index.js';\n")
        .write("one/index.js", "import { name } from './x.js';\n")
        .write("one/x.js", "export const name = 'one';\n")
        .write("two/index.js", "import { name } from './x.js';\n")
        .write("two/x.js", "export const name = 'two';\n");

    let (table, _) = build_graph(&fixture, "index.js").await;
    let table = table.unwrap();

    assert_eq!(dep(&table, "./one/index.js", "./x.js"), "./one/x.js");
    assert_eq!(dep(&table, "./two/index.js", "./x.js"), "./two/x.js");
    assert_eq!(table.len(), 5);
}

#[tokio::test]
async fn test_dependency_map_keeps_source_order() {
    let fixture = Fixture::new();
    fixture
        .write("a.js", "import './c.js';\nimport './b.js';\nimport { x } from './c.js';\nimport './b';\n")
        .write("b.js", "")
        .write("c.js", "export const x = 1;\n");

    let (table, _) = build_graph(&fixture, "a.js").await;
    let table = table.unwrap();

    let a = table.get("./a.js").unwrap();
    let specifiers: Vec<&str> = a.dependencies.keys().map(String::as_str).collect();
    assert_eq!(specifiers, vec!["./c.js", "./b.js", "./b"]);
    assert_eq!(dep(&table, "./a.js", "./b"), "./b.js");
    assert_eq!(table.len(), 3);
}

#[tokio::test]
async fn test_missing_dependency_fails() {
    let fixture = Fixture::new();
    fixture.write("a.js", "import './missing.js';\n");

    let (table, _) = build_graph(&fixture, "a.js").await;
    let err = table.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceNotFound);
    assert!(err.to_string().contains("./missing.js"));
}

#[tokio::test]
async fn test_missing_entry_fails() {
    let fixture = Fixture::new();

    let (table, builder) = build_graph(&fixture, "nope.js").await;
    assert_eq!(table.unwrap_err().kind(), ErrorKind::SourceNotFound);
    assert!(builder.transform().calls().is_empty());
}

#[tokio::test]
async fn test_syntax_error_names_file() {
    let fixture = Fixture::new();
    fixture
        .write("a.js", "import './broken.js';\n")
        .write("broken.js", "export const = ;\n");

    let (table, _) = build_graph(&fixture, "a.js").await;
    let err = table.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert!(err.to_string().contains("./broken.js"));
}

#[tokio::test]
async fn test_bare_import_is_unresolved() {
    let fixture = Fixture::new();
    fixture
        .write("a.js", "import React from 'react';\n")
        .write("node_modules/react/package.json", r#"{"main": "index.js"}"#)
        .write("node_modules/react/index.js", "export default {};\n");

    let (table, _) = build_graph(&fixture, "a.js").await;
    let err = table.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnresolvedImport);
    assert!(err.to_string().contains("react"));
}
