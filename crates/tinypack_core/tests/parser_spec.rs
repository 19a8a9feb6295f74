use tinypack_core::parser::extract_dependencies;
use tinypack_core::{ErrorKind, ModuleId};

#[test]
fn test_import_parsing() {
    let source = r#"
        import { foo } from "./utils.js";
        import * as bar from '../lib/bar';
        import "side-effect";
        import baz, { qux } from "./utils.js";
        const x = 1;
    "#;

    let deps = extract_dependencies(source, &ModuleId::from("./src/test.js")).unwrap();

    assert_eq!(deps, vec!["./utils.js", "../lib/bar", "side-effect"]);
}

#[test]
fn test_type_only_imports_skipped() {
    let source = r#"
        import type { Props } from "./types";
        import { render } from "./render";
    "#;

    let deps = extract_dependencies(source, &ModuleId::from("./src/view.ts")).unwrap();
    assert_eq!(deps, vec!["./render"]);
}

#[test]
fn test_dynamic_import_is_not_a_dependency() {
    let source = "const lazy = () => import('./lazy.js');";
    let deps = extract_dependencies(source, &ModuleId::from("./a.js")).unwrap();
    assert!(deps.is_empty());
}

#[test]
fn test_parse_error() {
    let err = extract_dependencies("import {", &ModuleId::from("./a.js")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
}
