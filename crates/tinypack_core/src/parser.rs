//! Module parsing using oxc

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Program, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;

use crate::error::{BundleError, Result};
use crate::resolver::ModuleId;

/// Parses `source` as an ES module. Any diagnostic fails the module.
pub fn parse<'a>(allocator: &'a Allocator, id: &ModuleId, source: &'a str) -> Result<Program<'a>> {
    let source_type = SourceType::from_path(Path::new(id.as_str()))
        .unwrap_or_else(|_| SourceType::mjs())
        .with_module(true);

    let ret = Parser::new(allocator, source, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let mut message = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        if message.is_empty() {
            message.push_str("parser aborted");
        }
        tracing::warn!("Parsing errors in {}: {}", id, message);
        return Err(BundleError::Syntax {
            id: id.clone(),
            message,
        });
    }

    Ok(ret.program)
}

/// Import specifiers of a parsed module, in source order, each once.
///
/// Type-only imports are skipped; they vanish from the emitted code.
pub fn import_specifiers(program: &Program<'_>) -> IndexSet<String> {
    let mut deps = IndexSet::new();

    for stmt in &program.body {
        if let Statement::ImportDeclaration(decl) = stmt {
            if decl.import_kind.is_type() {
                continue;
            }
            deps.insert(decl.source.value.to_string());
        }
    }

    deps
}

/// Parses `source` and returns its import specifiers.
pub fn extract_dependencies(source: &str, id: &ModuleId) -> Result<Vec<String>> {
    let allocator = Allocator::default();
    let program = parse(&allocator, id, source)?;
    Ok(import_specifiers(&program).into_iter().collect())
}
