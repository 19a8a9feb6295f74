//! Module syntax lowering.
//!
//! Rewrites the `import`/`export` declarations of an ES module into calls
//! against the two bindings the runtime loader injects, `require` and
//! `exports`. Everything that is not module syntax is copied through
//! verbatim, so the edits are applied as splices over the original text
//! using the spans oxc reports.
//!
//! The output keeps ES module evaluation order:
//!
//! - exports are accessors installed before anything runs, so importers
//!   always read the current value of the exported binding;
//! - every `require` runs before the module body, in import order;
//! - imported names are rewritten to property reads on the required
//!   module (`x` becomes `_m0.x`), so they stay live across cycles.

use std::collections::HashMap;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingIdentifier, BindingPattern, BindingPatternKind, CallExpression, Declaration,
    ExportDefaultDeclaration, ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression,
    IdentifierReference, ImportDeclaration, ImportDeclarationSpecifier, ModuleExportName,
    ObjectProperty, Program, Statement, TSType,
};
use oxc_ast::visit::walk;
use oxc_ast::Visit;
use oxc_semantic::{SemanticBuilder, SymbolId, SymbolTable};
use oxc_span::{GetSpan, Span};

use crate::error::{BundleError, Result};
use crate::parser;
use crate::resolver::ModuleId;

/// Output of transforming one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    /// Import specifiers in source order, without duplicates.
    pub specifiers: Vec<String>,
    /// Code runnable by the loader with `require` and `exports` in scope.
    pub code: String,
}

/// Turns the text of one module into [`Transformed`] output.
pub trait Transform: Send + Sync + 'static {
    fn transform(&self, id: &ModuleId, source: &str) -> Result<Transformed>;
}

/// oxc-backed ES module to `require`/`exports` lowering.
#[derive(Debug, Default, Clone, Copy)]
pub struct EsmTransform;

impl Transform for EsmTransform {
    fn transform(&self, id: &ModuleId, source: &str) -> Result<Transformed> {
        let allocator = Allocator::default();
        let program = parser::parse(&allocator, id, source)?;

        let specifiers = parser::import_specifiers(&program).into_iter().collect();
        let code = lower(&program, id, source)?;

        Ok(Transformed { specifiers, code })
    }
}

/// Lowers the module syntax of an already parsed program.
pub fn lower<'a>(program: &'a Program<'a>, id: &ModuleId, source: &str) -> Result<String> {
    let semantic = SemanticBuilder::new().build(program).semantic;
    let symbols = semantic.symbols();

    let mut lowering = Lowering::new(id, source);

    if let Some(hashbang) = &program.hashbang {
        lowering.replace(hashbang.span.start, hashbang.span.end, "");
    }

    // Imports first: every later rewrite needs the full set of import bindings.
    for stmt in &program.body {
        if let Statement::ImportDeclaration(decl) = stmt {
            lowering.import(decl);
        }
    }

    let mut references = References {
        symbols,
        bindings: &lowering.bindings,
        edits: Vec::new(),
    };
    for stmt in &program.body {
        references.statement(stmt);
    }
    let edits = references.edits;
    lowering.edits.extend(edits);

    for stmt in &program.body {
        lowering.statement(stmt, symbols)?;
    }

    lowering.finish()
}

#[derive(Debug)]
struct Edit {
    start: u32,
    end: u32,
    text: String,
}

struct Lowering<'s> {
    id: &'s ModuleId,
    source: &'s str,
    edits: Vec<Edit>,
    /// Accessor definitions, one per exported name.
    exports: Vec<String>,
    /// `require` calls for the module's imports, in import order.
    requires: Vec<String>,
    /// Import source -> local holding its exports object, if one was needed.
    modules: HashMap<String, Option<String>>,
    /// Imported binding -> expression reading it.
    bindings: HashMap<SymbolId, String>,
    next_local: usize,
}

impl<'s> Lowering<'s> {
    fn new(id: &'s ModuleId, source: &'s str) -> Self {
        Self {
            id,
            source,
            edits: Vec::new(),
            exports: Vec::new(),
            requires: Vec::new(),
            modules: HashMap::new(),
            bindings: HashMap::new(),
            next_local: 0,
        }
    }

    fn replace(&mut self, start: u32, end: u32, text: impl Into<String>) {
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
        });
    }

    fn remove(&mut self, span: Span) {
        self.replace(span.start, span.end, "");
    }

    fn unsupported(&self, what: impl std::fmt::Display) -> BundleError {
        BundleError::Syntax {
            id: self.id.clone(),
            message: format!("unsupported module syntax: {what}"),
        }
    }

    /// A local name that does not occur anywhere in the module text.
    fn fresh_local(&mut self) -> String {
        loop {
            let name = format!("_m{}", self.next_local);
            self.next_local += 1;
            if !self.source.contains(&name) {
                return name;
            }
        }
    }

    /// Local holding the exports object of `source`, requiring it if needed.
    fn module_local(&mut self, source: &str) -> String {
        if let Some(Some(local)) = self.modules.get(source) {
            return local.clone();
        }
        let local = self.fresh_local();
        self.requires
            .push(format!("const {local} = require({});", js_string(source)));
        self.modules.insert(source.to_owned(), Some(local.clone()));
        local
    }

    fn bind(&mut self, local: &BindingIdentifier<'_>, access: String) {
        if let Some(symbol_id) = local.symbol_id.get() {
            self.bindings.insert(symbol_id, access);
        }
    }

    fn export(&mut self, exported: &str, local: &str) {
        self.exports.push(format!(
            "Object.defineProperty(exports, {}, {{ enumerable: true, get: function () {{ return {local}; }} }});",
            js_string(exported)
        ));
    }

    fn import(&mut self, decl: &ImportDeclaration<'_>) {
        self.remove(decl.span);
        if decl.import_kind.is_type() {
            return;
        }

        let source = decl.source.value.as_str();
        let mut bound = false;

        for spec in decl.specifiers.iter().flatten() {
            match spec {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    if s.import_kind.is_type() {
                        continue;
                    }
                    let module = self.module_local(source);
                    self.bind(&s.local, format!("{module}{}", member(&s.imported.name())));
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    let module = self.module_local(source);
                    self.bind(&s.local, format!("{module}.default"));
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    self.requires
                        .push(format!("const {} = require({});", s.local.name, js_string(source)));
                    let slot = self.modules.entry(source.to_owned()).or_insert(None);
                    if slot.is_none() {
                        *slot = Some(s.local.name.to_string());
                    }
                }
            }
            bound = true;
        }

        if !bound && !self.modules.contains_key(source) {
            self.requires.push(format!("require({});", js_string(source)));
            self.modules.insert(source.to_owned(), None);
        }
    }

    fn statement(&mut self, stmt: &Statement<'_>, symbols: &SymbolTable) -> Result<()> {
        match stmt {
            Statement::ExportNamedDeclaration(decl) => self.export_named(decl, symbols)?,
            Statement::ExportDefaultDeclaration(decl) => self.export_default(decl),
            Statement::ExportAllDeclaration(decl) => {
                return Err(self.unsupported(format!("re-export of `{}`", decl.source.value)));
            }
            Statement::TSExportAssignment(_) | Statement::TSNamespaceExportDeclaration(_) => {
                return Err(self.unsupported("TypeScript export assignment"));
            }
            _ => {}
        }
        Ok(())
    }

    fn export_named(&mut self, decl: &ExportNamedDeclaration<'_>, symbols: &SymbolTable) -> Result<()> {
        if let Some(source) = &decl.source {
            return Err(self.unsupported(format!("re-export from `{}`", source.value)));
        }
        if decl.export_kind.is_type() {
            self.remove(decl.span);
            return Ok(());
        }

        let Some(declaration) = &decl.declaration else {
            for s in decl.specifiers.iter().filter(|s| !s.export_kind.is_type()) {
                let local = match &s.local {
                    ModuleExportName::IdentifierReference(ident) => {
                        match import_binding(symbols, &self.bindings, ident) {
                            Some(access) => access.to_owned(),
                            None => ident.name.to_string(),
                        }
                    }
                    other => other.name().to_string(),
                };
                self.export(&s.exported.name(), &local);
            }
            self.remove(decl.span);
            return Ok(());
        };

        match declaration {
            Declaration::VariableDeclaration(var) => {
                let mut names = Vec::new();
                for declarator in &var.declarations {
                    bound_names(&declarator.id, &mut names);
                }
                self.replace(decl.span.start, var.span.start, "");
                for name in &names {
                    self.export(name, name);
                }
            }
            Declaration::FunctionDeclaration(func) => {
                let Some(name) = &func.id else {
                    return Err(self.unsupported("anonymous exported function"));
                };
                self.replace(decl.span.start, func.span.start, "");
                self.export(&name.name, &name.name);
            }
            Declaration::ClassDeclaration(class) => {
                let Some(name) = &class.id else {
                    return Err(self.unsupported("anonymous exported class"));
                };
                self.replace(decl.span.start, class.span.start, "");
                self.export(&name.name, &name.name);
            }
            Declaration::TSTypeAliasDeclaration(_) | Declaration::TSInterfaceDeclaration(_) => {
                self.remove(decl.span);
            }
            _ => return Err(self.unsupported("exported TypeScript declaration")),
        }
        Ok(())
    }

    fn export_default(&mut self, decl: &ExportDefaultDeclaration<'_>) {
        let stmt = decl.span;
        match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => match &func.id {
                Some(name) => {
                    self.replace(stmt.start, func.span.start, "");
                    self.export("default", &name.name);
                }
                None => self.assign_default(stmt, func.span),
            },
            ExportDefaultDeclarationKind::ClassDeclaration(class) => match &class.id {
                Some(name) => {
                    self.replace(stmt.start, class.span.start, "");
                    self.export("default", &name.name);
                }
                None => self.assign_default(stmt, class.span),
            },
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => self.remove(stmt),
            expr => self.assign_default(stmt, expr.span()),
        }
    }

    fn assign_default(&mut self, stmt: Span, value: Span) {
        self.replace(stmt.start, value.start, "exports.default = ");
        self.replace(value.end, stmt.end, ";");
    }

    fn finish(self) -> Result<String> {
        let mut prologue = Vec::with_capacity(1 + self.exports.len() + self.requires.len());
        prologue.push("\"use strict\";".to_owned());
        prologue.extend(self.exports);
        prologue.extend(self.requires);
        splice(self.id, self.source, prologue, self.edits)
    }
}

/// Joins `prologue` lines and `source` with `edits` applied.
fn splice(id: &ModuleId, source: &str, prologue: Vec<String>, mut edits: Vec<Edit>) -> Result<String> {
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(source.len() + 64 * prologue.len());
    for line in &prologue {
        out.push_str(line);
        out.push('\n');
    }

    let mut cursor = 0usize;
    for edit in &edits {
        let (start, end) = (edit.start as usize, edit.end as usize);
        if start < cursor || end < start || end > source.len() {
            return Err(BundleError::Syntax {
                id: id.clone(),
                message: format!("conflicting rewrites at offset {start}"),
            });
        }
        out.push_str(&source[cursor..start]);
        out.push_str(&edit.text);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

fn import_binding<'b>(
    symbols: &SymbolTable,
    bindings: &'b HashMap<SymbolId, String>,
    ident: &IdentifierReference<'_>,
) -> Option<&'b str> {
    let reference = symbols.get_reference(ident.reference_id.get()?);
    bindings.get(&reference.symbol_id()?).map(String::as_str)
}

/// Collects the rewrites of references to imported bindings.
struct References<'l> {
    symbols: &'l SymbolTable,
    bindings: &'l HashMap<SymbolId, String>,
    edits: Vec<Edit>,
}

impl References<'_> {
    fn lookup(&self, ident: &IdentifierReference<'_>) -> Option<String> {
        import_binding(self.symbols, self.bindings, ident).map(str::to_owned)
    }

    fn push(&mut self, span: Span, text: String) {
        self.edits.push(Edit {
            start: span.start,
            end: span.end,
            text,
        });
    }

    /// Visits the parts of a top-level statement that survive lowering.
    fn statement<'a>(&mut self, stmt: &Statement<'a>) {
        match stmt {
            Statement::ImportDeclaration(_)
            | Statement::ExportAllDeclaration(_)
            | Statement::TSExportAssignment(_)
            | Statement::TSNamespaceExportDeclaration(_) => {}
            Statement::ExportNamedDeclaration(decl) => {
                if decl.export_kind.is_type() {
                    return;
                }
                if let Some(
                    declaration @ (Declaration::VariableDeclaration(_)
                    | Declaration::FunctionDeclaration(_)
                    | Declaration::ClassDeclaration(_)),
                ) = &decl.declaration
                {
                    self.visit_declaration(declaration);
                }
            }
            Statement::ExportDefaultDeclaration(decl) => {
                if !matches!(
                    decl.declaration,
                    ExportDefaultDeclarationKind::TSInterfaceDeclaration(_)
                ) {
                    self.visit_export_default_declaration_kind(&decl.declaration);
                }
            }
            stmt => self.visit_statement(stmt),
        }
    }
}

impl<'a> Visit<'a> for References<'_> {
    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        if let Some(access) = self.lookup(it) {
            self.push(it.span, access);
        }
    }

    fn visit_object_property(&mut self, it: &ObjectProperty<'a>) {
        if it.shorthand {
            if let Expression::Identifier(ident) = &it.value {
                if let Some(access) = self.lookup(ident) {
                    self.push(it.span, format!("{}: {access}", ident.name));
                    return;
                }
            }
        }
        walk::walk_object_property(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        // Imported functions are called without the exports object as `this`.
        if let Expression::Identifier(ident) = &it.callee {
            if let Some(access) = self.lookup(ident) {
                self.push(ident.span, format!("(0, {access})"));
                for argument in &it.arguments {
                    self.visit_argument(argument);
                }
                return;
            }
        }
        walk::walk_call_expression(self, it);
    }

    // Types are left as written.
    fn visit_ts_type(&mut self, _it: &TSType<'a>) {}
}

fn bound_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(id) => names.push(id.name.to_string()),
        BindingPatternKind::ObjectPattern(obj) => {
            for property in &obj.properties {
                bound_names(&property.value, names);
            }
            if let Some(rest) = &obj.rest {
                bound_names(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(arr) => {
            for element in arr.elements.iter().flatten() {
                bound_names(element, names);
            }
            if let Some(rest) = &arr.rest {
                bound_names(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assign) => bound_names(&assign.left, names),
    }
}

/// Property access for `name`: `.name`, or `["name"]` when it is not an identifier.
fn member(name: &str) -> String {
    if is_identifier_name(name) {
        format!(".{name}")
    } else {
        format!("[{}]", js_string(name))
    }
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}
