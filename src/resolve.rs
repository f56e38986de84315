//! Dependency resolution.
//!
//! Free identifiers resolve through three outcomes: bound by an explicit
//! module import in the fragment, bound by a configured injected global,
//! or unresolved. Unresolved names are never a compile error; they stay
//! bare in the emitted buffer and fault only when the module executes
//! without the binding present.
//!
//! Module paths are normalized to their top-level package segment, so a
//! root import and a subpath import of the same package collapse into one
//! dependency entry. Entries keep first-seen order; only explicit imports
//! are surfaced in artifact metadata.

use oxc_ast::ast::{
    BindingPattern, Expression, ImportDeclarationSpecifier, ModuleExportName, Program, Statement,
    VariableDeclaration,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::scope::{ScopeInfo, HOST_GLOBALS};

/// How a single imported name is bound inside the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedSymbol {
    /// `import x from "pkg"` or `const x = require("pkg")`.
    Default,
    /// `import * as x from "pkg"` or an object-rest require binding.
    Namespace,
    /// `import { name as x } from "pkg"` or `const { name: x } = require("pkg")`.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub imported: ImportedSymbol,
}

/// One entry of the fragment's dependency set, keyed by normalized
/// top-level package name.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub source: String,
    pub locals: Vec<ImportBinding>,
}

/// Resolution outcome for one free identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    ExplicitImport { source: String },
    InjectedGlobal { value: Value },
    Unresolved,
}

/// Normalize a module path to its top-level package name. Scoped packages
/// keep their scope segment; relative and absolute paths pass through
/// unchanged.
pub fn normalize_package(path: &str) -> String {
    if path.starts_with('.') || path.starts_with('/') {
        return path.to_string();
    }
    let mut segments = path.split('/');
    match segments.next() {
        Some(scope) if scope.starts_with('@') => match segments.next() {
            Some(name) => format!("{}/{}", scope, name),
            None => scope.to_string(),
        },
        Some(name) => name.to_string(),
        None => path.to_string(),
    }
}

/// Collect the fragment's explicit imports in declaration order, merged
/// and deduplicated by normalized package name.
pub fn collect_imports(program: &Program<'_>) -> Vec<Dependency> {
    let mut dependencies: Vec<Dependency> = Vec::new();

    let mut push = |source: String, locals: Vec<ImportBinding>| {
        if let Some(existing) = dependencies.iter_mut().find(|d| d.source == source) {
            for binding in locals {
                if !existing.locals.iter().any(|b| b.local == binding.local) {
                    existing.locals.push(binding);
                }
            }
        } else {
            dependencies.push(Dependency { source, locals });
        }
    };

    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(import) => {
                let raw = import.source.value.as_str();
                let source = normalize_package(raw);
                let mut locals = Vec::new();
                if let Some(specifiers) = &import.specifiers {
                    for specifier in specifiers {
                        match specifier {
                            ImportDeclarationSpecifier::ImportSpecifier(s) => {
                                locals.push(ImportBinding {
                                    local: s.local.name.to_string(),
                                    imported: ImportedSymbol::Named(export_name(&s.imported)),
                                });
                            }
                            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                                locals.push(ImportBinding {
                                    local: s.local.name.to_string(),
                                    imported: ImportedSymbol::Default,
                                });
                            }
                            ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                                locals.push(ImportBinding {
                                    local: s.local.name.to_string(),
                                    imported: ImportedSymbol::Namespace,
                                });
                            }
                        }
                    }
                }
                rebind_subpath_locals(raw, &source, &mut locals);
                push(source, locals);
            }
            Statement::VariableDeclaration(decl) => {
                for (source, locals) in require_bindings(decl).unwrap_or_default() {
                    push(source, locals);
                }
            }
            _ => {}
        }
    }

    dependencies
}

/// Classify every free identifier of the fragment, in free-identifier
/// order. `globals` is the request configuration's injected-globals map.
pub fn resolve_free(
    scope: &ScopeInfo,
    imports: &[Dependency],
    globals: Option<&BTreeMap<String, Value>>,
) -> Vec<(String, Resolution)> {
    let mut resolved = Vec::with_capacity(scope.free.len());
    for name in &scope.free {
        let resolution = if let Some(dep) = imports
            .iter()
            .find(|d| d.locals.iter().any(|b| &b.local == name))
        {
            Resolution::ExplicitImport {
                source: dep.source.clone(),
            }
        } else if let Some(value) = globals.and_then(|g| g.get(name)) {
            Resolution::InjectedGlobal {
                value: value.clone(),
            }
        } else {
            if !HOST_GLOBALS.contains(name.as_str()) {
                debug!(identifier = name.as_str(), "leaving free identifier unresolved");
            }
            Resolution::Unresolved
        };
        resolved.push((name.clone(), resolution));
    }
    resolved
}

/// True when every declarator of `decl` is a `require("...")` binding with
/// a shape the resolver understands. Mixed or computed declarations are
/// treated as ordinary local statements.
pub(crate) fn decl_is_require_import(decl: &VariableDeclaration<'_>) -> bool {
    require_bindings(decl).is_some()
}

fn require_bindings(
    decl: &VariableDeclaration<'_>,
) -> Option<Vec<(String, Vec<ImportBinding>)>> {
    if decl.declarations.is_empty() {
        return None;
    }
    let mut out = Vec::new();
    for declarator in &decl.declarations {
        let raw = require_source(declarator.init.as_ref()?)?;
        let source = normalize_package(&raw);
        let mut locals = require_locals(&declarator.id)?;
        rebind_subpath_locals(&raw, &source, &mut locals);
        out.push((source, locals));
    }
    Some(out)
}

/// A default or namespace binding of a collapsed subpath names the subpath
/// member on the package root, so it becomes a named symbol and derives as
/// a member access instead of aliasing the whole package object.
fn rebind_subpath_locals(raw: &str, source: &str, locals: &mut [ImportBinding]) {
    let member = raw
        .strip_prefix(source)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|rest| rest.rsplit('/').next());
    if let Some(member) = member {
        for binding in locals.iter_mut() {
            if matches!(
                binding.imported,
                ImportedSymbol::Default | ImportedSymbol::Namespace
            ) {
                binding.imported = ImportedSymbol::Named(member.to_string());
            }
        }
    }
}

fn require_source(init: &Expression<'_>) -> Option<String> {
    let Expression::CallExpression(call) = init else {
        return None;
    };
    let Expression::Identifier(callee) = &call.callee else {
        return None;
    };
    if callee.name != "require" || call.arguments.len() != 1 {
        return None;
    }
    let Expression::StringLiteral(source) = call.arguments.first()?.as_expression()? else {
        return None;
    };
    Some(source.value.to_string())
}

fn require_locals(pattern: &BindingPattern<'_>) -> Option<Vec<ImportBinding>> {
    match pattern {
        BindingPattern::BindingIdentifier(id) => Some(vec![ImportBinding {
            local: id.name.to_string(),
            imported: ImportedSymbol::Default,
        }]),
        BindingPattern::ObjectPattern(obj) => {
            let mut locals = Vec::new();
            for prop in &obj.properties {
                let BindingPattern::BindingIdentifier(local) = &prop.value else {
                    return None;
                };
                let key = match &prop.key {
                    oxc_ast::ast::PropertyKey::StaticIdentifier(id) => id.name.to_string(),
                    oxc_ast::ast::PropertyKey::StringLiteral(s) => s.value.to_string(),
                    _ => return None,
                };
                locals.push(ImportBinding {
                    local: local.name.to_string(),
                    imported: ImportedSymbol::Named(key),
                });
            }
            if let Some(rest) = &obj.rest {
                let BindingPattern::BindingIdentifier(local) = &rest.argument else {
                    return None;
                };
                locals.push(ImportBinding {
                    local: local.name.to_string(),
                    imported: ImportedSymbol::Namespace,
                });
            }
            Some(locals)
        }
        _ => None,
    }
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_fragment;
    use crate::scope;
    use oxc_allocator::Allocator;

    fn imports_for(source: &str) -> Vec<Dependency> {
        let allocator = Allocator::default();
        let program = parse_fragment(&allocator, source, "resolve-test.jsx").unwrap();
        collect_imports(&program)
    }

    #[test]
    fn test_normalize_package() {
        assert_eq!(normalize_package("lodash"), "lodash");
        assert_eq!(normalize_package("lodash/fp"), "lodash");
        assert_eq!(normalize_package("lodash/fp/uniq"), "lodash");
        assert_eq!(normalize_package("@scope/pkg"), "@scope/pkg");
        assert_eq!(normalize_package("@scope/pkg/deep"), "@scope/pkg");
        assert_eq!(normalize_package("./local"), "./local");
    }

    #[test]
    fn test_subpath_collapses_into_package_root() {
        let deps = imports_for(
            "import _ from \"lodash\";\nimport fp from \"lodash/fp\";\n<div/>",
        );
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source, "lodash");
        assert_eq!(deps[0].locals.len(), 2);
    }

    #[test]
    fn test_import_order_is_declaration_order() {
        let deps = imports_for(
            "import a from \"beta\";\nimport b from \"alpha\";\n<div/>",
        );
        let sources: Vec<&str> = deps.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["beta", "alpha"]);
    }

    #[test]
    fn test_require_call_is_an_explicit_import() {
        let deps = imports_for("const helper = require(\"toolkit/deep\");\n<div/>");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source, "toolkit");
        assert_eq!(deps[0].locals[0].local, "helper");
        assert_eq!(
            deps[0].locals[0].imported,
            ImportedSymbol::Named("deep".into())
        );
    }

    #[test]
    fn test_subpath_default_import_becomes_a_named_symbol() {
        let deps = imports_for("import fp from \"lodash/fp\";\n<div/>");
        assert_eq!(deps[0].source, "lodash");
        assert_eq!(deps[0].locals[0].local, "fp");
        assert_eq!(
            deps[0].locals[0].imported,
            ImportedSymbol::Named("fp".into())
        );
    }

    #[test]
    fn test_package_root_default_import_stays_default() {
        let deps = imports_for("import _ from \"lodash\";\n<div/>");
        assert_eq!(deps[0].locals[0].imported, ImportedSymbol::Default);
    }

    #[test]
    fn test_destructured_require_binds_named_symbols() {
        let deps = imports_for("const { uniq } = require(\"lodash\");\n<div/>");
        assert_eq!(deps[0].locals[0].imported, ImportedSymbol::Named("uniq".into()));
    }

    #[test]
    fn test_classification_outcomes() {
        let allocator = Allocator::default();
        let source = "import Dependency from \"dependency\";\n<div>{Dependency}{injected}{missing}</div>";
        let program = parse_fragment(&allocator, source, "resolve-test.jsx").unwrap();
        let info = scope::analyze(&program);
        let imports = collect_imports(&program);

        let mut globals = BTreeMap::new();
        globals.insert("injected".to_string(), Value::String("yes".to_string()));

        let resolved = resolve_free(&info, &imports, Some(&globals));
        assert_eq!(
            resolved[0],
            (
                "Dependency".to_string(),
                Resolution::ExplicitImport {
                    source: "dependency".to_string()
                }
            )
        );
        assert_eq!(
            resolved[1],
            (
                "injected".to_string(),
                Resolution::InjectedGlobal {
                    value: Value::String("yes".to_string())
                }
            )
        );
        assert_eq!(resolved[2], ("missing".to_string(), Resolution::Unresolved));
    }

    #[test]
    fn test_injected_global_never_wins_over_import() {
        let allocator = Allocator::default();
        let source = "import value from \"value\";\n<div>{value}</div>";
        let program = parse_fragment(&allocator, source, "resolve-test.jsx").unwrap();
        let info = scope::analyze(&program);
        let imports = collect_imports(&program);

        let mut globals = BTreeMap::new();
        globals.insert("value".to_string(), Value::String("shadowed".to_string()));

        let resolved = resolve_free(&info, &imports, Some(&globals));
        assert!(matches!(
            resolved[0].1,
            Resolution::ExplicitImport { .. }
        ));
    }
}
