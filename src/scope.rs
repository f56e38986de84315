//! Scope analysis.
//!
//! Walks the fragment tree and collects free identifiers (referenced but
//! declared nowhere in the fragment, including references that only occur
//! inside nested function literals), the fragment's top-level declarations,
//! and whether either reserved synthesized binding name is shadowed by a
//! user declaration.
//!
//! Import-introduced bindings are deliberately excluded from the declared
//! set: an identifier bound by an `import` statement or a `require` call
//! must stay visible as a free identifier so the dependency resolver can
//! classify it.

use oxc_ast::ast::{BindingPattern, Program, Statement};
use oxc_ast_visit::Visit;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

use crate::rename::{AMBIENT_CONTEXT, OWN_PROPS};
use crate::resolve;

lazy_static::lazy_static! {
    /// Host globals that are expected to resolve at execution time.
    /// Only used to keep the unresolved-identifier debug log free of noise;
    /// classification itself never errors on unresolved names.
    pub static ref HOST_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("Math");
        s.insert("JSON");
        s.insert("Date");
        s.insert("String");
        s.insert("Number");
        s.insert("Boolean");
        s.insert("Array");
        s.insert("Object");
        s.insert("Promise");
        s.insert("Map");
        s.insert("Set");
        s.insert("Error");
        s.insert("undefined");
        s.insert("NaN");
        s.insert("Infinity");
        s.insert("parseInt");
        s.insert("parseFloat");
        s.insert("console");
        s.insert("window");
        s.insert("document");
        s
    };
}

/// Derived per-compile view of the fragment's identifiers.
#[derive(Debug, Clone, Default)]
pub struct ScopeInfo {
    /// Free identifier names in first-reference order, deduplicated.
    pub free: Vec<String>,
    /// Identifiers declared at the fragment's top level (variables, named
    /// functions, named classes). Import bindings are not included.
    pub declared_top: HashSet<String>,
    /// Every identifier name appearing anywhere in the fragment, used to
    /// pick collision-free aliases.
    pub all_idents: HashSet<String>,
    /// The fragment declares its own `ownProps`.
    pub declares_own_props: bool,
    /// The fragment declares its own `ambientContext`.
    pub declares_ambient_context: bool,
}

pub fn analyze(program: &Program<'_>) -> ScopeInfo {
    let mut collector = IdentifierCollector::default();
    collector.visit_program(program);

    let mut free = Vec::new();
    for name in &collector.references {
        if !collector.bindings.contains(name) {
            free.push(name.clone());
        }
    }

    let mut declared_top = HashSet::new();
    for stmt in &program.body {
        match stmt {
            Statement::VariableDeclaration(decl) => {
                if resolve::decl_is_require_import(decl) {
                    continue;
                }
                for declarator in &decl.declarations {
                    collect_binding_names(&declarator.id, &mut declared_top);
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    declared_top.insert(id.name.to_string());
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    declared_top.insert(id.name.to_string());
                }
            }
            _ => {}
        }
    }

    let mut all_idents: HashSet<String> = collector.bindings;
    all_idents.extend(collector.references.iter().cloned());
    all_idents.extend(declared_top.iter().cloned());

    let declares_own_props = declared_top.contains(OWN_PROPS);
    let declares_ambient_context = declared_top.contains(AMBIENT_CONTEXT);

    ScopeInfo {
        free,
        declared_top,
        all_idents,
        declares_own_props,
        declares_ambient_context,
    }
}

pub(crate) fn collect_binding_names(pattern: &BindingPattern<'_>, names: &mut HashSet<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            names.insert(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_binding_names(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in arr.elements.iter().flatten() {
                collect_binding_names(elem, names);
            }
            if let Some(rest) = &arr.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        _ => {}
    }
}

/// Collects every identifier reference and every non-import binding in the
/// fragment. Bound-ness is approximated fragment-wide rather than per
/// scope chain; a reference is free when no binding anywhere in the
/// fragment carries its name.
#[derive(Default)]
struct IdentifierCollector {
    references: Vec<String>,
    seen: HashSet<String>,
    bindings: HashSet<String>,
}

impl<'a> Visit<'a> for IdentifierCollector {
    fn visit_identifier_reference(&mut self, ident: &oxc_ast::ast::IdentifierReference<'a>) {
        let name = ident.name.to_string();
        if self.seen.insert(name.clone()) {
            self.references.push(name);
        }
    }

    fn visit_binding_identifier(&mut self, ident: &oxc_ast::ast::BindingIdentifier<'a>) {
        self.bindings.insert(ident.name.to_string());
    }

    fn visit_import_declaration(&mut self, _decl: &oxc_ast::ast::ImportDeclaration<'a>) {
        // Import locals belong to the dependency resolver, not the fragment
        // scope; skipping the walk keeps them out of the binding set.
    }

    fn visit_variable_declaration(&mut self, decl: &oxc_ast::ast::VariableDeclaration<'a>) {
        if resolve::decl_is_require_import(decl) {
            return;
        }
        oxc_ast_visit::walk::walk_variable_declaration(self, decl);
    }

    fn visit_function(&mut self, func: &oxc_ast::ast::Function<'a>, flags: ScopeFlags) {
        if let Some(id) = &func.id {
            self.bindings.insert(id.name.to_string());
        }
        oxc_ast_visit::walk::walk_function(self, func, flags);
    }

    fn visit_class(&mut self, class: &oxc_ast::ast::Class<'a>) {
        if let Some(id) = &class.id {
            self.bindings.insert(id.name.to_string());
        }
        oxc_ast_visit::walk::walk_class(self, class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_fragment;
    use oxc_allocator::Allocator;

    fn analyze_source(source: &str) -> ScopeInfo {
        let allocator = Allocator::default();
        let program = parse_fragment(&allocator, source, "scope-test.jsx").unwrap();
        analyze(&program)
    }

    #[test]
    fn test_markup_reference_is_free() {
        let info = analyze_source("<Dependency/>");
        assert_eq!(info.free, vec!["Dependency".to_string()]);
    }

    #[test]
    fn test_lowercase_tags_are_not_references() {
        let info = analyze_source("<div><span/></div>");
        assert!(info.free.is_empty());
    }

    #[test]
    fn test_import_binding_stays_free() {
        let info = analyze_source("import Dependency from \"dependency\";\n<Dependency/>");
        assert_eq!(info.free, vec!["Dependency".to_string()]);
        assert!(!info.declared_top.contains("Dependency"));
    }

    #[test]
    fn test_local_declaration_binds_reference() {
        let info = analyze_source("const label = \"hi\";\n<div>{label}</div>");
        assert!(info.free.is_empty());
        assert!(info.declared_top.contains("label"));
    }

    #[test]
    fn test_nested_function_reference_is_free() {
        let info = analyze_source("<button onClick={() => report(1)}/>");
        assert_eq!(info.free, vec!["report".to_string()]);
    }

    #[test]
    fn test_nested_parameter_is_bound() {
        let info = analyze_source("<div>{items.map(item => item.label)}</div>");
        assert_eq!(info.free, vec!["items".to_string()]);
    }

    #[test]
    fn test_reserved_declaration_flags() {
        let info = analyze_source("const ownProps = {};\n<div/>");
        assert!(info.declares_own_props);
        assert!(!info.declares_ambient_context);

        let info = analyze_source("function ambientContext() {}\n<div/>");
        assert!(info.declares_ambient_context);

        let info = analyze_source("class ownProps {}\n<div/>");
        assert!(info.declares_own_props);
    }

    #[test]
    fn test_free_order_is_first_reference_order() {
        let info = analyze_source("<div>{second(first)}{first}</div>");
        assert_eq!(info.free, vec!["second".to_string(), "first".to_string()]);
    }
}
