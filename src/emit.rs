//! Component-module synthesis.
//!
//! Assembles the final CommonJS module text from the printed fragment
//! pieces: the runtime-factory require, one require per resolved
//! dependency, injected-global bindings, and the component wrapper in its
//! stateless or stateful shape.

use serde_json::Value;

use crate::classify::ComponentKind;
use crate::lower::{LoweredFragment, PreformedComponent};
use crate::rename::ReservedAliases;
use crate::resolve::{Dependency, ImportedSymbol};

/// Module the element factory is required from.
pub const RUNTIME_MODULE: &str = "uitree";
/// Local binding name for the element factory.
pub const RUNTIME_FACTORY: &str = "Element";

/// Everything the synthesizer needs to print a component module.
pub struct Synthesis<'a> {
    pub component_name: &'a str,
    pub kind: ComponentKind,
    pub aliases: &'a ReservedAliases,
    pub dependencies: &'a [Dependency],
    /// Injected globals that are actually free in the fragment, in
    /// first-use order.
    pub globals: Vec<(String, Value)>,
    pub lowered: &'a LoweredFragment,
    /// The component takes the ambient-context parameter.
    pub needs_ambient: bool,
}

pub fn synthesize(input: &Synthesis<'_>) -> String {
    let mut out = String::new();
    emit_header(&mut out, input.dependencies, &input.globals);

    match input.kind {
        ComponentKind::Stateless => emit_stateless(&mut out, input),
        ComponentKind::Stateful => emit_stateful(&mut out, input),
    }

    out
}

/// Prints a module whose component came pre-formed in the fragment. The
/// component is exported as-is instead of being wrapped.
pub fn synthesize_preformed(
    dependencies: &[Dependency],
    globals: &[(String, Value)],
    component: &PreformedComponent,
) -> String {
    let mut out = String::new();
    emit_header(&mut out, dependencies, globals);

    if !component.locals_code.is_empty() {
        out.push_str(&component.locals_code);
    }
    match &component.export_name {
        Some(name) => {
            out.push_str(&component.code);
            out.push('\n');
            out.push_str(&format!("module.exports = {name};\n"));
        }
        None => {
            out.push_str(&format!("module.exports = {};\n", component.code));
        }
    }

    out
}

fn emit_header(out: &mut String, dependencies: &[Dependency], globals: &[(String, Value)]) {
    out.push_str(&format!(
        "const {} = require(\"{}\");\n",
        RUNTIME_FACTORY, RUNTIME_MODULE
    ));
    for dependency in dependencies {
        emit_dependency(out, dependency);
    }
    for (name, value) in globals {
        let literal =
            serde_json::to_string(value).unwrap_or_else(|_| String::from("null"));
        out.push_str(&format!("const {name} = {literal};\n"));
    }
    out.push('\n');
}

/// Exactly one `require` per dependency. Extra locals on the same package
/// are derived from the primary binding instead of requiring again.
fn emit_dependency(out: &mut String, dependency: &Dependency) {
    // The runtime factory is already bound; derive from it.
    if dependency.source == RUNTIME_MODULE {
        for binding in &dependency.locals {
            if binding.local == RUNTIME_FACTORY {
                continue;
            }
            match &binding.imported {
                ImportedSymbol::Named(imported) => {
                    out.push_str(&format!(
                        "const {} = {};\n",
                        binding.local,
                        member_access(RUNTIME_FACTORY, imported)
                    ));
                }
                ImportedSymbol::Default | ImportedSymbol::Namespace => {
                    out.push_str(&format!(
                        "const {} = {};\n",
                        binding.local, RUNTIME_FACTORY
                    ));
                }
            }
        }
        return;
    }

    if dependency.locals.is_empty() {
        out.push_str(&format!("require(\"{}\");\n", dependency.source));
        return;
    }

    let primary = dependency.locals.iter().position(|binding| {
        matches!(
            binding.imported,
            ImportedSymbol::Default | ImportedSymbol::Namespace
        )
    });

    match primary {
        Some(primary) => {
            let root = &dependency.locals[primary].local;
            out.push_str(&format!(
                "const {} = require(\"{}\");\n",
                root, dependency.source
            ));
            for (index, binding) in dependency.locals.iter().enumerate() {
                if index == primary {
                    continue;
                }
                match &binding.imported {
                    ImportedSymbol::Named(imported) => {
                        out.push_str(&format!(
                            "const {} = {};\n",
                            binding.local,
                            member_access(root, imported)
                        ));
                    }
                    ImportedSymbol::Default | ImportedSymbol::Namespace => {
                        out.push_str(&format!("const {} = {};\n", binding.local, root));
                    }
                }
            }
        }
        None => {
            // All named, so a single destructuring require covers them.
            let patterns: Vec<String> = dependency
                .locals
                .iter()
                .map(|binding| match &binding.imported {
                    ImportedSymbol::Named(imported) if *imported == binding.local => {
                        binding.local.clone()
                    }
                    ImportedSymbol::Named(imported) => {
                        format!("{}: {}", property_key(imported), binding.local)
                    }
                    ImportedSymbol::Default | ImportedSymbol::Namespace => {
                        binding.local.clone()
                    }
                })
                .collect();
            out.push_str(&format!(
                "const {{ {} }} = require(\"{}\");\n",
                patterns.join(", "),
                dependency.source
            ));
        }
    }
}

fn emit_stateless(out: &mut String, input: &Synthesis<'_>) {
    let params = if input.needs_ambient {
        format!(
            "{}, {}",
            input.aliases.own_props, input.aliases.ambient_context
        )
    } else {
        input.aliases.own_props.clone()
    };

    out.push_str(&format!(
        "module.exports = function {}({}) {{\n",
        input.component_name, params
    ));
    push_body(out, input.lowered, "  ");
    out.push_str("};\n");
}

fn emit_stateful(out: &mut String, input: &Synthesis<'_>) {
    out.push_str(&format!(
        "module.exports = class {} {{\n",
        input.component_name
    ));
    out.push_str("  constructor(ownProps, ambientContext) {\n");
    out.push_str("    this.ownProps = ownProps;\n");
    out.push_str("    this.ambientContext = ambientContext;\n");
    out.push_str("    this.state = {};\n");
    out.push_str("    this.listeners = [];\n");
    out.push_str("  }\n\n");
    out.push_str("  subscribe(listener) {\n");
    out.push_str("    this.listeners.push(listener);\n");
    out.push_str("  }\n\n");
    out.push_str("  setState(update) {\n");
    out.push_str("    this.state = Object.assign({}, this.state, update);\n");
    out.push_str("    for (const listener of this.listeners) {\n");
    out.push_str("      listener(this.render());\n");
    out.push_str("    }\n");
    out.push_str("  }\n\n");
    out.push_str("  render() {\n");
    out.push_str(&format!(
        "    const {} = this.ownProps;\n",
        input.aliases.own_props
    ));
    if input.needs_ambient {
        out.push_str(&format!(
            "    const {} = this.ambientContext;\n",
            input.aliases.ambient_context
        ));
    }
    push_body(out, input.lowered, "    ");
    out.push_str("  }\n");
    out.push_str("};\n");
}

fn push_body(out: &mut String, lowered: &LoweredFragment, indent: &str) {
    if !lowered.locals_code.is_empty() {
        out.push_str(&indent_block(&lowered.locals_code, indent));
    }
    match &lowered.markup_code {
        Some(markup) => {
            out.push_str(&format!("{}return {};\n", indent, indent_tail(markup, indent)))
        }
        None => out.push_str(&format!("{indent}return null;\n")),
    }
}

fn indent_block(code: &str, indent: &str) -> String {
    let mut block = String::new();
    for line in code.lines() {
        if line.is_empty() {
            block.push('\n');
        } else {
            block.push_str(indent);
            block.push_str(line);
            block.push('\n');
        }
    }
    block
}

/// Re-indents every line after the first, for markup embedded in a
/// `return` statement.
fn indent_tail(code: &str, indent: &str) -> String {
    let mut lines = code.lines();
    let mut result = match lines.next() {
        Some(first) => first.to_string(),
        None => return String::new(),
    };
    for line in lines {
        result.push('\n');
        if !line.is_empty() {
            result.push_str(indent);
            result.push_str(line);
        }
    }
    result
}

fn member_access(root: &str, property: &str) -> String {
    if is_identifier(property) {
        format!("{root}.{property}")
    } else {
        format!("{root}[{}]", quote(property))
    }
}

fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
