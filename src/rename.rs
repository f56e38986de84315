//! Reserved-identifier collision handling.
//!
//! The synthesizer introduces two bindings into every generated component:
//! `ownProps` and `ambientContext`. A fragment is free to declare its own
//! variable, function or class under either name; when it does, the
//! compiler renames its *own* binding to a collision-free alias and routes
//! every compiler-generated access through that alias. User declarations
//! and user references are never touched.

use crate::scope::ScopeInfo;

/// Reserved name of the synthesized binding carrying incoming properties.
pub const OWN_PROPS: &str = "ownProps";
/// Reserved name of the synthesized binding carrying inherited context.
pub const AMBIENT_CONTEXT: &str = "ambientContext";

/// The names the compiler actually uses for its synthesized bindings in
/// the emitted buffer. Equal to the reserved names unless the fragment
/// shadows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedAliases {
    pub own_props: String,
    pub ambient_context: String,
}

impl ReservedAliases {
    pub fn for_fragment(scope: &ScopeInfo) -> Self {
        ReservedAliases {
            own_props: pick_alias(OWN_PROPS, scope.declares_own_props, scope),
            ambient_context: pick_alias(
                AMBIENT_CONTEXT,
                scope.declares_ambient_context,
                scope,
            ),
        }
    }
}

fn pick_alias(reserved: &str, shadowed: bool, scope: &ScopeInfo) -> String {
    if !shadowed {
        return reserved.to_string();
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{}_{}", reserved, n);
        if !scope.all_idents.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope;
    use crate::parse::parse_fragment;
    use oxc_allocator::Allocator;

    fn aliases_for(source: &str) -> ReservedAliases {
        let allocator = Allocator::default();
        let program = parse_fragment(&allocator, source, "rename-test.jsx").unwrap();
        ReservedAliases::for_fragment(&scope::analyze(&program))
    }

    #[test]
    fn test_no_collision_keeps_reserved_names() {
        let aliases = aliases_for("<div/>");
        assert_eq!(aliases.own_props, OWN_PROPS);
        assert_eq!(aliases.ambient_context, AMBIENT_CONTEXT);
    }

    #[test]
    fn test_variable_collision_renames_compiler_binding() {
        let aliases = aliases_for("const ownProps = { className: \"bar\" };\n<div/>");
        assert_eq!(aliases.own_props, "ownProps_1");
        assert_eq!(aliases.ambient_context, AMBIENT_CONTEXT);
    }

    #[test]
    fn test_function_and_class_collisions_rename() {
        let aliases = aliases_for("function ownProps() {}\n<div/>");
        assert_eq!(aliases.own_props, "ownProps_1");

        let aliases = aliases_for("class ambientContext {}\n<div/>");
        assert_eq!(aliases.ambient_context, "ambientContext_1");
    }

    #[test]
    fn test_alias_skips_taken_names() {
        let aliases = aliases_for("const ownProps = 1;\nconst ownProps_1 = 2;\n<div/>");
        assert_eq!(aliases.own_props, "ownProps_2");
    }
}
