//! Fragment parsing.
//!
//! A fragment is parsed as a JSX module: import bindings, local
//! declarations and a trailing markup expression. Any parser diagnostic is
//! surfaced as a [`CompileError::Parse`] and never recovered; this includes
//! statement-termination ambiguity, where a newline between two markup
//! expressions would otherwise silently parse as a relational expression.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::error::CompileError;

pub fn fragment_source_type() -> SourceType {
    SourceType::default().with_module(true).with_jsx(true)
}

pub fn parse_fragment<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    path: &str,
) -> Result<Program<'a>, CompileError> {
    let ret = Parser::new(allocator, source, fragment_source_type()).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let diagnostics = ret
            .errors
            .iter()
            .map(|error| format!("{:?}", error))
            .collect();
        return Err(CompileError::parse(path, diagnostics));
    }

    Ok(ret.program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_markup() {
        let allocator = Allocator::default();
        let program = parse_fragment(&allocator, "<div/>", "plain.jsx").unwrap();
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_parses_imports_and_markup() {
        let allocator = Allocator::default();
        let source = "import Dependency from \"dependency\";\n<Dependency/>";
        let program = parse_fragment(&allocator, source, "dep.jsx").unwrap();
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_rejects_malformed_markup() {
        let allocator = Allocator::default();
        let result = parse_fragment(&allocator, "<div>", "broken.jsx");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_termination_ambiguity() {
        // Two adjacent markup expressions: the second `<` continues the first
        // statement as a comparison, which cannot parse.
        let allocator = Allocator::default();
        let result = parse_fragment(&allocator, "<div/>\n<span/>", "asi.jsx");
        assert!(result.is_err());
    }
}
