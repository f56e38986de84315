use thiserror::Error;

/// Failure modes of a compile request.
///
/// Parse failures are the only error this engine raises on its own. Free
/// identifiers without a static binding are deliberately not an error; they
/// surface as a reference fault when the emitted module is executed.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to parse fragment `{path}`: {message}")]
    Parse {
        path: String,
        message: String,
        diagnostics: Vec<String>,
    },
}

impl CompileError {
    pub(crate) fn parse(path: &str, diagnostics: Vec<String>) -> Self {
        let message = diagnostics
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown syntax error".to_string());
        CompileError::Parse {
            path: path.to_string(),
            message,
            diagnostics,
        }
    }
}
