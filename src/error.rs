use serde::Serialize;
use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Why a function could not be compiled.
///
/// Errors are scoped to one function: the driver keeps that function
/// unchanged and carries on with its siblings.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompilerError {
    /// A construct the compiler does not model.
    #[error("unsupported syntax: {message}")]
    UnsupportedSyntax { message: String, span: Span },
    /// An analysis invariant does not hold, e.g. a read-only value is mutated.
    #[error("invalid assumption: {message}")]
    InvalidAssumption { message: String, span: Span },
    /// Mutually exclusive options.
    #[error("configuration conflict: {message}")]
    ConfigurationConflict { message: String, span: Span },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedSyntax,
    InvalidAssumption,
    ConfigurationConflict,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedSyntax => "unsupported-syntax",
            ErrorKind::InvalidAssumption => "invalid-assumption",
            ErrorKind::ConfigurationConflict => "configuration-conflict",
        }
    }
}

impl CompilerError {
    pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
        CompilerError::UnsupportedSyntax {
            message: message.into(),
            span,
        }
    }

    pub fn invalid(message: impl Into<String>, span: Span) -> Self {
        CompilerError::InvalidAssumption {
            message: message.into(),
            span,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CompilerError::ConfigurationConflict {
            message: message.into(),
            span: Span::dummy(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompilerError::UnsupportedSyntax { .. } => ErrorKind::UnsupportedSyntax,
            CompilerError::InvalidAssumption { .. } => ErrorKind::InvalidAssumption,
            CompilerError::ConfigurationConflict { .. } => ErrorKind::ConfigurationConflict,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompilerError::UnsupportedSyntax { span, .. }
            | CompilerError::InvalidAssumption { span, .. }
            | CompilerError::ConfigurationConflict { span, .. } => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompilerError::UnsupportedSyntax { message, .. }
            | CompilerError::InvalidAssumption { message, .. }
            | CompilerError::ConfigurationConflict { message, .. } => message,
        }
    }

    /// Diagnostic form. Skipped functions are warnings: the build continues
    /// with the original function.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match self {
            CompilerError::ConfigurationConflict { .. } => {
                Diagnostic::error(self.to_string(), self.span())
            }
            _ => Diagnostic::warning(self.to_string(), self.span()),
        };
        let diag = diag.with_note(format!("category: {}", self.kind().as_str()));
        match self {
            CompilerError::UnsupportedSyntax { .. } => {
                diag.with_help("the function is emitted unchanged".to_string())
            }
            CompilerError::InvalidAssumption { .. } => diag.with_help(
                "values read from props, hook results and parameters must not be mutated"
                    .to_string(),
            ),
            CompilerError::ConfigurationConflict { .. } => diag,
        }
    }
}

impl From<CompilerError> for Diagnostic {
    fn from(err: CompilerError) -> Self {
        err.to_diagnostic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;

    #[test]
    fn test_display_includes_category() {
        let err = CompilerError::unsupported("'with' statements", Span::new(0, 3, 7));
        assert_eq!(err.to_string(), "unsupported syntax: 'with' statements");
        assert_eq!(err.kind(), ErrorKind::UnsupportedSyntax);
        assert_eq!(err.span(), Span::new(0, 3, 7));
        assert_eq!(err.message(), "'with' statements");
    }

    #[test]
    fn test_skips_are_warnings() {
        let diag: Diagnostic = CompilerError::invalid("mutation of props", Span::dummy()).into();
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.notes, vec!["category: invalid-assumption".to_string()]);
        assert!(diag.help.is_some());
    }

    #[test]
    fn test_conflicts_are_errors() {
        let diag = CompilerError::conflict("emit_freeze in production").to_diagnostic();
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.message.starts_with("configuration conflict"));
    }
}
