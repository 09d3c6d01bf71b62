//! Error taxonomy for the conversion pipeline
//!
//! Read failures belong to the I/O shell and are reported through `anyhow`
//! there. Everything raised by the pure pipeline stages is a [`StubgenError`].

use std::fmt;

/// Failure raised by one of the conversion stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubgenError {
    /// The declaration parser rejected the preprocessed source
    GrammarSyntax {
        module: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A collected declaration did not have the shape the converter expects
    InternalShape(String),

    /// The builder produced text that does not parse as stub syntax
    RenderedTextInvalid { message: String },
}

impl StubgenError {
    /// Build a syntax error located at a 1-based line and 0-based column
    pub fn syntax(
        module: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::GrammarSyntax {
            module: module.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Whether the error points at user input rather than at a bug in this crate
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::GrammarSyntax { .. })
    }
}

impl fmt::Display for StubgenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GrammarSyntax {
                module,
                line,
                column,
                message,
            } => write!(f, "{module}:{line}:{column}: syntax error: {message}"),
            Self::InternalShape(message) => {
                write!(f, "unexpected declaration shape: {message}")
            }
            Self::RenderedTextInvalid { message } => {
                write!(f, "generated stub text is not valid Python: {message}")
            }
        }
    }
}

impl std::error::Error for StubgenError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = StubgenError::syntax("pkg.mod", 3, 4, "expected ':'");
        assert_eq!(err.to_string(), "pkg.mod:3:4: syntax error: expected ':'");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_internal_errors_are_not_user_errors() {
        let err = StubgenError::RenderedTextInvalid {
            message: "bad".to_string(),
        };
        assert!(!err.is_user_error());
        assert!(!StubgenError::InternalShape("x".into()).is_user_error());
    }
}
