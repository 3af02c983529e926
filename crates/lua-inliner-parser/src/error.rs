use lua_inliner_diagnostics::{Diagnostic, DiagnosticCode, Span};
use thiserror::Error;

/// A lexing or parsing failure. Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, span: Span },

    #[error("unfinished string")]
    UnfinishedString { span: Span },

    #[error("unfinished long string")]
    UnfinishedLongString { span: Span },

    #[error("unfinished long comment")]
    UnfinishedLongComment { span: Span },

    #[error("malformed number near '{text}'")]
    MalformedNumber { text: String, span: Span },

    #[error("{expected} expected near '{found}'")]
    Expected {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected symbol near '{found}'")]
    UnexpectedSymbol { found: String, span: Span },

    #[error("syntax error near '{found}'")]
    SyntaxError { found: String, span: Span },

    #[error("cannot use '...' outside a vararg function")]
    VarargOutsideFunction { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedCharacter { span, .. }
            | ParseError::UnfinishedString { span }
            | ParseError::UnfinishedLongString { span }
            | ParseError::UnfinishedLongComment { span }
            | ParseError::MalformedNumber { span, .. }
            | ParseError::Expected { span, .. }
            | ParseError::UnexpectedSymbol { span, .. }
            | ParseError::SyntaxError { span, .. }
            | ParseError::VarargOutsideFunction { span } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::ParseError, self.to_string())
            .with_span(self.span())
            .build()
    }
}
