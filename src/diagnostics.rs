//! Unified, `miette`-based diagnostics for the preprocessor.
//!
//! Every failure the lexer, evaluator, dispatcher or scanner can produce is a
//! [`PreprocessorError`]. Errors are usually raised before the file they belong
//! to is known (a token slice carries spans, not text), so the source is
//! attached afterwards with [`PreprocessorError::with_source`].
//!
//! # Error Construction Macros
//!
//! - `syntax_err!(Kind, span, "message {}", arg)` for grammar violations.
//! - `err_ctx!(Variant, message, span)` for the other span-carrying variants.
//! - `err_msg!(Variant, message)` for errors with no position (I/O, config).

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Converts a file name and its contents into a shareable miette source.
pub fn to_error_source(name: impl AsRef<str>, content: impl Into<String>) -> SourceArc {
    Arc::new(NamedSource::new(name.as_ref(), content.into()))
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// The ways a directive line can violate the directive grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    /// `#` followed by something that is not a directive keyword.
    UnknownDirective,
    /// A token that the grammar does not allow at this position.
    UnexpectedToken,
    /// The line ended while the grammar still required a token.
    UnexpectedEndOfLine,
    /// A complete directive followed by more tokens before the terminator.
    TrailingTokens,
    /// `(` without a matching `)` inside a conditional expression.
    UnterminatedExpression,
    NestingTooDeep,
    InvalidLineNumber,
    /// A character the directive lexer has no token for.
    InvalidCharacter,
}

impl SyntaxErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownDirective => "unknown_directive",
            Self::UnexpectedToken => "unexpected_token",
            Self::UnexpectedEndOfLine => "unexpected_end_of_line",
            Self::TrailingTokens => "trailing_tokens",
            Self::UnterminatedExpression => "unterminated_expression",
            Self::NestingTooDeep => "nesting_too_deep",
            Self::InvalidLineNumber => "invalid_line_number",
            Self::InvalidCharacter => "invalid_character",
        }
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error classification, for callers and tests that only care about
/// which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Syntax,
    Conditional,
    Io,
    Config,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Syntax => "syntax",
            ErrorType::Conditional => "conditional",
            ErrorType::Io => "io",
            ErrorType::Config => "config",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// A secondary label, e.g. the `#if` an unterminated block was opened at.
#[derive(Debug, Clone)]
pub struct RelatedLabel {
    pub span: Span,
    pub label: String,
}

/// Where an error happened and how to help the user fix it.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub source: Option<SourceArc>,
    pub span: Option<Span>,
    pub help: Option<String>,
    pub related: Vec<RelatedLabel>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_span(span: Span) -> Self {
        Self {
            span: Some(span),
            ..Self::default()
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related.push(RelatedLabel {
            span,
            label: label.into(),
        });
        self
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

#[derive(Debug, Error)]
pub enum PreprocessorError {
    #[error("Syntax error: {message}")]
    Syntax {
        kind: SyntaxErrorKind,
        message: String,
        ctx: ErrorContext,
    },
    /// Misnested `#if`/`#elif`/`#else`/`#endif` or `#region`/`#endregion`.
    #[error("Conditional error: {message}")]
    Conditional { message: String, ctx: ErrorContext },
    #[error("I/O error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<std::io::Error>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl PreprocessorError {
    fn ctx(&self) -> &ErrorContext {
        match self {
            Self::Syntax { ctx, .. }
            | Self::Conditional { ctx, .. }
            | Self::Io { ctx, .. }
            | Self::Config { ctx, .. } => ctx,
        }
    }

    fn ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Syntax { ctx, .. }
            | Self::Conditional { ctx, .. }
            | Self::Io { ctx, .. }
            | Self::Config { ctx, .. } => ctx,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::Syntax { .. } => ErrorType::Syntax,
            Self::Conditional { .. } => ErrorType::Conditional,
            Self::Io { .. } => ErrorType::Io,
            Self::Config { .. } => ErrorType::Config,
        }
    }

    /// The grammar violation behind a syntax error, `None` for other variants.
    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            Self::Syntax { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. }
            | Self::Conditional { message, .. }
            | Self::Io { message, .. }
            | Self::Config { message, .. } => message,
        }
    }

    /// Position of the offending token, in bytes from the start of the unit.
    pub fn span(&self) -> Option<Span> {
        self.ctx().span
    }

    /// Stable machine-readable code, e.g. `cspp::syntax::trailing_tokens`.
    pub fn diagnostic_code(&self) -> String {
        match self {
            Self::Syntax { kind, .. } => format!("cspp::syntax::{}", kind),
            other => format!("cspp::{}", other.error_type()),
        }
    }

    /// Attaches the compilation unit so miette can render a snippet.
    pub fn with_source(mut self, source: SourceArc) -> Self {
        self.ctx_mut().source = Some(source);
        self
    }
}

impl Diagnostic for PreprocessorError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.diagnostic_code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.ctx();
        let mut labels = Vec::new();
        if let Some(span) = ctx.span {
            labels.push(LabeledSpan::new(
                Some(self.message().to_string()),
                span.start,
                span.len().max(1),
            ));
        }
        for rel in &ctx.related {
            labels.push(LabeledSpan::new(
                Some(rel.label.clone()),
                rel.span.start,
                rel.span.len().max(1),
            ));
        }
        if labels.is_empty() {
            None
        } else {
            Some(Box::new(labels.into_iter()))
        }
    }
}

// ============================================================================
// CONSTRUCTION MACROS
// ============================================================================

/// Constructs a [`PreprocessorError::Syntax`] at a span, with a formatted message.
#[macro_export]
macro_rules! syntax_err {
    ($kind:ident, $span:expr, $($fmt:tt)+) => {
        $crate::diagnostics::PreprocessorError::Syntax {
            kind: $crate::diagnostics::SyntaxErrorKind::$kind,
            message: format!($($fmt)+),
            ctx: $crate::diagnostics::ErrorContext::with_span($span),
        }
    };
}

/// Constructs a span-carrying error variant with an optional help message.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $span:expr, $help:expr) => {
        $crate::diagnostics::PreprocessorError::$variant {
            message: $msg.to_string(),
            ctx: $crate::diagnostics::ErrorContext::with_span($span).help($help),
        }
    };
    ($variant:ident, $msg:expr, $span:expr) => {
        $crate::diagnostics::PreprocessorError::$variant {
            message: $msg.to_string(),
            ctx: $crate::diagnostics::ErrorContext::with_span($span),
        }
    };
}

/// Constructs a positionless `Io` or `Config` error with an optional cause.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:expr, $source:expr) => {
        $crate::diagnostics::PreprocessorError::$variant {
            message: $msg.to_string(),
            ctx: $crate::diagnostics::ErrorContext::none(),
            source: Some($source.into()),
        }
    };
    ($variant:ident, $msg:expr) => {
        $crate::diagnostics::PreprocessorError::$variant {
            message: $msg.to_string(),
            ctx: $crate::diagnostics::ErrorContext::none(),
            source: None,
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn test_syntax_error_code_and_labels() {
        let src = to_error_source("file.cs", "#if (A\n");
        let err = crate::syntax_err!(UnterminatedExpression, Span { start: 4, end: 5 }, "unclosed")
            .with_source(src);
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("cspp::syntax::unterminated_expression"));
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("unclosed"));
    }

    #[test]
    fn test_related_labels_render() {
        let src = to_error_source("file.cs", "#if A\nclass C {}\n");
        let mut err = crate::err_ctx!(
            Conditional,
            "missing #endif",
            Span { start: 17, end: 17 },
            "close the block with #endif"
        );
        if let PreprocessorError::Conditional { ctx, .. } = &mut err {
            ctx.related.push(RelatedLabel {
                span: Span { start: 0, end: 5 },
                label: "block opened here".to_string(),
            });
        }
        let output = format!("{:?}", Report::new(err.with_source(src)));
        assert!(output.contains("block opened here"));
        assert!(output.contains("close the block with #endif"));
    }

    #[test]
    fn test_positionless_errors() {
        let err = crate::err_msg!(Io, "cannot read foo.cs");
        assert_eq!(err.error_type(), ErrorType::Io);
        assert!(err.span().is_none());
        assert!(err.syntax_kind().is_none());
    }
}
