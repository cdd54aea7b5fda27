//! cspp: recognizes C# preprocessor directives and evaluates their
//! conditional-compilation expressions.
//!
//! The pipeline for one directive line is
//! [`tokenize_line`] -> [`dispatch`] (which calls [`expr::evaluate`] for
//! `#if`/`#elif`) -> one [`DirectiveEvent`] delivered to a [`DirectiveSink`].
//! [`scanner`] is a ready-made host that runs the pipeline over a whole file
//! and tracks which lines are live.

pub use crate::config::ScanConfig;
pub use crate::diagnostics::{ErrorContext, ErrorType, PreprocessorError, SyntaxErrorKind};
pub use crate::directive::{Condition, Directive, DirectiveEvent, LineKind};
pub use crate::dispatch::{dispatch, process_line, DirectiveSink, NullSink};
pub use crate::expr::{evaluate, parse_expression, BoolExpr};
pub use crate::scanner::{scan, scan_with_baseline, ConditionalStack, ScanReport};
pub use crate::symbols::SymbolTable;
pub use crate::syntax::{tokenize_line, Span, Spanned, Token, TokenCursor, TokenKind};

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod directive;
pub mod dispatch;
pub mod expr;
pub mod scanner;
pub mod symbols;
pub mod syntax;
