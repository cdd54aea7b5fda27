//! Directive dispatcher.
//!
//! A stateless routing step: read the keyword after `#`, parse the tail that
//! keyword allows, apply `#define`/`#undef` to the symbol table, and hand
//! exactly one [`DirectiveEvent`] to the caller's [`DirectiveSink`]. Which
//! source lines are live is the sink's business, not the dispatcher's.

use log::trace;

use crate::diagnostics::PreprocessorError;
use crate::directive::{Condition, Directive, DirectiveEvent, LineKind};
use crate::expr::parse_expression;
use crate::symbols::SymbolTable;
use crate::syntax::{tokenize_line, Keyword, Span, Spanned, TokenCursor, TokenKind};
use crate::syntax_err;

// ============================================================================
// EVENT SINKS
// ============================================================================

/// Receives one event per successfully dispatched directive.
pub trait DirectiveSink {
    fn emit(&mut self, event: DirectiveEvent);
}

/// Collects events in order, for tests and batch consumers.
impl DirectiveSink for Vec<DirectiveEvent> {
    fn emit(&mut self, event: DirectiveEvent) {
        self.push(event);
    }
}

impl<F> DirectiveSink for F
where
    F: FnMut(DirectiveEvent),
{
    fn emit(&mut self, event: DirectiveEvent) {
        self(event)
    }
}

/// Discards every event; for callers that only want the return value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DirectiveSink for NullSink {
    fn emit(&mut self, _event: DirectiveEvent) {}
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Dispatch the directive at the cursor. A leading `#` token is skipped if
/// present. On success the cursor is past the line terminator and the event
/// has been emitted to `sink`; on error nothing is emitted and the symbol
/// table is untouched.
pub fn dispatch<S>(
    cursor: &mut TokenCursor,
    symbols: &mut SymbolTable,
    sink: &mut S,
) -> Result<DirectiveEvent, PreprocessorError>
where
    S: DirectiveSink + ?Sized,
{
    let start = cursor.here();
    let sharp = cursor.eat(&TokenKind::Sharp).map(|t| t.span);

    let Some(token) = cursor.peek() else {
        return Err(missing_name(sharp.unwrap_or(start)));
    };
    let keyword = match &token.kind {
        TokenKind::Keyword(keyword) => *keyword,
        TokenKind::NewLine => return Err(missing_name(sharp.unwrap_or(start))),
        TokenKind::Symbol(name) => {
            return Err(syntax_err!(
                UnknownDirective,
                token.span,
                "unknown preprocessor directive `#{}`",
                name
            ))
        }
        other => {
            return Err(syntax_err!(
                UnknownDirective,
                token.span,
                "expected a directive name after `#`, found {}",
                other
            ))
        }
    };
    cursor.advance();

    let directive = match keyword {
        Keyword::Define => Directive::Define(expect_symbol(cursor, keyword)?),
        Keyword::Undef => Directive::Undef(expect_symbol(cursor, keyword)?),
        Keyword::If => Directive::If(expect_condition(cursor, symbols)?),
        Keyword::Elif => Directive::Elif(expect_condition(cursor, symbols)?),
        Keyword::Else => Directive::Else,
        Keyword::Endif => Directive::Endif,
        Keyword::Line => Directive::Line(expect_line_kind(cursor)?),
        Keyword::Error => Directive::Error(expect_text(cursor, keyword)?),
        Keyword::Warning => Directive::Warning(expect_text(cursor, keyword)?),
        Keyword::Region => Directive::Region(optional_text(cursor)),
        Keyword::Endregion => Directive::Endregion(optional_text(cursor)),
        Keyword::Pragma => Directive::Pragma(expect_text(cursor, keyword)?),
        Keyword::Nullable => Directive::Nullable(expect_text(cursor, keyword)?),
        Keyword::Default | Keyword::Hidden | Keyword::True | Keyword::False => {
            return Err(syntax_err!(
                UnknownDirective,
                token.span,
                "`{}` is not a preprocessor directive",
                keyword
            ))
        }
    };

    expect_line_end(cursor, keyword)?;
    let span = cursor
        .last_span()
        .map_or(start, |last| sharp.unwrap_or(start).to(last));
    cursor.eat(&TokenKind::NewLine);

    match &directive {
        Directive::Define(name) => {
            symbols.define(name.as_str());
        }
        Directive::Undef(name) => {
            symbols.undef(name);
        }
        _ => {}
    }

    trace!("dispatched `{}` at {}..{}", directive, span.start, span.end);
    let event = Spanned::new(directive, span);
    sink.emit(event.clone());
    Ok(event)
}

/// Lex and dispatch one directive line starting at `offset` in its unit.
pub fn process_line<S>(
    line: &str,
    offset: usize,
    symbols: &mut SymbolTable,
    sink: &mut S,
) -> Result<DirectiveEvent, PreprocessorError>
where
    S: DirectiveSink + ?Sized,
{
    let tokens = tokenize_line(line, offset)?;
    let mut cursor = TokenCursor::new(&tokens);
    dispatch(&mut cursor, symbols, sink)
}

// ============================================================================
// TAIL PARSERS
// ============================================================================

fn expect_symbol(cursor: &mut TokenCursor, keyword: Keyword) -> Result<String, PreprocessorError> {
    match cursor.peek_kind() {
        Some(TokenKind::Symbol(name)) => {
            cursor.advance();
            Ok(name.clone())
        }
        None | Some(TokenKind::NewLine) => Err(syntax_err!(
            UnexpectedEndOfLine,
            cursor.here(),
            "`#{}` requires a conditional symbol",
            keyword
        )),
        Some(other) => Err(syntax_err!(
            UnexpectedToken,
            cursor.here(),
            "`#{}` expects a conditional symbol, found {}",
            keyword,
            other
        )),
    }
}

fn expect_condition(
    cursor: &mut TokenCursor,
    symbols: &SymbolTable,
) -> Result<Condition, PreprocessorError> {
    let expr = parse_expression(cursor)?;
    let value = expr.eval(symbols);
    Ok(Condition { expr, value })
}

fn expect_line_kind(cursor: &mut TokenCursor) -> Result<LineKind, PreprocessorError> {
    let here = cursor.here();
    match cursor.peek_kind() {
        Some(TokenKind::Keyword(Keyword::Default)) => {
            cursor.advance();
            Ok(LineKind::Default)
        }
        Some(TokenKind::Keyword(Keyword::Hidden)) => {
            cursor.advance();
            Ok(LineKind::Hidden)
        }
        Some(TokenKind::Digits(digits)) => {
            cursor.advance();
            let line = match digits.parse::<u32>() {
                Ok(line) if line >= 1 => line,
                _ => {
                    return Err(syntax_err!(
                        InvalidLineNumber,
                        here,
                        "`#line` number must be between 1 and {}, found {}",
                        u32::MAX,
                        digits
                    ))
                }
            };
            let file = match cursor.peek_kind() {
                Some(TokenKind::String(file)) => {
                    cursor.advance();
                    Some(file.clone())
                }
                _ => None,
            };
            Ok(LineKind::Digits { line, file })
        }
        None | Some(TokenKind::NewLine) => Err(syntax_err!(
            UnexpectedEndOfLine,
            here,
            "`#line` requires a line number, `default` or `hidden`"
        )),
        Some(other) => Err(syntax_err!(
            UnexpectedToken,
            here,
            "`#line` expects a line number, `default` or `hidden`, found {}",
            other
        )),
    }
}

fn optional_text(cursor: &mut TokenCursor) -> Option<String> {
    match cursor.peek_kind() {
        Some(TokenKind::Text(text)) => {
            cursor.advance();
            Some(text.clone())
        }
        _ => None,
    }
}

fn expect_text(cursor: &mut TokenCursor, keyword: Keyword) -> Result<String, PreprocessorError> {
    optional_text(cursor).ok_or_else(|| {
        syntax_err!(
            UnexpectedEndOfLine,
            cursor.here(),
            "`#{}` requires text after the directive name",
            keyword
        )
    })
}

fn expect_line_end(cursor: &mut TokenCursor, keyword: Keyword) -> Result<(), PreprocessorError> {
    if cursor.at_line_end() {
        return Ok(());
    }
    let first = cursor.here();
    let last = cursor
        .remaining()
        .iter()
        .take_while(|t| t.kind != TokenKind::NewLine)
        .last()
        .map_or(first, |t| t.span);
    let found = cursor
        .peek_kind()
        .map(|k| k.to_string())
        .unwrap_or_default();
    Err(syntax_err!(
        TrailingTokens,
        first.to(last),
        "unexpected {} after `#{}` directive",
        found,
        keyword
    ))
}

fn missing_name(span: Span) -> PreprocessorError {
    syntax_err!(
        UnknownDirective,
        span,
        "expected a directive name after `#`"
    )
}
