//! Compilation-unit scanner.
//!
//! The host side of the dispatcher: walks a file line by line, dispatches
//! every directive line, and keeps the state the dispatcher deliberately does
//! not own. That state is the stack of pending `#if` frames that decides which
//! lines are live, the `#region` nesting, and the `#error`/`#warning`
//! diagnostics raised in live code.
//!
//! Multi-line comments and verbatim strings that happen to contain a line
//! starting with `#` are not recognised; that is the full lexer's job.

use log::debug;
use serde::Serialize;

use crate::config::ScanConfig;
use crate::diagnostics::{to_error_source, ErrorContext, PreprocessorError, SourceArc};
use crate::directive::{Directive, DirectiveEvent};
use crate::dispatch::dispatch;
use crate::err_ctx;
use crate::symbols::SymbolTable;
use crate::syntax::{
    assert_valid_span, tokenize_line, Keyword, Span, Token, TokenCursor, TokenKind,
};

// ============================================================================
// CONDITIONAL STACK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    /// Whether the code around the `#if` was live.
    parent_active: bool,
    /// Whether some branch of this block has already been selected.
    branch_taken: bool,
    active: bool,
    seen_else: bool,
    opened_at: Span,
}

/// Pending `#if` blocks, innermost last.
#[derive(Debug, Clone, Default)]
pub struct ConditionalStack {
    frames: Vec<Frame>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether code at the current position is compiled.
    pub fn is_active(&self) -> bool {
        self.frames.last().map_or(true, |f| f.active)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn on_if(&mut self, value: bool, span: Span) {
        let parent_active = self.is_active();
        self.frames.push(Frame {
            parent_active,
            branch_taken: value,
            active: parent_active && value,
            seen_else: false,
            opened_at: span,
        });
        debug!("#if -> depth {}, active {}", self.depth(), self.is_active());
    }

    pub fn on_elif(&mut self, value: bool, span: Span) -> Result<(), PreprocessorError> {
        let frame = self.open_frame("#elif", span)?;
        frame.active = frame.parent_active && !frame.branch_taken && value;
        frame.branch_taken |= value;
        debug!("#elif -> active {}", frame.active);
        Ok(())
    }

    pub fn on_else(&mut self, span: Span) -> Result<(), PreprocessorError> {
        let frame = self.open_frame("#else", span)?;
        frame.active = frame.parent_active && !frame.branch_taken;
        frame.branch_taken = true;
        frame.seen_else = true;
        debug!("#else -> active {}", frame.active);
        Ok(())
    }

    pub fn on_endif(&mut self, span: Span) -> Result<(), PreprocessorError> {
        if self.frames.pop().is_none() {
            return Err(err_ctx!(
                Conditional,
                "`#endif` without a matching `#if`",
                span
            ));
        }
        debug!("#endif -> depth {}", self.depth());
        Ok(())
    }

    /// Routes a conditional directive; other directives are ignored.
    pub fn apply(&mut self, directive: &Directive, span: Span) -> Result<(), PreprocessorError> {
        match directive {
            Directive::If(c) => {
                self.on_if(c.value, span);
                Ok(())
            }
            Directive::Elif(c) => self.on_elif(c.value, span),
            Directive::Else => self.on_else(span),
            Directive::Endif => self.on_endif(span),
            _ => Ok(()),
        }
    }

    /// Fails if a block is still open at `eof`, labelling its `#if`.
    pub fn finish(&self, eof: Span) -> Result<(), PreprocessorError> {
        match self.frames.last() {
            None => Ok(()),
            Some(frame) => Err(PreprocessorError::Conditional {
                message: "`#endif` directive expected".to_string(),
                ctx: ErrorContext::with_span(eof)
                    .related(frame.opened_at, "conditional block opened here")
                    .help("close the block with `#endif`"),
            }),
        }
    }

    fn open_frame(&mut self, name: &str, span: Span) -> Result<&mut Frame, PreprocessorError> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(err_ctx!(
                Conditional,
                format!("`{}` without a matching `#if`", name),
                span
            ));
        };
        if frame.seen_else {
            let opened_at = frame.opened_at;
            return Err(PreprocessorError::Conditional {
                message: format!("`{}` cannot follow `#else`", name),
                ctx: ErrorContext::with_span(span)
                    .related(opened_at, "in the block opened here"),
            });
        }
        Ok(frame)
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// An `#error` or `#warning` reached in live code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    /// 1-based line number.
    pub line: usize,
}

/// One dispatched directive and where it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveRecord {
    /// 1-based line number.
    pub line: usize,
    /// Whether the surrounding code was live when the directive was reached.
    pub active: bool,
    pub event: DirectiveEvent,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub name: String,
    pub events: Vec<DirectiveRecord>,
    pub diagnostics: Vec<DirectiveDiagnostic>,
    /// Errors collected in recovery mode; always empty otherwise.
    #[serde(skip)]
    pub errors: Vec<PreprocessorError>,
    /// One entry per physical line: true for live code lines, false for
    /// directive lines and disabled code.
    pub line_active: Vec<bool>,
    /// The symbol table as it stood at end of file.
    pub symbols: SymbolTable,
}

impl ScanReport {
    /// True if the file produced an error or reached an `#error`.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
            || self
                .diagnostics
                .iter()
                .any(|d| d.severity == Severity::Error)
    }

    /// The live code of `source`, which must be the text this report was
    /// produced from. With `keep_line_numbers`, dropped lines are replaced by
    /// their bare terminators so line numbers still match `source`.
    pub fn render_active(&self, source: &str, keep_line_numbers: bool) -> String {
        let mut out = String::with_capacity(source.len());
        for (index, (_, line)) in split_lines(strip_bom(source).1).into_iter().enumerate() {
            if self.line_active.get(index).copied().unwrap_or(false) {
                out.push_str(line);
            } else if keep_line_numbers {
                out.push_str(line_terminator(line));
            }
        }
        out
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Scan one compilation unit with a fresh table seeded from `config`.
pub fn scan(source: &str, name: &str, config: &ScanConfig) -> Result<ScanReport, PreprocessorError> {
    scan_with_baseline(source, name, &config.baseline(), config.recover)
}

/// Scan one compilation unit on top of a shared baseline symbol table. The
/// baseline itself is never modified.
pub fn scan_with_baseline(
    source: &str,
    name: &str,
    baseline: &SymbolTable,
    recover: bool,
) -> Result<ScanReport, PreprocessorError> {
    debug!("scanning {} ({} bytes, {} predefined symbols)", name, source.len(), baseline.len());
    let mut scanner = Scanner {
        source: to_error_source(name, source),
        recover,
        symbols: baseline.clone(),
        stack: ConditionalStack::new(),
        regions: Vec::new(),
        events: Vec::new(),
        diagnostics: Vec::new(),
        errors: Vec::new(),
        line_active: Vec::new(),
    };

    let (bom, body) = strip_bom(source);
    for (index, (offset, line)) in split_lines(body).into_iter().enumerate() {
        let offset = bom + offset;
        if !is_directive_line(line) {
            scanner.line_active.push(scanner.stack.is_active());
            continue;
        }
        scanner.line_active.push(false);
        let result = scanner.directive_line(line, offset, index + 1);
        scanner.check(result)?;
    }

    let eof = Span::point(source.len());
    let result = scanner.stack.finish(eof);
    scanner.check(result)?;
    if let Some(opened_at) = scanner.regions.last().copied() {
        let result = Err(PreprocessorError::Conditional {
            message: "`#endregion` directive expected".to_string(),
            ctx: ErrorContext::with_span(eof)
                .related(opened_at, "region opened here")
                .help("close the region with `#endregion`"),
        });
        scanner.check(result)?;
    }

    debug!(
        "scanned {}: {} directives, {} diagnostics, {} errors",
        name,
        scanner.events.len(),
        scanner.diagnostics.len(),
        scanner.errors.len()
    );
    Ok(ScanReport {
        name: name.to_string(),
        events: scanner.events,
        diagnostics: scanner.diagnostics,
        errors: scanner.errors,
        line_active: scanner.line_active,
        symbols: scanner.symbols,
    })
}

// ============================================================================
// SCANNER
// ============================================================================

struct Scanner {
    source: SourceArc,
    recover: bool,
    symbols: SymbolTable,
    stack: ConditionalStack,
    regions: Vec<Span>,
    events: Vec<DirectiveRecord>,
    diagnostics: Vec<DirectiveDiagnostic>,
    errors: Vec<PreprocessorError>,
    line_active: Vec<bool>,
}

impl Scanner {
    fn directive_line(&mut self, line: &str, offset: usize, line_no: usize) -> Result<(), PreprocessorError> {
        let active = self.stack.is_active();
        let tokens = match tokenize_line(line, offset) {
            Ok(tokens) => tokens,
            Err(_) if !active => return Ok(()),
            Err(e) => return Err(e),
        };
        // Disabled code only tracks block structure.
        if !active && !opens_conditional(&tokens) {
            return Ok(());
        }

        let mut cursor = TokenCursor::new(&tokens);
        let events = &mut self.events;
        let mut sink = |event: DirectiveEvent| {
            events.push(DirectiveRecord {
                line: line_no,
                active,
                event,
            })
        };
        let event = dispatch(&mut cursor, &mut self.symbols, &mut sink)?;
        assert_valid_span(event.span, self.source.inner());

        self.stack.apply(&event.value, event.span)?;
        match event.value {
            Directive::Region(_) => self.regions.push(event.span),
            Directive::Endregion(_) => {
                if self.regions.pop().is_none() {
                    return Err(err_ctx!(
                        Conditional,
                        "`#endregion` without a matching `#region`",
                        event.span
                    ));
                }
            }
            Directive::Error(message) => self.diagnostics.push(DirectiveDiagnostic {
                severity: Severity::Error,
                message,
                span: event.span,
                line: line_no,
            }),
            Directive::Warning(message) => self.diagnostics.push(DirectiveDiagnostic {
                severity: Severity::Warning,
                message,
                span: event.span,
                line: line_no,
            }),
            _ => {}
        }
        Ok(())
    }

    /// Records or propagates an error according to the recovery setting.
    fn check(&mut self, result: Result<(), PreprocessorError>) -> Result<(), PreprocessorError> {
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                let e = e.with_source(self.source.clone());
                if self.recover {
                    self.errors.push(e);
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }
}

// ============================================================================
// LINE UTILITIES
// ============================================================================

fn opens_conditional(tokens: &[Token]) -> bool {
    let keyword = tokens
        .iter()
        .find(|t| t.kind != TokenKind::Sharp)
        .map(|t| &t.kind);
    matches!(
        keyword,
        Some(TokenKind::Keyword(
            Keyword::If | Keyword::Elif | Keyword::Else | Keyword::Endif
        ))
    )
}

fn is_directive_line(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn strip_bom(source: &str) -> (usize, &str) {
    match source.strip_prefix('\u{FEFF}') {
        Some(rest) => ('\u{FEFF}'.len_utf8(), rest),
        None => (0, source),
    }
}

/// Splits on every C# line terminator, keeping each terminator with its line.
fn split_lines(source: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = source.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let end = match c {
            '\r' => match chars.peek() {
                Some(&(j, '\n')) => {
                    chars.next();
                    j + 1
                }
                _ => i + 1,
            },
            '\n' | '\u{85}' | '\u{2028}' | '\u{2029}' => i + c.len_utf8(),
            _ => continue,
        };
        lines.push((start, &source[start..end]));
        start = end;
    }
    if start < source.len() {
        lines.push((start, &source[start..]));
    }
    lines
}

fn line_terminator(line: &str) -> &str {
    let body = line.trim_end_matches(|c| matches!(c, '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}'));
    &line[body.len()..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_keeps_terminators() {
        let lines = split_lines("a\r\nb\nc\rd\u{2028}e");
        let texts: Vec<&str> = lines.iter().map(|(_, l)| *l).collect();
        assert_eq!(texts, vec!["a\r\n", "b\n", "c\r", "d\u{2028}", "e"]);
        assert_eq!(lines[1].0, 3);
    }

    #[test]
    fn test_stack_if_elif_else() {
        let s = Span::default();
        let mut stack = ConditionalStack::new();
        stack.on_if(false, s);
        assert!(!stack.is_active());
        stack.on_elif(true, s).unwrap();
        assert!(stack.is_active());
        stack.on_elif(true, s).unwrap();
        assert!(!stack.is_active());
        stack.on_else(s).unwrap();
        assert!(!stack.is_active());
        stack.on_endif(s).unwrap();
        assert!(stack.is_active());
    }

    #[test]
    fn test_stack_inactive_parent_wins() {
        let s = Span::default();
        let mut stack = ConditionalStack::new();
        stack.on_if(false, s);
        stack.on_if(true, s);
        assert!(!stack.is_active());
        stack.on_else(s).unwrap();
        assert!(!stack.is_active());
    }

    #[test]
    fn test_stack_misnesting() {
        let s = Span::default();
        let mut stack = ConditionalStack::new();
        assert!(stack.on_else(s).is_err());
        assert!(stack.on_endif(s).is_err());
        stack.on_if(true, s);
        stack.on_else(s).unwrap();
        assert!(stack.on_elif(true, s).is_err());
        assert!(stack.finish(s).is_err());
    }
}
