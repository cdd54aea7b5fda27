//! Directive Lexer
//!
//! Turns one logical preprocessor line into [`Token`]s. The heavy lifting is a
//! small pest grammar (`grammar.pest`); this module maps its pairs onto the
//! directive token set and gives the dispatcher a [`TokenCursor`] to walk them.

use std::fmt;

use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;
use serde::Serialize;

use crate::diagnostics::PreprocessorError;
use crate::syntax::Span;
use crate::syntax_err;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct DirectiveLexer;

// ============================================================================
// TOKENS
// ============================================================================

/// Words with a fixed meaning inside a directive line. An identifier spelled
/// like one of these is never a conditional symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    Define,
    Undef,
    If,
    Elif,
    Else,
    Endif,
    Line,
    Error,
    Warning,
    Region,
    Endregion,
    Pragma,
    Nullable,
    Default,
    Hidden,
    True,
    False,
}

impl Keyword {
    pub fn from_ident(text: &str) -> Option<Self> {
        let keyword = match text {
            "define" => Self::Define,
            "undef" => Self::Undef,
            "if" => Self::If,
            "elif" => Self::Elif,
            "else" => Self::Else,
            "endif" => Self::Endif,
            "line" => Self::Line,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "region" => Self::Region,
            "endregion" => Self::Endregion,
            "pragma" => Self::Pragma,
            "nullable" => Self::Nullable,
            "default" => Self::Default,
            "hidden" => Self::Hidden,
            "true" => Self::True,
            "false" => Self::False,
            _ => return None,
        };
        Some(keyword)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Define => "define",
            Self::Undef => "undef",
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::Endif => "endif",
            Self::Line => "line",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Region => "region",
            Self::Endregion => "endregion",
            Self::Pragma => "pragma",
            Self::Nullable => "nullable",
            Self::Default => "default",
            Self::Hidden => "hidden",
            Self::True => "true",
            Self::False => "false",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Sharp,
    Keyword(Keyword),
    /// A conditional-compilation symbol.
    Symbol(String),
    Digits(String),
    /// A string literal, quotes removed.
    String(String),
    /// The free-form tail of `#error`, `#warning`, `#region`, `#endregion`,
    /// `#pragma` and `#nullable`.
    Text(String),
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Bang,
    OpenParen,
    CloseParen,
    NewLine,
    Unknown(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sharp => write!(f, "`#`"),
            Self::Keyword(k) => write!(f, "keyword `{}`", k),
            Self::Symbol(s) => write!(f, "symbol `{}`", s),
            Self::Digits(d) => write!(f, "number `{}`", d),
            Self::String(s) => write!(f, "string \"{}\"", s),
            Self::Text(_) => write!(f, "text"),
            Self::AndAnd => write!(f, "`&&`"),
            Self::OrOr => write!(f, "`||`"),
            Self::EqEq => write!(f, "`==`"),
            Self::NotEq => write!(f, "`!=`"),
            Self::Bang => write!(f, "`!`"),
            Self::OpenParen => write!(f, "`(`"),
            Self::CloseParen => write!(f, "`)`"),
            Self::NewLine => write!(f, "end of line"),
            Self::Unknown(c) => write!(f, "character `{}`", c.escape_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Lex a single directive line whose first byte sits at `offset` in the
/// compilation unit. The trailing line terminator, if any, becomes a
/// [`TokenKind::NewLine`] token; comments and whitespace produce nothing.
pub fn tokenize_line(line: &str, offset: usize) -> Result<Vec<Token>, PreprocessorError> {
    let mut pairs = DirectiveLexer::parse(Rule::directive_line, line)
        .map_err(|e| convert_lex_error(e, line, offset))?;

    let mut tokens = Vec::new();
    let Some(directive_line) = pairs.next() else {
        return Ok(tokens);
    };

    for pair in directive_line.into_inner() {
        match pair.as_rule() {
            Rule::text_directive | Rule::token_directive => {
                for inner in pair.into_inner() {
                    if let Some(token) = build_token(inner, offset) {
                        tokens.push(token);
                    }
                }
            }
            _ => {
                if let Some(token) = build_token(pair, offset) {
                    tokens.push(token);
                }
            }
        }
    }
    Ok(tokens)
}

// ============================================================================
// TOKEN BUILDERS
// ============================================================================

fn build_token(pair: Pair<Rule>, offset: usize) -> Option<Token> {
    let span = get_span(&pair, offset);
    let text = pair.as_str();

    let kind = match pair.as_rule() {
        Rule::sharp => TokenKind::Sharp,
        Rule::text_keyword | Rule::identifier => match Keyword::from_ident(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Symbol(text.to_string()),
        },
        Rule::text => TokenKind::Text(text.to_string()),
        Rule::digits => TokenKind::Digits(text.to_string()),
        Rule::string => {
            let body = pair
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            TokenKind::String(body)
        }
        Rule::op_and => TokenKind::AndAnd,
        Rule::op_or => TokenKind::OrOr,
        Rule::op_eq => TokenKind::EqEq,
        Rule::op_ne => TokenKind::NotEq,
        Rule::bang => TokenKind::Bang,
        Rule::open_parens => TokenKind::OpenParen,
        Rule::close_parens => TokenKind::CloseParen,
        Rule::new_line => TokenKind::NewLine,
        Rule::unknown => TokenKind::Unknown(text.chars().next()?),
        // comments and EOI
        _ => return None,
    };
    Some(Token { kind, span })
}

fn get_span(pair: &Pair<Rule>, offset: usize) -> Span {
    Span {
        start: offset + pair.as_span().start(),
        end: offset + pair.as_span().end(),
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn convert_lex_error(error: Error<Rule>, line: &str, offset: usize) -> PreprocessorError {
    let pos = match error.location {
        pest::error::InputLocation::Pos(pos) => pos,
        pest::error::InputLocation::Span((start, _)) => start,
    };

    if !line.trim_start().starts_with('#') {
        let start = line.len() - line.trim_start().len();
        return syntax_err!(
            UnexpectedToken,
            Span::point(offset + start),
            "a preprocessor directive must start with `#`"
        );
    }

    syntax_err!(
        TrailingTokens,
        Span::new(offset + pos, offset + line.len()),
        "a preprocessor directive must end at the first line terminator"
    )
}

// ============================================================================
// TOKEN CURSOR
// ============================================================================

/// A forward-only view over the tokens of one directive line.
#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: Span,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let end = match tokens.last() {
            Some(Token {
                kind: TokenKind::NewLine,
                span,
            }) => Span::point(span.start),
            Some(token) => Span::point(token.span.end),
            None => Span::point(0),
        };
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    pub fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Consumes the next token if it has exactly this kind.
    pub fn eat(&mut self, kind: &TokenKind) -> Option<&'a Token> {
        match self.peek() {
            Some(token) if &token.kind == kind => self.advance(),
            _ => None,
        }
    }

    /// True at the line terminator or when the tokens run out.
    pub fn at_line_end(&self) -> bool {
        matches!(self.peek_kind(), None | Some(TokenKind::NewLine))
    }

    /// Span of the next token, or the end-of-line position.
    pub fn here(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or(self.end)
    }

    pub fn end_span(&self) -> Span {
        self.end
    }

    /// Span of the most recently consumed token.
    pub fn last_span(&self) -> Option<Span> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [Token] {
        &self.tokens[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<TokenKind> {
        tokenize_line(line, 0)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_define_line() {
        assert_eq!(
            kinds("#define DEBUG\n"),
            vec![
                TokenKind::Sharp,
                TokenKind::Keyword(Keyword::Define),
                TokenKind::Symbol("DEBUG".into()),
                TokenKind::NewLine,
            ]
        );
    }

    #[test]
    fn test_operators_and_whitespace() {
        assert_eq!(
            kinds("  #  if (A&&!B)||C==true != false"),
            vec![
                TokenKind::Sharp,
                TokenKind::Keyword(Keyword::If),
                TokenKind::OpenParen,
                TokenKind::Symbol("A".into()),
                TokenKind::AndAnd,
                TokenKind::Bang,
                TokenKind::Symbol("B".into()),
                TokenKind::CloseParen,
                TokenKind::OrOr,
                TokenKind::Symbol("C".into()),
                TokenKind::EqEq,
                TokenKind::Keyword(Keyword::True),
                TokenKind::NotEq,
                TokenKind::Keyword(Keyword::False),
            ]
        );
    }

    #[test]
    fn test_text_mode_keeps_tail_verbatim() {
        assert_eq!(
            kinds("#region \"label text\" && more\r\n"),
            vec![
                TokenKind::Sharp,
                TokenKind::Keyword(Keyword::Region),
                TokenKind::Text("\"label text\" && more".into()),
                TokenKind::NewLine,
            ]
        );
    }

    #[test]
    fn test_text_keyword_without_tail() {
        assert_eq!(
            kinds("#endregion   "),
            vec![TokenKind::Sharp, TokenKind::Keyword(Keyword::Endregion)]
        );
    }

    #[test]
    fn test_text_without_separator() {
        assert_eq!(
            kinds("#region---"),
            vec![
                TokenKind::Sharp,
                TokenKind::Keyword(Keyword::Region),
                TokenKind::Text("---".into()),
            ]
        );
        let tokens = tokenize_line("#error: bad\n", 0).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Text(": bad".into()));
        assert_eq!(tokens[2].span, Span::new(6, 11));
    }

    #[test]
    fn test_comment_is_dropped() {
        assert_eq!(
            kinds("#endif // DEBUG"),
            vec![TokenKind::Sharp, TokenKind::Keyword(Keyword::Endif)]
        );
    }

    #[test]
    fn test_line_with_digits_and_string() {
        assert_eq!(
            kinds("#line 200 \"Special.cs\""),
            vec![
                TokenKind::Sharp,
                TokenKind::Keyword(Keyword::Line),
                TokenKind::Digits("200".into()),
                TokenKind::String("Special.cs".into()),
            ]
        );
    }

    #[test]
    fn test_spans_are_offset() {
        let tokens = tokenize_line("#if FOO", 100).unwrap();
        assert_eq!(tokens[0].span, Span::new(100, 101));
        assert_eq!(tokens[1].span, Span::new(101, 103));
        assert_eq!(tokens[2].span, Span::new(104, 107));
    }

    #[test]
    fn test_unknown_character() {
        let k = kinds("#if A & B");
        assert!(k.contains(&TokenKind::Unknown('&')));
    }

    #[test]
    fn test_identifier_prefixed_by_keyword_is_symbol() {
        assert_eq!(
            kinds("#define errors"),
            vec![
                TokenKind::Sharp,
                TokenKind::Keyword(Keyword::Define),
                TokenKind::Symbol("errors".into()),
            ]
        );
        assert_eq!(
            kinds("#iffy")[1],
            TokenKind::Symbol("iffy".into())
        );
    }

    #[test]
    fn test_not_a_directive() {
        assert!(tokenize_line("class Foo {}", 0).is_err());
    }

    #[test]
    fn test_content_after_terminator_is_rejected() {
        let err = tokenize_line("#endif\nclass C {}", 0).unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_cursor_end_span() {
        let tokens = tokenize_line("#else\n", 10).unwrap();
        let mut cursor = TokenCursor::new(&tokens);
        assert_eq!(cursor.end_span(), Span::point(15));
        cursor.advance();
        cursor.advance();
        assert!(cursor.at_line_end());
    }
}
