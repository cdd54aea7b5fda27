//! Conditional-compilation expressions.
//!
//! Precedence climbing over a [`TokenCursor`]. Binding power, tightest first:
//!
//! | operator       | precedence |
//! |----------------|------------|
//! | `!` (prefix)   | unary      |
//! | `==` `!=`      | 3          |
//! | `&&`           | 2          |
//! | `\|\|`         | 1          |
//!
//! Every binary level is left-associative. The parser keeps a small
//! [`BoolExpr`] tree so the condition can be shown back to the user; evaluation
//! only reads the [`SymbolTable`].

use std::fmt;

use serde::Serialize;

use crate::diagnostics::{ErrorContext, PreprocessorError, SyntaxErrorKind};
use crate::symbols::SymbolTable;
use crate::syntax::{Keyword, Span, TokenCursor, TokenKind};
use crate::syntax_err;

/// Limit on nested `(` and `!`, so hostile input cannot exhaust the stack.
pub const MAX_NESTING: usize = 256;

/// Limit on binary operators in one expression. Each one adds a level to the
/// left spine of the tree that `eval`, `Display` and `Drop` walk recursively.
pub const MAX_OPERATORS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BoolExpr {
    Literal(bool),
    Symbol(String),
    Not(Box<BoolExpr>),
    Eq(Box<BoolExpr>, Box<BoolExpr>),
    Ne(Box<BoolExpr>, Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Paren(Box<BoolExpr>),
}

impl BoolExpr {
    pub fn eval(&self, symbols: &SymbolTable) -> bool {
        match self {
            BoolExpr::Literal(b) => *b,
            BoolExpr::Symbol(name) => symbols.is_defined(name),
            BoolExpr::Not(e) => !e.eval(symbols),
            BoolExpr::Eq(a, b) => a.eval(symbols) == b.eval(symbols),
            BoolExpr::Ne(a, b) => a.eval(symbols) != b.eval(symbols),
            BoolExpr::And(a, b) => a.eval(symbols) & b.eval(symbols),
            BoolExpr::Or(a, b) => a.eval(symbols) | b.eval(symbols),
            BoolExpr::Paren(e) => e.eval(symbols),
        }
    }

    /// Symbols the expression reads, in source order, duplicates included.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            BoolExpr::Literal(_) => {}
            BoolExpr::Symbol(name) => out.push(name),
            BoolExpr::Not(e) | BoolExpr::Paren(e) => e.collect_symbols(out),
            BoolExpr::Eq(a, b) | BoolExpr::Ne(a, b) | BoolExpr::And(a, b) | BoolExpr::Or(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
        }
    }
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolExpr::Literal(b) => write!(f, "{}", b),
            BoolExpr::Symbol(name) => f.write_str(name),
            BoolExpr::Not(e) => write!(f, "!{}", e),
            BoolExpr::Eq(a, b) => write!(f, "{} == {}", a, b),
            BoolExpr::Ne(a, b) => write!(f, "{} != {}", a, b),
            BoolExpr::And(a, b) => write!(f, "{} && {}", a, b),
            BoolExpr::Or(a, b) => write!(f, "{} || {}", a, b),
            BoolExpr::Paren(e) => write!(f, "({})", e),
        }
    }
}

// ============================================================================
// OPERATORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
}

impl BinaryOp {
    fn from_token(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::OrOr => Some(Self::Or),
            TokenKind::AndAnd => Some(Self::And),
            TokenKind::EqEq => Some(Self::Eq),
            TokenKind::NotEq => Some(Self::Ne),
            _ => None,
        }
    }

    const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
        }
    }

    fn build(self, lhs: BoolExpr, rhs: BoolExpr) -> BoolExpr {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match self {
            Self::Or => BoolExpr::Or(lhs, rhs),
            Self::And => BoolExpr::And(lhs, rhs),
            Self::Eq => BoolExpr::Eq(lhs, rhs),
            Self::Ne => BoolExpr::Ne(lhs, rhs),
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse one conditional expression, leaving the cursor on the first token
/// that cannot continue it (normally the line terminator).
pub fn parse_expression(cursor: &mut TokenCursor) -> Result<BoolExpr, PreprocessorError> {
    ExprParser {
        cursor,
        depth: 0,
        operators: 0,
    }
    .parse_binary(1)
}

/// Parse and evaluate one conditional expression against `symbols`.
pub fn evaluate(cursor: &mut TokenCursor, symbols: &SymbolTable) -> Result<bool, PreprocessorError> {
    parse_expression(cursor).map(|expr| expr.eval(symbols))
}

// ============================================================================
// PARSER
// ============================================================================

struct ExprParser<'c, 'a> {
    cursor: &'c mut TokenCursor<'a>,
    depth: usize,
    operators: usize,
}

impl ExprParser<'_, '_> {
    fn parse_binary(&mut self, min_prec: u8) -> Result<BoolExpr, PreprocessorError> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.cursor.peek_kind().and_then(BinaryOp::from_token) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            if let Some(token) = self.cursor.advance() {
                self.count_operator(token.span)?;
            }
            let rhs = self.parse_binary(prec + 1)?;
            lhs = op.build(lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<BoolExpr, PreprocessorError> {
        if let Some(bang) = self.cursor.eat(&TokenKind::Bang) {
            self.enter(bang.span)?;
            let operand = self.parse_unary();
            self.depth -= 1;
            return Ok(BoolExpr::Not(Box::new(operand?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<BoolExpr, PreprocessorError> {
        let Some(token) = self.cursor.peek() else {
            return Err(self.missing_operand());
        };

        match &token.kind {
            TokenKind::Keyword(Keyword::True) => {
                self.cursor.advance();
                Ok(BoolExpr::Literal(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.cursor.advance();
                Ok(BoolExpr::Literal(false))
            }
            TokenKind::Symbol(name) => {
                self.cursor.advance();
                Ok(BoolExpr::Symbol(name.clone()))
            }
            TokenKind::OpenParen => {
                let open = token.span;
                self.cursor.advance();
                self.enter(open)?;
                let inner = self.parse_binary(1);
                self.depth -= 1;
                let inner = inner?;
                if self.cursor.eat(&TokenKind::CloseParen).is_none() {
                    return Err(self.unterminated(open));
                }
                Ok(BoolExpr::Paren(Box::new(inner)))
            }
            TokenKind::NewLine => Err(self.missing_operand()),
            TokenKind::Unknown(c) => Err(syntax_err!(
                InvalidCharacter,
                token.span,
                "unexpected character `{}` in conditional expression",
                c.escape_default()
            )),
            other => Err(syntax_err!(
                UnexpectedToken,
                token.span,
                "expected `true`, `false`, a symbol, `!` or `(`, found {}",
                other
            )),
        }
    }

    fn enter(&mut self, span: Span) -> Result<(), PreprocessorError> {
        if self.depth >= MAX_NESTING {
            return Err(syntax_err!(
                NestingTooDeep,
                span,
                "conditional expression nested deeper than {} levels",
                MAX_NESTING
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn count_operator(&mut self, span: Span) -> Result<(), PreprocessorError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(syntax_err!(
                NestingTooDeep,
                span,
                "conditional expression has more than {} binary operators",
                MAX_OPERATORS
            ));
        }
        Ok(())
    }

    fn missing_operand(&self) -> PreprocessorError {
        syntax_err!(
            UnexpectedEndOfLine,
            self.cursor.here(),
            "conditional expression ended where an operand was expected"
        )
    }

    fn unterminated(&self, open: Span) -> PreprocessorError {
        let here = self.cursor.here();
        let found = match self.cursor.peek_kind() {
            Some(TokenKind::NewLine) | None => "the end of the line".to_string(),
            Some(kind) => kind.to_string(),
        };
        PreprocessorError::Syntax {
            kind: SyntaxErrorKind::UnterminatedExpression,
            message: format!("expected `)` to close this parenthesis, found {}", found),
            ctx: ErrorContext::with_span(open)
                .related(here, "parenthesized expression ends here")
                .help("add the missing `)`"),
        }
    }
}
