//! The directive model: one enum case per preprocessor keyword.

use std::fmt;

use serde::Serialize;

use crate::expr::BoolExpr;
use crate::syntax::Spanned;

/// What a dispatched directive line delivers to its sink. The span covers the
/// whole line, `#` through the last token before the terminator.
pub type DirectiveEvent = Spanned<Directive>;

/// An evaluated `#if`/`#elif` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub expr: BoolExpr,
    pub value: bool,
}

/// The three tails of `#line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LineKind {
    Digits { line: u32, file: Option<String> },
    Default,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Directive {
    Define(String),
    Undef(String),
    If(Condition),
    Elif(Condition),
    Else,
    Endif,
    Line(LineKind),
    Error(String),
    Warning(String),
    Region(Option<String>),
    Endregion(Option<String>),
    Pragma(String),
    Nullable(String),
}

impl Directive {
    /// The directive keyword, without the `#`.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Define(_) => "define",
            Directive::Undef(_) => "undef",
            Directive::If(_) => "if",
            Directive::Elif(_) => "elif",
            Directive::Else => "else",
            Directive::Endif => "endif",
            Directive::Line(_) => "line",
            Directive::Error(_) => "error",
            Directive::Warning(_) => "warning",
            Directive::Region(_) => "region",
            Directive::Endregion(_) => "endregion",
            Directive::Pragma(_) => "pragma",
            Directive::Nullable(_) => "nullable",
        }
    }

    /// True for `#if`, `#elif`, `#else` and `#endif`, the directives a host
    /// must still process inside a disabled region.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Directive::If(_) | Directive::Elif(_) | Directive::Else | Directive::Endif
        )
    }

    /// The evaluated condition of `#if`/`#elif`.
    pub fn condition(&self) -> Option<bool> {
        match self {
            Directive::If(c) | Directive::Elif(c) => Some(c.value),
            _ => None,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.name())?;
        match self {
            Directive::Define(s) | Directive::Undef(s) => write!(f, " {}", s),
            Directive::If(c) | Directive::Elif(c) => write!(f, " {}", c.expr),
            Directive::Else | Directive::Endif => Ok(()),
            Directive::Line(LineKind::Digits { line, file }) => {
                write!(f, " {}", line)?;
                match file {
                    Some(file) => write!(f, " \"{}\"", file),
                    None => Ok(()),
                }
            }
            Directive::Line(LineKind::Default) => write!(f, " default"),
            Directive::Line(LineKind::Hidden) => write!(f, " hidden"),
            Directive::Error(t)
            | Directive::Warning(t)
            | Directive::Pragma(t)
            | Directive::Nullable(t) => write!(f, " {}", t),
            Directive::Region(t) | Directive::Endregion(t) => match t {
                Some(t) => write!(f, " {}", t),
                None => Ok(()),
            },
        }
    }
}
