//! Conditional-compilation symbol table.
//!
//! The set of symbols currently defined for one compilation unit. Backed by a
//! persistent `im::OrdSet`, so seeding every file from the same `/define:`
//! baseline is a cheap clone and each file's `#define`/`#undef` mutations stay
//! local to that file.

use im::OrdSet;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    defined: OrdSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table pre-populated with externally supplied symbols.
    pub fn with_baseline<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            defined: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Defines `name`. Returns whether the table changed.
    pub fn define(&mut self, name: impl Into<String>) -> bool {
        self.defined.insert(name.into()).is_none()
    }

    /// Removes `name` if present. Returns whether the table changed.
    pub fn undef(&mut self, name: &str) -> bool {
        self.defined.remove(name).is_some()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(name)
    }

    /// Defined symbols in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.defined.iter()
    }

    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::with_baseline(iter)
    }
}
