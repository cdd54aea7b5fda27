//! Scan configuration.
//!
//! Loaded from an optional YAML file and extended by command-line flags:
//!
//! ```yaml
//! defines: [DEBUG, TRACE]
//! recover: true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::PreprocessorError;
use crate::err_msg;
use crate::symbols::SymbolTable;
use crate::syntax::{tokenize_line, TokenKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Symbols defined before the first directive of every file, the
    /// equivalent of `/define:` on the compiler command line.
    #[serde(default)]
    pub defines: Vec<String>,
    /// Keep scanning after a malformed directive line instead of aborting the
    /// file. Errors are collected in the report.
    #[serde(default)]
    pub recover: bool,
}

impl ScanConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, PreprocessorError> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| err_msg!(Config, format!("invalid configuration: {}", e), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, PreprocessorError> {
        let text = fs::read_to_string(path).map_err(|e| {
            err_msg!(
                Io,
                format!("failed to read configuration '{}'", path.display()),
                e
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Appends command-line symbols, skipping ones already listed.
    pub fn with_defines<I, S>(mut self, defines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for define in defines {
            let define = define.into();
            if !self.defines.contains(&define) {
                self.defines.push(define);
            }
        }
        self
    }

    /// Rejects names no `#if` could ever test: keywords, empty strings and
    /// anything that does not lex as a single conditional symbol.
    pub fn validate(&self) -> Result<(), PreprocessorError> {
        match self.defines.iter().find(|name| !is_symbol_name(name)) {
            Some(name) => Err(err_msg!(
                Config,
                format!("`{}` is not a valid conditional symbol", name.escape_default())
            )),
            None => Ok(()),
        }
    }

    /// The symbol table every file in a run starts from.
    pub fn baseline(&self) -> SymbolTable {
        SymbolTable::with_baseline(self.defines.iter().cloned())
    }
}

fn is_symbol_name(name: &str) -> bool {
    let Ok(tokens) = tokenize_line(&format!("#define {}", name), 0) else {
        return false;
    };
    matches!(&tokens[..], [_, _, token] if token.kind == TokenKind::Symbol(name.to_string()))
}
