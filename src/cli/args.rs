//! Defines the command-line arguments and subcommands for the cspp CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "cspp",
    version,
    about = "Recognizes C# preprocessor directives and evaluates conditional compilation."
)]
pub struct CsppArgs {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` also works.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the predefined symbols come from.
#[derive(Debug, Clone, Default, Args)]
pub struct SymbolArgs {
    /// Define a conditional-compilation symbol, like `/define:` (repeatable).
    #[arg(short = 'D', long = "define", value_name = "SYMBOL")]
    pub defines: Vec<String>,

    /// YAML configuration file with `defines` and `recover`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dispatch every directive in the given files or directories (*.cs).
    Scan {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        symbols: SymbolArgs,

        /// Print one JSON report per file.
        #[arg(long)]
        json: bool,

        /// Keep going after a malformed directive line.
        #[arg(long)]
        recover: bool,
    },
    /// Evaluate a single conditional expression.
    Eval {
        /// The expression, e.g. "DEBUG && !TRACE".
        expr: String,

        #[command(flatten)]
        symbols: SymbolArgs,
    },
    /// Print the source lines that survive conditional compilation.
    Active {
        #[arg(required = true)]
        file: PathBuf,

        #[command(flatten)]
        symbols: SymbolArgs,

        /// Blank out dropped lines instead of removing them.
        #[arg(long)]
        keep_lines: bool,
    },
}
