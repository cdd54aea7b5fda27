//! The cspp Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{debug, LevelFilter};
use walkdir::WalkDir;

use crate::cli::args::{Command, CsppArgs, SymbolArgs};
use crate::config::ScanConfig;
use crate::diagnostics::{to_error_source, PreprocessorError};
use crate::directive::Directive;
use crate::dispatch::{process_line, NullSink};
use crate::err_msg;
use crate::scanner::{scan, scan_with_baseline};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = CsppArgs::parse();
    init_logging(args.verbose);

    // Dispatch to the appropriate subcommand handler.
    let result = match args.command {
        Command::Scan {
            paths,
            symbols,
            json,
            recover,
        } => handle_scan(&paths, &symbols, json, recover),
        Command::Eval { expr, symbols } => handle_eval(&expr, &symbols),
        Command::Active {
            file,
            symbols,
            keep_lines,
        } => handle_active(&file, &symbols, keep_lines),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            output::print_error(&e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    let _ = builder.try_init();
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

/// Handles the `scan` subcommand. Returns `Ok(false)` if any file failed.
fn handle_scan(
    paths: &[PathBuf],
    symbols: &SymbolArgs,
    json: bool,
    recover: bool,
) -> Result<bool, PreprocessorError> {
    let mut config = load_config(symbols)?;
    config.recover |= recover;
    let baseline = config.baseline();

    let mut ok = true;
    for path in collect_sources(paths)? {
        let name = path.display().to_string();
        let outcome = read_source(&path)
            .and_then(|source| scan_with_baseline(&source, &name, &baseline, config.recover));
        match outcome {
            Ok(report) => {
                ok &= !report.has_errors();
                if json {
                    output::print_json(&output::report_json(&report));
                } else {
                    output::print_report(&report);
                }
            }
            Err(e) => {
                ok = false;
                if json {
                    output::print_json(&output::failure_json(&name, &e));
                } else {
                    output::print_error(&e);
                }
            }
        }
    }
    Ok(ok)
}

/// Handles the `eval` subcommand.
fn handle_eval(expr: &str, symbols: &SymbolArgs) -> Result<bool, PreprocessorError> {
    let config = load_config(symbols)?;
    let mut table = config.baseline();
    let line = format!("#if {}", expr);
    let event = process_line(&line, 0, &mut table, &mut NullSink)
        .map_err(|e| e.with_source(to_error_source("<expr>", line.as_str())))?;
    if let Directive::If(condition) = event.value {
        output::print_bool(condition.value);
    }
    Ok(true)
}

/// Handles the `active` subcommand.
fn handle_active(file: &Path, symbols: &SymbolArgs, keep_lines: bool) -> Result<bool, PreprocessorError> {
    let config = load_config(symbols)?;
    let source = read_source(file)?;
    let report = scan(&source, &file.display().to_string(), &config)?;
    print!("{}", report.render_active(&source, keep_lines));
    Ok(!report.has_errors())
}

// ============================================================================
// HELPERS
// ============================================================================

fn load_config(symbols: &SymbolArgs) -> Result<ScanConfig, PreprocessorError> {
    let config = match &symbols.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    let config = config.with_defines(symbols.defines.iter().cloned());
    config.validate()?;
    Ok(config)
}

fn read_source(path: &Path) -> Result<String, PreprocessorError> {
    fs::read_to_string(path)
        .map_err(|e| err_msg!(Io, format!("failed to read '{}'", path.display()), e))
}

/// Expands directories into their `*.cs` files, sorted for stable output.
fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, PreprocessorError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(|e| {
                err_msg!(Io, format!("failed to walk '{}': {}", path.display(), e))
            })?;
            let is_cs = entry.path().extension().map_or(false, |ext| ext == "cs");
            if entry.file_type().is_file() && is_cs {
                found.push(entry.into_path());
            }
        }
        found.sort();
        debug!("found {} source files under {}", found.len(), path.display());
        files.extend(found);
    }
    Ok(files)
}
