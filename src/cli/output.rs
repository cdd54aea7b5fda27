//! Handles all user-facing output for the CLI.
//!
//! Colorized directive listings, `#error`/`#warning` diagnostics, miette error
//! reports and JSON. Centralized here so every command prints the same way.

use std::io::Write;

use miette::GraphicalReportHandler;
use serde_json::{json, Value};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::diagnostics::PreprocessorError;
use crate::scanner::{DirectiveDiagnostic, DirectiveRecord, ScanReport, Severity};

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Prints every dispatched directive of a report, then its diagnostics and
/// collected errors.
pub fn print_report(report: &ScanReport) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(stdout, "{}", report.name);
    let _ = stdout.reset();

    for record in &report.events {
        print_record(&mut stdout, record);
    }
    for diagnostic in &report.diagnostics {
        print_diagnostic(&report.name, diagnostic);
    }
    for error in &report.errors {
        print_error(error);
    }
}

/// Renders an error with its source snippet, if one is attached.
pub fn print_error(error: &PreprocessorError) {
    let mut out = String::new();
    match GraphicalReportHandler::new().render_report(&mut out, error) {
        Ok(()) => eprintln!("{}", out),
        Err(_) => eprintln!("Error: {}", error),
    }
}

/// Prints an evaluated condition as `true` or `false`.
pub fn print_bool(value: bool) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let color = if value { Color::Green } else { Color::Red };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(stdout, "{}", value);
    let _ = stdout.reset();
}

/// A report as JSON, including the errors collected in recovery mode.
pub fn report_json(report: &ScanReport) -> Value {
    json!({
        "report": report,
        "errors": report.errors.iter().map(error_json).collect::<Vec<_>>(),
    })
}

/// A file that could not be scanned at all, as JSON.
pub fn failure_json(name: &str, error: &PreprocessorError) -> Value {
    json!({
        "name": name,
        "errors": [error_json(error)],
    })
}

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: failed to serialize report: {}", e),
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn print_record(stdout: &mut StandardStream, record: &DirectiveRecord) {
    let _ = stdout.set_color(ColorSpec::new().set_dimmed(true));
    let _ = write!(stdout, "{:>5} ", record.line);
    let _ = stdout.reset();

    let mut spec = ColorSpec::new();
    if record.event.value.is_conditional() {
        spec.set_fg(Some(Color::Yellow));
    } else {
        spec.set_fg(Some(Color::Cyan));
    }
    if !record.active {
        spec.set_dimmed(true);
    }
    let _ = stdout.set_color(&spec);
    let _ = write!(stdout, "{}", record.event.value);
    let _ = stdout.reset();

    if let Some(value) = record.event.value.condition() {
        let color = if value { Color::Green } else { Color::Red };
        let _ = write!(stdout, "  => ");
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)));
        let _ = write!(stdout, "{}", value);
        let _ = stdout.reset();
    }
    let _ = writeln!(stdout);
}

fn print_diagnostic(name: &str, diagnostic: &DirectiveDiagnostic) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let (label, color) = match diagnostic.severity {
        Severity::Error => ("error", Color::Red),
        Severity::Warning => ("warning", Color::Yellow),
    };
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stderr, "{}", label);
    let _ = stderr.reset();
    let _ = writeln!(
        stderr,
        ": {} ({}:{})",
        diagnostic.message, name, diagnostic.line
    );
}

fn error_json(error: &PreprocessorError) -> Value {
    json!({
        "code": error.diagnostic_code(),
        "message": error.message(),
        "span": error.span(),
    })
}
