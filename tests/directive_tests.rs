// tests/directive_tests.rs
//
// One directive line in, one event out: keyword routing, tails, symbol-table
// effects and the grammar errors a malformed line produces.

use cspp::diagnostics::SyntaxErrorKind;
use cspp::{
    process_line, Directive, DirectiveEvent, LineKind, NullSink, PreprocessorError, Span,
    SymbolTable,
};

fn dispatch_one(line: &str, symbols: &mut SymbolTable) -> Result<Directive, PreprocessorError> {
    let mut events: Vec<DirectiveEvent> = Vec::new();
    let result = process_line(line, 0, symbols, &mut events);
    match &result {
        Ok(event) => {
            assert_eq!(events.len(), 1, "exactly one event per directive");
            assert_eq!(&events[0], event);
        }
        Err(_) => assert!(events.is_empty(), "no event for a failed line"),
    }
    result.map(|e| e.value)
}

fn syntax_kind(line: &str) -> SyntaxErrorKind {
    let err = dispatch_one(line, &mut SymbolTable::new()).unwrap_err();
    err.syntax_kind()
        .unwrap_or_else(|| panic!("expected a syntax error for {:?}, got {}", line, err))
}

// ---
// Symbol directives
// ---

#[test]
fn test_define_updates_table() {
    let mut symbols = SymbolTable::new();
    let directive = dispatch_one("#define DEBUG", &mut symbols).unwrap();
    assert_eq!(directive, Directive::Define("DEBUG".to_string()));
    assert!(symbols.is_defined("DEBUG"));
}

#[test]
fn test_undef_updates_table() {
    let mut symbols = SymbolTable::with_baseline(["DEBUG"]);
    let directive = dispatch_one("#undef DEBUG", &mut symbols).unwrap();
    assert_eq!(directive, Directive::Undef("DEBUG".to_string()));
    assert!(!symbols.is_defined("DEBUG"));
}

#[test]
fn test_define_then_if_sees_symbol() {
    let mut symbols = SymbolTable::new();
    dispatch_one("#define FEATURE_X", &mut symbols).unwrap();
    let directive = dispatch_one("#if FEATURE_X", &mut symbols).unwrap();
    assert_eq!(directive.condition(), Some(true));
}

#[test]
fn test_define_requires_a_name() {
    assert_eq!(syntax_kind("#define"), SyntaxErrorKind::UnexpectedEndOfLine);
    assert_eq!(syntax_kind("#undef 42"), SyntaxErrorKind::UnexpectedToken);
}

// ---
// Conditional directives
// ---

#[test]
fn test_if_and_elif_carry_values() {
    let mut symbols = SymbolTable::with_baseline(["FOO"]);
    let first = dispatch_one("#if FOO", &mut symbols).unwrap();
    let second = dispatch_one("#elif BAR", &mut symbols).unwrap();
    assert!(matches!(&first, Directive::If(c) if c.value));
    assert!(matches!(&second, Directive::Elif(c) if !c.value));
}

#[test]
fn test_elif_negation_of_defined_symbol() {
    let mut symbols = SymbolTable::with_baseline(["DEBUG"]);
    let directive = dispatch_one("#elif !DEBUG", &mut symbols).unwrap();
    assert!(matches!(&directive, Directive::Elif(c) if !c.value));
    assert_eq!(directive.to_string(), "#elif !DEBUG");
}

#[test]
fn test_elif_is_reported_even_after_taken_branch() {
    // Which branch is live is the host's business; the event still reports
    // the raw condition.
    let mut symbols = SymbolTable::with_baseline(["A", "B"]);
    dispatch_one("#if A", &mut symbols).unwrap();
    let elif = dispatch_one("#elif B", &mut symbols).unwrap();
    assert_eq!(elif.condition(), Some(true));
}

#[test]
fn test_else_and_endif() {
    let mut symbols = SymbolTable::new();
    assert_eq!(dispatch_one("#else", &mut symbols).unwrap(), Directive::Else);
    assert_eq!(dispatch_one("#endif", &mut symbols).unwrap(), Directive::Endif);
}

#[test]
fn test_incomplete_condition() {
    assert_eq!(syntax_kind("#if FOO &&"), SyntaxErrorKind::UnexpectedEndOfLine);
    assert_eq!(syntax_kind("#if"), SyntaxErrorKind::UnexpectedEndOfLine);
    assert_eq!(syntax_kind("#elif (A"), SyntaxErrorKind::UnterminatedExpression);
}

#[test]
fn test_trailing_tokens_after_expression() {
    assert_eq!(syntax_kind("#if A B"), SyntaxErrorKind::TrailingTokens);
    assert_eq!(syntax_kind("#endif garbage"), SyntaxErrorKind::TrailingTokens);
    assert_eq!(syntax_kind("#else if"), SyntaxErrorKind::TrailingTokens);
}

// ---
// #line
// ---

#[test]
fn test_line_forms() {
    let mut symbols = SymbolTable::new();
    assert_eq!(
        dispatch_one("#line 200", &mut symbols).unwrap(),
        Directive::Line(LineKind::Digits {
            line: 200,
            file: None
        })
    );
    assert_eq!(
        dispatch_one("#line 7 \"Generated.cs\"", &mut symbols).unwrap(),
        Directive::Line(LineKind::Digits {
            line: 7,
            file: Some("Generated.cs".to_string())
        })
    );
    assert_eq!(
        dispatch_one("#line default", &mut symbols).unwrap(),
        Directive::Line(LineKind::Default)
    );
    assert_eq!(
        dispatch_one("#line hidden", &mut symbols).unwrap(),
        Directive::Line(LineKind::Hidden)
    );
}

#[test]
fn test_line_rejects_other_tails() {
    assert_eq!(syntax_kind("#line"), SyntaxErrorKind::UnexpectedEndOfLine);
    assert_eq!(syntax_kind("#line FOO"), SyntaxErrorKind::UnexpectedToken);
    assert_eq!(syntax_kind("#line 0"), SyntaxErrorKind::InvalidLineNumber);
    assert_eq!(syntax_kind("#line 3 \"a.cs\" extra"), SyntaxErrorKind::TrailingTokens);
}

// ---
// Free-text directives
// ---

#[test]
fn test_region_labels() {
    let mut symbols = SymbolTable::new();
    assert_eq!(
        dispatch_one("#region Helpers", &mut symbols).unwrap(),
        Directive::Region(Some("Helpers".to_string()))
    );
    assert_eq!(
        dispatch_one("#endregion", &mut symbols).unwrap(),
        Directive::Endregion(None)
    );
    assert_eq!(
        dispatch_one("#region", &mut symbols).unwrap(),
        Directive::Region(None)
    );
}

#[test]
fn test_quoted_region_label() {
    assert_eq!(
        dispatch_one("#region \"label text\"", &mut SymbolTable::new()).unwrap(),
        Directive::Region(Some("\"label text\"".to_string()))
    );
}

#[test]
fn test_text_needs_no_separator() {
    let mut symbols = SymbolTable::new();
    assert_eq!(
        dispatch_one("#error: bad", &mut symbols).unwrap(),
        Directive::Error(": bad".to_string())
    );
    assert_eq!(
        dispatch_one("#endregion// x", &mut symbols).unwrap(),
        Directive::Endregion(Some("// x".to_string()))
    );
    assert_eq!(
        dispatch_one("#region---", &mut symbols).unwrap(),
        Directive::Region(Some("---".to_string()))
    );
}

#[test]
fn test_keyword_prefix_is_not_a_text_directive() {
    assert_eq!(syntax_kind("#errors here"), SyntaxErrorKind::UnknownDirective);
}

#[test]
fn test_text_is_kept_verbatim() {
    let mut symbols = SymbolTable::new();
    assert_eq!(
        dispatch_one("#error Build \"broken\" && (really)", &mut symbols).unwrap(),
        Directive::Error("Build \"broken\" && (really)".to_string())
    );
    assert_eq!(
        dispatch_one("#warning // not a comment here", &mut symbols).unwrap(),
        Directive::Warning("// not a comment here".to_string())
    );
}

#[test]
fn test_pragma_and_nullable() {
    let mut symbols = SymbolTable::new();
    assert_eq!(
        dispatch_one("#pragma warning disable CS0168", &mut symbols).unwrap(),
        Directive::Pragma("warning disable CS0168".to_string())
    );
    assert_eq!(
        dispatch_one("#nullable enable", &mut symbols).unwrap(),
        Directive::Nullable("enable".to_string())
    );
}

#[test]
fn test_text_directives_need_text() {
    assert_eq!(syntax_kind("#error"), SyntaxErrorKind::UnexpectedEndOfLine);
    assert_eq!(syntax_kind("#pragma"), SyntaxErrorKind::UnexpectedEndOfLine);
}

// ---
// Routing and spans
// ---

#[test]
fn test_unknown_directive() {
    assert_eq!(syntax_kind("#foo bar"), SyntaxErrorKind::UnknownDirective);
}

#[test]
fn test_line_must_start_with_sharp() {
    assert_eq!(syntax_kind("define X"), SyntaxErrorKind::UnexpectedToken);
}

#[test]
fn test_comment_after_directive_is_ignored() {
    let mut symbols = SymbolTable::new();
    let directive = dispatch_one("#endif // FEATURE", &mut symbols).unwrap();
    assert_eq!(directive, Directive::Endif);
}

#[test]
fn test_whitespace_around_sharp() {
    let mut symbols = SymbolTable::new();
    let event = process_line("   #  define   X  \r\n", 100, &mut symbols, &mut NullSink).unwrap();
    assert_eq!(event.value, Directive::Define("X".to_string()));
    assert_eq!(event.span, Span::new(103, 116));
}

#[test]
fn test_error_span_is_offset() {
    let err = dispatch_one("#if A ||", &mut SymbolTable::new()).unwrap_err();
    let span = err.span().expect("syntax errors carry a span");
    assert_eq!(span.start, 8);

    let err = process_line("#if A ||", 50, &mut SymbolTable::new(), &mut NullSink).unwrap_err();
    assert_eq!(err.span().map(|s| s.start), Some(58));
}
