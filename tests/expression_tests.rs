// tests/expression_tests.rs

use cspp::diagnostics::SyntaxErrorKind;
use cspp::expr::MAX_OPERATORS;
use cspp::{
    evaluate, parse_expression, process_line, tokenize_line, BoolExpr, NullSink, PreprocessorError,
    SymbolTable, TokenCursor,
};

// A helper to evaluate an expression the way `#if` would see it.
fn eval_with(expr: &str, symbols: &SymbolTable) -> Result<bool, PreprocessorError> {
    let line = format!("#if {}", expr);
    let tokens = tokenize_line(&line, 0)?;
    let mut cursor = TokenCursor::new(&tokens[2..]);
    let value = evaluate(&mut cursor, symbols)?;
    assert!(cursor.at_line_end(), "expression `{}` left tokens behind", expr);
    Ok(value)
}

fn eval_foo(expr: &str) -> bool {
    eval_with(expr, &SymbolTable::with_baseline(["FOO"])).unwrap()
}

fn parse(expr: &str) -> BoolExpr {
    let line = format!("#if {}", expr);
    let tokens = tokenize_line(&line, 0).unwrap();
    parse_expression(&mut TokenCursor::new(&tokens[2..])).unwrap()
}

// ---
// Literal and symbol semantics
// ---

#[test]
fn test_literals() {
    assert!(eval_foo("true"));
    assert!(!eval_foo("false"));
}

#[test]
fn test_symbol_membership() {
    assert!(eval_foo("FOO"));
    assert!(!eval_foo("BAR"));
    assert!(!eval_foo("foo"));
}

#[test]
fn test_negation() {
    assert!(!eval_foo("!FOO"));
    assert!(eval_foo("!!FOO"));
    assert!(eval_foo("!BAR"));
}

#[test]
fn test_logical_operators() {
    assert!(!eval_foo("FOO && BAR"));
    assert!(eval_foo("FOO || BAR"));
}

#[test]
fn test_boolean_equality() {
    assert!(eval_foo("FOO == true"));
    assert!(eval_foo("BAR != true"));
    assert!(eval_foo("FOO != BAR"));
    assert!(eval_foo("BAR == false"));
}

#[test]
fn test_parentheses() {
    assert!(eval_foo("(FOO || BAR) && !BAR"));
    assert!(!eval_foo("!(FOO || BAR)"));
}

// ---
// Precedence and associativity
// ---

#[test]
fn test_and_binds_tighter_than_or() {
    assert!(eval_foo("FOO || BAR && false"));
    assert_eq!(parse("FOO || BAR && false").to_string(), "FOO || BAR && false");
    assert!(matches!(parse("FOO || BAR && false"), BoolExpr::Or(_, _)));
    assert!(!eval_foo("(FOO || BAR) && false"));
}

#[test]
fn test_equality_binds_tighter_than_and() {
    // BAR && (BAR == false) is false; (BAR && BAR) == false would be true.
    assert!(!eval_foo("BAR && BAR == false"));
    assert!(matches!(parse("BAR && BAR == false"), BoolExpr::And(_, _)));
}

#[test]
fn test_equality_binds_tighter_than_or() {
    // FOO || (FOO == false) is true; (FOO || FOO) == false would be false.
    assert!(eval_foo("FOO || FOO == false"));
}

#[test]
fn test_not_applies_to_operand_only() {
    // (!BAR) && BAR is false; !(BAR && BAR) would be true.
    assert!(!eval_foo("!BAR && BAR"));
    assert!(matches!(parse("!A == B"), BoolExpr::Eq(_, _)));
}

#[test]
fn test_equality_chains_group_left() {
    let BoolExpr::Eq(lhs, rhs) = parse("A != B == C") else {
        panic!("expected == at the root");
    };
    assert!(matches!(*lhs, BoolExpr::Ne(_, _)));
    assert_eq!(*rhs, BoolExpr::Symbol("C".to_string()));
}

#[test]
fn test_parenthesized_forms_are_kept() {
    let expr = parse("!(A)");
    assert_eq!(expr.to_string(), "!(A)");
    assert_eq!(expr.symbols(), vec!["A"]);
}

// ---
// Malformed expressions
// ---

#[test]
fn test_missing_right_operand() {
    let err = eval_with("FOO &&", &SymbolTable::new()).unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::UnexpectedEndOfLine));
}

#[test]
fn test_unterminated_parenthesis() {
    let err = eval_with("(FOO || BAR", &SymbolTable::new()).unwrap_err();
    assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::UnterminatedExpression));
}

#[test]
fn test_empty_expression() {
    let err = eval_with("", &SymbolTable::new()).unwrap_err();
    assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::UnexpectedEndOfLine));
}

#[test]
fn test_operator_in_operand_position() {
    let err = eval_with("&& FOO", &SymbolTable::new()).unwrap_err();
    assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::UnexpectedToken));
}

#[test]
fn test_single_ampersand_is_invalid_character() {
    let err = eval_with("& FOO", &SymbolTable::new()).unwrap_err();
    assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::InvalidCharacter));
}

#[test]
fn test_undefined_symbols_are_false_not_errors() {
    let empty = SymbolTable::new();
    assert_eq!(eval_with("NOT_DEFINED || ALSO_NOT", &empty).unwrap(), false);
    assert_eq!(eval_with("!NOT_DEFINED", &empty).unwrap(), true);
}

#[test]
fn test_long_operator_chain_is_a_syntax_error() {
    let line = format!("#if A{} || true", " || A".repeat(20_000));
    let err = process_line(&line, 0, &mut SymbolTable::new(), &mut NullSink).unwrap_err();
    assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::NestingTooDeep));
}

#[test]
fn test_operator_chain_at_limit_evaluates() {
    let expr = format!("false{} || FOO", " && A".repeat(MAX_OPERATORS - 1));
    assert!(eval_foo(&expr));
}
