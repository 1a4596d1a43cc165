//! Numeric classification. Numbers are not tokenized separately: the lexer
//! produces identifiers and the parser decides, by shape, which of them are
//! numbers.

use crate::value::Value;

/// An identifier can only be a number when it starts with a digit or a sign.
pub(crate) fn is_number_candidate(literal: &str) -> bool {
    matches!(
        literal.chars().next(),
        Some(c) if c.is_ascii_digit() || c == '+' || c == '-'
    )
}

/// Converts a complete numeric literal. `force_float` is set when the parser
/// consumed a fraction; an `e`/`E` exponent in the text also promotes to
/// float. Underscores are digit separators and are validated before removal.
pub(crate) fn parse_number_literal(text: &str, force_float: bool) -> Result<Value, String> {
    validate_underscores(text)?;
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let is_float =
        force_float || cleaned.contains('.') || cleaned.contains('e') || cleaned.contains('E');

    if is_float {
        let value: f64 = cleaned
            .parse()
            .map_err(|_| format!("invalid number '{}'", text))?;
        if !value.is_finite() {
            return Err(format!("invalid number '{}': not a finite number", text));
        }
        Ok(Value::Float(value))
    } else {
        let value: i64 = cleaned
            .parse()
            .map_err(|_| format!("invalid number '{}'", text))?;
        Ok(Value::Integer(value))
    }
}

/// The full numeric grammar applied to an arbitrary string, as used by the
/// `number` tag.
pub(crate) fn parse_number_text(text: &str) -> Result<Value, String> {
    if !is_number_candidate(text) {
        return Err(format!("invalid number '{}'", text));
    }
    parse_number_literal(text, false)
}

fn validate_underscores(text: &str) -> Result<(), String> {
    if text.contains("__") {
        return Err(format!(
            "invalid number '{}': consecutive underscores",
            text
        ));
    }
    // An underscore may only sit between digits of one component.
    for component in text.split(|c: char| !(c.is_ascii_digit() || c == '_')) {
        if component.starts_with('_') || component.ends_with('_') {
            return Err(format!(
                "invalid number '{}': leading or trailing underscore",
                text
            ));
        }
    }
    Ok(())
}
