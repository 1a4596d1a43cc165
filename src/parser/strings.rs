//! String assembly: splices content runs, decoded escapes and embedded
//! expression results into the final string value.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::errors::{BconfError, BconfResult};
use crate::lexer::TokenKind;
use crate::value::Value;

use super::number;
use super::Parser;

static SIMPLE_ESCAPES: Lazy<HashMap<char, char>> = Lazy::new(|| {
    vec![
        ('"', '"'),
        ('\\', '\\'),
        ('$', '$'),
        ('b', '\u{0008}'),
        ('f', '\u{000c}'),
        ('n', '\n'),
        ('r', '\r'),
        ('t', '\t'),
    ]
    .into_iter()
    .collect()
});

impl Parser {
    /// Parses a string starting at its opening quote token. The lexer has
    /// already split the body into content, escape and `${` tokens; this
    /// alternates over them until the matching closing quote.
    pub(crate) fn parse_string(&mut self) -> BconfResult<String> {
        let open = self.bump();
        debug_assert!(matches!(
            open.kind,
            TokenKind::DoubleQuote | TokenKind::TripleQuote
        ));

        let mut out = String::new();
        loop {
            let token = self.current().clone();
            match token.kind {
                TokenKind::StringContent => {
                    self.bump();
                    out.push_str(&token.literal);
                }
                TokenKind::EscapeSequence => {
                    self.bump();
                    match decode_escape(&token.literal) {
                        Ok(decoded) => out.push(decoded),
                        Err(message) => {
                            return Err(BconfError::parse(token.row, token.column, message))
                        }
                    }
                }
                TokenKind::EmbeddedValueStart => {
                    self.bump();
                    let text = self.parse_embedded_expression()?;
                    out.push_str(&text);
                }
                kind if kind == open.kind => {
                    self.bump();
                    return Ok(out);
                }
                TokenKind::Illegal => {
                    return Err(BconfError::parse(
                        token.row,
                        token.column,
                        format!("illegal character '{}'", token.literal.escape_debug()),
                    ));
                }
                TokenKind::Eof => return Err(self.error_at_current("unterminated string")),
                _ => {
                    return Err(self
                        .error_at_current(format!("unexpected {} in string", token.describe())))
                }
            }
        }
    }

    /// Parses the inside of a `${...}` fragment. The expression must produce
    /// a primitive, which is coerced to text and spliced into the string.
    fn parse_embedded_expression(&mut self) -> BconfResult<String> {
        self.fail_if_illegal()?;
        let token = self.current().clone();
        let value = match token.kind {
            TokenKind::DoubleQuote | TokenKind::TripleQuote => Value::String(self.parse_string()?),
            TokenKind::Null => {
                self.bump();
                Value::Null
            }
            TokenKind::Boolean => {
                self.bump();
                Value::Bool(token.literal == "true")
            }
            TokenKind::Variable => {
                let path = self.parse_key_path()?;
                self.resolve_variable(&path, &token)?
            }
            TokenKind::Identifier if self.tag_follows() => self.parse_tag()?,
            TokenKind::Identifier if number::is_number_candidate(&token.literal) => {
                self.parse_number()?
            }
            _ => {
                return Err(self.error_at_current(format!(
                    "unexpected {} in embedded expression",
                    token.describe()
                )))
            }
        };

        let text = match value.primitive_text() {
            Some(text) => text,
            None => {
                return Err(BconfError::parse(
                    token.row,
                    token.column,
                    format!(
                        "embedded expression must produce a primitive value, got {}",
                        value.type_name()
                    ),
                ))
            }
        };
        self.expect(TokenKind::RBrace)?;
        Ok(text)
    }
}

/// Decodes one escape-sequence token (backslash included) to its character.
fn decode_escape(literal: &str) -> Result<char, String> {
    let mut chars = literal.chars();
    chars.next();
    let selector = match chars.next() {
        Some(c) => c,
        None => return Err("unterminated escape sequence".to_string()),
    };
    match selector {
        'u' | 'U' => {
            let expected = if selector == 'u' { 4 } else { 8 };
            let hex: String = chars.collect();
            if hex.len() != expected || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("invalid unicode escape '{}'", literal));
            }
            let code_point = u32::from_str_radix(&hex, 16)
                .map_err(|_| format!("invalid unicode escape '{}'", literal))?;
            std::char::from_u32(code_point)
                .ok_or_else(|| format!("invalid code point in escape '{}'", literal))
        }
        c => SIMPLE_ESCAPES
            .get(&c)
            .copied()
            .ok_or_else(|| format!("invalid escape sequence '{}'", literal)),
    }
}
