//! String-context scanning: content runs, escape sequences, `${` markers and
//! closing quotes. Entered whenever the top context frame is a string.

use super::{StringKind, Token, TokenKind};

impl super::Lexer {
    pub(super) fn string_token(&mut self, kind: StringKind) -> Token {
        let (row, column) = (self.row, self.column);
        let c = match self.peek() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, "", row, column),
        };

        match c {
            '"' if kind == StringKind::Double => {
                self.advance();
                self.pop_string();
                Token::new(TokenKind::DoubleQuote, "\"", row, column)
            }
            '"' if self.triple_quote_ahead() => {
                self.advance();
                self.advance();
                self.advance();
                self.pop_string();
                Token::new(TokenKind::TripleQuote, "\"\"\"", row, column)
            }
            '\\' => self.escape_token(row, column),
            '$' => {
                self.advance();
                if self.peek() == Some('{') {
                    self.advance();
                    self.push_embedded();
                    Token::new(TokenKind::EmbeddedValueStart, "${", row, column)
                } else {
                    // A raw dollar must be written as \$.
                    Token::new(TokenKind::Illegal, "$", row, column)
                }
            }
            c if disallowed_in_string(c, kind) => {
                self.advance();
                Token::new(TokenKind::Illegal, c.to_string(), row, column)
            }
            _ => {
                let content = self.content_run(kind);
                Token::new(TokenKind::StringContent, content, row, column)
            }
        }
    }

    /// Consumes a run of plain string content, stopping at anything that
    /// needs its own token: a closing quote, an escape, a `$` or a
    /// disallowed character.
    fn content_run(&mut self, kind: StringKind) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            let stop = match c {
                '\\' | '$' => true,
                '"' => kind == StringKind::Double || self.triple_quote_ahead(),
                c => disallowed_in_string(c, kind),
            };
            if stop {
                break;
            }
            out.push(self.advance());
        }
        out
    }

    /// Consumes a backslash escape. `\u`/`\U` greedily take up to 4/8 hex
    /// digits; whatever was consumed is the token literal, even when cut
    /// short by EOF or a non-hex character.
    fn escape_token(&mut self, row: u32, column: u32) -> Token {
        let mut literal = String::new();
        literal.push(self.advance());
        let next = match self.peek() {
            Some(c) => c,
            None => return Token::new(TokenKind::EscapeSequence, literal, row, column),
        };
        literal.push(self.advance());
        let hex_digits = match next {
            'u' => 4,
            'U' => 8,
            _ => 0,
        };
        for _ in 0..hex_digits {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => literal.push(self.advance()),
                _ => break,
            }
        }
        Token::new(TokenKind::EscapeSequence, literal, row, column)
    }

    fn triple_quote_ahead(&self) -> bool {
        self.peek() == Some('"') && self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"')
    }
}

/// Raw control characters are not allowed inside strings; triple-quoted
/// strings additionally permit newlines and tabs.
fn disallowed_in_string(c: char, kind: StringKind) -> bool {
    if kind == StringKind::Triple && (c == '\n' || c == '\t') {
        return false;
    }
    matches!(c, '\u{0000}'..='\u{001f}' | '\u{007f}'..='\u{009f}')
}

#[cfg(test)]
mod tests {
    use super::super::{tokenize, TokenKind};
    use super::*;

    #[test]
    fn escapes_keep_their_backslash() {
        let tokens = tokenize(r#""a\$b""#);
        assert_eq!(tokens[2].kind, TokenKind::EscapeSequence);
        assert_eq!(tokens[2].literal, "\\$");
    }

    #[test]
    fn short_unicode_escape_is_emitted_as_is() {
        // Only two hex digits available; the token carries what was there.
        let tokens = tokenize(r#""\u00""#);
        assert_eq!(tokens[1].kind, TokenKind::EscapeSequence);
        assert_eq!(tokens[1].literal, "\\u00");
    }

    #[test]
    fn raw_dollar_is_illegal() {
        let tokens = tokenize(r#""cost: $5""#);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Illegal));
    }

    #[test]
    fn control_characters() {
        assert!(disallowed_in_string('\u{0007}', StringKind::Double));
        assert!(disallowed_in_string('\u{009f}', StringKind::Triple));
        assert!(disallowed_in_string('\t', StringKind::Double));
        assert!(!disallowed_in_string('\t', StringKind::Triple));
        assert!(!disallowed_in_string('é', StringKind::Double));
    }
}
