// Structural validation - bracket balance, unterminated strings, stray characters.
// Reports the first problem only, scanning left to right.

use crate::error::{ErrorKind, FormulaError};
use crate::lexer::{tokenize, Token, TokenKind};

/// Validate a formula's structure.
pub fn validate(text: &str) -> Option<FormulaError> {
    validate_tokens(&tokenize(text), text.chars().count())
}

/// Validate an already-tokenized formula. `text_len` is the char length of
/// the source text; an unclosed bracket is reported there.
pub fn validate_tokens(tokens: &[Token], text_len: usize) -> Option<FormulaError> {
    let mut depth: usize = 0;

    for token in tokens {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                if depth == 0 {
                    return Some(FormulaError::unexpected_closing_bracket(token.start));
                }
                depth -= 1;
            }
            TokenKind::String if token.unterminated => {
                return Some(FormulaError::unterminated_string(token.start));
            }
            TokenKind::Unknown => {
                return Some(FormulaError::new(
                    ErrorKind::InvalidCharacter,
                    format!("invalid character: '{}'", token.text),
                    token.start,
                ));
            }
            _ => {}
        }
    }

    if depth > 0 {
        return Some(FormulaError::missing_closing_bracket(text_len));
    }

    None
}
