//! Formula lexer
//!
//! Produces char-indexed tokens for every consumer in the engine (validator,
//! suggestions, signature help, parser). Offsets are char indices, not byte
//! offsets, so they map directly onto editor cursor positions.
//!
//! The lexer never fails: malformed input yields `Unknown` tokens or an
//! unterminated string token, and the validator decides what to report.

use std::ops::Range;

use serde::Serialize;

// ============================================================================
// Core Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Operator,
    LParen,
    RParen,
    Comma,
    /// A character outside the formula alphabet (e.g. `#`, `&`)
    Unknown,
}

/// A token with its position in the formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text, including quotes for strings
    pub text: String,
    /// Char index (inclusive)
    pub start: usize,
    /// Char index (exclusive)
    pub end: usize,
    /// String literal with no closing quote
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unterminated: bool,
}

impl Token {
    fn new(kind: TokenKind, chars: &[char], start: usize, end: usize) -> Self {
        Self {
            kind,
            text: chars[start..end].iter().collect(),
            start,
            end,
            unterminated: false,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Contents of a string literal without its quotes.
    pub fn string_contents(&self) -> &str {
        let inner = self.text.strip_prefix('"').unwrap_or(&self.text);
        if self.unterminated {
            inner
        } else {
            inner.strip_suffix('"').unwrap_or(inner)
        }
    }
}

/// The partial word immediately before the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentWord {
    pub word: String,
    /// Char index where the word starts (== cursor when the word is empty)
    pub start: usize,
}

impl CurrentWord {
    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }
}

// ============================================================================
// Character classes
// ============================================================================

/// Letters, digits and underscore make up identifiers and numbers.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Identifier-shaped: word chars only, not starting with a digit.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_word_char(first) && !first.is_numeric() => chars.all(is_word_char),
        _ => false,
    }
}

/// Convert char index to byte offset
pub fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

// ============================================================================
// Tokenizer
// ============================================================================

/// Tokenize a formula. Whitespace is dropped; every other char belongs to
/// exactly one token.
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let start = i;
        let c = chars[i];

        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '+' | '-' | '*' | '/' | '^' => {
                i += 1;
                tokens.push(Token::new(TokenKind::Operator, &chars, start, i));
            }
            '<' | '>' | '=' | '!' => {
                // <= >= == != are single tokens
                i += 1;
                if i < chars.len() && chars[i] == '=' {
                    i += 1;
                }
                tokens.push(Token::new(TokenKind::Operator, &chars, start, i));
            }
            '(' => {
                i += 1;
                tokens.push(Token::new(TokenKind::LParen, &chars, start, i));
            }
            ')' => {
                i += 1;
                tokens.push(Token::new(TokenKind::RParen, &chars, start, i));
            }
            ',' => {
                i += 1;
                tokens.push(Token::new(TokenKind::Comma, &chars, start, i));
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    i += 1;
                }
                let unterminated = i >= chars.len();
                if !unterminated {
                    i += 1; // Include closing quote
                }
                let mut token = Token::new(TokenKind::String, &chars, start, i);
                token.unterminated = unterminated;
                tokens.push(token);
            }
            c if is_word_char(c) || (c == '.' && next_is_digit(&chars, i)) => {
                let (end, kind) = scan_word(&chars, start);
                i = end;
                tokens.push(Token::new(kind, &chars, start, i));
            }
            _ => {
                i += 1;
                tokens.push(Token::new(TokenKind::Unknown, &chars, start, i));
            }
        }
    }

    tokens
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).map_or(false, |c| c.is_ascii_digit())
}

/// Scan a run of word chars. Purely numeric runs (with at most one decimal
/// point followed by digits) are numbers; anything else is an identifier.
fn scan_word(chars: &[char], start: usize) -> (usize, TokenKind) {
    let mut i = start;
    while i < chars.len() && is_word_char(chars[i]) {
        i += 1;
    }

    let all_digits = chars[start..i].iter().all(|c| c.is_ascii_digit());
    if !all_digits {
        return (i, TokenKind::Identifier);
    }

    // Fractional part: "3.5", ".5"
    if i < chars.len() && chars[i] == '.' && next_is_digit(chars, i) {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }

    (i, TokenKind::Number)
}

/// The word being typed at `cursor`: word chars scanned backward from the
/// cursor. Empty when the char before the cursor is a delimiter.
pub fn current_word(text: &str, cursor: usize) -> CurrentWord {
    let chars: Vec<char> = text.chars().collect();
    let cursor = cursor.min(chars.len());
    let mut start = cursor;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }

    CurrentWord {
        word: chars[start..cursor].iter().collect(),
        start,
    }
}

// ============================================================================
// Tests
// ============================================================================
