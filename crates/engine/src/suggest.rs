//! Autocomplete suggestions and suggestion insertion
//!
//! Suggestions match the word being typed at the cursor as a case-insensitive
//! substring, so `ou` finds `ROUND`. Results are grouped functions, then
//! fields, then operators, each in catalog order. The list is stable for a
//! given (text, cursor, catalog), so a caller's highlighted index stays
//! meaningful between keystrokes that don't change the word.

use serde::Serialize;

use crate::catalog::Catalog;
use crate::lexer::{char_to_byte, current_word};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Function,
    Field,
    Operator,
}

/// An autocomplete entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub label: String,
    /// Text that replaces the current word when accepted
    pub insert_text: String,
    pub kind: SuggestionKind,
    pub description: String,
}

/// Result of accepting a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insertion {
    pub text: String,
    /// Char offset just past the inserted text
    pub cursor: usize,
}

/// Suggestions for the word at `cursor`. Empty when no word is being typed.
pub fn suggest(text: &str, cursor: usize, catalog: &Catalog) -> Vec<Suggestion> {
    suggest_word(&current_word(text, cursor).word, catalog)
}

/// Suggestions for an already-extracted current word.
pub fn suggest_word(word: &str, catalog: &Catalog) -> Vec<Suggestion> {
    if word.is_empty() {
        return Vec::new();
    }

    let needle = word.to_lowercase();
    let matches = |s: &str| s.to_lowercase().contains(&needle);
    let mut suggestions = Vec::new();

    for func in catalog.functions() {
        if matches(func.name) {
            suggestions.push(Suggestion {
                label: func.name.to_string(),
                insert_text: func.example.to_string(),
                kind: SuggestionKind::Function,
                description: func.description.to_string(),
            });
        }
    }

    for field in catalog.fields() {
        if matches(&field.name) || matches(&field.id) {
            suggestions.push(Suggestion {
                label: field.name.clone(),
                insert_text: field.id.clone(),
                kind: SuggestionKind::Field,
                description: format!("Current value: {}", field.value),
            });
        }
    }

    for op in catalog.operators() {
        if matches(op.symbol) {
            suggestions.push(Suggestion {
                label: op.symbol.to_string(),
                insert_text: op.symbol.to_string(),
                kind: SuggestionKind::Operator,
                description: format!("Operator (precedence: {})", op.precedence),
            });
        }
    }

    suggestions
}

/// Replace `text[word_start..cursor]` (char offsets) with the suggestion's
/// insert text. Offsets are clamped to the text; a start past the cursor
/// is treated as an empty range at the cursor.
pub fn insert_suggestion(text: &str, word_start: usize, cursor: usize, suggestion: &Suggestion) -> Insertion {
    let len = text.chars().count();
    let cursor = cursor.min(len);
    let word_start = word_start.min(cursor);

    let mut new_text = String::with_capacity(text.len() + suggestion.insert_text.len());
    new_text.push_str(&text[..char_to_byte(text, word_start)]);
    new_text.push_str(&suggestion.insert_text);
    new_text.push_str(&text[char_to_byte(text, cursor)..]);

    Insertion {
        text: new_text,
        cursor: word_start + suggestion.insert_text.chars().count(),
    }
}

/// Accept the `index`-th suggestion for the word at `cursor`.
/// `None` when no word is being typed or the index is out of range.
pub fn complete(text: &str, cursor: usize, catalog: &Catalog, index: usize) -> Option<Insertion> {
    let word = current_word(text, cursor);
    let suggestion = suggest_word(&word.word, catalog).into_iter().nth(index)?;
    Some(insert_suggestion(text, word.start, cursor, &suggestion))
}
