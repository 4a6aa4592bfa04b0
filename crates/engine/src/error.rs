// Formula errors - every failure the engine reports is a value, never a panic

use serde::Serialize;

/// What went wrong. The message carries the details; the kind lets callers
/// branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Structural (validator)
    UnexpectedClosingBracket,
    MissingClosingBracket,
    UnterminatedString,
    InvalidCharacter,
    // Grammar (parser)
    SyntaxError,
    NestingTooDeep,
    // Resolution
    UnknownField,
    UnknownFunction,
    ArityMismatch,
    // Evaluation
    DomainError,
}

/// A formula error anchored at a char offset into the original text,
/// so the editor surface can place a caret under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaError {
    pub kind: ErrorKind,
    pub message: String,
    pub position: usize,
}

impl FormulaError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, position: usize) -> Self {
        Self { kind, message: message.into(), position }
    }

    pub fn unexpected_closing_bracket(position: usize) -> Self {
        Self::new(ErrorKind::UnexpectedClosingBracket, "unexpected closing bracket", position)
    }

    pub fn missing_closing_bracket(position: usize) -> Self {
        Self::new(ErrorKind::MissingClosingBracket, "missing closing bracket", position)
    }

    pub fn unterminated_string(position: usize) -> Self {
        Self::new(ErrorKind::UnterminatedString, "unterminated string", position)
    }

    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::new(ErrorKind::SyntaxError, message, position)
    }

    pub fn domain(message: impl Into<String>, position: usize) -> Self {
        Self::new(ErrorKind::DomainError, message, position)
    }

    /// True for errors the validator reports (bracket balance, strings, stray chars).
    pub fn is_structural(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::UnexpectedClosingBracket
                | ErrorKind::MissingClosingBracket
                | ErrorKind::UnterminatedString
                | ErrorKind::InvalidCharacter
        )
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at {})", self.message, self.position)
    }
}

impl std::error::Error for FormulaError {}
