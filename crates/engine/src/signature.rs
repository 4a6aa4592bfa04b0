// Signature help - finds the innermost unclosed function call before the cursor.
//
// Scans tokens backward from the cursor with a depth counter: `)` opens a
// closed span to skip, `(` at depth 0 is an unclosed opener. Working on tokens
// means parens inside string literals never count.

use serde::Serialize;

use crate::catalog::{Catalog, FunctionSpec};
use crate::lexer::{tokenize, Token, TokenKind};

/// Signature help context: the enclosing function and the argument the cursor is in.
#[derive(Debug, Clone)]
pub struct SignatureHelp {
    pub function: &'static FunctionSpec,
    /// Zero-based index of the argument under the cursor
    pub active_arg: usize,
}

impl SignatureHelp {
    pub fn signature(&self) -> String {
        self.function.signature()
    }
}

impl Serialize for SignatureHelp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("SignatureHelp", 3)?;
        state.serialize_field("function", self.function.name)?;
        state.serialize_field("active_arg", &self.active_arg)?;
        state.serialize_field("signature", &self.signature())?;
        state.end()
    }
}

/// Signature text (`NAME: description\nExample: ...`) of the call enclosing the cursor.
pub fn resolve_signature(text: &str, cursor: usize, catalog: &Catalog) -> Option<String> {
    signature_help(text, cursor, catalog).map(|help| help.signature())
}

pub fn signature_help(text: &str, cursor: usize, catalog: &Catalog) -> Option<SignatureHelp> {
    signature_help_tokens(&tokenize(text), cursor, catalog)
}

/// Signature help over an existing token list.
pub fn signature_help_tokens(tokens: &[Token], cursor: usize, catalog: &Catalog) -> Option<SignatureHelp> {
    let before = tokens.iter().take_while(|t| t.start < cursor).count();
    let tokens = &tokens[..before];

    let mut depth = 0usize;
    let mut commas = 0usize;

    for idx in (0..tokens.len()).rev() {
        match tokens[idx].kind {
            TokenKind::RParen => depth += 1,
            TokenKind::LParen if depth > 0 => depth -= 1,
            TokenKind::LParen => {
                match idx.checked_sub(1).map(|i| &tokens[i]) {
                    Some(prev) if prev.kind == TokenKind::Identifier => {
                        let function = catalog.function(&prev.text)?;
                        return Some(SignatureHelp { function, active_arg: commas });
                    }
                    // Bare grouping paren: keep looking outward
                    _ => commas = 0,
                }
            }
            TokenKind::Comma if depth == 0 => commas += 1,
            _ => {}
        }
    }

    None
}
