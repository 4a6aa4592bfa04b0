pub mod catalog;
pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod signature;
pub mod suggest;
pub mod validate;
pub mod value;

pub use catalog::{Catalog, CatalogBuilder, CatalogError, Field, FunctionSpec, Operator};
pub use engine::{Analysis, Engine, EngineOptions};
pub use error::{ErrorKind, FormulaError};
pub use eval::evaluate;
pub use lexer::{current_word, tokenize, CurrentWord, Token, TokenKind};
pub use signature::{resolve_signature, signature_help, SignatureHelp};
pub use suggest::{complete, insert_suggestion, suggest, Insertion, Suggestion, SuggestionKind};
pub use validate::validate;
pub use value::Value;
