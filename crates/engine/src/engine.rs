// Engine facade - one catalog, one set of options, every editor-facing operation.
// `analyze` tokenizes once and feeds the validator, suggestions, signature help
// and the evaluator from the same token list.

use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::FormulaError;
use crate::eval::evaluate_tokens;
use crate::lexer::{current_word, tokenize, CurrentWord, Token};
use crate::parser::DEFAULT_MAX_DEPTH;
use crate::signature::{signature_help_tokens, SignatureHelp};
use crate::suggest::{insert_suggestion, suggest_word, Insertion, Suggestion};
use crate::validate::validate_tokens;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum nesting of groups, calls and unary/power chains
    pub max_depth: usize,
    /// Cap on suggestions returned; `None` = all matches
    pub max_suggestions: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_suggestions: None,
        }
    }
}

/// Everything the editor surface needs for one keystroke.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    /// First error: structural, then parse/resolution/evaluation
    pub error: Option<FormulaError>,
    pub word: CurrentWord,
    pub suggestions: Vec<Suggestion>,
    pub signature: Option<SignatureHelp>,
    /// Present only when `error` is `None`
    pub result: Option<Value>,
}

/// Formula engine bound to a catalog. Cheap to construct; holds no state
/// between calls, so one engine may serve any number of editors.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'c> {
    catalog: &'c Catalog,
    options: EngineOptions,
}

impl<'c> Engine<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self::with_options(catalog, EngineOptions::default())
    }

    pub fn with_options(catalog: &'c Catalog, options: EngineOptions) -> Self {
        Self { catalog, options }
    }

    pub fn validate(&self, text: &str) -> Option<FormulaError> {
        validate_tokens(&tokenize(text), text.chars().count())
    }

    pub fn evaluate(&self, text: &str) -> Result<Value, FormulaError> {
        evaluate_tokens(&tokenize(text), text.chars().count(), self.catalog, self.options.max_depth)
    }

    pub fn suggest(&self, text: &str, cursor: usize) -> Vec<Suggestion> {
        self.suggest_for(&current_word(text, cursor))
    }

    pub fn signature(&self, text: &str, cursor: usize) -> Option<SignatureHelp> {
        signature_help_tokens(&tokenize(text), cursor, self.catalog)
    }

    /// Accept the `index`-th suggestion for the word at `cursor`.
    pub fn complete(&self, text: &str, cursor: usize, index: usize) -> Option<Insertion> {
        let word = current_word(text, cursor);
        let suggestion = self.suggest_for(&word).into_iter().nth(index)?;
        Some(insert_suggestion(text, word.start, cursor, &suggestion))
    }

    pub fn analyze(&self, text: &str, cursor: usize) -> Analysis {
        let text_len = text.chars().count();
        let tokens = tokenize(text);
        let word = current_word(text, cursor);
        let suggestions = self.suggest_for(&word);
        let signature = signature_help_tokens(&tokens, cursor, self.catalog);

        let (result, error) = match evaluate_tokens(&tokens, text_len, self.catalog, self.options.max_depth) {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        };

        log::trace!(
            "analyze: {} tokens, {} suggestions, error={}",
            tokens.len(),
            suggestions.len(),
            error.is_some()
        );

        Analysis { tokens, error, word, suggestions, signature, result }
    }

    fn suggest_for(&self, word: &CurrentWord) -> Vec<Suggestion> {
        let mut suggestions = suggest_word(&word.word, self.catalog);
        if let Some(max) = self.options.max_suggestions {
            suggestions.truncate(max);
        }
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Field;
    use crate::error::ErrorKind;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Field::new("revenue", "Revenue", 1000.0),
            Field::new("costs", "Costs", 400.0),
        ]).unwrap()
    }

    #[test]
    fn test_analyze_valid() {
        let catalog = catalog();
        let engine = Engine::new(&catalog);
        let a = engine.analyze("ROUND(revenue - costs, 0)", 25);
        assert!(a.error.is_none());
        assert_eq!(a.result, Some(Value::Number(600.0)));
        assert!(a.signature.is_none());
        assert!(a.word.is_empty());
        assert_eq!(a.tokens.len(), 8);
    }

    #[test]
    fn test_analyze_while_typing() {
        let catalog = catalog();
        let engine = Engine::new(&catalog);
        let a = engine.analyze("ROUND(reve", 10);
        assert_eq!(a.error.as_ref().map(|e| e.kind), Some(ErrorKind::MissingClosingBracket));
        assert!(a.result.is_none());
        assert_eq!(a.word.word, "reve");
        assert_eq!(a.word.start, 6);
        assert_eq!(a.suggestions[0].insert_text, "revenue");
        assert_eq!(a.signature.as_ref().map(|s| s.function.name), Some("ROUND"));
    }

    #[test]
    fn test_result_absent_on_evaluation_error() {
        let catalog = catalog();
        let a = Engine::new(&catalog).analyze("revenue / (costs - 400)", 0);
        assert_eq!(a.error.map(|e| e.kind), Some(ErrorKind::DomainError));
        assert!(a.result.is_none());
    }

    #[test]
    fn test_custom_depth() {
        let catalog = catalog();
        let shallow = Engine::with_options(&catalog, EngineOptions { max_depth: 2, ..Default::default() });
        assert_eq!(shallow.evaluate("((1))"), Ok(Value::Number(1.0)));
        assert_eq!(
            shallow.evaluate("(((1)))").map_err(|e| e.kind),
            Err(ErrorKind::NestingTooDeep)
        );
    }

    #[test]
    fn test_max_suggestions() {
        let catalog = catalog();
        let engine = Engine::with_options(&catalog, EngineOptions { max_suggestions: Some(2), ..Default::default() });
        assert_eq!(engine.suggest("r", 1).len(), 2);
        assert!(Engine::new(&catalog).suggest("r", 1).len() > 2);
        assert!(engine.complete("r", 1, 2).is_none());
    }

    #[test]
    fn test_analysis_serializes() {
        let catalog = catalog();
        let a = Engine::new(&catalog).analyze("SUM(1, ", 7);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["signature"]["function"], "SUM");
        assert_eq!(json["signature"]["active_arg"], 1);
        assert_eq!(json["error"]["kind"], "missing_closing_bracket");
        assert!(json["result"].is_null());
        assert_eq!(json["tokens"][0]["kind"], "identifier");
    }

    #[test]
    fn test_engine_shared_across_threads() {
        let catalog = catalog();
        let engine = Engine::new(&catalog);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    assert_eq!(engine.evaluate("revenue - costs"), Ok(Value::Number(600.0)));
                });
            }
        });
    }
}
