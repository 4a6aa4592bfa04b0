// Catalog - the read-only set of fields, functions and operators a formula can use.
// Built once by the host and passed by reference into every engine call.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::functions::BUILTINS;
use crate::lexer::is_identifier;
use crate::value::Value;

// ============================================================================
// Fields
// ============================================================================

/// A named numeric variable available to formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Identifier used inside formulas (e.g. `profit_margin`)
    pub id: String,
    /// Display name (e.g. `Profit Margin`)
    pub name: String,
    pub value: f64,
}

impl Field {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        Self { id: id.into(), name: name.into(), value }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` = variadic, no upper bound
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    /// Human-readable expectation, e.g. "2 arguments", "at least 1 argument".
    pub fn describe(&self) -> String {
        fn plural(n: usize) -> &'static str {
            if n == 1 { "argument" } else { "arguments" }
        }
        match self.max {
            Some(max) if max == self.min => format!("{} {}", max, plural(max)),
            Some(max) => format!("{} to {} arguments", self.min, max),
            None => format!("at least {} {}", self.min, plural(self.min)),
        }
    }
}

/// Whether a function may produce a label instead of a number.
/// Declared here so the evaluator never has to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    Number,
    NumberOrLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCategory {
    Math,
    Rounding,
    Statistical,
    Logical,
    Format,
}

/// Built-in implementation. Arguments are fully evaluated; the error string
/// becomes a domain error positioned at the call.
pub type FunctionImpl = fn(args: &[Value]) -> Result<Value, String>;

/// A built-in function and its documentation.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub description: &'static str,
    pub example: &'static str,
    pub category: FunctionCategory,
    pub returns: ReturnKind,
    pub apply: FunctionImpl,
}

impl FunctionSpec {
    /// Signature tooltip text: name and description, then an example line.
    pub fn signature(&self) -> String {
        format!("{}: {}\nExample: {}", self.name, self.description, self.example)
    }
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub symbol: &'static str,
    pub precedence: u8,
    pub associativity: Associativity,
    /// 1 = unary prefix, 2 = binary infix
    pub arity: u8,
}

/// The operator table the parser implements, highest precedence first.
pub static STANDARD_OPERATORS: &[Operator] = &[
    Operator { symbol: "-", precedence: 5, associativity: Associativity::Right, arity: 1 },
    Operator { symbol: "^", precedence: 4, associativity: Associativity::Right, arity: 2 },
    Operator { symbol: "*", precedence: 3, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: "/", precedence: 3, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: "+", precedence: 2, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: "-", precedence: 2, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: "<", precedence: 1, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: ">", precedence: 1, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: "<=", precedence: 1, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: ">=", precedence: 1, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: "==", precedence: 1, associativity: Associativity::Left, arity: 2 },
    Operator { symbol: "!=", precedence: 1, associativity: Associativity::Left, arity: 2 },
];

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Field id is not identifier-shaped (letters, digits, underscore; no leading digit)
    InvalidFieldId(String),
    DuplicateField(String),
    UnknownFunction(String),
    DuplicateFunction(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::InvalidFieldId(id) => write!(f, "field id is not a valid identifier: {:?}", id),
            CatalogError::DuplicateField(id) => write!(f, "duplicate field id: {}", id),
            CatalogError::UnknownFunction(name) => write!(f, "no built-in function named {}", name),
            CatalogError::DuplicateFunction(name) => write!(f, "function listed twice: {}", name),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Read-only lookup tables. Share by reference; nothing in the engine mutates it.
#[derive(Debug, Clone)]
pub struct Catalog {
    fields: Vec<Field>,
    field_index: FxHashMap<String, usize>,
    functions: Vec<&'static FunctionSpec>,
    function_index: FxHashMap<&'static str, usize>,
    operators: Vec<Operator>,
}

impl Catalog {
    /// Catalog with the given fields, every built-in function and the standard operators.
    pub fn new(fields: Vec<Field>) -> Result<Self, CatalogError> {
        CatalogBuilder::new().fields(fields).build()
    }

    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn functions(&self) -> &[&'static FunctionSpec] {
        &self.functions
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Look up a field by id (case-sensitive, ids are identifiers).
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.field_index.get(id).map(|&i| &self.fields[i])
    }

    /// Look up a function by name (case-insensitive).
    pub fn function(&self, name: &str) -> Option<&'static FunctionSpec> {
        let upper = name.to_ascii_uppercase();
        self.function_index.get(upper.as_str()).map(|&i| self.functions[i])
    }
}

/// Builds a [`Catalog`], validating field ids and function selection.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    fields: Vec<Field>,
    functions: Option<Vec<String>>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Restrict the catalog to these built-ins, in this order.
    /// Without a call, every built-in is available in table order.
    pub fn functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut field_index = FxHashMap::default();
        for (i, field) in self.fields.iter().enumerate() {
            if !is_identifier(&field.id) {
                return Err(CatalogError::InvalidFieldId(field.id.clone()));
            }
            if field_index.insert(field.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateField(field.id.clone()));
            }
        }

        let functions: Vec<&'static FunctionSpec> = match self.functions {
            None => BUILTINS.iter().collect(),
            Some(names) => {
                let mut selected = Vec::with_capacity(names.len());
                for name in names {
                    let upper = name.to_ascii_uppercase();
                    let spec = BUILTINS.iter()
                        .find(|f| f.name == upper)
                        .ok_or_else(|| CatalogError::UnknownFunction(name.clone()))?;
                    if selected.iter().any(|s: &&FunctionSpec| s.name == spec.name) {
                        return Err(CatalogError::DuplicateFunction(spec.name.to_string()));
                    }
                    selected.push(spec);
                }
                selected
            }
        };

        let function_index = functions.iter()
            .enumerate()
            .map(|(i, f)| (f.name, i))
            .collect();

        log::debug!(
            "catalog built: {} fields, {} functions",
            self.fields.len(),
            functions.len()
        );

        Ok(Catalog {
            fields: self.fields,
            field_index,
            functions,
            function_index,
            operators: STANDARD_OPERATORS.to_vec(),
        })
    }
}
