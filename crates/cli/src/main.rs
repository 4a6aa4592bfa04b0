// fieldcalc CLI - evaluate, validate and complete field formulas from the shell

mod exit_codes;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;

use fieldcalc_config::{CatalogFile, ConfigError, Settings};
use fieldcalc_engine::catalog::{FunctionCategory, ReturnKind};
use fieldcalc_engine::{Catalog, Engine, ErrorKind, FormulaError, SuggestionKind, Value};

use exit_codes::{config_exit_code, EXIT_CONFIG, EXIT_FORMULA, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "fcalc")]
#[command(about = "Evaluate and edit field formulas (headless)")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Catalog file (JSON or TOML); overrides the `catalog.path` setting
    #[arg(long, global = true, env = "FIELDCALC_CATALOG", value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula against the catalog's field values
    #[command(after_help = "\
Examples:
  fcalc eval 'revenue - costs'
  fcalc eval 'IF(profit_margin < 0.2, \"Low\", \"Good\")'
  fcalc eval 'MROUND(revenue * tax_rate, 100)' --json
  fcalc eval 'TO_PERCENT(profit_margin)'")]
    Eval {
        /// Formula text
        #[arg(allow_hyphen_values = true)]
        formula: String,

        /// Print a single JSON document instead of the bare value
        #[arg(long)]
        json: bool,
    },

    /// Check bracket balance, strings and characters (no evaluation)
    Check {
        #[arg(allow_hyphen_values = true)]
        formula: String,

        #[arg(long)]
        json: bool,
    },

    /// Autocomplete suggestions for the word at the cursor
    #[command(after_help = "\
Examples:
  fcalc suggest 'rou'
  fcalc suggest 'ROUND(rev' --cursor 9 --json")]
    Suggest {
        #[arg(allow_hyphen_values = true)]
        formula: String,

        /// Cursor offset in characters (default: end of formula)
        #[arg(long)]
        cursor: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Signature help for the function call enclosing the cursor
    Signature {
        #[arg(allow_hyphen_values = true)]
        formula: String,

        #[arg(long)]
        cursor: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Accept a suggestion and print the new formula and cursor
    Complete {
        #[arg(allow_hyphen_values = true)]
        formula: String,

        #[arg(long)]
        cursor: Option<usize>,

        /// Which suggestion to accept (0 = first)
        #[arg(long, default_value_t = 0)]
        index: usize,

        #[arg(long)]
        json: bool,
    },

    /// Everything at once (tokens, error, suggestions, signature, result) as JSON
    Analyze {
        #[arg(allow_hyphen_values = true)]
        formula: String,

        #[arg(long)]
        cursor: Option<usize>,
    },

    /// List the functions the catalog exposes
    Functions {
        #[arg(long)]
        json: bool,
    },

    /// List the catalog's fields and their current values
    Fields {
        #[arg(long)]
        json: bool,
    },

    /// Example formulas for the sample catalog, with their results
    Examples {
        #[arg(long)]
        json: bool,
    },

    /// Write a sample catalog (and settings file) to the config directory
    Init {
        /// Overwrite an existing catalog
        #[arg(long)]
        force: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("FCALC_COMMIT"), ")",
        "\nengine:  fieldcalc-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("FCALC_TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context {
        settings: Settings::load(),
        catalog_override: cli.catalog,
    };

    let result = match cli.command {
        None => {
            // No subcommand = show usage
            eprintln!("Usage: fcalc <command> [options]");
            eprintln!("       fcalc --help for more information");
            Ok(())
        }
        Some(Commands::Eval { formula, json }) => cmd_eval(&ctx, &formula, json),
        Some(Commands::Check { formula, json }) => cmd_check(&ctx, &formula, json),
        Some(Commands::Suggest { formula, cursor, json }) => cmd_suggest(&ctx, &formula, cursor, json),
        Some(Commands::Signature { formula, cursor, json }) => cmd_signature(&ctx, &formula, cursor, json),
        Some(Commands::Complete { formula, cursor, index, json }) => {
            cmd_complete(&ctx, &formula, cursor, index, json)
        }
        Some(Commands::Analyze { formula, cursor }) => cmd_analyze(&ctx, &formula, cursor),
        Some(Commands::Functions { json }) => cmd_functions(&ctx, json),
        Some(Commands::Fields { json }) => cmd_fields(&ctx, json),
        Some(Commands::Examples { json }) => cmd_examples(&ctx, json),
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        Self { code: config_exit_code(&err), message: err.to_string(), hint: None }
    }

    /// Formula error with the formula echoed and a caret under the position.
    pub fn formula(text: &str, err: &FormulaError) -> Self {
        let hint = match err.kind {
            ErrorKind::UnknownField => Some("run `fcalc fields` to list available fields"),
            ErrorKind::UnknownFunction => Some("run `fcalc functions` to list available functions"),
            ErrorKind::NestingTooDeep => Some("raise engine.maxNestingDepth in settings.json"),
            _ => None,
        };
        Self {
            code: EXIT_FORMULA,
            message: format!("{}\n{}", err, caret_block(text, err.position)),
            hint: hint.map(String::from),
        }
    }

    /// Exit code only; the command already reported on stdout (--json).
    pub fn silent(code: u8) -> Self {
        Self { code, message: String::new(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// The formula on one line, a caret under char `position` on the next.
fn caret_block(text: &str, position: usize) -> String {
    format!("  {}\n  {}^", text, " ".repeat(position))
}

// ============================================================================
// Context
// ============================================================================

struct Context {
    settings: Settings,
    catalog_override: Option<PathBuf>,
}

impl Context {
    /// Catalog path and whether the user named it (flag, env or setting).
    fn catalog_path(&self) -> (PathBuf, bool) {
        match &self.catalog_override {
            Some(path) => (path.clone(), true),
            None => (self.settings.catalog_path(), self.settings.catalog_path.is_some()),
        }
    }

    fn load_catalog(&self) -> Result<Catalog, CliError> {
        let (path, explicit) = self.catalog_path();

        if !path.exists() {
            let message = format!("catalog not found: {}", path.display());
            return Err(if explicit {
                CliError::io(message)
            } else {
                CliError { code: EXIT_CONFIG, message, hint: None }
                    .with_hint("run `fcalc init` to create a sample catalog, or pass --catalog")
            });
        }

        CatalogFile::load(&path)
            .and_then(CatalogFile::into_catalog)
            .map_err(CliError::config)
    }

    /// Listing built-ins doesn't need fields; fall back when no catalog exists yet.
    fn load_catalog_or_builtins(&self) -> Result<Catalog, CliError> {
        let (path, explicit) = self.catalog_path();
        if !explicit && !path.exists() {
            log::debug!("no catalog at {}, listing built-ins only", path.display());
            return Catalog::new(Vec::new()).map_err(|e| CliError::config(e.into()));
        }
        self.load_catalog()
    }

    fn engine<'c>(&self, catalog: &'c Catalog) -> Engine<'c> {
        Engine::with_options(catalog, self.settings.engine_options())
    }
}

fn cursor_or_end(formula: &str, cursor: Option<usize>) -> usize {
    cursor.unwrap_or_else(|| formula.chars().count())
}

// ============================================================================
// Output
// ============================================================================

fn emit(line: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", line).map_err(|e| CliError::io(e.to_string()))
}

fn emit_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("failed to serialize output: {}", e)))?;
    emit(&json)
}

#[derive(Serialize)]
struct EvalOutput<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a Value>,
    error: Option<&'a FormulaError>,
}

#[derive(Serialize)]
struct SuggestOutput<'a> {
    word: &'a str,
    start: usize,
    suggestions: &'a [fieldcalc_engine::Suggestion],
}

#[derive(Serialize)]
struct FunctionOutput {
    name: &'static str,
    arity: String,
    category: FunctionCategory,
    returns: ReturnKind,
    description: &'static str,
    example: &'static str,
}

#[derive(Serialize)]
struct ExampleOutput<'a> {
    title: &'static str,
    formula: &'static str,
    value: Option<&'a Value>,
    error: Option<&'a FormulaError>,
}

/// Starter formulas, written against the fields `fcalc init` creates.
const EXAMPLES: &[(&str, &str)] = &[
    ("Basic Calculation", "revenue - costs"),
    ("Profit Analysis", r#"IF(profit_margin < 0.2, "Low", "Good")"#),
    ("Tax Calculation", "MROUND(revenue * tax_rate, 100)"),
    ("Percentage View", "TO_PERCENT(profit_margin)"),
];

fn kind_name(kind: SuggestionKind) -> &'static str {
    match kind {
        SuggestionKind::Function => "function",
        SuggestionKind::Field => "field",
        SuggestionKind::Operator => "operator",
    }
}

// ============================================================================
// eval / check
// ============================================================================

fn cmd_eval(ctx: &Context, formula: &str, json: bool) -> Result<(), CliError> {
    let catalog = ctx.load_catalog()?;
    let result = ctx.engine(&catalog).evaluate(formula);

    match (result, json) {
        (Ok(value), false) => emit(&value.to_string()),
        (Ok(value), true) => emit_json(&EvalOutput { ok: true, value: Some(&value), error: None }),
        (Err(err), false) => Err(CliError::formula(formula, &err)),
        (Err(err), true) => {
            emit_json(&EvalOutput { ok: false, value: None, error: Some(&err) })?;
            Err(CliError::silent(EXIT_FORMULA))
        }
    }
}

fn cmd_check(ctx: &Context, formula: &str, json: bool) -> Result<(), CliError> {
    // Structural checks need no fields, but a broken catalog is still worth reporting
    let catalog = ctx.load_catalog_or_builtins()?;
    let error = ctx.engine(&catalog).validate(formula);

    if json {
        emit_json(&EvalOutput { ok: error.is_none(), value: None, error: error.as_ref() })?;
        return match error {
            Some(_) => Err(CliError::silent(EXIT_FORMULA)),
            None => Ok(()),
        };
    }

    match error {
        Some(err) => Err(CliError::formula(formula, &err)),
        None => emit("ok"),
    }
}

// ============================================================================
// suggest / signature / complete / analyze
// ============================================================================

fn cmd_suggest(ctx: &Context, formula: &str, cursor: Option<usize>, json: bool) -> Result<(), CliError> {
    let catalog = ctx.load_catalog()?;
    let cursor = cursor_or_end(formula, cursor);
    let word = fieldcalc_engine::current_word(formula, cursor);
    let suggestions = ctx.engine(&catalog).suggest(formula, cursor);

    if json {
        return emit_json(&SuggestOutput { word: &word.word, start: word.start, suggestions: &suggestions });
    }

    for s in &suggestions {
        emit(&format!("{}\t{}\t{}\t{}", kind_name(s.kind), s.label, s.insert_text, s.description))?;
    }
    Ok(())
}

fn cmd_signature(ctx: &Context, formula: &str, cursor: Option<usize>, json: bool) -> Result<(), CliError> {
    let catalog = ctx.load_catalog_or_builtins()?;
    let help = ctx.engine(&catalog).signature(formula, cursor_or_end(formula, cursor));

    if json {
        return emit_json(&help);
    }

    // No enclosing call is not an error: print nothing
    match help {
        Some(help) => {
            emit(&help.signature())?;
            emit(&format!("argument: {}", help.active_arg + 1))
        }
        None => Ok(()),
    }
}

fn cmd_complete(
    ctx: &Context,
    formula: &str,
    cursor: Option<usize>,
    index: usize,
    json: bool,
) -> Result<(), CliError> {
    let catalog = ctx.load_catalog()?;
    let cursor = cursor_or_end(formula, cursor).min(formula.chars().count());

    // Nothing to accept leaves the formula as it is
    let insertion = ctx.engine(&catalog)
        .complete(formula, cursor, index)
        .unwrap_or_else(|| fieldcalc_engine::Insertion { text: formula.to_string(), cursor });

    if json {
        return emit_json(&insertion);
    }
    emit(&insertion.text)?;
    emit(&insertion.cursor.to_string())
}

fn cmd_analyze(ctx: &Context, formula: &str, cursor: Option<usize>) -> Result<(), CliError> {
    let catalog = ctx.load_catalog()?;
    let analysis = ctx.engine(&catalog).analyze(formula, cursor_or_end(formula, cursor));
    emit_json(&analysis)
}

// ============================================================================
// functions / fields
// ============================================================================

fn cmd_functions(ctx: &Context, json: bool) -> Result<(), CliError> {
    let catalog = ctx.load_catalog_or_builtins()?;

    if json {
        let functions: Vec<FunctionOutput> = catalog.functions()
            .iter()
            .map(|f| FunctionOutput {
                name: f.name,
                arity: f.arity.describe(),
                category: f.category,
                returns: f.returns,
                description: f.description,
                example: f.example,
            })
            .collect();
        return emit_json(&functions);
    }

    for f in catalog.functions() {
        emit(&format!("{}\t{}\t{}", f.name, f.arity.describe(), f.description))?;
    }
    Ok(())
}

fn cmd_fields(ctx: &Context, json: bool) -> Result<(), CliError> {
    let catalog = ctx.load_catalog()?;

    if json {
        return emit_json(catalog.fields());
    }

    for field in catalog.fields() {
        emit(&format!("{}\t{}\t{}", field.id, field.name, field.value))?;
    }
    Ok(())
}

// ============================================================================
// examples
// ============================================================================

fn cmd_examples(ctx: &Context, json: bool) -> Result<(), CliError> {
    let catalog = ctx.load_catalog_or_builtins()?;
    let engine = ctx.engine(&catalog);
    let results: Vec<_> = EXAMPLES
        .iter()
        .map(|&(title, formula)| (title, formula, engine.evaluate(formula)))
        .collect();

    if json {
        let out: Vec<ExampleOutput> = results
            .iter()
            .map(|(title, formula, result)| ExampleOutput {
                title: *title,
                formula: *formula,
                value: result.as_ref().ok(),
                error: result.as_ref().err(),
            })
            .collect();
        return emit_json(&out);
    }

    // An example that doesn't fit the current catalog is still listed
    for (title, formula, result) in &results {
        let shown = match result {
            Ok(value) => value.to_string(),
            Err(err) => format!("({})", err.message),
        };
        emit(&format!("{}\t{}\t{}", title, formula, shown))?;
    }
    Ok(())
}

// ============================================================================
// init
// ============================================================================

fn cmd_init(ctx: &Context, force: bool) -> Result<(), CliError> {
    let (catalog_path, _) = ctx.catalog_path();

    if catalog_path.exists() && !force {
        return Err(CliError::usage(format!("catalog already exists: {}", catalog_path.display()))
            .with_hint("pass --force to overwrite it"));
    }

    CatalogFile::sample().save(&catalog_path).map_err(CliError::config)?;
    emit(&format!("wrote {}", catalog_path.display()))?;

    // Settings are only created, never overwritten
    let settings_path = Settings::config_path();
    if !settings_path.exists() {
        if let Some(parent) = settings_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CliError::io(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(&settings_path, Settings::default_file_contents())
            .map_err(|e| CliError::io(format!("{}: {}", settings_path.display(), e)))?;
        emit(&format!("wrote {}", settings_path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_block() {
        assert_eq!(caret_block("1 + )", 4), "  1 + )\n      ^");
        assert_eq!(caret_block("ROUND(1", 7), "  ROUND(1\n         ^");
    }

    #[test]
    fn test_formula_error_message() {
        let err = FormulaError::new(ErrorKind::UnknownField, "unknown field: foo", 0);
        let cli = CliError::formula("foo + 1", &err);
        assert_eq!(cli.code, EXIT_FORMULA);
        assert_eq!(cli.message, "unknown field: foo (at 0)\n  foo + 1\n  ^");
        assert!(cli.hint.unwrap().contains("fcalc fields"));
    }

    #[test]
    fn test_cli_parses_hyphen_formula() {
        let cli = Cli::try_parse_from(["fcalc", "eval", "-2 ^ 2"]).unwrap();
        match cli.command {
            Some(Commands::Eval { formula, json }) => {
                assert_eq!(formula, "-2 ^ 2");
                assert!(!json);
            }
            _ => panic!("Expected Eval"),
        }
    }

    #[test]
    fn test_examples_use_sample_fields() {
        let catalog = CatalogFile::sample().into_catalog().unwrap();
        let engine = Engine::new(&catalog);
        for (title, formula) in EXAMPLES {
            assert!(engine.evaluate(formula).is_ok(), "{} failed: {}", title, formula);
        }
        let percent = engine.evaluate("TO_PERCENT(profit_margin)").unwrap();
        assert_eq!(percent, Value::Label("35%".to_string()));
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from(["fcalc", "suggest", "rev", "-vv", "--catalog", "c.toml", "--cursor", "2"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.catalog, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Some(Commands::Suggest { cursor: Some(2), .. })));
    }
}
