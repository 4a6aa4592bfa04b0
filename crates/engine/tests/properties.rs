// Property-based tests for the formula engine.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use fieldcalc_engine::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn catalog() -> Catalog {
    Catalog::new(vec![
        Field::new("revenue", "Revenue", 1000.0),
        Field::new("costs", "Costs", 400.0),
        Field::new("profit_margin", "Profit Margin", 0.15),
        Field::new("tax_rate", "Tax Rate", 0.21),
    ])
    .unwrap()
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn regex(pattern: &str) -> BoxedStrategy<String> {
    proptest::string::string_regex(pattern).unwrap().boxed()
}

/// Anything at all, weighted toward formula-ish characters.
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        2 => regex(r##"[a-zA-Z0-9_ ()+\-*/^<>=!,."#&é]{0,40}"##),
        1 => any::<String>(),
    ]
}

/// Balanced brackets, no quotes, no characters outside the formula alphabet.
fn arb_balanced() -> BoxedStrategy<String> {
    regex(r"[a-z0-9_+*/^<>=, -]{0,6}")
        .prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{}{}", a, b)),
                inner.clone().prop_map(|s| format!("({})", s)),
                (regex(r"[A-Z]{1,5}"), inner).prop_map(|(f, s)| format!("{}({})", f, s)),
            ]
        })
        .boxed()
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn tokens_partition_non_whitespace(text in arb_text()) {
        let chars: Vec<char> = text.chars().collect();
        let tokens = tokenize(&text);

        let mut covered = 0;
        for token in &tokens {
            prop_assert!(token.start < token.end, "empty token {:?}", token);
            prop_assert!(token.start >= covered, "overlap at {:?}", token);
            prop_assert!(token.end <= chars.len());
            // Gaps between tokens are whitespace only
            for c in &chars[covered..token.start] {
                prop_assert!(c.is_whitespace(), "char {:?} outside any token", c);
            }
            let slice: String = chars[token.start..token.end].iter().collect();
            prop_assert_eq!(&slice, &token.text);
            covered = token.end;
        }
        for c in &chars[covered..] {
            prop_assert!(c.is_whitespace(), "trailing char {:?} outside any token", c);
        }
    }
}

// ---------------------------------------------------------------------------
// Totality
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn engine_never_panics(text in arb_text(), cursor in 0usize..64) {
        let catalog = catalog();
        let _ = validate(&text);
        let _ = evaluate(&text, &catalog);
        let _ = suggest(&text, cursor, &catalog);
        let _ = resolve_signature(&text, cursor, &catalog);
        let _ = complete(&text, cursor, &catalog, 0);

        let analysis = Engine::new(&catalog).analyze(&text, cursor);
        // No result is shown while an error is present
        prop_assert!(analysis.error.is_none() != analysis.result.is_none());
    }

    #[test]
    fn evaluation_is_deterministic(text in arb_balanced()) {
        let catalog = catalog();
        prop_assert_eq!(evaluate(&text, &catalog), evaluate(&text, &catalog));
    }

    #[test]
    fn numeric_results_are_finite(text in arb_balanced()) {
        if let Ok(Value::Number(n)) = evaluate(&text, &catalog()) {
            prop_assert!(n.is_finite());
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn balanced_text_validates(text in arb_balanced()) {
        prop_assert_eq!(validate(&text), None);
    }

    #[test]
    fn first_unmatched_closing_bracket_reported(
        prefix in arb_balanced(),
        rest in arb_text(),
    ) {
        let text = format!("{}){}", prefix, rest);
        let err = validate(&text).unwrap();
        prop_assert_eq!(err.kind, ErrorKind::UnexpectedClosingBracket);
        prop_assert_eq!(err.position, prefix.chars().count());
    }

    #[test]
    fn unclosed_brackets_reported_at_end(
        a in arb_balanced(),
        b in arb_balanced(),
        n in 1usize..10,
    ) {
        let text = format!("{}{}{}", a, "(".repeat(n), b);
        let err = validate(&text).unwrap();
        prop_assert_eq!(err.kind, ErrorKind::MissingClosingBracket);
        prop_assert_eq!(err.position, text.chars().count());
    }
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn no_completion_after_delimiter(
        text in regex(r"[a-z0-9 ]{0,10}"),
        delim in regex(r"[ ()+*/,-]"),
        index in 0usize..5,
    ) {
        let text = format!("{}{}", text, delim);
        let cursor = text.chars().count();
        prop_assert!(suggest(&text, cursor, &catalog()).is_empty());
        prop_assert_eq!(complete(&text, cursor, &catalog(), index), None);
    }

    #[test]
    fn suggestions_are_stable(text in arb_text(), cursor in 0usize..64) {
        let catalog = catalog();
        prop_assert_eq!(suggest(&text, cursor, &catalog), suggest(&text, cursor, &catalog));
    }

    #[test]
    fn insertion_lands_cursor_after_insert(
        text in regex(r"[a-z +]{0,12}"),
        index in 0usize..3,
    ) {
        let catalog = catalog();
        let cursor = text.chars().count();
        if let Some(ins) = complete(&text, cursor, &catalog, index) {
            let word = current_word(&text, cursor);
            let inserted = &suggest(&text, cursor, &catalog)[index].insert_text;
            prop_assert_eq!(ins.cursor, word.start + inserted.chars().count());
            prop_assert!(ins.text.ends_with(inserted.as_str()));
        }
    }

    #[test]
    fn completing_twice_is_a_no_op(
        text in regex(r"[a-z +]{0,12}"),
        prefix in regex(r"[A-Z]{1,3}"),
    ) {
        let catalog = catalog();
        let text = format!("{}{}", text, prefix);
        let cursor = text.chars().count();

        let Some(index) = suggest(&text, cursor, &catalog)
            .iter()
            .position(|s| s.kind == SuggestionKind::Function)
        else {
            return Ok(());
        };
        let ins = complete(&text, cursor, &catalog, index).unwrap();

        // A function insert ends at its closing bracket, so nothing is left to complete
        prop_assert!(current_word(&ins.text, ins.cursor).is_empty());
        prop_assert!(suggest(&ins.text, ins.cursor, &catalog).is_empty());
        for i in 0..3 {
            prop_assert_eq!(complete(&ins.text, ins.cursor, &catalog, i), None);
        }
    }
}

// ---------------------------------------------------------------------------
// Known results
// ---------------------------------------------------------------------------

#[test]
fn known_results() {
    let catalog = catalog();
    let eval = |text: &str| evaluate(text, &catalog);

    assert_eq!(eval("2 + 3 * 4"), Ok(Value::Number(14.0)));
    assert_eq!(eval("(2 + 3) * 4"), Ok(Value::Number(20.0)));
    assert_eq!(eval("revenue - costs"), Ok(Value::Number(600.0)));

    let err = eval("foo + 1").unwrap_err();
    assert_eq!((err.kind, err.position), (ErrorKind::UnknownField, 0));

    let err = eval("1 / 0").unwrap_err();
    assert_eq!(err.kind, ErrorKind::DomainError);

    let names: Vec<_> = suggest("ou", 2, &catalog)
        .into_iter()
        .filter(|s| s.kind == SuggestionKind::Function)
        .map(|s| s.label)
        .collect();
    assert!(names.contains(&"ROUND".to_string()));

    let sig = resolve_signature("MAX(1, MIN(2,", 13, &catalog).unwrap();
    assert!(sig.starts_with("MIN: "), "{}", sig);
}
