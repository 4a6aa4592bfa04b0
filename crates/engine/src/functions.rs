// Built-in functions - the closed set of functions a catalog can expose.
// Each implementation receives fully evaluated arguments; the arity has
// already been checked against the table entry.

use crate::catalog::{Arity, FunctionCategory, FunctionSpec, ReturnKind};
use crate::value::Value;

// ============================================================================
// Function table
// ============================================================================

pub static BUILTINS: &[FunctionSpec] = &[
    // Math
    FunctionSpec {
        name: "ABS",
        arity: Arity::exactly(1),
        description: "Returns the absolute value of a number.",
        example: "ABS(revenue - costs)",
        category: FunctionCategory::Math,
        returns: ReturnKind::Number,
        apply: abs,
    },
    FunctionSpec {
        name: "SQRT",
        arity: Arity::exactly(1),
        description: "Returns the square root of a number.",
        example: "SQRT(revenue)",
        category: FunctionCategory::Math,
        returns: ReturnKind::Number,
        apply: sqrt,
    },
    FunctionSpec {
        name: "POWER",
        arity: Arity::exactly(2),
        description: "Returns a number raised to a power.",
        example: "POWER(1 + tax_rate, 2)",
        category: FunctionCategory::Math,
        returns: ReturnKind::Number,
        apply: power,
    },
    FunctionSpec {
        name: "MOD",
        arity: Arity::exactly(2),
        description: "Returns the remainder after division.",
        example: "MOD(revenue, 7)",
        category: FunctionCategory::Math,
        returns: ReturnKind::Number,
        apply: modulo,
    },
    FunctionSpec {
        name: "EXP",
        arity: Arity::exactly(1),
        description: "Returns e raised to the power of a number.",
        example: "EXP(1)",
        category: FunctionCategory::Math,
        returns: ReturnKind::Number,
        apply: exp,
    },
    FunctionSpec {
        name: "LN",
        arity: Arity::exactly(1),
        description: "Returns the natural logarithm of a positive number.",
        example: "LN(revenue)",
        category: FunctionCategory::Math,
        returns: ReturnKind::Number,
        apply: ln,
    },
    FunctionSpec {
        name: "LOG10",
        arity: Arity::exactly(1),
        description: "Returns the base-10 logarithm of a positive number.",
        example: "LOG10(revenue)",
        category: FunctionCategory::Math,
        returns: ReturnKind::Number,
        apply: log10,
    },
    FunctionSpec {
        name: "CLAMP",
        arity: Arity::exactly(3),
        description: "Limits a number to the range between a lower and an upper bound.",
        example: "CLAMP(profit_margin, 0, 1)",
        category: FunctionCategory::Math,
        returns: ReturnKind::Number,
        apply: clamp,
    },

    // Rounding
    FunctionSpec {
        name: "ROUND",
        arity: Arity::exactly(2),
        description: "Rounds a number to a specified number of digits.",
        example: "ROUND(revenue * tax_rate, 2)",
        category: FunctionCategory::Rounding,
        returns: ReturnKind::Number,
        apply: round,
    },
    FunctionSpec {
        name: "ROUNDUP",
        arity: Arity::exactly(2),
        description: "Rounds a number away from zero to a specified number of digits.",
        example: "ROUNDUP(revenue * tax_rate, 0)",
        category: FunctionCategory::Rounding,
        returns: ReturnKind::Number,
        apply: roundup,
    },
    FunctionSpec {
        name: "ROUNDDOWN",
        arity: Arity::exactly(2),
        description: "Rounds a number toward zero to a specified number of digits.",
        example: "ROUNDDOWN(revenue * tax_rate, 0)",
        category: FunctionCategory::Rounding,
        returns: ReturnKind::Number,
        apply: rounddown,
    },
    FunctionSpec {
        name: "MROUND",
        arity: Arity::exactly(2),
        description: "Rounds a number to the nearest multiple.",
        example: "MROUND(revenue * tax_rate, 100)",
        category: FunctionCategory::Rounding,
        returns: ReturnKind::Number,
        apply: mround,
    },
    FunctionSpec {
        name: "CEILING",
        arity: Arity::exactly(2),
        description: "Rounds a number up to the nearest multiple of significance.",
        example: "CEILING(costs, 50)",
        category: FunctionCategory::Rounding,
        returns: ReturnKind::Number,
        apply: ceiling,
    },
    FunctionSpec {
        name: "FLOOR",
        arity: Arity::exactly(2),
        description: "Rounds a number down to the nearest multiple of significance.",
        example: "FLOOR(costs, 50)",
        category: FunctionCategory::Rounding,
        returns: ReturnKind::Number,
        apply: floor,
    },
    FunctionSpec {
        name: "INT",
        arity: Arity::exactly(1),
        description: "Rounds a number down to the nearest integer.",
        example: "INT(revenue / 3)",
        category: FunctionCategory::Rounding,
        returns: ReturnKind::Number,
        apply: int,
    },

    // Statistical
    FunctionSpec {
        name: "SUM",
        arity: Arity::at_least(1),
        description: "Adds all of its arguments.",
        example: "SUM(revenue, costs)",
        category: FunctionCategory::Statistical,
        returns: ReturnKind::Number,
        apply: sum,
    },
    FunctionSpec {
        name: "AVERAGE",
        arity: Arity::at_least(1),
        description: "Returns the average of its arguments.",
        example: "AVERAGE(revenue, costs)",
        category: FunctionCategory::Statistical,
        returns: ReturnKind::Number,
        apply: average,
    },
    FunctionSpec {
        name: "MIN",
        arity: Arity::at_least(1),
        description: "Returns the smallest of its arguments.",
        example: "MIN(revenue, costs)",
        category: FunctionCategory::Statistical,
        returns: ReturnKind::Number,
        apply: min,
    },
    FunctionSpec {
        name: "MAX",
        arity: Arity::at_least(1),
        description: "Returns the largest of its arguments.",
        example: "MAX(revenue, costs)",
        category: FunctionCategory::Statistical,
        returns: ReturnKind::Number,
        apply: max,
    },

    // Logical
    FunctionSpec {
        name: "IF",
        arity: Arity::between(2, 3),
        description: "Returns one value if a condition is true and another if it is false.",
        example: r#"IF(profit_margin < 0.2, "Low", "Good")"#,
        category: FunctionCategory::Logical,
        returns: ReturnKind::NumberOrLabel,
        apply: if_,
    },
    FunctionSpec {
        name: "AND",
        arity: Arity::at_least(1),
        description: "Returns 1 if every argument is non-zero, otherwise 0.",
        example: "AND(revenue > 0, costs > 0)",
        category: FunctionCategory::Logical,
        returns: ReturnKind::Number,
        apply: and,
    },
    FunctionSpec {
        name: "OR",
        arity: Arity::at_least(1),
        description: "Returns 1 if any argument is non-zero, otherwise 0.",
        example: "OR(revenue > 5000, profit_margin > 0.5)",
        category: FunctionCategory::Logical,
        returns: ReturnKind::Number,
        apply: or,
    },
    FunctionSpec {
        name: "NOT",
        arity: Arity::exactly(1),
        description: "Returns 1 for zero and 0 for any other number.",
        example: "NOT(costs > revenue)",
        category: FunctionCategory::Logical,
        returns: ReturnKind::Number,
        apply: not,
    },
    FunctionSpec {
        name: "CHOOSE",
        arity: Arity::at_least(2),
        description: "Chooses a value from a list based on a 1-based index.",
        example: r#"CHOOSE(2, "Low", "Mid", "High")"#,
        category: FunctionCategory::Logical,
        returns: ReturnKind::NumberOrLabel,
        apply: choose,
    },

    // Format
    FunctionSpec {
        name: "TO_PERCENT",
        arity: Arity::between(1, 2),
        description: "Formats a ratio as a percentage label, with optional decimal places.",
        example: "TO_PERCENT(profit_margin)",
        category: FunctionCategory::Format,
        returns: ReturnKind::NumberOrLabel,
        apply: to_percent,
    },
    FunctionSpec {
        name: "PERCENT_OF",
        arity: Arity::exactly(2),
        description: "Returns the first number as a percentage of the second.",
        example: "PERCENT_OF(costs, revenue)",
        category: FunctionCategory::Format,
        returns: ReturnKind::Number,
        apply: percent_of,
    },
];

// ============================================================================
// Argument helpers
// ============================================================================

pub(crate) const EXPECTED_NUMBER: &str = "expected a number, found text";

fn number(args: &[Value], idx: usize) -> Result<f64, String> {
    match args.get(idx) {
        Some(Value::Number(n)) => Ok(*n),
        Some(Value::Label(_)) => Err(EXPECTED_NUMBER.to_string()),
        None => Err(format!("missing argument {}", idx + 1)),
    }
}

fn numbers(args: &[Value]) -> Result<Vec<f64>, String> {
    (0..args.len()).map(|i| number(args, i)).collect()
}

/// Digit count for ROUND-style functions: truncated toward zero.
fn digits(args: &[Value], idx: usize) -> Result<i32, String> {
    let d = number(args, idx)?;
    if d.abs() > 15.0 {
        return Err("number of digits must be between -15 and 15".to_string());
    }
    Ok(d.trunc() as i32)
}

fn round_with(n: f64, digits: i32, f: fn(f64) -> f64) -> f64 {
    if digits >= 0 {
        let factor = 10f64.powi(digits);
        f(n * factor) / factor
    } else {
        let factor = 10f64.powi(-digits);
        f(n / factor) * factor
    }
}

// ============================================================================
// Math
// ============================================================================

fn abs(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(number(args, 0)?.abs()))
}

fn sqrt(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    if n < 0.0 {
        return Err("SQRT of a negative number".to_string());
    }
    Ok(Value::Number(n.sqrt()))
}

fn power(args: &[Value]) -> Result<Value, String> {
    let base = number(args, 0)?;
    let exponent = number(args, 1)?;
    if base == 0.0 && exponent < 0.0 {
        return Err("division by zero".to_string());
    }
    Ok(Value::Number(base.powf(exponent)))
}

fn modulo(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    let d = number(args, 1)?;
    if d == 0.0 {
        return Err("division by zero".to_string());
    }
    // Result takes the sign of the divisor
    Ok(Value::Number(n - d * (n / d).floor()))
}

fn exp(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(number(args, 0)?.exp()))
}

fn ln(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    if n <= 0.0 {
        return Err("LN requires a positive number".to_string());
    }
    Ok(Value::Number(n.ln()))
}

fn log10(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    if n <= 0.0 {
        return Err("LOG10 requires a positive number".to_string());
    }
    Ok(Value::Number(n.log10()))
}

fn clamp(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    let lo = number(args, 1)?;
    let hi = number(args, 2)?;
    if lo > hi {
        return Err("CLAMP lower bound is greater than upper bound".to_string());
    }
    Ok(Value::Number(n.max(lo).min(hi)))
}

// ============================================================================
// Rounding
// ============================================================================

fn round(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    Ok(Value::Number(round_with(n, digits(args, 1)?, f64::round)))
}

fn roundup(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    let away = if n >= 0.0 { f64::ceil } else { f64::floor };
    Ok(Value::Number(round_with(n, digits(args, 1)?, away)))
}

fn rounddown(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    Ok(Value::Number(round_with(n, digits(args, 1)?, f64::trunc)))
}

fn mround(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    let multiple = number(args, 1)?;
    if multiple == 0.0 {
        return Ok(Value::Number(0.0));
    }
    if n != 0.0 && (n > 0.0) != (multiple > 0.0) {
        return Err("MROUND number and multiple must have the same sign".to_string());
    }
    Ok(Value::Number((n / multiple).round() * multiple))
}

fn ceiling(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    let significance = number(args, 1)?;
    if significance == 0.0 {
        return Ok(Value::Number(0.0));
    }
    if n > 0.0 && significance < 0.0 {
        return Err("CEILING significance must be positive for a positive number".to_string());
    }
    Ok(Value::Number((n / significance).ceil() * significance))
}

fn floor(args: &[Value]) -> Result<Value, String> {
    let n = number(args, 0)?;
    let significance = number(args, 1)?;
    if significance == 0.0 {
        if n == 0.0 {
            return Ok(Value::Number(0.0));
        }
        return Err("division by zero".to_string());
    }
    if n > 0.0 && significance < 0.0 {
        return Err("FLOOR significance must be positive for a positive number".to_string());
    }
    Ok(Value::Number((n / significance).floor() * significance))
}

fn int(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(number(args, 0)?.floor()))
}

// ============================================================================
// Statistical
// ============================================================================

fn sum(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(numbers(args)?.iter().sum()))
}

fn average(args: &[Value]) -> Result<Value, String> {
    let vals = numbers(args)?;
    if vals.is_empty() {
        return Err("AVERAGE requires at least one value".to_string());
    }
    Ok(Value::Number(vals.iter().sum::<f64>() / vals.len() as f64))
}

fn min(args: &[Value]) -> Result<Value, String> {
    let vals = numbers(args)?;
    Ok(Value::Number(vals.iter().cloned().fold(f64::INFINITY, f64::min)))
}

fn max(args: &[Value]) -> Result<Value, String> {
    let vals = numbers(args)?;
    Ok(Value::Number(vals.iter().cloned().fold(f64::NEG_INFINITY, f64::max)))
}

// ============================================================================
// Logical
// ============================================================================

fn if_(args: &[Value]) -> Result<Value, String> {
    let condition = number(args, 0)?;
    if condition != 0.0 {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(Value::Number(0.0)))
    }
}

fn and(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(numbers(args)?.iter().all(|n| *n != 0.0)))
}

fn or(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(numbers(args)?.iter().any(|n| *n != 0.0)))
}

fn not(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(number(args, 0)? == 0.0))
}

fn choose(args: &[Value]) -> Result<Value, String> {
    let index = number(args, 0)?.trunc();
    let options = &args[1..];
    if index < 1.0 || index > options.len() as f64 {
        return Err(format!("CHOOSE index must be between 1 and {}", options.len()));
    }
    Ok(options[index as usize - 1].clone())
}

// ============================================================================
// Format
// ============================================================================

fn to_percent(args: &[Value]) -> Result<Value, String> {
    let ratio = number(args, 0)?;
    let decimals = if args.len() > 1 { number(args, 1)?.trunc() } else { 0.0 };
    if !(0.0..=10.0).contains(&decimals) {
        return Err("TO_PERCENT decimals must be between 0 and 10".to_string());
    }
    let pct = ratio * 100.0;
    if !pct.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(Value::Label(format!("{:.*}%", decimals as usize, pct)))
}

fn percent_of(args: &[Value]) -> Result<Value, String> {
    let part = number(args, 0)?;
    let whole = number(args, 1)?;
    if whole == 0.0 {
        return Err("division by zero".to_string());
    }
    Ok(Value::Number(part / whole * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[f64]) -> Result<Value, String> {
        let spec = BUILTINS.iter().find(|f| f.name == name).unwrap();
        let args: Vec<Value> = args.iter().map(|n| Value::Number(*n)).collect();
        (spec.apply)(&args)
    }

    fn num(name: &str, args: &[f64]) -> f64 {
        call(name, args).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_rounding() {
        assert_eq!(num("ROUND", &[2.346, 2.0]), 2.35);
        assert_eq!(num("ROUND", &[-2.5, 0.0]), -3.0);
        assert_eq!(num("ROUND", &[1234.0, -2.0]), 1200.0);
        assert_eq!(num("ROUNDUP", &[3.21, 1.0]), 3.3);
        assert_eq!(num("ROUNDUP", &[-3.21, 1.0]), -3.3);
        assert_eq!(num("ROUNDDOWN", &[3.29, 1.0]), 3.2);
        assert_eq!(num("INT", &[-1.5]), -2.0);
    }

    #[test]
    fn test_mround() {
        assert_eq!(num("MROUND", &[210.0, 100.0]), 200.0);
        assert_eq!(num("MROUND", &[250.0, 100.0]), 300.0);
        assert_eq!(num("MROUND", &[-250.0, -100.0]), -300.0);
        assert_eq!(num("MROUND", &[5.0, 0.0]), 0.0);
        assert!(call("MROUND", &[5.0, -2.0]).is_err());
    }

    #[test]
    fn test_ceiling_floor() {
        assert_eq!(num("CEILING", &[401.0, 50.0]), 450.0);
        assert_eq!(num("FLOOR", &[449.0, 50.0]), 400.0);
        assert!(call("CEILING", &[4.0, -1.0]).is_err());
        assert!(call("FLOOR", &[4.0, 0.0]).is_err());
    }

    #[test]
    fn test_domain_errors() {
        assert_eq!(call("SQRT", &[-1.0]).unwrap_err(), "SQRT of a negative number");
        assert!(call("LN", &[0.0]).is_err());
        assert!(call("LOG10", &[-10.0]).is_err());
        assert_eq!(call("MOD", &[1.0, 0.0]).unwrap_err(), "division by zero");
        assert_eq!(call("POWER", &[0.0, -1.0]).unwrap_err(), "division by zero");
        assert_eq!(call("PERCENT_OF", &[1.0, 0.0]).unwrap_err(), "division by zero");
        assert!(call("CLAMP", &[1.0, 5.0, 2.0]).is_err());
    }

    #[test]
    fn test_mod_sign_follows_divisor() {
        assert_eq!(num("MOD", &[-3.0, 2.0]), 1.0);
        assert_eq!(num("MOD", &[3.0, -2.0]), -1.0);
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(num("SUM", &[1.0, 2.0, 3.5]), 6.5);
        assert_eq!(num("AVERAGE", &[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(num("MIN", &[4.0, -1.0, 2.0]), -1.0);
        assert_eq!(num("MAX", &[4.0, -1.0, 2.0]), 4.0);
    }

    #[test]
    fn test_logical() {
        assert_eq!(num("AND", &[1.0, 2.0]), 1.0);
        assert_eq!(num("AND", &[1.0, 0.0]), 0.0);
        assert_eq!(num("OR", &[0.0, 0.0, 3.0]), 1.0);
        assert_eq!(num("NOT", &[0.0]), 1.0);
        assert_eq!(num("IF", &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_if_returns_branch_value() {
        let spec = BUILTINS.iter().find(|f| f.name == "IF").unwrap();
        let args = vec![
            Value::Number(1.0),
            Value::Label("Low".to_string()),
            Value::Label("Good".to_string()),
        ];
        assert_eq!((spec.apply)(&args), Ok(Value::Label("Low".to_string())));
    }

    #[test]
    fn test_choose() {
        assert_eq!(num("CHOOSE", &[2.0, 10.0, 20.0, 30.0]), 20.0);
        assert!(call("CHOOSE", &[0.0, 10.0]).is_err());
        assert!(call("CHOOSE", &[3.0, 10.0, 20.0]).is_err());
    }

    #[test]
    fn test_to_percent() {
        assert_eq!(call("TO_PERCENT", &[0.35]), Ok(Value::Label("35%".to_string())));
        assert_eq!(call("TO_PERCENT", &[0.12346, 2.0]), Ok(Value::Label("12.35%".to_string())));
        assert!(call("TO_PERCENT", &[0.1, 11.0]).is_err());
    }

    #[test]
    fn test_text_argument_rejected() {
        let spec = BUILTINS.iter().find(|f| f.name == "ABS").unwrap();
        let err = (spec.apply)(&[Value::Label("x".to_string())]).unwrap_err();
        assert_eq!(err, EXPECTED_NUMBER);
    }
}
