// Evaluator - strict, bottom-up evaluation of a parsed formula against a catalog.

use crate::catalog::{Catalog, ReturnKind};
use crate::error::{ErrorKind, FormulaError};
use crate::functions::EXPECTED_NUMBER;
use crate::lexer::{tokenize, Token};
use crate::parser::{parse_tokens, BinaryOp, Expr, ExprKind, UnaryOp, DEFAULT_MAX_DEPTH};
use crate::validate::validate_tokens;
use crate::value::Value;

/// Evaluate formula text: validate, parse, then evaluate.
pub fn evaluate(text: &str, catalog: &Catalog) -> Result<Value, FormulaError> {
    evaluate_tokens(&tokenize(text), text.chars().count(), catalog, DEFAULT_MAX_DEPTH)
}

/// Evaluate an already-tokenized formula. Structural problems found by the
/// validator are returned unchanged, before any parsing happens.
pub fn evaluate_tokens(
    tokens: &[Token],
    text_len: usize,
    catalog: &Catalog,
    max_depth: usize,
) -> Result<Value, FormulaError> {
    let result = match validate_tokens(tokens, text_len) {
        Some(err) => Err(err),
        None => parse_tokens(tokens, text_len, max_depth).and_then(|expr| evaluate_expr(&expr, catalog)),
    };

    if let Err(err) = &result {
        log::debug!("formula error: {:?} {}", err.kind, err);
    }
    result
}

/// Evaluate a parsed expression tree.
pub fn evaluate_expr(expr: &Expr, catalog: &Catalog) -> Result<Value, FormulaError> {
    let pos = expr.start();

    match &expr.kind {
        ExprKind::Number(n) => finite(*n, pos).map(Value::Number),
        ExprKind::Text(s) => Ok(Value::Label(s.clone())),
        ExprKind::Field(id) => match catalog.field(id) {
            Some(field) => finite(field.value, pos).map(Value::Number),
            None => Err(FormulaError::new(
                ErrorKind::UnknownField,
                format!("unknown field: {}", id),
                pos,
            )),
        },
        ExprKind::Unary { op, operand } => {
            let n = expect_number(evaluate_expr(operand, catalog)?, operand)?;
            Ok(Value::Number(match op {
                UnaryOp::Neg => -n,
                UnaryOp::Plus => n,
            }))
        }
        ExprKind::Binary { op, left, right } => {
            let l = evaluate_expr(left, catalog)?;
            let r = evaluate_expr(right, catalog)?;
            eval_binary(*op, l, r, left, right, pos)
        }
        ExprKind::Call { name, args } => eval_call(name, args, catalog, pos),
    }
}

fn eval_binary(
    op: BinaryOp,
    l: Value,
    r: Value,
    left: &Expr,
    right: &Expr,
    pos: usize,
) -> Result<Value, FormulaError> {
    // Text may be compared for (in)equality; everything else is numeric
    if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
        if let (Value::Label(a), Value::Label(b)) = (&l, &r) {
            return Ok(Value::from((a == b) == (op == BinaryOp::Eq)));
        }
        if l.is_label() != r.is_label() {
            return Ok(Value::from(op == BinaryOp::NotEq));
        }
    }

    let a = expect_number(l, left)?;
    let b = expect_number(r, right)?;

    let n = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(FormulaError::domain("division by zero", pos));
            }
            a / b
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(FormulaError::domain("division by zero", pos));
            }
            a.powf(b)
        }
        BinaryOp::Lt => return Ok(Value::from(a < b)),
        BinaryOp::Gt => return Ok(Value::from(a > b)),
        BinaryOp::LtEq => return Ok(Value::from(a <= b)),
        BinaryOp::GtEq => return Ok(Value::from(a >= b)),
        BinaryOp::Eq => return Ok(Value::from(a == b)),
        BinaryOp::NotEq => return Ok(Value::from(a != b)),
    };

    finite(n, pos).map(Value::Number)
}

fn eval_call(name: &str, args: &[Expr], catalog: &Catalog, pos: usize) -> Result<Value, FormulaError> {
    // Name and arity are checked before any argument is evaluated
    let spec = catalog.function(name).ok_or_else(|| {
        FormulaError::new(
            ErrorKind::UnknownFunction,
            format!("unknown function: {}", name.to_ascii_uppercase()),
            pos,
        )
    })?;

    if !spec.arity.accepts(args.len()) {
        return Err(FormulaError::new(
            ErrorKind::ArityMismatch,
            format!("{} expects {}, got {}", spec.name, spec.arity.describe(), args.len()),
            pos,
        ));
    }

    let values = args.iter()
        .map(|arg| evaluate_expr(arg, catalog))
        .collect::<Result<Vec<_>, _>>()?;

    let value = (spec.apply)(&values).map_err(|msg| FormulaError::domain(msg, pos))?;

    match value {
        Value::Number(n) => finite(n, pos).map(Value::Number),
        Value::Label(_) if spec.returns == ReturnKind::Number => Err(FormulaError::domain(
            format!("{} produced text where a number was expected", spec.name),
            pos,
        )),
        label => Ok(label),
    }
}

fn expect_number(value: Value, expr: &Expr) -> Result<f64, FormulaError> {
    match value {
        Value::Number(n) => Ok(n),
        Value::Label(_) => Err(FormulaError::domain(EXPECTED_NUMBER, expr.start())),
    }
}

fn finite(n: f64, pos: usize) -> Result<f64, FormulaError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(FormulaError::domain("result is not a finite number", pos))
    }
}
