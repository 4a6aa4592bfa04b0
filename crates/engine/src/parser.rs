// Formula parser - recursive descent over lexer tokens into an expression tree.
// Precedence, lowest to highest: comparison, + -, * /, ^ (right-assoc), unary -,
// then primaries (numbers, strings, field refs, calls, parenthesized groups).

use std::ops::Range;

use crate::error::{ErrorKind, FormulaError};
use crate::lexer::{tokenize, Token, TokenKind};

/// Default limit on nested groups, calls and unary/power chains.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Upper bound on formula size; keeps the tree (and evaluation recursion) bounded.
pub const MAX_TOKENS: usize = 2048;

/// Expression tree node with its source span (char indices).
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    /// String literal (quotes stripped)
    Text(String),
    /// Field reference by id
    Field(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    // Comparison
    Lt,      // <
    Gt,      // >
    LtEq,    // <=
    GtEq,    // >=
    Eq,      // == or =
    NotEq,   // !=
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
        }
    }
}

impl Expr {
    fn new(kind: ExprKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    pub fn start(&self) -> usize {
        self.span.start
    }
}

/// Parse formula text with the default depth limit.
pub fn parse(text: &str) -> Result<Expr, FormulaError> {
    parse_tokens(&tokenize(text), text.chars().count(), DEFAULT_MAX_DEPTH)
}

/// Parse an already-tokenized formula. `text_len` (chars) anchors
/// "unexpected end" errors.
pub fn parse_tokens(tokens: &[Token], text_len: usize, max_depth: usize) -> Result<Expr, FormulaError> {
    if tokens.is_empty() {
        return Err(FormulaError::syntax("empty formula", 0));
    }
    if tokens.len() > MAX_TOKENS {
        return Err(FormulaError::syntax(
            format!("formula is too long (more than {} tokens)", MAX_TOKENS),
            tokens[MAX_TOKENS].start,
        ));
    }

    let mut parser = Parser { tokens, pos: 0, depth: 0, max_depth, text_len };
    let expr = parser.parse_comparison()?;

    if let Some(token) = parser.peek() {
        return Err(unexpected(token));
    }
    Ok(expr)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
    text_len: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_operator(&self) -> Option<&'t str> {
        self.peek()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
    }

    fn end_of_input(&self) -> FormulaError {
        FormulaError::syntax("unexpected end of formula", self.text_len)
    }

    /// Run `f` one nesting level deeper, failing once the limit is crossed.
    fn nested<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T, FormulaError>,
    ) -> Result<T, FormulaError> {
        if self.depth >= self.max_depth {
            return Err(FormulaError::new(
                ErrorKind::NestingTooDeep,
                format!("formula is nested too deeply (more than {} levels)", self.max_depth),
                position,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // Lowest precedence: comparison operators
    fn parse_comparison(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_add_sub()?;

        while let Some(symbol) = self.peek_operator() {
            let op = match symbol {
                "<" => BinaryOp::Lt,
                ">" => BinaryOp::Gt,
                "<=" => BinaryOp::LtEq,
                ">=" => BinaryOp::GtEq,
                "==" | "=" => BinaryOp::Eq,
                "!=" => BinaryOp::NotEq,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_add_sub()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_add_sub(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_mul_div()?;

        while let Some(symbol) = self.peek_operator() {
            let op = match symbol {
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul_div()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_mul_div(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_power()?;

        while let Some(symbol) = self.peek_operator() {
            let op = match symbol {
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    // Exponentiation (^) - right-associative: recurse into parse_power for the exponent
    fn parse_power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.parse_unary()?;

        if self.peek_operator() == Some("^") {
            let caret = self.tokens[self.pos].start;
            self.pos += 1;
            let exponent = self.nested(caret, |p| p.parse_power())?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }

        Ok(base)
    }

    // Unary prefix binds tighter than ^, so -2^2 is (-2)^2
    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        let op = match self.peek_operator() {
            Some("-") => UnaryOp::Neg,
            Some("+") => UnaryOp::Plus,
            _ => return self.parse_primary(),
        };
        let start = self.tokens[self.pos].start;
        self.pos += 1;
        let operand = self.nested(start, |p| p.parse_unary())?;
        let span = start..operand.span.end;
        Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, span))
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        let token = match self.peek() {
            Some(token) => token,
            None => return Err(self.end_of_input()),
        };

        match token.kind {
            TokenKind::Number => {
                let n: f64 = token.text.parse().map_err(|_| {
                    FormulaError::syntax(format!("invalid number '{}'", token.text), token.start)
                })?;
                self.pos += 1;
                Ok(Expr::new(ExprKind::Number(n), token.range()))
            }
            TokenKind::String => {
                self.pos += 1;
                Ok(Expr::new(ExprKind::Text(token.string_contents().to_string()), token.range()))
            }
            TokenKind::Identifier => {
                self.pos += 1;
                if self.peek_kind() == Some(TokenKind::LParen) {
                    let open = self.tokens[self.pos].start;
                    self.pos += 1;
                    let (args, end) = self.nested(open, |p| p.parse_function_args())?;
                    return Ok(Expr::new(
                        ExprKind::Call { name: token.text.clone(), args },
                        token.start..end,
                    ));
                }
                Ok(Expr::new(ExprKind::Field(token.text.clone()), token.range()))
            }
            TokenKind::LParen => {
                self.pos += 1;
                if self.peek_kind() == Some(TokenKind::RParen) {
                    return Err(FormulaError::syntax("empty parentheses", token.start));
                }
                let inner = self.nested(token.start, |p| p.parse_comparison())?;
                match self.peek() {
                    Some(t) if t.kind == TokenKind::RParen => {
                        self.pos += 1;
                        // Keep the inner node but widen its span to the brackets
                        Ok(Expr::new(inner.kind, token.start..t.end))
                    }
                    Some(t) => Err(FormulaError::syntax(
                        format!("expected ')' but found '{}'", t.text),
                        t.start,
                    )),
                    None => Err(self.end_of_input()),
                }
            }
            _ => Err(unexpected(token)),
        }
    }

    /// Arguments after the opening paren. Returns the args and the end offset
    /// of the closing paren.
    fn parse_function_args(&mut self) -> Result<(Vec<Expr>, usize), FormulaError> {
        let mut args = Vec::new();

        // Empty call: NAME()
        if let Some(t) = self.peek() {
            if t.kind == TokenKind::RParen {
                self.pos += 1;
                return Ok((args, t.end));
            }
        }

        loop {
            // Empty argument: `,` or `)` where a value should be
            if let Some(t) = self.peek() {
                if matches!(t.kind, TokenKind::Comma | TokenKind::RParen) {
                    return Err(FormulaError::syntax("missing argument", t.start));
                }
            }

            args.push(self.parse_comparison()?);

            match self.peek() {
                Some(t) if t.kind == TokenKind::RParen => {
                    self.pos += 1;
                    return Ok((args, t.end));
                }
                Some(t) if t.kind == TokenKind::Comma => self.pos += 1,
                Some(t) => {
                    return Err(FormulaError::syntax(
                        format!("expected ',' or ')' but found '{}'", t.text),
                        t.start,
                    ))
                }
                None => return Err(self.end_of_input()),
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.start..right.span.end;
    Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, span)
}

fn unexpected(token: &Token) -> FormulaError {
    let what = match token.kind {
        TokenKind::Identifier => "name",
        TokenKind::Number => "number",
        TokenKind::String => "text",
        TokenKind::Operator => "operator",
        TokenKind::LParen | TokenKind::RParen => "bracket",
        TokenKind::Comma => "comma",
        TokenKind::Unknown => "character",
    };
    FormulaError::syntax(format!("unexpected {} '{}'", what, token.text), token.start)
}
