//! Sandboxed evaluation of user-authored validation expressions.
//!
//! Custom validation rules are short scripts written by form authors,
//! e.g. `valid = input.length > 3 || 'Too short';`. They are untrusted
//! input and are NOT executed by a host scripting engine: this module
//! implements a small expression-statement language (tokenizer,
//! recursive-descent parser, tree-walking evaluator over JSON values)
//! with hard limits on source size, nesting depth, and evaluation steps.
//! Exhausting a limit is a recoverable failure, never a crash or a hang.
//!
//! The sandbox injects the bindings `value`, `data`, `row` (alias of
//! `data`), `component`, and `input` (alias of `value`), and seeds
//! `valid = true` before the script body runs — the script's verdict is
//! whatever `valid` holds afterwards. A string verdict is a failure
//! message; `false` is a failure without a message; anything else is
//! valid. Any failure to lex, parse, or evaluate makes the field
//! **valid** (fail-open): a broken rule must never lock users out of a
//! form.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use form_schema_core::FormComponentSchema;

use crate::value::{coerce_number, loose_eq, number_value, render_string, strict_eq};

/// Maximum allowed script source size in bytes.
const MAX_SOURCE_BYTES: usize = 16 * 1024;
/// Maximum expression nesting depth.
const MAX_NESTING: usize = 64;
/// Maximum number of evaluation steps (the execution budget).
const MAX_STEPS: u64 = 10_000;

/// Failures raised while lexing, parsing, or evaluating a script.
///
/// These never escape [`evaluate_custom`]: the validation engine maps
/// every failure to a valid verdict. They are public for callers using
/// [`evaluate_script`] directly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Script was empty or contained only whitespace.
    #[error("expression is empty")]
    EmptyInput,
    /// Script exceeded the source size limit.
    #[error("expression exceeds {max_bytes} bytes (got {actual_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual source length in bytes.
        actual_bytes: usize,
    },
    /// A character the lexer does not recognize.
    #[error("unexpected character `{found}` at byte {position}")]
    UnexpectedCharacter {
        /// The offending character.
        found: char,
        /// Byte offset in the source.
        position: usize,
    },
    /// A string literal without a closing quote.
    #[error("unterminated string literal starting at byte {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// Parser expectation failure.
    #[error("expected {expected}, found `{found}` at byte {position}")]
    UnexpectedToken {
        /// What the parser was looking for.
        expected: &'static str,
        /// The token actually seen.
        found: String,
        /// Byte offset in the source.
        position: usize,
    },
    /// Expression nests deeper than the limit.
    #[error("expression nests deeper than {max_depth} levels")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
    },
    /// An identifier with no binding in scope.
    #[error("unknown binding `{name}`")]
    UnknownBinding {
        /// The unresolved identifier.
        name: String,
    },
    /// The evaluation step budget ran out (e.g. a pathological script).
    #[error("evaluation exceeded the {max_steps}-step budget")]
    BudgetExhausted {
        /// The configured budget.
        max_steps: u64,
    },
}

/// Verdict of a custom validation expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomVerdict {
    /// The value passed (or the rule itself failed: fail-open).
    Valid,
    /// The value failed, optionally with a script-supplied message.
    Invalid {
        /// Failure message returned by the script, if it returned one.
        message: Option<String>,
    },
}

/// Runs a custom validation expression against a field value.
///
/// # Examples
///
/// ```
/// use form_schema_engine::{evaluate_custom, CustomVerdict};
/// use form_schema_core::FormComponentSchema;
/// use serde_json::{json, Map};
///
/// let component = FormComponentSchema::new("textfield", "name");
/// let data = Map::new();
///
/// let verdict = evaluate_custom("valid = value == 'x';", &json!("x"), &data, &component);
/// assert_eq!(verdict, CustomVerdict::Valid);
///
/// let verdict = evaluate_custom("valid = 'Name is taken';", &json!("x"), &data, &component);
/// assert_eq!(
///     verdict,
///     CustomVerdict::Invalid { message: Some("Name is taken".to_string()) }
/// );
///
/// // A broken rule never blocks the user.
/// let verdict = evaluate_custom("valid = nonsense(", &json!("x"), &data, &component);
/// assert_eq!(verdict, CustomVerdict::Valid);
/// ```
pub fn evaluate_custom(
    expression: &str,
    value: &Value,
    data: &Map<String, Value>,
    component: &FormComponentSchema,
) -> CustomVerdict {
    let mut bindings = Map::new();
    bindings.insert("value".to_string(), value.clone());
    bindings.insert("input".to_string(), value.clone());
    bindings.insert("data".to_string(), Value::Object(data.clone()));
    bindings.insert("row".to_string(), Value::Object(data.clone()));
    bindings.insert(
        "component".to_string(),
        serde_json::to_value(component).unwrap_or(Value::Null),
    );

    match evaluate_script(expression, &bindings) {
        Ok(Value::String(message)) => CustomVerdict::Invalid {
            message: Some(message),
        },
        Ok(Value::Bool(false)) => CustomVerdict::Invalid { message: None },
        Ok(_) => CustomVerdict::Valid,
        Err(error) => {
            debug!(error = %error, "custom validation expression failed; treating as valid");
            CustomVerdict::Valid
        }
    }
}

/// Executes a script with the given bindings and returns the final value
/// of `valid` (seeded `true` before the body runs).
///
/// # Errors
///
/// Returns an [`ExprError`] when the script cannot be lexed, parsed, or
/// evaluated within the configured limits.
pub fn evaluate_script(source: &str, bindings: &Map<String, Value>) -> Result<Value, ExprError> {
    if source.trim().is_empty() {
        return Err(ExprError::EmptyInput);
    }
    if source.len() > MAX_SOURCE_BYTES {
        return Err(ExprError::InputTooLarge {
            max_bytes: MAX_SOURCE_BYTES,
            actual_bytes: source.len(),
        });
    }

    let tokens = lex(source)?;
    let program = Parser::new(tokens).parse_program()?;

    let mut scope: Map<String, Value> = bindings.clone();
    scope.insert("valid".to_string(), Value::Bool(true));

    let mut interpreter = Interpreter {
        scope,
        steps: MAX_STEPS,
    };
    for statement in &program {
        interpreter.exec(statement)?;
    }
    Ok(interpreter
        .scope
        .get("valid")
        .cloned()
        .unwrap_or(Value::Bool(true)))
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    BangEq,
    BangEqEq,
    Assign,
    EqEq,
    EqEqEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
    Question,
    Colon,
    Semi,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Str(s) => format!("'{s}'"),
            Token::Ident(name) => name.clone(),
            Token::True => "true".to_string(),
            Token::False => "false".to_string(),
            Token::Null => "null".to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Percent => "%".to_string(),
            Token::Bang => "!".to_string(),
            Token::BangEq => "!=".to_string(),
            Token::BangEqEq => "!==".to_string(),
            Token::Assign => "=".to_string(),
            Token::EqEq => "==".to_string(),
            Token::EqEqEq => "===".to_string(),
            Token::Less => "<".to_string(),
            Token::LessEq => "<=".to_string(),
            Token::Greater => ">".to_string(),
            Token::GreaterEq => ">=".to_string(),
            Token::AndAnd => "&&".to_string(),
            Token::OrOr => "||".to_string(),
            Token::Question => "?".to_string(),
            Token::Colon => ":".to_string(),
            Token::Semi => ";".to_string(),
            Token::Dot => ".".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::LBracket => "[".to_string(),
            Token::RBracket => "]".to_string(),
        }
    }
}

fn lex(source: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '+' => {
                tokens.push((Token::Plus, i));
                i += 1;
            }
            '-' => {
                tokens.push((Token::Minus, i));
                i += 1;
            }
            '*' => {
                tokens.push((Token::Star, i));
                i += 1;
            }
            '/' => {
                tokens.push((Token::Slash, i));
                i += 1;
            }
            '%' => {
                tokens.push((Token::Percent, i));
                i += 1;
            }
            '?' => {
                tokens.push((Token::Question, i));
                i += 1;
            }
            ':' => {
                tokens.push((Token::Colon, i));
                i += 1;
            }
            ';' => {
                tokens.push((Token::Semi, i));
                i += 1;
            }
            '.' => {
                tokens.push((Token::Dot, i));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, i));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, i));
                i += 1;
            }
            '[' => {
                tokens.push((Token::LBracket, i));
                i += 1;
            }
            ']' => {
                tokens.push((Token::RBracket, i));
                i += 1;
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    if bytes.get(i + 2) == Some(&b'=') {
                        tokens.push((Token::BangEqEq, i));
                        i += 3;
                    } else {
                        tokens.push((Token::BangEq, i));
                        i += 2;
                    }
                } else {
                    tokens.push((Token::Bang, i));
                    i += 1;
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    if bytes.get(i + 2) == Some(&b'=') {
                        tokens.push((Token::EqEqEq, i));
                        i += 3;
                    } else {
                        tokens.push((Token::EqEq, i));
                        i += 2;
                    }
                } else {
                    tokens.push((Token::Assign, i));
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::LessEq, i));
                    i += 2;
                } else {
                    tokens.push((Token::Less, i));
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::GreaterEq, i));
                    i += 2;
                } else {
                    tokens.push((Token::Greater, i));
                    i += 1;
                }
            }
            '&' if bytes.get(i + 1) == Some(&b'&') => {
                tokens.push((Token::AndAnd, i));
                i += 2;
            }
            '|' if bytes.get(i + 1) == Some(&b'|') => {
                tokens.push((Token::OrOr, i));
                i += 2;
            }
            '\'' | '"' => {
                let quote = bytes[i];
                let start = i;
                i += 1;
                let mut text = String::new();
                loop {
                    match bytes.get(i) {
                        None => return Err(ExprError::UnterminatedString { position: start }),
                        Some(&b) if b == quote => {
                            i += 1;
                            break;
                        }
                        Some(&b'\\') => match bytes.get(i + 1) {
                            Some(&b'n') => {
                                text.push('\n');
                                i += 2;
                            }
                            Some(&b't') => {
                                text.push('\t');
                                i += 2;
                            }
                            Some(&other) if other.is_ascii() => {
                                text.push(other as char);
                                i += 2;
                            }
                            // Non-ASCII escape: drop the backslash, keep the
                            // character.
                            Some(_) => i += 1,
                            None => {
                                return Err(ExprError::UnterminatedString { position: start });
                            }
                        },
                        Some(&b) => {
                            // Multi-byte characters pass through untouched.
                            let ch_len = utf8_len(b);
                            text.push_str(&source[i..i + ch_len]);
                            i += ch_len;
                        }
                    }
                }
                tokens.push((Token::Str(text), start));
            }
            '0'..='9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if bytes.get(i) == Some(&b'.')
                    && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
                {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let literal = &source[start..i];
                let number = literal.parse().map_err(|_| ExprError::UnexpectedCharacter {
                    found: c,
                    position: start,
                })?;
                tokens.push((Token::Number(number), start));
            }
            _ if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric()
                        || bytes[i] == b'_'
                        || bytes[i] == b'$')
                {
                    i += 1;
                }
                let word = &source[start..i];
                let token = match word {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(word.to_string()),
                };
                tokens.push((token, start));
            }
            _ => {
                return Err(ExprError::UnexpectedCharacter {
                    found: c,
                    position: i,
                });
            }
        }
    }

    Ok(tokens)
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >> 5 == 0b110 => 2,
        b if b >> 4 == 0b1110 => 3,
        _ => 4,
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Not(Box<Expr>),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

#[derive(Debug, Clone)]
enum Stmt {
    Assign { target: String, value: Expr },
    Expr(Expr),
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self {
            tokens,
            cursor: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(token, _)| token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + offset).map(|(token, _)| token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .or_else(|| self.tokens.last())
            .map_or(0, |(_, position)| *position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(token, _)| token.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, label: &'static str) -> Result<(), ExprError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(label))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ExprError {
        ExprError::UnexpectedToken {
            expected,
            found: self
                .peek()
                .map_or_else(|| "end of input".to_string(), Token::describe),
            position: self.position(),
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, ExprError> {
        let mut statements = Vec::new();
        loop {
            while self.eat(&Token::Semi) {}
            if self.peek().is_none() {
                break;
            }
            statements.push(self.parse_stmt()?);
            if self.peek().is_some() {
                self.expect(&Token::Semi, "`;` between statements")?;
            }
        }
        Ok(statements)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ExprError> {
        if let (Some(Token::Ident(_)), Some(Token::Assign)) = (self.peek(), self.peek_at(1)) {
            let target = match self.advance() {
                Some(Token::Ident(name)) => name,
                _ => return Err(self.unexpected("assignment target")),
            };
            self.cursor += 1; // consume `=`
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign { target, value });
        }
        Ok(Stmt::Expr(self.parse_expr()?))
    }

    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExprError::NestingTooDeep {
                max_depth: MAX_NESTING,
            });
        }
        let result = self.parse_ternary();
        self.depth -= 1;
        result
    }

    fn parse_ternary(&mut self) -> Result<Expr, ExprError> {
        let condition = self.parse_or()?;
        if self.eat(&Token::Question) {
            let then = self.parse_expr()?;
            self.expect(&Token::Colon, "`:` in conditional expression")?;
            let otherwise = self.parse_expr()?;
            return Ok(Expr::Ternary {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(condition)
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::LooseEq,
                Some(Token::BangEq) => BinaryOp::LooseNe,
                Some(Token::EqEqEq) => BinaryOp::StrictEq,
                Some(Token::BangEqEq) => BinaryOp::StrictNe,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Less) => BinaryOp::Less,
                Some(Token::LessEq) => BinaryOp::LessEq,
                Some(Token::Greater) => BinaryOp::Greater,
                Some(Token::GreaterEq) => BinaryOp::GreaterEq,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.cursor += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let property = match self.advance() {
                    Some(Token::Ident(name)) => name,
                    _ => return Err(self.unexpected("property name after `.`")),
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket, "`]` after index expression")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.peek().cloned() {
            Some(Token::Number(number)) => {
                self.cursor += 1;
                Ok(Expr::Literal(number_value(number)))
            }
            Some(Token::Str(text)) => {
                self.cursor += 1;
                Ok(Expr::Literal(Value::String(text)))
            }
            Some(Token::True) => {
                self.cursor += 1;
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Some(Token::False) => {
                self.cursor += 1;
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Some(Token::Null) => {
                self.cursor += 1;
                Ok(Expr::Literal(Value::Null))
            }
            Some(Token::Ident(name)) => {
                self.cursor += 1;
                Ok(Expr::Ident(name))
            }
            Some(Token::LParen) => {
                self.cursor += 1;
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen, "`)` after grouped expression")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

struct Interpreter {
    scope: Map<String, Value>,
    steps: u64,
}

impl Interpreter {
    fn tick(&mut self) -> Result<(), ExprError> {
        if self.steps == 0 {
            return Err(ExprError::BudgetExhausted {
                max_steps: MAX_STEPS,
            });
        }
        self.steps -= 1;
        Ok(())
    }

    fn exec(&mut self, statement: &Stmt) -> Result<(), ExprError> {
        match statement {
            Stmt::Assign { target, value } => {
                let value = self.eval(value)?;
                self.scope.insert(target.clone(), value);
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ExprError> {
        self.tick()?;
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self
                .scope
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UnknownBinding { name: name.clone() }),
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                Ok(member(&object, property))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                Ok(indexed(&object, &index))
            }
            Expr::Not(operand) => {
                let operand = self.eval(operand)?;
                Ok(Value::Bool(!js_truthy(&operand)))
            }
            Expr::Negate(operand) => {
                let operand = self.eval(operand)?;
                Ok(coerce_number(&operand).map_or(Value::Null, |n| number_value(-n)))
            }
            Expr::And(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if js_truthy(&lhs) {
                    self.eval(rhs)
                } else {
                    Ok(lhs)
                }
            }
            Expr::Or(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if js_truthy(&lhs) {
                    Ok(lhs)
                } else {
                    self.eval(rhs)
                }
            }
            Expr::Ternary {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.eval(condition)?;
                if js_truthy(&condition) {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Ok(binary(*op, &lhs, &rhs))
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if lhs.is_string() || rhs.is_string() {
                Value::String(format!("{}{}", render_string(lhs), render_string(rhs)))
            } else {
                arithmetic(lhs, rhs, |a, b| a + b)
            }
        }
        BinaryOp::Sub => arithmetic(lhs, rhs, |a, b| a - b),
        BinaryOp::Mul => arithmetic(lhs, rhs, |a, b| a * b),
        BinaryOp::Div => arithmetic(lhs, rhs, |a, b| a / b),
        BinaryOp::Rem => arithmetic(lhs, rhs, |a, b| a % b),
        BinaryOp::LooseEq => Value::Bool(loose_eq(lhs, rhs)),
        BinaryOp::LooseNe => Value::Bool(!loose_eq(lhs, rhs)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(lhs, rhs)),
        BinaryOp::StrictNe => Value::Bool(!strict_eq(lhs, rhs)),
        BinaryOp::Less => compare(lhs, rhs, |ordering| ordering == std::cmp::Ordering::Less),
        BinaryOp::LessEq => compare(lhs, rhs, |ordering| ordering != std::cmp::Ordering::Greater),
        BinaryOp::Greater => compare(lhs, rhs, |ordering| ordering == std::cmp::Ordering::Greater),
        BinaryOp::GreaterEq => compare(lhs, rhs, |ordering| ordering != std::cmp::Ordering::Less),
    }
}

fn arithmetic(lhs: &Value, rhs: &Value, apply: impl Fn(f64, f64) -> f64) -> Value {
    match (coerce_number(lhs), coerce_number(rhs)) {
        (Some(a), Some(b)) => number_value(apply(a, b)),
        _ => Value::Null,
    }
}

fn compare(lhs: &Value, rhs: &Value, accept: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (coerce_number(lhs), coerce_number(rhs)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    Value::Bool(ordering.is_some_and(accept))
}

fn member(object: &Value, property: &str) -> Value {
    match object {
        Value::Object(map) => map.get(property).cloned().unwrap_or(Value::Null),
        Value::String(text) if property == "length" => {
            Value::Number(serde_json::Number::from(text.chars().count() as u64))
        }
        Value::Array(items) if property == "length" => {
            Value::Number(serde_json::Number::from(items.len() as u64))
        }
        _ => Value::Null,
    }
}

fn indexed(object: &Value, index: &Value) -> Value {
    match object {
        Value::Array(items) => coerce_number(index)
            .and_then(|n| items.get(n as usize))
            .cloned()
            .unwrap_or(Value::Null),
        Value::Object(map) => index
            .as_str()
            .and_then(|key| map.get(key))
            .cloned()
            .unwrap_or(Value::Null),
        Value::String(text) => coerce_number(index)
            .and_then(|n| text.chars().nth(n as usize))
            .map(|ch| Value::String(ch.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn js_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bindings(value: Value, data: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("value".to_string(), value.clone());
        map.insert("input".to_string(), value);
        map.insert("row".to_string(), data.clone());
        map.insert("data".to_string(), data);
        map
    }

    #[test]
    fn test_script_result_is_final_valid_binding() {
        let result = evaluate_script("valid = false;", &bindings(json!(1), json!({}))).unwrap();
        assert_eq!(result, json!(false));

        let result = evaluate_script("3 + 4;", &bindings(json!(1), json!({}))).unwrap();
        assert_eq!(result, json!(true));
    }

    #[test]
    fn test_bindings_and_member_access() {
        let data = json!({"password": "secret1", "confirm": "secret2"});
        let result = evaluate_script(
            "valid = data.password == data.confirm || 'Passwords must match';",
            &bindings(json!("secret2"), data),
        )
        .unwrap();
        assert_eq!(result, json!("Passwords must match"));
    }

    #[test]
    fn test_length_and_comparison() {
        let result = evaluate_script(
            "valid = input.length >= 3;",
            &bindings(json!("abcd"), json!({})),
        )
        .unwrap();
        assert_eq!(result, json!(true));

        let result = evaluate_script(
            "valid = input.length >= 3;",
            &bindings(json!("ab"), json!({})),
        )
        .unwrap();
        assert_eq!(result, json!(false));
    }

    #[test]
    fn test_ternary_and_arithmetic() {
        let result = evaluate_script(
            "valid = value % 2 == 0 ? true : 'Must be even';",
            &bindings(json!(7), json!({})),
        )
        .unwrap();
        assert_eq!(result, json!("Must be even"));
    }

    #[test]
    fn test_indexing_arrays_and_objects() {
        let data = json!({"tags": ["a", "b"], "limits": {"max": 2}});
        let result = evaluate_script(
            "valid = data.tags[1] == 'b' && data['limits'].max == 2;",
            &bindings(json!(null), data),
        )
        .unwrap();
        assert_eq!(result, json!(true));
    }

    #[test]
    fn test_unknown_binding_is_an_error() {
        let error = evaluate_script("valid = missing;", &bindings(json!(1), json!({})));
        assert_eq!(
            error,
            Err(ExprError::UnknownBinding {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_source_size_limit() {
        let big = format!("valid = {};", "1 + ".repeat(8 * 1024) + "1");
        assert!(matches!(
            evaluate_script(&big, &bindings(json!(1), json!({}))),
            Err(ExprError::InputTooLarge { .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("valid = {}1{};", "(".repeat(100), ")".repeat(100));
        assert_eq!(
            evaluate_script(&deep, &bindings(json!(1), json!({}))),
            Err(ExprError::NestingTooDeep { max_depth: 64 })
        );
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert_eq!(
            evaluate_script("   ", &bindings(json!(1), json!({}))),
            Err(ExprError::EmptyInput)
        );
    }

    #[test]
    fn test_evaluate_custom_fail_open_on_broken_rule() {
        let component = FormComponentSchema::new("textfield", "name");
        let verdict = evaluate_custom("valid = = 2;", &json!("x"), &Map::new(), &component);
        assert_eq!(verdict, CustomVerdict::Valid);

        let verdict = evaluate_custom("valid = boom.bang;", &json!("x"), &Map::new(), &component);
        assert_eq!(verdict, CustomVerdict::Valid);
    }

    #[test]
    fn test_evaluate_custom_false_is_invalid_without_message() {
        let component = FormComponentSchema::new("textfield", "name");
        let verdict = evaluate_custom("valid = false;", &json!("x"), &Map::new(), &component);
        assert_eq!(verdict, CustomVerdict::Invalid { message: None });
    }

    #[test]
    fn test_evaluate_custom_component_binding_is_visible() {
        let component = FormComponentSchema::new("number", "age");
        let verdict = evaluate_custom(
            "valid = component.key == 'age';",
            &json!(30),
            &Map::new(),
            &component,
        );
        assert_eq!(verdict, CustomVerdict::Valid);
    }

    #[test]
    fn test_non_boolean_non_string_results_are_valid() {
        let component = FormComponentSchema::new("number", "age");
        let verdict = evaluate_custom("valid = 42;", &json!(1), &Map::new(), &component);
        assert_eq!(verdict, CustomVerdict::Valid);
        let verdict = evaluate_custom("valid = null;", &json!(1), &Map::new(), &component);
        assert_eq!(verdict, CustomVerdict::Valid);
    }
}
