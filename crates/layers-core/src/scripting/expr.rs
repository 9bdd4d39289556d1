//! Built-in rule expression engine, registered as `"expr"`.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or         := and ( "||" and )*
//! and        := equality ( "&&" equality )*
//! equality   := comparison ( ("==" | "!=" | "===" | "!==") comparison )*
//! comparison := unary ( ("<" | "<=" | ">" | ">=") unary )*
//! unary      := "!" unary | primary
//! primary    := literal | ident "(" args? ")" | "(" or ")"
//! ```
//!
//! `&&`, `||` and `!` yield booleans through [`ScriptValue::to_bool`] and
//! short-circuit. Equality between different types is `false`; ordering
//! is only defined for two numbers or two strings.

use super::{ScriptError, ScriptScope, ScriptValue, ScriptingEngine};

/// Engine name the built-in engine registers under.
pub const EXPRESSION_ENGINE: &str = "expr";

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    True,
    False,
    Null,
    Number(f64),
    Str(String),
    Ident(String),
    LeftParen,
    RightParen,
    Comma,
    Bang,
    AndAnd,
    OrOr,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn syntax(offset: usize, message: impl Into<String>) -> ScriptError {
    ScriptError::Syntax {
        offset,
        message: message.into(),
    }
}

struct Lexer<'a> {
    source: &'a str,
    index: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, index: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn peek_second_char(&self) -> Option<char> {
        let mut chars = self.source[self.index..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.index += ch.len_utf8();
        Some(ch)
    }

    fn lex(mut self) -> Result<Vec<Token>, ScriptError> {
        let mut tokens = Vec::new();
        loop {
            while self.peek_char().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let offset = self.index;
            let ch = match self.peek_char() {
                Some(ch) => ch,
                None => break,
            };

            let kind = if ch.is_alphabetic() || ch == '_' || ch == '$' {
                self.lex_identifier()
            } else if ch.is_ascii_digit()
                || (ch == '-' && self.peek_second_char().is_some_and(|c| c.is_ascii_digit()))
            {
                self.lex_number()?
            } else {
                match ch {
                    '"' | '\'' => self.lex_string(ch)?,
                    '(' => self.single(TokenKind::LeftParen),
                    ')' => self.single(TokenKind::RightParen),
                    ',' => self.single(TokenKind::Comma),
                    '!' => {
                        self.bump();
                        if self.peek_char() == Some('=') {
                            self.bump();
                            self.eat_char('=');
                            TokenKind::BangEqual
                        } else {
                            TokenKind::Bang
                        }
                    }
                    '=' => {
                        self.bump();
                        if !self.eat_char('=') {
                            return Err(syntax(offset, "assignment is not allowed in rules"));
                        }
                        self.eat_char('=');
                        TokenKind::EqualEqual
                    }
                    '&' => self.double('&', TokenKind::AndAnd)?,
                    '|' => self.double('|', TokenKind::OrOr)?,
                    '<' => {
                        self.bump();
                        if self.eat_char('=') {
                            TokenKind::LessEqual
                        } else {
                            TokenKind::Less
                        }
                    }
                    '>' => {
                        self.bump();
                        if self.eat_char('=') {
                            TokenKind::GreaterEqual
                        } else {
                            TokenKind::Greater
                        }
                    }
                    other => return Err(syntax(offset, format!("unexpected character '{other}'"))),
                }
            };
            tokens.push(Token { kind, offset });
        }
        Ok(tokens)
    }

    fn eat_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn double(&mut self, ch: char, kind: TokenKind) -> Result<TokenKind, ScriptError> {
        let offset = self.index;
        self.bump();
        if self.eat_char(ch) {
            Ok(kind)
        } else {
            Err(syntax(offset, format!("expected '{ch}{ch}'")))
        }
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.index;
        while self
            .peek_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.bump();
        }
        match &self.source[start..self.index] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" | "undefined" => TokenKind::Null,
            ident => TokenKind::Ident(ident.to_string()),
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, ScriptError> {
        let start = self.index;
        self.eat_char('-');
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.bump();
        }
        let text = &self.source[start..self.index];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| syntax(start, format!("invalid number '{text}'")))
    }

    fn lex_string(&mut self, quote: char) -> Result<TokenKind, ScriptError> {
        let start = self.index;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(syntax(start, "unterminated string")),
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => return Err(syntax(start, "unterminated string")),
                },
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::Str(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(ScriptValue),
    Call { name: String, args: Vec<Expr> },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
}

/// Deepest nesting of operators, parentheses and calls a rule may use.
const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), ScriptError> {
        if self.depth >= MAX_DEPTH {
            return Err(syntax(self.offset(), "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |t| t.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ScriptError> {
        if self.check(&kind) {
            Ok(())
        } else {
            Err(syntax(self.offset(), format!("expected {what}")))
        }
    }

    fn parse(mut self) -> Result<Expr, ScriptError> {
        let expr = self.parse_logical_or()?;
        if self.pos < self.tokens.len() {
            return Err(syntax(self.offset(), "unexpected trailing input"));
        }
        Ok(expr)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ScriptError> {
        let depth = self.depth;
        let mut expr = self.parse_logical_and()?;
        while self.check(&TokenKind::OrOr) {
            self.descend()?;
            let right = self.parse_logical_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(right));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ScriptError> {
        let depth = self.depth;
        let mut expr = self.parse_equality()?;
        while self.check(&TokenKind::AndAnd) {
            self.descend()?;
            let right = self.parse_equality()?;
            expr = Expr::And(Box::new(expr), Box::new(right));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ScriptError> {
        let depth = self.depth;
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::EqualEqual) => CompareOp::Eq,
                Some(TokenKind::BangEqual) => CompareOp::Ne,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_comparison()?;
            expr = Expr::Compare(op, Box::new(expr), Box::new(right));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ScriptError> {
        let depth = self.depth;
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Less) => CompareOp::Lt,
                Some(TokenKind::LessEqual) => CompareOp::Le,
                Some(TokenKind::Greater) => CompareOp::Gt,
                Some(TokenKind::GreaterEqual) => CompareOp::Ge,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_unary()?;
            expr = Expr::Compare(op, Box::new(expr), Box::new(right));
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        if self.check(&TokenKind::Bang) {
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ScriptError> {
        let offset = self.offset();
        let token = self
            .advance()
            .ok_or_else(|| syntax(offset, "unexpected end of expression"))?;
        match token.kind {
            TokenKind::True => Ok(Expr::Literal(ScriptValue::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(ScriptValue::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(ScriptValue::Null)),
            TokenKind::Number(n) => Ok(Expr::Literal(ScriptValue::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(ScriptValue::Text(s))),
            TokenKind::LeftParen => {
                self.descend()?;
                let expr = self.parse_logical_or()?;
                self.expect(TokenKind::RightParen, "')'")?;
                self.depth -= 1;
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                if !self.check(&TokenKind::LeftParen) {
                    return Err(ScriptError::UnknownIdentifier(name));
                }
                self.descend()?;
                let mut args = Vec::new();
                if !self.check(&TokenKind::RightParen) {
                    loop {
                        args.push(self.parse_logical_or()?);
                        if self.check(&TokenKind::Comma) {
                            continue;
                        }
                        self.expect(TokenKind::RightParen, "')' after arguments")?;
                        break;
                    }
                }
                self.depth -= 1;
                Ok(Expr::Call { name, args })
            }
            other => Err(syntax(token.offset, format!("unexpected token {other:?}"))),
        }
    }
}

fn compare(op: CompareOp, left: &ScriptValue, right: &ScriptValue) -> Result<bool, ScriptError> {
    use std::cmp::Ordering;

    match op {
        CompareOp::Eq => return Ok(left == right),
        CompareOp::Ne => return Ok(left != right),
        _ => {}
    }

    let ordering = match (left, right) {
        (ScriptValue::Number(a), ScriptValue::Number(b)) => a.partial_cmp(b),
        (ScriptValue::Text(a), ScriptValue::Text(b)) => Some(a.cmp(b)),
        _ => {
            return Err(ScriptError::Type(format!(
                "cannot order {} and {}",
                left.type_name(),
                right.type_name()
            )))
        }
    };
    // NaN compares false with everything
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
    })
}

fn eval(expr: &Expr, scope: &ScriptScope) -> Result<ScriptValue, ScriptError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            scope.call(name, &args)
        }
        Expr::Not(inner) => Ok(ScriptValue::Bool(!eval(inner, scope)?.to_bool())),
        Expr::And(left, right) => {
            if !eval(left, scope)?.to_bool() {
                return Ok(ScriptValue::Bool(false));
            }
            Ok(ScriptValue::Bool(eval(right, scope)?.to_bool()))
        }
        Expr::Or(left, right) => {
            if eval(left, scope)?.to_bool() {
                return Ok(ScriptValue::Bool(true));
            }
            Ok(ScriptValue::Bool(eval(right, scope)?.to_bool()))
        }
        Expr::Compare(op, left, right) => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            Ok(ScriptValue::Bool(compare(*op, &left, &right)?))
        }
    }
}

/// Tree-walking evaluator for layer rule expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEngine;

impl ExpressionEngine {
    pub fn new() -> Self {
        Self
    }
}

fn parse(script: &str) -> Result<Expr, ScriptError> {
    let tokens = Lexer::new(script).lex()?;
    if tokens.is_empty() {
        return Err(syntax(0, "empty expression"));
    }
    Parser::new(tokens, script.len()).parse()
}

impl ScriptingEngine for ExpressionEngine {
    fn prefix(&self) -> &str {
        EXPRESSION_ENGINE
    }

    fn evaluate(&self, scope: &ScriptScope, script: &str) -> Result<ScriptValue, ScriptError> {
        let expr = parse(script)?;
        eval(&expr, scope)
    }

    /// A script is valid when it parses.
    fn validate(&self, script: &str) -> Result<(), ScriptError> {
        parse(script).map(|_| ())
    }
}
