//! Matcher expression tokenization and parsing.
//!
//! The parser produces an [`Expression`] tree with every operand already
//! checked against the variable it is compared to, so the compiler only has
//! to lay the tree out.

use super::node::{Relation, StringHeader};
use super::pattern;
use super::timestamp::parse_rfc3339;
use crate::config::{MatcherConfig, MAX_NESTING_DEPTH};
use crate::error::{HekaError, Result};

/// A header variable named in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    String(StringHeader),
    Severity,
    Pid,
    Timestamp,
}

impl Variable {
    fn from_identifier(identifier: &str) -> Option<Self> {
        let variable = match identifier {
            "Uuid" => Variable::String(StringHeader::Uuid),
            "Type" => Variable::String(StringHeader::Type),
            "Logger" => Variable::String(StringHeader::Logger),
            "Payload" => Variable::String(StringHeader::Payload),
            "EnvVersion" => Variable::String(StringHeader::EnvVersion),
            "Hostname" => Variable::String(StringHeader::Hostname),
            "Severity" => Variable::Severity,
            "Pid" => Variable::Pid,
            "Timestamp" => Variable::Timestamp,
            _ => return None,
        };
        Some(variable)
    }

    pub fn name(self) -> &'static str {
        match self {
            Variable::String(header) => header.name(),
            Variable::Severity => "Severity",
            Variable::Pid => "Pid",
            Variable::Timestamp => "Timestamp",
        }
    }
}

/// Tokens in a matcher expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Variable(Variable),
    Field {
        name: String,
        field_index: usize,
        array_index: usize,
    },
    /// A quoted literal. `plain` is set when the literal carries the `%`
    /// suffix, marking it as a substring rather than a pattern.
    String { value: Vec<u8>, plain: bool },
    Number(f64),
    True,
    False,
    Nil,
    Relation(Relation),
    And,
    Or,
    LeftParen,
    RightParen,
}

impl Token {
    fn describe(&self) -> &'static str {
        match self {
            Token::Variable(_) => "variable",
            Token::Field { .. } => "field",
            Token::String { .. } => "string",
            Token::Number(_) => "number",
            Token::True | Token::False => "boolean",
            Token::Nil => "NIL",
            Token::Relation(_) => "operator",
            Token::And => "'&&'",
            Token::Or => "'||'",
            Token::LeftParen => "'('",
            Token::RightParen => "')'",
        }
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub position: usize,
}

/// What a comparison reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Variable(Variable),
    Field {
        name: String,
        field_index: u16,
        array_index: u16,
    },
}

impl Subject {
    fn name(&self) -> String {
        match self {
            Subject::Variable(variable) => variable.name().to_string(),
            Subject::Field { name, .. } => format!("Fields[{}]", name),
        }
    }
}

/// The checked right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(Vec<u8>),
    Pattern(Vec<u8>),
    Substring(Vec<u8>),
    Number(f64),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub subject: Subject,
    pub relation: Relation,
    pub literal: Literal,
}

/// Parsed matcher expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Or(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Constant(bool),
    Comparison(Comparison),
}

impl Expression {
    /// Number of leaf tests (comparisons and constants).
    pub fn test_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(expr) = pending.pop() {
            match expr {
                Expression::Or(left, right) | Expression::And(left, right) => {
                    pending.push(left);
                    pending.push(right);
                }
                Expression::Constant(_) | Expression::Comparison(_) => count += 1,
            }
        }
        count
    }
}

/// Recursive descent parser for matcher expressions.
struct ExpressionParser<'a> {
    lexemes: &'a [Lexeme],
    position: usize,
    end: usize,
    depth: usize,
    tests: usize,
    config: &'a MatcherConfig,
}

impl<'a> ExpressionParser<'a> {
    fn new(lexemes: &'a [Lexeme], end: usize, config: &'a MatcherConfig) -> Self {
        Self {
            lexemes,
            position: 0,
            end,
            depth: 0,
            tests: 0,
            config,
        }
    }

    fn current_token(&self) -> Option<&Token> {
        self.lexemes.get(self.position).map(|lexeme| &lexeme.token)
    }

    /// Offset of the current token, or the end of the input.
    fn offset(&self) -> usize {
        self.lexemes
            .get(self.position)
            .map_or(self.end, |lexeme| lexeme.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.current_token().cloned();
        self.position += 1;
        token
    }

    fn count_test(&mut self, position: usize) -> Result<()> {
        self.tests += 1;
        if self.tests > self.config.max_tests {
            return Err(HekaError::syntax(
                position,
                format!("expression has more than {} tests", self.config.max_tests),
            ));
        }
        Ok(())
    }

    /// Parse OR expressions (lowest precedence).
    fn parse_or_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_and_expression()?;

        while let Some(Token::Or) = self.current_token() {
            self.advance();
            let right = self.parse_and_expression()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_and_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_primary()?;

        while let Some(Token::And) = self.current_token() {
            self.advance();
            let right = self.parse_primary()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let position = self.offset();
        match self.advance() {
            Some(Token::LeftParen) => {
                self.depth += 1;
                if self.depth > MAX_NESTING_DEPTH {
                    return Err(HekaError::syntax(position, "parentheses nested too deeply"));
                }
                let expr = self.parse_or_expression()?;
                if let Some(Token::RightParen) = self.current_token() {
                    self.advance();
                    self.depth -= 1;
                    Ok(expr)
                } else {
                    Err(HekaError::syntax(self.offset(), "expected ')'"))
                }
            }
            Some(Token::True) => {
                self.count_test(position)?;
                Ok(Expression::Constant(true))
            }
            Some(Token::False) => {
                self.count_test(position)?;
                Ok(Expression::Constant(false))
            }
            Some(Token::Variable(variable)) => {
                self.count_test(position)?;
                self.parse_comparison(Subject::Variable(variable))
            }
            Some(Token::Field {
                name,
                field_index,
                array_index,
            }) => {
                self.count_test(position)?;
                if name.len() > self.config.max_string_length {
                    return Err(HekaError::syntax(position, "field name is too long"));
                }
                let subject = Subject::Field {
                    name,
                    field_index: self.index(field_index, position)?,
                    array_index: self.index(array_index, position)?,
                };
                self.parse_comparison(subject)
            }
            Some(token) => Err(HekaError::syntax(
                position,
                format!("expected a test, found {}", token.describe()),
            )),
            None => Err(HekaError::syntax(position, "expected a test")),
        }
    }

    fn index(&self, index: usize, position: usize) -> Result<u16> {
        if index > self.config.max_index {
            return Err(HekaError::syntax(
                position,
                format!("index {} exceeds the limit of {}", index, self.config.max_index),
            ));
        }
        u16::try_from(index).map_err(|_| HekaError::syntax(position, "index out of range"))
    }

    fn parse_comparison(&mut self, subject: Subject) -> Result<Expression> {
        let relation = match self.current_token() {
            Some(Token::Relation(relation)) => *relation,
            _ => return Err(HekaError::syntax(self.offset(), "expected an operator")),
        };
        self.advance();

        let position = self.offset();
        let token = self
            .advance()
            .ok_or_else(|| HekaError::syntax(position, "expected a value"))?;
        if let Token::String { value, .. } = &token {
            if value.len() > self.config.max_string_length {
                return Err(HekaError::syntax(
                    position,
                    format!(
                        "string literal is longer than {} bytes",
                        self.config.max_string_length
                    ),
                ));
            }
        }

        let literal = check_operand(&subject, relation, token, position)?;
        Ok(Expression::Comparison(Comparison {
            subject,
            relation,
            literal,
        }))
    }
}

fn mismatch(subject: &Subject, relation: Relation, token: &Token) -> HekaError {
    HekaError::type_mismatch(
        relation.symbol(),
        format!("{} and a {} operand", subject.name(), token.describe()),
    )
}

/// A string operand for a string-valued subject.
fn string_operand(
    value: Vec<u8>,
    plain: bool,
    relation: Relation,
    position: usize,
) -> Result<Literal> {
    if !relation.is_pattern() {
        if plain {
            return Err(HekaError::syntax(
                position,
                "the '%' suffix only applies to =~ and !~",
            ));
        }
        return Ok(Literal::String(value));
    }
    if plain {
        return Ok(Literal::Substring(value));
    }
    pattern::validate(&value)
        .map_err(|err| HekaError::syntax(position, format!("invalid pattern: {}", err)))?;
    Ok(Literal::Pattern(value))
}

fn check_operand(
    subject: &Subject,
    relation: Relation,
    token: Token,
    position: usize,
) -> Result<Literal> {
    match (subject, token) {
        (Subject::Variable(Variable::String(_)), Token::String { value, plain })
        | (Subject::Field { .. }, Token::String { value, plain }) => {
            string_operand(value, plain, relation, position)
        }
        (Subject::Variable(Variable::String(header)), Token::Nil)
            if relation.is_equality() && *header != StringHeader::Uuid =>
        {
            Ok(Literal::Nil)
        }
        (Subject::Variable(Variable::Severity | Variable::Pid), Token::Number(n))
        | (Subject::Variable(Variable::Timestamp), Token::Number(n))
        | (Subject::Field { .. }, Token::Number(n))
            if !relation.is_pattern() =>
        {
            Ok(Literal::Number(n))
        }
        (Subject::Variable(Variable::Pid), Token::Nil) | (Subject::Field { .. }, Token::Nil)
            if relation.is_equality() =>
        {
            Ok(Literal::Nil)
        }
        (Subject::Variable(Variable::Timestamp), Token::String { value, plain: false })
            if !relation.is_pattern() =>
        {
            std::str::from_utf8(&value)
                .ok()
                .and_then(parse_rfc3339)
                .map(|nanos| Literal::Number(nanos as f64))
                .ok_or_else(|| HekaError::syntax(position, "invalid RFC 3339 timestamp"))
        }
        (Subject::Field { .. }, Token::True) if relation.is_equality() => Ok(Literal::Bool(true)),
        (Subject::Field { .. }, Token::False) if relation.is_equality() => {
            Ok(Literal::Bool(false))
        }
        (_, token @ (Token::Relation(_) | Token::And | Token::Or | Token::LeftParen)) => Err(
            HekaError::syntax(position, format!("expected a value, found {}", token.describe())),
        ),
        (_, token @ (Token::RightParen | Token::Variable(_) | Token::Field { .. })) => Err(
            HekaError::syntax(position, format!("expected a value, found {}", token.describe())),
        ),
        (subject, token) => Err(mismatch(subject, relation, &token)),
    }
}

fn syntax_at(position: usize, message: &str) -> HekaError {
    HekaError::syntax(position, message)
}

/// Split a matcher expression into tokens.
pub fn tokenize(expression: &str) -> Result<Vec<Lexeme>> {
    let bytes = expression.as_bytes();
    let mut lexemes = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let next = bytes.get(i + 1).copied();
        let token = match bytes[i] {
            ch if ch.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            b'(' => {
                i += 1;
                Token::LeftParen
            }
            b')' => {
                i += 1;
                Token::RightParen
            }
            b'&' if next == Some(b'&') => {
                i += 2;
                Token::And
            }
            b'|' if next == Some(b'|') => {
                i += 2;
                Token::Or
            }
            b'=' | b'!' | b'>' | b'<' => {
                let (relation, width) = match (bytes[i], next) {
                    (b'=', Some(b'=')) => (Relation::Eq, 2),
                    (b'=', Some(b'~')) => (Relation::Matches, 2),
                    (b'!', Some(b'=')) => (Relation::Ne, 2),
                    (b'!', Some(b'~')) => (Relation::NotMatches, 2),
                    (b'>', Some(b'=')) => (Relation::Gte, 2),
                    (b'>', _) => (Relation::Gt, 1),
                    (b'<', Some(b'=')) => (Relation::Lte, 2),
                    (b'<', _) => (Relation::Lt, 1),
                    _ => return Err(syntax_at(start, "unknown operator")),
                };
                i += width;
                Token::Relation(relation)
            }
            quote @ (b'"' | b'\'') => {
                let (value, end) = scan_string(bytes, i, quote)?;
                i = end;
                let plain = bytes.get(i) == Some(&b'%');
                if plain {
                    i += 1;
                }
                if bytes.get(i).is_some_and(|b| b.is_ascii_alphanumeric()) {
                    return Err(syntax_at(i, "unexpected suffix after string literal"));
                }
                Token::String { value, plain }
            }
            b'0'..=b'9' | b'+' | b'-' => {
                let end = scan_number(bytes, i)?;
                let number = expression[i..end]
                    .parse::<f64>()
                    .map_err(|_| syntax_at(start, "invalid number"))?;
                i = end;
                Token::Number(number)
            }
            ch if ch.is_ascii_alphabetic() => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let identifier = &expression[start..i];
                match identifier {
                    "TRUE" => Token::True,
                    "FALSE" => Token::False,
                    "NIL" => Token::Nil,
                    "Fields" if bytes.get(i) == Some(&b'[') => {
                        let (token, end) = scan_field(expression, i)?;
                        i = end;
                        token
                    }
                    _ => match Variable::from_identifier(identifier) {
                        Some(variable) => Token::Variable(variable),
                        None => {
                            return Err(HekaError::syntax(
                                start,
                                format!("unknown variable '{}'", identifier),
                            ))
                        }
                    },
                }
            }
            b'&' | b'|' => return Err(syntax_at(start, "unknown operator")),
            _ => return Err(syntax_at(start, "unexpected character")),
        };
        lexemes.push(Lexeme {
            token,
            position: start,
        });
    }

    Ok(lexemes)
}

/// Scan a quoted literal starting at `start`. A backslash may only escape the
/// enclosing quote character.
fn scan_string(bytes: &[u8], start: usize, quote: u8) -> Result<(Vec<u8>, usize)> {
    let mut value = Vec::new();
    let mut i = start + 1;
    loop {
        match bytes.get(i) {
            None => return Err(syntax_at(start, "unterminated string literal")),
            Some(&b'\\') => {
                if bytes.get(i + 1) != Some(&quote) {
                    return Err(syntax_at(i, "invalid escape in string literal"));
                }
                value.push(quote);
                i += 2;
            }
            Some(&ch) if ch == quote => return Ok((value, i + 1)),
            Some(&ch) => {
                value.push(ch);
                i += 1;
            }
        }
    }
}

/// Scan `sign? (0 | [1-9][0-9]*) ('.' [0-9]+)? ([eE] sign? [0-9]+)?`.
fn scan_number(bytes: &[u8], start: usize) -> Result<usize> {
    let digit = |i: usize| bytes.get(i).is_some_and(|b| b.is_ascii_digit());
    let mut i = start;
    if matches!(bytes[i], b'+' | b'-') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            while digit(i) {
                i += 1;
            }
        }
        _ => return Err(syntax_at(start, "invalid number")),
    }
    if bytes.get(i) == Some(&b'.') && digit(i + 1) {
        i += 1;
        while digit(i) {
            i += 1;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        if digit(j) {
            i = j;
            while digit(i) {
                i += 1;
            }
        }
    }
    Ok(i)
}

/// Scan `[name]` and up to two `[index]` groups following `Fields`.
fn scan_field(expression: &str, open: usize) -> Result<(Token, usize)> {
    let bytes = expression.as_bytes();
    let name_start = open + 1;
    let name_end = bytes[name_start..]
        .iter()
        .position(|&b| b == b']')
        .map(|offset| name_start + offset)
        .ok_or_else(|| syntax_at(open, "unterminated field name"))?;
    if name_end == name_start {
        return Err(syntax_at(open, "empty field name"));
    }
    let name = expression[name_start..name_end].to_string();

    let mut i = name_end + 1;
    let mut indices = [0usize; 2];
    for index in indices.iter_mut() {
        if bytes.get(i) != Some(&b'[') {
            break;
        }
        let digits_start = i + 1;
        let mut j = digits_start;
        while bytes.get(j).is_some_and(|b| b.is_ascii_digit()) {
            j += 1;
        }
        if j == digits_start || bytes.get(j) != Some(&b']') {
            return Err(syntax_at(i, "invalid array index"));
        }
        *index = expression[digits_start..j]
            .parse::<usize>()
            .map_err(|_| syntax_at(i, "invalid array index"))?;
        i = j + 1;
    }

    Ok((
        Token::Field {
            name,
            field_index: indices[0],
            array_index: indices[1],
        },
        i,
    ))
}

/// Parse a matcher expression into a checked expression tree.
pub fn parse(expression: &str, config: &MatcherConfig) -> Result<Expression> {
    let lexemes = tokenize(expression)?;
    if lexemes.is_empty() {
        return Err(HekaError::syntax(0, "empty expression"));
    }

    let mut parser = ExpressionParser::new(&lexemes, expression.len(), config);
    let expr = parser.parse_or_expression()?;
    if let Some(token) = parser.current_token() {
        return Err(HekaError::syntax(
            parser.offset(),
            format!("unexpected {}", token.describe()),
        ));
    }
    Ok(expr)
}
