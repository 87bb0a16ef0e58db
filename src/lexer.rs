use std::fmt;

use thiserror::Error;

use crate::ast::{BinOp, Modifier, Operator, SpannedToken, Token};

/// Location of a character in the filter source.
///
/// `offset` counts chars from the start of input; `line` and `column` are
/// 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {position}")]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl LexError {
    fn new(position: Position, message: impl Into<String>) -> Self {
        LexError {
            position,
            message: message.into(),
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    offset: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Lexes the whole input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_spanned()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Length of the whole input in chars.
    pub fn source_len(&self) -> usize {
        self.input.len()
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.offset).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.offset + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.offset += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    /// Skips whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.current_char() {
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('/') if self.peek_char(1) == Some('/') => {
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn read_identifier(&mut self) -> Result<Token, LexError> {
        let start = self.position();
        let mut name = String::new();

        if self.current_char() == Some('@') {
            name.push('@');
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let body = name.strip_prefix('@').unwrap_or(&name);
        if body.is_empty() || body.split('.').any(str::is_empty) {
            return Err(LexError::new(
                start,
                format!("Malformed identifier `{name}`"),
            ));
        }

        let modifier = if self.current_char() == Some(':')
            && self.peek_char(1).is_some_and(|c| c.is_ascii_alphabetic())
        {
            self.advance(); // consume ':'
            let modifier_start = self.position();
            let mut modifier_name = String::new();
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    modifier_name.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            let modifier = Modifier::from_name(&modifier_name).ok_or_else(|| {
                LexError::new(
                    modifier_start,
                    format!("Unknown modifier `:{modifier_name}`"),
                )
            })?;
            Some(modifier)
        } else {
            None
        };

        if modifier.is_none() {
            match name.as_str() {
                "true" => return Ok(Token::Boolean(true)),
                "false" => return Ok(Token::Boolean(false)),
                "null" => return Ok(Token::Null),
                _ => {}
            }
        }

        Ok(Token::Identifier { name, modifier })
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position();
        let mut result = String::new();
        self.advance(); // consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.position();
                    self.advance(); // consume backslash
                    match self.current_char() {
                        Some(c @ ('"' | '\'' | '\\')) => result.push(c),
                        Some(c) => {
                            return Err(LexError::new(
                                escape_at,
                                format!("Invalid escape sequence `\\{c}`"),
                            ));
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new(start, "Unterminated string literal"))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position();
        let mut number = String::new();
        let mut is_float = false;

        if let Some(sign @ ('-' | '+')) = self.current_char() {
            if sign == '-' {
                number.push(sign);
            }
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if !is_float && let Ok(n) = number.parse::<i64>() {
            return Ok(Token::Integer(n));
        }
        number
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|_| LexError::new(start, format!("Invalid number `{number}`")))
    }

    fn operator(&mut self, width: usize, op: Operator) -> Result<Token, LexError> {
        self.advance_by(width);
        Ok(Token::Operator(op))
    }

    /// Lexes a comparison operator starting `skip` chars ahead, returning
    /// its base op and width.
    fn base_operator(&self, skip: usize) -> Option<(BinOp, usize)> {
        let first = self.peek_char(skip)?;
        let second = self.peek_char(skip + 1);
        match (first, second) {
            ('!', Some('=')) => Some((BinOp::NotEqual, 2)),
            ('!', Some('~')) => Some((BinOp::NotLike, 2)),
            ('>', Some('=')) => Some((BinOp::GreaterEqual, 2)),
            ('<', Some('=')) => Some((BinOp::LessEqual, 2)),
            ('=', _) => Some((BinOp::Equal, 1)),
            ('>', _) => Some((BinOp::GreaterThan, 1)),
            ('<', _) => Some((BinOp::LessThan, 1)),
            ('~', _) => Some((BinOp::Like, 1)),
            _ => None,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.next_spanned().map(|spanned| spanned.token)
    }

    pub fn next_spanned(&mut self) -> Result<SpannedToken, LexError> {
        self.skip_trivia();
        let position = self.position();
        let token = self.scan(position)?;
        Ok(SpannedToken { token, position })
    }

    fn scan(&mut self, position: Position) -> Result<Token, LexError> {
        match self.current_char() {
            None => Ok(Token::Eof),
            Some('(') => {
                self.advance();
                Ok(Token::LParen)
            }
            Some(')') => {
                self.advance();
                Ok(Token::RParen)
            }
            Some('&') => {
                if self.peek_char(1) == Some('&') {
                    self.advance_by(2);
                    Ok(Token::And)
                } else {
                    Err(LexError::new(position, "Unexpected '&' (did you mean '&&'?)"))
                }
            }
            Some('|') => {
                if self.peek_char(1) == Some('|') {
                    self.advance_by(2);
                    Ok(Token::Or)
                } else {
                    Err(LexError::new(position, "Unexpected '|' (did you mean '||'?)"))
                }
            }
            Some('?') => match self.base_operator(1) {
                Some((op, width)) => self.operator(width + 1, Operator::any_of(op)),
                None => Err(LexError::new(
                    position,
                    "Unexpected '?' (expected an operator such as '?=')",
                )),
            },
            Some('!' | '=' | '>' | '<' | '~') => match self.base_operator(0) {
                Some((op, width)) => self.operator(width, Operator::plain(op)),
                None => Err(LexError::new(
                    position,
                    "Unexpected '!' (did you mean '!=' or '!~'?)",
                )),
            },
            Some('"') => self.read_string('"').map(Token::String),
            Some('\'') => self.read_string('\'').map(Token::String),
            Some('-' | '+') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' || ch == '@' => {
                self.read_identifier()
            }
            Some(ch) => Err(LexError::new(
                position,
                format!("Unexpected character '{ch}'"),
            )),
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("true false null");
    assert_eq!(lexer.next_token().unwrap(), Token::Boolean(true));
    assert_eq!(lexer.next_token().unwrap(), Token::Boolean(false));
    assert_eq!(lexer.next_token().unwrap(), Token::Null);
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_comparison() {
    let mut lexer = Lexer::new("views >= 50 && tags ?= 'x'");
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Identifier {
            name: "views".to_string(),
            modifier: None
        }
    );
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Operator(Operator::plain(BinOp::GreaterEqual))
    );
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(50));
    assert_eq!(lexer.next_token().unwrap(), Token::And);
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Identifier {
            name: "tags".to_string(),
            modifier: None
        }
    );
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Operator(Operator::any_of(BinOp::Equal))
    );
    assert_eq!(lexer.next_token().unwrap(), Token::String("x".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}
