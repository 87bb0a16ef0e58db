use std::mem;

use thiserror::Error;

use crate::{
    ast::{Expr, Identifier, Literal, Macro, Modifier, RequestScope, Scope, SpannedToken, Token},
    lexer::{LexError, Lexer, Position},
};

/// Deepest relation chain a field path may walk.
pub const MAX_RELATION_DEPTH: usize = 6;

/// Longest filter accepted, in chars.
pub const MAX_EXPRESSION_LENGTH: usize = 3500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Expected {expected}, found {found} at {position}")]
    Unexpected {
        position: Position,
        expected: String,
        found: String,
    },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(e) => e.position,
            ParseError::Unexpected { position, .. } => *position,
        }
    }

    fn unexpected(position: Position, expected: impl Into<String>, found: impl Into<String>) -> Self {
        ParseError::Unexpected {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Limits enforced while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_relation_depth: usize,
    pub max_expression_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_relation_depth: MAX_RELATION_DEPTH,
            max_expression_length: MAX_EXPRESSION_LENGTH,
        }
    }
}

/// Parses `input` with default limits.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    Parser::new(Lexer::new(input))?.parse()
}

pub struct Parser {
    lexer: Lexer,
    current: SpannedToken,
    options: ParseOptions,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Self::with_options(lexer, ParseOptions::default())
    }

    pub fn with_options(mut lexer: Lexer, options: ParseOptions) -> Result<Self, ParseError> {
        if lexer.source_len() > options.max_expression_length {
            return Err(ParseError::unexpected(
                lexer.position(),
                format!("at most {} characters", options.max_expression_length),
                format!("{} characters", lexer.source_len()),
            ));
        }
        let current = lexer.next_spanned()?;
        Ok(Parser {
            lexer,
            current,
            options,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next_spanned()?;
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current.token) == mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token, description: &str) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(description));
        }
        self.advance()
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::unexpected(self.current.position, expected, self.current.token.describe())
    }

    /// Parse primary expressions: literals, identifiers and `( ... )`
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.current.position;
        let expr = match mem::replace(&mut self.current.token, Token::Eof) {
            Token::Float(n) => Expr::Literal(Literal::Float(n)),
            Token::Integer(n) => Expr::Literal(Literal::Integer(n)),
            Token::String(s) => Expr::Literal(Literal::String(s)),
            Token::Boolean(b) => Expr::Literal(Literal::Boolean(b)),
            Token::Null => Expr::Literal(Literal::Null),
            Token::Identifier { name, modifier } => self.build_identifier(position, &name, modifier)?,
            Token::LParen => {
                self.advance()?;
                if self.check(&Token::RParen) {
                    return Err(self.unexpected("expression inside parentheses"));
                }
                let inner = self.parse_expression()?;
                self.expect(Token::RParen, "`)` or a logical operator")?;
                return Ok(Expr::group(inner));
            }
            token => {
                // put it back so the error names it
                self.current.token = token;
                return Err(self.unexpected("literal, identifier or `(`"));
            }
        };
        self.advance()?;
        Ok(expr)
    }

    fn build_identifier(
        &self,
        position: Position,
        name: &str,
        modifier: Option<Modifier>,
    ) -> Result<Expr, ParseError> {
        let Some(special) = name.strip_prefix('@') else {
            let ident = Identifier {
                scope: Scope::Record,
                path: name.split('.').map(str::to_string).collect(),
                modifier,
            };
            return self.validate_identifier(position, ident).map(Expr::Identifier);
        };

        let mut segments = special.split('.');
        let head = segments.next().unwrap_or_default();
        let rest: Vec<String> = segments.map(str::to_string).collect();

        match head {
            "request" => {
                let Some((scope_name, path)) = rest.split_first() else {
                    return Err(ParseError::unexpected(
                        position,
                        "`@request.<context|method|headers|query|body|auth>`",
                        format!("`{name}`"),
                    ));
                };
                let scope = RequestScope::from_name(scope_name).ok_or_else(|| {
                    ParseError::unexpected(
                        position,
                        "one of context, method, headers, query, body, auth after `@request.`",
                        format!("`{scope_name}`"),
                    )
                })?;
                if scope.is_terminal() && !path.is_empty() {
                    return Err(ParseError::unexpected(
                        position,
                        format!("no field after `@request.{scope_name}`"),
                        format!("`{name}`"),
                    ));
                }
                if !scope.is_terminal() && path.is_empty() {
                    return Err(ParseError::unexpected(
                        position,
                        format!("a field after `@request.{scope_name}`"),
                        format!("`{name}`"),
                    ));
                }
                let ident = Identifier {
                    scope: Scope::Request(scope),
                    path: path.to_vec(),
                    modifier,
                };
                self.validate_identifier(position, ident).map(Expr::Identifier)
            }
            "collection" => {
                let (collection, path) = match rest.split_first() {
                    Some((collection, path)) if !path.is_empty() => (collection, path),
                    _ => {
                        return Err(ParseError::unexpected(
                            position,
                            "`@collection.<name>.<field>`",
                            format!("`{name}`"),
                        ));
                    }
                };
                let ident = Identifier {
                    scope: Scope::Collection(collection.clone()),
                    path: path.to_vec(),
                    modifier,
                };
                self.validate_identifier(position, ident).map(Expr::Identifier)
            }
            _ => match Macro::from_name(head) {
                Some(m) if rest.is_empty() && modifier.is_none() => Ok(Expr::Literal(Literal::Macro(m))),
                Some(_) => Err(ParseError::unexpected(
                    position,
                    format!("bare macro `@{head}`"),
                    format!("`{name}`"),
                )),
                None => Err(ParseError::unexpected(
                    position,
                    "`@request.*`, `@collection.*` or a datetime macro",
                    format!("`{name}`"),
                )),
            },
        }
    }

    fn validate_identifier(
        &self,
        position: Position,
        ident: Identifier,
    ) -> Result<Identifier, ParseError> {
        let depth = ident.relation_depth();
        if depth > self.options.max_relation_depth {
            return Err(ParseError::unexpected(
                position,
                format!(
                    "at most {} relation levels",
                    self.options.max_relation_depth
                ),
                format!("{depth} levels in `{ident}`"),
            ));
        }
        if ident.modifier == Some(Modifier::IsSet)
            && !matches!(ident.scope, Scope::Request(scope) if scope.is_submitted_map())
        {
            return Err(ParseError::unexpected(
                position,
                "`:isset` on a `@request.body`, `@request.query` or `@request.headers` field",
                format!("`{ident}`"),
            ));
        }
        Ok(ident)
    }

    /// Parse one comparison, or a parenthesized group standing in for one.
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_primary()?;
        if matches!(left, Expr::Group(_)) {
            return Ok(left);
        }

        let op = match &self.current.token {
            Token::Operator(op) => *op,
            _ => return Err(self.unexpected("comparison operator")),
        };
        if op.any
            && let Expr::Identifier(ident) = &left
            && ident.modifier == Some(Modifier::Each)
        {
            return Err(self.unexpected("plain operator after `:each`"));
        }
        self.advance()?;

        let right_position = self.current.position;
        let right = self.parse_primary()?;
        if right.is_condition() {
            return Err(ParseError::unexpected(
                right_position,
                "literal or identifier",
                "parenthesized group",
            ));
        }
        if let Expr::Identifier(ident) = &right
            && ident.modifier == Some(Modifier::Each)
        {
            return Err(ParseError::unexpected(
                right_position,
                "`:each` only on the left operand",
                format!("`{ident}`"),
            ));
        }

        Ok(Expr::compare(op, left, right))
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        while self.check(&Token::And) {
            self.advance()?;
            let right = self.parse_comparison()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check(&Token::Or) {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    /// Parses the whole input. Empty or comment-only input is `AlwaysTrue`.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Eof) {
            return Ok(Expr::AlwaysTrue);
        }
        let expr = self.parse_expression()?;
        self.expect(Token::Eof, "`&&`, `||` or end of input")?;
        Ok(expr)
    }
}
