use crate::ast::{Modifier, Operator};
use crate::lexer::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Decimal number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// -1.5
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -10
    /// ```
    Integer(i64),

    /// String literal enclosed in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "published"
    /// 'it\'s'
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// Null value
    Null,

    // Identifiers
    /// Dotted field path or `@`-prefixed special identifier, with an
    /// optional attached modifier.
    ///
    /// # Examples
    /// ```text
    /// status
    /// author.profile.name
    /// @request.auth.id
    /// @request.body.title:isset
    /// @now
    /// ```
    Identifier {
        name: String,
        modifier: Option<Modifier>,
    },

    // Operators
    /// Comparison operator, plain or any-of
    ///
    /// # Examples
    /// ```text
    /// =   !=   >=   ~
    /// ?=  ?!=  ?~
    /// ```
    Operator(Operator),

    /// Logical AND (`&&`)
    And,

    /// Logical OR (`||`)
    Or,

    // Delimiters
    /// Left parenthesis for grouping
    LParen,

    /// Right parenthesis
    RParen,

    /// End of input
    Eof,
}

impl Token {
    /// Short human-readable description used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Float(n) => format!("number {n}"),
            Token::Integer(n) => format!("number {n}"),
            Token::String(s) => format!("string {s:?}"),
            Token::Boolean(b) => format!("{b}"),
            Token::Null => "null".to_string(),
            Token::Identifier { name, modifier: None } => format!("identifier `{name}`"),
            Token::Identifier {
                name,
                modifier: Some(m),
            } => format!("identifier `{name}:{m}`"),
            Token::Operator(op) => format!("operator `{op}`"),
            Token::And => "`&&`".to_string(),
            Token::Or => "`||`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// A token together with the position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub position: Position,
}
