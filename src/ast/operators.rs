use std::fmt;

/// Base comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    /// Equal (`=`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Substring containment (`~`)
    Like,
    /// Negated substring containment (`!~`)
    NotLike,
}

impl BinOp {
    pub const ALL: [BinOp; 8] = [
        BinOp::Equal,
        BinOp::NotEqual,
        BinOp::GreaterThan,
        BinOp::GreaterEqual,
        BinOp::LessThan,
        BinOp::LessEqual,
        BinOp::Like,
        BinOp::NotLike,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Equal => "=",
            BinOp::NotEqual => "!=",
            BinOp::GreaterThan => ">",
            BinOp::GreaterEqual => ">=",
            BinOp::LessThan => "<",
            BinOp::LessEqual => "<=",
            BinOp::Like => "~",
            BinOp::NotLike => "!~",
        }
    }
}

/// A comparison operator as written in a filter.
///
/// `any` is set for the `?`-prefixed forms (`?=`, `?~`, ...), which succeed
/// when at least one element of the left operand satisfies `op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operator {
    pub op: BinOp,
    pub any: bool,
}

impl Operator {
    pub const fn plain(op: BinOp) -> Self {
        Operator { op, any: false }
    }

    pub const fn any_of(op: BinOp) -> Self {
        Operator { op, any: true }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.any {
            f.write_str("?")?;
        }
        f.write_str(self.op.symbol())
    }
}

/// Logical combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    /// Logical AND (`&&`)
    And,
    /// Logical OR (`||`)
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => f.write_str("&&"),
            LogicalOp::Or => f.write_str("||"),
        }
    }
}
