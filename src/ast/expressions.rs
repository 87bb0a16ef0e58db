use crate::ast::{Identifier, LogicalOp, Macro, Operator};

/// Constant operand of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Literal decimal number
    ///
    /// # Example
    /// ```text
    /// 4.5
    /// ```
    Float(f64),

    /// Literal integer
    ///
    /// # Example
    /// ```text
    /// 42
    /// ```
    Integer(i64),

    /// String literal
    ///
    /// # Example
    /// ```text
    /// "published"
    /// ```
    String(String),

    /// Boolean literal
    Boolean(bool),

    /// Null literal
    Null,

    /// Datetime macro placeholder (`@now`, `@todayStart`, ...).
    ///
    /// Never folded into a constant: every evaluation reads the clock.
    Macro(Macro),
}

/// Abstract Syntax Tree node of a filter expression.
///
/// A tree is built once by the parser and then only read; compiled rules
/// share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Produced by empty or comment-only input
    AlwaysTrue,

    /// Constant operand
    Literal(Literal),

    /// Field or request reference
    ///
    /// # Examples
    /// ```text
    /// status
    /// author.name
    /// @request.auth.id
    /// ```
    Identifier(Identifier),

    /// Single comparison between two operands
    ///
    /// # Examples
    /// ```text
    /// views > 50
    /// tags.id ?= "T1"
    /// ```
    Compare {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `&&` / `||` combination
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Parenthesized sub-expression
    ///
    /// # Example
    /// ```text
    /// (status = "published" || featured = true)
    /// ```
    Group(Box<Expr>),
}

impl Expr {
    pub fn compare(op: Operator, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn group(inner: Expr) -> Self {
        Expr::Group(Box::new(inner))
    }

    /// Whether the expression is a complete boolean term rather than an
    /// operand.
    pub fn is_condition(&self) -> bool {
        matches!(
            self,
            Expr::AlwaysTrue | Expr::Compare { .. } | Expr::Logical { .. } | Expr::Group(_)
        )
    }

    /// Collects every identifier in the tree, left to right.
    pub fn identifiers(&self) -> Vec<&Identifier> {
        let mut found = Vec::new();
        self.collect_identifiers(&mut found);
        found
    }

    fn collect_identifiers<'a>(&'a self, found: &mut Vec<&'a Identifier>) {
        match self {
            Expr::Identifier(ident) => found.push(ident),
            Expr::Compare { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.collect_identifiers(found);
                right.collect_identifiers(found);
            }
            Expr::Group(inner) => inner.collect_identifiers(found),
            Expr::AlwaysTrue | Expr::Literal(_) => {}
        }
    }
}
