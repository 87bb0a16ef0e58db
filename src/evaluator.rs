use std::{cmp::Ordering, sync::Arc};

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{BinOp, Expr, Identifier, Literal, LogicalOp, Modifier, Operator},
    macros::{Clock, SystemClock, resolve_macro},
    record::Record,
    request::RequestInfo,
    resolver::{JoinError, JoinResolver, NoJoins, Resolved, is_set, resolve},
    value::Value,
};

/// Everything one evaluation may read: the target record, the request,
/// and the join capability.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub record: &'a Record,
    pub request: &'a RequestInfo,
    pub joins: &'a dyn JoinResolver,
}

impl<'a> EvalContext<'a> {
    pub fn new(record: &'a Record, request: &'a RequestInfo) -> Self {
        EvalContext {
            record,
            request,
            joins: &NoJoins,
        }
    }

    /// Create a new context using `joins` for `@collection` lookups
    pub fn with_joins(self, joins: &'a dyn JoinResolver) -> Self {
        EvalContext { joins, ..self }
    }
}

/// Errors that can occur during filter evaluation.
///
/// Callers gating access treat every variant as a deny.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Operand of the wrong kind for the operation
    #[error("Type error: {0}")]
    TypeError(String),

    /// Multi-valued operand used with a plain operator
    #[error("Array operand `{operand}` cannot be compared with `{op}`; use `?{op}` to match any element")]
    ArrayOperand { operand: String, op: &'static str },

    /// The join resolver failed
    #[error("Join error: {0}")]
    Join(#[from] JoinError),
}

/// The filter evaluator.
///
/// Holds no per-call state: one evaluator can serve any number of
/// concurrent evaluations of shared, immutable expressions.
#[derive(Debug, Clone)]
pub struct Evaluator {
    clock: Arc<dyn Clock>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator {
            clock: Arc::new(SystemClock),
        }
    }
}

/// A comparison operand after resolution.
enum Operand {
    Scalar(Value),
    Multi(Vec<Value>),
    Missing,
}

impl Operand {
    fn into_items(self) -> Vec<Value> {
        match self {
            Operand::Scalar(v) => vec![v],
            Operand::Multi(vs) => vs,
            Operand::Missing => Vec::new(),
        }
    }
}

impl Evaluator {
    /// Creates an evaluator reading the system clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator reading `clock` for datetime macros.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Evaluator { clock }
    }

    /// Evaluates a filter expression against a record and request.
    ///
    /// # Examples
    ///
    /// ```
    /// use record_rules::{EvalContext, Evaluator, Record, RequestInfo, parser};
    ///
    /// let expr = parser::parse(r#"status = "published""#).unwrap();
    /// let record = Record::new("posts", "p1").with_field("status", "published");
    /// let request = RequestInfo::default();
    ///
    /// let evaluator = Evaluator::new();
    /// let matched = evaluator.evaluate(&expr, &EvalContext::new(&record, &request)).unwrap();
    /// assert!(matched);
    /// ```
    pub fn evaluate(&self, expr: &Expr, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        match expr {
            Expr::AlwaysTrue => Ok(true),
            Expr::Group(inner) => self.evaluate(inner, ctx),
            Expr::Compare { op, left, right } => self.eval_compare(*op, left, right, ctx),
            Expr::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => {
                if !self.evaluate(left, ctx)? {
                    return Ok(false);
                }
                self.evaluate(right, ctx)
            }
            Expr::Logical {
                op: LogicalOp::Or,
                left,
                right,
            } => {
                let mut first_error = None;
                for side in [left, right] {
                    match self.evaluate(side, ctx) {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(e) => {
                            debug!(error = %e, "skipping failed branch of `||`");
                            first_error.get_or_insert(e);
                        }
                    }
                }
                first_error.map_or(Ok(false), Err)
            }
            Expr::Literal(Literal::Boolean(b)) => Ok(*b),
            Expr::Literal(_) | Expr::Identifier(_) => Err(EvalError::TypeError(
                "operand used where a condition is required".to_string(),
            )),
        }
    }

    /// Fail-closed evaluation: errors count as no match.
    pub fn matches(&self, expr: &Expr, ctx: &EvalContext<'_>) -> bool {
        self.evaluate(expr, ctx).unwrap_or(false)
    }

    fn eval_compare(
        &self,
        op: Operator,
        left: &Expr,
        right: &Expr,
        ctx: &EvalContext<'_>,
    ) -> Result<bool, EvalError> {
        let each = matches!(left, Expr::Identifier(ident) if ident.modifier == Some(Modifier::Each));
        let left_join = is_join(left);
        let right_join = is_join(right);

        let left_val = self.eval_operand(left, ctx)?;
        let right_val = self.eval_operand(right, ctx)?;

        if matches!(left_val, Operand::Missing) || matches!(right_val, Operand::Missing) {
            return Ok(false);
        }
        if matches!(left_val, Operand::Multi(_)) && !(op.any || each || left_join) {
            return Err(array_operand(left, op.op));
        }
        if matches!(right_val, Operand::Multi(_)) && !right_join {
            return Err(array_operand(right, op.op));
        }

        let lefts = left_val.into_items();
        let rights = right_val.into_items();
        let satisfied = |l: &Value| rights.iter().any(|r| compare_scalars(op.op, l, r));

        if each {
            Ok(!lefts.is_empty() && lefts.iter().all(satisfied))
        } else {
            Ok(lefts.iter().any(satisfied))
        }
    }

    fn eval_operand(&self, expr: &Expr, ctx: &EvalContext<'_>) -> Result<Operand, EvalError> {
        match expr {
            Expr::Literal(Literal::Macro(m)) => Ok(Operand::Scalar(resolve_macro(*m, self.clock.now()))),
            Expr::Literal(lit) => Ok(Operand::Scalar(literal_value(lit))),
            Expr::Identifier(ident) => self.eval_identifier(ident, ctx),
            _ => Err(EvalError::TypeError(
                "condition used where an operand is required".to_string(),
            )),
        }
    }

    fn eval_identifier(&self, ident: &Identifier, ctx: &EvalContext<'_>) -> Result<Operand, EvalError> {
        if ident.modifier == Some(Modifier::IsSet) {
            return Ok(Operand::Scalar(Value::Boolean(is_set(ident, ctx.request))));
        }

        let operand = match resolve(ident, ctx.record, ctx.request, ctx.joins)? {
            Resolved::Value(Value::Array(items)) | Resolved::Many(items) => Operand::Multi(items),
            Resolved::Value(v) => Operand::Scalar(v),
            Resolved::Unresolved => Operand::Missing,
        };

        match ident.modifier {
            Some(Modifier::Length) => length(operand, ident),
            Some(Modifier::Lower) => Ok(lower(operand)),
            _ => Ok(operand),
        }
    }
}

fn is_join(expr: &Expr) -> bool {
    matches!(expr, Expr::Identifier(ident) if ident.is_join() && ident.modifier != Some(Modifier::Length))
}

fn array_operand(expr: &Expr, op: BinOp) -> EvalError {
    EvalError::ArrayOperand {
        operand: expr.to_string(),
        op: op.symbol(),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Float(n) => Value::Float(*n),
        Literal::Integer(n) => Value::Integer(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Null | Literal::Macro(_) => Value::Null,
    }
}

fn length(operand: Operand, ident: &Identifier) -> Result<Operand, EvalError> {
    let len = match &operand {
        Operand::Missing => return Ok(Operand::Missing),
        Operand::Multi(items) => items.len(),
        Operand::Scalar(Value::String(s)) => s.chars().count(),
        Operand::Scalar(Value::Null) => 0,
        Operand::Scalar(Value::Object(map)) => map.len(),
        Operand::Scalar(other) => {
            return Err(EvalError::TypeError(format!(
                "`{ident}` is a {}, which has no length",
                other.type_name()
            )));
        }
    };
    Ok(Operand::Scalar(Value::Integer(
        i64::try_from(len).unwrap_or(i64::MAX),
    )))
}

fn lower(operand: Operand) -> Operand {
    let lower_one = |v: Value| match v {
        Value::Null => Value::Null,
        other => Value::String(other.as_string().to_lowercase()),
    };
    match operand {
        Operand::Scalar(v) => Operand::Scalar(lower_one(v)),
        Operand::Multi(vs) => Operand::Multi(vs.into_iter().map(lower_one).collect()),
        Operand::Missing => Operand::Missing,
    }
}

/// Applies a base operator to two scalar values.
pub fn compare_scalars(op: BinOp, left: &Value, right: &Value) -> bool {
    match op {
        BinOp::Like => left.contains(right),
        BinOp::NotLike => !left.contains(right),
        BinOp::Equal => left.compare(right) == Ordering::Equal,
        BinOp::NotEqual => left.compare(right) != Ordering::Equal,
        BinOp::GreaterThan => left.compare(right) == Ordering::Greater,
        BinOp::GreaterEqual => left.compare(right) != Ordering::Less,
        BinOp::LessThan => left.compare(right) == Ordering::Less,
        BinOp::LessEqual => left.compare(right) != Ordering::Greater,
    }
}
