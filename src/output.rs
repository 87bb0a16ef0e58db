//! Canonical filter text for expression trees.
//!
//! Rendering is the inverse of parsing: for any tree the parser builds,
//! parsing the rendered text yields the same tree. List predicates travel
//! to the data layer in this form.
//!
//! # Features
//!
//! - **Single spacing** around every operator
//! - **Double-quoted strings** with `"` and `\` escaped
//! - **Floats keep their point** so `3.0` does not come back as an integer
//! - **Minimal parentheses** - only explicit groups, plus whatever a
//!   hand-built tree needs to keep its shape
//!
//! # Examples
//!
//! ```
//! use record_rules::{output::to_filter_string, parser::parse};
//!
//! let expr = parse("status='published'   &&views>50").unwrap();
//! assert_eq!(to_filter_string(&expr), r#"status = "published" && views > 50"#);
//! ```

use std::fmt;

use crate::ast::{Expr, Literal, LogicalOp};

pub struct FilterPrinter;

impl FilterPrinter {
    pub fn print(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.print_expr(expr, &mut out);
        out
    }

    fn print_expr(&self, expr: &Expr, out: &mut String) {
        match expr {
            Expr::AlwaysTrue => {}
            Expr::Literal(lit) => out.push_str(&self.print_literal(lit)),
            Expr::Identifier(ident) => out.push_str(&ident.to_string()),
            Expr::Compare { op, left, right } => {
                self.print_expr(left, out);
                out.push(' ');
                out.push_str(&op.to_string());
                out.push(' ');
                self.print_expr(right, out);
            }
            Expr::Logical { op, left, right } => {
                self.print_operand(left, needs_parens(*op, left, false), out);
                out.push(' ');
                out.push_str(&op.to_string());
                out.push(' ');
                self.print_operand(right, needs_parens(*op, right, true), out);
            }
            Expr::Group(inner) => {
                out.push('(');
                self.print_expr(inner, out);
                out.push(')');
            }
        }
    }

    fn print_operand(&self, expr: &Expr, parens: bool, out: &mut String) {
        if parens {
            out.push('(');
        }
        self.print_expr(expr, out);
        if parens {
            out.push(')');
        }
    }

    fn print_literal(&self, lit: &Literal) -> String {
        match lit {
            Literal::Float(n) => {
                let s = n.to_string();
                if s.contains('.') || !n.is_finite() {
                    s
                } else {
                    format!("{s}.0")
                }
            }
            Literal::Integer(n) => n.to_string(),
            Literal::String(s) => format!("\"{}\"", self.escape_string(s)),
            Literal::Boolean(b) => b.to_string(),
            Literal::Null => "null".to_string(),
            Literal::Macro(m) => format!("@{}", m.name()),
        }
    }

    fn escape_string(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match c {
                '"' => vec!['\\', '"'],
                '\\' => vec!['\\', '\\'],
                c => vec![c],
            })
            .collect()
    }
}

/// Whether a logical operand must be wrapped to survive re-parsing.
///
/// Parsed trees never need this: `&&` under `||` binds tighter anyway and
/// chains lean left. Hand-built trees may nest either way.
fn needs_parens(parent: LogicalOp, child: &Expr, is_right: bool) -> bool {
    match child {
        Expr::Logical { op, .. } => {
            (parent == LogicalOp::And && *op == LogicalOp::Or) || (is_right && *op == parent)
        }
        _ => false,
    }
}

/// Renders `expr` as canonical filter text.
pub fn to_filter_string(expr: &Expr) -> String {
    FilterPrinter.print(expr)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_filter_string(self))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&FilterPrinter.print_literal(self))
    }
}
