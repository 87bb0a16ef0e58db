//! # Filter Expression Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the record filter
//! language, the expression language shared by client-supplied list filters
//! and server-configured collection rules.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, identifiers, comparisons, groups)
//! - **[operators]** - Comparison and logical operators
//! - **[identifiers]** - Field paths, `@request` / `@collection` scopes, modifiers and macros
//!
//! ## Quick Start
//!
//! ```text
//! status = "published" && @request.auth.id != ""
//! ```
//!
//! Matches published records when the caller is authenticated.
//!
//! ## Core Concepts
//!
//! ### Comparisons
//!
//! Every condition is a single comparison `operand OP operand`:
//!
//! ```text
//! =  !=  >  >=  <  <=  ~  !~
//! ```
//!
//! Prefixing an operator with `?` turns it into an any-of comparison over
//! a multi-valued left operand:
//!
//! ```text
//! tags.name ?= "rust"
//! ```
//!
//! ### Precedence
//!
//! `&&` binds tighter than `||`; both are left-associative. Parentheses group.
//!
//! ### Identifiers
//!
//! - `field`, `relation.field` - the record and its expanded relations
//! - `comments_via_post.text` - back-relation (records pointing at this one)
//! - `@request.auth.*`, `@request.body.*`, `@request.query.*`,
//!   `@request.headers.*`, `@request.method`, `@request.context`
//! - `@collection.<name>.<field>` - lookup in another collection
//! - `@now`, `@todayStart`, ... - datetime macros
//!
//! ### Modifiers
//!
//! ```text
//! @request.body.role:isset = false
//! tags:length > 2
//! title:lower ~ "draft"
//! scores:each > 10
//! ```
//!
//! ## Examples
//!
//! ```text
//! (status = "published" || featured = true) && views > 50
//! created >= @todayStart // created today
//! ```
pub mod expressions;
pub mod identifiers;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, Literal};
pub use identifiers::{Identifier, Macro, Modifier, RequestScope, Scope};
pub use operators::{BinOp, LogicalOp, Operator};
pub use tokens::{SpannedToken, Token};
