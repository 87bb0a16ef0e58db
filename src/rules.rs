//! Access rules and the gate that enforces them.
//!
//! Every collection carries one rule per [`Action`]. A rule's raw value
//! decides its shape:
//!
//! - JSON `null` locks the action to superusers,
//! - `""` makes it public,
//! - any other string is a filter the record and request must satisfy.
//!
//! ```
//! use record_rules::{Action, Caller, EvalContext, Record, RequestInfo, Rule, RuleGate};
//!
//! let rule = Rule::from_raw(Some(r#"status = "published""#)).unwrap();
//! let record = Record::new("posts", "p1").with_field("status", "draft");
//! let request = RequestInfo::default();
//!
//! let decision = RuleGate::new().check(
//!     Action::View,
//!     &rule,
//!     Caller::Anonymous,
//!     &EvalContext::new(&record, &request),
//! );
//! assert_eq!(decision.status_code(), 404);
//! ```

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{trace, warn};

use crate::{
    ast::Expr,
    evaluator::{EvalContext, Evaluator},
    lexer::{LexError, Lexer},
    parser::{ParseError, ParseOptions, Parser},
    record::Record,
    request::RequestInfo,
    resolver::JoinResolver,
};

/// Operations a collection rule can guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    List,
    View,
    Create,
    Update,
    Delete,
    /// Managing other auth records (auth collections only)
    Manage,
    /// Authenticating against the collection (auth collections only)
    Auth,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::List,
        Action::View,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Manage,
        Action::Auth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
            Action::Auth => "auth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// How an unsatisfied conditional rule surfaces for this action.
    pub fn denial(self) -> Denial {
        match self {
            Action::List => Denial::EmptyList,
            Action::Create | Action::Auth => Denial::BadRequest,
            Action::View | Action::Update | Action::Delete => Denial::NotFound,
            Action::Manage => Denial::Forbidden,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure to turn rule or filter text into an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Filter is {length} characters long; at most {max} are allowed")]
    TooLong { length: usize, max: usize },

    #[error(transparent)]
    Lex(LexError),

    #[error(transparent)]
    Parse(ParseError),
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Lex(e) => CompileError::Lex(e),
            other => CompileError::Parse(other),
        }
    }
}

/// A parsed filter together with the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    source: String,
    expr: Expr,
}

impl CompiledRule {
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        Self::compile_with(source, ParseOptions::default())
    }

    pub fn compile_with(source: &str, options: ParseOptions) -> Result<Self, CompileError> {
        let length = source.chars().count();
        if length > options.max_expression_length {
            return Err(CompileError::TooLong {
                length,
                max: options.max_expression_length,
            });
        }
        let expr = Parser::with_options(Lexer::new(source), options)?.parse()?;
        Ok(CompiledRule {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

/// One configured rule slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Rule {
    /// Superusers only
    #[default]
    Locked,
    /// Everyone
    Public,
    /// Callers for whom the expression holds
    Conditional(Arc<CompiledRule>),
}

impl Rule {
    /// Builds a rule from its raw configured value.
    pub fn from_raw(raw: Option<&str>) -> Result<Self, CompileError> {
        Self::from_raw_with(raw, |source| CompiledRule::compile(source).map(Arc::new))
    }

    /// Like [`Rule::from_raw`], compiling conditional rules with `compile`
    /// (usually a cache lookup).
    pub fn from_raw_with<F>(raw: Option<&str>, compile: F) -> Result<Self, CompileError>
    where
        F: FnOnce(&str) -> Result<Arc<CompiledRule>, CompileError>,
    {
        match raw {
            None => Ok(Rule::Locked),
            Some(source) if source.trim().is_empty() => Ok(Rule::Public),
            Some(source) => compile(source).map(Rule::Conditional),
        }
    }

    /// The raw value this rule was built from.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Rule::Locked => None,
            Rule::Public => Some(""),
            Rule::Conditional(compiled) => Some(compiled.source()),
        }
    }
}

/// Who is asking, as far as rules are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Caller {
    Anonymous,
    Authenticated,
    Superuser,
}

impl Caller {
    pub fn from_request(request: &RequestInfo) -> Self {
        match &request.auth {
            None => Caller::Anonymous,
            Some(auth) if auth.is_superuser() => Caller::Superuser,
            Some(_) => Caller::Authenticated,
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Denial {
    /// List succeeds with no items
    EmptyList,
    BadRequest,
    NotFound,
    Forbidden,
}

impl Denial {
    pub fn status_code(self) -> u16 {
        match self {
            Denial::EmptyList => 200,
            Denial::BadRequest => 400,
            Denial::NotFound => 404,
            Denial::Forbidden => 403,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny { reason: Denial },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Decision::Allow => 200,
            Decision::Deny { reason } => reason.status_code(),
        }
    }

    fn deny(reason: Denial) -> Self {
        Decision::Deny { reason }
    }
}

/// Row restriction for a list request: the list rule and the client's
/// filter, both of which every returned row must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    expr: Expr,
}

impl Predicate {
    fn combine(rule: Option<&Expr>, filter: Option<&Expr>) -> Self {
        let terms: Vec<Expr> = [rule, filter]
            .into_iter()
            .flatten()
            .filter(|e| **e != Expr::AlwaysTrue)
            .cloned()
            .collect();
        let expr = match terms.len() {
            0 => Expr::AlwaysTrue,
            1 => terms.into_iter().next().unwrap_or(Expr::AlwaysTrue),
            _ => terms
                .into_iter()
                .map(parenthesize)
                .reduce(Expr::and)
                .unwrap_or(Expr::AlwaysTrue),
        };
        Predicate { expr }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Whether every row passes.
    pub fn is_unrestricted(&self) -> bool {
        self.expr == Expr::AlwaysTrue
    }

    /// Canonical filter text for the data layer.
    pub fn to_filter_string(&self) -> String {
        self.expr.to_string()
    }
}

fn parenthesize(expr: Expr) -> Expr {
    match expr {
        Expr::Logical { .. } => Expr::group(expr),
        other => other,
    }
}

/// Outcome of a list request.
#[derive(Debug, Clone, PartialEq)]
pub enum ListAccess {
    /// Locked list rule and the caller is no superuser
    Forbidden,
    /// Return only rows satisfying the predicate
    Rows(Predicate),
}

/// Applies rules to callers.
///
/// Stateless apart from the evaluator; share one per process.
#[derive(Debug, Clone, Default)]
pub struct RuleGate {
    evaluator: Evaluator,
}

impl RuleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_evaluator(evaluator: Evaluator) -> Self {
        RuleGate { evaluator }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Decides a single-record action.
    ///
    /// Locked and public rules never reach the evaluator; superusers
    /// bypass every rule. Evaluation errors deny.
    pub fn check(&self, action: Action, rule: &Rule, caller: Caller, ctx: &EvalContext<'_>) -> Decision {
        let decision = match rule {
            Rule::Public => Decision::Allow,
            _ if caller == Caller::Superuser => Decision::Allow,
            Rule::Locked => Decision::deny(Denial::Forbidden),
            Rule::Conditional(compiled) => match self.evaluator.evaluate(compiled.expr(), ctx) {
                Ok(true) => Decision::Allow,
                Ok(false) => Decision::deny(action.denial()),
                Err(e) => {
                    warn!(
                        %action,
                        rule = compiled.source(),
                        record = %ctx.record.id,
                        error = %e,
                        "rule evaluation failed, denying"
                    );
                    Decision::deny(action.denial())
                }
            },
        };
        trace!(%action, ?caller, ?decision, "rule decision");
        decision
    }

    /// Decides a list request, producing the predicate rows must satisfy.
    pub fn list(&self, rule: &Rule, caller: Caller, client_filter: Option<&Expr>) -> ListAccess {
        let access = match rule {
            Rule::Locked if caller != Caller::Superuser => ListAccess::Forbidden,
            Rule::Conditional(compiled) if caller != Caller::Superuser => {
                ListAccess::Rows(Predicate::combine(Some(compiled.expr()), client_filter))
            }
            _ => ListAccess::Rows(Predicate::combine(None, client_filter)),
        };
        trace!(?caller, ?access, "list decision");
        access
    }

    /// Applies a list predicate to an in-memory row set.
    pub fn filter_rows<'r>(
        &self,
        predicate: &Predicate,
        rows: &'r [Record],
        request: &RequestInfo,
        joins: &dyn JoinResolver,
    ) -> Vec<&'r Record> {
        if predicate.is_unrestricted() {
            return rows.iter().collect();
        }
        rows.iter()
            .filter(|row| {
                let ctx = EvalContext::new(row, request).with_joins(joins);
                match self.evaluator.evaluate(predicate.expr(), &ctx) {
                    Ok(keep) => keep,
                    Err(e) => {
                        warn!(record = %row.id, error = %e, "row filter evaluation failed, skipping row");
                        false
                    }
                }
            })
            .collect()
    }
}

/// Collection flavors; only auth collections carry `manage` and `auth` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    #[default]
    Base,
    Auth,
    View,
}

/// Collection definition as stored: raw rule values keyed the usual way.
///
/// ```
/// use record_rules::CollectionDef;
///
/// let def: CollectionDef = serde_json::from_str(r#"{
///     "name": "posts",
///     "listRule": "",
///     "viewRule": "status = 'published'",
///     "createRule": null
/// }"#).unwrap();
/// assert_eq!(def.list_rule.as_deref(), Some(""));
/// assert_eq!(def.create_rule, None);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CollectionKind,
    #[serde(default)]
    pub list_rule: Option<String>,
    #[serde(default)]
    pub view_rule: Option<String>,
    #[serde(default)]
    pub create_rule: Option<String>,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
    #[serde(default)]
    pub manage_rule: Option<String>,
    #[serde(default)]
    pub auth_rule: Option<String>,
}

impl CollectionDef {
    pub fn raw_rule(&self, action: Action) -> Option<&str> {
        let raw = match action {
            Action::List => &self.list_rule,
            Action::View => &self.view_rule,
            Action::Create => &self.create_rule,
            Action::Update => &self.update_rule,
            Action::Delete => &self.delete_rule,
            Action::Manage => &self.manage_rule,
            Action::Auth => &self.auth_rule,
        };
        raw.as_deref()
    }
}

/// A rule that failed to compile, with the slot it was configured in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {action} rule: {source}")]
pub struct RuleError {
    pub action: Action,
    #[source]
    pub source: CompileError,
}

/// Compiled rules of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRules {
    pub name: String,
    pub kind: CollectionKind,
    rules: [Rule; 7],
}

impl CollectionRules {
    pub fn compile(def: &CollectionDef) -> Result<Self, RuleError> {
        Self::compile_with(def, |source| CompiledRule::compile(source).map(Arc::new))
    }

    /// Compiles every slot with `compile`; the first failure aborts.
    ///
    /// Slots a collection kind does not support stay locked whatever the
    /// definition says.
    pub fn compile_with<F>(def: &CollectionDef, mut compile: F) -> Result<Self, RuleError>
    where
        F: FnMut(&str) -> Result<Arc<CompiledRule>, CompileError>,
    {
        let mut rules: [Rule; 7] = Default::default();
        for (slot, action) in rules.iter_mut().zip(Action::ALL) {
            if !supports(def.kind, action) {
                continue;
            }
            *slot = Rule::from_raw_with(def.raw_rule(action), &mut compile)
                .map_err(|source| RuleError { action, source })?;
        }
        Ok(CollectionRules {
            name: def.name.clone(),
            kind: def.kind,
            rules,
        })
    }

    pub fn rule(&self, action: Action) -> &Rule {
        &self.rules[action as usize]
    }

    /// Raw text of every conditional rule.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|rule| match rule {
            Rule::Conditional(compiled) => Some(compiled.source()),
            _ => None,
        })
    }
}

fn supports(kind: CollectionKind, action: Action) -> bool {
    match action {
        Action::Manage | Action::Auth => kind == CollectionKind::Auth,
        Action::Create | Action::Update | Action::Delete => kind != CollectionKind::View,
        Action::List | Action::View => true,
    }
}
