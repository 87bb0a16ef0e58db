//! Evaluate filters and collection rules against a JSON payload

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue, json};

use super::{CliError, parse_payload};
use crate::{
    EngineConfig, EvalContext, Evaluator, RuleRegistry,
    params::bind,
    rules::{Action, Caller, CompiledRule, Decision, Denial, ListAccess, RuleGate},
};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Filter text; with `collection` set, the client filter for `list`
    pub filter: Option<String>,
    /// JSON payload string
    pub input: Option<String>,
    /// Values for `{:name}` placeholders in the filter
    pub params: Map<String, JsonValue>,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// Check this collection's rule instead of a bare filter
    pub collection: Option<String>,
    /// Rule to check, `view` when unset
    pub action: Option<Action>,
    pub config: EngineConfig,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid { canonical: String },
    /// Evaluation finished with a JSON report
    Success(JsonValue),
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let filter = options.filter.as_deref().map(|f| bind(f, &options.params));
    let registry = RuleRegistry::with_config(options.config);

    if options.syntax_only {
        let source = filter.ok_or(CliError::NoFilter)?;
        let compiled = registry.compile_filter(&source)?;
        return Ok(CheckResult::SyntaxValid {
            canonical: compiled.expr().to_string(),
        });
    }

    let json_str = options.input.as_deref().ok_or(CliError::NoInput)?;
    let payload = parse_payload(json_str)?;
    let evaluator = match payload.clock()? {
        Some(clock) => Evaluator::with_clock(Arc::new(clock)),
        None => Evaluator::new(),
    };
    let joins = payload.joins();
    let ctx = EvalContext::new(&payload.record, &payload.request).with_joins(&joins);

    let Some(collection) = &options.collection else {
        let source = filter.ok_or(CliError::NoFilter)?;
        let compiled = registry.compile_filter(&source)?;
        let matched = evaluator.evaluate(compiled.expr(), &ctx)?;
        return Ok(CheckResult::Success(json!({
            "filter": compiled.expr().to_string(),
            "matched": matched,
        })));
    };

    for def in &payload.definitions {
        registry.upsert(def)?;
    }
    let rules = registry
        .get(collection)
        .ok_or_else(|| CliError::UnknownCollection(collection.clone()))?;
    let action = options.action.unwrap_or(Action::View);
    let rule = rules.rule(action);
    let caller = Caller::from_request(&payload.request);
    let gate = RuleGate::with_evaluator(evaluator);

    if action != Action::List {
        let decision = gate.check(action, rule, caller, &ctx);
        return Ok(CheckResult::Success(report(decision, caller)?));
    }

    let client_filter = filter
        .map(|source| registry.compile_filter(&source))
        .transpose()?;
    let result = match gate.list(rule, caller, client_filter.as_ref().map(CompiledRule::expr)) {
        ListAccess::Forbidden => report(
            Decision::Deny {
                reason: Denial::Forbidden,
            },
            caller,
        )?,
        ListAccess::Rows(predicate) => {
            let rows = payload
                .collections
                .get(collection)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let items: Vec<&str> = gate
                .filter_rows(&predicate, rows, &payload.request, &joins)
                .into_iter()
                .map(|row| row.id.as_str())
                .collect();
            let mut out = report(Decision::Allow, caller)?;
            out["filter"] = json!(predicate.to_filter_string());
            out["items"] = json!(items);
            out
        }
    };
    Ok(CheckResult::Success(result))
}

fn report(decision: Decision, caller: Caller) -> Result<JsonValue, CliError> {
    let mut out = serde_json::to_value(decision)?;
    out["status"] = json!(decision.status_code());
    out["caller"] = serde_json::to_value(caller)?;
    Ok(out)
}
