//! Placeholder binding for filter templates.
//!
//! Client code builds filters from untrusted input by writing `{:name}`
//! placeholders and binding values separately:
//!
//! ```
//! use record_rules::params::bind;
//! use serde_json::json;
//!
//! let params = json!({"title": "it's", "min": 10});
//! let filter = bind("title = {:title} && views > {:min}", params.as_object().unwrap());
//! assert_eq!(filter, r"title = 'it\'s' && views > 10");
//! ```
//!
//! Bound strings are always quoted literals, so a value can never close
//! its quote and inject operators.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde_json::{Map, Value as JsonValue};

use crate::value::format_datetime;

/// Replaces every `{:name}` whose name is in `params`; unknown
/// placeholders are left as written.
pub fn bind(template: &str, params: &Map<String, JsonValue>) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{:(\w+)\}").expect("placeholder regex must compile"));
    re.replace_all(template, |caps: &Captures<'_>| match params.get(&caps[1]) {
        Some(value) => literal(value),
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// Filter literal for a JSON value.
pub fn literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => number(n),
        JsonValue::String(s) => quote(s),
        JsonValue::Array(_) | JsonValue::Object(_) => quote(&value.to_string()),
    }
}

// The lexer has no exponent syntax, so large or tiny floats are spelled out.
fn number(n: &serde_json::Number) -> String {
    let text = n.to_string();
    match n.as_f64() {
        Some(f) if text.contains(['e', 'E']) => f.to_string(),
        _ => text,
    }
}

/// Datetime parameter in the record timestamp layout.
pub fn datetime_param(dt: &DateTime<Utc>) -> JsonValue {
    JsonValue::String(format_datetime(dt))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: JsonValue) -> Map<String, JsonValue> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_scalars_bind_bare() {
        let p = params(json!({"n": 1.5, "flag": true, "none": null}));
        assert_eq!(bind("a = {:n} && b = {:flag} && c = {:none}", &p), "a = 1.5 && b = true && c = null");
    }

    #[test]
    fn test_extreme_floats_bind_without_exponent() {
        use crate::{
            ast::{Expr, Literal},
            parser::parse,
        };

        for n in [1e300, 1.5e-7, -2.5e21] {
            let filter = bind("a > {:n}", &params(json!({ "n": n })));
            assert!(!filter.contains(['e', 'E']), "{filter}");
            match parse(&filter) {
                Ok(Expr::Compare { right, .. }) => assert_eq!(*right, Expr::Literal(Literal::Float(n))),
                other => panic!("{filter} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let p = params(json!({"a": 1}));
        assert_eq!(bind("x = {:b} || y = {:a}", &p), "x = {:b} || y = 1");
    }

    #[test]
    fn test_injection_stays_quoted() {
        let p = params(json!({"q": "x' || id != '"}));
        assert_eq!(bind("title = {:q}", &p), r"title = 'x\' || id != \''");
    }

    #[test]
    fn test_structured_values_serialized() {
        let p = params(json!({"tags": ["a", "b"]}));
        assert_eq!(bind("meta = {:tags}", &p), r#"meta = '["a","b"]'"#);
    }
}
