use std::collections::HashMap;

use serde::Deserialize;

use crate::{record::Record, value::Value};

/// Values of `@request.context`.
pub mod contexts {
    pub const DEFAULT: &str = "default";
    pub const OAUTH2: &str = "oauth2";
    pub const OTP: &str = "otp";
    pub const PASSWORD: &str = "password";
    pub const REALTIME: &str = "realtime";
    pub const PROTECTED_FILE: &str = "protectedFile";
}

/// Header names are matched lower-cased with `-` replaced by `_`.
pub fn normalize_header_name(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

/// Snapshot of the request a rule is evaluated for.
///
/// `body` and `query` keep exactly the keys the client submitted so that
/// `:isset` can tell a missing key from an explicit `null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequestInfo {
    pub method: String,
    pub context: String,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, Value>,
    pub body: HashMap<String, Value>,
    pub auth: Option<Record>,
}

impl Default for RequestInfo {
    fn default() -> Self {
        RequestInfo {
            method: "GET".to_string(),
            context: contexts::DEFAULT.to_string(),
            headers: HashMap::new(),
            query: HashMap::new(),
            body: HashMap::new(),
            auth: None,
        }
    }
}

impl RequestInfo {
    pub fn new(method: impl Into<String>) -> Self {
        RequestInfo {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(normalize_header_name(name), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    pub fn with_auth(mut self, auth: Record) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Header lookup by normalized name.
    pub fn header(&self, name: &str) -> Option<&str> {
        let wanted = normalize_header_name(name);
        self.headers
            .iter()
            .find(|(key, _)| normalize_header_name(key) == wanted)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}
