//! JSON payload -> evaluation inputs

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use super::CliError;
use crate::{
    macros::FixedClock,
    record::Record,
    request::RequestInfo,
    resolver::StaticJoins,
    rules::CollectionDef,
    value::parse_datetime,
};

/// Everything a check runs against.
///
/// ```json
/// {
///   "record": {"id": "p1", "status": "published", "expand": {...}},
///   "request": {"method": "GET", "auth": {"id": "u1", "collectionName": "users"}},
///   "collections": {"posts": [{"id": "p1"}, ...]},
///   "definitions": [{"name": "posts", "listRule": ""}],
///   "now": "2024-05-01 12:00:00.000Z"
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Payload {
    pub record: Record,
    pub request: RequestInfo,
    /// Records per collection, for joins and list filtering
    pub collections: HashMap<String, Vec<Record>>,
    pub definitions: Vec<CollectionDef>,
    pub now: Option<String>,
}

impl Payload {
    pub fn joins(&self) -> StaticJoins {
        StaticJoins::from(self.collections.clone())
    }

    /// A frozen clock when the payload pins `now`.
    pub fn clock(&self) -> Result<Option<FixedClock>, CliError> {
        self.now
            .as_deref()
            .map(|now| {
                parse_datetime(now)
                    .map(FixedClock)
                    .ok_or_else(|| CliError::InvalidNow(now.to_string()))
            })
            .transpose()
    }
}

pub fn parse_payload(json: &str) -> Result<Payload, CliError> {
    Ok(serde_json::from_str(json)?)
}

/// Merges a JSON params object with `name=value` pairs; pair values are
/// read as JSON when they parse, as plain strings otherwise.
pub fn parse_params(json: Option<&str>, pairs: &[String]) -> Result<Map<String, JsonValue>, CliError> {
    let mut params = match json {
        Some(json) => serde_json::from_str::<Map<String, JsonValue>>(json)?,
        None => Map::new(),
    };
    for pair in pairs {
        let (name, raw) = pair
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| CliError::InvalidParam(pair.clone()))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
        params.insert(name.to_string(), value);
    }
    Ok(params)
}
