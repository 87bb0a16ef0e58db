//! Identifier resolution against a record and request snapshot.
//!
//! Plain paths walk the record's fields and expanded relations; `@request`
//! paths read the request metadata; `@collection` paths are delegated to a
//! [`JoinResolver`], the only capability the evaluator calls out to.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    ast::{Identifier, RequestScope, Scope},
    record::{Record, is_back_relation},
    request::RequestInfo,
    value::Value,
};

/// Outcome of resolving an identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A single value (which may itself be a JSON array field)
    Value(Value),
    /// Values gathered across a multi-valued relation or a join
    Many(Vec<Value>),
    /// Unknown field or unexpanded relation
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Join lookup on `{collection}` failed: {message}")]
pub struct JoinError {
    pub collection: String,
    pub message: String,
}

/// Lookup capability for `@collection.<name>.<field>` references.
///
/// Implementations may query storage, so a call can block or fail; a
/// failure makes the enclosing rule deny.
pub trait JoinResolver: Send + Sync {
    /// Returns the values `path` resolves to across the records of
    /// `collection`. An unknown collection yields an empty list.
    fn lookup(&self, collection: &str, path: &[String]) -> Result<Vec<Value>, JoinError>;
}

/// Resolver for deployments without joins: every lookup is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJoins;

impl JoinResolver for NoJoins {
    fn lookup(&self, _collection: &str, _path: &[String]) -> Result<Vec<Value>, JoinError> {
        Ok(Vec::new())
    }
}

/// In-memory collections, for tests and the CLI.
#[derive(Debug, Clone, Default)]
pub struct StaticJoins {
    collections: HashMap<String, Vec<Record>>,
}

impl StaticJoins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.collections.insert(name.into(), records);
        self
    }
}

impl From<HashMap<String, Vec<Record>>> for StaticJoins {
    fn from(collections: HashMap<String, Vec<Record>>) -> Self {
        StaticJoins { collections }
    }
}

impl JoinResolver for StaticJoins {
    fn lookup(&self, collection: &str, path: &[String]) -> Result<Vec<Value>, JoinError> {
        let Some(records) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut values = Vec::new();
        for record in records {
            match resolve_record_path(record, path) {
                Resolved::Value(v) => values.push(v),
                Resolved::Many(vs) => values.extend(vs),
                Resolved::Unresolved => {}
            }
        }
        Ok(values)
    }
}

/// Resolves `ident` (ignoring its modifier) against the snapshot.
pub fn resolve(
    ident: &Identifier,
    record: &Record,
    request: &RequestInfo,
    joins: &dyn JoinResolver,
) -> Result<Resolved, JoinError> {
    let resolved = match &ident.scope {
        Scope::Record => resolve_record_path(record, &ident.path),
        Scope::Request(RequestScope::Context) => Resolved::Value(Value::String(request.context.clone())),
        Scope::Request(RequestScope::Method) => {
            Resolved::Value(Value::String(request.method.to_uppercase()))
        }
        Scope::Request(RequestScope::Headers) => {
            let value = ident
                .path
                .first()
                .and_then(|name| request.header(name))
                .map_or(Value::Null, |v| Value::String(v.to_string()));
            Resolved::Value(value)
        }
        Scope::Request(RequestScope::Query) => resolve_submitted(&request.query, &ident.path),
        Scope::Request(RequestScope::Body) => resolve_submitted(&request.body, &ident.path),
        Scope::Request(RequestScope::Auth) => match &request.auth {
            Some(auth) => resolve_record_path(auth, &ident.path),
            None => Resolved::Value(Value::Null),
        },
        Scope::Collection(name) => Resolved::Many(joins.lookup(name, &ident.path)?),
    };
    Ok(resolved)
}

/// `:isset` - whether the client submitted the key at all.
pub fn is_set(ident: &Identifier, request: &RequestInfo) -> bool {
    let Some((key, rest)) = ident.path.split_first() else {
        return false;
    };
    let root = match &ident.scope {
        Scope::Request(RequestScope::Headers) => return request.header(key).is_some(),
        Scope::Request(RequestScope::Query) => request.query.get(key),
        Scope::Request(RequestScope::Body) => request.body.get(key),
        _ => return false,
    };
    let mut current = root;
    for segment in rest {
        current = match current {
            Some(Value::Object(map)) => map.get(segment),
            _ => None,
        };
    }
    current.is_some()
}

fn resolve_submitted(map: &HashMap<String, Value>, path: &[String]) -> Resolved {
    let Some((key, rest)) = path.split_first() else {
        return Resolved::Unresolved;
    };
    let value = map.get(key).cloned().unwrap_or(Value::Null);
    Resolved::Value(walk_json(value, rest).unwrap_or(Value::Null))
}

/// Walks object keys; `None` when a non-object is indexed.
fn walk_json(mut value: Value, path: &[String]) -> Option<Value> {
    for segment in path {
        value = match value {
            Value::Object(mut map) => map.remove(segment).unwrap_or(Value::Null),
            Value::Null => Value::Null,
            _ => return None,
        };
    }
    Some(value)
}

/// Resolves a dotted path rooted at `record`, following expanded relations.
pub fn resolve_record_path(record: &Record, path: &[String]) -> Resolved {
    let Some((head, rest)) = path.split_first() else {
        return Resolved::Unresolved;
    };

    if !rest.is_empty() {
        let back_relation = is_back_relation(head);
        if let Some(relation) = record.relations.get(head.as_str()) {
            if relation.multiple || back_relation {
                return Resolved::Many(collect_many(&relation.records, rest));
            }
            return match relation.records.first() {
                Some(related) => resolve_record_path(related, rest),
                None => Resolved::Value(Value::Null),
            };
        }
        if back_relation {
            return Resolved::Many(Vec::new());
        }
    } else if is_back_relation(head) {
        // bare back-relation: ids of the records pointing here
        return match record.relations.get(head.as_str()) {
            Some(relation) => Resolved::Many(
                relation
                    .records
                    .iter()
                    .map(|r| Value::String(r.id.clone()))
                    .collect(),
            ),
            None => Resolved::Many(Vec::new()),
        };
    }

    match record.field(head) {
        Some(value) => walk_json(value, rest).map_or(Resolved::Unresolved, Resolved::Value),
        None => Resolved::Unresolved,
    }
}

fn collect_many(records: &[Record], path: &[String]) -> Vec<Value> {
    let mut values = Vec::new();
    for related in records {
        match resolve_record_path(related, path) {
            Resolved::Value(v) => values.push(v),
            Resolved::Many(vs) => values.extend(vs),
            Resolved::Unresolved => {}
        }
    }
    values
}
