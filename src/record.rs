//! Record snapshots handed to the evaluator.
//!
//! A [`Record`] carries its own field values plus whatever relations the
//! data layer already expanded. Expansion arrives in JSON the same way list
//! responses carry it: under an `expand` key, a single object for a
//! single relation and an array for a multi relation.
//!
//! ```
//! use record_rules::Record;
//! use serde_json::json;
//!
//! let post = Record::try_from(json!({
//!     "id": "p1",
//!     "collectionName": "posts",
//!     "status": "published",
//!     "expand": {
//!         "author": {"id": "u1", "name": "Ada"},
//!         "tags": [{"id": "T1"}, {"id": "T2"}]
//!     }
//! }))
//! .unwrap();
//! assert_eq!(post.relations["tags"].records.len(), 2);
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::value::Value;

/// Collection holding superuser accounts.
pub const SUPERUSERS_COLLECTION: &str = "_superusers";

/// Marker separating the source collection from the field in a
/// back-relation name (`comments_via_post`).
pub const BACK_RELATION_MARKER: &str = "_via_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Record must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Expanded relation `{0}` must be an object or an array of objects")]
    InvalidExpand(String),
}

/// An expanded relation: the related records in field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relation {
    pub multiple: bool,
    pub records: Vec<Record>,
}

impl Relation {
    pub fn single(record: Record) -> Self {
        Relation {
            multiple: false,
            records: vec![record],
        }
    }

    pub fn many(records: Vec<Record>) -> Self {
        Relation {
            multiple: true,
            records,
        }
    }
}

/// Whether a field name denotes a back-relation (`<collection>_via_<field>`).
pub fn is_back_relation(name: &str) -> bool {
    name.split_once(BACK_RELATION_MARKER)
        .is_some_and(|(collection, field)| !collection.is_empty() && !field.is_empty())
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Record {
    pub id: String,
    pub collection: String,
    pub fields: HashMap<String, Value>,
    pub relations: HashMap<String, Relation>,
}

impl Record {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    /// Field lookup; `id` falls back to the record id.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self.fields.get(name) {
            Some(v) => Some(v.clone()),
            None if name == "id" && !self.id.is_empty() => Some(Value::String(self.id.clone())),
            None if name == "collectionName" && !self.collection.is_empty() => {
                Some(Value::String(self.collection.clone()))
            }
            None => None,
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.collection == SUPERUSERS_COLLECTION
    }
}

impl TryFrom<serde_json::Value> for Record {
    type Error = RecordError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Object(mut obj) = value else {
            return Err(RecordError::NotAnObject(json_type(&value)));
        };

        let mut relations = HashMap::new();
        if let Some(expand) = obj.remove("expand") {
            let serde_json::Value::Object(expand) = expand else {
                return Err(RecordError::InvalidExpand("expand".to_string()));
            };
            for (name, related) in expand {
                let relation = match related {
                    serde_json::Value::Array(items) => Relation::many(
                        items
                            .into_iter()
                            .map(Record::try_from)
                            .collect::<Result<_, _>>()
                            .map_err(|_| RecordError::InvalidExpand(name.clone()))?,
                    ),
                    serde_json::Value::Null => Relation::default(),
                    item @ serde_json::Value::Object(_) => Relation::single(Record::try_from(item)?),
                    _ => return Err(RecordError::InvalidExpand(name)),
                };
                relations.insert(name, relation);
            }
        }

        let id = match obj.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        let collection = match obj.remove("collectionName") {
            Some(serde_json::Value::String(s)) => s,
            _ => String::new(),
        };

        Ok(Record {
            id,
            collection,
            fields: obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            relations,
        })
    }
}

fn json_type(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
