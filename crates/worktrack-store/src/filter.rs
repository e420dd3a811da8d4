//! Equality filters and `$set`-style patches over JSON documents.
//!
//! Both address top-level fields only. A filter compiles into
//! `json_extract(body, <path>) = ?` clauses; a patch compiles into one
//! `json_set` call.

use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Scalar a filter field is compared against.
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Scalar {
    fn from_json(field: &str, value: &Value) -> Result<Self, StoreError> {
        match value {
            Value::Null => Ok(Self::Null),
            // json_extract yields 1/0 for JSON booleans.
            Value::Bool(b) => Ok(Self::Integer(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Integer(i)),
                None => n
                    .as_f64()
                    .map(Self::Real)
                    .ok_or_else(|| StoreError::InvalidFilter(format!("{field}: unsupported number"))),
            },
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(StoreError::InvalidFilter(format!(
                "{field}: only scalar equality is supported"
            ))),
        }
    }

    fn into_sql(self) -> SqlValue {
        match self {
            Self::Null => SqlValue::Null,
            Self::Integer(i) => SqlValue::Integer(i),
            Self::Real(f) => SqlValue::Real(f),
            Self::Text(s) => SqlValue::Text(s),
        }
    }
}

fn check_field(field: &str) -> Result<(), String> {
    if field.is_empty() {
        return Err("field name is empty".into());
    }
    if field.starts_with('$') {
        return Err(format!("{field}: operators are not supported"));
    }
    if field.contains('"') {
        return Err(format!("{field}: field name contains a quote"));
    }
    Ok(())
}

fn json_path(field: &str) -> String {
    format!("$.\"{field}\"")
}

/// Conjunction of `field == scalar` constraints. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Scalar)>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a filter object. `null` is the empty filter.
    pub fn from_json(value: &Value) -> Result<Self, StoreError> {
        match value {
            Value::Null => Ok(Self::all()),
            Value::Object(map) => {
                let mut clauses = Vec::with_capacity(map.len());
                for (field, v) in map {
                    check_field(field).map_err(StoreError::InvalidFilter)?;
                    clauses.push((field.clone(), Scalar::from_json(field, v)?));
                }
                Ok(Self { clauses })
            }
            other => Err(StoreError::InvalidFilter(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Match documents whose `_id` equals `id`.
    pub fn by_id(id: &str) -> Self {
        Self {
            clauses: vec![("_id".into(), Scalar::Text(id.to_string()))],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// `AND ...` clauses plus their bound values, in order.
    pub(crate) fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::new();
        let mut params = Vec::with_capacity(self.clauses.len() * 2);
        for (field, value) in &self.clauses {
            params.push(SqlValue::Text(json_path(field)));
            if *value == Scalar::Null {
                sql.push_str(" AND json_extract(body, ?) IS NULL");
            } else {
                sql.push_str(" AND json_extract(body, ?) = ?");
                params.push(value.clone().into_sql());
            }
        }
        (sql, params)
    }
}

/// Fields to set on every matched document.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    /// Accepts either a bare field map or `{"$set": {...}}`.
    pub fn from_json(value: &Value) -> Result<Self, StoreError> {
        let map = match value {
            Value::Object(map) if map.len() == 1 && map.contains_key("$set") => match &map["$set"] {
                Value::Object(inner) => inner,
                _ => return Err(StoreError::InvalidPatch("$set must be an object".into())),
            },
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidPatch(format!(
                    "expected an object, got {other}"
                )))
            }
        };
        if map.is_empty() {
            return Err(StoreError::InvalidPatch("patch is empty".into()));
        }
        for field in map.keys() {
            check_field(field).map_err(StoreError::InvalidPatch)?;
            if field == "_id" {
                return Err(StoreError::InvalidPatch("_id cannot be changed".into()));
            }
        }
        Ok(Self { fields: map.clone() })
    }

    pub fn touches(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set the patch fields on an already-decoded document.
    pub(crate) fn apply(&self, document: &mut Value) -> Result<(), StoreError> {
        let Some(object) = document.as_object_mut() else {
            return Err(StoreError::InvalidDocument("document must be a JSON object".into()));
        };
        for (field, value) in &self.fields {
            object.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    /// `json_set(body, ?, json(?), ...)` plus its bound values.
    pub(crate) fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::from("json_set(body");
        let mut params = Vec::with_capacity(self.fields.len() * 2);
        for (field, value) in &self.fields {
            sql.push_str(", ?, json(?)");
            params.push(SqlValue::Text(json_path(field)));
            params.push(SqlValue::Text(value.to_string()));
        }
        sql.push(')');
        (sql, params)
    }
}
