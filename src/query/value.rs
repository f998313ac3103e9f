// src/query/value.rs
//
// Bindable parameter values

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};

use crate::domain::FieldKind;

/// A value bound into a query: a scalar, NULL, or a list for `IN` clauses
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Whether this scalar can be compared against a column of `kind`.
    /// NULL is accepted everywhere; lists never are.
    pub fn fits(&self, kind: FieldKind) -> bool {
        match (self, kind) {
            (Value::Null, _) => true,
            (Value::Integer(_), FieldKind::Integer) => true,
            (Value::Integer(_), FieldKind::Reference(_)) => true,
            (Value::Text(_), FieldKind::Text) => true,
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            Value::Integer(v) => Ok(ToSqlOutput::from(*v)),
            Value::Text(v) => Ok(ToSqlOutput::from(v.as_str())),
            Value::List(_) => Err(rusqlite::Error::ToSqlConversionFailure(
                "list values must be expanded before binding".into(),
            )),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
