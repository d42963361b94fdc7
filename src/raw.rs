//! Raw SQL access: hand-written statements with named parameters, rows read
//! back as dynamic [`Value`]s.

use std::collections::HashMap;
use std::fmt;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, Statement, ToSql};

use crate::error::Result;

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Boolean(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// SQLite has no boolean storage class; integers 0 and 1 read back as flags.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            Value::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(v) => ToSqlOutput::from(*v),
            Value::Real(v) => ToSqlOutput::from(*v),
            Value::Text(v) => ToSqlOutput::from(v.as_str()),
            Value::Blob(v) => ToSqlOutput::from(v.as_slice()),
            Value::Boolean(v) => ToSqlOutput::from(*v),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Value::Blob(v.to_vec()),
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

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
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

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Value::Boolean(v) => write!(f, "{v}"),
        }
    }
}

/// Parameter bindings for SQL queries. Names are written without the leading `:`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: HashMap<String, Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a named value
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }
}

/// SQL Query with typed parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            params: Params::new(),
        }
    }
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params = self.params.with_value(name, value);
        self
    }
}

/// One result row, columns kept in select order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Value::Text(v) => write!(f, "'{v}'")?,
                other => write!(f, "{other}")?,
            }
        }
        f.write_str(")")
    }
}

fn named(params: &Params) -> Vec<(String, &Value)> {
    params
        .values
        .iter()
        .map(|(name, value)| (format!(":{name}"), value))
        .collect()
}

/// Execute a statement that returns no rows; yields the number of changed rows.
pub fn execute(conn: &Connection, query: &SqlQuery) -> Result<usize> {
    let named = named(&query.params);
    let bound: Vec<(&str, &dyn ToSql)> = named
        .iter()
        .map(|(name, value)| (name.as_str(), *value as &dyn ToSql))
        .collect();
    Ok(conn.execute(&query.statement, bound.as_slice())?)
}

/// Run a query and collect every row.
pub fn query(conn: &Connection, query: &SqlQuery) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(&query.statement)?;
    let named = named(&query.params);
    let bound: Vec<(&str, &dyn ToSql)> = named
        .iter()
        .map(|(name, value)| (name.as_str(), *value as &dyn ToSql))
        .collect();
    collect_rows(&mut stmt, bound.as_slice())
}

pub(crate) fn collect_rows(stmt: &mut Statement<'_>, params: impl rusqlite::Params) -> Result<Vec<Row>> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params)?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        result.push(Row {
            columns: columns.clone(),
            values,
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL, \
             author TEXT NOT NULL, want_to_read BOOLEAN NOT NULL DEFAULT 0, cover BLOB);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn named_params_round_trip() {
        let conn = books_db();
        let insert = SqlQuery::new(
            "INSERT INTO books (title, author, want_to_read) VALUES (:title, :author, :want)",
        )
        .bind("title", "The Hobbit")
        .bind("author", "John R. R. Tolkien")
        .bind("want", false);
        assert_eq!(execute(&conn, &insert).unwrap(), 1);

        let select = SqlQuery::new(
            "SELECT title, want_to_read, cover FROM books WHERE author LIKE :author",
        )
        .bind("author", "John R. R. Tolkien");
        let rows = query(&conn, &select).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns, vec!["title", "want_to_read", "cover"]);
        assert_eq!(rows[0].get("title").and_then(Value::as_str), Some("The Hobbit"));
        assert_eq!(rows[0].get("want_to_read").and_then(Value::as_bool), Some(false));
        assert!(rows[0].get("cover").unwrap().is_null());
        assert_eq!(rows[0].to_string(), "('The Hobbit', 0, NULL)");
    }

    #[test]
    fn statement_without_params() {
        let conn = books_db();
        let changed = execute(&conn, &SqlQuery::new("UPDATE books SET want_to_read = 1")).unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn option_values_bind_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
        assert_eq!(Value::Blob(vec![1, 2, 3]).to_string(), "<3 bytes>");
    }
}
