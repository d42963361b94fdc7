//! Table-level create/read/update/delete operations rendered to parameterized SQL.
//!
//! These are plain data descriptions of single-table statements. They do not
//! join, nest or alias; anything richer is written as SQL in [`crate::queries`].

use rusqlite::Connection;

use crate::error::{check_identifier, Result, TrackerError};
use crate::raw::{collect_rows, Row, Value};

/// Query operators for building filter conditions
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    Like(String),
    In(Vec<Value>),
}

/// Conditions joined with AND, rendered in insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pub conditions: Vec<(String, QueryOperator)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_condition(mut self, field: &str, op: QueryOperator) -> Self {
        self.conditions.push((field.to_string(), op));
        self
    }
    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.with_condition(field, QueryOperator::Equal(value.into()))
    }

    fn where_clause(&self, params: &mut Vec<Value>) -> Result<String> {
        if self.conditions.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(self.conditions.len());
        for (field, op) in &self.conditions {
            let field = check_identifier(field)?;
            let (sql_op, values) = match op {
                QueryOperator::Equal(v) => ("=", vec![v.clone()]),
                QueryOperator::NotEqual(v) => ("<>", vec![v.clone()]),
                QueryOperator::GreaterThan(v) => (">", vec![v.clone()]),
                QueryOperator::GreaterThanOrEqual(v) => (">=", vec![v.clone()]),
                QueryOperator::LessThan(v) => ("<", vec![v.clone()]),
                QueryOperator::LessThanOrEqual(v) => ("<=", vec![v.clone()]),
                QueryOperator::Like(pattern) => ("LIKE", vec![Value::Text(pattern.clone())]),
                QueryOperator::In(values) => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    parts.push(format!("{field} IN ({placeholders})"));
                    params.extend(values.iter().cloned());
                    continue;
                }
            };
            parts.push(format!("{field} {sql_op} ?"));
            params.extend(values);
        }
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOperation {
    pub table: String,
    pub data: Vec<(String, Value)>,
}

impl CreateOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            data: Vec::new(),
        }
    }
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.data.push((column.to_string(), value.into()));
        self
    }

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let table = check_identifier(&self.table)?;
        if self.data.is_empty() {
            return Ok((format!("INSERT INTO {table} DEFAULT VALUES"), Vec::new()));
        }
        let columns = self
            .data
            .iter()
            .map(|(c, _)| check_identifier(c))
            .collect::<Result<Vec<_>>>()?;
        let placeholders = vec!["?"; columns.len()].join(", ");
        let params = self.data.iter().map(|(_, v)| v.clone()).collect();
        Ok((
            format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                columns.join(", ")
            ),
            params,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOperation {
    pub table: String,
    pub query: Query,
    pub fields: Option<Vec<String>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Option<Vec<(String, bool)>>, // (field, is_ascending)
}

impl ReadOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            query: Query::new(),
            fields: None,
            limit: None,
            offset: None,
            order_by: None,
        }
    }
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
    pub fn filter(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
    pub fn order_by(mut self, field: &str, ascending: bool) -> Self {
        self.order_by
            .get_or_insert_with(Vec::new)
            .push((field.to_string(), ascending));
        self
    }

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let table = check_identifier(&self.table)?;
        let fields = match &self.fields {
            Some(fields) if !fields.is_empty() => fields
                .iter()
                .map(|f| check_identifier(f))
                .collect::<Result<Vec<_>>>()?
                .join(", "),
            _ => "*".to_string(),
        };
        let mut params = Vec::new();
        let mut sql = format!("SELECT {fields} FROM {table}");
        sql.push_str(&self.query.where_clause(&mut params)?);
        if let Some(order_by) = &self.order_by {
            let terms = order_by
                .iter()
                .map(|(field, asc)| {
                    check_identifier(field)
                        .map(|f| format!("{f} {}", if *asc { "ASC" } else { "DESC" }))
                })
                .collect::<Result<Vec<_>>>()?;
            if !terms.is_empty() {
                sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
            }
        }
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        Ok((sql, params))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperation {
    pub table: String,
    pub query: Query,
    pub updates: Vec<(String, Value)>,
}

impl UpdateOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            query: Query::new(),
            updates: Vec::new(),
        }
    }
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.updates.push((column.to_string(), value.into()));
        self
    }
    pub fn filter(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let table = check_identifier(&self.table)?;
        if self.updates.is_empty() {
            return Err(TrackerError::EmptyOperation("update"));
        }
        let mut params = Vec::new();
        let mut assignments = Vec::with_capacity(self.updates.len());
        for (column, value) in &self.updates {
            assignments.push(format!("{} = ?", check_identifier(column)?));
            params.push(value.clone());
        }
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        sql.push_str(&self.query.where_clause(&mut params)?);
        Ok((sql, params))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOperation {
    pub table: String,
    pub query: Query,
}

impl DeleteOperation {
    pub fn new(table: &str, query: Query) -> Self {
        Self {
            table: table.to_string(),
            query,
        }
    }

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let table = check_identifier(&self.table)?;
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {table}");
        sql.push_str(&self.query.where_clause(&mut params)?);
        Ok((sql, params))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CrudOperation {
    Create(CreateOperation),
    Read(ReadOperation),
    Update(UpdateOperation),
    Delete(DeleteOperation),
}

impl CrudOperation {
    pub fn table(&self) -> &str {
        match self {
            CrudOperation::Create(op) => &op.table,
            CrudOperation::Read(op) => &op.table,
            CrudOperation::Update(op) => &op.table,
            CrudOperation::Delete(op) => &op.table,
        }
    }

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        match self {
            CrudOperation::Create(op) => op.to_sql(),
            CrudOperation::Read(op) => op.to_sql(),
            CrudOperation::Update(op) => op.to_sql(),
            CrudOperation::Delete(op) => op.to_sql(),
        }
    }
}

/// What running a [`CrudOperation`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CrudOutcome {
    /// Row id of the inserted row
    Inserted(i64),
    Rows(Vec<Row>),
    /// Number of rows changed by an update or delete
    Affected(usize),
}

impl CrudOutcome {
    pub fn inserted_id(&self) -> Option<i64> {
        match self {
            CrudOutcome::Inserted(id) => Some(*id),
            _ => None,
        }
    }
}

/// Perform a CRUD operation against `conn`.
pub fn execute(conn: &Connection, op: &CrudOperation) -> Result<CrudOutcome> {
    let (sql, params) = op.to_sql()?;
    tracing::trace!(table = op.table(), %sql, "executing operation");
    match op {
        CrudOperation::Create(_) => {
            conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
            Ok(CrudOutcome::Inserted(conn.last_insert_rowid()))
        }
        CrudOperation::Read(_) => {
            let mut stmt = conn.prepare(&sql)?;
            let rows = collect_rows(&mut stmt, rusqlite::params_from_iter(params.iter()))?;
            Ok(CrudOutcome::Rows(rows))
        }
        CrudOperation::Update(_) | CrudOperation::Delete(_) => {
            let affected = conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
            Ok(CrudOutcome::Affected(affected))
        }
    }
}
