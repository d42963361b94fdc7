//! Declarative schema: tables, columns and keys rendered to SQLite DDL.

use rusqlite::Connection;

use crate::error::{check_identifier, Result};

/// Schema definition for the SQLite database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }
    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// DDL for every table followed by its indexes.
    pub fn create_sql(&self) -> Result<String> {
        let mut statements = Vec::new();
        for table in &self.tables {
            statements.push(table.create_sql()?);
            for index in &table.indexes {
                statements.push(index.create_sql(&table.name)?);
            }
        }
        Ok(statements.join("\n"))
    }

    /// Create all tables and indexes that do not exist yet.
    pub fn create_all(&self, conn: &Connection) -> Result<()> {
        let sql = self.create_sql()?;
        conn.execute_batch(&sql)?;
        tracing::debug!(tables = self.tables.len(), "schema created");
        Ok(())
    }

    /// Drop all tables, dependents first.
    pub fn drop_all(&self, conn: &Connection) -> Result<()> {
        let mut sql = String::new();
        for table in self.tables.iter().rev() {
            sql.push_str(&format!(
                "DROP TABLE IF EXISTS {};\n",
                check_identifier(&table.name)?
            ));
        }
        conn.execute_batch(&sql)?;
        tracing::debug!(tables = self.tables.len(), "schema dropped");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        if column.constraints.contains(&ColumnConstraint::PrimaryKey) {
            self.primary_key.push(column.name.clone());
        }
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, column: &str, foreign_table: &str, foreign_column: &str) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            foreign_table: foreign_table.to_string(),
            foreign_column: foreign_column.to_string(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        });
        self
    }

    pub fn index(mut self, name: &str, columns: &[&str], unique: bool) -> Self {
        self.indexes.push(IndexDefinition {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        });
        self
    }

    pub fn create_sql(&self) -> Result<String> {
        let mut parts = Vec::new();
        for column in &self.columns {
            parts.push(column.to_sql()?);
        }
        if !self.primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", join_identifiers(&self.primary_key)?));
        }
        for fk in &self.foreign_keys {
            parts.push(fk.to_sql()?);
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            check_identifier(&self.name)?,
            parts.join(",\n    ")
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
    pub default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.constraints.push(ColumnConstraint::PrimaryKey);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.constraints.push(ColumnConstraint::NotNull);
        self
    }

    pub fn unique(mut self) -> Self {
        self.constraints.push(ColumnConstraint::Unique);
        self
    }

    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    fn to_sql(&self) -> Result<String> {
        let mut sql = format!("{} {}", check_identifier(&self.name)?, self.data_type.sql_name());
        // The primary key is emitted as a table constraint; a key column is implicitly NOT NULL.
        for constraint in &self.constraints {
            match constraint {
                ColumnConstraint::PrimaryKey | ColumnConstraint::NotNull => {
                    if !sql.ends_with(" NOT NULL") {
                        sql.push_str(" NOT NULL");
                    }
                }
                ColumnConstraint::Unique => sql.push_str(" UNIQUE"),
            }
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        Ok(sql)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Integer,
    Text,
    Varchar(u32),
    Boolean,
    Real,
    Blob,
}

impl DataType {
    fn sql_name(&self) -> String {
        match self {
            DataType::Integer => "INTEGER".to_string(),
            DataType::Text => "TEXT".to_string(),
            DataType::Varchar(n) => format!("VARCHAR({n})"),
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Real => "REAL".to_string(),
            DataType::Blob => "BLOB".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Real(f64),
    Null,
    CurrentTimestamp,
}

impl DefaultValue {
    fn to_sql(&self) -> String {
        match self {
            DefaultValue::Integer(v) => v.to_string(),
            DefaultValue::Text(v) => format!("'{}'", v.replace('\'', "''")),
            DefaultValue::Real(v) => v.to_string(),
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    fn to_sql(&self) -> Result<String> {
        let mut sql = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            check_identifier(&self.column)?,
            check_identifier(&self.foreign_table)?,
            check_identifier(&self.foreign_column)?
        );
        if self.on_delete != ForeignKeyAction::NoAction {
            sql.push_str(" ON DELETE ");
            sql.push_str(self.on_delete.sql());
        }
        if self.on_update != ForeignKeyAction::NoAction {
            sql.push_str(" ON UPDATE ");
            sql.push_str(self.on_update.sql());
        }
        Ok(sql)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForeignKeyAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ForeignKeyAction {
    fn sql(&self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn create_sql(&self, table: &str) -> Result<String> {
        Ok(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});",
            if self.unique { "UNIQUE " } else { "" },
            check_identifier(&self.name)?,
            check_identifier(table)?,
            join_identifiers(&self.columns)?
        ))
    }
}

fn join_identifiers(names: &[String]) -> Result<String> {
    let checked = names
        .iter()
        .map(|n| check_identifier(n))
        .collect::<Result<Vec<_>>>()?;
    Ok(checked.join(", "))
}

/// The reading tracker's tables: users, covers, books, reviews and the
/// `association` join table between users and books.
pub fn tracker_schema() -> Schema {
    let users = TableDefinition::new("users")
        .column(ColumnDefinition::new("id", DataType::Integer).primary_key())
        .column(ColumnDefinition::new("name", DataType::Varchar(50)).not_null());

    let covers = TableDefinition::new("covers")
        .column(ColumnDefinition::new("id", DataType::Integer).primary_key())
        .column(ColumnDefinition::new("image", DataType::Text).not_null())
        .column(ColumnDefinition::new("artist", DataType::Text));

    let books = TableDefinition::new("books")
        .column(ColumnDefinition::new("id", DataType::Integer).primary_key())
        .column(ColumnDefinition::new("cover_id", DataType::Integer))
        .column(ColumnDefinition::new("title", DataType::Varchar(50)).not_null())
        .column(ColumnDefinition::new("author", DataType::Varchar(30)).not_null())
        .column(
            ColumnDefinition::new("want_to_read", DataType::Boolean)
                .not_null()
                .with_default(DefaultValue::Integer(0)),
        )
        .foreign_key("cover_id", "covers", "id");

    let reviews = TableDefinition::new("reviews")
        .column(ColumnDefinition::new("id", DataType::Integer).primary_key())
        .column(ColumnDefinition::new("book_id", DataType::Integer).not_null())
        .column(ColumnDefinition::new("user_id", DataType::Integer).not_null())
        .column(ColumnDefinition::new("text", DataType::Varchar(3000)).not_null())
        .foreign_key("book_id", "books", "id")
        .foreign_key("user_id", "users", "id")
        .index("idx_reviews_book_id", &["book_id"], false)
        .index("idx_reviews_user_id", &["user_id"], false);

    // No primary key and no uniqueness: the same pair may be linked twice.
    let association = TableDefinition::new("association")
        .column(ColumnDefinition::new("user_id", DataType::Integer))
        .column(ColumnDefinition::new("book_id", DataType::Integer))
        .foreign_key("user_id", "users", "id")
        .foreign_key("book_id", "books", "id")
        .index("idx_association_user_id", &["user_id"], false)
        .index("idx_association_book_id", &["book_id"], false);

    Schema::new()
        .add_table(users)
        .add_table(covers)
        .add_table(books)
        .add_table(reviews)
        .add_table(association)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_books_table() {
        let schema = tracker_schema();
        let books = schema.table("books").unwrap();
        assert_eq!(
            books.create_sql().unwrap(),
            "CREATE TABLE IF NOT EXISTS books (\n    \
             id INTEGER NOT NULL,\n    \
             cover_id INTEGER,\n    \
             title VARCHAR(50) NOT NULL,\n    \
             author VARCHAR(30) NOT NULL,\n    \
             want_to_read BOOLEAN NOT NULL DEFAULT 0,\n    \
             PRIMARY KEY (id),\n    \
             FOREIGN KEY (cover_id) REFERENCES covers (id)\n);"
        );
    }

    #[test]
    fn renders_index_and_actions() {
        let index = IndexDefinition {
            name: "idx_users_name".into(),
            columns: vec!["name".into()],
            unique: true,
        };
        assert_eq!(
            index.create_sql("users").unwrap(),
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_name ON users (name);"
        );

        let fk = ForeignKey {
            column: "book_id".into(),
            foreign_table: "books".into(),
            foreign_column: "id".into(),
            on_delete: ForeignKeyAction::Cascade,
            on_update: ForeignKeyAction::NoAction,
        };
        assert_eq!(
            fk.to_sql().unwrap(),
            "FOREIGN KEY (book_id) REFERENCES books (id) ON DELETE CASCADE"
        );
    }

    #[test]
    fn text_defaults_are_quoted() {
        let column = ColumnDefinition::new("artist", DataType::Text)
            .with_default(DefaultValue::Text("O'Brien".into()));
        assert_eq!(column.to_sql().unwrap(), "artist TEXT DEFAULT 'O''Brien'");
    }

    #[test]
    fn rejects_bad_identifiers() {
        let table = TableDefinition::new("books;--")
            .column(ColumnDefinition::new("id", DataType::Integer).primary_key());
        assert!(table.create_sql().is_err());
    }

    #[test]
    fn create_all_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = tracker_schema();
        schema.create_all(&conn).unwrap();
        schema.create_all(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(tables, vec!["association", "books", "covers", "reviews", "users"]);

        schema.drop_all(&conn).unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
