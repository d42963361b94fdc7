//! Domain records and their mapping to rows.

use std::fmt;

use serde::Deserialize;

use crate::crud::CreateOperation;
use crate::error::Result;
use crate::raw::Value;

/// A struct stored as one row of `TABLE`, keyed by an integer `id`.
///
/// `COLUMNS` lists every column except `id`, in the order `values` returns
/// them and `from_row` reads them after the id.
pub trait Record: Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
    fn values(&self) -> Vec<Value>;
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;

    /// `SELECT id, <columns> FROM <table>`
    fn select_sql() -> String {
        format!("SELECT id, {} FROM {}", Self::COLUMNS.join(", "), Self::TABLE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    pub want_to_read: bool,
    pub cover_id: Option<i64>,
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            want_to_read: false,
            cover_id: None,
        }
    }
}

impl Record for Book {
    const TABLE: &'static str = "books";
    const COLUMNS: &'static [&'static str] = &["title", "author", "want_to_read", "cover_id"];

    fn id(&self) -> Option<i64> {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
    fn values(&self) -> Vec<Value> {
        vec![
            self.title.as_str().into(),
            self.author.as_str().into(),
            self.want_to_read.into(),
            self.cover_id.into(),
        ]
    }
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            want_to_read: row.get(3)?,
            cover_id: row.get(4)?,
        })
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: Option<i64>,
    pub book_id: i64,
    pub user_id: i64,
    pub text: String,
}

impl Review {
    pub fn new(book_id: i64, user_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: None,
            book_id,
            user_id,
            text: text.into(),
        }
    }
}

impl Record for Review {
    const TABLE: &'static str = "reviews";
    const COLUMNS: &'static [&'static str] = &["book_id", "user_id", "text"];

    fn id(&self) -> Option<i64> {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
    fn values(&self) -> Vec<Value> {
        vec![self.book_id.into(), self.user_id.into(), self.text.as_str().into()]
    }
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            book_id: row.get(1)?,
            user_id: row.get(2)?,
            text: row.get(3)?,
        })
    }
}

impl fmt::Display for Review {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn id(&self) -> Option<i64> {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
    fn values(&self) -> Vec<Value> {
        vec![self.name.as_str().into()]
    }
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cover {
    pub id: Option<i64>,
    pub image: String,
    pub artist: Option<String>,
}

impl Cover {
    pub fn new(image: impl Into<String>, artist: Option<&str>) -> Self {
        Self {
            id: None,
            image: image.into(),
            artist: artist.map(str::to_string),
        }
    }
}

impl Record for Cover {
    const TABLE: &'static str = "covers";
    const COLUMNS: &'static [&'static str] = &["image", "artist"];

    fn id(&self) -> Option<i64> {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
    fn values(&self) -> Vec<Value> {
        vec![self.image.as_str().into(), self.artist.as_deref().into()]
    }
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            image: row.get(1)?,
            artist: row.get(2)?,
        })
    }
}

impl fmt::Display for Cover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.image)
    }
}

/// A row of the users/books join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub user_id: i64,
    pub book_id: i64,
}

impl Association {
    pub const TABLE: &'static str = "association";

    pub fn new(user_id: i64, book_id: i64) -> Self {
        Self { user_id, book_id }
    }

    pub fn to_create(&self) -> CreateOperation {
        CreateOperation::new(Self::TABLE)
            .value("user_id", self.user_id)
            .value("book_id", self.book_id)
    }
}

/// Title and author of a book that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
}

impl NewBook {
    pub fn new(title: &str, author: &str) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
        }
    }

    pub fn into_book(self) -> Book {
        Book::new(self.title, self.author)
    }
}

/// Seed catalogue used by the demos.
pub const BOOKS_DATA: [(&str, &str); 5] = [
    ("The Lord of the Rings", "J. R. R. Tolkien"),
    ("The Chronicles of Narnia", "C. S. Lewis"),
    ("Treasure Island", "R. L. Stevenson"),
    ("Wuthering Heights", "Emily Bronte"),
    ("Martin Eden", "Jack London"),
];

pub fn books_data() -> Vec<NewBook> {
    BOOKS_DATA
        .iter()
        .map(|(title, author)| NewBook::new(title, author))
        .collect()
}

#[derive(Deserialize)]
struct Catalogue {
    #[serde(default)]
    books: Vec<NewBook>,
}

/// Read a catalogue written as TOML `[[books]]` tables with `title` and
/// `author` keys, for seeding something other than [`BOOKS_DATA`].
pub fn parse_books(contents: &str) -> Result<Vec<NewBook>> {
    let catalogue: Catalogue = toml::from_str(contents)?;
    Ok(catalogue.books)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_sql_lists_id_first() {
        assert_eq!(
            Book::select_sql(),
            "SELECT id, title, author, want_to_read, cover_id FROM books"
        );
        assert_eq!(User::select_sql(), "SELECT id, name FROM users");
    }

    #[test]
    fn values_follow_columns() {
        let book = Book::new("The Hobbit", "John R. R. Tolkien");
        assert_eq!(book.values().len(), Book::COLUMNS.len());
        assert_eq!(book.values()[3], Value::Null);

        let cover = Cover::new("hobbit.png", None);
        assert_eq!(cover.values(), vec![Value::Text("hobbit.png".into()), Value::Null]);
    }

    #[test]
    fn display_matches_record_kind() {
        assert_eq!(Book::new("Martin Eden", "Jack London").to_string(), "Martin Eden");
        assert_eq!(User::new("user1").to_string(), "user1");
        assert_eq!(Review::new(1, 1, "5 of 5").to_string(), "5 of 5");
    }

    #[test]
    fn association_insert() {
        let (sql, params) = Association::new(2, 3).to_create().to_sql().unwrap();
        assert_eq!(sql, "INSERT INTO association (user_id, book_id) VALUES (?, ?)");
        assert_eq!(params, vec![Value::Integer(2), Value::Integer(3)]);
    }

    #[test]
    fn parse_books_reads_a_catalogue() {
        let books = parse_books(
            r#"
            [[books]]
            title = "The Hobbit"
            author = "John R. R. Tolkien"

            [[books]]
            title = "War and Peace"
            author = "L. N. Tolstoy"
            "#,
        )
        .unwrap();
        assert_eq!(
            books,
            vec![
                NewBook::new("The Hobbit", "John R. R. Tolkien"),
                NewBook::new("War and Peace", "L. N. Tolstoy"),
            ]
        );
        assert!(parse_books("").unwrap().is_empty());
    }

    #[test]
    fn parse_books_requires_an_author() {
        let err = parse_books("[[books]]\ntitle = \"Anonymous\"").unwrap_err();
        assert!(matches!(err, crate::TrackerError::ConfigParse(_)));
    }
}
