//! Reading-tracker queries: filters, lookups and joins across the schema.

use rusqlite::{params, Connection, OptionalExtension};

use crate::crud::{self, CrudOperation, CrudOutcome, Query, ReadOperation};
use crate::error::Result;
use crate::models::{Book, Record, Review};

/// Books with exactly this title.
pub fn books_titled(conn: &Connection, title: &str) -> Result<Vec<Book>> {
    let sql = format!("{} WHERE title = ?1 ORDER BY id", Book::select_sql());
    let mut stmt = conn.prepare(&sql)?;
    let books = stmt
        .query_map([title], Book::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(books)
}

pub fn first_book_by_author(conn: &Connection, author: &str) -> Result<Option<Book>> {
    let sql = format!("{} WHERE author = ?1 ORDER BY id LIMIT 1", Book::select_sql());
    Ok(conn.query_row(&sql, [author], Book::from_row).optional()?)
}

/// Books that received a review with exactly this text, each book once.
pub fn books_with_review_text(conn: &Connection, text: &str) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT b.id, b.title, b.author, b.want_to_read, b.cover_id \
         FROM books b JOIN reviews r ON r.book_id = b.id \
         WHERE r.text = ?1 ORDER BY b.id",
    )?;
    let books = stmt
        .query_map([text], Book::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(books)
}

/// Reviews written by users who also have the reviewed book on their list.
pub fn reviews_of_read_books(conn: &Connection) -> Result<Vec<Review>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.book_id, r.user_id, r.text \
         FROM reviews r JOIN users u ON u.id = r.user_id \
         WHERE EXISTS (SELECT 1 FROM association a \
                       WHERE a.user_id = u.id AND a.book_id = r.book_id) \
         ORDER BY r.id",
    )?;
    let reviews = stmt
        .query_map(params![], Review::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(reviews)
}

/// Titles by `author`, selected through a table-level read operation.
pub fn titles_by_author(conn: &Connection, author: &str) -> Result<Vec<String>> {
    let op = ReadOperation::new(Book::TABLE)
        .fields(&["title"])
        .filter(Query::new().eq("author", author))
        .order_by("id", true);
    let CrudOutcome::Rows(rows) = crud::execute(conn, &CrudOperation::Read(op))? else {
        return Ok(Vec::new());
    };
    Ok(rows
        .iter()
        .filter_map(|row| row.get("title").and_then(|v| v.as_str()).map(str::to_string))
        .collect())
}
