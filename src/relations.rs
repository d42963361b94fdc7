//! Navigation along the relationships between records.
//!
//! - one-to-many: a book's reviews, a user's reviews
//! - many-to-many: readers of a book and books of a reader, through `association`
//! - one-to-one: a book's cover and the book wearing a cover
//!
//! Every function is a single query on the given connection. Pass
//! [`Session::autoflushed`](crate::session::Session::autoflushed) to see
//! the session's pending changes.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, TrackerError};
use crate::models::{Book, Cover, Record, Review, User};

fn qualified<R: Record>(alias: &str) -> String {
    std::iter::once("id")
        .chain(R::COLUMNS.iter().copied())
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn list<R: Record>(conn: &Connection, sql: &str, id: i64) -> Result<Vec<R>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([id], R::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn stored_id<R: Record>(record: &R) -> Result<i64> {
    record.id().ok_or(TrackerError::Unsaved { table: R::TABLE })
}

pub fn reviews_for_book(conn: &Connection, book_id: i64) -> Result<Vec<Review>> {
    let sql = format!("{} WHERE book_id = ?1 ORDER BY id", Review::select_sql());
    list(conn, &sql, book_id)
}

pub fn reviews_by_user(conn: &Connection, user_id: i64) -> Result<Vec<Review>> {
    let sql = format!("{} WHERE user_id = ?1 ORDER BY id", Review::select_sql());
    list(conn, &sql, user_id)
}

pub fn book_of_review(conn: &Connection, review: &Review) -> Result<Book> {
    let sql = format!("{} WHERE id = ?1", Book::select_sql());
    conn.query_row(&sql, [review.book_id], Book::from_row)
        .optional()?
        .ok_or(TrackerError::NotFound {
            table: Book::TABLE,
            id: review.book_id,
        })
}

pub fn reviewer_of(conn: &Connection, review: &Review) -> Result<User> {
    let sql = format!("{} WHERE id = ?1", User::select_sql());
    conn.query_row(&sql, [review.user_id], User::from_row)
        .optional()?
        .ok_or(TrackerError::NotFound {
            table: User::TABLE,
            id: review.user_id,
        })
}

/// Users linked to the book, once per association row.
pub fn readers_of_book(conn: &Connection, book_id: i64) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users u JOIN association a ON a.user_id = u.id \
         WHERE a.book_id = ?1 ORDER BY u.id",
        qualified::<User>("u")
    );
    list(conn, &sql, book_id)
}

/// Books linked to the user, once per association row.
pub fn books_of_user(conn: &Connection, user_id: i64) -> Result<Vec<Book>> {
    let sql = format!(
        "SELECT {} FROM books b JOIN association a ON a.book_id = b.id \
         WHERE a.user_id = ?1 ORDER BY b.id",
        qualified::<Book>("b")
    );
    list(conn, &sql, user_id)
}

pub fn cover_of_book(conn: &Connection, book: &Book) -> Result<Option<Cover>> {
    let Some(cover_id) = book.cover_id else {
        return Ok(None);
    };
    let sql = format!("{} WHERE id = ?1", Cover::select_sql());
    Ok(conn.query_row(&sql, [cover_id], Cover::from_row).optional()?)
}

/// The book wearing `cover`. Nothing stops two books sharing a cover; the
/// lowest id wins.
pub fn book_for_cover(conn: &Connection, cover: &Cover) -> Result<Option<Book>> {
    let cover_id = stored_id(cover)?;
    let sql = format!("{} WHERE cover_id = ?1 ORDER BY id LIMIT 1", Book::select_sql());
    Ok(conn.query_row(&sql, [cover_id], Book::from_row).optional()?)
}
