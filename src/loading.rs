//! Strategies for loading each book's reviews.

use rusqlite::Connection;

use crate::error::Result;
use crate::models::{Book, Record, Review};
use crate::relations;

/// How `Book.reviews` is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Books first, then one query per book.
    Lazy,
    /// One LEFT OUTER JOIN over books and reviews.
    Joined,
    /// Books only; reviews are left unloaded.
    NoLoad,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookWithReviews {
    pub book: Book,
    /// `None` when the strategy did not load reviews.
    pub reviews: Option<Vec<Review>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedBooks {
    pub books: Vec<BookWithReviews>,
    pub queries_issued: usize,
}

pub fn load_books_with_reviews(conn: &Connection, strategy: LoadStrategy) -> Result<LoadedBooks> {
    let loaded = match strategy {
        LoadStrategy::Joined => load_joined(conn)?,
        LoadStrategy::Lazy | LoadStrategy::NoLoad => {
            let sql = format!("{} ORDER BY id", Book::select_sql());
            let mut stmt = conn.prepare(&sql)?;
            let books = stmt
                .query_map([], Book::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let mut queries_issued = 1;
            let mut loaded = Vec::with_capacity(books.len());
            for book in books {
                let reviews = match (strategy, book.id) {
                    (LoadStrategy::Lazy, Some(id)) => {
                        queries_issued += 1;
                        Some(relations::reviews_for_book(conn, id)?)
                    }
                    _ => None,
                };
                loaded.push(BookWithReviews { book, reviews });
            }
            LoadedBooks {
                books: loaded,
                queries_issued,
            }
        }
    };
    tracing::debug!(
        ?strategy,
        books = loaded.books.len(),
        queries = loaded.queries_issued,
        "loaded books"
    );
    Ok(loaded)
}

fn load_joined(conn: &Connection) -> Result<LoadedBooks> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.title, b.author, b.want_to_read, b.cover_id, \
                r.id, r.book_id, r.user_id, r.text \
         FROM books b LEFT OUTER JOIN reviews r ON r.book_id = b.id \
         ORDER BY b.id, r.id",
    )?;
    let mut rows = stmt.query([])?;
    let mut books: Vec<BookWithReviews> = Vec::new();
    while let Some(row) = rows.next()? {
        let book = Book::from_row(row)?;
        let review_id: Option<i64> = row.get(5)?;
        let review = match review_id {
            Some(id) => Some(Review {
                id: Some(id),
                book_id: row.get(6)?,
                user_id: row.get(7)?,
                text: row.get(8)?,
            }),
            None => None,
        };

        let same_book = books.last().map_or(false, |last| last.book.id == book.id);
        if !same_book {
            books.push(BookWithReviews {
                book,
                reviews: Some(Vec::new()),
            });
        }
        if let (Some(review), Some(current)) = (review, books.last_mut()) {
            current.reviews.get_or_insert_with(Vec::new).push(review);
        }
    }
    Ok(LoadedBooks {
        books,
        queries_issued: 1,
    })
}
