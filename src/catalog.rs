//! Transactional write operations on the catalogue.
//!
//! Each operation opens its own session and either commits everything it did
//! or rolls all of it back and returns the error.

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{Association, Book, NewBook, Review, User};
use crate::session::{rollback_quietly, session_scope, Session};

/// Store one book and return it with its id.
///
/// Spells out the begin/commit/rollback/close steps that [`session_scope`]
/// otherwise wraps.
pub fn create_book(config: &DatabaseConfig, title: &str, author: &str) -> Result<Book> {
    let mut session = Session::open(config)?;
    let mut book = Book::new(title, author);
    let result = session
        .persist(&mut book)
        .and_then(|_| session.commit());
    match result {
        Ok(()) => {
            tracing::info!(id = ?book.id, title, "book stored");
            session.close()?;
            Ok(book)
        }
        Err(err) => {
            rollback_quietly(&mut session);
            tracing::warn!(error = %err, title, "rolled back");
            Err(err)
        }
    }
}

/// Store all books in one transaction; returns the book count seen inside it.
pub fn create_many_books(config: &DatabaseConfig, data: &[NewBook]) -> Result<i64> {
    session_scope(config, |session| {
        session.add_all(data.iter().cloned().map(NewBook::into_book));
        session.count::<Book>()
    })
}

/// One review by `user_id` per book, worded `"{n} of 5"` for the n-th book.
pub fn create_reviews(config: &DatabaseConfig, user_id: i64, book_ids: &[i64]) -> Result<Vec<Review>> {
    session_scope(config, |session| {
        let mut reviews = Vec::with_capacity(book_ids.len());
        for (n, book_id) in book_ids.iter().enumerate() {
            let mut review = Review::new(*book_id, user_id, format!("{} of 5", n + 1));
            session.persist(&mut review)?;
            reviews.push(review);
        }
        Ok(reviews)
    })
}

/// Store new books and put each on the user's reading list.
pub fn add_books_for_reader(config: &DatabaseConfig, user_id: i64, data: &[NewBook]) -> Result<Vec<Book>> {
    session_scope(config, |session| {
        let mut books = Vec::with_capacity(data.len());
        for item in data {
            let mut book = item.clone().into_book();
            let book_id = session.persist(&mut book)?;
            session.link(Association::new(user_id, book_id));
            books.push(book);
        }
        Ok(books)
    })
}

/// Store the books from `data`, then add three users. Each user sees those
/// books in a different rotation, reviews the first five of it and reads
/// every other one. Rows already in the database are left alone.
pub fn seed_library(session: &mut Session, data: &[NewBook]) -> Result<()> {
    let mut books = Vec::with_capacity(data.len());
    for item in data {
        let mut book = item.clone().into_book();
        session.persist(&mut book)?;
        books.push(book);
    }
    session.commit()?;
    if books.is_empty() {
        return Ok(());
    }

    for i in 0..3 {
        let mut user = User::new(format!("user{}", i + 1));
        let user_id = session.persist(&mut user)?;
        let mut order = books.clone();
        order.rotate_left((i * 2) % books.len());
        for (j, book) in order.iter().take(5).enumerate() {
            let Some(book_id) = book.id else { continue };
            session.add(Review::new(book_id, user_id, format!("Rated {} of 5", j + 1)));
            if j % 2 == 0 {
                session.link(Association::new(user_id, book_id));
            }
        }
        session.commit()?;
    }
    tracing::info!(books = books.len(), users = 3, "library seeded");
    Ok(())
}
