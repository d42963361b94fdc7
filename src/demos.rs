//! The instructional programs. Each one creates the schema if needed, runs
//! against the configured database file and writes what it observes to `out`.

use std::io::Write;

use anyhow::{Context, Result};

use crate::catalog;
use crate::config::DatabaseConfig;
use crate::crud::{self, CreateOperation, CrudOperation};
use crate::loading::{load_books_with_reviews, LoadStrategy};
use crate::models::{books_data, Association, Book, Cover, Record, Review, User, BOOKS_DATA};
use crate::queries;
use crate::raw::{self, SqlQuery};
use crate::relations;
use crate::schema::tracker_schema;
use crate::session::{session_scope, Session};

pub const DEMOS: [&str; 4] = ["intro", "models", "query", "sessions"];

pub fn run(name: &str, config: &DatabaseConfig, out: &mut impl Write) -> Result<()> {
    match name {
        "intro" => intro(config, out),
        "models" => models(config, out),
        "query" => query(config, out),
        "sessions" => sessions(config, out),
        other => anyhow::bail!("unknown demo `{other}`, expected one of {}", DEMOS.join(", ")),
    }
}

fn prepare(config: &DatabaseConfig) -> Result<()> {
    let conn = config.open().context("failed to open database")?;
    tracker_schema()
        .create_all(&conn)
        .context("failed to create schema")?;
    Ok(())
}

/// Three ways to reach the same rows: raw SQL, table operations, records.
pub fn intro(config: &DatabaseConfig, out: &mut impl Write) -> Result<()> {
    prepare(config)?;
    let conn = config.open()?;

    // Table operations
    crud::execute(
        &conn,
        &CrudOperation::Create(
            CreateOperation::new(Book::TABLE)
                .value("title", "The Hobbit")
                .value("author", "John R. R. Tolkien")
                .value("want_to_read", false),
        ),
    )?;
    writeln!(out, "Query by table operations:")?;
    for title in queries::titles_by_author(&conn, "John R. R. Tolkien")? {
        writeln!(out, "('{title}',)")?;
    }

    // Raw SQL
    let select = SqlQuery::new("SELECT title, want_to_read FROM books WHERE author LIKE :author")
        .bind("author", "John R. R. Tolkien");
    let rows = raw::query(&conn, &select)?;
    writeln!(out, "Raw SQL query: {}", format_rows(&rows))?;

    let update = SqlQuery::new("UPDATE books SET want_to_read = 1 WHERE title = :title")
        .bind("title", "The Hobbit");
    raw::execute(&conn, &update)?;
    let rows = raw::query(&conn, &select)?;
    writeln!(out, "Updated: {}", format_rows(&rows))?;
    drop(conn);

    // Records through a session
    let mut session = Session::open(config)?;
    session.add(Book::new("The Hobbit", "John R. R. Tolkien"));
    session.commit()?;
    let books = session.filter_by::<Book>("author", "John R. R. Tolkien")?;
    writeln!(out, "Query by records: {}", format_list(&books))?;
    session.close()?;
    Ok(())
}

/// Relationship patterns: one-to-many, many-to-many and one-to-one.
pub fn models(config: &DatabaseConfig, out: &mut impl Write) -> Result<()> {
    prepare(config)?;
    let mut session = Session::open(config)?;

    let mut cover = Cover::new("covers/hobbit.png", Some("Alan Lee"));
    session.persist(&mut cover)?;
    let mut book = Book::new("The Hobbit", "John R. R. Tolkien");
    let book_id = session.persist(&mut book)?;
    session.set_cover(&mut book, &cover)?;

    let mut reader = User::new("reader");
    let user_id = session.persist(&mut reader)?;
    session.add(Review::new(book_id, user_id, "A fine adventure"));
    session.link(Association::new(user_id, book_id));
    session.commit()?;

    let conn = session.autoflushed()?;
    let reviews = relations::reviews_for_book(conn, book_id)?;
    writeln!(out, "Reviews of {book}: {}", format_list(&reviews))?;
    for review in &reviews {
        writeln!(out, "  by {}", relations::reviewer_of(conn, review)?)?;
    }
    writeln!(
        out,
        "Readers of {book}: {}",
        format_list(&relations::readers_of_book(conn, book_id)?)
    )?;
    writeln!(
        out,
        "Books of {reader}: {}",
        format_list(&relations::books_of_user(conn, user_id)?)
    )?;
    match relations::cover_of_book(conn, &book)? {
        Some(cover) => writeln!(out, "Cover of {book}: {cover}")?,
        None => writeln!(out, "{book} has no cover")?,
    }
    if let Some(owner) = relations::book_for_cover(conn, &cover)? {
        writeln!(out, "Cover {cover} belongs to {owner}")?;
    }
    session.close()?;
    Ok(())
}

/// Filters, lookups, joins and the three review loading strategies.
pub fn query(config: &DatabaseConfig, out: &mut impl Write) -> Result<()> {
    prepare(config)?;
    let mut session = Session::open(config)?;
    // Other demos may have stored books already; seed once per database.
    if queries::books_titled(session.autoflushed()?, BOOKS_DATA[0].0)?.is_empty() {
        catalog::seed_library(&mut session, &books_data())?;
    }

    let conn = session.autoflushed()?;
    let by_title = queries::books_titled(conn, "The Lord of the Rings")?;
    writeln!(out, "Filtered by title: {}", format_list(&by_title))?;

    let by_author = queries::first_book_by_author(conn, "R. L. Stevenson")?;
    writeln!(out, "First by author: {}", format_opt(by_author.as_ref()))?;

    let joined = queries::books_with_review_text(conn, "Rated 5 of 5")?;
    writeln!(out, "Joined with reviews: {}", format_list(&joined))?;

    for review in queries::reviews_of_read_books(conn)? {
        let reader_books = relations::books_of_user(conn, review.user_id)?;
        let ids: Vec<String> = reader_books
            .iter()
            .filter_map(|b| b.id)
            .map(|id| id.to_string())
            .collect();
        writeln!(out, "Reviewed book: {}", review.book_id)?;
        writeln!(out, "Books read by the reviewer: [{}]", ids.join(", "))?;
        writeln!(out, "-----------")?;
    }

    let by_id = session.get::<Book>(3)?;
    writeln!(out, "By id: {}", format_opt(by_id.as_ref()))?;

    let conn = session.autoflushed()?;
    for strategy in [LoadStrategy::Lazy, LoadStrategy::Joined, LoadStrategy::NoLoad] {
        let loaded = load_books_with_reviews(conn, strategy)?;
        writeln!(
            out,
            "{strategy:?} loading: {} books in {} queries",
            loaded.books.len(),
            loaded.queries_issued
        )?;
        if let Some(first) = loaded.books.first() {
            match &first.reviews {
                Some(reviews) => writeln!(out, "  {}: {}", first.book, format_list(reviews))?,
                None => writeln!(out, "  {}: reviews not loaded", first.book)?,
            }
        }
    }
    session.close()?;
    Ok(())
}

/// Session lifecycle: scoped transactions, expire/refresh, flush and rollback.
pub fn sessions(config: &DatabaseConfig, out: &mut impl Write) -> Result<()> {
    prepare(config)?;

    let book = catalog::create_book(config, "War and Peace", "L. N. Tolstoy")?;
    writeln!(out, "Stored row {}", format_id(book.id))?;

    let count = catalog::create_many_books(config, &books_data())?;
    writeln!(out, "Books in the database: {count}")?;

    let mut session = Session::open(config)?;
    let mut user = User::new("Ruslan");
    session.persist(&mut user)?;
    session.commit()?;
    let user_id = user.id.context("user has no id after commit")?;

    let book_ids: Vec<i64> = session
        .all::<Book>()?
        .iter()
        .filter_map(|b| b.id)
        .take(5)
        .collect();
    let reviews = catalog::create_reviews(config, user_id, &book_ids)?;
    writeln!(out, "Reviews: {}", format_list(&reviews))?;

    let books = catalog::add_books_for_reader(config, user_id, &books_data())?;
    writeln!(out, "Books of the user: {}", format_list(&books))?;

    writeln!(out, "Changing the database outside the session")?;
    session_scope(config, |other: &mut Session| -> Result<()> {
        let mut renamed = user.clone();
        renamed.name = "Vladimir".to_string();
        other.save(&renamed)?;
        Ok(())
    })?;

    writeln!(out, "Before expire/refresh: {}", user.name)?;
    session.expire(&user)?;
    writeln!(out, "expired")?;
    session.reload_if_expired(&mut user)?;
    writeln!(out, "After expire: {}", user.name)?;
    session.refresh(&mut user)?;
    writeln!(out, "refreshed")?;
    writeln!(out, "After refresh: {}", user.name)?;

    let mut pending = User::new("Alexander");
    let id = session.persist(&mut pending)?;
    writeln!(out, "Primary key after flush: {id}")?;
    session.rollback()?;
    let users = session.all::<User>()?;
    writeln!(out, "After rollback the row is gone: {}", format_list(&users))?;
    session.close()?;
    Ok(())
}

fn format_list<T: std::fmt::Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

fn format_opt<T: std::fmt::Display>(item: Option<&T>) -> String {
    item.map_or_else(|| "None".to_string(), ToString::to_string)
}

fn format_id(id: Option<i64>) -> String {
    id.map_or_else(|| "None".to_string(), |id| id.to_string())
}

fn format_rows(rows: &[raw::Row]) -> String {
    format_list(rows)
}
