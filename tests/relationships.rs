mod common;

use reading_tracker::catalog;
use reading_tracker::loading::{load_books_with_reviews, LoadStrategy};
use reading_tracker::models::{
    books_data, parse_books, Association, Book, Cover, NewBook, Review, User,
};
use reading_tracker::queries;
use reading_tracker::relations;
use reading_tracker::session::Session;

fn stored<R: reading_tracker::models::Record>(session: &mut Session, mut record: R) -> R {
    session.persist(&mut record).unwrap();
    record
}

#[test]
fn book_has_many_reviews() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    let book = stored(&mut session, Book::new("The Hobbit", "John R. R. Tolkien"));
    let other = stored(&mut session, Book::new("Martin Eden", "Jack London"));
    let user = stored(&mut session, User::new("user1"));
    let (book_id, user_id) = (book.id.unwrap(), user.id.unwrap());

    session.add(Review::new(book_id, user_id, "Rated 5 of 5"));
    session.add(Review::new(book_id, user_id, "Rated 4 of 5"));
    session.add(Review::new(other.id.unwrap(), user_id, "Rated 1 of 5"));
    session.commit().unwrap();

    let conn = session.autoflushed().unwrap();
    let reviews = relations::reviews_for_book(conn, book_id).unwrap();
    let texts: Vec<String> = reviews.iter().map(ToString::to_string).collect();
    assert_eq!(texts, vec!["Rated 5 of 5", "Rated 4 of 5"]);

    assert_eq!(relations::reviews_by_user(conn, user_id).unwrap().len(), 3);
    assert_eq!(relations::reviewer_of(conn, &reviews[0]).unwrap().name, "user1");
    assert_eq!(
        relations::book_of_review(conn, &reviews[0]).unwrap().title,
        "The Hobbit"
    );
}

#[test]
fn users_and_books_are_many_to_many() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    let hobbit = stored(&mut session, Book::new("The Hobbit", "John R. R. Tolkien"));
    let eden = stored(&mut session, Book::new("Martin Eden", "Jack London"));
    let anna = stored(&mut session, User::new("anna"));
    let boris = stored(&mut session, User::new("boris"));
    let (hobbit_id, eden_id) = (hobbit.id.unwrap(), eden.id.unwrap());
    let (anna_id, boris_id) = (anna.id.unwrap(), boris.id.unwrap());

    session.link(Association::new(anna_id, hobbit_id));
    session.link(Association::new(anna_id, eden_id));
    session.link(Association::new(boris_id, hobbit_id));
    session.commit().unwrap();

    let conn = session.autoflushed().unwrap();
    let readers: Vec<String> = relations::readers_of_book(conn, hobbit_id)
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(readers, vec!["anna", "boris"]);

    let books: Vec<String> = relations::books_of_user(conn, anna_id)
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(books, vec!["The Hobbit", "Martin Eden"]);
    assert!(relations::readers_of_book(conn, 999).unwrap().is_empty());
}

#[test]
fn duplicate_associations_are_kept() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    let book = stored(&mut session, Book::new("The Hobbit", "John R. R. Tolkien"));
    let user = stored(&mut session, User::new("anna"));
    let link = Association::new(user.id.unwrap(), book.id.unwrap());
    session.link(link);
    session.link(link);
    session.commit().unwrap();

    let conn = session.autoflushed().unwrap();
    assert_eq!(relations::readers_of_book(conn, book.id.unwrap()).unwrap().len(), 2);
    assert_eq!(relations::books_of_user(conn, user.id.unwrap()).unwrap().len(), 2);
}

#[test]
fn book_and_cover_are_one_to_one() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    let cover = stored(&mut session, Cover::new("covers/hobbit.png", Some("Alan Lee")));
    let mut book = stored(&mut session, Book::new("The Hobbit", "John R. R. Tolkien"));
    let bare = stored(&mut session, Book::new("Martin Eden", "Jack London"));
    session.set_cover(&mut book, &cover).unwrap();
    session.commit().unwrap();

    let conn = session.autoflushed().unwrap();
    let found = relations::cover_of_book(conn, &book).unwrap().unwrap();
    assert_eq!(found, cover);
    assert_eq!(found.artist.as_deref(), Some("Alan Lee"));
    assert!(relations::cover_of_book(conn, &bare).unwrap().is_none());

    let owner = relations::book_for_cover(conn, &cover).unwrap().unwrap();
    assert_eq!(owner.id, book.id);
    assert!(relations::book_for_cover(conn, &Cover::new("unsaved.png", None)).is_err());
}

#[test]
fn cover_must_exist() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    let mut book = Book::new("The Hobbit", "John R. R. Tolkien");
    book.cover_id = Some(77);
    assert!(session.persist(&mut book).is_err());
}

#[test]
fn seeded_library_queries() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    catalog::seed_library(&mut session, &books_data()).unwrap();
    assert_eq!(session.count::<Book>().unwrap(), 5);
    assert_eq!(session.count::<User>().unwrap(), 3);
    assert_eq!(session.count::<Review>().unwrap(), 15);

    let conn = session.autoflushed().unwrap();
    let by_title = queries::books_titled(conn, "The Lord of the Rings").unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].author, "J. R. R. Tolkien");

    let by_author = queries::first_book_by_author(conn, "R. L. Stevenson").unwrap();
    assert_eq!(by_author.map(|b| b.title).as_deref(), Some("Treasure Island"));
    assert!(queries::first_book_by_author(conn, "Nobody").unwrap().is_none());

    // Every user gives exactly one "Rated 5 of 5", to the last book in their
    // rotation: book 5 for user1, book 2 for user2, book 4 for user3.
    let top: Vec<i64> = queries::books_with_review_text(conn, "Rated 5 of 5")
        .unwrap()
        .into_iter()
        .filter_map(|b| b.id)
        .collect();
    assert_eq!(top, vec![2, 4, 5]);

    // Each user reads the 1st, 3rd and 5th book of their rotation and reviews
    // all five, so three reviews per user are of books they read.
    let read = queries::reviews_of_read_books(conn).unwrap();
    assert_eq!(read.len(), 9);
    for review in &read {
        let reader_books = relations::books_of_user(conn, review.user_id).unwrap();
        assert!(reader_books.iter().any(|b| b.id == Some(review.book_id)));
    }

    assert_eq!(
        queries::titles_by_author(conn, "Jack London").unwrap(),
        vec!["Martin Eden".to_string()]
    );

    let third = session.get::<Book>(3).unwrap().unwrap();
    assert_eq!(third.title, "Treasure Island");
    assert!(session.get::<Book>(42).unwrap().is_none());
}

#[test]
fn seeding_reviews_five_new_books_per_user() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    let existing = stored(&mut session, Book::new("The Hobbit", "John R. R. Tolkien"));
    session.commit().unwrap();

    let data = parse_books(
        r#"
        [[books]]
        title = "The Lord of the Rings"
        author = "J. R. R. Tolkien"
        [[books]]
        title = "The Chronicles of Narnia"
        author = "C. S. Lewis"
        [[books]]
        title = "Treasure Island"
        author = "R. L. Stevenson"
        [[books]]
        title = "Wuthering Heights"
        author = "Emily Bronte"
        [[books]]
        title = "Martin Eden"
        author = "Jack London"
        [[books]]
        title = "War and Peace"
        author = "L. N. Tolstoy"
        [[books]]
        title = "Anna Karenina"
        author = "L. N. Tolstoy"
        "#,
    )
    .unwrap();
    assert_eq!(data.len(), 7);
    catalog::seed_library(&mut session, &data).unwrap();
    assert_eq!(session.count::<Book>().unwrap(), 8);
    assert_eq!(session.count::<Review>().unwrap(), 15);

    let conn = session.autoflushed().unwrap();
    assert_eq!(queries::books_with_review_text(conn, "Rated 5 of 5").unwrap().len(), 3);
    assert!(queries::books_with_review_text(conn, "Rated 6 of 5").unwrap().is_empty());
    let existing_id = existing.id.unwrap();
    assert!(relations::reviews_for_book(conn, existing_id).unwrap().is_empty());
    assert!(relations::readers_of_book(conn, existing_id).unwrap().is_empty());
}

#[test]
fn loading_strategies() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    catalog::seed_library(&mut session, &books_data()).unwrap();
    let extra = stored(&mut session, Book::new("Unreviewed", "Nobody"));
    session.commit().unwrap();
    let conn = session.autoflushed().unwrap();

    let lazy = load_books_with_reviews(conn, LoadStrategy::Lazy).unwrap();
    assert_eq!(lazy.books.len(), 6);
    assert_eq!(lazy.queries_issued, 7);

    let joined = load_books_with_reviews(conn, LoadStrategy::Joined).unwrap();
    assert_eq!(joined.queries_issued, 1);
    assert_eq!(joined.books, lazy.books);
    for loaded in &joined.books {
        let expected = if loaded.book.id == extra.id { 0 } else { 3 };
        assert_eq!(loaded.reviews.as_ref().map(Vec::len), Some(expected));
    }

    let none = load_books_with_reviews(conn, LoadStrategy::NoLoad).unwrap();
    assert_eq!(none.queries_issued, 1);
    assert_eq!(none.books.len(), 6);
    assert!(none.books.iter().all(|b| b.reviews.is_none()));
}

#[test]
fn books_added_for_a_reader_are_linked() {
    let db = common::create_temp_db();
    let mut session = Session::open(&db.config).unwrap();
    let user = stored(&mut session, User::new("Ruslan"));
    session.commit().unwrap();
    session.close().unwrap();

    let data = vec![
        NewBook::new("Treasure Island", "R. L. Stevenson"),
        NewBook::new("Martin Eden", "Jack London"),
    ];
    let books = catalog::add_books_for_reader(&db.config, user.id.unwrap(), &data).unwrap();
    assert!(books.iter().all(|b| b.id.is_some()));

    let mut session = Session::open(&db.config).unwrap();
    let conn = session.autoflushed().unwrap();
    let linked = relations::books_of_user(conn, user.id.unwrap()).unwrap();
    assert_eq!(linked, books);
}
