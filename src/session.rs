//! Unit-of-work session over one SQLite connection.
//!
//! A [`Session`] buffers inserts, updates and deletes until they are flushed.
//! The first write opens a transaction; [`Session::commit`] makes it durable and
//! [`Session::rollback`] throws it away together with anything still pending.
//! Reads flush first, so a query always sees the session's own changes.
//!
//! Records are plain values. The session does not track instances: `expire`
//! only remembers which rows must be reloaded before they are trusted again,
//! and commit or rollback marks every row that way.
//!
//! ```no_run
//! use reading_tracker::config::DatabaseConfig;
//! use reading_tracker::models::Book;
//! use reading_tracker::session::session_scope;
//!
//! let config = DatabaseConfig::new("db.sqlite");
//! let count = session_scope(&config, |session| {
//!     session.add(Book::new("The Hobbit", "John R. R. Tolkien"));
//!     session.count::<Book>()
//! })
//! .unwrap();
//! println!("{count} books");
//! ```

use std::collections::{HashSet, VecDeque};

use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::config::DatabaseConfig;
use crate::crud::{self, CreateOperation, CrudOperation, DeleteOperation, Query, UpdateOperation};
use crate::error::{Result, TrackerError};
use crate::models::{Association, Book, Cover, Record};
use crate::raw::Value;

pub struct Session {
    conn: Connection,
    pending: VecDeque<CrudOperation>,
    expired: HashSet<(&'static str, i64)>,
    // Set by expire_all; `fresh` holds rows refreshed since.
    all_expired: bool,
    fresh: HashSet<(&'static str, i64)>,
}

impl Session {
    /// Open a session on a fresh connection to the configured database.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(config.open()?))
    }

    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            pending: VecDeque::new(),
            expired: HashSet::new(),
            all_expired: false,
            fresh: HashSet::new(),
        }
    }

    /// The connection, without flushing pending work.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flush pending work, then hand out the connection for reads.
    pub fn autoflushed(&mut self) -> Result<&Connection> {
        self.flush()?;
        Ok(&self.conn)
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Number of queued operations not yet sent to the database.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue an insert of `record`.
    pub fn add<R: Record>(&mut self, record: R) {
        self.pending.push_back(CrudOperation::Create(insert_of(&record)));
    }

    pub fn add_all<R: Record>(&mut self, records: impl IntoIterator<Item = R>) {
        for record in records {
            self.add(record);
        }
    }

    /// Queue an update writing every column of a stored record.
    pub fn save<R: Record>(&mut self, record: &R) -> Result<()> {
        let id = require_id(record)?;
        let mut op = UpdateOperation::new(R::TABLE).filter(Query::new().eq("id", id));
        for (column, value) in R::COLUMNS.iter().zip(record.values()) {
            op = op.set(column, value);
        }
        self.pending.push_back(CrudOperation::Update(op));
        Ok(())
    }

    /// Queue deletion of a stored record.
    pub fn delete<R: Record>(&mut self, record: &R) -> Result<()> {
        let id = require_id(record)?;
        self.pending.push_back(CrudOperation::Delete(DeleteOperation::new(
            R::TABLE,
            Query::new().eq("id", id),
        )));
        Ok(())
    }

    /// Queue a row in the users/books join table. Linking the same pair twice
    /// stores two rows.
    pub fn link(&mut self, association: Association) {
        self.pending.push_back(CrudOperation::Create(association.to_create()));
    }

    /// Point `book` at `cover` and queue the change.
    pub fn set_cover(&mut self, book: &mut Book, cover: &Cover) -> Result<()> {
        book.cover_id = Some(require_id(cover)?);
        self.save(book)
    }

    fn begin(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
            tracing::debug!("transaction started");
        }
        Ok(())
    }

    /// Send pending operations to the database inside the open transaction.
    ///
    /// Returns the row ids of queued inserts in queue order. On failure the
    /// operations not yet executed stay queued and the transaction stays
    /// open; roll back to discard both.
    pub fn flush(&mut self) -> Result<Vec<i64>> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        self.begin()?;
        let mut inserted = Vec::new();
        let total = self.pending.len();
        while let Some(op) = self.pending.front() {
            let outcome = crud::execute(&self.conn, op)?;
            self.pending.pop_front();
            if let Some(id) = outcome.inserted_id() {
                inserted.push(id);
            }
        }
        tracing::debug!(operations = total, inserted = inserted.len(), "flushed");
        Ok(inserted)
    }

    /// Flush and insert `record` now, assigning its primary key before commit.
    pub fn persist<R: Record>(&mut self, record: &mut R) -> Result<i64> {
        self.flush()?;
        self.begin()?;
        crud::execute(&self.conn, &CrudOperation::Create(insert_of(record)))?;
        let id = self.conn.last_insert_rowid();
        record.set_id(id);
        self.mark_fresh(R::TABLE, id);
        Ok(id)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.flush()?;
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
            tracing::debug!("committed");
        }
        self.expire_all();
        Ok(())
    }

    /// Discard pending operations and roll back the open transaction.
    pub fn rollback(&mut self) -> Result<()> {
        let discarded = self.pending.len();
        self.pending.clear();
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
            tracing::debug!(discarded, "rolled back");
        }
        self.expire_all();
        Ok(())
    }

    /// Roll back anything uncommitted and release the connection.
    pub fn close(mut self) -> Result<()> {
        self.rollback()
    }

    /// Mark `record` stale; [`Session::reload_if_expired`] will re-read it.
    pub fn expire<R: Record>(&mut self, record: &R) -> Result<()> {
        let id = require_id(record)?;
        self.fresh.remove(&(R::TABLE, id));
        self.expired.insert((R::TABLE, id));
        Ok(())
    }

    /// Mark every stored record stale.
    pub fn expire_all(&mut self) {
        self.expired.clear();
        self.fresh.clear();
        self.all_expired = true;
    }

    pub fn is_expired<R: Record>(&self, record: &R) -> bool {
        record.id().map_or(false, |id| {
            let key = (R::TABLE, id);
            self.expired.contains(&key) || (self.all_expired && !self.fresh.contains(&key))
        })
    }

    /// Re-read `record` from the database and clear its expired mark.
    pub fn refresh<R: Record>(&mut self, record: &mut R) -> Result<()> {
        let id = require_id(record)?;
        *record = self
            .get::<R>(id)?
            .ok_or(TrackerError::NotFound { table: R::TABLE, id })?;
        self.mark_fresh(R::TABLE, id);
        Ok(())
    }

    fn mark_fresh(&mut self, table: &'static str, id: i64) {
        self.expired.remove(&(table, id));
        if self.all_expired {
            self.fresh.insert((table, id));
        }
    }

    /// Refresh `record` only if it was expired. Returns whether it was reloaded.
    pub fn reload_if_expired<R: Record>(&mut self, record: &mut R) -> Result<bool> {
        if self.is_expired(record) {
            self.refresh(record)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Fetch a record by primary key.
    pub fn get<R: Record>(&mut self, id: i64) -> Result<Option<R>> {
        let sql = format!("{} WHERE id = ?1", R::select_sql());
        let conn = self.autoflushed()?;
        Ok(conn.query_row(&sql, [id], R::from_row).optional()?)
    }

    pub fn all<R: Record>(&mut self) -> Result<Vec<R>> {
        let sql = format!("{} ORDER BY id", R::select_sql());
        self.fetch(&sql, Vec::new())
    }

    /// Records whose `column` equals `value`, in id order.
    pub fn filter_by<R: Record>(&mut self, column: &str, value: impl Into<Value>) -> Result<Vec<R>> {
        let (sql, params) = select_where::<R>(column, value.into())?;
        self.fetch(&sql, params)
    }

    /// First record (lowest id) whose `column` equals `value`.
    pub fn first_by<R: Record>(&mut self, column: &str, value: impl Into<Value>) -> Result<Option<R>> {
        let (sql, params) = select_where::<R>(column, value.into())?;
        Ok(self.fetch(&format!("{sql} LIMIT 1"), params)?.into_iter().next())
    }

    pub fn count<R: Record>(&mut self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
        let conn = self.autoflushed()?;
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    }

    fn fetch<R: Record>(&mut self, sql: &str, params: Vec<Value>) -> Result<Vec<R>> {
        let conn = self.autoflushed()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), R::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.in_transaction() {
            tracing::warn!(
                pending = self.pending.len(),
                "session dropped with an open transaction, rolling back"
            );
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %err, "rollback on drop failed");
            }
        }
    }
}

fn require_id<R: Record>(record: &R) -> Result<i64> {
    record.id().ok_or(TrackerError::Unsaved { table: R::TABLE })
}

fn insert_of<R: Record>(record: &R) -> CreateOperation {
    let mut op = CreateOperation::new(R::TABLE);
    if let Some(id) = record.id() {
        op = op.value("id", id);
    }
    for (column, value) in R::COLUMNS.iter().zip(record.values()) {
        op = op.value(column, value);
    }
    op
}

fn select_where<R: Record>(column: &str, value: Value) -> Result<(String, Vec<Value>)> {
    crate::error::check_identifier(column)?;
    Ok((
        format!("{} WHERE {column} = ?1 ORDER BY id", R::select_sql()),
        vec![value],
    ))
}

/// Run `work` in a session: commit if it succeeds, roll back and return its
/// error if it fails. The session is released either way.
pub fn session_scope<T, E, F>(config: &DatabaseConfig, work: F) -> std::result::Result<T, E>
where
    F: FnOnce(&mut Session) -> std::result::Result<T, E>,
    E: From<TrackerError>,
{
    let mut session = Session::open(config)?;
    match work(&mut session) {
        Ok(value) => {
            if let Err(err) = session.commit() {
                rollback_quietly(&mut session);
                return Err(err.into());
            }
            session.close()?;
            Ok(value)
        }
        Err(err) => {
            rollback_quietly(&mut session);
            Err(err)
        }
    }
}

/// Roll back while another error is already on its way out.
pub(crate) fn rollback_quietly(session: &mut Session) {
    if let Err(err) = session.rollback() {
        tracing::warn!(error = %err, "rollback failed");
    }
}
