//! A reading and review tracker stored in a single SQLite file.
//!
//! # Intention
//!
//! - Show the common ways of talking to a relational store from one small
//!   domain: raw SQL, table-level operations, and records moved through a
//!   unit-of-work session.
//! - Keep every transaction boundary explicit: changes are buffered, flushed,
//!   committed or rolled back by the caller.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here; `rusqlite` does the SQL work.
//! - No query DSL, identity map or lazy proxies. Relationship loading is an
//!   explicit function call.
//!
//! # Modules
//!
//! - [`config`] - database and logging settings, connection setup
//! - [`schema`] - declarative tables rendered to DDL
//! - [`raw`] - named-parameter SQL and dynamic row values
//! - [`crud`] - single-table create/read/update/delete operations
//! - [`models`] - books, reviews, users, covers and the join row
//! - [`session`] - the unit-of-work session and `session_scope`
//! - [`relations`], [`loading`], [`queries`] - reading across relationships
//! - [`catalog`] - transactional write operations
//! - [`demos`] - the instructional programs behind the binary

pub mod catalog;
pub mod config;
pub mod crud;
pub mod demos;
pub mod error;
pub mod loading;
pub mod models;
pub mod queries;
pub mod raw;
pub mod relations;
pub mod schema;
pub mod session;

pub use error::{Result, TrackerError};
pub use session::{session_scope, Session};
