//! Transactional database handles for Sluice.
//!
//! A [`Span`] is anything the migration engine can run SQL against: a plain
//! connection ([`Database`]) or an open [`Transaction`]. Both expose the same
//! begin/exec/query/commit/close surface, so code written against a `Span`
//! works inside or outside a transaction.
//!
//! Backends plug in through the narrow [`Connection`] trait:
//! - [`SqliteConnection`] over `rusqlite` (always available)
//! - `PostgresConnection` over the blocking `postgres` client (feature `postgres`)
//!
//! Every operation honours the [`Context`] passed in by the caller, which
//! carries an optional deadline and a cancellation flag.

mod connection;
mod context;
mod error;
mod span;
mod sqlite;

#[cfg(feature = "postgres")]
mod pg;

pub use connection::{Connection, Dialect, Row};
pub use context::Context;
pub use error::{Result, SpanError};
pub use span::{close_or_abort, Database, Span, Transaction, TxState};
pub use sqlite::SqliteConnection;

#[cfg(feature = "postgres")]
pub use pg::PostgresConnection;
