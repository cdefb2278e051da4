//! SQLite backend over `rusqlite`.

use std::path::Path;

use rusqlite::params_from_iter;
use rusqlite::types::ValueRef;
use tracing::trace;

use crate::{Connection, Context, Dialect, Result, Row};

/// A SQLite database connection.
///
/// Transactions are started with `BEGIN IMMEDIATE`, which takes the database
/// write lock up front. Two migrators pointed at the same file serialize on
/// that lock rather than on a table lock.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Ok(Self { conn })
    }
}

fn text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, _ctx: &Context, sql: &str, args: &[&str]) -> Result<u64> {
        trace!(sql, "sqlite execute");
        let changed = self.conn.execute(sql, params_from_iter(args.iter()))?;
        Ok(changed as u64)
    }

    fn execute_batch(&mut self, _ctx: &Context, sql: &str) -> Result<()> {
        trace!(bytes = sql.len(), "sqlite execute batch");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn query(&mut self, _ctx: &Context, sql: &str, args: &[&str]) -> Result<Vec<Row>> {
        trace!(sql, "sqlite query");
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(args.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns);
            for i in 0..columns {
                values.push(text(row.get_ref(i)?));
            }
            out.push(Row::new(values));
        }

        Ok(out)
    }

    fn begin(&mut self, ctx: &Context) -> Result<()> {
        if let Some(remaining) = ctx.remaining() {
            self.conn.busy_timeout(remaining)?;
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self, _ctx: &Context) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}
