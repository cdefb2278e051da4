//! The `Span` interface and its two implementations.

use std::fmt;

use tracing::{debug, warn};

use crate::{Connection, Context, Dialect, Result, Row, SpanError};

/// A database handle usable interchangeably as a connection or a transaction.
pub trait Span {
    fn dialect(&self) -> Dialect;

    /// True for transactions, false for plain connections.
    fn in_tx(&self) -> bool;

    /// Starts a transaction. On a transaction this starts a nested one that
    /// shares the outer transaction's fate.
    fn begin(&mut self, ctx: &Context) -> Result<Transaction<'_>>;

    /// Runs one parameterised statement and returns the affected row count.
    fn exec(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<u64>;

    /// Runs opaque, possibly multi-statement SQL text.
    fn exec_batch(&mut self, ctx: &Context, sql: &str) -> Result<()>;

    fn query(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<Vec<Row>>;

    /// First row of a query, or [`SpanError::NotFound`].
    fn query_row(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<Row> {
        self.query(ctx, sql, args)?
            .into_iter()
            .next()
            .ok_or(SpanError::NotFound)
    }

    /// Commits a transaction; does nothing on a connection.
    fn commit(&mut self, ctx: &Context) -> Result<()>;

    /// Rolls back an uncommitted transaction; does nothing after a commit or
    /// on a connection. Safe to call more than once.
    fn close(&mut self, ctx: &Context) -> Result<()>;
}

/// Closes `span`, panicking if the close fails.
///
/// A failed rollback leaves the connection in an unknown state, which callers
/// cannot reasonably recover from.
pub fn close_or_abort(ctx: &Context, span: &mut dyn Span) {
    if let Err(err) = span.close(ctx) {
        panic!("transaction failed to close: {err}");
    }
}

/// A connection running in autocommit mode.
pub struct Database<C> {
    conn: C,
}

impl<C: Connection> Database<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

impl<C: Connection> Span for Database<C> {
    fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    fn in_tx(&self) -> bool {
        false
    }

    fn begin(&mut self, ctx: &Context) -> Result<Transaction<'_>> {
        Transaction::begin_root(&mut self.conn, ctx)
    }

    fn exec(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<u64> {
        ctx.check()?;
        self.conn.execute(ctx, sql, args)
    }

    fn exec_batch(&mut self, ctx: &Context, sql: &str) -> Result<()> {
        ctx.check()?;
        self.conn.execute_batch(ctx, sql)
    }

    fn query(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<Vec<Row>> {
        ctx.check()?;
        self.conn.query(ctx, sql, args)
    }

    fn commit(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    fn close(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// Lifecycle of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Active,
    Committed,
    Closed,
}

/// A transaction, possibly nested inside another one.
///
/// Only the outermost transaction (depth 0) talks to the database. A nested
/// transaction is a depth counter: committing it only marks it committed,
/// closing it uncommitted flags the parent as rolled back, and the parent's
/// commit then rolls back and reports [`SpanError::RolledBack`].
///
/// Dropping an active transaction closes it.
pub struct Transaction<'a> {
    conn: &'a mut dyn Connection,
    parent_rolled_back: Option<&'a mut bool>,
    depth: usize,
    state: TxState,
    rolled_back: bool,
}

impl<'a> Transaction<'a> {
    fn begin_root(conn: &'a mut dyn Connection, ctx: &Context) -> Result<Self> {
        ctx.check()?;
        conn.begin(ctx)?;
        debug!(dialect = %conn.dialect(), "transaction started");

        Ok(Self {
            conn,
            parent_rolled_back: None,
            depth: 0,
            state: TxState::Active,
            rolled_back: false,
        })
    }

    /// Nesting depth; 0 for the outermost transaction.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Whether a nested transaction closed without committing.
    pub fn is_rolled_back(&self) -> bool {
        self.rolled_back
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state == TxState::Active {
            Ok(())
        } else {
            Err(SpanError::AlreadyClosed)
        }
    }

    fn roll_back(&mut self) -> Result<()> {
        self.state = TxState::Closed;

        match self.parent_rolled_back.as_deref_mut() {
            Some(parent) => {
                *parent = true;
                Ok(())
            }
            None => {
                debug!("transaction rolled back");
                self.conn.rollback()
            }
        }
    }
}

impl Span for Transaction<'_> {
    fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    fn in_tx(&self) -> bool {
        true
    }

    fn begin(&mut self, ctx: &Context) -> Result<Transaction<'_>> {
        self.ensure_active()?;
        ctx.check()?;

        Ok(Transaction {
            conn: &mut *self.conn,
            parent_rolled_back: Some(&mut self.rolled_back),
            depth: self.depth + 1,
            state: TxState::Active,
            rolled_back: false,
        })
    }

    fn exec(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<u64> {
        self.ensure_active()?;
        ctx.check()?;
        self.conn.execute(ctx, sql, args)
    }

    fn exec_batch(&mut self, ctx: &Context, sql: &str) -> Result<()> {
        self.ensure_active()?;
        ctx.check()?;
        self.conn.execute_batch(ctx, sql)
    }

    fn query(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<Vec<Row>> {
        self.ensure_active()?;
        ctx.check()?;
        self.conn.query(ctx, sql, args)
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.ensure_active()?;

        if self.rolled_back {
            self.roll_back()?;
            return Err(SpanError::RolledBack);
        }

        if self.depth == 0 {
            ctx.check()?;
            self.conn.commit(ctx)?;
            debug!("transaction committed");
        }

        self.state = TxState::Committed;
        Ok(())
    }

    fn close(&mut self, _ctx: &Context) -> Result<()> {
        match self.state {
            TxState::Committed | TxState::Closed => Ok(()),
            TxState::Active => self.roll_back(),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state == TxState::Active {
            if let Err(err) = self.roll_back() {
                warn!(error = %err, depth = self.depth, "failed to roll back dropped transaction");
            }
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("dialect", &self.conn.dialect())
            .field("depth", &self.depth)
            .field("state", &self.state)
            .field("rolled_back", &self.rolled_back)
            .finish_non_exhaustive()
    }
}
