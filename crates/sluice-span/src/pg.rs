//! PostgreSQL backend over the blocking `postgres` client.

use postgres::types::ToSql;
use postgres::{Client, NoTls};
use tracing::trace;

use crate::{Connection, Context, Dialect, Result, Row};

/// A PostgreSQL connection.
///
/// When the context has a deadline, each transaction sets a local
/// `statement_timeout` so a blocked lock or long statement is cut off
/// server-side.
pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    /// Connects using a libpq-style URI or key/value string, without TLS.
    pub fn connect(uri: &str) -> Result<Self> {
        let client = Client::connect(uri, NoTls)?;
        Ok(Self { client })
    }
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

fn params<'a>(args: &'a [&'a str]) -> Vec<&'a (dyn ToSql + Sync)> {
    args.iter().map(|arg| arg as &(dyn ToSql + Sync)).collect()
}

impl Connection for PostgresConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute(&mut self, _ctx: &Context, sql: &str, args: &[&str]) -> Result<u64> {
        trace!(sql, "postgres execute");
        Ok(self.client.execute(sql, &params(args))?)
    }

    fn execute_batch(&mut self, _ctx: &Context, sql: &str) -> Result<()> {
        trace!(bytes = sql.len(), "postgres execute batch");
        self.client.batch_execute(sql)?;
        Ok(())
    }

    fn query(&mut self, _ctx: &Context, sql: &str, args: &[&str]) -> Result<Vec<Row>> {
        trace!(sql, "postgres query");
        let rows = self.client.query(sql, &params(args))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(row.len());
            for i in 0..row.len() {
                values.push(row.try_get::<_, Option<String>>(i)?);
            }
            out.push(Row::new(values));
        }

        Ok(out)
    }

    fn begin(&mut self, ctx: &Context) -> Result<()> {
        self.client.batch_execute("BEGIN")?;

        if let Some(remaining) = ctx.remaining() {
            let millis = remaining.as_millis().max(1);
            self.client
                .batch_execute(&format!("SET LOCAL statement_timeout = {millis}"))?;
        }

        Ok(())
    }

    fn commit(&mut self, _ctx: &Context) -> Result<()> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.client.batch_execute("ROLLBACK")?;
        Ok(())
    }
}
