//! The table recording which migrations have been applied.
//!
//! One row per applied migration:
//!
//! ```sql
//! create table sluice.schema_migrations(
//!     migration varchar(1024) not null primary key,
//!     rollback text
//! )
//! ```
//!
//! `rollback` holds the migration's down SQL when embedded rollbacks are on.

use sluice_span::{Context, Dialect, Span};
use tracing::{debug, info};

use crate::revision::revision;
use crate::{Error, MetadataTable, Result};

/// One row of the metadata table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub migration: String,

    /// Stored down SQL; `None` if the row predates embedded rollbacks.
    pub rollback: Option<String>,
}

/// Queries and updates the metadata table through a [`Span`].
///
/// Every method runs against whatever span it is given, so metadata changes
/// made inside a migration's transaction commit or roll back with it.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    name: String,
    dialect: Dialect,
}

impl MetadataStore {
    /// Creates the schema and table if they are missing.
    ///
    /// Databases without schemas (SQLite) ignore the schema part, so the
    /// table lives in the default namespace.
    pub fn ensure(ctx: &Context, span: &mut dyn Span, table: &MetadataTable) -> Result<Self> {
        let dialect = span.dialect();

        let name = if dialect.supports_schemas() {
            ensure_postgres(ctx, span, table)?
        } else {
            span.exec_batch(
                ctx,
                &format!(
                    "create table if not exists {}(migration varchar(1024) not null primary key, rollback text)",
                    table.table()
                ),
            )?;
            table.table().to_string()
        };

        debug!(table = %name, %dialect, "metadata table ready");
        Ok(Self { name, dialect })
    }

    /// The name used in queries, e.g. `sluice.schema_migrations`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Takes an exclusive lock on the table until the enclosing transaction
    /// ends. SQLite already holds the database write lock, so this is a no-op.
    pub fn lock(&self, ctx: &Context, span: &mut dyn Span) -> Result<()> {
        match self.dialect {
            Dialect::Postgres => {
                span.exec(
                    ctx,
                    &format!("lock table {} in access exclusive mode", self.name),
                    &[],
                )?;
                Ok(())
            }
            Dialect::Sqlite => Ok(()),
        }
    }

    /// Releases the lock. Both backends release at transaction end.
    pub fn unlock(&self, _ctx: &Context, _span: &mut dyn Span) {}

    pub fn is_applied(&self, ctx: &Context, span: &mut dyn Span, migration: &str) -> Result<bool> {
        let rows = span.query(
            ctx,
            &format!(
                "select migration from {} where migration = {}",
                self.name,
                self.dialect.placeholder(1)
            ),
            &[migration],
        )?;
        Ok(!rows.is_empty())
    }

    /// Every recorded migration, in no particular order.
    pub fn applied(&self, ctx: &Context, span: &mut dyn Span) -> Result<Vec<String>> {
        let rows = span.query(ctx, &format!("select migration from {}", self.name), &[])?;
        Ok(rows.iter().map(|row| row.text(0).to_string()).collect())
    }

    pub fn records(&self, ctx: &Context, span: &mut dyn Span) -> Result<Vec<MigrationRecord>> {
        let rows = span.query(
            ctx,
            &format!("select migration, rollback from {}", self.name),
            &[],
        )?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut values = row.into_values().into_iter();
                MigrationRecord {
                    migration: values.next().flatten().unwrap_or_default(),
                    rollback: values.next().flatten(),
                }
            })
            .collect())
    }

    /// The applied migration with the highest revision.
    ///
    /// Row order is not trusted and unparsable names are ignored.
    pub fn latest_applied(
        &self,
        ctx: &Context,
        span: &mut dyn Span,
    ) -> Result<Option<(u64, String)>> {
        Ok(self
            .applied(ctx, span)?
            .into_iter()
            .filter_map(|name| revision(&name).ok().map(|rev| (rev, name)))
            .max())
    }

    pub fn record_applied(&self, ctx: &Context, span: &mut dyn Span, migration: &str) -> Result<()> {
        span.exec(
            ctx,
            &format!(
                "insert into {}(migration) values ({})",
                self.name,
                self.dialect.placeholder(1)
            ),
            &[migration],
        )?;
        Ok(())
    }

    pub fn record_reverted(
        &self,
        ctx: &Context,
        span: &mut dyn Span,
        migration: &str,
    ) -> Result<()> {
        span.exec(
            ctx,
            &format!(
                "delete from {} where migration = {}",
                self.name,
                self.dialect.placeholder(1)
            ),
            &[migration],
        )?;
        Ok(())
    }

    /// Stores `sql` as the migration's rollback unless one is already stored.
    pub fn store_rollback(
        &self,
        ctx: &Context,
        span: &mut dyn Span,
        migration: &str,
        sql: &str,
    ) -> Result<()> {
        span.exec(
            ctx,
            &format!(
                "update {} set rollback = {} where migration = {} and rollback is null",
                self.name,
                self.dialect.placeholder(1),
                self.dialect.placeholder(2)
            ),
            &[sql, migration],
        )?;
        Ok(())
    }

    /// The stored rollback SQL; `Ok(None)` if the column is NULL and
    /// [`Error::NotFound`] if there is no row.
    pub fn rollback_sql(
        &self,
        ctx: &Context,
        span: &mut dyn Span,
        migration: &str,
    ) -> Result<Option<String>> {
        let row = span
            .query_row(
                ctx,
                &format!(
                    "select rollback from {} where migration = {}",
                    self.name,
                    self.dialect.placeholder(1)
                ),
                &[migration],
            )
            .map_err(|err| {
                if err.is_not_found() {
                    Error::NotFound(migration.to_string())
                } else {
                    err.into()
                }
            })?;

        Ok(row.get(0).map(ToString::to_string))
    }
}

fn ensure_postgres(ctx: &Context, span: &mut dyn Span, table: &MetadataTable) -> Result<String> {
    let schema = match table.schema() {
        "" => "public",
        schema => schema,
    };

    if !table.schema().is_empty() {
        let found = span.query(
            ctx,
            "select schema_name::text from information_schema.schemata where schema_name = $1",
            &[schema],
        )?;

        if found.is_empty() {
            info!(schema, "creating metadata schema");
            span.exec_batch(ctx, &format!("create schema if not exists {schema}"))?;
        }
    }

    let name = table.to_string();
    let found = span.query(
        ctx,
        "select c.relname::text from pg_catalog.pg_class c \
         join pg_catalog.pg_namespace n on n.oid = c.relnamespace \
         where n.nspname = $1 and c.relname = $2",
        &[schema, table.table()],
    )?;

    if found.is_empty() {
        info!(table = %name, "creating metadata table");
        span.exec_batch(
            ctx,
            &format!(
                "create table if not exists {name}(migration varchar(1024) not null primary key, rollback text)"
            ),
        )?;
    }

    Ok(name)
}
