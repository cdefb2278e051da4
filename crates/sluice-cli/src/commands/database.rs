//! Opening a database from a URI.

use anyhow::{Context, Result, bail};
use sluice_span::{Database, Span, SqliteConnection};
use tracing::debug;

const SQLITE_MEMORY: &str = "sqlite::memory:";

/// Which backend a URI points at.
#[derive(Debug, PartialEq, Eq)]
pub enum Location<'a> {
    SqliteMemory,
    SqliteFile(&'a str),
    Postgres(&'a str),
}

/// Classifies a URI. Anything without a recognized scheme is a SQLite path.
pub fn parse(uri: &str) -> Result<Location<'_>> {
    if uri.is_empty() {
        bail!("missing database URI");
    }
    if uri == SQLITE_MEMORY {
        return Ok(Location::SqliteMemory);
    }
    if uri.starts_with("postgres://") || uri.starts_with("postgresql://") {
        return Ok(Location::Postgres(uri));
    }

    let path = uri
        .strip_prefix("sqlite://")
        .or_else(|| uri.strip_prefix("sqlite:"))
        .unwrap_or(uri);
    if path.is_empty() {
        bail!("missing SQLite database path in {uri:?}");
    }
    Ok(Location::SqliteFile(path))
}

pub fn open(uri: &str) -> Result<Box<dyn Span>> {
    let location = parse(uri)?;
    debug!(?location, "opening database");

    match location {
        Location::SqliteMemory => {
            let conn = SqliteConnection::open_in_memory()
                .context("Failed to open in-memory SQLite database")?;
            Ok(Box::new(Database::new(conn)))
        }
        Location::SqliteFile(path) => {
            let conn = SqliteConnection::open(path)
                .with_context(|| format!("Failed to open SQLite database {path}"))?;
            Ok(Box::new(Database::new(conn)))
        }
        Location::Postgres(uri) => open_postgres(uri),
    }
}

#[cfg(feature = "postgres")]
fn open_postgres(uri: &str) -> Result<Box<dyn Span>> {
    let conn = sluice_span::PostgresConnection::connect(uri)
        .context("Failed to connect to PostgreSQL")?;
    Ok(Box::new(Database::new(conn)))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_uri: &str) -> Result<Box<dyn Span>> {
    bail!("PostgreSQL support is not compiled in (rebuild with --features postgres)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sqlite_forms() {
        assert_eq!(parse("sqlite::memory:").unwrap(), Location::SqliteMemory);
        assert_eq!(parse("sqlite:app.db").unwrap(), Location::SqliteFile("app.db"));
        assert_eq!(
            parse("sqlite:///tmp/app.db").unwrap(),
            Location::SqliteFile("/tmp/app.db")
        );
        assert_eq!(parse("data/app.db").unwrap(), Location::SqliteFile("data/app.db"));
    }

    #[test]
    fn test_parse_postgres() {
        let uri = "postgres://user@localhost/app";
        assert_eq!(parse(uri).unwrap(), Location::Postgres(uri));
        assert!(matches!(
            parse("postgresql://localhost/app").unwrap(),
            Location::Postgres(_)
        ));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(parse("").is_err());
        assert!(parse("sqlite:").is_err());
    }

    #[test]
    fn test_open_in_memory() {
        let span = open("sqlite::memory:").unwrap();
        assert!(!span.in_tx());
    }
}
