//! Backend adapter capability.

use std::fmt;

use crate::{Context, Result};

/// SQL flavour spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Positional parameter marker for the `n`th (1-based) argument.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Self::Sqlite => format!("?{n}"),
            Self::Postgres => format!("${n}"),
        }
    }

    /// Whether tables can live in a named schema.
    pub fn supports_schemas(self) -> bool {
        matches!(self, Self::Postgres)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::Postgres => f.write_str("postgres"),
        }
    }
}

/// A result row with every column read as nullable text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<Option<String>>,
}

impl Row {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column `index` as text; `None` if it is NULL or out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|value| value.as_deref())
    }

    /// Column `index` as text, with NULL and out-of-range read as `""`.
    pub fn text(&self, index: usize) -> &str {
        self.get(index).unwrap_or_default()
    }

    pub fn is_null(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(None))
    }

    pub fn into_values(self) -> Vec<Option<String>> {
        self.values
    }
}

/// Primitives a database backend provides.
///
/// Implementations do not track transaction state; [`Transaction`](crate::Transaction)
/// does that on top of `begin`/`commit`/`rollback`.
pub trait Connection {
    fn dialect(&self) -> Dialect;

    /// Runs one parameterised statement and returns the affected row count.
    fn execute(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<u64>;

    /// Runs opaque, possibly multi-statement SQL text.
    fn execute_batch(&mut self, ctx: &Context, sql: &str) -> Result<()>;

    /// Runs a query and collects every row.
    fn query(&mut self, ctx: &Context, sql: &str, args: &[&str]) -> Result<Vec<Row>>;

    fn begin(&mut self, ctx: &Context) -> Result<()>;

    fn commit(&mut self, ctx: &Context) -> Result<()>;

    /// Must work after the context has been cancelled.
    fn rollback(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Dialect::Sqlite, 1, "?1"; "sqlite first")]
    #[test_case(Dialect::Sqlite, 3, "?3"; "sqlite third")]
    #[test_case(Dialect::Postgres, 1, "$1"; "postgres first")]
    #[test_case(Dialect::Postgres, 2, "$2"; "postgres second")]
    fn test_placeholders(dialect: Dialect, n: usize, expected: &str) {
        assert_eq!(dialect.placeholder(n), expected);
    }

    #[test]
    fn test_only_postgres_has_schemas() {
        assert!(Dialect::Postgres.supports_schemas());
        assert!(!Dialect::Sqlite.supports_schemas());
    }

    #[test]
    fn test_row_accessors_distinguish_null_from_missing() {
        let row = Row::new(vec![Some("a".to_string()), None]);

        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some("a"));
        assert_eq!(row.get(1), None);
        assert!(row.is_null(1));
        assert!(!row.is_null(2), "out of range is not NULL");
        assert_eq!(row.text(1), "");
    }
}
