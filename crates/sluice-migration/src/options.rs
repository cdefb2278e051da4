//! Engine configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("identifier regex is valid")
});

/// The revision to migrate to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    /// The highest revision available in the migration files.
    #[default]
    Latest,
    Revision(u64),
}

impl Target {
    /// Whether a migration at `revision` is needed to reach this target.
    pub fn includes(self, revision: u64) -> bool {
        match self {
            Self::Latest => true,
            Self::Revision(target) => revision <= target,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Revision(revision) => write!(f, "{revision}"),
        }
    }
}

impl From<u64> for Target {
    fn from(revision: u64) -> Self {
        Self::Revision(revision)
    }
}

/// A validated `schema.table` name for the metadata table.
///
/// The schema may be empty, meaning the database's default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTable {
    schema: String,
    table: String,
}

impl MetadataTable {
    pub const DEFAULT_SCHEMA: &'static str = "sluice";
    pub const DEFAULT_TABLE: &'static str = "schema_migrations";

    /// Validates both parts; an empty `schema` is allowed.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let schema = schema.into();
        let table = table.into();

        if !schema.is_empty() && !IDENTIFIER.is_match(&schema) {
            return Err(Error::InvalidSchemaName(schema));
        }
        if table.is_empty() {
            return Err(Error::TableNameRequired);
        }
        if !IDENTIFIER.is_match(&table) {
            return Err(Error::InvalidTableName(table));
        }

        Ok(Self { schema, table })
    }

    /// Parses `schema.table` or a bare `table`.
    pub fn parse(name: &str) -> Result<Self> {
        match name.split_once('.') {
            Some((schema, table)) => Self::new(schema, table),
            None => Self::new("", name),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Default for MetadataTable {
    fn default() -> Self {
        Self {
            schema: Self::DEFAULT_SCHEMA.to_string(),
            table: Self::DEFAULT_TABLE.to_string(),
        }
    }
}

impl fmt::Display for MetadataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema.is_empty() {
            f.write_str(&self.table)
        } else {
            write!(f, "{}.{}", self.schema, self.table)
        }
    }
}

/// Everything an engine run needs to know, passed explicitly to the
/// [`Migrator`](crate::Migrator).
#[derive(Debug, Clone)]
pub struct Options {
    /// Revision to migrate to (default: latest).
    pub target: Target,

    /// Directory containing migration files (default: "./sql").
    pub directory: PathBuf,

    /// Store each migration's down SQL so it can be rolled back without its
    /// file (default: on).
    pub embedded_rollbacks: bool,

    /// Metadata table (default: "sluice.schema_migrations").
    pub metadata: MetadataTable,

    /// Migration file suffix (default: ".sql").
    pub extension: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: Target::Latest,
            directory: PathBuf::from("./sql"),
            embedded_rollbacks: true,
            metadata: MetadataTable::default(),
            extension: ".sql".to_string(),
        }
    }
}

impl Options {
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_revision(self, revision: u64) -> Self {
        self.with_target(Target::Revision(revision))
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataTable) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn disable_embedded_rollbacks(mut self) -> Self {
        self.embedded_rollbacks = false;
        self
    }
}
