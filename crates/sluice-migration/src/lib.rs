//! Reversible SQL schema migrations.
//!
//! Migrations are SQL files named `<revision>-<description>.sql`, each with
//! an up and a down section:
//!
//! ```text
//! --- !Up
//! create table samples(id int, name text);
//!
//! --- !Down
//! drop table samples;
//! ```
//!
//! A [`Migrator`] moves the database up or down to a target revision, one
//! transaction per file, recording applied migrations in a metadata table.
//! With embedded rollbacks on (the default) each migration's down SQL is
//! stored next to its metadata row, so the database can be rolled back even
//! when the files are no longer available.
//!
//! ```no_run
//! use sluice_migration::{DiskReader, Migrator, Options};
//! use sluice_span::{Context, Database, SqliteConnection};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut db = Database::new(SqliteConnection::open("app.db")?);
//! let migrator = Migrator::new(Options::default().with_directory("sql"), DiskReader);
//!
//! let report = migrator.apply(&Context::background(), &mut db)?;
//! println!("applied {} migrations", report.applied.len());
//! # Ok(())
//! # }
//! ```

pub mod create;
pub mod directive;
mod embedded;
pub mod error;
pub mod metadata;
pub mod migrator;
pub mod options;
pub mod revision;
pub mod source;
pub mod status;

pub use create::create;
pub use directive::Sections;
pub use error::{Error, Result};
pub use metadata::{MetadataStore, MigrationRecord};
pub use migrator::{Direction, MigrationReport, Migrator};
pub use options::{MetadataTable, Options, Target};
pub use source::{DiskReader, MemoryReader, Reader};
pub use status::{MigrationStatus, State};
