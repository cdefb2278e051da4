//! New migration files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::source::DiskReader;
use crate::{Error, Migrator, Options, Result};

/// Contents of a freshly created migration.
pub const TEMPLATE: &str = "--- !Up\n\n--- !Down\n\n";

impl Migrator<DiskReader> {
    /// Creates `<latest + 1>-<name><extension>` in the migrations directory,
    /// where `latest` is the highest revision already on disk.
    ///
    /// Only disk-backed migrators write files, so the revision is always
    /// computed from the directory the file lands in.
    pub fn create(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::NameRequired);
        }

        let options = self.options();
        fs::create_dir_all(&options.directory)?;

        let revision = self.latest_revision()? + 1;
        let path = options
            .directory
            .join(format!("{revision}-{name}{}", options.extension));

        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        file.write_all(TEMPLATE.as_bytes())?;

        info!(path = %path.display(), revision, "created migration");
        Ok(path)
    }
}

/// Creates a new migration file in `directory` on disk.
pub fn create(directory: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
    let options = Options::default().with_directory(directory.as_ref());
    Migrator::new(options, DiskReader).create(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_migration_is_revision_one() {
        let dir = TempDir::new().unwrap();

        let path = create(dir.path(), "create-users").unwrap();

        assert_eq!(path, dir.path().join("1-create-users.sql"));
        assert_eq!(fs::read_to_string(&path).unwrap(), TEMPLATE);
    }

    #[test]
    fn test_next_revision_follows_the_highest_existing_one() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("1-a.sql"), TEMPLATE).unwrap();
        fs::write(dir.path().join("7-b.sql"), TEMPLATE).unwrap();
        fs::write(dir.path().join("README.sql"), "").unwrap();

        let path = create(dir.path(), "  add-index  ").unwrap();

        assert_eq!(path, dir.path().join("8-add-index.sql"));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("db").join("sql");

        let path = create(&nested, "init").unwrap();

        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[test]
    fn test_honors_configured_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("3-old.sql"), TEMPLATE).unwrap();
        fs::write(dir.path().join("1-a.psql"), TEMPLATE).unwrap();

        let options = Options::default()
            .with_directory(dir.path())
            .with_extension(".psql");
        let path = Migrator::new(options, DiskReader).create("b").unwrap();

        assert_eq!(path, dir.path().join("2-b.psql"));
    }

    #[test]
    fn test_blank_name_is_rejected_before_touching_disk() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("sql");

        assert!(matches!(create(&nested, "   "), Err(Error::NameRequired)));
        assert!(!nested.exists());
    }
}
