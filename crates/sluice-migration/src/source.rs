//! Where migration files come from.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

/// Lists and opens migration files.
pub trait Reader {
    /// Base names of the files in `directory`. An absent directory is empty.
    fn files(&self, directory: &Path) -> io::Result<Vec<String>>;

    /// Opens the file at `path` for reading.
    fn read(&self, path: &Path) -> io::Result<Box<dyn BufRead>>;
}

/// Reads migrations from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskReader;

impl Reader for DiskReader {
    fn files(&self, directory: &Path) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            // Follows symlinks; a dangling link is not a migration.
            let metadata = match fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            if metadata.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        Ok(files)
    }

    fn read(&self, path: &Path) -> io::Result<Box<dyn BufRead>> {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// An in-memory set of migration files keyed by full path.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the file at `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Removes the file at `path`, returning its contents.
    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<String> {
        self.files.remove(path.as_ref())
    }
}

impl Reader for MemoryReader {
    fn files(&self, directory: &Path) -> io::Result<Vec<String>> {
        Ok(self
            .files
            .keys()
            .filter(|path| path.parent() == Some(directory))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn read(&self, path: &Path) -> io::Result<Box<dyn BufRead>> {
        let contents = self.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no migration at {}", path.display()),
            )
        })?;

        Ok(Box::new(Cursor::new(contents.clone().into_bytes())))
    }
}
