//! The migration engine.

use std::fmt;
use std::path::Path;

use sluice_span::{Context, Span};
use tracing::{debug, info};

use crate::directive::read_sections;
use crate::embedded;
use crate::metadata::MetadataStore;
use crate::revision::{self, revision};
use crate::source::Reader;
use crate::{Error, Options, Result, Target};

/// Which way a run moves the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    /// Already at the target.
    None,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
            Self::None => f.write_str("none"),
        }
    }
}

/// What one apply or rollback run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub direction: Direction,
    pub target: Target,

    /// Migrations whose up SQL ran, in order.
    pub applied: Vec<String>,

    /// Migrations whose down SQL ran from their file, in order.
    pub reverted: Vec<String>,

    /// Migrations rolled back from SQL stored in the metadata table.
    pub embedded_reverted: Vec<String>,

    /// Migrations left applied because no rollback SQL was stored.
    pub skipped_rollbacks: Vec<String>,
}

impl MigrationReport {
    fn new(direction: Direction, target: Target) -> Self {
        Self {
            direction,
            target,
            applied: Vec::new(),
            reverted: Vec::new(),
            embedded_reverted: Vec::new(),
            skipped_rollbacks: Vec::new(),
        }
    }

    /// True if no migration SQL ran.
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.reverted.is_empty() && self.embedded_reverted.is_empty()
    }
}

/// Applies and rolls back migrations read through `R`.
///
/// Each migration runs in its own transaction with the metadata table
/// locked, and its metadata row changes in that same transaction. A failure
/// stops the run; migrations committed before it stay applied, and running
/// again resumes from the first unapplied file.
///
/// `span` arguments should be a plain connection, not a transaction, or
/// every migration ends up nested inside the caller's transaction.
#[derive(Debug)]
pub struct Migrator<R> {
    options: Options,
    reader: R,
}

impl<R: Reader> Migrator<R> {
    pub fn new(options: Options, reader: R) -> Self {
        Self { options, reader }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Replaces the target revision.
    pub fn with_target(mut self, target: Target) -> Self {
        self.options.target = target;
        self
    }

    /// Migrates the database to the configured target.
    ///
    /// Creates the metadata table if needed.
    pub fn apply(&self, ctx: &Context, span: &mut dyn Span) -> Result<MigrationReport> {
        let store = MetadataStore::ensure(ctx, span, &self.options.metadata)?;
        self.run(ctx, span, &store, self.options.target)
    }

    /// Rolls back the `steps` most recent migrations.
    ///
    /// The target becomes the latest applied revision minus `steps`, clamped
    /// at 0.
    pub fn rollback(&self, ctx: &Context, span: &mut dyn Span, steps: u64) -> Result<MigrationReport> {
        if steps < 1 {
            return Err(Error::InvalidStep);
        }

        let store = MetadataStore::ensure(ctx, span, &self.options.metadata)?;
        let latest = store
            .latest_applied(ctx, span)?
            .map_or(0, |(revision, _)| revision);
        let target = latest.saturating_sub(steps);

        info!(latest, steps, target, "rolling back");
        self.run(ctx, span, &store, Target::Revision(target))
    }

    /// Migration files with the configured extension, ordered for `direction`.
    ///
    /// Files without a parsable revision are left out. Fails if two files
    /// share a revision.
    pub fn available(&self, direction: Direction) -> Result<Vec<String>> {
        let directory = &self.options.directory;
        let files = self
            .reader
            .files(directory)
            .map_err(|source| Error::Source {
                path: directory.clone(),
                source,
            })?;

        let mut names: Vec<String> = files
            .into_iter()
            .filter(|name| name.ends_with(&self.options.extension))
            .filter(|name| match revision(name) {
                Ok(_) => true,
                Err(_) => {
                    debug!(file = %name, "skipping file without a revision");
                    false
                }
            })
            .collect();

        match direction {
            Direction::Down => revision::sort_descending(&mut names),
            Direction::Up | Direction::None => revision::sort_ascending(&mut names),
        }
        revision::check_unique(&names)?;

        Ok(names)
    }

    /// Highest revision among the migration files; 0 if there are none.
    pub fn latest_revision(&self) -> Result<u64> {
        Ok(revision::latest_revision(&self.available(Direction::Down)?))
    }

    fn run(
        &self,
        ctx: &Context,
        span: &mut dyn Span,
        store: &MetadataStore,
        target: Target,
    ) -> Result<MigrationReport> {
        let direction = moving(ctx, span, store, target)?;
        let mut report = MigrationReport::new(direction, target);
        info!(%direction, %target, "migrating");

        if direction != Direction::None {
            let task = Task {
                reader: &self.reader,
                directory: &self.options.directory,
                store,
                direction,
                target,
                embedded_rollbacks: self.options.embedded_rollbacks,
            };

            for name in self.available(direction)? {
                task.read_and_apply(ctx, span, &name, &mut report)?;
            }
        }

        if self.options.embedded_rollbacks {
            let resolved = match target {
                Target::Latest => self.latest_revision()?,
                Target::Revision(revision) => revision,
            };
            embedded::reconcile(ctx, span, store, resolved, &mut report)?;
        }

        info!(
            applied = report.applied.len(),
            reverted = report.reverted.len() + report.embedded_reverted.len(),
            "migration run complete"
        );
        Ok(report)
    }
}

/// One run's worth of state for applying candidates in a single direction.
struct Task<'a> {
    reader: &'a dyn Reader,
    directory: &'a Path,
    store: &'a MetadataStore,
    direction: Direction,
    target: Target,
    embedded_rollbacks: bool,
}

impl Task<'_> {
    /// Runs `name` in its own locked transaction if it is needed.
    fn read_and_apply(
        &self,
        ctx: &Context,
        span: &mut dyn Span,
        name: &str,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let wrap = |err: Error| err.in_migration(name, self.direction);

        let mut tx = span.begin(ctx).map_err(|err| wrap(err.into()))?;
        self.store.lock(ctx, &mut tx).map_err(wrap)?;

        let outcome = self.apply_locked(ctx, &mut tx, name);
        self.store.unlock(ctx, &mut tx);
        let ran = outcome.map_err(wrap)?;

        tx.commit(ctx).map_err(|err| wrap(err.into()))?;

        if ran {
            match self.direction {
                Direction::Up => report.applied.push(name.to_string()),
                Direction::Down => report.reverted.push(name.to_string()),
                Direction::None => {}
            }
        }
        Ok(())
    }

    /// Returns whether the migration ran.
    fn apply_locked(&self, ctx: &Context, tx: &mut dyn Span, name: &str) -> Result<bool> {
        let revision = revision(name)?;
        let store = self.store;

        let should_run = match self.direction {
            Direction::Up => self.target.includes(revision) && !store.is_applied(ctx, tx, name)?,
            Direction::Down => !self.target.includes(revision) && store.is_applied(ctx, tx, name)?,
            Direction::None => false,
        };
        if !should_run {
            debug!(migration = name, direction = %self.direction, "skipping");
            return Ok(false);
        }

        let sections = read_sections(self.reader, &self.directory.join(name))?;

        info!(migration = name, direction = %self.direction, "running migration");
        tx.exec_batch(ctx, sections.body(self.direction))?;

        match self.direction {
            Direction::Up => {
                store.record_applied(ctx, tx, name)?;
                if self.embedded_rollbacks {
                    store.store_rollback(ctx, tx, name, sections.down().trim())?;
                }
            }
            Direction::Down => store.record_reverted(ctx, tx, name)?,
            Direction::None => {}
        }

        Ok(true)
    }
}

/// Direction needed to get from the latest applied migration to `target`.
fn moving(
    ctx: &Context,
    span: &mut dyn Span,
    store: &MetadataStore,
    target: Target,
) -> Result<Direction> {
    let Target::Revision(target) = target else {
        return Ok(Direction::Up);
    };

    Ok(match store.latest_applied(ctx, span)? {
        None => Direction::Up,
        Some((latest, _)) if latest < target => Direction::Up,
        Some((latest, _)) if latest > target => Direction::Down,
        Some(_) => Direction::None,
    })
}
