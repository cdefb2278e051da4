//! Applied/pending listing for every known migration.

use std::collections::BTreeMap;
use std::fmt;

use sluice_span::{Context, Span};

use crate::metadata::MetadataStore;
use crate::revision::revision;
use crate::source::Reader;
use crate::{Direction, Migrator, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// File present and recorded.
    Applied,
    /// File present, not yet recorded.
    Pending,
    /// Recorded, but the file is gone.
    Orphaned,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Pending => f.write_str("pending"),
            Self::Orphaned => f.write_str("orphaned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub migration: String,
    pub revision: u64,
    pub state: State,

    /// Whether rollback SQL is stored for it.
    pub embedded_rollback: bool,
}

impl<R: Reader> Migrator<R> {
    /// Every migration file plus every recorded migration whose file is
    /// missing, ordered by revision.
    pub fn status(&self, ctx: &Context, span: &mut dyn Span) -> Result<Vec<MigrationStatus>> {
        let store = MetadataStore::ensure(ctx, span, &self.options().metadata)?;
        let mut records: BTreeMap<String, Option<String>> = store
            .records(ctx, span)?
            .into_iter()
            .map(|record| (record.migration, record.rollback))
            .collect();

        let mut statuses = Vec::new();
        for name in self.available(Direction::Up)? {
            let (state, embedded_rollback) = match records.remove(&name) {
                Some(rollback) => (State::Applied, rollback.is_some()),
                None => (State::Pending, false),
            };
            statuses.push(MigrationStatus {
                revision: revision(&name).unwrap_or(0),
                migration: name,
                state,
                embedded_rollback,
            });
        }

        statuses.extend(records.into_iter().map(|(name, rollback)| MigrationStatus {
            revision: revision(&name).unwrap_or(0),
            migration: name,
            state: State::Orphaned,
            embedded_rollback: rollback.is_some(),
        }));

        statuses.sort_by(|a, b| {
            (a.revision, &a.migration).cmp(&(b.revision, &b.migration))
        });
        Ok(statuses)
    }
}
