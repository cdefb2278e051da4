//! Rolling back from SQL stored in the metadata table.
//!
//! When a binary ships with fewer migration files than the database has
//! applied, the extra migrations can only be undone with the down SQL that
//! was stored alongside their metadata rows.

use sluice_span::{Context, Span};
use tracing::{debug, info, warn};

use crate::metadata::MetadataStore;
use crate::revision::revision;
use crate::{Direction, Error, MigrationReport, Result};

/// Rolls back every applied migration above `target`, newest first, using
/// its stored rollback SQL.
///
/// Rows without a stored rollback are left in place and listed in
/// `report.skipped_rollbacks`. Rows removed by someone else in the meantime
/// are skipped.
pub(crate) fn reconcile(
    ctx: &Context,
    span: &mut dyn Span,
    store: &MetadataStore,
    target: u64,
    report: &mut MigrationReport,
) -> Result<()> {
    let mut applied: Vec<(u64, String)> = store
        .applied(ctx, span)?
        .into_iter()
        .filter_map(|name| revision(&name).ok().map(|rev| (rev, name)))
        .collect();
    applied.sort_by(|a, b| b.cmp(a));

    for (rev, name) in applied {
        if rev <= target {
            break;
        }

        let wrap = |err: Error| err.in_migration(&name, Direction::Down);

        let mut tx = span.begin(ctx).map_err(|err| wrap(err.into()))?;
        store.lock(ctx, &mut tx).map_err(wrap)?;

        let outcome = revert(ctx, &mut tx, store, &name);
        store.unlock(ctx, &mut tx);

        match outcome.map_err(wrap)? {
            Reverted::Done => {
                tx.commit(ctx).map_err(|err| wrap(err.into()))?;
                report.embedded_reverted.push(name);
            }
            Reverted::NoRollback => {
                warn!(migration = %name, "no stored rollback, leaving migration applied");
                report.skipped_rollbacks.push(name);
            }
            Reverted::Gone => debug!(migration = %name, "already rolled back"),
        }
    }

    Ok(())
}

enum Reverted {
    Done,
    /// The rollback column is NULL.
    NoRollback,
    /// The metadata row disappeared.
    Gone,
}

fn revert(ctx: &Context, tx: &mut dyn Span, store: &MetadataStore, name: &str) -> Result<Reverted> {
    let sql = match store.rollback_sql(ctx, tx, name) {
        Ok(Some(sql)) => sql,
        Ok(None) => return Ok(Reverted::NoRollback),
        Err(Error::NotFound(_)) => return Ok(Reverted::Gone),
        Err(err) => return Err(err),
    };

    info!(migration = name, "running stored rollback");
    if !sql.trim().is_empty() {
        tx.exec_batch(ctx, &sql)?;
    }
    store.record_reverted(ctx, tx, name)?;

    Ok(Reverted::Done)
}
