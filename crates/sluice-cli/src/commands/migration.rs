//! Migration workflow commands.

use anyhow::{Context as _, Result, anyhow};
use comfy_table::{Cell, Color};
use sluice_config::SluiceConfig;
use sluice_migration::{DiskReader, MigrationReport, Migrator, State};
use sluice_span::{Context, Span};

use super::{database, load_config};
use crate::GlobalArgs;
use crate::style::{self, colors::SemanticStyle};

fn migrator(config: &SluiceConfig) -> Result<Migrator<DiskReader>> {
    let options = config
        .to_options()
        .context("Invalid migrations configuration")?;
    Ok(Migrator::new(options, DiskReader))
}

fn connect(config: &SluiceConfig) -> Result<Box<dyn Span>> {
    let uri = config
        .database
        .uri
        .as_deref()
        .ok_or_else(|| anyhow!("missing database URI (pass --uri or set database.uri)"))?;
    database::open(uri)
}

/// Create one migration file per name.
pub fn create(args: &GlobalArgs, names: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let migrator = migrator(&config)?;

    for name in names {
        let path = migrator
            .create(name)
            .with_context(|| format!("Unable to create SQL migration file for {name:?}"))?;
        style::print_success(&format!("Created {}", path.display().code()));
    }

    Ok(())
}

/// Move the database to the configured target revision.
pub fn apply(args: &GlobalArgs) -> Result<()> {
    let config = load_config(args)?;
    let migrator = migrator(&config)?;
    let mut span = connect(&config)?;
    let ctx = Context::with_timeout(config.timeout());

    let spinner = style::create_spinner("Applying migrations...");
    let result = migrator.apply(&ctx, span.as_mut());
    style::finish_and_clear(&spinner);

    let report = result.context("Migration failed")?;
    print_report(&report);
    Ok(())
}

/// Step back `steps` revisions from the latest applied migration.
pub fn rollback(args: &GlobalArgs, steps: u64) -> Result<()> {
    let config = load_config(args)?;
    let migrator = migrator(&config)?;
    let mut span = connect(&config)?;
    let ctx = Context::with_timeout(config.timeout());

    let spinner = style::create_spinner("Rolling back migrations...");
    let result = migrator.rollback(&ctx, span.as_mut(), steps);
    style::finish_and_clear(&spinner);

    let report = result.context("Rollback failed")?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &MigrationReport) {
    if report.is_empty() && report.skipped_rollbacks.is_empty() {
        style::print_success(&format!(
            "Nothing to migrate (target: {})",
            report.target.to_string().header()
        ));
        return;
    }

    for name in &report.applied {
        style::print_success(&format!("Applied {}", name.code()));
    }
    for name in &report.reverted {
        style::print_success(&format!("Reverted {}", name.code()));
    }
    for name in &report.embedded_reverted {
        style::print_success(&format!(
            "Reverted {} {}",
            name.code(),
            "(embedded rollback)".muted()
        ));
    }
    for name in &report.skipped_rollbacks {
        style::print_warn(&format!(
            "No stored rollback for {}; left applied",
            name.code()
        ));
    }
    if !report.skipped_rollbacks.is_empty() {
        style::print_hint("Restore the migration file or revert it by hand");
    }
}

/// Print a table of every known migration.
pub fn status(args: &GlobalArgs) -> Result<()> {
    let config = load_config(args)?;
    let migrator = migrator(&config)?;
    let mut span = connect(&config)?;
    let ctx = Context::with_timeout(config.timeout());

    let statuses = migrator
        .status(&ctx, span.as_mut())
        .context("Failed to read migration status")?;

    if statuses.is_empty() {
        style::print_hint(&format!(
            "No migrations found in {}",
            config.migrations.directory.display()
        ));
        return Ok(());
    }

    let mut table = style::styled_table(&["Revision", "Migration", "Status", "Rollback stored"]);
    for entry in &statuses {
        let color = match entry.state {
            State::Applied => Color::Green,
            State::Pending => Color::Yellow,
            State::Orphaned => Color::Red,
        };
        table.add_row(vec![
            Cell::new(entry.revision),
            Cell::new(&entry.migration),
            style::colored_cell(entry.state, color),
            Cell::new(if entry.embedded_rollback { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");

    let count = |state: State| statuses.iter().filter(|s| s.state == state).count();
    style::print_spacer();
    style::print_labeled("Applied", &count(State::Applied).to_string());
    style::print_labeled("Pending", &count(State::Pending).to_string());
    style::print_labeled("Orphaned", &count(State::Orphaned).to_string());

    Ok(())
}
