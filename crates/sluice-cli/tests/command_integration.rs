//! Integration tests for CLI commands.
//!
//! Each test works in its own temp directory with a file-backed SQLite
//! database, and checks database state through `sluice status`.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn sql_dir(&self) -> PathBuf {
        self.dir.path().join("sql")
    }

    fn uri(&self) -> String {
        format!("sqlite:{}", self.dir.path().join("app.db").display())
    }

    fn write(&self, name: &str, up: &str, down: &str) {
        fs::create_dir_all(self.sql_dir()).unwrap();
        fs::write(
            self.sql_dir().join(name),
            format!("--- !Up\n{up}\n\n--- !Down\n{down}\n"),
        )
        .unwrap();
    }

    /// `sluice` pointed at this project, without a database.
    fn bare(&self) -> Command {
        let mut cmd = Command::cargo_bin("sluice").unwrap();
        cmd.env_remove("SLUICE_DATABASE__URI")
            .arg("--no-color")
            .arg("--project")
            .arg(self.dir.path())
            .arg("--migrations")
            .arg(self.sql_dir());
        cmd
    }

    fn cmd(&self) -> Command {
        let mut cmd = self.bare();
        cmd.arg("--uri").arg(self.uri());
        cmd
    }

    fn with_two_migrations(self) -> Self {
        self.write(
            "1-create_users.sql",
            "create table users(id integer primary key, name text);",
            "drop table users;",
        );
        self.write(
            "2-create_posts.sql",
            "create table posts(id integer primary key, body text);",
            "drop table posts;",
        );
        self
    }
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn create_writes_numbered_template_files() {
    let project = Project::new();

    project
        .bare()
        .args(["create", "add_users", "add_posts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"))
        .stdout(predicate::str::contains("1-add_users.sql"))
        .stdout(predicate::str::contains("2-add_posts.sql"));

    let first = fs::read_to_string(project.sql_dir().join("1-add_users.sql")).unwrap();
    assert_eq!(first, "--- !Up\n\n--- !Down\n\n");
    assert!(project.sql_dir().join("2-add_posts.sql").exists());
}

#[test]
fn create_continues_after_existing_revisions() {
    let project = Project::new().with_two_migrations();

    project
        .bare()
        .args(["create", "add_index"])
        .assert()
        .success();

    assert!(project.sql_dir().join("3-add_index.sql").exists());
}

#[test]
fn create_rejects_blank_name() {
    let project = Project::new();

    project
        .bare()
        .args(["create", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("name"));
}

// ============================================================================
// Apply
// ============================================================================

#[test]
fn apply_without_uri_fails() {
    let project = Project::new().with_two_migrations();

    project
        .bare()
        .arg("apply")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing database URI"));
}

#[test]
fn apply_is_the_default_command() {
    let project = Project::new().with_two_migrations();

    project
        .cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 1-create_users.sql"))
        .stdout(predicate::str::contains("Applied 2-create_posts.sql"));
}

#[test]
fn apply_twice_is_a_no_op() {
    let project = Project::new().with_two_migrations();

    project.cmd().arg("apply").assert().success();
    project
        .cmd()
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to migrate"))
        .stdout(predicate::str::contains("Applied").not());
}

#[test]
fn apply_to_revision_stops_there() {
    let project = Project::new().with_two_migrations();

    project
        .cmd()
        .args(["--revision", "1", "apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 1-create_users.sql"))
        .stdout(predicate::str::contains("2-create_posts.sql").not());
}

#[test]
fn apply_reports_failing_migration() {
    let project = Project::new();
    project.write("1-broken.sql", "create tabel users(id int);", "");

    project
        .cmd()
        .arg("apply")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1-broken.sql"));
}

#[test]
fn apply_rejects_invalid_metadata_table() {
    let project = Project::new().with_two_migrations();

    project
        .cmd()
        .args(["--metadata", "bad name;", "apply"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid migrations configuration"));
}

#[test]
fn apply_reads_uri_from_project_config() {
    let project = Project::new().with_two_migrations();
    fs::write(
        project.dir.path().join("sluice.toml"),
        format!("[database]\nuri = {:?}\n", project.uri()),
    )
    .unwrap();

    project
        .bare()
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 2-create_posts.sql"));
}

// ============================================================================
// Rollback
// ============================================================================

#[test]
fn rollback_reverts_latest_by_default() {
    let project = Project::new().with_two_migrations();
    project.cmd().arg("apply").assert().success();

    project
        .cmd()
        .arg("rollback")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reverted 2-create_posts.sql"))
        .stdout(predicate::str::contains("1-create_users.sql").not());
}

#[test]
fn rollback_steps_reverts_several() {
    let project = Project::new().with_two_migrations();
    project.cmd().arg("apply").assert().success();

    project
        .cmd()
        .args(["rollback", "--steps", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reverted 2-create_posts.sql"))
        .stdout(predicate::str::contains("Reverted 1-create_users.sql"));
}

#[test]
fn rollback_zero_steps_fails() {
    let project = Project::new().with_two_migrations();
    project.cmd().arg("apply").assert().success();

    project
        .cmd()
        .args(["rollback", "--steps", "0"])
        .assert()
        .failure();
}

#[test]
fn rollback_uses_embedded_sql_when_file_is_gone() {
    let project = Project::new().with_two_migrations();
    project.cmd().arg("apply").assert().success();
    fs::remove_file(project.sql_dir().join("2-create_posts.sql")).unwrap();

    project
        .cmd()
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reverted 2-create_posts.sql"))
        .stdout(predicate::str::contains("embedded rollback"));
}

// ============================================================================
// Status
// ============================================================================

#[test]
fn status_shows_each_state() {
    let project = Project::new().with_two_migrations();
    project
        .cmd()
        .args(["--revision", "1", "apply"])
        .assert()
        .success();

    project
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("1-create_users.sql"))
        .stdout(predicate::str::contains("applied"))
        .stdout(predicate::str::contains("2-create_posts.sql"))
        .stdout(predicate::str::contains("pending"))
        .stdout(predicate::str::contains("Applied: 1"))
        .stdout(predicate::str::contains("Pending: 1"));
}

#[test]
fn status_without_migrations_hints() {
    let project = Project::new();

    project
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No migrations found"));
}
