//! Splits migration files into their `--- !Up` and `--- !Down` sections.
//!
//! ```text
//! --- !Up
//! create table samples(id int, name text);
//!
//! --- !Down
//! drop table samples;
//! ```
//!
//! A directive is only recognised at the very start of a line, so SQL
//! comments or string literals that mention `--- !Up` mid-line never split a
//! section. Bodies are otherwise treated as opaque text.

use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::revision::base_name;
use crate::source::Reader;
use crate::{Direction, Error, Result};

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---\s+!(Up|Down).*$").expect("directive regex is valid"));

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Up,
    Down,
}

/// The up and down bodies of one migration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    up: String,
    down: String,
}

impl Sections {
    /// Splits `text` at directive lines.
    ///
    /// Every retained line ends in `\n`. Lines before the first directive are
    /// dropped. Returns `None` if the text has no directive at all.
    pub fn split(text: &str) -> Option<Self> {
        let mut sections = Self::default();
        let mut open = None;

        for line in text.lines() {
            if let Some(found) = DIRECTIVE.captures(line) {
                open = match found[1].to_ascii_lowercase().as_str() {
                    "up" => Some(Section::Up),
                    _ => Some(Section::Down),
                };
                continue;
            }

            let body = match open {
                Some(Section::Up) => &mut sections.up,
                Some(Section::Down) => &mut sections.down,
                None => continue,
            };
            body.push_str(line);
            body.push('\n');
        }

        open.map(|_| sections)
    }

    pub fn up(&self) -> &str {
        &self.up
    }

    pub fn down(&self) -> &str {
        &self.down
    }

    /// The body for `direction`; empty for [`Direction::None`].
    pub fn body(&self, direction: Direction) -> &str {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
            Direction::None => "",
        }
    }
}

/// The SQL for `direction` in a migration's text.
///
/// `migration` names the file in the error when no directive is found.
pub fn parse_sql(migration: &str, text: &str, direction: Direction) -> Result<String> {
    Sections::split(text)
        .map(|sections| sections.body(direction).to_string())
        .ok_or_else(|| Error::MalformedMigration(migration.to_string()))
}

/// Reads the migration at `path` and splits it into sections.
pub fn read_sections(reader: &dyn Reader, path: &Path) -> Result<Sections> {
    let source = |source| Error::Source {
        path: path.to_path_buf(),
        source,
    };

    let mut text = String::new();
    reader
        .read(path)
        .map_err(source)?
        .read_to_string(&mut text)
        .map_err(source)?;

    let name = path.to_string_lossy();
    Sections::split(&text).ok_or_else(|| Error::MalformedMigration(base_name(&name).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    const SAMPLE: &str = "\
--- !Up
create table samples(id int, name text);

-- seed
insert into samples values (1, 'one');
--- !Down
drop table samples;
";

    #[test]
    fn test_splits_up_and_down() {
        let sections = Sections::split(SAMPLE).unwrap();

        assert_eq!(
            sections.up(),
            "create table samples(id int, name text);\n\n-- seed\ninsert into samples values (1, 'one');\n"
        );
        assert_eq!(sections.down(), "drop table samples;\n");
    }

    #[test]
    fn test_directive_with_trailing_text_still_opens_section() {
        let sections = Sections::split("--- !Up /notx\nselect 1;\n---   !Down ignored\nselect 2;\n").unwrap();
        assert_eq!(sections.up(), "select 1;\n");
        assert_eq!(sections.down(), "select 2;\n");
    }

    #[test_case("insert into t (c) values ('-- not a directive');"; "sql comment marker in string")]
    #[test_case("select '--- !Down' as trick;"; "directive text mid line")]
    #[test_case(" --- !Down"; "leading space")]
    #[test_case("---!Down"; "no whitespace after dashes")]
    #[test_case("--- !down"; "lowercase token")]
    fn test_lines_that_are_not_directives_stay_in_the_body(line: &str) {
        let text = format!("--- !Up\n{line}\n");
        let sections = Sections::split(&text).unwrap();

        assert_eq!(sections.up(), format!("{line}\n"));
        assert_eq!(sections.down(), "");
    }

    #[test]
    fn test_lines_before_first_directive_are_dropped() {
        let sections = Sections::split("-- header\n\n--- !Down\ndrop table x;\n").unwrap();
        assert_eq!(sections.up(), "");
        assert_eq!(sections.down(), "drop table x;\n");
    }

    #[test]
    fn test_repeated_sections_accumulate() {
        let sections = Sections::split("--- !Up\na;\n--- !Down\nb;\n--- !Up\nc;\n").unwrap();
        assert_eq!(sections.up(), "a;\nc;\n");
        assert_eq!(sections.down(), "b;\n");
    }

    #[test]
    fn test_no_directives_is_malformed() {
        assert!(Sections::split("create table x(id int);\n").is_none());
        assert!(matches!(
            parse_sql("1-x.sql", "create table x(id int);\n", Direction::Up),
            Err(Error::MalformedMigration(name)) if name == "1-x.sql"
        ));
    }

    #[test]
    fn test_empty_template_parses_to_empty_bodies() {
        let sections = Sections::split("--- !Up\n\n--- !Down\n\n").unwrap();
        assert_eq!(sections.up(), "\n");
        assert_eq!(sections.down(), "\n");
        assert_eq!(sections.body(Direction::None), "");
    }

    fn body_line() -> impl Strategy<Value = String> {
        "[a-z0-9 ();,'-]{0,30}".prop_filter("must not look like a directive", |line| {
            !DIRECTIVE.is_match(line)
        })
    }

    proptest! {
        #[test]
        fn test_up_and_down_sections_are_recovered_exactly(
            up in proptest::collection::vec(body_line(), 0..10),
            down in proptest::collection::vec(body_line(), 0..10),
        ) {
            let mut text = String::from("--- !Up\n");
            for line in &up {
                text.push_str(line);
                text.push('\n');
            }
            text.push_str("--- !Down\n");
            for line in &down {
                text.push_str(line);
                text.push('\n');
            }

            let expected_up: String = up.iter().map(|l| format!("{l}\n")).collect();
            let expected_down: String = down.iter().map(|l| format!("{l}\n")).collect();

            prop_assert_eq!(parse_sql("p.sql", &text, Direction::Up).unwrap(), expected_up);
            prop_assert_eq!(parse_sql("p.sql", &text, Direction::Down).unwrap(), expected_down);
        }
    }
}
