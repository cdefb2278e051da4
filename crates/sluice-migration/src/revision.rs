//! Migration filenames and their revision numbers.
//!
//! A migration is identified by a filename of the form
//! `<revision>-<description>.sql`, e.g. `3-add-users.sql`. The revision is
//! everything before the first `-` and must be a base-10 integer.

use std::path::MAIN_SEPARATOR;

use crate::{Error, Result};

/// Parses the revision out of a migration filename or path.
pub fn revision(identifier: &str) -> Result<u64> {
    let name = base_name(identifier);
    let (prefix, _) = name
        .split_once('-')
        .ok_or_else(|| Error::InvalidIdentifier(identifier.to_string()))?;

    prefix
        .parse()
        .map_err(|_| Error::InvalidIdentifier(identifier.to_string()))
}

/// The last segment of `path`.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', MAIN_SEPARATOR]).next().unwrap_or(path)
}

/// Sort key; unparsable names sort as revision 0 and ties fall back to the name.
fn sort_key(name: &str) -> (u64, &str) {
    (revision(name).unwrap_or(0), name)
}

/// Sorts identifiers by increasing revision.
pub fn sort_ascending(names: &mut [String]) {
    names.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

/// Sorts identifiers by decreasing revision.
pub fn sort_descending(names: &mut [String]) {
    names.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
}

/// Highest revision among `names`, skipping unparsable entries; 0 if none parse.
pub fn latest_revision(names: &[String]) -> u64 {
    let mut sorted = names.to_vec();
    sort_descending(&mut sorted);

    sorted
        .iter()
        .find_map(|name| revision(name).ok())
        .unwrap_or(0)
}

/// Fails with [`Error::DuplicateRevision`] if two names share a revision.
///
/// `names` must already be sorted (either direction).
pub fn check_unique(names: &[String]) -> Result<()> {
    for pair in names.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if let (Ok(a), Ok(b)) = (revision(first), revision(second)) {
            if a == b {
                return Err(Error::DuplicateRevision {
                    revision: a,
                    first: first.clone(),
                    second: second.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test_case("1-create-users.sql", 1; "simple")]
    #[test_case("10-x.sql", 10; "two digits")]
    #[test_case("0-init.sql", 0; "zero")]
    #[test_case("sql/12-add-index.sql", 12; "with directory")]
    #[test_case("/var/lib/sql/7-a-b-c.sql", 7; "only first dash splits")]
    fn test_parses_revision(identifier: &str, expected: u64) {
        assert_eq!(revision(identifier).unwrap(), expected);
    }

    #[test_case("create-users.sql"; "no number")]
    #[test_case("12.sql"; "no dash")]
    #[test_case("-1-oops.sql"; "empty prefix")]
    #[test_case("1a-bad.sql"; "not an integer")]
    #[test_case("sql/3-dir/readme"; "dash in directory only")]
    fn test_rejects_bad_identifiers(identifier: &str) {
        assert!(matches!(
            revision(identifier),
            Err(Error::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("a/b/3-c.sql"), "3-c.sql");
        assert_eq!(base_name("3-c.sql"), "3-c.sql");
    }

    #[test]
    fn test_sorts_numerically_not_lexically() {
        let mut list = names(&["10-x.sql", "2-y.sql", "1-z.sql"]);

        sort_ascending(&mut list);
        assert_eq!(list, names(&["1-z.sql", "2-y.sql", "10-x.sql"]));

        sort_descending(&mut list);
        assert_eq!(list, names(&["10-x.sql", "2-y.sql", "1-z.sql"]));
    }

    #[test]
    fn test_latest_revision_skips_unparsable_names() {
        let list = names(&["README.sql", "3-c.sql", "notes-here.sql", "1-a.sql"]);
        assert_eq!(latest_revision(&list), 3);
    }

    #[test]
    fn test_latest_revision_of_nothing_is_zero() {
        assert_eq!(latest_revision(&[]), 0);
        assert_eq!(latest_revision(&names(&["junk.sql"])), 0);
    }

    #[test]
    fn test_duplicate_revisions_are_reported() {
        let mut list = names(&["2-b.sql", "1-a.sql", "2-again.sql"]);
        sort_ascending(&mut list);

        let err = check_unique(&list).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateRevision { revision: 2, .. }
        ));
    }

    #[test]
    fn test_distinct_revisions_pass_uniqueness_check() {
        let mut list = names(&["2-b.sql", "1-a.sql", "30-c.sql"]);
        sort_descending(&mut list);
        assert!(check_unique(&list).is_ok());
    }

    proptest! {
        #[test]
        fn test_ascending_order_is_by_revision(revs in proptest::collection::btree_set(0u64..10_000, 0..20)) {
            let mut list: Vec<String> = revs.iter().rev().map(|r| format!("{r}-m.sql")).collect();
            sort_ascending(&mut list);

            let parsed: Vec<u64> = list.iter().map(|n| revision(n).unwrap()).collect();
            let expected: Vec<u64> = revs.iter().copied().collect();
            prop_assert_eq!(parsed, expected);
        }

        #[test]
        fn test_descending_is_reverse_of_ascending(revs in proptest::collection::btree_set(0u64..10_000, 0..20)) {
            let mut up: Vec<String> = revs.iter().map(|r| format!("{r}-m.sql")).collect();
            let mut down = up.clone();
            sort_ascending(&mut up);
            sort_descending(&mut down);
            up.reverse();
            prop_assert_eq!(up, down);
        }

        #[test]
        fn test_latest_revision_is_the_maximum(revs in proptest::collection::vec(0u64..10_000, 1..20)) {
            let list: Vec<String> = revs.iter().map(|r| format!("{r}-m.sql")).collect();
            prop_assert_eq!(latest_revision(&list), *revs.iter().max().unwrap());
        }
    }
}
