//! Validation scope: the value of the `Precognition-Validate-Only` header.
//!
//! With parent-key expansion enabled, every dotted path also schedules its
//! ancestors for validation: `members.0.name` becomes
//! `members,members.0,members.0.name`. A dot preceded by a backslash (`\.`)
//! belongs to the segment and does not split it.

use indexmap::IndexSet;

/// Returns the ordered list of field paths the server should validate.
///
/// Without expansion the input is returned as given (order kept, duplicates
/// kept). With expansion each path contributes its cumulative prefixes, and
/// the combined list is deduplicated keeping first occurrences.
pub fn keys_to_validate<S: AsRef<str>>(paths: &[S], expand_parents: bool) -> Vec<String> {
    if !expand_parents {
        return paths.iter().map(|p| p.as_ref().to_owned()).collect();
    }

    let keys: IndexSet<String> = paths
        .iter()
        .flat_map(|path| cumulative_prefixes(path.as_ref()))
        .collect();
    keys.into_iter().collect()
}

/// Builds the comma-joined header value for `paths`.
pub fn validate_only_header<S: AsRef<str>>(paths: &[S], expand_parents: bool) -> String {
    keys_to_validate(paths, expand_parents).join(",")
}

/// `a.b.c` → `["a", "a.b", "a.b.c"]`.
fn cumulative_prefixes(path: &str) -> Vec<String> {
    let mut prefixes: Vec<String> = Vec::new();
    for segment in split_unescaped_dots(path) {
        let next = match prefixes.last() {
            Some(parent) => format!("{parent}.{segment}"),
            None => segment.to_owned(),
        };
        prefixes.push(next);
    }
    prefixes
}

/// Splits on `.` unless the immediately preceding character is `\`.
fn split_unescaped_dots(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut previous: Option<char> = None;

    for (index, ch) in path.char_indices() {
        if ch == '.' && previous != Some('\\') {
            segments.push(&path[start..index]);
            start = index + ch.len_utf8();
        }
        previous = Some(ch);
    }
    segments.push(&path[start..]);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_list_without_expansion() {
        assert_eq!(
            validate_only_header(&["username", "email"], false),
            "username,email"
        );
    }

    #[test]
    fn literal_list_keeps_caller_duplicates_and_dotted_paths() {
        assert_eq!(
            validate_only_header(&["a.b", "email", "a.b"], false),
            "a.b,email,a.b"
        );
    }

    #[test]
    fn expands_parent_keys_in_order_without_duplicates() {
        assert_eq!(
            validate_only_header(&["members.0.name", "members.1.email", "email"], true),
            "members,members.0,members.0.name,members.1,members.1.email,email"
        );
    }

    #[test]
    fn escaped_dots_do_not_split() {
        assert_eq!(
            validate_only_header(&["members.0.name", r"members\.1\.email", "email"], true),
            r"members,members.0,members.0.name,members\.1\.email,email"
        );
    }

    #[test]
    fn mixed_escaped_and_plain_dots() {
        assert_eq!(
            keys_to_validate(&[r"user\.meta.name"], true),
            vec![r"user\.meta".to_owned(), r"user\.meta.name".to_owned()]
        );
    }

    #[test]
    fn duplicate_prefixes_across_paths_collapse() {
        assert_eq!(
            validate_only_header(&["a.b", "a.c", "a"], true),
            "a,a.b,a.c"
        );
    }

    #[test]
    fn wide_scope_shares_parents_once() {
        let paths: Vec<String> = (0..5_000).map(|i| format!("rows.{i}.name")).collect();

        let keys = keys_to_validate(&paths, true);

        assert_eq!(keys.len(), 1 + 2 * 5_000);
        assert_eq!(keys[..3], ["rows", "rows.0", "rows.0.name"]);
        assert_eq!(keys.last().map(String::as_str), Some("rows.4999.name"));
    }

    #[test]
    fn empty_scope_yields_empty_header() {
        let none: [&str; 0] = [];
        assert_eq!(validate_only_header(&none, true), "");
        assert_eq!(validate_only_header(&none, false), "");
    }
}
