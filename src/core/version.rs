//! Version parsing for git refs such as `v2.10.1` or `releases/3.0.2`.

use semver::Version;

/// Parse the numeric version carried by a branch or tag name.
///
/// `releases/3.0.2`, `v2.10.1` and `2.6` all parse; missing parts count as zero.
/// Returns `None` for refs without a version (e.g. `main`).
pub fn parse_ref(reference: &str) -> Option<Version> {
    let tail = reference.rsplit('/').next().unwrap_or(reference).trim();
    let tail = tail.strip_prefix('v').unwrap_or(tail);

    let mut parts = [0u64; 3];
    let mut seen = 0;
    for (idx, piece) in tail.split('.').take(3).enumerate() {
        let digits: String = piece.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            break;
        }
        parts[idx] = digits.parse().ok()?;
        seen += 1;
        if digits.len() != piece.len() {
            break;
        }
    }

    (seen > 0).then(|| Version::new(parts[0], parts[1], parts[2]))
}

/// `true` when `reference` is older than `bound`. Unversioned refs are assumed
/// to be development heads and therefore never older.
pub fn ref_older_than(reference: &str, bound: &Version) -> bool {
    parse_ref(reference).is_some_and(|v| v < *bound)
}

/// `true` when `reference` is at least `bound`. Unversioned refs count as newest.
pub fn ref_at_least(reference: &str, bound: &Version) -> bool {
    !ref_older_than(reference, bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_ref("v2.10.1"), Some(Version::new(2, 10, 1)));
        assert_eq!(parse_ref("2.6"), Some(Version::new(2, 6, 0)));
        assert_eq!(parse_ref("releases/3.14.7"), Some(Version::new(3, 14, 7)));
        assert_eq!(parse_ref("v2.13.1rc1"), Some(Version::new(2, 13, 1)));
        assert_eq!(parse_ref("1.26.4"), Some(Version::new(1, 26, 4)));
    }

    #[test]
    fn test_unversioned_refs() {
        assert_eq!(parse_ref("main"), None);
        assert_eq!(parse_ref(""), None);
        assert!(!ref_older_than("main", &Version::new(2, 6, 3)));
        assert!(ref_at_least("main", &Version::new(2, 14, 0)));
    }

    #[test]
    fn test_comparisons() {
        let bound = Version::new(2, 6, 3);
        assert!(ref_older_than("v2.6.2", &bound));
        assert!(!ref_older_than("v2.6.3", &bound));
        assert!(ref_at_least("v2.14.0", &Version::new(2, 14, 0)));
        assert!(!ref_at_least("v2.13.1", &Version::new(2, 14, 0)));
    }
}
