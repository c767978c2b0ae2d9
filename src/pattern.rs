// src/pattern.rs

//! Expansion of user supplied host/target/project selections
//!
//! A selection is a comma separated list of glob patterns; `all` selects
//! everything.

use crate::error::{Error, Result};
use glob::Pattern;
use std::collections::BTreeSet;
use tracing::debug;

/// Expand `pattern` against `items`
///
/// Every comma separated part must match at least one item.
pub fn expand_pattern<I, S>(pattern: &str, items: I, what: &str) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<String> = items.into_iter().map(|s| s.as_ref().to_string()).collect();
    debug!("Expanding {} pattern '{}' on {:?}", what, pattern, items);

    if pattern.trim().is_empty() {
        return Err(Error::ValidationError(format!("Missing {} list", what)));
    }

    let effective = if pattern == "all" { "*" } else { pattern };
    let mut matches = BTreeSet::new();

    for part in effective.split(',') {
        let glob = Pattern::new(part.trim()).map_err(|e| {
            Error::ValidationError(format!("Invalid {} pattern '{}': {}", what, part, e))
        })?;

        let before = matches.len();
        let mut hit = false;
        for item in &items {
            if glob.matches(item) {
                hit = true;
                matches.insert(item.clone());
            }
        }

        if !hit {
            return Err(Error::ValidationError(format!(
                "Invalid {} list '{}'",
                what, pattern
            )));
        }
        debug!("'{}' matched {} new {}s", part, matches.len() - before, what);
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOSTS: [&str; 4] = [
        "centos-stream-9-1",
        "centos-stream-9-2",
        "fedora-test-1",
        "some-other-centos-stream-9",
    ];

    #[test]
    fn test_all_expands_everything() {
        let res = expand_pattern("all", HOSTS, "host").unwrap();
        assert_eq!(res.len(), 4);
    }

    #[test]
    fn test_globs_and_lists() {
        let res = expand_pattern("*centos*", HOSTS, "host").unwrap();
        assert_eq!(
            res.into_iter().collect::<Vec<_>>(),
            vec![
                "centos-stream-9-1",
                "centos-stream-9-2",
                "some-other-centos-stream-9"
            ]
        );

        let res = expand_pattern("fedora-test-1,centos-stream-9-?", HOSTS, "host").unwrap();
        assert_eq!(res.len(), 3);
    }

    #[test]
    fn test_unmatched_part_fails() {
        assert!(expand_pattern("debian-12", HOSTS, "host").is_err());
        assert!(expand_pattern("fedora-test-1,debian-12", HOSTS, "host").is_err());
        assert!(expand_pattern("", HOSTS, "host").is_err());
    }
}
