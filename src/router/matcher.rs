//! Combined longest-prefix matcher built from all wildcard prefixes.

use regex::Regex;
use std::sync::Arc;

use super::core::CompileError;

/// One anchored alternation over every (escaped) wildcard prefix, ordered
/// most-specific-first. Matching a path tells the router which prefix chain
/// applies without scanning the prefix list per request.
#[derive(Clone, Debug)]
pub(crate) struct PrefixMatcher {
    regex: Option<Regex>,
}

impl PrefixMatcher {
    /// Build the matcher from prefixes already sorted by specificity
    /// (length descending, then lexicographic).
    pub(crate) fn build(prefixes: &[Arc<str>]) -> Result<Self, CompileError> {
        if prefixes.is_empty() {
            return Ok(Self { regex: None });
        }
        for prefix in prefixes {
            // Parentheses would corrupt the alternation's group numbering.
            if prefix.contains('(') || prefix.contains(')') {
                return Err(CompileError::UnsupportedPrefixSyntax {
                    prefix: prefix.to_string(),
                });
            }
        }
        let pattern = prefixes
            .iter()
            .map(|p| format!("(^{})", regex::escape(p)))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&pattern).map_err(|_| CompileError::UnsupportedPrefixSyntax {
            prefix: pattern.clone(),
        })?;
        Ok(Self { regex: Some(regex) })
    }

    /// Index (into the ordered prefix list) of the most specific prefix of
    /// `path`, if any. The right-most successful sub-match wins, recovering
    /// the specificity ordering from the alternation.
    pub(crate) fn best_match(&self, path: &str) -> Option<usize> {
        let caps = self.regex.as_ref()?.captures(path)?;
        (1..caps.len()).rev().find(|&i| caps.get(i).is_some()).map(|i| i - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes(list: &[&str]) -> Vec<Arc<str>> {
        list.iter().map(|p| Arc::from(*p)).collect()
    }

    #[test]
    fn test_most_specific_prefix_wins() {
        let m = PrefixMatcher::build(&prefixes(&["/a/b/", "/a/", "/"])).unwrap();
        assert_eq!(m.best_match("/a/b/c"), Some(0));
        assert_eq!(m.best_match("/a/x"), Some(1));
        assert_eq!(m.best_match("/zzz"), Some(2));
    }

    #[test]
    fn test_anchored_at_path_start() {
        let m = PrefixMatcher::build(&prefixes(&["/foo/"])).unwrap();
        assert_eq!(m.best_match("/bar/foo/baz"), None);
    }

    #[test]
    fn test_empty_matcher_never_matches() {
        let m = PrefixMatcher::build(&[]).unwrap();
        assert_eq!(m.best_match("/anything"), None);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let m = PrefixMatcher::build(&prefixes(&["/a.b/"])).unwrap();
        assert_eq!(m.best_match("/a.b/c"), Some(0));
        assert_eq!(m.best_match("/axb/c"), None);
    }

    #[test]
    fn test_parens_rejected() {
        let err = PrefixMatcher::build(&prefixes(&["/a(b)/"])).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedPrefixSyntax { .. }));
    }
}
