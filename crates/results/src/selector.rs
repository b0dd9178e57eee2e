//! Selectors describing which runs a caller is interested in.

use std::collections::BTreeMap;

use crate::error::{Result, ResultsError};

/// Label key/value pairs a run must carry.
pub type LabelMap = BTreeMap<String, String>;

/// Parse a comma separated `key=value` label selector.
///
/// Whitespace around commas and `=` is ignored and empty segments are
/// skipped. Later duplicates overwrite earlier ones.
///
/// # Errors
/// Returns [`ResultsError::MalformedSelector`] naming the first pair that has
/// no `=` or an empty key or value.
pub fn parse_label_selector(selector: &str) -> Result<LabelMap> {
    let mut labels = LabelMap::new();
    for pair in selector.split(',').map(str::trim) {
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ResultsError::MalformedSelector {
                pair: pair.to_string(),
                reason: "expected key=value pairs".to_string(),
            });
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            return Err(ResultsError::MalformedSelector {
                pair: pair.to_string(),
                reason: "empty key or value".to_string(),
            });
        }
        labels.insert(key.to_string(), value.to_string());
    }
    Ok(labels)
}

/// Whether `actual` contains every pair in `expected`.
#[must_use]
pub fn matches_labels(actual: &BTreeMap<String, String>, expected: &LabelMap) -> bool {
    expected
        .iter()
        .all(|(key, want)| actual.get(key).is_some_and(|have| have == want))
}

/// Namespace scope of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceScope {
    /// Every namespace the caller can see.
    All,
    /// A single namespace.
    Namespace(String),
}

impl NamespaceScope {
    /// Interpret a caller supplied namespace. Empty, `-`, `all` and `*` mean all namespaces.
    #[must_use]
    pub fn parse(namespace: &str) -> Self {
        let ns = namespace.trim();
        if is_wildcard(ns) {
            Self::All
        } else {
            Self::Namespace(ns.to_string())
        }
    }

    /// Results API parent covering every result in this scope.
    #[must_use]
    pub fn parent(&self) -> String {
        match self {
            Self::All => "-/results/-".to_string(),
            Self::Namespace(ns) => format!("{ns}/results/-"),
        }
    }
}

/// Whether `namespace` is one of the spellings for "all namespaces".
#[must_use]
pub fn is_wildcard(namespace: &str) -> bool {
    matches!(
        namespace.trim().to_ascii_lowercase().as_str(),
        "" | "-" | "all" | "*"
    )
}

/// Criteria for resolving exactly one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSelector {
    /// Namespace to search; `-` searches every namespace.
    pub namespace: String,
    /// Comma separated `key=value` label filters.
    pub label_selector: String,
    /// Name prefix filter.
    pub prefix: String,
    /// Exact name. Names are reused across history, so this may still match several runs.
    pub name: String,
    /// Exact unique identifier. Takes precedence over every other criterion.
    pub uid: String,
    /// Pick the newest run instead of failing when several match.
    pub select_last: bool,
}

/// Criteria for listing runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub namespace: String,
    pub label_selector: String,
    pub prefix: String,
    /// Maximum number of runs to return; zero selects the default.
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_selector() {
        assert!(parse_label_selector("").unwrap().is_empty());
        assert!(parse_label_selector("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_pairs_with_whitespace() {
        let labels = parse_label_selector(" app = web , tier=backend ,").unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["app"], "web");
        assert_eq!(labels["tier"], "backend");
    }

    #[test]
    fn test_parse_value_containing_equals() {
        let labels = parse_label_selector("expr=a=b").unwrap();
        assert_eq!(labels["expr"], "a=b");
    }

    #[test]
    fn test_parse_last_duplicate_wins() {
        let labels = parse_label_selector("app=one,app=two").unwrap();
        assert_eq!(labels["app"], "two");
    }

    #[test]
    fn test_parse_rejects_malformed_pairs() {
        for input in ["app", "app=web,tier", "=web", "app=", " = "] {
            let err = parse_label_selector(input).unwrap_err();
            assert!(
                matches!(err, ResultsError::MalformedSelector { .. }),
                "expected malformed selector for {input:?}"
            );
        }
    }

    #[test]
    fn test_error_names_offending_pair() {
        let err = parse_label_selector("app=web,broken").unwrap_err();
        assert!(err.to_string().contains("\"broken\""));
    }

    #[test]
    fn test_matches_labels() {
        let actual: BTreeMap<String, String> = [("app", "web"), ("tier", "backend")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(matches_labels(&actual, &LabelMap::new()));
        assert!(matches_labels(&actual, &parse_label_selector("app=web").unwrap()));
        assert!(!matches_labels(&actual, &parse_label_selector("app=api").unwrap()));
        assert!(!matches_labels(&actual, &parse_label_selector("zone=a").unwrap()));
        assert!(!matches_labels(&BTreeMap::new(), &parse_label_selector("app=web").unwrap()));
    }

    #[test]
    fn test_namespace_scope() {
        for ns in ["", "-", "all", "ALL", " * "] {
            assert_eq!(NamespaceScope::parse(ns), NamespaceScope::All);
        }
        assert_eq!(NamespaceScope::All.parent(), "-/results/-");
        assert_eq!(NamespaceScope::parse(" foo ").parent(), "foo/results/-");
    }
}
