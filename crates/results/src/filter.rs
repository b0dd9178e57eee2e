//! Server side CEL filter expressions for the Results list API.

use crate::kind::RunKind;
use crate::selector::LabelMap;

/// Build the CEL filter for a list request.
///
/// The expression ANDs a type clause (any API version of `kind`), one
/// equality clause per label and an optional exact name clause. Unique
/// identifiers cannot be filtered server side for records and are matched in
/// memory by the caller.
#[must_use]
pub fn build_filter_expression(kind: RunKind, labels: &LabelMap, exact_name: Option<&str>) -> String {
    let mut parts = Vec::with_capacity(labels.len() + 2);

    let types = kind.data_types();
    if !types.is_empty() {
        let clauses: Vec<String> = types
            .iter()
            .map(|t| format!(r#"data_type=="{}""#, escape_cel_string(t)))
            .collect();
        parts.push(format!("({})", clauses.join(" || ")));
    }

    for (key, value) in labels {
        parts.push(format!(
            r#"data.metadata.labels["{}"]=="{}""#,
            escape_cel_string(key),
            escape_cel_string(value)
        ));
    }

    if let Some(name) = exact_name.filter(|n| !n.is_empty()) {
        parts.push(format!(r#"data.metadata.name=="{}""#, escape_cel_string(name)));
    }

    parts.join(" && ")
}

/// Escape a value for use inside a double quoted CEL string literal.
#[must_use]
pub fn escape_cel_string(input: &str) -> String {
    input.replace('\\', r"\\").replace('"', r#"\""#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::parse_label_selector;

    #[test]
    fn test_type_clause_only() {
        let filter = build_filter_expression(RunKind::PipelineRun, &LabelMap::new(), None);
        assert_eq!(
            filter,
            r#"(data_type=="tekton.dev/v1.PipelineRun" || data_type=="tekton.dev/v1beta1.PipelineRun")"#
        );
    }

    #[test]
    fn test_labels_and_name() {
        let labels = parse_label_selector("tekton.dev/pipeline=build,app=web").unwrap();
        let filter = build_filter_expression(RunKind::TaskRun, &labels, Some("build-1"));
        assert_eq!(
            filter,
            concat!(
                r#"(data_type=="tekton.dev/v1.TaskRun" || data_type=="tekton.dev/v1beta1.TaskRun")"#,
                r#" && data.metadata.labels["app"]=="web""#,
                r#" && data.metadata.labels["tekton.dev/pipeline"]=="build""#,
                r#" && data.metadata.name=="build-1""#,
            )
        );
    }

    #[test]
    fn test_empty_name_is_ignored() {
        let filter = build_filter_expression(RunKind::TaskRun, &LabelMap::new(), Some(""));
        assert!(!filter.contains("data.metadata.name"));
    }

    #[test]
    fn test_values_are_escaped() {
        assert_eq!(escape_cel_string(r#"a"b\c"#), r#"a\"b\\c"#);

        let filter = build_filter_expression(
            RunKind::PipelineRun,
            &LabelMap::new(),
            Some(r#"x" || true || "y"#),
        );
        assert!(filter.ends_with(r#"data.metadata.name=="x\" || true || \"y""#));
    }
}
