// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Node-scope filtering: decides whether an intent record applies to this
//! node by evaluating its label selector against the node's labels.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};

#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("unknown selector operator {0}")]
    UnknownOperator(String),
    #[error("operator {0} requires values")]
    MissingValues(String),
    #[error("operator {0} does not take values")]
    UnexpectedValues(String),
}

/// An empty or absent selector matches every node.
pub fn matches_node(
    selector: Option<&LabelSelector>,
    node_labels: &BTreeMap<String, String>,
) -> Result<bool, SelectorError> {
    let Some(selector) = selector else {
        return Ok(true);
    };

    if let Some(match_labels) = &selector.match_labels {
        for (key, value) in match_labels {
            if node_labels.get(key) != Some(value) {
                return Ok(false);
            }
        }
    }

    if let Some(expressions) = &selector.match_expressions {
        for expr in expressions {
            if !matches_expression(expr, node_labels)? {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

fn matches_expression(
    expr: &LabelSelectorRequirement,
    node_labels: &BTreeMap<String, String>,
) -> Result<bool, SelectorError> {
    let values = expr.values.as_deref().unwrap_or(&[]);
    match expr.operator.as_str() {
        "In" => {
            if values.is_empty() {
                return Err(SelectorError::MissingValues(expr.operator.clone()));
            }
            Ok(node_labels
                .get(&expr.key)
                .is_some_and(|v| values.contains(v)))
        }
        "NotIn" => {
            if values.is_empty() {
                return Err(SelectorError::MissingValues(expr.operator.clone()));
            }
            Ok(node_labels
                .get(&expr.key)
                .is_none_or(|v| !values.contains(v)))
        }
        "Exists" => {
            if !values.is_empty() {
                return Err(SelectorError::UnexpectedValues(expr.operator.clone()));
            }
            Ok(node_labels.contains_key(&expr.key))
        }
        "DoesNotExist" => {
            if !values.is_empty() {
                return Err(SelectorError::UnexpectedValues(expr.operator.clone()));
            }
            Ok(!node_labels.contains_key(&expr.key))
        }
        other => Err(SelectorError::UnknownOperator(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn requirement(key: &str, operator: &str, values: &[&str]) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(ToString::to_string).collect())
            },
        }
    }

    #[test]
    fn empty_selector_matches_everything() {
        let node = labels(&[("kubernetes.io/hostname", "node-a")]);
        assert!(matches_node(None, &node).unwrap());
        assert!(matches_node(Some(&LabelSelector::default()), &node).unwrap());
    }

    #[test]
    fn match_labels_require_equality() {
        let node = labels(&[("kubernetes.io/hostname", "node-a"), ("zone", "left")]);
        let selector = LabelSelector {
            match_labels: Some(labels(&[("kubernetes.io/hostname", "node-a")])),
            match_expressions: None,
        };
        assert!(matches_node(Some(&selector), &node).unwrap());

        let selector = LabelSelector {
            match_labels: Some(labels(&[("kubernetes.io/hostname", "node-b")])),
            match_expressions: None,
        };
        assert!(!matches_node(Some(&selector), &node).unwrap());
    }

    #[test]
    fn set_based_expressions() {
        let node = labels(&[("zone", "left")]);

        let in_expr = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![requirement("zone", "In", &["left", "right"])]),
        };
        assert!(matches_node(Some(&in_expr), &node).unwrap());

        let not_in = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![requirement("zone", "NotIn", &["left"])]),
        };
        assert!(!matches_node(Some(&not_in), &node).unwrap());

        let exists = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![requirement("zone", "Exists", &[])]),
        };
        assert!(matches_node(Some(&exists), &node).unwrap());

        let missing = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![requirement("color", "DoesNotExist", &[])]),
        };
        assert!(matches_node(Some(&missing), &node).unwrap());
    }

    #[test]
    fn not_in_matches_absent_key() {
        let node = labels(&[]);
        let not_in = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![requirement("zone", "NotIn", &["left"])]),
        };
        assert!(matches_node(Some(&not_in), &node).unwrap());
    }

    #[test]
    fn invalid_expressions_error() {
        let node = labels(&[]);
        let bad_op = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![requirement("zone", "Near", &["left"])]),
        };
        assert!(matches!(
            matches_node(Some(&bad_op), &node),
            Err(SelectorError::UnknownOperator(_))
        ));

        let missing_values = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![requirement("zone", "In", &[])]),
        };
        assert!(matches!(
            matches_node(Some(&missing_values), &node),
            Err(SelectorError::MissingValues(_))
        ));
    }
}
