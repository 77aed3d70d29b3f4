//! Rule Matcher: evaluates header/query/body predicates against a request.

use crate::model::{Rule, RuleType};
use crate::request::DispatchRequest;
use serde_json::Value;

/// Evaluate whether every rule on a response matches the request.
///
/// A response with zero rules unconditionally matches. `Rule::Path` entries
/// are ignored here — they are resolved during endpoint lookup in the
/// Repository.
pub fn matches(rules: &[Rule], request: &DispatchRequest) -> bool {
    rules.iter().all(|rule| matches_one(rule, request))
}

fn matches_one(rule: &Rule, request: &DispatchRequest) -> bool {
    match rule.rule_type {
        RuleType::Header => {
            let extracted = request.header(&rule.key).unwrap_or("");
            rule.operator.matches(extracted, &rule.value)
        }
        RuleType::Query => {
            let extracted = request.query_param(&rule.key).unwrap_or("");
            rule.operator.matches(extracted, &rule.value)
        }
        RuleType::Body => {
            let extracted = extract_body_value(&request.body, &rule.key);
            rule.operator.matches(&extracted, &rule.value)
        }
        RuleType::Path => true,
    }
}

/// Extract a value from the request body for a `body` rule.
///
/// Attempts a JSON decode of the body; on success, walks `key` as a
/// dot-separated path through nested objects and stringifies the leaf
/// (strings verbatim, scalars via canonical formatting, containers via
/// re-serialization, missing path -> empty string). On decode failure, or an
/// empty path, falls back to comparing the raw body as a UTF-8 string.
fn extract_body_value(body: &[u8], key: &str) -> String {
    if key.is_empty() {
        return String::from_utf8_lossy(body).into_owned();
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value) => dot_path(&value, key).unwrap_or_default(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Walk a dot-separated path (`a.b.c`) through a JSON value tree, returning
/// the leaf's string form. Returns `None` if any segment is missing.
fn dot_path(value: &Value, path: &str) -> Option<String> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(stringify_leaf(current))
}

fn stringify_leaf(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RuleOperator;
    use http::HeaderMap;
    use std::collections::HashMap;

    fn req(headers: &[(&str, &str)], query: &[(&str, &str)], body: &str) -> DispatchRequest {
        let mut header_map = HeaderMap::new();
        for (k, v) in headers {
            header_map.insert(
                http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                http::HeaderValue::from_str(v).unwrap(),
            );
        }
        let query = query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();
        DispatchRequest {
            method: "GET".to_string(),
            headers: header_map,
            query,
            body: bytes::Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn zero_rules_unconditionally_matches() {
        let r = req(&[], &[], "");
        assert!(matches(&[], &r));
    }

    #[test]
    fn header_equals() {
        let rule = Rule {
            rule_type: RuleType::Header,
            key: "X-Env".to_string(),
            operator: RuleOperator::Equals,
            value: "prod".to_string(),
        };
        assert!(matches(&[rule.clone()], &req(&[("X-Env", "prod")], &[], "")));
        assert!(!matches(&[rule], &req(&[], &[], "")));
    }

    #[test]
    fn query_contains() {
        let rule = Rule {
            rule_type: RuleType::Query,
            key: "q".to_string(),
            operator: RuleOperator::Contains,
            value: "abc".to_string(),
        };
        assert!(matches(&[rule.clone()], &req(&[], &[("q", "xxabcyy")], "")));
        assert!(!matches(&[rule], &req(&[], &[("q", "xyz")], "")));
    }

    #[test]
    fn body_dot_path_extraction() {
        let rule = Rule {
            rule_type: RuleType::Body,
            key: "user.id".to_string(),
            operator: RuleOperator::Equals,
            value: "42".to_string(),
        };
        let r = req(&[], &[], r#"{"user":{"id":42}}"#);
        assert!(matches(&[rule], &r));
    }

    #[test]
    fn body_dot_path_missing_is_empty() {
        let rule = Rule {
            rule_type: RuleType::Body,
            key: "user.missing".to_string(),
            operator: RuleOperator::Equals,
            value: "".to_string(),
        };
        let r = req(&[], &[], r#"{"user":{"id":42}}"#);
        assert!(matches(&[rule], &r));
    }

    #[test]
    fn body_non_json_falls_back_to_raw_string() {
        let rule = Rule {
            rule_type: RuleType::Body,
            key: "anything".to_string(),
            operator: RuleOperator::Contains,
            value: "hello".to_string(),
        };
        let r = req(&[], &[], "hello world, not json");
        assert!(matches(&[rule], &r));
    }

    #[test]
    fn body_container_leaf_reserialized() {
        let rule = Rule {
            rule_type: RuleType::Body,
            key: "tags".to_string(),
            operator: RuleOperator::Equals,
            value: r#"["a","b"]"#.to_string(),
        };
        let r = req(&[], &[], r#"{"tags":["a","b"]}"#);
        assert!(matches(&[rule], &r));
    }

    #[test]
    fn unknown_operator_collapses_to_equals() {
        assert_eq!(RuleOperator::parse("bogus"), RuleOperator::Equals);
        assert_eq!(RuleOperator::parse("CONTAINS"), RuleOperator::Contains);
    }

    #[test]
    fn path_rule_ignored_by_matcher() {
        let rule = Rule {
            rule_type: RuleType::Path,
            key: "ignored".to_string(),
            operator: RuleOperator::Equals,
            value: "ignored".to_string(),
        };
        assert!(matches(&[rule], &req(&[], &[], "")));
    }
}
