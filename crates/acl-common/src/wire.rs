//! JSON envelopes exchanged with the RESTCONF API.
//!
//! List payload: `{"<m>:acl-rules": {"acl-rule": [ ... ]}}`
//! Rule payload: `{"<m>:acl-rule": { ... }}`

use serde_json::{Map, Value};

use crate::error::{AclError, AclResult};
use crate::paths::AclPaths;
use crate::rule::{AclRule, AclRuleList};

/// Serializes a rule into its single-rule envelope.
pub fn encode_rule(paths: &AclPaths, rule: &AclRule) -> AclResult<String> {
    let value = serde_json::to_value(rule).map_err(|e| AclError::internal(e.to_string()))?;
    let mut envelope = Map::new();
    envelope.insert(paths.rule_key(), value);
    serde_json::to_string(&Value::Object(envelope)).map_err(|e| AclError::internal(e.to_string()))
}

/// Parses a single-rule envelope.
pub fn decode_rule(paths: &AclPaths, raw: &str) -> AclResult<AclRule> {
    let value: Value = serde_json::from_str(raw).map_err(|e| AclError::decode("rule", e.to_string()))?;
    let inner = value
        .get(paths.rule_key())
        .cloned()
        .ok_or_else(|| AclError::decode("rule", format!("missing '{}'", paths.rule_key())))?;
    serde_json::from_value(inner).map_err(|e| AclError::decode("rule", e.to_string()))
}

/// Serializes a rule list into its list envelope.
pub fn encode_rule_list(paths: &AclPaths, list: &AclRuleList) -> AclResult<String> {
    let value = serde_json::to_value(list).map_err(|e| AclError::internal(e.to_string()))?;
    let mut envelope = Map::new();
    envelope.insert(paths.rules_key(), value);
    serde_json::to_string(&Value::Object(envelope)).map_err(|e| AclError::internal(e.to_string()))
}

/// Parses a list envelope.
///
/// An empty body, a body without the rules container, or a container
/// without the `acl-rule` array all mean "no rules".
pub fn decode_rule_list(paths: &AclPaths, raw: &str) -> AclResult<AclRuleList> {
    if raw.trim().is_empty() {
        return Ok(AclRuleList::default());
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|e| AclError::decode("rule list", e.to_string()))?;
    match value.get(paths.rules_key()) {
        Some(container) => serde_json::from_value(container.clone())
            .map_err(|e| AclError::decode("rule list", e.to_string())),
        None => Ok(AclRuleList::default()),
    }
}
