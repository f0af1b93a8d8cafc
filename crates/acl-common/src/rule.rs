//! ACL rule model and the static field template.
//!
//! Field names are the YANG leaf names of `netgate-acl:acl-rule` verbatim.
//! Every field is optional so that a rule read from the remote API can be
//! written back (e.g. to a new sequence number) without inventing values;
//! leaves this model does not know about are carried in [`AclRule::extra`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AclError, AclResult};

/// Key leaf of a rule within its ACL.
pub const SEQUENCE_FIELD: &str = "sequence";

/// Default for textual template fields.
pub const TEXT_PLACEHOLDER: &str = "string";

/// ACL rule action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclAction {
    /// Drop matching packets.
    #[default]
    Deny,
    /// Forward matching packets.
    Permit,
    /// Permit and create reflexive session state.
    Reflect,
}

impl AclAction {
    /// Accepted values, in template order.
    pub const VALUES: &'static [&'static str] = &["deny", "permit", "reflect"];
}

impl fmt::Display for AclAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deny => write!(f, "deny"),
            Self::Permit => write!(f, "permit"),
            Self::Reflect => write!(f, "reflect"),
        }
    }
}

impl FromStr for AclAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deny" => Ok(Self::Deny),
            "permit" => Ok(Self::Permit),
            "reflect" => Ok(Self::Reflect),
            _ => Err(format!("Unknown ACL action: {}", s)),
        }
    }
}

/// IP version a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    #[default]
    Unknown,
    Ipv4,
    Ipv6,
}

impl IpVersion {
    /// Accepted values, in template order.
    pub const VALUES: &'static [&'static str] = &["unknown", "ipv4", "ipv6"];
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
        }
    }
}

impl FromStr for IpVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "ipv4" => Ok(Self::Ipv4),
            "ipv6" => Ok(Self::Ipv6),
            _ => Err(format!("Unknown IP version: {}", s)),
        }
    }
}

/// How a template field's value is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned integer, inclusive upper bound.
    Numeric { max: u64 },
    /// Free text.
    Text,
    /// One of a fixed set of strings.
    Choice(&'static [&'static str]),
}

impl FieldKind {
    /// Returns true for integer-valued fields.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Numeric { .. })
    }
}

/// One entry of the rule field template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateField {
    /// YANG leaf name.
    pub name: &'static str,
    /// Value type.
    pub kind: FieldKind,
}

impl TemplateField {
    const fn numeric(name: &'static str, max: u64) -> Self {
        Self {
            name,
            kind: FieldKind::Numeric { max },
        }
    }

    const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
        }
    }

    const fn choice(name: &'static str, values: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::Choice(values),
        }
    }

    /// Default value used to pre-fill a new rule.
    pub fn default_value(&self) -> Value {
        match self.kind {
            FieldKind::Numeric { .. } => Value::from(0),
            FieldKind::Text => Value::from(TEXT_PLACEHOLDER),
            FieldKind::Choice(values) => Value::from(values[0]),
        }
    }

    /// Parses a textual value into its JSON representation.
    pub fn parse(&self, raw: &str) -> AclResult<Value> {
        let raw = raw.trim();
        match self.kind {
            FieldKind::Numeric { max } => {
                let n: u64 = raw.parse().map_err(|_| {
                    AclError::validation(self.name, format!("'{}' is not an unsigned integer", raw))
                })?;
                if n > max {
                    return Err(AclError::validation(
                        self.name,
                        format!("{} exceeds maximum {}", n, max),
                    ));
                }
                Ok(Value::from(n))
            }
            FieldKind::Text => Ok(Value::from(raw)),
            FieldKind::Choice(values) => {
                if values.contains(&raw) {
                    Ok(Value::from(raw))
                } else {
                    Err(AclError::validation(
                        self.name,
                        format!("must be one of {}", values.join(", ")),
                    ))
                }
            }
        }
    }
}

/// Rule fields in display order.
pub static RULE_TEMPLATE: &[TemplateField] = &[
    TemplateField::numeric(SEQUENCE_FIELD, u32::MAX as u64),
    TemplateField::text("acl-rule-description"),
    TemplateField::choice("action", AclAction::VALUES),
    TemplateField::choice("ip-version", IpVersion::VALUES),
    TemplateField::text("protocol"),
    TemplateField::text("src-ip-prefix"),
    TemplateField::numeric("src-first-port", u16::MAX as u64),
    TemplateField::numeric("src-last-port", u16::MAX as u64),
    TemplateField::text("dst-ip-prefix"),
    TemplateField::numeric("dst-first-port", u16::MAX as u64),
    TemplateField::numeric("dst-last-port", u16::MAX as u64),
    TemplateField::numeric("tcp-flags-mask", u8::MAX as u64),
    TemplateField::numeric("tcp-flags-value", u8::MAX as u64),
    TemplateField::numeric("icmp-first-code", u8::MAX as u64),
    TemplateField::numeric("icmp-last-code", u8::MAX as u64),
    TemplateField::numeric("icmp-first-type", u8::MAX as u64),
    TemplateField::numeric("icmp-last-type", u8::MAX as u64),
];

/// Looks up a template field by leaf name.
pub fn template_field(name: &str) -> Option<&'static TemplateField> {
    RULE_TEMPLATE.iter().find(|f| f.name == name)
}

/// A single ACL rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AclRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(rename = "acl-rule-description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<AclAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<IpVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_ip_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_first_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_last_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_ip_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_first_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_last_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_flags_mask: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_flags_value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_first_code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_last_code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_first_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_last_type: Option<u8>,
    /// Leaves returned by the remote API that are not in the template.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AclRule {
    /// Creates an empty rule at the given sequence number.
    pub fn with_sequence(sequence: u32) -> Self {
        Self {
            sequence: Some(sequence),
            ..Default::default()
        }
    }

    /// Creates a rule with every template field set to its default.
    pub fn template_default() -> Self {
        let map: Map<String, Value> = RULE_TEMPLATE
            .iter()
            .map(|f| (f.name.to_string(), f.default_value()))
            .collect();
        // Template defaults are always within range.
        serde_json::from_value(Value::Object(map)).unwrap_or_default()
    }

    /// Builds a rule from `(field, value)` pairs, typing each value per the template.
    ///
    /// Unknown field names and values that do not fit the field are rejected.
    pub fn from_fields<I, K, V>(fields: I) -> AclResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = Map::new();
        for (name, raw) in fields {
            let name = name.as_ref();
            let field = template_field(name)
                .ok_or_else(|| AclError::validation(name, "unknown rule field"))?;
            map.insert(name.to_string(), field.parse(raw.as_ref())?);
        }
        serde_json::from_value(Value::Object(map))
            .map_err(|e| AclError::validation("rule", e.to_string()))
    }

    /// Returns the sequence number, or a validation error if it is missing.
    pub fn require_sequence(&self) -> AclResult<u32> {
        self.sequence
            .ok_or_else(|| AclError::validation(SEQUENCE_FIELD, "missing mandatory field"))
    }

    /// Returns a copy of this rule addressed at another sequence number.
    pub fn renumbered(&self, sequence: u32) -> Self {
        Self {
            sequence: Some(sequence),
            ..self.clone()
        }
    }

    /// Returns the textual value of a field, if set.
    pub fn field_value(&self, name: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        match value.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Rules of one ACL, in the order the remote API returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AclRuleList {
    #[serde(rename = "acl-rule", default)]
    pub rules: Vec<AclRule>,
}

impl AclRuleList {
    pub fn new(rules: Vec<AclRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AclRule> {
        self.rules.iter()
    }

    /// Returns the first rule with the given sequence number.
    pub fn find(&self, sequence: u32) -> Option<&AclRule> {
        self.rules.iter().find(|r| r.sequence == Some(sequence))
    }

    /// Sequence numbers in list order; rules without one are skipped.
    pub fn sequences(&self) -> Vec<u32> {
        self.rules.iter().filter_map(|r| r.sequence).collect()
    }
}

impl From<Vec<AclRule>> for AclRuleList {
    fn from(rules: Vec<AclRule>) -> Self {
        Self::new(rules)
    }
}

impl IntoIterator for AclRuleList {
    type Item = AclRule;
    type IntoIter = std::vec::IntoIter<AclRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}
