//! RESTCONF resource addressing for `netgate-acl` rules.
//!
//! ```text
//! {base}/data/{m}:acl-config/{m}:acl-table/{m}:acl-list={acl}/{m}:acl-rules
//! {base}/data/{m}:acl-config/{m}:acl-table/{m}:acl-list={acl}/{m}:acl-rules/{m}:acl-rule={seq}
//! ```

use url::Url;

use crate::error::{AclError, AclResult};

// Default YANG module
pub const DEFAULT_MODULE: &str = "netgate-acl";

// Default RESTCONF API root
pub const DEFAULT_API_PATH: &str = "/restconf";

// RESTCONF datastore resource
pub const DATA_RESOURCE: &str = "data";

// netgate-acl container / list names
pub mod nodes {
    pub const ACL_CONFIG: &str = "acl-config";
    pub const ACL_TABLE: &str = "acl-table";
    pub const ACL_LIST: &str = "acl-list";
    pub const ACL_RULES: &str = "acl-rules";
    pub const ACL_RULE: &str = "acl-rule";
}

// Media type for request bodies
pub const YANG_DATA_JSON: &str = "application/yang-data+json; charset=utf-8";

// Accept header value
pub const YANG_DATA_JSON_ACCEPT: &str = "application/yang-data+json";

/// URL builder for ACL rule resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclPaths {
    base: Url,
    module: String,
}

impl AclPaths {
    /// Creates a builder from a base URL such as `https://tnsr/restconf`.
    pub fn new(base_url: &str, module: impl Into<String>) -> AclResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| AclError::validation("base_url", format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(AclError::validation(
                "base_url",
                format!("{} cannot be used as a base URL", base_url),
            ));
        }
        Ok(Self {
            base,
            module: module.into(),
        })
    }

    /// YANG module prefix in use.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Base URL the resources are resolved against.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Qualifies a node name with the module prefix.
    pub fn qualified(&self, node: &str) -> String {
        format!("{}:{}", self.module, node)
    }

    /// Top-level JSON key of a rule list payload.
    pub fn rules_key(&self) -> String {
        self.qualified(nodes::ACL_RULES)
    }

    /// Top-level JSON key of a single rule payload.
    pub fn rule_key(&self) -> String {
        self.qualified(nodes::ACL_RULE)
    }

    /// URL of the rule collection of one ACL.
    pub fn rules_url(&self, acl_name: &str) -> String {
        self.build(acl_name, None)
    }

    /// URL of one rule.
    pub fn rule_url(&self, acl_name: &str, sequence: u32) -> String {
        self.build(acl_name, Some(sequence))
    }

    fn build(&self, acl_name: &str, sequence: Option<u32>) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.push(DATA_RESOURCE);
            segments.push(&self.qualified(nodes::ACL_CONFIG));
            segments.push(&self.qualified(nodes::ACL_TABLE));
            segments.push(&format!("{}={}", self.qualified(nodes::ACL_LIST), acl_name));
            segments.push(&self.rules_key());
            if let Some(seq) = sequence {
                segments.push(&format!("{}={}", self.rule_key(), seq));
            }
        }
        url.into()
    }
}
