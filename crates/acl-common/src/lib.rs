//! Common building blocks for TNSR ACL rule tools.
//!
//! This crate holds everything shared between the rule manager and its
//! test support:
//!
//! - [`rule`]: [`AclRule`] model and the static field template
//! - [`paths`]: RESTCONF addressing of `netgate-acl` rules
//! - [`wire`]: JSON envelopes for rule and rule-list payloads
//! - [`Transport`]: the single-request HTTP contract
//! - [`cache`]: per-ACL [`RuleSetCache`] and [`SequenceIndex`]
//! - [`error`]: [`HttpError`] and [`AclError`]
//!
//! # Example
//!
//! ```
//! use tnsr_acl_common::{AclPaths, AclRule, DEFAULT_MODULE};
//!
//! let paths = AclPaths::new("https://tnsr/restconf", DEFAULT_MODULE).unwrap();
//! let rule = AclRule::from_fields([("sequence", "10"), ("action", "permit")]).unwrap();
//! let url = paths.rule_url("edge", rule.require_sequence().unwrap());
//! assert!(url.ends_with("netgate-acl:acl-rule=10"));
//! ```

pub mod cache;
pub mod error;
pub mod paths;
pub mod rule;
pub mod transport;
pub mod wire;

// Re-export commonly used items at crate root
pub use cache::{RuleSet, RuleSetCache, SequenceIndex};
pub use error::{AclError, AclResult, HttpError};
pub use paths::{AclPaths, DEFAULT_API_PATH, DEFAULT_MODULE};
pub use rule::{
    template_field, AclAction, AclRule, AclRuleList, FieldKind, IpVersion, TemplateField,
    RULE_TEMPLATE,
};
pub use transport::{Method, RawResponse, Transport};
