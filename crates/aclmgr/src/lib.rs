//! ACL Manager - rule store and sequence renumbering for TNSR ACLs
//!
//! aclmgr edits the rules of TNSR access control lists through the
//! RESTCONF API. Each rule is addressed by its sequence number; the API
//! only supports writing and deleting one rule at a time.
//!
//! Key features:
//! - Fetch, create-or-update and delete rules, keeping a per-ACL cache of
//!   the last fetched list
//! - Open free sequence slots ahead of a rule by renumbering the rules that
//!   would collide, one remote call at a time and never onto an occupied
//!   sequence
//! - Reject a second shift on an ACL while one is still running
//! - TOML configuration and a command line front end

pub mod config;
pub mod error;
pub mod http;
pub mod renumber;
pub mod store;

pub use config::{AclMgrConfig, LoggingConfig, RestconfConfig, DEFAULT_CONFIG_PATH};
pub use error::{AclMgrError, Result as AclMgrResult};
pub use http::HttpTransport;
pub use renumber::{
    affected_block, execute_steps, Move, PartialRenumberFailure, RenumberEngine, RenumberPlan,
    RenumberStep, ShiftOutcome,
};
pub use store::{RuleListing, RuleStore};
