//! Rule store - CRUD against the rules of one ACL
//!
//! The store owns the [`RuleSetCache`]. A successful fetch replaces the
//! ACL's cache entry; a successful write marks it stale. Remote failures
//! are returned unchanged and never retried here.

use parking_lot::RwLock;
use tnsr_acl_common::{
    wire, AclPaths, AclResult, AclRule, AclRuleList, Method, RuleSetCache, SequenceIndex,
    Transport,
};
use tracing::{debug, info, warn};

/// Rules of one ACL as returned by a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleListing {
    /// ACL the rules belong to.
    pub acl_name: String,
    /// Rules in server order.
    pub rules: AclRuleList,
}

/// Rule store backed by a [`Transport`].
pub struct RuleStore<T> {
    transport: T,
    paths: AclPaths,
    cache: RwLock<RuleSetCache>,
}

impl<T: Transport> RuleStore<T> {
    /// Creates a store with an empty cache.
    pub fn new(transport: T, paths: AclPaths) -> Self {
        Self {
            transport,
            paths,
            cache: RwLock::new(RuleSetCache::new()),
        }
    }

    /// URL builder in use.
    pub fn paths(&self) -> &AclPaths {
        &self.paths
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches the rules of an ACL and replaces its cache entry.
    ///
    /// On any failure the cache is left as it was.
    pub async fn fetch_rules(&self, acl_name: &str) -> AclResult<RuleListing> {
        let url = self.paths.rules_url(acl_name);
        let response = self
            .transport
            .send(Method::Get, &url, None)
            .await
            .inspect_err(|e| warn!(acl = acl_name, error = %e, "Failed to fetch ACL rules"))?;
        let rules = wire::decode_rule_list(&self.paths, &response.body)
            .inspect_err(|e| warn!(acl = acl_name, error = %e, "Failed to decode ACL rules"))?;

        let generation = self.cache.write().refresh(acl_name, rules.clone()).generation();
        debug!(acl = acl_name, count = rules.len(), generation, "Fetched ACL rules");

        Ok(RuleListing {
            acl_name: acl_name.to_string(),
            rules,
        })
    }

    /// Creates the rule at its sequence number, replacing any rule already there.
    ///
    /// The cache is not refreshed; call [`RuleStore::fetch_rules`] for a
    /// consistent view.
    pub async fn create_or_update_rule(&self, acl_name: &str, rule: &AclRule) -> AclResult<()> {
        self.write_rule(Method::Put, acl_name, rule).await
    }

    /// Creates the rule, failing remotely if its sequence number is taken.
    pub async fn create_rule(&self, acl_name: &str, rule: &AclRule) -> AclResult<()> {
        self.write_rule(Method::Post, acl_name, rule).await
    }

    async fn write_rule(&self, method: Method, acl_name: &str, rule: &AclRule) -> AclResult<()> {
        let sequence = rule.require_sequence()?;
        let body = wire::encode_rule(&self.paths, rule)?;
        let url = self.paths.rule_url(acl_name, sequence);

        self.transport
            .send(method, &url, Some(body))
            .await
            .inspect_err(|e| {
                warn!(acl = acl_name, sequence, %method, error = %e, "Failed to write ACL rule")
            })?;

        self.cache.write().invalidate(acl_name);
        info!(acl = acl_name, sequence, %method, "Wrote ACL rule");
        Ok(())
    }

    /// Deletes the rule at the rule's sequence number.
    ///
    /// Returns the deleted sequence number.
    pub async fn delete_rule(&self, acl_name: &str, rule: &AclRule) -> AclResult<u32> {
        let sequence = rule.require_sequence()?;
        self.delete_sequence(acl_name, sequence).await
    }

    /// Deletes the rule at a sequence number.
    pub async fn delete_sequence(&self, acl_name: &str, sequence: u32) -> AclResult<u32> {
        let url = self.paths.rule_url(acl_name, sequence);

        self.transport
            .send(Method::Delete, &url, None)
            .await
            .inspect_err(|e| {
                warn!(acl = acl_name, sequence, error = %e, "Failed to delete ACL rule")
            })?;

        self.cache.write().invalidate(acl_name);
        info!(acl = acl_name, sequence, "Deleted ACL rule");
        Ok(sequence)
    }

    /// Returns true if the last fetch of the ACL listed `sequence`.
    ///
    /// False when the ACL was never fetched.
    pub fn is_known_sequence(&self, acl_name: &str, sequence: u32) -> bool {
        self.cache.read().is_known_sequence(acl_name, sequence)
    }

    /// Rule at `sequence` in the last fetched list.
    pub fn cached_rule(&self, acl_name: &str, sequence: u32) -> Option<AclRule> {
        self.cache.read().rule(acl_name, sequence).cloned()
    }

    /// Last fetched rule list.
    pub fn cached_rules(&self, acl_name: &str) -> Option<AclRuleList> {
        self.cache.read().get(acl_name).map(|set| set.rules().clone())
    }

    /// Last fetched sequence index.
    pub fn cached_index(&self, acl_name: &str) -> Option<SequenceIndex> {
        self.cache.read().get(acl_name).map(|set| set.index().clone())
    }

    /// Whether a write happened since the last fetch; `None` if never fetched.
    pub fn is_stale(&self, acl_name: &str) -> Option<bool> {
        self.cache.read().get(acl_name).map(|set| set.is_stale())
    }

    /// Marks the cache entry of an ACL stale.
    pub fn invalidate(&self, acl_name: &str) -> bool {
        self.cache.write().invalidate(acl_name)
    }
}
