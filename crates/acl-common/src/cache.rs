//! Per-ACL cache of the last fetched rule list and its sequence index.
//!
//! The cache never creates entries implicitly: an ACL appears only after
//! [`RuleSetCache::refresh`] is called with a fetched list, and lookups on
//! an unknown ACL answer "not present" rather than inserting a default.
//!
//! An entry is authoritative only as of the fetch that produced it. Writes
//! mark it stale with [`RuleSetCache::invalidate`]; the data stays readable
//! until the next refresh replaces it.

use std::collections::HashMap;

use crate::rule::{AclRule, AclRuleList};

/// Sequence numbers of one ACL, in the order the remote API listed them.
///
/// Duplicates are kept as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceIndex {
    sequences: Vec<u32>,
}

impl SequenceIndex {
    /// Extracts the index from a rule list.
    pub fn from_rules(rules: &AclRuleList) -> Self {
        Self {
            sequences: rules.sequences(),
        }
    }

    pub fn from_sequences(sequences: Vec<u32>) -> Self {
        Self { sequences }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.sequences
    }

    pub fn contains(&self, sequence: u32) -> bool {
        self.sequences.contains(&sequence)
    }

    /// Position of the first occurrence of `sequence`.
    pub fn position(&self, sequence: u32) -> Option<usize> {
        self.sequences.iter().position(|&s| s == sequence)
    }

    /// Sorted copy of the index.
    pub fn ascending(&self) -> Vec<u32> {
        let mut sorted = self.sequences.clone();
        sorted.sort_unstable();
        sorted
    }

    /// Returns true if any sequence number appears more than once.
    pub fn has_duplicates(&self) -> bool {
        self.ascending().windows(2).any(|w| w[0] == w[1])
    }
}

/// Cached state of one ACL.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: AclRuleList,
    index: SequenceIndex,
    stale: bool,
    generation: u64,
}

impl RuleSet {
    /// The rule list as last fetched.
    pub fn rules(&self) -> &AclRuleList {
        &self.rules
    }

    /// The index derived from [`RuleSet::rules`].
    pub fn index(&self) -> &SequenceIndex {
        &self.index
    }

    /// True once a write has been issued since the fetch.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Monotonic fetch counter, unique per refresh across the cache.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Cache of rule sets keyed by ACL name.
#[derive(Debug, Default)]
pub struct RuleSetCache {
    entries: HashMap<String, RuleSet>,
    generation: u64,
}

impl RuleSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ACLs with a cached rule set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached rule set of an ACL.
    ///
    /// **This never creates entries.**
    pub fn get(&self, acl_name: &str) -> Option<&RuleSet> {
        self.entries.get(acl_name)
    }

    /// Replaces the entry of an ACL with a freshly fetched list.
    pub fn refresh(&mut self, acl_name: &str, rules: AclRuleList) -> &RuleSet {
        self.generation += 1;
        let set = RuleSet {
            index: SequenceIndex::from_rules(&rules),
            rules,
            stale: false,
            generation: self.generation,
        };
        self.entries.insert(acl_name.to_string(), set);
        &self.entries[acl_name]
    }

    /// Marks the entry of an ACL stale.
    ///
    /// Returns false if nothing was cached for it.
    pub fn invalidate(&mut self, acl_name: &str) -> bool {
        match self.entries.get_mut(acl_name) {
            Some(set) => {
                set.stale = true;
                true
            }
            None => false,
        }
    }

    /// Drops the entry of an ACL.
    pub fn remove(&mut self, acl_name: &str) -> Option<RuleSet> {
        self.entries.remove(acl_name)
    }

    /// Membership test against the last fetched index.
    ///
    /// False when the ACL was never fetched.
    pub fn is_known_sequence(&self, acl_name: &str, sequence: u32) -> bool {
        self.get(acl_name)
            .map(|set| set.index.contains(sequence))
            .unwrap_or(false)
    }

    /// Looks up a rule in the last fetched list.
    pub fn rule(&self, acl_name: &str, sequence: u32) -> Option<&AclRule> {
        self.get(acl_name)?.rules.find(sequence)
    }

    /// Names of all cached ACLs.
    pub fn acl_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(sequences: &[u32]) -> AclRuleList {
        sequences.iter().map(|&s| AclRule::with_sequence(s)).collect::<Vec<_>>().into()
    }

    #[test]
    fn test_index_keeps_order_and_duplicates() {
        let index = SequenceIndex::from_rules(&list(&[20, 5, 5, 8]));
        assert_eq!(index.as_slice(), &[20, 5, 5, 8]);
        assert_eq!(index.position(5), Some(1));
        assert_eq!(index.ascending(), vec![5, 5, 8, 20]);
        assert!(index.has_duplicates());
        assert!(!SequenceIndex::from_sequences(vec![1, 2, 3]).has_duplicates());
    }

    #[test]
    fn test_unknown_acl_is_not_created() {
        let cache = RuleSetCache::new();
        assert!(cache.get("missing").is_none());
        assert!(!cache.is_known_sequence("missing", 10));
        assert!(cache.rule("missing", 10).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_refresh_replaces_entry() {
        let mut cache = RuleSetCache::new();
        let first = cache.refresh("test", list(&[10, 20])).generation();
        assert!(cache.is_known_sequence("test", 10));

        let second = cache.refresh("test", list(&[30])).generation();
        assert!(second > first);
        assert!(!cache.is_known_sequence("test", 10));
        assert!(cache.is_known_sequence("test", 30));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = RuleSetCache::new();
        assert!(!cache.invalidate("test"));

        cache.refresh("test", list(&[10]));
        assert!(!cache.get("test").unwrap().is_stale());
        assert!(cache.invalidate("test"));
        assert!(cache.get("test").unwrap().is_stale());
        // stale data remains readable
        assert!(cache.is_known_sequence("test", 10));

        cache.refresh("test", list(&[10]));
        assert!(!cache.get("test").unwrap().is_stale());
    }

    #[test]
    fn test_rule_lookup_and_remove() {
        let mut cache = RuleSetCache::new();
        cache.refresh("a", list(&[1, 2]));
        cache.refresh("b", list(&[3]));
        assert_eq!(cache.rule("a", 2).and_then(|r| r.sequence), Some(2));
        assert!(cache.rule("a", 3).is_none());

        let mut names: Vec<_> = cache.acl_names().collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);

        assert!(cache.remove("a").is_some());
        assert!(cache.get("a").is_none());
    }
}
