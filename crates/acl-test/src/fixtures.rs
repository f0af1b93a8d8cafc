//! Rule fixtures
//!
//! Rules built here carry their original sequence number in the
//! description, so a test can tell where a renumbered rule came from.

/// Rule builders
pub mod rule_fixtures {
    use tnsr_acl_common::{AclAction, AclRule, IpVersion};

    /// Description given to fixture rules seeded at `sequence`.
    pub fn origin_description(sequence: u32) -> String {
        format!("rule originally at {}", sequence)
    }

    /// Deny rule at `sequence` tagged with its origin.
    pub fn basic_rule(sequence: u32) -> AclRule {
        let mut rule = AclRule::with_sequence(sequence);
        rule.description = Some(origin_description(sequence));
        rule.action = Some(AclAction::Deny);
        rule
    }

    /// Permit TCP towards `port` from any IPv4 source.
    pub fn permit_tcp(sequence: u32, port: u16) -> AclRule {
        let mut rule = basic_rule(sequence);
        rule.action = Some(AclAction::Permit);
        rule.ip_version = Some(IpVersion::Ipv4);
        rule.protocol = Some("tcp".to_string());
        rule.src_ip_prefix = Some("0.0.0.0/0".to_string());
        rule.dst_first_port = Some(port);
        rule.dst_last_port = Some(port);
        rule
    }

    /// One [`basic_rule`] per sequence number, in the given order.
    pub fn rules_at(sequences: &[u32]) -> Vec<AclRule> {
        sequences.iter().copied().map(basic_rule).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::rule_fixtures::*;

    #[test]
    fn test_rules_at_keeps_order() {
        let rules = rules_at(&[20, 5]);
        assert_eq!(rules[0].sequence, Some(20));
        assert_eq!(rules[1].description.as_deref(), Some("rule originally at 5"));
    }

    #[test]
    fn test_permit_tcp() {
        let rule = permit_tcp(10, 22);
        assert_eq!(rule.field_value("action").as_deref(), Some("permit"));
        assert_eq!(rule.field_value("dst-first-port").as_deref(), Some("22"));
    }
}
