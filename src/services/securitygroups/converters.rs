//! Conversions from declared types to the provider representation.

use crate::constants::{CLUSTER_TAG_PREFIX, NAME_TAG, RESOURCE_LIFECYCLE_OWNED};
use crate::crd::{SecurityGroupProtocol, SecurityRule, SecurityRuleAction, SecurityRuleDirection};
use crate::services::securitygroups::model::{
    NetworkSecurityRule, RuleAccess, RuleDirection, RuleProtocol,
};
use std::collections::BTreeMap;

#[must_use]
pub fn security_rule_to_sdk(rule: &SecurityRule) -> NetworkSecurityRule {
    NetworkSecurityRule {
        name: Some(rule.name.clone()),
        description: Some(rule.description.clone()),
        protocol: Some(match rule.protocol {
            SecurityGroupProtocol::All => RuleProtocol::Asterisk,
            SecurityGroupProtocol::Tcp => RuleProtocol::Tcp,
            SecurityGroupProtocol::Udp => RuleProtocol::Udp,
            SecurityGroupProtocol::Icmp => RuleProtocol::Icmp,
        }),
        source_port_range: rule.source_ports.clone(),
        destination_port_range: rule.destination_ports.clone(),
        source_address_prefix: rule.source.clone(),
        destination_address_prefix: rule.destination.clone(),
        access: Some(match rule.action {
            SecurityRuleAction::Allow => RuleAccess::Allow,
            SecurityRuleAction::Deny => RuleAccess::Deny,
        }),
        priority: Some(rule.priority),
        direction: Some(match rule.direction {
            SecurityRuleDirection::Inbound => RuleDirection::Inbound,
            SecurityRuleDirection::Outbound => RuleDirection::Outbound,
        }),
    }
}

/// Tags of a resource owned by `cluster_name`.
///
/// Additional tags never override the ownership or name tags.
#[must_use]
pub fn build_tags(
    cluster_name: &str,
    name: &str,
    additional: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut tags = additional.clone();
    tags.insert(
        format!("{CLUSTER_TAG_PREFIX}{cluster_name}"),
        RESOURCE_LIFECYCLE_OWNED.to_string(),
    );
    tags.insert(NAME_TAG.to_string(), name.to_string());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_rule_to_sdk() {
        let rule = SecurityRule {
            name: "allow_dns".to_string(),
            description: "Allow DNS".to_string(),
            protocol: SecurityGroupProtocol::Udp,
            direction: SecurityRuleDirection::Outbound,
            priority: 300,
            source_ports: Some("*".to_string()),
            destination_ports: Some("53".to_string()),
            source: Some("10.0.0.0/16".to_string()),
            destination: None,
            action: SecurityRuleAction::Deny,
        };

        let sdk = security_rule_to_sdk(&rule);
        assert_eq!(sdk.name.as_deref(), Some("allow_dns"));
        assert_eq!(sdk.protocol, Some(RuleProtocol::Udp));
        assert_eq!(sdk.direction, Some(RuleDirection::Outbound));
        assert_eq!(sdk.access, Some(RuleAccess::Deny));
        assert_eq!(sdk.destination_port_range.as_deref(), Some("53"));
        assert_eq!(sdk.destination_address_prefix, None);
        assert_eq!(sdk.priority, Some(300));
    }

    #[test]
    fn test_build_tags_keeps_ownership() {
        let mut additional = BTreeMap::new();
        additional.insert("team".to_string(), "net".to_string());
        additional.insert(NAME_TAG.to_string(), "spoofed".to_string());

        let tags = build_tags("my-cluster", "node-nsg", &additional);
        assert_eq!(tags.get("team").map(String::as_str), Some("net"));
        assert_eq!(tags.get(NAME_TAG).map(String::as_str), Some("node-nsg"));
        assert_eq!(
            tags.get("sigs.k8s.io_cluster-api-provider-azure_cluster_my-cluster")
                .map(String::as_str),
            Some("owned")
        );
    }
}
