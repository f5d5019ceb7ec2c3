//! # Network Spec
//!
//! Declared network topology of a cluster: the virtual network, its subnets and
//! the security group (with its security rules) attached to each subnet.

use crate::constants::{CLUSTER_TAG_PREFIX, RESOURCE_LIFECYCLE_OWNED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired-state source for one cluster
///
/// # Example
///
/// ```yaml
/// clusterName: my-cluster
/// resourceGroup: my-cluster-rg
/// location: westeurope
/// networkSpec:
///   vnet:
///     name: my-cluster-vnet
///     tags:
///       sigs.k8s.io_cluster-api-provider-azure_cluster_my-cluster: owned
///   subnets:
///     - name: control-plane-subnet
///       role: control-plane
///       securityGroup:
///         name: control-plane-nsg
///         securityRules:
///           - name: allow_apiserver
///             protocol: Tcp
///             direction: Inbound
///             priority: 2201
///             sourcePorts: "*"
///             destinationPorts: "6443"
///             source: "*"
///             destination: "*"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetwork {
    pub cluster_name: String,
    pub resource_group: String,
    pub location: String,
    #[serde(default)]
    pub additional_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub network_spec: NetworkSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(default)]
    pub vnet: VnetSpec,
    #[serde(default)]
    pub subnets: Vec<SubnetSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VnetSpec {
    /// Resource group of the virtual network, defaults to the cluster resource group
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Tags observed on the virtual network
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl VnetSpec {
    /// A virtual network is managed when it carries the cluster's ownership tag
    /// with the `owned` lifecycle. Anything else is a bring-your-own network.
    #[must_use]
    pub fn is_managed(&self, cluster_name: &str) -> bool {
        self.tags
            .get(&format!("{CLUSTER_TAG_PREFIX}{cluster_name}"))
            .is_some_and(|lifecycle| lifecycle == RESOURCE_LIFECYCLE_OWNED)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub security_group: SecurityGroupSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub security_rules: Vec<SecurityRule>,
}

/// Declared security rule
///
/// Serialized as-is into the last-applied ledger, so field names are part of
/// the persisted format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub protocol: SecurityGroupProtocol,
    pub direction: SecurityRuleDirection,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default)]
    pub action: SecurityRuleAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SecurityGroupProtocol {
    #[serde(rename = "*")]
    All,
    Tcp,
    Udp,
    Icmp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SecurityRuleDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SecurityRuleAction {
    #[default]
    Allow,
    Deny,
}
