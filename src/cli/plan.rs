//! `nsgctl plan`

use crate::OutputFormat;
use anyhow::Result;
use security_group_controller::constants::SECURITY_RULE_LAST_APPLIED_ANNOTATION;
use security_group_controller::convergence::{DriftLedger, DriftPlan, ResourceSpec};
use security_group_controller::scope::ClusterScope;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanReport {
    cluster_name: String,
    managed: bool,
    security_groups: Vec<SecurityGroupPlan>,
    /// Ledger annotation value once every security group has been processed,
    /// null when the network is not managed
    ledger_after: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SecurityGroupPlan {
    name: String,
    resource_group: String,
    added: Vec<String>,
    changed: Vec<String>,
    unchanged: Vec<String>,
    /// Security rules the pass deletes from the security group
    removed: Vec<String>,
}

pub async fn plan_command(scope: &ClusterScope, output: OutputFormat) -> Result<()> {
    let report = build_report(scope).await?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

async fn build_report(scope: &ClusterScope) -> Result<PlanReport> {
    let managed = scope.is_vnet_managed();
    let mut security_groups = Vec::new();
    let mut ledger_after = Value::Null;
    // An unmanaged network is skipped without reading the ledger, as a pass would.
    if managed {
        let ledger = DriftLedger::new(scope, SECURITY_RULE_LAST_APPLIED_ANNOTATION);
        let mut last_applied = ledger.load().await?;
        // Same order as a pass: each security group sees the ledger as left by the previous one.
        for spec in scope.nsg_specs() {
            let plan = DriftPlan::compute(&spec, &last_applied)?;
            plan.apply(spec.resource_name(), &mut last_applied);
            security_groups.push(SecurityGroupPlan {
                name: spec.resource_name().to_string(),
                resource_group: spec.resource_group_name().to_string(),
                added: plan.added,
                changed: plan.changed,
                unchanged: plan.unchanged,
                removed: plan.removed,
            });
        }
        ledger_after = Value::Object(last_applied.into_json());
    }

    Ok(PlanReport {
        cluster_name: scope.cluster_name().to_string(),
        managed,
        security_groups,
        ledger_after,
    })
}

fn print_text(report: &PlanReport) {
    println!("Cluster: {}", report.cluster_name);
    if !report.managed {
        println!("Virtual network is not managed, security groups are skipped");
        return;
    }
    if report.security_groups.is_empty() {
        println!("No security groups declared");
        return;
    }

    for group in &report.security_groups {
        println!();
        println!("Security group {}/{}", group.resource_group, group.name);
        print_list("  add", &group.added);
        print_list("  change", &group.changed);
        print_list("  keep", &group.unchanged);
        print_list("  delete", &group.removed);
    }
}

fn print_list(label: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }
    println!("{label:<10} {}", names.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use security_group_controller::constants::CLUSTER_TAG_PREFIX;
    use security_group_controller::crd::{
        ClusterNetwork, SecurityGroupProtocol, SecurityGroupSpec, SecurityRule,
        SecurityRuleAction, SecurityRuleDirection, SubnetSpec,
    };
    use security_group_controller::scope::ObjectState;

    fn rule(name: &str) -> SecurityRule {
        SecurityRule {
            name: name.to_string(),
            description: String::new(),
            protocol: SecurityGroupProtocol::Tcp,
            direction: SecurityRuleDirection::Inbound,
            priority: 100,
            source_ports: Some("*".to_string()),
            destination_ports: Some("22".to_string()),
            source: Some("*".to_string()),
            destination: Some("*".to_string()),
            action: SecurityRuleAction::Allow,
        }
    }

    fn scope(owned: bool, ledger: &str) -> ClusterScope {
        let mut network = ClusterNetwork {
            cluster_name: "my-cluster".to_string(),
            resource_group: "my-rg".to_string(),
            ..ClusterNetwork::default()
        };
        if owned {
            network
                .network_spec
                .vnet
                .tags
                .insert(format!("{CLUSTER_TAG_PREFIX}my-cluster"), "owned".to_string());
        }
        network.network_spec.subnets.push(SubnetSpec {
            name: "node-subnet".to_string(),
            role: None,
            security_group: SecurityGroupSpec {
                name: "node-nsg".to_string(),
                security_rules: vec![rule("allow_ssh")],
            },
        });

        let mut state = ObjectState::default();
        state.annotations.insert(
            SECURITY_RULE_LAST_APPLIED_ANNOTATION.to_string(),
            ledger.to_string(),
        );
        ClusterScope::new(network, state)
    }

    #[tokio::test]
    async fn test_unmanaged_network_ignores_corrupt_ledger() {
        let report = build_report(&scope(false, "not json")).await.unwrap();

        assert!(!report.managed);
        assert!(report.security_groups.is_empty());
        assert_eq!(report.ledger_after, Value::Null);
    }

    #[tokio::test]
    async fn test_managed_network_reports_corrupt_ledger() {
        let err = build_report(&scope(true, "not json")).await.unwrap_err();
        assert!(err.to_string().contains("failed to decode annotation"));
    }

    #[tokio::test]
    async fn test_plan_lists_undeclared_rules() {
        let ledger = serde_json::json!({
            "node-nsg": {
                "allow_ssh": serde_json::to_value(rule("allow_ssh")).unwrap(),
                "old_rule": serde_json::to_value(rule("old_rule")).unwrap(),
            }
        });

        let report = build_report(&scope(true, &ledger.to_string())).await.unwrap();

        assert_eq!(report.security_groups[0].removed, vec!["old_rule".to_string()]);
        assert_eq!(report.security_groups[0].unchanged, vec!["allow_ssh".to_string()]);
        assert!(report.ledger_after["node-nsg"].get("old_rule").is_none());
    }
}
