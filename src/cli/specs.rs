//! `nsgctl specs`

use crate::OutputFormat;
use anyhow::Result;
use security_group_controller::convergence::ResourceSpec;
use security_group_controller::crd::SecurityRule;
use security_group_controller::scope::ClusterScope;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpecView<'a> {
    name: &'a str,
    resource_group: &'a str,
    location: &'a str,
    tags: BTreeMap<String, String>,
    security_rules: Vec<&'a SecurityRule>,
}

pub fn specs_command(scope: &ClusterScope, output: OutputFormat) -> Result<()> {
    let specs = scope.nsg_specs();
    let views: Vec<SpecView<'_>> = specs
        .iter()
        .map(|spec| SpecView {
            name: spec.resource_name(),
            resource_group: spec.resource_group_name(),
            location: &spec.location,
            tags: security_group_controller::services::securitygroups::build_tags(
                &spec.cluster_name,
                &spec.name,
                &spec.additional_tags,
            ),
            security_rules: spec.security_rules.iter().map(|rule| &rule.payload).collect(),
        })
        .collect();

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&views)?),
        OutputFormat::Text => {
            if views.is_empty() {
                println!("No security groups declared");
            }
            for view in &views {
                println!("{}/{} ({})", view.resource_group, view.name, view.location);
                for rule in &view.security_rules {
                    println!(
                        "  {:<24} {:>5} {:?} {:?} {:?} dst ports {}",
                        rule.name,
                        rule.priority,
                        rule.direction,
                        rule.action,
                        rule.protocol,
                        rule.destination_ports.as_deref().unwrap_or("*")
                    );
                }
            }
        }
    }
    Ok(())
}
