//! # NSGCTL CLI
//!
//! Offline inspection of what the security group controller would do for a
//! cluster document.
//!
//! ## Usage
//!
//! ```bash
//! # Show the security rules each pass would delete and the resulting ledger
//! nsgctl plan -f cluster.yaml
//!
//! # List the security group specs derived from the network
//! nsgctl specs -f cluster.yaml --output json
//! ```
//!
//! The document holds the object's annotations and the declared network:
//!
//! ```yaml
//! metadata:
//!   annotations:
//!     sigs.k8s.io/cluster-api-provider-azure-last-applied-security-rules: '{"node-nsg":{...}}'
//! spec:
//!   clusterName: my-cluster
//!   resourceGroup: my-rg
//!   location: westeurope
//!   networkSpec: { ... }
//! ```

mod plan;
mod specs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use security_group_controller::crd::ClusterNetwork;
use security_group_controller::scope::{ClusterScope, ObjectState};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Security group controller CLI
#[derive(Parser)]
#[command(name = "nsgctl")]
#[command(
    about = "Inspect security group convergence for a cluster document",
    long_about = None,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ", built ", env!("BUILD_DATETIME"), ")"),
    after_help = "\
Examples:
  nsgctl plan -f cluster.yaml
  nsgctl specs -f cluster.yaml --output json
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the drift plan of every security group
    Plan {
        /// Cluster document (YAML or JSON)
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },
    /// List the security group specs derived from the network
    Specs {
        /// Cluster document (YAML or JSON)
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
struct ClusterDocument {
    #[serde(default)]
    metadata: DocumentMetadata,
    spec: ClusterNetwork,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentMetadata {
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

/// Read a cluster document into a scope
fn load_scope(path: &Path) -> Result<ClusterScope> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: ClusterDocument = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse cluster document {}", path.display()))?;

    let state = ObjectState {
        annotations: document.metadata.annotations,
        ..ObjectState::default()
    };
    Ok(ClusterScope::new(document.spec, state))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nsgctl=info,security_group_controller=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan { file } => plan::plan_command(&load_scope(&file)?, cli.output).await,
        Commands::Specs { file } => specs::specs_command(&load_scope(&file)?, cli.output),
    }
}
