//! fc-inspect: read-only funds-cycle inspector
//!
//! Derives addresses and prints composed views as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use fc_ledger_sync::{
    Address, AddressDeriver, Cluster, CycleQueryApi, JsonRpcGateway, QueryOrchestrator,
    SyncConfig,
};
use fc_telemetry::{init_telemetry, TelemetryConfig};

/// Read-only funds-cycle inspector
#[derive(Parser, Debug)]
#[command(name = "fc-inspect")]
#[command(about = "Inspect funds-cycle accounts on a ledger cluster")]
struct Args {
    /// Cluster whose public endpoint to use
    #[arg(short, long)]
    cluster: Option<Cluster>,

    /// JSON-RPC endpoint URL (overrides --cluster)
    #[arg(short = 'u', long)]
    rpc_url: Option<String>,

    /// Funds-cycle program address
    #[arg(short, long)]
    program_id: Option<Address>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive config, vault and (optionally) beneficiary addresses; no network
    Addresses {
        /// Cycle administrator
        admin: Address,
        /// Beneficiary wallet
        #[arg(short, long)]
        wallet: Option<Address>,
    },
    /// Config, vault and vault balance of the cycle an identity administers
    Admin {
        /// Administrator identity
        identity: Address,
    },
    /// Beneficiary record of a wallet plus its cycle
    Beneficiary {
        /// Beneficiary wallet
        wallet: Address,
    },
    /// Every beneficiary of a cycle
    List {
        /// Administrator of the cycle
        admin: Address,
    },
    /// Role of an identity
    Role {
        /// Identity to resolve
        identity: Address,
    },
}

fn sync_config(args: &Args) -> SyncConfig {
    let mut config = SyncConfig::from_env();
    if let Some(cluster) = args.cluster {
        config.cluster = cluster;
        config.rpc_url.clear();
    }
    if let Some(url) = &args.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(program_id) = args.program_id {
        config.program_id = program_id;
    }
    config
}

fn print(value: serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(&value).context("rendering output")?;
    println!("{text}");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = init_telemetry(TelemetryConfig::for_service("fc-inspect"))
        .context("initializing telemetry")?;

    let config = sync_config(&args);
    let deriver = AddressDeriver::new(config.program_id);

    if let Command::Addresses { admin, wallet } = &args.command {
        let (config_address, config_bump) = deriver.config_address(admin)?;
        let (vault_address, vault_bump) = deriver.vault_address(&config_address)?;
        let beneficiary = match wallet {
            Some(wallet) => {
                let (address, bump) = deriver.beneficiary_address(&config_address, wallet)?;
                json!({ "address": address, "bump": bump })
            }
            None => serde_json::Value::Null,
        };
        return print(json!({
            "program_id": config.program_id,
            "config": { "address": config_address, "bump": config_bump },
            "vault": { "address": vault_address, "bump": vault_bump },
            "beneficiary": beneficiary,
        }));
    }

    let endpoint = config.endpoint().to_string();
    let gateway = Arc::new(JsonRpcGateway::new(&config));
    let queries = QueryOrchestrator::new(config, gateway);

    match &args.command {
        Command::Addresses { .. } => Ok(()),
        Command::Admin { identity } => {
            let view = queries
                .administrator_view(identity)
                .await
                .with_context(|| format!("loading administrator view from {endpoint}"))?;
            print(json!({
                "view": view,
                "vault_balance_sol": view.vault_balance_sol(),
            }))
        }
        Command::Beneficiary { wallet } => {
            let view = queries
                .beneficiary_view(wallet)
                .await
                .with_context(|| format!("loading beneficiary view from {endpoint}"))?;
            print(json!({
                "view": view,
                "due_ts": view.beneficiary.payment_due_ts(&view.cycle.config),
            }))
        }
        Command::List { admin } => {
            let (config_address, _) = deriver.config_address(admin)?;
            let entries = queries
                .beneficiary_list(&config_address)
                .await
                .with_context(|| format!("scanning beneficiaries on {endpoint}"))?;
            print(json!({ "config": config_address, "beneficiaries": entries }))
        }
        Command::Role { identity } => {
            let role = queries.resolve_role(identity).await;
            print(json!({ "identity": identity, "role": role }))
        }
    }
}
