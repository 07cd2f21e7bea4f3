mod cli;
mod error;
mod inventory_file;
mod output;

use std::sync::Arc;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use linkhound_core::{CoreError, Linkd, LinkStore, MemoryLinkStore, NodeId};
use linkhound_snmp::StaticTransport;

use crate::cli::{Cli, Command, DiscoverArgs, GlobalOpts, ValidateArgs};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(err.exit_code());
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Validate(args) => validate(&cli.global, &args),
        Command::Discover(args) => discover(&cli.global, args).await,
    }
}

// ── validate ─────────────────────────────────────────────────────────

fn validate(global: &GlobalOpts, args: &ValidateArgs) -> Result<(), CliError> {
    let config = linkhound_config::load_file(&global.config)?;
    println!("config ok: {} package(s)", config.packages.len());

    if let Some(ref inventory_path) = args.inventory {
        let inventory = inventory_file::load(inventory_path)?;
        println!("inventory ok: {} node(s)", inventory.len());

        for pkg in &config.packages {
            let resolved = pkg
                .members
                .iter()
                .filter(|m| inventory.get_by_foreign_id(m).is_some())
                .count();
            println!(
                "package {}: {}/{} member(s) in inventory",
                pkg.name,
                resolved,
                pkg.members.len()
            );
        }
    }
    Ok(())
}

// ── discover ─────────────────────────────────────────────────────────

async fn discover(global: &GlobalOpts, args: DiscoverArgs) -> Result<(), CliError> {
    let handle = linkhound_config::reloadable(global.config.clone())?;
    let inventory = Arc::new(inventory_file::load(&args.inventory)?);
    let transport = Arc::new(StaticTransport::from_snapshot_dir(&args.snapshots)?);
    let store = Arc::new(MemoryLinkStore::new());

    let members: Vec<NodeId> = {
        let config = handle.get();
        let policy = config
            .package(&args.package)
            .ok_or_else(|| CoreError::UnknownPackage {
                name: args.package.clone(),
            })?;
        policy
            .members
            .iter()
            .filter_map(|foreign_id| inventory.get_by_foreign_id(foreign_id))
            .map(|node| node.id)
            .collect()
    };

    let linkd = Linkd::new(
        Arc::clone(&inventory),
        Arc::new(handle),
        transport,
        Arc::clone(&store),
    );

    let mut collected = 0usize;
    for node_id in &members {
        if linkd.schedule_node_collection(*node_id)
            && linkd.run_single_snmp_collection(*node_id).await
        {
            collected += 1;
        }
    }
    tracing::info!(collected, members = members.len(), "collection round complete");

    if !linkd.run_single_link_discovery(&args.package).await {
        return Err(CliError::DiscoveryFailed {
            package: args.package,
        });
    }

    let links = store.find_all();
    eprintln!(
        "{} {} link(s) in package {} ({collected}/{} node(s) answered)",
        "discovered".green().bold(),
        links.len(),
        args.package,
        members.len()
    );
    output::print_links(&links, &inventory, global.output)
}
