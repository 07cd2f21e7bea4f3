//! Clap derive structures for the `linkhound` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-level CLI ────────────────────────────────────────────────────

/// linkhound -- SNMP link discovery from the command line
#[derive(Debug, Parser)]
#[command(
    name = "linkhound",
    version,
    about = "Discover physical and logical links between SNMP-managed devices",
    long_about = "Runs per-node SNMP collection (bridge/STP, CDP, LLDP, IP-route)\n\
        against recorded walk snapshots and fuses the evidence into a\n\
        deduplicated set of topology links.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Discovery configuration file
    #[arg(
        long,
        short = 'c',
        env = "LINKHOUND_CONFIG",
        default_value = "linkhound.toml",
        global = true
    )]
    pub config: PathBuf,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect from every package member and infer links
    #[command(alias = "d")]
    Discover(DiscoverArgs),

    /// Check configuration and inventory files without collecting
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Package to discover
    #[arg(long, short = 'p')]
    pub package: String,

    /// Node inventory file
    #[arg(long, short = 'i')]
    pub inventory: PathBuf,

    /// Directory of per-agent SNMP walk snapshots (<address>.toml)
    #[arg(long, short = 's')]
    pub snapshots: PathBuf,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Node inventory file to cross-check against package membership
    #[arg(long, short = 'i')]
    pub inventory: Option<PathBuf>,
}
