//! Link rendering: table for humans, JSON for scripts.

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use linkhound_core::{DataLinkInterface, DiscoveryMethod, Endpoint, NodeInventory};

use crate::cli::OutputFormat;
use crate::error::CliError;

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "ID")]
    id: i32,
    #[tabled(rename = "ENDPOINT A")]
    a: String,
    #[tabled(rename = "ENDPOINT B")]
    b: String,
    #[tabled(rename = "METHOD")]
    method: String,
    #[tabled(rename = "PACKAGE")]
    package: String,
}

/// `label:ifIndex`, falling back to the raw node id for nodes that have
/// left the inventory since discovery.
fn endpoint_label(inventory: &NodeInventory, ep: Endpoint) -> String {
    inventory
        .get(ep.node_id)
        .map_or_else(
            || format!("node-{}:{}", ep.node_id, ep.if_index),
            |node| format!("{}:{}", node.label, ep.if_index),
        )
}

fn colored_method(method: DiscoveryMethod) -> String {
    match method {
        DiscoveryMethod::Lldp => method.to_string().green().to_string(),
        DiscoveryMethod::Cdp => method.to_string().cyan().to_string(),
        DiscoveryMethod::Bridge => method.to_string().yellow().to_string(),
        DiscoveryMethod::IpRoute => method.to_string().magenta().to_string(),
    }
}

/// Print discovered links in the requested format.
pub fn print_links(
    links: &[DataLinkInterface],
    inventory: &NodeInventory,
    format: OutputFormat,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(links)
                .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
            println!("{json}");
        }
        OutputFormat::Table => {
            if links.is_empty() {
                println!("no links discovered");
                return Ok(());
            }
            let rows: Vec<LinkRow> = links
                .iter()
                .map(|link| LinkRow {
                    id: link.id,
                    a: endpoint_label(inventory, link.pair.a()),
                    b: endpoint_label(inventory, link.pair.b()),
                    method: colored_method(link.method),
                    package: link.package.clone(),
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::sharp());
            println!("{table}");
        }
    }
    Ok(())
}
