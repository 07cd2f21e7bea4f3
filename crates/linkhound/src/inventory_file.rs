//! TOML inventory loading.
//!
//! The inventory collaborator is out of scope for the engine itself, so
//! the CLI feeds it from a flat file:
//!
//!     [[nodes]]
//!     id = 1
//!     foreign_id = "penrose"
//!     label = "penrose-mx480"
//!     sys_object_id = ".1.3.6.1.4.1.2636.1.1.1.2.25"
//!     management_addr = "10.155.69.101"
//!
//!     [[nodes.interfaces]]
//!     if_index = 584
//!     if_descr = "ge-1/2/1"
//!     if_type = 6

use std::net::IpAddr;
use std::path::Path;

use serde::Deserialize;

use linkhound_core::{Node, NodeInterface, NodeInventory};

use crate::error::CliError;

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    nodes: Vec<NodeSpec>,
}

#[derive(Debug, Deserialize)]
struct NodeSpec {
    id: i32,
    foreign_id: String,
    label: String,
    sys_object_id: String,
    management_addr: IpAddr,
    #[serde(default)]
    interfaces: Vec<NodeInterface>,
}

/// Load a `NodeInventory` from a TOML file.
pub fn load(path: &Path) -> Result<NodeInventory, CliError> {
    let text = std::fs::read_to_string(path)?;
    let file: InventoryFile = toml::from_str(&text).map_err(|e| CliError::Inventory {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;

    let inventory = NodeInventory::new();
    for spec in file.nodes {
        let mut node = Node::new(
            spec.id,
            spec.foreign_id,
            spec.label,
            spec.sys_object_id,
            spec.management_addr,
        );
        for iface in spec.interfaces {
            node = node.with_interface(iface);
        }
        inventory.insert(node);
    }
    Ok(inventory)
}
