// ── Node inventory ──
//
// Read-only view of known devices, keyed by node id with a foreign-id
// secondary index. Owned by the provisioning collaborator; discovery
// only reads it, except that nodes can be withdrawn between cycles
// (which cancels their pending collection jobs).

use std::sync::Arc;

use dashmap::DashMap;

use crate::model::{MacAddr, Node, NodeId};

/// Thread-safe node/interface enumeration.
#[derive(Debug, Default)]
pub struct NodeInventory {
    by_id: DashMap<NodeId, Arc<Node>>,
    foreign_to_id: DashMap<String, NodeId>,
}

impl NodeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from a node list (test and CLI entry point).
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let inv = Self::new();
        for node in nodes {
            inv.insert(node);
        }
        inv
    }

    pub fn insert(&self, node: Node) {
        // Re-inserting a foreign id under a new node id drops the old mapping.
        let old_id = self.foreign_to_id.get(&node.foreign_id).map(|r| *r);
        if let Some(old_id) = old_id {
            if old_id != node.id {
                self.by_id.remove(&old_id);
            }
        }
        self.foreign_to_id.insert(node.foreign_id.clone(), node.id);
        self.by_id.insert(node.id, Arc::new(node));
    }

    /// Withdraw a node. Pending collection for it will be cancelled and
    /// in-flight results discarded.
    pub fn remove(&self, id: NodeId) -> Option<Arc<Node>> {
        let removed = self.by_id.remove(&id).map(|(_, n)| n);
        if let Some(ref node) = removed {
            self.foreign_to_id.remove(&node.foreign_id);
        }
        removed
    }

    pub fn get(&self, id: NodeId) -> Option<Arc<Node>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn get_by_foreign_id(&self, foreign_id: &str) -> Option<Arc<Node>> {
        let id = *self.foreign_to_id.get(foreign_id)?;
        self.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All nodes, ordered by id for deterministic iteration.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        let mut nodes: Vec<Arc<Node>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    /// Resolve a system name (inventory label) to a node.
    pub fn find_by_label(&self, label: &str) -> Option<Arc<Node>> {
        self.nodes().into_iter().find(|n| n.label == label)
    }

    /// Resolve an interface hardware address to its owning node.
    pub fn find_by_phys_addr(&self, mac: MacAddr) -> Option<Arc<Node>> {
        self.nodes()
            .into_iter()
            .find(|n| n.interface_by_phys_addr(mac).is_some())
    }
}
