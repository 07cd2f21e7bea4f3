// ── Core error types ──
//
// Caller-facing errors from linkhound-core. Transport faults never show
// up here: the scheduler and collectors absorb them as empty or stale
// evidence. What remains is configuration, inventory, and persistence.

use thiserror::Error;

use crate::model::NodeId;
use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("unknown package: {name}")]
    UnknownPackage { name: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    // ── Inventory errors ─────────────────────────────────────────────
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not a member of any configured package")]
    NodeNotInPackage(NodeId),

    // ── Collection errors ────────────────────────────────────────────
    #[error("collection failed for node {node_id} after {attempts} attempts")]
    CollectionFailed { node_id: NodeId, attempts: u32 },

    // ── Persistence errors ───────────────────────────────────────────
    #[error(transparent)]
    Store(#[from] StoreError),
}
