use thiserror::Error;

/// Top-level error type for the `linkhound-snmp` crate.
///
/// Every variant is an ordinary, recoverable collection failure --
/// an unreachable agent or a garbled table is routine when walking a
/// production network, never fatal to a discovery run.
#[derive(Debug, Error)]
pub enum SnmpError {
    // ── Transport ───────────────────────────────────────────────────
    /// Agent did not answer at all (host down, filtered, wrong port).
    #[error("agent {target} unreachable")]
    Unreachable { target: String },

    /// Request timed out mid-walk.
    #[error("request to {target} timed out after {timeout_secs}s")]
    Timeout { target: String, timeout_secs: u64 },

    // ── Response ────────────────────────────────────────────────────
    /// Agent answered with something we could not decode.
    #[error("malformed response from {target}: {reason}")]
    MalformedResponse { target: String, reason: String },

    /// Agent does not implement the requested table.
    #[error("agent {target} does not expose {table}")]
    NoSuchTable { target: String, table: String },

    // ── Local ───────────────────────────────────────────────────────
    /// Snapshot file problems and other local I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file did not parse as a table dump.
    #[error("invalid snapshot {path}: {reason}")]
    InvalidSnapshot { path: String, reason: String },
}

impl SnmpError {
    /// Returns `true` for transport-level faults worth retrying.
    ///
    /// A `NoSuchTable` or parse failure is a property of the agent, not
    /// of the network; retrying those is pointless.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}
