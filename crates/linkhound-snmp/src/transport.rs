// ── Transport seam ──
//
// One logical session per agent: the scheduler serializes table fetches
// for a node, so implementations only need per-call semantics. Timeouts
// and unreachable hosts are ordinary `SnmpError`s, never panics.

use std::net::IpAddr;

use crate::error::SnmpError;
use crate::table::{MibTable, SnmpTable};

/// Where and how to reach one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpTarget {
    pub addr: IpAddr,
    pub community: String,
    pub timeout_secs: u64,
}

impl SnmpTarget {
    pub fn new(addr: IpAddr, community: impl Into<String>) -> Self {
        Self {
            addr,
            community: community.into(),
            timeout_secs: 5,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Per-node table fetcher.
///
/// The discovery engine treats this as fallible I/O: any error is
/// recovered locally as empty or partial evidence. Implementations must
/// be shareable across the scheduler's worker tasks.
pub trait SnmpTransport: Send + Sync + 'static {
    /// Walk one MIB table on the agent at `target`.
    fn fetch_table(
        &self,
        target: &SnmpTarget,
        table: MibTable,
    ) -> impl Future<Output = Result<SnmpTable, SnmpError>> + Send;
}
