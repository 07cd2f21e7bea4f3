// ── Protocol collectors ──
//
// One collection cycle turns a node's raw MIB tables into typed
// evidence. Protocols run sequentially within a node (one line-rate
// session) and are toggled per package policy. A protocol that fails
// to parse contributes empty evidence; only transport-level failure of
// every enabled protocol fails the cycle.

pub mod bridge;
pub mod cdp;
pub mod iproute;
pub mod lldp;

use chrono::Utc;
use tracing::debug;

use linkhound_snmp::{SnmpError, SnmpTarget, SnmpTransport};

use crate::config::PackagePolicy;
use crate::model::{Node, NodeEvidence};

/// Result of one collection cycle for one node.
#[derive(Debug)]
pub struct CycleOutcome {
    pub evidence: NodeEvidence,
    pub attempted: u32,
    pub transport_failures: u32,
}

impl CycleOutcome {
    /// The cycle failed when every enabled protocol died on transport.
    /// Parse trouble and absent MIBs are not failures -- they are facts
    /// about the agent.
    pub fn failed(&self) -> bool {
        self.attempted > 0 && self.transport_failures == self.attempted
    }
}

/// Run the enabled protocols against one node, in order.
pub async fn run_collection_cycle<T: SnmpTransport>(
    node: &Node,
    policy: &PackagePolicy,
    target: &SnmpTarget,
    transport: &T,
) -> CycleOutcome {
    let mut evidence = NodeEvidence::default();
    let mut attempted = 0u32;
    let mut transport_failures = 0u32;

    if policy.use_bridge_discovery {
        attempted += 1;
        match bridge::collect(node, target, transport).await {
            Ok(ev) => evidence.bridge = Some(ev),
            Err(e) => transport_failures += note_failure(node, "bridge", &e),
        }
    }

    if policy.use_cdp_discovery {
        attempted += 1;
        match cdp::collect(node, target, transport).await {
            Ok(ev) => evidence.cdp = Some(ev),
            Err(e) => transport_failures += note_failure(node, "cdp", &e),
        }
    }

    if policy.use_lldp_discovery {
        attempted += 1;
        match lldp::collect(node, target, transport).await {
            Ok(ev) => evidence.lldp = Some(ev),
            Err(e) => transport_failures += note_failure(node, "lldp", &e),
        }
    }

    if policy.use_ip_route_discovery {
        // Ethernet-only nodes are skipped: next-hop inference on
        // broadcast media needs the explicit package override.
        if node.is_ethernet_only() && !policy.force_ip_route_discovery_on_ethernet {
            debug!(node_id = %node.id, "skipping ip-route collection on Ethernet-only node");
        } else {
            attempted += 1;
            let table = policy.route_table_for(&node.sys_object_id);
            match iproute::collect(node, target, transport, table).await {
                Ok(ev) => evidence.ip_route = Some(ev),
                Err(e) => transport_failures += note_failure(node, "iproute", &e),
            }
        }
    }

    evidence.collected_at = Some(Utc::now());

    CycleOutcome {
        evidence,
        attempted,
        transport_failures,
    }
}

/// Log one protocol failure; returns 1 for transport faults so callers
/// can tally them, 0 for agent-side facts (absent MIB, garbage rows).
fn note_failure(node: &Node, protocol: &str, err: &SnmpError) -> u32 {
    if err.is_transient() {
        debug!(node_id = %node.id, protocol, error = %err, "collection transport failure");
        1
    } else {
        debug!(node_id = %node.id, protocol, error = %err, "protocol yields no evidence");
        0
    }
}

/// Map `NoSuchTable` to an empty table so optional MIBs degrade to
/// empty evidence; everything else propagates.
pub(crate) fn optional_table(
    result: Result<linkhound_snmp::SnmpTable, SnmpError>,
) -> Result<linkhound_snmp::SnmpTable, SnmpError> {
    match result {
        Err(SnmpError::NoSuchTable { .. }) => Ok(linkhound_snmp::SnmpTable::default()),
        other => other,
    }
}
