// ── Bridge / spanning-tree collector ──
//
// Walks the BRIDGE-MIB groups: base bridge identity, the bridge-port to
// ifIndex mapping, the STP designated triples, and the learned
// forwarding table. Agents render designated bridge ids as 8 octets
// (2-byte priority + MAC); the priority is stripped here so inference
// compares plain hardware addresses.

use tracing::debug;

use linkhound_snmp::{MibTable, SnmpError, SnmpTarget, SnmpTransport, SnmpValue};

use super::optional_table;
use crate::model::{BridgeEvidence, FdbEntry, MacAddr, Node, StpPortEntry};

const DOT1D_BASE_BRIDGE_ADDRESS: &str = "dot1dBaseBridgeAddress";
const DOT1D_BASE_PORT: &str = "dot1dBasePort";
const DOT1D_BASE_PORT_IF_INDEX: &str = "dot1dBasePortIfIndex";
const DOT1D_STP_PORT: &str = "dot1dStpPort";
const DOT1D_STP_PORT_DESIGNATED_BRIDGE: &str = "dot1dStpPortDesignatedBridge";
const DOT1D_STP_PORT_DESIGNATED_PORT: &str = "dot1dStpPortDesignatedPort";
const DOT1D_TP_FDB_ADDRESS: &str = "dot1dTpFdbAddress";
const DOT1D_TP_FDB_PORT: &str = "dot1dTpFdbPort";
const DOT1D_TP_FDB_STATUS: &str = "dot1dTpFdbStatus";

/// dot1dTpFdbStatus value for dynamically learned entries.
const FDB_STATUS_LEARNED: i64 = 3;

/// Walk the bridge MIB groups for one node.
pub async fn collect<T: SnmpTransport>(
    node: &Node,
    target: &SnmpTarget,
    transport: &T,
) -> Result<BridgeEvidence, SnmpError> {
    let base = optional_table(transport.fetch_table(target, MibTable::Dot1dBase).await)?;
    let base_ports = optional_table(
        transport
            .fetch_table(target, MibTable::Dot1dBasePort)
            .await,
    )?;
    let stp = optional_table(
        transport
            .fetch_table(target, MibTable::Dot1dStpPort)
            .await,
    )?;
    let fdb = optional_table(transport.fetch_table(target, MibTable::Dot1dTpFdb).await)?;

    let mut evidence = BridgeEvidence {
        base_bridge_address: base
            .first()
            .and_then(|row| row.get_text(DOT1D_BASE_BRIDGE_ADDRESS))
            .and_then(|s| parse_bridge_address(s)),
        ..BridgeEvidence::default()
    };

    for row in &base_ports.rows {
        let (Some(port), Some(if_index)) = (
            row.get(DOT1D_BASE_PORT).and_then(SnmpValue::as_port_id),
            row.get_u32(DOT1D_BASE_PORT_IF_INDEX),
        ) else {
            debug!(node_id = %node.id, "skipping incomplete dot1dBasePortTable row");
            continue;
        };
        evidence.port_ifindex.insert(port, if_index);
    }

    for row in &stp.rows {
        let (Some(bridge_port), Some(designated_bridge), Some(designated_port)) = (
            row.get(DOT1D_STP_PORT).and_then(SnmpValue::as_port_id),
            row.get_text(DOT1D_STP_PORT_DESIGNATED_BRIDGE)
                .and_then(parse_bridge_address),
            row.get(DOT1D_STP_PORT_DESIGNATED_PORT)
                .and_then(SnmpValue::as_port_id),
        ) else {
            debug!(node_id = %node.id, "skipping incomplete dot1dStpPortTable row");
            continue;
        };
        evidence.stp_ports.push(StpPortEntry {
            bridge_port,
            designated_bridge,
            designated_port,
        });
    }

    for row in &fdb.rows {
        // Only dynamically learned entries say anything about wiring.
        let learned = row
            .get(DOT1D_TP_FDB_STATUS)
            .and_then(SnmpValue::as_i64)
            .is_none_or(|s| s == FDB_STATUS_LEARNED);
        if !learned {
            continue;
        }
        let (Some(mac), Some(bridge_port)) = (
            row.get_text(DOT1D_TP_FDB_ADDRESS)
                .and_then(|s| s.parse().ok()),
            row.get(DOT1D_TP_FDB_PORT).and_then(SnmpValue::as_port_id),
        ) else {
            debug!(node_id = %node.id, "skipping incomplete dot1dTpFdbTable row");
            continue;
        };
        evidence.forwarding.push(FdbEntry { mac, bridge_port });
    }

    debug!(
        node_id = %node.id,
        base = ?evidence.base_bridge_address,
        stp_ports = evidence.stp_ports.len(),
        fdb_entries = evidence.forwarding.len(),
        "bridge collection complete"
    );
    Ok(evidence)
}

/// Parse a bridge address cell, stripping the 2-octet STP priority
/// prefix when present (16 hex digits instead of 12).
fn parse_bridge_address(raw: &str) -> Option<MacAddr> {
    let hex: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.' | ' '))
        .collect();
    let mac_part = if hex.len() == 16 { &hex[4..] } else { hex.as_str() };
    mac_part.parse().ok()
}
