// ── Per-protocol evidence ──
//
// What one collection cycle learned about one node, before any
// cross-node correlation. Evidence is immutable once produced and is
// superseded wholesale by the next successful cycle; it never reaches
// the topology store.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use super::node::MacAddr;

// ── Bridge / spanning tree ──────────────────────────────────────────

/// One dot1dStpPortTable row worth keeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StpPortEntry {
    /// dot1dStpPort -- the bridge port number.
    pub bridge_port: u16,
    /// Designated bridge address with the priority octets stripped.
    pub designated_bridge: MacAddr,
    /// Raw designated port identifier; low 12 bits are the port number.
    pub designated_port: u16,
}

impl StpPortEntry {
    /// Designated port number without the priority nibble.
    pub fn designated_port_num(&self) -> u16 {
        self.designated_port & 0x0fff
    }
}

/// One learned forwarding-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdbEntry {
    pub mac: MacAddr,
    pub bridge_port: u16,
}

/// Bridge-MIB evidence: who this bridge is, what its ports point at,
/// and which addresses it has learned where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeEvidence {
    pub base_bridge_address: Option<MacAddr>,
    /// Bridge port number -> ifIndex (dot1dBasePortTable).
    pub port_ifindex: BTreeMap<u16, u32>,
    pub stp_ports: Vec<StpPortEntry>,
    pub forwarding: Vec<FdbEntry>,
}

impl BridgeEvidence {
    pub fn ifindex_for_port(&self, bridge_port: u16) -> Option<u32> {
        self.port_ifindex.get(&bridge_port).copied()
    }
}

// ── LLDP ────────────────────────────────────────────────────────────

/// One lldpRemTable neighbor claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LldpNeighbor {
    pub local_if_index: u32,
    pub remote_chassis_id: String,
    pub remote_port_id: String,
    pub remote_sysname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LldpEvidence {
    pub local_chassis_id: Option<MacAddr>,
    pub local_sysname: Option<String>,
    pub neighbors: Vec<LldpNeighbor>,
}

// ── CDP ─────────────────────────────────────────────────────────────

/// One cdpCacheTable neighbor claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdpNeighbor {
    pub local_if_index: u32,
    pub remote_device_id: String,
    pub remote_port_id: String,
    pub remote_address: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdpEvidence {
    pub neighbors: Vec<CdpNeighbor>,
}

// ── IP route ────────────────────────────────────────────────────────

/// One usable route-table row: a next hop reachable out a known interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRouteEntry {
    pub dest: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub if_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpRouteEvidence {
    pub routes: Vec<IpRouteEntry>,
}

// ── Bundle ──────────────────────────────────────────────────────────

/// Everything one cycle collected for one node.
///
/// `None` means the protocol was disabled or produced nothing parsable;
/// inference treats both the same way.
#[derive(Debug, Clone, Default)]
pub struct NodeEvidence {
    pub bridge: Option<BridgeEvidence>,
    pub lldp: Option<LldpEvidence>,
    pub cdp: Option<CdpEvidence>,
    pub ip_route: Option<IpRouteEvidence>,
    pub collected_at: Option<DateTime<Utc>>,
}

impl NodeEvidence {
    pub fn is_empty(&self) -> bool {
        self.bridge.is_none() && self.lldp.is_none() && self.cdp.is_none() && self.ip_route.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn designated_port_strips_priority() {
        let entry = StpPortEntry {
            bridge_port: 483,
            designated_bridge: MacAddr::new([0, 0x22, 0x83, 0x09, 0x57, 0xd0]),
            designated_port: 0x81e3,
        };
        assert_eq!(entry.designated_port_num(), 483);
    }

    #[test]
    fn empty_bundle() {
        assert!(NodeEvidence::default().is_empty());
        let with_lldp = NodeEvidence {
            lldp: Some(LldpEvidence::default()),
            ..NodeEvidence::default()
        };
        assert!(!with_lldp.is_empty());
    }
}
