// ── Node identity types ──
//
// NodeId, MacAddr, and IfType form the foundation of every domain type.
// Nodes and their interfaces are a read-only view of the inventory
// collaborator -- immutable for the duration of a discovery pass.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── NodeId ──────────────────────────────────────────────────────────

/// Database-style integer identity of a node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub i32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for NodeId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

// ── MacAddr ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("invalid MAC address: {0}")]
pub struct MacAddrParseError(String);

/// Six-byte hardware address, displayed lowercase colon-separated.
///
/// Accepts colon-separated, dash-separated, and bare 12-hex forms --
/// agents are not consistent about which rendering they return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = MacAddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.' | ' '))
            .collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MacAddrParseError(s.to_owned()));
        }
        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            let from = i * 2;
            *octet = u8::from_str_radix(&hex[from..from + 2], 16)
                .map_err(|_| MacAddrParseError(s.to_owned()))?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = MacAddrParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

// ── IfType ──────────────────────────────────────────────────────────

/// IANA ifType, closed over the values the engine branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum IfType {
    EthernetCsmacd,
    PropPointToPoint,
    Ppp,
    SoftwareLoopback,
    Ieee8023adLag,
    Other(i32),
}

impl IfType {
    /// Broadcast Ethernet media -- excluded as route-inference endpoints
    /// unless the package forces it.
    pub fn is_ethernet(self) -> bool {
        matches!(self, Self::EthernetCsmacd)
    }

    /// Link-aggregate (ae / port-channel) interfaces.
    pub fn is_aggregate(self) -> bool {
        matches!(self, Self::Ieee8023adLag)
    }
}

impl From<i32> for IfType {
    fn from(raw: i32) -> Self {
        match raw {
            6 => Self::EthernetCsmacd,
            22 => Self::PropPointToPoint,
            23 => Self::Ppp,
            24 => Self::SoftwareLoopback,
            161 => Self::Ieee8023adLag,
            other => Self::Other(other),
        }
    }
}

impl From<IfType> for i32 {
    fn from(t: IfType) -> Self {
        match t {
            IfType::EthernetCsmacd => 6,
            IfType::PropPointToPoint => 22,
            IfType::Ppp => 23,
            IfType::SoftwareLoopback => 24,
            IfType::Ieee8023adLag => 161,
            IfType::Other(raw) => raw,
        }
    }
}

// ── Node / NodeInterface ────────────────────────────────────────────

/// One interface of an inventoried node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInterface {
    pub if_index: u32,
    pub if_descr: String,
    #[serde(default)]
    pub if_phys_addr: Option<MacAddr>,
    #[serde(default = "default_if_type")]
    pub if_type: IfType,
    /// Addresses assigned to the interface; next-hop resolution for
    /// IP-route inference matches against these.
    #[serde(default)]
    pub ip_addresses: Vec<IpAddr>,
}

fn default_if_type() -> IfType {
    IfType::Other(1)
}

/// A known device: identity plus its interface table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub foreign_id: String,
    /// System name as reported by the device (sysName).
    pub label: String,
    /// Dotted sysObjectID, matched against vendor sysoid masks.
    pub sys_object_id: String,
    pub management_addr: IpAddr,
    #[serde(default)]
    pub interfaces: BTreeMap<u32, NodeInterface>,
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        foreign_id: impl Into<String>,
        label: impl Into<String>,
        sys_object_id: impl Into<String>,
        management_addr: IpAddr,
    ) -> Self {
        Self {
            id: id.into(),
            foreign_id: foreign_id.into(),
            label: label.into(),
            sys_object_id: sys_object_id.into(),
            management_addr,
            interfaces: BTreeMap::new(),
        }
    }

    pub fn with_interface(mut self, iface: NodeInterface) -> Self {
        self.interfaces.insert(iface.if_index, iface);
        self
    }

    pub fn interface(&self, if_index: u32) -> Option<&NodeInterface> {
        self.interfaces.get(&if_index)
    }

    /// Find the interface owning `addr`, if any.
    pub fn interface_for_addr(&self, addr: IpAddr) -> Option<&NodeInterface> {
        self.interfaces
            .values()
            .find(|iface| iface.ip_addresses.contains(&addr))
    }

    /// Find an interface by its ifDescr.
    pub fn interface_by_descr(&self, descr: &str) -> Option<&NodeInterface> {
        self.interfaces
            .values()
            .find(|iface| iface.if_descr == descr)
    }

    /// Find an interface by its hardware address.
    pub fn interface_by_phys_addr(&self, mac: MacAddr) -> Option<&NodeInterface> {
        self.interfaces
            .values()
            .find(|iface| iface.if_phys_addr == Some(mac))
    }

    /// True when every interface with a known media type is Ethernet.
    ///
    /// Loopbacks and aggregates don't count either way; a node with no
    /// typed interfaces is not considered Ethernet-only.
    pub fn is_ethernet_only(&self) -> bool {
        let mut saw_media = false;
        for iface in self.interfaces.values() {
            match iface.if_type {
                IfType::SoftwareLoopback | IfType::Ieee8023adLag => {}
                t if t.is_ethernet() => saw_media = true,
                _ => return false,
            }
        }
        saw_media
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv4Addr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn mac_parses_common_renderings() {
        let expect = MacAddr::new([0x80, 0x71, 0x1f, 0x8f, 0xaf, 0xc0]);
        assert_eq!("80:71:1f:8f:af:c0".parse::<MacAddr>().unwrap(), expect);
        assert_eq!("80-71-1F-8F-AF-C0".parse::<MacAddr>().unwrap(), expect);
        assert_eq!("80711f8fafc0".parse::<MacAddr>().unwrap(), expect);
    }

    #[test]
    fn mac_rejects_garbage() {
        assert!("80:71:1f".parse::<MacAddr>().is_err());
        assert!("80711f8fafc0ff".parse::<MacAddr>().is_err());
        assert!("gg:71:1f:8f:af:c0".parse::<MacAddr>().is_err());
    }

    #[test]
    fn mac_displays_lowercase_colons() {
        let mac: MacAddr = "80-71-1F-8F-AF-C0".parse().unwrap();
        assert_eq!(mac.to_string(), "80:71:1f:8f:af:c0");
    }

    #[test]
    fn if_type_round_trips() {
        assert_eq!(IfType::from(6), IfType::EthernetCsmacd);
        assert_eq!(IfType::from(161), IfType::Ieee8023adLag);
        assert_eq!(i32::from(IfType::from(199)), 199);
        assert!(IfType::from(6).is_ethernet());
        assert!(!IfType::from(22).is_ethernet());
    }

    fn test_node() -> Node {
        Node::new(1, "penrose", "penrose-mx480", ".1.3.6.1.4.1.2636.1.1.1.2.25",
            IpAddr::V4(Ipv4Addr::new(10, 155, 69, 16)))
            .with_interface(NodeInterface {
                if_index: 564,
                if_descr: "ge-1/1/0".into(),
                if_phys_addr: None,
                if_type: IfType::EthernetCsmacd,
                ip_addresses: vec![IpAddr::V4(Ipv4Addr::new(10, 155, 69, 17))],
            })
            .with_interface(NodeInterface {
                if_index: 2693,
                if_descr: "ae0".into(),
                if_phys_addr: None,
                if_type: IfType::Ieee8023adLag,
                ip_addresses: Vec::new(),
            })
    }

    #[test]
    fn interface_lookups() {
        let node = test_node();
        assert_eq!(node.interface(564).unwrap().if_descr, "ge-1/1/0");
        assert_eq!(
            node.interface_for_addr(IpAddr::V4(Ipv4Addr::new(10, 155, 69, 17)))
                .unwrap()
                .if_index,
            564
        );
        assert_eq!(node.interface_by_descr("ae0").unwrap().if_index, 2693);
        assert!(node.interface_by_descr("xe-9/9/9").is_none());
    }

    #[test]
    fn ethernet_only_ignores_aggregates() {
        let node = test_node();
        assert!(node.is_ethernet_only());
        let mixed = test_node().with_interface(NodeInterface {
            if_index: 9,
            if_descr: "so-0/0/0".into(),
            if_phys_addr: None,
            if_type: IfType::PropPointToPoint,
            ip_addresses: Vec::new(),
        });
        assert!(!mixed.is_ethernet_only());
    }
}
