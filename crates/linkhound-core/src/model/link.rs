// ── Link types ──
//
// CandidateLink is the ephemeral output of one inference pass;
// DataLinkInterface is the persisted canonical record. The endpoint
// pair is stored in canonical order (lower node id, then lower ifIndex)
// so symmetric observations collapse and output order is deterministic.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::node::NodeId;

// ── DiscoveryMethod ─────────────────────────────────────────────────

/// The protocol that produced a link, ordered by trust.
///
/// Direct-neighbor protocols name the adjacent device explicitly;
/// bridge correlation can mis-root aggregated links; route inference
/// only proves reachability. The derived `Ord` encodes that precedence:
/// lower sorts first and wins conflicts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMethod {
    Lldp,
    Cdp,
    Bridge,
    IpRoute,
}

// ── Endpoints ───────────────────────────────────────────────────────

/// One side of a link: a node's interface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Endpoint {
    pub node_id: NodeId,
    pub if_index: u32,
}

impl Endpoint {
    pub fn new(node_id: impl Into<NodeId>, if_index: u32) -> Self {
        Self {
            node_id: node_id.into(),
            if_index,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.if_index)
    }
}

/// Unordered endpoint pair in canonical storage order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EndpointPair {
    a: Endpoint,
    b: Endpoint,
}

impl EndpointPair {
    /// Canonicalize: the lesser endpoint (node id, then ifIndex) is `a`.
    pub fn new(x: Endpoint, y: Endpoint) -> Self {
        if x <= y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    pub fn a(&self) -> Endpoint {
        self.a
    }

    pub fn b(&self) -> Endpoint {
        self.b
    }

    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.a.node_id == node_id || self.b.node_id == node_id
    }

    /// The two node ids, canonical order.
    pub fn node_pair(&self) -> (NodeId, NodeId) {
        (self.a.node_id, self.b.node_id)
    }
}

impl fmt::Display for EndpointPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}

// ── CandidateLink ───────────────────────────────────────────────────

/// An inferred connection, deduplicated and ranked, not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateLink {
    pub pair: EndpointPair,
    pub method: DiscoveryMethod,
}

impl CandidateLink {
    pub fn new(x: Endpoint, y: Endpoint, method: DiscoveryMethod) -> Self {
        Self {
            pair: EndpointPair::new(x, y),
            method,
        }
    }
}

// ── DataLinkInterface ───────────────────────────────────────────────

/// Row lifecycle state in the topology store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    Active,
    Deleted,
}

/// The persisted canonical link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLinkInterface {
    /// Opaque ascending id assigned at insertion; stable across
    /// rediscovery while the pair and method are unchanged.
    pub id: i32,
    pub package: String,
    pub pair: EndpointPair,
    pub method: DiscoveryMethod,
    pub status: LinkStatus,
    pub discovered_at: DateTime<Utc>,
    pub last_poll: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pair_canonicalizes_by_node_then_ifindex() {
        let p1 = EndpointPair::new(Endpoint::new(6, 515), Endpoint::new(1, 584));
        assert_eq!(p1.a(), Endpoint::new(1, 584));
        assert_eq!(p1.b(), Endpoint::new(6, 515));

        // Same node on both sides: lower ifIndex first.
        let p2 = EndpointPair::new(Endpoint::new(3, 900), Endpoint::new(3, 100));
        assert_eq!(p2.a(), Endpoint::new(3, 100));
    }

    #[test]
    fn symmetric_pairs_are_equal() {
        let ab = EndpointPair::new(Endpoint::new(1, 574), Endpoint::new(2, 510));
        let ba = EndpointPair::new(Endpoint::new(2, 510), Endpoint::new(1, 574));
        assert_eq!(ab, ba);
    }

    #[test]
    fn method_precedence_order() {
        assert!(DiscoveryMethod::Lldp < DiscoveryMethod::Cdp);
        assert!(DiscoveryMethod::Cdp < DiscoveryMethod::Bridge);
        assert!(DiscoveryMethod::Bridge < DiscoveryMethod::IpRoute);
    }

    #[test]
    fn method_string_forms() {
        assert_eq!(DiscoveryMethod::Lldp.to_string(), "lldp");
        assert_eq!(DiscoveryMethod::IpRoute.to_string(), "iproute");
        assert_eq!("bridge".parse::<DiscoveryMethod>().unwrap(), DiscoveryMethod::Bridge);
    }
}
