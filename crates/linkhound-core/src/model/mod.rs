// ── Domain model ──

pub mod evidence;
pub mod link;
pub mod node;

pub use evidence::{
    BridgeEvidence, CdpEvidence, CdpNeighbor, FdbEntry, IpRouteEntry, IpRouteEvidence,
    LldpEvidence, LldpNeighbor, NodeEvidence, StpPortEntry,
};
pub use link::{
    CandidateLink, DataLinkInterface, DiscoveryMethod, Endpoint, EndpointPair, LinkStatus,
};
pub use node::{IfType, MacAddr, Node, NodeId, NodeInterface};
