// ── Link inference engine ──
//
// A pure pass over immutable snapshots: package policy, inventory, and
// the per-node evidence gathered by the scheduler. No I/O, no store
// writes -- the caller persists the result. Determinism comes from
// BTree collections and canonical endpoint ordering; identical evidence
// always yields the identical link set.
//
// Precedence, highest first: LLDP, CDP, bridge/STP, IP-route. The
// direct-neighbor protocols name the adjacent device explicitly; bridge
// correlation can mis-root aggregated links; next-hop reachability is
// only used to fill gaps.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::PackagePolicy;
use crate::inventory::NodeInventory;
use crate::model::{
    CandidateLink, DiscoveryMethod, Endpoint, EndpointPair, MacAddr, Node, NodeEvidence, NodeId,
};

/// Infer the canonical candidate set for one package.
///
/// Output is sorted by canonical endpoint pair. Evidence naming devices
/// that cannot be resolved, or resolving outside the member set, is
/// dropped silently -- that is scope, not an error.
pub fn infer_links(
    policy: &PackagePolicy,
    inventory: &NodeInventory,
    evidence: &BTreeMap<NodeId, NodeEvidence>,
) -> Vec<CandidateLink> {
    let cx = Correlation::build(policy, inventory, evidence);

    let mut candidates: BTreeMap<EndpointPair, DiscoveryMethod> = BTreeMap::new();

    if policy.use_lldp_discovery {
        cx.lldp_pass(&mut candidates);
    }
    if policy.use_cdp_discovery {
        cx.cdp_pass(&mut candidates);
    }
    if policy.use_bridge_discovery {
        cx.bridge_pass(&mut candidates);
    }
    if policy.use_ip_route_discovery {
        cx.ip_route_pass(&mut candidates);
    }

    // Scope filter: both endpoints must be package members.
    candidates.retain(|pair, _| {
        cx.members.contains(&pair.a().node_id) && cx.members.contains(&pair.b().node_id)
    });

    debug!(
        package = %policy.name,
        links = candidates.len(),
        "inference pass complete"
    );

    candidates
        .into_iter()
        .map(|(pair, method)| CandidateLink { pair, method })
        .collect()
}

/// Record a candidate, keeping the higher-precedence method on conflict.
fn add_candidate(
    candidates: &mut BTreeMap<EndpointPair, DiscoveryMethod>,
    pair: EndpointPair,
    method: DiscoveryMethod,
) {
    candidates
        .entry(pair)
        .and_modify(|existing| {
            if method < *existing {
                *existing = method;
            }
        })
        .or_insert(method);
}

// ── Correlation context ─────────────────────────────────────────────

/// Lookup tables built once per pass from evidence + inventory.
struct Correlation<'a> {
    policy: &'a PackagePolicy,
    evidence: &'a BTreeMap<NodeId, NodeEvidence>,
    nodes: BTreeMap<NodeId, Arc<Node>>,
    members: BTreeSet<NodeId>,
    /// Chassis/interface hardware addresses -> owning node.
    chassis_to_node: BTreeMap<MacAddr, NodeId>,
    /// Base bridge address -> owning node (bridge correlation key).
    bridge_base_to_node: BTreeMap<MacAddr, NodeId>,
    /// System names from inventory labels and LLDP local data.
    sysname_to_node: BTreeMap<String, NodeId>,
    /// Interface address -> endpoint (next-hop resolution).
    addr_to_endpoint: BTreeMap<Ipv4Addr, Endpoint>,
    /// Management address -> node (CDP address resolution).
    mgmt_to_node: BTreeMap<Ipv4Addr, NodeId>,
}

impl<'a> Correlation<'a> {
    fn build(
        policy: &'a PackagePolicy,
        inventory: &NodeInventory,
        evidence: &'a BTreeMap<NodeId, NodeEvidence>,
    ) -> Self {
        let mut cx = Self {
            policy,
            evidence,
            nodes: BTreeMap::new(),
            members: BTreeSet::new(),
            chassis_to_node: BTreeMap::new(),
            bridge_base_to_node: BTreeMap::new(),
            sysname_to_node: BTreeMap::new(),
            addr_to_endpoint: BTreeMap::new(),
            mgmt_to_node: BTreeMap::new(),
        };

        for node in inventory.nodes() {
            let id = node.id;
            if policy.is_member(&node.foreign_id) {
                cx.members.insert(id);
            }
            cx.sysname_to_node.insert(node.label.clone(), id);
            if let IpAddr::V4(v4) = node.management_addr {
                cx.mgmt_to_node.insert(v4, id);
            }
            for iface in node.interfaces.values() {
                if let Some(mac) = iface.if_phys_addr {
                    cx.chassis_to_node.insert(mac, id);
                }
                for addr in &iface.ip_addresses {
                    if let IpAddr::V4(v4) = addr {
                        cx.addr_to_endpoint
                            .insert(*v4, Endpoint::new(id, iface.if_index));
                    }
                }
            }
            cx.nodes.insert(id, node);
        }

        // Identities the nodes report about themselves beat inventory
        // guesses, so they are layered on top.
        for (&id, ev) in evidence {
            if !cx.nodes.contains_key(&id) {
                continue;
            }
            if let Some(ref lldp) = ev.lldp {
                if let Some(chassis) = lldp.local_chassis_id {
                    cx.chassis_to_node.insert(chassis, id);
                }
                if let Some(ref sysname) = lldp.local_sysname {
                    cx.sysname_to_node.insert(sysname.clone(), id);
                }
            }
            if let Some(ref bridge) = ev.bridge {
                if let Some(base) = bridge.base_bridge_address {
                    cx.bridge_base_to_node.insert(base, id);
                    cx.chassis_to_node.insert(base, id);
                }
            }
        }

        cx
    }

    fn node(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(&id)
    }

    /// Member nodes with evidence, in id order.
    fn member_evidence(&self) -> impl Iterator<Item = (NodeId, &NodeEvidence)> {
        self.evidence
            .iter()
            .filter(|&(id, _)| self.members.contains(id))
            .map(|(&id, ev)| (id, ev))
    }

    /// Resolve a remote identity claim to a node: chassis MAC first,
    /// then system name, then management address.
    fn resolve_remote_node(
        &self,
        chassis_id: Option<&str>,
        sysname: Option<&str>,
        address: Option<Ipv4Addr>,
    ) -> Option<NodeId> {
        if let Some(mac) = chassis_id.and_then(|s| s.parse::<MacAddr>().ok()) {
            if let Some(&id) = self.chassis_to_node.get(&mac) {
                return Some(id);
            }
        }
        if let Some(name) = sysname.filter(|s| !s.is_empty()) {
            if let Some(&id) = self.sysname_to_node.get(name) {
                return Some(id);
            }
        }
        if let Some(addr) = address {
            if let Some(&id) = self.mgmt_to_node.get(&addr) {
                return Some(id);
            }
            if let Some(ep) = self.addr_to_endpoint.get(&addr) {
                return Some(ep.node_id);
            }
        }
        None
    }

    /// Resolve a remote port identifier against a node's interfaces:
    /// numeric ifIndex, then ifDescr, then port hardware address.
    fn resolve_remote_port(&self, node_id: NodeId, port_id: &str) -> Option<u32> {
        let node = self.node(node_id)?;
        if let Ok(if_index) = port_id.trim().parse::<u32>() {
            if node.interface(if_index).is_some() {
                return Some(if_index);
            }
        }
        if let Some(iface) = node.interface_by_descr(port_id.trim()) {
            return Some(iface.if_index);
        }
        if let Ok(mac) = port_id.parse::<MacAddr>() {
            if let Some(iface) = node.interface_by_phys_addr(mac) {
                return Some(iface.if_index);
            }
        }
        None
    }

    // ── LLDP / CDP passes ───────────────────────────────────────────

    fn lldp_pass(&self, candidates: &mut BTreeMap<EndpointPair, DiscoveryMethod>) {
        for (local_id, ev) in self.member_evidence() {
            let Some(ref lldp) = ev.lldp else { continue };
            for neighbor in &lldp.neighbors {
                let Some(remote_id) = self.resolve_remote_node(
                    Some(&neighbor.remote_chassis_id),
                    Some(&neighbor.remote_sysname),
                    None,
                ) else {
                    trace!(
                        node_id = %local_id,
                        chassis = %neighbor.remote_chassis_id,
                        "lldp neighbor outside inventory, dropped"
                    );
                    continue;
                };
                if remote_id == local_id {
                    continue;
                }
                let Some(remote_if) =
                    self.resolve_remote_port(remote_id, &neighbor.remote_port_id)
                else {
                    continue;
                };
                add_candidate(
                    candidates,
                    EndpointPair::new(
                        Endpoint::new(local_id, neighbor.local_if_index),
                        Endpoint::new(remote_id, remote_if),
                    ),
                    DiscoveryMethod::Lldp,
                );
            }
        }
    }

    fn cdp_pass(&self, candidates: &mut BTreeMap<EndpointPair, DiscoveryMethod>) {
        for (local_id, ev) in self.member_evidence() {
            let Some(ref cdp) = ev.cdp else { continue };
            for neighbor in &cdp.neighbors {
                let Some(remote_id) = self.resolve_remote_node(
                    None,
                    Some(&neighbor.remote_device_id),
                    neighbor.remote_address,
                ) else {
                    trace!(
                        node_id = %local_id,
                        device_id = %neighbor.remote_device_id,
                        "cdp neighbor outside inventory, dropped"
                    );
                    continue;
                };
                if remote_id == local_id {
                    continue;
                }
                let Some(remote_if) =
                    self.resolve_remote_port(remote_id, &neighbor.remote_port_id)
                else {
                    continue;
                };
                add_candidate(
                    candidates,
                    EndpointPair::new(
                        Endpoint::new(local_id, neighbor.local_if_index),
                        Endpoint::new(remote_id, remote_if),
                    ),
                    DiscoveryMethod::Cdp,
                );
            }
        }
    }

    // ── Bridge pass ─────────────────────────────────────────────────

    fn bridge_pass(&self, candidates: &mut BTreeMap<EndpointPair, DiscoveryMethod>) {
        let mut bridge_pairs: BTreeSet<EndpointPair> = BTreeSet::new();

        // STP designated triples: the non-designated end of a segment
        // names the designated bridge and its port.
        for (local_id, ev) in self.member_evidence() {
            let Some(ref bridge) = ev.bridge else { continue };
            for entry in &bridge.stp_ports {
                if bridge.base_bridge_address == Some(entry.designated_bridge) {
                    continue; // we are the designated bridge here
                }
                let Some(&remote_id) = self.bridge_base_to_node.get(&entry.designated_bridge)
                else {
                    continue;
                };
                if remote_id == local_id {
                    continue;
                }
                let Some(remote_bridge) =
                    self.evidence.get(&remote_id).and_then(|e| e.bridge.as_ref())
                else {
                    continue;
                };
                let (Some(local_if), Some(remote_if)) = (
                    bridge.ifindex_for_port(entry.bridge_port),
                    remote_bridge.ifindex_for_port(entry.designated_port_num()),
                ) else {
                    continue;
                };
                bridge_pairs.insert(EndpointPair::new(
                    Endpoint::new(local_id, local_if),
                    Endpoint::new(remote_id, remote_if),
                ));
            }
        }

        // Forwarding-table correlation: each bridge sees the other's
        // base address on exactly the port that faces it.
        for (a_id, a_ev) in self.member_evidence() {
            let Some(ref a_bridge) = a_ev.bridge else { continue };
            let Some(a_base) = a_bridge.base_bridge_address else {
                continue;
            };
            for (b_id, b_ev) in self.member_evidence() {
                if b_id <= a_id {
                    continue;
                }
                let Some(ref b_bridge) = b_ev.bridge else { continue };
                let Some(b_base) = b_bridge.base_bridge_address else {
                    continue;
                };
                for a_entry in a_bridge.forwarding.iter().filter(|e| e.mac == b_base) {
                    for b_entry in b_bridge.forwarding.iter().filter(|e| e.mac == a_base) {
                        let (Some(a_if), Some(b_if)) = (
                            a_bridge.ifindex_for_port(a_entry.bridge_port),
                            b_bridge.ifindex_for_port(b_entry.bridge_port),
                        ) else {
                            continue;
                        };
                        bridge_pairs.insert(EndpointPair::new(
                            Endpoint::new(a_id, a_if),
                            Endpoint::new(b_id, b_if),
                        ));
                    }
                }
            }
        }

        for pair in self.collapse_aggregates(bridge_pairs) {
            add_candidate(candidates, pair, DiscoveryMethod::Bridge);
        }
    }

    /// Aggregate collapse: member ports of a port-channel each produce a
    /// bridge edge to the same peer. When an aggregate-interface edge
    /// exists between a node pair, the physical member-port edges between
    /// the same pair are folded into it.
    fn collapse_aggregates(&self, pairs: BTreeSet<EndpointPair>) -> Vec<EndpointPair> {
        let mut by_node_pair: BTreeMap<(NodeId, NodeId), Vec<EndpointPair>> = BTreeMap::new();
        for pair in pairs {
            by_node_pair.entry(pair.node_pair()).or_default().push(pair);
        }

        let mut kept = Vec::new();
        for (_, group) in by_node_pair {
            let has_aggregate = group.iter().any(|p| self.is_aggregate_link(*p));
            if has_aggregate {
                kept.extend(group.into_iter().filter(|p| self.is_aggregate_link(*p)));
            } else {
                kept.extend(group);
            }
        }
        kept
    }

    fn is_aggregate_link(&self, pair: EndpointPair) -> bool {
        self.endpoint_is_aggregate(pair.a()) || self.endpoint_is_aggregate(pair.b())
    }

    fn endpoint_is_aggregate(&self, ep: Endpoint) -> bool {
        self.node(ep.node_id)
            .and_then(|n| n.interface(ep.if_index))
            .is_some_and(|iface| iface.if_type.is_aggregate())
    }

    // ── IP-route pass ───────────────────────────────────────────────

    fn ip_route_pass(&self, candidates: &mut BTreeMap<EndpointPair, DiscoveryMethod>) {
        let force = self.policy.force_ip_route_discovery_on_ethernet;

        for (local_id, ev) in self.member_evidence() {
            let Some(ref routes) = ev.ip_route else { continue };
            for route in &routes.routes {
                let Some(&remote_ep) = self.addr_to_endpoint.get(&route.next_hop) else {
                    continue;
                };
                if remote_ep.node_id == local_id {
                    continue; // route out our own address
                }
                let local_ep = Endpoint::new(local_id, route.if_index);
                if !force
                    && (self.endpoint_is_ethernet(local_ep)
                        || self.endpoint_is_ethernet(remote_ep))
                {
                    trace!(
                        node_id = %local_id,
                        next_hop = %route.next_hop,
                        "route inference suppressed on Ethernet endpoint"
                    );
                    continue;
                }
                let pair = EndpointPair::new(local_ep, remote_ep);
                // Fill gaps only: any earlier candidate outranks a route.
                if candidates.contains_key(&pair) {
                    continue;
                }
                add_candidate(candidates, pair, DiscoveryMethod::IpRoute);
            }
        }
    }

    fn endpoint_is_ethernet(&self, ep: Endpoint) -> bool {
        self.node(ep.node_id)
            .and_then(|n| n.interface(ep.if_index))
            .is_some_and(|iface| iface.if_type.is_ethernet())
    }
}
