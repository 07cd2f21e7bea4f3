// ── IP-route collector ──
//
// Walks either the generic RFC1213 ipRouteTable or the vendor-selected
// ipCidrRouteTable; the two share a shape and differ only in column
// naming. Rows without a usable next hop or egress interface are
// dropped at collection time -- they can never support inference.

use std::net::Ipv4Addr;

use tracing::debug;

use linkhound_snmp::{MibTable, SnmpError, SnmpRow, SnmpTarget, SnmpTransport, SnmpValue};

use super::optional_table;
use crate::config::RouteTableKind;
use crate::model::{IpRouteEntry, IpRouteEvidence, Node};

struct RouteColumns {
    dest: &'static str,
    mask: &'static str,
    next_hop: &'static str,
    if_index: &'static str,
}

const IP_ROUTE: RouteColumns = RouteColumns {
    dest: "ipRouteDest",
    mask: "ipRouteMask",
    next_hop: "ipRouteNextHop",
    if_index: "ipRouteIfIndex",
};

const IP_CIDR_ROUTE: RouteColumns = RouteColumns {
    dest: "ipCidrRouteDest",
    mask: "ipCidrRouteMask",
    next_hop: "ipCidrRouteNextHop",
    if_index: "ipCidrRouteIfIndex",
};

/// Walk the route table selected for this node's vendor.
pub async fn collect<T: SnmpTransport>(
    node: &Node,
    target: &SnmpTarget,
    transport: &T,
    kind: RouteTableKind,
) -> Result<IpRouteEvidence, SnmpError> {
    let (table, columns) = match kind {
        RouteTableKind::IpRoute => (MibTable::IpRoute, &IP_ROUTE),
        RouteTableKind::IpCidrRoute => (MibTable::IpCidrRoute, &IP_CIDR_ROUTE),
    };

    let walked = optional_table(transport.fetch_table(target, table).await)?;

    let mut evidence = IpRouteEvidence::default();
    for row in &walked.rows {
        if let Some(entry) = parse_route_row(row, columns) {
            evidence.routes.push(entry);
        } else {
            debug!(node_id = %node.id, table = %table, "skipping unusable route row");
        }
    }

    debug!(
        node_id = %node.id,
        table = %table,
        routes = evidence.routes.len(),
        "ip-route collection complete"
    );
    Ok(evidence)
}

fn parse_route_row(row: &SnmpRow, columns: &RouteColumns) -> Option<IpRouteEntry> {
    let next_hop = row.get(columns.next_hop).and_then(SnmpValue::as_ipv4)?;
    let if_index = row.get_u32(columns.if_index)?;
    if next_hop == Ipv4Addr::UNSPECIFIED || if_index == 0 {
        return None;
    }
    Some(IpRouteEntry {
        dest: row
            .get(columns.dest)
            .and_then(SnmpValue::as_ipv4)
            .unwrap_or(Ipv4Addr::UNSPECIFIED),
        mask: row
            .get(columns.mask)
            .and_then(SnmpValue::as_ipv4)
            .unwrap_or(Ipv4Addr::UNSPECIFIED),
        next_hop,
        if_index,
    })
}
