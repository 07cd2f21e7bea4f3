// ── CDP collector ──

use tracing::debug;

use linkhound_snmp::{MibTable, SnmpError, SnmpTarget, SnmpTransport, SnmpValue};

use super::optional_table;
use crate::model::{CdpEvidence, CdpNeighbor, Node};

const CDP_CACHE_IF_INDEX: &str = "cdpCacheIfIndex";
const CDP_CACHE_DEVICE_ID: &str = "cdpCacheDeviceId";
const CDP_CACHE_DEVICE_PORT: &str = "cdpCacheDevicePort";
const CDP_CACHE_ADDRESS: &str = "cdpCacheAddress";

/// Walk the CDP neighbor cache.
pub async fn collect<T: SnmpTransport>(
    node: &Node,
    target: &SnmpTarget,
    transport: &T,
) -> Result<CdpEvidence, SnmpError> {
    let cache = optional_table(transport.fetch_table(target, MibTable::CdpCache).await)?;

    let mut evidence = CdpEvidence::default();
    for row in &cache.rows {
        let (Some(local_if_index), Some(device_id), Some(port)) = (
            row.get_u32(CDP_CACHE_IF_INDEX),
            row.get_text(CDP_CACHE_DEVICE_ID),
            row.get_text(CDP_CACHE_DEVICE_PORT),
        ) else {
            debug!(node_id = %node.id, "skipping incomplete cdpCacheTable row");
            continue;
        };
        evidence.neighbors.push(CdpNeighbor {
            local_if_index,
            remote_device_id: device_id.to_owned(),
            remote_port_id: port.to_owned(),
            remote_address: row.get(CDP_CACHE_ADDRESS).and_then(SnmpValue::as_ipv4),
        });
    }

    debug!(
        node_id = %node.id,
        neighbors = evidence.neighbors.len(),
        "cdp collection complete"
    );
    Ok(evidence)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use pretty_assertions::assert_eq;

    use linkhound_snmp::{SnmpRow, SnmpTable, StaticTransport};

    use super::*;

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

    #[tokio::test]
    async fn parses_neighbor_cache() {
        let transport = StaticTransport::new();
        transport.insert(
            ADDR,
            MibTable::CdpCache,
            SnmpTable::new(vec![SnmpRow::from([
                (CDP_CACHE_IF_INDEX, SnmpValue::Integer(508)),
                (CDP_CACHE_DEVICE_ID, SnmpValue::from("Austin")),
                (CDP_CACHE_DEVICE_PORT, SnmpValue::from("xe-0/0/0")),
                (CDP_CACHE_ADDRESS, SnmpValue::from("10.155.69.6")),
            ])]),
        );

        let node = Node::new(1, "n1", "phoenix-mx80", ".1.3.6", ADDR);
        let target = SnmpTarget::new(ADDR, "public");
        let evidence = collect(&node, &target, &transport).await.unwrap();

        assert_eq!(evidence.neighbors.len(), 1);
        let n = &evidence.neighbors[0];
        assert_eq!(n.local_if_index, 508);
        assert_eq!(n.remote_device_id, "Austin");
        assert_eq!(n.remote_address, Some(Ipv4Addr::new(10, 155, 69, 6)));
    }
}
