// ── LLDP collector ──

use tracing::debug;

use linkhound_snmp::{MibTable, SnmpError, SnmpTarget, SnmpTransport};

use super::optional_table;
use crate::model::{LldpEvidence, LldpNeighbor, Node};

const LLDP_LOC_CHASSIS_ID: &str = "lldpLocChassisId";
const LLDP_LOC_SYS_NAME: &str = "lldpLocSysName";
const LLDP_REM_LOCAL_PORT_NUM: &str = "lldpRemLocalPortNum";
const LLDP_REM_CHASSIS_ID: &str = "lldpRemChassisId";
const LLDP_REM_PORT_ID: &str = "lldpRemPortId";
const LLDP_REM_SYS_NAME: &str = "lldpRemSysName";

/// Walk the local system data and the remote (neighbor) table.
pub async fn collect<T: SnmpTransport>(
    node: &Node,
    target: &SnmpTarget,
    transport: &T,
) -> Result<LldpEvidence, SnmpError> {
    let local = optional_table(transport.fetch_table(target, MibTable::LldpLocal).await)?;
    let remote = optional_table(transport.fetch_table(target, MibTable::LldpRemote).await)?;

    let mut evidence = LldpEvidence::default();

    if let Some(row) = local.first() {
        evidence.local_chassis_id = row
            .get_text(LLDP_LOC_CHASSIS_ID)
            .and_then(|s| s.parse().ok());
        evidence.local_sysname = row.get_text(LLDP_LOC_SYS_NAME).map(str::to_owned);
    }

    for row in &remote.rows {
        let (Some(local_if_index), Some(chassis), Some(port)) = (
            row.get_u32(LLDP_REM_LOCAL_PORT_NUM),
            row.get_text(LLDP_REM_CHASSIS_ID),
            row.get_text(LLDP_REM_PORT_ID),
        ) else {
            debug!(node_id = %node.id, "skipping incomplete lldpRemTable row");
            continue;
        };
        evidence.neighbors.push(LldpNeighbor {
            local_if_index,
            remote_chassis_id: chassis.to_owned(),
            remote_port_id: port.to_owned(),
            remote_sysname: row
                .get_text(LLDP_REM_SYS_NAME)
                .unwrap_or_default()
                .to_owned(),
        });
    }

    debug!(
        node_id = %node.id,
        neighbors = evidence.neighbors.len(),
        "lldp collection complete"
    );
    Ok(evidence)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use pretty_assertions::assert_eq;

    use linkhound_snmp::{SnmpRow, SnmpTable, SnmpValue, StaticTransport};

    use super::*;
    use crate::model::MacAddr;

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

    fn node() -> Node {
        Node::new(1, "n1", "node-one", ".1.3.6", ADDR)
    }

    #[tokio::test]
    async fn parses_local_and_neighbors() {
        let transport = StaticTransport::new();
        transport.insert(
            ADDR,
            MibTable::LldpLocal,
            SnmpTable::new(vec![SnmpRow::from([
                (LLDP_LOC_CHASSIS_ID, SnmpValue::from("80:71:1f:8f:af:c0")),
                (LLDP_LOC_SYS_NAME, SnmpValue::from("penrose-mx480")),
            ])]),
        );
        transport.insert(
            ADDR,
            MibTable::LldpRemote,
            SnmpTable::new(vec![
                SnmpRow::from([
                    (LLDP_REM_LOCAL_PORT_NUM, SnmpValue::Integer(574)),
                    (LLDP_REM_CHASSIS_ID, SnmpValue::from("00:22:83:09:57:c0")),
                    (LLDP_REM_PORT_ID, SnmpValue::from("xe-1/0/0")),
                    (LLDP_REM_SYS_NAME, SnmpValue::from("delaware")),
                ]),
                // Incomplete row: no local port number.
                SnmpRow::from([(LLDP_REM_CHASSIS_ID, SnmpValue::from("00:00:00:00:00:01"))]),
            ]),
        );

        let target = SnmpTarget::new(ADDR, "public");
        let evidence = collect(&node(), &target, &transport).await.unwrap();

        assert_eq!(
            evidence.local_chassis_id,
            Some("80:71:1f:8f:af:c0".parse::<MacAddr>().unwrap())
        );
        assert_eq!(evidence.local_sysname.as_deref(), Some("penrose-mx480"));
        assert_eq!(evidence.neighbors.len(), 1);
        assert_eq!(evidence.neighbors[0].local_if_index, 574);
        assert_eq!(evidence.neighbors[0].remote_sysname, "delaware");
    }

    #[tokio::test]
    async fn missing_remote_table_is_empty_evidence() {
        let transport = StaticTransport::new();
        transport.insert(ADDR, MibTable::LldpLocal, SnmpTable::default());
        let target = SnmpTarget::new(ADDR, "public");
        let evidence = collect(&node(), &target, &transport).await.unwrap();
        assert!(evidence.neighbors.is_empty());
    }
}
