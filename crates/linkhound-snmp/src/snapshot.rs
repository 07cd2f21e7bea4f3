// ── Canned transport ──
//
// `StaticTransport` serves pre-recorded tables instead of walking a live
// agent. Snapshot files are TOML renditions of walk dumps, one file per
// agent address, each mapping table names to rows of MIB columns:
//
//     [[lldpRemTable]]
//     lldpRemLocalPortNum = 574
//     lldpRemChassisId = "00:22:83:09:57:c0"
//     lldpRemPortId = "xe-1/0/0"
//     lldpRemSysName = "delaware"
//
// Unreachability is injectable per target, which is how the test suites
// exercise retry and failure-containment paths.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

use dashmap::{DashMap, DashSet};
use tracing::{debug, warn};

use crate::error::SnmpError;
use crate::table::{MibTable, SnmpRow, SnmpTable};
use crate::transport::{SnmpTarget, SnmpTransport};

/// In-memory `(target, table) -> rows` transport.
#[derive(Debug, Default)]
pub struct StaticTransport {
    tables: DashMap<(IpAddr, MibTable), SnmpTable>,
    targets: DashSet<IpAddr>,
    unreachable: DashSet<IpAddr>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one table for an agent. Registering any table makes the
    /// agent "known": requests for other tables answer `NoSuchTable`
    /// rather than `Unreachable`.
    pub fn insert(&self, addr: IpAddr, table: MibTable, rows: SnmpTable) {
        self.targets.insert(addr);
        self.tables.insert((addr, table), rows);
    }

    /// Make every request to `addr` fail with `Unreachable` until
    /// [`restore`](Self::restore) is called.
    pub fn mark_unreachable(&self, addr: IpAddr) {
        self.unreachable.insert(addr);
    }

    pub fn restore(&self, addr: IpAddr) {
        self.unreachable.remove(&addr);
    }

    /// Load every `<address>.toml` snapshot in a directory.
    pub fn from_snapshot_dir(dir: &Path) -> Result<Self, SnmpError> {
        let transport = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(addr) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<IpAddr>().ok())
            else {
                warn!(path = %path.display(), "snapshot file name is not an address, skipping");
                continue;
            };
            transport.load_snapshot_file(addr, &path)?;
        }
        Ok(transport)
    }

    fn load_snapshot_file(&self, addr: IpAddr, path: &Path) -> Result<(), SnmpError> {
        let text = std::fs::read_to_string(path)?;
        let dump: BTreeMap<String, Vec<SnmpRow>> =
            toml::from_str(&text).map_err(|e| SnmpError::InvalidSnapshot {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.targets.insert(addr);
        for (name, rows) in dump {
            let Some(table) = MibTable::from_table_name(&name) else {
                debug!(%addr, table = %name, "unknown table in snapshot, skipping");
                continue;
            };
            self.tables.insert((addr, table), SnmpTable::new(rows));
        }
        debug!(%addr, path = %path.display(), "snapshot loaded");
        Ok(())
    }
}

impl SnmpTransport for StaticTransport {
    async fn fetch_table(
        &self,
        target: &SnmpTarget,
        table: MibTable,
    ) -> Result<SnmpTable, SnmpError> {
        if self.unreachable.contains(&target.addr) || !self.targets.contains(&target.addr) {
            return Err(SnmpError::Unreachable {
                target: target.addr.to_string(),
            });
        }
        self.tables
            .get(&(target.addr, table))
            .map(|t| t.value().clone())
            .ok_or_else(|| SnmpError::NoSuchTable {
                target: target.addr.to_string(),
                table: table.to_string(),
            })
    }
}
