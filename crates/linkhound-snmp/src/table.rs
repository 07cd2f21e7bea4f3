// ── MIB tables ──
//
// `MibTable` enumerates the tables the protocol collectors request; the
// transport returns them as `SnmpTable` -- rows of named columns. Column
// names follow the MIB definitions (lldpRemChassisId, ipRouteNextHop, ...)
// so snapshot files read like the walk dumps they were taken from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::SnmpValue;

/// The MIB tables the discovery collectors know how to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MibTable {
    /// BRIDGE-MIB dot1dBase scalars (base bridge address).
    Dot1dBase,
    /// BRIDGE-MIB dot1dBasePortTable (bridge port -> ifIndex).
    Dot1dBasePort,
    /// BRIDGE-MIB dot1dStpPortTable (designated bridge/port per port).
    Dot1dStpPort,
    /// BRIDGE-MIB dot1dTpFdbTable (learned forwarding entries).
    Dot1dTpFdb,
    /// LLDP-MIB local system scalars (chassis id, sysname).
    LldpLocal,
    /// LLDP-MIB lldpRemTable (neighbor claims).
    LldpRemote,
    /// CISCO-CDP-MIB cdpCacheTable.
    CdpCache,
    /// RFC1213 ipRouteTable.
    IpRoute,
    /// IP-FORWARD-MIB ipCidrRouteTable (vendor override for ipRouteTable).
    IpCidrRoute,
}

impl MibTable {
    /// Table name as it appears in snapshot files.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Dot1dBase => "dot1dBase",
            Self::Dot1dBasePort => "dot1dBasePortTable",
            Self::Dot1dStpPort => "dot1dStpPortTable",
            Self::Dot1dTpFdb => "dot1dTpFdbTable",
            Self::LldpLocal => "lldpLocalSystemData",
            Self::LldpRemote => "lldpRemTable",
            Self::CdpCache => "cdpCacheTable",
            Self::IpRoute => "ipRouteTable",
            Self::IpCidrRoute => "ipCidrRouteTable",
        }
    }

    /// Inverse of [`table_name`](Self::table_name), for snapshot loading.
    pub fn from_table_name(name: &str) -> Option<Self> {
        match name {
            "dot1dBase" => Some(Self::Dot1dBase),
            "dot1dBasePortTable" => Some(Self::Dot1dBasePort),
            "dot1dStpPortTable" => Some(Self::Dot1dStpPort),
            "dot1dTpFdbTable" => Some(Self::Dot1dTpFdb),
            "lldpLocalSystemData" => Some(Self::LldpLocal),
            "lldpRemTable" => Some(Self::LldpRemote),
            "cdpCacheTable" => Some(Self::CdpCache),
            "ipRouteTable" => Some(Self::IpRoute),
            "ipCidrRouteTable" => Some(Self::IpCidrRoute),
            _ => None,
        }
    }
}

impl fmt::Display for MibTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// One conceptual row of a walked table: column name -> cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnmpRow {
    pub columns: BTreeMap<String, SnmpValue>,
}

impl SnmpRow {
    pub fn get(&self, column: &str) -> Option<&SnmpValue> {
        self.columns.get(column)
    }

    pub fn get_u32(&self, column: &str) -> Option<u32> {
        self.get(column).and_then(SnmpValue::as_u32)
    }

    pub fn get_text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(SnmpValue::as_text)
    }
}

impl<const N: usize> From<[(&str, SnmpValue); N]> for SnmpRow {
    fn from(cells: [(&str, SnmpValue); N]) -> Self {
        Self {
            columns: cells
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        }
    }
}

/// A fully walked table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnmpTable {
    pub rows: Vec<SnmpRow>,
}

impl SnmpTable {
    pub fn new(rows: Vec<SnmpRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// First row, for single-row scalar groups like dot1dBase.
    pub fn first(&self) -> Option<&SnmpRow> {
        self.rows.first()
    }
}
