// ── Raw SNMP values ──
//
// The transport hands tables to the collectors as untyped cells; the
// parsing accessors here are where "bytes off the wire" become numbers,
// addresses, and OIDs. A cell that fails to parse is simply `None` --
// the collectors skip such rows rather than failing the protocol.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// A single table cell as returned by an agent.
///
/// Real agents return a richer set of ASN.1 types; everything the
/// discovery engine consumes collapses onto integers and octet strings,
/// so the snapshot format stores exactly those two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnmpValue {
    Integer(i64),
    Text(String),
}

impl SnmpValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_i64().and_then(|n| u32::try_from(n).ok())
    }

    /// Parse as a u16, accepting both decimal integers and the 4-hex-digit
    /// rendering agents use for bridge port identifiers (e.g. `"81e3"`).
    pub fn as_port_id(&self) -> Option<u16> {
        match self {
            Self::Integer(n) => u16::try_from(*n).ok(),
            Self::Text(s) => {
                let s = s.trim();
                if s.len() == 4 && s.chars().all(|c| c.is_ascii_hexdigit()) {
                    u16::from_str_radix(s, 16).ok()
                } else {
                    s.parse().ok()
                }
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Integer(_) => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        self.as_text().and_then(|s| s.trim().parse().ok())
    }

    /// Normalize a dotted OID cell: guarantees a leading dot, rejects
    /// anything that is not dot-separated digits.
    pub fn as_oid(&self) -> Option<String> {
        let raw = self.as_text()?.trim();
        let body = raw.strip_prefix('.').unwrap_or(raw);
        if body.is_empty() || !body.split('.').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
            return None;
        }
        Some(format!(".{body}"))
    }
}

impl From<i64> for SnmpValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for SnmpValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for SnmpValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
