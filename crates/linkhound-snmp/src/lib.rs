// linkhound-snmp: raw SNMP table model and the per-node transport seam.
//
// Collectors in linkhound-core consume the tables defined here; the
// transport itself is a black box behind the `SnmpTransport` trait.
// `StaticTransport` is the canned implementation backed by walk-style
// snapshot files, used by the CLI and the test suites.

pub mod error;
pub mod snapshot;
pub mod table;
pub mod transport;
pub mod value;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::SnmpError;
pub use snapshot::StaticTransport;
pub use table::{MibTable, SnmpRow, SnmpTable};
pub use transport::{SnmpTarget, SnmpTransport};
pub use value::SnmpValue;
