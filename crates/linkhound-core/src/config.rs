// ── Discovery configuration ──
//
// Domain configuration consumed by the scheduler and the inference
// engine. linkhound-config owns file/env loading and hands a validated
// `DiscoveryConfig` to the `ConfigHandle`; an `update()` swap is seen
// by the *next* discovery run, never a running one.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

// ── Scheduler knobs ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on concurrently collecting nodes.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_collections: usize,

    /// How many times a failed cycle is retried before the job fails.
    #[serde(default = "default_retries")]
    pub collection_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Community string used when a package doesn't override it.
    #[serde(default = "default_community")]
    pub snmp_community: String,

    #[serde(default = "default_snmp_timeout")]
    pub snmp_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_collections: default_max_concurrent(),
            collection_retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            snmp_community: default_community(),
            snmp_timeout_secs: default_snmp_timeout(),
        }
    }
}

fn default_max_concurrent() -> usize {
    8
}
fn default_retries() -> u32 {
    1
}
fn default_retry_delay_ms() -> u64 {
    250
}
fn default_community() -> String {
    "public".into()
}
fn default_snmp_timeout() -> u64 {
    5
}

// ── Vendor route-table overrides ────────────────────────────────────

/// Which route MIB a node's agent should be walked with.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RouteTableKind {
    /// RFC1213 ipRouteTable (generic fallback).
    #[default]
    IpRoute,
    /// IP-FORWARD-MIB ipCidrRouteTable.
    IpCidrRoute,
}

/// Per-vendor route-table selection, matched by sysObjectID prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRouteTable {
    /// Informational vendor label (e.g. "Juniper.junos").
    pub vendor: String,
    /// Dotted OID prefix the node's sysObjectID must start with.
    pub sysoid_root_mask: String,
    pub table: RouteTableKind,
}

// ── Package policy ──────────────────────────────────────────────────

/// Named policy scope grouping nodes under shared discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagePolicy {
    pub name: String,

    /// Member nodes, by inventory foreign id.
    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default = "default_true")]
    pub use_bridge_discovery: bool,
    #[serde(default = "default_true")]
    pub use_cdp_discovery: bool,
    #[serde(default = "default_true")]
    pub use_lldp_discovery: bool,
    #[serde(default = "default_true")]
    pub use_ip_route_discovery: bool,

    /// Allow route inference across Ethernet endpoints. Off by default:
    /// on broadcast media the direct-neighbor protocols are trusted and
    /// next-hop reachability is not evidence of physical wiring.
    #[serde(default)]
    pub force_ip_route_discovery_on_ethernet: bool,

    /// Recurring collection interval for this package.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Community override for this package's members.
    #[serde(default)]
    pub community: Option<String>,

    /// Vendor-specific route-table strategies.
    #[serde(default)]
    pub iproutes: Vec<VendorRouteTable>,
}

fn default_true() -> bool {
    true
}
fn default_interval() -> u64 {
    300
}

impl PackagePolicy {
    /// A minimal policy with all defaults; handy for tests and tools.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            use_bridge_discovery: true,
            use_cdp_discovery: true,
            use_lldp_discovery: true,
            use_ip_route_discovery: true,
            force_ip_route_discovery_on_ethernet: false,
            interval_secs: default_interval(),
            community: None,
            iproutes: Vec::new(),
        }
    }

    pub fn is_member(&self, foreign_id: &str) -> bool {
        self.members.iter().any(|m| m == foreign_id)
    }

    /// Select the route table for a node by vendor mask, longest match
    /// winning; generic ipRouteTable when nothing matches.
    pub fn route_table_for(&self, sys_object_id: &str) -> RouteTableKind {
        let sysoid = normalize_oid(sys_object_id);
        self.iproutes
            .iter()
            .filter(|v| oid_has_prefix(&sysoid, &normalize_oid(&v.sysoid_root_mask)))
            .max_by_key(|v| v.sysoid_root_mask.len())
            .map_or(RouteTableKind::default(), |v| v.table)
    }
}

fn normalize_oid(oid: &str) -> String {
    let body = oid.trim().strip_prefix('.').unwrap_or_else(|| oid.trim());
    format!(".{body}")
}

/// Prefix match on whole OID arcs: `.1.3.6.1.4.1.26` is not a prefix of
/// `.1.3.6.1.4.1.2636.1.1.1`.
fn oid_has_prefix(oid: &str, prefix: &str) -> bool {
    oid == prefix || oid.starts_with(&format!("{prefix}."))
}

fn valid_oid_mask(mask: &str) -> bool {
    let body = mask.trim().strip_prefix('.').unwrap_or_else(|| mask.trim());
    !body.is_empty()
        && body
            .split('.')
            .all(|arc| !arc.is_empty() && arc.chars().all(|c| c.is_ascii_digit()))
}

// ── Top-level config ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub packages: Vec<PackagePolicy>,
}

impl DiscoveryConfig {
    pub fn package(&self, name: &str) -> Option<&PackagePolicy> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// First package claiming this node, in declaration order -- the
    /// policy that governs the node's collection cycle.
    pub fn policy_for_member(&self, foreign_id: &str) -> Option<&PackagePolicy> {
        self.packages.iter().find(|p| p.is_member(foreign_id))
    }

    /// Effective community string for a package's members.
    pub fn community_for<'a>(&'a self, policy: &'a PackagePolicy) -> &'a str {
        policy
            .community
            .as_deref()
            .unwrap_or(&self.scheduler.snmp_community)
    }

    /// Structural validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen = std::collections::BTreeSet::new();
        for pkg in &self.packages {
            if pkg.name.is_empty() {
                return Err(CoreError::Config {
                    message: "package with empty name".into(),
                });
            }
            if !seen.insert(pkg.name.as_str()) {
                return Err(CoreError::Config {
                    message: format!("duplicate package name: {}", pkg.name),
                });
            }
            if pkg.interval_secs == 0 {
                return Err(CoreError::Config {
                    message: format!("package {}: interval_secs must be > 0", pkg.name),
                });
            }
            for vendor in &pkg.iproutes {
                if !valid_oid_mask(&vendor.sysoid_root_mask) {
                    return Err(CoreError::Config {
                        message: format!(
                            "package {}: malformed sysoid mask '{}' for vendor {}",
                            pkg.name, vendor.sysoid_root_mask, vendor.vendor
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

// ── ConfigHandle ────────────────────────────────────────────────────

type Loader = Box<dyn Fn() -> Result<DiscoveryConfig, CoreError> + Send + Sync>;

/// Shared, atomically swappable view of the discovery configuration.
///
/// Every discovery run snapshots the config once at start; `update()`
/// re-runs the loader (when one is attached) and swaps, so changes are
/// reflected by the next run, not retroactively.
pub struct ConfigHandle {
    current: ArcSwap<DiscoveryConfig>,
    loader: Option<Loader>,
}

impl ConfigHandle {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            loader: None,
        }
    }

    /// Attach a reload source (e.g. the figment file loader from
    /// linkhound-config) so `update()` can re-read it.
    pub fn with_loader(config: DiscoveryConfig, loader: Loader) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            loader: Some(loader),
        }
    }

    /// Snapshot of the current configuration.
    pub fn get(&self) -> Arc<DiscoveryConfig> {
        self.current.load_full()
    }

    /// Validate and install a new configuration.
    pub fn replace(&self, config: DiscoveryConfig) -> Result<(), CoreError> {
        config.validate()?;
        self.current.store(Arc::new(config));
        Ok(())
    }

    /// Re-run the attached loader and install the result. A handle
    /// without a loader keeps its current configuration.
    pub fn update(&self) -> Result<(), CoreError> {
        if let Some(ref loader) = self.loader {
            self.replace(loader()?)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("packages", &self.current.load().packages.len())
            .field("reloadable", &self.loader.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn juniper_policy() -> PackagePolicy {
        let mut pkg = PackagePolicy::named("example1");
        pkg.iproutes.push(VendorRouteTable {
            vendor: "Juniper.junos".into(),
            sysoid_root_mask: ".1.3.6.1.4.1.2636.1.1.1".into(),
            table: RouteTableKind::IpCidrRoute,
        });
        pkg
    }

    #[test]
    fn vendor_mask_selects_route_table() {
        let pkg = juniper_policy();
        assert_eq!(
            pkg.route_table_for(".1.3.6.1.4.1.2636.1.1.1.2.25"),
            RouteTableKind::IpCidrRoute
        );
        // Different vendor falls back to the generic table.
        assert_eq!(
            pkg.route_table_for(".1.3.6.1.4.1.9.1.122"),
            RouteTableKind::IpRoute
        );
        // Arc-boundary check: 2636 does not match a ...26 mask.
        let mut pkg2 = PackagePolicy::named("p2");
        pkg2.iproutes.push(VendorRouteTable {
            vendor: "short".into(),
            sysoid_root_mask: ".1.3.6.1.4.1.26".into(),
            table: RouteTableKind::IpCidrRoute,
        });
        assert_eq!(
            pkg2.route_table_for(".1.3.6.1.4.1.2636.1.1.1"),
            RouteTableKind::IpRoute
        );
    }

    #[test]
    fn longest_mask_wins() {
        let mut pkg = juniper_policy();
        pkg.iproutes.push(VendorRouteTable {
            vendor: "Juniper.mx".into(),
            sysoid_root_mask: ".1.3.6.1.4.1.2636.1.1.1.2".into(),
            table: RouteTableKind::IpRoute,
        });
        assert_eq!(
            pkg.route_table_for(".1.3.6.1.4.1.2636.1.1.1.2.25"),
            RouteTableKind::IpRoute
        );
    }

    #[test]
    fn validation_rejects_malformed_mask() {
        let mut cfg = DiscoveryConfig::default();
        let mut pkg = PackagePolicy::named("bad");
        pkg.iproutes.push(VendorRouteTable {
            vendor: "x".into(),
            sysoid_root_mask: ".1.3.x.1".into(),
            table: RouteTableKind::IpRoute,
        });
        cfg.packages.push(pkg);
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn validation_rejects_duplicate_packages() {
        let mut cfg = DiscoveryConfig::default();
        cfg.packages.push(PackagePolicy::named("p"));
        cfg.packages.push(PackagePolicy::named("p"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn handle_replace_and_update() {
        let handle = ConfigHandle::new(DiscoveryConfig::default());
        assert!(handle.get().packages.is_empty());

        let mut cfg = DiscoveryConfig::default();
        cfg.packages.push(PackagePolicy::named("example1"));
        handle.replace(cfg).unwrap();
        assert!(handle.get().package("example1").is_some());

        // update() without a loader is a no-op.
        handle.update().unwrap();
        assert!(handle.get().package("example1").is_some());
    }

    #[test]
    fn handle_update_runs_loader() {
        let handle = ConfigHandle::with_loader(
            DiscoveryConfig::default(),
            Box::new(|| {
                let mut cfg = DiscoveryConfig::default();
                cfg.packages.push(PackagePolicy::named("reloaded"));
                Ok(cfg)
            }),
        );
        assert!(handle.get().packages.is_empty());
        handle.update().unwrap();
        assert!(handle.get().package("reloaded").is_some());
    }

    #[test]
    fn community_resolution() {
        let mut cfg = DiscoveryConfig::default();
        let mut pkg = PackagePolicy::named("p");
        assert_eq!(cfg.community_for(&pkg), "public");
        pkg.community = Some("lab".into());
        cfg.scheduler.snmp_community = "global".into();
        assert_eq!(cfg.community_for(&pkg), "lab");
    }
}
