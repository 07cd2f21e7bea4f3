// ── Linkd facade ──
//
// The entry point consumers hold: injected inventory, configuration,
// transport, and store (dependency passing, no process-wide state),
// with the scheduler and inference engine behind it. Cheaply cloneable
// via an inner Arc. `start()`/`stop()` drive recurring per-package
// discovery the same way the one-shot surface does, on a cancellable
// child token.

use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use linkhound_snmp::SnmpTransport;

use crate::config::ConfigHandle;
use crate::engine;
use crate::error::CoreError;
use crate::inventory::NodeInventory;
use crate::model::{CandidateLink, NodeId};
use crate::scheduler::CollectionScheduler;
use crate::store::LinkStore;

/// The link-discovery service.
pub struct Linkd<T: SnmpTransport, S: LinkStore> {
    inner: Arc<LinkdInner<T, S>>,
}

struct LinkdInner<T: SnmpTransport, S: LinkStore> {
    inventory: Arc<NodeInventory>,
    config: Arc<ConfigHandle>,
    store: Arc<S>,
    scheduler: CollectionScheduler<T>,
    cancel: CancellationToken,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<T: SnmpTransport, S: LinkStore> Clone for Linkd<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: SnmpTransport, S: LinkStore> Linkd<T, S> {
    pub fn new(
        inventory: Arc<NodeInventory>,
        config: Arc<ConfigHandle>,
        transport: Arc<T>,
        store: Arc<S>,
    ) -> Self {
        let scheduler = CollectionScheduler::new(
            Arc::clone(&inventory),
            Arc::clone(&config),
            transport,
        );
        Self {
            inner: Arc::new(LinkdInner {
                inventory,
                config,
                store,
                scheduler,
                cancel: CancellationToken::new(),
                tasks: tokio::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn inventory(&self) -> &Arc<NodeInventory> {
        &self.inner.inventory
    }

    pub fn config(&self) -> &Arc<ConfigHandle> {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    // ── One-shot surface ─────────────────────────────────────────────

    /// Enqueue a collection job for a node. `false` for unknown nodes
    /// and for nodes already queued or collecting this cycle.
    pub fn schedule_node_collection(&self, node_id: impl Into<NodeId>) -> bool {
        self.inner.scheduler.schedule_node_collection(node_id.into())
    }

    /// Run one collection cycle for a node, blocking until it reaches a
    /// terminal state. `false` on failure; the node's prior evidence
    /// stays valid either way.
    pub async fn run_single_snmp_collection(&self, node_id: impl Into<NodeId>) -> bool {
        let node_id = node_id.into();
        match self.inner.scheduler.run_single_snmp_collection(node_id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%node_id, error = %err, "snmp collection unsuccessful");
                false
            }
        }
    }

    /// Run one inference pass for a package and replace its links.
    /// `false` on configuration or persistence failure; prior links are
    /// untouched in that case.
    pub async fn run_single_link_discovery(&self, package: &str) -> bool {
        match self.discover_package(package).await {
            Ok(links) => {
                info!(package, links = links.len(), "link discovery complete");
                true
            }
            Err(err) => {
                warn!(package, error = %err, "link discovery failed");
                false
            }
        }
    }

    /// [`run_single_link_discovery`](Self::run_single_link_discovery)
    /// with the underlying error surfaced.
    pub async fn discover_package(&self, package: &str) -> Result<Vec<CandidateLink>, CoreError> {
        let config = self.inner.config.get();
        let policy = config
            .package(package)
            .ok_or_else(|| CoreError::UnknownPackage {
                name: package.to_owned(),
            })?
            .clone();

        let members: Vec<NodeId> = policy
            .members
            .iter()
            .filter_map(|foreign_id| self.inner.inventory.get_by_foreign_id(foreign_id))
            .map(|node| node.id)
            .collect();

        // Full barrier: no member may still be collecting.
        self.inner.scheduler.wait_until_idle(&members).await;

        let evidence = self.inner.scheduler.evidence_snapshot(&members);
        let links = engine::infer_links(&policy, &self.inner.inventory, &evidence);

        self.inner.store.replace_links(&policy.name, &links)?;
        debug!(package, links = links.len(), "links persisted");
        Ok(links)
    }

    // ── Recurring discovery ──────────────────────────────────────────

    /// Spawn one recurring collect-then-infer task per configured
    /// package. Idempotent restarts are not supported; call
    /// [`stop`](Self::stop) first.
    pub async fn start(&self) {
        let config = self.inner.config.get();
        let mut tasks = self.inner.tasks.lock().await;
        for policy in &config.packages {
            let linkd = self.clone();
            let package = policy.name.clone();
            let cancel = self.inner.cancel.child_token();
            tasks.push(tokio::spawn(package_task(linkd, package, cancel)));
        }
        info!(packages = config.packages.len(), "recurring discovery started");
    }

    /// Cancel recurring discovery and join the tasks.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        let mut tasks = self.inner.tasks.lock().await;
        for task in tasks.drain(..) {
            let _ = task.await;
        }
        debug!("recurring discovery stopped");
    }

    /// One collect-everything-then-infer round for a package.
    async fn run_package_round(&self, package: &str) {
        let config = self.inner.config.get();
        let Some(policy) = config.package(package) else {
            warn!(package, "package vanished from configuration");
            return;
        };

        let mut jobs: JoinSet<()> = JoinSet::new();
        for foreign_id in &policy.members {
            let Some(node) = self.inner.inventory.get_by_foreign_id(foreign_id) else {
                debug!(package, %foreign_id, "member not in inventory, skipped");
                continue;
            };
            if !self.schedule_node_collection(node.id) {
                continue;
            }
            let linkd = self.clone();
            let node_id = node.id;
            jobs.spawn(async move {
                linkd.run_single_snmp_collection(node_id).await;
            });
        }
        // Join before inference: collection and inference never overlap.
        while jobs.join_next().await.is_some() {}

        self.run_single_link_discovery(package).await;
    }
}

/// Recurring per-package loop: collect all members, infer, sleep.
/// Interval changes land on the next round (config is re-read).
async fn package_task<T: SnmpTransport, S: LinkStore>(
    linkd: Linkd<T, S>,
    package: String,
    cancel: CancellationToken,
) {
    loop {
        linkd.run_package_round(&package).await;

        let interval_secs = linkd
            .inner
            .config
            .get()
            .package(&package)
            .map_or(300, |p| p.interval_secs);

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(std::time::Duration::from_secs(interval_secs)) => {}
        }
    }
    debug!(%package, "package discovery task exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicBool, Ordering};

    use linkhound_snmp::{MibTable, SnmpRow, SnmpTable, SnmpValue, StaticTransport};

    use super::*;
    use crate::config::{DiscoveryConfig, PackagePolicy};
    use crate::model::{DataLinkInterface, IfType, Node, NodeInterface};
    use crate::store::{MemoryLinkStore, StoreError};

    const A_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const B_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    /// Store stub whose failures are switchable, for containment tests.
    struct FlakyStore {
        delegate: MemoryLinkStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                delegate: MemoryLinkStore::new(),
                failing: AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl LinkStore for FlakyStore {
        fn replace_links(
            &self,
            package: &str,
            links: &[CandidateLink],
        ) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable {
                    reason: "injected outage".into(),
                });
            }
            self.delegate.replace_links(package, links)
        }

        fn find_all(&self) -> Vec<DataLinkInterface> {
            self.delegate.find_all()
        }

        fn count_all(&self) -> usize {
            self.delegate.count_all()
        }

        fn find_by_id(&self, id: i32) -> Option<DataLinkInterface> {
            self.delegate.find_by_id(id)
        }
    }

    fn eth(if_index: u32, descr: &str) -> NodeInterface {
        NodeInterface {
            if_index,
            if_descr: descr.into(),
            if_phys_addr: None,
            if_type: IfType::EthernetCsmacd,
            ip_addresses: Vec::new(),
        }
    }

    fn lldp_local(sysname: &str, chassis: &str) -> SnmpTable {
        SnmpTable::new(vec![SnmpRow::from([
            ("lldpLocChassisId", SnmpValue::from(chassis)),
            ("lldpLocSysName", SnmpValue::from(sysname)),
        ])])
    }

    fn lldp_remote(local_if: i64, chassis: &str, port: &str, sysname: &str) -> SnmpTable {
        SnmpTable::new(vec![SnmpRow::from([
            ("lldpRemLocalPortNum", SnmpValue::Integer(local_if)),
            ("lldpRemChassisId", SnmpValue::from(chassis)),
            ("lldpRemPortId", SnmpValue::from(port)),
            ("lldpRemSysName", SnmpValue::from(sysname)),
        ])])
    }

    fn two_node_fixture<S: LinkStore>(store: Arc<S>) -> (Linkd<StaticTransport, S>, Arc<StaticTransport>) {
        let inventory = Arc::new(NodeInventory::from_nodes([
            Node::new(1, "alpha", "alpha", ".1.3.6.1.4.1.2636.1.1.1.2.25", A_ADDR)
                .with_interface(eth(10, "ge-0/0/0")),
            Node::new(2, "beta", "beta", ".1.3.6.1.4.1.2636.1.1.1.2.25", B_ADDR)
                .with_interface(eth(20, "ge-0/0/1")),
        ]));

        let mut cfg = DiscoveryConfig::default();
        cfg.scheduler.retry_delay_ms = 1;
        let mut pkg = PackagePolicy::named("lab");
        pkg.members = vec!["alpha".into(), "beta".into()];
        pkg.use_bridge_discovery = false;
        pkg.use_cdp_discovery = false;
        pkg.use_ip_route_discovery = false;
        cfg.packages.push(pkg);

        let transport = Arc::new(StaticTransport::new());
        transport.insert(A_ADDR, MibTable::LldpLocal, lldp_local("alpha", "00:00:00:00:00:0a"));
        transport.insert(
            A_ADDR,
            MibTable::LldpRemote,
            lldp_remote(10, "00:00:00:00:00:0b", "ge-0/0/1", "beta"),
        );
        transport.insert(B_ADDR, MibTable::LldpLocal, lldp_local("beta", "00:00:00:00:00:0b"));
        transport.insert(
            B_ADDR,
            MibTable::LldpRemote,
            lldp_remote(20, "00:00:00:00:00:0a", "ge-0/0/0", "alpha"),
        );

        let linkd = Linkd::new(
            inventory,
            Arc::new(ConfigHandle::new(cfg)),
            Arc::clone(&transport),
            store,
        );
        (linkd, transport)
    }

    #[tokio::test]
    async fn unknown_package_fails_discovery() {
        let (linkd, _) = two_node_fixture(Arc::new(MemoryLinkStore::new()));
        assert!(!linkd.run_single_link_discovery("nope").await);
        let err = linkd.discover_package("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::UnknownPackage { .. }));
    }

    #[tokio::test]
    async fn end_to_end_two_node_discovery() {
        let (linkd, _) = two_node_fixture(Arc::new(MemoryLinkStore::new()));

        assert!(linkd.schedule_node_collection(1));
        assert!(linkd.schedule_node_collection(2));
        assert!(linkd.run_single_snmp_collection(1).await);
        assert!(linkd.run_single_snmp_collection(2).await);

        assert_eq!(linkd.store().count_all(), 0);
        assert!(linkd.run_single_link_discovery("lab").await);
        assert_eq!(linkd.store().count_all(), 1);
    }

    #[tokio::test]
    async fn store_outage_preserves_prior_links() {
        let store = Arc::new(FlakyStore::new());
        let (linkd, _) = two_node_fixture(Arc::clone(&store));

        linkd.run_single_snmp_collection(1).await;
        linkd.run_single_snmp_collection(2).await;
        assert!(linkd.run_single_link_discovery("lab").await);
        let before = store.find_all();
        assert_eq!(before.len(), 1);

        store.set_failing(true);
        assert!(!linkd.run_single_link_discovery("lab").await);
        assert_eq!(store.find_all(), before, "failed replace must not touch rows");

        store.set_failing(false);
        assert!(linkd.run_single_link_discovery("lab").await);
    }

    #[tokio::test]
    async fn one_dead_node_does_not_block_discovery() {
        let (linkd, transport) = two_node_fixture(Arc::new(MemoryLinkStore::new()));

        transport.mark_unreachable(B_ADDR);
        assert!(linkd.run_single_snmp_collection(1).await);
        assert!(!linkd.run_single_snmp_collection(2).await);

        // Alpha's one-sided claim still resolves beta via inventory.
        assert!(linkd.run_single_link_discovery("lab").await);
        assert_eq!(linkd.store().count_all(), 1);
    }

    #[tokio::test]
    async fn recurring_discovery_runs_a_round() {
        let (linkd, _) = two_node_fixture(Arc::new(MemoryLinkStore::new()));
        linkd.start().await;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        linkd.stop().await;
        assert_eq!(linkd.store().count_all(), 1);
    }

    #[tokio::test]
    async fn config_update_applies_to_next_run() {
        let (linkd, _) = two_node_fixture(Arc::new(MemoryLinkStore::new()));
        linkd.run_single_snmp_collection(1).await;
        linkd.run_single_snmp_collection(2).await;
        assert!(linkd.run_single_link_discovery("lab").await);
        assert_eq!(linkd.store().count_all(), 1);

        // Disable LLDP for the package and replace the config.
        let mut cfg = (*linkd.config().get()).clone();
        cfg.packages[0].use_lldp_discovery = false;
        linkd.config().replace(cfg).unwrap();

        assert!(linkd.run_single_link_discovery("lab").await);
        assert_eq!(linkd.store().count_all(), 0);
    }
}
