// ── Collection scheduler ──
//
// Owns per-node collection jobs and the evidence working set. Jobs for
// independent nodes run concurrently under a semaphore-bounded pool;
// within a node the protocols run sequentially on the shared session.
// A failed cycle leaves the node's previous evidence in place
// (last-known-good) and is retried per the scheduler config before the
// job goes terminal.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, warn};

use linkhound_snmp::{SnmpTarget, SnmpTransport};

use crate::collect;
use crate::config::ConfigHandle;
use crate::error::CoreError;
use crate::inventory::NodeInventory;
use crate::model::{NodeEvidence, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Pending,
    Running,
    Done { ok: bool },
}

impl JobState {
    fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

/// Per-node collection job management.
pub struct CollectionScheduler<T: SnmpTransport> {
    inventory: Arc<NodeInventory>,
    config: Arc<ConfigHandle>,
    transport: Arc<T>,
    evidence: DashMap<NodeId, NodeEvidence>,
    jobs: DashMap<NodeId, JobState>,
    limiter: Arc<Semaphore>,
    /// Pinged on every terminal job transition; the discovery barrier
    /// waits on it.
    idle: Notify,
}

impl<T: SnmpTransport> CollectionScheduler<T> {
    pub fn new(
        inventory: Arc<NodeInventory>,
        config: Arc<ConfigHandle>,
        transport: Arc<T>,
    ) -> Self {
        let workers = config.get().scheduler.max_concurrent_collections.max(1);
        Self {
            inventory,
            config,
            transport,
            evidence: DashMap::new(),
            jobs: DashMap::new(),
            limiter: Arc::new(Semaphore::new(workers)),
            idle: Notify::new(),
        }
    }

    // ── Job surface ─────────────────────────────────────────────────

    /// Enqueue a one-shot collection job for a node.
    ///
    /// Returns `false` for nodes unknown to inventory and for nodes
    /// that already have a pending or in-flight job this cycle.
    pub fn schedule_node_collection(&self, node_id: NodeId) -> bool {
        if !self.inventory.contains(node_id) {
            debug!(%node_id, "refusing to schedule unknown node");
            return false;
        }
        match self.jobs.entry(node_id) {
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                if slot.get().is_active() {
                    debug!(%node_id, "collection already scheduled for this cycle");
                    false
                } else {
                    slot.insert(JobState::Pending);
                    true
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(JobState::Pending);
                true
            }
        }
    }

    /// Run one collection cycle for a node, blocking the caller until
    /// the job reaches a terminal state.
    pub async fn run_single_snmp_collection(&self, node_id: NodeId) -> Result<(), CoreError> {
        let Some(node) = self.inventory.get(node_id) else {
            // Node withdrawn after scheduling: cancel the pending job.
            self.jobs.remove(&node_id);
            self.idle.notify_waiters();
            return Err(CoreError::UnknownNode(node_id));
        };

        let config = self.config.get();
        let Some(policy) = config.policy_for_member(&node.foreign_id).cloned() else {
            self.jobs.remove(&node_id);
            self.idle.notify_waiters();
            return Err(CoreError::NodeNotInPackage(node_id));
        };

        self.jobs.insert(node_id, JobState::Running);

        let target = SnmpTarget::new(node.management_addr, config.community_for(&policy))
            .with_timeout_secs(config.scheduler.snmp_timeout_secs);

        let attempts = config.scheduler.collection_retries.saturating_add(1);
        let mut outcome = None;

        if let Ok(_permit) = self.limiter.acquire().await {
            for attempt in 1..=attempts {
                let cycle =
                    collect::run_collection_cycle(&node, &policy, &target, &*self.transport)
                        .await;
                if !cycle.failed() {
                    outcome = Some(cycle);
                    break;
                }
                warn!(
                    %node_id,
                    attempt,
                    attempts,
                    "collection cycle failed, prior evidence stays valid"
                );
                if attempt < attempts {
                    tokio::time::sleep(Duration::from_millis(config.scheduler.retry_delay_ms))
                        .await;
                }
            }
        }

        // An in-flight job is never interrupted, but its result is
        // discarded if the node left the inventory meanwhile.
        if !self.inventory.contains(node_id) {
            debug!(%node_id, "node withdrawn mid-collection, result discarded");
            self.finish(node_id, false);
            return Err(CoreError::UnknownNode(node_id));
        }

        match outcome {
            Some(cycle) => {
                debug!(%node_id, "collection cycle complete");
                self.evidence.insert(node_id, cycle.evidence);
                self.finish(node_id, true);
                Ok(())
            }
            None => {
                self.finish(node_id, false);
                Err(CoreError::CollectionFailed { node_id, attempts })
            }
        }
    }

    fn finish(&self, node_id: NodeId, ok: bool) {
        self.jobs.insert(node_id, JobState::Done { ok });
        self.idle.notify_waiters();
    }

    // ── Barrier & snapshots ─────────────────────────────────────────

    pub fn has_active_job(&self, node_id: NodeId) -> bool {
        self.jobs
            .get(&node_id)
            .is_some_and(|state| state.is_active())
    }

    /// Block until no listed node has a pending or in-flight job.
    ///
    /// Inference must not observe a half-collected package; collection
    /// and inference are separated by this full join.
    pub async fn wait_until_idle(&self, nodes: &[NodeId]) {
        loop {
            let notified = self.idle.notified();
            if !nodes.iter().any(|&id| self.has_active_job(id)) {
                return;
            }
            notified.await;
        }
    }

    /// Immutable snapshot of the evidence working set for the given
    /// nodes, in id order.
    pub fn evidence_snapshot(&self, nodes: &[NodeId]) -> BTreeMap<NodeId, NodeEvidence> {
        nodes
            .iter()
            .filter_map(|id| self.evidence.get(id).map(|ev| (*id, ev.clone())))
            .collect()
    }

    pub fn has_evidence(&self, node_id: NodeId) -> bool {
        self.evidence.contains_key(&node_id)
    }
}

impl<T: SnmpTransport> std::fmt::Debug for CollectionScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionScheduler")
            .field("jobs", &self.jobs.len())
            .field("evidence", &self.evidence.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use linkhound_snmp::{MibTable, SnmpRow, SnmpTable, SnmpValue, StaticTransport};

    use super::*;
    use crate::config::{DiscoveryConfig, PackagePolicy};
    use crate::model::Node;

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

    fn fixture() -> (Arc<NodeInventory>, Arc<ConfigHandle>, Arc<StaticTransport>) {
        let inventory = Arc::new(NodeInventory::from_nodes([Node::new(
            1,
            "alpha",
            "alpha",
            ".1.3.6.1.4.1.2636.1.1.1.2.25",
            ADDR,
        )]));

        let mut cfg = DiscoveryConfig::default();
        cfg.scheduler.retry_delay_ms = 1;
        let mut pkg = PackagePolicy::named("lab");
        pkg.members = vec!["alpha".into()];
        pkg.use_bridge_discovery = false;
        pkg.use_cdp_discovery = false;
        pkg.use_ip_route_discovery = false;
        cfg.packages.push(pkg);

        let transport = Arc::new(StaticTransport::new());
        transport.insert(
            ADDR,
            MibTable::LldpLocal,
            SnmpTable::new(vec![SnmpRow::from([(
                "lldpLocSysName",
                SnmpValue::from("alpha"),
            )])]),
        );

        (inventory, Arc::new(ConfigHandle::new(cfg)), transport)
    }

    fn scheduler(
        inventory: &Arc<NodeInventory>,
        config: &Arc<ConfigHandle>,
        transport: &Arc<StaticTransport>,
    ) -> CollectionScheduler<StaticTransport> {
        CollectionScheduler::new(
            Arc::clone(inventory),
            Arc::clone(config),
            Arc::clone(transport),
        )
    }

    #[tokio::test]
    async fn schedule_rejects_unknown_and_duplicate() {
        let (inventory, config, transport) = fixture();
        let sched = scheduler(&inventory, &config, &transport);

        assert!(!sched.schedule_node_collection(NodeId(99)));
        assert!(sched.schedule_node_collection(NodeId(1)));
        assert!(!sched.schedule_node_collection(NodeId(1)));
    }

    #[tokio::test]
    async fn collection_populates_evidence_and_reschedules() {
        let (inventory, config, transport) = fixture();
        let sched = scheduler(&inventory, &config, &transport);

        assert!(sched.schedule_node_collection(NodeId(1)));
        sched.run_single_snmp_collection(NodeId(1)).await.unwrap();
        assert!(sched.has_evidence(NodeId(1)));
        assert!(!sched.has_active_job(NodeId(1)));

        // Terminal job frees the slot for the next cycle.
        assert!(sched.schedule_node_collection(NodeId(1)));
    }

    #[tokio::test]
    async fn failed_cycle_keeps_last_known_good_evidence() {
        let (inventory, config, transport) = fixture();
        let sched = scheduler(&inventory, &config, &transport);

        sched.run_single_snmp_collection(NodeId(1)).await.unwrap();
        assert!(sched.has_evidence(NodeId(1)));
        let before = sched.evidence_snapshot(&[NodeId(1)]);

        transport.mark_unreachable(ADDR);
        let err = sched
            .run_single_snmp_collection(NodeId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::CollectionFailed { .. }));

        let after = sched.evidence_snapshot(&[NodeId(1)]);
        assert_eq!(
            before.get(&NodeId(1)).unwrap().lldp,
            after.get(&NodeId(1)).unwrap().lldp
        );
    }

    #[tokio::test]
    async fn withdrawn_node_cancels_pending_job() {
        let (inventory, config, transport) = fixture();
        let sched = scheduler(&inventory, &config, &transport);

        assert!(sched.schedule_node_collection(NodeId(1)));
        inventory.remove(NodeId(1));

        let err = sched
            .run_single_snmp_collection(NodeId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownNode(_)));
        assert!(!sched.has_evidence(NodeId(1)));
    }

    #[tokio::test]
    async fn node_outside_any_package_is_an_error() {
        let (inventory, config, transport) = fixture();
        inventory.insert(Node::new(
            2,
            "stray",
            "stray",
            ".1.3.6",
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
        ));
        let sched = scheduler(&inventory, &config, &transport);

        let err = sched
            .run_single_snmp_collection(NodeId(2))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NodeNotInPackage(_)));
    }

    #[tokio::test]
    async fn wait_until_idle_returns_with_no_jobs() {
        let (inventory, config, transport) = fixture();
        let sched = scheduler(&inventory, &config, &transport);
        // No active jobs: must return immediately rather than hang.
        sched.wait_until_idle(&[NodeId(1)]).await;
    }
}
