// ── Topology store ──
//
// Persists canonical links. Replacement is atomic per package: readers
// see the previous complete set or the new complete set, never a mix,
// and a failed replace leaves prior rows untouched. Row ids are opaque
// and ascending; a row whose pair and method survive rediscovery keeps
// its id (upsert-then-prune rather than clear-then-insert).

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::model::{CandidateLink, DataLinkInterface, EndpointPair, LinkStatus};

/// Persistence failures, surfaced to the discovery caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("topology store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Store surface consumed by the discovery engine and its callers.
pub trait LinkStore: Send + Sync + 'static {
    /// Atomically replace a package's links with a new set.
    fn replace_links(&self, package: &str, links: &[CandidateLink]) -> Result<(), StoreError>;

    /// Every stored link, ordered by id.
    fn find_all(&self) -> Vec<DataLinkInterface>;

    fn count_all(&self) -> usize;

    fn find_by_id(&self, id: i32) -> Option<DataLinkInterface>;
}

// ── In-memory implementation ────────────────────────────────────────

#[derive(Debug, Default)]
struct StoreInner {
    by_package: BTreeMap<String, BTreeMap<EndpointPair, DataLinkInterface>>,
    next_id: i32,
}

/// In-process `LinkStore`.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    inner: Mutex<StoreInner>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        // A poisoned lock only means a panicking test thread; the data
        // is a plain map and stays usable.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl LinkStore for MemoryLinkStore {
    fn replace_links(&self, package: &str, links: &[CandidateLink]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let now = Utc::now();

        let previous = inner.by_package.remove(package).unwrap_or_default();
        let mut next: BTreeMap<EndpointPair, DataLinkInterface> = BTreeMap::new();

        for link in links {
            let row = match previous.get(&link.pair) {
                // Unchanged row keeps its identity across rediscovery.
                Some(existing) if existing.method == link.method => DataLinkInterface {
                    last_poll: now,
                    ..existing.clone()
                },
                _ => {
                    inner.next_id += 1;
                    DataLinkInterface {
                        id: inner.next_id,
                        package: package.to_owned(),
                        pair: link.pair,
                        method: link.method,
                        status: LinkStatus::Active,
                        discovered_at: now,
                        last_poll: now,
                    }
                }
            };
            next.insert(link.pair, row);
        }

        debug!(
            package,
            links = next.len(),
            pruned = previous.len().saturating_sub(next.len()),
            "package links replaced"
        );
        inner.by_package.insert(package.to_owned(), next);
        Ok(())
    }

    fn find_all(&self) -> Vec<DataLinkInterface> {
        let inner = self.lock();
        let mut rows: Vec<DataLinkInterface> = inner
            .by_package
            .values()
            .flat_map(|pkg| pkg.values().cloned())
            .collect();
        rows.sort_by_key(|row| row.id);
        rows
    }

    fn count_all(&self) -> usize {
        self.lock().by_package.values().map(BTreeMap::len).sum()
    }

    fn find_by_id(&self, id: i32) -> Option<DataLinkInterface> {
        self.lock()
            .by_package
            .values()
            .flat_map(BTreeMap::values)
            .find(|row| row.id == id)
            .cloned()
    }
}
