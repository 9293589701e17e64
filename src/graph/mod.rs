//! Relationship graph over beneficiary records.
//!
//! Two records are connected iff they share at least one non-empty linking
//! attribute value (phone, bank account, agent, identity number). The graph is
//! simple and undirected: multiplicity across attributes collapses to one edge.

pub mod builder;
pub mod cache;
pub mod centrality;
pub mod components;

pub use builder::GraphBuilder;
pub use cache::GraphCache;
pub use centrality::CentralityAnalyzer;
pub use components::{Component, RingDetector};

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

/// Immutable relationship graph, shared read-only by all in-flight requests.
#[derive(Debug, Clone)]
pub struct Graph {
    fingerprint: u64,
    ids: Vec<String>,
    index: HashMap<String, u32>,
    adjacency: Vec<BTreeSet<u32>>,
    edge_count: usize,
}

impl Graph {
    pub(crate) fn from_parts(ids: Vec<String>, adjacency: Vec<BTreeSet<u32>>) -> Self {
        debug_assert_eq!(ids.len(), adjacency.len());
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as u32))
            .collect();
        let edge_count = adjacency.iter().map(|n| n.len()).sum::<usize>() / 2;
        let fingerprint = fingerprint_of(&ids, &adjacency);
        Self {
            fingerprint,
            ids,
            index,
            adjacency,
            edge_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn degree(&self, id: &str) -> Option<usize> {
        self.index_of(id).map(|i| self.adjacency[i as usize].len())
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.adjacency[i as usize].contains(&j),
            _ => false,
        }
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Content-derived version id. Identical node/edge sets yield identical
    /// fingerprints; any rebuild that changes the graph changes it.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<u32> {
        self.index.get(id).copied()
    }

    pub(crate) fn id_at(&self, idx: u32) -> &str {
        &self.ids[idx as usize]
    }

    pub(crate) fn adjacency(&self) -> &[BTreeSet<u32>] {
        &self.adjacency
    }

    /// Serializable snapshot of the node/edge sets.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            ids: self.ids.clone(),
            adjacency: self
                .adjacency
                .iter()
                .map(|n| n.iter().copied().collect())
                .collect(),
        }
    }

    /// Rebuild a graph from a persisted snapshot.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, CacheError> {
        let n = snapshot.ids.len();
        if snapshot.adjacency.len() != n {
            return Err(CacheError::Inconsistent(format!(
                "{} ids but {} adjacency rows",
                n,
                snapshot.adjacency.len()
            )));
        }
        let mut seen = std::collections::HashSet::with_capacity(n);
        for id in &snapshot.ids {
            if !seen.insert(id.as_str()) {
                return Err(CacheError::Inconsistent(format!("duplicate node id {}", id)));
            }
        }
        let mut adjacency: Vec<BTreeSet<u32>> = Vec::with_capacity(n);
        for (i, neighbors) in snapshot.adjacency.iter().enumerate() {
            let mut set = BTreeSet::new();
            for &j in neighbors {
                if j as usize >= n {
                    return Err(CacheError::Inconsistent(format!(
                        "node {} references out-of-range neighbor {}",
                        i, j
                    )));
                }
                set.insert(j);
            }
            adjacency.push(set);
        }
        for (i, neighbors) in adjacency.iter().enumerate() {
            for &j in neighbors {
                if !adjacency[j as usize].contains(&(i as u32)) {
                    return Err(CacheError::Inconsistent(format!(
                        "edge {}-{} is not symmetric",
                        i, j
                    )));
                }
            }
        }
        Ok(Self::from_parts(snapshot.ids, adjacency))
    }
}

/// Persisted form of a graph; no cross-version compatibility promised beyond
/// "load the most recent store".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub ids: Vec<String>,
    pub adjacency: Vec<Vec<u32>>,
}

fn fingerprint_of(ids: &[String], adjacency: &[BTreeSet<u32>]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for id in ids {
        id.hash(&mut hasher);
    }
    for (i, neighbors) in adjacency.iter().enumerate() {
        for &j in neighbors {
            if (i as u32) < j {
                (i as u32, j).hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

/// One graph bundled with the query services computed from it. Swapped as a
/// unit so a detector or analyzer can never serve a different graph version
/// than the one it was built from.
pub struct GraphServices {
    pub graph: Arc<Graph>,
    pub rings: RingDetector,
    pub centrality: CentralityAnalyzer,
}

impl GraphServices {
    pub fn new(graph: Graph, ring_threshold: usize, hub_percentile: f64) -> Self {
        let graph = Arc::new(graph);
        let rings = RingDetector::new(graph.clone(), ring_threshold);
        let centrality = CentralityAnalyzer::new(graph.clone(), hub_percentile);
        Self {
            graph,
            rings,
            centrality,
        }
    }
}

/// Shared handle to the current graph services.
///
/// Readers clone the inner `Arc` and query lock-free; a rebuild replaces the
/// whole bundle atomically, never mutating in place under in-flight readers.
#[derive(Clone)]
pub struct GraphHandle {
    inner: Arc<RwLock<Arc<GraphServices>>>,
}

impl GraphHandle {
    pub fn new(services: GraphServices) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(services))),
        }
    }

    /// Current services bundle.
    pub fn current(&self) -> Arc<GraphServices> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Atomically replace the graph and its services.
    pub fn swap(&self, services: GraphServices) {
        let services = Arc::new(services);
        match self.inner.write() {
            Ok(mut guard) => *guard = services,
            Err(poisoned) => *poisoned.into_inner() = services,
        }
    }
}
