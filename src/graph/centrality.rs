//! Degree centrality scoring and hub ("master node") detection.

use super::Graph;
use crate::error::GraphQueryError;
use std::sync::Arc;

/// Percentile of the score distribution above which a node counts as a hub.
pub const DEFAULT_HUB_PERCENTILE: f64 = 0.95;

/// Degree-centrality analyzer bound to exactly one graph instance.
///
/// The score distribution and hub threshold are computed once from that graph,
/// so a rebuilt graph (which gets a fresh analyzer via the services bundle)
/// can never be served a stale distribution.
pub struct CentralityAnalyzer {
    graph: Arc<Graph>,
    scores: Vec<f64>,
    hub_threshold: f64,
    fingerprint: u64,
}

impl CentralityAnalyzer {
    pub fn new(graph: Arc<Graph>, hub_percentile: f64) -> Self {
        let n = graph.node_count();
        let scores: Vec<f64> = if n <= 1 {
            vec![0.0; n]
        } else {
            graph
                .adjacency()
                .iter()
                .map(|neighbors| neighbors.len() as f64 / (n - 1) as f64)
                .collect()
        };
        let hub_threshold = quantile(&scores, hub_percentile);
        let fingerprint = graph.fingerprint();
        Self {
            graph,
            scores,
            hub_threshold,
            fingerprint,
        }
    }

    /// Degree centrality in [0, 1]: degree / (|V| - 1), with a singleton or
    /// empty graph defined as score 0.
    pub fn score(&self, id: &str) -> Result<f64, GraphQueryError> {
        let idx = self
            .graph
            .index_of(id)
            .ok_or_else(|| GraphQueryError::NodeNotFound(id.to_string()))?;
        Ok(self.scores[idx as usize])
    }

    /// Hub iff the score meets the percentile threshold of the live
    /// distribution. On a graph sparse enough that the threshold is 0,
    /// every node qualifies, isolated ones included.
    pub fn is_hub(&self, id: &str) -> Result<bool, GraphQueryError> {
        let score = self.score(id)?;
        Ok(score >= self.hub_threshold)
    }

    pub fn hub_threshold(&self) -> f64 {
        self.hub_threshold
    }

    /// Graph version this distribution was computed from.
    pub fn graph_fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// Linear-interpolated quantile over an unsorted sample.
fn quantile(sample: &[f64], q: f64) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
    }
}
